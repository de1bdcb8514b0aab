//! Analysis orchestration: version-gated caching, debounced scheduling,
//! and the per-document diagnostic pipeline.
//!
//! One pass over a document runs: extract symbols through the subprocess
//! bridge, evaluate naming and task rules, scan function bodies for N+1
//! candidates, optionally confirm the candidates against the validation
//! service, then filter by the configured severity threshold and store
//! the result keyed by document and settings version.

mod actions;
mod cache;
mod debounce;

pub use actions::{ActionKind, CodeAction, CodeActionProvider, NameSuggester, NoSuggestions, TextEdit};
pub use cache::DiagnosticsCache;
pub use debounce::{DEFAULT_DEBOUNCE, DebounceScheduler};

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use djalint_config::SettingsHandle;
use djalint_extractor::{ExtractionError, ParserScript, SymbolExtractor};
use djalint_llm::{LlmError, LlmValidator, ResultCache, Verdict};
use djalint_nplusone::{dedupe, scan_function};
use djalint_types::{CancelToken, Diagnostic, Issue, RuleCode, Symbol};

/// Anything that can turn document text into symbols.
///
/// The production implementation is the subprocess bridge; tests swap in
/// canned sources to observe spawn counts.
pub trait SymbolSource: Send + Sync {
    fn extract(
        &self,
        text: &str,
        script: ParserScript,
        cancel: &CancelToken,
    ) -> impl Future<Output = Result<Vec<Symbol>, ExtractionError>> + Send;
}

impl SymbolSource for SymbolExtractor {
    async fn extract(
        &self,
        text: &str,
        script: ParserScript,
        cancel: &CancelToken,
    ) -> Result<Vec<Symbol>, ExtractionError> {
        SymbolExtractor::extract(self, text, script, cancel).await
    }
}

/// Session-wide switch that stops validation calls after a rate limit.
#[derive(Default)]
pub struct QuotaGate {
    exhausted: AtomicBool,
}

impl QuotaGate {
    /// Record quota exhaustion. Returns true only for the first caller,
    /// which owns emitting the single user-facing notification.
    pub fn mark_exhausted(&self) -> bool {
        !self.exhausted.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    pub fn reset_quota(&self) {
        self.exhausted.store(false, Ordering::SeqCst);
    }
}

/// User-facing events surfaced alongside diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The validation service rejected us with a rate limit; further
    /// calls are suppressed until the quota gate is reset.
    ValidationRateLimited,
}

/// Result of one analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub notices: Vec<Notice>,
    pub from_cache: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A newer request for the same document superseded this one.
    #[error("analysis superseded by a newer request")]
    Cancelled,
}

/// The per-document diagnostic pipeline.
pub struct AnalysisEngine<S> {
    source: S,
    settings: SettingsHandle,
    cache: DiagnosticsCache,
    validator: Option<LlmValidator>,
    verdicts: ResultCache<Verdict>,
    quota: QuotaGate,
    actions: CodeActionProvider,
    inflight: Mutex<HashMap<String, CancelToken>>,
}

impl<S: SymbolSource> AnalysisEngine<S> {
    #[must_use]
    pub fn new(source: S, settings: SettingsHandle, validator: Option<LlmValidator>) -> Self {
        Self {
            source,
            settings,
            cache: DiagnosticsCache::new(),
            validator,
            verdicts: ResultCache::default(),
            quota: QuotaGate::default(),
            actions: CodeActionProvider::new(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    #[must_use]
    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Replace the settings. A severity-threshold change also clears the
    /// verdict cache, whose stored entries reflect the old threshold.
    pub fn update_settings(&self, settings: djalint_config::AnalysisSettings) {
        if self.settings.update(settings) {
            self.verdicts.clear();
        }
        self.actions.clear();
    }

    #[must_use]
    pub fn actions_for(&self, diagnostic: &Diagnostic) -> Vec<CodeAction> {
        self.actions.actions_for(diagnostic)
    }

    /// Run one full analysis pass over a document snapshot.
    ///
    /// Re-analyzing an unchanged (version, settings) pair returns the
    /// cached diagnostics without touching the extractor. A failed
    /// extraction keeps whatever was last published for the document.
    pub async fn analyze_document(
        &self,
        uri: &str,
        version: i32,
        text: &str,
    ) -> Result<AnalysisOutcome, EngineError> {
        let (settings, settings_version) = self.settings.snapshot();
        if let Some(cached) = self.cache.get(uri, version, settings_version) {
            tracing::debug!(uri, version, "Diagnostics cache hit");
            return Ok(AnalysisOutcome {
                diagnostics: cached.to_vec(),
                notices: Vec::new(),
                from_cache: true,
            });
        }

        let cancel = self.supersede_inflight(uri);
        let last_good = self.cache.last_good(uri);

        let script = ParserScript::select(text);
        let symbols = match self.source.extract(text, script, &cancel).await {
            Ok(symbols) => symbols,
            Err(ExtractionError::Cancelled) => return Err(EngineError::Cancelled),
            Err(error) if error.is_user_syntax_error() => {
                tracing::debug!(uri, "Document does not parse yet; keeping last diagnostics");
                return Ok(Self::fallback_outcome(last_good));
            }
            Err(error) => {
                tracing::warn!(uri, %error, "Extraction failed; keeping last diagnostics");
                return Ok(Self::fallback_outcome(last_good));
            }
        };

        let mut notices = Vec::new();
        let mut diagnostics = djalint_rules::evaluate_symbols(&symbols, &settings);
        diagnostics.extend(
            self.confirm_candidates(&symbols, &settings, &cancel, &mut notices)
                .await?,
        );

        diagnostics.retain(|d| d.severity().at_least(settings.min_severity));
        diagnostics.sort_by_key(|d| (d.range().start, d.code().as_str()));

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        // Drop the stale entry only once a replacement is in hand, so
        // failed passes above still fall back to the last good result.
        self.cache.invalidate(uri);
        self.cache
            .set(uri, version, settings_version, diagnostics.clone());
        tracing::debug!(uri, version, count = diagnostics.len(), "Analysis complete");
        Ok(AnalysisOutcome {
            diagnostics,
            notices,
            from_cache: false,
        })
    }

    /// Register a fresh cancellation token for `uri`, cancelling any
    /// pass still running for it.
    fn supersede_inflight(&self, uri: &str) -> CancelToken {
        let cancel = CancelToken::new();
        if let Ok(mut inflight) = self.inflight.lock()
            && let Some(previous) = inflight.insert(uri.to_string(), cancel.clone())
        {
            previous.cancel();
        }
        cancel
    }

    fn fallback_outcome(last_good: Option<Arc<[Diagnostic]>>) -> AnalysisOutcome {
        AnalysisOutcome {
            diagnostics: last_good.map(|d| d.to_vec()).unwrap_or_default(),
            notices: Vec::new(),
            from_cache: true,
        }
    }

    /// N+1 stage: heuristics, dedup, and token-gated confirmation.
    async fn confirm_candidates(
        &self,
        symbols: &[Symbol],
        settings: &djalint_config::AnalysisSettings,
        cancel: &CancelToken,
        notices: &mut Vec<Notice>,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        let token = settings
            .api
            .as_ref()
            .and_then(|api| std::env::var(&api.token_env).ok());
        let mut diagnostics = Vec::new();

        for symbol in symbols.iter().filter(|s| s.kind.is_function_like()) {
            let candidates = dedupe(scan_function(symbol));
            if candidates.is_empty() {
                continue;
            }

            let issues = match (&self.validator, &token) {
                (Some(validator), Some(token)) if !self.quota.is_exhausted() => {
                    let body = symbol.body_text();
                    match validator
                        .validate_cached(
                            &self.verdicts,
                            &symbol.name,
                            &body,
                            &candidates,
                            Some(token.as_str()),
                            cancel,
                        )
                        .await
                    {
                        Ok(verdict) => apply_verdict(candidates, &verdict),
                        Err(LlmError::Cancelled) => return Err(EngineError::Cancelled),
                        Err(LlmError::RateLimited) => {
                            if self.quota.mark_exhausted() {
                                notices.push(Notice::ValidationRateLimited);
                            }
                            candidates
                        }
                        Err(error) => {
                            tracing::warn!(function = %symbol.name, %error, "Validation failed; keeping heuristic candidates");
                            candidates
                        }
                    }
                }
                _ => candidates,
            };

            diagnostics.extend(issues.into_iter().map(issue_to_diagnostic));
        }
        Ok(diagnostics)
    }
}

/// Reconcile heuristic candidates with a validation verdict.
///
/// A verdict of "no issues" clears the function's candidates. Otherwise
/// only confirmed candidates survive, enriched with the model's
/// description and score.
fn apply_verdict(candidates: Vec<Issue>, verdict: &Verdict) -> Vec<Issue> {
    if !verdict.has_issues {
        return Vec::new();
    }
    let mut confirmed = Vec::new();
    for mut candidate in candidates {
        if let Some(found) = verdict
            .issues
            .iter()
            .find(|issue| issue.issue_id == candidate.id)
        {
            candidate.message = match &found.suggestion {
                Some(suggestion) => format!("{} {suggestion}", found.description),
                None => found.description.clone(),
            };
            candidate.score = found.score;
            candidate.severity = found.effective_severity();
            confirmed.push(candidate);
        }
    }
    confirmed
}

fn issue_to_diagnostic(issue: Issue) -> Diagnostic {
    Diagnostic::new(
        issue.range(),
        issue.message.clone(),
        issue.severity,
        RuleCode::NPlusOneQuery,
    )
    .with_issue_data(issue.id, issue.score)
}
