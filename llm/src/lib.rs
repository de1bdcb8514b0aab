//! LLM validation client for N+1 candidates.
//!
//! The lexical detector over-reports by design; this client sends each
//! flagged function to the validation service once and keeps only the
//! issues the model confirms. Verdicts are cached by content hash of the
//! function body (`ResultCache`) so unchanged code never pays for a
//! second network round trip within the TTL.

mod cache;

pub use cache::{DEFAULT_TTL, ResultCache, content_key};

use serde::{Deserialize, Serialize};

use djalint_types::{CancelToken, Issue, Severity};

/// Instruction prefix sent with every validation request.
const SYSTEM_MESSAGE: &str = "You are an expert Django performance reviewer. \
You are given a Python function and a list of potential N+1 query issues \
found by static heuristics. Confirm only the issues that would cause \
repeated database queries at runtime, and discard false positives.";

const VALIDATION_PATH: &str = "/chat/nplusone/";

/// Failure modes of one validation call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// 400: the service rejected the request payload.
    #[error("validation service rejected the request")]
    InvalidInput,
    /// 401: the api token was missing or invalid.
    #[error("validation service rejected the api token")]
    Unauthorized,
    /// 429: quota exhausted. Callers suppress further calls this session.
    #[error("validation service rate limit reached")]
    RateLimited,
    /// 500: service-side failure.
    #[error("validation service failed upstream")]
    Upstream,
    #[error("validation service returned unexpected status {status}")]
    Unexpected { status: u16 },
    #[error("validation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("validation cancelled")]
    Cancelled,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRequest<'a> {
    system_message: &'a str,
    developer_input: DeveloperInput<'a>,
    api_key: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeveloperInput<'a> {
    function_name: &'a str,
    function_body: &'a str,
    potential_issues: Vec<PotentialIssue<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PotentialIssue<'a> {
    id: &'a str,
    start_line: u32,
    end_line: u32,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    has_n_plus_one_issues: bool,
    #[serde(default)]
    issues: Vec<ConfirmedIssue>,
}

/// An issue the model confirmed, enriched with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedIssue {
    pub issue_id: String,
    pub description: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    /// The exact source snippet the model blames. Must appear verbatim in
    /// the function body or the issue is treated as hallucinated.
    pub problematic_code: String,
    pub start_line: u32,
    pub end_line: u32,
    pub score: u8,
    #[serde(default)]
    pub severity: Option<String>,
}

impl ConfirmedIssue {
    /// Effective severity, recomputed from the score so that the model's
    /// free-text severity label can never outrank its own confidence.
    #[must_use]
    pub fn effective_severity(&self) -> Severity {
        Severity::from_score(self.score)
    }
}

/// Outcome of validating one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub has_issues: bool,
    pub issues: Vec<ConfirmedIssue>,
}

impl Verdict {
    /// The no-issues verdict, used when validation is unavailable.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            has_issues: false,
            issues: Vec::new(),
        }
    }
}

/// HTTP client for the validation service.
pub struct LlmValidator {
    client: reqwest::Client,
    server_url: String,
}

impl LlmValidator {
    #[must_use]
    pub fn new(server_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url,
        }
    }

    /// Validate one function's candidates against the service.
    ///
    /// A missing token is not an error: validation is optional, so the
    /// call degrades to an empty verdict without touching the network.
    pub async fn validate(
        &self,
        function_name: &str,
        function_body: &str,
        candidates: &[Issue],
        token: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Verdict, LlmError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::warn!("No api token configured; skipping N+1 validation");
            return Ok(Verdict::empty());
        };
        if candidates.is_empty() {
            return Ok(Verdict::empty());
        }
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let request = ValidationRequest {
            system_message: SYSTEM_MESSAGE,
            developer_input: DeveloperInput {
                function_name,
                function_body,
                potential_issues: candidates
                    .iter()
                    .map(|issue| PotentialIssue {
                        id: &issue.id,
                        start_line: issue.start_line,
                        end_line: issue.end_line,
                        message: &issue.message,
                    })
                    .collect(),
            },
            api_key: token,
        };

        let endpoint = format!("{}{VALIDATION_PATH}", self.server_url.trim_end_matches('/'));
        tracing::debug!(
            endpoint = %endpoint,
            function = function_name,
            candidates = candidates.len(),
            "Requesting N+1 validation"
        );

        let response = self.client.post(&endpoint).json(&request).send().await?;
        let status = response.status();

        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        if !status.is_success() {
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "Validation call failed");
            return Err(match status.as_u16() {
                400 => LlmError::InvalidInput,
                401 => LlmError::Unauthorized,
                429 => LlmError::RateLimited,
                500 => LlmError::Upstream,
                other => LlmError::Unexpected { status: other },
            });
        }

        let body: ValidationResponse = response.json().await?;
        let verdict = resolve_verdict(body, function_body);
        tracing::debug!(
            function = function_name,
            confirmed = verdict.issues.len(),
            "Validation verdict received"
        );
        Ok(verdict)
    }

    /// Validate with a verdict cache keyed by function body content.
    ///
    /// Cache hits never touch the network. Only successful verdicts are
    /// written back; errors, including cancellation, leave the cache
    /// untouched.
    pub async fn validate_cached(
        &self,
        cache: &ResultCache<Verdict>,
        function_name: &str,
        function_body: &str,
        candidates: &[Issue],
        token: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Verdict, LlmError> {
        let key = content_key(function_body);
        if let Some(verdict) = cache.get(&key) {
            tracing::debug!(function = function_name, "Validation cache hit");
            return Ok(verdict);
        }
        let verdict = self
            .validate(function_name, function_body, candidates, token, cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        cache.insert(key, verdict.clone());
        Ok(verdict)
    }
}

/// Apply the hallucination filter to a raw service response.
///
/// Issues whose `problematic_code` does not appear verbatim in the
/// function body are dropped silently; the model invented them.
fn resolve_verdict(response: ValidationResponse, function_body: &str) -> Verdict {
    let mut issues = Vec::with_capacity(response.issues.len());
    for issue in response.issues {
        if function_body.contains(issue.problematic_code.trim()) {
            issues.push(issue);
        } else {
            tracing::debug!(
                issue_id = issue.issue_id,
                "Dropping confirmed issue whose snippet is not in the source"
            );
        }
    }
    Verdict {
        has_issues: response.has_n_plus_one_issues && !issues.is_empty(),
        issues,
    }
}
