//! Quick-fix code actions derived from diagnostics.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use djalint_types::{Diagnostic, Position, Range, RuleCode};

/// A proposed edit replacing the text under `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    QuickFix,
    ReportFalsePositive,
    Ignore,
}

/// One action offered against a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub kind: ActionKind,
    pub edit: Option<TextEdit>,
    /// For N+1 actions, the originating issue id carried for feedback.
    pub issue_id: Option<String>,
}

/// Cache key for computed actions. Message plus start position is enough
/// to distinguish diagnostics within one document snapshot.
type ActionKey = (String, u32, u32);

/// Supplies a rename suggestion when no deterministic transform exists.
///
/// Implementations may go to the network; results are cached by the
/// provider so each diagnostic pays for at most one consultation.
pub trait NameSuggester: Send + Sync {
    fn suggest(
        &self,
        name: &str,
        message: &str,
    ) -> impl Future<Output = Option<String>> + Send;
}

/// A suggester that never suggests, for callers without an API token.
pub struct NoSuggestions;

impl NameSuggester for NoSuggestions {
    async fn suggest(&self, _name: &str, _message: &str) -> Option<String> {
        None
    }
}

/// Computes and caches code actions per diagnostic.
///
/// Boolean naming fixes are deterministic string transforms. The other
/// naming rules have no mechanical fix, so those fall through to the
/// [`NameSuggester`]; either way the computed actions are cached under
/// the diagnostic's key.
#[derive(Default)]
pub struct CodeActionProvider {
    cache: Mutex<HashMap<ActionKey, Vec<CodeAction>>>,
}

impl CodeActionProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn actions_for(&self, diagnostic: &Diagnostic) -> Vec<CodeAction> {
        let start = diagnostic.range().start;
        let key: ActionKey = (diagnostic.message().to_string(), start.line, start.col);
        if let Ok(cache) = self.cache.lock()
            && let Some(actions) = cache.get(&key)
        {
            return actions.clone();
        }
        let actions = compute_actions(diagnostic);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, actions.clone());
        }
        actions
    }

    /// Like [`actions_for`](Self::actions_for), but consults `suggester`
    /// for naming rules that have no deterministic transform.
    pub async fn actions_with_suggestions(
        &self,
        diagnostic: &Diagnostic,
        suggester: &impl NameSuggester,
    ) -> Vec<CodeAction> {
        let start = diagnostic.range().start;
        let key: ActionKey = (diagnostic.message().to_string(), start.line, start.col);
        if let Ok(cache) = self.cache.lock()
            && let Some(actions) = cache.get(&key)
        {
            return actions.clone();
        }

        let mut actions = compute_actions(diagnostic);
        if actions.is_empty()
            && matches!(
                diagnostic.code(),
                RuleCode::NameTooShort | RuleCode::FunctionNameNoVerb
            )
            && let Some(name) = quoted_name(diagnostic.message())
            && let Some(replacement) = suggester.suggest(name, diagnostic.message()).await
        {
            let edit_range = Range {
                start,
                end: Position::new(start.line, start.col + name.chars().count() as u32),
            };
            actions.push(CodeAction {
                title: format!("Rename to '{replacement}'"),
                kind: ActionKind::QuickFix,
                edit: Some(TextEdit {
                    range: edit_range,
                    new_text: replacement,
                }),
                issue_id: None,
            });
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, actions.clone());
        }
        actions
    }

    /// Drop cached actions, e.g. when the document changes.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

fn compute_actions(diagnostic: &Diagnostic) -> Vec<CodeAction> {
    match diagnostic.code() {
        RuleCode::BooleanNegativePattern => rename_action(diagnostic, invert_negative_name),
        RuleCode::BooleanNoPrefix => rename_action(diagnostic, add_boolean_prefix),
        RuleCode::NPlusOneQuery => nplusone_actions(diagnostic),
        _ => Vec::new(),
    }
}

fn rename_action(
    diagnostic: &Diagnostic,
    transform: fn(&str) -> Option<String>,
) -> Vec<CodeAction> {
    let Some(name) = quoted_name(diagnostic.message()) else {
        return Vec::new();
    };
    let Some(replacement) = transform(name) else {
        return Vec::new();
    };
    let start = diagnostic.range().start;
    let edit_range = Range {
        start,
        end: Position::new(start.line, start.col + name.chars().count() as u32),
    };
    vec![CodeAction {
        title: format!("Rename to '{replacement}'"),
        kind: ActionKind::QuickFix,
        edit: Some(TextEdit {
            range: edit_range,
            new_text: replacement,
        }),
        issue_id: None,
    }]
}

fn nplusone_actions(diagnostic: &Diagnostic) -> Vec<CodeAction> {
    let issue_id = diagnostic.issue_data().map(|data| data.id.clone());
    let mut actions = Vec::new();
    if let Some(id) = &issue_id {
        actions.push(CodeAction {
            title: "Report as false positive".to_string(),
            kind: ActionKind::ReportFalsePositive,
            edit: None,
            issue_id: Some(id.clone()),
        });
    }
    actions.push(CodeAction {
        title: "Ignore this query warning".to_string(),
        kind: ActionKind::Ignore,
        edit: None,
        issue_id,
    });
    actions
}

/// The offending identifier, as quoted in every rule message.
fn quoted_name(message: &str) -> Option<&str> {
    let start = message.find('\'')? + 1;
    let len = message[start..].find('\'')?;
    let name = &message[start..start + len];
    if name.is_empty() { None } else { Some(name) }
}

/// `is_not_active` -> `is_active`, `not_ready` -> `is_ready`,
/// `no_cache` -> `has_cache`. Returns `None` when no token matches,
/// which should not happen for a diagnostic that fired.
fn invert_negative_name(name: &str) -> Option<String> {
    let tokens: Vec<&str> = name.split('_').collect();
    if tokens.iter().any(|t| *t == "not" || *t == "never") {
        let kept: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|t| *t != "not" && *t != "never")
            .collect();
        let mut result = kept.join("_");
        if !has_any_prefix(&result) {
            result = format!("is_{result}");
        }
        return Some(result);
    }
    if tokens.first() == Some(&"no") {
        return Some(format!("has_{}", tokens[1..].join("_")));
    }
    None
}

fn add_boolean_prefix(name: &str) -> Option<String> {
    if has_any_prefix(name) {
        return None;
    }
    let stripped = name.trim_start_matches('_');
    let underscores = &name[..name.len() - stripped.len()];
    Some(format!("{underscores}is_{stripped}"))
}

fn has_any_prefix(name: &str) -> bool {
    let stripped = name.trim_start_matches('_');
    ["is_", "has_", "should_", "can_", "does_"]
        .iter()
        .any(|prefix| stripped.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use djalint_types::Severity;

    fn diag(code: RuleCode, message: &str) -> Diagnostic {
        Diagnostic::new(
            Range::on_line(4, 8, 8 + 10),
            message.to_string(),
            Severity::Warning,
            code,
        )
    }

    #[test]
    fn negative_name_inversion() {
        assert_eq!(
            invert_negative_name("is_not_active").as_deref(),
            Some("is_active")
        );
        assert_eq!(invert_negative_name("not_ready").as_deref(), Some("is_ready"));
        assert_eq!(invert_negative_name("no_cache").as_deref(), Some("has_cache"));
        assert_eq!(
            invert_negative_name("never_fails").as_deref(),
            Some("is_fails")
        );
    }

    #[test]
    fn prefix_insertion_preserves_leading_underscores() {
        assert_eq!(add_boolean_prefix("active").as_deref(), Some("is_active"));
        assert_eq!(add_boolean_prefix("_ready").as_deref(), Some("_is_ready"));
        assert_eq!(add_boolean_prefix("is_active"), None);
    }

    #[test]
    fn negative_pattern_diagnostic_gets_a_rename() {
        let diagnostic = diag(
            RuleCode::BooleanNegativePattern,
            "Boolean 'is_not_active' uses negative phrasing.",
        );
        let actions = compute_actions(&diagnostic);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Rename to 'is_active'");
        let edit = actions[0].edit.as_ref().unwrap();
        assert_eq!(edit.new_text, "is_active");
        // Edit covers exactly the original identifier.
        assert_eq!(edit.range.start, Position::new(4, 8));
        assert_eq!(edit.range.end, Position::new(4, 8 + 13));
    }

    #[test]
    fn missing_prefix_diagnostic_gets_a_rename() {
        let diagnostic = diag(
            RuleCode::BooleanNoPrefix,
            "Boolean 'flag' should start with one of: is, has.",
        );
        let actions = compute_actions(&diagnostic);
        assert_eq!(actions[0].edit.as_ref().unwrap().new_text, "is_flag");
    }

    #[test]
    fn nplusone_diagnostic_offers_feedback_actions() {
        let diagnostic = Diagnostic::new(
            Range::on_line(2, 0, 20),
            "Potential N+1 query".to_string(),
            Severity::Warning,
            RuleCode::NPlusOneQuery,
        )
        .with_issue_data("issue-9".to_string(), 70);
        let actions = compute_actions(&diagnostic);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, ActionKind::ReportFalsePositive);
        assert_eq!(actions[0].issue_id.as_deref(), Some("issue-9"));
        assert_eq!(actions[1].kind, ActionKind::Ignore);
    }

    #[test]
    fn unfixable_codes_yield_no_actions() {
        let diagnostic = diag(RuleCode::NameTooShort, "Name 'ab' is too short.");
        assert!(compute_actions(&diagnostic).is_empty());
    }

    struct CountingSuggester(std::sync::atomic::AtomicUsize);

    impl NameSuggester for CountingSuggester {
        async fn suggest(&self, _name: &str, _message: &str) -> Option<String> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Some("fetch_user_records".to_string())
        }
    }

    #[tokio::test]
    async fn suggester_fills_in_non_deterministic_renames_once() {
        let provider = CodeActionProvider::new();
        let suggester = CountingSuggester(std::sync::atomic::AtomicUsize::new(0));
        let diagnostic = diag(
            RuleCode::FunctionNameNoVerb,
            "Function name 'user_data' should start with a verb describing what it does.",
        );

        let first = provider
            .actions_with_suggestions(&diagnostic, &suggester)
            .await;
        let second = provider
            .actions_with_suggestions(&diagnostic, &suggester)
            .await;
        assert_eq!(first, second);
        assert_eq!(first[0].title, "Rename to 'fetch_user_records'");
        // Cached after the first consultation.
        assert_eq!(suggester.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn suggester_is_not_consulted_for_deterministic_fixes() {
        let provider = CodeActionProvider::new();
        let suggester = CountingSuggester(std::sync::atomic::AtomicUsize::new(0));
        let diagnostic = diag(
            RuleCode::BooleanNoPrefix,
            "Boolean 'flag' should start with one of: is.",
        );
        let actions = provider
            .actions_with_suggestions(&diagnostic, &suggester)
            .await;
        assert_eq!(actions[0].edit.as_ref().unwrap().new_text, "is_flag");
        assert_eq!(suggester.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn provider_caches_by_message_and_position() {
        let provider = CodeActionProvider::new();
        let diagnostic = diag(
            RuleCode::BooleanNoPrefix,
            "Boolean 'flag' should start with one of: is.",
        );
        let first = provider.actions_for(&diagnostic);
        let second = provider.actions_for(&diagnostic);
        assert_eq!(first, second);
        provider.clear();
        assert_eq!(provider.actions_for(&diagnostic), first);
    }
}
