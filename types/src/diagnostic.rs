//! Positioned, severity-ranked findings surfaced to the editor layer.

use serde::{Deserialize, Serialize};

use crate::RuleCode;

/// A 0-indexed line/column position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A half-open source span from `start` to `end`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Single-line range from `col` to `end_col` on `line`.
    #[must_use]
    pub fn on_line(line: u32, col: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(line, col),
            end: Position::new(line, end_col),
        }
    }
}

/// Severity level for a diagnostic, LSP-compatible ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl Severity {
    /// Map a 0–100 confidence score to a severity.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::Error,
            60..=89 => Self::Warning,
            30..=59 => Self::Information,
            _ => Self::Hint,
        }
    }

    /// Whether this severity is at least as severe as `threshold`.
    ///
    /// Error is the most severe; the LSP numeric encoding is inverted
    /// relative to severity, so the comparison flips.
    #[must_use]
    pub fn at_least(self, threshold: Self) -> bool {
        (self as u8) <= (threshold as u8)
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// Traceability payload linking an N+1 diagnostic back to its Issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueData {
    pub id: String,
    pub score: u8,
}

/// A single finding produced by the rule engine or the N+1 detector.
///
/// Value object: cache entries own sequences of these. Construction goes
/// through [`Diagnostic::new`]; the `source` label and doc link are
/// resolved from the rule code at that boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    range: Range,
    message: String,
    severity: Severity,
    source: String,
    code: RuleCode,
    doc_link: Option<String>,
    issue_data: Option<IssueData>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(range: Range, message: String, severity: Severity, code: RuleCode) -> Self {
        Self {
            range,
            message,
            severity,
            source: crate::DIAGNOSTIC_SOURCE.to_string(),
            code,
            doc_link: code.doc_link().map(str::to_string),
            issue_data: None,
        }
    }

    /// Attach the originating issue id and score (N+1 findings only).
    #[must_use]
    pub fn with_issue_data(mut self, id: String, score: u8) -> Self {
        self.issue_data = Some(IssueData { id, score });
        self
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn code(&self) -> RuleCode {
        self.code
    }

    #[must_use]
    pub fn doc_link(&self) -> Option<&str> {
        self.doc_link.as_deref()
    }

    #[must_use]
    pub fn issue_data(&self) -> Option<&IssueData> {
        self.issue_data.as_ref()
    }

    /// Format as `path:line:col: severity: [CODE] message` (1-indexed).
    #[must_use]
    pub fn display_with_path(&self, path: &std::path::Path) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            path.display(),
            self.range.start.line + 1,
            self.range.start.col + 1,
            self.severity.label(),
            self.code,
            self.message,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_score_thresholds() {
        assert_eq!(Severity::from_score(100), Severity::Error);
        assert_eq!(Severity::from_score(90), Severity::Error);
        assert_eq!(Severity::from_score(89), Severity::Warning);
        assert_eq!(Severity::from_score(60), Severity::Warning);
        assert_eq!(Severity::from_score(59), Severity::Information);
        assert_eq!(Severity::from_score(30), Severity::Information);
        assert_eq!(Severity::from_score(29), Severity::Hint);
        assert_eq!(Severity::from_score(0), Severity::Hint);
    }

    #[test]
    fn severity_at_least_orders_correctly() {
        assert!(Severity::Error.at_least(Severity::Warning));
        assert!(Severity::Warning.at_least(Severity::Warning));
        assert!(!Severity::Hint.at_least(Severity::Warning));
        // Hint threshold admits everything.
        assert!(Severity::Hint.at_least(Severity::Hint));
        assert!(Severity::Error.at_least(Severity::Hint));
    }

    #[test]
    fn diagnostic_resolves_source_and_doc_link() {
        let diag = Diagnostic::new(
            Range::on_line(3, 4, 8),
            "Potential N+1 query".to_string(),
            Severity::Warning,
            RuleCode::NPlusOneQuery,
        );
        assert_eq!(diag.source(), "djalint");
        assert!(diag.doc_link().is_some());
        assert!(diag.issue_data().is_none());
    }

    #[test]
    fn display_with_path_is_one_indexed() {
        let diag = Diagnostic::new(
            Range::on_line(10, 5, 9),
            "name 'x' is too short".to_string(),
            Severity::Warning,
            RuleCode::NameTooShort,
        );
        assert_eq!(
            diag.display_with_path(std::path::Path::new("app/models.py")),
            "app/models.py:11:6: warning: [CDQ02] name 'x' is too short"
        );
    }

    #[test]
    fn with_issue_data_round_trips() {
        let diag = Diagnostic::new(
            Range::on_line(0, 0, 1),
            "m".to_string(),
            Severity::Hint,
            RuleCode::NPlusOneQuery,
        )
        .with_issue_data("abc-123".to_string(), 45);
        let data = diag.issue_data().unwrap();
        assert_eq!(data.id, "abc-123");
        assert_eq!(data.score, 45);
    }
}
