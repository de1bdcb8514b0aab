//! N+1 candidate issues and their structural dedup key.

use serde::{Deserialize, Serialize};

use crate::{Severity, diagnostic::Range};

/// Classification of the pattern that triggered a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Dotted attribute access suggestive of relation traversal.
    AttributeAccess,
    /// Direct queryset method call such as `.filter(` or `.all(`.
    QueryMethod,
    /// Aggregate function usage (`Count`, `Sum`, ...).
    AggregateMethod,
    /// Bulk write operation.
    Write,
}

impl QueryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributeAccess => "attribute_access",
            Self::QueryMethod => "query_method",
            Self::AggregateMethod => "aggregate_method",
            Self::Write => "write",
        }
    }
}

/// Context captured at detection time, used for scoring and dedup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueContext {
    pub query_type: QueryType,
    pub related_field: Option<String>,
    pub is_in_loop: bool,
    pub loop_start_line: Option<u32>,
    pub is_bulk_operation: bool,
}

/// Structural dedup key for candidate issues.
///
/// Derived only from structurally stable fields so that re-running
/// analysis on unchanged code yields the same key and therefore the same
/// cached decision. Never derive this from the message or the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub line: u32,
    pub col: u32,
    pub query_type: QueryType,
    pub is_in_loop: bool,
}

/// An unconfirmed N+1 finding produced by the lexical heuristics,
/// optionally confirmed and enriched by the LLM pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub start_line: u32,
    pub end_line: u32,
    pub col: u32,
    pub end_col: u32,
    pub message: String,
    /// 0–100 confidence score.
    pub score: u8,
    pub severity: Severity,
    pub context: IssueContext,
}

impl Issue {
    /// The structural key used for deduplication.
    #[must_use]
    pub fn key(&self) -> IssueKey {
        IssueKey {
            line: self.start_line,
            col: self.col,
            query_type: self.context.query_type,
            is_in_loop: self.context.is_in_loop,
        }
    }

    /// Source span of the issue (loop start through the flagged line for
    /// attribute-access candidates, a single line otherwise).
    #[must_use]
    pub fn range(&self) -> Range {
        Range {
            start: crate::Position::new(self.start_line, self.col),
            end: crate::Position::new(self.end_line, self.end_col),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_issue(score: u8, query_type: QueryType) -> Issue {
        Issue {
            id: "issue-1".to_string(),
            start_line: 4,
            end_line: 6,
            col: 8,
            end_col: 30,
            message: "Potential N+1 query".to_string(),
            score,
            severity: Severity::from_score(score),
            context: IssueContext {
                query_type,
                related_field: Some("user.profile".to_string()),
                is_in_loop: true,
                loop_start_line: Some(4),
                is_bulk_operation: false,
            },
        }
    }

    #[test]
    fn key_ignores_score_and_message() {
        let a = make_issue(40, QueryType::QueryMethod);
        let mut b = make_issue(95, QueryType::QueryMethod);
        b.message = "different".to_string();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn key_distinguishes_query_type() {
        let a = make_issue(40, QueryType::QueryMethod);
        let b = make_issue(40, QueryType::AttributeAccess);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn range_spans_detection_window() {
        let issue = make_issue(40, QueryType::AttributeAccess);
        let range = issue.range();
        assert_eq!(range.start.line, 4);
        assert_eq!(range.end.line, 6);
    }

    #[test]
    fn query_type_serializes_snake_case() {
        let json = serde_json::to_string(&QueryType::AttributeAccess).unwrap();
        assert_eq!(json, "\"attribute_access\"");
    }
}
