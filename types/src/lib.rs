//! Core value types shared across the djalint workspace.
//!
//! Everything here is plain data: symbols extracted from Python source,
//! diagnostics derived from them, and N+1 candidate issues in between.
//! No I/O, no async. The pipeline crates (`djalint-extractor`,
//! `djalint-rules`, `djalint-nplusone`, `djalint-engine`) all speak in
//! these types.

mod cancel;
mod diagnostic;
mod issue;
mod symbol;

pub use cancel::CancelToken;
pub use diagnostic::{Diagnostic, IssueData, Position, Range, Severity};
pub use issue::{Issue, IssueContext, IssueKey, QueryType};
pub use symbol::{BodyLine, Symbol, SymbolKind};

/// Source label attached to every diagnostic we emit.
pub const DIAGNOSTIC_SOURCE: &str = "djalint";

/// Stable rule identifiers, carried on every diagnostic as its `code`.
///
/// The identifiers mirror the rule registry of the analyzer this pipeline
/// feeds: CDQ (code quality), STY (style), and the N+1 performance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RuleCode {
    /// CDQ02 — identifier shorter than the configured minimum.
    NameTooShort,
    /// CDQ03 — function name does not start with a verb.
    FunctionNameNoVerb,
    /// CDQ04 — function body exceeds the configured line limit.
    FunctionTooLong,
    /// STY01 — boolean name lacks a conventional prefix.
    BooleanNoPrefix,
    /// STY02 — boolean name uses a negative pattern.
    BooleanNegativePattern,
    /// Task function missing required decorators.
    TaskMissingDecorators,
    /// Task function missing required retry/ack calls.
    TaskMissingCalls,
    /// Potential N+1 query.
    NPlusOneQuery,
}

impl RuleCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameTooShort => "CDQ02",
            Self::FunctionNameNoVerb => "CDQ03",
            Self::FunctionTooLong => "CDQ04",
            Self::BooleanNoPrefix => "STY01",
            Self::BooleanNegativePattern => "STY02",
            Self::TaskMissingDecorators => "CDQ08",
            Self::TaskMissingCalls => "CDQ09",
            Self::NPlusOneQuery => "PERF01",
        }
    }

    /// Parse a stable identifier back into a rule code.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CDQ02" => Some(Self::NameTooShort),
            "CDQ03" => Some(Self::FunctionNameNoVerb),
            "CDQ04" => Some(Self::FunctionTooLong),
            "STY01" => Some(Self::BooleanNoPrefix),
            "STY02" => Some(Self::BooleanNegativePattern),
            "CDQ08" => Some(Self::TaskMissingDecorators),
            "CDQ09" => Some(Self::TaskMissingCalls),
            "PERF01" => Some(Self::NPlusOneQuery),
            _ => None,
        }
    }

    /// Documentation link for the rule, if one exists.
    #[must_use]
    pub fn doc_link(self) -> Option<&'static str> {
        match self {
            Self::NPlusOneQuery => {
                Some("https://docs.djangoproject.com/en/stable/topics/db/optimization/")
            }
            _ => None,
        }
    }
}

impl core::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
