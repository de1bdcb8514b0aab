//! Confidence scoring for N+1 candidates.
//!
//! Scores are additive weights clamped to 0–100 and mapped to severity
//! through [`Severity::from_score`]. The weights come from the original
//! analyzer's scoring table.

use djalint_types::{Issue, QueryType, Severity};

const MAX_SCORE: u8 = 100;

/// Weight applied when the pattern was found inside a loop.
const WEIGHT_IN_LOOP: u8 = 40;
/// Weight for an explicit queryset method call.
const WEIGHT_QUERY_METHOD: u8 = 30;
/// Weight when the candidate spans more than one line.
const WEIGHT_MULTI_LINE: u8 = 15;
/// Weight for aggregate function usage.
const WEIGHT_AGGREGATE: u8 = 25;

/// Compute the score and severity for a candidate in place.
pub fn score_issue(issue: &mut Issue) {
    let mut score: u16 = 0;

    if issue.context.is_in_loop {
        score += u16::from(WEIGHT_IN_LOOP);
    }
    if issue.context.query_type == QueryType::QueryMethod {
        score += u16::from(WEIGHT_QUERY_METHOD);
    }
    if issue.end_line > issue.start_line {
        score += u16::from(WEIGHT_MULTI_LINE);
    }
    if issue.context.query_type == QueryType::AggregateMethod {
        score += u16::from(WEIGHT_AGGREGATE);
    }
    // Bulk operations are the optimized path; they stay informational.
    if issue.context.is_bulk_operation {
        score = score.saturating_sub(u16::from(WEIGHT_QUERY_METHOD));
    }

    issue.score = score.min(u16::from(MAX_SCORE)) as u8;
    issue.severity = Severity::from_score(issue.score);
}
