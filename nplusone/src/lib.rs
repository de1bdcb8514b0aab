//! Heuristic N+1 query detection.
//!
//! The detector is the first half of a two-stage design: loose lexical
//! heuristics produce candidates here, and the LLM validation pass
//! (`djalint-llm`) confirms or discards them. Keeping the heuristic
//! imprecise-but-cheap and the confirmation precise-but-expensive is
//! deliberate; do not try to make this pass resolve Django relations.

mod detector;
mod scorer;

pub use detector::scan_function;
pub use scorer::score_issue;

use std::collections::HashMap;

use djalint_types::{Issue, IssueKey};

/// Merge candidates by structural key.
///
/// When two candidates share a key the higher-scoring one wins; ties
/// break on the longer message. Re-analyzing unchanged code therefore
/// never grows the diagnostic count.
#[must_use]
pub fn dedupe(candidates: Vec<Issue>) -> Vec<Issue> {
    let mut merged: HashMap<IssueKey, Issue> = HashMap::new();
    for candidate in candidates {
        let key = candidate.key();
        match merged.get(&key) {
            Some(existing)
                if existing.score > candidate.score
                    || (existing.score == candidate.score
                        && existing.message.len() >= candidate.message.len()) => {}
            _ => {
                merged.insert(key, candidate);
            }
        }
    }
    let mut issues: Vec<Issue> = merged.into_values().collect();
    // HashMap iteration order is arbitrary; sort for deterministic output.
    issues.sort_by_key(|issue| (issue.start_line, issue.col, issue.context.query_type.as_str()));
    issues
}
