//! Lexical N+1 heuristics over a function body.
//!
//! A line scanner tracks loop membership and whether a query-optimizing
//! call has been seen since loop entry. Three independent checks fire
//! per line: related-field attribute access inside an unoptimized loop,
//! queryset method calls inside a loop, and aggregate usage anywhere.
//! This pass is pure pattern matching; it never calls the network and
//! never blocks. Precision is deliberately loose — the LLM confirmation
//! pass filters false positives.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use djalint_types::{BodyLine, Issue, IssueContext, QueryType, Severity, Symbol};

use crate::scorer::score_issue;

/// Queryset methods whose presence inside a loop suggests one query per
/// iteration.
const QUERY_METHODS: &[&str] = &[
    ".all(", ".filter(", ".get(", ".count(", ".exists(", ".first(", ".last(",
];

/// Aggregate functions; misuse is flagged independently of loops.
const AGGREGATE_METHODS: &[&str] = &["Count(", "Sum(", "Avg(", "Max(", "Min("];

/// Bulk write methods; these are the optimized path.
const BULK_METHODS: &[&str] = &[".bulk_create(", ".bulk_update("];

/// Dotted attribute chains of depth three or more, suggestive of
/// relation traversal (`user.profile.email`).
static RELATED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z_]\w*(?:\.[A-Za-z_]\w*){2,}").expect("related field regex is valid")
});

struct LoopState {
    start_line: u32,
    indent: usize,
    has_select_related: bool,
    has_prefetch_related: bool,
}

/// Scan one function-like symbol for N+1 candidates.
///
/// Candidates are scored but not deduplicated; callers run
/// [`crate::dedupe`] before surfacing anything.
#[must_use]
pub fn scan_function(symbol: &Symbol) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut state: Option<LoopState> = None;

    for line in &symbol.body_lines {
        // Blank lines and dedents close the current loop scope.
        if let Some(current) = &state
            && (line.is_blank() || (!line.is_blank() && line.indent() <= current.indent))
        {
            state = None;
        }

        let trimmed = line.content.trim_start();
        if trimmed.starts_with("for ") || trimmed.starts_with("while ") {
            // An optimizer call on the loop header itself counts for the
            // whole loop body.
            state = Some(LoopState {
                start_line: line.absolute_line,
                indent: line.indent(),
                has_select_related: line.content.contains("select_related("),
                has_prefetch_related: line.content.contains("prefetch_related("),
            });
            continue;
        }

        if let Some(current) = &mut state {
            if line.content.contains("select_related(") {
                current.has_select_related = true;
            }
            if line.content.contains("prefetch_related(") {
                current.has_prefetch_related = true;
            }
        }

        let is_bulk = BULK_METHODS.iter().any(|m| line.content.contains(m));

        check_related_field_access(line, state.as_ref(), is_bulk, &mut issues);
        check_query_methods(line, state.as_ref(), is_bulk, &mut issues);
        check_aggregates(line, state.as_ref(), is_bulk, &mut issues);
    }

    for issue in &mut issues {
        score_issue(issue);
    }
    tracing::debug!(
        function = %symbol.name,
        candidates = issues.len(),
        "N+1 heuristic pass complete"
    );
    issues
}

/// Check 1: relation traversal inside a loop with no optimizer call seen
/// since loop entry. The candidate spans loop start to the current line.
fn check_related_field_access(
    line: &BodyLine,
    state: Option<&LoopState>,
    is_bulk: bool,
    issues: &mut Vec<Issue>,
) {
    let Some(current) = state else { return };
    if current.has_select_related || current.has_prefetch_related {
        return;
    }
    for found in RELATED_FIELD.find_iter(&line.content) {
        // A trailing call parenthesis means this is a method chain, which
        // the query-method check owns.
        if line.content[found.end()..].starts_with('(') {
            continue;
        }
        issues.push(make_issue(
            current.start_line,
            line.absolute_line,
            found.start() as u32,
            found.end() as u32,
            format!("Potential N+1 query detected: {}", found.as_str()),
            IssueContext {
                query_type: QueryType::AttributeAccess,
                related_field: Some(found.as_str().to_string()),
                is_in_loop: true,
                loop_start_line: Some(current.start_line),
                is_bulk_operation: is_bulk,
            },
        ));
    }
}

/// Check 2: queryset method calls inside a loop.
fn check_query_methods(
    line: &BodyLine,
    state: Option<&LoopState>,
    is_bulk: bool,
    issues: &mut Vec<Issue>,
) {
    let Some(current) = state else { return };
    for method in QUERY_METHODS {
        if let Some(pos) = line.content.find(method) {
            issues.push(make_issue(
                line.absolute_line,
                line.absolute_line,
                pos as u32,
                (pos + method.len()) as u32,
                format!(
                    "Query method '{}' called inside a loop; each iteration may hit the database.",
                    method.trim_start_matches('.').trim_end_matches('(')
                ),
                IssueContext {
                    query_type: QueryType::QueryMethod,
                    related_field: None,
                    is_in_loop: true,
                    loop_start_line: Some(current.start_line),
                    is_bulk_operation: is_bulk,
                },
            ));
        }
    }
}

/// Check 3: aggregate usage, flagged regardless of loop membership.
fn check_aggregates(
    line: &BodyLine,
    state: Option<&LoopState>,
    is_bulk: bool,
    issues: &mut Vec<Issue>,
) {
    for method in AGGREGATE_METHODS {
        if let Some(pos) = line.content.find(method) {
            issues.push(make_issue(
                line.absolute_line,
                line.absolute_line,
                pos as u32,
                (pos + method.len()) as u32,
                format!(
                    "Aggregate '{}' used here; verify it runs once per queryset, not per row.",
                    method.trim_end_matches('(')
                ),
                IssueContext {
                    query_type: QueryType::AggregateMethod,
                    related_field: None,
                    is_in_loop: state.is_some(),
                    loop_start_line: state.map(|s| s.start_line),
                    is_bulk_operation: is_bulk,
                },
            ));
        }
    }
}

fn make_issue(
    start_line: u32,
    end_line: u32,
    col: u32,
    end_col: u32,
    message: String,
    context: IssueContext,
) -> Issue {
    Issue {
        id: Uuid::new_v4().to_string(),
        start_line,
        end_line,
        col,
        end_col,
        message,
        score: 0,
        severity: Severity::Hint,
        context,
    }
}
