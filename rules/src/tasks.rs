//! Framework-specific rule for async task functions.
//!
//! A function decorated with a recognized task decorator (Celery-style)
//! must also opt into the retry machinery: the `bind` and `autoretry_for`
//! decorator options and an explicit `self.retry` call. The messages
//! enumerate exactly which pieces are missing so the fix is mechanical.

use djalint_config::AnalysisSettings;
use djalint_types::{RuleCode, Symbol};

use crate::naming::Violation;

/// Decorators that mark a function as an async task.
const TASK_DECORATORS: &[&str] = &["shared_task", "app.task", "celery.task", "task"];

/// Decorator options a task must carry.
const REQUIRED_DECORATOR_OPTIONS: &[&str] = &["bind", "autoretry_for"];

/// Calls a task body must make.
const REQUIRED_CALLS: &[&str] = &["self.retry"];

fn is_task(symbol: &Symbol) -> bool {
    symbol.decorators.iter().any(|decorator| {
        TASK_DECORATORS
            .iter()
            .any(|known| decorator == known || decorator.starts_with(&format!("{known}(")))
    })
}

/// Check a function-like symbol for the task conventions.
///
/// Returns at most one violation per aspect; decorator problems are
/// reported before call problems.
#[must_use]
pub fn check_task(symbol: &Symbol, _settings: &AnalysisSettings) -> Vec<Violation> {
    if !is_task(symbol) {
        return Vec::new();
    }

    let mut violations = Vec::new();

    let decorator_text = symbol.decorators.join(" ");
    let missing_options: Vec<&str> = REQUIRED_DECORATOR_OPTIONS
        .iter()
        .copied()
        .filter(|option| !decorator_text.contains(option))
        .collect();
    if !missing_options.is_empty() {
        violations.push(Violation {
            code: RuleCode::TaskMissingDecorators,
            message: format!(
                "Task '{}' is missing required decorator options: {}.",
                symbol.name,
                missing_options.join(", ")
            ),
            range: symbol.range,
        });
    }

    let missing_calls: Vec<&str> = REQUIRED_CALLS
        .iter()
        .copied()
        .filter(|required| !symbol.calls.iter().any(|call| call.contains(*required)))
        .collect();
    if !missing_calls.is_empty() {
        violations.push(Violation {
            code: RuleCode::TaskMissingCalls,
            message: format!(
                "Task '{}' is missing required calls: {}.",
                symbol.name,
                missing_calls.join(", ")
            ),
            range: symbol.range,
        });
    }

    violations
}
