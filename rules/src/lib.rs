//! Naming-convention rule engine.
//!
//! Stateless: every entry point takes the symbol and the resolved
//! settings explicitly. The engine never errors for a well-formed
//! symbol — unrecognized kinds are skipped, reserved symbols are
//! exempt, and each rule is a pure function.

mod naming;
mod tasks;
mod verbs;

pub use naming::{
    Violation, check_boolean_name, check_dictionary_key, check_function, check_name_length,
    check_variable, has_negative_pattern, is_boolean_value,
};
pub use tasks::check_task;
pub use verbs::starts_with_verb;

use djalint_config::AnalysisSettings;
use djalint_types::{Diagnostic, Severity, Symbol, SymbolKind};

/// Naming rules surface as warnings; they are conventions, not defects.
const RULE_SEVERITY: Severity = Severity::Warning;

impl Violation {
    fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::new(self.range, self.message, RULE_SEVERITY, self.code)
    }
}

/// Run every applicable rule against one symbol.
///
/// Dispatches on kind: variables and field assignments get the variable
/// rules, function-likes get the function and task rules, dictionary
/// keys get the per-key rules. Everything else is skipped.
#[must_use]
pub fn evaluate_symbol(symbol: &Symbol, settings: &AnalysisSettings) -> Vec<Diagnostic> {
    if symbol.is_reserved {
        return Vec::new();
    }

    let mut violations: Vec<Violation> = Vec::new();
    match &symbol.kind {
        SymbolKind::Variable
        | SymbolKind::Assignment
        | SymbolKind::ModelField
        | SymbolKind::SerializerField
        | SymbolKind::ForLoopTarget => {
            violations.extend(check_variable(symbol, settings));
        }
        SymbolKind::Function | SymbolKind::Method => {
            violations.extend(check_function(symbol, settings));
            violations.extend(check_task(symbol, settings));
        }
        SymbolKind::DictionaryKey => {
            violations.extend(check_dictionary_key(symbol, settings));
        }
        SymbolKind::Class | SymbolKind::List | SymbolKind::Other(_) => {}
    }

    violations
        .into_iter()
        .map(Violation::into_diagnostic)
        .collect()
}

/// Run the rule engine over a whole symbol pass.
#[must_use]
pub fn evaluate_symbols(symbols: &[Symbol], settings: &AnalysisSettings) -> Vec<Diagnostic> {
    symbols
        .iter()
        .flat_map(|symbol| evaluate_symbol(symbol, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use djalint_types::{Range, RuleCode};

    fn settings() -> AnalysisSettings {
        AnalysisSettings::default()
    }

    fn symbol(kind: SymbolKind, name: &str, value: Option<&str>) -> Symbol {
        Symbol {
            kind,
            name: name.to_string(),
            range: Range::on_line(1, 0, name.len() as u32),
            value: value.map(str::to_string),
            decorators: vec![],
            body_lines: vec![],
            is_reserved: false,
            arguments: vec![],
            calls: vec![],
        }
    }

    #[test]
    fn reserved_symbols_are_skipped() {
        let mut sym = symbol(SymbolKind::Variable, "x", None);
        sym.is_reserved = true;
        assert!(evaluate_symbol(&sym, &settings()).is_empty());
    }

    #[test]
    fn unknown_kinds_are_skipped() {
        let sym = symbol(SymbolKind::Other("comprehension".to_string()), "x", None);
        assert!(evaluate_symbol(&sym, &settings()).is_empty());
    }

    #[test]
    fn boolean_variable_yields_diagnostic() {
        let sym = symbol(SymbolKind::Variable, "flag", Some("True"));
        let diags = evaluate_symbol(&sym, &settings());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), RuleCode::BooleanNoPrefix);
        assert_eq!(diags[0].severity(), Severity::Warning);
        assert_eq!(diags[0].source(), "djalint");
    }

    #[test]
    fn task_function_can_yield_multiple_diagnostics() {
        let mut sym = symbol(SymbolKind::Function, "send_report", None);
        sym.decorators = vec!["shared_task".to_string()];
        let diags = evaluate_symbol(&sym, &settings());
        let codes: Vec<RuleCode> = diags.iter().map(Diagnostic::code).collect();
        assert!(codes.contains(&RuleCode::TaskMissingDecorators));
        assert!(codes.contains(&RuleCode::TaskMissingCalls));
    }

    #[test]
    fn evaluate_symbols_flattens_all_findings() {
        let symbols = vec![
            symbol(SymbolKind::Variable, "flag", Some("True")),
            symbol(SymbolKind::Variable, "is_ready", Some("True")),
            symbol(SymbolKind::Function, "x", None),
        ];
        let diags = evaluate_symbols(&symbols, &settings());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn engine_is_deterministic() {
        let symbols = vec![
            symbol(SymbolKind::Variable, "ab", None),
            symbol(SymbolKind::Function, "user_data", None),
        ];
        let first = evaluate_symbols(&symbols, &settings());
        let second = evaluate_symbols(&symbols, &settings());
        assert_eq!(first, second);
    }
}
