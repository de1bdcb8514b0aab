//! Parsed code units produced by the symbol extraction bridge.
//!
//! Symbols are produced once per analysis pass, are immutable, and are
//! discarded when the pass completes — only derived diagnostics persist.
//! The serde shapes here match the JSON emitted by the external Python
//! parser scripts.

use serde::{Deserialize, Serialize};

use crate::diagnostic::Range;

/// Kind of a parsed code unit.
///
/// Unrecognized kinds deserialize to [`SymbolKind::Other`] so a newer
/// parser script never breaks an older engine; the rule engine simply
/// skips kinds it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Variable,
    Assignment,
    Class,
    DictionaryKey,
    List,
    ForLoopTarget,
    ModelField,
    SerializerField,
    #[serde(untagged)]
    Other(String),
}

impl SymbolKind {
    /// Function-like symbols carry a body and are eligible for N+1 analysis.
    #[must_use]
    pub fn is_function_like(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

/// One line of a function body, with its absolute position in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyLine {
    pub absolute_line: u32,
    pub content: String,
    #[serde(default)]
    pub start_col: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl BodyLine {
    #[must_use]
    pub fn new(absolute_line: u32, content: impl Into<String>) -> Self {
        let content = content.into();
        let end_col = content.len() as u32;
        Self {
            absolute_line,
            content,
            start_col: 0,
            end_col,
        }
    }

    /// Leading-whitespace width, the dedent boundary the N+1 scanner uses.
    #[must_use]
    pub fn indent(&self) -> usize {
        self.content.len() - self.content.trim_start().len()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// One parsed code unit from the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub range: Range,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub body_lines: Vec<BodyLine>,
    /// Reserved names (framework hooks, dunder methods) skip validation.
    #[serde(default)]
    pub is_reserved: bool,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub calls: Vec<String>,
}

impl Symbol {
    /// Full body text, used as the content-hash input for the LLM cache.
    #[must_use]
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        for line in &self.body_lines {
            text.push_str(&line.content);
            text.push('\n');
        }
        text
    }
}
