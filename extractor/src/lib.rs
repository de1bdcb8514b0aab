//! Symbol extraction bridge.
//!
//! Python syntax is parsed by an external process — the host language
//! does not natively parse Python, so structural parsing is delegated to
//! a parser script running under the Python interpreter. The bridge owns
//! the subprocess protocol: full document text in on stdin, JSON out on
//! stdout, anything that is not JSON treated as log noise and discarded.
//!
//! Both parser scripts emit the same symbol array; the Django-aware
//! script additionally recognizes model and serializer fields and tags
//! framework hook functions as reserved. Either way the symbols flow
//! into the same rule engine and N+1 detector downstream.
//!
//! A fresh process is spawned per analysis pass. That is a deliberate
//! simplicity/latency tradeoff; a persistent worker pool keyed by parser
//! script would be the next step if spawn latency ever measures as a
//! bottleneck.

mod bridge;

pub use bridge::{ExtractorConfig, SymbolExtractor, payload_from_stdout};

use djalint_types::Symbol;

/// Which external parser script to invoke.
///
/// Selection happens once per invocation, before spawning, by sniffing
/// the document text — never per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserScript {
    /// Plain-Python symbol parser.
    Plain,
    /// Django-aware symbol parser: same output shape, enriched with
    /// model/serializer field kinds and reserved framework hooks.
    Django,
}

/// Markers that indicate a Django module and justify the framework-aware
/// parser.
const FRAMEWORK_MARKERS: &[&str] = &[
    "from django",
    "import django",
    "from rest_framework",
    "import rest_framework",
];

impl ParserScript {
    /// Pick the parser script for a document. One scan of the text.
    #[must_use]
    pub fn select(document_text: &str) -> Self {
        if FRAMEWORK_MARKERS
            .iter()
            .any(|marker| document_text.contains(marker))
        {
            Self::Django
        } else {
            Self::Plain
        }
    }
}

/// Failure modes of one extraction pass.
///
/// All of these are recoverable at the pipeline level: the caller keeps
/// the last good cache entry and skips the pass.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("python interpreter not found: {0}")]
    MissingInterpreter(String),
    #[error("failed to spawn extractor: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("extractor exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("extractor produced malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Whether the failure is a syntax error in the user's code.
    ///
    /// Expected during active editing; the pipeline skips the pass
    /// silently instead of reporting it.
    #[must_use]
    pub fn is_user_syntax_error(&self) -> bool {
        let Self::Failed { stderr, .. } = self else {
            return false;
        };
        stderr.contains("SyntaxError")
            || stderr.contains("IndentationError")
            || stderr.contains("Unexpected token")
    }
}

/// Parse the filtered stdout of a parser script into symbols.
pub(crate) fn parse_output(payload: &str) -> Result<Vec<Symbol>, ExtractionError> {
    Ok(serde_json::from_str(payload)?)
}
