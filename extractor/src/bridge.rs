//! Subprocess spawn-and-drain for the parser scripts.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use djalint_types::{CancelToken, Symbol};

use crate::{ExtractionError, ParserScript, parse_output};

/// Resolved configuration for the extraction bridge.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    python: PathBuf,
    plain_script: PathBuf,
    django_script: PathBuf,
    extra_args: Vec<String>,
}

impl ExtractorConfig {
    /// Locate the Python interpreter and resolve script paths under
    /// `scripts_dir`.
    pub fn resolve(scripts_dir: &Path) -> Result<Self, ExtractionError> {
        let python = which::which("python3")
            .or_else(|_| which::which("python"))
            .map_err(|e| ExtractionError::MissingInterpreter(e.to_string()))?;
        Ok(Self {
            python,
            plain_script: scripts_dir.join("parse_symbols.py"),
            django_script: scripts_dir.join("parse_django.py"),
            extra_args: Vec::new(),
        })
    }

    /// Explicit construction, used by tests and embedders that manage
    /// their own interpreter.
    #[must_use]
    pub fn new(
        python: PathBuf,
        plain_script: PathBuf,
        django_script: PathBuf,
        extra_args: Vec<String>,
    ) -> Self {
        Self {
            python,
            plain_script,
            django_script,
            extra_args,
        }
    }

    fn script_for(&self, script: ParserScript) -> &Path {
        match script {
            ParserScript::Plain => &self.plain_script,
            ParserScript::Django => &self.django_script,
        }
    }
}

/// Keep only protocol payload lines from the child's stdout.
///
/// A trimmed line is payload iff it starts with `[` or `{`; everything
/// else is diagnostic noise from the child and is discarded rather than
/// allowed to break JSON parsing.
#[must_use]
pub fn payload_from_stdout(stdout: &str) -> String {
    stdout
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            let keep = trimmed.starts_with('[') || trimmed.starts_with('{');
            if !keep && !trimmed.is_empty() {
                tracing::debug!(line = trimmed, "Discarding extractor log noise");
            }
            keep
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The extraction bridge: one spawn per call, strict request/response
/// pairing.
#[derive(Debug, Clone)]
pub struct SymbolExtractor {
    config: ExtractorConfig,
}

impl SymbolExtractor {
    #[must_use]
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Run one extraction pass over `document_text`.
    ///
    /// Cancellation is observed before spawning and again after the
    /// child exits, before any result is produced.
    pub async fn extract(
        &self,
        document_text: &str,
        script: ParserScript,
        cancel: &CancelToken,
    ) -> Result<Vec<Symbol>, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let script_path = self.config.script_for(script);
        tracing::debug!(
            script = %script_path.display(),
            bytes = document_text.len(),
            "Spawning symbol extractor"
        );

        let mut child = Command::new(&self.config.python)
            .arg(script_path)
            .args(&self.config.extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Write the full document, then close stdin so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(document_text.as_bytes()).await?;
            stdin.shutdown().await?;
            drop(stdin);
        }

        let mut stdout = child.stdout.take().ok_or_else(|| {
            ExtractionError::Spawn(std::io::Error::other("no stdout from extractor"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            ExtractionError::Spawn(std::io::Error::other("no stderr from extractor"))
        })?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let (stdout_read, stderr_read) = tokio::join!(
            stdout.read_to_end(&mut stdout_buf),
            stderr.read_to_end(&mut stderr_buf),
        );
        stdout_read?;
        stderr_read?;

        let status = child.wait().await?;

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        if !status.success() {
            let stderr_text = String::from_utf8_lossy(&stderr_buf).trim().to_string();
            tracing::warn!(code = ?status.code(), "Extractor failed: {stderr_text}");
            return Err(ExtractionError::Failed {
                code: status.code(),
                stderr: stderr_text,
            });
        }

        let stdout_text = String::from_utf8_lossy(&stdout_buf);
        let payload = payload_from_stdout(&stdout_text);
        parse_output(&payload)
    }
}
