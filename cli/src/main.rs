//! djalint - batch front end for the analysis engine.
//!
//! Analyzes the Python files given on the command line and prints each
//! diagnostic as `path:line:col: severity: [CODE] message`. Exits with
//! status 1 when any error-severity diagnostic is emitted, status 2 on
//! usage or environment problems.
//!
//! Configuration is read from `djalint.toml` in the working directory
//! (override with `DJALINT_CONFIG`); the parser scripts are expected
//! under `scripts/` (override with `DJALINT_SCRIPTS_DIR`).

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use djalint_config::SettingsHandle;
use djalint_engine::{AnalysisEngine, Notice};
use djalint_extractor::{ExtractorConfig, SymbolExtractor};
use djalint_llm::LlmValidator;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path() -> PathBuf {
    env::var_os("DJALINT_CONFIG")
        .map_or_else(|| PathBuf::from("djalint.toml"), PathBuf::from)
}

fn scripts_dir() -> PathBuf {
    env::var_os("DJALINT_SCRIPTS_DIR")
        .map_or_else(|| PathBuf::from("scripts"), PathBuf::from)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let files: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("usage: djalint <file.py>...");
        return ExitCode::from(2);
    }

    match run(&files).await {
        Ok(saw_error) => {
            if saw_error {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            eprintln!("djalint: {error:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(files: &[PathBuf]) -> Result<bool> {
    let settings = djalint_config::load(&config_path())?;
    let validator = settings
        .api
        .as_ref()
        .map(|api| LlmValidator::new(api.server_url.clone()));
    let extractor = SymbolExtractor::new(
        ExtractorConfig::resolve(&scripts_dir()).context("locating the parser scripts")?,
    );
    let engine = AnalysisEngine::new(extractor, SettingsHandle::new(settings), validator);

    let mut saw_error = false;
    for (index, file) in files.iter().enumerate() {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let uri = uri_for(file);

        let outcome = engine
            .analyze_document(&uri, index as i32, &text)
            .await
            .with_context(|| format!("analyzing {}", file.display()))?;
        tracing::info!(
            file = %file.display(),
            diagnostics = outcome.diagnostics.len(),
            from_cache = outcome.from_cache,
            "Analysis complete"
        );

        for diagnostic in &outcome.diagnostics {
            println!("{}", diagnostic.display_with_path(file));
            saw_error |= diagnostic.severity().is_error();
        }
        for notice in &outcome.notices {
            match notice {
                Notice::ValidationRateLimited => {
                    eprintln!(
                        "djalint: N+1 validation quota reached; further checks use heuristics only"
                    );
                }
            }
        }
    }
    Ok(saw_error)
}

fn uri_for(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_for_missing_file_uses_the_raw_path() {
        let uri = uri_for(Path::new("/no/such/app/models.py"));
        assert_eq!(uri, "file:///no/such/app/models.py");
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        // Only meaningful when the override is unset, which is the
        // default in the test environment.
        if env::var_os("DJALINT_CONFIG").is_none() {
            assert_eq!(config_path(), PathBuf::from("djalint.toml"));
        }
    }
}
