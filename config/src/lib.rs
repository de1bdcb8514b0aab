//! Settings surface for the diagnostic pipeline.
//!
//! Raw TOML deserialization structs stay private here; the loader
//! resolves them into [`AnalysisSettings`] at the parse boundary.
//! [`SettingsHandle`] owns the resolved settings together with the
//! monotonically increasing settings version that gates every
//! diagnostics-cache read.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::Deserialize;

use djalint_types::Severity;

/// Default minimum identifier length (matches the analyzer defaults).
const DEFAULT_NAME_LENGTH_LIMIT: usize = 3;
/// Default maximum function body length in lines.
const DEFAULT_FUNCTION_LENGTH_LIMIT: usize = 50;

fn default_boolean_prefixes() -> Vec<String> {
    ["is", "has", "should", "can", "does"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_ignored_names() -> BTreeSet<String> {
    ["id", "pk"].into_iter().map(str::to_string).collect()
}

fn default_ignored_functions() -> BTreeSet<String> {
    [
        // Python entry points and test fixtures.
        "__init__",
        "__main__",
        "main",
        "setUp",
        "setUpClass",
        "tearDown",
        // Django hooks that must keep their framework names.
        "save",
        "delete",
        "__str__",
        "clean",
        "get_absolute_url",
        "create",
        "update",
        "validate",
        "get_queryset",
        "get",
        "post",
        "put",
        "get_context_data",
        "perform_create",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Remote validation endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the validation API server.
    pub server_url: String,
    /// Environment variable holding the user token. The token itself is
    /// never stored in config files.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "DJALINT_API_TOKEN".to_string()
}

/// Fully resolved, validated analysis settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub name_length_limit: usize,
    pub function_length_limit: usize,
    pub boolean_prefixes: Vec<String>,
    pub ignored_names: BTreeSet<String>,
    pub ignored_functions: BTreeSet<String>,
    pub min_severity: Severity,
    pub api: Option<ApiSettings>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            name_length_limit: DEFAULT_NAME_LENGTH_LIMIT,
            function_length_limit: DEFAULT_FUNCTION_LENGTH_LIMIT,
            boolean_prefixes: default_boolean_prefixes(),
            ignored_names: default_ignored_names(),
            ignored_functions: default_ignored_functions(),
            min_severity: Severity::Hint,
            api: None,
        }
    }
}

impl AnalysisSettings {
    /// Whether a name is exempt from naming rules: the ignore list plus
    /// settings-like ALL-CAPS constants.
    #[must_use]
    pub fn is_ignored_name(&self, name: &str) -> bool {
        if self.ignored_names.contains(name) {
            return true;
        }
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    name_length_limit: Option<usize>,
    function_length_limit: Option<usize>,
    boolean_prefixes: Option<Vec<String>>,
    ignored_names: Option<Vec<String>>,
    ignored_functions: Option<Vec<String>>,
    /// One of "error", "warning", "info", "hint".
    min_severity: Option<String>,
    api: Option<ApiSettings>,
}

fn parse_severity(value: &str) -> Option<Severity> {
    match value {
        "error" => Some(Severity::Error),
        "warning" => Some(Severity::Warning),
        "info" | "information" => Some(Severity::Information),
        "hint" => Some(Severity::Hint),
        _ => None,
    }
}

impl RawSettings {
    fn resolve(self) -> AnalysisSettings {
        let defaults = AnalysisSettings::default();
        let min_severity = match self.min_severity.as_deref() {
            None => defaults.min_severity,
            Some(raw) => parse_severity(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "Unknown min_severity, using default");
                defaults.min_severity
            }),
        };
        AnalysisSettings {
            name_length_limit: self.name_length_limit.unwrap_or(defaults.name_length_limit),
            function_length_limit: self
                .function_length_limit
                .unwrap_or(defaults.function_length_limit),
            boolean_prefixes: self.boolean_prefixes.unwrap_or(defaults.boolean_prefixes),
            ignored_names: self
                .ignored_names
                .map_or(defaults.ignored_names, |names| names.into_iter().collect()),
            ignored_functions: self
                .ignored_functions
                .map_or(defaults.ignored_functions, |names| {
                    names.into_iter().collect()
                }),
            min_severity,
            api: self.api,
        }
    }
}

/// Load settings from a TOML file. A missing file yields the defaults.
pub fn load(path: &Path) -> anyhow::Result<AnalysisSettings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(AnalysisSettings::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let raw: RawSettings =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(raw.resolve())
}

/// Monotonic counter identifying a settings generation.
///
/// Every diagnostics-cache read compares the stored version against the
/// current one; a mismatch is a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingsVersion(u64);

impl SettingsVersion {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Shared handle over the current settings and their version.
///
/// `update` replaces the settings and bumps the version, implicitly
/// invalidating every cached diagnostics entry by comparison — no eager
/// sweep.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<Mutex<VersionedSettings>>,
}

#[derive(Debug)]
struct VersionedSettings {
    settings: Arc<AnalysisSettings>,
    version: u64,
}

impl SettingsHandle {
    #[must_use]
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VersionedSettings {
                settings: Arc::new(settings),
                version: 0,
            })),
        }
    }

    /// Current settings together with their version.
    #[must_use]
    pub fn snapshot(&self) -> (Arc<AnalysisSettings>, SettingsVersion) {
        let guard = self.inner.lock().expect("settings lock poisoned");
        (Arc::clone(&guard.settings), SettingsVersion(guard.version))
    }

    #[must_use]
    pub fn version(&self) -> SettingsVersion {
        SettingsVersion(self.inner.lock().expect("settings lock poisoned").version)
    }

    /// Replace the settings, bumping the version.
    ///
    /// Returns true when the severity threshold changed — the caller must
    /// then clear the LLM result cache, whose stored scores were filtered
    /// at write time.
    pub fn update(&self, settings: AnalysisSettings) -> bool {
        let mut guard = self.inner.lock().expect("settings lock poisoned");
        let severity_changed = guard.settings.min_severity != settings.min_severity;
        guard.settings = Arc::new(settings);
        guard.version += 1;
        tracing::debug!(version = guard.version, "Settings updated");
        severity_changed
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_analyzer_conventions() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.name_length_limit, 3);
        assert_eq!(settings.function_length_limit, 50);
        assert!(settings.boolean_prefixes.iter().any(|p| p == "is"));
        assert!(settings.ignored_functions.contains("get_queryset"));
        assert_eq!(settings.min_severity, Severity::Hint);
        assert!(settings.api.is_none());
    }

    #[test]
    fn ignored_name_covers_constants() {
        let settings = AnalysisSettings::default();
        assert!(settings.is_ignored_name("id"));
        assert!(settings.is_ignored_name("pk"));
        assert!(settings.is_ignored_name("DEBUG"));
        assert!(settings.is_ignored_name("ALLOWED_HOSTS"));
        assert!(!settings.is_ignored_name("flag"));
        assert!(!settings.is_ignored_name("Debug"));
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(&dir.path().join("djalint.toml")).unwrap();
        assert_eq!(settings, AnalysisSettings::default());
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("djalint.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "name_length_limit = 4\nmin_severity = \"warning\"\n\n[api]\nserver_url = \"https://api.example.com\""
        )
        .unwrap();
        let settings = load(&path).unwrap();
        assert_eq!(settings.name_length_limit, 4);
        assert_eq!(settings.min_severity, Severity::Warning);
        let api = settings.api.unwrap();
        assert_eq!(api.server_url, "https://api.example.com");
        assert_eq!(api.token_env, "DJALINT_API_TOKEN");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("djalint.toml");
        std::fs::write(&path, "name_length_limit = [not toml").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn unknown_severity_falls_back_to_default() {
        let raw = RawSettings {
            min_severity: Some("severe".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.resolve().min_severity, Severity::Hint);
    }

    #[test]
    fn update_bumps_version() {
        let handle = SettingsHandle::default();
        let v0 = handle.version();
        handle.update(AnalysisSettings::default());
        let v1 = handle.version();
        assert!(v1 > v0);
    }

    #[test]
    fn update_reports_severity_threshold_change() {
        let handle = SettingsHandle::default();
        let changed = AnalysisSettings {
            min_severity: Severity::Warning,
            ..Default::default()
        };
        assert!(handle.update(changed.clone()));
        // Same threshold again: no cache clear required.
        assert!(!handle.update(changed));
    }

    #[test]
    fn snapshot_is_consistent() {
        let handle = SettingsHandle::default();
        let (settings, version) = handle.snapshot();
        assert_eq!(*settings, AnalysisSettings::default());
        assert_eq!(version, handle.version());
    }
}
