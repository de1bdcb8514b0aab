//! Version-gated diagnostics cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use djalint_config::SettingsVersion;
use djalint_types::Diagnostic;

struct CachedDiagnostics {
    version: i32,
    settings_version: SettingsVersion,
    diagnostics: Arc<[Diagnostic]>,
}

/// Per-document diagnostics, keyed by uri and gated on both the document
/// version and the settings version.
///
/// A read hits only when both stored versions match the caller's. Writes
/// overwrite unconditionally; version ordering is the caller's concern
/// (the scheduler's generation gate keeps stale writers out).
#[derive(Default)]
pub struct DiagnosticsCache {
    entries: Mutex<HashMap<String, CachedDiagnostics>>,
}

impl DiagnosticsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(
        &self,
        uri: &str,
        version: i32,
        settings_version: SettingsVersion,
    ) -> Option<Arc<[Diagnostic]>> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(uri)?;
        if entry.version == version && entry.settings_version == settings_version {
            Some(Arc::clone(&entry.diagnostics))
        } else {
            None
        }
    }

    /// Non-mutating staleness probe: true when there is no usable entry.
    #[must_use]
    pub fn is_stale(&self, uri: &str, version: i32, settings_version: SettingsVersion) -> bool {
        let Ok(entries) = self.entries.lock() else {
            return true;
        };
        entries.get(uri).is_none_or(|entry| {
            entry.version != version || entry.settings_version != settings_version
        })
    }

    pub fn set(
        &self,
        uri: &str,
        version: i32,
        settings_version: SettingsVersion,
        diagnostics: Vec<Diagnostic>,
    ) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                uri.to_string(),
                CachedDiagnostics {
                    version,
                    settings_version,
                    diagnostics: diagnostics.into(),
                },
            );
        }
    }

    pub fn invalidate(&self, uri: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(uri);
        }
    }

    /// Last stored diagnostics for a uri regardless of version, used as
    /// the fallback when a fresh pass fails mid-edit.
    #[must_use]
    pub fn last_good(&self, uri: &str) -> Option<Arc<[Diagnostic]>> {
        let entries = self.entries.lock().ok()?;
        entries.get(uri).map(|e| Arc::clone(&e.diagnostics))
    }
}
