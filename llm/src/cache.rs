//! TTL-bounded cache for validation verdicts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Default lifetime of a cached verdict.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache key: hex digest of the exact function body that was validated.
///
/// Any edit to the body, including whitespace, produces a new key and
/// forces revalidation.
#[must_use]
pub fn content_key(function_body: &str) -> String {
    let digest = Sha256::digest(function_body.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Keyed verdict store with lazy expiry.
///
/// Entries are only written for successful validations; a failed call
/// must leave the cache untouched so the next pass retries.
pub struct ResultCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> ResultCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a fresh entry, removing it if it has expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        let now = Instant::now();
        if let Some(entry) = entries.get(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                return None;
            }
            return Some(entry.value.clone());
        }
        None
    }

    pub fn insert(&self, key: String, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                    ttl: self.ttl,
                },
            );
        }
    }

    /// Drop every entry. Called when the severity threshold changes:
    /// cached verdicts carry severities computed under the old setting.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
