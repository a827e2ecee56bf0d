use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::types::{CacheStats, ExistenceEntry, ExistenceResult};

/// Default entry lifetime. Long enough to absorb the repeated checks of one
/// bulk-upload session, short enough not to mask destination changes across
/// sessions.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// In-memory, time-bounded cache of existence lookups keyed by
/// (destination path, file name). No network access; callers that miss here
/// must re-check against the destination.
pub struct ExistenceCache {
    entries: Mutex<HashMap<(String, String), ExistenceEntry>>,
    default_ttl: Duration,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Store a lookup result with the default TTL.
    pub fn put(&self, path: &str, name: &str, result: ExistenceResult) {
        self.put_with_ttl(path, name, result, self.default_ttl);
    }

    /// Store a lookup result with an explicit TTL.
    pub fn put_with_ttl(&self, path: &str, name: &str, result: ExistenceResult, ttl: Duration) {
        let entry = ExistenceEntry {
            result,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .insert((path.to_string(), name.to_string()), entry);
    }

    /// Look up a cached result. Expired entries behave like absent ones and
    /// are deleted on the way out to bound memory.
    pub fn get(&self, path: &str, name: &str) -> Option<ExistenceResult> {
        let key = (path.to_string(), name.to_string());
        let mut entries = self.entries.lock();

        match entries.get(&key) {
            Some(entry) if !entry.is_expired() => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let total = entries.len();
        let expired = entries.values().filter(|e| e.is_expired()).count();

        CacheStats {
            total,
            valid: total - expired,
            expired,
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for ExistenceCache {
    fn default() -> Self {
        Self::new()
    }
}
