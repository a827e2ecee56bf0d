use std::time::Instant;

/// Outcome of an existence check against the destination, as seen by callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistenceResult {
    pub exists: bool,
    pub file_id: Option<String>,
    pub size: Option<u64>,
    /// Set by single-name checks when a name matched but the byte size did not.
    pub size_mismatch: bool,
}

impl ExistenceResult {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn found(file_id: String, size: u64) -> Self {
        Self {
            exists: true,
            file_id: Some(file_id),
            size: Some(size),
            size_mismatch: false,
        }
    }
}

/// One cached existence lookup. An entry past `expires_at` must be treated
/// exactly like an absent entry: a cache miss, never a negative signal.
#[derive(Debug, Clone)]
pub struct ExistenceEntry {
    pub result: ExistenceResult,
    pub expires_at: Instant,
}

impl ExistenceEntry {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}
