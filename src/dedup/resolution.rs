use std::collections::HashSet;
use std::path::Path;

use super::error::{DedupError, DedupResult};
use super::types::{BulkResolution, DuplicateCandidate, DuplicateResolution};

/// Hard cap on counter suffixes tried before giving up.
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Size ratio above which a destination file is considered a different file
/// rather than a copy of the local one.
const SIZE_DIFFERENCE_RATIO: f64 = 1.1;

/// Find a free name for `desired` against a set of taken names. Returns the
/// name unchanged if it is free; otherwise appends ` (n)` before the
/// extension, counting up until free or until the attempt cap.
pub fn generate_unique_filename(desired: &str, taken: &HashSet<String>) -> DedupResult<String> {
    if !taken.contains(desired) {
        return Ok(desired.to_string());
    }

    let path = Path::new(desired);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| desired.to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = format!("{} ({}){}", stem, n, extension);
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }

    Err(DedupError::ExhaustedRename(desired.to_string()))
}

/// Size-based duplicate heuristic: equal sizes are treated as the same file;
/// a destination file more than 10% larger is treated as a different one.
/// Anything in between defaults to skipping. Best effort only, no content
/// comparison.
pub fn should_skip_duplicate(local_size: u64, remote_size: u64) -> bool {
    if remote_size == local_size {
        return true;
    }

    if remote_size as f64 > local_size as f64 * SIZE_DIFFERENCE_RATIO {
        return false;
    }

    true
}

/// The collision set presented to the user, with per-item and bulk
/// resolution overrides. Dropped when dismissed or applied.
#[derive(Debug, Default)]
pub struct DuplicateReview {
    candidates: Vec<DuplicateCandidate>,
}

impl DuplicateReview {
    pub fn new(candidates: Vec<DuplicateCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[DuplicateCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Override one collision's resolution to skip or overwrite.
    pub fn set_resolution(&mut self, index: usize, resolution: BulkResolution) -> DedupResult<()> {
        let candidate = self
            .candidates
            .get_mut(index)
            .ok_or(DedupError::UnknownCandidate(index))?;

        candidate.resolution = resolution.into();
        candidate.rename_target = None;
        Ok(())
    }

    /// Override one collision to rename, generating a unique target against
    /// the given taken-name set.
    pub fn set_rename(&mut self, index: usize, taken: &HashSet<String>) -> DedupResult<String> {
        let candidate = self
            .candidates
            .get_mut(index)
            .ok_or(DedupError::UnknownCandidate(index))?;

        let target = generate_unique_filename(&candidate.payload.name, taken)?;
        candidate.resolution = DuplicateResolution::Rename;
        candidate.rename_target = Some(target.clone());
        Ok(target)
    }

    /// Apply one resolution to every collision at once.
    pub fn apply_to_all(&mut self, resolution: BulkResolution) {
        for candidate in &mut self.candidates {
            candidate.resolution = resolution.into();
            candidate.rename_target = None;
        }
    }

    /// Consume the review, yielding the candidates with their final
    /// resolutions.
    pub fn into_candidates(self) -> Vec<DuplicateCandidate> {
        self.candidates
    }
}
