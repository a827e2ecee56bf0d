use crate::cache::ExistenceResult;
use crate::store::UploadPayload;

/// Per-collision choice. Defaults to `Skip`; a rename carries its generated
/// target name alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateResolution {
    Skip,
    Overwrite,
    Rename,
}

/// Resolutions that make sense applied to a whole batch at once. A rename
/// always needs a per-item target, so it is excluded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkResolution {
    Skip,
    Overwrite,
}

impl From<BulkResolution> for DuplicateResolution {
    fn from(bulk: BulkResolution) -> Self {
        match bulk {
            BulkResolution::Skip => DuplicateResolution::Skip,
            BulkResolution::Overwrite => DuplicateResolution::Overwrite,
        }
    }
}

/// A locally-selected file that collides with an existing destination entry.
#[derive(Debug, Clone)]
pub struct DuplicateCandidate {
    pub payload: UploadPayload,
    pub existing: ExistenceResult,
    pub resolution: DuplicateResolution,
    pub rename_target: Option<String>,
}

impl DuplicateCandidate {
    pub fn new(payload: UploadPayload, existing: ExistenceResult) -> Self {
        Self {
            payload,
            existing,
            resolution: DuplicateResolution::Skip,
            rename_target: None,
        }
    }
}

/// Result of the pre-upload existence sweep: a total, disjoint partition of
/// the input files.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub to_upload: Vec<UploadPayload>,
    pub already_exists: Vec<DuplicateCandidate>,
}

impl CheckOutcome {
    pub fn total(&self) -> usize {
        self.to_upload.len() + self.already_exists.len()
    }
}
