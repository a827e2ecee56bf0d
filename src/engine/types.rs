use crate::remote::RemoteFile;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed part size in bytes; the last part carries the remainder.
    pub chunk_size: usize,
    /// Simultaneous part uploads per file. Independent of the orchestrator's
    /// per-queue file limit.
    pub part_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8 * 1024 * 1024,
            part_concurrency: 4,
        }
    }
}

/// One slice of the file, identified by 1-based sequence number. Exists only
/// for the duration of a transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub part_no: u32,
    pub offset: u64,
    pub len: usize,
    pub part_name: String,
}

/// What a completed transfer produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file: RemoteFile,
    pub parts_uploaded: usize,
    pub parts_resumed: usize,
}
