use crate::engine::EngineConfig;
use crate::store::TaskId;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Simultaneously transferring files. The per-part limit nests inside
    /// this one: N files x M parts each.
    pub max_concurrent_files: usize,
    pub engine: EngineConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: 3,
            engine: EngineConfig::default(),
        }
    }
}

/// Lifecycle notifications for the host.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Admitted { id: TaskId },
    Completed { id: TaskId },
    Failed { id: TaskId, reason: String },
    Cancelled { id: TaskId },
}
