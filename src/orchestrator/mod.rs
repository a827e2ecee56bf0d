pub mod orchestrator;
pub mod types;

pub use orchestrator::UploadOrchestrator;
pub use types::{OrchestratorConfig, UploadEvent};
