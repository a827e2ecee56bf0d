//! Client-side upload orchestration for a remote object store.
//!
//! Splits files into fixed-size parts, uploads them with bounded
//! concurrency at two nested levels (files x parts), resumes partially
//! uploaded files via a deterministic identity fingerprint, guards against
//! destination name collisions, and aggregates per-part progress into a
//! throttled signal safe to bind to a UI.

pub mod cache;
pub mod dedup;
pub mod engine;
pub mod orchestrator;
pub mod remote;
pub mod store;

pub use cache::{CacheStats, ExistenceCache, ExistenceResult};
pub use dedup::{
    check_batch, check_one, generate_unique_filename, optimized_check, should_skip_duplicate,
    CheckOutcome, DedupError, DuplicateReview,
};
pub use engine::{EngineConfig, EngineError, TransferEngine, UploadOutcome, UploadPacer};
pub use orchestrator::{OrchestratorConfig, UploadEvent, UploadOrchestrator};
pub use remote::{
    HttpRemoteConfig, HttpRemoteStore, MemoryRemoteStore, RemoteError, RemoteStore, ResumeRecord,
};
pub use store::{TaskId, TaskStatus, TaskView, UploadDestination, UploadPayload, UploadStore};
