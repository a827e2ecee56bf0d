use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::RemoteResult;
use super::types::{CreateFile, PartReceipt, PartUpload, RemoteFile, ResumeRecord};

/// Callback invoked with a part's fractional progress (0.0 – 100.0) as its
/// bytes transfer. Must be cheap; it runs on the transfer path.
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

/// Client-side contract of the destination object store. The store's internal
/// chunk assembly and commit logic live behind this boundary.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Find a single file by name under a destination path.
    async fn find_file(&self, path: &str, name: &str) -> RemoteResult<Option<RemoteFile>>;

    /// List up to `limit` files under a destination path.
    async fn list_files(&self, path: &str, limit: usize) -> RemoteResult<Vec<RemoteFile>>;

    /// Fetch the committed parts for a resume identifier. An unknown
    /// identifier yields an empty record, not an error.
    async fn fetch_resume_record(&self, resume_id: &str) -> RemoteResult<ResumeRecord>;

    /// Upload one part. `progress` receives the part's cumulative percentage.
    async fn upload_part(
        &self,
        part: &PartUpload,
        data: Bytes,
        progress: ProgressSink,
    ) -> RemoteResult<PartReceipt>;

    /// Commit the final object from its ordered parts.
    async fn create_file(&self, request: &CreateFile) -> RemoteResult<RemoteFile>;

    /// Drop a superseded resume record. Best-effort; callers may ignore
    /// failures.
    async fn delete_resume_record(&self, resume_id: &str) -> RemoteResult<()>;
}

/// A progress sink that discards every sample.
pub fn null_progress() -> ProgressSink {
    Arc::new(|_| {})
}
