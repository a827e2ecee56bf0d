use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    Uploading,
    Uploaded,
    Cancelled,
    Failed(String),
}

impl TaskStatus {
    /// Uploading is the only state in which work is performed.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Uploading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Uploaded | TaskStatus::Cancelled | TaskStatus::Failed(_)
        )
    }
}

/// The file a task uploads. Immutable after enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPayload {
    pub file_path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub mime_type: String,
}

impl UploadPayload {
    /// Build a payload from a file on disk, taking name, size and mtime from
    /// its metadata.
    pub async fn from_path(file_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let file_path = file_path.into();
        let metadata = tokio::fs::metadata(&file_path).await?;
        let modified_at = metadata
            .modified()
            .map(chrono::DateTime::<chrono::Utc>::from)
            .unwrap_or_else(|_| chrono::Utc::now());

        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            file_path,
            name,
            size: metadata.len(),
            modified_at,
            mime_type: "application/octet-stream".to_string(),
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// Where a task uploads to, and on whose behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDestination {
    pub path: String,
    pub user_id: String,
    pub encrypt: bool,
}

impl UploadDestination {
    pub fn new(path: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            user_id: user_id.into(),
            encrypt: false,
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }
}

/// One queued file. The cancellation token is owned 1:1 by the task;
/// triggering it is irreversible and aborts everything the task spawned.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: TaskId,
    pub payload: UploadPayload,
    pub destination: UploadDestination,
    pub status: TaskStatus,
    pub progress: f64,
    pub cancel: CancellationToken,
    pub queued_at: chrono::DateTime<chrono::Utc>,
}

impl UploadTask {
    pub fn new(payload: UploadPayload, destination: UploadDestination) -> Self {
        Self {
            id: TaskId::new(),
            payload,
            destination,
            status: TaskStatus::NotStarted,
            progress: 0.0,
            cancel: CancellationToken::new(),
            queued_at: chrono::Utc::now(),
        }
    }
}

/// Read-model row for the host UI.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub progress: f64,
}

impl TaskView {
    pub fn from_task(task: &UploadTask) -> Self {
        Self {
            id: task.id,
            name: task.payload.name.clone(),
            status: task.status.clone(),
            progress: task.progress,
        }
    }
}
