use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::client::{ProgressSink, RemoteStore};
use super::error::{RemoteError, RemoteResult};
use super::types::{
    CommittedPart, CreateFile, PartReceipt, PartUpload, RemoteFile, ResumeRecord,
};

/// In-memory destination store for tests and local development. Parts are
/// grouped by channel identifier, so an interrupted upload can be resumed
/// the same way it would be against a real destination.
///
/// Failure switches let tests inject transport errors per operation class.
pub struct MemoryRemoteStore {
    files: DashMap<(String, String), RemoteFile>,
    records: DashMap<String, ResumeRecord>,
    part_log: Mutex<Vec<PartUpload>>,
    fail_listing: AtomicBool,
    fail_parts: AtomicBool,
    fail_commit: AtomicBool,
    fail_delete: AtomicBool,
    part_delay: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            records: DashMap::new(),
            part_log: Mutex::new(Vec::new()),
            fail_listing: AtomicBool::new(false),
            fail_parts: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            part_delay: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Pre-populate a file at the destination.
    pub fn insert_file(&self, path: &str, name: &str, size: u64) -> RemoteFile {
        let file = RemoteFile {
            name: name.to_string(),
            id: format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            size,
        };
        self.files
            .insert((path.to_string(), name.to_string()), file.clone());
        file
    }

    /// Seed a resume record, as if a previous attempt had committed parts.
    pub fn seed_resume_record(&self, resume_id: &str, record: ResumeRecord) {
        self.records.insert(resume_id.to_string(), record);
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_parts(&self, fail: bool) {
        self.fail_parts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Delay each part upload, so tests can cancel mid-transfer.
    pub fn set_part_delay(&self, delay: Duration) {
        *self.part_delay.lock() = Some(delay);
    }

    /// Every part upload accepted so far, in arrival order.
    pub fn uploaded_parts(&self) -> Vec<PartUpload> {
        self.part_log.lock().clone()
    }

    pub fn uploaded_part_count(&self) -> usize {
        self.part_log.lock().len()
    }

    pub fn has_resume_record(&self, resume_id: &str) -> bool {
        self.records.contains_key(resume_id)
    }

    pub fn file_at(&self, path: &str, name: &str) -> Option<RemoteFile> {
        self.files
            .get(&(path.to_string(), name.to_string()))
            .map(|f| f.value().clone())
    }

    fn next_part_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn find_file(&self, path: &str, name: &str) -> RemoteResult<Option<RemoteFile>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RemoteError::TransportFailure("listing unavailable".into()));
        }

        Ok(self.file_at(path, name))
    }

    async fn list_files(&self, path: &str, limit: usize) -> RemoteResult<Vec<RemoteFile>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RemoteError::TransportFailure("listing unavailable".into()));
        }

        Ok(self
            .files
            .iter()
            .filter(|entry| entry.key().0 == path)
            .take(limit)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn fetch_resume_record(&self, resume_id: &str) -> RemoteResult<ResumeRecord> {
        Ok(self
            .records
            .get(resume_id)
            .map(|r| r.value().clone())
            .unwrap_or_else(ResumeRecord::empty))
    }

    async fn upload_part(
        &self,
        part: &PartUpload,
        data: Bytes,
        progress: ProgressSink,
    ) -> RemoteResult<PartReceipt> {
        if self.fail_parts.load(Ordering::SeqCst) {
            return Err(RemoteError::TransportFailure("part upload refused".into()));
        }

        let delay = *self.part_delay.lock();
        if let Some(delay) = delay {
            progress(50.0);
            tokio::time::sleep(delay).await;
        }
        progress(100.0);

        let id = self.next_part_id();
        let receipt = PartReceipt {
            part_id: format!("part-{}", id),
            part_no: part.part_no,
            salt: format!("salt-{:08x}", id ^ data.len() as u64),
            channel_id: part.channel_id.clone(),
        };

        // Extend the resume record for the part's channel, the way the real
        // destination accrues committed parts
        let mut record = self.records.entry(part.channel_id.clone()).or_default();
        record.channel_id = Some(part.channel_id.clone());
        record.parts.push(CommittedPart {
            part_no: part.part_no,
            part_id: receipt.part_id.clone(),
            salt: receipt.salt.clone(),
        });
        drop(record);

        self.part_log.lock().push(part.clone());

        Ok(receipt)
    }

    async fn create_file(&self, request: &CreateFile) -> RemoteResult<RemoteFile> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(RemoteError::TransportFailure("commit refused".into()));
        }

        let file = RemoteFile {
            name: request.name.clone(),
            id: format!("file-{}", self.next_part_id()),
            size: request.size,
        };
        self.files
            .insert((request.path.clone(), request.name.clone()), file.clone());

        Ok(file)
    }

    async fn delete_resume_record(&self, resume_id: &str) -> RemoteResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RemoteError::TransportFailure("delete refused".into()));
        }

        self.records.remove(resume_id);
        Ok(())
    }
}
