use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::ExistenceCache;
use crate::dedup::check_one;
use crate::remote::{
    CommittedPart, CreateFile, PartRef, PartUpload, ProgressSink, RemoteStore,
};
use crate::store::{TaskId, TaskStatus, UploadStore, UploadTask};

use super::error::{EngineError, EngineResult};
use super::fingerprint::task_fingerprint;
use super::pacing::UploadPacer;
use super::parts::plan_parts;
use super::progress::{PartProgress, ProgressThrottle};
use super::types::{EngineConfig, UploadOutcome};

/// Drives one file's upload to completion: duplicate guard, resume lookup,
/// bounded parallel part uploads, throttled progress, finalization.
///
/// Holds only a transient reference to a task while driving it; all durable
/// task state lives in the [`UploadStore`].
pub struct TransferEngine {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<ExistenceCache>,
    store: Arc<UploadStore>,
    config: EngineConfig,
    pacer: UploadPacer,
}

impl TransferEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<ExistenceCache>,
        store: Arc<UploadStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            remote,
            cache,
            store,
            config,
            pacer: UploadPacer::unlimited(),
        }
    }

    /// Pace part uploads, for rate-limited transports.
    pub fn with_pacer(mut self, pacer: UploadPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Run one task to a terminal state. The task's status and progress in
    /// the store are updated as the transfer advances; the returned error
    /// mirrors what the status was set to.
    pub async fn run(&self, task: UploadTask) -> EngineResult<UploadOutcome> {
        self.store.set_status(task.id, TaskStatus::Uploading);

        let result = self.drive(&task).await;

        match &result {
            Ok(_) => {
                self.store.set_progress(task.id, 100.0);
                self.store.set_status(task.id, TaskStatus::Uploaded);
            }
            Err(EngineError::Aborted) => {
                // No-op if the task already reached Uploaded
                self.store.set_status(task.id, TaskStatus::Cancelled);
            }
            Err(e) => {
                self.store.set_status(task.id, TaskStatus::Failed(e.to_string()));
            }
        }

        result
    }

    async fn drive(&self, task: &UploadTask) -> EngineResult<UploadOutcome> {
        let payload = &task.payload;
        let destination = &task.destination;

        if task.cancel.is_cancelled() {
            return Err(EngineError::Aborted);
        }

        // 1. Duplicate guard: cache first, then a single-name query. This is
        //    the authoritative final check even when the caller pre-filtered.
        let existing = match self.cache.get(&destination.path, &payload.name) {
            Some(hit) => hit,
            None => {
                let result = check_one(
                    self.remote.as_ref(),
                    &destination.path,
                    &payload.name,
                    payload.size,
                )
                .await;
                self.cache
                    .put(&destination.path, &payload.name, result.clone());
                result
            }
        };
        if existing.exists {
            return Err(EngineError::AlreadyExists(payload.name.clone()));
        }

        // 2. Resume identifier from the file's identity tuple
        let resume_id = task_fingerprint(task);

        // 3. Resume query: adopt the record's channel so new parts join the
        //    same logical upload
        let record = self.remote.fetch_resume_record(&resume_id).await?;
        let channel_id = record
            .channel_id
            .clone()
            .unwrap_or_else(|| resume_id.clone());

        if !record.is_empty() {
            debug!(
                task_id = %task.id,
                committed = record.parts.len(),
                "resuming a partially uploaded file"
            );
        }

        // 4. Partition into parts; already-committed sequence numbers start
        //    at 100%
        let parts = plan_parts(&payload.name, payload.size, self.config.chunk_size);
        let total_parts = parts.len();
        let progress = Arc::new(PartProgress::new(total_parts as u32, &record));
        let parts_resumed = parts.iter().filter(|p| record.contains(p.part_no)).count();

        // 5. Throttled progress reporter; torn down on every exit path
        let ticker_stop = CancellationToken::new();
        let _ticker_guard = ticker_stop.clone().drop_guard();
        tokio::spawn(report_progress(
            self.store.clone(),
            task.id,
            progress.clone(),
            ticker_stop,
            task.cancel.clone(),
        ));

        // 6. Bounded parallel upload of the missing parts only
        let semaphore = Arc::new(Semaphore::new(self.config.part_concurrency.max(1)));
        let mut uploads: JoinSet<EngineResult<crate::remote::PartReceipt>> = JoinSet::new();

        for part in parts.iter().filter(|p| !record.contains(p.part_no)) {
            let semaphore = semaphore.clone();
            let remote = self.remote.clone();
            let pacer = self.pacer.clone();
            let cancel = task.cancel.clone();
            let table = progress.clone();
            let file_path = payload.file_path.clone();
            let part = part.clone();
            let upload = PartUpload {
                part_name: part.part_name.clone(),
                file_name: payload.name.clone(),
                part_no: part.part_no,
                encrypted: destination.encrypt,
                channel_id: channel_id.clone(),
            };

            uploads.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::Aborted)?;

                if cancel.is_cancelled() {
                    return Err(EngineError::Aborted);
                }

                pacer.wait_for_part(part.len).await;
                let data = read_part(&file_path, part.offset, part.len).await?;

                let part_no = part.part_no;
                let sink: ProgressSink = Arc::new(move |pct| table.set(part_no, pct));

                tokio::select! {
                    result = remote.upload_part(&upload, data, sink) => Ok(result?),
                    _ = cancel.cancelled() => Err(EngineError::Aborted),
                }
            });
        }

        let mut fresh: Vec<CommittedPart> = Vec::new();
        while let Some(joined) = uploads.join_next().await {
            match joined {
                Ok(Ok(receipt)) => {
                    progress.set(receipt.part_no, 100.0);
                    fresh.push(CommittedPart {
                        part_no: receipt.part_no,
                        part_id: receipt.part_id,
                        salt: receipt.salt,
                    });
                }
                Ok(Err(e)) => {
                    // One part failing fails the whole file; a later retry
                    // resumes from the committed set
                    uploads.abort_all();
                    if task.cancel.is_cancelled() {
                        return Err(EngineError::Aborted);
                    }
                    return Err(e);
                }
                Err(join_error) => {
                    uploads.abort_all();
                    if join_error.is_cancelled() || task.cancel.is_cancelled() {
                        return Err(EngineError::Aborted);
                    }
                    return Err(EngineError::Internal(join_error.to_string()));
                }
            }
        }

        if task.cancel.is_cancelled() {
            return Err(EngineError::Aborted);
        }

        // 7. Finalize: commit the ordered part set, then best-effort cleanup
        //    of the superseded resume record
        let parts_uploaded = fresh.len();
        let mut committed = record.parts;
        committed.append(&mut fresh);
        committed.sort_by_key(|p| p.part_no);

        let request = CreateFile {
            name: payload.name.clone(),
            mime_type: payload.mime_type.clone(),
            kind: "file".to_string(),
            parts: committed
                .iter()
                .map(|p| PartRef {
                    id: p.part_id.clone(),
                    salt: p.salt.clone(),
                })
                .collect(),
            size: payload.size,
            path: destination.path.clone(),
            encrypted: destination.encrypt,
            channel_id,
        };

        let file = self.remote.create_file(&request).await?;

        if let Err(e) = self.remote.delete_resume_record(&resume_id).await {
            // The upload itself succeeded; a stale record is harmless
            warn!(task_id = %task.id, error = %e, "failed to delete resume record");
        }

        Ok(UploadOutcome {
            file,
            parts_uploaded,
            parts_resumed,
        })
    }
}

/// Read one part's bytes from the file at its offset.
async fn read_part(path: &Path, offset: u64, len: usize) -> std::io::Result<Bytes> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;

    let mut buffer = vec![0u8; len];
    file.read_exact(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}

/// Push the aggregated mean into the store on a one-second tick, gated by
/// the throttle. Stops on engine teardown or task cancellation, so a
/// cancelled task sees no further progress writes.
async fn report_progress(
    store: Arc<UploadStore>,
    task_id: TaskId,
    progress: Arc<PartProgress>,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    let mut throttle = ProgressThrottle::new(Duration::from_secs(1), 1.0);
    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                let mean = progress.mean();
                if throttle.observe(mean) {
                    store.set_progress(task_id, mean);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExistenceResult;
    use crate::remote::{MemoryRemoteStore, ResumeRecord};
    use crate::store::{UploadDestination, UploadPayload};
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Fixture {
        remote: Arc<MemoryRemoteStore>,
        cache: Arc<ExistenceCache>,
        store: Arc<UploadStore>,
        engine: TransferEngine,
        _file: NamedTempFile,
    }

    fn fixture(file_size: usize, chunk_size: usize) -> (Fixture, UploadTask) {
        let mut file = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..file_size).map(|i| (i % 256) as u8).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let remote = Arc::new(MemoryRemoteStore::new());
        let cache = Arc::new(ExistenceCache::new());
        let store = Arc::new(UploadStore::new());

        let payload = UploadPayload {
            file_path: file.path().to_path_buf(),
            name: "data.bin".to_string(),
            size: file_size as u64,
            modified_at: chrono::Utc::now(),
            mime_type: "application/octet-stream".to_string(),
        };
        let ids = store.add_tasks(vec![(payload, UploadDestination::new("/docs", "user-1"))]);
        let task = store.get(ids[0]).unwrap();

        let engine = TransferEngine::new(
            remote.clone(),
            cache.clone(),
            store.clone(),
            EngineConfig {
                chunk_size,
                part_concurrency: 2,
            },
        );

        (
            Fixture {
                remote,
                cache,
                store,
                engine,
                _file: file,
            },
            task,
        )
    }

    #[tokio::test]
    async fn test_multi_part_upload_completes() {
        let (fx, task) = fixture(1000, 256);
        let id = task.id;

        let outcome = fx.engine.run(task).await.unwrap();

        assert_eq!(outcome.parts_uploaded, 4);
        assert_eq!(outcome.parts_resumed, 0);
        assert_eq!(fx.remote.uploaded_part_count(), 4);
        assert!(fx.remote.file_at("/docs", "data.bin").is_some());

        let record = fx.store.get(id).unwrap();
        assert_eq!(record.status, TaskStatus::Uploaded);
        assert_eq!(record.progress, 100.0);
    }

    #[tokio::test]
    async fn test_single_part_file_uses_bare_name() {
        let (fx, task) = fixture(100, 256);

        fx.engine.run(task).await.unwrap();

        let parts = fx.remote.uploaded_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_name, "data.bin");
    }

    #[tokio::test]
    async fn test_resume_uploads_only_missing_parts() {
        let (fx, task) = fixture(1000, 256);
        let resume_id = task_fingerprint(&task);

        // Two of four parts already committed by a previous attempt
        fx.remote.seed_resume_record(
            &resume_id,
            ResumeRecord {
                channel_id: Some(resume_id.clone()),
                parts: vec![
                    crate::remote::CommittedPart {
                        part_no: 1,
                        part_id: "p-1".into(),
                        salt: "s-1".into(),
                    },
                    crate::remote::CommittedPart {
                        part_no: 2,
                        part_id: "p-2".into(),
                        salt: "s-2".into(),
                    },
                ],
            },
        );

        let id = task.id;
        let outcome = fx.engine.run(task).await.unwrap();

        assert_eq!(outcome.parts_resumed, 2);
        assert_eq!(outcome.parts_uploaded, 2);
        assert_eq!(fx.remote.uploaded_part_count(), 2);

        let uploaded: Vec<u32> = fx.remote.uploaded_parts().iter().map(|p| p.part_no).collect();
        assert!(uploaded.contains(&3));
        assert!(uploaded.contains(&4));

        assert_eq!(fx.store.get(id).unwrap().progress, 100.0);
        // The superseded record was cleaned up
        assert!(!fx.remote.has_resume_record(&resume_id));
    }

    #[tokio::test]
    async fn test_existing_file_fails_with_already_exists() {
        let (fx, task) = fixture(100, 256);
        fx.remote.insert_file("/docs", "data.bin", 100);

        let id = task.id;
        let result = fx.engine.run(task).await;

        assert!(matches!(result, Err(EngineError::AlreadyExists(_))));
        assert!(matches!(
            fx.store.get(id).unwrap().status,
            TaskStatus::Failed(_)
        ));
        assert_eq!(fx.remote.uploaded_part_count(), 0);

        // The guard outcome was cached
        assert!(fx.cache.get("/docs", "data.bin").unwrap().exists);
    }

    #[tokio::test]
    async fn test_cached_existence_short_circuits_the_guard() {
        let (fx, task) = fixture(100, 256);

        // Cache says the file exists; the destination is never asked
        fx.cache
            .put("/docs", "data.bin", ExistenceResult::found("f-1".into(), 100));
        fx.remote.set_fail_listing(true);

        let result = fx.engine.run(task).await;
        assert!(matches!(result, Err(EngineError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_part_failure_fails_the_file() {
        let (fx, task) = fixture(1000, 256);
        fx.remote.set_fail_parts(true);

        let id = task.id;
        let result = fx.engine.run(task).await;

        assert!(matches!(result, Err(EngineError::Remote(_))));
        assert!(matches!(
            fx.store.get(id).unwrap().status,
            TaskStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let (fx, task) = fixture(1000, 256);
        fx.remote.set_fail_delete(true);

        let id = task.id;
        let outcome = fx.engine.run(task).await;

        assert!(outcome.is_ok());
        assert_eq!(fx.store.get(id).unwrap().status, TaskStatus::Uploaded);
    }

    #[tokio::test]
    async fn test_cancellation_mid_transfer() {
        let (fx, task) = fixture(1000, 256);
        fx.remote.set_part_delay(Duration::from_millis(200));

        let id = task.id;
        let token = task.cancel.clone();
        let engine_store = fx.store.clone();

        let handle = tokio::spawn(async move { fx.engine.run(task).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EngineError::Aborted)));

        let after_cancel = engine_store.get(id).unwrap();
        assert_eq!(after_cancel.status, TaskStatus::Cancelled);

        // Quiescence: nothing touches the task after cancellation returns
        let frozen_progress = after_cancel.progress;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let later = engine_store.get(id).unwrap();
        assert_eq!(later.status, TaskStatus::Cancelled);
        assert_eq!(later.progress, frozen_progress);
    }

    #[tokio::test]
    async fn test_cancellation_before_start() {
        let (fx, task) = fixture(1000, 256);
        task.cancel.cancel();

        let result = fx.engine.run(task).await;
        assert!(matches!(result, Err(EngineError::Aborted)));
        assert_eq!(fx.remote.uploaded_part_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_never_deletes_the_resume_record() {
        let (fx, task) = fixture(1000, 256);
        let resume_id = task_fingerprint(&task);
        fx.remote.set_part_delay(Duration::from_millis(150));

        let token = task.cancel.clone();
        let remote = fx.remote.clone();
        let handle = tokio::spawn(async move { fx.engine.run(task).await });

        // Let at least one part commit, then cancel
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
        let _ = handle.await.unwrap();

        // Whatever was committed stays resumable
        let record = remote.fetch_resume_record(&resume_id).await.unwrap();
        assert!(!record.is_empty());
    }
}
