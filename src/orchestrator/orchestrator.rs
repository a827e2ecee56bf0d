use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::ExistenceCache;
use crate::engine::{EngineError, TransferEngine, UploadPacer};
use crate::remote::RemoteStore;
use crate::store::{TaskId, TaskStatus, UploadDestination, UploadPayload, UploadStore};

use super::types::{OrchestratorConfig, UploadEvent};

/// Owns the queue: admits up to `max_concurrent_files` tasks into active
/// transfer, runs one engine per admitted task, and refills freed slots in
/// queue order.
///
/// The active set doubles as the admission lock, so admission and global
/// cancellation can never interleave.
pub struct UploadOrchestrator {
    store: Arc<UploadStore>,
    engine: Arc<TransferEngine>,
    active: Arc<Mutex<HashSet<TaskId>>>,
    max_concurrent_files: usize,
    event_tx: mpsc::UnboundedSender<UploadEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<UploadEvent>>>>,
}

impl UploadOrchestrator {
    pub fn new(remote: Arc<dyn RemoteStore>, config: OrchestratorConfig) -> Self {
        Self::build(
            remote,
            Arc::new(ExistenceCache::new()),
            config,
            UploadPacer::unlimited(),
        )
    }

    /// Share an existence cache with the pre-upload sweep, so the engine's
    /// guard can reuse its results instead of re-querying the destination.
    pub fn with_cache(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<ExistenceCache>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::build(remote, cache, config, UploadPacer::unlimited())
    }

    pub fn with_pacer(
        remote: Arc<dyn RemoteStore>,
        config: OrchestratorConfig,
        pacer: UploadPacer,
    ) -> Self {
        Self::build(remote, Arc::new(ExistenceCache::new()), config, pacer)
    }

    fn build(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<ExistenceCache>,
        config: OrchestratorConfig,
        pacer: UploadPacer,
    ) -> Self {
        let store = Arc::new(UploadStore::new());
        let engine = Arc::new(
            TransferEngine::new(remote, cache, store.clone(), config.engine).with_pacer(pacer),
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            store,
            engine,
            active: Arc::new(Mutex::new(HashSet::new())),
            max_concurrent_files: config.max_concurrent_files.max(1),
            event_tx,
            event_rx: Arc::new(Mutex::new(Some(event_rx))),
        }
    }

    /// The shared state read by the host UI.
    pub fn store(&self) -> &Arc<UploadStore> {
        &self.store
    }

    /// Take the event receiver (can only be taken once).
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.event_rx.lock().take()
    }

    /// Enqueue a batch of files and start transferring as slots allow.
    pub fn enqueue(&self, batch: Vec<(UploadPayload, UploadDestination)>) -> Vec<TaskId> {
        let ids = self.store.add_tasks(batch);
        self.pump();
        ids
    }

    /// Remove one task from the queue. A task still transferring is
    /// cancelled first; its slot frees when the engine unwinds.
    pub fn remove(&self, id: TaskId) {
        self.store.remove_task(id);
        self.pump();
    }

    /// Abort every active transfer and clear the queue. Atomic with respect
    /// to admission: nothing can be admitted while the clear is in flight,
    /// and a cancelled task is never re-admitted.
    pub fn cancel_all(&self) {
        let mut active = self.active.lock();
        let cancelled = self.store.cancel_all();
        active.clear();
        debug!(cancelled, "cancelled all uploads");
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Admission pass: fill free slots with pending tasks in queue order.
    fn pump(&self) {
        let mut active = self.active.lock();
        let available = self.max_concurrent_files.saturating_sub(active.len());
        if available == 0 {
            return;
        }

        let candidates: Vec<TaskId> = self
            .store
            .pending_ids()
            .into_iter()
            .filter(|id| !active.contains(id))
            .take(available)
            .collect();

        for id in candidates {
            let Some(task) = self.store.get(id) else {
                continue;
            };

            // Admission is what moves a task into Uploading
            if !self.store.set_status(id, TaskStatus::Uploading) {
                continue;
            }
            active.insert(id);
            let _ = self.event_tx.send(UploadEvent::Admitted { id });

            let worker = self.clone();
            tokio::spawn(async move {
                let result = worker.engine.run(task).await;
                worker.settle(id, result.map(|_| ()));
            });
        }
    }

    /// A transfer reached a terminal state: free its slot, tell the host,
    /// admit the next pending task.
    fn settle(&self, id: TaskId, result: Result<(), EngineError>) {
        self.active.lock().remove(&id);

        let event = match result {
            Ok(()) => UploadEvent::Completed { id },
            Err(EngineError::Aborted) => UploadEvent::Cancelled { id },
            Err(e) => UploadEvent::Failed {
                id,
                reason: e.to_string(),
            },
        };
        let _ = self.event_tx.send(event);

        self.pump();
    }
}

impl Clone for UploadOrchestrator {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            engine: self.engine.clone(),
            active: self.active.clone(),
            max_concurrent_files: self.max_concurrent_files,
            event_tx: self.event_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }
}
