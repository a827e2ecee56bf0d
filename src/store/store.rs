use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::types::{TaskId, TaskStatus, TaskView, UploadDestination, UploadPayload, UploadTask};

struct Inner {
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, UploadTask>,
    dialog_open: bool,
}

/// Process-wide record of every queued file: identity, status, progress.
/// The single source of truth read by the orchestrator and the host UI.
///
/// Every mutation is atomic with respect to readers: the ordered id list and
/// the record map change under one lock, so an id never appears without its
/// record or vice versa.
pub struct UploadStore {
    inner: Mutex<Inner>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                order: Vec::new(),
                tasks: HashMap::new(),
                dialog_open: false,
            }),
        }
    }

    /// Enqueue a batch of files. Each becomes a `NotStarted` task with a
    /// fresh cancellation token.
    pub fn add_tasks(
        &self,
        batch: Vec<(UploadPayload, UploadDestination)>,
    ) -> Vec<TaskId> {
        let mut inner = self.inner.lock();
        let mut ids = Vec::with_capacity(batch.len());

        for (payload, destination) in batch {
            let task = UploadTask::new(payload, destination);
            ids.push(task.id);
            inner.order.push(task.id);
            inner.tasks.insert(task.id, task);
        }

        ids
    }

    pub fn get(&self, id: TaskId) -> Option<UploadTask> {
        self.inner.lock().tasks.get(&id).cloned()
    }

    pub fn ordered_ids(&self) -> Vec<TaskId> {
        self.inner.lock().order.clone()
    }

    /// Queue-ordered ids of tasks that have not been admitted yet.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter(|id| {
                inner
                    .tasks
                    .get(id)
                    .map(|t| t.status == TaskStatus::NotStarted)
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    pub fn snapshot(&self) -> Vec<TaskView> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id).map(TaskView::from_task))
            .collect()
    }

    /// Set a task's status. Refuses to move a task out of a terminal state,
    /// so a late engine callback cannot resurrect a cancelled task.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> bool {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if !task.status.is_terminal() => {
                task.status = status;
                true
            }
            _ => false,
        }
    }

    /// Raise a task's progress. Lower values are ignored: progress is
    /// monotonically non-decreasing for a task's lifetime.
    pub fn set_progress(&self, id: TaskId, progress: f64) -> bool {
        let progress = progress.clamp(0.0, 100.0);
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if progress > task.progress => {
                task.progress = progress;
                true
            }
            _ => false,
        }
    }

    /// Remove a task. If it is still live, its cancellation token fires
    /// first so in-flight transfers unwind.
    pub fn remove_task(&self, id: TaskId) -> Option<UploadTask> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.remove(&id)?;
        inner.order.retain(|existing| *existing != id);

        if !task.status.is_terminal() {
            debug!(task_id = %id, "removing live task, firing cancellation");
            task.cancel.cancel();
        }

        Some(task)
    }

    /// Cancel every live task and clear the queue. Returns how many tasks
    /// were cancelled while still live.
    pub fn cancel_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut cancelled = 0;

        for task in inner.tasks.values() {
            if !task.status.is_terminal() {
                task.cancel.cancel();
                cancelled += 1;
            }
        }

        inner.order.clear();
        inner.tasks.clear();
        cancelled
    }

    /// Mean progress over all queued tasks, for the host UI.
    pub fn overall_progress(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.tasks.is_empty() {
            return 0.0;
        }
        let sum: f64 = inner.tasks.values().map(|t| t.progress).sum();
        sum / inner.tasks.len() as f64
    }

    pub fn set_dialog_open(&self, open: bool) {
        self.inner.lock().dialog_open = open;
    }

    pub fn dialog_open(&self) -> bool {
        self.inner.lock().dialog_open
    }

    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, size: u64) -> UploadPayload {
        UploadPayload {
            file_path: format!("/tmp/{}", name).into(),
            name: name.to_string(),
            size,
            modified_at: chrono::Utc::now(),
            mime_type: "application/octet-stream".into(),
        }
    }

    fn destination() -> UploadDestination {
        UploadDestination::new("/docs", "user-1")
    }

    #[test]
    fn test_add_tasks_keeps_order_and_records_together() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![
            (payload("a.txt", 1), destination()),
            (payload("b.txt", 2), destination()),
        ]);

        assert_eq!(store.ordered_ids(), ids);
        for id in &ids {
            assert!(store.get(*id).is_some());
        }
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_remove_task_drops_both_sides() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![
            (payload("a.txt", 1), destination()),
            (payload("b.txt", 2), destination()),
        ]);

        store.remove_task(ids[0]);

        assert_eq!(store.ordered_ids(), vec![ids[1]]);
        assert!(store.get(ids[0]).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_live_task_fires_cancellation() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![(payload("a.txt", 1), destination())]);
        store.set_status(ids[0], TaskStatus::Uploading);

        let token = store.get(ids[0]).unwrap().cancel;
        assert!(!token.is_cancelled());

        store.remove_task(ids[0]);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_remove_finished_task_does_not_cancel() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![(payload("a.txt", 1), destination())]);
        store.set_status(ids[0], TaskStatus::Uploaded);

        let token = store.get(ids[0]).unwrap().cancel;
        store.remove_task(ids[0]);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![(payload("a.txt", 1), destination())]);

        assert!(store.set_status(ids[0], TaskStatus::Uploading));
        assert!(store.set_status(ids[0], TaskStatus::Cancelled));
        assert!(!store.set_status(ids[0], TaskStatus::Uploading));
        assert_eq!(store.get(ids[0]).unwrap().status, TaskStatus::Cancelled);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![(payload("a.txt", 1), destination())]);

        assert!(store.set_progress(ids[0], 40.0));
        assert!(!store.set_progress(ids[0], 25.0));
        assert_eq!(store.get(ids[0]).unwrap().progress, 40.0);

        assert!(store.set_progress(ids[0], 100.0));
        assert_eq!(store.get(ids[0]).unwrap().progress, 100.0);
    }

    #[test]
    fn test_pending_ids_in_queue_order() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![
            (payload("a.txt", 1), destination()),
            (payload("b.txt", 2), destination()),
            (payload("c.txt", 3), destination()),
        ]);

        store.set_status(ids[1], TaskStatus::Uploading);
        assert_eq!(store.pending_ids(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_cancel_all_cancels_and_clears() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![
            (payload("a.txt", 1), destination()),
            (payload("b.txt", 2), destination()),
        ]);
        store.set_status(ids[0], TaskStatus::Uploading);

        let tokens: Vec<_> = ids.iter().map(|id| store.get(*id).unwrap().cancel).collect();

        let cancelled = store.cancel_all();
        assert_eq!(cancelled, 2);
        assert!(store.is_empty());
        assert!(store.ordered_ids().is_empty());
        for token in tokens {
            assert!(token.is_cancelled());
        }
    }

    #[test]
    fn test_overall_progress_is_mean() {
        let store = UploadStore::new();
        let ids = store.add_tasks(vec![
            (payload("a.txt", 1), destination()),
            (payload("b.txt", 2), destination()),
        ]);

        store.set_progress(ids[0], 50.0);
        store.set_progress(ids[1], 100.0);
        assert_eq!(store.overall_progress(), 75.0);
    }

    #[test]
    fn test_dialog_hint() {
        let store = UploadStore::new();
        assert!(!store.dialog_open());
        store.set_dialog_open(true);
        assert!(store.dialog_open());
    }
}
