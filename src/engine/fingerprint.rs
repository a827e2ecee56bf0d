use blake3::Hasher;

use crate::store::UploadTask;

/// Deterministic resume identifier for one logical upload attempt.
///
/// Identical (path, name, size, mtime, user) means "the same upload": a retry
/// after a crash or reload recomputes the same key and can resume. Changing
/// any input yields a fresh key.
pub fn resume_fingerprint(
    path: &str,
    name: &str,
    size: u64,
    modified_at: &chrono::DateTime<chrono::Utc>,
    user_id: &str,
) -> String {
    let mut hasher = Hasher::new();

    // Separator byte between fields so boundaries cannot collide
    hasher.update(path.as_bytes());
    hasher.update(&[0]);
    hasher.update(name.as_bytes());
    hasher.update(&[0]);
    hasher.update(&size.to_le_bytes());
    hasher.update(&modified_at.timestamp_millis().to_le_bytes());
    hasher.update(user_id.as_bytes());

    hasher.finalize().to_hex().to_string()
}

/// Fingerprint for a queued task.
pub fn task_fingerprint(task: &UploadTask) -> String {
    resume_fingerprint(
        &task.destination.path,
        &task.payload.name,
        task.payload.size,
        &task.payload.modified_at,
        &task.destination.user_id,
    )
}
