use std::collections::HashMap;

use tracing::warn;

use crate::cache::{ExistenceCache, ExistenceResult};
use crate::remote::RemoteStore;
use crate::store::UploadPayload;

use super::types::{CheckOutcome, DuplicateCandidate};

/// Floor for the bulk-listing page size, to keep one round trip sufficient
/// even for large destination folders.
pub const MIN_LISTING_LIMIT: usize = 1000;

/// Resolve existence for a set of names in one listing round trip.
///
/// A transport failure never surfaces: every requested name degrades to
/// `exists = false` so the caller can still proceed. A false negative here
/// only risks a duplicate, never data loss or a blocked queue.
pub async fn check_batch(
    remote: &dyn RemoteStore,
    path: &str,
    names: &[String],
) -> HashMap<String, ExistenceResult> {
    let limit = (names.len() * 2).max(MIN_LISTING_LIMIT);

    let listing = match remote.list_files(path, limit).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(path, error = %e, "bulk existence check failed, assuming nothing exists");
            return names
                .iter()
                .map(|name| (name.clone(), ExistenceResult::missing()))
                .collect();
        }
    };

    let by_name: HashMap<&str, _> = listing.iter().map(|f| (f.name.as_str(), f)).collect();

    names
        .iter()
        .map(|name| {
            let result = match by_name.get(name.as_str()) {
                Some(file) => ExistenceResult::found(file.id.clone(), file.size),
                None => ExistenceResult::missing(),
            };
            (name.clone(), result)
        })
        .collect()
}

/// Single-name existence check with a byte-size comparison for stronger
/// duplicate heuristics. Degrades to `exists = false` on transport failure,
/// like the batch variant.
pub async fn check_one(
    remote: &dyn RemoteStore,
    path: &str,
    name: &str,
    local_size: u64,
) -> ExistenceResult {
    match remote.find_file(path, name).await {
        Ok(Some(file)) => {
            let mut result = ExistenceResult::found(file.id, file.size);
            result.size_mismatch = file.size != local_size;
            result
        }
        Ok(None) => ExistenceResult::missing(),
        Err(e) => {
            warn!(path, name, error = %e, "existence check failed, assuming file does not exist");
            ExistenceResult::missing()
        }
    }
}

/// Pre-upload sweep over a batch of files: consult the cache first, batch-
/// check only the misses, write fresh results back, and partition the input
/// into files to upload and files that collide.
///
/// The partition is total and disjoint: every input file lands in exactly
/// one of the two sets.
pub async fn optimized_check(
    remote: &dyn RemoteStore,
    cache: &ExistenceCache,
    path: &str,
    payloads: Vec<UploadPayload>,
) -> CheckOutcome {
    let mut cached: Vec<(UploadPayload, ExistenceResult)> = Vec::new();
    let mut misses: Vec<UploadPayload> = Vec::new();

    // 1. Partition into cache hits and misses
    for payload in payloads {
        match cache.get(path, &payload.name) {
            Some(result) => cached.push((payload, result)),
            None => misses.push(payload),
        }
    }

    // 2. One bulk check for the misses, freshening the cache
    let miss_names: Vec<String> = misses.iter().map(|p| p.name.clone()).collect();
    let fresh = if miss_names.is_empty() {
        HashMap::new()
    } else {
        check_batch(remote, path, &miss_names).await
    };

    for (name, result) in &fresh {
        cache.put(path, name, result.clone());
    }

    // 3. Merge and partition the full input
    let mut outcome = CheckOutcome::default();

    for (payload, result) in cached {
        if result.exists {
            outcome
                .already_exists
                .push(DuplicateCandidate::new(payload, result));
        } else {
            outcome.to_upload.push(payload);
        }
    }

    for payload in misses {
        // get, not remove: the input may hold two files with the same name
        let result = fresh
            .get(&payload.name)
            .cloned()
            .unwrap_or_else(ExistenceResult::missing);
        if result.exists {
            outcome
                .already_exists
                .push(DuplicateCandidate::new(payload, result));
        } else {
            outcome.to_upload.push(payload);
        }
    }

    outcome
}
