//! Client-side pacing of part uploads using the governor crate

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Paces part uploads against a rate-limited transport.
pub struct UploadPacer {
    /// Kilobytes per second limiter
    bytes_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    /// Parts per second limiter
    parts_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    /// Whether pacing is enabled
    enabled: bool,
}

impl UploadPacer {
    /// Create a pacer with the given limits.
    ///
    /// # Arguments
    /// * `bytes_per_second` - Maximum bytes per second (0 = unlimited)
    /// * `parts_per_second` - Maximum part starts per second (0 = unlimited)
    pub fn new(bytes_per_second: u32, parts_per_second: u32) -> Self {
        let bytes_limiter = if bytes_per_second > 0 {
            // 1KB quota units for finer control
            let kb_per_second = (bytes_per_second / 1024).max(1);
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(kb_per_second).unwrap()))
        } else {
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(u32::MAX).unwrap()))
        };

        let parts_limiter = if parts_per_second > 0 {
            RateLimiter::direct(Quota::per_second(
                NonZeroU32::new(parts_per_second).unwrap(),
            ))
        } else {
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(u32::MAX).unwrap()))
        };

        Self {
            bytes_limiter: Arc::new(bytes_limiter),
            parts_limiter: Arc::new(parts_limiter),
            enabled: bytes_per_second > 0 || parts_per_second > 0,
        }
    }

    /// Create a pacer that never waits.
    pub fn unlimited() -> Self {
        Self::new(0, 0)
    }

    /// Wait until a part of the given size may start uploading.
    pub async fn wait_for_part(&self, bytes: usize) {
        if !self.enabled {
            return;
        }

        self.parts_limiter.until_ready().await;

        let kb_units = (bytes.div_ceil(1024)).max(1) as u32;
        for _ in 0..kb_units {
            self.bytes_limiter.until_ready().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for UploadPacer {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Clone for UploadPacer {
    fn clone(&self) -> Self {
        Self {
            bytes_limiter: self.bytes_limiter.clone(),
            parts_limiter: self.parts_limiter.clone(),
            enabled: self.enabled,
        }
    }
}
