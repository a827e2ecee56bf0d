use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::remote::ResumeRecord;

/// Per-part progress table for one transfer. Parts already committed in the
/// resume record start at 100; live parts only ever move forward.
pub struct PartProgress {
    slots: Mutex<Vec<f64>>,
}

impl PartProgress {
    pub fn new(total_parts: u32, resumed: &ResumeRecord) -> Self {
        let slots = (1..=total_parts)
            .map(|part_no| if resumed.contains(part_no) { 100.0 } else { 0.0 })
            .collect();

        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Record a part's fractional progress. Regressions are ignored.
    pub fn set(&self, part_no: u32, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(part_no.saturating_sub(1) as usize) {
            if percent > *slot {
                *slot = percent;
            }
        }
    }

    /// Overall progress: arithmetic mean over every sequence number.
    pub fn mean(&self) -> f64 {
        let slots = self.slots.lock();
        if slots.is_empty() {
            return 100.0;
        }
        slots.iter().sum::<f64>() / slots.len() as f64
    }
}

/// Rate limiter for progress pushes into shared state: emit at most once per
/// interval, and only when the value advanced by the threshold or reached
/// exactly 100. Prevents write amplification under rapid part completions.
pub struct ProgressThrottle {
    min_interval: Duration,
    min_delta: f64,
    last_emit: Option<Instant>,
    last_value: f64,
}

impl ProgressThrottle {
    pub fn new(min_interval: Duration, min_delta: f64) -> Self {
        Self {
            min_interval,
            min_delta,
            last_emit: None,
            last_value: 0.0,
        }
    }

    /// Decide whether `value` should be pushed to shared state now.
    pub fn observe(&mut self, value: f64) -> bool {
        let now = Instant::now();

        let hit_completion = value >= 100.0 && self.last_value < 100.0;
        let interval_ok = self
            .last_emit
            .map(|at| now.duration_since(at) >= self.min_interval)
            .unwrap_or(true);
        let advanced = value - self.last_value >= self.min_delta;

        if hit_completion || (interval_ok && advanced) {
            self.last_emit = Some(now);
            self.last_value = value;
            return true;
        }

        false
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 1.0)
    }
}
