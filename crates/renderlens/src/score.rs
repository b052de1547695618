//! Severity of a render in `[0, 1]`, from its own cost and the frame rate
//! at the time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const TARGET_FPS: f64 = 60.0;
/// Self-time budget for renders that committed to the host.
pub const COMMIT_BUDGET_MS: f64 = 16.0;
/// Tighter budget for renders that were thrown away.
pub const WASTED_BUDGET_MS: f64 = 8.0;

pub trait FrameRate: Send + Sync {
    /// Frames per second measured most recently.
    fn current(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedFrameRate(pub f64);

impl Default for FixedFrameRate {
    fn default() -> Self {
        Self(TARGET_FPS)
    }
}

impl FrameRate for FixedFrameRate {
    fn current(&self) -> f64 {
        self.0
    }
}

/// Frame rate fed by an external counter. Clones share the reading.
#[derive(Debug, Clone)]
pub struct SharedFrameRate {
    bits: Arc<AtomicU64>,
}

impl SharedFrameRate {
    pub fn new(fps: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(fps.to_bits())),
        }
    }

    pub fn set(&self, fps: f64) {
        self.bits.store(fps.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedFrameRate {
    fn default() -> Self {
        Self::new(TARGET_FPS)
    }
}

impl FrameRate for SharedFrameRate {
    fn current(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Truncate (not round) to `digits` decimals.
pub fn truncate_float(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).trunc() / scale
}

pub fn duration_score(self_time_ms: f64, did_commit: bool) -> f64 {
    let budget = if did_commit {
        COMMIT_BUDGET_MS
    } else {
        WASTED_BUDGET_MS
    };
    (self_time_ms / budget).clamp(0.0, 1.0)
}

pub fn frame_rate_score(fps: f64) -> f64 {
    if fps < TARGET_FPS {
        truncate_float(((TARGET_FPS - fps) / TARGET_FPS).min(1.0), 4)
    } else {
        0.0
    }
}

/// Mean of the duration sub-score (only when a duration was measured) and
/// the frame-rate sub-score.
pub fn score(self_time_ms: Option<f64>, did_commit: bool, fps: f64) -> f64 {
    let fps_score = frame_rate_score(fps);
    match self_time_ms {
        Some(self_time) => (duration_score(self_time, did_commit) + fps_score) / 2.0,
        None => fps_score,
    }
}
