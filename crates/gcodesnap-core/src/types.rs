//! Host callback types.
//!
//! The processing loop hands control back to its host at two points: the
//! wall-clock gated progress report and, for callback driven stabilization
//! targets, once per snapshot plan cycle to resolve the target coordinate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Share of the input consumed, 0 to 100. Zero when the size is unknown.
    pub percent: f64,
    pub seconds_elapsed: f64,
    /// Linear extrapolation from `percent` and `seconds_elapsed`.
    pub seconds_remaining: f64,
    pub gcodes_processed: i64,
    pub lines_processed: i64,
}

impl ProgressReport {
    /// Build a report from raw counters.
    pub fn new(
        bytes_read: u64,
        total_bytes: Option<u64>,
        elapsed: Duration,
        gcodes_processed: i64,
        lines_processed: i64,
    ) -> Self {
        let percent = match total_bytes {
            Some(total) if total > 0 => ((bytes_read as f64 / total as f64) * 100.0).min(100.0),
            _ => 0.0,
        };
        let seconds_elapsed = elapsed.as_secs_f64();
        let seconds_remaining = if percent > 0.0 {
            seconds_elapsed * (100.0 - percent) / percent
        } else {
            0.0
        };

        Self {
            percent,
            seconds_elapsed,
            seconds_remaining,
            gcodes_processed,
            lines_processed,
        }
    }
}

/// A stabilization target callback receiving the prior target `(x, y)` and
/// returning the target for the next plan cycle.
pub type TargetCallback = Box<dyn FnMut(f64, f64) -> (f64, f64) + Send>;
