//! Stabilization target resolution

use crate::config::TargetSettings;
use gcodesnap_core::logging::SNAPSHOT_PLAN_TARGET;
use gcodesnap_core::{StabilizationError, TargetCallback};
use gcodesnap_tracker::BoundingBox;

/// The X/Y point the nozzle is parked at for snapshots.
///
/// Fixed and relative targets resolve once. Callback targets ask the host
/// again at the start of every plan cycle, passing the previous target.
pub struct StabilizationTarget {
    settings: TargetSettings,
    volume: BoundingBox,
    callback: Option<TargetCallback>,
    x: f64,
    y: f64,
}

impl StabilizationTarget {
    pub fn new(
        settings: TargetSettings,
        volume: BoundingBox,
        callback: Option<TargetCallback>,
    ) -> Result<Self, StabilizationError> {
        if matches!(settings, TargetSettings::Callback) && callback.is_none() {
            return Err(StabilizationError::MissingTargetCallback);
        }

        let mut target = Self {
            settings,
            volume,
            callback,
            x: 0.0,
            y: 0.0,
        };
        target.resolve();
        Ok(target)
    }

    /// Recompute the target coordinates
    pub fn resolve(&mut self) {
        let settings = self.settings;
        let (x, y) = match settings {
            TargetSettings::Fixed { x, y } => (x, y),
            TargetSettings::Relative {
                x_percent,
                y_percent,
            } => (
                self.volume.min_x + self.volume.width() * x_percent / 100.0,
                self.volume.min_y + self.volume.depth() * y_percent / 100.0,
            ),
            TargetSettings::Callback => match self.callback.as_mut() {
                Some(callback) => callback(self.x, self.y),
                None => (self.x, self.y),
            },
        };

        if x != self.x || y != self.y {
            tracing::debug!(target: SNAPSHOT_PLAN_TARGET, x, y, "stabilization target resolved");
        }
        self.x = x;
        self.y = y;
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl std::fmt::Debug for StabilizationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilizationTarget")
            .field("settings", &self.settings)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
