//! Stabilization configuration

use gcodesnap_core::StabilizationError;
use gcodesnap_tracker::BoundingBox;
use serde::{Deserialize, Serialize};

/// Print bed corner a snap-to-corner stabilization prefers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Default for Corner {
    fn default() -> Self {
        Self::BackRight
    }
}

impl Corner {
    /// Sign applied to X so that smaller values are preferred
    pub fn x_sign(self) -> f64 {
        match self {
            Self::FrontLeft | Self::BackLeft => 1.0,
            Self::FrontRight | Self::BackRight => -1.0,
        }
    }

    /// Sign applied to Y so that smaller values are preferred
    pub fn y_sign(self) -> f64 {
        match self {
            Self::FrontLeft | Self::FrontRight => 1.0,
            Self::BackLeft | Self::BackRight => -1.0,
        }
    }
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrontLeft => write!(f, "front left"),
            Self::FrontRight => write!(f, "front right"),
            Self::BackLeft => write!(f, "back left"),
            Self::BackRight => write!(f, "back right"),
        }
    }
}

/// Candidate selection policy of the smart layer stabilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmartLayerTrigger {
    /// Closest candidate of any kind
    Fastest,
    /// Non-extrusion candidates when the layer was printed at one speed
    Fast,
    /// Non-extrusion candidates whenever one exists
    Standard,
    /// Only candidates ranked at or above the travel tier
    HighQuality,
    /// Fastest or closest extrusion
    BestQuality,
}

impl Default for SmartLayerTrigger {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for SmartLayerTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fastest => write!(f, "fastest"),
            Self::Fast => write!(f, "fast"),
            Self::Standard => write!(f, "standard"),
            Self::HighQuality => write!(f, "high_quality"),
            Self::BestQuality => write!(f, "best_quality"),
        }
    }
}

/// How trigger positions are chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StabilizationMode {
    /// Extruding position closest to the target on each layer
    MinimizeTravel,
    /// Extruding position closest to a bed corner on each layer
    SnapToCorner {
        #[serde(default)]
        corner: Corner,
        #[serde(default = "default_favor_x")]
        favor_x: bool,
    },
    /// Tiered search over every kind of position on each layer
    SmartLayer {
        #[serde(default)]
        trigger_type: SmartLayerTrigger,
    },
    /// Snapshot wherever the file contains the snapshot command
    SmartGcode {
        #[serde(default = "default_snapshot_command")]
        snapshot_command: String,
    },
}

fn default_favor_x() -> bool {
    true
}

fn default_snapshot_command() -> String {
    "M240".to_string()
}

impl Default for StabilizationMode {
    fn default() -> Self {
        Self::SmartLayer {
            trigger_type: SmartLayerTrigger::Standard,
        }
    }
}

impl std::fmt::Display for StabilizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MinimizeTravel => write!(f, "minimize travel"),
            Self::SnapToCorner { corner, .. } => write!(f, "snap to {} corner", corner),
            Self::SmartLayer { trigger_type } => write!(f, "smart layer ({})", trigger_type),
            Self::SmartGcode { snapshot_command } => {
                write!(f, "smart gcode ({})", snapshot_command)
            }
        }
    }
}

/// Where the nozzle is parked for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetSettings {
    /// Absolute coordinates
    Fixed { x: f64, y: f64 },
    /// Percentages of the printer volume
    Relative { x_percent: f64, y_percent: f64 },
    /// Resolved by a host callback before each plan
    Callback,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self::Relative {
            x_percent: 50.0,
            y_percent: 50.0,
        }
    }
}

/// Stabilization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    pub mode: StabilizationMode,
    pub target: TargetSettings,
    /// Printable volume, used to resolve relative targets
    pub printer_volume: BoundingBox,
    /// Positions outside this box never trigger a snapshot
    pub bounds: Option<BoundingBox>,
    /// Space snapshots by this height instead of every layer; zero disables
    pub height_increment: f64,
    /// Prefer the faster of two equally good candidates
    pub fastest_speed: bool,
    /// Feedrate for the travel to the target, mm/min
    pub travel_speed: Option<f64>,
    /// Retract to the full retraction length before traveling
    pub retract_before_move: bool,
    pub retraction_length: f64,
    /// Lift before traveling unless already z-hopped
    pub lift_before_move: bool,
    pub lift_height: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            mode: StabilizationMode::default(),
            target: TargetSettings::default(),
            printer_volume: BoundingBox::default(),
            bounds: None,
            height_increment: 0.0,
            fastest_speed: true,
            travel_speed: None,
            retract_before_move: false,
            retraction_length: 2.0,
            lift_before_move: false,
            lift_height: 0.5,
        }
    }
}

impl StabilizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), StabilizationError> {
        if !self.height_increment.is_finite() || self.height_increment < 0.0 {
            return Err(StabilizationError::InvalidHeightIncrement {
                value: self.height_increment,
            });
        }

        self.printer_volume
            .check()
            .map_err(|reason| StabilizationError::InvalidBoundingBox { reason })?;
        if let Some(bounds) = &self.bounds {
            bounds
                .check()
                .map_err(|reason| StabilizationError::InvalidBoundingBox { reason })?;
        }

        if let TargetSettings::Relative {
            x_percent,
            y_percent,
        } = self.target
        {
            for (axis, percent) in [('x', x_percent), ('y', y_percent)] {
                if !(0.0..=100.0).contains(&percent) {
                    return Err(StabilizationError::InvalidRelativeTarget { axis, percent });
                }
            }
        }

        if let TargetSettings::Fixed { x, y } = self.target {
            if !x.is_finite() || !y.is_finite() {
                return Err(StabilizationError::InvalidSetting {
                    key: "target".to_string(),
                    reason: "fixed coordinates must be finite".to_string(),
                });
            }
        }

        if let Some(speed) = self.travel_speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(StabilizationError::InvalidSetting {
                    key: "travel_speed".to_string(),
                    reason: format!("must be positive, got {}", speed),
                });
            }
        }

        for (key, value) in [
            ("retraction_length", self.retraction_length),
            ("lift_height", self.lift_height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StabilizationError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("must be zero or positive, got {}", value),
                });
            }
        }

        if let StabilizationMode::SmartGcode { snapshot_command } = &self.mode {
            if gcodesnap_parser::parse(snapshot_command).is_empty() {
                return Err(StabilizationError::InvalidSnapshotCommand {
                    command: snapshot_command.clone(),
                });
            }
        }

        Ok(())
    }
}
