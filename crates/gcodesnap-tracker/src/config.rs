//! State tracker configuration
//!
//! Describes what the tracker assumes before the file says otherwise:
//! default axis modes and units, where homing puts each axis, and the
//! thresholds used to derive retraction, z-hop, priming and layer state.

use gcodesnap_core::TrackerError;
use serde::{Deserialize, Serialize};

/// Initial axis positioning mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    /// Coordinates are absolute
    Absolute,
    /// Coordinates are relative to the previous position
    Relative,
    /// Unknown until the file sets it
    Unset,
}

impl Default for AxisMode {
    fn default() -> Self {
        Self::Absolute
    }
}

impl AxisMode {
    /// The `is_relative` flag this mode starts a tracker with
    pub fn is_relative(self) -> Option<bool> {
        match self {
            Self::Absolute => Some(false),
            Self::Relative => Some(true),
            Self::Unset => None,
        }
    }
}

impl std::fmt::Display for AxisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
            Self::Unset => write!(f, "unset"),
        }
    }
}

/// Initial unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitsDefault {
    Millimeters,
    Inches,
    Unset,
}

impl Default for UnitsDefault {
    fn default() -> Self {
        Self::Millimeters
    }
}

impl UnitsDefault {
    /// The `is_metric` flag these units start a tracker with
    pub fn is_metric(self) -> Option<bool> {
        match self {
            Self::Millimeters => Some(true),
            Self::Inches => Some(false),
            Self::Unset => None,
        }
    }
}

/// Axis-aligned box, inclusive on every face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 250.0,
            min_y: 0.0,
            max_y: 210.0,
            min_z: 0.0,
            max_z: 200.0,
        }
    }
}

impl BoundingBox {
    pub fn new(min: (f64, f64, f64), max: (f64, f64, f64)) -> Self {
        Self {
            min_x: min.0,
            max_x: max.0,
            min_y: min.1,
            max_y: max.1,
            min_z: min.2,
            max_z: max.2,
        }
    }

    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x)
            && (self.min_y..=self.max_y).contains(&y)
            && (self.min_z..=self.max_z).contains(&z)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Describe why the box is unusable, if it is
    pub fn check(&self) -> Result<(), String> {
        let axes = [
            ('x', self.min_x, self.max_x),
            ('y', self.min_y, self.max_y),
            ('z', self.min_z, self.max_z),
        ];
        for (axis, min, max) in axes {
            if !min.is_finite() || !max.is_finite() {
                return Err(format!("{} limits must be finite", axis));
            }
            if min > max {
                return Err(format!("min_{} {} exceeds max_{} {}", axis, min, axis, max));
            }
        }
        Ok(())
    }
}

/// State tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Mode for X/Y/Z before the file sends G90/G91
    pub xyz_axis_default_mode: AxisMode,
    /// Mode for E before the file sends M82/M83
    pub e_axis_default_mode: AxisMode,
    /// Units before the file sends G20/G21
    pub units_default: UnitsDefault,
    /// Whether G90/G91 also switch the extruder mode
    pub g90_influences_extruder: bool,
    /// Where G28 puts X; `None` leaves the coordinate unknown
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
    pub origin_z: Option<f64>,
    /// Retraction length at or beyond which the extruder counts as retracted
    pub retraction_length: f64,
    /// Gap above the last extrusion height that counts as a z-hop
    pub z_lift_height: f64,
    /// Extrusion at or below this height primes the printer; zero primes on first extrusion
    pub priming_height: f64,
    /// Lowest extrusion height that can start a layer
    pub minimum_layer_height: f64,
    /// Height step for height-increment tracking; zero disables it
    pub height_increment: f64,
    pub num_extruders: usize,
    /// Positions outside this box are flagged out of bounds
    pub bounds: Option<BoundingBox>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            xyz_axis_default_mode: AxisMode::Absolute,
            e_axis_default_mode: AxisMode::Absolute,
            units_default: UnitsDefault::Millimeters,
            g90_influences_extruder: false,
            origin_x: Some(0.0),
            origin_y: Some(0.0),
            origin_z: Some(0.0),
            retraction_length: 2.0,
            z_lift_height: 0.5,
            priming_height: 0.0,
            minimum_layer_height: 0.05,
            height_increment: 0.0,
            num_extruders: 1,
            bounds: None,
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TrackerError> {
        let non_negative = [
            ("retraction_length", self.retraction_length),
            ("z_lift_height", self.z_lift_height),
            ("priming_height", self.priming_height),
            ("minimum_layer_height", self.minimum_layer_height),
            ("height_increment", self.height_increment),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::InvalidConfig {
                    key: key.to_string(),
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }

        if self.num_extruders == 0 {
            return Err(TrackerError::InvalidConfig {
                key: "num_extruders".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(bounds) = &self.bounds {
            bounds.check().map_err(|reason| TrackerError::InvalidConfig {
                key: "bounds".to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}
