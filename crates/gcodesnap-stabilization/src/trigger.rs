//! Trigger position classification
//!
//! Every eligible position is sorted into a [`PositionType`] by the kind of
//! motion that produced it. The variants are declared in quality order: a
//! later variant parks the nozzle with less risk of oozing or scarring the
//! print, so it makes the better snapshot trigger.

use gcodesnap_core::math::{greater_than, less_than};
use gcodesnap_tracker::MachinePosition;
use serde::{Deserialize, Serialize};

/// Kind of motion a candidate position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionType {
    Extrusion,
    Retraction,
    Lifting,
    Lifted,
    Travel,
    LiftingTravel,
    LiftedTravel,
    RetractedTravel,
    LiftingRetractedTravel,
    LiftedRetractedTravel,
    /// Not a usable trigger
    Unknown,
}

/// Number of ranked position types
pub const RANKED_POSITION_TYPES: usize = 10;

/// Lowest position type the high quality trigger accepts
pub const QUALITY_CUTOFF: PositionType = PositionType::Travel;

impl PositionType {
    /// Ranked types, worst first
    pub const RANKED: [PositionType; RANKED_POSITION_TYPES] = [
        Self::Extrusion,
        Self::Retraction,
        Self::Lifting,
        Self::Lifted,
        Self::Travel,
        Self::LiftingTravel,
        Self::LiftedTravel,
        Self::RetractedTravel,
        Self::LiftingRetractedTravel,
        Self::LiftedRetractedTravel,
    ];

    /// Index into the quality ranking, `None` for `Unknown`
    pub fn tier(self) -> Option<usize> {
        match self {
            Self::Unknown => None,
            ranked => Some(ranked as usize),
        }
    }

    /// Quality rank, -1 for `Unknown`
    pub fn rank(self) -> i32 {
        self.tier().map_or(-1, |tier| tier as i32)
    }

    pub fn is_extrusion(self) -> bool {
        self == Self::Extrusion
    }

    /// Classify the motion that produced `current`
    pub fn classify(current: &MachinePosition) -> Self {
        let extruder = current.extruder();
        if greater_than(extruder.e_relative, 0.0) {
            return if current.has_xy_position_changed {
                Self::Extrusion
            } else {
                Self::Unknown
            };
        }
        if less_than(extruder.e_relative, 0.0) {
            return Self::Retraction;
        }

        let lifting = greater_than(current.z_relative, 0.0);
        let lifted = current.is_zhop;
        let traveling = current.is_xy_travel || current.is_xyz_travel;

        match (traveling, extruder.is_retracted) {
            (true, true) if lifting => Self::LiftingRetractedTravel,
            (true, true) if lifted => Self::LiftedRetractedTravel,
            (true, true) => Self::RetractedTravel,
            (true, false) if lifting => Self::LiftingTravel,
            (true, false) if lifted => Self::LiftedTravel,
            (true, false) => Self::Travel,
            (false, _) if lifting => Self::Lifting,
            (false, _) if lifted => Self::Lifted,
            (false, _) => Self::Unknown,
        }
    }
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extrusion => write!(f, "extrusion"),
            Self::Retraction => write!(f, "retraction"),
            Self::Lifting => write!(f, "lifting"),
            Self::Lifted => write!(f, "lifted"),
            Self::Travel => write!(f, "travel"),
            Self::LiftingTravel => write!(f, "lifting_travel"),
            Self::LiftedTravel => write!(f, "lifted_travel"),
            Self::RetractedTravel => write!(f, "retracted_travel"),
            Self::LiftingRetractedTravel => write!(f, "lifting_retracted_travel"),
            Self::LiftedRetractedTravel => write!(f, "lifted_retracted_travel"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified candidate for the snapshot trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPosition {
    pub position_type: PositionType,
    /// Distance from the stabilization target in the XY plane
    pub distance: f64,
    pub position: MachinePosition,
}

impl TriggerPosition {
    pub fn new(position_type: PositionType, distance: f64, position: &MachinePosition) -> Self {
        Self {
            position_type,
            distance,
            position: position.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodesnap_parser::parse;
    use gcodesnap_tracker::{StateTracker, TrackerConfig};

    fn classify_last(lines: &[&str]) -> PositionType {
        let config = TrackerConfig {
            retraction_length: 1.0,
            z_lift_height: 0.4,
            ..Default::default()
        };
        let mut tracker = StateTracker::new(config);
        for (index, line) in lines.iter().enumerate() {
            tracker.update(&parse(line), index as i64 + 1, index as i64 + 1);
        }
        PositionType::classify(tracker.current())
    }

    const PRINTING: [&str; 3] = ["G28", "M83", "G1 X1 Y1 Z0.2 E1"];

    fn with_printing(extra: &[&'static str]) -> Vec<&'static str> {
        PRINTING.iter().chain(extra).copied().collect()
    }

    #[test]
    fn test_ranking_order() {
        assert_eq!(PositionType::Extrusion.tier(), Some(0));
        assert_eq!(PositionType::LiftedRetractedTravel.tier(), Some(9));
        assert_eq!(PositionType::Unknown.tier(), None);
        assert_eq!(PositionType::Unknown.rank(), -1);
        assert!(QUALITY_CUTOFF.rank() > PositionType::Lifted.rank());
        for (index, kind) in PositionType::RANKED.iter().enumerate() {
            assert_eq!(kind.tier(), Some(index));
        }
    }

    #[test]
    fn test_classify_motion() {
        assert_eq!(classify_last(&PRINTING), PositionType::Extrusion);
        assert_eq!(classify_last(&with_printing(&["G1 E-1"])), PositionType::Retraction);
        assert_eq!(classify_last(&with_printing(&["G1 X5 Y5"])), PositionType::Travel);
        assert_eq!(
            classify_last(&with_printing(&["G1 E-1", "G1 X5 Y5"])),
            PositionType::RetractedTravel
        );
        assert_eq!(classify_last(&with_printing(&["G1 Z0.8"])), PositionType::Lifting);
        assert_eq!(
            classify_last(&with_printing(&["G1 Z0.8", "G1 X5 Y5"])),
            PositionType::LiftedTravel
        );
        assert_eq!(
            classify_last(&with_printing(&["G1 E-1", "G1 X5 Y5 Z0.8"])),
            PositionType::LiftingRetractedTravel
        );
        assert_eq!(
            classify_last(&with_printing(&["G1 E-1", "G1 Z0.8", "G1 X5 Y5"])),
            PositionType::LiftedRetractedTravel
        );
        assert_eq!(classify_last(&with_printing(&["M104 S200"])), PositionType::Unknown);
    }
}
