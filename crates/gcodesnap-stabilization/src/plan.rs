//! Snapshot plans

use crate::trigger::PositionType;
use gcodesnap_parser::Command;
use gcodesnap_tracker::MachinePosition;
use serde::{Deserialize, Serialize};

/// What a plan step asks the printer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Pull filament back by `e`
    Retract,
    /// Raise the nozzle to `z`
    Lift,
    /// Move to `x`/`y`
    Travel,
    /// Take the picture
    Snapshot,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retract => write!(f, "retract"),
            Self::Lift => write!(f, "lift"),
            Self::Travel => write!(f, "travel"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// One step of a snapshot plan. Coordinates the step does not use are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: PlanAction,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
    pub f: Option<f64>,
}

impl PlanStep {
    pub fn retract(length: f64) -> Self {
        Self {
            action: PlanAction::Retract,
            x: None,
            y: None,
            z: None,
            e: Some(length),
            f: None,
        }
    }

    pub fn lift(z: f64) -> Self {
        Self {
            action: PlanAction::Lift,
            x: None,
            y: None,
            z: Some(z),
            e: None,
            f: None,
        }
    }

    pub fn travel(x: f64, y: f64, speed: Option<f64>) -> Self {
        Self {
            action: PlanAction::Travel,
            x: Some(x),
            y: Some(y),
            z: None,
            e: None,
            f: speed,
        }
    }

    pub fn snapshot() -> Self {
        Self {
            action: PlanAction::Snapshot,
            x: None,
            y: None,
            z: None,
            e: None,
            f: None,
        }
    }
}

/// Where and how to take one snapshot.
///
/// The printer pauses after `triggering_command`, runs `steps`, and resumes
/// from `return_position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPlan {
    pub triggering_command: Command,
    pub initial_position: MachinePosition,
    pub steps: Vec<PlanStep>,
    pub return_position: MachinePosition,
    pub layer: i64,
    pub file_line_number: i64,
    pub gcode_sequence_number: i64,
    pub position_type: PositionType,
    pub distance_from_target: f64,
}

impl SnapshotPlan {
    /// Steps with the given action
    pub fn steps_of(&self, action: PlanAction) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(move |step| step.action == action)
    }

    /// Target of the travel step, if the plan has one
    pub fn travel_target(&self) -> Option<(f64, f64)> {
        self.steps_of(PlanAction::Travel)
            .find_map(|step| Some((step.x?, step.y?)))
    }
}
