//! Soft issues collected during processing
//!
//! None of these stop a run. They are reported alongside the plans so the
//! host can explain missing or poor snapshots after the fact.

use crate::config::SmartLayerTrigger;
use gcodesnap_tracker::MachinePosition;
use serde::{Deserialize, Serialize};

/// Something that lowers snapshot quality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityIssue {
    /// A speed-oriented smart layer trigger is configured
    FastTriggerSelected { trigger: SmartLayerTrigger },
    /// The high quality trigger found no candidate on a layer
    NoQualifyingPosition { layer: i64 },
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FastTriggerSelected { trigger } => write!(
                f,
                "The {} trigger may snapshot while extruding, which can leave marks on the print",
                trigger
            ),
            Self::NoQualifyingPosition { layer } => write!(
                f,
                "No high quality trigger position was found on layer {}; the snapshot was skipped",
                layer
            ),
        }
    }
}

/// Something in the file that prevented or limited planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingIssue {
    XyzAxisModeUnknown,
    EAxisModeUnknown,
    NoDefinitePosition,
    PrinterNeverPrimed,
    UnitsNotMetric,
    NoSnapshotCommandsFound,
}

impl ProcessingIssue {
    /// Issues visible in the final tracker state
    pub fn from_final_position(position: &MachinePosition) -> Vec<Self> {
        let mut issues = Vec::new();
        if position.is_relative.is_none() {
            issues.push(Self::XyzAxisModeUnknown);
        }
        if position.is_extruder_relative.is_none() {
            issues.push(Self::EAxisModeUnknown);
        }
        if !position.has_homed_position {
            issues.push(Self::NoDefinitePosition);
        }
        if !position.is_printer_primed {
            issues.push(Self::PrinterNeverPrimed);
        }
        if position.is_metric != Some(true) {
            issues.push(Self::UnitsNotMetric);
        }
        issues
    }
}

impl std::fmt::Display for ProcessingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XyzAxisModeUnknown => {
                write!(f, "The file never set the X/Y/Z axis mode (G90/G91)")
            }
            Self::EAxisModeUnknown => {
                write!(f, "The file never set the extruder axis mode (M82/M83)")
            }
            Self::NoDefinitePosition => {
                write!(f, "The printer never reached a definite, homed position")
            }
            Self::PrinterNeverPrimed => write!(f, "The printer was never primed"),
            Self::UnitsNotMetric => write!(f, "The file does not use millimeters (G21)"),
            Self::NoSnapshotCommandsFound => {
                write!(f, "The file contains no snapshot commands")
            }
        }
    }
}
