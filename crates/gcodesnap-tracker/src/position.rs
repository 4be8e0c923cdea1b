//! Machine position frames
//!
//! A [`MachinePosition`] is the complete machine state after one command has
//! been applied. The tracker owns three of them and clones one into the next
//! on every update, so everything here is a plain value type.

use crate::comment::FeatureType;
use gcodesnap_core::logging::POSITION_TARGET;
use gcodesnap_parser::Command;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Extrusion and retraction state of one tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtruderState {
    /// Reported E coordinate, offset applied
    pub e: f64,
    pub e_offset: f64,
    /// E moved by the last command
    pub e_relative: f64,
    pub extrusion_length: f64,
    pub extrusion_length_total: f64,
    pub retraction_length: f64,
    pub deretraction_length: f64,
    pub is_extruding_start: bool,
    pub is_extruding: bool,
    pub is_primed: bool,
    pub is_retracting_start: bool,
    pub is_retracting: bool,
    pub is_retracted: bool,
    pub is_partially_retracted: bool,
    pub is_deretracting_start: bool,
    pub is_deretracting: bool,
    pub is_deretracted: bool,
}

impl ExtruderState {
    pub const fn new() -> Self {
        Self {
            e: 0.0,
            e_offset: 0.0,
            e_relative: 0.0,
            extrusion_length: 0.0,
            extrusion_length_total: 0.0,
            retraction_length: 0.0,
            deretraction_length: 0.0,
            is_extruding_start: false,
            is_extruding: false,
            is_primed: false,
            is_retracting_start: false,
            is_retracting: false,
            is_retracted: false,
            is_partially_retracted: false,
            is_deretracting_start: false,
            is_deretracting: false,
            is_deretracted: false,
        }
    }
}

impl Default for ExtruderState {
    fn default() -> Self {
        Self::new()
    }
}

static IDLE_EXTRUDER: ExtruderState = ExtruderState::new();

/// Coordinates requested by a move or an override. `None` means the axis is
/// absent from the command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
    pub f: Option<f64>,
}

impl PositionUpdate {
    /// Collect the axis parameters of a move command
    pub fn from_command(command: &Command) -> Self {
        Self {
            x: command.float("X"),
            y: command.float("Y"),
            z: command.float("Z"),
            e: command.float("E"),
            f: command.float("F"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none() && self.e.is_none()
    }
}

/// Machine state after applying one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachinePosition {
    pub x: f64,
    pub x_is_unset: bool,
    pub y: f64,
    pub y_is_unset: bool,
    pub z: f64,
    pub z_is_unset: bool,
    pub f: f64,
    pub f_is_unset: bool,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,

    /// `None` until the file or the configuration names a mode
    pub is_relative: Option<bool>,
    pub is_extruder_relative: Option<bool>,
    pub is_metric: Option<bool>,

    pub x_homed: bool,
    pub y_homed: bool,
    pub z_homed: bool,

    pub current_tool: usize,
    /// One entry per configured tool. E is never unset: it starts at zero.
    pub extruders: SmallVec<[ExtruderState; 2]>,

    pub z_relative: f64,
    /// Zero until the first layer change
    pub layer: i64,
    pub height: f64,
    pub last_extrusion_height: f64,
    pub last_extrusion_height_is_unset: bool,
    pub height_increment: u32,
    pub height_increment_change_count: u32,
    pub is_height_increment_change: bool,
    pub is_printer_primed: bool,
    pub minimum_layer_height_reached: bool,
    pub is_layer_change: bool,
    pub is_zhop: bool,
    pub is_xy_travel: bool,
    pub is_xyz_travel: bool,
    /// X or Y moved without Z or E
    pub is_travel_only: bool,

    pub file_line_number: i64,
    pub gcode_sequence_number: i64,
    pub gcode_was_ignored: bool,
    pub is_in_bounds: bool,
    pub has_xy_position_changed: bool,
    pub has_position_changed: bool,
    pub has_state_changed: bool,
    pub has_homed_position: bool,
    pub has_received_home_command: bool,
    pub feature_tag: FeatureType,

    pub command: Command,
}

impl MachinePosition {
    /// Initial frame: every axis unset, modes taken from the caller.
    pub fn new(
        is_relative: Option<bool>,
        is_extruder_relative: Option<bool>,
        is_metric: Option<bool>,
        num_extruders: usize,
    ) -> Self {
        Self {
            x: 0.0,
            x_is_unset: true,
            y: 0.0,
            y_is_unset: true,
            z: 0.0,
            z_is_unset: true,
            f: 0.0,
            f_is_unset: true,
            x_offset: 0.0,
            y_offset: 0.0,
            z_offset: 0.0,
            is_relative,
            is_extruder_relative,
            is_metric,
            x_homed: false,
            y_homed: false,
            z_homed: false,
            current_tool: 0,
            extruders: smallvec![ExtruderState::new(); num_extruders.max(1)],
            z_relative: 0.0,
            layer: 0,
            height: 0.0,
            last_extrusion_height: 0.0,
            last_extrusion_height_is_unset: true,
            height_increment: 0,
            height_increment_change_count: 0,
            is_height_increment_change: false,
            is_printer_primed: false,
            minimum_layer_height_reached: false,
            is_layer_change: false,
            is_zhop: false,
            is_xy_travel: false,
            is_xyz_travel: false,
            is_travel_only: false,
            file_line_number: 0,
            gcode_sequence_number: 0,
            gcode_was_ignored: true,
            is_in_bounds: true,
            has_xy_position_changed: false,
            has_position_changed: false,
            has_state_changed: false,
            has_homed_position: false,
            has_received_home_command: false,
            feature_tag: FeatureType::Unknown,
            command: Command::default(),
        }
    }

    /// State of the active tool
    pub fn extruder(&self) -> &ExtruderState {
        self.extruders
            .get(self.current_tool)
            .unwrap_or(&IDLE_EXTRUDER)
    }

    /// Mutable state of the active tool.
    ///
    /// `current_tool` is only ever set to an index below the extruder count,
    /// so the lookup cannot miss once the frame has been built by the tracker.
    pub fn extruder_mut(&mut self) -> &mut ExtruderState {
        if self.current_tool >= self.extruders.len() {
            self.current_tool = 0;
        }
        if self.extruders.is_empty() {
            self.extruders.push(ExtruderState::new());
        }
        &mut self.extruders[self.current_tool]
    }

    /// E coordinate of the active tool
    pub fn e(&self) -> f64 {
        self.extruder().e
    }

    pub fn has_unset_axis(&self) -> bool {
        self.x_is_unset || self.y_is_unset || self.z_is_unset
    }

    pub fn is_homed(&self) -> bool {
        self.x_homed && self.y_homed && self.z_homed
    }

    /// Clear per-command flags before the next command is applied
    pub(crate) fn begin_update(&mut self, command: &Command, file_line: i64, gcode_seq: i64) {
        self.command.clone_from(command);
        self.file_line_number = file_line;
        self.gcode_sequence_number = gcode_seq;
        self.gcode_was_ignored = true;
        self.is_layer_change = false;
        self.is_height_increment_change = false;
        self.is_travel_only = false;
        self.is_xy_travel = false;
        self.is_xyz_travel = false;
        self.has_xy_position_changed = false;
        self.has_position_changed = false;
        self.has_state_changed = false;
        self.z_relative = 0.0;
        for extruder in self.extruders.iter_mut() {
            extruder.e_relative = 0.0;
        }
    }

    /// Apply requested coordinates.
    ///
    /// With `force` the values are written as absolute coordinates regardless
    /// of mode or offsets. Otherwise each axis follows the current mode; an
    /// axis that cannot be resolved is logged and skipped while the others
    /// still move.
    pub fn apply_update(&mut self, update: &PositionUpdate, force: bool) {
        if let Some(f) = update.f {
            self.f = f;
            self.f_is_unset = false;
        }

        if force {
            for (value, coord, unset) in [
                (update.x, &mut self.x, &mut self.x_is_unset),
                (update.y, &mut self.y, &mut self.y_is_unset),
                (update.z, &mut self.z, &mut self.z_is_unset),
            ] {
                if let Some(value) = value {
                    *coord = value;
                    *unset = false;
                }
            }
            if let Some(e) = update.e {
                self.extruder_mut().e = e;
            }
            return;
        }

        let line = self.file_line_number;
        if update.x.is_some() || update.y.is_some() || update.z.is_some() {
            match self.is_relative {
                None => {
                    tracing::error!(
                        target: POSITION_TARGET,
                        line,
                        "cannot move X/Y/Z: the axis mode has not been set"
                    );
                }
                Some(relative) => {
                    let axes = [
                        ('X', update.x, &mut self.x, &mut self.x_is_unset, self.x_offset),
                        ('Y', update.y, &mut self.y, &mut self.y_is_unset, self.y_offset),
                        ('Z', update.z, &mut self.z, &mut self.z_is_unset, self.z_offset),
                    ];
                    for (axis, value, coord, unset, offset) in axes {
                        let Some(value) = value else { continue };
                        if !relative {
                            *coord = value + offset;
                            *unset = false;
                        } else if *unset {
                            tracing::error!(
                                target: POSITION_TARGET,
                                line,
                                "cannot apply a relative {} move: the {} position is unknown",
                                axis,
                                axis
                            );
                        } else {
                            *coord += value;
                        }
                    }
                }
            }
        }

        if let Some(e) = update.e {
            match self.is_extruder_relative {
                None => {
                    tracing::error!(
                        target: POSITION_TARGET,
                        line,
                        "cannot move E: the extruder mode has not been set"
                    );
                }
                Some(true) => self.extruder_mut().e += e,
                Some(false) => {
                    let extruder = self.extruder_mut();
                    extruder.e = e + extruder.e_offset;
                }
            }
        }
    }
}

impl Default for MachinePosition {
    fn default() -> Self {
        Self::new(Some(false), Some(false), Some(true), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_position_is_unset() {
        let position = MachinePosition::default();
        assert!(position.x_is_unset && position.y_is_unset && position.z_is_unset);
        assert!(position.has_unset_axis());
        assert_eq!(position.layer, 0);
        assert_eq!(position.extruders.len(), 1);
        assert_eq!(position.e(), 0.0);
    }

    #[test]
    fn test_absolute_update_applies_offsets() {
        let mut position = MachinePosition::default();
        position.x_offset = 1.0;
        position.extruder_mut().e_offset = 0.5;
        position.apply_update(
            &PositionUpdate {
                x: Some(10.0),
                e: Some(2.0),
                f: Some(1200.0),
                ..Default::default()
            },
            false,
        );
        assert_eq!(position.x, 11.0);
        assert!(!position.x_is_unset);
        assert!(position.y_is_unset);
        assert_eq!(position.e(), 2.5);
        assert_eq!(position.f, 1200.0);
    }

    #[test]
    fn test_relative_update_skips_unset_axis() {
        let mut position = MachinePosition::new(Some(true), Some(true), Some(true), 1);
        position.x = 5.0;
        position.x_is_unset = false;
        position.apply_update(
            &PositionUpdate {
                x: Some(2.0),
                y: Some(3.0),
                e: Some(-1.0),
                ..Default::default()
            },
            false,
        );
        assert_eq!(position.x, 7.0);
        assert!(position.y_is_unset);
        assert_eq!(position.y, 0.0);
        assert_eq!(position.e(), -1.0);
    }

    #[test]
    fn test_unknown_mode_leaves_coordinates() {
        let mut position = MachinePosition::new(None, None, None, 1);
        position.apply_update(
            &PositionUpdate {
                x: Some(2.0),
                e: Some(1.0),
                ..Default::default()
            },
            false,
        );
        assert!(position.x_is_unset);
        assert_eq!(position.e(), 0.0);
    }

    #[test]
    fn test_forced_update_ignores_mode_and_offsets() {
        let mut position = MachinePosition::new(None, None, None, 1);
        position.z_offset = 4.0;
        position.apply_update(
            &PositionUpdate {
                z: Some(1.5),
                e: Some(3.0),
                ..Default::default()
            },
            true,
        );
        assert_eq!(position.z, 1.5);
        assert!(!position.z_is_unset);
        assert_eq!(position.e(), 3.0);
    }

    #[test]
    fn test_update_from_command() {
        let command = gcodesnap_parser::parse("G1 X1 Y2 E0.5");
        let update = PositionUpdate::from_command(&command);
        assert_eq!(update.x, Some(1.0));
        assert_eq!(update.z, None);
        assert!(!update.is_empty());
        assert!(PositionUpdate::default().is_empty());
    }
}
