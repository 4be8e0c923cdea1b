//! Incremental machine state tracking
//!
//! [`StateTracker`] applies commands one at a time and keeps three frames in
//! a fixed rotate buffer: the current state, the previous state and the one
//! before it. An update overwrites the oldest frame with a copy of the
//! current one and applies the command to the copy, which leaves the older
//! frames untouched so a single update can be undone by moving the cursor.

use crate::comment::{ClassifierHandle, SlicerCommentClassifier};
use crate::config::TrackerConfig;
use crate::position::{ExtruderState, MachinePosition, PositionUpdate};
use gcodesnap_core::logging::POSITION_TARGET;
use gcodesnap_core::math::{
    greater_than, greater_than_or_equal, is_equal, is_zero, less_than, less_than_or_equal,
    FLOAT_TOLERANCE,
};
use gcodesnap_parser::{Command, ParameterValue};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Frames held by the rotate buffer
pub const SLOT_COUNT: usize = 3;

type Handler = fn(&mut MachinePosition, &Command, &TrackerConfig);

fn handlers() -> &'static HashMap<&'static str, Handler> {
    static HANDLERS: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();
    HANDLERS.get_or_init(|| {
        let mut table: HashMap<&'static str, Handler> = HashMap::new();
        table.insert("G0", linear_move);
        table.insert("G1", linear_move);
        // Arcs and firmware retraction are recognised but do not move the tracked position
        table.insert("G2", no_op);
        table.insert("G3", no_op);
        table.insert("G10", no_op);
        table.insert("G11", no_op);
        table.insert("M207", no_op);
        table.insert("M208", no_op);
        table.insert("G20", inches);
        table.insert("G21", millimeters);
        table.insert("G28", home);
        table.insert("G90", absolute_mode);
        table.insert("G91", relative_mode);
        table.insert("G92", set_position);
        table.insert("M82", extruder_absolute_mode);
        table.insert("M83", extruder_relative_mode);
        table.insert("T", tool_change);
        table
    })
}

/// True when the tracker applies the command word
pub fn is_tracked_command(word: &str) -> bool {
    handlers().contains_key(word)
}

/// Tracks machine state across a stream of commands
pub struct StateTracker {
    config: TrackerConfig,
    slots: [MachinePosition; SLOT_COUNT],
    cursor: usize,
    undo_available: bool,
    update_count: u64,
    /// Set by the first update, cleared only by `reset`
    has_updated: bool,
    classifier: ClassifierHandle,
}

impl StateTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_classifier(config, Box::new(SlicerCommentClassifier::new()))
    }

    /// Build a tracker that stamps feature tags with a custom classifier
    pub fn with_classifier(config: TrackerConfig, classifier: ClassifierHandle) -> Self {
        let initial = Self::initial_position(&config);
        Self {
            slots: [initial.clone(), initial.clone(), initial],
            config,
            cursor: 0,
            undo_available: false,
            update_count: 0,
            has_updated: false,
            classifier,
        }
    }

    fn initial_position(config: &TrackerConfig) -> MachinePosition {
        let mut position = MachinePosition::new(
            config.xyz_axis_default_mode.is_relative(),
            config.e_axis_default_mode.is_relative(),
            config.units_default.is_metric(),
            config.num_extruders,
        );
        position.is_in_bounds = config.bounds.is_none();
        position
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// State after the most recent update
    pub fn current(&self) -> &MachinePosition {
        &self.slots[self.cursor]
    }

    /// State before the most recent update
    pub fn previous(&self) -> &MachinePosition {
        &self.slots[(self.cursor + SLOT_COUNT - 1) % SLOT_COUNT]
    }

    /// Number of updates applied, less any undone
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn can_undo(&self) -> bool {
        self.undo_available
    }

    /// Apply one command and return the new current state.
    ///
    /// Lines without a command word only feed the comment classifier; they
    /// neither rotate the buffer nor affect undo.
    pub fn update(&mut self, command: &Command, file_line: i64, gcode_seq: i64) -> &MachinePosition {
        if command.is_empty() {
            if !command.comment.is_empty() {
                self.classifier.classify(&command.comment);
            }
            return self.current();
        }

        let next = (self.cursor + 1) % SLOT_COUNT;
        let (previous, position) = pair_mut(&mut self.slots, self.cursor, next);
        position.clone_from(previous);
        position.begin_update(command, file_line, gcode_seq);

        if !command.comment.is_empty() {
            self.classifier.classify(&command.comment);
        }
        position.feature_tag = self.classifier.current_feature();

        if let Some(handler) = handlers().get(command.word.as_str()) {
            position.gcode_was_ignored = false;
            handler(position, command, &self.config);
            derive_state(position, previous, &self.config);
        }

        self.cursor = next;
        self.undo_available = true;
        self.update_count += 1;
        self.has_updated = true;
        &self.slots[self.cursor]
    }

    /// Revert the most recent update.
    ///
    /// Only one level is kept: a second undo without an intervening update
    /// logs a warning and leaves the state alone. Undoing before any update
    /// is a caller bug and panics in debug builds.
    pub fn undo(&mut self) {
        debug_assert!(self.has_updated, "undo called before any update");
        if !self.undo_available {
            tracing::warn!(
                target: POSITION_TARGET,
                "undo ignored: only the most recent update can be undone"
            );
            return;
        }
        self.cursor = (self.cursor + SLOT_COUNT - 1) % SLOT_COUNT;
        self.undo_available = false;
        self.update_count -= 1;
    }

    /// Overwrite coordinates of the current state directly, bypassing axis
    /// modes and offsets
    pub fn override_position(&mut self, update: &PositionUpdate) {
        let bounds = self.config.bounds;
        let position = &mut self.slots[self.cursor];
        position.apply_update(update, true);
        position.is_in_bounds = match bounds {
            Some(bounds) => {
                !position.has_unset_axis() && bounds.contains(position.x, position.y, position.z)
            }
            None => true,
        };
        tracing::debug!(
            target: POSITION_TARGET,
            x = position.x,
            y = position.y,
            z = position.z,
            "position overridden"
        );
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        let initial = Self::initial_position(&self.config);
        self.slots = [initial.clone(), initial.clone(), initial];
        self.cursor = 0;
        self.undo_available = false;
        self.update_count = 0;
        self.has_updated = false;
        self.classifier.reset();
    }
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("config", &self.config)
            .field("cursor", &self.cursor)
            .field("undo_available", &self.undo_available)
            .field("update_count", &self.update_count)
            .field("current", self.current())
            .finish_non_exhaustive()
    }
}

/// Split two distinct slots into a shared and a mutable borrow
fn pair_mut(
    slots: &mut [MachinePosition],
    source: usize,
    target: usize,
) -> (&MachinePosition, &mut MachinePosition) {
    debug_assert_ne!(source, target);
    if source < target {
        let (head, tail) = slots.split_at_mut(target);
        (&head[source], &mut tail[0])
    } else {
        let (head, tail) = slots.split_at_mut(source);
        (&tail[0], &mut head[target])
    }
}

fn no_op(_: &mut MachinePosition, _: &Command, _: &TrackerConfig) {}

fn linear_move(position: &mut MachinePosition, command: &Command, _: &TrackerConfig) {
    let update = PositionUpdate::from_command(command);
    position.apply_update(&update, false);
    position.is_travel_only =
        update.e.is_none() && update.z.is_none() && (update.x.is_some() || update.y.is_some());
}

fn inches(position: &mut MachinePosition, _: &Command, _: &TrackerConfig) {
    position.is_metric = Some(false);
}

fn millimeters(position: &mut MachinePosition, _: &Command, _: &TrackerConfig) {
    position.is_metric = Some(true);
}

fn absolute_mode(position: &mut MachinePosition, _: &Command, config: &TrackerConfig) {
    position.is_relative = Some(false);
    if config.g90_influences_extruder {
        position.is_extruder_relative = Some(false);
    }
}

fn relative_mode(position: &mut MachinePosition, _: &Command, config: &TrackerConfig) {
    position.is_relative = Some(true);
    if config.g90_influences_extruder {
        position.is_extruder_relative = Some(true);
    }
}

fn extruder_absolute_mode(position: &mut MachinePosition, _: &Command, _: &TrackerConfig) {
    position.is_extruder_relative = Some(false);
}

fn extruder_relative_mode(position: &mut MachinePosition, _: &Command, _: &TrackerConfig) {
    position.is_extruder_relative = Some(true);
}

/// G28: home the named axes, or all of them, to the configured origin.
/// An origin configured as `None` marks the axis homed without giving it a
/// coordinate.
fn home(position: &mut MachinePosition, command: &Command, config: &TrackerConfig) {
    let named = command.has("X") || command.has("Y") || command.has("Z");
    let axes = [
        (
            !named || command.has("X"),
            config.origin_x,
            &mut position.x,
            &mut position.x_is_unset,
            &mut position.x_offset,
            &mut position.x_homed,
        ),
        (
            !named || command.has("Y"),
            config.origin_y,
            &mut position.y,
            &mut position.y_is_unset,
            &mut position.y_offset,
            &mut position.y_homed,
        ),
        (
            !named || command.has("Z"),
            config.origin_z,
            &mut position.z,
            &mut position.z_is_unset,
            &mut position.z_offset,
            &mut position.z_homed,
        ),
    ];
    for (selected, origin, coord, unset, offset, homed) in axes {
        if !selected {
            continue;
        }
        if let Some(origin) = origin {
            *coord = origin;
            *unset = false;
        }
        *offset = 0.0;
        *homed = true;
    }
    position.has_received_home_command = true;
}

/// G92: set the reported position without moving
fn set_position(position: &mut MachinePosition, command: &Command, _: &TrackerConfig) {
    let has_axis = ["X", "Y", "Z", "E"].iter().any(|axis| command.has(axis));

    if command.has("O") {
        position.x_homed = true;
        position.y_homed = true;
        position.z_homed = true;
        tracing::debug!(target: POSITION_TARGET, "G92 O: all axes marked as homed");
        if !has_axis {
            return;
        }
    }

    if !has_axis {
        if !position.x_is_unset {
            position.x_offset = position.x;
        }
        if !position.y_is_unset {
            position.y_offset = position.y;
        }
        if !position.z_is_unset {
            position.z_offset = position.z;
        }
        let extruder = position.extruder_mut();
        extruder.e_offset = extruder.e;
        return;
    }

    let axes = [
        (
            "X",
            &mut position.x,
            &mut position.x_is_unset,
            &mut position.x_offset,
            position.x_homed,
        ),
        (
            "Y",
            &mut position.y,
            &mut position.y_is_unset,
            &mut position.y_offset,
            position.y_homed,
        ),
        (
            "Z",
            &mut position.z,
            &mut position.z_is_unset,
            &mut position.z_offset,
            position.z_homed,
        ),
    ];
    for (axis, coord, unset, offset, homed) in axes {
        if !command.has(axis) {
            continue;
        }
        // A bare letter counts as zero
        let value = command.float(axis).unwrap_or(0.0);
        if !*unset && homed {
            *offset = *coord - value;
        } else {
            *coord = value;
            *offset = 0.0;
            *unset = false;
        }
    }

    if command.has("E") {
        let value = command.float("E").unwrap_or(0.0);
        let extruder = position.extruder_mut();
        extruder.e_offset = extruder.e - value;
    }
}

fn tool_change(position: &mut MachinePosition, command: &Command, _: &TrackerConfig) {
    match command.parameter("T").map(|parameter| &parameter.value) {
        Some(ParameterValue::UnsignedInt(tool)) => {
            let tool = *tool as usize;
            if tool < position.extruders.len() {
                position.current_tool = tool;
            } else {
                tracing::warn!(
                    target: POSITION_TARGET,
                    tool,
                    extruders = position.extruders.len(),
                    "tool change to an unconfigured extruder ignored"
                );
            }
        }
        Some(ParameterValue::Text(selection)) => {
            tracing::debug!(
                target: POSITION_TARGET,
                selection = selection.as_str(),
                "host-selected tool change, active tool unchanged"
            );
        }
        _ => {
            tracing::warn!(target: POSITION_TARGET, "tool change without a tool number");
        }
    }
}

/// Recompute every derived field of `current` from the coordinates the
/// handler produced and the previous frame
fn derive_state(current: &mut MachinePosition, previous: &MachinePosition, config: &TrackerConfig) {
    let tool = current.current_tool;
    let prior = previous
        .extruders
        .get(tool)
        .copied()
        .unwrap_or_default();

    current.z_relative = if current.z_is_unset || previous.z_is_unset {
        0.0
    } else {
        current.z - previous.z
    };

    update_extruder(current.extruder_mut(), &prior, config);
    let extruder = *current.extruder();

    current.has_xy_position_changed =
        !is_equal(current.x, previous.x) || !is_equal(current.y, previous.y);
    let axis_became_set = (previous.x_is_unset && !current.x_is_unset)
        || (previous.y_is_unset && !current.y_is_unset)
        || (previous.z_is_unset && !current.z_is_unset);
    current.has_position_changed = current.has_xy_position_changed
        || !is_zero(current.z_relative)
        || !is_zero(extruder.e_relative)
        || axis_became_set;

    update_layer(current, previous, &extruder, config);

    current.is_zhop = !extruder.is_extruding
        && !current.z_is_unset
        && !current.last_extrusion_height_is_unset
        && config.z_lift_height > 0.0
        && greater_than_or_equal(current.z - current.last_extrusion_height, config.z_lift_height);

    let traveling = current.has_xy_position_changed && !extruder.is_extruding;
    current.is_xy_travel = traveling && is_zero(current.z_relative);
    current.is_xyz_travel = traveling && !is_zero(current.z_relative);

    current.is_in_bounds = match &config.bounds {
        Some(bounds) => {
            !current.has_unset_axis() && bounds.contains(current.x, current.y, current.z)
        }
        None => true,
    };

    if !current.has_homed_position
        && current.is_homed()
        && !current.has_unset_axis()
        && current.is_metric.is_some()
        && current.is_relative.is_some()
        && current.is_extruder_relative.is_some()
    {
        current.has_homed_position = true;
        tracing::debug!(
            target: POSITION_TARGET,
            line = current.file_line_number,
            "definite position reached"
        );
    }

    current.has_state_changed = current.has_position_changed
        || current.is_relative != previous.is_relative
        || current.is_extruder_relative != previous.is_extruder_relative
        || current.is_metric != previous.is_metric
        || current.current_tool != previous.current_tool
        || current.x_homed != previous.x_homed
        || current.y_homed != previous.y_homed
        || current.z_homed != previous.z_homed
        || current.has_homed_position != previous.has_homed_position
        || current.is_layer_change
        || !is_equal(current.x_offset, previous.x_offset)
        || !is_equal(current.y_offset, previous.y_offset)
        || !is_equal(current.z_offset, previous.z_offset)
        || !is_equal(extruder.e_offset, prior.e_offset);
}

/// Extrusion and retraction bookkeeping for the active tool.
///
/// Extrusion and retraction are never positive together: any extrusion
/// first pays back the outstanding retraction and only the remainder counts
/// as extruded.
fn update_extruder(extruder: &mut ExtruderState, prior: &ExtruderState, config: &TrackerConfig) {
    let e_relative = extruder.e - prior.e;
    extruder.e_relative = e_relative;

    if greater_than(e_relative, 0.0) && prior.is_extruding && !prior.is_extruding_start {
        extruder.extrusion_length = e_relative;
        extruder.retraction_length = 0.0;
    } else {
        let retraction = prior.retraction_length - e_relative;
        if less_than_or_equal(retraction, 0.0) {
            extruder.extrusion_length = (-retraction).max(0.0);
            extruder.retraction_length = 0.0;
        } else {
            extruder.extrusion_length = 0.0;
            extruder.retraction_length = retraction;
        }
    }

    extruder.deretraction_length = if greater_than(prior.retraction_length, extruder.retraction_length)
    {
        prior.retraction_length - extruder.retraction_length
    } else {
        0.0
    };
    extruder.extrusion_length_total += extruder.extrusion_length;

    let full_retraction = config.retraction_length;
    extruder.is_extruding = greater_than(extruder.extrusion_length, 0.0);
    extruder.is_extruding_start = extruder.is_extruding && !prior.is_extruding;
    extruder.is_primed =
        is_zero(extruder.extrusion_length) && is_zero(extruder.retraction_length);
    extruder.is_retracting = greater_than(extruder.retraction_length, prior.retraction_length);
    extruder.is_retracting_start = extruder.is_retracting && !prior.is_retracting;
    extruder.is_retracted = if full_retraction > 0.0 {
        greater_than_or_equal(extruder.retraction_length, full_retraction)
    } else {
        greater_than(extruder.retraction_length, 0.0)
    };
    extruder.is_partially_retracted = greater_than(extruder.retraction_length, 0.0)
        && less_than(extruder.retraction_length, full_retraction);
    extruder.is_deretracting = greater_than(extruder.deretraction_length, 0.0);
    extruder.is_deretracting_start = extruder.is_deretracting && !prior.is_deretracting;
    extruder.is_deretracted =
        greater_than(prior.retraction_length, 0.0) && is_zero(extruder.retraction_length);
}

/// Priming, layer and height-increment tracking. Only extrusion at a known
/// height moves any of it.
fn update_layer(
    current: &mut MachinePosition,
    previous: &MachinePosition,
    extruder: &ExtruderState,
    config: &TrackerConfig,
) {
    if !extruder.is_extruding || current.z_is_unset {
        return;
    }

    if !current.is_printer_primed
        && (config.priming_height <= 0.0
            || less_than_or_equal(current.z, config.priming_height))
    {
        current.is_printer_primed = true;
        tracing::debug!(
            target: POSITION_TARGET,
            line = current.file_line_number,
            z = current.z,
            "printer primed"
        );
    }

    if !current.minimum_layer_height_reached
        && greater_than_or_equal(current.z, config.minimum_layer_height)
    {
        current.minimum_layer_height_reached = true;
    }

    if !current.is_printer_primed {
        return;
    }

    current.last_extrusion_height = current.z;
    current.last_extrusion_height_is_unset = false;

    if current.minimum_layer_height_reached && greater_than(current.z, previous.height) {
        current.height = current.z;
        current.layer += 1;
        current.is_layer_change = true;
        tracing::debug!(
            target: POSITION_TARGET,
            layer = current.layer,
            height = current.height,
            line = current.file_line_number,
            "layer change"
        );

        if config.height_increment > 0.0 {
            let index = ((current.height / config.height_increment) - FLOAT_TOLERANCE)
                .ceil()
                .max(1.0) as u32;
            if index > current.height_increment {
                current.height_increment = index;
                current.height_increment_change_count += 1;
                current.is_height_increment_change = true;
            }
        }
    }
}
