//! Stabilization strategies
//!
//! [`Stabilization`] is the closed set of trigger strategies behind one
//! interface. The layer based strategies share [`StabilizationCore`], which
//! owns the target, the eligibility filter, the plan builder and the cycle
//! state machine:
//!
//! ```text
//! Idle --layer change--> PendingFlush --eligible candidate--> Accumulating
//! Accumulating --layer change--> flush (emit plan) --> PendingFlush
//! Accumulating --end of file--> flush (emit plan)
//! ```
//!
//! The strategies only decide which candidate wins.

mod minimize_travel;
mod smart_gcode;
mod smart_layer;
mod snap_to_corner;

use crate::config::{SmartLayerTrigger, StabilizationConfig, StabilizationMode};
use crate::issues::{ProcessingIssue, QualityIssue};
use crate::plan::{PlanStep, SnapshotPlan};
use crate::target::StabilizationTarget;
use crate::trigger::TriggerPosition;
use gcodesnap_core::logging::SNAPSHOT_PLAN_TARGET;
use gcodesnap_core::math::{
    distance_xy, greater_than, is_equal, less_than, FLOAT_TOLERANCE,
};
use gcodesnap_core::{StabilizationError, TargetCallback};
use gcodesnap_parser::Command;
use gcodesnap_tracker::{BoundingBox, MachinePosition};

use minimize_travel::MinimizeTravel;
use smart_gcode::SmartGcode;
use smart_layer::SmartLayer;
use snap_to_corner::SnapToCorner;

/// Where a layer based strategy is in its plan cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    /// Waiting for the first layer change
    Idle,
    /// A layer started; no candidate yet
    PendingFlush,
    /// At least one candidate is held for the current layer
    Accumulating,
}

/// Candidate selection of a layer based strategy
pub(crate) trait TriggerStrategy {
    /// Offer an eligible position and the one before it
    fn consider(
        &mut self,
        core: &StabilizationCore,
        current: &MachinePosition,
        previous: &MachinePosition,
    );

    fn has_candidate(&self) -> bool;

    /// Pick the trigger for the finished layer and clear all candidates
    fn take_trigger(&mut self, core: &mut StabilizationCore) -> Option<TriggerPosition>;
}

#[derive(Debug, Clone, Copy)]
struct StepOptions {
    retract_before_move: bool,
    retraction_length: f64,
    lift_before_move: bool,
    lift_height: f64,
    travel_speed: Option<f64>,
}

/// State shared by every strategy
#[derive(Debug)]
pub(crate) struct StabilizationCore {
    target: StabilizationTarget,
    bounds: Option<BoundingBox>,
    height_increment: f64,
    height_increment_index: u32,
    pub(crate) fastest_speed: bool,
    steps: StepOptions,
    plans: Vec<SnapshotPlan>,
    previous_plan_position: Option<(f64, f64)>,
    state: CycleState,
    quality_issues: Vec<QualityIssue>,
    processing_issues: Vec<ProcessingIssue>,
}

impl StabilizationCore {
    fn new(config: &StabilizationConfig, target: StabilizationTarget) -> Self {
        Self {
            target,
            bounds: config.bounds,
            height_increment: config.height_increment,
            height_increment_index: 0,
            fastest_speed: config.fastest_speed,
            steps: StepOptions {
                retract_before_move: config.retract_before_move,
                retraction_length: config.retraction_length,
                lift_before_move: config.lift_before_move,
                lift_height: config.lift_height,
                travel_speed: config.travel_speed,
            },
            plans: Vec::new(),
            previous_plan_position: None,
            state: CycleState::Idle,
            quality_issues: Vec::new(),
            processing_issues: Vec::new(),
        }
    }

    /// A position can trigger a snapshot only when it is on a real layer,
    /// fully known, produced by a tracked command and inside the bounds
    pub(crate) fn can_process(&self, position: &MachinePosition) -> bool {
        position.layer != 0
            && !position.has_unset_axis()
            && !position.gcode_was_ignored
            && position.is_in_bounds
            && self
                .bounds
                .map_or(true, |bounds| bounds.contains(position.x, position.y, position.z))
    }

    /// Layer changes start a new plan cycle. With a height increment only
    /// the first layer change at or above each multiple of it does.
    fn is_layer_trigger(&mut self, position: &MachinePosition) -> bool {
        if !position.is_layer_change {
            return false;
        }
        if self.height_increment <= 0.0 {
            return true;
        }

        let index = ((position.height / self.height_increment) - FLOAT_TOLERANCE)
            .ceil()
            .max(1.0) as u32;
        if index > self.height_increment_index {
            self.height_increment_index = index;
            true
        } else {
            false
        }
    }

    pub(crate) fn distance_to_target(&self, position: &MachinePosition) -> f64 {
        let (x, y) = self.target.coordinates();
        distance_xy(position.x, position.y, x, y)
    }

    /// Break a tie between two equally ranked positions: the faster one
    /// when configured, then the one nearer the last snapshot
    pub(crate) fn tie_break(&self, candidate: &MachinePosition, incumbent: &MachinePosition) -> bool {
        if self.fastest_speed {
            if greater_than(candidate.f, incumbent.f) {
                return true;
            }
            if less_than(candidate.f, incumbent.f) {
                return false;
            }
        }
        match self.previous_plan_position {
            Some((x, y)) => less_than(
                distance_xy(candidate.x, candidate.y, x, y),
                distance_xy(incumbent.x, incumbent.y, x, y),
            ),
            None => false,
        }
    }

    /// True when `candidate` at `distance` should replace `best`
    pub(crate) fn is_closer(
        &self,
        distance: f64,
        candidate: &MachinePosition,
        best: Option<&TriggerPosition>,
    ) -> bool {
        match best {
            None => true,
            Some(best) if less_than(distance, best.distance) => true,
            Some(best) if is_equal(distance, best.distance) => {
                self.tie_break(candidate, &best.position)
            }
            Some(_) => false,
        }
    }

    /// Run one position through the cycle state machine
    fn drive<S: TriggerStrategy>(
        &mut self,
        strategy: &mut S,
        current: &MachinePosition,
        previous: &MachinePosition,
    ) {
        if self.is_layer_trigger(current) {
            if self.state == CycleState::Accumulating {
                self.flush(strategy);
            }
            self.state = CycleState::PendingFlush;
        }

        if self.state != CycleState::Idle && self.can_process(current) {
            strategy.consider(self, current, previous);
            if strategy.has_candidate() {
                self.state = CycleState::Accumulating;
            }
        }
    }

    fn flush<S: TriggerStrategy>(&mut self, strategy: &mut S) {
        if let Some(trigger) = strategy.take_trigger(self) {
            self.emit_plan(trigger, None);
        }
        self.state = CycleState::Idle;
        self.target.resolve();
    }

    fn finish<S: TriggerStrategy>(&mut self, strategy: &mut S) {
        if self.state == CycleState::Accumulating {
            self.flush(strategy);
        }
    }

    /// Build the plan for a trigger
    pub(crate) fn emit_plan(&mut self, trigger: TriggerPosition, triggering_command: Option<&Command>) {
        let TriggerPosition {
            position_type,
            distance,
            position,
        } = trigger;
        let (target_x, target_y) = self.target.coordinates();

        let mut steps = Vec::with_capacity(4);
        if self.steps.retract_before_move {
            let missing = self.steps.retraction_length - position.extruder().retraction_length;
            if greater_than(missing, 0.0) {
                steps.push(PlanStep::retract(missing));
            }
        }
        if self.steps.lift_before_move && !position.is_zhop && self.steps.lift_height > 0.0 {
            steps.push(PlanStep::lift(position.z + self.steps.lift_height));
        }
        steps.push(PlanStep::travel(target_x, target_y, self.steps.travel_speed));
        steps.push(PlanStep::snapshot());

        tracing::info!(
            target: SNAPSHOT_PLAN_TARGET,
            layer = position.layer,
            line = position.file_line_number,
            position_type = %position_type,
            distance,
            x = position.x,
            y = position.y,
            "snapshot plan created"
        );

        self.previous_plan_position = Some((position.x, position.y));
        self.plans.push(SnapshotPlan {
            triggering_command: triggering_command
                .cloned()
                .unwrap_or_else(|| position.command.clone()),
            layer: position.layer,
            file_line_number: position.file_line_number,
            gcode_sequence_number: position.gcode_sequence_number,
            position_type,
            distance_from_target: distance,
            initial_position: position.clone(),
            return_position: position,
            steps,
        });
    }
}

enum Strategy {
    MinimizeTravel(MinimizeTravel),
    SnapToCorner(SnapToCorner),
    SmartLayer(SmartLayer),
    SmartGcode(SmartGcode),
}

/// Snapshot trigger search over a stream of machine positions
pub struct Stabilization {
    core: StabilizationCore,
    strategy: Strategy,
    mode: StabilizationMode,
}

impl Stabilization {
    /// Build the strategy named by the configuration.
    ///
    /// Fails when the configuration is invalid or the target needs a
    /// callback; use [`Stabilization::with_target_callback`] for those.
    pub fn new(config: &StabilizationConfig) -> Result<Self, StabilizationError> {
        Self::build(config, None)
    }

    /// Build the strategy with a host callback resolving the target
    pub fn with_target_callback(
        config: &StabilizationConfig,
        callback: TargetCallback,
    ) -> Result<Self, StabilizationError> {
        Self::build(config, Some(callback))
    }

    fn build(
        config: &StabilizationConfig,
        callback: Option<TargetCallback>,
    ) -> Result<Self, StabilizationError> {
        config.validate()?;
        let target = StabilizationTarget::new(config.target, config.printer_volume, callback)?;
        let mut core = StabilizationCore::new(config, target);

        let strategy = match &config.mode {
            StabilizationMode::MinimizeTravel => Strategy::MinimizeTravel(MinimizeTravel::new()),
            StabilizationMode::SnapToCorner { corner, favor_x } => {
                Strategy::SnapToCorner(SnapToCorner::new(*corner, *favor_x))
            }
            StabilizationMode::SmartLayer { trigger_type } => {
                if matches!(
                    trigger_type,
                    SmartLayerTrigger::Fastest | SmartLayerTrigger::Fast
                ) {
                    core.quality_issues.push(QualityIssue::FastTriggerSelected {
                        trigger: *trigger_type,
                    });
                }
                Strategy::SmartLayer(SmartLayer::new(*trigger_type))
            }
            StabilizationMode::SmartGcode { snapshot_command } => {
                Strategy::SmartGcode(SmartGcode::new(snapshot_command))
            }
        };

        tracing::debug!(
            target: SNAPSHOT_PLAN_TARGET,
            mode = %config.mode,
            stabilization_target = ?core.target.coordinates(),
            "stabilization created"
        );

        Ok(Self {
            core,
            strategy,
            mode: config.mode.clone(),
        })
    }

    pub fn mode(&self) -> &StabilizationMode {
        &self.mode
    }

    /// Current stabilization target
    pub fn target(&self) -> (f64, f64) {
        self.core.target.coordinates()
    }

    /// True when the position passes the common eligibility filter
    pub fn can_process_position(&self, position: &MachinePosition) -> bool {
        self.core.can_process(position)
    }

    /// Feed the position produced by one command
    pub fn process_position(&mut self, current: &MachinePosition, previous: &MachinePosition) {
        match &mut self.strategy {
            Strategy::MinimizeTravel(strategy) => self.core.drive(strategy, current, previous),
            Strategy::SnapToCorner(strategy) => self.core.drive(strategy, current, previous),
            Strategy::SmartLayer(strategy) => self.core.drive(strategy, current, previous),
            Strategy::SmartGcode(strategy) => strategy.process(&mut self.core, current),
        }
    }

    /// Flush any pending candidate and return every plan built so far
    pub fn finalize(&mut self) -> Vec<SnapshotPlan> {
        match &mut self.strategy {
            Strategy::MinimizeTravel(strategy) => self.core.finish(strategy),
            Strategy::SnapToCorner(strategy) => self.core.finish(strategy),
            Strategy::SmartLayer(strategy) => self.core.finish(strategy),
            Strategy::SmartGcode(strategy) => strategy.finish(&mut self.core),
        }
        self.take_plans()
    }

    /// Plans built so far, without flushing
    pub fn take_plans(&mut self) -> Vec<SnapshotPlan> {
        std::mem::take(&mut self.core.plans)
    }

    pub fn plans(&self) -> &[SnapshotPlan] {
        &self.core.plans
    }

    pub fn quality_issues(&self) -> &[QualityIssue] {
        &self.core.quality_issues
    }

    pub fn processing_issues(&self) -> &[ProcessingIssue] {
        &self.core.processing_issues
    }
}

impl std::fmt::Debug for Stabilization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stabilization")
            .field("mode", &self.mode)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Positions an extrusion-based strategy weighs: the extruding position and,
/// when it shares the layer and height, the start of the segment
pub(crate) fn extrusion_segment<'a>(
    core: &StabilizationCore,
    current: &'a MachinePosition,
    previous: &'a MachinePosition,
) -> impl Iterator<Item = &'a MachinePosition> {
    let extruding = current.extruder().is_extruding && current.has_xy_position_changed;
    let start = extruding
        && previous.is_printer_primed
        && previous.layer == current.layer
        && is_equal(previous.z, current.z)
        && core.can_process(previous);
    let previous = start.then_some(previous);
    let current = extruding.then_some(current);
    previous.into_iter().chain(current)
}
