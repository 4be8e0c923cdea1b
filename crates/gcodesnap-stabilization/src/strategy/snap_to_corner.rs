//! Extruding position nearest a corner of the print

use super::{extrusion_segment, StabilizationCore, TriggerStrategy};
use crate::config::Corner;
use crate::trigger::{PositionType, TriggerPosition};
use gcodesnap_core::math::{greater_than, less_than};
use gcodesnap_tracker::MachinePosition;

#[derive(Debug)]
pub(crate) struct SnapToCorner {
    corner: Corner,
    favor_x: bool,
    best: Option<TriggerPosition>,
}

impl SnapToCorner {
    pub(crate) fn new(corner: Corner, favor_x: bool) -> Self {
        Self {
            corner,
            favor_x,
            best: None,
        }
    }

    /// Sort key where smaller is nearer the corner, primary axis first
    fn key(&self, position: &MachinePosition) -> (f64, f64) {
        let x = position.x * self.corner.x_sign();
        let y = position.y * self.corner.y_sign();
        if self.favor_x {
            (x, y)
        } else {
            (y, x)
        }
    }

    fn is_better(&self, core: &StabilizationCore, candidate: &MachinePosition) -> bool {
        let Some(best) = self.best.as_ref() else {
            return true;
        };
        let (primary, secondary) = self.key(candidate);
        let (best_primary, best_secondary) = self.key(&best.position);

        if less_than(primary, best_primary) {
            return true;
        }
        if greater_than(primary, best_primary) {
            return false;
        }
        if less_than(secondary, best_secondary) {
            return true;
        }
        if greater_than(secondary, best_secondary) {
            return false;
        }
        core.tie_break(candidate, &best.position)
    }
}

impl TriggerStrategy for SnapToCorner {
    fn consider(
        &mut self,
        core: &StabilizationCore,
        current: &MachinePosition,
        previous: &MachinePosition,
    ) {
        for position in extrusion_segment(core, current, previous) {
            if self.is_better(core, position) {
                self.best = Some(TriggerPosition::new(
                    PositionType::classify(position),
                    core.distance_to_target(position),
                    position,
                ));
            }
        }
    }

    fn has_candidate(&self) -> bool {
        self.best.is_some()
    }

    fn take_trigger(&mut self, _: &mut StabilizationCore) -> Option<TriggerPosition> {
        self.best.take()
    }
}
