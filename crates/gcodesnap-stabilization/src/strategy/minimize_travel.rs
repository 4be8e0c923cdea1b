//! Extruding position closest to the stabilization target

use super::{extrusion_segment, StabilizationCore, TriggerStrategy};
use crate::trigger::{PositionType, TriggerPosition};
use gcodesnap_tracker::MachinePosition;

#[derive(Debug, Default)]
pub(crate) struct MinimizeTravel {
    best: Option<TriggerPosition>,
}

impl MinimizeTravel {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl TriggerStrategy for MinimizeTravel {
    fn consider(
        &mut self,
        core: &StabilizationCore,
        current: &MachinePosition,
        previous: &MachinePosition,
    ) {
        for position in extrusion_segment(core, current, previous) {
            let distance = core.distance_to_target(position);
            if core.is_closer(distance, position, self.best.as_ref()) {
                self.best = Some(TriggerPosition::new(
                    PositionType::classify(position),
                    distance,
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
