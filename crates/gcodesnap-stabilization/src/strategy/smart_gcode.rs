//! Snapshots wherever the file already asks for one

use super::StabilizationCore;
use crate::issues::ProcessingIssue;
use crate::trigger::{PositionType, TriggerPosition};
use gcodesnap_core::logging::SNAPSHOT_PLAN_TARGET;
use gcodesnap_parser::parse;
use gcodesnap_tracker::MachinePosition;

/// Emits one plan per occurrence of a literal snapshot command, parked from
/// the last eligible position before it.
#[derive(Debug)]
pub(crate) struct SmartGcode {
    snapshot_word: String,
    last_eligible: Option<MachinePosition>,
    commands_found: u64,
}

impl SmartGcode {
    pub(crate) fn new(snapshot_command: &str) -> Self {
        Self {
            snapshot_word: parse(snapshot_command).word,
            last_eligible: None,
            commands_found: 0,
        }
    }

    pub(crate) fn process(&mut self, core: &mut StabilizationCore, current: &MachinePosition) {
        if current.command.word == self.snapshot_word {
            self.commands_found += 1;
            match &self.last_eligible {
                Some(position) => {
                    let trigger = TriggerPosition::new(
                        PositionType::classify(position),
                        core.distance_to_target(position),
                        position,
                    );
                    core.emit_plan(trigger, Some(&current.command));
                    core.target.resolve();
                }
                None => tracing::debug!(
                    target: SNAPSHOT_PLAN_TARGET,
                    line = current.file_line_number,
                    "snapshot command before any eligible position"
                ),
            }
            return;
        }

        if core.can_process(current) {
            match &mut self.last_eligible {
                Some(position) => position.clone_from(current),
                None => self.last_eligible = Some(current.clone()),
            }
        }
    }

    pub(crate) fn finish(&mut self, core: &mut StabilizationCore) {
        if self.commands_found == 0 {
            tracing::warn!(
                target: SNAPSHOT_PLAN_TARGET,
                command = %self.snapshot_word,
                "no snapshot commands found"
            );
            core.processing_issues
                .push(ProcessingIssue::NoSnapshotCommandsFound);
        }
    }
}
