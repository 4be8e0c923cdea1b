//! Quality tiered trigger search
//!
//! Every eligible position is classified by motion and the closest candidate
//! of each [`PositionType`] is kept. When the layer ends the configured
//! [`SmartLayerTrigger`] decides which tiers it is willing to snapshot from.

use super::{StabilizationCore, TriggerStrategy};
use crate::config::SmartLayerTrigger;
use crate::issues::QualityIssue;
use crate::trigger::{PositionType, TriggerPosition, QUALITY_CUTOFF, RANKED_POSITION_TYPES};
use gcodesnap_core::logging::SNAPSHOT_PLAN_TARGET;
use gcodesnap_core::math::{greater_than, is_equal, less_than};
use gcodesnap_tracker::MachinePosition;

/// First tier that does not extrude
const FIRST_NON_EXTRUSION_TIER: usize = 1;

#[derive(Debug)]
pub(crate) struct SmartLayer {
    trigger_type: SmartLayerTrigger,
    tiers: [Option<TriggerPosition>; RANKED_POSITION_TYPES],
    fastest_extrusion: Option<TriggerPosition>,
    extrusion_speed: Option<f64>,
    has_one_extrusion_speed: bool,
    layer: i64,
}

impl SmartLayer {
    pub(crate) fn new(trigger_type: SmartLayerTrigger) -> Self {
        Self {
            trigger_type,
            tiers: Default::default(),
            fastest_extrusion: None,
            extrusion_speed: None,
            has_one_extrusion_speed: false,
            layer: 0,
        }
    }

    fn track_extrusion(&mut self, core: &StabilizationCore, distance: f64, current: &MachinePosition) {
        match self.extrusion_speed {
            None => {
                self.extrusion_speed = Some(current.f);
                self.has_one_extrusion_speed = true;
            }
            Some(speed) if !is_equal(speed, current.f) => self.has_one_extrusion_speed = false,
            Some(_) => {}
        }

        let replace = match &self.fastest_extrusion {
            None => true,
            Some(fastest) if greater_than(current.f, fastest.position.f) => true,
            Some(fastest) if less_than(current.f, fastest.position.f) => false,
            Some(fastest) => core.is_closer(distance, current, Some(fastest)),
        };
        if replace {
            self.fastest_extrusion = Some(TriggerPosition::new(
                PositionType::Extrusion,
                distance,
                current,
            ));
        }
    }

    /// Tier of the closest candidate at or above `lowest`. Equal distances
    /// go through the core tie break, and the higher tier keeps a dead heat.
    fn closest_tier(&self, core: &StabilizationCore, lowest: usize) -> Option<usize> {
        let mut best: Option<(usize, &TriggerPosition)> = None;
        for tier in (lowest..RANKED_POSITION_TYPES).rev() {
            let Some(candidate) = &self.tiers[tier] else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((_, incumbent)) => core.is_closer(
                    candidate.distance,
                    &candidate.position,
                    Some(incumbent),
                ),
            };
            if replace {
                best = Some((tier, candidate));
            }
        }
        best.map(|(tier, _)| tier)
    }

    /// Highest filled tier at or above `lowest`
    fn highest_tier(&self, lowest: usize) -> Option<usize> {
        (lowest..RANKED_POSITION_TYPES)
            .rev()
            .find(|&tier| self.tiers[tier].is_some())
    }

    fn closest_non_extrusion_tier(&self, core: &StabilizationCore) -> Option<usize> {
        self.closest_tier(core, FIRST_NON_EXTRUSION_TIER)
            .or_else(|| self.closest_tier(core, 0))
    }

    fn select(&mut self, core: &mut StabilizationCore) -> Option<TriggerPosition> {
        let tier = match self.trigger_type {
            SmartLayerTrigger::Fastest => self.closest_tier(core, 0),
            SmartLayerTrigger::Fast if self.has_one_extrusion_speed => {
                self.closest_non_extrusion_tier(core)
            }
            SmartLayerTrigger::Fast => self.closest_tier(core, 0),
            SmartLayerTrigger::Standard => self.closest_non_extrusion_tier(core),
            SmartLayerTrigger::HighQuality => {
                let cutoff = QUALITY_CUTOFF.tier().unwrap_or(0);
                let tier = self.highest_tier(cutoff);
                if tier.is_none() {
                    tracing::warn!(
                        target: SNAPSHOT_PLAN_TARGET,
                        layer = self.layer,
                        "no high quality trigger position on layer"
                    );
                    core.quality_issues
                        .push(QualityIssue::NoQualifyingPosition { layer: self.layer });
                }
                tier
            }
            SmartLayerTrigger::BestQuality => {
                if core.fastest_speed && self.fastest_extrusion.is_some() {
                    return self.fastest_extrusion.take();
                }
                if self.tiers[0].is_some() {
                    Some(0)
                } else {
                    self.highest_tier(0)
                }
            }
        };
        tier.and_then(|tier| self.tiers[tier].take())
    }

    fn reset(&mut self) {
        self.tiers = Default::default();
        self.fastest_extrusion = None;
        self.extrusion_speed = None;
        self.has_one_extrusion_speed = false;
    }
}

impl TriggerStrategy for SmartLayer {
    fn consider(
        &mut self,
        core: &StabilizationCore,
        current: &MachinePosition,
        _previous: &MachinePosition,
    ) {
        let position_type = PositionType::classify(current);
        let Some(tier) = position_type.tier() else {
            return;
        };
        let distance = core.distance_to_target(current);
        self.layer = current.layer;

        if position_type.is_extrusion() {
            self.track_extrusion(core, distance, current);
        }
        if core.is_closer(distance, current, self.tiers[tier].as_ref()) {
            self.tiers[tier] = Some(TriggerPosition::new(position_type, distance, current));
        }
    }

    fn has_candidate(&self) -> bool {
        self.tiers.iter().any(Option::is_some)
    }

    fn take_trigger(&mut self, core: &mut StabilizationCore) -> Option<TriggerPosition> {
        let trigger = self.select(core);
        if let Some(trigger) = &trigger {
            tracing::debug!(
                target: SNAPSHOT_PLAN_TARGET,
                trigger_type = %self.trigger_type,
                position_type = %trigger.position_type,
                layer = self.layer,
                "smart layer trigger selected"
            );
        }
        self.reset();
        trigger
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixed_target, run};
    use crate::config::{SmartLayerTrigger, StabilizationConfig, StabilizationMode};
    use crate::issues::QualityIssue;
    use crate::trigger::PositionType;

    fn smart(trigger_type: SmartLayerTrigger) -> StabilizationConfig {
        fixed_target(StabilizationMode::SmartLayer { trigger_type })
    }

    fn chosen(config: &StabilizationConfig, lines: &[&str]) -> Option<(f64, f64, PositionType)> {
        let (_, plans) = run(config, lines);
        plans.first().map(|plan| {
            (
                plan.initial_position.x,
                plan.initial_position.y,
                plan.position_type,
            )
        })
    }

    const EXTRUDE_THEN_TRAVEL: [&str; 3] = ["G28", "G1 X5 Y5 Z0.2 E1 F1200", "G1 X9 Y9"];

    #[test]
    fn test_standard_prefers_non_extrusion() {
        assert_eq!(
            chosen(&smart(SmartLayerTrigger::Standard), &EXTRUDE_THEN_TRAVEL),
            Some((9.0, 9.0, PositionType::Travel))
        );
    }

    #[test]
    fn test_standard_falls_back_to_extrusion() {
        assert_eq!(
            chosen(&smart(SmartLayerTrigger::Standard), &EXTRUDE_THEN_TRAVEL[..2]),
            Some((5.0, 5.0, PositionType::Extrusion))
        );
    }

    #[test]
    fn test_fastest_takes_closest_of_any_tier() {
        assert_eq!(
            chosen(&smart(SmartLayerTrigger::Fastest), &EXTRUDE_THEN_TRAVEL),
            Some((5.0, 5.0, PositionType::Extrusion))
        );
    }

    #[test]
    fn test_equal_distance_across_tiers_uses_tie_break() {
        let lines = ["G28", "G1 X5 Y7 Z0.2 E1 F3000", "G1 X5 Y3 F1200"];
        let config = smart(SmartLayerTrigger::Fastest);
        assert_eq!(chosen(&config, &lines), Some((5.0, 7.0, PositionType::Extrusion)));

        let config = StabilizationConfig {
            fastest_speed: false,
            ..config
        };
        assert_eq!(chosen(&config, &lines), Some((5.0, 3.0, PositionType::Travel)));
    }

    #[test]
    fn test_fast_depends_on_extrusion_speeds() {
        let config = smart(SmartLayerTrigger::Fast);
        assert_eq!(
            chosen(&config, &EXTRUDE_THEN_TRAVEL),
            Some((9.0, 9.0, PositionType::Travel))
        );
        assert_eq!(
            chosen(
                &config,
                &["G28", "G1 X5 Y5 Z0.2 E1 F1200", "G1 X6 Y6 E2 F2400", "G1 X9 Y9"]
            ),
            Some((5.0, 5.0, PositionType::Extrusion))
        );
    }

    #[test]
    fn test_high_quality_skips_low_tiers() {
        let config = smart(SmartLayerTrigger::HighQuality);
        assert_eq!(
            chosen(&config, &EXTRUDE_THEN_TRAVEL),
            Some((9.0, 9.0, PositionType::Travel))
        );

        let (stabilization, plans) = run(&config, &["G28", "G1 X5 Y5 Z0.2 E1", "G1 E0"]);
        assert!(plans.is_empty());
        assert_eq!(
            stabilization.quality_issues(),
            &[QualityIssue::NoQualifyingPosition { layer: 1 }]
        );
    }

    #[test]
    fn test_best_quality_uses_fastest_extrusion() {
        let lines = [
            "G28",
            "G1 X5 Y5 Z0.2 E1 F1000",
            "G1 X8 Y8 E2 F3000",
            "G1 X9 Y9 F6000",
        ];
        let config = smart(SmartLayerTrigger::BestQuality);
        assert_eq!(chosen(&config, &lines), Some((8.0, 8.0, PositionType::Extrusion)));

        let config = StabilizationConfig {
            fastest_speed: false,
            ..config
        };
        assert_eq!(chosen(&config, &lines), Some((5.0, 5.0, PositionType::Extrusion)));
    }

    #[test]
    fn test_one_plan_per_layer() {
        let (_, plans) = run(
            &smart(SmartLayerTrigger::Standard),
            &[
                "G28",
                "G1 X1 Y1 Z0.2 E1",
                "G1 X4 Y4",
                "G1 X2 Y2 Z0.4 E2",
                "G1 X6 Y6",
                "G1 X3 Y3 Z0.6 E3",
            ],
        );
        let layers: Vec<i64> = plans.iter().map(|plan| plan.layer).collect();
        assert_eq!(layers, vec![1, 2, 3]);
        assert_eq!(plans[0].position_type, PositionType::Travel);
        assert_eq!(plans[2].position_type, PositionType::Extrusion);
    }
}
