//! End-to-end tracker scenarios

use gcodesnap_parser::parse;
use gcodesnap_tracker::{AxisMode, MachinePosition, StateTracker, TrackerConfig};

fn run(tracker: &mut StateTracker, lines: &[&str]) -> Vec<MachinePosition> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let number = index as i64 + 1;
            tracker.update(&parse(line), number, number).clone()
        })
        .collect()
}

#[test]
fn priming_and_layer_changes() {
    let config = TrackerConfig {
        xyz_axis_default_mode: AxisMode::Absolute,
        e_axis_default_mode: AxisMode::Absolute,
        priming_height: 0.2,
        minimum_layer_height: 0.0,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);

    let frames = run(
        &mut tracker,
        &["G28", "G1 X10 Y10 Z0.2 E5 F1200", "G1 Z0.4 E7"],
    );

    assert!(!frames[0].is_printer_primed);
    assert_eq!(frames[0].layer, 0);

    assert!(frames[1].is_printer_primed);
    assert_eq!(frames[1].layer, 1);
    assert!(frames[1].is_layer_change);
    assert_eq!(frames[1].f, 1200.0);
    assert!(frames[1].extruder().is_extruding);

    assert_eq!(frames[2].layer, 2);
    assert!(frames[2].is_layer_change);
    assert!((frames[2].height - 0.4).abs() < 1e-9);
}

#[test]
fn extrusion_above_priming_height_does_not_prime() {
    let config = TrackerConfig {
        priming_height: 0.2,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);
    let frames = run(&mut tracker, &["G28", "G1 X10 Z5 E5", "G1 X20 Z5 E6"]);
    assert!(!frames[2].is_printer_primed);
    assert_eq!(frames[2].layer, 0);
}

#[test]
fn retraction_and_deretraction() {
    let config = TrackerConfig {
        retraction_length: 1.0,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);
    run(&mut tracker, &["G28", "M83"]);

    let retracted = tracker.update(&parse("G1 E-1.0"), 3, 3).extruder().to_owned();
    assert!(retracted.is_retracted);
    assert!(retracted.is_retracting_start);
    assert!((retracted.retraction_length - 1.0).abs() < 1e-9);
    assert_eq!(retracted.extrusion_length, 0.0);

    let partial = tracker.update(&parse("G1 E0.5"), 4, 4).extruder().to_owned();
    assert!(partial.is_partially_retracted);
    assert!(!partial.is_retracted);
    assert!(partial.is_deretracting_start);
    assert!((partial.retraction_length - 0.5).abs() < 1e-9);
    assert!((partial.deretraction_length - 0.5).abs() < 1e-9);

    let primed = tracker.update(&parse("G1 E0.5"), 5, 5).extruder().to_owned();
    assert!(primed.retraction_length.abs() < 1e-9);
    assert!(primed.is_primed);
    assert!(primed.is_deretracted);
    assert!(!primed.is_extruding);
}

#[test]
fn extrusion_pays_back_retraction_first() {
    let config = TrackerConfig {
        retraction_length: 1.0,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);
    run(&mut tracker, &["G28", "M83", "G1 E-1"]);

    let extruder = tracker.update(&parse("G1 X5 E1.5"), 4, 4).extruder().to_owned();
    assert!((extruder.extrusion_length - 0.5).abs() < 1e-9);
    assert_eq!(extruder.retraction_length, 0.0);
    assert!(extruder.is_extruding_start);
    assert!(extruder.is_deretracted);
}

#[test]
fn zhop_after_extrusion() {
    let config = TrackerConfig {
        z_lift_height: 0.4,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);
    let frames = run(
        &mut tracker,
        &["G28", "G1 X1 Y1 Z0.3 E1", "G1 Z0.7", "G1 X9 Y9", "G1 Z0.3", "G1 X2 E2"],
    );
    assert!(!frames[1].is_zhop);
    assert!(frames[2].is_zhop);
    assert!(frames[3].is_zhop);
    assert!(!frames[4].is_zhop);
    assert_eq!(frames[5].layer, 1);
}

#[test]
fn relative_moves_need_a_known_position() {
    let mut tracker = StateTracker::new(TrackerConfig::default());
    let frames = run(&mut tracker, &["G91", "G1 X5 Y5", "G90", "G1 X1", "G91", "G1 X2 Y3"]);
    assert!(frames[1].x_is_unset);
    assert!(!frames[1].gcode_was_ignored);
    assert_eq!(frames[3].x, 1.0);
    assert_eq!(frames[5].x, 3.0);
    assert!(frames[5].y_is_unset);
}

#[test]
fn definite_position_needs_homing_and_modes() {
    let config = TrackerConfig {
        xyz_axis_default_mode: AxisMode::Unset,
        ..Default::default()
    };
    let mut tracker = StateTracker::new(config);
    let frames = run(&mut tracker, &["G28", "G1 X1", "G90", "G1 X2"]);
    assert!(!frames[0].has_homed_position);
    assert_eq!(frames[1].x, 0.0);
    assert!(frames[2].has_homed_position);
    assert_eq!(frames[3].x, 2.0);
}
