//! End-to-end processing tests

use gcodesnap_stabilization::{
    GcodeProcessor, PlanAction, ProcessingIssue, SmartLayerTrigger, StabilizationConfig,
    StabilizationMode, TargetSettings,
};
use gcodesnap_tracker::TrackerConfig;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config(mode: StabilizationMode) -> StabilizationConfig {
    StabilizationConfig {
        mode,
        target: TargetSettings::Fixed { x: 5.0, y: 5.0 },
        ..Default::default()
    }
}

fn processor(mode: StabilizationMode) -> GcodeProcessor {
    GcodeProcessor::new(&TrackerConfig::default(), &config(mode)).unwrap()
}

const TWO_LAYERS: &str = "\
; generated
G21
G90
M82
G28
G1 X1 Y1 Z0.2 E1 F1200
G1 X9 Y9 Z0.4 E2
";

#[test]
fn test_minimize_travel_two_layers() {
    let result = processor(StabilizationMode::MinimizeTravel).process_str(TWO_LAYERS, |_| true);

    assert!(result.success);
    assert_eq!(result.snapshot_plans.len(), 2);
    for (plan, layer) in result.snapshot_plans.iter().zip([1, 2]) {
        assert_eq!(plan.layer, layer);
        let actions: Vec<PlanAction> = plan.steps.iter().map(|step| step.action).collect();
        assert_eq!(actions, vec![PlanAction::Travel, PlanAction::Snapshot]);
        assert_eq!(plan.travel_target(), Some((5.0, 5.0)));
    }
    assert!(result.processing_issues.is_empty());
    assert!(result.quality_issues.is_empty());
}

#[test]
fn test_every_mode_plans_both_layers() {
    for mode in [
        StabilizationMode::SnapToCorner {
            corner: Default::default(),
            favor_x: true,
        },
        StabilizationMode::SmartLayer {
            trigger_type: SmartLayerTrigger::Standard,
        },
        StabilizationMode::SmartLayer {
            trigger_type: SmartLayerTrigger::BestQuality,
        },
    ] {
        let result = processor(mode.clone()).process_str(TWO_LAYERS, |_| true);
        let layers: Vec<i64> = result.snapshot_plans.iter().map(|plan| plan.layer).collect();
        assert_eq!(layers, vec![1, 2], "mode {}", mode);
    }
}

#[test]
fn test_process_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(TWO_LAYERS.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut last_percent = 0.0;
    let result = processor(StabilizationMode::MinimizeTravel)
        .with_progress_interval(Duration::ZERO)
        .process_file(file.path(), |report| {
            assert!(report.percent >= last_percent);
            last_percent = report.percent;
            true
        });

    assert!(result.success);
    assert_eq!(result.lines_processed, 7);
    assert_eq!(result.gcodes_processed, 6);
    assert_eq!(result.snapshot_plans.len(), 2);
    assert!((last_percent - 100.0).abs() < 1e-9);
}

#[test]
fn test_missing_file_fails_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let result = processor(StabilizationMode::MinimizeTravel)
        .process_file(dir.path().join("missing.gcode"), |_| true);

    assert!(!result.success);
    assert!(result.snapshot_plans.is_empty());
    assert!(result.error_message.unwrap().contains("File does not exist"));
}

#[test]
fn test_progress_callback_cancels() {
    let mut calls = 0;
    let result = processor(StabilizationMode::MinimizeTravel)
        .with_progress_interval(Duration::ZERO)
        .process_str(TWO_LAYERS, |_| {
            calls += 1;
            calls < 3
        });

    assert!(!result.success);
    assert!(result.cancelled);
    assert_eq!(calls, 3);
    assert_eq!(result.lines_processed, 3);
    assert!(result.snapshot_plans.is_empty());
}

#[test]
fn test_final_state_issues() {
    let tracker = TrackerConfig {
        origin_x: None,
        ..Default::default()
    };
    let processor =
        GcodeProcessor::new(&tracker, &config(StabilizationMode::MinimizeTravel)).unwrap();
    let result = processor.process_str("G28\nG1 Y1 Z0.2\n", |_| true);

    assert!(result.success);
    assert!(result.snapshot_plans.is_empty());
    assert_eq!(
        result.processing_issues,
        vec![ProcessingIssue::NoDefinitePosition, ProcessingIssue::PrinterNeverPrimed]
    );
}

#[test]
fn test_smart_gcode_without_snapshot_command() {
    let result = processor(StabilizationMode::SmartGcode {
        snapshot_command: "M240".to_string(),
    })
    .process_str(TWO_LAYERS, |_| true);

    assert!(result.success);
    assert!(result.snapshot_plans.is_empty());
    assert_eq!(
        result.processing_issues,
        vec![ProcessingIssue::NoSnapshotCommandsFound]
    );
}

#[test]
fn test_target_callback_sees_prior_target() {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = std::sync::Arc::clone(&seen);
    let stabilization = StabilizationConfig {
        mode: StabilizationMode::MinimizeTravel,
        target: TargetSettings::Callback,
        ..Default::default()
    };
    let processor = GcodeProcessor::with_target_callback(
        &TrackerConfig::default(),
        &stabilization,
        Box::new(move |x, y| {
            recorder.lock().unwrap().push((x, y));
            (x + 1.0, y + 2.0)
        }),
    )
    .unwrap();

    let result = processor.process_str(TWO_LAYERS, |_| true);
    let targets: Vec<(f64, f64)> = result
        .snapshot_plans
        .iter()
        .filter_map(|plan| plan.travel_target())
        .collect();
    assert_eq!(targets, vec![(1.0, 2.0), (2.0, 4.0)]);
    assert_eq!(*seen.lock().unwrap(), vec![(0.0, 0.0), (1.0, 2.0), (2.0, 4.0)]);
}
