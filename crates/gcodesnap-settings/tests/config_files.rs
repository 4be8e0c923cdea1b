//! Loading and saving configuration files

use gcodesnap_core::{LogChannel, LogLevel};
use gcodesnap_settings::{Config, SettingsError};
use gcodesnap_stabilization::{Corner, SmartLayerTrigger, StabilizationMode, TargetSettings};
use gcodesnap_tracker::BoundingBox;
use tempfile::TempDir;

fn customized() -> Config {
    let mut config = Config::default();
    config.tracker.retraction_length = 0.8;
    config.tracker.origin_z = None;
    config.stabilization.mode = StabilizationMode::SnapToCorner {
        corner: Corner::FrontLeft,
        favor_x: false,
    };
    config.stabilization.target = TargetSettings::Fixed { x: 12.5, y: 200.0 };
    config.stabilization.bounds = Some(BoundingBox::new((0.0, 0.0, 0.0), (220.0, 220.0, 250.0)));
    config.processing.progress_interval_secs = 0.5;
    config.logging.level = LogLevel::Debug;
    config.logging.channels.set(LogChannel::Parser, LogLevel::Error);
    config
}

#[test]
fn test_toml_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("gcodesnap.toml");

    let config = customized();
    config.save_to_file(&path).unwrap();
    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gcodesnap.json");

    let config = customized();
    config.save_to_file(&path).unwrap();
    assert_eq!(Config::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(
        &path,
        r#"
[stabilization]
height_increment = 0.4

[stabilization.mode]
type = "smart_layer"
trigger_type = "high_quality"

[logging]
level = "warning"

[logging.channels]
position = "debug"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(
        config.stabilization.mode,
        StabilizationMode::SmartLayer {
            trigger_type: SmartLayerTrigger::HighQuality
        }
    );
    assert_eq!(config.stabilization.height_increment, 0.4);
    assert_eq!(config.tracker, Default::default());
    assert_eq!(
        config.logging.filter_directives(),
        "warn,gcodesnap::position=debug"
    );
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{ "stabilization": { "target": { "type": "relative", "x_percent": 150, "y_percent": 50 } } }"#,
    )
    .unwrap();

    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::Stabilization(_))
    ));
}

#[test]
fn test_load_or_default() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    assert!(matches!(
        Config::default().save_to_file(&path),
        Err(SettingsError::UnsupportedFormat(_))
    ));
}
