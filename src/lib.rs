//! # gcodesnap
//!
//! Plans stabilized timelapse snapshots for 3D printer G-code.
//!
//! ## Architecture
//!
//! gcodesnap is organized as a workspace with multiple crates:
//!
//! 1. **gcodesnap-core** - Errors, tolerance helpers, log channels, callback types
//! 2. **gcodesnap-parser** - G-code line tokenizer
//! 3. **gcodesnap-tracker** - Machine state tracking and slicer comment classification
//! 4. **gcodesnap-stabilization** - Trigger strategies, snapshot plans, the processing loop
//! 5. **gcodesnap-settings** - Configuration files
//! 6. **gcodesnap** - Command line front end
//!
//! ## Pipeline
//!
//! Every line of the file is tokenized into a command, the state tracker
//! derives the machine position after it, and the configured stabilization
//! strategy picks one trigger position per layer and plans the moves that
//! park the nozzle at the stabilization target for the snapshot.

pub use gcodesnap_core::{
    Error, LogChannel, LogLevel, ProgressReport, Result, StabilizationError, TargetCallback,
    TrackerError,
};
pub use gcodesnap_parser::{parse, Command, Parameter, ParameterValue};
pub use gcodesnap_settings::{Config, LoggingSettings, SettingsError};
pub use gcodesnap_stabilization::{
    GcodeProcessor, PlanAction, PlanStep, PositionType, ProcessResult, ProcessingIssue,
    QualityIssue, SnapshotPlan, Stabilization, StabilizationConfig, StabilizationMode,
};
pub use gcodesnap_tracker::{MachinePosition, StateTracker, TrackerConfig, TrackerRegistry};

use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Build the log filter: `rust_log` when given and valid, the settings otherwise
pub fn log_filter(settings: &LoggingSettings, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|directives| !directives.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Ignoring invalid RUST_LOG '{}': {}", directives, e),
        }
    }
    EnvFilter::new(settings.filter_directives())
}

/// Initialize logging from the logging settings
///
/// Sets up structured logging with:
/// - Console output on stderr, keeping stdout for results
/// - RUST_LOG environment variable support, overriding the settings
/// - One tracing target per log channel (`gcodesnap::parser`,
///   `gcodesnap::position`, `gcodesnap::snapshot_plan`)
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let rust_log = std::env::var("RUST_LOG").ok();
    let env_filter = log_filter(settings, rust_log.as_deref());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
