//! # gcodesnap stabilization
//!
//! Finds where on each layer a snapshot should be taken and plans the moves
//! to get there:
//! - [`Stabilization`]: the trigger strategies over the tracked positions
//! - [`SnapshotPlan`]: the steps for one snapshot
//! - [`GcodeProcessor`]: the single pass over a file producing a [`ProcessResult`]
//!
//! ```
//! use gcodesnap_stabilization::{GcodeProcessor, StabilizationConfig, TargetSettings};
//! use gcodesnap_tracker::TrackerConfig;
//!
//! let config = StabilizationConfig {
//!     target: TargetSettings::Fixed { x: 5.0, y: 5.0 },
//!     ..Default::default()
//! };
//! let processor = GcodeProcessor::new(&TrackerConfig::default(), &config).unwrap();
//! let result = processor.process_str("G28\nG1 X1 Y1 Z0.2 E1\nG1 X9 Y9\n", |_| true);
//! assert!(result.success);
//! assert_eq!(result.snapshot_plans.len(), 1);
//! ```

pub mod config;
pub mod file_io;
pub mod issues;
pub mod plan;
pub mod processor;
mod strategy;
pub mod target;
pub mod trigger;

pub use config::{
    Corner, SmartLayerTrigger, StabilizationConfig, StabilizationMode, TargetSettings,
};
pub use file_io::{GcodeFileReader, GcodeLines};
pub use issues::{ProcessingIssue, QualityIssue};
pub use plan::{PlanAction, PlanStep, SnapshotPlan};
pub use processor::{GcodeProcessor, ProcessResult, DEFAULT_PROGRESS_INTERVAL};
pub use strategy::Stabilization;
pub use target::StabilizationTarget;
pub use trigger::{PositionType, TriggerPosition, QUALITY_CUTOFF, RANKED_POSITION_TYPES};
