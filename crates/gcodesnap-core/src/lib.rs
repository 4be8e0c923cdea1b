//! # gcodesnap core
//!
//! Shared building blocks for the gcodesnap crates:
//! the error taxonomy, the tolerance-aware float comparisons used by the
//! state tracker and the stabilization engine, the tracing targets that act
//! as log channels, and the host callback types.

pub mod error;
pub mod logging;
pub mod math;
pub mod types;

pub use error::{Error, Result, StabilizationError, TrackerError};
pub use logging::{LogChannel, LogLevel};
pub use math::FLOAT_TOLERANCE;
pub use types::{ProgressReport, TargetCallback};
