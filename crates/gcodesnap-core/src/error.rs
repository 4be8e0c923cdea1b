//! Error handling for gcodesnap
//!
//! Malformed G-code is never an error: the tokenizer and the state tracker
//! degrade gracefully and log instead. The types here cover the cases that
//! do stop a caller:
//! - Tracker errors (registry misuse, invalid tracker configuration)
//! - Stabilization errors (configuration rejected before processing starts)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// State tracker error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// No tracker is registered under the key
    #[error("No tracker registered under key '{key}'")]
    UnknownTracker {
        /// The key that was looked up.
        key: String,
    },

    /// A tracker is already registered under the key
    #[error("A tracker is already registered under key '{key}'")]
    DuplicateTracker {
        /// The key that is already taken.
        key: String,
    },

    /// Tracker configuration value is invalid
    #[error("Invalid tracker setting '{key}': {reason}")]
    InvalidConfig {
        /// The offending setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Stabilization error type
///
/// Raised while building a stabilization from its configuration. These are
/// the only errors that prevent a processing run from starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StabilizationError {
    /// The target is callback driven but no callback was supplied
    #[error("Stabilization target requires a coordinate callback but none was supplied")]
    MissingTargetCallback,

    /// Height increment is negative or not a number
    #[error("Invalid height increment {value}: must be zero or positive")]
    InvalidHeightIncrement {
        /// The rejected increment.
        value: f64,
    },

    /// Bounding box or printer volume is malformed
    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox {
        /// Why the box was rejected.
        reason: String,
    },

    /// Relative target percentage outside 0..=100
    #[error("Invalid relative target {axis} = {percent}%: must be within 0..=100")]
    InvalidRelativeTarget {
        /// Axis letter.
        axis: char,
        /// The rejected percentage.
        percent: f64,
    },

    /// Snapshot command for the smart gcode trigger does not parse to a command
    #[error("Invalid snapshot command '{command}'")]
    InvalidSnapshotCommand {
        /// The configured command text.
        command: String,
    },

    /// Any other rejected setting
    #[error("Invalid stabilization setting '{key}': {reason}")]
    InvalidSetting {
        /// The offending setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Main error type for gcodesnap
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Tracker error
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Stabilization error
    #[error(transparent)]
    Stabilization(#[from] StabilizationError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a tracker error
    pub fn is_tracker_error(&self) -> bool {
        matches!(self, Error::Tracker(_))
    }

    /// Check if this error rejects a configuration before processing
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::Stabilization(_) | Error::Tracker(TrackerError::InvalidConfig { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
