//! Error types for the settings crate.

use gcodesnap_core::{StabilizationError, TrackerError};
use std::io;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file extension names no supported format.
    #[error("Unsupported config format '{0}': expected .toml or .json")]
    UnsupportedFormat(String),

    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The configuration directory could not be found.
    #[error("Config directory error: {0}")]
    ConfigDirectory(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The tracker section was rejected.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// The stabilization section was rejected.
    #[error(transparent)]
    Stabilization(#[from] StabilizationError),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
