//! gcodesnap settings
//!
//! Loads, validates and saves the aggregate configuration used by the
//! command line front end: tracker, stabilization, processing and logging.

pub mod config;
pub mod error;

pub use config::{ChannelLevels, Config, LoggingSettings, ProcessingSettings, CONFIG_FILE_NAME};
pub use error::{SettingsError, SettingsResult};
