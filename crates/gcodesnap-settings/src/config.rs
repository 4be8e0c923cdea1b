//! Configuration file handling for gcodesnap
//!
//! Configuration is organized into sections:
//! - Tracker settings (default axis modes, homing origin, retraction and layer detection)
//! - Stabilization settings (trigger mode, target, bounds, plan steps)
//! - Processing settings (progress reporting)
//! - Logging settings (default level and per channel overrides)
//!
//! Files are TOML or JSON, chosen by extension. Every section is optional
//! and missing keys take their defaults.

use crate::error::{SettingsError, SettingsResult};
use gcodesnap_core::{LogChannel, LogLevel};
use gcodesnap_stabilization::StabilizationConfig;
use gcodesnap_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Processing loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Seconds between progress reports
    pub progress_interval_secs: f64,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            progress_interval_secs: 1.0,
        }
    }
}

impl ProcessingSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs_f64(self.progress_interval_secs.max(0.0))
    }
}

/// Per channel level overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLevels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_plan: Option<LogLevel>,
}

impl ChannelLevels {
    pub fn get(&self, channel: LogChannel) -> Option<LogLevel> {
        match channel {
            LogChannel::Parser => self.parser,
            LogChannel::Position => self.position,
            LogChannel::SnapshotPlan => self.snapshot_plan,
        }
    }

    pub fn set(&mut self, channel: LogChannel, level: LogLevel) {
        let slot = match channel {
            LogChannel::Parser => &mut self.parser,
            LogChannel::Position => &mut self.position,
            LogChannel::SnapshotPlan => &mut self.snapshot_plan,
        };
        *slot = Some(level);
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for everything without an override
    pub level: LogLevel,
    pub channels: ChannelLevels,
}

impl LoggingSettings {
    /// Filter directives for `tracing_subscriber::EnvFilter`, for example
    /// `info,gcodesnap::position=debug`
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.as_directive().to_string()];
        for channel in LogChannel::ALL {
            if let Some(level) = self.channels.get(channel) {
                directives.push(format!("{}={}", channel.target(), level.as_directive()));
            }
        }
        directives.join(",")
    }
}

/// File format, from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) => Err(SettingsError::UnsupportedFormat(ext.to_string())),
            None => Err(SettingsError::UnsupportedFormat(String::new())),
        }
    }
}

/// Complete gcodesnap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub stabilization: StabilizationConfig,
    pub processing: ProcessingSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location, `<config dir>/gcodesnap/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })?;
        Ok(dir.join("gcodesnap").join(CONFIG_FILE_NAME))
    }

    /// Load config from file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Toml => toml::from_str(&content)?,
            Format::Json => serde_json::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save config to file (TOML or JSON)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        self.tracker.validate()?;
        self.stabilization.validate()?;

        let interval = self.processing.progress_interval_secs;
        if !interval.is_finite() || interval < 0.0 {
            return Err(SettingsError::InvalidSetting {
                key: "processing.progress_interval_secs".to_string(),
                reason: format!("must be a non-negative number, got {}", interval),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_filter_directives() {
        let mut logging = LoggingSettings::default();
        assert_eq!(logging.filter_directives(), "info");

        logging.level = LogLevel::Warning;
        logging.channels.set(LogChannel::Position, LogLevel::Verbose);
        logging.channels.set(LogChannel::SnapshotPlan, LogLevel::Debug);
        assert_eq!(
            logging.filter_directives(),
            "warn,gcodesnap::position=trace,gcodesnap::snapshot_plan=debug"
        );
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::of(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::of(Path::new("a.JSON")).unwrap(), Format::Json);
        assert!(matches!(
            Format::of(Path::new("a.yaml")),
            Err(SettingsError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
        assert!(Format::of(Path::new("config")).is_err());
    }

    #[test]
    fn test_negative_progress_interval_is_rejected() {
        let config = Config {
            processing: ProcessingSettings {
                progress_interval_secs: -1.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_progress_interval() {
        let settings = ProcessingSettings {
            progress_interval_secs: 0.25,
        };
        assert_eq!(settings.progress_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        if let Ok(path) = Config::default_path() {
            assert!(path.ends_with(Path::new("gcodesnap").join(CONFIG_FILE_NAME)));
        }
    }
}
