//! Log channels and levels.
//!
//! Each channel is a `tracing` target, so a subscriber filter such as
//! `gcodesnap::position=debug` selects one channel. Nothing in the engine
//! depends on whether a subscriber is installed.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tracing target for tokenizer diagnostics.
pub const PARSER_TARGET: &str = "gcodesnap::parser";
/// Tracing target for state tracker diagnostics.
pub const POSITION_TARGET: &str = "gcodesnap::position";
/// Tracing target for snapshot planning diagnostics.
pub const SNAPSHOT_PLAN_TARGET: &str = "gcodesnap::snapshot_plan";

/// Log channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogChannel {
    /// G-code tokenizer
    Parser,
    /// Machine state tracker
    Position,
    /// Stabilization and snapshot plans
    SnapshotPlan,
}

impl LogChannel {
    /// All channels, in declaration order
    pub const ALL: [LogChannel; 3] = [
        LogChannel::Parser,
        LogChannel::Position,
        LogChannel::SnapshotPlan,
    ];

    /// The tracing target backing this channel
    pub const fn target(self) -> &'static str {
        match self {
            Self::Parser => PARSER_TARGET,
            Self::Position => POSITION_TARGET,
            Self::SnapshotPlan => SNAPSHOT_PLAN_TARGET,
        }
    }
}

impl std::fmt::Display for LogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parser => write!(f, "parser"),
            Self::Position => write!(f, "position"),
            Self::SnapshotPlan => write!(f, "snapshot_plan"),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    ///
    /// `Verbose` maps to `trace`; `Critical` shares `error`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Verbose => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verbose => write!(f, "verbose"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

/// Emit `message` on `channel` at `level`.
///
/// Hosts that forward messages from outside the engine use this; engine code
/// calls the `tracing` macros with the channel targets directly.
pub fn log(channel: LogChannel, level: LogLevel, message: &str) {
    macro_rules! emit {
        ($target:expr) => {
            match level {
                LogLevel::Verbose => tracing::trace!(target: $target, "{}", message),
                LogLevel::Debug => tracing::debug!(target: $target, "{}", message),
                LogLevel::Info => tracing::info!(target: $target, "{}", message),
                LogLevel::Warning => tracing::warn!(target: $target, "{}", message),
                LogLevel::Error => tracing::error!(target: $target, "{}", message),
                LogLevel::Critical => {
                    tracing::error!(target: $target, critical = true, "{}", message)
                }
            }
        };
    }

    match channel {
        LogChannel::Parser => emit!(PARSER_TARGET),
        LogChannel::Position => emit!(POSITION_TARGET),
        LogChannel::SnapshotPlan => emit!(SNAPSHOT_PLAN_TARGET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_targets_are_distinct() {
        let targets: Vec<_> = LogChannel::ALL.iter().map(|c| c.target()).collect();
        assert_eq!(
            targets,
            vec![PARSER_TARGET, POSITION_TARGET, SNAPSHOT_PLAN_TARGET]
        );
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            LogLevel::Verbose,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Critical.as_directive(), "error");
    }

    #[test]
    fn test_log_without_subscriber_is_silent() {
        log(LogChannel::Position, LogLevel::Critical, "nobody is listening");
    }
}
