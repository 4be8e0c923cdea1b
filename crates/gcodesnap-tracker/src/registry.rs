//! Named tracker instances
//!
//! A host processing several streams at once keeps one [`StateTracker`] per
//! stream in a [`TrackerRegistry`] it owns. Keys are opaque strings. The
//! registry does no locking: each key is expected to be driven by one caller
//! at a time.

use crate::config::TrackerConfig;
use crate::position::MachinePosition;
use crate::tracker::StateTracker;
use gcodesnap_core::logging::POSITION_TARGET;
use gcodesnap_core::TrackerError;
use gcodesnap_parser::Command;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct TrackerRegistry {
    trackers: HashMap<String, StateTracker>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker under a freshly generated key and return the key
    pub fn create(&mut self, config: TrackerConfig) -> Result<String, TrackerError> {
        config.validate()?;
        let key = Uuid::new_v4().to_string();
        self.trackers.insert(key.clone(), StateTracker::new(config));
        tracing::debug!(target: POSITION_TARGET, key = key.as_str(), "tracker created");
        Ok(key)
    }

    /// Create a tracker under a caller-chosen key
    pub fn insert(&mut self, key: impl Into<String>, config: TrackerConfig) -> Result<(), TrackerError> {
        let key = key.into();
        if self.trackers.contains_key(&key) {
            return Err(TrackerError::DuplicateTracker { key });
        }
        config.validate()?;
        tracing::debug!(target: POSITION_TARGET, key = key.as_str(), "tracker created");
        self.trackers.insert(key, StateTracker::new(config));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<StateTracker, TrackerError> {
        self.trackers.remove(key).ok_or_else(|| unknown(key))
    }

    pub fn get(&self, key: &str) -> Option<&StateTracker> {
        self.trackers.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StateTracker> {
        self.trackers.get_mut(key)
    }

    /// Apply a command to the named tracker
    pub fn update(
        &mut self,
        key: &str,
        command: &Command,
        file_line: i64,
        gcode_seq: i64,
    ) -> Result<&MachinePosition, TrackerError> {
        let tracker = self.trackers.get_mut(key).ok_or_else(|| unknown(key))?;
        Ok(tracker.update(command, file_line, gcode_seq))
    }

    pub fn undo(&mut self, key: &str) -> Result<(), TrackerError> {
        let tracker = self.trackers.get_mut(key).ok_or_else(|| unknown(key))?;
        tracker.undo();
        Ok(())
    }

    pub fn current(&self, key: &str) -> Result<&MachinePosition, TrackerError> {
        self.trackers
            .get(key)
            .map(StateTracker::current)
            .ok_or_else(|| unknown(key))
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.trackers.keys().map(String::as_str)
    }
}

fn unknown(key: &str) -> TrackerError {
    tracing::error!(target: POSITION_TARGET, key, "no tracker registered under this key");
    TrackerError::UnknownTracker {
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodesnap_parser::parse;

    #[test]
    fn test_create_returns_unique_keys() {
        let mut registry = TrackerRegistry::new();
        let first = registry.create(TrackerConfig::default()).unwrap();
        let second = registry.create(TrackerConfig::default()).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
        assert!(registry.keys().any(|key| key == first));
    }

    #[test]
    fn test_trackers_are_independent() {
        let mut registry = TrackerRegistry::new();
        registry.insert("left", TrackerConfig::default()).unwrap();
        registry.insert("right", TrackerConfig::default()).unwrap();

        registry.update("left", &parse("G28"), 1, 1).unwrap();
        registry.update("left", &parse("G1 X10"), 2, 2).unwrap();

        assert_eq!(registry.current("left").unwrap().x, 10.0);
        assert!(registry.current("right").unwrap().x_is_unset);

        registry.undo("left").unwrap();
        assert_eq!(registry.current("left").unwrap().x, 0.0);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let mut registry = TrackerRegistry::new();
        let result = registry.update("missing", &parse("G28"), 1, 1);
        assert!(matches!(result, Err(TrackerError::UnknownTracker { key }) if key == "missing"));
        assert!(registry.undo("missing").is_err());
        assert!(registry.remove("missing").is_err());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_and_invalid_inserts() {
        let mut registry = TrackerRegistry::new();
        registry.insert("printer", TrackerConfig::default()).unwrap();
        assert!(matches!(
            registry.insert("printer", TrackerConfig::default()),
            Err(TrackerError::DuplicateTracker { .. })
        ));

        let invalid = TrackerConfig {
            num_extruders: 0,
            ..Default::default()
        };
        assert!(matches!(
            registry.insert("other", invalid),
            Err(TrackerError::InvalidConfig { .. })
        ));

        registry.remove("printer").unwrap();
        assert!(registry.is_empty());
    }
}
