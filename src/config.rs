//! Tracker configuration
//!
//! All tunables of the tracking pipeline live here. Defaults match the
//! production constants; a config can also be loaded from JSON.

use crate::error::EngageError;
use serde::{Deserialize, Serialize};

/// Minimum spacing between accepted scroll samples
pub const DEFAULT_SAMPLE_THROTTLE_MS: u64 = 150;

/// Buffer length that triggers trimming
pub const DEFAULT_SAMPLE_BUFFER_CAP: usize = 100;

/// Samples kept after a trim
pub const DEFAULT_SAMPLE_BUFFER_RETAIN: usize = 50;

/// Visits shorter than this are treated as bounces (10 seconds)
pub const DEFAULT_MIN_READING_TIME_MS: u64 = 10_000;

/// Reading-time heartbeat period (30 seconds)
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Whether tracking is enabled at all
    pub enabled: bool,
    /// Minimum milliseconds between accepted scroll samples
    pub sample_throttle_ms: u64,
    /// Buffer length above which old samples are dropped
    pub sample_buffer_cap: usize,
    /// Number of most recent samples kept after trimming
    pub sample_buffer_retain: usize,
    /// Elapsed time below which reading time is not reported
    pub min_reading_time_ms: u64,
    /// Heartbeat period; 0 disables the automatic ticker
    pub heartbeat_interval_ms: u64,
    /// Path prefixes under which links point at trackable content
    pub trackable_path_prefixes: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_throttle_ms: DEFAULT_SAMPLE_THROTTLE_MS,
            sample_buffer_cap: DEFAULT_SAMPLE_BUFFER_CAP,
            sample_buffer_retain: DEFAULT_SAMPLE_BUFFER_RETAIN,
            min_reading_time_ms: DEFAULT_MIN_READING_TIME_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            trackable_path_prefixes: vec!["/blog/".to_string(), "/posts/".to_string()],
        }
    }
}

impl TrackerConfig {
    /// Load and validate a config from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, EngageError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to JSON
    pub fn to_json(&self) -> Result<String, EngageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the buffer bounds are coherent
    pub fn validate(&self) -> Result<(), EngageError> {
        if self.sample_buffer_cap == 0 {
            return Err(EngageError::InvalidConfig(
                "sample_buffer_cap must be greater than zero".to_string(),
            ));
        }
        if self.sample_buffer_retain == 0 || self.sample_buffer_retain > self.sample_buffer_cap {
            return Err(EngageError::InvalidConfig(format!(
                "sample_buffer_retain must be in 1..={}, got {}",
                self.sample_buffer_cap, self.sample_buffer_retain
            )));
        }
        if self.trackable_path_prefixes.iter().any(|p| !p.starts_with('/')) {
            return Err(EngageError::InvalidConfig(
                "trackable_path_prefixes must start with '/'".to_string(),
            ));
        }
        Ok(())
    }

    /// Same config with the automatic heartbeat disabled
    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat_interval_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_throttle_ms, 150);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = TrackerConfig::from_json(r#"{"heartbeat_interval_ms": 5000}"#).unwrap();
        assert_eq!(config.heartbeat_interval_ms, 5_000);
        assert_eq!(config.min_reading_time_ms, DEFAULT_MIN_READING_TIME_MS);
        assert!(config.enabled);
    }

    #[test]
    fn test_retain_larger_than_cap_rejected() {
        let result = TrackerConfig::from_json(r#"{"sample_buffer_cap": 10, "sample_buffer_retain": 20}"#);
        assert!(matches!(result, Err(EngageError::InvalidConfig(_))));
    }

    #[test]
    fn test_relative_prefix_rejected() {
        let result = TrackerConfig::from_json(r#"{"trackable_path_prefixes": ["blog/"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TrackerConfig::default().without_heartbeat();
        let json = config.to_json().unwrap();
        assert_eq!(TrackerConfig::from_json(&json).unwrap(), config);
    }
}
