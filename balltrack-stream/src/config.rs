/// Configuration for the streaming worker
///
/// Wraps the tracker parameters with the channel sizing of the worker thread.
use crate::error::{Result, StreamError};
use balltrack::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Parameters of the fixed-lag tracker owned by the worker
    pub tracker: TrackerConfig,
    /// Frames that may be queued before `submit` blocks (backpressure limit)
    pub channel_capacity: usize,
    /// Log throughput every N processed frames (0 disables)
    pub log_every: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            channel_capacity: 16,
            log_every: 1000,
        }
    }
}

impl StreamConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(StreamError::config("channel_capacity must be at least 1"));
        }
        self.tracker.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_tracker_config() {
        let config = StreamConfig::from_json_str(
            r#"{"channel_capacity": 4, "tracker": {"dynamic_depth": 10, "output_latency": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.channel_capacity, 4);
        assert_eq!(config.tracker.dynamic_depth, 10);
        assert_eq!(config.tracker.output_latency, 5);
        assert_eq!(config.log_every, 1000);
    }

    #[test]
    fn test_invalid_tracker_config_is_rejected() {
        let err = StreamConfig::from_json_str(r#"{"tracker": {"dynamic_depth": 0}}"#).unwrap_err();
        assert!(matches!(err, StreamError::Tracker(_)));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(StreamConfig::from_json_str(r#"{"channel_capacity": 0}"#).is_err());
    }
}
