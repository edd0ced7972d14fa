//! Tracker configuration
//!
//! All parameters are fixed at construction; changing any of them requires
//! a fresh [`SpotsTracker`](crate::SpotsTracker). Distances are in playing
//! surface units (metres for a rectified table), times in seconds and costs
//! in negative-log-likelihood units ("badness").

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Lookback depth D: a new node may link to nodes at most D frames older
    pub dynamic_depth: usize,
    /// Frames kept resident before the fixed-lag driver emits the front one
    pub output_latency: usize,
    /// Toll charged for every frame implicitly bridged by an edge
    pub skip_cost: f64,
    /// Cost of an absent -> absent edge
    pub absence_cost: f64,
    /// Cost of an absent -> present edge
    pub appearance_cost: f64,
    /// Cost of a present -> absent edge
    pub disappearance_cost: f64,
    /// Maximum plausible speed (distance per second)
    pub max_speed: f64,
    /// Maximum distance a present -> present edge may cover
    pub max_unseen_distance: f64,
    /// Brownian variance per second of the motion likelihood
    pub variance_parameter: f64,
    /// Smoothing kernel width at zero time offset
    pub sigma0: f64,
    /// Smoothing kernel growth per second of time offset
    pub sigma_per_second: f64,
    /// Longest gap (seconds) the smoother is allowed to bridge
    pub max_interpolation_time: f64,
    /// Present path nodes averaged on each side of the smoothed frame
    pub smoothing_neighbours: usize,
    /// Keep only the highest-weight candidates of each frame
    pub max_candidates_per_frame: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            dynamic_depth: 60,
            output_latency: 60,
            skip_cost: 0.0,
            absence_cost: -10.0,
            appearance_cost: 400.0,
            disappearance_cost: 400.0,
            max_speed: 18.0, // m/s, a hard shot on a foosball table
            max_unseen_distance: 0.3,
            variance_parameter: 0.3,
            sigma0: 0.005,
            sigma_per_second: 0.5,
            max_interpolation_time: 0.5,
            smoothing_neighbours: 3,
            max_candidates_per_frame: None,
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrackerError::config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Check that every parameter keeps the all-absent path finite and the
    /// motion model well defined
    pub fn validate(&self) -> Result<()> {
        if self.dynamic_depth == 0 {
            return Err(TrackerError::config("dynamic_depth must be at least 1"));
        }
        if self.output_latency > self.dynamic_depth {
            return Err(TrackerError::config(format!(
                "output_latency ({}) must not exceed dynamic_depth ({})",
                self.output_latency, self.dynamic_depth
            )));
        }

        let finite = [
            ("skip_cost", self.skip_cost),
            ("absence_cost", self.absence_cost),
            ("appearance_cost", self.appearance_cost),
            ("disappearance_cost", self.disappearance_cost),
            ("max_interpolation_time", self.max_interpolation_time),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(TrackerError::config(format!("{} must be finite", name)));
            }
        }

        let positive = [
            ("max_speed", self.max_speed),
            ("max_unseen_distance", self.max_unseen_distance),
            ("variance_parameter", self.variance_parameter),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackerError::config(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [("sigma0", self.sigma0), ("sigma_per_second", self.sigma_per_second)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TrackerError::config(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }
        if self.sigma0 == 0.0 && self.sigma_per_second == 0.0 {
            return Err(TrackerError::config(
                "sigma0 and sigma_per_second cannot both be zero",
            ));
        }

        if self.max_candidates_per_frame == Some(0) {
            return Err(TrackerError::config(
                "max_candidates_per_frame must be at least 1 when set",
            ));
        }

        Ok(())
    }
}
