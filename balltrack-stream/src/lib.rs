//! Streaming front end for the balltrack fixed-lag tracker
//!
//! Runs a [`balltrack::SpotsTracker`] on a dedicated worker thread fed through
//! bounded crossbeam channels, and replays recorded candidate streams from CSV.

pub mod config;
pub mod error;
pub mod replay;
pub mod worker;

pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use replay::{format_estimate, FrameReader, OUTPUT_HEADER};
pub use worker::{FrameInput, TrackerCommand, TrackingWorker, WorkerStats};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
