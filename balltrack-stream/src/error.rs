//! Error types for the streaming front end

use balltrack::TrackerError;
use thiserror::Error;

/// Result type alias for the streaming library
pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Tracking worker disconnected")]
    Disconnected,

    #[error("Tracking worker panicked")]
    WorkerPanicked,

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StreamError {
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }
}
