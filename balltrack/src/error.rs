//! Error types for the ball tracker

use crate::timeline::FrameIndex;
use thiserror::Error;

/// Result type alias for the tracking library
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while feeding or consuming the tracker
///
/// Every variant is a caller contract violation or a configuration problem.
/// Implausible motion is never an error: such edges are simply not linked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Frame out of sequence: expected {expected}, got {actual}")]
    OutOfSequence {
        expected: FrameIndex,
        actual: FrameIndex,
    },

    #[error("Timestamp {actual} for frame {frame} precedes previous timestamp {previous}")]
    NonMonotonicTimestamp {
        frame: FrameIndex,
        previous: f64,
        actual: f64,
    },

    #[error("Invalid candidate {index} in frame {frame}: {reason}")]
    InvalidCandidate {
        frame: FrameIndex,
        index: usize,
        reason: String,
    },

    #[error("Frame {frame} is not resident (window is {front:?}..={latest:?})")]
    FrameNotResident {
        frame: FrameIndex,
        front: Option<FrameIndex>,
        latest: Option<FrameIndex>,
    },

    #[error("Front frame {0} evicted before its estimate was retrieved")]
    FrontNotRetrieved(FrameIndex),

    #[error("No frame left to evict")]
    EmptyWindow,

    #[error("Candidate array must have 3 columns [x, y, weight], got {0}")]
    CandidateShape(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TrackerError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_candidate<S: Into<String>>(frame: FrameIndex, index: usize, reason: S) -> Self {
        Self::InvalidCandidate {
            frame,
            index,
            reason: reason.into(),
        }
    }
}
