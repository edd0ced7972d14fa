//! Windowed multi-hypothesis ball tracking
//!
//! This crate turns noisy per-frame point candidates (with false positives,
//! misses and occlusions) into a single ball trajectory. Every frame becomes
//! a level of hypotheses, one per candidate plus "absent", and a bounded-depth
//! dynamic program links each new hypothesis to its cheapest plausible
//! predecessor. Results are emitted with a fixed lag so later evidence can
//! still correct a frame before it leaves the window.
//!
//! # Usage
//!
//! ```rust
//! use balltrack::{Candidate, SpotsTracker, TrackerConfig};
//!
//! let config = TrackerConfig {
//!     dynamic_depth: 30,
//!     output_latency: 30,
//!     ..Default::default()
//! };
//! let mut tracker = SpotsTracker::new(config)?;
//!
//! for frame in 0..100 {
//!     let t = frame as f64 / 120.0;
//!     let candidates = vec![Candidate::new(0.3 + 0.5 * t, 0.2, 2.0)];
//!     for estimate in tracker.push_and_drain(frame, t, candidates)? {
//!         println!("{} -> {:?}", estimate.frame, estimate.position);
//!     }
//! }
//! let tail = tracker.drain_all()?;
//! assert_eq!(tail.len(), 30);
//! # Ok::<(), balltrack::TrackerError>(())
//! ```

pub mod candidate;
pub mod config;
pub mod error;
pub mod path;
pub mod propagator;
pub mod smoother;
pub mod timeline;
pub mod tracker;

pub use candidate::{candidates_from_rows, Candidate};
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use path::{Hypothesis, Trajectory, TrajectoryPoint};
pub use timeline::{FrameIndex, NodeRef};
pub use tracker::{FrameEstimate, SpotsTracker};
