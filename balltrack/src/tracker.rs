//! Fixed-lag single ball tracker over a sliding window of frames
//!
//! Each pushed frame becomes a level of hypotheses (one per candidate plus
//! "absent") relaxed against the previous `dynamic_depth` levels. The best
//! path is re-derived on every push, so answers for frames still in the
//! window may change; a frame's estimate is final once it has been retrieved
//! with [`SpotsTracker::front`] and evicted with [`SpotsTracker::pop_front`].

use crate::candidate::{self, candidates_from_rows, Candidate};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::path::{self, Hypothesis, Trajectory};
use crate::propagator;
use crate::smoother::Smoother;
use crate::timeline::{FrameIndex, FrameLevel, NodeRef, Timeline};
use nalgebra::Point2;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Output for one evicted frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEstimate {
    pub frame: FrameIndex,
    pub timestamp: f64,
    /// Smoothed ball position, `None` when the ball was not found
    pub position: Option<Point2<f64>>,
}

impl FrameEstimate {
    pub fn is_found(&self) -> bool {
        self.position.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SpotsTracker {
    config: TrackerConfig,
    smoother: Smoother,
    timeline: Timeline,
    /// Cheapest node of the newest level
    path_cursor: Option<NodeRef>,
    next_frame: Option<FrameIndex>,
    last_timestamp: f64,
    /// Frame whose estimate was handed out by `front()` since the last pop
    /// or push
    retrieved_front: Option<FrameIndex>,
    n_pushed: u64,
}

impl SpotsTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Creating spots tracker: depth={} latency={}",
            config.dynamic_depth,
            config.output_latency
        );
        Ok(Self {
            smoother: Smoother::new(&config),
            timeline: Timeline::new(config.dynamic_depth),
            path_cursor: None,
            next_frame: None,
            last_timestamp: f64::NEG_INFINITY,
            retrieved_front: None,
            n_pushed: 0,
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Ingest the candidates of `frame`, which must follow the previous frame
    pub fn push(
        &mut self,
        frame: FrameIndex,
        timestamp: f64,
        candidates: Vec<Candidate>,
    ) -> Result<()> {
        if let Some(expected) = self.next_frame {
            if frame != expected {
                return Err(TrackerError::OutOfSequence {
                    expected,
                    actual: frame,
                });
            }
        }
        if !timestamp.is_finite() || timestamp < self.last_timestamp {
            return Err(TrackerError::NonMonotonicTimestamp {
                frame,
                previous: self.last_timestamp,
                actual: timestamp,
            });
        }
        let candidates =
            candidate::prepare(frame, candidates, self.config.max_candidates_per_frame)?;

        if self.timeline.is_empty() {
            log::debug!("Timeline starts at frame {}", frame);
            self.timeline.start(frame, timestamp);
        }

        let mut level = FrameLevel::new(frame, timestamp, &candidates);
        propagator::relax_level(&self.config, &self.timeline, &mut level);

        self.path_cursor = level.best_slot().map(|slot| level.node_ref(slot));
        if let Some(cost) = self.path_cost_in(&level) {
            log::trace!(
                "Frame {}: {} candidates, best path cost {:.3}",
                frame,
                candidates.len(),
                cost
            );
        }

        self.timeline.push_level(level);
        // New evidence may change the front estimate handed out earlier
        self.retrieved_front = None;
        self.next_frame = Some(frame + 1);
        self.last_timestamp = timestamp;
        self.n_pushed += 1;
        Ok(())
    }

    /// Ingest an Nx3 array of `[x, y, weight]` rows
    pub fn push_rows(
        &mut self,
        frame: FrameIndex,
        timestamp: f64,
        rows: ArrayView2<f64>,
    ) -> Result<()> {
        let candidates = candidates_from_rows(rows)?;
        self.push(frame, timestamp, candidates)
    }

    fn path_cost_in(&self, level: &FrameLevel) -> Option<f64> {
        let cursor = self.path_cursor?;
        level.node(cursor.slot).map(|n| n.cost)
    }

    /// Cumulative cost of the current best path
    pub fn path_cost(&self) -> Option<f64> {
        self.path_cursor
            .and_then(|c| self.timeline.node(c))
            .map(|n| n.cost)
    }

    /// Frame index at the front cursor (oldest not yet evicted)
    pub fn front_frame(&self) -> Option<FrameIndex> {
        self.timeline.front_frame()
    }

    pub fn latest_frame(&self) -> Option<FrameIndex> {
        self.next_frame.map(|f| f - 1)
    }

    /// Frames currently in `[front, latest]`
    pub fn window_len(&self) -> usize {
        self.timeline.window_len()
    }

    pub fn frames_pushed(&self) -> u64 {
        self.n_pushed
    }

    fn check_resident(&self, frame: FrameIndex) -> Result<()> {
        if self.timeline.is_resident(frame) {
            Ok(())
        } else {
            Err(TrackerError::FrameNotResident {
                frame,
                front: self.timeline.front_frame(),
                latest: self.timeline.newest_frame(),
            })
        }
    }

    /// Raw hypothesis of the current best path at `frame`
    pub fn resolve(&self, frame: FrameIndex) -> Result<Hypothesis> {
        self.check_resident(frame)?;
        Ok(path::resolve(&self.timeline, self.path_cursor, frame))
    }

    /// Smoothed estimate for any resident frame, subject to change until
    /// the frame is evicted
    pub fn estimate(&self, frame: FrameIndex) -> Result<FrameEstimate> {
        self.check_resident(frame)?;
        let timestamp = self
            .timeline
            .level(frame)
            .map(|l| l.timestamp)
            .unwrap_or_default();
        let position = self
            .smoother
            .smooth(&self.timeline, self.path_cursor, frame, timestamp);
        Ok(FrameEstimate {
            frame,
            timestamp,
            position,
        })
    }

    /// Estimate for the front frame; must be called before `pop_front`, with
    /// no `push` in between
    pub fn front(&mut self) -> Result<FrameEstimate> {
        let frame = self.timeline.front_frame().ok_or(TrackerError::EmptyWindow)?;
        let estimate = self.estimate(frame)?;
        self.retrieved_front = Some(frame);
        Ok(estimate)
    }

    /// Evict the front frame, returning its index
    pub fn pop_front(&mut self) -> Result<FrameIndex> {
        let frame = self.timeline.front_frame().ok_or(TrackerError::EmptyWindow)?;
        if self.retrieved_front != Some(frame) {
            return Err(TrackerError::FrontNotRetrieved(frame));
        }
        let evicted = self.timeline.evict_front()?;
        self.retrieved_front = None;
        Ok(evicted)
    }

    /// Retrieve and evict the front frame
    pub fn take_front(&mut self) -> Result<FrameEstimate> {
        let estimate = self.front()?;
        self.pop_front()?;
        Ok(estimate)
    }

    /// Push a frame, then emit every frame that fell out of the output latency
    pub fn push_and_drain(
        &mut self,
        frame: FrameIndex,
        timestamp: f64,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<FrameEstimate>> {
        self.push(frame, timestamp, candidates)?;

        let mut ready = Vec::new();
        while self.timeline.window_len() > self.config.output_latency {
            ready.push(self.take_front()?);
        }
        Ok(ready)
    }

    /// Emit and evict every resident frame (end of stream)
    pub fn drain_all(&mut self) -> Result<Vec<FrameEstimate>> {
        let mut ready = Vec::with_capacity(self.timeline.window_len());
        while self.timeline.window_len() > 0 {
            ready.push(self.take_front()?);
        }
        log::debug!("Drained {} frames at end of stream", ready.len());
        Ok(ready)
    }

    /// Current best path over the resident frames
    pub fn best_trajectory(&self) -> Trajectory {
        Trajectory::collect(&self.timeline, self.path_cursor)
    }
}
