//! Temporal smoothing of the resolved path
//!
//! The output position for a frame is a weighted mean of the nearest present
//! path nodes around it, each weighted by `1 / (sigma_per_second * |dt| + sigma0)`
//! so detections close in time dominate. Nodes with a zero-width kernel take
//! all the weight. Neighbours are taken from the same visible stretch only
//! (never across an absent node) and within `max_interpolation_time`.
//!
//! The smoother never extrapolates: frames the path does not bracket, or
//! bridges over too long a gap, are reported as not found.

use crate::config::TrackerConfig;
use crate::path::PathWindow;
use crate::timeline::{FrameIndex, Node, NodeKind, NodeRef, Timeline};
use nalgebra::{Point2, Vector2};

#[derive(Debug, Clone)]
pub struct Smoother {
    pub neighbours: usize,
    pub sigma0: f64,
    pub sigma_per_second: f64,
    pub max_interpolation_time: f64,
}

impl Smoother {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            neighbours: config.smoothing_neighbours,
            sigma0: config.sigma0,
            sigma_per_second: config.sigma_per_second,
            max_interpolation_time: config.max_interpolation_time,
        }
    }

    fn kernel_width(&self, dt: f64) -> f64 {
        self.sigma_per_second * dt.abs() + self.sigma0
    }

    /// Smoothed position for `frame` (taken at `timestamp`), or `None` when
    /// the ball is absent or cannot be located without extrapolating
    pub fn smooth(
        &self,
        timeline: &Timeline,
        cursor: Option<NodeRef>,
        frame: FrameIndex,
        timestamp: f64,
    ) -> Option<Point2<f64>> {
        let window = PathWindow::around(timeline, cursor, frame, self.neighbours);

        let at: Option<&Node> = match window.at.map(|n| &n.kind) {
            Some(NodeKind::Present(_)) => window.at,
            Some(_) => return None,
            None => {
                if window.truncated {
                    return None;
                }
                let lower = window.lower?;
                let upper = window.upper?;
                if !lower.is_present() || !upper.is_present() {
                    return None;
                }
                if upper.timestamp - lower.timestamp > self.max_interpolation_time {
                    log::trace!(
                        "Frame {} bridged over {:.3}s, not interpolating",
                        frame,
                        upper.timestamp - lower.timestamp
                    );
                    return None;
                }
                None
            }
        };

        let samples: Vec<(Point2<f64>, f64)> = at
            .into_iter()
            .chain(window.before.iter().copied())
            .chain(window.after.iter().copied())
            .filter(|node| (node.timestamp - timestamp).abs() <= self.max_interpolation_time)
            .filter_map(|node| {
                let position = node.position()?;
                Some((position, self.kernel_width(node.timestamp - timestamp)))
            })
            .collect();

        // Limit of the weighted mean as the kernel width goes to zero
        let sharp: Vec<Point2<f64>> = samples
            .iter()
            .filter(|(_, width)| *width <= 0.0)
            .map(|(position, _)| *position)
            .collect();
        if !sharp.is_empty() {
            let sum = sharp
                .iter()
                .fold(Vector2::zeros(), |acc, p| acc + p.coords);
            return Some(Point2::from(sum / sharp.len() as f64));
        }

        let mut total_weight = 0.0;
        let mut acc = Vector2::zeros();
        for (position, width) in samples {
            let w = 1.0 / width;
            total_weight += w;
            acc += position.coords * w;
        }

        if total_weight > 0.0 && total_weight.is_finite() {
            Some(Point2::from(acc / total_weight))
        } else {
            None
        }
    }
}
