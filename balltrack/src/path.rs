//! Backtracking along the best path
//!
//! The path is implicit: it starts at the path cursor (cheapest node of the
//! newest level) and follows predecessor links. Links into levels that have
//! been dropped end the walk.

use crate::timeline::{FrameIndex, Node, NodeKind, NodeRef, Timeline};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Iterator over path nodes from newest to oldest
pub struct PathWalk<'a> {
    timeline: &'a Timeline,
    next: Option<NodeRef>,
    /// Set when a link pointed at a level no longer held
    truncated: bool,
}

impl<'a> PathWalk<'a> {
    pub fn new(timeline: &'a Timeline, cursor: Option<NodeRef>) -> Self {
        Self {
            timeline,
            next: cursor,
            truncated: false,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for PathWalk<'a> {
    type Item = (NodeRef, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ref = self.next.take()?;
        match self.timeline.node(node_ref) {
            Some(node) => {
                self.next = node.predecessor;
                Some((node_ref, node))
            }
            None => {
                self.truncated = true;
                None
            }
        }
    }
}

/// Raw (unsmoothed) hypothesis for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hypothesis {
    /// The path visits a candidate in this frame
    Present { position: Point2<f64>, weight: f64 },
    /// The path visits the absent node of this frame
    Absent,
    /// A skip edge jumps over this frame
    Bridged { from: FrameIndex, to: FrameIndex },
    /// The path does not reach this frame through real nodes
    Unresolved,
}

impl Hypothesis {
    pub fn is_present(&self) -> bool {
        matches!(self, Hypothesis::Present { .. })
    }
}

/// Path nodes surrounding one frame, collected in a single walk
#[derive(Debug)]
pub struct PathWindow<'a> {
    pub frame: FrameIndex,
    /// Path node at exactly `frame`
    pub at: Option<&'a Node>,
    /// Nearest path node before `frame`
    pub lower: Option<&'a Node>,
    /// Nearest path node after `frame`
    pub upper: Option<&'a Node>,
    /// Up to `neighbours` present nodes before `frame`, nearest first, not
    /// crossing an absent node
    pub before: Vec<&'a Node>,
    /// Up to `neighbours` present nodes after `frame`, nearest first, not
    /// crossing an absent node
    pub after: Vec<&'a Node>,
    /// The walk ended on a dropped level before reaching `frame`
    pub truncated: bool,
}

impl<'a> PathWindow<'a> {
    pub fn around(
        timeline: &'a Timeline,
        cursor: Option<NodeRef>,
        frame: FrameIndex,
        neighbours: usize,
    ) -> Self {
        let mut window = PathWindow {
            frame,
            at: None,
            lower: None,
            upper: None,
            before: Vec::with_capacity(neighbours),
            after: Vec::with_capacity(neighbours),
            truncated: false,
        };

        // Nodes after the frame arrive farthest first; keep the last ones seen
        let mut after_rev: Vec<&'a Node> = Vec::new();

        let mut walk = PathWalk::new(timeline, cursor);
        for (_, node) in walk.by_ref() {
            if node.frame > frame {
                window.upper = Some(node);
                if node.is_present() {
                    after_rev.push(node);
                } else {
                    after_rev.clear();
                }
                continue;
            }

            if node.frame == frame {
                window.at = Some(node);
                continue;
            }

            if window.at.is_none() && window.lower.is_none() {
                window.lower = Some(node);
            }
            if !node.is_present() {
                break;
            }
            window.before.push(node);
            if window.before.len() >= neighbours {
                break;
            }
        }

        window.truncated = walk.is_truncated() && window.at.is_none() && window.lower.is_none();
        window.after = after_rev.into_iter().rev().take(neighbours).collect();
        window
    }

    pub fn hypothesis(&self) -> Hypothesis {
        if let Some(node) = self.at {
            return match node.kind {
                NodeKind::Present(c) => Hypothesis::Present {
                    position: c.position,
                    weight: c.weight,
                },
                NodeKind::Absent => Hypothesis::Absent,
                NodeKind::Seed => Hypothesis::Unresolved,
            };
        }

        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) if !lower.is_seed() && !self.truncated => {
                Hypothesis::Bridged {
                    from: lower.frame,
                    to: upper.frame,
                }
            }
            _ => Hypothesis::Unresolved,
        }
    }
}

/// Resolve the raw hypothesis for `frame`
pub fn resolve(timeline: &Timeline, cursor: Option<NodeRef>, frame: FrameIndex) -> Hypothesis {
    PathWindow::around(timeline, cursor, frame, 0).hypothesis()
}

/// One explicit node of the best path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub frame: FrameIndex,
    pub timestamp: f64,
    /// `None` for an absent node
    pub position: Option<Point2<f64>>,
    pub cost: f64,
}

/// The best path restricted to resident frames, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
    /// Cumulative cost at the path cursor
    pub cost: f64,
}

impl Trajectory {
    pub fn collect(timeline: &Timeline, cursor: Option<NodeRef>) -> Self {
        let Some(front) = timeline.front_frame() else {
            return Self::default();
        };

        let mut points: Vec<TrajectoryPoint> = PathWalk::new(timeline, cursor)
            .take_while(|(_, node)| node.frame >= front)
            .map(|(_, node)| TrajectoryPoint {
                frame: node.frame,
                timestamp: node.timestamp,
                position: node.position(),
                cost: node.cost,
            })
            .collect();
        points.reverse();

        let cost = cursor
            .and_then(|c| timeline.node(c))
            .map_or(0.0, |node| node.cost);

        Self { points, cost }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::timeline::FrameLevel;

    /// Build a timeline by hand with explicit predecessor links
    /// Each entry is `(frame, Some(x))` for a present node, `None` for absent,
    /// and each listed node links to the previous listed node.
    fn chain(frames: &[(FrameIndex, Option<f64>)]) -> (Timeline, NodeRef) {
        let last = frames.last().unwrap().0;
        let mut timeline = Timeline::new(16);
        timeline.start(0, 0.0);

        let mut prev = NodeRef { frame: -1, slot: 0 };
        for frame in 0..=last {
            let listed = frames.iter().find(|(f, _)| *f == frame);
            let candidates: Vec<Candidate> = match listed {
                Some((_, Some(x))) => vec![Candidate::new(*x, 0.0, 1.0)],
                _ => vec![],
            };
            let mut level = FrameLevel::new(frame, frame as f64 * 0.1, &candidates);
            if listed.is_some() {
                let slot = 0;
                let node = &mut level.nodes_mut()[slot];
                node.cost = frame as f64;
                node.predecessor = Some(prev);
                prev = level.node_ref(slot);
            }
            timeline.push_level(level);
        }
        (timeline, prev)
    }

    #[test]
    fn test_resolve_present_and_absent() {
        let (timeline, cursor) = chain(&[(0, Some(1.0)), (1, None), (2, Some(3.0))]);
        assert_eq!(
            resolve(&timeline, Some(cursor), 0),
            Hypothesis::Present {
                position: Point2::new(1.0, 0.0),
                weight: 1.0
            }
        );
        assert_eq!(resolve(&timeline, Some(cursor), 1), Hypothesis::Absent);
    }

    #[test]
    fn test_resolve_bridged() {
        let (timeline, cursor) = chain(&[(0, Some(1.0)), (3, Some(4.0))]);
        assert_eq!(
            resolve(&timeline, Some(cursor), 2),
            Hypothesis::Bridged { from: 0, to: 3 }
        );
    }

    #[test]
    fn test_resolve_seed_is_unresolved() {
        let (timeline, cursor) = chain(&[(2, Some(1.0)), (3, Some(1.0))]);
        assert_eq!(resolve(&timeline, Some(cursor), 0), Hypothesis::Unresolved);
        assert_eq!(resolve(&timeline, None, 3), Hypothesis::Unresolved);
    }

    #[test]
    fn test_window_neighbours() {
        let frames: Vec<(FrameIndex, Option<f64>)> = vec![
            (0, Some(0.0)),
            (1, Some(1.0)),
            (2, None),
            (3, Some(3.0)),
            (4, Some(4.0)),
            (5, Some(5.0)),
            (6, Some(6.0)),
            (7, Some(7.0)),
        ];
        let (timeline, cursor) = chain(&frames);
        let window = PathWindow::around(&timeline, Some(cursor), 4, 2);

        assert_eq!(window.at.map(|n| n.frame), Some(4));
        let before: Vec<FrameIndex> = window.before.iter().map(|n| n.frame).collect();
        let after: Vec<FrameIndex> = window.after.iter().map(|n| n.frame).collect();
        // the absent node at frame 2 ends the scan
        assert_eq!(before, vec![3]);
        assert_eq!(after, vec![5, 6]);

        let window = PathWindow::around(&timeline, Some(cursor), 1, 3);
        let after: Vec<FrameIndex> = window.after.iter().map(|n| n.frame).collect();
        assert!(after.is_empty());
        assert_eq!(window.before.iter().map(|n| n.frame).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_trajectory_is_oldest_first() {
        let (timeline, cursor) = chain(&[(0, Some(1.0)), (1, None), (2, Some(3.0))]);
        let trajectory = Trajectory::collect(&timeline, Some(cursor));
        let frames: Vec<FrameIndex> = trajectory.points.iter().map(|p| p.frame).collect();
        assert_eq!(frames, vec![0, 1, 2]);
        assert_eq!(trajectory.points[1].position, None);
        assert_eq!(trajectory.cost, 2.0);
    }
}
