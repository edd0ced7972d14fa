//! Timeline store: one level of hypothesis nodes per frame
//!
//! Levels live in a `VecDeque` ordered oldest to newest with contiguous frame
//! indices. Nodes refer to their predecessor by value ([`NodeRef`]), never by
//! pointer, and every dereference goes through [`Timeline::node`], which
//! returns `None` once the referenced level has been dropped. A level that is
//! evicted is first kept in a bounded history behind the front cursor so that
//! path nodes just behind the front stay visible to backtracking and
//! smoothing; it is physically dropped only once it falls out of that history.

use crate::candidate::Candidate;
use crate::error::{Result, TrackerError};
use nalgebra::Point2;
use std::collections::VecDeque;

/// Frame number as assigned by the caller
pub type FrameIndex = i64;

/// Address of a node: the frame it belongs to and its slot in that level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub frame: FrameIndex,
    pub slot: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// The ball is at this candidate
    Present(Candidate),
    /// The ball is not visible in this frame
    Absent,
    /// Zero-cost start of every path, placed one frame before the first real one
    Seed,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub frame: FrameIndex,
    pub timestamp: f64,
    /// Minimal cumulative cost of any path ending here
    pub cost: f64,
    pub predecessor: Option<NodeRef>,
}

impl Node {
    fn new(kind: NodeKind, frame: FrameIndex, timestamp: f64) -> Self {
        Self {
            kind,
            frame,
            timestamp,
            cost: f64::INFINITY,
            predecessor: None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self.kind, NodeKind::Present(_))
    }

    pub fn is_seed(&self) -> bool {
        matches!(self.kind, NodeKind::Seed)
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match &self.kind {
            NodeKind::Present(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Point2<f64>> {
        self.candidate().map(|c| c.position)
    }

    /// Absent and seed nodes weigh nothing
    pub fn weight(&self) -> f64 {
        self.candidate().map_or(0.0, |c| c.weight)
    }

    pub fn is_reachable(&self) -> bool {
        self.cost.is_finite()
    }
}

/// All hypotheses for one frame: present nodes first, the absent node last
#[derive(Debug, Clone)]
pub struct FrameLevel {
    pub frame: FrameIndex,
    pub timestamp: f64,
    nodes: Vec<Node>,
}

impl FrameLevel {
    pub fn new(frame: FrameIndex, timestamp: f64, candidates: &[Candidate]) -> Self {
        let mut nodes: Vec<Node> = candidates
            .iter()
            .map(|c| Node::new(NodeKind::Present(*c), frame, timestamp))
            .collect();
        nodes.push(Node::new(NodeKind::Absent, frame, timestamp));
        Self {
            frame,
            timestamp,
            nodes,
        }
    }

    pub(crate) fn seed(frame: FrameIndex, timestamp: f64) -> Self {
        let mut node = Node::new(NodeKind::Seed, frame, timestamp);
        node.cost = 0.0;
        Self {
            frame,
            timestamp,
            nodes: vec![node],
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn node(&self, slot: u32) -> Option<&Node> {
        self.nodes.get(slot as usize)
    }

    pub fn node_ref(&self, slot: usize) -> NodeRef {
        NodeRef {
            frame: self.frame,
            slot: slot as u32,
        }
    }

    pub fn absent_slot(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn num_candidates(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_present()).count()
    }

    pub fn is_seed(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].is_seed()
    }

    /// Slot of the cheapest node, first minimum wins
    pub fn best_slot(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (slot, node) in self.nodes.iter().enumerate() {
            if !node.is_reachable() {
                continue;
            }
            match best {
                Some((_, cost)) if node.cost >= cost => {}
                _ => best = Some((slot, node.cost)),
            }
        }
        best.map(|(slot, _)| slot)
    }
}

/// Double-ended sequence of frame levels with a front cursor
#[derive(Debug, Clone)]
pub struct Timeline {
    levels: VecDeque<FrameLevel>,
    /// Oldest frame not yet evicted; levels before it are history
    front: FrameIndex,
    /// Evicted levels retained behind the front
    history: usize,
}

impl Timeline {
    pub fn new(history: usize) -> Self {
        Self {
            levels: VecDeque::with_capacity(2 * history + 2),
            front: 0,
            history,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Start the timeline with the seed level just before `first_frame`
    pub(crate) fn start(&mut self, first_frame: FrameIndex, timestamp: f64) {
        debug_assert!(self.levels.is_empty());
        self.levels.push_back(FrameLevel::seed(first_frame - 1, timestamp));
        self.front = first_frame;
    }

    /// Append a fully relaxed level
    pub(crate) fn push_level(&mut self, level: FrameLevel) {
        debug_assert_eq!(Some(level.frame), self.newest_frame().map(|f| f + 1));
        self.levels.push_back(level);
    }

    /// Advance the front cursor by one and drop levels that fall out of the
    /// retained history
    pub(crate) fn evict_front(&mut self) -> Result<FrameIndex> {
        let evicted = self.front;
        if self.level(evicted).is_none() {
            return Err(TrackerError::EmptyWindow);
        }
        self.front += 1;

        while let Some(oldest) = self.levels.front() {
            if oldest.frame + (self.history as FrameIndex) < self.front {
                log::trace!("Dropping level {} from history", oldest.frame);
                self.levels.pop_front();
            } else {
                break;
            }
        }

        Ok(evicted)
    }

    pub fn level(&self, frame: FrameIndex) -> Option<&FrameLevel> {
        let oldest = self.levels.front()?.frame;
        if frame < oldest {
            return None;
        }
        self.levels.get((frame - oldest) as usize)
    }

    pub fn node(&self, node_ref: NodeRef) -> Option<&Node> {
        self.level(node_ref.frame)?.node(node_ref.slot)
    }

    /// Frame index of the oldest resident level (the front cursor)
    pub fn front_frame(&self) -> Option<FrameIndex> {
        self.newest_frame()
            .filter(|&newest| newest >= self.front)
            .map(|_| self.front)
    }

    pub fn newest_frame(&self) -> Option<FrameIndex> {
        self.levels.back().map(|l| l.frame)
    }

    pub fn newest_level(&self) -> Option<&FrameLevel> {
        self.levels.back()
    }

    pub fn oldest_frame(&self) -> Option<FrameIndex> {
        self.levels.front().map(|l| l.frame)
    }

    pub fn is_resident(&self, frame: FrameIndex) -> bool {
        match (self.front_frame(), self.newest_frame()) {
            (Some(front), Some(newest)) => front <= frame && frame <= newest,
            _ => false,
        }
    }

    /// Number of frames in `[front, newest]`
    pub fn window_len(&self) -> usize {
        match (self.front_frame(), self.newest_frame()) {
            (Some(front), Some(newest)) => (newest - front + 1) as usize,
            _ => 0,
        }
    }

    /// Number of levels physically held, history included
    pub fn stored_len(&self) -> usize {
        self.levels.len()
    }

    /// Levels with frame in `[frame - depth, frame)` still held, oldest first
    pub fn lookback(&self, frame: FrameIndex, depth: usize) -> impl Iterator<Item = &FrameLevel> {
        let len = self.levels.len() as FrameIndex;
        let (start, end) = match self.levels.front() {
            Some(oldest) => {
                let start = (frame - depth as FrameIndex - oldest.frame).clamp(0, len);
                let end = (frame - oldest.frame).clamp(start, len);
                (start as usize, end as usize)
            }
            None => (0, 0),
        };
        self.levels.range(start..end)
    }

    /// Resident levels, oldest first
    pub fn resident_levels(&self) -> impl Iterator<Item = &FrameLevel> {
        let front = self.front;
        self.levels.iter().filter(move |l| l.frame >= front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline_with(frames: std::ops::Range<FrameIndex>, history: usize) -> Timeline {
        let mut timeline = Timeline::new(history);
        timeline.start(frames.start, 0.0);
        for frame in frames {
            let candidates = [Candidate::new(frame as f64, 0.0, 1.0)];
            timeline.push_level(FrameLevel::new(frame, frame as f64 * 0.01, &candidates));
        }
        timeline
    }

    #[test]
    fn test_level_always_has_absent_node() {
        let level = FrameLevel::new(3, 0.1, &[]);
        assert_eq!(level.nodes().len(), 1);
        assert_eq!(level.absent_slot(), 0);
        assert!(matches!(level.nodes()[0].kind, NodeKind::Absent));

        let level = FrameLevel::new(3, 0.1, &[Candidate::new(0.0, 0.0, 1.0)]);
        assert_eq!(level.nodes().len(), 2);
        assert_eq!(level.num_candidates(), 1);
        assert!(matches!(level.nodes()[1].kind, NodeKind::Absent));
    }

    #[test]
    fn test_seed_precedes_first_frame() {
        let timeline = timeline_with(5..8, 4);
        assert_eq!(timeline.oldest_frame(), Some(4));
        assert!(timeline.level(4).unwrap().is_seed());
        assert_eq!(timeline.front_frame(), Some(5));
        assert_eq!(timeline.newest_frame(), Some(7));
        assert_eq!(timeline.window_len(), 3);
        assert!(!timeline.is_resident(4));
    }

    #[test]
    fn test_eviction_keeps_history() {
        let mut timeline = timeline_with(0..10, 2);
        assert_eq!(timeline.evict_front(), Ok(0));
        assert_eq!(timeline.evict_front(), Ok(1));
        // seed (-1) is three frames behind the front now and gets dropped
        assert_eq!(timeline.oldest_frame(), Some(0));
        assert_eq!(timeline.front_frame(), Some(2));
        assert!(timeline.node(NodeRef { frame: -1, slot: 0 }).is_none());
        assert!(timeline.node(NodeRef { frame: 0, slot: 0 }).is_some());
        assert!(!timeline.is_resident(1));
    }

    #[test]
    fn test_evict_empty_window() {
        let mut timeline = timeline_with(0..2, 2);
        assert!(timeline.evict_front().is_ok());
        assert!(timeline.evict_front().is_ok());
        assert_eq!(timeline.front_frame(), None);
        assert_eq!(timeline.window_len(), 0);
        assert_eq!(timeline.evict_front(), Err(TrackerError::EmptyWindow));
    }

    #[test]
    fn test_lookback_bounds() {
        let timeline = timeline_with(0..10, 4);
        let frames: Vec<FrameIndex> = timeline.lookback(9, 3).map(|l| l.frame).collect();
        assert_eq!(frames, vec![6, 7, 8]);

        let frames: Vec<FrameIndex> = timeline.lookback(1, 5).map(|l| l.frame).collect();
        assert_eq!(frames, vec![-1, 0]);

        assert_eq!(timeline.lookback(40, 3).count(), 0);
        let frames: Vec<FrameIndex> = timeline.lookback(11, 3).map(|l| l.frame).collect();
        assert_eq!(frames, vec![8, 9]);
    }

    #[test]
    fn test_lookback_ignores_unevicted_backlog() {
        let timeline = timeline_with(0..1000, 4);
        assert_eq!(timeline.stored_len(), 1001);
        let frames: Vec<FrameIndex> = timeline.lookback(1000, 4).map(|l| l.frame).collect();
        assert_eq!(frames, vec![996, 997, 998, 999]);
    }

    #[test]
    fn test_best_slot_first_minimum_wins() {
        let mut level = FrameLevel::new(0, 0.0, &[Candidate::new(0.0, 0.0, 1.0); 2]);
        level.nodes_mut()[0].cost = 2.0;
        level.nodes_mut()[1].cost = 1.0;
        level.nodes_mut()[2].cost = 1.0;
        assert_eq!(level.best_slot(), Some(1));
    }
}
