//! Cost propagation: one step of the bounded-depth dynamic program
//!
//! Every node of a new level is relaxed against all nodes of the previous
//! `dynamic_depth` levels. Nodes of one level never read each other, so wide
//! levels are relaxed in parallel without changing the result.

use crate::config::TrackerConfig;
use crate::timeline::{FrameLevel, Node, NodeKind, Timeline};
use rayon::prelude::*;

/// Below this many nodes a level is relaxed sequentially
const PARALLEL_MIN_NODES: usize = 16;

/// Cost of the edge `from -> to`, or `None` when the transition is not
/// physically possible
pub fn edge_cost(config: &TrackerConfig, from: &Node, to: &Node) -> Option<f64> {
    let skip = to.frame - from.frame - 1;
    debug_assert!(skip >= 0);

    let mut cost = 0.0;

    match (&from.kind, &to.kind) {
        (NodeKind::Present(_), NodeKind::Absent) => cost += config.disappearance_cost,
        // The seed counts as absent
        (NodeKind::Absent | NodeKind::Seed, NodeKind::Present(_)) => {
            cost += config.appearance_cost;
        }
        (NodeKind::Absent | NodeKind::Seed, NodeKind::Absent) => {
            // Every absent frame must be an explicit node on the path
            if skip > 0 {
                return None;
            }
            cost += config.absence_cost;
        }
        (NodeKind::Present(_), NodeKind::Present(_)) => {}
        (_, NodeKind::Seed) => return None,
    }

    cost -= to.weight();
    cost += skip as f64 * config.skip_cost;

    if let (NodeKind::Present(a), NodeKind::Present(b)) = (&from.kind, &to.kind) {
        let dt = to.timestamp - from.timestamp;
        if dt <= 0.0 {
            return None;
        }
        let distance = a.distance(b);
        if distance > config.max_speed * dt || distance > config.max_unseen_distance {
            return None;
        }
        cost += distance * distance / (dt * config.variance_parameter);
    }

    Some(cost)
}

/// Relax one node against the lookback window (strict less-than: the first
/// predecessor found among equal costs wins)
fn relax_node(config: &TrackerConfig, timeline: &Timeline, node: &mut Node) {
    for level in timeline.lookback(node.frame, config.dynamic_depth) {
        for (slot, prev) in level.nodes().iter().enumerate() {
            if !prev.is_reachable() {
                continue;
            }
            let Some(cost) = edge_cost(config, prev, node) else {
                continue;
            };
            let candidate_cost = prev.cost + cost;
            if candidate_cost < node.cost {
                node.cost = candidate_cost;
                node.predecessor = Some(level.node_ref(slot));
            }
        }
    }
}

/// Compute cumulative cost and predecessor of every node of `level`, which
/// must directly follow the newest level of `timeline`
pub fn relax_level(config: &TrackerConfig, timeline: &Timeline, level: &mut FrameLevel) {
    let nodes = level.nodes_mut();
    if nodes.len() >= PARALLEL_MIN_NODES {
        nodes
            .par_iter_mut()
            .for_each(|node| relax_node(config, timeline, node));
    } else {
        for node in nodes.iter_mut() {
            relax_node(config, timeline, node);
        }
    }

    if log::log_enabled!(log::Level::Trace) {
        let reachable = level.nodes().iter().filter(|n| n.is_reachable()).count();
        log::trace!(
            "Relaxed frame {}: {}/{} nodes reachable",
            level.frame,
            reachable,
            level.nodes().len()
        );
    }
}
