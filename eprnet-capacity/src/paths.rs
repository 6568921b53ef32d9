//! Hop-count shortest-path search and Yen's k-loopless-shortest-paths over a
//! boolean edge mask.
//!
//! The admission loops never clone the network: the ephemeral "working copy"
//! they prune edges from is an [`EdgeMask`] over the shared edge arena, while
//! residual capacities stay frozen on the live network for the duration of a
//! single search loop.
//!
//! Paths minimize hop count. Fewer hops means fewer intermediate swap
//! measurements, and the delivered rate scales with `mu^(h-1)`, so the hop
//! metric dominates any capacity-derived metric for end-to-end fidelity.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::network::{CapacityNetwork, EdgeId};

/// Boolean working copy over the edge arena.
#[derive(Clone, Debug)]
pub(crate) struct EdgeMask {
    removed: Vec<bool>,
}

impl EdgeMask {
    /// Mask with every edge present.
    pub fn all_present(network: &CapacityNetwork) -> Self {
        Self {
            removed: vec![false; network.num_edges()],
        }
    }

    /// Mask hiding every edge whose residual capacity is below `quantum`.
    pub fn feasible(network: &CapacityNetwork, quantum: f64) -> Self {
        let mut mask = Self::all_present(network);
        for id in 0..network.num_edges() {
            if network.edge(id).capacity < quantum {
                mask.remove(id);
            }
        }
        mask
    }

    pub fn remove(&mut self, id: EdgeId) {
        self.removed[id] = true;
    }

    pub fn contains(&self, id: EdgeId) -> bool {
        !self.removed[id]
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    cost: usize,
    node: usize,
}

// Min-heap on cost; equal costs pop the smaller node first so searches are
// deterministic regardless of heap internals.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Unit-cost Dijkstra from `src` to `dst` over the masked arena.
///
/// Returns the full node sequence `src..=dst`, or `None` when `dst` is not
/// reachable through present edges.
pub(crate) fn shortest_path(
    network: &CapacityNetwork,
    mask: &EdgeMask,
    src: usize,
    dst: usize,
) -> Option<Vec<usize>> {
    let nodes = network.num_nodes();
    let mut dist = vec![usize::MAX; nodes];
    let mut pred = vec![usize::MAX; nodes];
    let mut heap = BinaryHeap::new();

    dist[src] = 0;
    heap.push(State { cost: 0, node: src });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        if node == dst {
            break;
        }
        for &id in network.out_ids(node) {
            if !mask.contains(id) {
                continue;
            }
            let next = network.edge(id).to;
            let next_cost = cost + 1;
            if next_cost < dist[next] {
                dist[next] = next_cost;
                pred[next] = node;
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    if dist[dst] == usize::MAX {
        return None;
    }
    let mut path = vec![dst];
    let mut cursor = dst;
    while cursor != src {
        cursor = pred[cursor];
        path.push(cursor);
    }
    path.reverse();
    Some(path)
}

/// Yen's algorithm: up to `k` loopless shortest paths from `src` to `dst`,
/// ordered by hop count and then lexicographically on the node sequence.
pub(crate) fn k_shortest_paths(
    network: &CapacityNetwork,
    mask: &EdgeMask,
    src: usize,
    dst: usize,
    k: usize,
) -> Vec<Vec<usize>> {
    let mut found: Vec<Vec<usize>> = Vec::new();
    let Some(first) = shortest_path(network, mask, src, dst) else {
        return found;
    };
    found.push(first);

    let mut candidates: Vec<Vec<usize>> = Vec::new();
    while found.len() < k {
        let Some(previous) = found.last().cloned() else {
            break;
        };
        for spur_index in 0..previous.len() - 1 {
            let spur_node = previous[spur_index];
            let root = &previous[..=spur_index];

            let mut spur_mask = mask.clone();
            // Hide the next edge of every accepted path sharing this root so
            // the spur search is forced onto a deviation.
            for path in &found {
                if path.len() > spur_index + 1 && path[..=spur_index] == *root {
                    remove_edges_between(network, &mut spur_mask, path[spur_index], path[spur_index + 1]);
                }
            }
            // Hide the root's interior nodes to keep deviations loopless.
            for &node in &root[..spur_index] {
                for &id in network.out_ids(node) {
                    spur_mask.remove(id);
                }
            }

            if let Some(spur) = shortest_path(network, &spur_mask, spur_node, dst) {
                let mut total = root[..spur_index].to_vec();
                total.extend(spur);
                if !found.contains(&total) && !candidates.contains(&total) {
                    candidates.push(total);
                }
            }
        }

        let Some(best) = candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .map(|(index, _)| index)
        else {
            break;
        };
        found.push(candidates.swap_remove(best));
    }
    found
}

fn remove_edges_between(network: &CapacityNetwork, mask: &mut EdgeMask, from: usize, to: usize) {
    for &id in network.out_ids(from) {
        if network.edge(id).to == to {
            mask.remove(id);
        }
    }
}

/// Resolve the arena edge ids along a node sequence, honoring the mask when
/// given. The sequence must have come from a search over the same mask.
pub(crate) fn path_edge_ids(
    network: &CapacityNetwork,
    mask: Option<&EdgeMask>,
    nodes: &[usize],
) -> Vec<EdgeId> {
    nodes
        .windows(2)
        .map(|hop| {
            network
                .out_ids(hop[0])
                .iter()
                .copied()
                .find(|&id| {
                    network.edge(id).to == hop[1] && mask.map_or(true, |m| m.contains(id))
                })
                .expect("path references an edge missing from the arena")
        })
        .collect()
}

/// Smallest residual capacity along a node sequence.
pub(crate) fn path_bottleneck(network: &CapacityNetwork, nodes: &[usize]) -> f64 {
    path_edge_ids(network, None, nodes)
        .into_iter()
        .map(|id| network.edge(id).capacity)
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::CapacityNetwork;

    fn diamond() -> CapacityNetwork {
        // 0 -> 1 -> 3 and 0 -> 2 -> 3, plus the long detour 0 -> 4 -> 5 -> 3.
        CapacityNetwork::from_weights(&[
            (0, 1, 1.0),
            (1, 3, 1.0),
            (0, 2, 1.0),
            (2, 3, 1.0),
            (0, 4, 1.0),
            (4, 5, 1.0),
            (5, 3, 1.0),
        ])
        .expect("network")
    }

    #[test]
    fn shortest_path_minimizes_hops() {
        let network = diamond();
        let mask = EdgeMask::all_present(&network);
        let path = shortest_path(&network, &mask, 0, 3).expect("path");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], 0);
        assert_eq!(*path.last().expect("last"), 3);
    }

    #[test]
    fn masked_edges_force_a_detour() {
        let network = diamond();
        let mut mask = EdgeMask::all_present(&network);
        mask.remove(0); // 0 -> 1
        mask.remove(2); // 0 -> 2
        let path = shortest_path(&network, &mask, 0, 3).expect("path");
        assert_eq!(path, vec![0, 4, 5, 3]);
    }

    #[test]
    fn unreachable_returns_none() {
        let network = CapacityNetwork::from_weights(&[(0, 1, 1.0), (2, 3, 1.0)]).expect("network");
        let mask = EdgeMask::all_present(&network);
        assert!(shortest_path(&network, &mask, 0, 3).is_none());
    }

    #[test]
    fn yen_enumerates_disjoint_alternatives_in_length_order() {
        let network = diamond();
        let mask = EdgeMask::all_present(&network);
        let paths = k_shortest_paths(&network, &mask, 0, 3, 5);
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], vec![0, 1, 3]);
        assert_eq!(paths[1], vec![0, 2, 3]);
        assert_eq!(paths[2], vec![0, 4, 5, 3]);
    }

    #[test]
    fn yen_paths_are_loopless() {
        let network = diamond();
        let mask = EdgeMask::all_present(&network);
        for path in k_shortest_paths(&network, &mask, 0, 3, 8) {
            let mut seen = path.clone();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), path.len(), "loop in {path:?}");
        }
    }

    #[test]
    fn feasible_mask_hides_drained_edges() {
        let network = CapacityNetwork::from_weights(&[(0, 1, 0.0), (0, 1, 3.0)]).expect("network");
        let mask = EdgeMask::feasible(&network, 1e-9);
        assert!(!mask.contains(0));
        assert!(mask.contains(1));
    }

    #[test]
    fn bottleneck_is_the_path_minimum() {
        let network =
            CapacityNetwork::from_weights(&[(0, 1, 5.0), (1, 2, 2.0), (2, 3, 9.0)]).expect("network");
        assert_eq!(path_bottleneck(&network, &[0, 1, 2, 3]), 2.0);
    }
}
