use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::network::CapacityNetwork;
use crate::paths::{path_edge_ids, shortest_path, EdgeMask};
use crate::types::{CapacityError, CapacityResult, CAPACITY_EPSILON};

/// Point-to-point demand for a constant end-to-end entanglement rate.
///
/// The input half (`src`, `dst`, `net_rate`) is set by the caller; the output
/// half is written by [`CapacityNetwork::route`]. A rejected flow keeps an
/// empty `path`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowDescriptor {
    // input
    pub src: usize,
    pub dst: usize,
    /// Requested end-to-end rate, in EPR/s.
    pub net_rate: f64,

    // output
    /// Hop sequence excluding `src`, including `dst`; empty if rejected.
    pub path: Vec<usize>,
    /// Capacity reserved on every path edge, `net_rate / mu^(h-1)`.
    pub gross_rate: f64,
    /// Shortest-path searches spent on this flow.
    pub dijkstra_count: usize,
}

impl FlowDescriptor {
    pub fn new(src: usize, dst: usize, net_rate: f64) -> Self {
        Self {
            src,
            dst,
            net_rate,
            path: Vec::new(),
            gross_rate: 0.0,
            dijkstra_count: 0,
        }
    }

    pub fn is_admitted(&self) -> bool {
        !self.path.is_empty()
    }

    fn reset_outputs(&mut self) {
        self.path.clear();
        self.gross_rate = 0.0;
        self.dijkstra_count = 0;
    }
}

impl fmt::Display for FlowDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_admitted() {
            write!(
                f,
                "flow {} -> {} net {} EPR/s: gross {} EPR/s over {:?} ({} searches)",
                self.src, self.dst, self.net_rate, self.gross_rate, self.path, self.dijkstra_count
            )
        } else {
            write!(
                f,
                "flow {} -> {} net {} EPR/s: rejected ({} searches)",
                self.src, self.dst, self.net_rate, self.dijkstra_count
            )
        }
    }
}

impl CapacityNetwork {
    /// Route `flows` in input order, accepting every feasible flow.
    ///
    /// See [`CapacityNetwork::route_with`] for the variant with an admission
    /// check.
    pub fn route(&mut self, flows: &mut [FlowDescriptor]) -> CapacityResult<()> {
        self.route_with(flows, |_| true)
    }

    /// Route `flows` in input order. Residual capacities are updated whenever
    /// a flow is admitted, and the descriptor is filled with the chosen path
    /// and gross rate.
    ///
    /// `check` sees each candidate descriptor with its tentative outputs and
    /// may veto it; a vetoed flow is rejected without touching the network.
    ///
    /// The whole batch is validated up front: an ill-formed descriptor fails
    /// with [`CapacityError::InvalidFlow`] before any state change. After
    /// validation, rejections (unreachable destination, insufficient
    /// capacity, veto) are recorded per descriptor and never abort the batch.
    pub fn route_with<F>(&mut self, flows: &mut [FlowDescriptor], mut check: F) -> CapacityResult<()>
    where
        F: FnMut(&FlowDescriptor) -> bool,
    {
        for flow in flows.iter() {
            self.validate_flow(flow)?;
        }
        for flow in flows.iter_mut() {
            flow.reset_outputs();
            self.admit_flow(flow, &mut check);
        }
        Ok(())
    }

    fn validate_flow(&self, flow: &FlowDescriptor) -> CapacityResult<()> {
        if flow.src == flow.dst {
            return Err(CapacityError::InvalidFlow(format!(
                "source and destination coincide on node {}",
                flow.src
            )));
        }
        for node in [flow.src, flow.dst] {
            if !self.contains_node(node) {
                return Err(CapacityError::InvalidFlow(format!("unknown node {node}")));
            }
        }
        if !(flow.net_rate > 0.0) || !flow.net_rate.is_finite() {
            return Err(CapacityError::InvalidFlow(format!(
                "net rate must be positive and finite, got {}",
                flow.net_rate
            )));
        }
        Ok(())
    }

    /// Search loop for one flow: find a hop-minimal path in the working copy,
    /// admit it if every edge holds the gross rate, otherwise prune the
    /// path's bottleneck edge and retry. Each retry removes one edge, so the
    /// loop runs at most `num_edges` times.
    fn admit_flow<F>(&mut self, flow: &mut FlowDescriptor, check: &mut F)
    where
        F: FnMut(&FlowDescriptor) -> bool,
    {
        let mu = self.measurement_probability();
        let mut mask = EdgeMask::all_present(self);
        loop {
            flow.dijkstra_count += 1;
            let Some(nodes) = shortest_path(self, &mask, flow.src, flow.dst) else {
                debug!("flow rejected src={} dst={} reason=unreachable", flow.src, flow.dst);
                return;
            };

            let hops = nodes.len() - 1;
            let swap_success = mu.powi(hops as i32 - 1);
            if swap_success <= 0.0 {
                // mu = 0 and at least one intermediate swap: no reservation can
                // deliver a positive end-to-end rate, and pruning cannot
                // shorten a hop-minimal path.
                debug!(
                    "flow rejected src={} dst={} reason=zero-swap-success hops={hops}",
                    flow.src, flow.dst
                );
                return;
            }
            let gross = flow.net_rate / swap_success;

            let edge_ids = path_edge_ids(self, Some(&mask), &nodes);
            let feasible = edge_ids
                .iter()
                .all(|&id| self.edge(id).capacity + CAPACITY_EPSILON >= gross);

            if feasible {
                flow.path = nodes[1..].to_vec();
                flow.gross_rate = gross;
                if !check(flow) {
                    debug!("flow rejected src={} dst={} reason=veto", flow.src, flow.dst);
                    flow.path.clear();
                    flow.gross_rate = 0.0;
                    return;
                }
                for &id in &edge_ids {
                    self.subtract(id, gross);
                }
                debug!(
                    "flow admitted src={} dst={} hops={hops} gross={gross}",
                    flow.src, flow.dst
                );
                return;
            }

            // First occurrence wins among equal minima.
            let mut smallest = edge_ids[0];
            for &id in &edge_ids[1..] {
                if self.edge(id).capacity < self.edge(smallest).capacity {
                    smallest = id;
                }
            }
            mask.remove(smallest);
        }
    }
}
