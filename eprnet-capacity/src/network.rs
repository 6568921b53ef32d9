use serde::{Deserialize, Serialize};
use tracing::info;

use eprnet_entropy::RateSource;

use crate::types::{CapacityError, CapacityResult, CAPACITY_EPSILON};

pub(crate) type EdgeId = usize;

/// One slot of the edge arena. Edges are directional; the capacity is the
/// residual entanglement-generation rate in EPR pairs per second.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct EdgeSlot {
    pub from: usize,
    pub to: usize,
    pub capacity: f64,
}

/// A quantum network whose edges are characterized by their capacity only,
/// in EPR pairs generated per second.
///
/// Links are directional; a logical bidirectional link is two arena slots
/// sharing one initial weight. Two kinds of demands are admitted against the
/// residual capacities:
///
/// - *flows*: constant-rate point-to-point demands (metrology, sensing, QKD),
///   see [`crate::flow::FlowDescriptor`];
/// - *apps*: elastic multi-peer demands with priorities (distributed quantum
///   computing), see [`crate::app::AppDescriptor`].
///
/// Topology is fixed after construction; admission only ever lowers residual
/// capacities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapacityNetwork {
    out: Vec<Vec<EdgeId>>,
    edges: Vec<EdgeSlot>,
    measurement_probability: f64,
}

fn node_span<I: IntoIterator<Item = usize>>(ids: I) -> usize {
    ids.into_iter().map(|id| id + 1).max().unwrap_or(0)
}

impl CapacityNetwork {
    fn with_nodes(nodes: usize) -> Self {
        Self {
            out: vec![Vec::new(); nodes],
            edges: Vec::new(),
            measurement_probability: 1.0,
        }
    }

    fn check_rate(rate: f64) -> CapacityResult<()> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(CapacityError::InvalidArgument(format!(
                "edge capacity must be finite and nonnegative, got {rate}"
            )));
        }
        Ok(())
    }

    fn push_edge(&mut self, from: usize, to: usize, capacity: f64) {
        let id = self.edges.len();
        self.edges.push(EdgeSlot { from, to, capacity });
        self.out[from].push(id);
    }

    /// Build a network from `(src, dst)` pairs, drawing one weight per pair
    /// from `source`. With `bidirectional`, the reverse edge is added with the
    /// *same* draw, so a logical link still consumes a single draw.
    ///
    /// Node identifiers need not be contiguous; unseen identifiers up to the
    /// maximum are isolated nodes. The default measurement probability is 1.
    pub fn from_edges(
        pairs: &[(usize, usize)],
        source: &mut dyn RateSource,
        bidirectional: bool,
    ) -> CapacityResult<Self> {
        let span = node_span(pairs.iter().flat_map(|&(u, v)| [u, v]));
        let mut network = Self::with_nodes(span);
        for &(u, v) in pairs {
            let rate = source.draw();
            Self::check_rate(rate)?;
            network.push_edge(u, v, rate);
            if bidirectional {
                network.push_edge(v, u, rate);
            }
        }
        info!(
            "capacity network built nodes={} edges={} total={:.3}",
            network.num_nodes(),
            network.num_edges(),
            network.total_capacity()
        );
        Ok(network)
    }

    /// Build a network from explicit `(src, dst, weight)` triples, one
    /// directed edge each. Negative weights are rejected.
    pub fn from_weights(triples: &[(usize, usize, f64)]) -> CapacityResult<Self> {
        let span = node_span(triples.iter().flat_map(|&(u, v, _)| [u, v]));
        let mut network = Self::with_nodes(span);
        for &(u, v, w) in triples {
            Self::check_rate(w)?;
            network.push_edge(u, v, w);
        }
        Ok(network)
    }

    /// Set the per-swap measurement success probability.
    ///
    /// Along a path of `h` hops the end-to-end delivered rate scales as
    /// `mu^(h-1)`, one factor per intermediate swap.
    pub fn set_measurement_probability(&mut self, mu: f64) -> CapacityResult<()> {
        if !(0.0..=1.0).contains(&mu) {
            return Err(CapacityError::InvalidArgument(format!(
                "measurement probability must lie in [0, 1], got {mu}"
            )));
        }
        self.measurement_probability = mu;
        Ok(())
    }

    pub fn measurement_probability(&self) -> f64 {
        self.measurement_probability
    }

    pub fn num_nodes(&self) -> usize {
        self.out.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Sum of all residual edge capacities.
    pub fn total_capacity(&self) -> f64 {
        self.edges.iter().map(|edge| edge.capacity).sum()
    }

    /// `(min, max)` in-degree over all nodes; `(0, 0)` for an empty network.
    pub fn in_degree_range(&self) -> (usize, usize) {
        let mut degrees = vec![0usize; self.out.len()];
        for edge in &self.edges {
            degrees[edge.to] += 1;
        }
        min_max(&degrees)
    }

    /// `(min, max)` out-degree over all nodes; `(0, 0)` for an empty network.
    pub fn out_degree_range(&self) -> (usize, usize) {
        let degrees: Vec<usize> = self.out.iter().map(Vec::len).collect();
        min_max(&degrees)
    }

    /// Current `(src, dst, weight)` triples in arena order. Feeding the result
    /// back into [`CapacityNetwork::from_weights`] reproduces the same
    /// `weights()` output.
    pub fn weights(&self) -> Vec<(usize, usize, f64)> {
        self.edges
            .iter()
            .map(|edge| (edge.from, edge.to, edge.capacity))
            .collect()
    }

    pub(crate) fn contains_node(&self, node: usize) -> bool {
        node < self.out.len()
    }

    pub(crate) fn edge(&self, id: EdgeId) -> &EdgeSlot {
        &self.edges[id]
    }

    pub(crate) fn out_ids(&self, node: usize) -> &[EdgeId] {
        &self.out[node]
    }

    /// Reserve `amount` on an edge, clamping residuals that fall within
    /// [`CAPACITY_EPSILON`] of zero so floating error never leaves a negative
    /// capacity behind.
    pub(crate) fn subtract(&mut self, id: EdgeId, amount: f64) {
        let capacity = &mut self.edges[id].capacity;
        *capacity -= amount;
        if *capacity < CAPACITY_EPSILON {
            *capacity = 0.0;
        }
    }
}

fn min_max(degrees: &[usize]) -> (usize, usize) {
    match (degrees.iter().min(), degrees.iter().max()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => (0, 0),
    }
}
