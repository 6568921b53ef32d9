use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::network::CapacityNetwork;
use crate::paths::{k_shortest_paths, path_bottleneck, path_edge_ids, EdgeMask};
use crate::types::{CapacityError, CapacityResult};

/// One admitted slice of an app's elastic demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppAllocation {
    /// Delivered end-to-end rate, `gross_rate * mu^(h-1)`, in EPR/s.
    pub net_rate: f64,
    /// Capacity reserved on every edge of `hops`, in EPR/s.
    pub gross_rate: f64,
    /// Hop sequence excluding the host, terminating at one of the peers.
    pub hops: Vec<usize>,
}

/// Elastic multi-peer demand hosted at one node.
///
/// The input half (`host`, `peers`, `priority`) is set by the caller; the
/// output half is written by [`CapacityNetwork::allocate`]. A rejected app
/// keeps an empty `paths` list. `delta` is the deficit counter: the share of
/// gross EPR/s granted across rounds but not yet spent, retained after the
/// allocator returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppDescriptor {
    // input
    pub host: usize,
    /// Candidate entanglement peers; unreachable peers are simply never used.
    pub peers: Vec<usize>,
    /// Relative weight of this app's per-round share. Must be positive.
    pub priority: f64,

    // output
    pub paths: Vec<AppAllocation>,
    /// k-shortest-path computations spent on this app.
    pub yen_count: usize,

    // working
    pub delta: f64,
}

impl AppDescriptor {
    pub fn new(host: usize, peers: Vec<usize>, priority: f64) -> Self {
        Self {
            host,
            peers,
            priority,
            paths: Vec::new(),
            yen_count: 0,
            delta: 0.0,
        }
    }

    pub fn is_admitted(&self) -> bool {
        !self.paths.is_empty()
    }

    /// Aggregate delivered rate over all allocated paths.
    pub fn total_net_rate(&self) -> f64 {
        self.paths.iter().map(|alloc| alloc.net_rate).sum()
    }

    /// Aggregate reserved rate over all allocated paths.
    pub fn total_gross_rate(&self) -> f64 {
        self.paths.iter().map(|alloc| alloc.gross_rate).sum()
    }

    fn reset_outputs(&mut self) {
        self.paths.clear();
        self.yen_count = 0;
        self.delta = 0.0;
    }
}

impl fmt::Display for AppDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "app host {} peers {:?} priority {}: {} paths, net {} EPR/s, deficit {}",
            self.host,
            self.peers,
            self.priority,
            self.paths.len(),
            self.total_net_rate(),
            self.delta
        )
    }
}

/// Path selection discipline used by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppPolicy {
    /// Uniform choice among feasible candidate paths.
    Random,
    /// Fewest hops; ties break lexicographically on the hop sequence.
    ShortestPath,
    /// Feasible path whose bottleneck edge has the highest residual.
    LoadBalancing,
}

impl AppPolicy {
    pub const fn all() -> [AppPolicy; 3] {
        [
            AppPolicy::Random,
            AppPolicy::ShortestPath,
            AppPolicy::LoadBalancing,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            AppPolicy::Random => "random",
            AppPolicy::ShortestPath => "shortestpath",
            AppPolicy::LoadBalancing => "loadbalancing",
        }
    }
}

impl fmt::Display for AppPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AppPolicy {
    type Err = CapacityError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        AppPolicy::all()
            .into_iter()
            .find(|policy| policy.label() == label)
            .ok_or_else(|| {
                let legal: Vec<&str> = AppPolicy::all().iter().map(|p| p.label()).collect();
                CapacityError::InvalidArgument(format!(
                    "invalid allocation policy: {label} (valid options are: {})",
                    legal.join(",")
                ))
            })
    }
}

/// Tuning knobs for [`CapacityNetwork::allocate`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Maximum loopless shortest paths cached per (host, peer) pair.
    pub k: usize,
    pub policy: AppPolicy,
    /// Iteration cap: the allocator stops after this many rounds even if
    /// capacity remains.
    pub max_rounds: usize,
    /// Admission quantum: an edge is feasible while its residual stays at or
    /// above this, and deficits below it are left unspent.
    pub quantum: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            k: 4,
            policy: AppPolicy::ShortestPath,
            max_rounds: 10_000,
            quantum: 1e-9,
        }
    }
}

impl AllocationConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_policy(mut self, policy: AppPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_quantum(mut self, quantum: f64) -> Self {
        self.quantum = quantum;
        self
    }

    fn validate(&self) -> CapacityResult<()> {
        if self.k == 0 {
            return Err(CapacityError::InvalidArgument(
                "k must be at least 1".into(),
            ));
        }
        if !(self.quantum > 0.0) || !self.quantum.is_finite() {
            return Err(CapacityError::InvalidArgument(format!(
                "quantum must be positive and finite, got {}",
                self.quantum
            )));
        }
        Ok(())
    }
}

/// Per-app cache of candidate host-to-peer paths (full node sequences).
struct PathCache {
    peers: Vec<usize>,
    candidates: Vec<Vec<usize>>,
    exhausted: bool,
}

impl CapacityNetwork {
    /// Distribute residual capacity among `apps` with deficit-round fairness.
    ///
    /// Per round, each app (in input order) accrues `priority / sum(priority)`
    /// gross EPR/s onto its deficit counter and spends as much of it as the
    /// policy-chosen feasible path allows. Allocation stops on the first round
    /// with zero aggregate admission, or at `config.max_rounds`.
    ///
    /// The batch is validated up front: an ill-formed descriptor fails with
    /// [`CapacityError::InvalidApp`] before any state change. A peer with no
    /// usable path is not an error; it simply contributes no candidates.
    pub fn allocate<R: Rng>(
        &mut self,
        apps: &mut [AppDescriptor],
        config: &AllocationConfig,
        rng: &mut R,
    ) -> CapacityResult<()> {
        config.validate()?;
        for app in apps.iter() {
            self.validate_app(app)?;
        }
        if apps.is_empty() {
            return Ok(());
        }
        for app in apps.iter_mut() {
            app.reset_outputs();
        }

        let total_priority: f64 = apps.iter().map(|app| app.priority).sum();
        let shares: Vec<f64> = apps
            .iter()
            .map(|app| app.priority / total_priority)
            .collect();

        let mut caches: Vec<PathCache> = Vec::with_capacity(apps.len());
        for app in apps.iter_mut() {
            caches.push(self.build_cache(app, config));
        }

        let mu = self.measurement_probability();
        let mut rounds = 0usize;
        while rounds < config.max_rounds {
            rounds += 1;
            let mut admitted = 0.0;
            for index in 0..apps.len() {
                let app = &mut apps[index];
                app.delta += shares[index];
                if app.delta < config.quantum {
                    continue;
                }
                admitted += self.grant(app, &mut caches[index], config, mu, rng);
            }
            if admitted <= 0.0 {
                break;
            }
        }
        debug!("allocation finished rounds={rounds} apps={}", apps.len());
        Ok(())
    }

    fn validate_app(&self, app: &AppDescriptor) -> CapacityResult<()> {
        if app.peers.is_empty() {
            return Err(CapacityError::InvalidApp(format!(
                "app at host {} lists no peers",
                app.host
            )));
        }
        if !(app.priority > 0.0) || !app.priority.is_finite() {
            return Err(CapacityError::InvalidApp(format!(
                "priority must be positive and finite, got {}",
                app.priority
            )));
        }
        if !self.contains_node(app.host) {
            return Err(CapacityError::InvalidApp(format!(
                "unknown host node {}",
                app.host
            )));
        }
        Ok(())
    }

    fn build_cache(&self, app: &mut AppDescriptor, config: &AllocationConfig) -> PathCache {
        let peers: Vec<usize> = app
            .peers
            .iter()
            .copied()
            .filter(|&peer| peer != app.host && self.contains_node(peer))
            .collect();
        let mut cache = PathCache {
            peers,
            candidates: Vec::new(),
            exhausted: false,
        };
        self.recompute_cache(app, &mut cache, config);
        cache
    }

    /// (Re)run Yen per valid peer against the quantum-masked residual graph.
    fn recompute_cache(&self, app: &mut AppDescriptor, cache: &mut PathCache, config: &AllocationConfig) {
        let mask = EdgeMask::feasible(self, config.quantum);
        cache.candidates.clear();
        for &peer in &cache.peers {
            let paths = k_shortest_paths(self, &mask, app.host, peer, config.k);
            app.yen_count += 1;
            cache.candidates.extend(paths);
        }
    }

    /// One app's turn within a round: pick a feasible cached path per policy
    /// and spend as much deficit as its bottleneck allows. Returns the gross
    /// amount admitted.
    fn grant<R: Rng>(
        &mut self,
        app: &mut AppDescriptor,
        cache: &mut PathCache,
        config: &AllocationConfig,
        mu: f64,
        rng: &mut R,
    ) -> f64 {
        let mut feasible = feasible_indices(self, cache, config.quantum);
        if feasible.is_empty() {
            if cache.exhausted {
                return 0.0;
            }
            // The k cap may have hidden paths that are now the only survivors;
            // recompute once against the current residuals. Capacities only
            // ever decrease, so a second consecutive failure is permanent.
            self.recompute_cache(app, cache, config);
            feasible = feasible_indices(self, cache, config.quantum);
            if feasible.is_empty() {
                cache.exhausted = true;
                debug!("app host={} cache exhausted", app.host);
                return 0.0;
            }
        }

        let choice = match config.policy {
            AppPolicy::Random => feasible[rng.gen_range(0..feasible.len())],
            AppPolicy::ShortestPath => shortest_candidate(&cache.candidates, &feasible),
            AppPolicy::LoadBalancing => widest_candidate(self, &cache.candidates, &feasible),
        };
        let nodes = cache.candidates[choice].clone();
        let bottleneck = path_bottleneck(self, &nodes);
        let amount = app.delta.min(bottleneck);

        for id in path_edge_ids(self, None, &nodes) {
            self.subtract(id, amount);
        }

        let hops = nodes.len() - 1;
        let net = amount * mu.powi(hops as i32 - 1);
        let hop_seq = &nodes[1..];
        match app.paths.iter_mut().find(|alloc| alloc.hops == hop_seq) {
            Some(alloc) => {
                alloc.gross_rate += amount;
                alloc.net_rate += net;
            }
            None => app.paths.push(AppAllocation {
                net_rate: net,
                gross_rate: amount,
                hops: hop_seq.to_vec(),
            }),
        }
        app.delta -= amount;
        amount
    }
}

fn feasible_indices(network: &CapacityNetwork, cache: &PathCache, quantum: f64) -> Vec<usize> {
    cache
        .candidates
        .iter()
        .enumerate()
        .filter(|(_, nodes)| path_bottleneck(network, nodes) >= quantum)
        .map(|(index, _)| index)
        .collect()
}

fn shortest_candidate(candidates: &[Vec<usize>], feasible: &[usize]) -> usize {
    let mut best = feasible[0];
    for &index in &feasible[1..] {
        let candidate = &candidates[index];
        let incumbent = &candidates[best];
        if candidate.len() < incumbent.len()
            || (candidate.len() == incumbent.len() && candidate[1..] < incumbent[1..])
        {
            best = index;
        }
    }
    best
}

fn widest_candidate(network: &CapacityNetwork, candidates: &[Vec<usize>], feasible: &[usize]) -> usize {
    let mut best = feasible[0];
    let mut best_bottleneck = path_bottleneck(network, &candidates[best]);
    for &index in &feasible[1..] {
        let bottleneck = path_bottleneck(network, &candidates[index]);
        if bottleneck > best_bottleneck {
            best = index;
            best_bottleneck = bottleneck;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_builders() {
        let config = AllocationConfig::default()
            .with_k(2)
            .with_policy(AppPolicy::LoadBalancing)
            .with_max_rounds(50)
            .with_quantum(1e-6);
        assert_eq!(config.k, 2);
        assert_eq!(config.policy, AppPolicy::LoadBalancing);
        assert_eq!(config.max_rounds, 50);
        assert_eq!(config.quantum, 1e-6);
        assert!(config.validate().is_ok());
        assert!(AllocationConfig::default().with_k(0).validate().is_err());
        assert!(AllocationConfig::default()
            .with_quantum(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn policy_labels_round_trip() {
        for policy in AppPolicy::all() {
            assert_eq!(policy.label().parse::<AppPolicy>().expect("parse"), policy);
        }
        let err = "widest".parse::<AppPolicy>().expect_err("unknown label");
        let message = err.to_string();
        assert!(message.contains("random,shortestpath,loadbalancing"), "{message}");
    }
}
