use eprnet_capacity::{
    AllocationConfig, AppDescriptor, AppPolicy, CapacityError, CapacityNetwork,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn rng() -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(0xEE_4A)
}

fn residual(network: &CapacityNetwork, from: usize, to: usize) -> f64 {
    network
        .weights()
        .into_iter()
        .find(|&(u, v, _)| u == from && v == to)
        .map(|(_, _, w)| w)
        .expect("edge present")
}

/// Two disjoint equal-length branches host -> peer.
fn twin_branch(capacity: f64) -> CapacityNetwork {
    CapacityNetwork::from_weights(&[
        (0, 1, capacity),
        (1, 3, capacity),
        (0, 2, capacity),
        (2, 3, capacity),
    ])
    .expect("network")
}

#[test]
fn load_balancing_splits_equal_apps_across_twin_branches() {
    let mut network = twin_branch(10.0);
    let mut apps = vec![
        AppDescriptor::new(0, vec![3], 1.0),
        AppDescriptor::new(0, vec![3], 1.0),
    ];
    let config = AllocationConfig::default()
        .with_policy(AppPolicy::LoadBalancing)
        .with_max_rounds(10);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    // Equal priorities admit equal gross totals.
    assert!((apps[0].total_gross_rate() - 5.0).abs() < 1e-9);
    assert!((apps[1].total_gross_rate() - 5.0).abs() < 1e-9);
    // The two branches stay balanced within one per-round grant.
    let split = (residual(&network, 0, 1) - residual(&network, 0, 2)).abs();
    assert!(split <= 0.5 + 1e-9, "branch imbalance {split}");
}

#[test]
fn shares_follow_priorities() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 8.0)]).expect("network");
    let mut apps = vec![
        AppDescriptor::new(0, vec![1], 3.0),
        AppDescriptor::new(0, vec![1], 1.0),
    ];
    let config = AllocationConfig::default().with_max_rounds(8);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    assert!((apps[0].total_gross_rate() - 6.0).abs() < 1e-9);
    assert!((apps[1].total_gross_rate() - 2.0).abs() < 1e-9);
    assert!(residual(&network, 0, 1).abs() < 1e-9);
}

#[test]
fn shortest_path_policy_prefers_the_direct_hop() {
    let mut network =
        CapacityNetwork::from_weights(&[(0, 2, 1.0), (0, 1, 10.0), (1, 2, 10.0)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![2], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(4);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    // Round one drains the one-hop path, the rest spills onto the detour.
    assert_eq!(apps[0].paths.len(), 2);
    assert_eq!(apps[0].paths[0].hops, vec![2]);
    assert!((apps[0].paths[0].gross_rate - 1.0).abs() < 1e-9);
    assert_eq!(apps[0].paths[1].hops, vec![1, 2]);
    assert!((apps[0].paths[1].gross_rate - 3.0).abs() < 1e-9);
}

#[test]
fn shortest_path_ties_break_lexicographically() {
    let mut network = twin_branch(10.0);
    let mut apps = vec![AppDescriptor::new(0, vec![3], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(5);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    // Both branches are 2 hops; [1, 3] precedes [2, 3].
    assert_eq!(apps[0].paths.len(), 1);
    assert_eq!(apps[0].paths[0].hops, vec![1, 3]);
    assert!((residual(&network, 0, 1) - 5.0).abs() < 1e-9);
    assert_eq!(residual(&network, 0, 2), 10.0);
}

#[test]
fn load_balancing_picks_the_widest_bottleneck_first() {
    let mut network = CapacityNetwork::from_weights(&[
        (0, 1, 5.0),
        (1, 3, 5.0),
        (0, 2, 10.0),
        (2, 3, 10.0),
    ])
    .expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![3], 1.0)];
    let config = AllocationConfig::default()
        .with_policy(AppPolicy::LoadBalancing)
        .with_max_rounds(1);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    assert_eq!(apps[0].paths.len(), 1);
    assert_eq!(apps[0].paths[0].hops, vec![2, 3]);
    assert_eq!(residual(&network, 0, 1), 5.0);
}

#[test]
fn random_policy_is_reproducible_under_a_seed() {
    let allocate = |seed: u64| {
        let mut network = twin_branch(10.0);
        let mut apps = vec![AppDescriptor::new(0, vec![3], 1.0)];
        let config = AllocationConfig::default()
            .with_policy(AppPolicy::Random)
            .with_max_rounds(6);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        network.allocate(&mut apps, &config, &mut rng).expect("allocate");
        apps.remove(0)
    };
    let first = allocate(5);
    let second = allocate(5);
    assert_eq!(first.paths, second.paths);
    assert!((first.total_gross_rate() - 6.0).abs() < 1e-9);
}

#[test]
fn allocations_drain_to_capacity_and_keep_the_deficit() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 2.5)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![1], 2.0)];
    network
        .allocate(&mut apps, &AllocationConfig::default(), &mut rng())
        .expect("allocate");

    assert!((apps[0].total_gross_rate() - 2.5).abs() < 1e-9);
    // The terminal round still accrued one share before coming up empty.
    assert!((apps[0].delta - 1.5).abs() < 1e-9);
    assert!(residual(&network, 0, 1).abs() < 1e-12);
    // Repeated grants onto the same hop sequence are merged, not appended.
    assert_eq!(apps[0].paths.len(), 1);
}

#[test]
fn swap_loss_discounts_the_delivered_rate() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 4.0), (1, 2, 4.0)]).expect("network");
    network.set_measurement_probability(0.5).expect("mu");
    let mut apps = vec![AppDescriptor::new(0, vec![2], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(4);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    assert!((apps[0].total_gross_rate() - 4.0).abs() < 1e-9);
    assert!((apps[0].total_net_rate() - 2.0).abs() < 1e-9);
}

#[test]
fn multi_peer_apps_count_one_yen_run_per_peer() {
    let mut network = CapacityNetwork::from_weights(&[
        (0, 1, 10.0),
        (0, 2, 10.0),
        (0, 3, 10.0),
    ])
    .expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![1, 2, 3], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(2);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");
    assert_eq!(apps[0].yen_count, 3);
    assert!(apps[0].is_admitted());
}

#[test]
fn unreachable_peers_are_tolerated() {
    // Node 4 exists but has no incident edges.
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0), (2, 4, 0.0)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![4], 1.0)];
    network
        .allocate(&mut apps, &AllocationConfig::default(), &mut rng())
        .expect("allocate");

    assert!(!apps[0].is_admitted());
    // Setup plus the single permanent refresh attempt.
    assert_eq!(apps[0].yen_count, 2);
    assert!((apps[0].delta - 1.0).abs() < 1e-9);
    assert_eq!(residual(&network, 0, 1), 10.0);
}

#[test]
fn out_of_range_peers_yield_no_candidates() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![42], 1.0)];
    network
        .allocate(&mut apps, &AllocationConfig::default(), &mut rng())
        .expect("allocate");
    assert!(!apps[0].is_admitted());
    assert_eq!(apps[0].yen_count, 0);
}

#[test]
fn ill_formed_batches_fail_before_any_state_change() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0)]).expect("network");
    let config = AllocationConfig::default();

    let mut no_peers = vec![AppDescriptor::new(0, vec![1], 1.0), AppDescriptor::new(0, vec![], 1.0)];
    assert!(matches!(
        network.allocate(&mut no_peers, &config, &mut rng()),
        Err(CapacityError::InvalidApp(_))
    ));
    assert!(!no_peers[0].is_admitted());
    assert_eq!(residual(&network, 0, 1), 10.0);

    let mut bad_priority = vec![AppDescriptor::new(0, vec![1], 0.0)];
    assert!(matches!(
        network.allocate(&mut bad_priority, &config, &mut rng()),
        Err(CapacityError::InvalidApp(_))
    ));

    let mut bad_host = vec![AppDescriptor::new(9, vec![1], 1.0)];
    assert!(matches!(
        network.allocate(&mut bad_host, &config, &mut rng()),
        Err(CapacityError::InvalidApp(_))
    ));

    assert!(matches!(
        network.allocate(&mut [], &config.clone().with_k(0), &mut rng()),
        Err(CapacityError::InvalidArgument(_))
    ));
}

#[test]
fn allocating_an_empty_batch_is_a_no_op() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0)]).expect("network");
    let before = network.weights();
    network
        .allocate(&mut [], &AllocationConfig::default(), &mut rng())
        .expect("allocate");
    assert_eq!(network.weights(), before);
}

#[test]
fn the_round_cap_bounds_total_admission() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 1000.0)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![1], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(3);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");
    assert!((apps[0].total_gross_rate() - 3.0).abs() < 1e-9);
    assert!((residual(&network, 0, 1) - 997.0).abs() < 1e-9);
}

#[test]
fn capacity_is_conserved_across_app_allocation() {
    let mut network = twin_branch(6.0);
    let before = network.total_capacity();
    let mut apps = vec![
        AppDescriptor::new(0, vec![3], 2.0),
        AppDescriptor::new(0, vec![3], 1.0),
    ];
    let config = AllocationConfig::default()
        .with_policy(AppPolicy::LoadBalancing)
        .with_max_rounds(9);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    let reserved: f64 = apps
        .iter()
        .flat_map(|app| app.paths.iter())
        .map(|alloc| alloc.gross_rate * alloc.hops.len() as f64)
        .sum();
    assert!((before - network.total_capacity() - reserved).abs() < 1e-9);
    for (_, _, weight) in network.weights() {
        assert!(weight >= 0.0);
    }
}

#[test]
fn descriptors_serialize_for_experiment_logs() {
    let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0)]).expect("network");
    let mut apps = vec![AppDescriptor::new(0, vec![1], 1.0)];
    let config = AllocationConfig::default().with_max_rounds(2);
    network.allocate(&mut apps, &config, &mut rng()).expect("allocate");

    let json = serde_json::to_string(&apps[0]).expect("serialize");
    let back: AppDescriptor = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.paths, apps[0].paths);
    assert_eq!(back.yen_count, apps[0].yen_count);
}
