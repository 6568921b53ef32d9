//! End-to-end walkthrough: build a seeded random grid, route a flow batch,
//! then let two prioritized apps split the leftovers.
//!
//! Run with:
//!   cargo run -p eprnet-capacity --example grid_admission

use eprnet_capacity::{
    AllocationConfig, AppDescriptor, AppPolicy, CapacityNetwork, FlowDescriptor,
};
use eprnet_entropy::UniformRateSource;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn main() {
    println!("=== eprnet-capacity grid admission ===\n");

    // 3x3 grid, bidirectional links, capacities drawn from [5, 15) EPR/s.
    //
    //   0 - 1 - 2
    //   |   |   |
    //   3 - 4 - 5
    //   |   |   |
    //   6 - 7 - 8
    let pairs = [
        (0, 1), (1, 2), (3, 4), (4, 5), (6, 7), (7, 8),
        (0, 3), (3, 6), (1, 4), (4, 7), (2, 5), (5, 8),
    ];
    let mut source = UniformRateSource::with_seed(5.0, 15.0, 2022).expect("rate source");
    let mut network = CapacityNetwork::from_edges(&pairs, &mut source, true).expect("network");
    network.set_measurement_probability(0.9).expect("mu");

    println!("1. Topology");
    println!("   nodes: {}", network.num_nodes());
    println!("   edges: {}", network.num_edges());
    println!("   total capacity: {:.2} EPR/s", network.total_capacity());
    println!("   out-degree range: {:?}", network.out_degree_range());

    println!("\n2. Routing a flow batch (corner to corner)...");
    let mut flows = vec![
        FlowDescriptor::new(0, 8, 2.0),
        FlowDescriptor::new(6, 2, 1.5),
        FlowDescriptor::new(0, 8, 3.0),
    ];
    network.route(&mut flows).expect("route");
    for flow in &flows {
        println!("   {flow}");
    }

    println!("\n3. Elastic apps with 2:1 priorities, load balancing...");
    let mut apps = vec![
        AppDescriptor::new(4, vec![0, 8], 2.0),
        AppDescriptor::new(4, vec![2, 6], 1.0),
    ];
    let config = AllocationConfig::default()
        .with_policy(AppPolicy::LoadBalancing)
        .with_max_rounds(40);
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    network.allocate(&mut apps, &config, &mut rng).expect("allocate");
    for app in &apps {
        println!("   {app}");
        for alloc in &app.paths {
            println!(
                "     net {:.3} gross {:.3} via {:?}",
                alloc.net_rate, alloc.gross_rate, alloc.hops
            );
        }
    }

    println!("\n4. Residual graph");
    println!("   total capacity left: {:.2} EPR/s", network.total_capacity());
    let dot_path = std::env::temp_dir().join("grid_admission.dot");
    network.to_dot(&dot_path).expect("dot export");
    println!("   dot written to {}", dot_path.display());
}
