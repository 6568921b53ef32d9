//! Capacity-aware routing core for quantum entanglement networks.
//!
//! The crate models a directed graph whose edge weights are
//! entanglement-generation capacities (EPR pairs per second) and admits two
//! classes of end-to-end demands against the residual capacities:
//!
//! - **flows**: constant-rate point-to-point demands, admitted one by one on
//!   a single hop-minimal path ([`FlowDescriptor`], [`CapacityNetwork::route`]);
//! - **apps**: elastic multi-peer demands with priorities, served over
//!   multiple cached paths through deficit-counter rounds
//!   ([`AppDescriptor`], [`CapacityNetwork::allocate`]).
//!
//! Every intermediate node of a path must perform an entanglement-swap
//! measurement that succeeds with probability `mu`, so delivering a net rate
//! over `h` hops reserves `net / mu^(h-1)` on every edge.
//!
//! # Quickstart
//! ```
//! use eprnet_capacity::{CapacityNetwork, FlowDescriptor};
//!
//! let mut network = CapacityNetwork::from_weights(&[(0, 1, 10.0), (1, 2, 10.0)])
//!     .expect("network");
//! network.set_measurement_probability(0.5).expect("mu");
//!
//! let mut flows = vec![FlowDescriptor::new(0, 2, 2.0)];
//! network.route(&mut flows).expect("route");
//!
//! assert_eq!(flows[0].path, vec![1, 2]);
//! assert_eq!(flows[0].gross_rate, 4.0);
//! ```
//!
//! Admission is single-threaded and runs to completion; topology is fixed at
//! construction and residual capacities only ever decrease.

/// Elastic multi-peer demands and the deficit-round allocator.
pub mod app;

/// Constant-rate point-to-point demands and the admission loop.
pub mod flow;

/// The shared capacity graph: construction and introspection.
pub mod network;

/// Edge-QKD algorithm labels used at the experiment boundary.
pub mod policy;

/// Error taxonomy and shared constants.
pub mod types;

mod dot;
mod paths;

pub use app::{AllocationConfig, AppAllocation, AppDescriptor, AppPolicy};
pub use flow::FlowDescriptor;
pub use network::CapacityNetwork;
pub use policy::QkdAlgo;
pub use types::{CapacityError, CapacityResult, CAPACITY_EPSILON};
