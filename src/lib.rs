//! Map-matching routing core.
//!
//! The kernel of a hidden-Markov-model map matcher: for each transition
//! between two GPS observations it computes road-network distances from one
//! candidate location to every candidate of the following observation, so
//! that transition probabilities can be evaluated. The search is a labeled
//! Dijkstra with an A* heuristic that treats the next observation's
//! candidates as a cluster inside a search disc.
//!
//! The pieces, bottom up:
//!
//! - [`graph`]: the tiled, hierarchical road graph ([`GraphId`],
//!   [`GraphTile`], [`GraphReader`]) and the candidate types
//!   ([`CandidateEdge`], [`PathLocation`]).
//! - [`builder`]: programmatic construction of networks for tests and
//!   embedders.
//! - [`costing`]: the pluggable traversability filter ([`Costing`]) and the
//!   shared arrival-edge descriptor ([`EdgeLabel`]).
//! - [`bucket_queue`] and [`label_set`]: the bucketed priority queue with
//!   decrease-key and the label store that drives it.
//! - [`shortest_path`]: origin/destination seeding and the expansion loop,
//!   [`find_shortest_path`].
//! - [`cost_matrix`]: the bidirectional many-to-many driver, [`CostMatrix`].

pub mod bucket_queue;
pub mod builder;
pub mod cost_matrix;
pub mod costing;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod label_set;
pub mod shortest_path;

pub use bucket_queue::BucketQueue;
pub use builder::GraphBuilder;
pub use cost_matrix::{CostMatrix, HierarchyLimits, TimeDistance, DEFAULT_COST_THRESHOLD};
pub use costing::{access, AccessCosting, Costing, EdgeLabel, TravelMode};
pub use error::{Result, RoutingError};
pub use geometry::{cluster_heuristic, turn_degree180, DistanceApproximator};
pub use graph::{
    CandidateEdge, DirectedEdge, EdgeUse, GraphId, GraphReader, GraphTile, NodeInfo, PathLocation,
};
pub use label_set::{Label, LabelKey, LabelSet, INVALID_DESTINATION, INVALID_LABEL};
pub use shortest_path::{
    find_shortest_path, set_destinations, set_origin, TurnCostTable,
};
