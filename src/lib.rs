//! Network TSP
//!
//! Snaps points of interest onto a road network, builds the road graph, and
//! compares three travelling-salesman solvers over the network distances.
//!
//! # Pipeline
//!
//! 1. [`snap`]: project each point onto its nearest edge and split the edge
//! 2. [`routing`]: build the graph and the all-pairs shortest-path matrix
//! 3. [`tsp`]: brute force, nearest neighbor and simulated annealing
//! 4. [`route`]: stitch the chosen order back into a network polyline
//!
//! [`store::NetworkStore`] ties these together; [`api`] serves them over HTTP.

pub mod api;
pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod route;
pub mod routing;
pub mod snap;
pub mod store;
pub mod tsp;
