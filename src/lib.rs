//! Quasar is the computational core of a distributed graph-analytics engine.
//!
//! Each worker process owns one partition of a larger graph, held in a
//! [`fragment::Fragment`]: compressed adjacency (CSR) for locally owned
//! vertices, ghost slots for vertices mirrored from other partitions, and an
//! online mutation protocol that keeps the structure consistent between
//! computation rounds. On top of the storage layer, the [`engine`] module
//! provides the vertex-centric superstep abstractions (`VertexSubset`,
//! `vertex_map`, `edge_map`) and the bulk-synchronous worker loop that
//! exchanges boundary updates with the other partitions each round.

pub mod config;
pub mod engine;
pub mod fragment;
pub mod partition;
pub mod types;
pub mod util;
