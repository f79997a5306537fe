//! The vertex-centric superstep engine.
//!
//! A computation round is driven by an active-vertex set
//! ([`vertex_subset::VertexSubset`]) and the two operators over it:
//! [`map_ops::vertex_map`] applies a filter/update pair to the active
//! vertices, [`map_ops::edge_map`] pushes updates along their edges,
//! forwarding updates that land on mirrored vertices to the owning
//! fragment through a [`messages::MessageChannel`]. The
//! [`superstep::Worker`] loop strings rounds together and detects global
//! quiescence.

pub mod map_ops;
pub mod messages;
pub mod superstep;
pub mod vertex_subset;
