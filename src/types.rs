use serde::{Deserialize, Serialize};

pub mod id_codec;
pub mod vertex_array;
pub(crate) mod graph_query;

pub use graph_query::GraphQuery;

/// Sentinel local id. Mutation entries whose endpoints cannot be translated
/// to any local slot are marked with this value and skipped by every later
/// pass; it is also the fill value of unused CSR capacity slots.
pub const INVALID_LID: u64 = u64::MAX;

/// Controls which adjacency directions a fragment materializes at load time.
///
/// Edges whose owning endpoint (source under `OnlyOut`, destination under
/// `OnlyIn`) is not local are rejected during `init`/`mutate` unless the
/// strategy keeps both directions, in which case the non-owned endpoint is
/// registered as an outer vertex instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStrategy {
    /// Materialize outgoing adjacency only.
    OnlyOut,
    /// Materialize incoming adjacency only.
    OnlyIn,
    /// Materialize both directions.
    BothOutIn,
}

/// Direction requested by an `edge_map` traversal.
///
/// Requesting a direction the fragment's [`LoadStrategy`] did not
/// materialize is a fatal configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Out,
    In,
    Both,
}

/// An edge expressed in global-id space, as it appears in load batches and
/// mutation batches before translation to local ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge<E> {
    pub src: u64,
    pub dst: u64,
    pub data: E,
}

impl<E> Edge<E> {
    pub fn new(src: u64, dst: u64, data: E) -> Self {
        Self { src, dst, data }
    }
}

/// A vertex payload in global-id space, carried by load and mutation
/// batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexPayload<V> {
    pub gid: u64,
    pub data: V,
}

impl<V> VertexPayload<V> {
    pub fn new(gid: u64, data: V) -> Self {
        Self { gid, data }
    }
}

/// One entry of a CSR neighbor range: the neighbor's local id plus the edge
/// payload stored on this half of the edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nbr<E> {
    pub nbr: u64,
    pub data: E,
}

impl<E> Nbr<E> {
    pub fn new(nbr: u64, data: E) -> Self {
        Self { nbr, data }
    }
}

impl<E: Default> Nbr<E> {
    /// The placeholder written into unused capacity slots of a mutable CSR
    /// buffer. Never visible through a neighbor range.
    pub(crate) fn invalid() -> Self {
        Self {
            nbr: INVALID_LID,
            data: E::default(),
        }
    }
}
