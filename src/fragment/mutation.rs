use serde::{Deserialize, Serialize};

use crate::types::{Edge, VertexPayload};

/// A collected set of vertex and edge edits, expressed in global ids,
/// applied atomically to one fragment between supersteps.
///
/// A batch is translated to local ids and consumed by
/// [`crate::fragment::Fragment::mutate`]; it keeps no undo log and is
/// discarded after application. Entries referencing ids the fragment cannot
/// resolve are skipped, not errors. Cross-partition consistency of edits
/// (issuing the same edge add on both owning fragments) is the caller's
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation<V, E> {
    pub vertices_to_add: Vec<VertexPayload<V>>,
    pub vertices_to_update: Vec<VertexPayload<V>>,
    pub vertices_to_remove: Vec<u64>,
    pub edges_to_add: Vec<Edge<E>>,
    pub edges_to_update: Vec<Edge<E>>,
    pub edges_to_remove: Vec<(u64, u64)>,
}

impl<V, E> Default for Mutation<V, E> {
    fn default() -> Self {
        Self {
            vertices_to_add: Vec::new(),
            vertices_to_update: Vec::new(),
            vertices_to_remove: Vec::new(),
            edges_to_add: Vec::new(),
            edges_to_update: Vec::new(),
            edges_to_remove: Vec::new(),
        }
    }
}

impl<V, E> Mutation<V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices_to_add.is_empty()
            && self.vertices_to_update.is_empty()
            && self.vertices_to_remove.is_empty()
            && self.edges_to_add.is_empty()
            && self.edges_to_update.is_empty()
            && self.edges_to_remove.is_empty()
    }

    pub fn add_vertex(&mut self, gid: u64, data: V) -> &mut Self {
        self.vertices_to_add.push(VertexPayload::new(gid, data));
        self
    }

    pub fn update_vertex(&mut self, gid: u64, data: V) -> &mut Self {
        self.vertices_to_update.push(VertexPayload::new(gid, data));
        self
    }

    pub fn remove_vertex(&mut self, gid: u64) -> &mut Self {
        self.vertices_to_remove.push(gid);
        self
    }

    pub fn add_edge(&mut self, src: u64, dst: u64, data: E) -> &mut Self {
        self.edges_to_add.push(Edge::new(src, dst, data));
        self
    }

    pub fn update_edge(&mut self, src: u64, dst: u64, data: E) -> &mut Self {
        self.edges_to_update.push(Edge::new(src, dst, data));
        self
    }

    pub fn remove_edge(&mut self, src: u64, dst: u64) -> &mut Self {
        self.edges_to_remove.push((src, dst));
        self
    }
}

/// Counts reported back from one [`crate::fragment::Fragment::mutate`]
/// call. `skipped` covers entries dropped because an endpoint could not be
/// translated to any local id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub vertices_added: usize,
    pub vertices_updated: usize,
    pub vertices_removed: usize,
    pub edges_added: usize,
    pub edges_updated: usize,
    pub edges_removed: usize,
    pub skipped: usize,
}
