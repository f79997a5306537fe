use std::collections::BTreeMap;

/// Read-side queries every graph container answers, expressed in
/// application-level object ids.
///
/// # Type Parameters
/// * `T` - The id type queries are keyed by.
/// * `R` - The id type returned for neighbors and vertex listings.
pub trait GraphQuery<T, R> {
    /// Returns all live neighbors of the given vertex, or an empty vector
    /// if the vertex does not exist (or is not owned) here.
    fn read_neighbor(&self, vertex_id: &T) -> Vec<R>;

    /// Checks whether the vertex exists and is alive.
    fn has_vertex(&self, vertex_id: &T) -> bool;

    /// Checks whether a live edge from `src_id` to `dst_id` exists.
    fn has_edge(&self, src_id: &T, dst_id: &T) -> bool;

    /// Returns every live owned vertex.
    fn vertex_list(&self) -> Vec<R>;

    /// Returns the complete local view: every live owned vertex mapped to
    /// itself and its live neighbor list.
    fn all(&self) -> BTreeMap<T, (R, Vec<R>)>;
}
