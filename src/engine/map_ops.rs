use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::messages::MessageChannel;
use crate::engine::vertex_subset::VertexSubset;
use crate::fragment::Fragment;
use crate::types::vertex_array::VertexValues;
use crate::types::{EdgeDirection, Nbr};

/// Vertex-scoped capability set: a membership predicate and an update body.
///
/// Algorithms hand these to [`vertex_map`] as plain closures; the engine
/// never sees algorithm code in any other form.
pub struct VertexProgram<'a, T> {
    pub filter: Box<dyn Fn(u64, &T) -> bool + Sync + 'a>,
    pub update: Box<dyn Fn(u64, &mut T) + Sync + 'a>,
}

impl<'a, T> VertexProgram<'a, T> {
    pub fn new(
        filter: impl Fn(u64, &T) -> bool + Sync + 'a,
        update: impl Fn(u64, &mut T) + Sync + 'a,
    ) -> Self {
        Self {
            filter: Box::new(filter),
            update: Box::new(update),
        }
    }

    /// An unconditional pass: the filter admits every vertex.
    pub fn update_only(update: impl Fn(u64, &mut T) + Sync + 'a) -> Self {
        Self::new(|_, _| true, update)
    }
}

/// Edge-scoped capability set for [`edge_map`].
///
/// For an edge `(u, v)`: `filter(u_val, edge, v_val)` decides whether the
/// edge qualifies, `cond(v_lid, v_val)` gates the destination, and
/// `update(u_val, edge, v_val)` produces the candidate value for `v`.
/// When several qualifying edges converge on one destination in a round,
/// their candidates are merged pairwise with `reduce`, and the surviving
/// candidate is merged once with the destination's current value; `reduce`
/// must therefore be commutative and associative. Every closure reads the
/// pre-round value snapshot, so a round applies each qualifying edge
/// exactly once and execution strategy cannot change results.
pub struct EdgeProgram<'a, T, E> {
    pub filter: Box<dyn Fn(&T, &E, &T) -> bool + Sync + 'a>,
    pub update: Box<dyn Fn(&T, &E, &T) -> T + Sync + 'a>,
    pub cond: Box<dyn Fn(u64, &T) -> bool + Sync + 'a>,
    pub reduce: Box<dyn Fn(T, T) -> T + Sync + 'a>,
}

impl<'a, T, E> EdgeProgram<'a, T, E> {
    pub fn new(
        filter: impl Fn(&T, &E, &T) -> bool + Sync + 'a,
        update: impl Fn(&T, &E, &T) -> T + Sync + 'a,
        cond: impl Fn(u64, &T) -> bool + Sync + 'a,
        reduce: impl Fn(T, T) -> T + Sync + 'a,
    ) -> Self {
        Self {
            filter: Box::new(filter),
            update: Box::new(update),
            cond: Box::new(cond),
            reduce: Box::new(reduce),
        }
    }

    /// Every edge qualifies and every destination is eligible; only the
    /// update and reduction are supplied.
    pub fn unconditional(
        update: impl Fn(&T, &E, &T) -> T + Sync + 'a,
        reduce: impl Fn(T, T) -> T + Sync + 'a,
    ) -> Self {
        Self::new(|_, _, _| true, update, |_, _| true, reduce)
    }
}

/// Runs the closure on a dedicated pool when the config pins a thread
/// count, otherwise on the global rayon pool.
fn run_pooled<R: Send>(config: &EngineConfig, f: impl FnOnce() -> R + Send) -> R {
    if config.thread_num > 0 {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.thread_num)
            .build()
            .unwrap();
        pool.install(f)
    } else {
        f()
    }
}

/// Applies `program.update` to every vertex of `subset` that passes
/// `program.filter`.
///
/// Each vertex's update touches only its own value slot, so the pass runs
/// in parallel over the inner value array. Returns the subset of vertices
/// that passed the filter, or the empty subset when the caller does not
/// need one (`returns_subset == false`).
pub fn vertex_map<T, V, E>(
    frag: &Fragment<V, E>,
    values: &mut VertexValues<T>,
    subset: &VertexSubset,
    program: &VertexProgram<'_, T>,
    returns_subset: bool,
) -> VertexSubset
where
    T: Clone + Default + Send + Sync,
    V: Clone + Default + Send + Sync,
    E: Clone + Default + Send + Sync,
{
    let ivnum = frag.inner_vertices_num();
    let flags = subset.to_flags();
    let passed: Vec<u64> = run_pooled(frag.config(), || {
        values
            .inner_slice_mut()
            .par_iter_mut()
            .enumerate()
            .filter_map(|(lid, value)| {
                let lid = lid as u64;
                if flags.get(lid as usize).copied().unwrap_or(false)
                    && frag.is_alive_inner(lid)
                    && (program.filter)(lid, value)
                {
                    (program.update)(lid, value);
                    Some(lid)
                } else {
                    None
                }
            })
            .collect()
    });
    if returns_subset {
        VertexSubset::from_lids(passed, ivnum)
    } else {
        VertexSubset::empty(ivnum)
    }
}

/// The neighbor ranges one source vertex contributes under a direction
/// request. Undirected fragments keep both orientations in the outgoing
/// structure, so every direction reads the same range there.
fn adj_slices<'a, V, E>(
    frag: &'a Fragment<V, E>,
    lid: u64,
    direction: EdgeDirection,
) -> (&'a [Nbr<E>], &'a [Nbr<E>])
where
    V: Clone + Default,
    E: Clone + Default,
{
    if !frag.directed() {
        return (frag.out_adj(lid), &[]);
    }
    match direction {
        EdgeDirection::Out => (frag.out_adj(lid), &[]),
        EdgeDirection::In => (frag.in_adj(lid), &[]),
        EdgeDirection::Both => (frag.out_adj(lid), frag.in_adj(lid)),
    }
}

/// Folds one source vertex's qualifying edges into the per-thread intent
/// map, reading only the pre-round snapshot.
fn gather_from<T, V, E>(
    frag: &Fragment<V, E>,
    snapshot: &VertexValues<T>,
    program: &EdgeProgram<'_, T, E>,
    direction: EdgeDirection,
    src: u64,
    acc: &mut FxHashMap<u64, T>,
) where
    T: Clone,
    V: Clone + Default,
    E: Clone + Default,
{
    let src_val = snapshot.get(src);
    let (first, second) = adj_slices(frag, src, direction);
    for nbr in first.iter().chain(second.iter()) {
        let dst = nbr.nbr;
        if !frag.is_alive(dst) {
            continue;
        }
        let dst_val = snapshot.get(dst);
        if !(program.filter)(src_val, &nbr.data, dst_val) {
            continue;
        }
        if !(program.cond)(dst, dst_val) {
            continue;
        }
        let candidate = (program.update)(src_val, &nbr.data, dst_val);
        let merged = match acc.remove(&dst) {
            Some(prev) => (program.reduce)(prev, candidate),
            None => candidate,
        };
        acc.insert(dst, merged);
    }
}

/// Merges two per-thread intent maps with the program's reduction.
fn merge_intents<T>(
    mut a: FxHashMap<u64, T>,
    b: FxHashMap<u64, T>,
    reduce: &(dyn Fn(T, T) -> T + Sync),
) -> FxHashMap<u64, T> {
    if a.len() < b.len() {
        return merge_intents(b, a, reduce);
    }
    for (dst, candidate) in b {
        let merged = match a.remove(&dst) {
            Some(prev) => reduce(prev, candidate),
            None => candidate,
        };
        a.insert(dst, merged);
    }
    a
}

/// Applies the merged intents: inner destinations are written in place
/// (value-changed ones form the output subset), intents on outer
/// destinations are forwarded to the owning fragment instead of being
/// applied to the ghost slot.
fn apply_intents<T, V, E, C>(
    frag: &Fragment<V, E>,
    values: &mut VertexValues<T>,
    program: &EdgeProgram<'_, T, E>,
    intents: FxHashMap<u64, T>,
    channel: &C,
) -> VertexSubset
where
    T: Clone + PartialEq,
    V: Clone + Default,
    E: Clone + Default,
    C: MessageChannel<T> + ?Sized,
{
    let mut changed = Vec::new();
    let mut forwarded = 0usize;
    for (dst, candidate) in intents {
        if frag.is_inner_lid(dst) {
            let current = values.get_mut(dst);
            let next = (program.reduce)(current.clone(), candidate);
            if next != *current {
                *current = next;
                changed.push(dst);
            }
        } else {
            let gid = frag.lid_to_gid(dst);
            let owner = frag.id_parser().fragment_id(gid);
            channel.send(owner, gid, candidate);
            forwarded += 1;
        }
    }
    if forwarded > 0 {
        debug!(fid = frag.fid(), forwarded, "boundary updates forwarded");
    }
    VertexSubset::from_lids(changed, frag.inner_vertices_num())
}

/// Dense execution strategy: scan every inner vertex unconditionally and
/// probe subset membership in O(1). Favorable when the subset is a large
/// fraction of the fragment.
pub fn edge_map_dense<T, V, E, C>(
    frag: &Fragment<V, E>,
    values: &mut VertexValues<T>,
    subset: &VertexSubset,
    direction: EdgeDirection,
    program: &EdgeProgram<'_, T, E>,
    channel: &C,
) -> VertexSubset
where
    T: Clone + Default + PartialEq + Send + Sync,
    V: Clone + Default + Send + Sync,
    E: Clone + Default + Send + Sync,
    C: MessageChannel<T> + ?Sized,
{
    let flags = subset.to_flags();
    let intents = {
        let snapshot: &VertexValues<T> = values;
        run_pooled(frag.config(), || {
            (0..frag.inner_vertices_num())
                .into_par_iter()
                .fold(FxHashMap::default, |mut acc, lid| {
                    if flags.get(lid as usize).copied().unwrap_or(false)
                        && frag.is_alive_inner(lid)
                    {
                        gather_from(frag, snapshot, program, direction, lid, &mut acc);
                    }
                    acc
                })
                .reduce(FxHashMap::default, |a, b| {
                    merge_intents(a, b, program.reduce.as_ref())
                })
        })
    };
    apply_intents(frag, values, program, intents, channel)
}

/// Sparse execution strategy: walk only the explicit active-vertex list.
/// Favorable when the subset is small.
pub fn edge_map_sparse<T, V, E, C>(
    frag: &Fragment<V, E>,
    values: &mut VertexValues<T>,
    subset: &VertexSubset,
    direction: EdgeDirection,
    program: &EdgeProgram<'_, T, E>,
    channel: &C,
) -> VertexSubset
where
    T: Clone + Default + PartialEq + Send + Sync,
    V: Clone + Default + Send + Sync,
    E: Clone + Default + Send + Sync,
    C: MessageChannel<T> + ?Sized,
{
    let actives = subset.to_lids();
    let intents = {
        let snapshot: &VertexValues<T> = values;
        run_pooled(frag.config(), || {
            actives
                .par_iter()
                .fold(FxHashMap::default, |mut acc, &lid| {
                    if frag.is_alive_inner(lid) {
                        gather_from(frag, snapshot, program, direction, lid, &mut acc);
                    }
                    acc
                })
                .reduce(FxHashMap::default, |a, b| {
                    merge_intents(a, b, program.reduce.as_ref())
                })
        })
    };
    apply_intents(frag, values, program, intents, channel)
}

/// For every vertex `u` of `subset` and every edge `(u, v)` in the
/// requested direction where the program's filter and destination
/// condition hold, accumulates the update into `v`.
///
/// Dispatches to the dense strategy when the subset covers at least
/// `dense_traversal_threshold` of the inner range, to the sparse strategy
/// otherwise. The two strategies produce identical post-round values and
/// identical output subsets; only their constant factors differ.
///
/// Updates landing on outer (mirrored) vertices are forwarded through
/// `channel` to the owning fragment rather than applied locally.
///
/// # Panics
/// * Panics if `direction` requests an adjacency the fragment's load
///   strategy did not materialize.
pub fn edge_map<T, V, E, C>(
    frag: &Fragment<V, E>,
    values: &mut VertexValues<T>,
    subset: &VertexSubset,
    direction: EdgeDirection,
    program: &EdgeProgram<'_, T, E>,
    channel: &C,
) -> VertexSubset
where
    T: Clone + Default + PartialEq + Send + Sync,
    V: Clone + Default + Send + Sync,
    E: Clone + Default + Send + Sync,
    C: MessageChannel<T> + ?Sized,
{
    let ivnum = frag.inner_vertices_num().max(1);
    let dense = subset.len() as f64 >= frag.config().dense_traversal_threshold * ivnum as f64;
    if dense {
        edge_map_dense(frag, values, subset, direction, program, channel)
    } else {
        edge_map_sparse(frag, values, subset, direction, program, channel)
    }
}
