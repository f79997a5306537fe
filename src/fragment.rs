use std::collections::BTreeMap;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::config::{EngineConfig, BULK_BUILD_PROGRESS_THRESHOLD};
use crate::fragment::mutable_csr::{CsrBuilder, MutableCsr};
use crate::fragment::mutation::{Mutation, MutationOutcome};
use crate::partition::VertexIdMap;
use crate::types::id_codec::IdParser;
use crate::types::{Edge, GraphQuery, LoadStrategy, Nbr, VertexPayload};

pub mod mutable_csr;
pub mod mutation;
pub mod snapshot;

/// Sentinel gid marking an edge rejected by the load-strategy screening.
const INVALID_GID: u64 = u64::MAX;

/// Per-head append bookkeeping for one mutation's edge-add phase.
///
/// The dense form is a scratch array sized to the current head count,
/// populated in a single pass over the batch and dropped with it; the
/// sparse form only keys the touched heads. The choice follows the
/// edit-density threshold (`edges_added / existing_edge_count`, doubled for
/// undirected graphs).
enum DegreeBook {
    Dense(Vec<u32>),
    Sparse(FxHashMap<u64, u32>),
}

impl DegreeBook {
    fn touch(&mut self, head: u64) {
        match self {
            DegreeBook::Dense(v) => v[head as usize] += 1,
            DegreeBook::Sparse(m) => *m.entry(head).or_insert(0) += 1,
        }
    }

    fn reserve_into<E: Clone + Default>(&self, csr: &mut MutableCsr<E>) {
        match self {
            DegreeBook::Dense(v) => csr.reserve_dense(v),
            DegreeBook::Sparse(m) => csr.reserve_sparse(m),
        }
    }

    fn dedup_into<E: Clone + Default>(&self, csr: &mut MutableCsr<E>) {
        match self {
            DegreeBook::Dense(v) => csr.dedup_or_sort_dense(v),
            DegreeBook::Sparse(m) => csr.dedup_or_sort_sparse(m),
        }
    }
}

/// One partition's in-memory graph: CSR adjacency for inner vertices, ghost
/// bookkeeping for outer (mirrored) vertices, per-vertex data, and liveness
/// bitsets.
///
/// Inner vertices occupy local ids `[0, ivnum)`; outer vertices are
/// assigned descending local ids from `max_local_id - 1` in registration
/// order. Vertices are deleted by clearing their liveness bit (tombstone,
/// no compaction); [`Fragment::mutate`] guarantees that after dead-edge
/// cleanup no adjacency range exposes a dead neighbor.
///
/// Mutation never runs concurrently with a computation round: `mutate`
/// takes `&mut self`, while every traversal works through `&self`, so the
/// borrow checker enforces the between-supersteps protocol.
///
/// # Type Parameters
/// * `V` - Per-vertex data payload.
/// * `E` - Per-edge data payload.
pub struct Fragment<V, E> {
    fid: u32,
    fnum: u32,
    directed: bool,
    load_strategy: LoadStrategy,
    id_parser: IdParser,
    vertex_map: Arc<VertexIdMap>,
    config: EngineConfig,

    ivnum: u64,
    ovnum: u64,
    alive_ivnum: u64,
    alive_ovnum: u64,
    iv_alive: Vec<bool>,
    ov_alive: Vec<bool>,

    /// Outgoing adjacency; populated unless the strategy is `OnlyIn`.
    oe: MutableCsr<E>,
    /// Incoming adjacency; populated unless the strategy is `OnlyOut`.
    ie: MutableCsr<E>,

    /// Outer gid to outer lid.
    ovg2i: FxHashMap<u64, u64>,
    /// Outer index (registration order) to gid.
    ovgid: Vec<u64>,

    ivdata: Vec<V>,
    ovdata: Vec<V>,

    selfloops: FxHashSet<u64>,

    /// Outer lids grouped by owning fragment, for message routing.
    outer_vertices_of_frag: Vec<Vec<u64>>,
}

impl<V, E> Fragment<V, E>
where
    V: Clone + Default,
    E: Clone + Default,
{
    /// Bulk-loads a fragment from an initial vertex and edge batch.
    ///
    /// Edges are screened by `load_strategy`: an edge whose owning endpoint
    /// (source under `OnlyOut`, destination under `OnlyIn`, either under
    /// `BothOutIn`) is not local is sentinel-marked and dropped; the
    /// non-owned endpoint of a kept edge is registered as an outer vertex.
    /// The CSR is built once from the surviving edge list: a degree pass,
    /// a fill pass, then a single sort+dedup finalization.
    ///
    /// All vertex gids must already be admitted to `vertex_map`.
    ///
    /// # Arguments
    /// * `fid` - The partition this fragment owns.
    /// * `directed` - Edge semantics; undirected graphs must use `OnlyOut`
    ///   and materialize both orientations of each local edge.
    /// * `vertex_map` - The shared oid/gid authority.
    /// * `vertices` - Initial vertex data payloads (gid space).
    /// * `edges` - Initial edges (gid space).
    /// * `load_strategy` - Which adjacency directions to materialize.
    /// * `config` - Threshold knobs.
    ///
    /// # Panics
    /// * Panics on an unsupported strategy/direction combination
    ///   (`OnlyIn` or `BothOutIn` with an undirected graph).
    pub fn init(
        fid: u32,
        directed: bool,
        vertex_map: Arc<VertexIdMap>,
        vertices: Vec<VertexPayload<V>>,
        edges: Vec<Edge<E>>,
        load_strategy: LoadStrategy,
        config: EngineConfig,
    ) -> Self {
        if !directed && load_strategy != LoadStrategy::OnlyOut {
            panic!("undirected fragments must use the OnlyOut load strategy");
        }

        let id_parser = *vertex_map.id_parser();
        let fnum = vertex_map.fnum();
        let ivnum = vertex_map.inner_vertex_count(fid);

        let mut frag = Self {
            fid,
            fnum,
            directed,
            load_strategy,
            id_parser,
            vertex_map,
            config,
            ivnum,
            ovnum: 0,
            alive_ivnum: ivnum,
            alive_ovnum: 0,
            iv_alive: vec![true; ivnum as usize],
            ov_alive: Vec::new(),
            oe: MutableCsr::with_heads(ivnum as usize),
            ie: MutableCsr::with_heads(ivnum as usize),
            ovg2i: FxHashMap::default(),
            ovgid: Vec::new(),
            ivdata: vec![V::default(); ivnum as usize],
            ovdata: Vec::new(),
            selfloops: FxHashSet::default(),
            outer_vertices_of_frag: vec![Vec::new(); fnum as usize],
        };

        // Step 1. Screen and translate the edge batch: rejected edges get
        // the sentinel, kept edges land in local-id space with outer
        // endpoints registered on the fly.
        let translated: Vec<Edge<E>> = edges
            .into_iter()
            .map(|e| match frag.translate_edge(e.src, e.dst) {
                Some((src, dst)) => Edge::new(src, dst, e.data),
                None => Edge::new(INVALID_GID, INVALID_GID, e.data),
            })
            .collect();

        // Step 2. Degree pass over the surviving edges.
        let mut oe_builder = CsrBuilder::<E>::new(frag.ivnum as usize);
        let mut ie_builder = CsrBuilder::<E>::new(frag.ivnum as usize);
        for e in &translated {
            if e.src == INVALID_GID {
                continue;
            }
            frag.count_entry(&mut oe_builder, &mut ie_builder, e.src, e.dst);
        }
        frag.oe = oe_builder.build();
        frag.ie = ie_builder.build();

        // Step 3. Fill pass, with progress reporting for large loads.
        let progress = if translated.len() >= BULK_BUILD_PROGRESS_THRESHOLD {
            let pb = ProgressBar::new(translated.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                    )
                    .unwrap()
                    .progress_chars("=>-"),
            );
            pb.set_message("Fragment CSR build.");
            Some(pb)
        } else {
            None
        };
        for e in &translated {
            if e.src != INVALID_GID {
                frag.fill_entry(e.src, e.dst, &e.data);
            }
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        frag.oe.finalize();
        frag.ie.finalize();

        // Step 4. Ghost bookkeeping sized to the registered outer universe.
        frag.ov_alive = vec![true; frag.ovnum as usize];
        frag.alive_ovnum = frag.ovnum;
        frag.ovdata = vec![V::default(); frag.ovnum as usize];
        frag.rebuild_outer_vertices_of_frag();

        // Step 5. Vertex payloads.
        for v in vertices {
            if let Some(lid) = frag.gid_to_lid(v.gid) {
                if frag.is_inner_lid(lid) {
                    frag.ivdata[lid as usize] = v.data;
                } else {
                    let idx = frag.outer_lid_to_index(lid);
                    frag.ovdata[idx] = v.data;
                }
            }
        }

        debug!(
            fid = frag.fid,
            ivnum = frag.ivnum,
            ovnum = frag.ovnum,
            edges = frag.oe.edge_num() + frag.ie.edge_num(),
            "fragment initialized"
        );
        frag
    }

    /// Creates an empty fragment: no vertices admitted yet, no edges.
    pub fn empty(
        fid: u32,
        directed: bool,
        vertex_map: Arc<VertexIdMap>,
        load_strategy: LoadStrategy,
        config: EngineConfig,
    ) -> Self {
        Self::init(
            fid,
            directed,
            vertex_map,
            Vec::new(),
            Vec::new(),
            load_strategy,
            config,
        )
    }

    /// Strategy-dependent endpoint screening and translation for one edge
    /// in gid space. Registers outer vertices as a side effect. Returns the
    /// lid-space endpoints, or `None` if the edge is not kept here.
    fn translate_edge(&mut self, src_gid: u64, dst_gid: u64) -> Option<(u64, u64)> {
        let src_inner = self.is_inner_gid(src_gid);
        let dst_inner = self.is_inner_gid(dst_gid);
        let keep_either = !self.directed || self.load_strategy == LoadStrategy::BothOutIn;
        match self.load_strategy {
            LoadStrategy::OnlyOut if self.directed => {
                if !src_inner {
                    return None;
                }
            }
            LoadStrategy::OnlyIn => {
                if !dst_inner {
                    return None;
                }
            }
            _ => {
                // BothOutIn, or undirected OnlyOut: keep the edge if either
                // endpoint is local.
                debug_assert!(keep_either);
                if !src_inner && !dst_inner {
                    return None;
                }
            }
        }
        let src = if src_inner {
            self.id_parser.local_id(src_gid)
        } else {
            self.parse_or_add_outer_gid(src_gid)
        };
        let dst = if dst_inner {
            self.id_parser.local_id(dst_gid)
        } else {
            self.parse_or_add_outer_gid(dst_gid)
        };
        Some((src, dst))
    }

    /// Records the CSR entries one translated edge will produce (degree
    /// pass of bulk construction).
    fn count_entry(
        &self,
        oe_builder: &mut CsrBuilder<E>,
        ie_builder: &mut CsrBuilder<E>,
        src: u64,
        dst: u64,
    ) {
        let materialize_out = self.load_strategy != LoadStrategy::OnlyIn;
        let materialize_in = self.load_strategy != LoadStrategy::OnlyOut;
        if materialize_out && self.is_inner_lid(src) {
            oe_builder.inc_degree(src as usize);
        }
        if materialize_in && self.is_inner_lid(dst) {
            ie_builder.inc_degree(dst as usize);
        }
        // Undirected graphs materialize both orientations as out-entries.
        if !self.directed && self.is_inner_lid(dst) && src != dst {
            oe_builder.inc_degree(dst as usize);
        }
    }

    /// Writes the CSR entries for one translated edge (fill pass of bulk
    /// construction).
    fn fill_entry(&mut self, src: u64, dst: u64, data: &E) {
        let materialize_out = self.load_strategy != LoadStrategy::OnlyIn;
        let materialize_in = self.load_strategy != LoadStrategy::OnlyOut;
        if materialize_out && self.is_inner_lid(src) {
            self.oe.add_edge(src as usize, Nbr::new(dst, data.clone()));
            if src == dst {
                self.selfloops.insert(src);
            }
        }
        if materialize_in && self.is_inner_lid(dst) {
            self.ie.add_edge(dst as usize, Nbr::new(src, data.clone()));
        }
        if !self.directed && self.is_inner_lid(dst) && src != dst {
            self.oe.add_edge(dst as usize, Nbr::new(src, data.clone()));
        }
    }

    /// Applies a mutation batch.
    ///
    /// The five phases run in order: vertex removal (sparse set-probe or
    /// dense boolean-mask dead-edge cleanup, chosen by the removed fraction
    /// against `dense_remove_threshold`), edge removal, edge update, vertex
    /// and edge addition (add-or-update probe with a sort+dedup pass over
    /// the touched neighbor ranges), and vertex data updates. Size-derived
    /// ranges and alive counters are recomputed before returning, so any
    /// iteration state derived from the old ranges must be refreshed.
    ///
    /// Entries whose endpoints cannot be translated are skipped and counted
    /// in the outcome, not reported as errors. In the outcome, an edge add
    /// that landed on an existing neighbor entry (the upsert path) counts
    /// as an update, not an add.
    pub fn mutate(&mut self, mut mutation: Mutation<V, E>) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();

        // Phase 1. Vertex removal with dead-edge cleanup.
        self.remove_vertices(&mutation.vertices_to_remove, &mut outcome);

        // Phase 2. Edge removal.
        let pairs = self.translate_edge_refs(&mutation.edges_to_remove, &mut outcome);
        if !pairs.is_empty() {
            outcome.edges_removed += self.oe.remove_edges(&pairs);
            let reversed: Vec<(u64, u64)> = pairs.iter().map(|&(s, d)| (d, s)).collect();
            if !self.directed {
                // The mirrored orientation of the same logical edge is not
                // counted again.
                self.oe.remove_edges(&reversed);
            }
            if self.load_strategy == LoadStrategy::BothOutIn {
                self.ie.remove_edges(&reversed);
            }
            for &(s, d) in &pairs {
                if s == d {
                    self.selfloops.remove(&s);
                }
            }
        }

        // Phase 3. Edge updates.
        let updates = std::mem::take(&mut mutation.edges_to_update);
        if !updates.is_empty() {
            let mut triples: Vec<(u64, u64, E)> = Vec::with_capacity(updates.len());
            for e in updates {
                match (self.gid_to_lid(e.src), self.gid_to_lid(e.dst)) {
                    (Some(s), Some(d)) => triples.push((s, d, e.data)),
                    _ => outcome.skipped += 1,
                }
            }
            outcome.edges_updated += self.oe.update_edges(&triples);
            let reversed: Vec<(u64, u64, E)> = triples
                .iter()
                .map(|(s, d, data)| (*d, *s, data.clone()))
                .collect();
            if !self.directed {
                self.oe.update_edges(&reversed);
            }
            if self.load_strategy == LoadStrategy::BothOutIn {
                self.ie.update_edges(&reversed);
            }
        }

        // Phase 4a. Extend the inner universe to cover vertices admitted
        // to the id map since the last mutation; new slots are born alive.
        let new_ivnum = self.vertex_map.inner_vertex_count(self.fid);
        if new_ivnum > self.ivnum {
            let added = (new_ivnum - self.ivnum) as usize;
            self.oe.add_vertices(added);
            self.ie.add_vertices(added);
            self.iv_alive.resize(new_ivnum as usize, true);
            self.ivdata.resize(new_ivnum as usize, V::default());
            self.alive_ivnum += added as u64;
            self.ivnum = new_ivnum;
        }

        // Phase 4b. Edge addition via the add-or-update probe.
        let old_ovnum = self.ovnum;
        let edges_to_add = std::mem::take(&mut mutation.edges_to_add);
        if !edges_to_add.is_empty() {
            self.add_edges(edges_to_add, &mut outcome);
        }

        // Phase 4c. Ghost bookkeeping growth for newly registered mirrors.
        if self.ovnum != old_ovnum {
            let added = (self.ovnum - old_ovnum) as u64;
            self.ov_alive.resize(self.ovnum as usize, true);
            self.ovdata.resize(self.ovnum as usize, V::default());
            self.alive_ovnum += added;
            self.rebuild_outer_vertices_of_frag();
        }

        // Phase 5. Vertex payloads: adds may revive tombstones, updates
        // only overwrite.
        for v in std::mem::take(&mut mutation.vertices_to_add) {
            match self.gid_to_lid(v.gid) {
                Some(lid) if self.is_inner_lid(lid) => {
                    if !self.iv_alive[lid as usize] {
                        self.iv_alive[lid as usize] = true;
                        self.alive_ivnum += 1;
                    }
                    self.ivdata[lid as usize] = v.data;
                    outcome.vertices_added += 1;
                }
                Some(lid) => {
                    let idx = self.outer_lid_to_index(lid);
                    if !self.ov_alive[idx] {
                        self.ov_alive[idx] = true;
                        self.alive_ovnum += 1;
                    }
                    self.ovdata[idx] = v.data;
                    outcome.vertices_added += 1;
                }
                None => outcome.skipped += 1,
            }
        }
        for v in std::mem::take(&mut mutation.vertices_to_update) {
            match self.gid_to_lid(v.gid) {
                Some(lid) if self.is_inner_lid(lid) => {
                    self.ivdata[lid as usize] = v.data;
                    outcome.vertices_updated += 1;
                }
                Some(lid) => {
                    let idx = self.outer_lid_to_index(lid);
                    self.ovdata[idx] = v.data;
                    outcome.vertices_updated += 1;
                }
                None => outcome.skipped += 1,
            }
        }

        debug!(
            fid = self.fid,
            added = outcome.edges_added,
            removed = outcome.edges_removed,
            skipped = outcome.skipped,
            "mutation applied"
        );
        outcome
    }

    /// Phase 1 of `mutate`: tombstone the listed vertices and detach every
    /// edge referencing them. The sparse path probes a removed-id set; the
    /// dense path builds full boolean masks and runs one linear filter.
    fn remove_vertices(&mut self, removals: &[u64], outcome: &mut MutationOutcome) {
        if removals.is_empty() {
            return;
        }
        let total = (self.alive_ivnum + self.alive_ovnum).max(1);
        let fraction = removals.len() as f64 / total as f64;

        if fraction < self.config.dense_remove_threshold {
            // Sparse path: explicit removed set, membership-tested cleanup.
            let mut removed_set: FxHashSet<u64> = FxHashSet::default();
            for &gid in removals {
                if let Some(lid) = self.tombstone(gid, outcome) {
                    removed_set.insert(lid);
                }
            }
            if !removed_set.is_empty() {
                self.oe.remove_if(|n| removed_set.contains(&n.nbr));
                self.ie.remove_if(|n| removed_set.contains(&n.nbr));
            }
        } else {
            // Dense path: boolean masks over both slot regions, one linear
            // filter pass over the whole adjacency.
            let mut inner_mask = vec![false; self.ivnum as usize];
            let mut outer_mask = vec![false; self.ovnum as usize];
            let mut any = false;
            for &gid in removals {
                if let Some(lid) = self.tombstone(gid, outcome) {
                    if self.is_inner_lid(lid) {
                        inner_mask[lid as usize] = true;
                    } else {
                        outer_mask[(self.id_parser.max_local_id() - lid - 1) as usize] = true;
                    }
                    any = true;
                }
            }
            if any {
                let ivnum = self.ivnum;
                let max_local_id = self.id_parser.max_local_id();
                let dead = move |n: &Nbr<E>| {
                    if n.nbr < ivnum {
                        inner_mask[n.nbr as usize]
                    } else {
                        outer_mask[(max_local_id - n.nbr - 1) as usize]
                    }
                };
                self.oe.remove_if(&dead);
                self.ie.remove_if(&dead);
            }
        }
    }

    /// Clears the liveness bit of one vertex and detaches its own adjacency.
    /// Returns the lid if the vertex was alive.
    fn tombstone(&mut self, gid: u64, outcome: &mut MutationOutcome) -> Option<u64> {
        match self.gid_to_lid(gid) {
            Some(lid) if self.is_inner_lid(lid) => {
                if !self.iv_alive[lid as usize] {
                    return None;
                }
                self.iv_alive[lid as usize] = false;
                self.alive_ivnum -= 1;
                self.oe.remove_vertex(lid as usize);
                self.ie.remove_vertex(lid as usize);
                self.selfloops.remove(&lid);
                outcome.vertices_removed += 1;
                Some(lid)
            }
            Some(lid) => {
                let idx = self.outer_lid_to_index(lid);
                if !self.ov_alive[idx] {
                    return None;
                }
                self.ov_alive[idx] = false;
                self.alive_ovnum -= 1;
                outcome.vertices_removed += 1;
                Some(lid)
            }
            None => {
                outcome.skipped += 1;
                None
            }
        }
    }

    /// Translates gid pairs to lid pairs, dropping pairs with an
    /// untranslatable endpoint.
    fn translate_edge_refs(
        &self,
        pairs: &[(u64, u64)],
        outcome: &mut MutationOutcome,
    ) -> Vec<(u64, u64)> {
        let mut out = Vec::with_capacity(pairs.len());
        for &(src_gid, dst_gid) in pairs {
            match (self.gid_to_lid(src_gid), self.gid_to_lid(dst_gid)) {
                (Some(s), Some(d)) => out.push((s, d)),
                _ => outcome.skipped += 1,
            }
        }
        out
    }

    /// Phase 4b of `mutate`: translate, reserve, probe-or-append, then
    /// restore the ordering contract on every touched range.
    fn add_edges(&mut self, edges: Vec<Edge<E>>, outcome: &mut MutationOutcome) {
        // Translate in gid space first; registration of new mirrors happens
        // here so the rate computation sees the final entry count.
        let mut translated: Vec<Edge<E>> = Vec::with_capacity(edges.len());
        for e in edges {
            match self.translate_edge(e.src, e.dst) {
                Some((src, dst)) => translated.push(Edge::new(src, dst, e.data)),
                None => outcome.skipped += 1,
            }
        }
        if translated.is_empty() {
            return;
        }

        let materialize_out = self.load_strategy != LoadStrategy::OnlyIn;
        let materialize_in = self.load_strategy != LoadStrategy::OnlyOut;

        // Choose the bookkeeping shape by edit density.
        let mut rate = translated.len() as f64 / self.oe.edge_num().max(self.ie.edge_num()).max(1) as f64;
        if !self.directed {
            rate *= 2.0;
        }
        let dense = rate >= self.config.dense_rebuild_threshold;
        let mut oe_book = if dense {
            DegreeBook::Dense(vec![0; self.ivnum as usize])
        } else {
            DegreeBook::Sparse(FxHashMap::default())
        };
        let mut ie_book = if dense {
            DegreeBook::Dense(vec![0; self.ivnum as usize])
        } else {
            DegreeBook::Sparse(FxHashMap::default())
        };

        // Upper-bound degree scan for capacity reservation; the same
        // bookkeeping marks the ranges to normalize afterwards.
        for e in &translated {
            if materialize_out && self.is_inner_lid(e.src) {
                oe_book.touch(e.src);
            }
            if materialize_in && self.is_inner_lid(e.dst) {
                ie_book.touch(e.dst);
            }
            if !self.directed && self.is_inner_lid(e.dst) && e.src != e.dst {
                oe_book.touch(e.dst);
            }
        }
        oe_book.reserve_into(&mut self.oe);
        ie_book.reserve_into(&mut self.ie);

        // Add-or-update probe: a linear scan of the existing range merges
        // re-added edges (property upsert) instead of duplicating them.
        // Each logical edge is counted once, as an add if any store
        // appended, as an update if every store merged.
        for e in &translated {
            let mut appended = false;
            let mut merged = false;
            if materialize_out && self.is_inner_lid(e.src) {
                if let Some(existing) = self.oe.find_mut(e.src as usize, e.dst) {
                    existing.data = e.data.clone();
                    merged = true;
                } else {
                    self.oe.add_edge(e.src as usize, Nbr::new(e.dst, e.data.clone()));
                    appended = true;
                    if e.src == e.dst {
                        self.selfloops.insert(e.src);
                    }
                }
            }
            if materialize_in && self.is_inner_lid(e.dst) {
                if let Some(existing) = self.ie.find_mut(e.dst as usize, e.src) {
                    existing.data = e.data.clone();
                    merged = true;
                } else {
                    self.ie.add_edge(e.dst as usize, Nbr::new(e.src, e.data.clone()));
                    appended = true;
                }
            }
            if !self.directed && self.is_inner_lid(e.dst) && e.src != e.dst {
                if let Some(existing) = self.oe.find_mut(e.dst as usize, e.src) {
                    existing.data = e.data.clone();
                    merged = true;
                } else {
                    self.oe.add_edge(e.dst as usize, Nbr::new(e.src, e.data.clone()));
                    appended = true;
                }
            }
            if appended {
                outcome.edges_added += 1;
            } else if merged {
                outcome.edges_updated += 1;
            }
        }

        oe_book.dedup_into(&mut self.oe);
        ie_book.dedup_into(&mut self.ie);
    }

    /// Registers a gid owned by another fragment as an outer vertex,
    /// returning its (descending) local id. Idempotent.
    fn parse_or_add_outer_gid(&mut self, gid: u64) -> u64 {
        if let Some(&lid) = self.ovg2i.get(&gid) {
            return lid;
        }
        self.ovnum += 1;
        let lid = self.id_parser.max_local_id() - self.ovnum;
        self.ovgid.push(gid);
        self.ovg2i.insert(gid, lid);
        lid
    }

    fn rebuild_outer_vertices_of_frag(&mut self) {
        for list in &mut self.outer_vertices_of_frag {
            list.clear();
        }
        for (idx, &gid) in self.ovgid.iter().enumerate() {
            let owner = self.id_parser.fragment_id(gid);
            let lid = self.outer_index_to_lid(idx);
            self.outer_vertices_of_frag[owner as usize].push(lid);
        }
    }

    /// Drops all edges and the entire outer-vertex universe, keeping inner
    /// vertices and their data.
    pub fn clear_edges(&mut self) {
        self.oe.clear_edges();
        self.ie.clear_edges();
        self.selfloops.clear();
        self.ovg2i.clear();
        self.ovgid.clear();
        self.ov_alive.clear();
        self.ovdata.clear();
        self.ovnum = 0;
        self.alive_ovnum = 0;
        for list in &mut self.outer_vertices_of_frag {
            list.clear();
        }
    }

    // ---- id translation ----------------------------------------------

    pub fn fid(&self) -> u32 {
        self.fid
    }

    pub fn fnum(&self) -> u32 {
        self.fnum
    }

    pub fn directed(&self) -> bool {
        self.directed
    }

    pub fn load_strategy(&self) -> LoadStrategy {
        self.load_strategy
    }

    pub fn id_parser(&self) -> &IdParser {
        &self.id_parser
    }

    pub fn vertex_map(&self) -> &Arc<VertexIdMap> {
        &self.vertex_map
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn max_local_id(&self) -> u64 {
        self.id_parser.max_local_id()
    }

    /// True if the gid is owned by this fragment.
    pub fn is_inner_gid(&self, gid: u64) -> bool {
        self.id_parser.fragment_id(gid) == self.fid
    }

    /// True if the lid addresses the inner slot range.
    pub fn is_inner_lid(&self, lid: u64) -> bool {
        lid < self.ivnum
    }

    /// Translates a gid to a local id: the local offset for inner gids,
    /// the ghost slot for registered mirrors, `None` otherwise.
    pub fn gid_to_lid(&self, gid: u64) -> Option<u64> {
        if self.is_inner_gid(gid) {
            let lid = self.id_parser.local_id(gid);
            (lid < self.ivnum).then_some(lid)
        } else {
            self.ovg2i.get(&gid).copied()
        }
    }

    /// Translates a local id back to its gid.
    pub fn lid_to_gid(&self, lid: u64) -> u64 {
        if self.is_inner_lid(lid) {
            self.id_parser.encode(self.fid, lid)
        } else {
            self.ovgid[self.outer_lid_to_index(lid)]
        }
    }

    pub fn outer_lid_to_index(&self, lid: u64) -> usize {
        (self.id_parser.max_local_id() - lid - 1) as usize
    }

    pub fn outer_index_to_lid(&self, index: usize) -> u64 {
        self.id_parser.max_local_id() - index as u64 - 1
    }

    // ---- counters and liveness ---------------------------------------

    pub fn inner_vertices_num(&self) -> u64 {
        self.ivnum
    }

    pub fn outer_vertices_num(&self) -> u64 {
        self.ovnum
    }

    pub fn alive_inner_num(&self) -> u64 {
        self.alive_ivnum
    }

    pub fn alive_outer_num(&self) -> u64 {
        self.alive_ovnum
    }

    pub fn selfloops_num(&self) -> usize {
        self.selfloops.len()
    }

    pub fn is_alive_inner(&self, lid: u64) -> bool {
        self.is_inner_lid(lid) && self.iv_alive[lid as usize]
    }

    pub fn is_alive(&self, lid: u64) -> bool {
        if self.is_inner_lid(lid) {
            self.iv_alive[lid as usize]
        } else {
            let idx = self.outer_lid_to_index(lid);
            idx < self.ov_alive.len() && self.ov_alive[idx]
        }
    }

    /// Iterates the lids of live inner vertices.
    pub fn inner_vertices(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.ivnum).filter(move |&lid| self.iv_alive[lid as usize])
    }

    /// Iterates the lids of live outer vertices in registration order.
    pub fn outer_vertices(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.ovnum as usize)
            .filter(move |&idx| self.ov_alive[idx])
            .map(move |idx| self.outer_index_to_lid(idx))
    }

    /// The gid table of registered mirrors, indexed by outer index. Part of
    /// the serializer contract.
    pub fn outer_gid_table(&self) -> &[u64] {
        &self.ovgid
    }

    /// Live outer lids mirrored from the given fragment.
    pub fn outer_vertices_of_fragment(&self, fid: u32) -> &[u64] {
        &self.outer_vertices_of_frag[fid as usize]
    }

    // ---- adjacency and data ------------------------------------------

    /// Outgoing neighbor range of an inner vertex.
    ///
    /// # Panics
    /// * Panics if the load strategy did not materialize outgoing edges.
    pub fn out_adj(&self, lid: u64) -> &[Nbr<E>] {
        if self.load_strategy == LoadStrategy::OnlyIn {
            panic!("outgoing adjacency not materialized under OnlyIn");
        }
        self.oe.get(lid as usize)
    }

    /// Incoming neighbor range of an inner vertex.
    ///
    /// # Panics
    /// * Panics if the load strategy did not materialize incoming edges.
    pub fn in_adj(&self, lid: u64) -> &[Nbr<E>] {
        if self.load_strategy == LoadStrategy::OnlyOut {
            panic!("incoming adjacency not materialized under OnlyOut");
        }
        self.ie.get(lid as usize)
    }

    pub fn out_degree(&self, lid: u64) -> usize {
        self.oe.degree(lid as usize)
    }

    pub fn in_degree(&self, lid: u64) -> usize {
        self.ie.degree(lid as usize)
    }

    pub fn out_edge_num(&self) -> usize {
        self.oe.edge_num()
    }

    pub fn in_edge_num(&self) -> usize {
        self.ie.edge_num()
    }

    /// Checks a live edge between two lids in the materialized direction.
    pub fn has_edge_lid(&self, src: u64, dst: u64) -> bool {
        if self.load_strategy == LoadStrategy::OnlyIn {
            self.ie.binary_find(dst as usize, src).is_some()
        } else {
            self.oe.binary_find(src as usize, dst).is_some()
        }
    }

    pub fn vertex_data(&self, lid: u64) -> &V {
        if self.is_inner_lid(lid) {
            &self.ivdata[lid as usize]
        } else {
            &self.ovdata[self.outer_lid_to_index(lid)]
        }
    }

    pub fn vertex_data_mut(&mut self, lid: u64) -> &mut V {
        if self.is_inner_lid(lid) {
            &mut self.ivdata[lid as usize]
        } else {
            let idx = self.outer_lid_to_index(lid);
            &mut self.ovdata[idx]
        }
    }

    pub fn set_vertex_data(&mut self, lid: u64, data: V) {
        *self.vertex_data_mut(lid) = data;
    }

    // ---- oid-level queries -------------------------------------------

    fn oid_to_alive_inner_lid(&self, oid: u64) -> Option<u64> {
        let gid = self.vertex_map.get_gid(oid)?;
        if !self.is_inner_gid(gid) {
            return None;
        }
        let lid = self.gid_to_lid(gid)?;
        self.iv_alive[lid as usize].then_some(lid)
    }

    fn lid_to_oid(&self, lid: u64) -> Option<u64> {
        self.vertex_map.get_oid(self.lid_to_gid(lid))
    }

    /// True if this fragment owns a live vertex for the object id.
    pub fn has_node(&self, oid: u64) -> bool {
        self.oid_to_alive_inner_lid(oid).is_some()
    }

    /// Edge payload lookup by object ids, over the materialized direction.
    pub fn edge_data(&self, src_oid: u64, dst_oid: u64) -> Option<E> {
        let src = self.oid_to_alive_inner_lid(src_oid)?;
        let dst_gid = self.vertex_map.get_gid(dst_oid)?;
        let dst = self.gid_to_lid(dst_gid)?;
        if self.load_strategy == LoadStrategy::OnlyIn {
            self.ie
                .binary_find(dst as usize, src)
                .map(|n| n.data.clone())
        } else {
            self.oe
                .binary_find(src as usize, dst)
                .map(|n| n.data.clone())
        }
    }
}

impl<V, E> GraphQuery<u64, u64> for Fragment<V, E>
where
    V: Clone + Default,
    E: Clone + Default,
{
    /// Live neighbors of a locally owned vertex, as object ids.
    fn read_neighbor(&self, vertex_id: &u64) -> Vec<u64> {
        let lid = match self.oid_to_alive_inner_lid(*vertex_id) {
            Some(lid) => lid,
            None => return vec![],
        };
        let adj = if self.load_strategy == LoadStrategy::OnlyIn {
            self.ie.get(lid as usize)
        } else {
            self.oe.get(lid as usize)
        };
        adj.iter()
            .filter(|n| self.is_alive(n.nbr))
            .filter_map(|n| self.lid_to_oid(n.nbr))
            .collect()
    }

    fn has_vertex(&self, vertex_id: &u64) -> bool {
        self.has_node(*vertex_id)
    }

    fn has_edge(&self, src_id: &u64, dst_id: &u64) -> bool {
        self.edge_data(*src_id, *dst_id).is_some()
    }

    fn vertex_list(&self) -> Vec<u64> {
        self.inner_vertices()
            .filter_map(|lid| self.lid_to_oid(lid))
            .collect()
    }

    fn all(&self) -> BTreeMap<u64, (u64, Vec<u64>)> {
        let mut graph_map = BTreeMap::new();
        for lid in self.inner_vertices() {
            if let Some(oid) = self.lid_to_oid(lid) {
                graph_map.insert(oid, (oid, self.read_neighbor(&oid)));
            }
        }
        graph_map
    }
}

#[cfg(test)]
mod test_fragment {
    use super::*;
    use crate::types::LoadStrategy::{BothOutIn, OnlyOut};

    /// Admits `oids` and returns the resulting gids.
    fn admit(map: &VertexIdMap, oids: &[u64]) -> Vec<u64> {
        oids.iter().map(|&oid| map.add_vertex(oid).0).collect()
    }

    /// Picks `n` object ids owned by `fid` under the map's partitioner.
    fn pick_oids(map: &VertexIdMap, fid: u32, n: usize) -> Vec<u64> {
        (0u64..)
            .filter(|&oid| map.partitioner().partition(oid) == fid)
            .take(n)
            .collect()
    }

    /// Single-fragment directed path 0 -> 1 -> 2 -> 3 with unit payloads.
    fn build_path_fragment() -> (Arc<VertexIdMap>, Fragment<i64, i32>) {
        let map = Arc::new(VertexIdMap::new(1));
        let gids = admit(&map, &[0, 1, 2, 3]);
        let edges = vec![
            Edge::new(gids[0], gids[1], 1),
            Edge::new(gids[1], gids[2], 1),
            Edge::new(gids[2], gids[3], 1),
        ];
        let vertices = gids
            .iter()
            .map(|&gid| VertexPayload::new(gid, gid as i64 * 10))
            .collect();
        let frag = Fragment::init(
            0,
            true,
            Arc::clone(&map),
            vertices,
            edges,
            BothOutIn,
            EngineConfig::default(),
        );
        (map, frag)
    }

    #[test]
    fn test_init_builds_both_directions() {
        let (_, frag) = build_path_fragment();
        assert_eq!(frag.inner_vertices_num(), 4);
        assert_eq!(frag.outer_vertices_num(), 0);
        assert_eq!(frag.out_edge_num(), 3);
        assert_eq!(frag.in_edge_num(), 3);

        let out1: Vec<u64> = frag.out_adj(1).iter().map(|n| n.nbr).collect();
        assert_eq!(out1, vec![2]);
        let in1: Vec<u64> = frag.in_adj(1).iter().map(|n| n.nbr).collect();
        assert_eq!(in1, vec![0]);
        assert_eq!(*frag.vertex_data(2), 20);
    }

    #[test]
    fn test_outer_vertex_registration_across_fragments() {
        let map = Arc::new(VertexIdMap::new(2));
        let local = pick_oids(&map, 0, 2);
        let remote = pick_oids(&map, 1, 1);
        let lg = admit(&map, &local);
        let rg = admit(&map, &remote);

        // fragment 0 sees one edge leaving the partition
        let edges = vec![Edge::new(lg[0], rg[0], 7), Edge::new(lg[0], lg[1], 8)];
        let frag: Fragment<i64, i32> = Fragment::init(
            0,
            true,
            Arc::clone(&map),
            vec![],
            edges,
            OnlyOut,
            EngineConfig::default(),
        );

        assert_eq!(frag.outer_vertices_num(), 1);
        let outer_lid = frag.gid_to_lid(rg[0]).unwrap();
        assert!(!frag.is_inner_lid(outer_lid));
        assert_eq!(frag.lid_to_gid(outer_lid), rg[0]);
        assert_eq!(frag.outer_gid_table(), &[rg[0]]);
        assert_eq!(frag.outer_vertices_of_fragment(1), &[outer_lid]);
        // The adjacency exposes the ghost slot.
        let src = frag.gid_to_lid(lg[0]).unwrap();
        assert!(frag.out_adj(src).iter().any(|n| n.nbr == outer_lid));
    }

    #[test]
    fn test_edges_with_no_local_endpoint_are_rejected() {
        let map = Arc::new(VertexIdMap::new(2));
        let local = pick_oids(&map, 0, 1);
        let remote = pick_oids(&map, 1, 2);
        let lg = admit(&map, &local);
        let rg = admit(&map, &remote);

        // From fragment 0's point of view the second edge is foreign.
        let edges = vec![Edge::new(lg[0], rg[0], 0), Edge::new(rg[0], rg[1], 0)];
        let frag: Fragment<i64, i32> = Fragment::init(
            0,
            true,
            Arc::clone(&map),
            vec![],
            edges,
            OnlyOut,
            EngineConfig::default(),
        );
        assert_eq!(frag.out_edge_num(), 1);
        // Only the referenced remote endpoint was mirrored.
        assert_eq!(frag.outer_vertices_num(), 1);
    }

    #[test]
    #[should_panic(expected = "undirected fragments must use the OnlyOut load strategy")]
    fn test_invalid_strategy_is_fatal() {
        let map = Arc::new(VertexIdMap::new(1));
        let _: Fragment<i64, i32> = Fragment::init(
            0,
            false,
            map,
            vec![],
            vec![],
            BothOutIn,
            EngineConfig::default(),
        );
    }

    #[test]
    fn test_mutate_add_edge_twice_dedups_last_write_wins() {
        let (map, mut frag) = build_path_fragment();
        let g0 = map.get_gid(0).unwrap();
        let g3 = map.get_gid(3).unwrap();

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.add_edge(g0, g3, 5).add_edge(g0, g3, 9);
        let outcome = frag.mutate(batch);

        // First add appends, second lands on the upsert path.
        assert_eq!(outcome.edges_added, 1);
        assert_eq!(outcome.edges_updated, 1);
        let entries: Vec<&Nbr<i32>> = frag.out_adj(0).iter().filter(|n| n.nbr == 3).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, 9);
        // The range stayed sorted.
        let nbrs: Vec<u64> = frag.out_adj(0).iter().map(|n| n.nbr).collect();
        assert_eq!(nbrs, vec![1, 3]);
    }

    #[test]
    fn test_mutate_remove_vertex_cleans_adjacency_sparse() {
        // A generous threshold keeps a 1-of-4 removal on the set-probe
        // path (0.25 < 0.5).
        let map = Arc::new(VertexIdMap::new(1));
        let gids = admit(&map, &[0, 1, 2, 3]);
        let edges = vec![
            Edge::new(gids[0], gids[1], 1),
            Edge::new(gids[1], gids[2], 1),
            Edge::new(gids[2], gids[3], 1),
        ];
        let config = EngineConfig {
            dense_remove_threshold: 0.5,
            ..EngineConfig::default()
        };
        let mut frag: Fragment<i64, i32> =
            Fragment::init(0, true, Arc::clone(&map), vec![], edges, BothOutIn, config);
        let g2 = map.get_gid(2).unwrap();

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.remove_vertex(g2);
        let outcome = frag.mutate(batch);

        assert_eq!(outcome.vertices_removed, 1);
        assert_eq!(frag.alive_inner_num(), 3);
        assert!(!frag.is_alive(2));
        // No surviving adjacency range may expose vertex 2.
        for lid in frag.inner_vertices() {
            assert!(frag.out_adj(lid).iter().all(|n| n.nbr != 2));
            assert!(frag.in_adj(lid).iter().all(|n| n.nbr != 2));
        }
        assert_eq!(frag.out_degree(2), 0);
    }

    #[test]
    fn test_mutate_remove_vertex_cleans_adjacency_dense() {
        // A zero threshold forces the dense mask path regardless of batch
        // size; results must match the sparse path.
        let map = Arc::new(VertexIdMap::new(1));
        let gids = admit(&map, &[0, 1, 2, 3]);
        let edges = vec![
            Edge::new(gids[0], gids[1], 1),
            Edge::new(gids[1], gids[2], 1),
            Edge::new(gids[2], gids[3], 1),
        ];
        let config = EngineConfig {
            dense_remove_threshold: 0.0,
            ..EngineConfig::default()
        };
        let mut frag: Fragment<i64, i32> =
            Fragment::init(0, true, Arc::clone(&map), vec![], edges, BothOutIn, config);

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.remove_vertex(gids[2]);
        frag.mutate(batch);

        assert!(!frag.is_alive(2));
        for lid in frag.inner_vertices() {
            assert!(frag.out_adj(lid).iter().all(|n| n.nbr != 2));
            assert!(frag.in_adj(lid).iter().all(|n| n.nbr != 2));
        }
    }

    #[test]
    fn test_mutate_remove_and_update_edges() {
        let (map, mut frag) = build_path_fragment();
        let g1 = map.get_gid(1).unwrap();
        let g2 = map.get_gid(2).unwrap();

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.remove_edge(g1, g2);
        let outcome = frag.mutate(batch);
        assert_eq!(outcome.edges_removed, 1);
        assert!(frag.out_adj(1).is_empty());
        assert!(frag.in_adj(2).is_empty());

        let g0 = map.get_gid(0).unwrap();
        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.update_edge(g0, g1, 42);
        let outcome = frag.mutate(batch);
        assert_eq!(outcome.edges_updated, 1);
        assert_eq!(frag.out_adj(0)[0].data, 42);
    }

    #[test]
    fn test_mutate_admits_new_vertices_and_edges() {
        let (map, mut frag) = build_path_fragment();
        // Admit two new oids after init.
        let (g4, _) = map.add_vertex(4);
        let (g5, _) = map.add_vertex(5);

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch
            .add_vertex(g4, 40)
            .add_vertex(g5, 50)
            .add_edge(g4, g5, 1)
            .add_edge(map.get_gid(3).unwrap(), g4, 1);
        let outcome = frag.mutate(batch);

        assert_eq!(outcome.vertices_added, 2);
        assert_eq!(outcome.edges_added, 2);
        assert_eq!(frag.inner_vertices_num(), 6);
        assert_eq!(frag.alive_inner_num(), 6);
        assert_eq!(*frag.vertex_data(frag.gid_to_lid(g4).unwrap()), 40);
        let l4 = frag.gid_to_lid(g4).unwrap();
        let l5 = frag.gid_to_lid(g5).unwrap();
        assert!(frag.has_edge_lid(l4, l5));
        assert!(frag.has_edge_lid(3, l4));
    }

    #[test]
    fn test_unresolvable_mutation_entries_are_skipped() {
        let (_map, mut frag) = build_path_fragment();
        // A gid from a nonexistent local offset resolves nowhere.
        let bogus = frag.id_parser().encode(0, 999);

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch
            .remove_vertex(bogus)
            .remove_edge(bogus, bogus)
            .update_vertex(bogus, 0);
        let outcome = frag.mutate(batch);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(outcome.vertices_removed, 0);
        assert_eq!(frag.alive_inner_num(), 4);
    }

    #[test]
    fn test_undirected_mutate_materializes_both_orientations() {
        let map = Arc::new(VertexIdMap::new(1));
        let gids = admit(&map, &[0, 1, 2]);
        let mut frag: Fragment<i64, i32> = Fragment::init(
            0,
            false,
            Arc::clone(&map),
            vec![],
            vec![Edge::new(gids[0], gids[1], 1)],
            OnlyOut,
            EngineConfig::default(),
        );
        let n0: Vec<u64> = frag.out_adj(0).iter().map(|n| n.nbr).collect();
        let n1: Vec<u64> = frag.out_adj(1).iter().map(|n| n.nbr).collect();
        assert_eq!(n0, vec![1]);
        assert_eq!(n1, vec![0]);

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.add_edge(gids[1], gids[2], 2);
        frag.mutate(batch);
        assert!(frag.has_edge_lid(1, 2));
        assert!(frag.has_edge_lid(2, 1));

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.remove_edge(gids[0], gids[1]);
        frag.mutate(batch);
        assert!(frag.out_adj(0).is_empty());
        assert!(!frag.has_edge_lid(1, 0));
    }

    #[test]
    fn test_selfloop_tracking() {
        let (map, mut frag) = build_path_fragment();
        let g1 = map.get_gid(1).unwrap();
        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.add_edge(g1, g1, 0);
        frag.mutate(batch);
        assert_eq!(frag.selfloops_num(), 1);

        let mut batch: Mutation<i64, i32> = Mutation::new();
        batch.remove_edge(g1, g1);
        frag.mutate(batch);
        assert_eq!(frag.selfloops_num(), 0);
    }

    #[test]
    fn test_oid_level_queries() {
        let (_map, frag) = build_path_fragment();
        assert!(frag.has_node(1));
        assert!(!frag.has_node(9));
        assert_eq!(frag.read_neighbor(&1), vec![2]);
        assert!(frag.has_edge(&0, &1));
        assert!(!frag.has_edge(&1, &0));
        assert_eq!(frag.edge_data(0, 1), Some(1));

        let mut listed = frag.vertex_list();
        listed.sort_unstable();
        assert_eq!(listed, vec![0, 1, 2, 3]);

        let everything = frag.all();
        assert_eq!(everything.len(), 4);
        assert_eq!(everything.get(&2).unwrap().1, vec![3]);
    }

    #[test]
    fn test_clear_edges_keeps_vertices() {
        let map = Arc::new(VertexIdMap::new(2));
        let local = pick_oids(&map, 0, 2);
        let remote = pick_oids(&map, 1, 1);
        let lg = admit(&map, &local);
        let rg = admit(&map, &remote);
        let edges = vec![Edge::new(lg[0], lg[1], 0), Edge::new(lg[1], rg[0], 0)];
        let mut frag: Fragment<i64, i32> = Fragment::init(
            0,
            true,
            Arc::clone(&map),
            vec![],
            edges,
            OnlyOut,
            EngineConfig::default(),
        );
        assert_eq!(frag.outer_vertices_num(), 1);

        frag.clear_edges();
        assert_eq!(frag.out_edge_num(), 0);
        assert_eq!(frag.outer_vertices_num(), 0);
        assert_eq!(frag.alive_outer_num(), 0);
        assert_eq!(frag.inner_vertices_num(), 2);
        assert_eq!(frag.alive_inner_num(), 2);
    }
}
