use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::fragment::mutable_csr::{CsrBuilder, MutableCsr};
use crate::fragment::Fragment;
use crate::partition::VertexIdMap;
use crate::types::{LoadStrategy, Nbr};
use crate::util::generate_timestamp_us;

/// A compacted image of one CSR: per-head offsets plus the flattened
/// neighbor entries, spare capacity and tombstone holes squeezed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrImage<E> {
    offsets: Vec<u64>,
    nbrs: Vec<Nbr<E>>,
}

impl<E: Clone + Default> CsrImage<E> {
    fn capture(csr: &MutableCsr<E>) -> Self {
        let mut offsets = Vec::with_capacity(csr.head_num() + 1);
        let mut nbrs = Vec::with_capacity(csr.edge_num());
        offsets.push(0);
        for head in 0..csr.head_num() {
            nbrs.extend_from_slice(csr.get(head));
            offsets.push(nbrs.len() as u64);
        }
        Self { offsets, nbrs }
    }

    fn rebuild(&self) -> MutableCsr<E> {
        let head_num = self.offsets.len().saturating_sub(1);
        let mut builder = CsrBuilder::new(head_num);
        for head in 0..head_num {
            let degree = (self.offsets[head + 1] - self.offsets[head]) as usize;
            for _ in 0..degree {
                builder.inc_degree(head);
            }
        }
        let mut csr = builder.build();
        for head in 0..head_num {
            let begin = self.offsets[head] as usize;
            let end = self.offsets[head + 1] as usize;
            for nbr in &self.nbrs[begin..end] {
                csr.add_edge(head, nbr.clone());
            }
        }
        // Entries were captured from sorted ranges, so the ordering
        // contract already holds.
        csr
    }
}

/// Full state of one fragment, sufficient for an external serializer to
/// round-trip it exactly: CSR arrays, outer gid table, liveness bitsets,
/// vertex data and counters.
///
/// The byte layout on disk is bincode over this struct; the
/// `{prefix}.frag.{fid}` file naming keeps one file per partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentSnapshot<V, E> {
    pub created_at_us: u64,
    fid: u32,
    fnum: u32,
    directed: bool,
    load_strategy: LoadStrategy,
    ivnum: u64,
    ovnum: u64,
    alive_ivnum: u64,
    alive_ovnum: u64,
    iv_alive: Vec<bool>,
    ov_alive: Vec<bool>,
    ovgid: Vec<u64>,
    ivdata: Vec<V>,
    ovdata: Vec<V>,
    oe: CsrImage<E>,
    ie: CsrImage<E>,
    selfloops: Vec<u64>,
}

impl<V, E> FragmentSnapshot<V, E> {
    pub fn fid(&self) -> u32 {
        self.fid
    }

    pub fn fnum(&self) -> u32 {
        self.fnum
    }
}

fn snapshot_path(prefix: &str, fid: u32) -> PathBuf {
    PathBuf::from(format!("{}.frag.{}", prefix, fid))
}

impl<V, E> Fragment<V, E>
where
    V: Clone + Default + Serialize + DeserializeOwned,
    E: Clone + Default + Serialize + DeserializeOwned,
{
    /// Captures the full fragment state.
    pub fn snapshot(&self) -> FragmentSnapshot<V, E> {
        FragmentSnapshot {
            created_at_us: generate_timestamp_us(),
            fid: self.fid,
            fnum: self.fnum,
            directed: self.directed,
            load_strategy: self.load_strategy,
            ivnum: self.ivnum,
            ovnum: self.ovnum,
            alive_ivnum: self.alive_ivnum,
            alive_ovnum: self.alive_ovnum,
            iv_alive: self.iv_alive.clone(),
            ov_alive: self.ov_alive.clone(),
            ovgid: self.ovgid.clone(),
            ivdata: self.ivdata.clone(),
            ovdata: self.ovdata.clone(),
            oe: CsrImage::capture(&self.oe),
            ie: CsrImage::capture(&self.ie),
            selfloops: self.selfloops.iter().copied().collect(),
        }
    }

    /// Reconstructs a fragment from a snapshot.
    ///
    /// # Panics
    /// * Panics if `vertex_map` was built for a different fragment count
    ///   than the snapshot records; the id encoding would not line up.
    pub fn restore(
        snapshot: FragmentSnapshot<V, E>,
        vertex_map: Arc<VertexIdMap>,
        config: EngineConfig,
    ) -> Self {
        assert_eq!(
            vertex_map.fnum(),
            snapshot.fnum,
            "vertex map fragment count does not match the snapshot"
        );
        let id_parser = *vertex_map.id_parser();

        // Rebuild the gid-to-lid mirror map from the gid table; outer lids
        // descend from the top of the local id space in registration order.
        let mut ovg2i = FxHashMap::default();
        for (idx, &gid) in snapshot.ovgid.iter().enumerate() {
            ovg2i.insert(gid, id_parser.max_local_id() - idx as u64 - 1);
        }

        let mut frag = Self {
            fid: snapshot.fid,
            fnum: snapshot.fnum,
            directed: snapshot.directed,
            load_strategy: snapshot.load_strategy,
            id_parser,
            vertex_map,
            config,
            ivnum: snapshot.ivnum,
            ovnum: snapshot.ovnum,
            alive_ivnum: snapshot.alive_ivnum,
            alive_ovnum: snapshot.alive_ovnum,
            iv_alive: snapshot.iv_alive,
            ov_alive: snapshot.ov_alive,
            oe: snapshot.oe.rebuild(),
            ie: snapshot.ie.rebuild(),
            ovg2i,
            ovgid: snapshot.ovgid,
            ivdata: snapshot.ivdata,
            ovdata: snapshot.ovdata,
            selfloops: snapshot.selfloops.into_iter().collect::<FxHashSet<u64>>(),
            outer_vertices_of_frag: vec![Vec::new(); snapshot.fnum as usize],
        };
        frag.rebuild_outer_vertices_of_frag();
        frag
    }

    /// Writes the fragment's snapshot to `{prefix}.frag.{fid}`.
    pub fn save_to_file(&self, prefix: &str) -> Result<PathBuf, Error> {
        let path = snapshot_path(prefix, self.fid);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.snapshot())
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        writer.flush()?;
        debug!(fid = self.fid, path = %path.display(), "fragment snapshot written");
        Ok(path)
    }

    /// Loads the fragment persisted for `fid` under `prefix`.
    ///
    /// The file is memory-mapped and decoded in one pass.
    pub fn load_from_file<P: AsRef<Path>>(
        prefix: P,
        fid: u32,
        vertex_map: Arc<VertexIdMap>,
        config: EngineConfig,
    ) -> Result<Self, Error> {
        let path = snapshot_path(prefix.as_ref().to_string_lossy().as_ref(), fid);
        let file = OpenOptions::new().read(true).open(&path)?;
        let mem_map = unsafe { Mmap::map(&file)? };
        let snapshot: FragmentSnapshot<V, E> = bincode::deserialize(&mem_map[..])
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        Ok(Self::restore(snapshot, vertex_map, config))
    }
}
