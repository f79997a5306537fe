use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Mutex;

use dashmap::DashMap;
use rustc_hash::FxHasher;

use crate::types::id_codec::IdParser;

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Deterministic, stateless mapping from object id to owning fragment.
///
/// Every worker constructs its own copy with the same fragment count, so
/// all workers agree on vertex ownership without coordination. The hash is
/// FxHasher, which is stable across processes and platforms.
#[derive(Debug, Clone, Copy)]
pub struct HashPartitioner {
    fnum: u32,
}

impl HashPartitioner {
    pub fn new(fnum: u32) -> Self {
        assert!(fnum > 0, "fragment count must be positive");
        Self { fnum }
    }

    pub fn fnum(&self) -> u32 {
        self.fnum
    }

    /// Returns the fragment owning `oid`.
    pub fn partition(&self, oid: u64) -> u32 {
        let mut hasher = FxHasher::default();
        oid.hash(&mut hasher);
        (hasher.finish() % self.fnum as u64) as u32
    }
}

/// Bidirectional mapping between application object ids and dense global
/// vertex ids.
///
/// The forward table (oid to gid) is shared and read by every worker
/// thread; assignment of new local offsets goes through one mutex per
/// fragment, the single authority for that fragment's offset sequence.
/// Workers only ever assign offsets for vertices the partitioner places on
/// them, so no cross-partition coordination is needed: two workers that
/// independently admit the same oid agree on the owning fragment, and the
/// owner's offset sequence decides the gid.
pub struct VertexIdMap {
    partitioner: HashPartitioner,
    id_parser: IdParser,
    forward: FxDashMap<u64, u64>,
    reverse: Vec<Mutex<Vec<u64>>>,
}

impl VertexIdMap {
    /// Creates an empty map for a deployment of `fnum` fragments.
    pub fn new(fnum: u32) -> Self {
        let reverse = (0..fnum).map(|_| Mutex::new(Vec::new())).collect();
        Self {
            partitioner: HashPartitioner::new(fnum),
            id_parser: IdParser::new(fnum),
            forward: FxDashMap::default(),
            reverse,
        }
    }

    pub fn partitioner(&self) -> &HashPartitioner {
        &self.partitioner
    }

    pub fn id_parser(&self) -> &IdParser {
        &self.id_parser
    }

    pub fn fnum(&self) -> u32 {
        self.partitioner.fnum()
    }

    /// Admits an object id, assigning a fresh gid if it was unseen.
    ///
    /// # Returns
    /// * `(gid, true)` if the vertex was newly admitted.
    /// * `(gid, false)` if it was already registered.
    pub fn add_vertex(&self, oid: u64) -> (u64, bool) {
        // Fast path: already registered.
        if let Some(gid) = self.forward.get(&oid) {
            return (*gid, false);
        }

        let fid = self.partitioner.partition(oid);
        let mut table = self.reverse[fid as usize].lock().unwrap();
        // Re-check under the assignment lock; another thread may have won
        // the race between the fast path and here.
        if let Some(gid) = self.forward.get(&oid) {
            return (*gid, false);
        }

        let local_offset = table.len() as u64;
        let gid = self.id_parser.encode(fid, local_offset);
        table.push(oid);
        self.forward.insert(oid, gid);
        (gid, true)
    }

    /// Looks up the gid of an already-registered object id.
    pub fn get_gid(&self, oid: u64) -> Option<u64> {
        self.forward.get(&oid).map(|gid| *gid)
    }

    /// Reverse lookup: the object id behind a gid, if one was registered.
    pub fn get_oid(&self, gid: u64) -> Option<u64> {
        let (fid, local_offset) = self.id_parser.decode(gid);
        if fid >= self.fnum() {
            return None;
        }
        let table = self.reverse[fid as usize].lock().unwrap();
        table.get(local_offset as usize).copied()
    }

    /// Number of vertex slots assigned so far to the given fragment.
    ///
    /// The fragment reads this during mutation to size newly admitted
    /// inner ranges.
    pub fn inner_vertex_count(&self, fid: u32) -> u64 {
        self.reverse[fid as usize].lock().unwrap().len() as u64
    }

    /// Total number of registered vertices across all fragments.
    pub fn total_vertex_count(&self) -> u64 {
        self.forward.len() as u64
    }
}
