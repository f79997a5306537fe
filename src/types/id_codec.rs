use serde::{Deserialize, Serialize};

/// Encoder/decoder for the bit-packed global vertex id.
///
/// A gid is a `u64` holding `(fragment_id, local_offset)`: the fragment id
/// occupies the high `fid_bits` bits and the local offset the remaining low
/// bits. All shift/mask arithmetic lives here; no other module touches the
/// encoding directly.
///
/// `fid_bits` is the smallest width that can represent every fragment id,
/// so a two-fragment deployment spends one bit and leaves 63 bits of local
/// offset space. A single-fragment deployment spends zero bits and every
/// gid is its own local offset.
///
/// # Invariant
/// `decode(encode(fid, offset)) == (fid, offset)` for every
/// `fid < fnum` and `offset < max_local_id()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdParser {
    fnum: u32,
    fid_bits: u32,
    offset_bits: u32,
    offset_mask: u64,
}

impl IdParser {
    /// Builds a parser for a deployment of `fnum` fragments.
    ///
    /// # Panics
    /// * Panics if `fnum` is zero.
    pub fn new(fnum: u32) -> Self {
        assert!(fnum > 0, "fragment count must be positive");
        let fid_bits = if fnum <= 1 {
            0
        } else {
            32 - (fnum - 1).leading_zeros()
        };
        let offset_bits = 64 - fid_bits;
        let offset_mask = if fid_bits == 0 {
            u64::MAX
        } else {
            (1u64 << offset_bits) - 1
        };
        Self {
            fnum,
            fid_bits,
            offset_bits,
            offset_mask,
        }
    }

    /// Number of fragments this parser was built for.
    pub fn fnum(&self) -> u32 {
        self.fnum
    }

    /// Exclusive upper bound of the local offset space.
    ///
    /// Outer vertices are assigned local ids descending from this value, so
    /// it also bounds the combined inner + outer slot universe.
    pub fn max_local_id(&self) -> u64 {
        self.offset_mask
    }

    /// Packs `(fid, local_offset)` into a gid.
    pub fn encode(&self, fid: u32, local_offset: u64) -> u64 {
        debug_assert!(fid < self.fnum);
        debug_assert!(local_offset < self.max_local_id());
        ((fid as u64) << self.offset_bits) | local_offset
    }

    /// Extracts the owning fragment id from a gid.
    pub fn fragment_id(&self, gid: u64) -> u32 {
        if self.fid_bits == 0 {
            0
        } else {
            (gid >> self.offset_bits) as u32
        }
    }

    /// Extracts the local offset from a gid.
    pub fn local_id(&self, gid: u64) -> u64 {
        gid & self.offset_mask
    }

    /// Unpacks a gid into `(fid, local_offset)`.
    pub fn decode(&self, gid: u64) -> (u32, u64) {
        (self.fragment_id(gid), self.local_id(gid))
    }
}
