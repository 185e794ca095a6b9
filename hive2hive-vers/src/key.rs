use serde::{Deserialize, Serialize};
use std::fmt;

/// A 160-bit version identifier. `ZERO` is the sentinel "root version" that
/// every lineage DAG is rooted at (top-level spec §4.6, rule 2).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct VersionKey(pub [u8; 20]);

impl VersionKey {
    pub const ZERO: VersionKey = VersionKey([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        VersionKey(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == VersionKey::ZERO
    }

    /// Derives a version key from a payload and its lineage reference.
    /// Content-addressing, not a cryptographic commitment (choice of hash
    /// primitive is explicitly out of scope); two puts of identical content
    /// on top of the same `based_on` collide to the same version key, which
    /// callers that need distinct versions for distinct puts should avoid by
    /// varying the payload.
    pub fn derive(payload: &[u8], based_on: &VersionKey) -> Self {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &b in payload.iter().chain(based_on.0.iter()) {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        }
        VersionKey::from_seed(hash)
    }

    /// Deterministic stand-in for content-derived version keys, which in a
    /// full implementation would be hashes of the signed payload.
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 20];
        let mut state = seed ^ 0xC2B2_AE3D_27D4_EB4F;
        for chunk in bytes.chunks_mut(8) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let le = state.to_le_bytes();
            chunk.copy_from_slice(&le[..chunk.len()]);
        }
        VersionKey(bytes)
    }
}

impl fmt::Debug for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "VersionKey(ZERO)");
        }
        write!(f, "VersionKey(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
