use serde::{Deserialize, Serialize};
use std::fmt;

/// A 160-bit identifier, the same width as the DHT's location/domain/content
/// keys (see hive2hive-vers), used here to name a file or folder in the
/// user profile independently of its path.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct FileKey(pub [u8; 20]);

impl FileKey {
    pub const fn new(bytes: [u8; 20]) -> Self {
        FileKey(bytes)
    }

    /// Derives a key from an arbitrary seed. Real profile keys are produced
    /// by hashing file content/metadata (owned by the chunk cipher, out of
    /// scope here); this is the deterministic stand-in fixtures and tests use.
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 20];
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        for chunk in bytes.chunks_mut(8) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let le = state.to_le_bytes();
            chunk.copy_from_slice(&le[..chunk.len()]);
        }
        FileKey(bytes)
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileKey(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
