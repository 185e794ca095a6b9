use serde::{Deserialize, Serialize};

/// The address of a DHT entry, minus its version (top-level spec §3:
/// "Addressed by the tuple (locationKey, domainKey, contentKey,
/// versionKey)"). Kept separate from the version key because most
/// operations (protection checks, lineage) are scoped per-tuple across all
/// of its versions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct DhtTuple {
    pub location: [u8; 20],
    pub domain: [u8; 20],
    pub content: [u8; 20],
}

impl DhtTuple {
    pub const fn new(location: [u8; 20], domain: [u8; 20], content: [u8; 20]) -> Self {
        DhtTuple {
            location,
            domain,
            content,
        }
    }
}
