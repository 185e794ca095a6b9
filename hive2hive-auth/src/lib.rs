#![allow(dead_code)]

// Authentication, authorization, endorsement, signatures: the half of
// the protected-entry DHT contract (top-level spec §4.6) that binds a
// mutation to an owning keypair, independent of where the entry is stored
// or how its version lineage is tracked (see hive2hive-vers).

mod key;
mod sign;

pub use key::{KeyPair, OwnerKey};
pub use sign::{signed_message, Signature, SignedEnvelope};
