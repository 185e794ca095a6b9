#![allow(dead_code)]

// The client-side half of the protected-entry DHT contract (top-level spec
// §4.6, CORE-B). Signs on put, verifies on get, tracks version lineage
// through the `basedOn` reference, and drives protection-key transfer --
// delegating the actual storage and rule enforcement to an `Overlay`
// (hive2hive-net), which in production would be backed by the real
// structured-overlay routing this excerpt doesn't cover.

mod client;
mod handle;

pub use client::ProtectedEntryClient;
pub use handle::PendingResult;
