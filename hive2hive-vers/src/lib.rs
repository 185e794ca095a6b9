#![allow(dead_code)]

// Versioning, history, provenance: the version-lineage side of the
// protected-entry DHT contract (top-level spec §3, "DHT Entry (CORE-B)").
//
// Every DHT entry's value carries an optional `basedOn` reference to the
// version it was derived from. Across all puts to one (location, domain,
// content) tuple this traces out a DAG rooted at the sentinel ZERO version.
// We additionally remember each version's insertion order per tuple, since
// `removeRange` needs a notion of "between these two versions" and the
// DAG alone doesn't give us one when branches exist.

mod graph;
mod key;

pub use graph::VersionGraph;
pub use key::VersionKey;
