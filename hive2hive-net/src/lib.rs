#![allow(dead_code)]

// Client-server and server-server networking: the wire-framing side of the
// "DHT overlay (external)" collaborator (top-level spec §6). Full overlay
// routing/bootstrap is explicitly out of scope (§1 Non-goals); what's here
// is the message shape a real transport would carry, plus an in-memory
// `MockOverlay` that enforces the protection/lineage rules a real overlay's
// receiver side would (§4.6, rule 3: "rejected at the receiver with no
// state change"), so the contract in hive2hive-dht is testable without one.

mod msg;
mod overlay;
mod tuple;

pub use msg::{DhtOp, IOQueues, Msg, Node, NodeID, RecvMsg};
pub use overlay::{MockOverlay, Overlay, PutOutcome, StoredEntry};
pub use tuple::DhtTuple;
