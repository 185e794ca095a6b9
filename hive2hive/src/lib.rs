//! The `hive2hive` façade: a session (root path, profile, DHT client), a
//! `Config`, the real local-filesystem `RecursionPlanner`, and the
//! `IFileManager`-style `FileManager` that turns each façade call into a
//! process-framework pipeline (top-level spec §6).

mod config;
mod facade;
mod planner;
mod session;

pub use config::Config;
pub use facade::{FileManager, OperationHandle};
pub use planner::LocalRecursionPlanner;
pub use session::Session;
