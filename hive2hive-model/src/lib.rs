#![allow(dead_code)]

// Shared domain model: file-tree paths, the opaque keys used to address
// both profile entries and DHT content, and the small "what's on disk vs
// what the DHT already knows about" profile snapshot that process-framework
// steps read from and the facade writes to.

mod key;
mod path;
mod profile;
mod recursion;

pub use key::FileKey;
pub use path::Path;
pub use profile::{FileIndex, FileIndexKind, InMemoryProfileManager, ProfileManager, UserProfile};
pub use recursion::{postorder, RecursionPlanner};
