use hive2hive_auth::KeyPair;
use hive2hive_base::{kind_err, Kind, Result};
use hive2hive_dht::ProtectedEntryClient;
use hive2hive_model::{InMemoryProfileManager, Path, ProfileManager, RecursionPlanner};
use hive2hive_net::MockOverlay;
use std::sync::Arc;

/// The session/root the facade operates against (top-level spec §6,
/// "Session / File root"): root path, profile manager handle, data manager
/// (DHT client) handle, and the local keypair every mutation is signed
/// with. There is no persisted state owned by the core itself (§6) -- the
/// profile lives in the DHT and the local file tree.
pub struct Session {
    pub root: Path,
    pub profile: Arc<dyn ProfileManager>,
    pub planner: Arc<dyn RecursionPlanner>,
    pub dht: Arc<ProtectedEntryClient<MockOverlay>>,
    pub overlay: Arc<MockOverlay>,
    pub keypair: Arc<KeyPair>,
}

impl Session {
    pub fn new(root: Path, planner: Arc<dyn RecursionPlanner>) -> Self {
        let overlay = Arc::new(MockOverlay::new());
        Session {
            root,
            profile: Arc::new(InMemoryProfileManager::new()),
            planner,
            dht: Arc::new(ProtectedEntryClient::new(Arc::clone(&overlay))),
            overlay,
            keypair: Arc::new(KeyPair::generate()),
        }
    }

    /// Establishes a session rooted at `fs_root` on the local filesystem.
    /// There's no session without a real directory to back it (top-level
    /// spec §6, `NoSession`): a session is the binding between a local file
    /// tree and a DHT identity, and that binding can't exist if the local
    /// side doesn't.
    pub fn open(root: Path, fs_root: &std::path::Path, planner: Arc<dyn RecursionPlanner>) -> Result<Self> {
        if !fs_root.is_dir() {
            return Err(kind_err(
                Kind::NoSession,
                format!("no session: {} is not a directory", fs_root.display()),
            ));
        }
        Ok(Session::new(root, planner))
    }
}
