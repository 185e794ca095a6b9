use crate::component::ProcessComponent;
use crate::composite::{Policy, ProcessComposite};
use crate::context::{Context, Permission};
use crate::steps::{
    DeleteFileStep, GetFileListStep, MoveFileStep, NewFileStep, RecoverFileStep, ShareStep,
    UpdateFileStep, VersionSelector,
};
use hive2hive_auth::{KeyPair, OwnerKey};
use hive2hive_base::{kind_err, Kind, Result};
use hive2hive_dht::ProtectedEntryClient;
use hive2hive_model::{FileIndex, FileIndexKind, FileKey, Path, ProfileManager, RecursionPlanner};
use hive2hive_net::MockOverlay;
use hive2hive_vers::VersionKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_FIXTURE_KEY: AtomicU64 = AtomicU64::new(1);

/// The concrete overlay CORE-A's steps talk to. Real overlay routing is out
/// of scope (§1 Non-goals) and `MockOverlay` is the only `Overlay`
/// implementation in this codebase, so the steps and factory are written
/// against it directly rather than staying generic over `Overlay`.
pub type DhtClient = Arc<ProtectedEntryClient<MockOverlay>>;

/// TTL and retry policy every step's `ProtectedEntryClient` call honors,
/// threaded down from configuration (top-level spec's "(expansion)
/// Configuration") rather than each call site hardcoding `None`/no-retry.
#[derive(Clone, Copy, Debug)]
pub struct DhtPolicy {
    pub ttl: Option<Duration>,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for DhtPolicy {
    fn default() -> Self {
        DhtPolicy {
            ttl: None,
            timeout: Duration::from_secs(5),
            retries: 0,
        }
    }
}

/// A fully assembled pipeline: a root composite plus the context its steps
/// share (top-level spec §4.4, "ProcessFactory and pipelines").
pub struct Pipeline {
    pub root: Arc<ProcessComposite>,
    pub context: Context,
}

impl Pipeline {
    pub fn run(&self) -> Result<()> {
        self.root.start(&self.context)
    }
}

/// Builds the concrete composite of steps for each user-visible operation
/// (top-level spec §4.4). Depends only on collaborators reachable without
/// circular crate dependencies: the user profile manager and a recursion
/// planner (both external collaborators, §6).
pub struct ProcessFactory {
    profile: Arc<dyn ProfileManager>,
    planner: Arc<dyn RecursionPlanner>,
    session_root: Path,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
}

impl ProcessFactory {
    pub fn new(
        profile: Arc<dyn ProfileManager>,
        planner: Arc<dyn RecursionPlanner>,
        session_root: Path,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Self {
        ProcessFactory {
            profile,
            planner,
            session_root,
            dht,
            keypair,
            policy,
        }
    }

    fn index_for(&self, path: &Path, is_folder: bool) -> FileIndex {
        FileIndex {
            key: FileKey::from_seed(NEXT_FIXTURE_KEY.fetch_add(1, Ordering::Relaxed)),
            path: path.clone(),
            kind: if is_folder {
                FileIndexKind::Folder
            } else {
                FileIndexKind::File { chunks: Vec::new() }
            },
        }
    }

    /// `add(file)`: preorder composite of new-file steps so parents exist
    /// before children; a single step for a plain file or empty directory.
    pub fn add(&self, root_path: Path, is_folder: bool) -> Result<Pipeline> {
        let composite = ProcessComposite::new(Policy::Sequential);
        let paths = if is_folder {
            self.planner.preorder(&root_path)?
        } else {
            vec![root_path.clone()]
        };
        if paths.is_empty() {
            composite.push_child(NewFileStep::new(
                self.index_for(&root_path, is_folder),
                Arc::clone(&self.profile),
                Arc::clone(&self.dht),
                Arc::clone(&self.keypair),
                self.policy,
            ))?;
        } else {
            // The planner only names paths, not their kind; every entry but
            // the walked root itself is a folder by construction (a real
            // leaf file wouldn't recurse further), and the root matches the
            // caller's `is_folder`.
            for path in &paths {
                let folder = *path != root_path || is_folder;
                composite.push_child(NewFileStep::new(
                    self.index_for(path, folder),
                    Arc::clone(&self.profile),
                    Arc::clone(&self.dht),
                    Arc::clone(&self.keypair),
                    self.policy,
                ))?;
            }
        }
        Ok(Pipeline {
            root: composite,
            context: Context::new(),
        })
    }

    /// `update(file)`: rejects folders; single update-file step.
    pub fn update(&self, key: FileKey, new_chunks: Vec<FileKey>) -> Result<Pipeline> {
        let snapshot = self.profile.snapshot()?;
        let existing = snapshot
            .by_key(key)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such file to update"))?;
        if existing.is_folder() {
            return Err(kind_err(Kind::IllegalArgument, "cannot update a folder"));
        }
        let composite = ProcessComposite::new(Policy::Sequential);
        composite.push_child(UpdateFileStep::new(
            key,
            new_chunks,
            Arc::clone(&self.profile),
            Arc::clone(&self.dht),
            Arc::clone(&self.keypair),
            self.policy,
        ))?;
        Ok(Pipeline {
            root: composite,
            context: Context::new(),
        })
    }

    /// `move(src,dst)`: single move-file step.
    pub fn mv(&self, key: FileKey, destination: Path) -> Result<Pipeline> {
        let composite = ProcessComposite::new(Policy::Sequential);
        composite.push_child(MoveFileStep::new(
            key,
            destination,
            Arc::clone(&self.profile),
            Arc::clone(&self.dht),
            Arc::clone(&self.keypair),
            self.policy,
        ))?;
        Ok(Pipeline {
            root: composite,
            context: Context::new(),
        })
    }

    /// `delete(file)`: postorder composite so children vanish before
    /// parents; a single step for a plain file.
    pub fn delete(&self, root_path: Path, is_folder: bool) -> Result<Pipeline> {
        let composite = ProcessComposite::new(Policy::Sequential);
        let snapshot = self.profile.snapshot()?;
        let paths = if is_folder {
            hive2hive_model::postorder(self.planner.as_ref(), &root_path)?
        } else {
            vec![root_path.clone()]
        };
        for path in &paths {
            let key = snapshot
                .by_path(path)
                .map(|idx| idx.key)
                .ok_or_else(|| kind_err(Kind::FileNotFound, "no such file to delete"))?;
            composite.push_child(DeleteFileStep::new(
                key,
                Arc::clone(&self.profile),
                Arc::clone(&self.dht),
                Arc::clone(&self.keypair),
                self.policy,
            ))?;
        }
        Ok(Pipeline {
            root: composite,
            context: Context::new(),
        })
    }

    /// `recover(file, versionSelector)`: rejects folders and non-existent
    /// files; single recover-file step.
    pub fn recover(
        &self,
        key: FileKey,
        available: Vec<VersionKey>,
        selector: Arc<dyn VersionSelector>,
    ) -> Result<Pipeline> {
        let snapshot = self.profile.snapshot()?;
        let existing = snapshot
            .by_key(key)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such file to recover"))?;
        if existing.is_folder() {
            return Err(kind_err(Kind::IllegalArgument, "cannot recover a folder"));
        }
        let composite = ProcessComposite::new(Policy::Sequential);
        composite.push_child(RecoverFileStep::new(
            key,
            available,
            selector,
            Arc::clone(&self.dht),
            Arc::clone(&self.keypair),
            self.policy,
        ))?;
        Ok(Pipeline {
            root: composite,
            context: Context::new(),
        })
    }

    /// `share(folder, userId, permission)`: rejects non-folders, rejects a
    /// folder outside the session root, rejects the root itself.
    pub fn share(&self, folder: Path, user: OwnerKey, permission: Permission) -> Result<Pipeline> {
        let snapshot = self.profile.snapshot()?;
        let existing = snapshot
            .by_path(&folder)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such folder to share"))?;
        if !existing.is_folder() {
            return Err(kind_err(Kind::IllegalArgument, "can only share a folder"));
        }
        if folder == self.session_root {
            return Err(kind_err(Kind::IllegalFileLocation, "cannot share the session root"));
        }
        if !folder.is_strict_descendant_of(&self.session_root) {
            return Err(kind_err(
                Kind::IllegalFileLocation,
                "folder is outside the session root",
            ));
        }

        let composite = ProcessComposite::new(Policy::Sequential);
        composite.push_child(ShareStep::new(
            Arc::clone(&self.dht),
            Arc::clone(&self.keypair),
            self.policy,
        ))?;
        let ctx = Context::new();
        ctx.set_share_user(user)?;
        ctx.set_share_permission(permission)?;
        ctx.set_index(existing.clone())?;
        Ok(Pipeline {
            root: composite,
            context: ctx,
        })
    }

    /// `getFileList()`: result-bearing step producing the current list of
    /// known paths.
    pub fn get_file_list(&self) -> Pipeline {
        let composite = ProcessComposite::new(Policy::Sequential);
        let _ = composite.push_child(GetFileListStep::new(Arc::clone(&self.profile)));
        Pipeline {
            root: composite,
            context: Context::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hive2hive_model::{FileIndex, InMemoryProfileManager};
    use hive2hive_net::MockOverlay;
    use std::collections::BTreeMap;

    struct FixturePlanner(BTreeMap<Path, Vec<Path>>);

    impl RecursionPlanner for FixturePlanner {
        fn preorder(&self, root: &Path) -> Result<Vec<Path>> {
            Ok(self.0.get(root).cloned().unwrap_or_default())
        }
    }

    fn dht_fixture() -> (DhtClient, Arc<KeyPair>) {
        (
            Arc::new(ProtectedEntryClient::new(Arc::new(MockOverlay::new()))),
            Arc::new(KeyPair::generate()),
        )
    }

    #[test]
    fn add_single_file_produces_one_step() {
        let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
        let planner: Arc<dyn RecursionPlanner> = Arc::new(FixturePlanner(BTreeMap::new()));
        let (dht, keypair) = dht_fixture();
        let factory = ProcessFactory::new(profile, planner, Path::root(), dht, keypair, DhtPolicy::default());

        let pipeline = factory.add(Path::root().join("file.txt"), false).unwrap();
        assert_eq!(pipeline.root.child_count(), 1);
        pipeline.run().unwrap();
    }

    #[test]
    fn add_directory_builds_preorder_composite() {
        let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
        let root = Path::root().join("dir");
        let child = root.join("a");
        let mut fixture = BTreeMap::new();
        fixture.insert(root.clone(), vec![root.clone(), child.clone()]);
        let planner: Arc<dyn RecursionPlanner> = Arc::new(FixturePlanner(fixture));
        let (dht, keypair) = dht_fixture();
        let factory = ProcessFactory::new(profile, planner, Path::root(), dht, keypair, DhtPolicy::default());

        let pipeline = factory.add(root, true).unwrap();
        assert_eq!(pipeline.root.child_count(), 2);
        pipeline.run().unwrap();
    }

    #[test]
    fn share_rejects_the_session_root() {
        let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
        profile
            .apply(&mut |p| {
                p.insert(FileIndex {
                    key: FileKey::from_seed(10),
                    path: Path::root(),
                    kind: FileIndexKind::Folder,
                })
            })
            .unwrap();
        let planner: Arc<dyn RecursionPlanner> = Arc::new(FixturePlanner(BTreeMap::new()));
        let (dht, keypair) = dht_fixture();
        let factory = ProcessFactory::new(profile, planner, Path::root(), dht, keypair, DhtPolicy::default());

        let keypair = hive2hive_auth::KeyPair::generate();
        let err = factory
            .share(Path::root(), keypair.public(), Permission::Read)
            .unwrap_err();
        assert_eq!(err.kind(), Kind::IllegalFileLocation);
    }

    #[test]
    fn get_file_list_reports_the_current_profile() {
        let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
        let path = Path::root().join("x");
        profile
            .apply(&mut |p| {
                p.insert(FileIndex {
                    key: FileKey::from_seed(11),
                    path: path.clone(),
                    kind: FileIndexKind::Folder,
                })
            })
            .unwrap();
        let planner: Arc<dyn RecursionPlanner> = Arc::new(FixturePlanner(BTreeMap::new()));
        let (dht, keypair) = dht_fixture();
        let factory = ProcessFactory::new(profile, planner, Path::root(), dht, keypair, DhtPolicy::default());

        let pipeline = factory.get_file_list();
        pipeline.run().unwrap();
        assert_eq!(pipeline.context.file_list(), Some(vec![path]));
    }
}
