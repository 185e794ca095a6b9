use crate::config::Config;
use crate::session::Session;
use hive2hive_async::{AsyncWrapper, Handle, WorkerPool};
use hive2hive_base::{kind_err, Kind, Result};
use hive2hive_model::{FileKey, Path};
use hive2hive_process::{
    ComponentId, Context, DhtClient, DhtPolicy, Listener, ListenerId, Permission, ProcessComponent,
    ProcessFactory, RollbackReason, State, VersionSelector,
};
use hive2hive_vers::VersionKey;
use std::sync::Arc;

/// An in-flight or completed operation (top-level spec §6, "Facade
/// (IFileManager-style)"): every façade call returns one of these rather
/// than blocking. `await_result` blocks until terminal state and, for
/// result-bearing operations, yields the value the pipeline's context
/// produced.
pub struct OperationHandle<T> {
    component: Arc<dyn ProcessComponent>,
    wrapper: AsyncWrapper<T>,
    result: Handle<T>,
}

impl<T: Clone> OperationHandle<T> {
    pub fn id(&self) -> ComponentId {
        self.component.id()
    }

    pub fn state(&self) -> State {
        self.component.state()
    }

    pub fn progress(&self) -> f64 {
        self.component.core().progress()
    }

    pub fn attach_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.component.core().add_listener(listener)
    }

    pub fn detach_listener(&self, id: ListenerId) {
        self.component.core().remove_listener(id)
    }

    pub fn pause(&self) -> Result<()> {
        self.wrapper.pause()
    }

    pub fn resume(&self) -> Result<()> {
        self.wrapper.resume()
    }

    pub fn cancel(&self, reason: RollbackReason) -> Result<()> {
        self.wrapper.cancel(reason)
    }

    pub fn await_result(&self) -> Result<T> {
        self.result.wait()
    }
}

/// The `IFileManager`-style façade (top-level spec §6): builds a pipeline
/// via the `ProcessFactory` for each user-visible operation, enforces the
/// precondition guards the façade owns synchronously (P8: add outside
/// root, share of/outside root), and submits the result to a worker pool.
pub struct FileManager {
    session_root: Path,
    factory: ProcessFactory,
    dht: DhtClient,
    pool: WorkerPool,
}

impl FileManager {
    pub fn new(session: &Session, config: &Config) -> Self {
        let policy = DhtPolicy {
            ttl: Some(config.default_ttl()),
            timeout: config.dht_timeout(),
            retries: config.dht_retries,
        };
        FileManager {
            session_root: session.root.clone(),
            factory: ProcessFactory::new(
                Arc::clone(&session.profile),
                Arc::clone(&session.planner),
                session.root.clone(),
                Arc::clone(&session.dht),
                Arc::clone(&session.keypair),
                policy,
            ),
            dht: Arc::clone(&session.dht),
            pool: WorkerPool::new(config.worker_pool_size),
        }
    }

    fn require_inside_root(&self, path: &Path) -> Result<()> {
        if *path == self.session_root || path.is_strict_descendant_of(&self.session_root) {
            Ok(())
        } else {
            Err(kind_err(
                Kind::IllegalFileLocation,
                "path is outside the session root",
            ))
        }
    }

    /// Every operation below composes into at least one DHT round trip
    /// (§4.6); this is the synchronous precondition check the façade owns
    /// before ever building a pipeline (top-level spec §6, `NoPeerConnection`).
    fn require_connected(&self) -> Result<()> {
        if self.dht.is_reachable() {
            Ok(())
        } else {
            Err(kind_err(Kind::NoPeerConnection, "dht overlay is unreachable"))
        }
    }

    fn submit<T: Send + 'static>(
        &self,
        root: Arc<dyn ProcessComponent>,
        context: Context,
        extract: impl Fn(&Context) -> T + Send + Sync + 'static,
    ) -> OperationHandle<T> {
        let wrapper = AsyncWrapper::new(Arc::clone(&root), context, extract);
        let result = wrapper.start(&self.pool);
        OperationHandle {
            component: root,
            wrapper,
            result,
        }
    }

    pub fn add(&self, path: Path, is_folder: bool) -> Result<OperationHandle<()>> {
        self.require_inside_root(&path)?;
        self.require_connected()?;
        let pipeline = self.factory.add(path, is_folder)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn update(&self, key: FileKey, new_chunks: Vec<FileKey>) -> Result<OperationHandle<()>> {
        self.require_connected()?;
        let pipeline = self.factory.update(key, new_chunks)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn mv(&self, key: FileKey, destination: Path) -> Result<OperationHandle<()>> {
        self.require_inside_root(&destination)?;
        self.require_connected()?;
        let pipeline = self.factory.mv(key, destination)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn delete(&self, path: Path, is_folder: bool) -> Result<OperationHandle<()>> {
        self.require_inside_root(&path)?;
        self.require_connected()?;
        let pipeline = self.factory.delete(path, is_folder)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn recover(
        &self,
        key: FileKey,
        available: Vec<VersionKey>,
        selector: Arc<dyn VersionSelector>,
    ) -> Result<OperationHandle<()>> {
        self.require_connected()?;
        let pipeline = self.factory.recover(key, available, selector)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn share(
        &self,
        folder: Path,
        user: hive2hive_auth::OwnerKey,
        permission: Permission,
    ) -> Result<OperationHandle<()>> {
        self.require_connected()?;
        let pipeline = self.factory.share(folder, user, permission)?;
        Ok(self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |_ctx| ()))
    }

    pub fn get_file_list(&self) -> OperationHandle<Option<Vec<Path>>> {
        let pipeline = self.factory.get_file_list();
        self.submit(pipeline.root as Arc<dyn ProcessComponent>, pipeline.context, |ctx| ctx.file_list())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::planner::LocalRecursionPlanner;
    use hive2hive_base::Kind;

    fn manager() -> (Session, Config) {
        let planner = Arc::new(LocalRecursionPlanner::new(std::env::temp_dir()));
        (Session::new(Path::root(), planner), Config::default())
    }

    #[test]
    fn add_fails_fast_when_the_overlay_is_unreachable() {
        let (session, config) = manager();
        session.overlay.set_reachable(false);
        let manager = FileManager::new(&session, &config);

        let err = manager.add(Path::root().join("a"), false).unwrap_err();
        assert_eq!(err.kind(), Kind::NoPeerConnection);
    }

    #[test]
    fn add_succeeds_once_reconnected() {
        let (session, config) = manager();
        session.overlay.set_reachable(false);
        session.overlay.set_reachable(true);
        let manager = FileManager::new(&session, &config);

        let handle = manager.add(Path::root().join("a"), false).unwrap();
        handle.await_result().unwrap();
    }
}
