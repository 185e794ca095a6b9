use crate::component::{ComponentCore, ProcessComponent};
use crate::composite::{Policy, ProcessComposite};
use crate::context::{Context, Permission};
use crate::factory::{DhtClient, DhtPolicy};
use crate::rollback::RollbackReason;
use hive2hive_auth::KeyPair;
use hive2hive_base::{kind_err, Kind, Result};
use hive2hive_model::{FileIndex, FileIndexKind, ProfileManager};
use hive2hive_net::{DhtTuple, PutOutcome};
use hive2hive_vers::VersionKey;
use std::sync::{Arc, Weak};

/// Every file's (or folder's) meta document lives at a tuple addressed by
/// its `FileKey` bytes as the location, under one fixed domain -- there's
/// only one kind of entry CORE-A's steps ever put (top-level spec §4.6: the
/// content key only matters once real chunk-addressed storage exists, which
/// is out of scope, §1).
pub const META_DOMAIN: [u8; 20] = [b'm'; 20];
pub const META_CONTENT: [u8; 20] = [0u8; 20];

pub fn meta_tuple(key: hive2hive_model::FileKey) -> DhtTuple {
    DhtTuple::new(key.0, META_DOMAIN, META_CONTENT)
}

pub fn encode_index(index: &FileIndex) -> Result<Vec<u8>> {
    rmp_serde::to_vec(index).map_err(|e| kind_err(Kind::Other, format!("encoding meta document: {e}")))
}

fn decode_index(bytes: &[u8]) -> Result<FileIndex> {
    rmp_serde::from_slice(bytes).map_err(|e| kind_err(Kind::Other, format!("decoding meta document: {e}")))
}

fn expect_stored(outcome: PutOutcome) -> Result<()> {
    match outcome {
        PutOutcome::Stored => Ok(()),
        other => Err(kind_err(
            Kind::IllegalArgument,
            format!("dht put rejected: {other:?}"),
        )),
    }
}

/// Retries a `ProtectedEntryClient` round trip up to `policy.retries` times
/// on failure (top-level spec's "(expansion) Configuration", `dht_retries`).
/// Runs at least once regardless of `retries`.
fn with_retries<T>(retries: u32, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last_err = None;
    for _ in 0..=retries {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

/// A leaf whose only job is to look up a path (or key) in the user profile
/// and record the resulting index in the context, representative of the
/// top-level spec's §4.5 "FindInUserProfile" step.
pub struct FindInUserProfile {
    core: ComponentCore,
    profile: Arc<dyn ProfileManager>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
    parent: Weak<ProcessComposite>,
}

impl FindInUserProfile {
    pub fn new(
        profile: Arc<dyn ProfileManager>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
        parent: &Arc<ProcessComposite>,
    ) -> Arc<Self> {
        Arc::new(FindInUserProfile {
            core: ComponentCore::new(),
            profile,
            dht,
            keypair,
            policy,
            parent: Arc::downgrade(parent),
        })
    }
}

impl ProcessComponent for FindInUserProfile {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        let key = ctx
            .file_key()
            .ok_or_else(|| kind_err(Kind::InvalidState, "FindInUserProfile needs a fileKey"))?;
        let snapshot = self.profile.snapshot()?;
        let index = snapshot
            .by_key(key)
            .cloned()
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such file in the user profile"))?;

        let parent = self
            .parent
            .upgrade()
            .ok_or_else(|| kind_err(Kind::InvalidState, "parent composite is gone"))?;

        // Extend the pipeline at runtime based on what was found, the
        // general shape illustrated by §4.5.
        if index.is_folder() {
            parent.push_child(CreateFolder::new(
                index.clone(),
                Arc::clone(&self.dht),
                Arc::clone(&self.keypair),
                self.policy,
            ))?;
        } else {
            parent.push_child(GetMetaDocument::new(index.key, Arc::clone(&self.dht), self.policy))?;
            parent.push_child(DownloadChunks::new())?;
        }

        ctx.set_index(index)?;
        Ok(())
    }
}

/// Ensures a folder's DHT entry exists. Scheduled by `FindInUserProfile`
/// when the looked-up index is a folder; idempotent under the same owner,
/// since re-putting identical content at the same `based_on` just derives
/// the same version key.
pub struct CreateFolder {
    core: ComponentCore,
    index: FileIndex,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
}

impl CreateFolder {
    pub fn new(index: FileIndex, dht: DhtClient, keypair: Arc<KeyPair>, policy: DhtPolicy) -> Arc<Self> {
        Arc::new(CreateFolder {
            core: ComponentCore::new(),
            index,
            dht,
            keypair,
            policy,
        })
    }
}

impl ProcessComponent for CreateFolder {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        let payload = encode_index(&self.index)?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht
                .put(
                    meta_tuple(self.index.key),
                    &self.keypair,
                    payload.clone(),
                    VersionKey::ZERO,
                    None,
                    self.policy.ttl,
                )
                .wait_timeout(self.policy.timeout)
        })?;
        expect_stored(outcome)
    }
}

/// Fetches the chunk-list metadata document for a file, verifying it's
/// still present and correctly signed at its tuple. The document itself was
/// already loaded from the local profile by `FindInUserProfile`; this step
/// is the DHT round trip that confirms the two agree, not a second source
/// of truth for `ctx.index()`.
pub struct GetMetaDocument {
    core: ComponentCore,
    key: hive2hive_model::FileKey,
    dht: DhtClient,
    policy: DhtPolicy,
}

impl GetMetaDocument {
    pub fn new(key: hive2hive_model::FileKey, dht: DhtClient, policy: DhtPolicy) -> Arc<Self> {
        Arc::new(GetMetaDocument {
            core: ComponentCore::new(),
            key,
            dht,
            policy,
        })
    }
}

impl ProcessComponent for GetMetaDocument {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        let (payload, _owner) = with_retries(self.policy.retries, || {
            self.dht.get(meta_tuple(self.key), None).wait_timeout(self.policy.timeout)
        })?;
        decode_index(&payload)?;
        Ok(())
    }
}

/// A placeholder leaf producing the chunk list for download. Chunking and
/// encryption are the chunk cipher's job (out of scope, §1); this step only
/// reads the chunk key list `GetMetaDocument` already confirmed is current,
/// it does not fetch chunk content itself.
pub struct DownloadChunks {
    core: ComponentCore,
}

impl DownloadChunks {
    pub fn new() -> Arc<Self> {
        Arc::new(DownloadChunks {
            core: ComponentCore::new(),
        })
    }
}

impl ProcessComponent for DownloadChunks {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        let index = ctx
            .index()
            .ok_or_else(|| kind_err(Kind::InvalidState, "DownloadChunks needs an index"))?;
        if let FileIndexKind::File { chunks } = index.kind {
            ctx.set_chunks(chunks)
        } else {
            Ok(())
        }
    }
}

/// Writes a new file's index into the user profile and its meta document
/// into the DHT. Used by the `add` pipeline for each path in preorder
/// (§4.4).
pub struct NewFileStep {
    core: ComponentCore,
    index: FileIndex,
    profile: Arc<dyn ProfileManager>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
}

impl NewFileStep {
    pub fn new(
        index: FileIndex,
        profile: Arc<dyn ProfileManager>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Arc<Self> {
        Arc::new(NewFileStep {
            core: ComponentCore::new(),
            index,
            profile,
            dht,
            keypair,
            policy,
        })
    }
}

impl ProcessComponent for NewFileStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        self.profile.apply(&mut |profile| {
            profile.insert(self.index.clone());
        })?;
        let payload = encode_index(&self.index)?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht
                .put(
                    meta_tuple(self.index.key),
                    &self.keypair,
                    payload.clone(),
                    VersionKey::ZERO,
                    None,
                    self.policy.ttl,
                )
                .wait_timeout(self.policy.timeout)
        })?;
        expect_stored(outcome)
    }

    fn do_rollback(&self, _ctx: &Context, _reason: &RollbackReason) {
        let _ = self.profile.apply(&mut |profile| {
            profile.remove_by_key(self.index.key);
        });
        let _ = with_retries(self.policy.retries, || {
            self.dht.remove(meta_tuple(self.index.key), &self.keypair, None).wait_timeout(self.policy.timeout)
        });
    }
}

/// Removes a file's index from the user profile and its meta document from
/// the DHT. Used by the `delete` pipeline in postorder so children vanish
/// before parents (§4.4).
pub struct DeleteFileStep {
    core: ComponentCore,
    key: hive2hive_model::FileKey,
    profile: Arc<dyn ProfileManager>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
    removed: std::sync::Mutex<Option<FileIndex>>,
}

impl DeleteFileStep {
    pub fn new(
        key: hive2hive_model::FileKey,
        profile: Arc<dyn ProfileManager>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Arc<Self> {
        Arc::new(DeleteFileStep {
            core: ComponentCore::new(),
            key,
            profile,
            dht,
            keypair,
            policy,
            removed: std::sync::Mutex::new(None),
        })
    }
}

impl ProcessComponent for DeleteFileStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        let mut removed_slot = self.removed.lock().unwrap();
        let mut removed = None;
        self.profile.apply(&mut |profile| {
            removed = profile.remove_by_key(self.key);
        })?;
        let removed = removed.ok_or_else(|| kind_err(Kind::FileNotFound, "no such file to delete"))?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht.remove(meta_tuple(self.key), &self.keypair, None).wait_timeout(self.policy.timeout)
        });
        if let Err(e) = outcome {
            // Put the profile entry back since the DHT side of the delete
            // never took effect.
            self.profile.apply(&mut |profile| profile.insert(removed.clone()))?;
            return Err(e);
        }
        *removed_slot = Some(removed);
        Ok(())
    }

    fn do_rollback(&self, _ctx: &Context, _reason: &RollbackReason) {
        if let Some(index) = self.removed.lock().unwrap().take() {
            let _ = self.profile.apply(&mut |profile| profile.insert(index.clone()));
            if let Ok(payload) = encode_index(&index) {
                let _ = with_retries(self.policy.retries, || {
                    self.dht
                        .put(
                            meta_tuple(index.key),
                            &self.keypair,
                            payload.clone(),
                            VersionKey::ZERO,
                            None,
                            self.policy.ttl,
                        )
                        .wait_timeout(self.policy.timeout)
                });
            }
        }
    }
}

/// Updates a file's chunk list in place, in both the profile and the DHT
/// meta document.
pub struct UpdateFileStep {
    core: ComponentCore,
    key: hive2hive_model::FileKey,
    new_chunks: Vec<hive2hive_model::FileKey>,
    profile: Arc<dyn ProfileManager>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
    previous: std::sync::Mutex<Option<FileIndex>>,
}

impl UpdateFileStep {
    pub fn new(
        key: hive2hive_model::FileKey,
        new_chunks: Vec<hive2hive_model::FileKey>,
        profile: Arc<dyn ProfileManager>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Arc<Self> {
        Arc::new(UpdateFileStep {
            core: ComponentCore::new(),
            key,
            new_chunks,
            profile,
            dht,
            keypair,
            policy,
            previous: std::sync::Mutex::new(None),
        })
    }
}

impl ProcessComponent for UpdateFileStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        let mut error = None;
        let mut updated = None;
        self.profile.apply(&mut |profile| {
            let Some(existing) = profile.by_key(self.key).cloned() else {
                error = Some(kind_err(Kind::FileNotFound, "no such file to update"));
                return;
            };
            if existing.is_folder() {
                error = Some(kind_err(Kind::IllegalArgument, "cannot update a folder"));
                return;
            }
            *self.previous.lock().unwrap() = Some(existing.clone());
            let mut next = existing;
            next.kind = FileIndexKind::File {
                chunks: self.new_chunks.clone(),
            };
            profile.insert(next.clone());
            updated = Some(next);
        })?;
        if let Some(e) = error {
            return Err(e);
        }
        let updated = updated.expect("set unless `error` was set");
        let payload = encode_index(&updated)?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht
                .put(
                    meta_tuple(updated.key),
                    &self.keypair,
                    payload.clone(),
                    VersionKey::ZERO,
                    None,
                    self.policy.ttl,
                )
                .wait_timeout(self.policy.timeout)
        })?;
        expect_stored(outcome)
    }

    fn do_rollback(&self, _ctx: &Context, _reason: &RollbackReason) {
        if let Some(previous) = self.previous.lock().unwrap().take() {
            let _ = self.profile.apply(&mut |profile| profile.insert(previous.clone()));
            if let Ok(payload) = encode_index(&previous) {
                let _ = with_retries(self.policy.retries, || {
                    self.dht
                        .put(
                            meta_tuple(previous.key),
                            &self.keypair,
                            payload.clone(),
                            VersionKey::ZERO,
                            None,
                            self.policy.ttl,
                        )
                        .wait_timeout(self.policy.timeout)
                });
            }
        }
    }
}

/// Moves a file or folder to a new path, in both the profile and the DHT
/// meta document.
pub struct MoveFileStep {
    core: ComponentCore,
    key: hive2hive_model::FileKey,
    destination: hive2hive_model::Path,
    profile: Arc<dyn ProfileManager>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
    previous: std::sync::Mutex<Option<FileIndex>>,
}

impl MoveFileStep {
    pub fn new(
        key: hive2hive_model::FileKey,
        destination: hive2hive_model::Path,
        profile: Arc<dyn ProfileManager>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Arc<Self> {
        Arc::new(MoveFileStep {
            core: ComponentCore::new(),
            key,
            destination,
            profile,
            dht,
            keypair,
            policy,
            previous: std::sync::Mutex::new(None),
        })
    }
}

impl ProcessComponent for MoveFileStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        let mut error = None;
        let mut updated = None;
        self.profile.apply(&mut |profile| {
            let Some(mut existing) = profile.by_key(self.key).cloned() else {
                error = Some(kind_err(Kind::FileNotFound, "no such file to move"));
                return;
            };
            *self.previous.lock().unwrap() = Some(existing.clone());
            existing.path = self.destination.clone();
            profile.insert(existing.clone());
            updated = Some(existing);
        })?;
        if let Some(e) = error {
            return Err(e);
        }
        let updated = updated.expect("set unless `error` was set");
        let payload = encode_index(&updated)?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht
                .put(
                    meta_tuple(updated.key),
                    &self.keypair,
                    payload.clone(),
                    VersionKey::ZERO,
                    None,
                    self.policy.ttl,
                )
                .wait_timeout(self.policy.timeout)
        })?;
        expect_stored(outcome)?;
        ctx.set_destination(self.destination.clone())
    }

    fn do_rollback(&self, _ctx: &Context, _reason: &RollbackReason) {
        if let Some(previous) = self.previous.lock().unwrap().take() {
            let _ = self.profile.apply(&mut |profile| profile.insert(previous.clone()));
            if let Ok(payload) = encode_index(&previous) {
                let _ = with_retries(self.policy.retries, || {
                    self.dht
                        .put(
                            meta_tuple(previous.key),
                            &self.keypair,
                            payload.clone(),
                            VersionKey::ZERO,
                            None,
                            self.policy.ttl,
                        )
                        .wait_timeout(self.policy.timeout)
                });
            }
        }
    }
}

/// Calls back into a caller-provided version selector to pick which
/// version of a file to restore, then fetches that version's payload from
/// the DHT and re-puts it as the new head (top-level spec §4.4, `recover`).
pub trait VersionSelector: Send + Sync {
    fn select(&self, available: &[hive2hive_vers::VersionKey]) -> Option<hive2hive_vers::VersionKey>;
}

pub struct RecoverFileStep {
    core: ComponentCore,
    key: hive2hive_model::FileKey,
    available: Vec<hive2hive_vers::VersionKey>,
    selector: Arc<dyn VersionSelector>,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
}

impl RecoverFileStep {
    pub fn new(
        key: hive2hive_model::FileKey,
        available: Vec<hive2hive_vers::VersionKey>,
        selector: Arc<dyn VersionSelector>,
        dht: DhtClient,
        keypair: Arc<KeyPair>,
        policy: DhtPolicy,
    ) -> Arc<Self> {
        Arc::new(RecoverFileStep {
            core: ComponentCore::new(),
            key,
            available,
            selector,
            dht,
            keypair,
            policy,
        })
    }
}

impl ProcessComponent for RecoverFileStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, _ctx: &Context) -> Result<()> {
        let chosen = self
            .selector
            .select(&self.available)
            .ok_or_else(|| kind_err(Kind::IllegalArgument, "no version selected to recover"))?;
        let (payload, _owner) = with_retries(self.policy.retries, || {
            self.dht.get(meta_tuple(self.key), Some(chosen)).wait_timeout(self.policy.timeout)
        })?;
        let outcome = with_retries(self.policy.retries, || {
            self.dht
                .put(meta_tuple(self.key), &self.keypair, payload.clone(), chosen, None, self.policy.ttl)
                .wait_timeout(self.policy.timeout)
        })?;
        expect_stored(outcome)
    }
}

/// Shares a folder with another user at a given permission level. A write
/// share is implemented as a protection transfer to the recipient's key, so
/// they can put new versions at the folder's tuple too; a read share needs
/// no DHT mutation, since gets are never owner-gated (top-level spec §4.4,
/// `share`).
pub struct ShareStep {
    core: ComponentCore,
    dht: DhtClient,
    keypair: Arc<KeyPair>,
    policy: DhtPolicy,
}

impl ShareStep {
    pub fn new(dht: DhtClient, keypair: Arc<KeyPair>, policy: DhtPolicy) -> Arc<Self> {
        Arc::new(ShareStep {
            core: ComponentCore::new(),
            dht,
            keypair,
            policy,
        })
    }
}

impl ProcessComponent for ShareStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        let user = ctx
            .share_user()
            .ok_or_else(|| kind_err(Kind::InvalidState, "share needs a recipient"))?;
        let permission = ctx
            .share_permission()
            .ok_or_else(|| kind_err(Kind::InvalidState, "share needs a permission"))?;
        let index = ctx
            .index()
            .ok_or_else(|| kind_err(Kind::InvalidState, "share needs the folder's index"))?;

        if permission == Permission::Write {
            with_retries(self.policy.retries, || {
                self.dht.transfer_protection(meta_tuple(index.key), &self.keypair, user).wait_timeout(self.policy.timeout)
            })?;
        }
        Ok(())
    }
}

/// Result-bearing step producing the current list of known paths
/// (top-level spec §4.4, `getFileList`).
pub struct GetFileListStep {
    core: ComponentCore,
    profile: Arc<dyn ProfileManager>,
}

impl GetFileListStep {
    pub fn new(profile: Arc<dyn ProfileManager>) -> Arc<Self> {
        Arc::new(GetFileListStep {
            core: ComponentCore::new(),
            profile,
        })
    }
}

impl ProcessComponent for GetFileListStep {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        let snapshot = self.profile.snapshot()?;
        ctx.set_file_list(snapshot.list_paths())
    }
}
