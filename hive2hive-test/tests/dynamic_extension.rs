//! Scenario 2 (top-level spec §8): running `FindInUserProfile` against a
//! profile entry that is a folder appends exactly one `CreateFolder` step
//! to the parent composite (and no `DownloadChunks`), and the whole
//! pipeline still reaches SUCCEEDED.

use hive2hive_auth::KeyPair;
use hive2hive_dht::ProtectedEntryClient;
use hive2hive_model::{FileIndex, FileIndexKind, FileKey, InMemoryProfileManager, Path, ProfileManager};
use hive2hive_net::MockOverlay;
use hive2hive_process::{
    Context, DhtPolicy, FindInUserProfile, Policy, ProcessComponent, ProcessComposite, State,
};
use std::sync::Arc;

fn dht_fixture() -> (hive2hive_process::DhtClient, Arc<KeyPair>) {
    let dht = Arc::new(ProtectedEntryClient::new(Arc::new(MockOverlay::new())));
    (dht, Arc::new(KeyPair::generate()))
}

#[test]
fn finding_a_folder_extends_the_pipeline_with_create_folder_only() {
    let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
    let key = FileKey::from_seed(42);
    profile
        .apply(&mut |p| {
            p.insert(FileIndex {
                key,
                path: Path::root().join("shared"),
                kind: FileIndexKind::Folder,
            })
        })
        .unwrap();

    let (dht, keypair) = dht_fixture();
    let composite = ProcessComposite::new(Policy::Sequential);
    let find = FindInUserProfile::new(Arc::clone(&profile), dht, keypair, DhtPolicy::default(), &composite);
    composite.push_child(find).unwrap();
    assert_eq!(composite.child_count(), 1);

    let ctx = Context::new();
    ctx.set_file_key(key).unwrap();
    composite.start(&ctx).unwrap();

    assert_eq!(composite.state(), State::Succeeded);
    // FindInUserProfile appended exactly one CreateFolder child, not a
    // GetMetaDocument/DownloadChunks pair.
    assert_eq!(composite.child_count(), 2);
    assert_eq!(ctx.index().unwrap().path, Path::root().join("shared"));
}
