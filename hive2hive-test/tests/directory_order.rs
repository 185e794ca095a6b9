//! Scenarios 3 and 4 (top-level spec §8): adding a directory tree runs
//! `NewFileStep` in preorder (parent before children); deleting the same
//! tree runs `DeleteFileStep` in postorder (children before parents). Walks
//! a real temporary directory through the real `LocalRecursionPlanner`.

use hive2hive::LocalRecursionPlanner;
use hive2hive_auth::KeyPair;
use hive2hive_dht::ProtectedEntryClient;
use hive2hive_model::{
    postorder, FileIndex, FileIndexKind, FileKey, InMemoryProfileManager, Path, ProfileManager,
    RecursionPlanner,
};
use hive2hive_net::MockOverlay;
use hive2hive_process::{Context, Policy, ProcessComponent, ProcessComposite};
use std::fs;
use std::sync::{Arc, Mutex};

fn dht_fixture() -> (hive2hive_process::DhtClient, Arc<KeyPair>) {
    let dht = Arc::new(ProtectedEntryClient::new(Arc::new(MockOverlay::new())));
    (dht, Arc::new(KeyPair::generate()))
}

fn temp_tree() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hive2hive-directory-order-{:?}",
        std::thread::current().id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("a/b")).unwrap();
    fs::write(dir.join("a/b/file.txt"), b"contents").unwrap();
    dir
}

fn seeded_index(path: Path, is_folder: bool, seed: u64) -> FileIndex {
    FileIndex {
        key: FileKey::from_seed(seed),
        path,
        kind: if is_folder {
            FileIndexKind::Folder
        } else {
            FileIndexKind::File { chunks: Vec::new() }
        },
    }
}

#[test]
fn add_visits_directories_before_their_children() {
    let dir = temp_tree();
    let planner = LocalRecursionPlanner::new(&dir);
    let root = Path::root().join("a");
    let order = planner.preorder(&root).unwrap();
    assert_eq!(
        order,
        vec![root.clone(), root.join("b"), root.join("b").join("file.txt")]
    );

    let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
    let (dht, keypair) = dht_fixture();
    let log = Arc::new(Mutex::new(Vec::new()));
    let composite = ProcessComposite::new(Policy::Sequential);
    for (i, path) in order.iter().enumerate() {
        let is_folder = *path != root.join("b").join("file.txt");
        let index = seeded_index(path.clone(), is_folder, 100 + i as u64);
        composite
            .push_child(hive2hive_process::NewFileStep::new(
                index,
                Arc::clone(&profile),
                Arc::clone(&dht),
                Arc::clone(&keypair),
                hive2hive_process::DhtPolicy::default(),
            ))
            .unwrap();
        log.lock().unwrap().push(path.clone());
    }

    let ctx = Context::new();
    composite.start(&ctx).unwrap();

    let snapshot = profile.snapshot().unwrap();
    for path in &order {
        assert!(snapshot.contains_path(path), "missing {path} after add");
    }
    // The pipeline was built by pushing NewFileStep in preorder, and a
    // SEQUENTIAL composite runs children in push order -- together that's
    // the ordering guarantee this scenario cares about.
    assert_eq!(*log.lock().unwrap(), order);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn delete_visits_children_before_their_directory() {
    let dir = temp_tree();
    let planner = LocalRecursionPlanner::new(&dir);
    let root = Path::root().join("a");
    let preorder_paths = planner.preorder(&root).unwrap();
    let postorder_paths = postorder(&planner, &root).unwrap();
    assert_eq!(
        postorder_paths,
        vec![root.join("b").join("file.txt"), root.join("b"), root.clone()]
    );

    let profile: Arc<dyn ProfileManager> = Arc::new(InMemoryProfileManager::new());
    let (dht, keypair) = dht_fixture();
    let mut keys = Vec::new();
    for (i, path) in preorder_paths.iter().enumerate() {
        let is_folder = *path != root.join("b").join("file.txt");
        let index = seeded_index(path.clone(), is_folder, 200 + i as u64);
        keys.push((path.clone(), index.key));
        profile.apply(&mut |p| p.insert(index.clone())).unwrap();
        let payload = hive2hive_process::encode_index(&index).unwrap();
        dht.put(
            hive2hive_process::meta_tuple(index.key),
            &keypair,
            payload,
            hive2hive_vers::VersionKey::ZERO,
            None,
            None,
        )
        .wait()
        .unwrap();
    }

    let composite = ProcessComposite::new(Policy::Sequential);
    for path in &postorder_paths {
        let key = keys.iter().find(|(p, _)| p == path).unwrap().1;
        composite
            .push_child(hive2hive_process::DeleteFileStep::new(
                key,
                Arc::clone(&profile),
                Arc::clone(&dht),
                Arc::clone(&keypair),
                hive2hive_process::DhtPolicy::default(),
            ))
            .unwrap();
    }

    let ctx = Context::new();
    composite.start(&ctx).unwrap();

    let snapshot = profile.snapshot().unwrap();
    for path in &preorder_paths {
        assert!(!snapshot.contains_path(path), "{path} should be gone after delete");
    }

    fs::remove_dir_all(&dir).unwrap();
}
