use crate::{FileKey, Path};
use hive2hive_base::{kind_err, Kind, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FileIndexKind {
    Folder,
    /// Chunk content keys, in order. Chunking and encryption are the chunk
    /// cipher's job (out of scope, see top-level spec §1); the profile only
    /// needs to remember which content keys make up a file.
    File { chunks: Vec<FileKey> },
}

/// The meta document a file's or folder's DHT entry actually stores
/// (top-level spec §4.5/§4.6): this is what gets serialized as the payload
/// of a `ProtectedEntryClient::put`, not just an in-memory profile record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileIndex {
    pub key: FileKey,
    pub path: Path,
    pub kind: FileIndexKind,
}

impl FileIndex {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, FileIndexKind::Folder)
    }
}

/// A snapshot of everything the local session currently knows the DHT holds
/// for this user: every path it has an index entry for, keyed both ways
/// since steps sometimes arrive with a key (§4.5) and sometimes with a path
/// (§4.4).
#[derive(Clone, Debug, Default)]
pub struct UserProfile {
    by_key: BTreeMap<FileKey, FileIndex>,
    by_path: BTreeMap<Path, FileKey>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: FileIndex) {
        self.by_path.insert(index.path.clone(), index.key);
        self.by_key.insert(index.key, index);
    }

    pub fn remove_by_key(&mut self, key: FileKey) -> Option<FileIndex> {
        let removed = self.by_key.remove(&key);
        if let Some(idx) = &removed {
            self.by_path.remove(&idx.path);
        }
        removed
    }

    pub fn by_key(&self, key: FileKey) -> Option<&FileIndex> {
        self.by_key.get(&key)
    }

    pub fn by_path(&self, path: &Path) -> Option<&FileIndex> {
        self.by_path.get(path).and_then(|key| self.by_key.get(key))
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// All known paths, used by the `getFileList` pipeline.
    pub fn list_paths(&self) -> Vec<Path> {
        self.by_path.keys().cloned().collect()
    }
}

/// The profile manager serialises concurrent reads/writes at the profile
/// level (§5): steps take an owned snapshot via `snapshot()` and treat it as
/// immutable, and mutate the shared profile only via `apply`, never by
/// caching a `&mut UserProfile` across an await/yield point.
pub trait ProfileManager: Send + Sync {
    fn snapshot(&self) -> Result<UserProfile>;
    fn apply(&self, f: &mut dyn FnMut(&mut UserProfile)) -> Result<()>;
}

/// A `ProfileManager` backed by an in-memory profile behind a mutex. This is
/// the only implementation the core needs: profile persistence lives with
/// the DHT and the local file tree (top-level spec §6, "Persisted state"),
/// not with the process framework.
pub struct InMemoryProfileManager {
    profile: Mutex<UserProfile>,
}

impl InMemoryProfileManager {
    pub fn new() -> Self {
        InMemoryProfileManager {
            profile: Mutex::new(UserProfile::new()),
        }
    }
}

impl Default for InMemoryProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileManager for InMemoryProfileManager {
    fn snapshot(&self) -> Result<UserProfile> {
        let guard = self
            .profile
            .lock()
            .map_err(|_| kind_err(Kind::Other, "profile lock poisoned"))?;
        Ok(guard.clone())
    }

    fn apply(&self, f: &mut dyn FnMut(&mut UserProfile)) -> Result<()> {
        let mut guard = self
            .profile
            .lock()
            .map_err(|_| kind_err(Kind::Other, "profile lock poisoned"))?;
        f(&mut guard);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_and_lookup_both_directions() {
        let mut profile = UserProfile::new();
        let key = FileKey::from_seed(1);
        let path = Path::root().join("a");
        profile.insert(FileIndex {
            key,
            path: path.clone(),
            kind: FileIndexKind::Folder,
        });
        assert!(profile.by_key(key).is_some());
        assert_eq!(profile.by_path(&path).map(|idx| idx.key), Some(key));
        assert_eq!(profile.list_paths(), vec![path]);
    }

    #[test]
    fn manager_apply_is_visible_in_next_snapshot() {
        let mgr = InMemoryProfileManager::new();
        let key = FileKey::from_seed(2);
        let path = Path::root().join("b");
        mgr.apply(&mut |profile| {
            profile.insert(FileIndex {
                key,
                path: path.clone(),
                kind: FileIndexKind::Folder,
            })
        })
        .unwrap();
        let snap = mgr.snapshot().unwrap();
        assert!(snap.contains_path(&path));
    }
}
