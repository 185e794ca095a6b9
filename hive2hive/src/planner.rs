use hive2hive_base::{err, Result};
use hive2hive_model::{Path, RecursionPlanner};
use std::path::PathBuf;

/// The real recursion helper (top-level spec §6, "Recursion helper
/// (external)"): walks the local file tree under `base` and returns a
/// preorder listing of a subtree rooted at the given session-relative
/// `Path`. Directories are visited before their children; sibling order is
/// lexicographic by file name for determinism.
pub struct LocalRecursionPlanner {
    base: PathBuf,
}

impl LocalRecursionPlanner {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        LocalRecursionPlanner { base: base.into() }
    }

    fn fs_path(&self, path: &Path) -> PathBuf {
        let mut full = self.base.clone();
        for segment in path.segments() {
            full.push(segment);
        }
        full
    }

    fn walk(&self, path: &Path, out: &mut Vec<Path>) -> Result<()> {
        out.push(path.clone());
        let fs_path = self.fs_path(path);
        if !fs_path.is_dir() {
            return Ok(());
        }
        let read_dir = std::fs::read_dir(&fs_path)
            .map_err(|e| err(format!("reading {}: {e}", fs_path.display())))?;
        let mut entries: Vec<std::fs::DirEntry> = Vec::new();
        for entry in read_dir {
            entries.push(entry.map_err(|e| err(format!("reading {}: {e}", fs_path.display())))?);
        }
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            self.walk(&path.join(name), out)?;
        }
        Ok(())
    }
}

impl RecursionPlanner for LocalRecursionPlanner {
    fn preorder(&self, root: &Path) -> Result<Vec<Path>> {
        let mut out = Vec::new();
        self.walk(root, &mut out)?;
        Ok(out)
    }
}
