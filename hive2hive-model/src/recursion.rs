use crate::Path;
use hive2hive_base::Result;

/// External collaborator (top-level spec §6): walks a directory-shaped
/// resource and produces depth-first path orders. The process factory uses
/// `preorder` directly for `add` (parents must exist before children) and
/// reverses it for `delete` (children must vanish before parents).
///
/// Implementations are not part of the core: a real one walks the local
/// file tree, a test one walks a fixture `UserProfile`.
pub trait RecursionPlanner: Send + Sync {
    fn preorder(&self, root: &Path) -> Result<Vec<Path>>;
}

pub fn postorder(planner: &dyn RecursionPlanner, root: &Path) -> Result<Vec<Path>> {
    let mut paths = planner.preorder(root)?;
    paths.reverse();
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    struct FixturePlanner(BTreeMap<Path, Vec<Path>>);

    impl RecursionPlanner for FixturePlanner {
        fn preorder(&self, root: &Path) -> Result<Vec<Path>> {
            Ok(self.0.get(root).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn postorder_is_reverse_of_preorder() {
        let root = Path::root().join("a");
        let a = root.clone();
        let ab = a.join("b");
        let abfile = ab.join("file.txt");
        let mut fixture = BTreeMap::new();
        fixture.insert(
            root.clone(),
            vec![a.clone(), ab.clone(), abfile.clone()],
        );
        let planner = FixturePlanner(fixture);
        assert_eq!(
            planner.preorder(&root).unwrap(),
            vec![a.clone(), ab.clone(), abfile.clone()]
        );
        assert_eq!(postorder(&planner, &root).unwrap(), vec![abfile, ab, a]);
    }
}
