use serde::{Deserialize, Serialize};
use std::fmt;

/// A file-tree path, relative to the session root, as a sequence of named
/// segments. The root path is the empty sequence.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn from_segments(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Path(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True iff `self` names a strict descendant of `ancestor` -- i.e. `self`
    /// is reachable from `ancestor` by appending one or more segments. Used
    /// at the facade boundary to enforce that `add` only ever targets paths
    /// inside the session root, and that `share` targets a folder strictly
    /// under it.
    pub fn is_strict_descendant_of(&self, ancestor: &Path) -> bool {
        self.0.len() > ancestor.0.len() && self.0[..ancestor.0.len()] == ancestor.0[..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}
