//! Watched workspace roots and path resolution against them.

use std::path::{Path, PathBuf};

/// The set of workspace roots checkpoints are issued for.
///
/// Checkpoints always run with a workspace root as working directory, so
/// every observed path must be mapped back to the root that contains it.
/// Nested roots resolve to the deepest one.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSet {
    roots: Vec<PathBuf>,
}

impl WorkspaceSet {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::default();
        for root in roots {
            set.add(root);
        }
        set
    }

    /// Add a root, ignoring duplicates.
    pub fn add(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The first configured root, used when a checkpoint has no path to
    /// resolve against.
    pub fn primary(&self) -> Option<&Path> {
        self.roots.first().map(PathBuf::as_path)
    }

    /// Deepest root containing `path`.
    pub fn containing(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Containing root and `path` relative to it, or `None` when `path` is
    /// outside every root.
    pub fn resolve(&self, path: &Path) -> Option<(&Path, PathBuf)> {
        let root = self.containing(path)?;
        let relative = path.strip_prefix(root).ok()?.to_path_buf();
        Some((root, relative))
    }

    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        self.resolve(path).map(|(_, relative)| relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_to_deepest_root() {
        let set = WorkspaceSet::new(["/work", "/work/vendor/lib"]);
        assert_eq!(
            set.containing(Path::new("/work/vendor/lib/src/a.rs")),
            Some(Path::new("/work/vendor/lib"))
        );
        assert_eq!(
            set.containing(Path::new("/work/src/a.rs")),
            Some(Path::new("/work"))
        );
        assert_eq!(
            set.relative(Path::new("/work/vendor/lib/src/a.rs")),
            Some(PathBuf::from("src/a.rs"))
        );
    }

    #[test]
    fn paths_outside_every_root_do_not_resolve() {
        let set = WorkspaceSet::new(["/work"]);
        assert!(set.containing(Path::new("/elsewhere/a.rs")).is_none());
        assert!(set.containing(Path::new("/workspace/a.rs")).is_none());
        assert!(set.relative(Path::new("/elsewhere/a.rs")).is_none());
    }

    #[test]
    fn duplicates_are_collapsed() {
        let set = WorkspaceSet::new(["/work", "/work"]);
        assert_eq!(set.roots().len(), 1);
        assert_eq!(set.primary(), Some(Path::new("/work")));
    }
}
