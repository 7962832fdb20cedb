//! Directory-scoped include and output directories.
//!
//! Every scope is keyed by a path relative to the source root. The root
//! scope (the empty path) always exists; any other scope hangs off the
//! nearest registered ancestor directory, whichever was registered first.
//! A child sees everything its parents declare and can only add to it.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Default)]
struct ScopeRecord {
    include_dirs: Vec<PathBuf>,
    // public dirs handed up by child scopes
    propagated: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl ScopeRecord {
    fn has_include_dir(&self, dir: &Path) -> bool {
        self.include_dirs.iter().chain(&self.propagated).any(|d| d == dir)
    }
}

/// Tree of include scopes, built once per configuration pass and passed by
/// reference to graph construction.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: HashMap<PathBuf, ScopeRecord>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the root scope.
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(PathBuf::new(), ScopeRecord::default());
        Self { scopes }
    }

    /// Register a scope with its own include directories.
    ///
    /// Scopes already registered below `path` become its children.
    pub fn add_scope<P, I, D>(&mut self, path: P, include_dirs: I) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = D>,
        D: Into<PathBuf>, {
        let path = normalize(path.as_ref())?;
        if self.scopes.contains_key(&path) {
            return Err(GraphError::DuplicateScope(path));
        }

        let mut record = ScopeRecord::default();
        for dir in include_dirs {
            let dir = dir.into();
            if !record.has_include_dir(&dir) {
                record.include_dirs.push(dir);
            }
        }

        self.scopes.insert(path, record);
        Ok(())
    }

    pub fn contains<P: AsRef<Path>>(&self, scope: P) -> bool {
        normalize(scope.as_ref()).is_ok_and(|p| self.scopes.contains_key(&p))
    }

    /// Append an include directory to a scope. Already visible directories
    /// are ignored.
    pub fn add_include_dir<P, D>(&mut self, scope: P, dir: D) -> Result<()>
    where
        P: AsRef<Path>,
        D: Into<PathBuf>, {
        let record = self.record_mut(scope.as_ref())?;
        let dir = dir.into();
        if !record.has_include_dir(&dir) {
            record.include_dirs.push(dir);
        }
        Ok(())
    }

    pub fn set_output_dir<P, D>(&mut self, scope: P, dir: D) -> Result<()>
    where
        P: AsRef<Path>,
        D: Into<PathBuf>, {
        self.record_mut(scope.as_ref())?.output_dir = Some(dir.into());
        Ok(())
    }

    /// Include directories visible in `scope`: its own, then its parent's
    /// resolved list, then those its children propagated into it, each
    /// directory once at its first position.
    pub fn resolve_include_dirs<P: AsRef<Path>>(&self, scope: P) -> Result<Vec<PathBuf>> {
        let chain = self.chain(scope.as_ref())?;

        let own = chain.iter().flat_map(|r| &r.include_dirs);
        // the root's propagated dirs close its own list, so they come first
        let propagated = chain.iter().rev().flat_map(|r| &r.propagated);

        let mut seen = HashSet::new();
        let mut dirs = Vec::new();
        for dir in own.chain(propagated) {
            if seen.insert(dir.as_path()) {
                dirs.push(dir.clone());
            }
        }
        Ok(dirs)
    }

    /// Output directory of the nearest scope in the chain that sets one.
    pub fn resolve_output_dir<P: AsRef<Path>>(&self, scope: P) -> Result<Option<&Path>> {
        let chain = self.chain(scope.as_ref())?;
        Ok(chain.into_iter().find_map(|r| r.output_dir.as_deref()))
    }

    /// Make a child's public include directories visible in its parent.
    ///
    /// Directories the parent can already see on its own level are skipped,
    /// so repeating a propagation changes nothing.
    pub fn propagate_to_parent<P, I, D>(&mut self, child: P, dirs: I) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = D>,
        D: Into<PathBuf>, {
        let child = normalize(child.as_ref())?;
        if !self.scopes.contains_key(&child) {
            return Err(GraphError::UnknownScope(child));
        }
        let Some(parent) = self.parent_of(&child) else {
            return Err(GraphError::NoParentScope(child));
        };

        let record = self.record_mut(&parent)?;
        for dir in dirs {
            let dir = dir.into();
            if !record.has_include_dir(&dir) {
                record.propagated.push(dir);
            }
        }
        Ok(())
    }

    fn parent_of(&self, path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .skip(1)
            .find(|a| self.scopes.contains_key(*a))
            .map(Path::to_path_buf)
    }

    /// Records from `scope` up to the root.
    fn chain(&self, scope: &Path) -> Result<Vec<&ScopeRecord>> {
        let path = normalize(scope)?;
        if !self.scopes.contains_key(&path) {
            return Err(GraphError::UnknownScope(path));
        }
        Ok(path.ancestors().filter_map(|a| self.scopes.get(a)).collect())
    }

    fn record_mut(&mut self, scope: &Path) -> Result<&mut ScopeRecord> {
        let path = normalize(scope)?;
        match self.scopes.get_mut(&path) {
            Some(record) => Ok(record),
            None => Err(GraphError::UnknownScope(path)),
        }
    }
}

/// Drop `.` components; reject anything that is not a plain relative path.
fn normalize(path: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(GraphError::InvalidScopePath(path.to_path_buf()));
            }
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(dirs: &[&str]) -> Vec<PathBuf> {
        dirs.iter().map(PathBuf::from).collect()
    }

    fn tree() -> ScopeTree {
        let mut tree = ScopeTree::new();
        tree.add_include_dir(".", "include").unwrap();
        tree.add_scope("src", ["src/include", "include"]).unwrap();
        tree.add_scope("src/basics", ["src/basics"]).unwrap();
        tree
    }

    #[test]
    fn root_is_registered_as_dot() {
        let mut tree = ScopeTree::new();
        assert!(tree.contains("."));
        assert!(tree.contains(""));
        assert!(matches!(tree.add_scope("./", ["x"]), Err(GraphError::DuplicateScope(_))));
    }

    #[test]
    fn child_sees_own_dirs_before_parents() {
        let tree = tree();
        assert_eq!(
            tree.resolve_include_dirs("src/basics").unwrap(),
            paths(&["src/basics", "src/include", "include"])
        );
        assert_eq!(tree.resolve_include_dirs("./src").unwrap(), paths(&["src/include", "include"]));
    }

    #[test]
    fn parent_is_nearest_registered_ancestor() {
        let mut tree = tree();
        tree.add_scope("src/basics/detail/impl", ["impl"]).unwrap();
        assert_eq!(
            tree.resolve_include_dirs("src/basics/detail/impl").unwrap(),
            paths(&["impl", "src/basics", "src/include", "include"])
        );
    }

    #[test]
    fn resolve_is_idempotent() {
        let tree = tree();
        let first = tree.resolve_include_dirs("src/basics").unwrap();
        let second = tree.resolve_include_dirs("src/basics").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn propagation_reaches_parent_once() {
        let mut tree = ScopeTree::new();
        tree.add_include_dir("", "include").unwrap();
        tree.add_scope("src", ["src/include"]).unwrap();
        tree.add_scope("src/basics", ["src/basics"]).unwrap();

        tree.propagate_to_parent("src/basics", ["src/basics/public"]).unwrap();
        tree.propagate_to_parent("src/basics", ["src/basics/public"]).unwrap();
        // already visible on the parent's own level
        tree.propagate_to_parent("src/basics", ["src/include"]).unwrap();

        // appended after everything the parent resolves on its own
        assert_eq!(
            tree.resolve_include_dirs("src").unwrap(),
            paths(&["src/include", "include", "src/basics/public"])
        );
        assert_eq!(
            tree.resolve_include_dirs("src/basics").unwrap(),
            paths(&["src/basics", "src/include", "include", "src/basics/public"])
        );
        // siblings see it through the parent
        tree.add_scope("src/discovery", Vec::<PathBuf>::new()).unwrap();
        assert_eq!(
            tree.resolve_include_dirs("src/discovery").unwrap(),
            paths(&["src/include", "include", "src/basics/public"])
        );
    }

    #[test]
    fn propagated_dirs_follow_the_parent_chain() {
        let mut tree = ScopeTree::new();
        tree.add_include_dir("", "include").unwrap();
        tree.add_scope("a", ["a"]).unwrap();
        tree.add_scope("a/b", ["ab"]).unwrap();
        tree.propagate_to_parent("a", ["a/public"]).unwrap();
        tree.propagate_to_parent("a/b", ["ab/public"]).unwrap();

        assert_eq!(
            tree.resolve_include_dirs("a/b").unwrap(),
            paths(&["ab", "a", "include", "a/public", "ab/public"])
        );
    }

    #[test]
    fn ancestor_registered_after_child_is_inherited() {
        let mut tree = ScopeTree::new();
        tree.add_scope("a/b", ["ab"]).unwrap();
        tree.add_scope("a", ["a_inc"]).unwrap();
        tree.set_output_dir("a", "lib/a").unwrap();

        assert_eq!(tree.resolve_include_dirs("a/b").unwrap(), paths(&["ab", "a_inc"]));
        assert_eq!(tree.resolve_output_dir("a/b").unwrap(), Some(Path::new("lib/a")));

        // propagation goes to the new parent, not the root
        tree.propagate_to_parent("a/b", ["ab/public"]).unwrap();
        assert_eq!(tree.resolve_include_dirs("a").unwrap(), paths(&["a_inc", "ab/public"]));
        assert!(tree.resolve_include_dirs("").unwrap().is_empty());
    }

    #[test]
    fn root_has_no_parent() {
        let mut tree = tree();
        assert!(matches!(
            tree.propagate_to_parent("", ["x"]),
            Err(GraphError::NoParentScope(_))
        ));
    }

    #[test]
    fn unknown_and_invalid_scopes() {
        let mut tree = tree();
        assert!(matches!(
            tree.resolve_include_dirs("tests"),
            Err(GraphError::UnknownScope(p)) if p == Path::new("tests")
        ));
        assert!(matches!(
            tree.add_scope("../outside", ["x"]),
            Err(GraphError::InvalidScopePath(_))
        ));
        assert!(matches!(
            tree.add_include_dir("/abs", "x"),
            Err(GraphError::InvalidScopePath(_))
        ));
    }

    #[test]
    fn output_dir_is_inherited_until_overridden() {
        let mut tree = tree();
        assert_eq!(tree.resolve_output_dir("src/basics").unwrap(), None);

        tree.set_output_dir("", "lib").unwrap();
        assert_eq!(tree.resolve_output_dir("src/basics").unwrap(), Some(Path::new("lib")));

        tree.set_output_dir("src/basics", "lib/basics").unwrap();
        assert_eq!(
            tree.resolve_output_dir("src/basics").unwrap(),
            Some(Path::new("lib/basics"))
        );
        assert_eq!(tree.resolve_output_dir("src").unwrap(), Some(Path::new("lib")));
    }

    #[test]
    fn add_include_dir_skips_visible_dirs() {
        let mut tree = tree();
        tree.add_include_dir("src", "generated").unwrap();
        tree.add_include_dir("src", "generated").unwrap();
        assert_eq!(
            tree.resolve_include_dirs("src").unwrap(),
            paths(&["src/include", "include", "generated"])
        );
    }
}
