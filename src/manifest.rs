use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::descriptor::{DescriptorSet, FrozenDescriptorSet};
use crate::error::Result;
use crate::graph::{BuildGraph, GraphBuilder};
use crate::scope::ScopeTree;
use crate::unit::BuildUnit;

/// File name looked up when a manifest path points at a directory.
pub const MANIFEST_FILE: &str = "BuildUnits.json";

/// Include scope declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDecl {
    path: PathBuf,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
    /// Also visible in the parent scope.
    #[serde(default)]
    public_include_dirs: Vec<PathBuf>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
}

impl ScopeDecl {
    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn get_public_include_dirs(&self) -> &[PathBuf] {
        &self.public_include_dirs
    }

    pub fn get_output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }
}

/// Scopes and units of one configuration pass, as read from
/// `BuildUnits.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    #[serde(default)]
    scopes: Vec<ScopeDecl>,
    #[serde(default)]
    units: Vec<BuildUnit>,
}

impl BuildManifest {
    /// Read a manifest from a file, or from `BuildUnits.json` inside a
    /// directory.
    pub fn new<T>(path: T) -> Result<Self>
    where
        T: Into<PathBuf>, {
        let path = path.into();

        let path = if path.ends_with(MANIFEST_FILE) {
            path
        } else {
            path.join(MANIFEST_FILE)
        };

        let content = std::fs::read_to_string(&path)?;
        let manifest = Self::from_json(&content)?;

        tracing::debug!(
            path = %path.display(),
            scopes = manifest.scopes.len(),
            units = manifest.units.len(),
            "loaded build manifest"
        );
        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn get_scopes(&self) -> &[ScopeDecl] {
        &self.scopes
    }

    pub fn get_units(&self) -> &[BuildUnit] {
        &self.units
    }

    /// Register scopes in file order, then hand each scope's public include
    /// dirs up to its parent.
    pub fn scope_tree(&self) -> Result<ScopeTree> {
        let mut tree = ScopeTree::new();
        for decl in &self.scopes {
            let dirs = decl.include_dirs.iter().chain(&decl.public_include_dirs).cloned();
            let is_root = decl.path.components().all(|c| c == Component::CurDir);
            if is_root {
                // the root scope always exists
                for dir in dirs {
                    tree.add_include_dir(&decl.path, dir)?;
                }
            } else {
                tree.add_scope(&decl.path, dirs)?;
            }

            if let Some(dir) = &decl.output_dir {
                tree.set_output_dir(&decl.path, dir.clone())?;
            }
        }

        // every scope is known now, so public dirs reach the right parent
        for decl in &self.scopes {
            if !decl.public_include_dirs.is_empty() {
                tree.propagate_to_parent(&decl.path, decl.public_include_dirs.iter().cloned())?;
            }
        }
        Ok(tree)
    }

    pub fn descriptor_set(&self) -> Result<FrozenDescriptorSet> {
        let mut set = DescriptorSet::new();
        for unit in &self.units {
            set.add_unit(unit.clone())?;
        }
        Ok(set.freeze())
    }

    /// Run the whole configuration pass: scopes, descriptors, graph.
    pub fn resolve(&self) -> Result<BuildGraph> {
        let scopes = self.scope_tree()?;
        let descriptors = self.descriptor_set()?;
        GraphBuilder::new(&descriptors).with_scopes(&scopes).build()
    }
}
