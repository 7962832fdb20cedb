use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What a build unit produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Library,
    /// A runtime-loaded module (CMake `MODULE` library). Nothing may link
    /// against it.
    ExtensionModule,
}

/// A single library or extension-module declaration.
///
/// Built with the same chained setters as a command line:
///
/// ```
/// use cmakr_graph::BuildUnit;
///
/// let unit = BuildUnit::library("cppbasics")
///     .add_source("cppbasics.cpp")
///     .add_link("basics")
///     .set_output_dir("lib")
///     .set_install(true);
///
/// assert_eq!(unit.get_links(), ["basics"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnit {
    name: String,
    kind: UnitKind,
    #[serde(default)]
    sources: Vec<PathBuf>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    scope: PathBuf,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default = "default_install")]
    install: bool,
}

impl BuildUnit {
    pub fn new<T>(name: T, kind: UnitKind) -> Self
    where
        T: Into<String>, {
        Self {
            name: name.into(),
            kind,
            sources: Vec::new(),
            links: Vec::new(),
            headers: Vec::new(),
            scope: PathBuf::new(),
            output_dir: None,
            install: default_install(),
        }
    }

    pub fn library<T>(name: T) -> Self
    where
        T: Into<String>, {
        Self::new(name, UnitKind::Library)
    }

    pub fn extension_module<T>(name: T) -> Self
    where
        T: Into<String>, {
        Self::new(name, UnitKind::ExtensionModule)
    }

    pub fn add_source<T>(mut self, source: T) -> Self
    where
        T: Into<PathBuf>, {
        self.sources.push(source.into());
        self
    }

    /// Link against another unit.
    pub fn add_link<T>(mut self, unit: T) -> Self
    where
        T: Into<String>, {
        self.links.push(unit.into());
        self
    }

    /// Use another unit's headers without linking against it.
    pub fn add_header_dep<T>(mut self, unit: T) -> Self
    where
        T: Into<String>, {
        self.headers.push(unit.into());
        self
    }

    /// Directory scope the unit is declared in. Defaults to the root scope.
    pub fn set_scope<T>(mut self, scope: T) -> Self
    where
        T: Into<PathBuf>, {
        self.scope = scope.into();
        self
    }

    pub fn set_output_dir<T>(mut self, dir: T) -> Self
    where
        T: Into<PathBuf>, {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn set_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_kind(&self) -> UnitKind {
        self.kind
    }

    pub fn get_sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn get_links(&self) -> &[String] {
        &self.links
    }

    pub fn get_header_deps(&self) -> &[String] {
        &self.headers
    }

    pub fn get_scope(&self) -> &Path {
        &self.scope
    }

    pub fn get_output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn is_installed(&self) -> bool {
        self.install
    }

    /// Link dependencies followed by header dependencies, each name once,
    /// in declared order.
    pub(crate) fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::with_capacity(self.links.len() + self.headers.len());
        for dep in self.links.iter().chain(&self.headers) {
            if !deps.contains(&dep.as_str()) {
                deps.push(dep);
            }
        }
        deps
    }

    pub(crate) fn links_to(&self, unit: &str) -> bool {
        self.links.iter().any(|l| l == unit)
    }
}

fn default_install() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_keep_declared_order_without_repeats() {
        let unit = BuildUnit::library("app")
            .add_link("core")
            .add_link("util")
            .add_header_dep("core")
            .add_header_dep("config");

        assert_eq!(unit.dependencies(), vec!["core", "util", "config"]);
        assert!(unit.links_to("util"));
        assert!(!unit.links_to("config"));
    }

    #[test]
    fn deserialize_with_defaults() {
        let unit: BuildUnit =
            serde_json::from_str(r#"{ "name": "discovery", "kind": "extension_module" }"#).unwrap();

        assert_eq!(unit.get_name(), "discovery");
        assert_eq!(unit.get_kind(), UnitKind::ExtensionModule);
        assert!(unit.get_sources().is_empty());
        assert_eq!(unit.get_scope(), Path::new(""));
        assert_eq!(unit.get_output_dir(), None);
        assert!(!unit.is_installed());
    }
}
