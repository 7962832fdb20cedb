//! Error types for cmakr-graph.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for build graph configuration.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that abort a configuration pass.
///
/// None of these are retryable: the declarations are static input, so the
/// caller has to fix them and configure again.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A unit with this name was already added.
    #[error("duplicate build unit identifier: {0}")]
    DuplicateIdentifier(String),

    /// Unit names must be non-empty and contain no whitespace.
    #[error("invalid build unit identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The dependency chain revisits a unit. The path starts and ends with
    /// the same unit.
    #[error("cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A unit references a name that is not in the descriptor set.
    #[error("build unit {unit} depends on unknown unit {dependency}")]
    UnresolvedDependency { unit: String, dependency: String },

    /// Extension modules are loaded at runtime and cannot be linked against.
    #[error("build unit {unit} links against extension module {module}")]
    LinkToExtensionModule { unit: String, module: String },

    #[error("unknown include scope: {}", .0.display())]
    UnknownScope(PathBuf),

    #[error("include scope already declared: {}", .0.display())]
    DuplicateScope(PathBuf),

    /// Scope paths are relative and may not climb out of the source tree.
    #[error("invalid include scope path: {}", .0.display())]
    InvalidScopePath(PathBuf),

    #[error("include scope has no parent: {}", .0.display())]
    NoParentScope(PathBuf),

    /// Failed to read the manifest file.
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or write JSON.
    #[error("failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),
}
