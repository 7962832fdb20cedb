//! # cmakr-graph
//!
//! Resolve declarative, CMake-style build units into a dependency-ordered
//! build graph.
//!
//! Libraries and extension modules are declared once per configuration
//! pass, together with the directory scopes that carry their include and
//! output directories. `cmakr-graph` validates the declarations, resolves
//! the effective paths of every unit and orders the units so that each one
//! comes after everything it links against or takes headers from. Running
//! compilers and linkers is left to whoever consumes the graph.
//!
//! ## Quick Start
//!
//! ```
//! use cmakr_graph::{BuildUnit, DescriptorSet, GraphBuilder, ScopeTree};
//!
//! let mut scopes = ScopeTree::new();
//! scopes.add_scope("basics", ["basics/include"])?;
//! scopes.set_output_dir("", "lib")?;
//!
//! let mut units = DescriptorSet::new();
//! units.add_unit(BuildUnit::library("cppbasics").add_link("basics"))?;
//! units.add_unit(BuildUnit::library("basics").set_scope("basics"))?;
//! let units = units.freeze();
//!
//! let graph = GraphBuilder::new(&units).with_scopes(&scopes).build()?;
//! assert_eq!(graph.topological_names(), ["basics", "cppbasics"]);
//! # Ok::<(), cmakr_graph::GraphError>(())
//! ```
//!
//! ```no_run
//! use cmakr_graph::BuildManifest;
//!
//! // Load ./my_project/BuildUnits.json and hand the plan to an executor
//! let graph = BuildManifest::new("./my_project")?.resolve()?;
//! println!("{}", graph.to_json()?);
//! # Ok::<(), cmakr_graph::GraphError>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod scope;
pub mod unit;

pub use descriptor::{DescriptorSet, FrozenDescriptorSet};
pub use error::{GraphError, Result};
pub use graph::{BuildGraph, EdgeKind, GraphBuilder, ResolvedUnit, build};
pub use manifest::BuildManifest;
pub use scope::ScopeTree;
pub use unit::{BuildUnit, UnitKind};
