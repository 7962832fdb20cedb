//! Build graph construction.
//!
//! An edge `A -> B` means A links against B or A's sources include B's
//! headers. Units are ordered so that every unit comes after everything it
//! depends on, and unrelated units keep declaration order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::descriptor::FrozenDescriptorSet;
use crate::error::{GraphError, Result};
use crate::scope::ScopeTree;
use crate::unit::{BuildUnit, UnitKind};

/// Output directory for units that neither set one nor inherit one.
pub const DEFAULT_OUTPUT_DIR: &str = "build";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Link,
    /// Header-only dependency.
    Include,
}

/// A build unit with its effective paths.
#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    unit: BuildUnit,
    include_dirs: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl ResolvedUnit {
    pub fn get_unit(&self) -> &BuildUnit {
        &self.unit
    }

    pub fn get_name(&self) -> &str {
        self.unit.get_name()
    }

    /// Scope include directories followed by those of the unit's
    /// dependencies.
    pub fn get_include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn get_output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Dependency-ordered build units, ready to hand to an executor.
#[derive(Debug)]
pub struct BuildGraph {
    graph: DiGraph<ResolvedUnit, EdgeKind>,
    indices: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
}

impl BuildGraph {
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Units in topological order, dependencies first.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedUnit> {
        self.order.iter().map(|&idx| &self.graph[idx])
    }

    pub fn topological_names(&self) -> Vec<&str> {
        self.iter().map(ResolvedUnit::get_name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedUnit> {
        self.indices.get(name).map(|&idx| &self.graph[idx])
    }

    /// Direct dependencies of a unit in declared order.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.get(name).map(|u| u.unit.dependencies()).unwrap_or_default()
    }

    /// Units that depend directly on `name`, in declaration order.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };

        let mut dependents: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents.into_iter().map(|i| self.graph[i].get_name()).collect()
    }

    pub fn edge_kind(&self, from: &str, to: &str) -> Option<EdgeKind> {
        let (&a, &b) = (self.indices.get(from)?, self.indices.get(to)?);
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    /// Group units into levels: every unit sits one level above its deepest
    /// dependency, so units within a level are independent of each other.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let mut level_of: HashMap<NodeIndex, usize> = HashMap::with_capacity(self.order.len());
        let mut levels: Vec<Vec<NodeIndex>> = Vec::new();

        for &idx in &self.order {
            let level = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .filter_map(|dep| level_of.get(&dep))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(idx, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(idx);
        }

        levels
            .into_iter()
            .map(|mut level| {
                level.sort();
                level.into_iter().map(|i| self.graph[i].get_name()).collect()
            })
            .collect()
    }

    /// Units flagged for installation, in topological order.
    pub fn install_units(&self) -> impl Iterator<Item = &ResolvedUnit> {
        self.iter().filter(|u| u.unit.is_installed())
    }

    /// Serialize the graph as a JSON build plan for an executor.
    pub fn to_json(&self) -> Result<String> {
        let plan = BuildPlan {
            units: self
                .iter()
                .map(|u| PlanUnit {
                    name: u.get_name(),
                    kind: u.unit.get_kind(),
                    sources: u.unit.get_sources(),
                    links: u.unit.get_links(),
                    headers: u.unit.get_header_deps(),
                    include_dirs: &u.include_dirs,
                    output_dir: &u.output_dir,
                    install: u.unit.is_installed(),
                })
                .collect(),
            levels: self.levels(),
        };

        Ok(serde_json::to_string_pretty(&plan)?)
    }
}

#[derive(Serialize)]
struct BuildPlan<'a> {
    units: Vec<PlanUnit<'a>>,
    levels: Vec<Vec<&'a str>>,
}

#[derive(Serialize)]
struct PlanUnit<'a> {
    name: &'a str,
    kind: UnitKind,
    sources: &'a [PathBuf],
    links: &'a [String],
    headers: &'a [String],
    include_dirs: &'a [PathBuf],
    output_dir: &'a Path,
    install: bool,
}

/// Build a graph from descriptors alone, without include scopes.
pub fn build(descriptors: &FrozenDescriptorSet) -> Result<BuildGraph> {
    GraphBuilder::new(descriptors).build()
}

/// Turns a frozen descriptor set, and optionally a scope tree, into a
/// [`BuildGraph`].
pub struct GraphBuilder<'a> {
    descriptors: &'a FrozenDescriptorSet,
    scopes: Option<&'a ScopeTree>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(descriptors: &'a FrozenDescriptorSet) -> Self {
        Self {
            descriptors,
            scopes: None,
        }
    }

    /// Resolve include and output directories against `scopes`.
    pub fn with_scopes(mut self, scopes: &'a ScopeTree) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn build(&self) -> Result<BuildGraph> {
        self.check_references()?;
        let order = topological_order(self.descriptors)?;

        let units = self.descriptors.units();
        let mut resolved: Vec<Option<ResolvedUnit>> = vec![None; units.len()];
        for &i in &order {
            let unit = self.resolve(&units[i], &resolved)?;
            resolved[i] = Some(unit);
        }

        let mut graph = DiGraph::with_capacity(units.len(), 0);
        let mut indices = HashMap::with_capacity(units.len());
        for unit in resolved.into_iter().flatten() {
            let name = unit.get_name().to_string();
            let idx = graph.add_node(unit);
            indices.insert(name, idx);
        }

        for unit in units {
            let from = indices[unit.get_name()];
            for dep in unit.dependencies() {
                let kind = if unit.links_to(dep) {
                    EdgeKind::Link
                } else {
                    EdgeKind::Include
                };
                graph.add_edge(from, indices[dep], kind);
            }
        }

        let graph = BuildGraph {
            graph,
            indices,
            order: order.into_iter().map(NodeIndex::new).collect(),
        };

        tracing::info!(
            units = graph.len(),
            edges = graph.edge_count(),
            levels = graph.levels().len(),
            "resolved build graph"
        );
        for unit in graph.iter() {
            tracing::debug!(
                unit = unit.get_name(),
                kind = ?unit.unit.get_kind(),
                output_dir = %unit.output_dir.display(),
                include_dirs = unit.include_dirs.len(),
                "resolved build unit"
            );
        }

        Ok(graph)
    }

    fn check_references(&self) -> Result<()> {
        for unit in self.descriptors.units() {
            for dep in unit.dependencies() {
                let Some(target) = self.descriptors.get_unit(dep) else {
                    return Err(GraphError::UnresolvedDependency {
                        unit: unit.get_name().to_string(),
                        dependency: dep.to_string(),
                    });
                };

                if target.get_kind() == UnitKind::ExtensionModule && unit.links_to(dep) {
                    return Err(GraphError::LinkToExtensionModule {
                        unit: unit.get_name().to_string(),
                        module: dep.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    // dependencies of `unit` are already resolved, they come first in the order
    fn resolve(&self, unit: &BuildUnit, resolved: &[Option<ResolvedUnit>]) -> Result<ResolvedUnit> {
        let mut include_dirs = match self.scopes {
            Some(scopes) => scopes.resolve_include_dirs(unit.get_scope())?,
            None => Vec::new(),
        };

        let mut seen: HashSet<PathBuf> = include_dirs.iter().cloned().collect();
        for dep in unit.dependencies() {
            let dep_unit = self
                .descriptors
                .position(dep)
                .and_then(|i| resolved[i].as_ref());
            for dir in dep_unit.into_iter().flat_map(|d| &d.include_dirs) {
                if seen.insert(dir.clone()) {
                    include_dirs.push(dir.clone());
                }
            }
        }

        let output_dir = match (unit.get_output_dir(), self.scopes) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(scopes)) => scopes
                .resolve_output_dir(unit.get_scope())?
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), Path::to_path_buf),
            (None, None) => PathBuf::from(DEFAULT_OUTPUT_DIR),
        };

        Ok(ResolvedUnit {
            unit: unit.clone(),
            include_dirs,
            output_dir,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order units so that each comes after its dependencies.
///
/// A depth-first walk rejects cycles first. The order itself is Kahn's
/// algorithm that always takes the ready unit declared earliest, so
/// unrelated units keep declaration order and the result is stable across
/// runs.
fn topological_order(descriptors: &FrozenDescriptorSet) -> Result<Vec<usize>> {
    let units = descriptors.units();
    let mut marks = vec![Mark::Unvisited; units.len()];
    let mut path = Vec::new();
    for root in 0..units.len() {
        visit(descriptors, root, &mut marks, &mut path)?;
    }

    let mut pending = vec![0usize; units.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    for (idx, unit) in units.iter().enumerate() {
        for dep in unit.dependencies() {
            if let Some(dep_idx) = descriptors.position(dep) {
                pending[idx] += 1;
                dependents[dep_idx].push(idx);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    let mut order = Vec::with_capacity(units.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    Ok(order)
}

fn visit(
    descriptors: &FrozenDescriptorSet,
    idx: usize,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Result<()> {
    let units = descriptors.units();
    match marks[idx] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            // an in-progress unit is on the current path; the cycle starts there
            let cycle = path
                .iter()
                .skip_while(|&&i| i != idx)
                .chain(std::iter::once(&idx))
                .map(|&i| units[i].get_name().to_string())
                .collect();
            return Err(GraphError::CyclicDependency(cycle));
        }
        Mark::Unvisited => {}
    }

    marks[idx] = Mark::InProgress;
    path.push(idx);

    for dep in units[idx].dependencies() {
        let Some(dep_idx) = descriptors.position(dep) else {
            return Err(GraphError::UnresolvedDependency {
                unit: units[idx].get_name().to_string(),
                dependency: dep.to_string(),
            });
        };
        visit(descriptors, dep_idx, marks, path)?;
    }

    path.pop();
    marks[idx] = Mark::Done;
    Ok(())
}
