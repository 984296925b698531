//! Import and include dependencies between files and module units.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use log::{debug, trace};
use petgraph::{
    Direction,
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Walker},
};
use yanglink_core::{Id, NodeId, SchemaTree};

use crate::{
    context::ModuleIndex,
    error::{Diagnostic, ErrorCode},
};

/// A circular chain of imports and includes.
#[derive(Debug)]
pub struct DependencyCycle {
    /// Units owning a file on the cycle.
    pub units: Vec<Id>,
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, Copy)]
struct UnitWeight {
    name: Id,
    priority: i32,
}

/// File-level and unit-level dependency graphs of one linking run.
///
/// Edges point from a dependency to its dependent, so that an import or
/// include must be linked before the file declaring it.
#[derive(Debug)]
pub struct DependencyGraph {
    files: DiGraph<NodeId, ()>,
    units: DiGraph<UnitWeight, ()>,
    unit_indices: HashMap<Id, NodeIndex>,
}

impl DependencyGraph {
    pub fn build(index: &ModuleIndex) -> Self {
        let mut files = DiGraph::new();
        let mut file_indices = HashMap::new();
        let mut submodules = HashMap::new();
        for file in index.files() {
            file_indices.insert(file.root, files.add_node(file.root));
            if index.unit(file.unit).is_some_and(|unit| unit.module != file.root) {
                submodules.insert(file.name, file.root);
            }
        }

        let mut units = DiGraph::new();
        let mut unit_indices = HashMap::new();
        for unit in index.units() {
            let weight = UnitWeight {
                name: unit.name,
                priority: unit.priority,
            };
            unit_indices.insert(unit.name, units.add_node(weight));
        }

        for file in index.files() {
            let Some(&dependent) = file_indices.get(&file.root) else {
                continue;
            };
            let imported = file
                .imports
                .iter()
                .filter_map(|import| index.unit(import.module).map(|unit| unit.module));
            let included = file.includes.iter().filter_map(|name| submodules.get(name).copied());
            for dependency in imported.chain(included) {
                let Some(&from) = file_indices.get(&dependency) else {
                    continue;
                };
                files.update_edge(from, dependent, ());

                let dependency_unit = index.file(dependency).map(|info| info.unit);
                if let Some(dependency_unit) = dependency_unit
                    && dependency_unit != file.unit
                    && let (Some(&from), Some(&to)) =
                        (unit_indices.get(&dependency_unit), unit_indices.get(&file.unit))
                {
                    units.update_edge(from, to, ());
                }
            }
        }
        trace!(files = files.node_count(), edges = files.edge_count(); "Built dependency graph");

        Self {
            files,
            units,
            unit_indices,
        }
    }

    /// Every circular import or include chain, including files that import
    /// or include themselves.
    pub fn cycles(&self, tree: &SchemaTree, index: &ModuleIndex) -> Vec<DependencyCycle> {
        let mut cycles = Vec::new();
        for mut component in tarjan_scc(&self.files) {
            let looped = component.len() == 1 && self.files.contains_edge(component[0], component[0]);
            if component.len() < 2 && !looped {
                continue;
            }
            component.sort();
            let roots: Vec<NodeId> = component.iter().map(|idx| self.files[*idx]).collect();

            let mut units: Vec<Id> = Vec::new();
            let mut names = Vec::new();
            for root in &roots {
                if let Some(info) = index.file(*root) {
                    names.push(info.name.to_string());
                    if !units.contains(&info.unit) {
                        units.push(info.unit);
                    }
                }
            }
            let Some(first) = roots.first().and_then(|root| tree.get(*root)) else {
                continue;
            };

            let mut diagnostic = Diagnostic::error(format!("circular import or include: {}", names.join(", ")))
                .with_code(ErrorCode::E107)
                .with_construct(format!("module `{}`", first.name()))
                .with_label(first.location(), "declared here")
                .with_help("imports and includes must form a directed acyclic graph");
            for root in roots.iter().skip(1) {
                if let Some(node) = tree.get(*root) {
                    diagnostic = diagnostic.with_secondary_label(node.location(), "part of the cycle");
                }
            }
            debug!(files = names.len(); "Found dependency cycle");
            cycles.push(DependencyCycle { units, diagnostic });
        }
        cycles
    }

    /// Units with dependencies first; ties break on `(priority, name)`.
    /// Units on a cycle never become ready and are left out.
    pub fn unit_order(&self) -> Vec<Id> {
        let mut pending: HashMap<NodeIndex, usize> = self
            .units
            .node_indices()
            .map(|idx| (idx, self.units.neighbors_directed(idx, Direction::Incoming).count()))
            .collect();

        let key = |idx: NodeIndex| {
            let weight = self.units[idx];
            Reverse((weight.priority, weight.name.to_string(), idx.index()))
        };
        let mut ready: BinaryHeap<_> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| key(*idx))
            .collect();

        let mut order = Vec::with_capacity(self.units.node_count());
        while let Some(Reverse((_, _, raw))) = ready.pop() {
            let idx = NodeIndex::new(raw);
            order.push(self.units[idx].name);
            for next in self.units.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(count) = pending.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(key(next));
                    }
                }
            }
        }
        order
    }

    /// Every unit that depends on `unit`, directly or transitively.
    pub fn dependents(&self, unit: Id) -> Vec<Id> {
        let Some(&start) = self.unit_indices.get(&unit) else {
            return Vec::new();
        };
        Dfs::new(&self.units, start)
            .iter(&self.units)
            .filter(|idx| *idx != start)
            .map(|idx| self.units[idx].name)
            .collect()
    }
}
