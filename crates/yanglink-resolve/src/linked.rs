//! The result of a successful link.

use indexmap::IndexMap;
use yanglink_core::{
    Id, NodeId, NodeKind, SchemaNode, SchemaTree,
    visit::{Visitor, walk},
};

use crate::error::Diagnostic;

/// A fully linked schema: every module that linked, in dependency order,
/// over the shared tree.
///
/// Consumers read it through [`LinkedGraph::find_child`] and
/// [`LinkedGraph::scope_children`], which see augment-merged children, or
/// by walking it with a [`Visitor`].
#[derive(Debug)]
pub struct LinkedGraph {
    tree: SchemaTree,
    modules: IndexMap<Id, NodeId>,
    warnings: Vec<Diagnostic>,
}

impl LinkedGraph {
    pub(crate) fn new(tree: SchemaTree, modules: IndexMap<Id, NodeId>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            tree,
            modules,
            warnings,
        }
    }

    /// Module names and roots, dependencies first.
    pub fn modules(&self) -> impl Iterator<Item = (Id, NodeId)> + '_ {
        self.modules.iter().map(|(name, root)| (*name, *root))
    }

    pub fn module(&self, name: &str) -> Option<NodeId> {
        self.modules.get(&Id::new(name)).copied()
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.tree.get(id)
    }

    /// Looks up a child of `parent` by name, and by namespace URI when
    /// given.
    pub fn find_child(&self, parent: NodeId, name: &str, namespace: Option<&str>) -> Option<NodeId> {
        self.tree.find_child(parent, Id::new(name), namespace.map(Id::new))
    }

    pub fn scope_children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree.scope_children(id)
    }

    /// Walks every module and submodule root. Returns `false` if the
    /// visitor stopped early.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) -> bool {
        self.tree.roots().iter().all(|root| walk(&self.tree, *root, visitor))
    }

    /// Deviated copies of `target`, one per deviating module.
    pub fn deviated(&self, target: NodeId) -> Vec<NodeId> {
        self.tree
            .roots()
            .iter()
            .filter_map(|root| self.tree.header(*root).ok())
            .filter_map(|header| header.deviation_clones.get(&target).and_then(|copy| copy.clone))
            .collect()
    }

    /// Deviations declared in the module `name`.
    pub fn deviations(&self, name: &str) -> Vec<NodeId> {
        let Some(root) = self.module(name) else {
            return Vec::new();
        };
        self.tree
            .children(root)
            .filter(|id| matches!(self.tree.get(*id).map(SchemaNode::kind), Some(NodeKind::Deviation(_))))
            .collect()
    }

    /// Warnings raised while linking.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn into_tree(self) -> SchemaTree {
        self.tree
    }
}
