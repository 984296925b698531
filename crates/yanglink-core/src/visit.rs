//! Read-only traversal of a schema tree using the visitor pattern.
//!
//! [`walk`] drives a [`Visitor`] over a subtree in pre-order with an
//! explicit stack. Implementors override only the hooks they need; the
//! default [`Visitor::visit_node`] dispatches to a per-kind hook and every
//! hook continues into the children by default.

use crate::{
    arena::NodeId,
    kind::{AugmentData, DeviationData, IdentityData, LeafData, ListData, NodeKind, UsesData},
    node::SchemaNode,
    tree::SchemaTree,
};

/// What [`walk`] does after a node has been visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
    Stop,
}

pub trait Visitor {
    /// Visit any node; dispatches on its kind.
    fn visit_node(&mut self, tree: &SchemaTree, id: NodeId, node: &SchemaNode) -> Walk {
        match node.kind() {
            NodeKind::Module(_) | NodeKind::SubModule(_) => self.visit_file(tree, id, node),
            NodeKind::Container(_) => self.visit_container(tree, id, node),
            NodeKind::List(data) => self.visit_list(tree, id, node, data),
            NodeKind::Leaf(data) | NodeKind::LeafList(data) => self.visit_leaf(tree, id, node, data),
            NodeKind::Uses(data) => self.visit_uses(tree, id, node, data),
            NodeKind::Augment(data) => self.visit_augment(tree, id, node, data),
            NodeKind::Identity(data) => self.visit_identity(tree, id, node, data),
            NodeKind::Deviation(data) => self.visit_deviation(tree, id, node, data),
            NodeKind::Grouping | NodeKind::Typedef(_) => self.visit_definition(tree, id, node),
            _ => self.visit_other(tree, id, node),
        }
    }

    /// Called after all children of a visited node have been walked.
    fn leave_node(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) {}

    /// Visit a module or submodule root
    fn visit_file(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) -> Walk {
        Walk::Continue
    }

    fn visit_container(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) -> Walk {
        Walk::Continue
    }

    fn visit_list(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode, _data: &ListData) -> Walk {
        Walk::Continue
    }

    /// Visit a leaf or leaf-list
    fn visit_leaf(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode, _data: &LeafData) -> Walk {
        Walk::Continue
    }

    fn visit_uses(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode, _data: &UsesData) -> Walk {
        Walk::Continue
    }

    fn visit_augment(
        &mut self,
        _tree: &SchemaTree,
        _id: NodeId,
        _node: &SchemaNode,
        _data: &AugmentData,
    ) -> Walk {
        Walk::Continue
    }

    fn visit_identity(
        &mut self,
        _tree: &SchemaTree,
        _id: NodeId,
        _node: &SchemaNode,
        _data: &IdentityData,
    ) -> Walk {
        Walk::Continue
    }

    fn visit_deviation(
        &mut self,
        _tree: &SchemaTree,
        _id: NodeId,
        _node: &SchemaNode,
        _data: &DeviationData,
    ) -> Walk {
        Walk::Continue
    }

    /// Visit a grouping or typedef
    fn visit_definition(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) -> Walk {
        Walk::Continue
    }

    fn visit_other(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) -> Walk {
        Walk::Continue
    }
}

/// Walks the subtree rooted at `root`. Returns `false` if the visitor stopped early.
pub fn walk<V: Visitor + ?Sized>(tree: &SchemaTree, root: NodeId, visitor: &mut V) -> bool {
    // (node, children already pushed)
    let mut stack = vec![(root, false)];
    while let Some((id, entered)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if entered {
            visitor.leave_node(tree, id, node);
            continue;
        }

        match visitor.visit_node(tree, id, node) {
            Walk::Stop => return false,
            Walk::SkipChildren => visitor.leave_node(tree, id, node),
            Walk::Continue => {
                stack.push((id, true));
                let first = stack.len();
                stack.extend(tree.children(id).map(|child| (child, false)));
                stack[first..].reverse();
            }
        }
    }
    true
}
