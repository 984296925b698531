//! The schema node stored in the tree arena.

use crate::{
    arena::NodeId,
    identifier::{Id, Identifier, QualifiedName},
    kind::{NodeKind, NodeTag, Properties},
    location::SourceLocation,
};

/// An `if-feature` annotation and the feature it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfFeature {
    pub name: QualifiedName,
    pub feature: Option<NodeId>,
}

impl IfFeature {
    pub fn new(name: &str) -> Self {
        Self {
            name: QualifiedName::parse(name),
            feature: None,
        }
    }
}

/// Marks a node that is a child of one node in the tree but logically lives
/// under another, as with augment content merged into its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSwitch {
    pub logical_parent: NodeId,
    /// Set when the logical parent is a choice: the node behaves as if it
    /// were wrapped in a case of the same name.
    pub implicit_case: bool,
}

/// Index fields replacing parent/child/sibling pointers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
}

impl Links {
    pub(crate) fn has_siblings(&self) -> bool {
        self.prev_sibling.is_some() || self.next_sibling.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    kind: NodeKind,
    identifier: Identifier,
    location: SourceLocation,
    /// Tie-break when ordering siblings at the same nesting level.
    pub priority: i32,
    pub if_features: Vec<IfFeature>,
    pub properties: Properties,
    pub context_switch: Option<ContextSwitch>,
    /// Augments merged into this node.
    pub augmented_by: Vec<NodeId>,
    pub(crate) links: Links,
}

impl SchemaNode {
    pub(crate) fn new(kind: NodeKind, name: Id, location: SourceLocation) -> Self {
        Self {
            kind,
            identifier: Identifier::new(name),
            location,
            priority: 0,
            if_features: Vec::new(),
            properties: Properties::default(),
            context_switch: None,
            augmented_by: Vec::new(),
            links: Links::default(),
        }
    }

    /// A detached copy: same data, no tree relations.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            links: Links::default(),
            ..self.clone()
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }

    pub fn name(&self) -> Id {
        self.identifier.name()
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.links.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.links.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.links.next_sibling
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.links.prev_sibling
    }

    pub fn has_children(&self) -> bool {
        self.links.first_child.is_some()
    }

    /// The logical parent for lookups: the context-switch target if set,
    /// otherwise the structural parent.
    pub fn logical_parent(&self) -> Option<NodeId> {
        self.context_switch
            .map(|switch| switch.logical_parent)
            .or(self.links.parent)
    }
}
