//! Name-uniqueness checks for sibling scopes.
//!
//! Every node kind maps to one [`CollisionNamespace`]; two nodes collide
//! when they share a namespace, a name, a module namespace and a scope.
//! The scope of a new node is found once from its parent:
//!
//! - data nodes share one scope with every data node reachable through
//!   choices and cases, so a name used in one case collides with the same
//!   name in a sibling case;
//! - cases (and shorthand cases, data nodes placed directly under a choice)
//!   are scoped to their choice;
//! - children of a resolved augment join the scope of the augment's target;
//! - module roots span the whole module unit, submodules included.

use std::collections::HashMap;

use yanglink_core::{
    Id, Identifier, NodeId, NodeTag, SchemaTree, SourceLocation,
    kind::NodeKind,
    tree::AttachGuard,
};

use crate::error::{Diagnostic, ErrorCode, Result};

/// Naming scope a node kind participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionNamespace {
    Data,
    Case,
    Typedef,
    Grouping,
    Identity,
    Feature,
    /// Never collides.
    None,
}

pub fn collision_namespace(tag: NodeTag) -> CollisionNamespace {
    match tag {
        NodeTag::Container
        | NodeTag::List
        | NodeTag::Leaf
        | NodeTag::LeafList
        | NodeTag::AnyData
        | NodeTag::Choice
        | NodeTag::Rpc
        | NodeTag::Notification => CollisionNamespace::Data,
        NodeTag::Case => CollisionNamespace::Case,
        NodeTag::Typedef => CollisionNamespace::Typedef,
        NodeTag::Grouping => CollisionNamespace::Grouping,
        NodeTag::Identity => CollisionNamespace::Identity,
        NodeTag::Feature => CollisionNamespace::Feature,
        NodeTag::Module
        | NodeTag::SubModule
        | NodeTag::Uses
        | NodeTag::Augment
        | NodeTag::Deviation
        | NodeTag::Input
        | NodeTag::Output
        | NodeTag::Union
        | NodeTag::Enumeration => CollisionNamespace::None,
    }
}

fn compatible(a: CollisionNamespace, b: CollisionNamespace) -> bool {
    use CollisionNamespace::{Case, Data};
    a == b || matches!((a, b), (Data, Case) | (Case, Data))
}

/// A node about to enter a scope.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Set when the candidate already exists in the tree; it is skipped
    /// when scanning the scope.
    pub id: Option<NodeId>,
    pub identifier: Identifier,
    pub tag: NodeTag,
    pub location: SourceLocation,
}

impl Candidate {
    pub fn of(tree: &SchemaTree, id: NodeId) -> Result<Self> {
        let node = tree.node(id)?;
        Ok(Self {
            id: Some(id),
            identifier: node.identifier(),
            tag: node.tag(),
            location: node.location(),
        })
    }
}

/// The node whose scope children of `parent` join: the target of a
/// resolved augment, otherwise `parent` itself.
pub fn effective_parent(tree: &SchemaTree, parent: NodeId) -> NodeId {
    match tree.get(parent).map(|node| node.kind()) {
        Some(NodeKind::Augment(data)) => data.target.unwrap_or(parent),
        _ => parent,
    }
}

/// The node owning the scope a `namespace` child of `parent` is checked in.
pub fn scope_root(tree: &SchemaTree, parent: NodeId, namespace: CollisionNamespace) -> NodeId {
    let mut root = effective_parent(tree, parent);
    if namespace != CollisionNamespace::Data {
        return root;
    }
    while tree
        .get(root)
        .is_some_and(|node| matches!(node.tag(), NodeTag::Choice | NodeTag::Case))
    {
        match tree.parent(root) {
            Some(up) => root = effective_parent(tree, up),
            None => break,
        }
    }
    root
}

/// Members of the scope owned by `root`, in declaration order.
pub fn scope_members(
    tree: &SchemaTree,
    root: NodeId,
    namespace: CollisionNamespace,
    unit_files: &[NodeId],
) -> Vec<NodeId> {
    let starts: Vec<NodeId> = if unit_files.contains(&root) {
        unit_files.to_vec()
    } else {
        vec![root]
    };
    let ns_of = |id: NodeId| {
        tree.get(id)
            .map_or(CollisionNamespace::None, |node| collision_namespace(node.tag()))
    };

    match namespace {
        CollisionNamespace::None => Vec::new(),
        CollisionNamespace::Data => {
            let mut out = Vec::new();
            let mut stack: Vec<NodeId> = starts
                .iter()
                .flat_map(|start| tree.scope_children(*start))
                .collect();
            stack.reverse();
            while let Some(id) = stack.pop() {
                if ns_of(id) == CollisionNamespace::Data {
                    out.push(id);
                }
                if tree
                    .get(id)
                    .is_some_and(|node| matches!(node.tag(), NodeTag::Choice | NodeTag::Case))
                {
                    let first = stack.len();
                    stack.extend(tree.scope_children(id));
                    stack[first..].reverse();
                }
            }
            out
        }
        CollisionNamespace::Case => tree
            .scope_children(root)
            .into_iter()
            .filter(|id| compatible(ns_of(*id), CollisionNamespace::Case))
            .collect(),
        other => starts
            .iter()
            .flat_map(|start| tree.scope_children(*start))
            .filter(|id| ns_of(*id) == other)
            .collect(),
    }
}

/// Fails if `existing` and `candidate` clash: same name, same module
/// namespace, colliding kinds.
pub fn detect_self_collision(tree: &SchemaTree, existing: NodeId, candidate: &Candidate) -> Result<()> {
    if candidate.id == Some(existing) {
        return Ok(());
    }
    let node = tree.node(existing)?;
    let clash = node.identifier() == candidate.identifier
        && compatible(collision_namespace(node.tag()), collision_namespace(candidate.tag));
    if !clash {
        return Ok(());
    }

    Err(Diagnostic::error(format!(
        "duplicate identifier `{}`",
        candidate.identifier.name()
    ))
    .with_code(ErrorCode::E100)
    .with_construct(format!("{} {}", candidate.tag, candidate.identifier.name()))
    .with_label(candidate.location, "duplicate definition")
    .with_secondary_label(node.location(), format!("{} first defined here", node.tag()))
    .with_help("rename one of the nodes"))
}

/// Fails if `candidate` collides with a node already in the scope it joins
/// when placed under `parent`.
pub fn detect_colliding_child(
    tree: &SchemaTree,
    parent: NodeId,
    candidate: &Candidate,
    unit_files: &[NodeId],
) -> Result<()> {
    let namespace = collision_namespace(candidate.tag);
    if namespace == CollisionNamespace::None {
        return Ok(());
    }

    let root = scope_root(tree, parent, namespace);
    for member in scope_members(tree, root, namespace, unit_files) {
        detect_self_collision(tree, member, candidate)?;
    }

    // A shorthand case also clashes with a named case of its choice
    let direct = effective_parent(tree, parent);
    if namespace == CollisionNamespace::Data
        && tree.get(direct).is_some_and(|node| node.tag() == NodeTag::Choice)
    {
        for member in scope_members(tree, direct, CollisionNamespace::Case, unit_files) {
            detect_self_collision(tree, member, candidate)?;
        }
    }
    Ok(())
}

/// Later declarations in the scope of `root` whose name was already taken,
/// paired with the first declaration.
pub fn find_duplicates(
    tree: &SchemaTree,
    root: NodeId,
    namespace: CollisionNamespace,
    unit_files: &[NodeId],
) -> Vec<(NodeId, NodeId)> {
    let mut seen: HashMap<(Id, Option<Id>), NodeId> = HashMap::new();
    let mut duplicates = Vec::new();
    for member in scope_members(tree, root, namespace, unit_files) {
        let Some(node) = tree.get(member) else {
            continue;
        };
        let key = (node.name(), node.identifier().namespace());
        match seen.get(&key) {
            Some(first) => duplicates.push((member, *first)),
            None => {
                seen.insert(key, member);
            }
        }
    }
    duplicates
}

/// Runs collision detection for every node a clone inserts.
pub struct CollisionGuard<'u> {
    unit_files: &'u [NodeId],
    /// Namespace stamped on every clone before it is checked.
    namespace: Option<Id>,
    skip_definitions: bool,
}

impl<'u> CollisionGuard<'u> {
    pub fn new(unit_files: &'u [NodeId]) -> Self {
        Self {
            unit_files,
            namespace: None,
            skip_definitions: false,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<Id>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Leave typedefs and groupings out of the copy.
    pub fn skip_definitions(mut self) -> Self {
        self.skip_definitions = true;
        self
    }
}

impl AttachGuard for CollisionGuard<'_> {
    type Error = Diagnostic;

    fn include(&self, tree: &SchemaTree, template: NodeId) -> bool {
        !self.skip_definitions
            || tree
                .get(template)
                .is_some_and(|node| !matches!(node.tag(), NodeTag::Typedef | NodeTag::Grouping))
    }

    fn before_attach(&mut self, tree: &mut SchemaTree, parent: NodeId, candidate: NodeId) -> Result<()> {
        if let Some(namespace) = self.namespace {
            tree.node_mut(candidate)?.identifier_mut().set_namespace(namespace);
        }
        let mut incoming = Candidate::of(tree, candidate)?;
        // Not attached yet, so it cannot meet itself in the scan
        incoming.id = None;
        detect_colliding_child(tree, parent, &incoming, self.unit_files)
    }
}
