//! The schema tree: an arena of [`SchemaNode`]s with index-based relations.
//!
//! All modules and submodules of a compilation unit live in one
//! [`SchemaTree`]. Parent, child and sibling relations are index fields on
//! each node, so moving, detaching and cloning subtrees only rewrites
//! handles.
//!
//! [`SchemaTree::clone_subtree`] copies a subtree without recursion, using an
//! explicit cursor and a three-state step (descend to the first child,
//! advance to the next sibling, ascend to the parent). Every clone is offered
//! to an [`AttachGuard`] before it is attached, which is where the linker
//! runs collision detection.

use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use crate::{
    arena::{Arena, NodeId},
    identifier::Id,
    kind::{FileHeader, Import, ModuleData, NodeKind, SubModuleData},
    location::SourceLocation,
    node::SchemaNode,
};

/// Errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    StaleHandle(NodeId),

    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    #[error("node {0} already holds children")]
    HoldsChildren(NodeId),

    #[error("node {0} already holds siblings")]
    HoldsSiblings(NodeId),

    #[error("node {0} cannot be attached below itself")]
    AttachBelowSelf(NodeId),

    #[error("node {0} is not a module or submodule")]
    NotAFile(NodeId),
}

/// Hook run by [`SchemaTree::clone_subtree`] for every node it copies.
pub trait AttachGuard {
    type Error: From<TreeError>;

    /// Whether the template node (and its subtree) is copied at all.
    fn include(&self, tree: &SchemaTree, template: NodeId) -> bool {
        let _ = (tree, template);
        true
    }

    /// Called with the detached clone before it is attached under `parent`.
    /// The guard may adjust the clone; returning an error aborts the whole
    /// clone.
    fn before_attach(
        &mut self,
        tree: &mut SchemaTree,
        parent: NodeId,
        candidate: NodeId,
    ) -> Result<(), Self::Error>;
}

/// A guard that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unguarded;

impl AttachGuard for Unguarded {
    type Error = TreeError;

    fn before_attach(&mut self, _: &mut SchemaTree, _: NodeId, _: NodeId) -> Result<(), TreeError> {
        Ok(())
    }
}

/// Template-to-clone mapping produced by a clone.
#[derive(Debug, Clone, Default)]
pub struct CloneMap {
    map: IndexMap<NodeId, NodeId>,
}

impl CloneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, template: NodeId) -> Option<NodeId> {
        self.map.get(&template).copied()
    }

    pub fn insert(&mut self, template: NodeId, clone: NodeId) {
        self.map.insert(template, clone);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `(template, clone)` pairs in clone order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.map.iter().map(|(template, clone)| (*template, *clone))
    }

    pub fn clones(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map.values().copied()
    }

    pub fn extend(&mut self, other: CloneMap) {
        self.map.extend(other.map);
    }
}

enum Step {
    Descend,
    Advance,
    Ascend,
}

/// Owning store of every schema node of a compilation unit.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Parent, child
/// and sibling links are kept by the tree, so a node can be detached and
/// moved without touching its subtree. Handles of discarded nodes go stale
/// and every lookup through them fails with [`TreeError::StaleHandle`].
///
/// # Examples
///
/// ```
/// use yanglink_core::{
///     Id, NodeKind, SchemaTree, SourceLocation,
///     types::{BuiltinType, TypeReference},
/// };
///
/// let loc = SourceLocation::in_file("m.yang");
/// let mut tree = SchemaTree::new();
/// let m = tree.create_module("m", "urn:m", "m", loc);
/// let top = tree.add_child(m, NodeKind::container(), "top", loc).unwrap();
/// let name = tree
///     .add_child(top, NodeKind::leaf(TypeReference::builtin(BuiltinType::String)), "name", loc)
///     .unwrap();
///
/// assert_eq!(tree.roots(), &[m]);
/// assert_eq!(tree.find_child(top, Id::new("name"), None), Some(name));
/// assert_eq!(tree.schema_path(name), "/top/name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaTree {
    nodes: Arena<SchemaNode>,
    roots: Vec<NodeId>,
}

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node.
    pub fn create(&mut self, kind: NodeKind, name: impl Into<Id>, location: SourceLocation) -> NodeId {
        self.nodes.insert(SchemaNode::new(kind, name.into(), location))
    }

    /// Creates a module root and registers it as a file of this unit.
    ///
    /// # Arguments
    ///
    /// * `name` - Module name, unique across the tree
    /// * `namespace` - Namespace URI every node of the module takes
    /// * `prefix` - The module's own prefix, used by qualified names inside it
    /// * `location` - Where the `module` statement was read
    pub fn create_module(
        &mut self,
        name: &str,
        namespace: &str,
        prefix: &str,
        location: SourceLocation,
    ) -> NodeId {
        let kind = NodeKind::Module(ModuleData {
            namespace: Id::new(namespace),
            header: FileHeader {
                prefix: Some(Id::new(prefix)),
                ..FileHeader::default()
            },
        });
        let id = self.create(kind, name, location);
        self.roots.push(id);
        id
    }

    /// Creates a submodule root and registers it as a file of this unit.
    pub fn create_submodule(
        &mut self,
        name: &str,
        belongs_to: &str,
        prefix: &str,
        location: SourceLocation,
    ) -> NodeId {
        let kind = NodeKind::SubModule(SubModuleData {
            belongs_to: Id::new(belongs_to),
            header: FileHeader {
                prefix: Some(Id::new(prefix)),
                ..FileHeader::default()
            },
        });
        let id = self.create(kind, name, location);
        self.roots.push(id);
        id
    }

    pub fn add_import(&mut self, file: NodeId, module: &str, prefix: &str) -> Result<(), TreeError> {
        self.header_mut(file)?.imports.push(Import::new(module, prefix));
        Ok(())
    }

    pub fn add_include(&mut self, file: NodeId, submodule: &str) -> Result<(), TreeError> {
        self.header_mut(file)?.includes.push(Id::new(submodule));
        Ok(())
    }

    pub fn header(&self, file: NodeId) -> Result<&FileHeader, TreeError> {
        self.node(file)?
            .kind()
            .file_header()
            .ok_or(TreeError::NotAFile(file))
    }

    pub fn header_mut(&mut self, file: NodeId) -> Result<&mut FileHeader, TreeError> {
        self.node_mut(file)?
            .kind_mut()
            .file_header_mut()
            .ok_or(TreeError::NotAFile(file))
    }

    /// Registered module and submodule roots, in creation order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&SchemaNode, TreeError> {
        self.nodes.get(id).ok_or(TreeError::StaleHandle(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SchemaNode, TreeError> {
        self.nodes.get_mut(id).ok_or(TreeError::StaleHandle(id))
    }

    /// Appends `child` after the existing children of `parent`.
    ///
    /// The child must be a detached leaf of the forest: no parent, no
    /// children, no siblings.
    ///
    /// # Errors
    ///
    /// * [`TreeError::StaleHandle`] if either handle is stale
    /// * [`TreeError::AlreadyAttached`], [`TreeError::HoldsChildren`] or
    ///   [`TreeError::HoldsSiblings`] if `child` is not detached
    /// * [`TreeError::AttachBelowSelf`] if `parent` and `child` are the same node
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        let links = self.node(child)?.links;
        if links.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if links.first_child.is_some() {
            return Err(TreeError::HoldsChildren(child));
        }
        if links.has_siblings() {
            return Err(TreeError::HoldsSiblings(child));
        }
        if parent == child {
            return Err(TreeError::AttachBelowSelf(child));
        }

        let last = self.node(parent)?.links.last_child;
        match last {
            Some(last) => {
                self.node_mut(last)?.links.next_sibling = Some(child);
                self.node_mut(child)?.links.prev_sibling = Some(last);
            }
            None => self.node_mut(parent)?.links.first_child = Some(child),
        }
        self.node_mut(parent)?.links.last_child = Some(child);
        self.node_mut(child)?.links.parent = Some(parent);
        Ok(())
    }

    /// Creates a node and appends it under `parent`.
    ///
    /// # Arguments
    ///
    /// * `parent` - Existing node the new one is appended under
    /// * `kind` - Statement kind and its payload
    /// * `name` - Identifier of the new node
    /// * `location` - Where the statement was read
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleHandle`] if `parent` no longer exists.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: impl Into<Id>,
        location: SourceLocation,
    ) -> Result<NodeId, TreeError> {
        self.node(parent)?;
        let child = self.create(kind, name, location);
        self.attach_child(parent, child)?;
        Ok(child)
    }

    /// Unlinks `id` from its parent and siblings. Its own subtree stays intact.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let links = self.node(id)?.links;
        let Some(parent) = links.parent else {
            return Ok(());
        };

        match links.prev_sibling {
            Some(prev) => self.node_mut(prev)?.links.next_sibling = links.next_sibling,
            None => self.node_mut(parent)?.links.first_child = links.next_sibling,
        }
        match links.next_sibling {
            Some(next) => self.node_mut(next)?.links.prev_sibling = links.prev_sibling,
            None => self.node_mut(parent)?.links.last_child = links.prev_sibling,
        }

        let node = self.node_mut(id)?;
        node.links.parent = None;
        node.links.prev_sibling = None;
        node.links.next_sibling = None;
        Ok(())
    }

    /// Detaches `id` and frees it together with every descendant. Returns the
    /// number of nodes removed.
    pub fn discard_subtree(&mut self, id: NodeId) -> Result<usize, TreeError> {
        self.detach(id)?;
        let doomed = self.descendants(id);
        for node in &doomed {
            self.nodes.remove(*node);
        }
        self.roots.retain(|root| *root != id);
        Ok(doomed.len())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(SchemaNode::parent)
    }

    /// Direct children in declaration order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).and_then(SchemaNode::first_child),
        }
    }

    /// Direct children collected, for callers that mutate while iterating.
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// `id` and all its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let first = stack.len();
            stack.extend(self.children(current));
            stack[first..].reverse();
        }
        out
    }

    /// Returns `true` if `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|id| id == ancestor)
    }

    /// The module or submodule root `id` belongs to.
    pub fn file_root(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| self.get(*candidate).is_some_and(|n| n.tag().is_file_root()))
    }

    /// Own children followed by the children of every augment merged into
    /// `id`.
    pub fn scope_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.children(id).collect();
        if let Some(node) = self.get(id) {
            for augment in &node.augmented_by {
                out.extend(self.children(*augment));
            }
        }
        out
    }

    /// Drops `augmented_by` entries whose augment no longer exists. Returns
    /// the number of entries removed.
    pub fn prune_augments(&mut self) -> usize {
        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| !node.augmented_by.is_empty())
            .map(|(id, _)| id)
            .collect();
        let mut removed = 0;
        for id in ids {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let live: Vec<NodeId> = node
                .augmented_by
                .iter()
                .copied()
                .filter(|augment| self.nodes.contains(*augment))
                .collect();
            if let Some(node) = self.nodes.get_mut(id) {
                removed += node.augmented_by.len() - live.len();
                node.augmented_by = live;
            }
        }
        removed
    }

    /// Looks up a child in the scope of `parent` by name and, optionally,
    /// namespace.
    pub fn find_child(&self, parent: NodeId, name: Id, namespace: Option<Id>) -> Option<NodeId> {
        self.scope_children(parent).into_iter().find(|child| {
            self.get(*child)
                .is_some_and(|node| node.identifier().matches(name, namespace))
        })
    }

    /// Slash-separated names from the file root down to `id`, for messages.
    pub fn schema_path(&self, id: NodeId) -> String {
        let mut names: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|node| self.get(node))
            .take_while(|node| !node.tag().is_file_root())
            .map(|node| node.name().to_string())
            .collect();
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Copies the subtree rooted at `template` and appends the copy under
    /// `dest_parent`.
    ///
    /// Children the guard excludes are skipped together with their subtrees.
    /// References between copied nodes (value tables, augment targets,
    /// context switches) are rewritten to point inside the copy. On error
    /// the partial copy is discarded.
    ///
    /// # Arguments
    ///
    /// * `template` - Root of the subtree to copy
    /// * `dest_parent` - Node the copy is appended under; must not lie inside `template`
    /// * `guard` - Filters the nodes copied and vets each one before it is attached
    ///
    /// # Errors
    ///
    /// Fails when a handle is stale, when `dest_parent` lies inside
    /// `template`, or when the guard rejects a node.
    ///
    /// # Examples
    ///
    /// ```
    /// use yanglink_core::{
    ///     NodeKind, SchemaTree, SourceLocation,
    ///     tree::Unguarded,
    ///     types::{BuiltinType, TypeReference},
    /// };
    ///
    /// let loc = SourceLocation::in_file("m.yang");
    /// let mut tree = SchemaTree::new();
    /// let m = tree.create_module("m", "urn:m", "m", loc);
    /// let a = tree.add_child(m, NodeKind::container(), "a", loc).unwrap();
    /// tree.add_child(a, NodeKind::leaf(TypeReference::builtin(BuiltinType::Int8)), "x", loc)
    ///     .unwrap();
    /// let b = tree.add_child(m, NodeKind::container(), "b", loc).unwrap();
    ///
    /// let map = tree.clone_subtree(a, b, &mut Unguarded).unwrap();
    /// let copy = map.get(a).unwrap();
    /// assert_eq!(tree.parent(copy), Some(b));
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn clone_subtree<G: AttachGuard>(
        &mut self,
        template: NodeId,
        dest_parent: NodeId,
        guard: &mut G,
    ) -> Result<CloneMap, G::Error> {
        self.node(template)?;
        self.node(dest_parent)?;
        if self.is_ancestor_or_self(template, dest_parent) {
            return Err(TreeError::AttachBelowSelf(template).into());
        }

        let mut map = CloneMap::new();
        let root = self.clone_one(template, dest_parent, guard, &mut map)?;
        if let Err(err) = self.clone_descendants(template, root, guard, &mut map) {
            let _ = self.discard_subtree(root);
            return Err(err);
        }

        self.remap_references(&map);
        trace!(template:?, clone:? = root, nodes = map.len(); "Cloned subtree");
        Ok(map)
    }

    fn clone_descendants<G: AttachGuard>(
        &mut self,
        template: NodeId,
        root: NodeId,
        guard: &mut G,
        map: &mut CloneMap,
    ) -> Result<(), G::Error> {
        let mut cursor = template;
        let mut dest = root;
        let mut step = Step::Descend;

        loop {
            step = match step {
                Step::Descend => {
                    let first = self.node(cursor)?.first_child();
                    match self.next_included(first, guard) {
                        Some(child) => {
                            dest = self.clone_one(child, dest, guard, map)?;
                            cursor = child;
                            Step::Descend
                        }
                        None => Step::Advance,
                    }
                }
                Step::Advance => {
                    if cursor == template {
                        break;
                    }
                    let next = self.node(cursor)?.next_sibling();
                    match self.next_included(next, guard) {
                        Some(sibling) => {
                            let parent = self.node(dest)?.parent().ok_or(TreeError::StaleHandle(dest))?;
                            dest = self.clone_one(sibling, parent, guard, map)?;
                            cursor = sibling;
                            Step::Descend
                        }
                        None => Step::Ascend,
                    }
                }
                Step::Ascend => {
                    cursor = self.node(cursor)?.parent().ok_or(TreeError::StaleHandle(cursor))?;
                    dest = self.node(dest)?.parent().ok_or(TreeError::StaleHandle(dest))?;
                    if cursor == template {
                        break;
                    }
                    Step::Advance
                }
            };
        }
        Ok(())
    }

    fn next_included<G: AttachGuard>(&self, mut candidate: Option<NodeId>, guard: &G) -> Option<NodeId> {
        while let Some(id) = candidate {
            if guard.include(self, id) {
                return Some(id);
            }
            candidate = self.get(id).and_then(SchemaNode::next_sibling);
        }
        None
    }

    fn clone_one<G: AttachGuard>(
        &mut self,
        template: NodeId,
        parent: NodeId,
        guard: &mut G,
        map: &mut CloneMap,
    ) -> Result<NodeId, G::Error> {
        let copy = self.node(template)?.detached_copy();
        let clone = self.nodes.insert(copy);
        let attached = guard
            .before_attach(self, parent, clone)
            .and_then(|()| self.attach_child(parent, clone).map_err(G::Error::from));
        if let Err(err) = attached {
            self.nodes.remove(clone);
            return Err(err);
        }
        map.insert(template, clone);
        Ok(clone)
    }

    /// Rewrites handles held by every clone in `map` that point at another
    /// template of the same map.
    pub fn remap_references(&mut self, map: &CloneMap) {
        let lookup = |id: NodeId| map.get(id);
        for clone in map.clones() {
            let Some(node) = self.nodes.get_mut(clone) else {
                continue;
            };

            for augment in &mut node.augmented_by {
                if let Some(new_id) = lookup(*augment) {
                    *augment = new_id;
                }
            }
            if let Some(switch) = &mut node.context_switch
                && let Some(new_id) = lookup(switch.logical_parent)
            {
                switch.logical_parent = new_id;
            }

            match node.kind_mut() {
                NodeKind::Leaf(data) | NodeKind::LeafList(data) => {
                    data.ty.info.remap_table(lookup);
                    if let Some(effective) = &mut data.ty.effective {
                        effective.info.remap_table(lookup);
                    }
                    if let Some(leafref) = data.ty.leafref_mut()
                        && let Some(new_id) = leafref.target.and_then(lookup)
                    {
                        leafref.target = Some(new_id);
                    }
                }
                NodeKind::Typedef(data) => {
                    data.ty.info.remap_table(lookup);
                    if let Some(effective) = &mut data.ty.effective {
                        effective.info.remap_table(lookup);
                    }
                }
                NodeKind::Union(data) => {
                    for member in &mut data.members {
                        member.info.remap_table(lookup);
                        if let Some(effective) = &mut member.effective {
                            effective.info.remap_table(lookup);
                        }
                    }
                }
                NodeKind::Augment(data) => {
                    if let Some(new_id) = data.target.and_then(lookup) {
                        data.target = Some(new_id);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Iterator over direct children.
pub struct Children<'a> {
    tree: &'a SchemaTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(SchemaNode::next_sibling);
        Some(current)
    }
}

/// Iterator over proper ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a SchemaTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
