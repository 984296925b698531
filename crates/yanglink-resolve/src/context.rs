//! Shared state of a linking run: the module index and name lookup.
//!
//! A *module unit* is a module together with the submodules belonging to
//! it. Units are the granularity of dependency ordering and of failure in
//! batch mode; files (module and submodule roots) are the granularity of
//! resolution queues and prefix scoping.

use indexmap::IndexMap;
use yanglink_core::{
    Id, NodeId, NodeTag, QualifiedName, SchemaNode, SchemaTree, SourceLocation,
    kind::Import,
    queue::{QueueKind, ResolutionQueues},
};

use crate::error::{Diagnostic, ErrorCode, Result};

/// Header facts about one module or submodule file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub root: NodeId,
    pub name: Id,
    /// The module unit the file belongs to.
    pub unit: Id,
    pub prefix: Option<Id>,
    pub imports: Vec<Import>,
    pub includes: Vec<Id>,
}

/// A module and its submodules.
#[derive(Debug, Clone)]
pub struct ModuleUnit {
    pub name: Id,
    pub namespace: Id,
    pub module: NodeId,
    /// The module root first, then submodule roots in input order.
    pub files: Vec<NodeId>,
    pub priority: i32,
}

/// Where a prefix points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixTarget {
    /// The referencing file's own unit.
    Local(Id),
    /// An imported unit.
    Imported(Id),
}

impl PrefixTarget {
    pub fn unit(&self) -> Id {
        match self {
            Self::Local(unit) | Self::Imported(unit) => *unit,
        }
    }
}

/// Index of every file and module unit of a linking run.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    units: IndexMap<Id, ModuleUnit>,
    files: IndexMap<NodeId, FileInfo>,
}

impl ModuleIndex {
    pub fn units(&self) -> impl Iterator<Item = &ModuleUnit> {
        self.units.values()
    }

    pub fn unit(&self, name: Id) -> Option<&ModuleUnit> {
        self.units.get(&name)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileInfo> {
        self.files.values()
    }

    pub fn file(&self, root: NodeId) -> Option<&FileInfo> {
        self.files.get(&root)
    }

    /// The unit the file rooted at `root` belongs to.
    pub fn unit_of(&self, root: NodeId) -> Option<&ModuleUnit> {
        self.file(root).and_then(|file| self.unit(file.unit))
    }

    pub(crate) fn insert_unit(&mut self, unit: ModuleUnit) {
        self.units.insert(unit.name, unit);
    }

    pub(crate) fn unit_mut(&mut self, name: Id) -> Option<&mut ModuleUnit> {
        self.units.get_mut(&name)
    }

    pub(crate) fn insert_file(&mut self, file: FileInfo) {
        self.files.insert(file.root, file);
    }

    pub(crate) fn remove_unit(&mut self, name: Id) {
        if let Some(unit) = self.units.shift_remove(&name) {
            for file in unit.files {
                self.files.shift_remove(&file);
            }
        }
    }

    /// Resolves `prefix` as written in the file rooted at `file`.
    ///
    /// No prefix or the file's own prefix means the file's unit; an import
    /// prefix means the imported unit. Unknown prefixes yield `None`.
    pub fn resolve_prefix(&self, file: NodeId, prefix: Option<Id>) -> Option<PrefixTarget> {
        let info = self.file(file)?;
        match prefix {
            None => Some(PrefixTarget::Local(info.unit)),
            Some(prefix) if info.prefix == Some(prefix) => Some(PrefixTarget::Local(info.unit)),
            Some(prefix) => info
                .imports
                .iter()
                .find(|import| import.prefix == prefix)
                .map(|import| PrefixTarget::Imported(import.module)),
        }
    }
}

/// Which half of the two-phase resolution is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Only definitions reachable inside the referencing file are visible.
    IntraFile,
    /// Definitions of the whole unit and of imported units are visible.
    InterFile,
}

/// Result of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(NodeId),
    /// Not visible yet; retry in a later phase or pass.
    Deferred,
    /// Definitely absent.
    Missing,
}

/// Mutable state handed to every resolver.
///
/// A context lives for one drain of one file's queues. Resolvers read and
/// edit the tree through it, look names up against the frozen
/// [`ModuleIndex`], and push follow-up work (copied leafrefs, inherited
/// leafref typedefs) onto `pending` instead of recursing.
pub struct LinkContext<'a> {
    pub tree: &'a mut SchemaTree,
    pub index: &'a ModuleIndex,
    pub phase: Phase,
    /// Work created while resolving (for example leafrefs in freshly
    /// instantiated groupings), merged into the file queues by the scheduler.
    pub pending: ResolutionQueues,
}

impl<'a> LinkContext<'a> {
    /// Creates a context with an empty `pending` queue set.
    ///
    /// # Arguments
    ///
    /// * `tree` - The tree being linked
    /// * `index` - Units and files registered for this run
    /// * `phase` - Which definitions lookups may see
    pub fn new(tree: &'a mut SchemaTree, index: &'a ModuleIndex, phase: Phase) -> Self {
        Self {
            tree,
            index,
            phase,
            pending: ResolutionQueues::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&SchemaNode> {
        Ok(self.tree.node(id)?)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SchemaNode> {
        Ok(self.tree.node_mut(id)?)
    }

    pub fn location(&self, id: NodeId) -> SourceLocation {
        self.tree.get(id).map(SchemaNode::location).unwrap_or_default()
    }

    /// The file a node belongs to.
    pub fn file_of(&self, id: NodeId) -> Result<&'a FileInfo> {
        let index = self.index;
        self.tree
            .file_root(id)
            .and_then(|root| index.file(root))
            .ok_or_else(|| {
                Diagnostic::error(format!("node `{}` is not part of a registered module", self.describe(id)))
                    .with_code(ErrorCode::E002)
                    .with_label(self.location(id), "detached node")
            })
    }

    /// The unit a node belongs to.
    pub fn unit_of(&self, id: NodeId) -> Result<&'a ModuleUnit> {
        let file = self.file_of(id)?;
        let index = self.index;
        index.unit(file.unit).ok_or_else(|| {
            Diagnostic::error(format!("module `{}` is not registered", file.unit)).with_code(ErrorCode::E106)
        })
    }

    /// Resolves a prefix as seen from `from`, failing on unknown prefixes.
    pub fn resolve_prefix(&self, from: NodeId, prefix: Option<Id>) -> Result<PrefixTarget> {
        let file = self.file_of(from)?;
        self.index.resolve_prefix(file.root, prefix).ok_or_else(|| {
            let prefix = prefix.map(|p| p.to_string()).unwrap_or_default();
            Diagnostic::error(format!("unknown prefix `{prefix}`"))
                .with_code(ErrorCode::E105)
                .with_construct(self.describe(from))
                .with_label(self.location(from), "prefix used here")
                .with_help("the prefix must be the file's own prefix or bound by an import")
        })
    }

    /// Looks up a typedef, grouping, identity or feature named `name` as
    /// seen from `from`.
    ///
    /// Local names are searched in the definitions of `from`'s lexical
    /// ancestors, then (inter-file phase only) at the top level of the other
    /// files of the unit. Prefixed names of imported units are visible in
    /// the inter-file phase only.
    pub fn lookup(&self, from: NodeId, name: QualifiedName, tag: NodeTag) -> Result<Lookup> {
        let target = self.resolve_prefix(from, name.prefix())?;
        let index = self.index;

        if let PrefixTarget::Local(unit) = target {
            let lexical = self
                .tree
                .ancestors(from)
                .find_map(|scope| self.direct_definition(scope, name.name(), tag));
            if let Some(found) = lexical {
                return Ok(Lookup::Found(found));
            }
            if self.phase == Phase::IntraFile {
                return Ok(Lookup::Deferred);
            }
            let found = index
                .unit(unit)
                .and_then(|unit| self.top_level_definition(unit, name.name(), tag));
            return Ok(found.map_or(Lookup::Missing, Lookup::Found));
        }

        if self.phase == Phase::IntraFile {
            return Ok(Lookup::Deferred);
        }
        let found = index
            .unit(target.unit())
            .and_then(|unit| self.top_level_definition(unit, name.name(), tag));
        Ok(found.map_or(Lookup::Missing, Lookup::Found))
    }

    fn direct_definition(&self, scope: NodeId, name: Id, tag: NodeTag) -> Option<NodeId> {
        self.tree.children(scope).find(|child| {
            self.tree
                .get(*child)
                .is_some_and(|node| node.tag() == tag && node.name() == name)
        })
    }

    /// A definition at the top level of any file of `unit`.
    pub fn top_level_definition(&self, unit: &ModuleUnit, name: Id, tag: NodeTag) -> Option<NodeId> {
        unit.files
            .iter()
            .find_map(|file| self.direct_definition(*file, name, tag))
    }

    /// Returns `true` if `id` lies inside a grouping template.
    pub fn in_grouping(&self, id: NodeId) -> bool {
        in_grouping(&*self.tree, id)
    }

    pub fn defer(&mut self, kind: QueueKind, id: NodeId) {
        self.pending.push(kind, id);
    }

    /// `keyword name` of a node, for messages.
    pub fn describe(&self, id: NodeId) -> String {
        describe(&*self.tree, id)
    }
}

pub(crate) fn in_grouping(tree: &SchemaTree, id: NodeId) -> bool {
    tree.ancestors(id)
        .any(|ancestor| tree.get(ancestor).is_some_and(|node| node.tag() == NodeTag::Grouping))
}

pub(crate) fn describe(tree: &SchemaTree, id: NodeId) -> String {
    match tree.get(id) {
        Some(node) => format!("{} {}", node.tag(), node.name()),
        None => format!("node {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yanglink_core::{
        NodeKind,
        types::{BuiltinType, TypeReference},
    };

    fn loc() -> SourceLocation {
        SourceLocation::in_file("ctx.yang")
    }

    struct Fixture {
        tree: SchemaTree,
        index: ModuleIndex,
        a: NodeId,
        b: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = SchemaTree::new();
        let a = tree.create_module("a", "urn:a", "a", loc());
        let b = tree.create_module("b", "urn:b", "b", loc());
        tree.add_import(b, "a", "pa").unwrap();
        tree.add_child(a, NodeKind::typedef(TypeReference::builtin(BuiltinType::Int8)), "t", loc())
            .unwrap();

        let mut index = ModuleIndex::default();
        for (root, name, namespace) in [(a, "a", "urn:a"), (b, "b", "urn:b")] {
            index.insert_unit(ModuleUnit {
                name: Id::new(name),
                namespace: Id::new(namespace),
                module: root,
                files: vec![root],
                priority: 0,
            });
            let header = tree.header(root).unwrap();
            index.insert_file(FileInfo {
                root,
                name: Id::new(name),
                unit: Id::new(name),
                prefix: header.prefix,
                imports: header.imports.clone(),
                includes: header.includes.clone(),
            });
        }
        Fixture { tree, index, a, b }
    }

    #[test]
    fn test_resolve_prefix() {
        let fx = fixture();
        assert_eq!(
            fx.index.resolve_prefix(fx.b, Some(Id::new("b"))),
            Some(PrefixTarget::Local(Id::new("b")))
        );
        assert_eq!(
            fx.index.resolve_prefix(fx.b, Some(Id::new("pa"))),
            Some(PrefixTarget::Imported(Id::new("a")))
        );
        assert_eq!(fx.index.resolve_prefix(fx.b, Some(Id::new("zz"))), None);
    }

    #[test]
    fn test_lookup_phases() {
        let mut fx = fixture();
        let leaf = fx
            .tree
            .add_child(fx.b, NodeKind::leaf(TypeReference::derived("pa:t")), "x", loc())
            .unwrap();
        let name = QualifiedName::parse("pa:t");

        let intra = LinkContext::new(&mut fx.tree, &fx.index, Phase::IntraFile);
        assert_eq!(intra.lookup(leaf, name, NodeTag::Typedef).unwrap(), Lookup::Deferred);

        let inter = LinkContext::new(&mut fx.tree, &fx.index, Phase::InterFile);
        assert!(matches!(
            inter.lookup(leaf, name, NodeTag::Typedef).unwrap(),
            Lookup::Found(_)
        ));
        assert_eq!(
            inter
                .lookup(leaf, QualifiedName::parse("pa:missing"), NodeTag::Typedef)
                .unwrap(),
            Lookup::Missing
        );
    }

    #[test]
    fn test_lookup_unknown_prefix() {
        let mut fx = fixture();
        let leaf = fx
            .tree
            .add_child(fx.a, NodeKind::leaf(TypeReference::derived("zz:t")), "x", loc())
            .unwrap();
        let ctx = LinkContext::new(&mut fx.tree, &fx.index, Phase::IntraFile);
        let err = ctx
            .lookup(leaf, QualifiedName::parse("zz:t"), NodeTag::Typedef)
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E105));
    }

    #[test]
    fn test_local_lookup_is_found_intra_file() {
        let mut fx = fixture();
        let leaf = fx
            .tree
            .add_child(fx.a, NodeKind::leaf(TypeReference::derived("t")), "x", loc())
            .unwrap();
        let ctx = LinkContext::new(&mut fx.tree, &fx.index, Phase::IntraFile);
        assert!(matches!(
            ctx.lookup(leaf, QualifiedName::parse("a:t"), NodeTag::Typedef).unwrap(),
            Lookup::Found(_)
        ));
    }
}
