//! Construct kinds and their per-kind data.
//!
//! Every schema construct is a [`SchemaNode`](crate::node::SchemaNode) whose
//! [`NodeKind`] carries the data specific to that construct. Capabilities
//! that only some kinds have (owning a type, being a data node, opening a
//! collision scope) are answered by matching on the kind.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::{
    arena::NodeId,
    identifier::{Id, QualifiedName},
    queue::ResolutionQueues,
    status::ResolutionStatus,
    types::TypeReference,
};

/// An `import` statement of a module or submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: Id,
    pub prefix: Id,
}

impl Import {
    pub fn new(module: impl Into<Id>, prefix: impl Into<Id>) -> Self {
        Self {
            module: module.into(),
            prefix: prefix.into(),
        }
    }
}

/// Header statements shared by modules and submodules.
#[derive(Debug, Clone, Default)]
pub struct FileHeader {
    pub prefix: Option<Id>,
    pub imports: Vec<Import>,
    pub includes: Vec<Id>,
    /// Pending work for this file, drained by the scheduler.
    pub queues: ResolutionQueues,
    /// Deviation targets already deviated by this file.
    pub deviation_clones: IndexMap<NodeId, DeviatedCopy>,
}

/// The copy of a deviation target that one file's deviations edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviatedCopy {
    /// `None` once a deviation marked the target not-supported.
    pub clone: Option<NodeId>,
    /// Deviations holding a handle to `clone`.
    pub owners: Vec<NodeId>,
}

impl FileHeader {
    /// Module name bound to `prefix` by an import of this file.
    pub fn imported_module(&self, prefix: Id) -> Option<Id> {
        self.imports
            .iter()
            .find(|import| import.prefix == prefix)
            .map(|import| import.module)
    }
}

#[derive(Debug, Clone)]
pub struct ModuleData {
    pub namespace: Id,
    pub header: FileHeader,
}

#[derive(Debug, Clone)]
pub struct SubModuleData {
    /// Name of the module this submodule belongs to.
    pub belongs_to: Id,
    pub header: FileHeader,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerData {
    pub presence: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListData {
    pub keys: Vec<Id>,
}

/// A `leaf` or `leaf-list`.
#[derive(Debug, Clone)]
pub struct LeafData {
    pub ty: TypeReference,
    /// The grouping leaf this one was instantiated from. Never owning.
    pub template: Option<NodeId>,
    pub is_key: bool,
}

impl LeafData {
    pub fn new(ty: TypeReference) -> Self {
        Self {
            ty,
            template: None,
            is_key: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UsesData {
    pub grouping: QualifiedName,
    pub target: Option<NodeId>,
    pub status: ResolutionStatus,
}

#[derive(Debug, Clone)]
pub struct TypedefData {
    pub ty: TypeReference,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityData {
    pub base: Option<QualifiedName>,
    pub base_node: Option<NodeId>,
    pub status: ResolutionStatus,
    /// Identities declaring this one as their base.
    pub derived: IndexSet<NodeId>,
    /// Transitive closure of `derived`.
    pub all_derived: IndexSet<NodeId>,
    pub added_to_ancestors: bool,
}

#[derive(Debug, Clone)]
pub struct AugmentData {
    pub path: String,
    pub target: Option<NodeId>,
    pub status: ResolutionStatus,
}

/// Properties a deviation can add, replace or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub default: Option<String>,
    pub units: Option<String>,
    pub must: Vec<String>,
    pub unique: Vec<String>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<u32>,
}

/// One `deviate` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deviate {
    NotSupported,
    Add(Properties),
    Replace(Properties),
    Delete(Properties),
}

impl fmt::Display for Deviate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotSupported => "not-supported",
            Self::Add(_) => "add",
            Self::Replace(_) => "replace",
            Self::Delete(_) => "delete",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct DeviationData {
    pub path: String,
    pub deviates: Vec<Deviate>,
    pub target: Option<NodeId>,
    /// The per-module clone the deviates were applied to.
    pub clone: Option<NodeId>,
    pub status: ResolutionStatus,
}

/// Value table of a `union` type: its member types.
#[derive(Debug, Clone, Default)]
pub struct UnionData {
    pub members: Vec<TypeReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: Id,
    pub value: i64,
}

/// Value table of an `enumeration` type.
#[derive(Debug, Clone, Default)]
pub struct EnumerationData {
    pub values: Vec<EnumValue>,
}

impl EnumerationData {
    /// Builds a table from names and optional explicit values. Implicit values
    /// continue from the highest value assigned so far.
    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, Option<i64>)>) -> Self {
        let mut next = 0i64;
        let values = values
            .into_iter()
            .map(|(name, value)| {
                let value = value.unwrap_or(next);
                next = next.max(value.saturating_add(1));
                EnumValue {
                    name: Id::new(name),
                    value,
                }
            })
            .collect();
        Self { values }
    }
}

/// Construct kind with per-kind data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Module(ModuleData),
    SubModule(SubModuleData),
    Container(ContainerData),
    List(ListData),
    Leaf(LeafData),
    LeafList(LeafData),
    Choice,
    Case,
    Grouping,
    Uses(UsesData),
    Typedef(TypedefData),
    Identity(IdentityData),
    Augment(AugmentData),
    Deviation(DeviationData),
    Rpc,
    Input,
    Output,
    Notification,
    AnyData,
    Union(UnionData),
    Enumeration(EnumerationData),
    Feature,
}

/// Data-free discriminant of [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Module,
    SubModule,
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    Grouping,
    Uses,
    Typedef,
    Identity,
    Augment,
    Deviation,
    Rpc,
    Input,
    Output,
    Notification,
    AnyData,
    Union,
    Enumeration,
    Feature,
}

impl NodeTag {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::SubModule => "submodule",
            Self::Container => "container",
            Self::List => "list",
            Self::Leaf => "leaf",
            Self::LeafList => "leaf-list",
            Self::Choice => "choice",
            Self::Case => "case",
            Self::Grouping => "grouping",
            Self::Uses => "uses",
            Self::Typedef => "typedef",
            Self::Identity => "identity",
            Self::Augment => "augment",
            Self::Deviation => "deviation",
            Self::Rpc => "rpc",
            Self::Input => "input",
            Self::Output => "output",
            Self::Notification => "notification",
            Self::AnyData => "anydata",
            Self::Union => "union",
            Self::Enumeration => "enumeration",
            Self::Feature => "feature",
        }
    }

    /// Module or submodule.
    pub fn is_file_root(&self) -> bool {
        matches!(self, Self::Module | Self::SubModule)
    }

    /// Leaf or leaf-list.
    pub fn is_leaf_like(&self) -> bool {
        matches!(self, Self::Leaf | Self::LeafList)
    }

    /// Nodes that hold instance data.
    pub fn is_data_node(&self) -> bool {
        matches!(
            self,
            Self::Container | Self::List | Self::Leaf | Self::LeafList | Self::Choice | Self::Case | Self::AnyData
        )
    }

    /// Kinds an augment may target.
    pub fn is_augmentable(&self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::List
                | Self::Case
                | Self::Input
                | Self::Output
                | Self::Notification
                | Self::Choice
        )
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl NodeKind {
    pub fn container() -> Self {
        Self::Container(ContainerData::default())
    }

    pub fn list(keys: &[&str]) -> Self {
        Self::List(ListData {
            keys: keys.iter().map(|key| Id::new(key)).collect(),
        })
    }

    pub fn leaf(ty: TypeReference) -> Self {
        Self::Leaf(LeafData::new(ty))
    }

    pub fn leaf_list(ty: TypeReference) -> Self {
        Self::LeafList(LeafData::new(ty))
    }

    pub fn uses(grouping: &str) -> Self {
        Self::Uses(UsesData {
            grouping: QualifiedName::parse(grouping),
            target: None,
            status: ResolutionStatus::Unresolved,
        })
    }

    pub fn typedef(ty: TypeReference) -> Self {
        Self::Typedef(TypedefData { ty })
    }

    pub fn identity(base: Option<&str>) -> Self {
        Self::Identity(IdentityData {
            base: base.map(QualifiedName::parse),
            ..IdentityData::default()
        })
    }

    pub fn augment(path: &str) -> Self {
        Self::Augment(AugmentData {
            path: path.to_string(),
            target: None,
            status: ResolutionStatus::Unresolved,
        })
    }

    pub fn deviation(path: &str, deviates: Vec<Deviate>) -> Self {
        Self::Deviation(DeviationData {
            path: path.to_string(),
            deviates,
            target: None,
            clone: None,
            status: ResolutionStatus::Unresolved,
        })
    }

    pub fn union(members: Vec<TypeReference>) -> Self {
        Self::Union(UnionData { members })
    }

    pub fn enumeration(data: EnumerationData) -> Self {
        Self::Enumeration(data)
    }

    pub fn tag(&self) -> NodeTag {
        match self {
            Self::Module(_) => NodeTag::Module,
            Self::SubModule(_) => NodeTag::SubModule,
            Self::Container(_) => NodeTag::Container,
            Self::List(_) => NodeTag::List,
            Self::Leaf(_) => NodeTag::Leaf,
            Self::LeafList(_) => NodeTag::LeafList,
            Self::Choice => NodeTag::Choice,
            Self::Case => NodeTag::Case,
            Self::Grouping => NodeTag::Grouping,
            Self::Uses(_) => NodeTag::Uses,
            Self::Typedef(_) => NodeTag::Typedef,
            Self::Identity(_) => NodeTag::Identity,
            Self::Augment(_) => NodeTag::Augment,
            Self::Deviation(_) => NodeTag::Deviation,
            Self::Rpc => NodeTag::Rpc,
            Self::Input => NodeTag::Input,
            Self::Output => NodeTag::Output,
            Self::Notification => NodeTag::Notification,
            Self::AnyData => NodeTag::AnyData,
            Self::Union(_) => NodeTag::Union,
            Self::Enumeration(_) => NodeTag::Enumeration,
            Self::Feature => NodeTag::Feature,
        }
    }

    /// The type reference owned by a leaf, leaf-list or typedef.
    pub fn type_ref(&self) -> Option<&TypeReference> {
        match self {
            Self::Leaf(data) | Self::LeafList(data) => Some(&data.ty),
            Self::Typedef(data) => Some(&data.ty),
            _ => None,
        }
    }

    pub fn type_ref_mut(&mut self) -> Option<&mut TypeReference> {
        match self {
            Self::Leaf(data) | Self::LeafList(data) => Some(&mut data.ty),
            Self::Typedef(data) => Some(&mut data.ty),
            _ => None,
        }
    }

    pub fn leaf_data(&self) -> Option<&LeafData> {
        match self {
            Self::Leaf(data) | Self::LeafList(data) => Some(data),
            _ => None,
        }
    }

    pub fn leaf_data_mut(&mut self) -> Option<&mut LeafData> {
        match self {
            Self::Leaf(data) | Self::LeafList(data) => Some(data),
            _ => None,
        }
    }

    pub fn file_header(&self) -> Option<&FileHeader> {
        match self {
            Self::Module(data) => Some(&data.header),
            Self::SubModule(data) => Some(&data.header),
            _ => None,
        }
    }

    pub fn file_header_mut(&mut self) -> Option<&mut FileHeader> {
        match self {
            Self::Module(data) => Some(&mut data.header),
            Self::SubModule(data) => Some(&mut data.header),
            _ => None,
        }
    }

    /// Resolution status of the reference this node represents, if it is one.
    ///
    /// Leaves report the lower of the type's status and, for leafrefs, the
    /// path's status.
    pub fn status(&self) -> Option<ResolutionStatus> {
        match self {
            Self::Uses(data) => Some(data.status),
            Self::Augment(data) => Some(data.status),
            Self::Deviation(data) => Some(data.status),
            Self::Identity(data) => data.base.map(|_| data.status),
            Self::Leaf(data) | Self::LeafList(data) => Some(match data.ty.leafref() {
                Some(leafref) => data.ty.status.min(leafref.status),
                None => data.ty.status,
            }),
            // A typedef's leafref path is walked by each leaf using it
            Self::Typedef(data) => Some(data.ty.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuiltinType;

    #[test]
    fn test_enumeration_implicit_values() {
        let data = EnumerationData::from_values([("up", None), ("down", Some(5)), ("testing", None)]);
        let values: Vec<i64> = data.values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![0, 5, 6]);
    }

    #[test]
    fn test_augmentable_kinds() {
        assert!(NodeTag::Choice.is_augmentable());
        assert!(NodeTag::Input.is_augmentable());
        assert!(!NodeTag::Leaf.is_augmentable());
        assert!(!NodeTag::Grouping.is_augmentable());
    }

    #[test]
    fn test_status_of_leafref_leaf_is_minimum() {
        let mut kind = NodeKind::leaf(TypeReference::leafref_path("../x"));
        kind.type_ref_mut().unwrap().status = ResolutionStatus::Resolved;
        assert_eq!(kind.status(), Some(ResolutionStatus::Unresolved));

        let plain = NodeKind::leaf(TypeReference::builtin(BuiltinType::String));
        assert_eq!(plain.status(), Some(ResolutionStatus::Unresolved));
        assert_eq!(NodeKind::container().status(), None);
    }

    #[test]
    fn test_identity_without_base_has_no_status() {
        assert_eq!(NodeKind::identity(None).status(), None);
        assert_eq!(
            NodeKind::identity(Some("base")).status(),
            Some(ResolutionStatus::Unresolved)
        );
    }
}
