//! Type references and their resolved form.
//!
//! A [`TypeReference`] is a `type` statement as declared: a builtin keyword
//! or a (possibly prefixed) typedef name, plus whatever restrictions and
//! extended information were written inline. Resolution fills in the
//! referenced typedef and the [`ResolvedType`]: the effective builtin at the
//! end of the typedef chain with all restrictions merged.

use std::fmt;

use crate::{
    arena::NodeId,
    identifier::{Id, QualifiedName},
    restriction::{RestrictionExpr, RestrictionSet, ValueDomain},
    status::ResolutionStatus,
};

/// Builtin types of the schema language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Boolean,
    Enumeration,
    Bits,
    Binary,
    Leafref,
    Identityref,
    Empty,
    Union,
    InstanceIdentifier,
}

/// Which restriction statements a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionClass {
    /// `range` over an integer domain.
    Range(ValueDomain),
    /// `range` over a fraction-digit-scaled decimal domain.
    DecimalRange,
    /// `length` and `pattern`.
    LengthAndPattern,
    /// `length` only.
    Length,
    /// No restriction statements at all.
    None,
}

impl BuiltinType {
    const ALL: [BuiltinType; 19] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Decimal64,
        Self::String,
        Self::Boolean,
        Self::Enumeration,
        Self::Bits,
        Self::Binary,
        Self::Leafref,
        Self::Identityref,
        Self::Empty,
        Self::Union,
        Self::InstanceIdentifier,
    ];

    /// Looks up a builtin by its keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.keyword() == keyword)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Decimal64 => "decimal64",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Enumeration => "enumeration",
            Self::Bits => "bits",
            Self::Binary => "binary",
            Self::Leafref => "leafref",
            Self::Identityref => "identityref",
            Self::Empty => "empty",
            Self::Union => "union",
            Self::InstanceIdentifier => "instance-identifier",
        }
    }

    pub fn restriction_class(&self) -> RestrictionClass {
        match self {
            Self::Int8 => RestrictionClass::Range(ValueDomain::integer(i8::MIN as i128, i8::MAX as i128)),
            Self::Int16 => {
                RestrictionClass::Range(ValueDomain::integer(i16::MIN as i128, i16::MAX as i128))
            }
            Self::Int32 => {
                RestrictionClass::Range(ValueDomain::integer(i32::MIN as i128, i32::MAX as i128))
            }
            Self::Int64 => {
                RestrictionClass::Range(ValueDomain::integer(i64::MIN as i128, i64::MAX as i128))
            }
            Self::Uint8 => RestrictionClass::Range(ValueDomain::integer(0, u8::MAX as i128)),
            Self::Uint16 => RestrictionClass::Range(ValueDomain::integer(0, u16::MAX as i128)),
            Self::Uint32 => RestrictionClass::Range(ValueDomain::integer(0, u32::MAX as i128)),
            Self::Uint64 => RestrictionClass::Range(ValueDomain::integer(0, u64::MAX as i128)),
            Self::Decimal64 => RestrictionClass::DecimalRange,
            Self::String => RestrictionClass::LengthAndPattern,
            Self::Binary => RestrictionClass::Length,
            Self::Boolean
            | Self::Enumeration
            | Self::Bits
            | Self::Leafref
            | Self::Identityref
            | Self::Empty
            | Self::Union
            | Self::InstanceIdentifier => RestrictionClass::None,
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Builtin-or-derived tag of a type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Builtin(BuiltinType),
    Derived,
}

/// Restriction statements written inline under a `type` statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredRestrictions {
    pub range: Option<RestrictionExpr>,
    pub length: Option<RestrictionExpr>,
    pub patterns: Vec<String>,
    pub fraction_digits: Option<u8>,
}

impl DeclaredRestrictions {
    pub fn is_empty(&self) -> bool {
        self.range.is_none()
            && self.length.is_none()
            && self.patterns.is_empty()
            && self.fraction_digits.is_none()
    }
}

/// State of a `leafref` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafrefInfo {
    pub path: String,
    pub require_instance: bool,
    /// Target leaf or leaf-list, set by path walking.
    pub target: Option<NodeId>,
    pub status: ResolutionStatus,
    /// Effective type adopted from the target.
    pub effective: Option<Box<ResolvedType>>,
    /// Conditional-feature annotations accumulated along the chain.
    pub if_features: Vec<QualifiedName>,
}

impl LeafrefInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            require_instance: true,
            target: None,
            status: ResolutionStatus::Unresolved,
            effective: None,
            if_features: Vec::new(),
        }
    }
}

/// State of an `identityref` base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityrefInfo {
    pub base: QualifiedName,
    pub identity: Option<NodeId>,
}

/// A named bit of a `bits` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bit {
    pub name: Id,
    pub position: u32,
}

/// Extended information that depends on the builtin kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeInfo {
    #[default]
    None,
    /// The [`NodeKind::Enumeration`](crate::kind::NodeKind::Enumeration) node
    /// holding the value table.
    Enumeration(NodeId),
    Bits(Vec<Bit>),
    /// The [`NodeKind::Union`](crate::kind::NodeKind::Union) node holding the
    /// member types.
    Union(NodeId),
    Leafref(LeafrefInfo),
    Identityref(IdentityrefInfo),
}

impl TypeInfo {
    /// The value-table node this info points at, if any.
    pub fn table_node(&self) -> Option<NodeId> {
        match self {
            Self::Enumeration(id) | Self::Union(id) => Some(*id),
            _ => None,
        }
    }

    /// Rewrites a value-table reference through `remap`.
    pub fn remap_table(&mut self, remap: impl Fn(NodeId) -> Option<NodeId>) {
        match self {
            Self::Enumeration(id) | Self::Union(id) => {
                if let Some(new_id) = remap(*id) {
                    *id = new_id;
                }
            }
            _ => {}
        }
    }
}

/// The effective type after chasing typedefs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub builtin: BuiltinType,
    pub range: Option<RestrictionSet<i128>>,
    pub length: Option<RestrictionSet<i128>>,
    pub patterns: Vec<String>,
    pub fraction_digits: Option<u8>,
    pub info: TypeInfo,
}

impl ResolvedType {
    /// An unrestricted builtin.
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self {
            builtin,
            range: None,
            length: None,
            patterns: Vec::new(),
            fraction_digits: None,
            info: TypeInfo::None,
        }
    }
}

/// A declared `type` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    name: QualifiedName,
    kind: TypeKind,
    pub restrictions: DeclaredRestrictions,
    pub info: TypeInfo,
    pub status: ResolutionStatus,
    /// The typedef a derived reference points at, once found.
    pub typedef: Option<NodeId>,
    pub effective: Option<ResolvedType>,
}

impl TypeReference {
    /// Classifies `text` as a builtin (unprefixed builtin keyword) or a derived reference.
    ///
    /// ```
    /// use yanglink_core::types::{BuiltinType, TypeKind, TypeReference};
    ///
    /// assert_eq!(TypeReference::parse("string").kind(), TypeKind::Builtin(BuiltinType::String));
    /// assert_eq!(TypeReference::parse("t:percent").kind(), TypeKind::Derived);
    /// ```
    pub fn parse(text: &str) -> Self {
        let name = QualifiedName::parse(text);
        let kind = match name.prefix() {
            None => BuiltinType::from_keyword(text.trim())
                .map(TypeKind::Builtin)
                .unwrap_or(TypeKind::Derived),
            Some(_) => TypeKind::Derived,
        };
        Self {
            name,
            kind,
            restrictions: DeclaredRestrictions::default(),
            info: TypeInfo::None,
            status: ResolutionStatus::Unresolved,
            typedef: None,
            effective: None,
        }
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::parse(builtin.keyword())
    }

    pub fn derived(name: &str) -> Self {
        let mut reference = Self::parse(name);
        reference.kind = TypeKind::Derived;
        reference
    }

    /// A `leafref` with the given path.
    pub fn leafref_path(path: &str) -> Self {
        Self::builtin(BuiltinType::Leafref).with_info(TypeInfo::Leafref(LeafrefInfo::new(path)))
    }

    /// An `identityref` with the given base.
    pub fn identityref(base: &str) -> Self {
        Self::builtin(BuiltinType::Identityref).with_info(TypeInfo::Identityref(IdentityrefInfo {
            base: QualifiedName::parse(base),
            identity: None,
        }))
    }

    pub fn with_range(mut self, range: RestrictionExpr) -> Self {
        self.restrictions.range = Some(range);
        self
    }

    pub fn with_length(mut self, length: RestrictionExpr) -> Self {
        self.restrictions.length = Some(length);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.restrictions.patterns.push(pattern.into());
        self
    }

    pub fn with_fraction_digits(mut self, fraction_digits: u8) -> Self {
        self.restrictions.fraction_digits = Some(fraction_digits);
        self
    }

    pub fn with_info(mut self, info: TypeInfo) -> Self {
        self.info = info;
        self
    }

    pub fn name(&self) -> QualifiedName {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_derived(&self) -> bool {
        self.kind == TypeKind::Derived
    }

    /// The effective builtin, if resolved (or if this is itself a builtin).
    pub fn effective_builtin(&self) -> Option<BuiltinType> {
        match (&self.effective, self.kind) {
            (Some(effective), _) => Some(effective.builtin),
            (None, TypeKind::Builtin(builtin)) => Some(builtin),
            (None, TypeKind::Derived) => None,
        }
    }

    /// The type values of this reference take: the target's type for a
    /// resolved leafref, the effective type otherwise.
    pub fn value_type(&self) -> Option<&ResolvedType> {
        match self.leafref() {
            Some(leafref) => leafref.effective.as_deref(),
            None => self.effective.as_ref(),
        }
    }

    /// The leafref state carried by this reference, if any.
    pub fn leafref(&self) -> Option<&LeafrefInfo> {
        match &self.info {
            TypeInfo::Leafref(info) => Some(info),
            _ => None,
        }
    }

    pub fn leafref_mut(&mut self) -> Option<&mut LeafrefInfo> {
        match &mut self.info {
            TypeInfo::Leafref(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
