//! Error codes for the linker diagnostic system.
//!
//! Error codes are organized by concern:
//! - `E0xx` - Tree structure errors
//! - `E1xx` - Naming and reference errors
//! - `E2xx` - Restriction and type errors
//! - `E3xx` - Structural and cardinality errors
//! - `E4xx` - Identity and feature errors
//! - `E5xx` - Deviation errors
//!
//! Every code belongs to exactly one [`ErrorKind`].

use std::fmt;

/// Broad error categories callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed attach attempt or stale node handle.
    TreeStructure,
    /// Two nodes with the same name in one collision scope.
    DuplicateIdentifier,
    /// A reference never reached its target.
    UnresolvedReference,
    /// A derived restriction is wider than the one it derives from.
    RestrictionNarrowing,
    /// A restriction on a builtin that does not accept it.
    RestrictionNotApplicable,
    /// A malformed restriction expression.
    InvalidRestriction,
    /// List key and element-count violations.
    Cardinality,
    /// An identity that is (transitively) its own base.
    IdentityCycle,
    /// A deviate precondition does not hold.
    Deviation,
    /// Circular imports/includes, typedef chains or groupings.
    DependencyCycle,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TreeStructure => "tree structure error",
            Self::DuplicateIdentifier => "duplicate identifier",
            Self::UnresolvedReference => "unresolved reference",
            Self::RestrictionNarrowing => "restriction narrowing error",
            Self::RestrictionNotApplicable => "restriction not applicable",
            Self::InvalidRestriction => "invalid restriction",
            Self::Cardinality => "cardinality error",
            Self::IdentityCycle => "identity cycle",
            Self::Deviation => "deviation error",
            Self::DependencyCycle => "dependency cycle",
        };
        f.write_str(text)
    }
}

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Tree Structure Errors (E0xx)
    // =========================================================================
    /// Malformed attach.
    ///
    /// A node was attached while it already had a parent, children or
    /// siblings, or below itself.
    E001,

    /// Stale node handle.
    ///
    /// A node handle refers to a node that no longer exists in the tree.
    E002,

    // =========================================================================
    // Naming and Reference Errors (E1xx)
    // =========================================================================
    /// Duplicate identifier.
    ///
    /// Two nodes with the same name share a collision scope.
    E100,

    /// Unresolved typedef.
    E101,

    /// Unresolved grouping.
    E102,

    /// Unresolved augment target.
    ///
    /// The target path does not lead to a node, or leads to a node that
    /// cannot be augmented.
    E103,

    /// Unresolved leafref target.
    ///
    /// The path does not lead to a leaf or leaf-list.
    E104,

    /// Unknown prefix.
    ///
    /// A prefix is neither the file's own prefix nor bound by an import.
    E105,

    /// Unresolved module or submodule.
    ///
    /// An import, include or belongs-to names a file not in the input.
    E106,

    /// Circular import or include.
    E107,

    /// Circular typedef chain.
    E108,

    /// Recursive grouping.
    ///
    /// A grouping uses itself, directly or through other groupings.
    E109,

    /// Malformed schema path.
    E110,

    // =========================================================================
    // Restriction and Type Errors (E2xx)
    // =========================================================================
    /// Restriction is not a narrowing of the inherited restriction.
    E200,

    /// Restriction does not apply to the builtin type.
    E201,

    /// Malformed restriction expression.
    ///
    /// Bounds out of the type's range, not ascending, overlapping, or a
    /// literal that does not parse.
    E202,

    /// Invalid fraction-digits.
    ///
    /// `decimal64` needs fraction-digits between 1 and 18, and types derived
    /// from it cannot change them.
    E203,

    // =========================================================================
    // Structure and Cardinality Errors (E3xx)
    // =========================================================================
    /// Configuration list without keys.
    E300,

    /// Key does not name a leaf child of the list.
    E301,

    /// Key leaf of type `empty`.
    E302,

    /// Key leaf config differs from the list's.
    E303,

    /// `min-elements` greater than `max-elements`.
    E304,

    // =========================================================================
    // Identity and Feature Errors (E4xx)
    // =========================================================================
    /// Identity base cycle.
    E400,

    /// Unresolved base identity.
    E401,

    /// Unresolved feature.
    E402,

    /// Unresolved identityref base.
    E403,

    // =========================================================================
    // Deviation Errors (E5xx)
    // =========================================================================
    /// `deviate add` of a property that already exists.
    E500,

    /// `deviate delete` of a missing or different property.
    E501,

    /// `deviate replace` of a missing property.
    E502,

    /// Unresolved deviation target.
    E503,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",

            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            ErrorCode::E107 => "E107",
            ErrorCode::E108 => "E108",
            ErrorCode::E109 => "E109",
            ErrorCode::E110 => "E110",

            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",

            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",

            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
            ErrorCode::E403 => "E403",

            ErrorCode::E500 => "E500",
            ErrorCode::E501 => "E501",
            ErrorCode::E502 => "E502",
            ErrorCode::E503 => "E503",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "malformed attach",
            ErrorCode::E002 => "stale node handle",

            ErrorCode::E100 => "duplicate identifier",
            ErrorCode::E101 => "unresolved typedef",
            ErrorCode::E102 => "unresolved grouping",
            ErrorCode::E103 => "unresolved augment target",
            ErrorCode::E104 => "unresolved leafref target",
            ErrorCode::E105 => "unknown prefix",
            ErrorCode::E106 => "unresolved module or submodule",
            ErrorCode::E107 => "circular import or include",
            ErrorCode::E108 => "circular typedef chain",
            ErrorCode::E109 => "recursive grouping",
            ErrorCode::E110 => "malformed schema path",

            ErrorCode::E200 => "restriction is not a narrowing",
            ErrorCode::E201 => "restriction not applicable to type",
            ErrorCode::E202 => "malformed restriction",
            ErrorCode::E203 => "invalid fraction-digits",

            ErrorCode::E300 => "list without keys",
            ErrorCode::E301 => "key is not a leaf child",
            ErrorCode::E302 => "key leaf of type empty",
            ErrorCode::E303 => "key config mismatch",
            ErrorCode::E304 => "min-elements exceeds max-elements",

            ErrorCode::E400 => "identity base cycle",
            ErrorCode::E401 => "unresolved base identity",
            ErrorCode::E402 => "unresolved feature",
            ErrorCode::E403 => "unresolved identityref base",

            ErrorCode::E500 => "deviate add of existing property",
            ErrorCode::E501 => "deviate delete of missing or different property",
            ErrorCode::E502 => "deviate replace of missing property",
            ErrorCode::E503 => "unresolved deviation target",
        }
    }

    /// The error kind this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::E001 | ErrorCode::E002 => ErrorKind::TreeStructure,
            ErrorCode::E100 => ErrorKind::DuplicateIdentifier,
            ErrorCode::E101
            | ErrorCode::E102
            | ErrorCode::E103
            | ErrorCode::E104
            | ErrorCode::E105
            | ErrorCode::E106
            | ErrorCode::E110
            | ErrorCode::E401
            | ErrorCode::E402
            | ErrorCode::E403
            | ErrorCode::E503 => ErrorKind::UnresolvedReference,
            ErrorCode::E107 | ErrorCode::E108 | ErrorCode::E109 => ErrorKind::DependencyCycle,
            ErrorCode::E200 => ErrorKind::RestrictionNarrowing,
            ErrorCode::E201 => ErrorKind::RestrictionNotApplicable,
            ErrorCode::E202 | ErrorCode::E203 => ErrorKind::InvalidRestriction,
            ErrorCode::E300 | ErrorCode::E301 | ErrorCode::E302 | ErrorCode::E303 | ErrorCode::E304 => {
                ErrorKind::Cardinality
            }
            ErrorCode::E400 => ErrorKind::IdentityCycle,
            ErrorCode::E500 | ErrorCode::E501 | ErrorCode::E502 => ErrorKind::Deviation,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::E001.as_str(), "E001");
        assert_eq!(ErrorCode::E110.as_str(), "E110");
        assert_eq!(ErrorCode::E503.as_str(), "E503");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::E200), "E200");
    }

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::E100.kind(), ErrorKind::DuplicateIdentifier);
        assert_eq!(ErrorCode::E200.kind(), ErrorKind::RestrictionNarrowing);
        assert_eq!(ErrorCode::E201.kind(), ErrorKind::RestrictionNotApplicable);
        assert_eq!(ErrorCode::E302.kind(), ErrorKind::Cardinality);
        assert_eq!(ErrorCode::E400.kind(), ErrorKind::IdentityCycle);
        assert_eq!(ErrorCode::E108.kind(), ErrorKind::DependencyCycle);
        assert_eq!(ErrorCode::E503.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E302.description(), "key leaf of type empty");
    }
}
