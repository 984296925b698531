//! Merging of range, length and pattern restrictions along a derivation chain.
//!
//! Range and length restrictions only ever narrow: a restriction declared on
//! a derived type must lie inside the restriction it inherits. Patterns are
//! additive; a value must match every pattern of the chain.

use std::borrow::Cow;

use yanglink_core::{
    SourceLocation,
    restriction::{RestrictionError, RestrictionExpr, RestrictionSet, ValueDomain},
};

use crate::error::{Diagnostic, ErrorCode};

/// Why a restriction could not be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestrictionFailure {
    /// The expression itself is malformed or outside the type's domain.
    Invalid(RestrictionError),
    /// The resolved restriction is wider than the inherited one.
    Narrowing {
        restriction: RestrictionSet<i128>,
        inherited: RestrictionSet<i128>,
    },
}

impl RestrictionFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Invalid(_) => ErrorCode::E202,
            Self::Narrowing { .. } => ErrorCode::E200,
        }
    }

    /// Turns the failure into a diagnostic for the `statement` (`range` or
    /// `length`) declared at `location`.
    pub fn into_diagnostic(self, statement: &str, construct: String, location: SourceLocation) -> Diagnostic {
        let code = self.code();
        match self {
            Self::Invalid(err) => Diagnostic::error(format!("invalid {statement} restriction: {err}"))
                .with_code(code)
                .with_construct(construct)
                .with_label(location, format!("{statement} declared here")),
            Self::Narrowing { restriction, inherited } => Diagnostic::error(format!(
                "{statement} `{restriction}` is not a narrowing of the inherited {statement} `{inherited}`"
            ))
            .with_code(code)
            .with_construct(construct)
            .with_label(location, format!("{statement} declared here"))
            .with_help(format!("every interval must lie inside `{inherited}`")),
        }
    }
}

/// Resolves a `length` restriction over the non-negative length domain.
///
/// With neither restriction present the result is `None`. With only an
/// inherited restriction it is returned as is.
pub fn resolve_length<'a>(
    own: Option<&RestrictionExpr>,
    inherited: Option<&'a RestrictionSet<i128>>,
) -> Result<Option<Cow<'a, RestrictionSet<i128>>>, RestrictionFailure> {
    resolve_range(own, inherited, ValueDomain::length())
}

/// Resolves a `range` restriction over `domain`, checking it narrows
/// `inherited`.
///
/// `min` and `max` in `own` stand for the inherited restriction's lowest and
/// highest bounds, or the domain's bounds if nothing is inherited.
pub fn resolve_range<'a>(
    own: Option<&RestrictionExpr>,
    inherited: Option<&'a RestrictionSet<i128>>,
    domain: ValueDomain,
) -> Result<Option<Cow<'a, RestrictionSet<i128>>>, RestrictionFailure> {
    let Some(expr) = own else {
        return Ok(inherited.map(Cow::Borrowed));
    };

    let resolved = expr
        .resolve(domain, inherited)
        .map_err(RestrictionFailure::Invalid)?;
    if let Some(inherited) = inherited
        && !resolved.is_subset_of(inherited)
    {
        return Err(RestrictionFailure::Narrowing {
            restriction: resolved,
            inherited: inherited.clone(),
        });
    }
    Ok(Some(Cow::Owned(resolved)))
}

/// Patterns of a derived type: inherited ones first, then its own.
pub fn resolve_patterns(own: &[String], inherited: &[String]) -> Vec<String> {
    let mut patterns = inherited.to_vec();
    for pattern in own {
        if !patterns.contains(pattern) {
            patterns.push(pattern.clone());
        }
    }
    patterns
}
