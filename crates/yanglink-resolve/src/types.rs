//! Type and typedef resolution.
//!
//! A type reference resolves to a [`ResolvedType`]: the builtin at the end of
//! its typedef chain together with every restriction of the chain merged.
//! Typedefs are resolved on demand, depth first, so a leaf can be resolved
//! before the typedefs it refers to have been visited by the queue.
//!
//! When a typedef lives in another file the lookup is deferred during the
//! intra-file phase and the reference stops at
//! [`ResolutionStatus::IntraFileResolved`].

use log::trace;
use yanglink_core::{
    NodeId, NodeKind, NodeTag, ResolutionStatus,
    queue::QueueKind,
    restriction::ValueDomain,
    types::{BuiltinType, DeclaredRestrictions, LeafrefInfo, RestrictionClass, ResolvedType, TypeInfo, TypeKind, TypeReference},
};

use crate::{
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
    restriction::{resolve_length, resolve_patterns, resolve_range},
};

/// Resolves the type owned by a leaf, leaf-list or typedef.
pub fn resolve_type(ctx: &mut LinkContext, owner: NodeId) -> Result<ResolutionStatus> {
    let mut visiting = Vec::new();
    resolve_owned(ctx, owner, &mut visiting)
}

fn resolve_owned(ctx: &mut LinkContext, owner: NodeId, visiting: &mut Vec<NodeId>) -> Result<ResolutionStatus> {
    let Some(ty) = ctx.node(owner)?.kind().type_ref() else {
        return Ok(ResolutionStatus::Resolved);
    };
    if ty.status.is_resolved() {
        return Ok(ResolutionStatus::Resolved);
    }

    let mut ty = ty.clone();
    let status = resolve_reference(ctx, owner, &mut ty, visiting)?;
    ty.status.advance(status);
    let current = ty.status;
    if let Some(slot) = ctx.node_mut(owner)?.kind_mut().type_ref_mut() {
        *slot = ty;
    }

    trace!(owner:?, status:? = current; "Resolved type");
    Ok(current)
}

fn resolve_reference(
    ctx: &mut LinkContext,
    owner: NodeId,
    ty: &mut TypeReference,
    visiting: &mut Vec<NodeId>,
) -> Result<ResolutionStatus> {
    match ty.kind() {
        TypeKind::Builtin(builtin) => resolve_builtin(ctx, owner, ty, builtin, visiting),
        TypeKind::Derived => resolve_derived(ctx, owner, ty, visiting),
    }
}

fn resolve_builtin(
    ctx: &mut LinkContext,
    owner: NodeId,
    ty: &mut TypeReference,
    builtin: BuiltinType,
    visiting: &mut Vec<NodeId>,
) -> Result<ResolutionStatus> {
    let mut base = ResolvedType::builtin(builtin);
    match (builtin, ty.restrictions.fraction_digits) {
        (BuiltinType::Decimal64, Some(digits @ 1..=18)) => base.fraction_digits = Some(digits),
        (BuiltinType::Decimal64, digits) => {
            let found = digits.map_or_else(|| "none".to_string(), |d| d.to_string());
            return Err(Diagnostic::error(format!(
                "decimal64 needs fraction-digits between 1 and 18, found {found}"
            ))
            .with_code(ErrorCode::E203)
            .with_construct(ctx.describe(owner))
            .with_label(ctx.location(owner), "type declared here"));
        }
        (_, Some(_)) => return Err(not_applicable(ctx, owner, "fraction-digits", builtin)),
        (_, None) => {}
    }

    let mut effective = apply_restrictions(ctx, owner, &base, &ty.restrictions)?;

    let status = match &mut ty.info {
        TypeInfo::Union(table) => resolve_union(ctx, *table, visiting)?,
        TypeInfo::Identityref(info) => {
            match ctx.lookup(owner, info.base, NodeTag::Identity)? {
                Lookup::Found(identity) => {
                    info.identity = Some(identity);
                    ResolutionStatus::Resolved
                }
                Lookup::Deferred => ResolutionStatus::IntraFileResolved,
                Lookup::Missing => {
                    return Err(Diagnostic::error(format!("identityref base `{}` not found", info.base))
                        .with_code(ErrorCode::E403)
                        .with_construct(ctx.describe(owner))
                        .with_label(ctx.location(owner), "referenced here"));
                }
            }
        }
        _ => ResolutionStatus::Resolved,
    };

    if status.is_resolved() {
        effective.info = ty.info.clone();
        ty.effective = Some(effective);
    }
    Ok(status)
}

/// Resolves every member of a union; the union is as resolved as its
/// least resolved member.
fn resolve_union(ctx: &mut LinkContext, table: NodeId, visiting: &mut Vec<NodeId>) -> Result<ResolutionStatus> {
    let members = match ctx.node(table)?.kind() {
        NodeKind::Union(data) => data.members.clone(),
        _ => return Ok(ResolutionStatus::Resolved),
    };

    let mut status = ResolutionStatus::Resolved;
    let mut resolved = Vec::with_capacity(members.len());
    for mut member in members {
        if !member.status.is_resolved() {
            let member_status = resolve_reference(ctx, table, &mut member, visiting)?;
            member.status.advance(member_status);
        }
        status = status.min(member.status);
        resolved.push(member);
    }

    if let NodeKind::Union(data) = ctx.node_mut(table)?.kind_mut() {
        data.members = resolved;
    }
    Ok(status)
}

fn resolve_derived(
    ctx: &mut LinkContext,
    owner: NodeId,
    ty: &mut TypeReference,
    visiting: &mut Vec<NodeId>,
) -> Result<ResolutionStatus> {
    let typedef = match ctx.lookup(owner, ty.name(), NodeTag::Typedef)? {
        Lookup::Found(typedef) => typedef,
        Lookup::Deferred => return Ok(ResolutionStatus::IntraFileResolved),
        Lookup::Missing => {
            return Err(Diagnostic::error(format!("typedef `{}` not found", ty.name()))
                .with_code(ErrorCode::E101)
                .with_construct(ctx.describe(owner))
                .with_label(ctx.location(owner), "referenced here")
                .with_help("check the name, the prefix and the imports"));
        }
    };
    ty.typedef = Some(typedef);

    if typedef == owner || visiting.contains(&typedef) {
        return Err(Diagnostic::error(format!("typedef `{}` is part of a circular chain", ty.name()))
            .with_code(ErrorCode::E108)
            .with_construct(ctx.describe(owner))
            .with_label(ctx.location(owner), "chain continues here")
            .with_secondary_label(ctx.location(typedef), "typedef declared here"));
    }

    visiting.push(owner);
    let base_status = resolve_owned(ctx, typedef, visiting);
    visiting.pop();
    if !base_status?.is_resolved() {
        return Ok(ResolutionStatus::IntraFileResolved);
    }

    let Some(base) = ctx
        .node(typedef)?
        .kind()
        .type_ref()
        .and_then(|base| base.effective.clone())
    else {
        return Ok(ResolutionStatus::IntraFileResolved);
    };

    if ty.restrictions.fraction_digits.is_some() {
        return Err(Diagnostic::error("fraction-digits can only be set on decimal64 itself")
            .with_code(ErrorCode::E203)
            .with_construct(ctx.describe(owner))
            .with_label(ctx.location(owner), "type declared here"));
    }

    let effective = apply_restrictions(ctx, owner, &base, &ty.restrictions)?;

    // A leaf typed by a leafref typedef walks the path itself
    if let TypeInfo::Leafref(inherited) = &base.info
        && ty.leafref().is_none()
        && matches!(ctx.node(owner)?.tag(), NodeTag::Leaf | NodeTag::LeafList)
    {
        let mut info = LeafrefInfo::new(inherited.path.clone());
        info.require_instance = inherited.require_instance;
        ty.info = TypeInfo::Leafref(info);
        if !ctx.in_grouping(owner) {
            ctx.defer(QueueKind::Leafref, owner);
        }
    }

    ty.effective = Some(effective);
    Ok(ResolutionStatus::Resolved)
}

/// Checks that `declared` applies to `base`'s builtin and merges it on top
/// of `base`'s restrictions.
fn apply_restrictions(
    ctx: &LinkContext,
    owner: NodeId,
    base: &ResolvedType,
    declared: &DeclaredRestrictions,
) -> Result<ResolvedType> {
    let class = base.builtin.restriction_class();
    let misplaced = match class {
        RestrictionClass::Range(_) | RestrictionClass::DecimalRange => {
            misplaced_statement(declared, false, true, true)
        }
        RestrictionClass::LengthAndPattern => misplaced_statement(declared, true, false, false),
        RestrictionClass::Length => misplaced_statement(declared, true, false, true),
        RestrictionClass::None => misplaced_statement(declared, true, true, true),
    };
    if let Some(statement) = misplaced {
        return Err(not_applicable(ctx, owner, statement, base.builtin));
    }

    let narrowing = |failure: crate::restriction::RestrictionFailure, statement: &str| {
        failure.into_diagnostic(statement, ctx.describe(owner), ctx.location(owner))
    };

    let mut merged = base.clone();
    match class {
        RestrictionClass::Range(domain) => {
            merged.range = resolve_range(declared.range.as_ref(), base.range.as_ref(), domain)
                .map_err(|failure| narrowing(failure, "range"))?
                .map(|set| set.into_owned());
        }
        RestrictionClass::DecimalRange => {
            let domain = ValueDomain::decimal(base.fraction_digits.unwrap_or(1));
            merged.range = resolve_range(declared.range.as_ref(), base.range.as_ref(), domain)
                .map_err(|failure| narrowing(failure, "range"))?
                .map(|set| set.into_owned());
        }
        RestrictionClass::LengthAndPattern => {
            merged.length = resolve_length(declared.length.as_ref(), base.length.as_ref())
                .map_err(|failure| narrowing(failure, "length"))?
                .map(|set| set.into_owned());
            merged.patterns = resolve_patterns(&declared.patterns, &base.patterns);
        }
        RestrictionClass::Length => {
            merged.length = resolve_length(declared.length.as_ref(), base.length.as_ref())
                .map_err(|failure| narrowing(failure, "length"))?
                .map(|set| set.into_owned());
        }
        RestrictionClass::None => {}
    }
    Ok(merged)
}

/// The first declared statement among those flagged as forbidden.
fn misplaced_statement(
    declared: &DeclaredRestrictions,
    range_forbidden: bool,
    length_forbidden: bool,
    pattern_forbidden: bool,
) -> Option<&'static str> {
    if range_forbidden && declared.range.is_some() {
        Some("range")
    } else if length_forbidden && declared.length.is_some() {
        Some("length")
    } else if pattern_forbidden && !declared.patterns.is_empty() {
        Some("pattern")
    } else {
        None
    }
}

fn not_applicable(ctx: &LinkContext, owner: NodeId, statement: &str, builtin: BuiltinType) -> Diagnostic {
    Diagnostic::error(format!("`{statement}` does not apply to type `{builtin}`"))
        .with_code(ErrorCode::E201)
        .with_construct(ctx.describe(owner))
        .with_label(ctx.location(owner), format!("{statement} declared here"))
}
