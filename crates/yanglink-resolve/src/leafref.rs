//! Leafref resolution: walking the path and adopting the target's type.
//!
//! A leafref pointing at another leafref waits until that one is resolved
//! and then takes over its adopted type, so chains settle one link per pass
//! and never recurse. A cycle never settles; the scheduler reports it once
//! the fixpoint stalls.

use log::trace;
use yanglink_core::{
    NodeId, NodeKind, NodeTag, QualifiedName, ResolutionStatus, SchemaTree,
    path::SchemaPath,
    types::{LeafrefInfo, ResolvedType},
};

use crate::{
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
    navigate::walk_data,
};

/// What a resolved target hands over to the leafref pointing at it.
struct Adopted {
    effective: Option<Box<ResolvedType>>,
    if_features: Vec<QualifiedName>,
}

/// Resolves the leafref of `leaf` and every leafref member of the unions it
/// declares. Member paths are walked from `leaf` itself.
pub fn resolve_leafref(ctx: &mut LinkContext, leaf: NodeId) -> Result<ResolutionStatus> {
    let mut status = match leafref_info(ctx, leaf)? {
        Some(info) if !info.status.is_resolved() => {
            let found = find_target(ctx, leaf, &info)?;
            mark(ctx, leaf, found)?
        }
        Some(info) => info.status,
        None => ResolutionStatus::Resolved,
    };
    for table in union_tables(&*ctx.tree, leaf) {
        status = status.min(resolve_members(ctx, leaf, table)?);
    }
    Ok(status)
}

/// Union tables declared under `leaf`, nested ones included.
pub(crate) fn union_tables(tree: &SchemaTree, leaf: NodeId) -> Vec<NodeId> {
    tree.descendants(leaf)
        .into_iter()
        .filter(|id| tree.get(*id).is_some_and(|node| node.tag() == NodeTag::Union))
        .collect()
}

/// Whether `leaf` has a leafref path to walk, as its own type or as a
/// member of a union it declares.
pub(crate) fn has_leafref(tree: &SchemaTree, leaf: NodeId) -> bool {
    let direct = tree
        .get(leaf)
        .and_then(|node| node.kind().type_ref())
        .is_some_and(|ty| ty.leafref().is_some());
    direct || !pending_paths_in_unions(tree, leaf, |_| true).is_empty()
}

/// The first leafref path of `leaf` that has not reached a target yet.
pub(crate) fn unresolved_path(tree: &SchemaTree, leaf: NodeId) -> Option<String> {
    let direct = tree
        .get(leaf)?
        .kind()
        .type_ref()
        .and_then(|ty| ty.leafref())
        .filter(|info| !info.status.is_resolved())
        .map(|info| info.path.clone());
    direct.or_else(|| {
        pending_paths_in_unions(tree, leaf, |info| !info.status.is_resolved())
            .into_iter()
            .next()
    })
}

fn pending_paths_in_unions(
    tree: &SchemaTree,
    leaf: NodeId,
    keep: impl Fn(&LeafrefInfo) -> bool,
) -> Vec<String> {
    union_tables(tree, leaf)
        .into_iter()
        .filter_map(|table| match tree.get(table)?.kind() {
            NodeKind::Union(data) => Some(data.members.clone()),
            _ => None,
        })
        .flatten()
        .filter_map(|member| member.leafref().filter(|info| keep(info)).map(|info| info.path.clone()))
        .collect()
}

fn resolve_members(ctx: &mut LinkContext, leaf: NodeId, table: NodeId) -> Result<ResolutionStatus> {
    let mut members = match ctx.node(table)?.kind() {
        NodeKind::Union(data) => data.members.clone(),
        _ => return Ok(ResolutionStatus::Resolved),
    };

    let mut status = ResolutionStatus::Resolved;
    for member in &mut members {
        let Some(info) = member.leafref_mut() else {
            continue;
        };
        if !info.status.is_resolved() {
            let found = find_target(ctx, leaf, info)?;
            settle(info, found);
        }
        status = status.min(info.status);
    }

    if let NodeKind::Union(data) = ctx.node_mut(table)?.kind_mut() {
        data.members = members;
    }
    Ok(status)
}

/// Walks the path of `info` from `leaf`. `None` while the target is missing
/// or still resolving itself.
fn find_target(ctx: &LinkContext, leaf: NodeId, info: &LeafrefInfo) -> Result<Option<(NodeId, Adopted)>> {
    let path = SchemaPath::parse(&info.path).map_err(|err| {
        Diagnostic::error(format!("malformed leafref path `{}`: {err}", info.path))
            .with_code(ErrorCode::E110)
            .with_construct(ctx.describe(leaf))
            .with_label(ctx.location(leaf), "leafref declared here")
    })?;

    let target = match walk_data(ctx, leaf, &path)? {
        Lookup::Found(target) => target,
        Lookup::Deferred | Lookup::Missing => return Ok(None),
    };

    let target_node = ctx.node(target)?;
    if target == leaf || !target_node.tag().is_leaf_like() {
        return Err(Diagnostic::error(format!(
            "leafref path `{}` must lead to another leaf or leaf-list, found {}",
            info.path,
            ctx.describe(target)
        ))
        .with_code(ErrorCode::E104)
        .with_construct(ctx.describe(leaf))
        .with_label(ctx.location(leaf), "leafref declared here")
        .with_secondary_label(target_node.location(), "path leads here"));
    }

    let Some(mut adopted) = adopt(ctx, target)? else {
        trace!(leaf:?, target:?; "Leafref target not settled yet");
        return Ok(None);
    };
    for feature in &target_node.if_features {
        if !adopted.if_features.contains(&feature.name) {
            adopted.if_features.push(feature.name);
        }
    }

    trace!(leaf:?, target:?, path = info.path.as_str(); "Resolved leafref");
    Ok(Some((target, adopted)))
}

fn leafref_info(ctx: &LinkContext, leaf: NodeId) -> Result<Option<LeafrefInfo>> {
    Ok(ctx
        .node(leaf)?
        .kind()
        .type_ref()
        .and_then(|ty| ty.leafref())
        .cloned())
}

/// The type and annotations a settled target passes on, or `None` while
/// the target itself is still resolving.
fn adopt(ctx: &LinkContext, target: NodeId) -> Result<Option<Adopted>> {
    let Some(ty) = ctx.node(target)?.kind().type_ref() else {
        return Ok(None);
    };
    Ok(match ty.leafref() {
        Some(chained) if chained.status.is_resolved() => Some(Adopted {
            effective: chained.effective.clone(),
            if_features: chained.if_features.clone(),
        }),
        Some(_) => None,
        None if ty.status.is_resolved() => Some(Adopted {
            effective: ty.effective.clone().map(Box::new),
            if_features: Vec::new(),
        }),
        None => None,
    })
}

fn mark(ctx: &mut LinkContext, leaf: NodeId, found: Option<(NodeId, Adopted)>) -> Result<ResolutionStatus> {
    match ctx
        .node_mut(leaf)?
        .kind_mut()
        .type_ref_mut()
        .and_then(|ty| ty.leafref_mut())
    {
        Some(info) => Ok(settle(info, found)),
        None => Ok(ResolutionStatus::Resolved),
    }
}

fn settle(info: &mut LeafrefInfo, found: Option<(NodeId, Adopted)>) -> ResolutionStatus {
    let status = match found {
        Some((target, adopted)) => {
            info.target = Some(target);
            info.effective = adopted.effective;
            for feature in adopted.if_features {
                if !info.if_features.contains(&feature) {
                    info.if_features.push(feature);
                }
            }
            ResolutionStatus::Resolved
        }
        None => ResolutionStatus::IntraFileResolved,
    };
    info.status.advance(status);
    info.status
}
