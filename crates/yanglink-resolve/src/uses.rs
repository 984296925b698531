//! Grouping expansion.
//!
//! A resolved `uses` splices a copy of its grouping's body into the use
//! site (the parent of the `uses` node). Leaves and leaf-lists of the
//! grouping are copied first, then the remaining body; typedefs and nested
//! groupings stay behind. Every copy passes collision detection against the
//! site's scope and takes the site's namespace.
//!
//! A grouping is only expanded once its body is stable: every nested
//! `uses`, augment, type and if-feature inside it must be resolved first,
//! otherwise the copy would freeze half-resolved state.

use std::collections::HashSet;

use log::trace;
use yanglink_core::{
    Id, NodeId, NodeKind, NodeTag, ResolutionStatus,
    node::{ContextSwitch, IfFeature},
    queue::QueueKind,
    tree::{CloneMap, Unguarded},
    types::{LeafrefInfo, TypeReference},
};

use crate::{
    collision::CollisionGuard,
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
    leafref::has_leafref,
};

/// Expands one `uses` node.
pub fn resolve_uses(ctx: &mut LinkContext, uses: NodeId) -> Result<ResolutionStatus> {
    let (name, status) = match ctx.node(uses)?.kind() {
        NodeKind::Uses(data) => (data.grouping, data.status),
        _ => return Ok(ResolutionStatus::Resolved),
    };
    if status.is_resolved() {
        return Ok(ResolutionStatus::Resolved);
    }

    let grouping = match ctx.lookup(uses, name, NodeTag::Grouping)? {
        Lookup::Found(grouping) => grouping,
        Lookup::Deferred => return mark(ctx, uses, ResolutionStatus::IntraFileResolved, None),
        Lookup::Missing => {
            return Err(Diagnostic::error(format!("grouping `{name}` not found"))
                .with_code(ErrorCode::E102)
                .with_construct(ctx.describe(uses))
                .with_label(ctx.location(uses), "used here")
                .with_help("check the name, the prefix and the imports"));
        }
    };

    check_recursion(ctx, uses, grouping)?;
    let features_ready = ctx.node(uses)?.if_features.iter().all(|feature| feature.feature.is_some());
    if !features_ready || !template_ready(ctx, grouping)? {
        trace!(uses:?, grouping:?; "Grouping body not ready, deferring");
        return mark(ctx, uses, ResolutionStatus::IntraFileResolved, None);
    }

    let site = ctx.tree.parent(uses).ok_or_else(|| {
        Diagnostic::error("uses is not attached to a parent")
            .with_code(ErrorCode::E001)
            .with_label(ctx.location(uses), "detached uses")
    })?;
    let map = expand(ctx, uses, grouping, site)?;

    trace!(uses:?, grouping:?, site:?, nodes = map.len(); "Expanded grouping");
    mark(ctx, uses, ResolutionStatus::Resolved, Some(grouping))
}

fn mark(
    ctx: &mut LinkContext,
    uses: NodeId,
    status: ResolutionStatus,
    grouping: Option<NodeId>,
) -> Result<ResolutionStatus> {
    match ctx.node_mut(uses)?.kind_mut() {
        NodeKind::Uses(data) => {
            data.status.advance(status);
            if grouping.is_some() {
                data.target = grouping;
            }
            Ok(data.status)
        }
        _ => Ok(status),
    }
}

/// Fails if expanding `grouping` at `uses` would instantiate the grouping
/// inside itself, directly or through other groupings.
fn check_recursion(ctx: &LinkContext, uses: NodeId, grouping: NodeId) -> Result<()> {
    let recursive = |via: NodeId| {
        Diagnostic::error(format!(
            "grouping `{}` is instantiated inside itself",
            ctx.tree.get(grouping).map(|node| node.name().to_string()).unwrap_or_default()
        ))
        .with_code(ErrorCode::E109)
        .with_construct(ctx.describe(uses))
        .with_label(ctx.location(uses), "used here")
        .with_secondary_label(ctx.location(via), "recursion through this uses")
    };

    if ctx.tree.is_ancestor_or_self(grouping, uses) {
        return Err(recursive(uses));
    }

    let mut visited = HashSet::new();
    let mut stack = vec![grouping];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        for nested in ctx.tree.descendants(current) {
            let Some(NodeKind::Uses(data)) = ctx.tree.get(nested).map(|node| node.kind()) else {
                continue;
            };
            let target = match data.target {
                Some(target) => target,
                None => match ctx.lookup(nested, data.grouping, NodeTag::Grouping) {
                    Ok(Lookup::Found(target)) => target,
                    _ => continue,
                },
            };
            if target == grouping || ctx.tree.is_ancestor_or_self(target, nested) {
                return Err(recursive(nested));
            }
            stack.push(target);
        }
    }
    Ok(())
}

/// Returns `true` once nothing inside the grouping body is still waiting
/// for resolution. Leafref paths are ignored: they are walked per copy.
fn template_ready(ctx: &LinkContext, grouping: NodeId) -> Result<bool> {
    for id in ctx.tree.descendants(grouping).into_iter().skip(1) {
        let node = ctx.node(id)?;
        if node.if_features.iter().any(|feature| feature.feature.is_none()) {
            return Ok(false);
        }
        let ready = match node.kind() {
            NodeKind::Uses(data) => data.status.is_resolved(),
            NodeKind::Augment(data) => data.status.is_resolved(),
            kind => kind.type_ref().is_none_or(|ty| ty.status.is_resolved()),
        };
        if !ready {
            return Ok(false);
        }
    }
    Ok(true)
}

fn expand(ctx: &mut LinkContext, uses: NodeId, grouping: NodeId, site: NodeId) -> Result<CloneMap> {
    let unit_files = ctx.unit_of(uses)?.files.clone();
    let site_node = ctx.node(site)?;
    let namespace = site_node.identifier().namespace();
    let keys: Vec<Id> = match site_node.kind() {
        NodeKind::List(data) => data.keys.clone(),
        _ => Vec::new(),
    };

    let (leaves, rest): (Vec<NodeId>, Vec<NodeId>) = ctx
        .tree
        .child_ids(grouping)
        .into_iter()
        .filter(|child| {
            ctx.tree
                .get(*child)
                .is_some_and(|node| !matches!(node.tag(), NodeTag::Typedef | NodeTag::Grouping))
        })
        .partition(|child| ctx.tree.get(*child).is_some_and(|node| node.tag().is_leaf_like()));

    let mut guard = CollisionGuard::new(&unit_files)
        .with_namespace(namespace)
        .skip_definitions();
    let mut map = CloneMap::new();

    for leaf in leaves {
        let copied = ctx.tree.clone_subtree(leaf, site, &mut guard)?;
        if let Some(clone) = copied.get(leaf) {
            let name = ctx.node(clone)?.name();
            if let Some(data) = ctx.node_mut(clone)?.kind_mut().leaf_data_mut() {
                data.template = Some(leaf);
                data.is_key = keys.contains(&name);
            }
        }
        map.extend(copied);
    }
    for child in rest {
        map.extend(ctx.tree.clone_subtree(child, site, &mut guard)?);
    }
    // References between copies made by separate clone calls
    ctx.tree.remap_references(&map);

    reclone_foreign_augments(ctx, uses, &map)?;

    let features: Vec<IfFeature> = ctx.node(uses)?.if_features.clone();
    let in_template = ctx.in_grouping(uses);
    for clone in map.clones().collect::<Vec<_>>() {
        let node = ctx.node_mut(clone)?;
        for feature in &features {
            if !node.if_features.iter().any(|existing| existing.name == feature.name) {
                node.if_features.push(feature.clone());
            }
        }
        match node.kind_mut() {
            NodeKind::Union(data) => data
                .members
                .iter_mut()
                .filter_map(TypeReference::leafref_mut)
                .for_each(reset_leafref),
            kind => {
                if let Some(leafref) = kind.leaf_data_mut().and_then(|data| data.ty.leafref_mut()) {
                    reset_leafref(leafref);
                }
            }
        }
        if !in_template && node.tag().is_leaf_like() && has_leafref(&*ctx.tree, clone) {
            ctx.defer(QueueKind::Leafref, clone);
        }
    }
    Ok(map)
}

/// Forgets the target a template's leafref found; each copy walks its own path.
fn reset_leafref(leafref: &mut LeafrefInfo) {
    let mut fresh = LeafrefInfo::new(leafref.path.clone());
    fresh.require_instance = leafref.require_instance;
    *leafref = fresh;
}

/// Copies of nodes augmented from outside the grouping get their own copy
/// of each such augment, placed under the expanding `uses` and pointed at
/// the copy instead of the template.
fn reclone_foreign_augments(ctx: &mut LinkContext, uses: NodeId, map: &CloneMap) -> Result<()> {
    for (template, clone) in map.iter() {
        let foreign: Vec<NodeId> = ctx
            .node(clone)?
            .augmented_by
            .iter()
            .copied()
            .filter(|augment| map.get(*augment).is_none() && ctx.tree.contains(*augment))
            .collect();
        if foreign.is_empty() {
            continue;
        }

        let mut replaced = Vec::with_capacity(foreign.len());
        for augment in foreign {
            let copied = ctx.tree.clone_subtree(augment, uses, &mut Unguarded)?;
            let Some(copy) = copied.get(augment) else {
                continue;
            };
            if let NodeKind::Augment(data) = ctx.node_mut(copy)?.kind_mut() {
                data.target = Some(clone);
            }
            let implicit_case = ctx.node(clone)?.tag() == NodeTag::Choice;
            for child in ctx.tree.child_ids(copy) {
                let node = ctx.node_mut(child)?;
                node.context_switch = Some(ContextSwitch {
                    logical_parent: clone,
                    implicit_case: implicit_case && node.tag() != NodeTag::Case,
                });
            }
            trace!(augment:?, copy:?, template:?, clone:?; "Re-cloned augment");
            replaced.push((augment, copy));
        }

        let node = ctx.node_mut(clone)?;
        for (augment, copy) in replaced {
            for entry in node.augmented_by.iter_mut().filter(|entry| **entry == augment) {
                *entry = copy;
            }
        }
    }
    Ok(())
}
