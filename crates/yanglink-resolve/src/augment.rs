//! Augment resolution.
//!
//! A resolved augment stays where it was declared; its children are merged
//! into the target's scope through [`SchemaNode::augmented_by`] and each
//! child records the target as its logical parent.
//!
//! [`SchemaNode::augmented_by`]: yanglink_core::SchemaNode::augmented_by

use std::fmt;

use log::trace;
use yanglink_core::{
    NodeId, NodeKind, NodeTag, ResolutionStatus, node::ContextSwitch, path::SchemaPath,
};

use crate::{
    collision::{Candidate, detect_colliding_child},
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
    navigate::walk_schema,
};

pub fn resolve_augment(ctx: &mut LinkContext, augment: NodeId) -> Result<ResolutionStatus> {
    let (text, status) = match ctx.node(augment)?.kind() {
        NodeKind::Augment(data) => (data.path.clone(), data.status),
        _ => return Ok(ResolutionStatus::Resolved),
    };
    if status.is_resolved() {
        return Ok(status);
    }

    let path = SchemaPath::parse(&text).map_err(|err| malformed(ctx, augment, &text, err))?;

    let parent = ctx.tree.parent(augment);
    let uses = parent.filter(|id| ctx.tree.get(*id).is_some_and(|node| node.tag() == NodeTag::Uses));
    let lookup = match uses {
        Some(uses) => {
            if path.is_absolute() {
                return Err(malformed(ctx, augment, &text, "an augment inside `uses` takes a descendant path"));
            }
            let expanded = matches!(ctx.node(uses)?.kind(), NodeKind::Uses(data) if data.status.is_resolved());
            if !expanded {
                return mark(ctx, augment, ResolutionStatus::IntraFileResolved, None);
            }
            walk_schema(ctx, augment, ctx.tree.parent(uses), &path)?
        }
        None => {
            if !path.is_absolute() {
                return Err(malformed(ctx, augment, &text, "a top-level augment takes an absolute path"));
            }
            walk_schema(ctx, augment, None, &path)?
        }
    };

    let target = match lookup {
        Lookup::Found(target) => target,
        Lookup::Deferred | Lookup::Missing => {
            trace!(augment:?, path = text.as_str(); "Augment target not found yet");
            return mark(ctx, augment, ResolutionStatus::IntraFileResolved, None);
        }
    };

    let target_tag = ctx.node(target)?.tag();
    if !target_tag.is_augmentable() {
        return Err(Diagnostic::error(format!(
            "`{}` is a {target_tag} and cannot be augmented",
            ctx.tree.schema_path(target)
        ))
        .with_code(ErrorCode::E103)
        .with_construct(ctx.describe(augment))
        .with_label(ctx.location(augment), "augment declared here")
        .with_secondary_label(ctx.location(target), "target declared here")
        .with_help("augment targets are containers, lists, choices, cases, inputs, outputs and notifications"));
    }

    merge_into(ctx, augment, target)?;
    trace!(augment:?, target:?; "Resolved augment");
    mark(ctx, augment, ResolutionStatus::Resolved, Some(target))
}

fn malformed(ctx: &LinkContext, augment: NodeId, text: &str, reason: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(format!("malformed augment path `{text}`: {reason}"))
        .with_code(ErrorCode::E110)
        .with_construct(ctx.describe(augment))
        .with_label(ctx.location(augment), "augment declared here")
}

/// Checks the augment's children against the target's scope, then links
/// them in.
fn merge_into(ctx: &mut LinkContext, augment: NodeId, target: NodeId) -> Result<()> {
    let unit_files = ctx.unit_of(target)?.files.clone();
    let children = ctx.tree.child_ids(augment);
    for &child in &children {
        let candidate = Candidate::of(ctx.tree, child)?;
        detect_colliding_child(ctx.tree, target, &candidate, &unit_files)?;
    }

    let implicit_case = ctx.node(target)?.tag() == NodeTag::Choice;
    for child in children {
        let node = ctx.node_mut(child)?;
        node.context_switch = Some(ContextSwitch {
            logical_parent: target,
            implicit_case: implicit_case && node.tag() != NodeTag::Case,
        });
    }

    let node = ctx.node_mut(target)?;
    if !node.augmented_by.contains(&augment) {
        node.augmented_by.push(augment);
    }
    Ok(())
}

fn mark(
    ctx: &mut LinkContext,
    augment: NodeId,
    status: ResolutionStatus,
    target: Option<NodeId>,
) -> Result<ResolutionStatus> {
    match ctx.node_mut(augment)?.kind_mut() {
        NodeKind::Augment(data) => {
            data.status.advance(status);
            if target.is_some() {
                data.target = target;
            }
            Ok(data.status)
        }
        _ => Ok(status),
    }
}
