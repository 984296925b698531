//! The identity hierarchy.
//!
//! Base references are resolved per identity, registering the identity in
//! its base's `derived` set and rejecting any base that closes a cycle.
//! Once every base of the linked units is known, [`propagate`] fills each
//! identity's `all_derived` closure.

use std::collections::HashSet;

use log::{debug, trace};
use yanglink_core::{NodeId, NodeKind, NodeTag, ResolutionStatus, SchemaTree, kind::IdentityData};

use crate::{
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
};

fn base_node(tree: &SchemaTree, id: NodeId) -> Option<NodeId> {
    match tree.get(id).map(|node| node.kind()) {
        Some(NodeKind::Identity(data)) => data.base_node,
        _ => None,
    }
}

fn identity_mut(tree: &mut SchemaTree, id: NodeId) -> Option<&mut IdentityData> {
    match tree.node_mut(id).ok()?.kind_mut() {
        NodeKind::Identity(data) => Some(data),
        _ => None,
    }
}

/// Resolves the base of one identity.
pub fn resolve_base(ctx: &mut LinkContext, identity: NodeId) -> Result<ResolutionStatus> {
    let (base, status) = match ctx.node(identity)?.kind() {
        NodeKind::Identity(data) => (data.base, data.status),
        _ => return Ok(ResolutionStatus::Resolved),
    };
    let Some(base) = base else {
        return Ok(ResolutionStatus::Resolved);
    };
    if status.is_resolved() {
        return Ok(status);
    }

    let found = match ctx.lookup(identity, base, NodeTag::Identity)? {
        Lookup::Found(found) => found,
        Lookup::Deferred => return mark(ctx, identity, ResolutionStatus::IntraFileResolved),
        Lookup::Missing => {
            return Err(Diagnostic::error(format!("base identity `{base}` not found"))
                .with_code(ErrorCode::E401)
                .with_construct(ctx.describe(identity))
                .with_label(ctx.location(identity), "base declared here"));
        }
    };

    if closes_cycle(ctx.tree, identity, found) {
        return Err(Diagnostic::error(format!(
            "identity `{}` derives from itself through `{base}`",
            ctx.node(identity)?.name()
        ))
        .with_code(ErrorCode::E400)
        .with_construct(ctx.describe(identity))
        .with_label(ctx.location(identity), "base declared here")
        .with_secondary_label(ctx.location(found), "base identity"));
    }

    if let NodeKind::Identity(data) = ctx.node_mut(found)?.kind_mut() {
        data.derived.insert(identity);
    }
    if let NodeKind::Identity(data) = ctx.node_mut(identity)?.kind_mut() {
        data.base_node = Some(found);
    }
    trace!(identity:?, base:? = found; "Resolved identity base");
    mark(ctx, identity, ResolutionStatus::Resolved)
}

/// Returns `true` if making `base` the base of `identity` would let
/// `identity` reach itself through base links.
fn closes_cycle(tree: &SchemaTree, identity: NodeId, base: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(base);
    while let Some(id) = current {
        if id == identity {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = base_node(tree, id);
    }
    false
}

fn mark(ctx: &mut LinkContext, identity: NodeId, status: ResolutionStatus) -> Result<ResolutionStatus> {
    match ctx.node_mut(identity)?.kind_mut() {
        NodeKind::Identity(data) => {
            data.status.advance(status);
            Ok(data.status)
        }
        _ => Ok(status),
    }
}

/// Adds every identity in `identities` to the `all_derived` set of each of
/// its ancestors. Identities already propagated are skipped. Returns the
/// number of identities propagated.
pub fn propagate(tree: &mut SchemaTree, identities: &[NodeId]) -> usize {
    let mut count = 0;
    for &identity in identities {
        let done = match tree.get(identity).map(|node| node.kind()) {
            Some(NodeKind::Identity(data)) => data.added_to_ancestors,
            _ => true,
        };
        if done {
            continue;
        }

        let mut visited = HashSet::new();
        let mut current = base_node(tree, identity);
        while let Some(ancestor) = current {
            if ancestor == identity || !visited.insert(ancestor) {
                break;
            }
            if let Some(data) = identity_mut(tree, ancestor) {
                data.all_derived.insert(identity);
            }
            current = base_node(tree, ancestor);
        }
        if let Some(data) = identity_mut(tree, identity) {
            data.added_to_ancestors = true;
        }
        count += 1;
    }
    debug!(count; "Propagated identities to their ancestors");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Phase, testing};

    fn identities(tree: &mut SchemaTree, module: NodeId, specs: &[(&str, Option<&str>)]) -> Vec<NodeId> {
        specs
            .iter()
            .map(|(name, base)| {
                tree.add_child(module, NodeKind::identity(*base), *name, testing::loc())
                    .unwrap()
            })
            .collect()
    }

    fn resolve_all(tree: &mut SchemaTree, ids: &[NodeId]) -> Vec<Result<ResolutionStatus>> {
        let index = testing::index(tree);
        let mut ctx = LinkContext::new(tree, &index, Phase::InterFile);
        ids.iter().map(|id| resolve_base(&mut ctx, *id)).collect()
    }

    fn all_derived(tree: &SchemaTree, id: NodeId) -> Vec<NodeId> {
        match tree.node(id).unwrap().kind() {
            NodeKind::Identity(data) => data.all_derived.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_chain_propagates_to_every_ancestor() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        let ids = identities(&mut tree, m, &[("i1", None), ("i2", Some("i1")), ("i3", Some("m:i2"))]);
        for result in resolve_all(&mut tree, &ids) {
            assert_eq!(result.unwrap(), ResolutionStatus::Resolved);
        }

        assert_eq!(propagate(&mut tree, &ids), 3);
        assert_eq!(all_derived(&tree, ids[0]), vec![ids[1], ids[2]]);
        assert_eq!(all_derived(&tree, ids[1]), vec![ids[2]]);
        assert!(all_derived(&tree, ids[2]).is_empty());

        // Second run is a no-op
        assert_eq!(propagate(&mut tree, &ids), 0);
        assert_eq!(all_derived(&tree, ids[0]).len(), 2);
    }

    #[test]
    fn test_derived_sets_direct_children_only() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        let ids = identities(&mut tree, m, &[("root", None), ("a", Some("root")), ("b", Some("root"))]);
        resolve_all(&mut tree, &ids);
        match tree.node(ids[0]).unwrap().kind() {
            NodeKind::Identity(data) => {
                assert_eq!(data.derived.iter().copied().collect::<Vec<_>>(), vec![ids[1], ids[2]]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        let ids = identities(&mut tree, m, &[("a", Some("b")), ("b", Some("a"))]);
        let results = resolve_all(&mut tree, &ids);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().code(), Some(ErrorCode::E400));

        let own = identities(&mut tree, m, &[("self", Some("self"))]);
        let results = resolve_all(&mut tree, &own);
        assert_eq!(results[0].as_ref().unwrap_err().code(), Some(ErrorCode::E400));
    }

    #[test]
    fn test_missing_base() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        let ids = identities(&mut tree, m, &[("a", Some("ghost"))]);
        let results = resolve_all(&mut tree, &ids);
        assert_eq!(results[0].as_ref().unwrap_err().code(), Some(ErrorCode::E401));
    }
}
