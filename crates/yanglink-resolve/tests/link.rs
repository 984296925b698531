//! End-to-end linking through the public API.

use yanglink_core::{
    NodeId, NodeKind, ResolutionStatus, SchemaNode, SchemaTree, SourceLocation,
    kind::{Deviate, IdentityData, LeafData, Properties, UsesData},
    node::IfFeature,
    restriction::RestrictionExpr,
    types::{BuiltinType, TypeInfo, TypeReference},
    visit::{Visitor, Walk},
};
use yanglink_resolve::{ErrorCode, ErrorKind, FailureMode, LinkOptions, LinkedGraph, link};

fn loc(line: u32) -> SourceLocation {
    SourceLocation::new("test.yang", line, 1)
}

fn leaf(builtin: BuiltinType) -> NodeKind {
    NodeKind::leaf(TypeReference::builtin(builtin))
}

fn link_ok(tree: SchemaTree) -> LinkedGraph {
    match link(tree, &LinkOptions::default()) {
        Ok(graph) => graph,
        Err(err) => panic!("link failed: {err}"),
    }
}

/// A union leaf whose member types live in a child union table.
fn union_leaf(tree: &mut SchemaTree, parent: NodeId, name: &str, members: Vec<TypeReference>) -> (NodeId, NodeId) {
    let leaf = tree.add_child(parent, leaf(BuiltinType::Union), name, loc(20)).unwrap();
    let table = tree.add_child(leaf, NodeKind::union(members), "union", loc(20)).unwrap();
    if let Some(ty) = tree.node_mut(leaf).unwrap().kind_mut().type_ref_mut() {
        ty.info = TypeInfo::Union(table);
    }
    (leaf, table)
}

fn names(graph: &LinkedGraph, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .map(|id| graph.node(*id).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_grouping_copies_are_disjoint() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    let g = tree.add_child(m, NodeKind::Grouping, "endpoint", loc(2)).unwrap();
    let inner = tree.add_child(g, NodeKind::container(), "address", loc(3)).unwrap();
    let template = tree.add_child(inner, leaf(BuiltinType::String), "host", loc(4)).unwrap();
    let client = tree.add_child(m, NodeKind::container(), "client", loc(5)).unwrap();
    tree.add_child(client, NodeKind::uses("endpoint"), "uses", loc(6)).unwrap();
    let server = tree.add_child(m, NodeKind::container(), "server", loc(7)).unwrap();
    tree.add_child(server, NodeKind::uses("endpoint"), "uses", loc(8)).unwrap();

    let graph = link_ok(tree);
    let first = graph.find_child(client, "address", None).unwrap();
    let second = graph.find_child(server, "address", None).unwrap();
    assert_ne!(first, second);
    assert_ne!(first, inner);

    let first_host = graph.find_child(first, "host", None).unwrap();
    let second_host = graph.find_child(second, "host", None).unwrap();
    assert_eq!(
        names(&graph, &graph.tree().descendants(first)),
        names(&graph, &graph.tree().descendants(second))
    );

    let mut tree = graph.into_tree();
    tree.node_mut(first_host).unwrap().properties.mandatory = Some(true);
    assert_eq!(tree.node(second_host).unwrap().properties.mandatory, None);
    assert_eq!(tree.node(template).unwrap().properties.mandatory, None);
}

#[test]
fn test_restriction_must_narrow() {
    let build = |range: &str| {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", loc(1));
        let base = TypeReference::builtin(BuiltinType::Int32).with_range(RestrictionExpr::parse("1..10").unwrap());
        tree.add_child(m, NodeKind::typedef(base), "small", loc(2)).unwrap();
        let derived = TypeReference::derived("small").with_range(RestrictionExpr::parse(range).unwrap());
        let x = tree.add_child(m, NodeKind::leaf(derived), "x", loc(3)).unwrap();
        (tree, x)
    };

    let (tree, _) = build("0..20");
    let err = link(tree, &LinkOptions::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::RestrictionNarrowing));

    let (tree, x) = build("2..4 | 8..max");
    let graph = link_ok(tree);
    let range = graph
        .node(x)
        .and_then(|node| node.kind().type_ref())
        .and_then(|ty| ty.effective.as_ref())
        .and_then(|effective| effective.range.clone())
        .unwrap();
    for value in -5..=25 {
        if range.contains(value) {
            assert!((1..=10).contains(&value), "{value} accepted outside the base range");
        }
    }
    assert!(range.contains(10));
    assert!(!range.contains(5));
}

/// Collects every node whose linking state is tracked.
#[derive(Default)]
struct Statuses(Vec<(NodeId, ResolutionStatus)>);

impl Visitor for Statuses {
    fn visit_node(&mut self, _tree: &SchemaTree, id: NodeId, node: &SchemaNode) -> Walk {
        if matches!(node.kind(), NodeKind::Grouping) {
            return Walk::SkipChildren;
        }
        if let Some(status) = node.kind().status() {
            self.0.push((id, status));
        }
        Walk::Continue
    }
}

#[test]
fn test_everything_ends_resolved() {
    let mut tree = SchemaTree::new();
    let a = tree.create_module("a", "urn:a", "a", loc(1));
    let b = tree.create_module("b", "urn:b", "b", loc(2));
    tree.add_import(b, "a", "pa").unwrap();
    tree.add_child(a, NodeKind::typedef(TypeReference::builtin(BuiltinType::Uint16)), "port", loc(3))
        .unwrap();
    let g = tree.add_child(a, NodeKind::Grouping, "g", loc(4)).unwrap();
    tree.add_child(g, NodeKind::leaf(TypeReference::derived("port")), "p", loc(5)).unwrap();
    tree.add_child(g, NodeKind::leaf(TypeReference::leafref_path("../p")), "copy", loc(6)).unwrap();
    let top = tree.add_child(a, NodeKind::container(), "top", loc(7)).unwrap();
    tree.add_child(b, NodeKind::identity(None), "base", loc(8)).unwrap();
    tree.add_child(b, NodeKind::identity(Some("base")), "derived", loc(9)).unwrap();
    let augment = tree.add_child(b, NodeKind::augment("/pa:top"), "augment", loc(10)).unwrap();
    tree.add_child(augment, NodeKind::uses("pa:g"), "uses", loc(11)).unwrap();
    tree.add_child(augment, NodeKind::leaf(TypeReference::leafref_path("../copy")), "r", loc(12))
        .unwrap();

    let graph = link_ok(tree);
    let mut statuses = Statuses::default();
    graph.walk(&mut statuses);
    assert!(statuses.0.len() >= 6);
    for (id, status) in statuses.0 {
        assert_eq!(status, ResolutionStatus::Resolved, "{id} is {status}");
    }
    let mut merged = names(&graph, &graph.scope_children(top));
    merged.sort();
    assert_eq!(merged, vec!["copy", "p", "r", "uses"]);
}

#[test]
fn test_collisions_regardless_of_order() {
    for order in [[0, 1], [1, 0]] {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", loc(1));
        let top = tree.add_child(m, NodeKind::container(), "top", loc(2)).unwrap();
        let kinds = [leaf(BuiltinType::String), NodeKind::container()];
        for idx in order {
            tree.add_child(top, kinds[idx].clone(), "x", loc(3)).unwrap();
        }
        let err = link(tree, &LinkOptions::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::DuplicateIdentifier));
    }

    let mut tree = SchemaTree::new();
    for name in ["a", "b"] {
        let module = tree.create_module(name, &format!("urn:{name}"), name, loc(1));
        tree.add_child(module, leaf(BuiltinType::String), "x", loc(2)).unwrap();
    }
    link_ok(tree);
}

#[test]
fn test_list_key_of_type_empty() {
    let build = |builtin| {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", loc(1));
        let list = tree.add_child(m, NodeKind::list(&["id"]), "servers", loc(2)).unwrap();
        tree.node_mut(list).unwrap().properties.config = Some(true);
        tree.add_child(list, leaf(builtin), "id", loc(3)).unwrap();
        tree
    };

    let err = link(build(BuiltinType::Empty), &LinkOptions::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Cardinality));
    assert_eq!(err.errors().next().and_then(|d| d.code()), Some(ErrorCode::E302));

    let graph = link_ok(build(BuiltinType::String));
    let list = graph.find_child(graph.module("m").unwrap(), "servers", None).unwrap();
    let id = graph.find_child(list, "id", None).unwrap();
    assert!(graph.node(id).unwrap().kind().leaf_data().is_some_and(|data: &LeafData| data.is_key));
}

#[test]
fn test_augment_rewires_target() {
    let mut tree = SchemaTree::new();
    let a = tree.create_module("a", "urn:a", "a", loc(1));
    let b = tree.create_module("b", "urn:b", "b", loc(2));
    tree.add_import(b, "a", "a").unwrap();
    let top = tree.add_child(a, NodeKind::container(), "top", loc(3)).unwrap();
    tree.add_child(top, leaf(BuiltinType::String), "x", loc(4)).unwrap();
    let augment = tree.add_child(b, NodeKind::augment("/a:top"), "augment", loc(5)).unwrap();
    let y = tree.add_child(augment, leaf(BuiltinType::String), "y", loc(6)).unwrap();

    let graph = link_ok(tree);
    assert_eq!(names(&graph, &graph.scope_children(top)), vec!["x", "y"]);
    let switch = graph.node(y).unwrap().context_switch.unwrap();
    assert_eq!(switch.logical_parent, top);
}

#[test]
fn test_leafref_chain() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    tree.add_child(m, NodeKind::Feature, "f2", loc(2)).unwrap();
    tree.add_child(m, NodeKind::Feature, "f3", loc(3)).unwrap();
    let top = tree.add_child(m, NodeKind::container(), "top", loc(4)).unwrap();
    let l1 = tree
        .add_child(top, NodeKind::leaf(TypeReference::leafref_path("../l2")), "l1", loc(5))
        .unwrap();
    let l2 = tree
        .add_child(top, NodeKind::leaf(TypeReference::leafref_path("/top/l3")), "l2", loc(6))
        .unwrap();
    let l3 = tree.add_child(top, leaf(BuiltinType::String), "l3", loc(7)).unwrap();
    tree.node_mut(l2).unwrap().if_features.push(IfFeature::new("f2"));
    tree.node_mut(l3).unwrap().if_features.push(IfFeature::new("f3"));

    let graph = link_ok(tree);
    let ty = graph.node(l1).unwrap().kind().type_ref().unwrap();
    assert_eq!(ty.value_type().map(|value| value.builtin), Some(BuiltinType::String));
    let info = ty.leafref().unwrap();
    assert_eq!(info.target, Some(l2));
    let mut features: Vec<String> = info.if_features.iter().map(|name| name.to_string()).collect();
    features.sort();
    assert_eq!(features, vec!["f2", "f3"]);
}

#[test]
fn test_identity_closure() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    let i1 = tree.add_child(m, NodeKind::identity(None), "i1", loc(2)).unwrap();
    let i2 = tree.add_child(m, NodeKind::identity(Some("i1")), "i2", loc(3)).unwrap();
    let i3 = tree.add_child(m, NodeKind::identity(Some("i2")), "i3", loc(4)).unwrap();

    let graph = link_ok(tree);
    let closure = match graph.node(i1).unwrap().kind() {
        NodeKind::Identity(IdentityData { all_derived, .. }) => all_derived.clone(),
        _ => unreachable!(),
    };
    assert!(closure.contains(&i2));
    assert!(closure.contains(&i3));
    assert_eq!(closure.len(), 2);
}

#[test]
fn test_batch_reports_every_failing_module() {
    let mut tree = SchemaTree::new();
    for name in ["a", "b"] {
        let module = tree.create_module(name, &format!("urn:{name}"), name, loc(1));
        tree.add_child(module, NodeKind::uses("missing"), "uses", loc(2)).unwrap();
    }
    let healthy = tree.create_module("c", "urn:c", "c", loc(1));
    tree.add_child(healthy, leaf(BuiltinType::String), "x", loc(2)).unwrap();

    let options = LinkOptions {
        failure_mode: FailureMode::Batch,
        ..LinkOptions::default()
    };
    let err = link(tree, &options).unwrap_err();
    let codes: Vec<_> = err.errors().filter_map(|d| d.code()).collect();
    assert_eq!(codes, vec![ErrorCode::E102, ErrorCode::E102]);
}

#[test]
fn test_uses_status_is_visible() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    tree.add_child(m, NodeKind::Grouping, "g", loc(2)).unwrap();
    let uses = tree.add_child(m, NodeKind::uses("g"), "uses", loc(3)).unwrap();

    let graph = link_ok(tree);
    match graph.node(uses).unwrap().kind() {
        NodeKind::Uses(UsesData { status, target, .. }) => {
            assert!(status.is_resolved());
            assert!(target.is_some());
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_key_beside_same_named_typedef() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    let list = tree.add_child(m, NodeKind::list(&["id"]), "servers", loc(2)).unwrap();
    tree.node_mut(list).unwrap().properties.config = Some(true);
    tree.add_child(list, NodeKind::typedef(TypeReference::builtin(BuiltinType::String)), "id", loc(3))
        .unwrap();
    let id = tree.add_child(list, NodeKind::leaf(TypeReference::derived("id")), "id", loc(4)).unwrap();

    let graph = link_ok(tree);
    assert!(graph.node(id).unwrap().kind().leaf_data().is_some_and(|data: &LeafData| data.is_key));
}

#[test]
fn test_not_supported_drops_earlier_deviated_copy() {
    let mut tree = SchemaTree::new();
    let a = tree.create_module("a", "urn:a", "a", loc(1));
    let b = tree.create_module("b", "urn:b", "b", loc(2));
    tree.add_import(b, "a", "pa").unwrap();
    let top = tree.add_child(a, NodeKind::container(), "top", loc(3)).unwrap();
    let x = tree.add_child(top, leaf(BuiltinType::Int8), "x", loc(4)).unwrap();
    let mandatory = || {
        Deviate::Add(Properties {
            mandatory: Some(true),
            ..Properties::default()
        })
    };
    let first = tree
        .add_child(b, NodeKind::deviation("/pa:top/pa:x", vec![mandatory()]), "deviation", loc(5))
        .unwrap();
    tree.add_child(b, NodeKind::deviation("/pa:top/pa:x", vec![Deviate::NotSupported]), "deviation", loc(6))
        .unwrap();
    let last = tree
        .add_child(b, NodeKind::deviation("/pa:top/pa:x", vec![mandatory()]), "deviation", loc(7))
        .unwrap();

    let graph = link_ok(tree);
    assert!(graph.deviated(x).is_empty());
    for deviation in [first, last] {
        match graph.node(deviation).unwrap().kind() {
            NodeKind::Deviation(data) => {
                assert_eq!(data.target, Some(x));
                assert_eq!(data.clone, None);
            }
            _ => unreachable!(),
        }
    }
    assert_eq!(graph.node(x).unwrap().properties.mandatory, None);
}

#[test]
fn test_dangling_union_leafref_is_reported() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    union_leaf(
        &mut tree,
        m,
        "either",
        vec![TypeReference::builtin(BuiltinType::Int8), TypeReference::leafref_path("../nowhere")],
    );

    let err = link(tree, &LinkOptions::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UnresolvedReference));
    let diagnostic = err.errors().next().unwrap();
    assert_eq!(diagnostic.code(), Some(ErrorCode::E104));
    assert!(diagnostic.to_string().contains("../nowhere"), "{diagnostic}");
}

#[test]
fn test_union_leafref_member_finds_target() {
    let mut tree = SchemaTree::new();
    let m = tree.create_module("m", "urn:m", "m", loc(1));
    let top = tree.add_child(m, NodeKind::container(), "top", loc(2)).unwrap();
    let port = tree.add_child(top, leaf(BuiltinType::Uint16), "port", loc(3)).unwrap();
    let (_, table) = union_leaf(
        &mut tree,
        top,
        "either",
        vec![TypeReference::builtin(BuiltinType::String), TypeReference::leafref_path("../port")],
    );

    let graph = link_ok(tree);
    let NodeKind::Union(data) = graph.node(table).unwrap().kind() else {
        panic!("union table missing");
    };
    let info = data.members[1].leafref().unwrap();
    assert_eq!(info.target, Some(port));
    assert!(info.status.is_resolved());
}
