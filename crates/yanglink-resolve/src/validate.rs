//! Structural checks on the linked data tree: list keys and element bounds.
//!
//! Runs once after linking. Groupings, typedefs and deviation clones are
//! skipped; only their instantiated copies are checked.

use log::debug;
use yanglink_core::{
    Id, NodeId, NodeKind, NodeTag, SchemaNode, SchemaTree,
    kind::{DeviationData, LeafData, ListData},
    types::BuiltinType,
    visit::{Visitor, Walk, walk},
};

use crate::{
    context::describe,
    error::{Diagnostic, ErrorCode},
};

#[derive(Debug, Default)]
struct Targets {
    lists: Vec<NodeId>,
    bounded: Vec<NodeId>,
}

impl Targets {
    fn note_bounds(&mut self, id: NodeId, node: &SchemaNode) {
        let props = &node.properties;
        if props.min_elements.is_some() && props.max_elements.is_some() {
            self.bounded.push(id);
        }
    }
}

impl Visitor for Targets {
    fn visit_list(&mut self, _tree: &SchemaTree, id: NodeId, node: &SchemaNode, _data: &ListData) -> Walk {
        self.lists.push(id);
        self.note_bounds(id, node);
        Walk::Continue
    }

    fn visit_leaf(&mut self, _tree: &SchemaTree, id: NodeId, node: &SchemaNode, _data: &LeafData) -> Walk {
        self.note_bounds(id, node);
        Walk::Continue
    }

    fn visit_definition(&mut self, _tree: &SchemaTree, _id: NodeId, _node: &SchemaNode) -> Walk {
        Walk::SkipChildren
    }

    fn visit_deviation(
        &mut self,
        _tree: &SchemaTree,
        _id: NodeId,
        _node: &SchemaNode,
        _data: &DeviationData,
    ) -> Walk {
        Walk::SkipChildren
    }
}

/// Whether `id` holds configuration data.
///
/// An explicit `config` wins; otherwise the value is inherited along the
/// logical parents. Everything below an rpc input or output and below a
/// notification is state data.
pub fn effective_config(tree: &SchemaTree, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current.and_then(|id| tree.get(id)) {
        if let Some(config) = node.properties.config {
            return config;
        }
        if matches!(node.tag(), NodeTag::Input | NodeTag::Output | NodeTag::Notification) {
            return false;
        }
        current = node.logical_parent();
    }
    true
}

/// Checks every list and bounded node below `roots`. Marks key leaves
/// with `is_key` on the way.
pub fn validate(tree: &mut SchemaTree, roots: &[NodeId]) -> Vec<Diagnostic> {
    let mut targets = Targets::default();
    for root in roots {
        walk(tree, *root, &mut targets);
    }

    let mut diagnostics = Vec::new();
    for &list in &targets.lists {
        diagnostics.extend(check_keys(tree, list));
    }
    for &id in &targets.bounded {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if let (Some(min), Some(max)) = (node.properties.min_elements, node.properties.max_elements)
            && min > max
        {
            diagnostics.push(
                Diagnostic::error(format!("min-elements {min} exceeds max-elements {max}"))
                    .with_code(ErrorCode::E304)
                    .with_construct(describe(tree, id))
                    .with_label(node.location(), "bounds declared here"),
            );
        }
    }
    debug!(lists = targets.lists.len(), errors = diagnostics.len(); "Validated data tree");
    diagnostics
}

fn check_keys(tree: &mut SchemaTree, list: NodeId) -> Vec<Diagnostic> {
    let Some(node) = tree.get(list) else {
        return Vec::new();
    };
    let keys: Vec<Id> = match node.kind() {
        NodeKind::List(data) => data.keys.clone(),
        _ => return Vec::new(),
    };
    let location = node.location();
    let config = effective_config(tree, list);

    if keys.is_empty() {
        if !config {
            return Vec::new();
        }
        return vec![
            Diagnostic::error(format!("list `{}` holds configuration but has no key", node.name()))
                .with_code(ErrorCode::E300)
                .with_construct(describe(tree, list))
                .with_label(location, "list declared here"),
        ];
    }

    // Keys name leaves of the list's own module, never augment content
    // from another namespace or a same-named grouping or typedef.
    let namespace = node.identifier().namespace();
    let mut diagnostics = Vec::new();
    for key in keys {
        let candidates: Vec<NodeId> = tree
            .scope_children(list)
            .into_iter()
            .filter(|child| {
                tree.get(*child)
                    .is_some_and(|child| child.tag().is_data_node() && child.identifier().matches(key, namespace))
            })
            .collect();
        let found = candidates
            .iter()
            .copied()
            .find(|id| tree.get(*id).is_some_and(|child| child.tag() == NodeTag::Leaf));
        let Some(leaf) = found else {
            let mut diagnostic = Diagnostic::error(format!("key `{key}` is not a leaf of list `{}`", tree.schema_path(list)))
                .with_code(ErrorCode::E301)
                .with_construct(describe(tree, list))
                .with_label(location, "key declared here");
            if let Some(other) = candidates.first().and_then(|id| tree.get(*id)) {
                diagnostic = diagnostic.with_secondary_label(other.location(), format!("`{key}` is a {}", other.tag()));
            }
            diagnostics.push(diagnostic);
            continue;
        };

        let Ok(leaf_node) = tree.node_mut(leaf) else {
            continue;
        };
        if let Some(data) = leaf_node.kind_mut().leaf_data_mut() {
            data.is_key = true;
        }
        let leaf_location = leaf_node.location();
        let builtin = leaf_node
            .kind()
            .type_ref()
            .and_then(|ty| ty.value_type().map(|value| value.builtin).or_else(|| ty.effective_builtin()));

        if builtin == Some(BuiltinType::Empty) {
            diagnostics.push(
                Diagnostic::error(format!("key `{key}` has type empty"))
                    .with_code(ErrorCode::E302)
                    .with_construct(describe(tree, leaf))
                    .with_label(leaf_location, "key leaf declared here")
                    .with_secondary_label(location, "list declared here"),
            );
        }
        if effective_config(tree, leaf) != config {
            diagnostics.push(
                Diagnostic::error(format!("key `{key}` must have the same config value as its list"))
                    .with_code(ErrorCode::E303)
                    .with_construct(describe(tree, leaf))
                    .with_label(leaf_location, "key leaf declared here")
                    .with_secondary_label(location, "list declared here"),
            );
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use yanglink_core::types::TypeReference;

    fn string() -> NodeKind {
        NodeKind::leaf(TypeReference::builtin(BuiltinType::String))
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
        diagnostics.iter().filter_map(Diagnostic::code).collect()
    }

    fn module() -> (SchemaTree, NodeId) {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        (tree, m)
    }

    #[test]
    fn test_keyed_list_marks_key() {
        let (mut tree, m) = module();
        let list = tree.add_child(m, NodeKind::list(&["name"]), "servers", testing::loc()).unwrap();
        let name = tree.add_child(list, string(), "name", testing::loc()).unwrap();

        assert!(validate(&mut tree, &[m]).is_empty());
        assert!(tree.node(name).unwrap().kind().leaf_data().unwrap().is_key);
    }

    #[test]
    fn test_config_list_needs_keys() {
        let (mut tree, m) = module();
        tree.add_child(m, NodeKind::list(&[]), "servers", testing::loc()).unwrap();
        let state = tree.add_child(m, NodeKind::list(&[]), "stats", testing::loc()).unwrap();
        tree.node_mut(state).unwrap().properties.config = Some(false);
        let rpc = tree.add_child(m, NodeKind::Rpc, "reset", testing::loc()).unwrap();
        let input = tree.add_child(rpc, NodeKind::Input, "input", testing::loc()).unwrap();
        tree.add_child(input, NodeKind::list(&[]), "targets", testing::loc()).unwrap();

        assert_eq!(codes(&validate(&mut tree, &[m])), vec![ErrorCode::E300]);
    }

    #[test]
    fn test_key_must_be_leaf_child() {
        let (mut tree, m) = module();
        let list = tree
            .add_child(m, NodeKind::list(&["missing", "inner"]), "servers", testing::loc())
            .unwrap();
        tree.add_child(list, NodeKind::container(), "inner", testing::loc()).unwrap();

        let diagnostics = validate(&mut tree, &[m]);
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E301, ErrorCode::E301]);
        assert_eq!(diagnostics[1].labels().len(), 2);
    }

    #[test]
    fn test_key_skips_same_named_typedef() {
        let (mut tree, m) = module();
        let list = tree.add_child(m, NodeKind::list(&["id"]), "entries", testing::loc()).unwrap();
        tree.add_child(list, NodeKind::typedef(TypeReference::builtin(BuiltinType::String)), "id", testing::loc())
            .unwrap();
        let id = tree.add_child(list, NodeKind::leaf(TypeReference::derived("id")), "id", testing::loc()).unwrap();

        assert!(validate(&mut tree, &[m]).is_empty());
        assert!(tree.node(id).unwrap().kind().leaf_data().unwrap().is_key);
    }

    #[test]
    fn test_key_ignores_foreign_namespace() {
        let (mut tree, m) = module();
        let list = tree.add_child(m, NodeKind::list(&["id"]), "entries", testing::loc()).unwrap();
        tree.node_mut(list).unwrap().identifier_mut().set_namespace(Id::new("urn:m"));
        let foreign = tree.add_child(list, string(), "id", testing::loc()).unwrap();
        tree.node_mut(foreign).unwrap().identifier_mut().set_namespace(Id::new("urn:other"));

        assert_eq!(codes(&validate(&mut tree, &[m])), vec![ErrorCode::E301]);
        assert!(!tree.node(foreign).unwrap().kind().leaf_data().unwrap().is_key);

        let own = tree.add_child(list, string(), "id", testing::loc()).unwrap();
        tree.node_mut(own).unwrap().identifier_mut().set_namespace(Id::new("urn:m"));
        assert!(validate(&mut tree, &[m]).is_empty());
        assert!(tree.node(own).unwrap().kind().leaf_data().unwrap().is_key);
    }

    #[test]
    fn test_key_type_and_config() {
        let (mut tree, m) = module();
        let list = tree.add_child(m, NodeKind::list(&["flag", "id"]), "servers", testing::loc()).unwrap();
        tree.add_child(list, NodeKind::leaf(TypeReference::builtin(BuiltinType::Empty)), "flag", testing::loc())
            .unwrap();
        let id = tree.add_child(list, string(), "id", testing::loc()).unwrap();
        tree.node_mut(id).unwrap().properties.config = Some(false);

        assert_eq!(codes(&validate(&mut tree, &[m])), vec![ErrorCode::E302, ErrorCode::E303]);
    }

    #[test]
    fn test_element_bounds() {
        let (mut tree, m) = module();
        let list = tree.add_child(m, NodeKind::list(&["id"]), "servers", testing::loc()).unwrap();
        tree.add_child(list, string(), "id", testing::loc()).unwrap();
        let names = tree
            .add_child(m, NodeKind::leaf_list(TypeReference::builtin(BuiltinType::String)), "names", testing::loc())
            .unwrap();
        let props = &mut tree.node_mut(names).unwrap().properties;
        props.min_elements = Some(3);
        props.max_elements = Some(2);
        let props = &mut tree.node_mut(list).unwrap().properties;
        props.min_elements = Some(2);
        props.max_elements = Some(2);

        assert_eq!(codes(&validate(&mut tree, &[m])), vec![ErrorCode::E304]);
    }

    #[test]
    fn test_groupings_are_skipped() {
        let (mut tree, m) = module();
        let g = tree.add_child(m, NodeKind::Grouping, "g", testing::loc()).unwrap();
        tree.add_child(g, NodeKind::list(&[]), "unkeyed", testing::loc()).unwrap();
        assert!(validate(&mut tree, &[m]).is_empty());
    }

    #[test]
    fn test_config_follows_augment_target() {
        let (mut tree, m) = module();
        let state = tree.add_child(m, NodeKind::container(), "state", testing::loc()).unwrap();
        tree.node_mut(state).unwrap().properties.config = Some(false);
        let augment = tree.add_child(m, NodeKind::augment("/state"), "augment", testing::loc()).unwrap();
        let list = tree.add_child(augment, NodeKind::list(&[]), "log", testing::loc()).unwrap();
        tree.node_mut(list).unwrap().context_switch = Some(yanglink_core::node::ContextSwitch {
            logical_parent: state,
            implicit_case: false,
        });

        assert!(!effective_config(&tree, list));
        assert!(validate(&mut tree, &[m]).is_empty());
    }
}
