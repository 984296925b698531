//! Deviation application.
//!
//! Deviates never touch the target itself. The first deviation of a module
//! against a target clones it below the deviation node; every later
//! deviation of that module against the same target edits the same clone.
//! `not-supported` discards the clone; the target then stays unsupported
//! for the rest of that module's deviations.

use std::fmt;

use log::{debug, trace};
use yanglink_core::{
    NodeId, NodeKind, ResolutionStatus,
    kind::{DeviatedCopy, Deviate, Properties},
    path::SchemaPath,
    tree::Unguarded,
};

use crate::{
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
    navigate::walk_schema,
};

/// A deviate whose precondition does not hold for `property`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Violation {
    property: &'static str,
    value: Option<String>,
}

impl Violation {
    fn new(property: &'static str) -> Self {
        Self { property, value: None }
    }

    fn with_value(property: &'static str, value: impl fmt::Display) -> Self {
        Self {
            property,
            value: Some(value.to_string()),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "`{}` value `{value}`", self.property),
            None => write!(f, "`{}`", self.property),
        }
    }
}

type Outcome = std::result::Result<(), Violation>;

fn add_value<T: Clone>(property: &'static str, slot: &mut Option<T>, value: &Option<T>) -> Outcome {
    match (slot.as_ref(), value) {
        (_, None) => Ok(()),
        (Some(_), Some(_)) => Err(Violation::new(property)),
        (None, Some(value)) => {
            *slot = Some(value.clone());
            Ok(())
        }
    }
}

fn add_values(property: &'static str, list: &mut Vec<String>, values: &[String]) -> Outcome {
    for value in values {
        if list.contains(value) {
            return Err(Violation::with_value(property, value));
        }
        list.push(value.clone());
    }
    Ok(())
}

fn delete_value<T: PartialEq + fmt::Display>(property: &'static str, slot: &mut Option<T>, value: &Option<T>) -> Outcome {
    match value {
        None => Ok(()),
        Some(value) if slot.as_ref() == Some(value) => {
            *slot = None;
            Ok(())
        }
        Some(value) => Err(Violation::with_value(property, value)),
    }
}

fn delete_values(property: &'static str, list: &mut Vec<String>, values: &[String]) -> Outcome {
    for value in values {
        let Some(position) = list.iter().position(|existing| existing == value) else {
            return Err(Violation::with_value(property, value));
        };
        list.remove(position);
    }
    Ok(())
}

fn replace_value<T: Clone>(property: &'static str, slot: &mut Option<T>, value: &Option<T>) -> Outcome {
    match (slot.is_some(), value) {
        (_, None) => Ok(()),
        (false, Some(_)) => Err(Violation::new(property)),
        (true, Some(value)) => {
            *slot = Some(value.clone());
            Ok(())
        }
    }
}

fn replace_values(property: &'static str, list: &mut Vec<String>, values: &[String]) -> Outcome {
    if values.is_empty() {
        return Ok(());
    }
    if list.is_empty() {
        return Err(Violation::new(property));
    }
    *list = values.to_vec();
    Ok(())
}

fn add(props: &mut Properties, added: &Properties) -> Outcome {
    add_value("config", &mut props.config, &added.config)?;
    add_value("mandatory", &mut props.mandatory, &added.mandatory)?;
    add_value("default", &mut props.default, &added.default)?;
    add_value("units", &mut props.units, &added.units)?;
    add_value("min-elements", &mut props.min_elements, &added.min_elements)?;
    add_value("max-elements", &mut props.max_elements, &added.max_elements)?;
    add_values("must", &mut props.must, &added.must)?;
    add_values("unique", &mut props.unique, &added.unique)
}

fn delete(props: &mut Properties, deleted: &Properties) -> Outcome {
    delete_value("config", &mut props.config, &deleted.config)?;
    delete_value("mandatory", &mut props.mandatory, &deleted.mandatory)?;
    delete_value("default", &mut props.default, &deleted.default)?;
    delete_value("units", &mut props.units, &deleted.units)?;
    delete_value("min-elements", &mut props.min_elements, &deleted.min_elements)?;
    delete_value("max-elements", &mut props.max_elements, &deleted.max_elements)?;
    delete_values("must", &mut props.must, &deleted.must)?;
    delete_values("unique", &mut props.unique, &deleted.unique)
}

fn replace(props: &mut Properties, replaced: &Properties) -> Outcome {
    replace_value("config", &mut props.config, &replaced.config)?;
    replace_value("mandatory", &mut props.mandatory, &replaced.mandatory)?;
    replace_value("default", &mut props.default, &replaced.default)?;
    replace_value("units", &mut props.units, &replaced.units)?;
    replace_value("min-elements", &mut props.min_elements, &replaced.min_elements)?;
    replace_value("max-elements", &mut props.max_elements, &replaced.max_elements)?;
    replace_values("must", &mut props.must, &replaced.must)?;
    replace_values("unique", &mut props.unique, &replaced.unique)
}

/// Drops the file's copy of `target` and clears the handle every earlier
/// deviation kept to it. The target stays recorded as not supported.
fn discard_copy(ctx: &mut LinkContext, file: NodeId, target: NodeId, clone: NodeId) -> Result<()> {
    ctx.tree.discard_subtree(clone)?;
    let owners = match ctx.tree.header_mut(file)?.deviation_clones.get_mut(&target) {
        Some(copy) => {
            copy.clone = None;
            std::mem::take(&mut copy.owners)
        }
        None => Vec::new(),
    };
    for owner in owners {
        if let Ok(node) = ctx.node_mut(owner)
            && let NodeKind::Deviation(data) = node.kind_mut()
        {
            data.clone = None;
        }
    }
    Ok(())
}

/// Applies every deviate of one deviation.
pub fn apply_deviation(ctx: &mut LinkContext, deviation: NodeId) -> Result<ResolutionStatus> {
    let (text, deviates, status) = match ctx.node(deviation)?.kind() {
        NodeKind::Deviation(data) => (data.path.clone(), data.deviates.clone(), data.status),
        _ => return Ok(ResolutionStatus::Resolved),
    };
    if status.is_resolved() {
        return Ok(status);
    }

    let path = SchemaPath::parse(&text)
        .map_err(|err| err.to_string())
        .and_then(|path| {
            if path.is_absolute() {
                Ok(path)
            } else {
                Err("a deviation takes an absolute path".to_string())
            }
        })
        .map_err(|reason| {
            Diagnostic::error(format!("malformed deviation path `{text}`: {reason}"))
                .with_code(ErrorCode::E110)
                .with_construct(ctx.describe(deviation))
                .with_label(ctx.location(deviation), "deviation declared here")
        })?;

    let Lookup::Found(target) = walk_schema(ctx, deviation, None, &path)? else {
        return Err(Diagnostic::error(format!("deviation target `{text}` not found"))
            .with_code(ErrorCode::E503)
            .with_construct(ctx.describe(deviation))
            .with_label(ctx.location(deviation), "deviation declared here"));
    };

    let file = ctx.file_of(deviation)?.root;
    let existing = ctx.tree.header(file)?.deviation_clones.get(&target).map(|copy| copy.clone);
    let mut clone = match existing {
        Some(clone) => clone,
        None => {
            let map = ctx.tree.clone_subtree(target, deviation, &mut Unguarded)?;
            let clone = map.get(target);
            ctx.tree.header_mut(file)?.deviation_clones.insert(
                target,
                DeviatedCopy {
                    clone,
                    owners: Vec::new(),
                },
            );
            trace!(deviation:?, target:?, clone:?; "Cloned deviation target");
            clone
        }
    };

    for deviate in &deviates {
        let Some(current) = clone else {
            break;
        };
        let (outcome, code) = match deviate {
            Deviate::NotSupported => {
                discard_copy(ctx, file, target, current)?;
                clone = None;
                continue;
            }
            Deviate::Add(props) => (add(&mut ctx.node_mut(current)?.properties, props), ErrorCode::E500),
            Deviate::Delete(props) => (delete(&mut ctx.node_mut(current)?.properties, props), ErrorCode::E501),
            Deviate::Replace(props) => (replace(&mut ctx.node_mut(current)?.properties, props), ErrorCode::E502),
        };
        if let Err(violation) = outcome {
            let reason = match code {
                ErrorCode::E500 => "is already present",
                ErrorCode::E501 => "is not present",
                _ => "must be present to be replaced",
            };
            return Err(Diagnostic::error(format!(
                "deviate {deviate} on `{}`: {violation} {reason}",
                ctx.tree.schema_path(target)
            ))
            .with_code(code)
            .with_construct(ctx.describe(deviation))
            .with_label(ctx.location(deviation), format!("deviate {deviate}"))
            .with_secondary_label(ctx.location(target), "target declared here"));
        }
    }

    if clone.is_some()
        && let Some(copy) = ctx.tree.header_mut(file)?.deviation_clones.get_mut(&target)
    {
        copy.owners.push(deviation);
    }
    if let NodeKind::Deviation(data) = ctx.node_mut(deviation)?.kind_mut() {
        data.target = Some(target);
        data.clone = clone;
        data.status.advance(ResolutionStatus::Resolved);
    }
    debug!(deviation:?, target:?, supported = clone.is_some(); "Applied deviation");
    Ok(ResolutionStatus::Resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Phase, registration::stamp_namespaces, testing};
    use yanglink_core::{
        SchemaTree,
        types::{BuiltinType, TypeReference},
    };

    struct Fixture {
        tree: SchemaTree,
        b: NodeId,
        x: NodeId,
    }

    /// Module `a` with `container top { leaf x { units "s"; must "a"; } }`,
    /// module `b` importing it.
    fn fixture() -> Fixture {
        let mut tree = SchemaTree::new();
        let a = tree.create_module("a", "urn:a", "a", testing::loc());
        let b = tree.create_module("b", "urn:b", "b", testing::loc());
        tree.add_import(b, "a", "pa").unwrap();
        let top = tree.add_child(a, NodeKind::container(), "top", testing::loc()).unwrap();
        let x = tree
            .add_child(top, NodeKind::leaf(TypeReference::builtin(BuiltinType::Int8)), "x", testing::loc())
            .unwrap();
        let props = &mut tree.node_mut(x).unwrap().properties;
        props.units = Some("s".to_string());
        props.must.push("a".to_string());
        Fixture { tree, b, x }
    }

    fn deviate(fx: &mut Fixture, path: &str, deviates: Vec<Deviate>) -> NodeId {
        fx.tree
            .add_child(fx.b, NodeKind::deviation(path, deviates), "deviation", testing::loc())
            .unwrap()
    }

    fn apply(fx: &mut Fixture, deviation: NodeId) -> Result<ResolutionStatus> {
        let index = testing::index(&fx.tree);
        for unit in index.units() {
            stamp_namespaces(&mut fx.tree, unit);
        }
        let mut ctx = LinkContext::new(&mut fx.tree, &index, Phase::InterFile);
        apply_deviation(&mut ctx, deviation)
    }

    fn clone_of(fx: &Fixture, deviation: NodeId) -> Option<NodeId> {
        match fx.tree.node(deviation).unwrap().kind() {
            NodeKind::Deviation(data) => data.clone,
            _ => None,
        }
    }

    #[test]
    fn test_add_edits_clone_only() {
        let mut fx = fixture();
        let added = Properties {
            mandatory: Some(true),
            must: vec!["b".to_string()],
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Add(added)]);
        assert_eq!(apply(&mut fx, dev).unwrap(), ResolutionStatus::Resolved);

        let clone = clone_of(&fx, dev).unwrap();
        let props = &fx.tree.node(clone).unwrap().properties;
        assert_eq!(props.mandatory, Some(true));
        assert_eq!(props.must, vec!["a", "b"]);
        assert_eq!(fx.tree.node(fx.x).unwrap().properties.mandatory, None);
        assert_eq!(fx.tree.parent(clone), Some(dev));
    }

    #[test]
    fn test_add_existing_fails() {
        let mut fx = fixture();
        let added = Properties {
            units: Some("ms".to_string()),
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Add(added)]);
        assert_eq!(apply(&mut fx, dev).unwrap_err().code(), Some(ErrorCode::E500));
    }

    #[test]
    fn test_delete_requires_matching_value() {
        let mut fx = fixture();
        let wrong = Properties {
            units: Some("ms".to_string()),
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Delete(wrong)]);
        assert_eq!(apply(&mut fx, dev).unwrap_err().code(), Some(ErrorCode::E501));

        let mut fx = fixture();
        let right = Properties {
            units: Some("s".to_string()),
            must: vec!["a".to_string()],
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Delete(right)]);
        apply(&mut fx, dev).unwrap();
        let clone = clone_of(&fx, dev).unwrap();
        assert_eq!(fx.tree.node(clone).unwrap().properties, Properties::default());
    }

    #[test]
    fn test_replace_requires_existing() {
        let mut fx = fixture();
        let replaced = Properties {
            default: Some("4".to_string()),
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Replace(replaced)]);
        assert_eq!(apply(&mut fx, dev).unwrap_err().code(), Some(ErrorCode::E502));

        let mut fx = fixture();
        let replaced = Properties {
            units: Some("ms".to_string()),
            ..Properties::default()
        };
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::Replace(replaced)]);
        apply(&mut fx, dev).unwrap();
        let clone = clone_of(&fx, dev).unwrap();
        assert_eq!(fx.tree.node(clone).unwrap().properties.units.as_deref(), Some("ms"));
    }

    #[test]
    fn test_second_deviation_reuses_clone() {
        let mut fx = fixture();
        let first = deviate(
            &mut fx,
            "/pa:top/pa:x",
            vec![Deviate::Add(Properties {
                mandatory: Some(true),
                ..Properties::default()
            })],
        );
        let second = deviate(
            &mut fx,
            "/pa:top/pa:x",
            vec![Deviate::Add(Properties {
                mandatory: Some(false),
                ..Properties::default()
            })],
        );
        apply(&mut fx, first).unwrap();
        // The clone already carries `mandatory`
        assert_eq!(apply(&mut fx, second).unwrap_err().code(), Some(ErrorCode::E500));
        assert_eq!(fx.tree.header(fx.b).unwrap().deviation_clones.len(), 1);
    }

    #[test]
    fn test_not_supported_discards_clone() {
        let mut fx = fixture();
        let dev = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::NotSupported]);
        apply(&mut fx, dev).unwrap();
        assert_eq!(clone_of(&fx, dev), None);
        assert!(fx.tree.child_ids(dev).is_empty());
        let copy = &fx.tree.header(fx.b).unwrap().deviation_clones[&fx.x];
        assert_eq!(copy.clone, None);
        assert!(fx.tree.contains(fx.x));
    }

    #[test]
    fn test_not_supported_clears_earlier_handles() {
        let mut fx = fixture();
        let first = deviate(
            &mut fx,
            "/pa:top/pa:x",
            vec![Deviate::Add(Properties {
                mandatory: Some(true),
                ..Properties::default()
            })],
        );
        let second = deviate(&mut fx, "/pa:top/pa:x", vec![Deviate::NotSupported]);
        let third = deviate(
            &mut fx,
            "/pa:top/pa:x",
            vec![Deviate::Add(Properties {
                mandatory: Some(true),
                ..Properties::default()
            })],
        );

        apply(&mut fx, first).unwrap();
        let copied = clone_of(&fx, first).unwrap();
        apply(&mut fx, second).unwrap();
        assert!(!fx.tree.contains(copied));
        assert_eq!(clone_of(&fx, first), None);
        assert_eq!(clone_of(&fx, second), None);

        // Stays unsupported: no fresh copy is made
        apply(&mut fx, third).unwrap();
        assert_eq!(clone_of(&fx, third), None);
        assert!(fx.tree.child_ids(third).is_empty());
        assert!(fx.tree.node(fx.x).unwrap().properties.mandatory.is_none());
    }

    #[test]
    fn test_missing_target() {
        let mut fx = fixture();
        let dev = deviate(&mut fx, "/pa:top/pa:nope", vec![Deviate::NotSupported]);
        assert_eq!(apply(&mut fx, dev).unwrap_err().code(), Some(ErrorCode::E503));
        let dev = deviate(&mut fx, "top", vec![Deviate::NotSupported]);
        assert_eq!(apply(&mut fx, dev).unwrap_err().code(), Some(ErrorCode::E110));
    }
}
