//! Path walking over the schema tree.
//!
//! Two walks share this module. Schema walks (augment and deviation
//! targets) step through every schema node, choices and cases included.
//! Data walks (leafref paths) only see data nodes and look through choices
//! and cases as if they were not there.
//!
//! Both return [`Lookup::Deferred`] when the answer can only come from a
//! later phase, and [`Lookup::Missing`] when the path does not lead
//! anywhere in the current tree. Callers decide whether a miss is final:
//! the node may still appear once a pending `uses` or augment is resolved.

use yanglink_core::{
    Id, NodeId, NodeKind, NodeTag, QualifiedName,
    path::{PathStep, SchemaPath},
};

use crate::{
    context::{LinkContext, Lookup, Phase, PrefixTarget},
    error::Result,
};

/// Kinds a schema node identifier can name.
fn is_schema_node(tag: NodeTag) -> bool {
    matches!(
        tag,
        NodeTag::Container
            | NodeTag::List
            | NodeTag::Leaf
            | NodeTag::LeafList
            | NodeTag::AnyData
            | NodeTag::Choice
            | NodeTag::Case
            | NodeTag::Rpc
            | NodeTag::Input
            | NodeTag::Output
            | NodeTag::Notification
    )
}

/// Kinds visible to a data walk.
fn is_data_node(tag: NodeTag) -> bool {
    is_schema_node(tag) && !matches!(tag, NodeTag::Choice | NodeTag::Case)
}

/// Where an absolute walk starts.
enum Start {
    Roots(Vec<NodeId>),
    Deferred,
}

/// The top-level files an absolute path whose first step is `first` starts
/// in, as seen from `from`.
fn absolute_start(ctx: &LinkContext, from: NodeId, first: QualifiedName) -> Result<Start> {
    let target = ctx.resolve_prefix(from, first.prefix())?;
    if ctx.phase == Phase::IntraFile {
        return Ok(match target {
            PrefixTarget::Local(_) => Start::Roots(vec![ctx.file_of(from)?.root]),
            PrefixTarget::Imported(_) => Start::Deferred,
        });
    }
    Ok(match ctx.index.unit(target.unit()) {
        Some(unit) => Start::Roots(unit.files.clone()),
        None => Start::Roots(Vec::new()),
    })
}

/// Namespace a prefixed step must match. Unprefixed steps match any.
fn step_namespace(ctx: &LinkContext, from: NodeId, name: QualifiedName) -> Result<Option<Id>> {
    if name.prefix().is_none() {
        return Ok(None);
    }
    let target = ctx.resolve_prefix(from, name.prefix())?;
    Ok(ctx.index.unit(target.unit()).map(|unit| unit.namespace))
}

fn matches(ctx: &LinkContext, id: NodeId, name: Id, namespace: Option<Id>, visible: fn(NodeTag) -> bool) -> bool {
    ctx.tree
        .get(id)
        .is_some_and(|node| visible(node.tag()) && node.identifier().matches(name, namespace))
}

/// A miss that might still turn into a hit in the inter-file phase.
fn miss(ctx: &LinkContext) -> Lookup {
    match ctx.phase {
        Phase::IntraFile => Lookup::Deferred,
        Phase::InterFile => Lookup::Missing,
    }
}

/// Walks a schema node path declared at `from`.
///
/// Absolute paths start at the top level of the module their first step's
/// prefix names. Descendant paths start at `start`.
pub fn walk_schema(ctx: &LinkContext, from: NodeId, start: Option<NodeId>, path: &SchemaPath) -> Result<Lookup> {
    let mut names = Vec::with_capacity(path.steps().len());
    for step in path.steps() {
        match step {
            PathStep::Child(name) => names.push(*name),
            PathStep::Parent => return Ok(Lookup::Missing),
        }
    }
    let Some(first) = names.first().copied() else {
        return Ok(Lookup::Missing);
    };

    let mut scope: Vec<NodeId> = match (path.is_absolute(), start) {
        (true, _) => match absolute_start(ctx, from, first)? {
            Start::Roots(roots) => roots.iter().flat_map(|root| ctx.tree.scope_children(*root)).collect(),
            Start::Deferred => return Ok(Lookup::Deferred),
        },
        (false, Some(start)) => ctx.tree.scope_children(start),
        (false, None) => return Ok(Lookup::Missing),
    };

    let mut current = None;
    for name in names {
        let namespace = step_namespace(ctx, from, name)?;
        let Some(found) = scope
            .iter()
            .copied()
            .find(|id| matches(ctx, *id, name.name(), namespace, is_schema_node))
        else {
            return Ok(miss(ctx));
        };
        current = Some(found);
        scope = ctx.tree.scope_children(found);
    }
    Ok(current.map_or(Lookup::Missing, Lookup::Found))
}

/// Data children of `id`, looking through choices and cases.
pub fn data_children(ctx: &LinkContext, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = ctx.tree.scope_children(id);
    stack.reverse();
    while let Some(child) = stack.pop() {
        match ctx.tree.get(child).map(|node| node.tag()) {
            Some(NodeTag::Choice | NodeTag::Case) => {
                let first = stack.len();
                stack.extend(ctx.tree.scope_children(child));
                stack[first..].reverse();
            }
            Some(tag) if is_data_node(tag) => out.push(child),
            _ => {}
        }
    }
    out
}

/// Where `..` from `id` leads in the data tree.
enum DataParent {
    Node(NodeId),
    /// `id` sits in an augment whose target is not known yet.
    Pending,
    None,
}

fn data_parent(ctx: &LinkContext, id: NodeId) -> DataParent {
    let mut current = id;
    loop {
        let Some(parent) = ctx.tree.get(current).and_then(|node| node.logical_parent()) else {
            return DataParent::None;
        };
        match ctx.tree.get(parent).map(|node| node.kind()) {
            Some(NodeKind::Augment(data)) => match data.target {
                Some(target) => return DataParent::Node(target),
                None => return DataParent::Pending,
            },
            Some(NodeKind::Choice | NodeKind::Case) => current = parent,
            Some(_) => return DataParent::Node(parent),
            None => return DataParent::None,
        }
    }
}

/// Walks a leafref path from the leaf `from`.
pub fn walk_data(ctx: &LinkContext, from: NodeId, path: &SchemaPath) -> Result<Lookup> {
    // Nodes the next named step is searched in
    let mut scope: Vec<NodeId>;
    let mut steps = path.steps().iter().peekable();

    if path.is_absolute() {
        let Some(PathStep::Child(first)) = steps.peek().copied() else {
            return Ok(Lookup::Missing);
        };
        scope = match absolute_start(ctx, from, *first)? {
            Start::Roots(roots) => roots.iter().flat_map(|root| data_children(ctx, *root)).collect(),
            Start::Deferred => return Ok(Lookup::Deferred),
        };
    } else {
        let mut current = from;
        while let Some(PathStep::Parent) = steps.peek() {
            steps.next();
            current = match data_parent(ctx, current) {
                DataParent::Node(parent) => parent,
                DataParent::Pending => return Ok(Lookup::Deferred),
                DataParent::None => return Ok(Lookup::Missing),
            };
        }
        scope = if ctx.tree.get(current).is_some_and(|node| node.tag().is_file_root()) {
            top_level_data(ctx, current)?
        } else {
            data_children(ctx, current)
        };
    }

    let mut found = None;
    for step in steps {
        let PathStep::Child(name) = step else {
            return Ok(Lookup::Missing);
        };
        let namespace = step_namespace(ctx, from, *name)?;
        let Some(next) = scope
            .iter()
            .copied()
            .find(|id| matches(ctx, *id, name.name(), namespace, is_data_node))
        else {
            return Ok(miss(ctx));
        };
        found = Some(next);
        scope = data_children(ctx, next);
    }
    Ok(found.map_or(Lookup::Missing, Lookup::Found))
}

/// Top-level data nodes visible from the file rooted at `root`: the whole
/// unit in the inter-file phase, the file itself before.
fn top_level_data(ctx: &LinkContext, root: NodeId) -> Result<Vec<NodeId>> {
    let roots = match ctx.phase {
        Phase::IntraFile => vec![root],
        Phase::InterFile => ctx.unit_of(root)?.files.clone(),
    };
    Ok(roots.iter().flat_map(|file| data_children(ctx, *file)).collect())
}
