//! Registration: indexing the input files and seeding their queues.
//!
//! Runs before any resolution. Files are grouped into module units,
//! header references (imports, includes, belongs-to) are checked, every
//! node gets its module namespace, duplicate declarations in the input are
//! rejected and the per-file resolution queues are filled.

use log::{debug, trace};
use yanglink_core::{
    Id, NodeId, NodeKind, NodeTag, SchemaTree,
    kind::FileHeader,
    queue::{QueueKind, ResolutionQueues},
};

use crate::{
    collision::{Candidate, CollisionNamespace, detect_self_collision, find_duplicates},
    context::{FileInfo, ModuleIndex, ModuleUnit, in_grouping},
    error::{Diagnostic, ErrorCode, Result},
    leafref::has_leafref,
};

/// A root left out of the index.
#[derive(Debug, Clone)]
pub struct RejectedFile {
    pub root: NodeId,
    pub diagnostic: Diagnostic,
}

fn file_info(root: NodeId, name: Id, unit: Id, header: &FileHeader) -> FileInfo {
    FileInfo {
        root,
        name,
        unit,
        prefix: header.prefix,
        imports: header.imports.clone(),
        includes: header.includes.clone(),
    }
}

/// Groups the tree's roots into module units.
///
/// Modules are indexed first so submodules can join the unit they belong
/// to regardless of input order. Duplicate file names and submodules of an
/// unknown module are rejected.
pub fn build_index(tree: &SchemaTree) -> (ModuleIndex, Vec<RejectedFile>) {
    let mut index = ModuleIndex::default();
    let mut rejected = Vec::new();

    let duplicate = |root: NodeId, first: NodeId, name: Id| {
        Diagnostic::error(format!("duplicate module or submodule `{name}`"))
            .with_code(ErrorCode::E100)
            .with_construct(crate::context::describe(tree, root))
            .with_label(tree.get(root).map(|n| n.location()).unwrap_or_default(), "duplicate file")
            .with_secondary_label(
                tree.get(first).map(|n| n.location()).unwrap_or_default(),
                "first defined here",
            )
    };

    for &root in tree.roots() {
        let Some(node) = tree.get(root) else {
            continue;
        };
        let NodeKind::Module(data) = node.kind() else {
            continue;
        };
        let name = node.name();
        if let Some(first) = index.unit(name).map(|unit| unit.module) {
            rejected.push(RejectedFile {
                root,
                diagnostic: duplicate(root, first, name),
            });
            continue;
        }
        index.insert_unit(ModuleUnit {
            name,
            namespace: data.namespace,
            module: root,
            files: vec![root],
            priority: node.priority,
        });
        index.insert_file(file_info(root, name, name, &data.header));
    }

    for &root in tree.roots() {
        let Some(node) = tree.get(root) else {
            continue;
        };
        let NodeKind::SubModule(data) = node.kind() else {
            continue;
        };
        let name = node.name();
        if let Some(first) = index.files().find(|file| file.name == name).map(|file| file.root) {
            rejected.push(RejectedFile {
                root,
                diagnostic: duplicate(root, first, name),
            });
            continue;
        }
        let Some(unit) = index.unit_mut(data.belongs_to) else {
            rejected.push(RejectedFile {
                root,
                diagnostic: Diagnostic::error(format!(
                    "submodule `{name}` belongs to unknown module `{}`",
                    data.belongs_to
                ))
                .with_code(ErrorCode::E106)
                .with_construct(format!("submodule {name}"))
                .with_label(node.location(), "belongs-to declared here"),
            });
            continue;
        };
        unit.files.push(root);
        index.insert_file(file_info(root, name, data.belongs_to, &data.header));
    }

    debug!(units = index.units().count(), files = index.files().count(); "Indexed input files");
    (index, rejected)
}

/// Checks that every import and include of the unit names a registered
/// module or a submodule of the same unit.
pub fn check_unit(tree: &SchemaTree, index: &ModuleIndex, unit: &ModuleUnit) -> Result<()> {
    for &root in &unit.files {
        let Some(file) = index.file(root) else {
            continue;
        };
        let location = tree.get(root).map(|node| node.location()).unwrap_or_default();
        for import in &file.imports {
            if index.unit(import.module).is_none() {
                return Err(Diagnostic::error(format!("imported module `{}` not found", import.module))
                    .with_code(ErrorCode::E106)
                    .with_construct(crate::context::describe(tree, root))
                    .with_label(location, format!("import of `{}`", import.module)));
            }
        }
        for include in &file.includes {
            let found = unit
                .files
                .iter()
                .filter_map(|other| index.file(*other))
                .any(|other| other.name == *include && other.root != unit.module);
            if !found {
                return Err(Diagnostic::error(format!(
                    "included submodule `{include}` not found in module `{}`",
                    unit.name
                ))
                .with_code(ErrorCode::E106)
                .with_construct(crate::context::describe(tree, root))
                .with_label(location, format!("include of `{include}`")));
            }
        }
    }
    Ok(())
}

/// Sets the unit's namespace on every node of its files.
pub fn stamp_namespaces(tree: &mut SchemaTree, unit: &ModuleUnit) {
    for &root in &unit.files {
        for id in tree.descendants(root) {
            if let Ok(node) = tree.node_mut(id) {
                node.identifier_mut().set_namespace(unit.namespace);
            }
        }
    }
}

/// Reports every declaration whose name is already taken in its scope.
pub fn check_duplicates(tree: &SchemaTree, unit: &ModuleUnit) -> Vec<Diagnostic> {
    let files = unit.files.as_slice();
    let mut pairs = Vec::new();

    for namespace in [
        CollisionNamespace::Data,
        CollisionNamespace::Typedef,
        CollisionNamespace::Grouping,
        CollisionNamespace::Identity,
        CollisionNamespace::Feature,
    ] {
        pairs.extend(find_duplicates(tree, unit.module, namespace, files));
    }

    for &root in files {
        for id in tree.descendants(root).into_iter().skip(1) {
            match tree.get(id).map(|node| node.tag()) {
                Some(NodeTag::Choice) => {
                    pairs.extend(find_duplicates(tree, id, CollisionNamespace::Case, files));
                }
                Some(NodeTag::Case) | None => {}
                Some(_) => {
                    for namespace in [
                        CollisionNamespace::Data,
                        CollisionNamespace::Typedef,
                        CollisionNamespace::Grouping,
                    ] {
                        pairs.extend(find_duplicates(tree, id, namespace, files));
                    }
                }
            }
        }
    }

    pairs
        .into_iter()
        .filter_map(|(duplicate, first)| {
            let candidate = match Candidate::of(tree, duplicate) {
                Ok(candidate) => candidate,
                Err(err) => return Some(err),
            };
            detect_self_collision(tree, first, &candidate).err()
        })
        .collect()
}

/// Fills the queues of every file of the unit. Returns the number of
/// entries queued.
pub fn enqueue(tree: &mut SchemaTree, unit: &ModuleUnit) -> Result<usize> {
    let mut total = 0;
    for &root in &unit.files {
        let queues = collect_work(tree, root);
        total += queues.len();
        trace!(file:? = root, entries = queues.len(); "Seeded queues");
        tree.header_mut(root)?.queues.merge(queues);
    }
    Ok(total)
}

fn collect_work(tree: &SchemaTree, root: NodeId) -> ResolutionQueues {
    let mut queues = ResolutionQueues::new();
    for id in tree.descendants(root).into_iter().skip(1) {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if !node.if_features.is_empty() {
            queues.push(QueueKind::IfFeature, id);
        }
        match node.kind() {
            NodeKind::Identity(data) if data.base.is_some() => queues.push(QueueKind::IdentityBase, id),
            NodeKind::Leaf(_) | NodeKind::LeafList(_) => {
                queues.push(QueueKind::Type, id);
                if has_leafref(tree, id) && !in_grouping(tree, id) {
                    queues.push(QueueKind::Leafref, id);
                }
            }
            NodeKind::Typedef(_) => queues.push(QueueKind::Type, id),
            NodeKind::Uses(_) => queues.push(QueueKind::Uses, id),
            NodeKind::Augment(_) => {
                let under_uses = tree
                    .parent(id)
                    .and_then(|parent| tree.get(parent))
                    .is_some_and(|parent| parent.tag() == NodeTag::Uses);
                if under_uses || !in_grouping(tree, id) {
                    queues.push(QueueKind::Augment, id);
                }
            }
            NodeKind::Deviation(_) => queues.push(QueueKind::Deviation, id),
            _ => {}
        }
    }
    queues
}
