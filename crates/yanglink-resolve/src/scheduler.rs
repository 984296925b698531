//! The linking pipeline.
//!
//! Registration indexes the input and seeds the per-file queues. Each file
//! is then drained once with only its own definitions visible, after which
//! the inter-file passes repeat over all units in dependency order until
//! every queue is empty or a pass resolves nothing. Deviations, identity
//! propagation and validation follow.
//!
//! Units are drained one after another on a single thread. The intra-file
//! pass finishes for every unit before the first inter-file pass starts.

use log::{debug, info, trace, warn};
use yanglink_core::{
    Id, NodeId, NodeKind, NodeTag, ResolutionStatus, SchemaTree,
    queue::QueueKind,
    types::TypeInfo,
};

use crate::{
    augment::resolve_augment,
    context::{LinkContext, ModuleIndex, ModuleUnit, Phase, describe},
    deviation::apply_deviation,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, LinkError, Result},
    feature::resolve_if_features,
    graph::DependencyGraph,
    identity::{propagate, resolve_base},
    leafref::{resolve_leafref, unresolved_path},
    linked::LinkedGraph,
    options::{FailureMode, LinkOptions},
    registration::{RejectedFile, build_index, check_duplicates, check_unit, enqueue, stamp_namespaces},
    types::resolve_type,
    uses::resolve_uses,
    validate::validate,
};

/// Runs every phase over `tree`.
pub fn run(tree: SchemaTree, options: &LinkOptions) -> std::result::Result<LinkedGraph, LinkError> {
    let mut scheduler = Scheduler::new(tree, options);
    scheduler.register()?;
    scheduler.resolve_intra_file()?;
    scheduler.resolve_inter_file()?;
    scheduler.apply_deviations()?;
    scheduler.propagate_identities();
    if options.validate_list_keys {
        scheduler.validate()?;
    }
    scheduler.finish()
}

struct Scheduler<'o> {
    tree: SchemaTree,
    index: ModuleIndex,
    options: &'o LinkOptions,
    collector: DiagnosticCollector,
    graph: Option<DependencyGraph>,
    order: Vec<Id>,
}

impl<'o> Scheduler<'o> {
    fn new(tree: SchemaTree, options: &'o LinkOptions) -> Self {
        Self {
            tree,
            index: ModuleIndex::default(),
            options,
            collector: DiagnosticCollector::with_limit(options.max_diagnostics),
            graph: None,
            order: Vec::new(),
        }
    }

    /// Units still alive, in dependency order.
    fn live_units(&self) -> Vec<ModuleUnit> {
        self.order
            .iter()
            .filter_map(|name| self.index.unit(*name).cloned())
            .collect()
    }

    fn is_live(&self, unit: Id) -> bool {
        self.index.unit(unit).is_some()
    }

    fn register(&mut self) -> std::result::Result<(), LinkError> {
        info!(files = self.tree.roots().len(); "Registering modules");
        let (index, rejected) = build_index(&self.tree);
        self.index = index;
        for file in rejected {
            self.reject_file(file)?;
        }

        let units: Vec<ModuleUnit> = self.index.units().cloned().collect();
        let mut failures: Vec<(Id, Vec<Diagnostic>)> = Vec::new();
        for unit in &units {
            if let Err(diagnostic) = check_unit(&self.tree, &self.index, unit) {
                failures.push((unit.name, vec![diagnostic]));
                continue;
            }
            stamp_namespaces(&mut self.tree, unit);
            let duplicates = check_duplicates(&self.tree, unit);
            if !duplicates.is_empty() {
                failures.push((unit.name, duplicates));
                continue;
            }
            match enqueue(&mut self.tree, unit) {
                Ok(entries) => debug!(module:% = unit.name, entries; "Registered module"),
                Err(diagnostic) => failures.push((unit.name, vec![diagnostic])),
            }
        }

        let graph = DependencyGraph::build(&self.index);
        for cycle in graph.cycles(&self.tree, &self.index) {
            let mut diagnostics = vec![cycle.diagnostic];
            for unit in cycle.units {
                failures.push((unit, std::mem::take(&mut diagnostics)));
            }
        }
        self.order = graph.unit_order();
        self.graph = Some(graph);

        for (unit, diagnostics) in failures {
            self.fail(unit, diagnostics)?;
        }
        Ok(())
    }

    fn resolve_intra_file(&mut self) -> std::result::Result<(), LinkError> {
        info!(modules = self.order.len(); "Resolving within files");
        for unit in self.live_units() {
            if !self.is_live(unit.name) {
                continue;
            }
            match drain_unit(&mut self.tree, &self.index, &unit, Phase::IntraFile) {
                Ok(resolved) => debug!(module:% = unit.name, resolved; "Drained intra-file queues"),
                Err(diagnostic) => self.fail(unit.name, vec![diagnostic])?,
            }
        }
        Ok(())
    }

    fn resolve_inter_file(&mut self) -> std::result::Result<(), LinkError> {
        info!("Resolving across files");
        let mut pass = 0;
        loop {
            pass += 1;
            let mut resolved = 0;
            for unit in self.live_units() {
                if !self.is_live(unit.name) {
                    continue;
                }
                match drain_unit(&mut self.tree, &self.index, &unit, Phase::InterFile) {
                    Ok(count) => resolved += count,
                    Err(diagnostic) => self.fail(unit.name, vec![diagnostic])?,
                }
            }

            let remaining = self.remaining();
            debug!(pass, resolved, remaining; "Finished inter-file pass");
            if remaining == 0 {
                return Ok(());
            }
            if resolved == 0 || pass >= self.options.max_passes {
                break;
            }
        }

        warn!(pass; "Inter-file resolution stalled");
        for unit in self.live_units() {
            if !self.is_live(unit.name) {
                continue;
            }
            let diagnostics = stalled(&self.tree, &unit);
            if !diagnostics.is_empty() {
                self.fail(unit.name, diagnostics)?;
            }
        }
        Ok(())
    }

    /// Queue entries left in live units, deviations excluded.
    fn remaining(&self) -> usize {
        self.live_units()
            .iter()
            .flat_map(|unit| unit.files.iter())
            .filter_map(|file| self.tree.header(*file).ok())
            .map(|header| header.queues.len() - header.queues.get(QueueKind::Deviation).len())
            .sum()
    }

    fn apply_deviations(&mut self) -> std::result::Result<(), LinkError> {
        info!("Applying deviations");
        for unit in self.live_units() {
            if !self.is_live(unit.name) {
                continue;
            }
            match apply_unit_deviations(&mut self.tree, &self.index, &unit) {
                Ok(0) => {}
                Ok(applied) => debug!(module:% = unit.name, applied; "Applied deviations"),
                Err(diagnostic) => self.fail(unit.name, vec![diagnostic])?,
            }
        }
        Ok(())
    }

    fn propagate_identities(&mut self) {
        let identities: Vec<NodeId> = self
            .live_units()
            .iter()
            .flat_map(|unit| unit.files.iter())
            .flat_map(|file| self.tree.child_ids(*file))
            .filter(|id| self.tree.get(*id).is_some_and(|node| node.tag() == NodeTag::Identity))
            .collect();
        let count = propagate(&mut self.tree, &identities);
        info!(identities = count; "Propagated identity hierarchy");
    }

    fn validate(&mut self) -> std::result::Result<(), LinkError> {
        info!("Validating data tree");
        for unit in self.live_units() {
            if !self.is_live(unit.name) {
                continue;
            }
            let diagnostics = validate(&mut self.tree, &unit.files);
            if !diagnostics.is_empty() {
                self.fail(unit.name, diagnostics)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> std::result::Result<LinkedGraph, LinkError> {
        let modules = self
            .order
            .iter()
            .filter_map(|name| self.index.unit(*name))
            .map(|unit| (unit.name, unit.module))
            .collect();
        let warnings = self.collector.finish()?;
        info!(modules = self.index.units().count(), warnings = warnings.len(); "Linking finished");
        Ok(LinkedGraph::new(self.tree, modules, warnings))
    }

    fn reject_file(&mut self, file: RejectedFile) -> std::result::Result<(), LinkError> {
        if self.options.failure_mode == FailureMode::FailFast {
            return Err(file.diagnostic.into());
        }
        self.collector.emit(file.diagnostic);
        self.tree.discard_subtree(file.root).map_err(Diagnostic::from)?;
        self.check_capacity()
    }

    /// Reports the diagnostics of a failed unit.
    ///
    /// Fail-fast stops with the first diagnostic. Batch mode discards the
    /// unit together with every unit depending on it and carries on.
    fn fail(&mut self, unit: Id, diagnostics: Vec<Diagnostic>) -> std::result::Result<(), LinkError> {
        if self.options.failure_mode == FailureMode::FailFast {
            let first = diagnostics
                .into_iter()
                .next()
                .unwrap_or_else(|| Diagnostic::error(format!("module `{unit}` failed to link")));
            return Err(first.into());
        }

        for diagnostic in diagnostics {
            self.collector.emit(diagnostic);
        }
        if !self.is_live(unit) {
            return self.check_capacity();
        }
        warn!(module:% = unit; "Discarding failed module");
        self.drop_unit(unit)?;

        let dependents = self
            .graph
            .as_ref()
            .map(|graph| graph.dependents(unit))
            .unwrap_or_default();
        for dependent in dependents {
            if !self.is_live(dependent) {
                continue;
            }
            let location = self
                .index
                .unit(dependent)
                .and_then(|info| self.tree.get(info.module))
                .map(|node| node.location())
                .unwrap_or_default();
            self.collector.emit(
                Diagnostic::warning(format!("module `{dependent}` skipped because `{unit}` failed to link"))
                    .with_code(ErrorCode::E106)
                    .with_construct(format!("module `{dependent}`"))
                    .with_label(location, "depends on a failed module"),
            );
            self.drop_unit(dependent)?;
        }
        let pruned = self.tree.prune_augments();
        trace!(pruned; "Pruned augments of discarded modules");
        self.check_capacity()
    }

    fn drop_unit(&mut self, unit: Id) -> Result<()> {
        if let Some(info) = self.index.unit(unit) {
            for file in info.files.clone() {
                if self.tree.contains(file) {
                    self.tree.discard_subtree(file)?;
                }
            }
        }
        self.index.remove_unit(unit);
        Ok(())
    }

    fn check_capacity(&mut self) -> std::result::Result<(), LinkError> {
        if self.collector.is_full() {
            warn!(limit = self.options.max_diagnostics; "Diagnostic limit reached");
            return std::mem::take(&mut self.collector).finish().map(|_| ());
        }
        Ok(())
    }
}

fn dispatch(ctx: &mut LinkContext, kind: QueueKind, id: NodeId) -> Result<ResolutionStatus> {
    match kind {
        QueueKind::IfFeature => resolve_if_features(ctx, id),
        QueueKind::IdentityBase => resolve_base(ctx, id),
        QueueKind::Type => resolve_type(ctx, id),
        QueueKind::Uses => resolve_uses(ctx, id),
        QueueKind::Augment => resolve_augment(ctx, id),
        QueueKind::Leafref => resolve_leafref(ctx, id),
        QueueKind::Deviation => apply_deviation(ctx, id),
    }
}

fn drain_unit(tree: &mut SchemaTree, index: &ModuleIndex, unit: &ModuleUnit, phase: Phase) -> Result<usize> {
    let mut resolved = 0;
    for &file in &unit.files {
        resolved += drain_file(tree, index, file, phase)?;
    }
    Ok(resolved)
}

/// Runs every queue of one file once. Returns how many entries resolved;
/// the rest stay queued.
fn drain_file(tree: &mut SchemaTree, index: &ModuleIndex, file: NodeId, phase: Phase) -> Result<usize> {
    let mut queues = std::mem::take(&mut tree.header_mut(file)?.queues);
    let mut ctx = LinkContext::new(tree, index, phase);
    let mut resolved = 0;

    for kind in QueueKind::ORDER {
        let mut waiting = Vec::new();
        for id in queues.take(kind) {
            // Discarded since it was queued
            if !ctx.tree.contains(id) {
                continue;
            }
            if dispatch(&mut ctx, kind, id)?.is_resolved() {
                resolved += 1;
            } else {
                waiting.push(id);
            }
        }
        for id in waiting {
            queues.push(kind, id);
        }
    }

    let pending = std::mem::take(&mut ctx.pending);
    queues.merge(pending);
    trace!(file:?, resolved, waiting = queues.len(); "Drained file");
    tree.header_mut(file)?.queues = queues;
    Ok(resolved)
}

fn apply_unit_deviations(tree: &mut SchemaTree, index: &ModuleIndex, unit: &ModuleUnit) -> Result<usize> {
    let mut applied = 0;
    for &file in &unit.files {
        let deviations = tree.header_mut(file)?.queues.take(QueueKind::Deviation);
        let mut ctx = LinkContext::new(tree, index, Phase::InterFile);
        for id in deviations {
            if !ctx.tree.contains(id) {
                continue;
            }
            apply_deviation(&mut ctx, id)?;
            applied += 1;
        }
    }
    Ok(applied)
}

/// One error per entry still queued after the fixpoint.
fn stalled(tree: &SchemaTree, unit: &ModuleUnit) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for &file in &unit.files {
        let Ok(header) = tree.header(file) else {
            continue;
        };
        for kind in QueueKind::ORDER {
            for &id in header.queues.get(kind) {
                if let Some(diagnostic) = stall_diagnostic(tree, kind, id) {
                    diagnostics.push(diagnostic);
                }
            }
        }
    }
    diagnostics
}

fn stall_diagnostic(tree: &SchemaTree, kind: QueueKind, id: NodeId) -> Option<Diagnostic> {
    let node = tree.get(id)?;
    let (code, message) = match (kind, node.kind()) {
        (QueueKind::IfFeature, _) => {
            let names: Vec<String> = node
                .if_features
                .iter()
                .filter(|feature| feature.feature.is_none())
                .map(|feature| feature.name.to_string())
                .collect();
            (ErrorCode::E402, format!("feature `{}` could not be resolved", names.join("`, `")))
        }
        (QueueKind::IdentityBase, NodeKind::Identity(data)) => (
            ErrorCode::E401,
            match data.base {
                Some(base) => format!("base identity `{base}` could not be resolved"),
                None => "base identity could not be resolved".to_string(),
            },
        ),
        (QueueKind::Type, node_kind) => match node_kind.type_ref() {
            Some(ty) if matches!(ty.info, TypeInfo::Identityref(_)) => {
                (ErrorCode::E403, format!("identityref base of type `{ty}` could not be resolved"))
            }
            Some(ty) => (ErrorCode::E101, format!("type `{ty}` could not be resolved")),
            None => (ErrorCode::E101, "type could not be resolved".to_string()),
        },
        (QueueKind::Uses, NodeKind::Uses(data)) => (
            ErrorCode::E102,
            format!("grouping `{}` could not be instantiated", data.grouping),
        ),
        (QueueKind::Augment, NodeKind::Augment(data)) => (
            ErrorCode::E103,
            format!("augment target `{}` not found", data.path),
        ),
        (QueueKind::Leafref, _) => (
            ErrorCode::E104,
            match unresolved_path(tree, id) {
                Some(path) => format!("leafref path `{path}` never reaches a resolved leaf"),
                None => "leafref could not be resolved".to_string(),
            },
        ),
        _ => return None,
    };
    let help = match code {
        ErrorCode::E104 => Some("leafref chains must end at a leaf that is not a leafref"),
        ErrorCode::E102 => Some("groupings must not use themselves, directly or through other groupings"),
        _ => None,
    };
    let diagnostic = Diagnostic::error(message)
        .with_code(code)
        .with_construct(describe(tree, id))
        .with_label(node.location(), format!("{kind} declared here"));
    Some(match help {
        Some(help) => diagnostic.with_help(help),
        None => diagnostic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorKind, Severity},
        testing,
    };
    use yanglink_core::types::{BuiltinType, TypeReference};

    fn string() -> NodeKind {
        NodeKind::leaf(TypeReference::builtin(BuiltinType::String))
    }

    fn batch() -> LinkOptions {
        LinkOptions {
            failure_mode: FailureMode::Batch,
            ..LinkOptions::default()
        }
    }

    #[test]
    fn test_links_across_modules() {
        let mut tree = SchemaTree::new();
        let b = tree.create_module("b", "urn:b", "b", testing::loc());
        let a = tree.create_module("a", "urn:a", "a", testing::loc());
        tree.add_import(b, "a", "pa").unwrap();
        tree.add_child(a, NodeKind::typedef(TypeReference::builtin(BuiltinType::Uint8)), "small", testing::loc())
            .unwrap();
        let g = tree.add_child(a, NodeKind::Grouping, "endpoint", testing::loc()).unwrap();
        tree.add_child(g, NodeKind::leaf(TypeReference::derived("small")), "port", testing::loc())
            .unwrap();
        let top = tree.add_child(b, NodeKind::container(), "top", testing::loc()).unwrap();
        tree.add_child(top, NodeKind::uses("pa:endpoint"), "uses", testing::loc()).unwrap();
        tree.add_child(top, NodeKind::leaf(TypeReference::leafref_path("../port")), "ref", testing::loc())
            .unwrap();

        let graph = run(tree, &LinkOptions::default()).unwrap();
        let port = graph.find_child(top, "port", Some("urn:b")).unwrap();
        let ty = graph.node(port).unwrap().kind().type_ref().unwrap();
        assert_eq!(ty.status, ResolutionStatus::Resolved);
        assert_eq!(ty.effective_builtin(), Some(BuiltinType::Uint8));

        let reference = graph.find_child(top, "ref", None).unwrap();
        let info = graph.node(reference).unwrap().kind().type_ref().unwrap().leafref().cloned().unwrap();
        assert_eq!(info.target, Some(port));
        assert_eq!(info.status, ResolutionStatus::Resolved);
        let names: Vec<String> = graph.modules().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        tree.add_child(m, NodeKind::uses("ghost"), "uses", testing::loc()).unwrap();
        tree.add_child(m, NodeKind::leaf(TypeReference::derived("missing")), "x", testing::loc())
            .unwrap();

        let err = run(tree, &LinkOptions::default()).unwrap_err();
        assert_eq!(err.errors().count(), 1);
    }

    #[test]
    fn test_batch_skips_dependents() {
        let mut tree = SchemaTree::new();
        let broken = tree.create_module("broken", "urn:x", "x", testing::loc());
        let user = tree.create_module("user", "urn:u", "u", testing::loc());
        let fine = tree.create_module("fine", "urn:f", "f", testing::loc());
        tree.add_import(user, "broken", "x").unwrap();
        tree.add_child(broken, NodeKind::leaf(TypeReference::derived("missing")), "x", testing::loc())
            .unwrap();
        tree.add_child(fine, string(), "ok", testing::loc()).unwrap();

        let err = run(tree, &batch()).unwrap_err();
        assert_eq!(err.errors().count(), 1);
        assert_eq!(err.kind(), Some(ErrorKind::UnresolvedReference));
        let warnings: Vec<_> = err.diagnostics().iter().filter(|d| d.severity() == Severity::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message().contains("user"));
    }

    #[test]
    fn test_leafref_cycle_stalls() {
        let mut tree = SchemaTree::new();
        let m = tree.create_module("m", "urn:m", "m", testing::loc());
        tree.add_child(m, NodeKind::leaf(TypeReference::leafref_path("../b")), "a", testing::loc())
            .unwrap();
        tree.add_child(m, NodeKind::leaf(TypeReference::leafref_path("../a")), "b", testing::loc())
            .unwrap();

        let err = run(tree, &batch()).unwrap_err();
        let codes: Vec<_> = err.errors().filter_map(Diagnostic::code).collect();
        assert_eq!(codes, vec![ErrorCode::E104, ErrorCode::E104]);
    }

    #[test]
    fn test_import_cycle_fails_both_modules() {
        let mut tree = SchemaTree::new();
        let a = tree.create_module("a", "urn:a", "a", testing::loc());
        let b = tree.create_module("b", "urn:b", "b", testing::loc());
        tree.add_import(a, "b", "b").unwrap();
        tree.add_import(b, "a", "a").unwrap();
        let c = tree.create_module("c", "urn:c", "c", testing::loc());
        tree.add_child(c, string(), "ok", testing::loc()).unwrap();

        let err = run(tree, &batch()).unwrap_err();
        let codes: Vec<_> = err.errors().filter_map(Diagnostic::code).collect();
        assert_eq!(codes, vec![ErrorCode::E107]);
    }

    #[test]
    fn test_deviation_runs_after_fixpoint() {
        let mut tree = SchemaTree::new();
        let a = tree.create_module("a", "urn:a", "a", testing::loc());
        let b = tree.create_module("b", "urn:b", "b", testing::loc());
        tree.add_import(b, "a", "pa").unwrap();
        let top = tree.add_child(a, NodeKind::container(), "top", testing::loc()).unwrap();
        tree.add_child(top, string(), "x", testing::loc()).unwrap();
        let deviation = tree
            .add_child(
                b,
                NodeKind::deviation("/pa:top/pa:x", vec![yanglink_core::kind::Deviate::NotSupported]),
                "deviation",
                testing::loc(),
            )
            .unwrap();

        let graph = run(tree, &LinkOptions::default()).unwrap();
        match graph.node(deviation).unwrap().kind() {
            NodeKind::Deviation(data) => {
                assert!(data.status.is_resolved());
                assert!(data.target.is_some());
                assert_eq!(data.clone, None);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let build = || {
            let mut tree = SchemaTree::new();
            let m = tree.create_module("m", "urn:m", "m", testing::loc());
            tree.add_child(m, NodeKind::list(&[]), "servers", testing::loc()).unwrap();
            tree
        };
        let err = run(build(), &LinkOptions::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Cardinality));

        let options = LinkOptions {
            validate_list_keys: false,
            ..LinkOptions::default()
        };
        assert!(run(build(), &options).is_ok());
    }
}
