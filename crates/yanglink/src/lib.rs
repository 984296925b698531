//! yanglink - a semantic linker for YANG-like modular schemas.
//!
//! A parser hands over one [`SchemaTree`] holding every module and
//! submodule it read. The [`Linker`] resolves types, groupings, augments,
//! leafrefs, identities, features and deviations across all of them and
//! returns a [`LinkedGraph`] that consumers walk read-only.

pub mod config;

mod error;

pub use yanglink_core::{
    Id, Identifier, NodeId, NodeKind, QualifiedName, ResolutionStatus, SchemaNode, SchemaTree,
    SourceLocation, TreeError, kind, location, path, restriction, types, visit,
};
pub use yanglink_resolve::{Diagnostic, ErrorCode, ErrorKind, LinkError, LinkedGraph};

pub use error::YanglinkError;

use log::{debug, info};

use config::LinkConfig;

/// Builder for linking schema trees.
///
/// # Examples
///
/// ```
/// use yanglink::{
///     Linker, NodeKind, SchemaTree, SourceLocation,
///     config::LinkConfig,
///     types::{BuiltinType, TypeReference},
/// };
///
/// let loc = SourceLocation::in_file("a.yang");
/// let mut tree = SchemaTree::new();
/// let a = tree.create_module("a", "urn:a", "a", loc);
/// tree.add_child(a, NodeKind::leaf(TypeReference::builtin(BuiltinType::Boolean)), "enabled", loc)
///     .unwrap();
///
/// let linker = Linker::new(LinkConfig::default());
/// let graph = linker.link(tree).unwrap();
/// assert!(graph.module("a").is_some());
/// ```
#[derive(Debug, Default)]
pub struct Linker {
    config: LinkConfig,
}

impl Linker {
    /// Create a new linker with the given configuration.
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Link every module held by `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`YanglinkError::Link`] carrying the first error in fail-fast
    /// mode, or every collected diagnostic in batch mode.
    pub fn link(&self, tree: SchemaTree) -> Result<LinkedGraph, YanglinkError> {
        info!(files = tree.roots().len(); "Linking schema");

        let graph = yanglink_resolve::link(tree, &self.config.to_options())?;

        debug!(
            modules = graph.modules().count(),
            warnings = graph.warnings().len();
            "Schema linked successfully"
        );
        Ok(graph)
    }
}
