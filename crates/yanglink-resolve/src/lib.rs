//! Resolution and linking engine for the yanglink schema linker.
//!
//! [`link`] takes a [`SchemaTree`] holding every parsed module and
//! submodule and resolves it in place:
//!
//! 1. Registration groups files into module units, checks imports and
//!    includes, stamps namespaces and seeds the per-file queues.
//! 2. Every file is drained once with only its own definitions visible.
//! 3. Inter-file passes repeat in dependency order until every queue is
//!    empty or a pass makes no progress.
//! 4. Deviations are applied, the identity hierarchy is closed and the data
//!    tree is validated.
//!
//! ```
//! use yanglink_core::{
//!     NodeKind, SchemaTree, SourceLocation,
//!     types::{BuiltinType, TypeReference},
//! };
//! use yanglink_resolve::{LinkOptions, link};
//!
//! let loc = SourceLocation::in_file("a.yang");
//! let mut tree = SchemaTree::new();
//! let a = tree.create_module("a", "urn:a", "a", loc);
//! let top = tree.add_child(a, NodeKind::container(), "top", loc).unwrap();
//! tree.add_child(top, NodeKind::leaf(TypeReference::builtin(BuiltinType::String)), "x", loc)
//!     .unwrap();
//!
//! let graph = link(tree, &LinkOptions::default()).unwrap();
//! assert!(graph.find_child(top, "x", Some("urn:a")).is_some());
//! ```

pub mod augment;
pub mod collision;
pub mod context;
pub mod deviation;
pub mod error;
pub mod feature;
pub mod graph;
pub mod identity;
pub mod leafref;
pub mod navigate;
pub mod options;
pub mod registration;
pub mod restriction;
pub mod types;
pub mod uses;
pub mod validate;

mod linked;
mod scheduler;

#[cfg(test)]
mod testing;

pub use error::{Diagnostic, ErrorCode, ErrorKind, LinkError};
pub use linked::LinkedGraph;
pub use options::{FailureMode, LinkOptions};

use yanglink_core::SchemaTree;

/// Links every module of `tree`.
///
/// # Errors
///
/// Returns a [`LinkError`] carrying the first error in fail-fast mode, or
/// every error and warning collected in batch mode.
///
/// # Examples
///
/// ```
/// use yanglink_core::{
///     NodeKind, SchemaTree, SourceLocation,
///     types::{BuiltinType, TypeReference},
/// };
/// use yanglink_resolve::{ErrorCode, LinkOptions, link};
///
/// let loc = SourceLocation::in_file("m.yang");
/// let mut tree = SchemaTree::new();
/// let m = tree.create_module("m", "urn:m", "m", loc);
/// tree.add_child(m, NodeKind::leaf(TypeReference::derived("missing")), "x", loc)
///     .unwrap();
///
/// let err = link(tree, &LinkOptions::default()).unwrap_err();
/// assert_eq!(err.errors().next().and_then(|d| d.code()), Some(ErrorCode::E101));
/// ```
pub fn link(tree: SchemaTree, options: &LinkOptions) -> Result<LinkedGraph, LinkError> {
    scheduler::run(tree, options)
}
