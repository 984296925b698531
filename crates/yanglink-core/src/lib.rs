//! Schema tree model for the yanglink schema linker.
//!
//! This crate holds the data the linker operates on:
//!
//! - [`identifier`]: interned names, qualified references and node identifiers
//! - [`arena`]: generation-checked node storage
//! - [`tree`]: the [`SchemaTree`] with index-based relations and iterative
//!   subtree cloning
//! - [`kind`] and [`node`]: construct kinds and per-kind data
//! - [`types`] and [`restriction`]: type references, effective types and
//!   range/length restriction sets
//! - [`queue`]: per-file resolution queues
//! - [`path`]: schema node paths
//! - [`visit`]: read-only traversal
//!
//! Parsing schema text is not part of this crate. A parser (or a test)
//! builds the per-file trees through [`SchemaTree`]'s construction API:
//!
//! ```
//! use yanglink_core::{
//!     kind::NodeKind,
//!     location::SourceLocation,
//!     tree::SchemaTree,
//!     types::{BuiltinType, TypeReference},
//! };
//!
//! let loc = SourceLocation::in_file("a.yang");
//! let mut tree = SchemaTree::new();
//! let module = tree.create_module("a", "urn:a", "a", loc);
//! let top = tree.add_child(module, NodeKind::container(), "top", loc).unwrap();
//! tree.add_child(top, NodeKind::leaf(TypeReference::builtin(BuiltinType::String)), "x", loc)
//!     .unwrap();
//! assert_eq!(tree.schema_path(top), "/top");
//! ```

pub mod arena;
pub mod identifier;
pub mod kind;
pub mod location;
pub mod node;
pub mod path;
pub mod queue;
pub mod restriction;
pub mod status;
pub mod tree;
pub mod types;
pub mod visit;

pub use arena::NodeId;
pub use identifier::{Id, Identifier, QualifiedName};
pub use kind::{NodeKind, NodeTag};
pub use location::SourceLocation;
pub use node::SchemaNode;
pub use status::ResolutionStatus;
pub use tree::{SchemaTree, TreeError};
