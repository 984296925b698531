//! Helpers shared by the resolver unit tests.

use yanglink_core::{SchemaTree, SourceLocation};

use crate::{context::ModuleIndex, registration::build_index};

pub fn loc() -> SourceLocation {
    SourceLocation::in_file("test.yang")
}

/// Index of `tree`, which must register cleanly.
pub fn index(tree: &SchemaTree) -> ModuleIndex {
    let (index, rejected) = build_index(tree);
    assert!(rejected.is_empty(), "rejected files: {rejected:?}");
    index
}
