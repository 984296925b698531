//! Error and diagnostic system for the linker.
//!
//! This module provides:
//! - Error codes grouped into the [`ErrorKind`]s callers match on
//! - Labeled source locations for rich error context
//! - Severity levels
//! - A diagnostic collector for batch mode
//!
//! # Example
//!
//! ```
//! # use yanglink_resolve::error::{Diagnostic, ErrorCode, ErrorKind};
//! # use yanglink_core::SourceLocation;
//!
//! let diag = Diagnostic::error("duplicate identifier `x`")
//!     .with_code(ErrorCode::E100)
//!     .with_label(SourceLocation::new("a.yang", 10, 5), "duplicate definition")
//!     .with_secondary_label(SourceLocation::new("a.yang", 4, 5), "first defined here")
//!     .with_help("rename one of the nodes");
//! assert_eq!(diag.kind(), Some(ErrorKind::DuplicateIdentifier));
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod link_error;
mod severity;

pub use collector::DiagnosticCollector;
pub use diagnostic::Diagnostic;
pub use error_code::{ErrorCode, ErrorKind};
pub use label::Label;
pub use link_error::{LinkError, Result};
pub use severity::Severity;
