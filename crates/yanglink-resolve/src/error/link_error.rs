//! The [`LinkError`] type wrapping linking diagnostics.

use std::fmt;

use crate::error::{Diagnostic, ErrorKind};

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Error returned by [`link`](crate::link).
///
/// Wraps one or more diagnostics. In fail-fast mode there is exactly one
/// error; in batch mode every error and warning collected is kept.
#[derive(Debug)]
pub struct LinkError {
    diagnostics: Vec<Diagnostic>,
}

impl LinkError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity().fails_unit())
    }

    /// Kind of the first error.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.errors().find_map(Diagnostic::kind)
    }

    /// Returns `true` if any error has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors().any(|d| d.kind() == Some(kind))
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.diagnostics.first() {
            write!(f, "{}", first)?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for LinkError {}

impl From<Diagnostic> for LinkError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for LinkError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}
