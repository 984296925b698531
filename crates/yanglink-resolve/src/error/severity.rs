//! How much a diagnostic weighs on the module unit it was raised in.

use std::fmt;

/// Ordered so that `Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Reported alongside a successful link, e.g. a unit skipped in batch
    /// mode because one of its imports failed.
    Warning,

    /// The unit does not link.
    Error,
}

impl Severity {
    /// Whether a diagnostic of this severity keeps its module unit out of
    /// the linked graph.
    pub fn fails_unit(self) -> bool {
        self == Severity::Error
    }

    /// The `log` level diagnostics of this severity are echoed at.
    pub fn log_level(self) -> log::Level {
        match self {
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
