//! Source locations carried by schema nodes for diagnostics.

use std::fmt;

use crate::identifier::Id;

/// File, line and column of a schema construct.
///
/// Lines and columns are 1-based; a zero line means the location is unknown
/// (for example, nodes synthesized by tests or by the engine itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Id,
    line: u32,
    column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<Id>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A location in `file` with unknown line and column.
    pub fn in_file(file: impl Into<Id>) -> Self {
        Self::new(file, 0, 0)
    }

    pub fn file(&self) -> Id {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::in_file("<unknown>")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        } else {
            write!(f, "{}", self.file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_known() {
        let loc = SourceLocation::new("a.yang", 12, 5);
        assert_eq!(loc.to_string(), "a.yang:12:5");
        assert!(loc.is_known());
    }

    #[test]
    fn test_display_unknown() {
        let loc = SourceLocation::in_file("b.yang");
        assert_eq!(loc.to_string(), "b.yang");
        assert!(!loc.is_known());
    }
}
