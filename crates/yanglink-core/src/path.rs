//! Schema node paths used by augments, deviations and leafrefs.
//!
//! Supported forms:
//! - absolute: `/p:a/p:b`
//! - descendant (uses-augment targets): `a/b`
//! - relative with parent steps (leafref paths): `../../a/b`
//!
//! Predicates (`[name = current()/../x]`) are accepted and dropped; they do
//! not take part in selecting the target schema node.

use std::fmt;

use thiserror::Error;

use crate::identifier::QualifiedName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("empty step in path `{0}`")]
    EmptyStep(String),

    #[error("unbalanced predicate brackets in path `{0}`")]
    UnbalancedPredicate(String),

    #[error("`..` after a named step in path `{0}`")]
    MisplacedParentStep(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    Parent,
    Child(QualifiedName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPath {
    absolute: bool,
    steps: Vec<PathStep>,
}

impl SchemaPath {
    /// Parses a path.
    ///
    /// ```
    /// use yanglink_core::path::{PathStep, SchemaPath};
    ///
    /// let path = SchemaPath::parse("../if:name[x = current()]").unwrap();
    /// assert!(!path.is_absolute());
    /// assert_eq!(path.steps().len(), 2);
    /// assert_eq!(path.steps()[0], PathStep::Parent);
    /// ```
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let stripped = strip_predicates(text)?;
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let absolute = trimmed.starts_with('/');
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut steps = Vec::new();
        let mut seen_child = false;
        for segment in body.split('/') {
            match segment.trim() {
                "" => return Err(PathError::EmptyStep(text.to_string())),
                ".." if absolute || seen_child => {
                    return Err(PathError::MisplacedParentStep(text.to_string()));
                }
                ".." => steps.push(PathStep::Parent),
                name => {
                    seen_child = true;
                    steps.push(PathStep::Child(QualifiedName::parse(name)));
                }
            }
        }

        Ok(Self { absolute, steps })
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Named steps only, in order.
    pub fn names(&self) -> impl Iterator<Item = QualifiedName> + '_ {
        self.steps.iter().filter_map(|step| match step {
            PathStep::Child(name) => Some(*name),
            PathStep::Parent => None,
        })
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            match step {
                PathStep::Parent => f.write_str("..")?,
                PathStep::Child(name) => write!(f, "{name}")?,
            }
        }
        Ok(())
    }
}

fn strip_predicates(text: &str) -> Result<String, PathError> {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| PathError::UnbalancedPredicate(text.to_string()))?;
            }
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    if depth != 0 {
        return Err(PathError::UnbalancedPredicate(text.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let path = SchemaPath::parse("/a:top/a:inner").unwrap();
        assert!(path.is_absolute());
        let names: Vec<String> = path.names().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["a:top", "a:inner"]);
        assert_eq!(path.to_string(), "/a:top/a:inner");
    }

    #[test]
    fn test_descendant_path() {
        let path = SchemaPath::parse("inner/leaf").unwrap();
        assert!(!path.is_absolute());
        assert_eq!(path.steps().len(), 2);
    }

    #[test]
    fn test_predicates_are_dropped() {
        let path = SchemaPath::parse("/ifs/if[name = current()/../n]/mtu").unwrap();
        assert_eq!(path.to_string(), "/ifs/if/mtu");
    }

    #[test]
    fn test_errors() {
        assert_eq!(SchemaPath::parse(""), Err(PathError::Empty));
        assert!(matches!(SchemaPath::parse("/a//b"), Err(PathError::EmptyStep(_))));
        assert!(matches!(SchemaPath::parse("a[x"), Err(PathError::UnbalancedPredicate(_))));
        assert!(matches!(SchemaPath::parse("a]"), Err(PathError::UnbalancedPredicate(_))));
        assert!(matches!(
            SchemaPath::parse("a/../b"),
            Err(PathError::MisplacedParentStep(_))
        ));
        assert!(matches!(
            SchemaPath::parse("/../b"),
            Err(PathError::MisplacedParentStep(_))
        ));
    }
}
