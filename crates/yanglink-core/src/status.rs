//! Resolution status of cross-references.

use std::fmt;

/// How far a reference has been linked.
///
/// Transitions are monotonic: `Unresolved → IntraFileResolved → Resolved`.
/// [`ResolutionStatus::advance`] refuses to move backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolutionStatus {
    /// Nothing has been linked yet.
    #[default]
    Unresolved,
    /// Everything reachable inside the defining file is linked; the rest
    /// waits for the inter-file pass.
    IntraFileResolved,
    /// Fully linked.
    Resolved,
}

impl ResolutionStatus {
    pub fn is_resolved(self) -> bool {
        self == Self::Resolved
    }

    /// Moves to `next` if it is not an earlier status. Returns `true` when
    /// the status changed.
    pub fn advance(&mut self, next: ResolutionStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unresolved => "unresolved",
            Self::IntraFileResolved => "intra-file resolved",
            Self::Resolved => "resolved",
        };
        f.write_str(text)
    }
}
