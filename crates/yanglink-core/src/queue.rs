//! Per-file resolution queues.
//!
//! Each module and submodule root owns one [`ResolutionQueues`] value. The
//! registration pass fills it, and the scheduler drains it one kind at a
//! time in [`QueueKind::ORDER`].

use std::fmt;

use crate::arena::NodeId;

/// The kinds of pending work, one queue each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    IfFeature,
    IdentityBase,
    Type,
    Uses,
    Augment,
    Leafref,
    Deviation,
}

impl QueueKind {
    /// Drain order within one pass. Deviations are not part of the fixpoint.
    pub const ORDER: [QueueKind; 6] = [
        Self::IfFeature,
        Self::IdentityBase,
        Self::Type,
        Self::Uses,
        Self::Augment,
        Self::Leafref,
    ];
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IfFeature => "if-feature",
            Self::IdentityBase => "identity base",
            Self::Type => "type",
            Self::Uses => "uses",
            Self::Augment => "augment",
            Self::Leafref => "leafref",
            Self::Deviation => "deviation",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionQueues {
    if_features: Vec<NodeId>,
    identity_bases: Vec<NodeId>,
    types: Vec<NodeId>,
    uses: Vec<NodeId>,
    augments: Vec<NodeId>,
    leafrefs: Vec<NodeId>,
    deviations: Vec<NodeId>,
}

impl ResolutionQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, kind: QueueKind) -> &Vec<NodeId> {
        match kind {
            QueueKind::IfFeature => &self.if_features,
            QueueKind::IdentityBase => &self.identity_bases,
            QueueKind::Type => &self.types,
            QueueKind::Uses => &self.uses,
            QueueKind::Augment => &self.augments,
            QueueKind::Leafref => &self.leafrefs,
            QueueKind::Deviation => &self.deviations,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut Vec<NodeId> {
        match kind {
            QueueKind::IfFeature => &mut self.if_features,
            QueueKind::IdentityBase => &mut self.identity_bases,
            QueueKind::Type => &mut self.types,
            QueueKind::Uses => &mut self.uses,
            QueueKind::Augment => &mut self.augments,
            QueueKind::Leafref => &mut self.leafrefs,
            QueueKind::Deviation => &mut self.deviations,
        }
    }

    /// Enqueues `node`, ignoring duplicates.
    pub fn push(&mut self, kind: QueueKind, node: NodeId) {
        let queue = self.queue_mut(kind);
        if !queue.contains(&node) {
            queue.push(node);
        }
    }

    pub fn get(&self, kind: QueueKind) -> &[NodeId] {
        self.queue(kind)
    }

    /// Removes and returns every entry of one queue.
    pub fn take(&mut self, kind: QueueKind) -> Vec<NodeId> {
        std::mem::take(self.queue_mut(kind))
    }

    /// Appends every entry of `other` to the matching queue.
    pub fn merge(&mut self, mut other: ResolutionQueues) {
        for kind in QueueKind::ORDER.into_iter().chain([QueueKind::Deviation]) {
            for node in other.take(kind) {
                self.push(kind, node);
            }
        }
    }

    /// Number of entries across all queues.
    pub fn len(&self) -> usize {
        QueueKind::ORDER
            .into_iter()
            .chain([QueueKind::Deviation])
            .map(|kind| self.queue(kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn test_push_ignores_duplicates() {
        let mut arena = Arena::new();
        let a = arena.insert(());
        let mut queues = ResolutionQueues::new();
        queues.push(QueueKind::Type, a);
        queues.push(QueueKind::Type, a);
        queues.push(QueueKind::Uses, a);

        assert_eq!(queues.get(QueueKind::Type), &[a]);
        assert_eq!(queues.len(), 2);
    }

    #[test]
    fn test_take_and_merge() {
        let mut arena = Arena::new();
        let a = arena.insert(());
        let b = arena.insert(());
        let mut queues = ResolutionQueues::new();
        queues.push(QueueKind::Leafref, a);

        let drained = queues.take(QueueKind::Leafref);
        assert_eq!(drained, vec![a]);
        assert!(queues.is_empty());

        let mut pending = ResolutionQueues::new();
        pending.push(QueueKind::Leafref, b);
        pending.push(QueueKind::Deviation, a);
        queues.merge(pending);
        assert_eq!(queues.get(QueueKind::Leafref), &[b]);
        assert_eq!(queues.get(QueueKind::Deviation), &[a]);
    }
}
