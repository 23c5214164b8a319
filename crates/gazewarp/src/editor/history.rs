//! Snapshot-based undo stack.

use crate::correspondence::Correspondences;

/// Undo history of full correspondence snapshots, bounded only by memory.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    snapshots: Vec<Correspondences>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Correspondences) {
        self.snapshots.push(snapshot);
    }

    /// Most recent snapshot, or `None` when there is nothing to undo.
    pub fn pop(&mut self) -> Option<Correspondences> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::CorrespondencePair;

    #[test]
    fn pops_in_lifo_order_and_underflows_to_none() {
        let mut h = EditHistory::new();
        let mut c = Correspondences::new();
        h.push(c.clone());
        c.push(CorrespondencePair::anchored([1.0, 1.0]));
        h.push(c.clone());

        assert_eq!(h.len(), 2);
        assert_eq!(h.pop().unwrap().len(), 1);
        assert_eq!(h.pop().unwrap().len(), 0);
        assert!(h.pop().is_none());
        assert!(h.is_empty());
    }
}
