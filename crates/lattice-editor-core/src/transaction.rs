//! Transaction bookkeeping: transport seam and undo/redo history.

use tracing::debug;

use crate::error::EditorError;
use crate::operation::{Operation, OperationPair};

/// Maximum retained undo steps; the oldest pair falls off first.
pub const SIZE_UNDO: usize = 64;

/// The remote store boundary. Submission is fire-and-forget from the
/// gesture's point of view; implementations may queue.
pub trait Transport {
    fn transact(&mut self, operations: &[Operation]) -> Result<(), EditorError>;
}

/// Transport that drops everything, for detached documents.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn transact(&mut self, _operations: &[Operation]) -> Result<(), EditorError> {
        Ok(())
    }
}

/// Transport that records every submission in order. Used by tests and by
/// embedders that batch uploads themselves.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub submitted: Vec<Vec<Operation>>,
}

impl Transport for RecordingTransport {
    fn transact(&mut self, operations: &[Operation]) -> Result<(), EditorError> {
        self.submitted.push(operations.to_vec());
        Ok(())
    }
}

/// Undo/redo stacks of committed operation pairs.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<OperationPair>,
    redo_stack: Vec<OperationPair>,
    max_steps: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: SIZE_UNDO,
        }
    }

    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    /// Record a committed pair. Any redo state is invalidated.
    pub fn push(&mut self, pair: OperationPair) {
        self.redo_stack.clear();
        self.undo_stack.push(pair);
        if self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
        debug!(depth = self.undo_stack.len(), "transaction recorded");
    }

    pub fn pop_undo(&mut self) -> Option<OperationPair> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<OperationPair> {
        self.redo_stack.pop()
    }

    /// Park a consumed undo pair for redo, without touching the undo stack.
    pub fn push_redo(&mut self, pair: OperationPair) {
        self.redo_stack.push(pair);
    }

    /// Re-park a redone pair on the undo stack, keeping redo intact.
    pub fn push_undone(&mut self, pair: OperationPair) {
        self.undo_stack.push(pair);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;

    fn pair(n: usize) -> OperationPair {
        OperationPair::new(
            vec![Operation::delete(format!("id-{n}"))],
            vec![Operation::delete(format!("undo-{n}"))],
        )
    }

    #[test]
    fn max_steps_drops_oldest() {
        let mut h = History::with_max_steps(2);
        h.push(pair(1));
        h.push(pair(2));
        h.push(pair(3));
        assert_eq!(h.pop_undo().unwrap().do_operations[0].id, "id-3");
        assert_eq!(h.pop_undo().unwrap().do_operations[0].id, "id-2");
        assert!(h.pop_undo().is_none());
    }

    #[test]
    fn new_transaction_clears_redo() {
        let mut h = History::new();
        h.push(pair(1));
        let undone = h.pop_undo().unwrap();
        h.push_redo(undone);
        assert!(h.can_redo());
        h.push(pair(2));
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_redo_round_trip_keeps_pair() {
        let mut h = History::new();
        h.push(pair(1));
        let undone = h.pop_undo().unwrap();
        h.push_redo(undone.clone());
        let redone = h.pop_redo().unwrap();
        assert_eq!(redone, undone);
        h.push_undone(redone);
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }
}
