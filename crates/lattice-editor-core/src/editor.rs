//! The editor instance: one open document's tree, caret, selection,
//! history, and transport.
//!
//! Gestures mutate the tree through its primitives, record the matching
//! forward/inverse operation pair, and commit it here. Undo and redo replay
//! recorded pairs through [`BlockTree::apply`] and resubmit them, keeping
//! the remote store in step with the local model.

use tracing::debug;

use crate::block::{BlockData, BlockTree};
use crate::caret::{self, Caret};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::operation::{Operation, OperationPair};
use crate::transaction::{History, Transport};

pub struct Editor<T: Transport> {
    pub tree: BlockTree,
    pub caret: Option<Caret>,
    /// Block-level multi-selection, document order.
    pub selected: Vec<BlockId>,
    pub config: EditorConfig,
    /// The block the view is rooted at; retargeted to its parent when a
    /// gesture removes it.
    pub block_id: BlockId,
    pub transport: T,
    history: History,
}

impl<T: Transport> Editor<T> {
    pub fn new(tree: BlockTree, config: EditorConfig, transport: T) -> Self {
        let block_id = tree.root().clone();
        Self {
            tree,
            caret: None,
            selected: Vec::new(),
            config,
            block_id,
            transport,
            history: History::new(),
        }
    }

    pub fn snapshot(&self, id: &str) -> Result<BlockData, EditorError> {
        self.tree
            .snapshot(id)
            .ok_or_else(|| EditorError::UnknownBlock(id.into()))
    }

    /// Commit a gesture: record the pair and submit the forward list. The
    /// tree has already been mutated by the caller; this is bookkeeping and
    /// remote sync.
    pub fn transaction(
        &mut self,
        do_operations: Vec<Operation>,
        undo_operations: Vec<Operation>,
    ) -> Result<(), EditorError> {
        debug!(
            forward = do_operations.len(),
            inverse = undo_operations.len(),
            "commit"
        );
        let pair = OperationPair::new(do_operations, undo_operations);
        self.history.push(pair.clone());
        self.transport.transact(&pair.do_operations)
    }

    /// Single-block wholesale rewrite, already applied by the caller.
    pub fn update_transaction(
        &mut self,
        id: &BlockId,
        new_data: BlockData,
        old_data: BlockData,
    ) -> Result<(), EditorError> {
        self.transaction(
            vec![Operation::update(id.clone(), new_data)],
            vec![Operation::update(id.clone(), old_data)],
        )
    }

    /// Replay the most recent pair's inverse, in its stored order, and
    /// resubmit it. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(pair) = self.history.pop_undo() else {
            return Ok(false);
        };
        debug!(ops = pair.undo_operations.len(), "undo");
        for op in &pair.undo_operations {
            self.tree.apply(op)?;
        }
        self.transport.transact(&pair.undo_operations)?;
        self.history.push_redo(pair);
        self.reresolve_caret();
        Ok(true)
    }

    /// Mirror of [`Editor::undo`]: replay the forward list in array order.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(pair) = self.history.pop_redo() else {
            return Ok(false);
        };
        debug!(ops = pair.do_operations.len(), "redo");
        for op in &pair.do_operations {
            self.tree.apply(op)?;
        }
        self.transport.transact(&pair.do_operations)?;
        self.history.push_undone(pair);
        self.reresolve_caret();
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn reresolve_caret(&mut self) {
        if let Some(c) = &self.caret {
            self.caret = Some(caret::restore_caret(&self.tree, c));
        }
    }
}
