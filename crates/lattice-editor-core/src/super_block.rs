//! Super-blocks: merging sibling blocks into a row/column container and
//! dissolving one back into its flat children.

use tracing::debug;

use crate::block::{BlockData, BlockKind, SbLayout};
use crate::caret;
use crate::editor::Editor;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::operation::{Anchor, Operation};
use crate::transaction::Transport;

/// Wrap a contiguous sibling run in a fresh super-block. The container is
/// inserted in the first block's slot and the blocks move inside in order.
pub fn merge_to_super_block<T: Transport>(
    ed: &mut Editor<T>,
    blocks: &[BlockId],
    layout: SbLayout,
) -> Result<BlockId, EditorError> {
    let Some(first) = blocks.first().cloned() else {
        return Err(EditorError::EmptySelection);
    };
    let prev = ed.tree.previous_sibling(&first);
    let parent = ed
        .tree
        .parent(&first)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());

    let mut sb = BlockData::new(BlockKind::SuperBlock);
    sb.layout = Some(layout);
    let sb_id = sb.id.clone();
    let mut do_ops = vec![Operation::insert(sb.clone()).at_slot(prev.as_ref(), &parent)];
    let mut undo_ops = Vec::new();
    ed.tree.insert_data(&sb, &Anchor::Before(first.clone()))?;

    let mut thread: Option<BlockId> = None;
    for block in blocks {
        ed.selected.retain(|s| s != block);
        undo_ops.push(
            Operation::mov(block.clone()).at_slot(thread.as_ref().or(prev.as_ref()), &parent),
        );
        let mv = match &thread {
            Some(t) => Operation::mov(block.clone()).after(t.clone()).under(sb_id.clone()),
            None => Operation::mov(block.clone()).under(sb_id.clone()),
        };
        do_ops.push(mv);
        ed.tree
            .move_block(block, &Anchor::LastChildOf(sb_id.clone()))?;
        thread = Some(block.clone());
    }
    undo_ops.push(Operation::delete(sb_id.clone()));
    debug!(count = blocks.len(), layout = ?layout, "merge into super block");
    ed.transaction(do_ops, undo_ops)?;
    ed.caret = caret::focus_block(&ed.tree, &first, true);
    Ok(sb_id)
}

/// Dissolve a super-block back into its flat children, in place. Embedded
/// query blocks in the freed subtrees lose their breadcrumb context, so
/// their cached render state is cleared.
pub fn cancel_super_block<T: Transport>(
    ed: &mut Editor<T>,
    sb: &BlockId,
) -> Result<(), EditorError> {
    let (do_ops, undo_ops) = cancel_super_block_ops(ed, sb)?;
    debug!(id = %sb, "cancel super block");
    ed.transaction(do_ops, undo_ops)
}

/// The mutation and op pair of [`cancel_super_block`] without the commit.
/// Deletion gestures that leave a super-block with a single child fold
/// these ops into their own transaction.
pub(crate) fn cancel_super_block_ops<T: Transport>(
    ed: &mut Editor<T>,
    sb: &BlockId,
) -> Result<(Vec<Operation>, Vec<Operation>), EditorError> {
    let prev = ed.tree.previous_sibling(sb);
    let parent = ed
        .tree
        .parent(sb)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    ed.selected.retain(|s| s != sb);
    let mut shell = ed.snapshot(sb)?;
    shell.children.clear();

    let mut do_ops = Vec::new();
    let mut undo_ops = vec![Operation::insert(shell).at_slot(prev.as_ref(), &parent)];
    let children = ed.tree.children(sb).to_vec();
    let mut thread = prev.clone();
    for (i, child) in children.iter().enumerate() {
        do_ops.push(Operation::mov(child.clone()).at_slot(thread.as_ref(), &parent));
        let undo = if i == 0 {
            Operation::mov(child.clone()).under(sb.clone())
        } else {
            Operation::mov(child.clone())
                .after(children[i - 1].clone())
                .under(sb.clone())
        };
        undo_ops.push(undo);
        let anchor = match &thread {
            Some(t) => Anchor::After(t.clone()),
            None => Anchor::Before(sb.clone()),
        };
        ed.tree.move_block(child, &anchor)?;
        thread = Some(child.clone());
    }
    do_ops.push(Operation::delete(sb.clone()));
    ed.tree.remove_subtree(sb);

    for child in &children {
        for id in ed.tree.preorder(child) {
            if let Some(b) = ed.tree.get_mut(&id) {
                if b.kind == BlockKind::QueryEmbed {
                    b.render_cached = false;
                }
            }
        }
    }
    Ok((do_ops, undo_ops))
}
