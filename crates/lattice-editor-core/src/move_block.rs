//! Moving blocks past their siblings.
//!
//! The moved unit is the current multi-selection, or the top "alone" block
//! around the caret (a folded ancestor wins). Plain swaps are a single move
//! operation on the displaced sibling; list items crossing a sub-list
//! boundary are committed as a wholesale rewrite of the outer list.

use tracing::debug;

use crate::block::{Block, BlockKind, BlockSubtype};
use crate::editor::Editor;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::list;
use crate::navigate;
use crate::operation::{Anchor, Operation};
use crate::transaction::Transport;

fn resolve_sources<T: Transport>(ed: &Editor<T>, block: &BlockId) -> Vec<BlockId> {
    if !ed.selected.is_empty() {
        return ed.selected.clone();
    }
    let mut source = navigate::top_alone_block(&ed.tree, block);
    if let Some(folded) = navigate::folded_ancestor(&ed.tree, &source) {
        source = folded;
    }
    // The first content block of an item stands for the whole item.
    if let Some(parent) = ed.tree.parent(&source).cloned() {
        if ed
            .tree
            .get(&parent)
            .map(|b| b.kind == BlockKind::ListItem)
            .unwrap_or(false)
            && ed.tree.index_in_parent(&source) == Some(0)
        {
            source = navigate::top_alone_block(&ed.tree, &parent);
        }
    }
    // A sub-list standing alone inside an item stands for its first item.
    if ed
        .tree
        .get(&source)
        .map(|b| b.kind == BlockKind::List)
        .unwrap_or(false)
        && ed
            .tree
            .parent(&source)
            .and_then(|p| ed.tree.get(p))
            .map(|b| b.kind == BlockKind::ListItem)
            .unwrap_or(false)
    {
        if let Some(head) = ed.tree.first_child(&source) {
            source = head;
        }
    }
    vec![source]
}

fn first_list_child(ed: &Editor<impl Transport>, id: &BlockId) -> Option<BlockId> {
    ed.tree
        .children(id)
        .iter()
        .find(|c| {
            ed.tree
                .get(c)
                .map(|b| b.kind == BlockKind::List)
                .unwrap_or(false)
        })
        .cloned()
}

fn is_kind(ed: &Editor<impl Transport>, id: &BlockId, kind: BlockKind) -> bool {
    ed.tree.get(id).map(|b| b.kind == kind).unwrap_or(false)
}

/// Swap the source run with its previous sibling. The first item of a
/// nested sub-list instead climbs to the end of the previous uncle item's
/// sub-list, creating one there when missing. Returns false when there is
/// nowhere to go.
pub fn move_to_up<T: Transport>(ed: &mut Editor<T>, block: &BlockId) -> Result<bool, EditorError> {
    let sources = resolve_sources(ed, block);
    let Some(first) = sources.first().cloned() else {
        return Ok(false);
    };
    let last = sources.last().cloned().unwrap_or_else(|| first.clone());

    if is_kind(ed, &first, BlockKind::ListItem) && ed.tree.previous_sibling(&first).is_none() {
        return move_first_item_up(ed, &sources, &first);
    }

    let Some(prev) = ed.tree.previous_sibling(&first) else {
        return Ok(false);
    };
    let ordered_item = is_kind(ed, &first, BlockKind::ListItem)
        && ed.tree.get(&first).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered);
    if ordered_item {
        let list = ed
            .tree
            .parent(&first)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlock(first.clone()))?;
        let before = ed.snapshot(&list)?;
        ed.tree.move_block(&prev, &Anchor::After(last.clone()))?;
        list::update_list_order(&mut ed.tree, &list, Some(1));
        let after = ed.snapshot(&list)?;
        debug!(count = sources.len(), "move up (ordered items)");
        ed.update_transaction(&list, after, before)?;
    } else {
        let parent = ed
            .tree
            .parent(&prev)
            .cloned()
            .unwrap_or_else(|| ed.tree.root().clone());
        let prev_prev = ed.tree.previous_sibling(&prev);
        ed.tree.move_block(&prev, &Anchor::After(last.clone()))?;
        debug!(count = sources.len(), "move up");
        ed.transaction(
            vec![Operation::mov(prev.clone()).after(last.clone())],
            vec![Operation::mov(prev.clone()).at_slot(prev_prev.as_ref(), &parent)],
        )?;
    }
    Ok(true)
}

/// Mirror of [`move_to_up`]: the last item of a nested sub-list descends to
/// the front of the next uncle item's sub-list.
pub fn move_to_down<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
) -> Result<bool, EditorError> {
    let sources = resolve_sources(ed, block);
    let Some(first) = sources.first().cloned() else {
        return Ok(false);
    };
    let last = sources.last().cloned().unwrap_or_else(|| first.clone());

    if is_kind(ed, &last, BlockKind::ListItem) && ed.tree.next_sibling(&last).is_none() {
        return move_last_item_down(ed, &sources, &first, &last);
    }

    let Some(next) = ed.tree.next_sibling(&last) else {
        return Ok(false);
    };
    let ordered_item = is_kind(ed, &next, BlockKind::ListItem)
        && ed.tree.get(&next).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered);
    if ordered_item {
        let list = ed
            .tree
            .parent(&next)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlock(next.clone()))?;
        let before = ed.snapshot(&list)?;
        ed.tree.move_block(&next, &Anchor::Before(first.clone()))?;
        list::update_list_order(&mut ed.tree, &list, Some(1));
        let after = ed.snapshot(&list)?;
        debug!(count = sources.len(), "move down (ordered items)");
        ed.update_transaction(&list, after, before)?;
    } else {
        let parent = ed
            .tree
            .parent(&next)
            .cloned()
            .unwrap_or_else(|| ed.tree.root().clone());
        let first_prev = ed.tree.previous_sibling(&first);
        ed.tree.move_block(&next, &Anchor::Before(first.clone()))?;
        debug!(count = sources.len(), "move down");
        ed.transaction(
            vec![Operation::mov(next.clone()).at_slot(first_prev.as_ref(), &parent)],
            vec![Operation::mov(next.clone()).after(last.clone())],
        )?;
    }
    Ok(true)
}

fn move_first_item_up<T: Transport>(
    ed: &mut Editor<T>,
    sources: &[BlockId],
    first: &BlockId,
) -> Result<bool, EditorError> {
    let list = ed
        .tree
        .parent(first)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(first.clone()))?;
    let Some(container) = ed.tree.parent(&list).cloned() else {
        return Ok(false);
    };
    if !is_kind(ed, &container, BlockKind::ListItem) {
        return Ok(false);
    }
    let Some(uncle) = ed.tree.previous_sibling(&container) else {
        return Ok(false);
    };
    if !is_kind(ed, &uncle, BlockKind::ListItem) {
        return Ok(false);
    }
    let outer = ed
        .tree
        .parent(&container)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(container.clone()))?;
    let before = ed.snapshot(&outer)?;

    let dest = match first_list_child(ed, &uncle) {
        Some(d) => d,
        None => {
            let subtype = ed
                .tree
                .get(first)
                .and_then(|b| b.subtype)
                .unwrap_or(BlockSubtype::Unordered);
            ed.tree
                .insert_block(Block::list(subtype), &Anchor::LastChildOf(uncle.clone()))?
        }
    };
    let mut anchor = match ed.tree.last_child(&dest) {
        Some(last) => Anchor::After(last),
        None => Anchor::LastChildOf(dest.clone()),
    };
    for src in sources {
        ed.tree.move_block(src, &anchor)?;
        anchor = Anchor::After(src.clone());
    }
    settle_source_list(ed, &list)?;
    if ed.tree.get(&dest).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
        list::update_list_order(&mut ed.tree, &dest, None);
    }
    let after = ed.snapshot(&outer)?;
    debug!("move up across sub-list boundary");
    ed.update_transaction(&outer, after, before)?;
    Ok(true)
}

fn move_last_item_down<T: Transport>(
    ed: &mut Editor<T>,
    sources: &[BlockId],
    first: &BlockId,
    last: &BlockId,
) -> Result<bool, EditorError> {
    let list = ed
        .tree
        .parent(last)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(last.clone()))?;
    let Some(container) = ed.tree.parent(&list).cloned() else {
        return Ok(false);
    };
    if !is_kind(ed, &container, BlockKind::ListItem) {
        return Ok(false);
    }
    let Some(uncle) = ed.tree.next_sibling(&container) else {
        return Ok(false);
    };
    if !is_kind(ed, &uncle, BlockKind::ListItem) {
        return Ok(false);
    }
    let outer = ed
        .tree
        .parent(&container)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(container.clone()))?;
    let before = ed.snapshot(&outer)?;

    let dest = match first_list_child(ed, &uncle) {
        Some(d) => d,
        None => {
            let subtype = ed
                .tree
                .get(first)
                .and_then(|b| b.subtype)
                .unwrap_or(BlockSubtype::Unordered);
            ed.tree
                .insert_block(Block::list(subtype), &Anchor::LastChildOf(uncle.clone()))?
        }
    };
    // Sources become the leading items of the destination list.
    let mut anchor = match ed.tree.first_child(&dest) {
        Some(head) => Anchor::Before(head),
        None => Anchor::LastChildOf(dest.clone()),
    };
    for src in sources {
        ed.tree.move_block(src, &anchor)?;
        anchor = Anchor::After(src.clone());
    }
    settle_source_list(ed, &list)?;
    if ed.tree.get(&dest).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
        list::update_list_order(&mut ed.tree, &dest, Some(1));
    }
    let after = ed.snapshot(&outer)?;
    debug!("move down across sub-list boundary");
    ed.update_transaction(&outer, after, before)?;
    Ok(true)
}

/// After items leave a list: drop it when emptied, renumber when ordered.
fn settle_source_list<T: Transport>(
    ed: &mut Editor<T>,
    list: &BlockId,
) -> Result<(), EditorError> {
    if ed.tree.children(list).is_empty() {
        ed.tree.remove_subtree(list);
    } else if ed.tree.get(list).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
        list::update_list_order(&mut ed.tree, list, Some(1));
    }
    Ok(())
}
