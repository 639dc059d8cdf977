//! List structure engine: renumbering, item generation, indent, outdent,
//! and splitting a list around non-list content.
//!
//! Every structural gesture here mutates the tree and records a matched
//! forward/inverse operation pair. Ordered lists are renumbered inside the
//! same gesture, and the pair always inverts exactly: replaying the inverse
//! restores the subtree byte for byte.

use smol_str::SmolStr;
use tracing::debug;

use crate::block::{Block, BlockData, BlockKind, BlockSubtype, BlockTree};
use crate::config::OutdentPolicy;
use crate::editor::Editor;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::operation::{Anchor, Operation};
use crate::transaction::Transport;

/// The integer value of an ordered marker; a malformed marker reads as 1
/// and is rewritten on the next renumber.
pub fn marker_index(marker: &str) -> i64 {
    let digits: String = marker.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(1)
}

fn ordinal_marker(n: i64) -> SmolStr {
    smol_str::format_smolstr!("{n}.")
}

/// Walk an ordered list's items and assign strictly increasing markers.
/// `start` overrides the first marker; without it the first item's current
/// marker anchors the sequence. No-op for unordered and task lists.
/// Idempotent for a fixed `start`.
pub fn update_list_order(tree: &mut BlockTree, list: &str, start: Option<i64>) {
    let ordered = tree
        .get(list)
        .map(|b| b.kind == BlockKind::List && b.subtype == Some(BlockSubtype::Ordered))
        .unwrap_or(false);
    if !ordered {
        return;
    }
    let children = tree.children(list).to_vec();
    let mut index = 0i64;
    let mut first = true;
    for item in children {
        let Some(block) = tree.get_mut(&item) else {
            continue;
        };
        if block.kind != BlockKind::ListItem {
            continue;
        }
        if first {
            first = false;
            match start {
                Some(s) => {
                    index = s;
                    block.marker = ordinal_marker(index);
                }
                None => index = marker_index(&block.marker),
            }
        } else {
            index += 1;
            block.marker = ordinal_marker(index);
        }
    }
}

/// Renumber and emit an update pair for every item whose snapshot changed.
/// Callers place the pairs so the undo updates replay after the structural
/// move-backs.
pub(crate) fn renumber_with_ops(
    tree: &mut BlockTree,
    list: &BlockId,
    start: Option<i64>,
    do_ops: &mut Vec<Operation>,
    undo_ops: &mut Vec<Operation>,
) {
    let before: Vec<(BlockId, Option<BlockData>)> = tree
        .children(list)
        .to_vec()
        .into_iter()
        .map(|c| (c.clone(), tree.snapshot(&c)))
        .collect();
    update_list_order(tree, list, start);
    for (id, old) in before {
        let (Some(old), Some(new)) = (old, tree.snapshot(&id)) else {
            continue;
        };
        if old != new {
            undo_ops.push(Operation::update(id.clone(), old));
            do_ops.push(Operation::update(id, new));
        }
    }
}

/// Build a fresh list item matching a reference item's subtype, holding one
/// empty paragraph. For ordered items the marker is
/// `reference.marker + offset + 1`. The reference is not touched.
pub fn gen_list_item(reference: &Block, offset: i64) -> BlockData {
    let subtype = reference.subtype.unwrap_or(BlockSubtype::Unordered);
    let mut li = BlockData::new(BlockKind::ListItem);
    li.subtype = Some(subtype);
    li.marker = match subtype {
        BlockSubtype::Ordered => ordinal_marker(marker_index(&reference.marker) + offset + 1),
        _ => SmolStr::new("*"),
    };
    li.children = vec![BlockData::paragraph("")];
    li
}

fn convert_item_subtype(tree: &mut BlockTree, id: &str, subtype: BlockSubtype) {
    if let Some(b) = tree.get_mut(id) {
        b.subtype = Some(subtype);
        match subtype {
            BlockSubtype::Ordered => b.marker = SmolStr::new("1."),
            _ => {
                b.marker = SmolStr::new("*");
                if subtype != BlockSubtype::Task {
                    b.checked = false;
                }
            }
        }
    }
}

fn bare_list_data(block: &Block) -> BlockData {
    BlockData {
        id: block.id.clone(),
        kind: block.kind,
        subtype: block.subtype,
        marker: block.marker.clone(),
        layout: block.layout,
        folded: block.folded,
        checked: block.checked,
        content: block.content.clone(),
        updated: block.updated.clone(),
        children: Vec::new(),
    }
}

/// Move a contiguous run of sibling list items under the previous sibling
/// item: appended to its trailing sub-list when it has one, otherwise into a
/// freshly created sub-list. Items adopt the destination subtype; both lists
/// renumber. An item with no previous sibling cannot indent and the gesture
/// declines.
pub fn list_indent<T: Transport>(
    ed: &mut Editor<T>,
    items: &[BlockId],
) -> Result<(), EditorError> {
    let Some(first) = items.first() else {
        return Ok(());
    };
    // First item of a list has nowhere to indent into.
    let Some(previous) = ed.tree.previous_sibling(first) else {
        return Ok(());
    };
    let list = ed
        .tree
        .parent(&previous)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(previous.clone()))?;
    let top_level = ed.tree.parent(&list) == Some(ed.tree.root());
    let list_before = ed.snapshot(&list)?;
    for item in items {
        ed.selected.retain(|s| s != item);
    }

    let mut do_ops = Vec::new();
    let mut undo_ops = Vec::new();

    let trailing_sublist = ed
        .tree
        .last_child(&previous)
        .filter(|c| ed.tree.get(c).map(|b| b.kind == BlockKind::List).unwrap_or(false));

    if let Some(sublist) = trailing_sublist {
        // The previous item already ends in a sub-list; append to it.
        let sublist_before = ed.snapshot(&sublist)?;
        let subtype = ed
            .tree
            .get(&sublist)
            .and_then(|b| b.subtype)
            .unwrap_or(BlockSubtype::Unordered);
        let mut thread = ed.tree.last_child(&sublist);
        let mut touched: Vec<(BlockId, BlockData)> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            do_ops.push(Operation::mov(item.clone()).at_slot(thread.as_ref(), &sublist));
            let undo_prev = if i == 0 { previous.clone() } else { items[i - 1].clone() };
            undo_ops.push(Operation::mov(item.clone()).after(undo_prev));
            touched.push((item.clone(), ed.snapshot(item)?));
            let anchor = match &thread {
                Some(p) => Anchor::After(p.clone()),
                None => Anchor::LastChildOf(sublist.clone()),
            };
            ed.tree.move_block(item, &anchor)?;
            if ed.tree.get(item).and_then(|b| b.subtype) != Some(subtype) {
                convert_item_subtype(&mut ed.tree, item, subtype);
            }
            thread = Some(item.clone());
        }

        if subtype == BlockSubtype::Ordered {
            update_list_order(&mut ed.tree, &sublist, None);
        }
        // Restore converted/renumbered items on undo; the moves alone only
        // restore their position.
        for (id, old) in touched {
            if let Some(new) = ed.tree.snapshot(&id) {
                if new != old {
                    undo_ops.push(Operation::update(id.clone(), old));
                    do_ops.push(Operation::update(id, new));
                }
            }
        }
        if top_level {
            renumber_with_ops(&mut ed.tree, &list, None, &mut do_ops, &mut undo_ops);
            do_ops.push(Operation::update(sublist.clone(), ed.snapshot(&sublist)?));
            undo_ops.push(Operation::update(sublist.clone(), sublist_before));
            debug!(count = items.len(), "list indent into existing sub-list");
            return ed.transaction(do_ops, undo_ops);
        }
    } else {
        // No trailing sub-list: create one under the previous item.
        let previous_before = ed.snapshot(&previous)?;
        let subtype = ed
            .tree
            .get(first)
            .and_then(|b| b.subtype)
            .unwrap_or(BlockSubtype::Unordered);
        let new_list = Block::list(subtype);
        let new_list_id = new_list.id.clone();
        let last_content = ed.tree.last_child(&previous);
        do_ops.push(
            Operation::insert(bare_list_data(&new_list)).at_slot(last_content.as_ref(), &previous),
        );
        ed.tree
            .insert_block(new_list, &Anchor::LastChildOf(previous.clone()))?;

        let mut thread: Option<BlockId> = None;
        let mut touched: Vec<(BlockId, BlockData)> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let mv = match &thread {
                Some(p) => Operation::mov(item.clone()).under(new_list_id.clone()).after(p.clone()),
                None => Operation::mov(item.clone()).under(new_list_id.clone()),
            };
            do_ops.push(mv);
            let undo_prev = if i == 0 { previous.clone() } else { items[i - 1].clone() };
            undo_ops.push(Operation::mov(item.clone()).after(undo_prev));
            touched.push((item.clone(), ed.snapshot(item)?));
            let anchor = match &thread {
                Some(p) => Anchor::After(p.clone()),
                None => Anchor::LastChildOf(new_list_id.clone()),
            };
            ed.tree.move_block(item, &anchor)?;
            thread = Some(item.clone());
        }
        undo_ops.push(Operation::delete(new_list_id.clone()));

        if subtype == BlockSubtype::Ordered {
            update_list_order(&mut ed.tree, &new_list_id, Some(1));
        }
        for (id, old) in touched {
            if let Some(new) = ed.tree.snapshot(&id) {
                if new != old {
                    undo_ops.push(Operation::update(id.clone(), old));
                    do_ops.push(Operation::update(id, new));
                }
            }
        }
        if top_level {
            renumber_with_ops(&mut ed.tree, &list, None, &mut do_ops, &mut undo_ops);
            do_ops.push(Operation::update(previous.clone(), ed.snapshot(&previous)?));
            undo_ops.push(Operation::update(previous.clone(), previous_before));
            debug!(count = items.len(), "list indent into new sub-list");
            return ed.transaction(do_ops, undo_ops);
        }
    }

    // Nested lists are committed as one wholesale rewrite of the containing
    // list.
    if ed
        .tree
        .get(&list)
        .map(|b| b.subtype == Some(BlockSubtype::Ordered))
        .unwrap_or(false)
    {
        update_list_order(&mut ed.tree, &list, None);
    }
    let after = ed.snapshot(&list)?;
    debug!(count = items.len(), "list indent (nested)");
    ed.update_transaction(&list, after, list_before)
}

/// Promote a contiguous run of sibling list items one nesting level.
///
/// At the top level (the parent of the items' list is the document root, a
/// quote, or a super-block) the items' content blocks are hoisted to
/// siblings of the list; one level down the items become siblings of their
/// parent item. The `policy` decides what happens to following sibling
/// items: `Logical` leaves them in place, `Traditional` relocates them into
/// a sub-list under the last outdented item.
pub fn list_outdent<T: Transport>(
    ed: &mut Editor<T>,
    items: &[BlockId],
    policy: OutdentPolicy,
) -> Result<(), EditorError> {
    let Some(first) = items.first() else {
        return Ok(());
    };
    let Some(list) = ed.tree.parent(first).cloned() else {
        return Ok(());
    };
    // A zoomed-in list or list item is the view root; nothing to promote into.
    let Some(parent_li) = ed.tree.parent(&list).cloned() else {
        return Ok(());
    };
    if parent_li == ed.block_id
        && ed
            .tree
            .get(&parent_li)
            .map(|b| b.kind == BlockKind::ListItem)
            .unwrap_or(false)
    {
        return Ok(());
    }
    let last = items.last().cloned().unwrap_or_else(|| first.clone());
    for item in items {
        ed.selected.retain(|s| s != item);
    }
    let list_subtype = ed.tree.get(&list).and_then(|b| b.subtype);
    let start_index = if ed.tree.previous_sibling(first).is_none()
        && list_subtype == Some(BlockSubtype::Ordered)
    {
        ed.tree.get(first).map(|b| marker_index(&b.marker))
    } else {
        None
    };

    let parent_kind = ed.tree.get(&parent_li).map(|b| b.kind);
    let top_level = parent_li == *ed.tree.root()
        || matches!(parent_kind, Some(BlockKind::Blockquote) | Some(BlockKind::SuperBlock));

    if top_level {
        return outdent_top_level(ed, items, &list, &parent_li, &last, policy, start_index);
    }

    // A list item holding only a single-item list holding this item:
    // collapse the degenerate wrapper down to the item's raw content.
    if ed.tree.children(&list).len() == 1 && ed.tree.children(&parent_li).len() == 1 {
        let before = ed.snapshot(&parent_li)?;
        let children = ed.tree.children(first).to_vec();
        let mut prev = list.clone();
        for child in children {
            ed.tree.move_block(&child, &Anchor::After(prev))?;
            prev = child;
        }
        ed.tree.remove_subtree(&list);
        let after = ed.snapshot(&parent_li)?;
        debug!("list outdent: degenerate wrapper collapse");
        return ed.update_transaction(&parent_li, after, before);
    }

    outdent_nested(ed, items, &list, &parent_li, &last, policy, start_index)
}

fn outdent_top_level<T: Transport>(
    ed: &mut Editor<T>,
    items: &[BlockId],
    list: &BlockId,
    parent: &BlockId,
    last: &BlockId,
    policy: OutdentPolicy,
    start_index: Option<i64>,
) -> Result<(), EditorError> {
    let mut do_ops = Vec::new();
    let mut undo_ops = Vec::new();

    let next_item = ed.tree.next_sibling(last);
    let last_block = ed.tree.last_child(last);

    // Hoist every content block of every item to a sibling of the list.
    let mut thread = list.clone();
    for item in items {
        let children = ed.tree.children(item).to_vec();
        for (ci, child) in children.iter().enumerate() {
            do_ops.push(
                Operation::mov(child.clone())
                    .after(thread.clone())
                    .under(parent.clone()),
            );
            let undo = if ci == 0 {
                Operation::mov(child.clone()).under(item.clone())
            } else {
                Operation::mov(child.clone())
                    .after(children[ci - 1].clone())
                    .under(item.clone())
            };
            undo_ops.push(undo);
            ed.tree.move_block(child, &Anchor::After(thread.clone()))?;
            thread = child.clone();
        }
    }

    if policy == OutdentPolicy::Traditional {
        if let Some(next) = next_item {
            let following: Vec<BlockId> = {
                let siblings = ed.tree.children(list).to_vec();
                let idx = siblings.iter().position(|c| c == &next).unwrap_or(0);
                siblings[idx..].to_vec()
            };
            let dest_subtype = ed.tree.get(&next).and_then(|b| b.subtype);
            let mut bridge = last_block.filter(|b| {
                ed.tree
                    .get(b)
                    .map(|blk| blk.kind == BlockKind::List && blk.subtype == dest_subtype)
                    .unwrap_or(false)
            });
            let mut created = None;
            if bridge.is_none() {
                let nb = Block::list(dest_subtype.unwrap_or(BlockSubtype::Unordered));
                let nb_id = nb.id.clone();
                do_ops.push(Operation::insert(bare_list_data(&nb)).after(thread.clone()));
                ed.tree.insert_block(nb, &Anchor::After(thread.clone()))?;
                bridge = Some(nb_id.clone());
                created = Some(nb_id);
            }
            let bridge = bridge.unwrap_or_else(|| thread.clone());
            let mut fprev: Option<BlockId> = None;
            for f in &following {
                let wire_prev = fprev.clone().or_else(|| ed.tree.last_child(&bridge));
                do_ops.push(Operation::mov(f.clone()).at_slot(wire_prev.as_ref(), &bridge));
                undo_ops.push(
                    Operation::mov(f.clone()).after(fprev.clone().unwrap_or_else(|| last.clone())),
                );
                let anchor = match wire_prev {
                    Some(p) => Anchor::After(p),
                    None => Anchor::LastChildOf(bridge.clone()),
                };
                ed.tree.move_block(f, &anchor)?;
                fprev = Some(f.clone());
            }
            if ed.tree.get(&bridge).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
                renumber_with_ops(&mut ed.tree, &bridge, Some(1), &mut do_ops, &mut undo_ops);
            }
            if let Some(nid) = created {
                undo_ops.push(Operation::delete(nid));
            }
        }
    }

    // Drop the emptied item shells; the undo rewrite of the list restores
    // them before the move-backs refill them.
    let shells = ed.snapshot(list)?;
    let list_prev = ed.tree.previous_sibling(list);
    for item in items {
        ed.tree.remove_subtree(item);
    }
    if ed.tree.children(list).is_empty() {
        do_ops.push(Operation::delete(list.clone()));
        if &ed.block_id == list {
            // The view was rooted at this list; retarget before removal.
            ed.block_id = parent.clone();
        }
        undo_ops.insert(
            0,
            Operation::insert(shells).at_slot(list_prev.as_ref(), parent),
        );
        ed.tree.remove_subtree(list);
    } else {
        if ed.tree.get(list).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
            update_list_order(&mut ed.tree, list, start_index);
        }
        do_ops.push(Operation::update(list.clone(), ed.snapshot(list)?));
        undo_ops.insert(0, Operation::update(list.clone(), shells));
    }
    debug!(count = items.len(), "list outdent (top level)");
    ed.transaction(do_ops, undo_ops)
}

fn outdent_nested<T: Transport>(
    ed: &mut Editor<T>,
    items: &[BlockId],
    list: &BlockId,
    parent_li: &BlockId,
    last: &BlockId,
    policy: OutdentPolicy,
    start_index: Option<i64>,
) -> Result<(), EditorError> {
    let parent_list = ed
        .tree
        .parent(parent_li)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(parent_li.clone()))?;
    let before = ed.snapshot(&parent_list)?;
    let dest_subtype = ed.tree.get(parent_li).and_then(|b| b.subtype);
    let next_item = ed.tree.next_sibling(last);

    for item in items.iter().rev() {
        ed.tree.move_block(item, &Anchor::After(parent_li.clone()))?;
        if let Some(dest) = dest_subtype {
            if ed.tree.get(item).and_then(|b| b.subtype) != Some(dest) {
                convert_item_subtype(&mut ed.tree, item, dest);
            }
        }
    }

    if policy == OutdentPolicy::Traditional {
        if let Some(next) = next_item {
            let following: Vec<BlockId> = {
                let siblings = ed.tree.children(list).to_vec();
                let idx = siblings.iter().position(|c| c == &next).unwrap_or(0);
                siblings[idx..].to_vec()
            };
            let sub_subtype = ed.tree.get(&next).and_then(|b| b.subtype);
            let mut bridge = ed.tree.last_child(last).filter(|b| {
                ed.tree
                    .get(b)
                    .map(|blk| blk.kind == BlockKind::List)
                    .unwrap_or(false)
            });
            if bridge.is_none() {
                let nb = Block::list(sub_subtype.unwrap_or(BlockSubtype::Unordered));
                let nb_id = nb.id.clone();
                ed.tree
                    .insert_block(nb, &Anchor::LastChildOf(last.clone()))?;
                bridge = Some(nb_id);
            }
            let bridge = match bridge {
                Some(b) => b,
                None => return Ok(()),
            };
            let bridge_subtype = ed.tree.get(&bridge).and_then(|b| b.subtype);
            for f in following {
                if let Some(bs) = bridge_subtype {
                    if ed.tree.get(&f).and_then(|b| b.subtype) != Some(bs) {
                        convert_item_subtype(&mut ed.tree, &f, bs);
                    }
                }
                ed.tree
                    .move_block(&f, &Anchor::LastChildOf(bridge.clone()))?;
            }
            if bridge_subtype == Some(BlockSubtype::Ordered) {
                update_list_order(&mut ed.tree, &bridge, Some(1));
            }
        }
    }

    if ed.tree.children(list).is_empty() {
        if ed.tree.children(parent_li).to_vec() == vec![list.clone()] {
            // The parent item held nothing but this now-empty list.
            ed.tree.remove_subtree(parent_li);
        } else {
            ed.tree.remove_subtree(list);
        }
    } else if ed.tree.get(list).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
        update_list_order(&mut ed.tree, list, start_index);
    }
    if dest_subtype == Some(BlockSubtype::Ordered) {
        update_list_order(&mut ed.tree, &parent_list, None);
    }
    let after = ed.snapshot(&parent_list)?;
    debug!(count = items.len(), "list outdent (nested)");
    ed.update_transaction(&parent_list, after, before)
}

/// Split a list around `item`: following items move into a fresh sibling
/// list (skipped when `item` is last), the item's content blocks become
/// plain siblings after the list, and the emptied item (or the whole list,
/// when it was the only item) is deleted.
pub fn break_list<T: Transport>(ed: &mut Editor<T>, item: &BlockId) -> Result<(), EditorError> {
    let Some(list) = ed.tree.parent(item).cloned() else {
        return Ok(());
    };
    let mut do_ops = Vec::new();
    let mut undo_ops = Vec::new();

    let siblings = ed.tree.children(&list).to_vec();
    let idx = siblings
        .iter()
        .position(|c| c == item)
        .ok_or_else(|| EditorError::UnknownBlock(item.clone()))?;
    let following = siblings[idx + 1..].to_vec();

    let mut new_children = Vec::new();
    let mut running = 1i64;
    for f in &following {
        undo_ops.push(Operation::mov(f.clone()).after(item.clone()));
        do_ops.push(Operation::delete(f.clone()));
        if ed.tree.get(f).and_then(|b| b.subtype) == Some(BlockSubtype::Ordered) {
            undo_ops.push(Operation::update(f.clone(), ed.snapshot(f)?));
            if let Some(b) = ed.tree.get_mut(f) {
                b.marker = ordinal_marker(running);
            }
        }
        new_children.push(ed.snapshot(f)?);
        running += 1;
    }
    undo_ops.reverse();
    for f in &following {
        ed.tree.remove_subtree(f);
    }

    // No sibling list when the split item was last; a list never holds zero
    // items.
    if !following.is_empty() {
        let mut new_list = BlockData::new(BlockKind::List);
        new_list.subtype = ed.tree.get(item).and_then(|b| b.subtype);
        new_list.children = new_children;
        let new_list_id = new_list.id.clone();
        do_ops.push(Operation::insert(new_list.clone()).after(list.clone()));
        undo_ops.push(Operation::delete(new_list_id));
        ed.tree.insert_data(&new_list, &Anchor::After(list.clone()))?;
    }

    // The split item's content becomes plain blocks between the two lists.
    let content = ed.tree.children(item).to_vec();
    for child in content.iter().rev() {
        do_ops.push(Operation::mov(child.clone()).after(list.clone()));
        undo_ops.push(Operation::mov(child.clone()).under(item.clone()));
        ed.tree.move_block(child, &Anchor::After(list.clone()))?;
    }

    let parent = ed
        .tree
        .parent(&list)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    if ed.tree.children(&list).len() == 1 {
        // Deleting the last item deletes the list itself.
        let shell = ed.snapshot(&list)?;
        let list_prev = ed.tree.previous_sibling(&list);
        do_ops.push(Operation::delete(list.clone()));
        undo_ops.insert(
            0,
            Operation::insert(shell).at_slot(list_prev.as_ref(), &parent),
        );
        ed.tree.remove_subtree(&list);
    } else {
        let shell = ed.snapshot(item)?;
        let item_prev = ed.tree.previous_sibling(item);
        do_ops.push(Operation::delete(item.clone()));
        undo_ops.insert(
            0,
            Operation::insert(shell).at_slot(item_prev.as_ref(), &list),
        );
        ed.tree.remove_subtree(item);
    }
    debug!("break list");
    ed.transaction(do_ops, undo_ops)
}
