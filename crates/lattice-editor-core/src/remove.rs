//! Backspace at a block boundary: merging into the previous editable block,
//! deleting empty blocks, and the structural fallout (list renumbering,
//! degenerate-container cleanup, super-block unwrapping).

use tracing::debug;

use crate::block::{BlockData, BlockKind};
use crate::caret::{self, utf16_len, Caret};
use crate::editor::Editor;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::list::{self, update_list_order};
use crate::navigate;
use crate::operation::{Anchor, Operation};
use crate::super_block::cancel_super_block_ops;
use crate::transaction::Transport;

/// Blocks with no editable text surface; backspacing into one selects it
/// instead of merging.
fn is_opaque(kind: BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::Table
            | BlockKind::MathBlock
            | BlockKind::ThematicBreak
            | BlockKind::HtmlBlock
            | BlockKind::QueryEmbed
            | BlockKind::Iframe
            | BlockKind::Widget
            | BlockKind::Video
            | BlockKind::Audio
    )
}

/// Structural Backspace at offset 0 of `block`. Callers have already ruled
/// out plain character deletion.
pub fn remove_block<T: Transport>(ed: &mut Editor<T>, block: &BlockId) -> Result<(), EditorError> {
    if !ed.selected.is_empty() {
        return remove_selected(ed);
    }
    let Some(b) = ed.tree.get(block) else {
        return Ok(());
    };
    let kind = b.kind;
    // An empty code block deletes outright.
    if kind == BlockKind::CodeBlock && b.content.trim().is_empty() {
        ed.selected = vec![block.clone()];
        return remove_selected(ed);
    }
    // Non-mergeable blocks only reposition the caret.
    if kind == BlockKind::CodeBlock || kind == BlockKind::Table {
        if let Some(prev) = ed.tree.previous_sibling(block) {
            let target = navigate::last_block(&ed.tree, &prev);
            ed.caret = Some(Caret::end_of(&ed.tree, target));
        }
        return Ok(());
    }
    // A heading degrades to a paragraph before anything merges.
    if kind == BlockKind::Heading {
        return heading_to_paragraph(ed, block);
    }
    if let Some(parent) = ed.tree.parent(block).cloned() {
        let parent_kind = ed.tree.get(&parent).map(|p| p.kind);
        if ed.tree.previous_sibling(block).is_none() {
            if parent_kind == Some(BlockKind::Blockquote) {
                return escape_quote(ed, block, &parent);
            }
            if parent_kind == Some(BlockKind::ListItem) {
                return remove_list_item(ed, &parent);
            }
        }
    }
    match navigate::previous_block(&ed.tree, block) {
        Some(previous) => merge_into_previous(ed, block, &previous),
        None => remove_first_empty(ed, block),
    }
}

/// Delete every block in the block-level selection, renumbering any ordered
/// list a deleted item belonged to and never leaving the document empty.
pub fn remove_selected<T: Transport>(ed: &mut Editor<T>) -> Result<(), EditorError> {
    let selected = std::mem::take(&mut ed.selected);
    if selected.is_empty() {
        return Ok(());
    }
    let root = ed.tree.root().clone();
    let mut tops: Vec<BlockId> = Vec::new();
    for id in &selected {
        if !ed.tree.contains(id) {
            continue;
        }
        let top = navigate::top_alone_block(&ed.tree, id);
        if !tops.contains(&top) {
            tops.push(top);
        }
    }

    let mut do_ops: Vec<Operation> = Vec::new();
    let mut undo_ops: Vec<Operation> = Vec::new();
    let mut side: Option<BlockId> = None;
    let mut ordered_list: Option<BlockId> = None;
    let mut last_parent: Option<BlockId> = None;
    for top in &tops {
        if !ed.tree.contains(top) {
            continue;
        }
        let prev = ed.tree.previous_sibling(top);
        let parent = ed
            .tree
            .parent(top)
            .cloned()
            .unwrap_or_else(|| root.clone());
        let shell = ed.snapshot(top)?;
        do_ops.push(Operation::delete(top.clone()));
        undo_ops.push(Operation::insert(shell).at_slot(prev.as_ref(), &parent));
        ordered_list = ed.tree.get(top).and_then(|b| {
            if b.kind == BlockKind::ListItem && b.subtype == Some(crate::block::BlockSubtype::Ordered)
            {
                Some(parent.clone())
            } else {
                None
            }
        });
        side = navigate::next_block(&ed.tree, top)
            .or_else(|| navigate::previous_block(&ed.tree, top))
            .or_else(|| (parent != root).then(|| parent.clone()));
        last_parent = Some(parent);
        ed.tree.remove_subtree(top);
    }

    // The document never goes empty; a fresh paragraph takes over.
    if ed.tree.children(&root).is_empty() {
        let p = BlockData::paragraph("");
        do_ops.push(Operation::insert(p.clone()).under(root.clone()));
        undo_ops.push(Operation::delete(p.id.clone()));
        ed.tree.insert_data(&p, &Anchor::LastChildOf(root.clone()))?;
        ed.caret = Some(Caret::start_of(p.id));
        side = None;
    }
    if let Some(s) = &side {
        if ed.tree.contains(s) {
            ed.caret = caret::focus_block(&ed.tree, s, true);
        }
    }
    if let Some(list) = ordered_list {
        if ed.tree.contains(&list) {
            if let Some(old) = ed.tree.snapshot(&list) {
                undo_ops.push(Operation::update(list.clone(), old));
                update_list_order(&mut ed.tree, &list, Some(1));
                do_ops.push(Operation::update(list.clone(), ed.snapshot(&list)?));
            }
        }
    }
    undo_ops.reverse();
    if do_ops.is_empty() {
        return Ok(());
    }
    debug!(count = tops.len(), "delete selection");
    match last_parent {
        Some(parent) => commit_with_sb_check(ed, &parent, do_ops, undo_ops),
        None => ed.transaction(do_ops, undo_ops),
    }
}

fn heading_to_paragraph<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
) -> Result<(), EditorError> {
    let old = ed.snapshot(block)?;
    if let Some(b) = ed.tree.get_mut(block) {
        b.kind = BlockKind::Paragraph;
        b.subtype = None;
        b.touch();
    }
    let new = ed.snapshot(block)?;
    ed.update_transaction(block, new, old)
}

/// The first block of a quote moves out in front of it; a quote left with no
/// children is deleted in the same gesture.
fn escape_quote<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    quote: &BlockId,
) -> Result<(), EditorError> {
    let quote_prev = ed.tree.previous_sibling(quote);
    let quote_parent = ed
        .tree
        .parent(quote)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let only_child = ed.tree.children(quote).len() == 1;
    ed.tree.move_block(block, &Anchor::Before(quote.clone()))?;
    let mov = Operation::mov(block.clone()).at_slot(quote_prev.as_ref(), &quote_parent);
    let mov_back = Operation::mov(block.clone()).under(quote.clone());
    if only_child {
        let mut shell = ed.snapshot(quote)?;
        shell.children.clear();
        ed.tree.remove_subtree(quote);
        ed.transaction(
            vec![mov, Operation::delete(quote.clone())],
            vec![
                Operation::insert(shell).at_slot(quote_prev.as_ref(), &quote_parent),
                mov_back,
            ],
        )
    } else {
        ed.transaction(vec![mov], vec![mov_back])
    }
}

/// Backspace at the start of a list item's first block.
fn remove_list_item<T: Transport>(ed: &mut Editor<T>, item: &BlockId) -> Result<(), EditorError> {
    let Some(list) = ed.tree.parent(item).cloned() else {
        return Ok(());
    };
    match ed.tree.previous_sibling(item) {
        Some(prev_item) => merge_item_into_previous(ed, item, &list, &prev_item),
        None => {
            // The only item outdents as a whole.
            if ed.tree.next_sibling(item).is_none() {
                return list::list_outdent(ed, &[item.clone()], ed.config.outdent);
            }
            let nested = ed
                .tree
                .parent(&list)
                .and_then(|p| ed.tree.get(p))
                .map(|b| b.kind == BlockKind::ListItem)
                .unwrap_or(false);
            if nested {
                merge_first_subitem(ed, item, &list)
            } else {
                hoist_first_item(ed, item, &list)
            }
        }
    }
}

/// The first item of a nested sub-list merges into the block just above the
/// sub-list; its remaining blocks slot in between. Committed as a wholesale
/// rewrite of the enclosing item.
fn merge_first_subitem<T: Transport>(
    ed: &mut Editor<T>,
    item: &BlockId,
    list: &BlockId,
) -> Result<(), EditorError> {
    let Some(prev_block) = ed.tree.previous_sibling(list) else {
        return Ok(());
    };
    let Some(outer) = ed.tree.parent(list).cloned() else {
        return Ok(());
    };
    let old = ed.snapshot(&outer)?;
    let target = navigate::last_block(&ed.tree, &prev_block);
    let children = ed.tree.children(item).to_vec();
    let mut junction = 0;
    if let Some(first) = children.first() {
        let text = ed
            .tree
            .get(first)
            .map(|b| b.content.clone())
            .unwrap_or_default();
        if let Some(t) = ed.tree.get_mut(&target) {
            junction = utf16_len(&t.content);
            t.content.push_str(&text);
            t.touch();
        }
    }
    // Remaining blocks land between the merge target and the sub-list.
    let mut thread = prev_block.clone();
    for child in children.iter().skip(1) {
        ed.tree.move_block(child, &Anchor::After(thread.clone()))?;
        thread = child.clone();
    }
    ed.tree.remove_subtree(item);
    update_list_order(&mut ed.tree, list, None);
    let new = ed.snapshot(&outer)?;
    ed.caret = Some(Caret::new(target, junction));
    ed.update_transaction(&outer, new, old)
}

/// The first item of a top-level list dissolves: its blocks hoist out in
/// front of the list and the survivors renumber.
fn hoist_first_item<T: Transport>(
    ed: &mut Editor<T>,
    item: &BlockId,
    list: &BlockId,
) -> Result<(), EditorError> {
    // Zoomed into the list there is nowhere to hoist to.
    if *list == ed.block_id {
        return Ok(());
    }
    let list_prev = ed.tree.previous_sibling(list);
    let list_parent = ed
        .tree
        .parent(list)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let old_list = ed.snapshot(list)?;
    let start = ed.tree.get(item).map(|b| list::marker_index(&b.marker));

    let children = ed.tree.children(item).to_vec();
    let mut do_ops = Vec::new();
    let mut undo_ops = Vec::new();
    let mut thread = list_prev.clone();
    for child in &children {
        let anchor = match &thread {
            Some(t) => Anchor::After(t.clone()),
            None => Anchor::Before(list.clone()),
        };
        ed.tree.move_block(child, &anchor)?;
        let data = ed.snapshot(child)?;
        do_ops.push(Operation::insert(data).at_slot(thread.as_ref(), &list_parent));
        undo_ops.push(Operation::delete(child.clone()));
        thread = Some(child.clone());
    }
    ed.tree.remove_subtree(item);
    update_list_order(&mut ed.tree, list, start);
    // The list rewrite replays first so the hoisted copies re-insert against
    // a tree that no longer holds them.
    do_ops.insert(0, Operation::update(list.clone(), ed.snapshot(list)?));
    undo_ops.push(Operation::update(list.clone(), old_list));
    ed.transaction(do_ops, undo_ops)
}

/// A list item's blocks append to the previous item; the emptied item goes
/// away. A folded previous item only accepts the merge when the source item
/// holds a single empty block.
fn merge_item_into_previous<T: Transport>(
    ed: &mut Editor<T>,
    item: &BlockId,
    list: &BlockId,
    prev_item: &BlockId,
) -> Result<(), EditorError> {
    let folded = ed.tree.get(prev_item).map(|b| b.folded).unwrap_or(false);
    let children = ed.tree.children(item).to_vec();
    let item_empty = children.len() == 1
        && ed
            .tree
            .get(&children[0])
            .map(|b| !b.kind.is_container() && b.content.is_empty())
            .unwrap_or(false);
    if folded && !item_empty {
        let target = navigate::last_block(&ed.tree, prev_item);
        ed.caret = Some(Caret::end_of(&ed.tree, target));
        return Ok(());
    }
    let old_list = ed.snapshot(list)?;
    if folded {
        ed.tree.remove_subtree(item);
        let target = navigate::last_block(&ed.tree, prev_item);
        ed.caret = Some(Caret::end_of(&ed.tree, target));
    } else {
        for child in &children {
            ed.tree
                .move_block(child, &Anchor::LastChildOf(prev_item.clone()))?;
        }
        ed.tree.remove_subtree(item);
    }
    update_list_order(&mut ed.tree, list, None);
    let new_list = ed.snapshot(list)?;
    ed.update_transaction(list, new_list, old_list)
}

/// No previous block at all: an empty first block deletes its alone wrapper,
/// provided the document keeps at least one block.
fn remove_first_empty<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
) -> Result<(), EditorError> {
    let root = ed.tree.root().clone();
    let empty = ed
        .tree
        .get(block)
        .map(|b| b.content.is_empty())
        .unwrap_or(false);
    if !empty || ed.tree.children(&root).len() <= 1 {
        return Ok(());
    }
    let top = navigate::top_alone_block(&ed.tree, block);
    let parent = ed
        .tree
        .parent(&top)
        .cloned()
        .unwrap_or_else(|| root.clone());
    let next = ed.tree.next_sibling(&top);
    let shell = ed.snapshot(&top)?;
    ed.tree.remove_subtree(&top);
    if let Some(n) = next {
        ed.caret = caret::focus_block(&ed.tree, &n, true);
    }
    ed.transaction(
        vec![Operation::delete(top.clone())],
        vec![Operation::insert(shell).under(parent)],
    )
}

fn merge_into_previous<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    previous: &BlockId,
) -> Result<(), EditorError> {
    let prev_last = navigate::last_block(&ed.tree, previous);
    let Some(prev_block) = ed.tree.get(&prev_last) else {
        return Ok(());
    };
    let prev_kind = prev_block.kind;
    let content = ed
        .tree
        .get(block)
        .map(|b| b.content.clone())
        .unwrap_or_default();

    if prev_kind == BlockKind::CodeBlock {
        if content.trim().is_empty() {
            return delete_block_only(ed, block, &prev_last);
        }
        return merge_into_code_block(ed, block, &prev_last, &content);
    }
    if is_opaque(prev_kind) {
        if content.is_empty() {
            return delete_block_only(ed, block, &prev_last);
        }
        ed.caret = Some(Caret::end_of(&ed.tree, prev_last));
        return Ok(());
    }

    let old_prev = ed.snapshot(&prev_last)?;
    let junction = utf16_len(&old_prev.content);
    if !content.is_empty() {
        if let Some(b) = ed.tree.get_mut(&prev_last) {
            b.content.push_str(&content);
            b.touch();
        }
    }
    let new_prev = ed.snapshot(&prev_last)?;

    let target = navigate::top_empty_block(&ed.tree, block);
    let prev_sib = ed.tree.previous_sibling(&target);
    let parent = ed
        .tree
        .parent(&target)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let shell = ed.snapshot(&target)?;
    let mut do_ops = vec![Operation::delete(target.clone())];
    if new_prev != old_prev {
        do_ops.push(Operation::update(prev_last.clone(), new_prev));
    }
    let undo_ops = vec![
        Operation::update(prev_last.clone(), old_prev),
        Operation::insert(shell).at_slot(prev_sib.as_ref(), &parent),
    ];
    ed.tree.remove_subtree(&target);
    ed.caret = Some(Caret::new(prev_last, junction));
    commit_with_sb_check(ed, &parent, do_ops, undo_ops)
}

/// Appending into a code block joins on exactly one newline: an existing
/// trailing newline is reused, never doubled.
fn merge_into_code_block<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    code: &BlockId,
    content: &str,
) -> Result<(), EditorError> {
    let old = ed.snapshot(code)?;
    let mut merged = old.content.clone();
    if !merged.ends_with('\n') {
        merged.push('\n');
    }
    let junction = utf16_len(&merged);
    merged.push_str(content);
    if let Some(b) = ed.tree.get_mut(code) {
        b.content = merged;
        b.touch();
    }
    let new = ed.snapshot(code)?;

    let prev_sib = ed.tree.previous_sibling(block);
    let parent = ed
        .tree
        .parent(block)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let shell = ed.snapshot(block)?;
    let do_ops = vec![
        Operation::delete(block.clone()),
        Operation::update(code.clone(), new),
    ];
    let undo_ops = vec![
        Operation::update(code.clone(), old),
        Operation::insert(shell).at_slot(prev_sib.as_ref(), &parent),
    ];
    ed.tree.remove_subtree(block);
    ed.caret = Some(Caret::new(code.clone(), junction));
    commit_with_sb_check(ed, &parent, do_ops, undo_ops)
}

fn delete_block_only<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    focus: &BlockId,
) -> Result<(), EditorError> {
    let target = navigate::top_empty_block(&ed.tree, block);
    let prev = ed.tree.previous_sibling(&target);
    let parent = ed
        .tree
        .parent(&target)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let shell = ed.snapshot(&target)?;
    ed.tree.remove_subtree(&target);
    ed.caret = Some(Caret::end_of(&ed.tree, focus.clone()));
    commit_with_sb_check(
        ed,
        &parent,
        vec![Operation::delete(target.clone())],
        vec![Operation::insert(shell).at_slot(prev.as_ref(), &parent)],
    )
}

/// Commit, folding in a super-block unwrap when the gesture left the parent
/// super-block with a single child.
fn commit_with_sb_check<T: Transport>(
    ed: &mut Editor<T>,
    parent: &BlockId,
    do_ops: Vec<Operation>,
    undo_ops: Vec<Operation>,
) -> Result<(), EditorError> {
    let degenerate = ed
        .tree
        .get(parent)
        .map(|b| b.kind == BlockKind::SuperBlock)
        .unwrap_or(false)
        && ed.tree.children(parent).len() == 1;
    if degenerate {
        let (sb_do, sb_undo) = cancel_super_block_ops(ed, parent)?;
        let mut fwd = do_ops;
        fwd.extend(sb_do);
        let mut inv = sb_undo;
        inv.extend(undo_ops);
        ed.transaction(fwd, inv)
    } else {
        ed.transaction(do_ops, undo_ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockSubtype, BlockTree, SbLayout};
    use crate::config::EditorConfig;
    use crate::transaction::RecordingTransport;
    use pretty_assertions::assert_eq;
    use smol_str::SmolStr;

    type TestEditor = Editor<RecordingTransport>;

    fn make_editor() -> TestEditor {
        Editor::new(
            BlockTree::new(),
            EditorConfig::default(),
            RecordingTransport::default(),
        )
    }

    fn add_paragraphs(ed: &mut TestEditor, texts: &[&str]) -> Vec<BlockId> {
        let root = ed.tree.root().clone();
        texts
            .iter()
            .map(|t| {
                ed.tree
                    .insert_block(Block::paragraph(*t), &Anchor::LastChildOf(root.clone()))
                    .unwrap()
            })
            .collect()
    }

    fn ordered_list(ed: &mut TestEditor, texts: &[&str]) -> (BlockId, Vec<BlockId>) {
        let root = ed.tree.root().clone();
        let list = ed
            .tree
            .insert_block(Block::list(BlockSubtype::Ordered), &Anchor::LastChildOf(root))
            .unwrap();
        let items = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let li = ed
                    .tree
                    .insert_block(
                        Block::list_item(BlockSubtype::Ordered, format!("{}.", i + 1).as_str()),
                        &Anchor::LastChildOf(list.clone()),
                    )
                    .unwrap();
                ed.tree
                    .insert_block(Block::paragraph(*t), &Anchor::LastChildOf(li.clone()))
                    .unwrap();
                li
            })
            .collect();
        (list, items)
    }

    fn markers(ed: &TestEditor, list: &BlockId) -> Vec<SmolStr> {
        ed.tree
            .children(list)
            .iter()
            .map(|c| ed.tree.get(c).unwrap().marker.clone())
            .collect()
    }

    #[test]
    fn merges_text_into_previous_paragraph() {
        let mut ed = make_editor();
        let ps = add_paragraphs(&mut ed, &["hello", "world"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &ps[1]).unwrap();
        assert_eq!(ed.tree.get(&ps[0]).unwrap().content, "helloworld");
        assert!(!ed.tree.contains(&ps[1]));
        assert_eq!(ed.caret, Some(Caret::new(ps[0].clone(), 5)));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn code_block_merge_reuses_trailing_newline() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let code = ed
            .tree
            .insert_block(
                Block::code_block("let x = 1;\n"),
                &Anchor::LastChildOf(root.clone()),
            )
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph("tail"), &Anchor::LastChildOf(root))
            .unwrap();

        remove_block(&mut ed, &p).unwrap();
        assert_eq!(ed.tree.get(&code).unwrap().content, "let x = 1;\ntail");
        assert_eq!(ed.caret, Some(Caret::new(code, 11)));
    }

    #[test]
    fn code_block_merge_adds_missing_newline() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let code = ed
            .tree
            .insert_block(
                Block::code_block("let x = 1;"),
                &Anchor::LastChildOf(root.clone()),
            )
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph("tail"), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &p).unwrap();
        assert_eq!(ed.tree.get(&code).unwrap().content, "let x = 1;\ntail");
        assert_eq!(ed.caret, Some(Caret::new(code, 11)));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn opaque_previous_only_moves_caret() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let table = ed
            .tree
            .insert_block(Block::new(BlockKind::Table), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph("text"), &Anchor::LastChildOf(root))
            .unwrap();

        remove_block(&mut ed, &p).unwrap();
        assert!(ed.tree.contains(&p));
        assert_eq!(ed.caret.as_ref().map(|c| c.block.clone()), Some(table));
        assert!(ed.transport.submitted.is_empty());
    }

    #[test]
    fn heading_backspace_becomes_paragraph() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let h = ed
            .tree
            .insert_block(Block::heading(2, "title"), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &h).unwrap();
        let b = ed.tree.get(&h).unwrap();
        assert_eq!(b.kind, BlockKind::Paragraph);
        assert_eq!(b.subtype, None);
        assert_eq!(b.content, "title");

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn quote_first_block_escapes_and_empty_quote_dies() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let quote = ed
            .tree
            .insert_block(Block::new(BlockKind::Blockquote), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph("inside"), &Anchor::LastChildOf(quote.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &p).unwrap();
        assert!(!ed.tree.contains(&quote));
        assert_eq!(ed.tree.children(&root).to_vec(), vec![p.clone()]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn quote_first_block_escapes_keeping_quote() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let quote = ed
            .tree
            .insert_block(Block::new(BlockKind::Blockquote), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let a = ed
            .tree
            .insert_block(Block::paragraph("a"), &Anchor::LastChildOf(quote.clone()))
            .unwrap();
        let b = ed
            .tree
            .insert_block(Block::paragraph("b"), &Anchor::LastChildOf(quote.clone()))
            .unwrap();

        remove_block(&mut ed, &a).unwrap();
        assert_eq!(ed.tree.children(&root).to_vec(), vec![a, quote.clone()]);
        assert_eq!(ed.tree.children(&quote).to_vec(), vec![b]);
    }

    #[test]
    fn list_item_merges_into_previous_item() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["one", "two", "three"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();
        let first_block = ed.tree.children(&items[1]).to_vec()[0].clone();

        remove_block(&mut ed, &first_block).unwrap();
        assert!(!ed.tree.contains(&items[1]));
        assert_eq!(ed.tree.children(&items[0]).len(), 2);
        assert_eq!(markers(&ed, &list), vec!["1.", "2."]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn first_item_of_top_level_list_hoists() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["one", "two"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();
        let first_block = ed.tree.children(&items[0]).to_vec()[0].clone();

        remove_block(&mut ed, &first_block).unwrap();
        assert_eq!(
            ed.tree.children(&root).to_vec(),
            vec![first_block.clone(), list.clone()]
        );
        assert!(!ed.tree.contains(&items[0]));
        assert_eq!(markers(&ed, &list), vec!["1."]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
        ed.redo().unwrap();
        assert_eq!(
            ed.tree.children(&root).to_vec(),
            vec![first_block, list.clone()]
        );
        assert_eq!(markers(&ed, &list), vec!["1."]);
    }

    #[test]
    fn nested_first_item_merges_above() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let list = ed
            .tree
            .insert_block(
                Block::list(BlockSubtype::Unordered),
                &Anchor::LastChildOf(root.clone()),
            )
            .unwrap();
        let li = ed
            .tree
            .insert_block(
                Block::list_item(BlockSubtype::Unordered, "*"),
                &Anchor::LastChildOf(list),
            )
            .unwrap();
        let pa = ed
            .tree
            .insert_block(Block::paragraph("alpha"), &Anchor::LastChildOf(li.clone()))
            .unwrap();
        let sub = ed
            .tree
            .insert_block(Block::list(BlockSubtype::Unordered), &Anchor::After(pa.clone()))
            .unwrap();
        let sub_li1 = ed
            .tree
            .insert_block(
                Block::list_item(BlockSubtype::Unordered, "*"),
                &Anchor::LastChildOf(sub.clone()),
            )
            .unwrap();
        let pb = ed
            .tree
            .insert_block(Block::paragraph("beta"), &Anchor::LastChildOf(sub_li1.clone()))
            .unwrap();
        let sub_li2 = ed
            .tree
            .insert_block(
                Block::list_item(BlockSubtype::Unordered, "*"),
                &Anchor::LastChildOf(sub.clone()),
            )
            .unwrap();
        ed.tree
            .insert_block(Block::paragraph("gamma"), &Anchor::LastChildOf(sub_li2.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &pb).unwrap();
        assert_eq!(ed.tree.get(&pa).unwrap().content, "alphabeta");
        assert!(!ed.tree.contains(&sub_li1));
        assert_eq!(ed.tree.children(&sub).to_vec(), vec![sub_li2]);
        assert_eq!(ed.caret, Some(Caret::new(pa, 5)));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn selected_ordered_item_deletion_renumbers() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["one", "two", "three"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        ed.selected = vec![items[1].clone()];
        remove_selected(&mut ed).unwrap();
        assert!(!ed.tree.contains(&items[1]));
        assert_eq!(markers(&ed, &list), vec!["1.", "2."]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
        assert_eq!(markers(&ed, &list), vec!["1.", "2.", "3."]);
    }

    #[test]
    fn deleting_everything_leaves_one_empty_paragraph() {
        let mut ed = make_editor();
        let ps = add_paragraphs(&mut ed, &["only"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        ed.selected = vec![ps[0].clone()];
        remove_selected(&mut ed).unwrap();
        assert_eq!(ed.tree.children(&root).len(), 1);
        let fresh = ed.tree.children(&root)[0].clone();
        assert_ne!(fresh, ps[0]);
        assert_eq!(ed.tree.get(&fresh).unwrap().content, "");
        assert_eq!(ed.caret, Some(Caret::start_of(fresh)));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn deletion_unwraps_degenerate_super_block() {
        let mut ed = make_editor();
        let ps = add_paragraphs(&mut ed, &["a", "b"]);
        let root = ed.tree.root().clone();
        let sb = crate::super_block::merge_to_super_block(&mut ed, &ps, SbLayout::Row).unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        ed.selected = vec![ps[1].clone()];
        remove_selected(&mut ed).unwrap();
        assert!(!ed.tree.contains(&sb));
        assert_eq!(ed.tree.children(&root).to_vec(), vec![ps[0].clone()]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn empty_code_block_deletes_outright() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let p = add_paragraphs(&mut ed, &["keep"]);
        let code = ed
            .tree
            .insert_block(Block::new(BlockKind::CodeBlock), &Anchor::LastChildOf(root.clone()))
            .unwrap();

        remove_block(&mut ed, &code).unwrap();
        assert!(!ed.tree.contains(&code));
        assert_eq!(ed.tree.children(&root).to_vec(), p);
    }

    #[test]
    fn empty_first_block_removed_when_document_has_more() {
        let mut ed = make_editor();
        let ps = add_paragraphs(&mut ed, &["", "rest"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        remove_block(&mut ed, &ps[0]).unwrap();
        assert_eq!(ed.tree.children(&root).to_vec(), vec![ps[1].clone()]);
        assert_eq!(ed.caret, Some(Caret::start_of(ps[1].clone())));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn sole_non_empty_first_block_declines() {
        let mut ed = make_editor();
        let ps = add_paragraphs(&mut ed, &["text"]);
        remove_block(&mut ed, &ps[0]).unwrap();
        assert!(ed.tree.contains(&ps[0]));
        assert!(ed.transport.submitted.is_empty());
    }
}
