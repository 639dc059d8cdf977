//! The Return key state machine.
//!
//! One entry point, [`enter`], walks an ordered set of cases: selection
//! collapse, non-editable blocks, fenced-code conversion, literal newlines
//! in code blocks, breaking out of a quote, list-aware handling, insert
//! above at offset zero, and finally the default block split. The first
//! case that claims the event mutates the tree, commits its operation pair,
//! and places the caret.

use tracing::debug;

use crate::block::{BlockData, BlockKind, BlockSubtype};
use crate::caret::{self, split_at_utf16, utf16_len, Caret, TextRange};
use crate::editor::Editor;
use crate::error::EditorError;
use crate::id::BlockId;
use crate::list;
use crate::navigate;
use crate::operation::{Anchor, Operation};
use crate::transaction::Transport;

/// Insert an empty paragraph after `block` and focus it.
pub fn insert_empty_block_after<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
) -> Result<BlockId, EditorError> {
    let data = BlockData::paragraph("");
    let new_id = data.id.clone();
    ed.tree.insert_data(&data, &Anchor::After(block.clone()))?;
    ed.transaction(
        vec![Operation::insert(data).after(block.clone())],
        vec![Operation::delete(new_id.clone())],
    )?;
    ed.caret = Some(Caret::start_of(new_id.clone()));
    Ok(new_id)
}

/// Return key handler. `block` is the content block holding the caret.
/// Returns false only when no case claimed the event.
pub fn enter<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    range: &TextRange,
) -> Result<bool, EditorError> {
    let Some(b) = ed.tree.get(block) else {
        return Err(EditorError::UnknownBlock(block.clone()));
    };
    let kind = b.kind;
    let content = b.content.clone();

    if kind.is_editable() && ed.selected.contains(block) {
        // Return on a selected block collapses the selection to its end.
        ed.caret = Some(Caret::end_of(&ed.tree, block.clone()));
        ed.selected.clear();
        return Ok(true);
    }
    if !kind.is_editable() || kind == BlockKind::Table {
        insert_empty_block_after(ed, block)?;
        return Ok(true);
    }

    // A paragraph that reads like a fenced-code opening becomes a code
    // block, except the `` ```x` `` inline form, which stays prose.
    if kind == BlockKind::Paragraph && fence_candidate(&content) && !fence_inline_only(&content) {
        convert_to_code_block(ed, block, range)?;
        return Ok(true);
    }
    if kind == BlockKind::CodeBlock {
        code_block_newline(ed, block, range)?;
        return Ok(true);
    }

    // Empty trailing paragraph of a quote: hoist out of the quote.
    let parent = ed.tree.parent(block).cloned();
    let visible = content.replace('\u{200b}', "").replace('\n', "");
    if visible.is_empty()
        && ed.tree.next_sibling(block).is_none()
        && parent
            .as_ref()
            .and_then(|p| ed.tree.get(p))
            .map(|p| p.kind == BlockKind::Blockquote)
            .unwrap_or(false)
    {
        quote_breakout(ed, block)?;
        return Ok(true);
    }

    if let Some(parent) = &parent {
        if ed
            .tree
            .get(parent)
            .map(|p| p.kind == BlockKind::ListItem)
            .unwrap_or(false)
        {
            let idx = ed.tree.index_in_parent(block).unwrap_or(0);
            let offsets = caret::selection_offset(&ed.tree, block, range);
            let folded = ed.tree.get(parent).map(|p| p.folded).unwrap_or(false);
            let next_is_sublist = ed
                .tree
                .next_sibling(block)
                .and_then(|n| ed.tree.get(&n).map(|nb| nb.kind == BlockKind::List))
                .unwrap_or(false);
            let eligible = ed.tree.next_sibling(block).is_none()
                || (next_is_sublist && idx == 0)
                || (offsets.start == 0 && idx == 0)
                || folded;
            if eligible && list_enter(ed, block, range)? {
                return Ok(true);
            }
        }
    }

    // Offset zero in a non-empty block: an empty sibling goes above and the
    // caret stays where it is.
    let offsets = caret::selection_offset(&ed.tree, block, range);
    if !content.is_empty() && range.is_collapsed() && offsets.start == 0 {
        insert_before_block(ed, block)?;
        return Ok(true);
    }

    split_block(ed, block, range)?;
    Ok(true)
}

fn fence_candidate(text: &str) -> bool {
    let t = text.trim_start();
    t.starts_with("```")
        || t.starts_with("~~~")
        || t.starts_with("···")
        || t.contains("\n```")
        || t.contains("\n~~~")
        || t.contains("\n···")
}

/// `` ```x` `` on a single line renders as inline code, not a fence.
fn fence_inline_only(text: &str) -> bool {
    let t = text.trim_start();
    if t.contains('\n') {
        return false;
    }
    let normalized: String = t
        .chars()
        .map(|c| if c == '~' || c == '·' { '`' } else { c })
        .collect();
    normalized.trim_start_matches('`').contains('`')
}

/// Rewrite fence runs at line starts to plain ` ``` `.
fn normalize_fences(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.trim().lines() {
        let run: Vec<char> = line
            .chars()
            .take_while(|c| matches!(c, '`' | '~' | '·'))
            .collect();
        if run.len() >= 3 {
            let skip: usize = run.iter().map(|c| c.len_utf8()).sum();
            out.push(format!("```{}", &line[skip..]));
        } else {
            out.push(line.to_string());
        }
    }
    let mut joined = out.join("\n");
    if !joined.ends_with("\n```") {
        joined.push_str("\n```");
    }
    joined
}

fn convert_to_code_block<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    range: &TextRange,
) -> Result<(), EditorError> {
    let old = ed.snapshot(block)?;
    let offsets = caret::selection_offset(&ed.tree, block, range);
    let content = old.content.clone();
    let before = split_at_utf16(&content, offsets.start).0;
    let after = split_at_utf16(&content, offsets.end).1;
    let fenced = normalize_fences(&format!("{before}\n{after}"));

    // First fence line carries the language tag and is dropped along with
    // the closing fence.
    let mut lines = fenced.lines();
    lines.next();
    let rest: Vec<&str> = lines.collect();
    let body_lines = match rest.last() {
        Some(&"```") => &rest[..rest.len() - 1],
        _ => &rest[..],
    };
    let mut body = body_lines.join("\n");
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    {
        let b = ed
            .tree
            .get_mut(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        b.kind = BlockKind::CodeBlock;
        b.subtype = None;
        b.content = body;
        b.touch();
    }
    let new = ed.snapshot(block)?;
    debug!(id = %block, "paragraph converted to code block");
    ed.update_transaction(block, new, old)?;
    ed.caret = Some(Caret::end_of(&ed.tree, block.clone()));
    Ok(())
}

fn code_block_newline<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    range: &TextRange,
) -> Result<(), EditorError> {
    let old = ed.snapshot(block)?;
    let offsets = caret::selection_offset(&ed.tree, block, range);
    let content = old.content.clone();
    let before = split_at_utf16(&content, offsets.start).0;
    let after = split_at_utf16(&content, offsets.end).1;
    // Code block text keeps a trailing newline; grow one when missing.
    let mut tail = after.to_string();
    if !content.ends_with('\n') {
        tail.push('\n');
    }
    let caret_offset = utf16_len(before) + 1;
    {
        let b = ed
            .tree
            .get_mut(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        b.content = format!("{before}\n{tail}");
        b.touch();
    }
    let new = ed.snapshot(block)?;
    ed.update_transaction(block, new, old)?;
    ed.caret = Some(Caret::new(block.clone(), caret_offset));
    Ok(())
}

/// Move an empty quote-terminal paragraph out of its quote. When the whole
/// wrapper chain above it is empty, the paragraph takes the topmost empty
/// wrapper's place instead.
fn quote_breakout<T: Transport>(ed: &mut Editor<T>, block: &BlockId) -> Result<(), EditorError> {
    let top = navigate::top_empty_block(&ed.tree, block);
    let data = ed.snapshot(block)?;
    let quote = ed
        .tree
        .parent(block)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
    if top == *block {
        let prev = ed.tree.previous_sibling(block);
        ed.tree.move_block(block, &Anchor::After(quote.clone()))?;
        ed.transaction(
            vec![
                Operation::delete(block.clone()),
                Operation::insert(data.clone()).after(quote.clone()),
            ],
            vec![
                Operation::delete(block.clone()),
                Operation::insert(data).at_slot(prev.as_ref(), &quote),
            ],
        )?;
    } else {
        let top_data = ed.snapshot(&top)?;
        let prev = ed.tree.previous_sibling(&top);
        let parent = ed
            .tree
            .parent(&top)
            .cloned()
            .unwrap_or_else(|| ed.tree.root().clone());
        ed.tree.move_block(block, &Anchor::After(top.clone()))?;
        ed.tree.remove_subtree(&top);
        ed.transaction(
            vec![
                Operation::delete(top.clone()),
                Operation::insert(data).at_slot(prev.as_ref(), &parent),
            ],
            vec![
                Operation::delete(block.clone()),
                Operation::insert(top_data).at_slot(prev.as_ref(), &parent),
            ],
        )?;
    }
    debug!(id = %block, "quote breakout");
    ed.caret = Some(Caret::start_of(block.clone()));
    Ok(())
}

/// Offset-zero Return: an empty block is inserted above, the caret stays at
/// the start of the original. A preceding folded heading makes the new
/// block a heading of the same level.
fn insert_before_block<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
) -> Result<BlockId, EditorError> {
    let prev = ed.tree.previous_sibling(block);
    let data = match prev.as_ref().and_then(|p| ed.tree.get(p)) {
        Some(p) if p.kind == BlockKind::Heading && p.folded => {
            let mut d = BlockData::new(BlockKind::Heading);
            d.subtype = p.subtype;
            d
        }
        _ => BlockData::paragraph(""),
    };
    let new_id = data.id.clone();
    let parent = ed
        .tree
        .parent(block)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let op = Operation::insert(data.clone()).at_slot(prev.as_ref(), &parent);
    ed.tree.insert_data(&data, &Anchor::Before(block.clone()))?;
    ed.transaction(vec![op], vec![Operation::delete(new_id.clone())])?;
    ed.caret = Some(Caret::start_of(block.clone()));
    Ok(new_id)
}

/// Default split: text after the caret moves into a fresh sibling block.
fn split_block<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    range: &TextRange,
) -> Result<BlockId, EditorError> {
    let old = ed.snapshot(block)?;
    let offsets = caret::selection_offset(&ed.tree, block, range);
    let before = split_at_utf16(&old.content, offsets.start).0.to_string();
    let after = split_at_utf16(&old.content, offsets.end).1.to_string();

    let (kind, folded, subtype) = (old.kind, old.folded, old.subtype);
    let mut data = if kind == BlockKind::Heading && folded {
        // Splitting a folded heading yields another heading of that level.
        let mut d = BlockData::new(BlockKind::Heading);
        d.subtype = subtype;
        d
    } else {
        BlockData::paragraph("")
    };
    data.content = after;
    let new_id = data.id.clone();

    {
        let b = ed
            .tree
            .get_mut(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        b.content = before;
        b.touch();
    }
    ed.tree.insert_data(&data, &Anchor::After(block.clone()))?;
    let updated = ed.snapshot(block)?;
    ed.transaction(
        vec![
            Operation::update(block.clone(), updated),
            Operation::insert(data).after(block.clone()),
        ],
        vec![
            Operation::delete(new_id.clone()),
            Operation::update(block.clone(), old),
        ],
    )?;
    ed.caret = Some(Caret::start_of(new_id.clone()));
    Ok(new_id)
}

/// Return inside a list item. Returns false when the generic handler should
/// take over instead.
fn list_enter<T: Transport>(
    ed: &mut Editor<T>,
    block: &BlockId,
    range: &TextRange,
) -> Result<bool, EditorError> {
    let item = ed
        .tree
        .parent(block)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
    let list = ed
        .tree
        .parent(&item)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(item.clone()))?;
    let content = ed.tree.get(block).map(|b| b.content.clone()).unwrap_or_default();
    let idx = ed.tree.index_in_parent(block).unwrap_or(0);
    let offsets = caret::selection_offset(&ed.tree, block, range);
    let empty = content.is_empty() || content == "\n";

    // Empty sole content: last item breaks out of the list, a middle item
    // splits it.
    if empty && idx == 0 {
        if ed.tree.next_sibling(&item).is_none() {
            let policy = ed.config.outdent;
            list::list_outdent(ed, &[item.clone()], policy)?;
            ed.caret = Some(Caret::start_of(block.clone()));
            return Ok(true);
        }
        if ed.block_id != list {
            list::break_list(ed, &item)?;
            ed.caret = Some(Caret::start_of(block.clone()));
            return Ok(true);
        }
    }

    if range.is_collapsed() && offsets.start == 0 {
        // Zoomed into this very item: swallow the event.
        if ed.block_id == item {
            return Ok(true);
        }
        let item_ref = ed
            .tree
            .get(&item)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlock(item.clone()))?;
        let list_before = ed.snapshot(&list)?;
        let new_item;
        if idx > 0 {
            // Multiple blocks with an empty trailing one: the generic
            // handler (indent path) deals with non-empty ones.
            if !empty {
                return Ok(false);
            }
            ed.tree.remove_subtree(block);
            new_item = list::gen_list_item(&item_ref, -1);
            ed.tree.insert_data(&new_item, &Anchor::After(item.clone()))?;
        } else if empty {
            new_item = list::gen_list_item(&item_ref, -1);
            ed.tree.insert_data(&new_item, &Anchor::After(item.clone()))?;
        } else {
            new_item = list::gen_list_item(&item_ref, -1);
            ed.tree.insert_data(&new_item, &Anchor::Before(item.clone()))?;
        }
        if item_ref.subtype == Some(BlockSubtype::Ordered) {
            list::update_list_order(&mut ed.tree, &list, None);
        }
        let after = ed.snapshot(&list)?;
        ed.update_transaction(&list, after, list_before)?;
        if let Some(p) = new_item.children.first() {
            ed.caret = Some(Caret::start_of(p.id.clone()));
        }
        return Ok(true);
    }

    let folded = ed.tree.get(&item).map(|b| b.folded).unwrap_or(false);
    let sublist = ed
        .tree
        .next_sibling(block)
        .filter(|n| ed.tree.get(n).map(|b| b.kind == BlockKind::List).unwrap_or(false));
    if let Some(sub) = sublist {
        if !folded {
            if offsets.end >= utf16_len(&content) {
                // End of text before a sub-list: prepend a fresh item to it.
                let item_before = ed.snapshot(&item)?;
                let first_sub_item = ed
                    .tree
                    .first_child(&sub)
                    .ok_or_else(|| EditorError::UnknownBlock(sub.clone()))?;
                let reference = ed
                    .tree
                    .get(&first_sub_item)
                    .cloned()
                    .ok_or_else(|| EditorError::UnknownBlock(first_sub_item.clone()))?;
                let new_item = list::gen_list_item(&reference, -1);
                let focus = new_item.children.first().map(|c| c.id.clone());
                ed.tree
                    .insert_data(&new_item, &Anchor::Before(first_sub_item))?;
                if reference.subtype == Some(BlockSubtype::Ordered) {
                    list::update_list_order(&mut ed.tree, &sub, None);
                }
                let after = ed.snapshot(&item)?;
                ed.update_transaction(&item, after, item_before)?;
                if let Some(f) = focus {
                    ed.caret = Some(Caret::start_of(f));
                }
                return Ok(true);
            }
            split_list_item(ed, &item, &list, block, range, true)?;
            return Ok(true);
        }
    }

    split_list_item(ed, &item, &list, block, range, false)?;
    Ok(true)
}

/// Split a list item at the caret: the text after it, and optionally the
/// trailing sub-list plus everything after, move into a fresh next item.
fn split_list_item<T: Transport>(
    ed: &mut Editor<T>,
    item: &BlockId,
    list: &BlockId,
    block: &BlockId,
    range: &TextRange,
    carry_following: bool,
) -> Result<(), EditorError> {
    let item_ref = ed
        .tree
        .get(item)
        .cloned()
        .ok_or_else(|| EditorError::UnknownBlock(item.clone()))?;
    let item_before = ed.snapshot(item)?;
    let list_before = ed.snapshot(list)?;
    let top_level = ed.tree.parent(list) == Some(ed.tree.root());
    let offsets = caret::selection_offset(&ed.tree, block, range);
    let content = ed.tree.get(block).map(|b| b.content.clone()).unwrap_or_default();
    let before = split_at_utf16(&content, offsets.start).0.to_string();
    let after = split_at_utf16(&content, offsets.end).1.to_string();

    {
        let b = ed
            .tree
            .get_mut(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        b.content = before;
        b.touch();
    }
    let mut new_item = list::gen_list_item(&item_ref, 0);
    if let Some(p) = new_item.children.first_mut() {
        p.content = after;
    }
    let focus = new_item.children.first().map(|c| c.id.clone());
    if carry_following {
        let children = ed.tree.children(item).to_vec();
        let idx = children.iter().position(|c| c == block).unwrap_or(0);
        for c in &children[idx + 1..] {
            if let Some(snap) = ed.tree.remove_subtree(c) {
                new_item.children.push(snap);
            }
        }
    }
    ed.tree.insert_data(&new_item, &Anchor::After(item.clone()))?;

    if top_level {
        let new_item_snap = ed.snapshot(&new_item.id)?;
        let item_after = ed.snapshot(item)?;
        let mut do_ops = vec![
            Operation::update(item.clone(), item_after),
            Operation::insert(new_item_snap).after(item.clone()),
        ];
        let mut undo_ops = vec![
            Operation::delete(new_item.id.clone()),
            Operation::update(item.clone(), item_before),
        ];
        if item_ref.subtype == Some(BlockSubtype::Ordered) {
            list::renumber_with_ops(&mut ed.tree, list, None, &mut do_ops, &mut undo_ops);
        }
        debug!(id = %item, "list item split");
        ed.transaction(do_ops, undo_ops)?;
    } else {
        if item_ref.subtype == Some(BlockSubtype::Ordered) {
            list::update_list_order(&mut ed.tree, list, None);
        }
        let after_list = ed.snapshot(list)?;
        debug!(id = %item, "list item split (nested)");
        ed.update_transaction(list, after_list, list_before)?;
    }
    if let Some(f) = focus {
        ed.caret = Some(Caret::start_of(f));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockTree};
    use crate::config::EditorConfig;
    use crate::transaction::RecordingTransport;
    use pretty_assertions::assert_eq;

    type TestEditor = Editor<RecordingTransport>;

    fn make_editor() -> TestEditor {
        Editor::new(
            BlockTree::new(),
            EditorConfig::default(),
            RecordingTransport::default(),
        )
    }

    fn caret_at(block: &BlockId, offset: usize) -> TextRange {
        TextRange::caret(Caret::new(block.clone(), offset))
    }

    fn add_paragraph(ed: &mut TestEditor, text: &str) -> BlockId {
        let root = ed.tree.root().clone();
        ed.tree
            .insert_block(Block::paragraph(text), &Anchor::LastChildOf(root))
            .unwrap()
    }

    fn ordered_list(ed: &mut TestEditor, texts: &[&str]) -> (BlockId, Vec<BlockId>) {
        let root = ed.tree.root().clone();
        let list = ed
            .tree
            .insert_block(Block::list(BlockSubtype::Ordered), &Anchor::LastChildOf(root))
            .unwrap();
        let mut items = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let li = ed
                .tree
                .insert_block(
                    Block::list_item(BlockSubtype::Ordered, format!("{}.", i + 1)),
                    &Anchor::LastChildOf(list.clone()),
                )
                .unwrap();
            ed.tree
                .insert_block(Block::paragraph(*text), &Anchor::LastChildOf(li.clone()))
                .unwrap();
            items.push(li);
        }
        (list, items)
    }

    #[test]
    fn selected_block_collapses_selection() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "hello");
        ed.selected = vec![p.clone()];
        assert!(enter(&mut ed, &p, &caret_at(&p, 0)).unwrap());
        assert!(ed.selected.is_empty());
        assert_eq!(ed.caret, Some(Caret::new(p, 5)));
        assert!(ed.transport.submitted.is_empty());
    }

    #[test]
    fn divider_gets_paragraph_after() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let hr = ed
            .tree
            .insert_block(Block::new(BlockKind::ThematicBreak), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        assert!(enter(&mut ed, &hr, &caret_at(&hr, 0)).unwrap());
        let top = ed.tree.children(&root).to_vec();
        assert_eq!(top.len(), 2);
        assert_eq!(ed.tree.get(&top[1]).unwrap().kind, BlockKind::Paragraph);
        assert_eq!(ed.caret, Some(Caret::start_of(top[1].clone())));
    }

    #[test]
    fn fence_opening_becomes_code_block() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "```rust");
        assert!(enter(&mut ed, &p, &caret_at(&p, 7)).unwrap());
        let b = ed.tree.get(&p).unwrap();
        assert_eq!(b.kind, BlockKind::CodeBlock);
        assert_eq!(b.content, "");
        ed.undo().unwrap();
        let b = ed.tree.get(&p).unwrap();
        assert_eq!(b.kind, BlockKind::Paragraph);
        assert_eq!(b.content, "```rust");
    }

    #[test]
    fn inline_backtick_form_stays_paragraph() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "```test`");
        assert!(enter(&mut ed, &p, &caret_at(&p, 8)).unwrap());
        // Falls through to the default split instead.
        assert_eq!(ed.tree.get(&p).unwrap().kind, BlockKind::Paragraph);
        assert_eq!(ed.tree.children(ed.tree.root()).len(), 2);
    }

    #[test]
    fn code_block_inserts_literal_newline() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let code = ed
            .tree
            .insert_block(Block::code_block("fn x"), &Anchor::LastChildOf(root))
            .unwrap();
        assert!(enter(&mut ed, &code, &caret_at(&code, 4)).unwrap());
        assert_eq!(ed.tree.get(&code).unwrap().content, "fn x\n\n");
        assert_eq!(ed.caret, Some(Caret::new(code.clone(), 5)));

        assert!(enter(&mut ed, &code, &caret_at(&code, 1)).unwrap());
        assert_eq!(ed.tree.get(&code).unwrap().content, "f\nn x\n\n");
    }

    #[test]
    fn empty_quote_tail_breaks_out() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let bq = ed
            .tree
            .insert_block(Block::new(BlockKind::Blockquote), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let text = ed
            .tree
            .insert_block(Block::paragraph("quoted"), &Anchor::LastChildOf(bq.clone()))
            .unwrap();
        let tail = ed
            .tree
            .insert_block(Block::paragraph(""), &Anchor::LastChildOf(bq.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        assert!(enter(&mut ed, &tail, &caret_at(&tail, 0)).unwrap());
        assert_eq!(ed.tree.children(&root).to_vec(), vec![bq.clone(), tail.clone()]);
        assert_eq!(ed.tree.children(&bq).to_vec(), vec![text]);
        assert_eq!(ed.caret, Some(Caret::start_of(tail.clone())));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn fully_empty_quote_collapses_to_paragraph() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let bq = ed
            .tree
            .insert_block(Block::new(BlockKind::Blockquote), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph(""), &Anchor::LastChildOf(bq.clone()))
            .unwrap();
        let before = ed.tree.snapshot(&root).unwrap();

        assert!(enter(&mut ed, &p, &caret_at(&p, 0)).unwrap());
        assert!(!ed.tree.contains(&bq));
        assert_eq!(ed.tree.children(&root).to_vec(), vec![p]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn offset_zero_inserts_empty_block_above() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "hello");
        assert!(enter(&mut ed, &p, &caret_at(&p, 0)).unwrap());
        let root = ed.tree.root().clone();
        let top = ed.tree.children(&root).to_vec();
        assert_eq!(top.len(), 2);
        assert_eq!(top[1], p);
        assert_eq!(ed.tree.get(&top[0]).unwrap().content, "");
        // The caret does not move.
        assert_eq!(ed.caret, Some(Caret::start_of(p)));
    }

    #[test]
    fn split_moves_tail_to_new_block() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "hello world");
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        assert!(enter(&mut ed, &p, &caret_at(&p, 5)).unwrap());
        let top = ed.tree.children(&root).to_vec();
        assert_eq!(ed.tree.get(&p).unwrap().content, "hello");
        assert_eq!(ed.tree.get(&top[1]).unwrap().content, " world");
        assert_eq!(ed.caret, Some(Caret::start_of(top[1].clone())));

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn split_discards_selected_text() {
        let mut ed = make_editor();
        let p = add_paragraph(&mut ed, "hello world");
        let range = TextRange::new(Caret::new(p.clone(), 5), Caret::new(p.clone(), 8));
        assert!(enter(&mut ed, &p, &range).unwrap());
        let root = ed.tree.root().clone();
        let top = ed.tree.children(&root).to_vec();
        assert_eq!(ed.tree.get(&p).unwrap().content, "hello");
        assert_eq!(ed.tree.get(&top[1]).unwrap().content, "rld");
    }

    #[test]
    fn end_of_last_item_appends_numbered_sibling() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["one", "two"]);
        let p2 = ed.tree.first_child(&items[1]).unwrap();
        assert!(enter(&mut ed, &p2, &caret_at(&p2, 3)).unwrap());
        let li = ed.tree.children(&list).to_vec();
        assert_eq!(li.len(), 3);
        assert_eq!(ed.tree.get(&li[2]).unwrap().marker, "3.");
        let focus = ed.tree.first_child(&li[2]).unwrap();
        assert_eq!(ed.caret, Some(Caret::start_of(focus)));
    }

    #[test]
    fn mid_item_split_renumbers() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["alpha", "beta", "gamma"]);
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();
        let p2 = ed.tree.first_child(&items[1]).unwrap();

        assert!(enter(&mut ed, &p2, &caret_at(&p2, 2)).unwrap());
        let li = ed.tree.children(&list).to_vec();
        assert_eq!(li.len(), 4);
        assert_eq!(ed.tree.get(&p2).unwrap().content, "be");
        let new_p = ed.tree.first_child(&li[2]).unwrap();
        assert_eq!(ed.tree.get(&new_p).unwrap().content, "ta");
        let markers: Vec<_> = li
            .iter()
            .map(|i| ed.tree.get(i).unwrap().marker.clone())
            .collect();
        assert_eq!(markers, vec!["1.", "2.", "3.", "4."]);

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }

    #[test]
    fn empty_last_item_outdents() {
        let mut ed = make_editor();
        let root = ed.tree.root().clone();
        let list = ed
            .tree
            .insert_block(Block::list(BlockSubtype::Unordered), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let li1 = ed
            .tree
            .insert_block(
                Block::list_item(BlockSubtype::Unordered, "*"),
                &Anchor::LastChildOf(list.clone()),
            )
            .unwrap();
        ed.tree
            .insert_block(Block::paragraph("kept"), &Anchor::LastChildOf(li1))
            .unwrap();
        let li2 = ed
            .tree
            .insert_block(
                Block::list_item(BlockSubtype::Unordered, "*"),
                &Anchor::LastChildOf(list.clone()),
            )
            .unwrap();
        let empty = ed
            .tree
            .insert_block(Block::paragraph(""), &Anchor::LastChildOf(li2.clone()))
            .unwrap();

        assert!(enter(&mut ed, &empty, &caret_at(&empty, 0)).unwrap());
        // The empty item left the list; its paragraph is now top level.
        assert!(!ed.tree.contains(&li2));
        assert_eq!(ed.tree.children(&root).to_vec(), vec![list.clone(), empty]);
        assert_eq!(ed.tree.children(&list).len(), 1);
    }

    #[test]
    fn empty_middle_item_breaks_list() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["one", "", "three"]);
        let empty = ed.tree.first_child(&items[1]).unwrap();

        assert!(enter(&mut ed, &empty, &caret_at(&empty, 0)).unwrap());
        let root = ed.tree.root().clone();
        let top = ed.tree.children(&root).to_vec();
        // list [one], the freed paragraph, list [three].
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], list);
        assert_eq!(top[1], empty);
        assert_eq!(ed.tree.get(&top[2]).unwrap().kind, BlockKind::List);
        assert_eq!(ed.tree.children(&list).len(), 1);
    }

    #[test]
    fn end_of_text_before_sublist_prepends_item() {
        let mut ed = make_editor();
        let (_, items) = ordered_list(&mut ed, &["parent", "child"]);
        // Nest item 2 under item 1 to give it a trailing sub-list.
        list::list_indent(&mut ed, &[items[1].clone()]).unwrap();
        let p1 = ed.tree.first_child(&items[0]).unwrap();
        let sub = ed.tree.last_child(&items[0]).unwrap();
        assert_eq!(ed.tree.get(&sub).unwrap().kind, BlockKind::List);

        assert!(enter(&mut ed, &p1, &caret_at(&p1, 6)).unwrap());
        let sub_items = ed.tree.children(&sub).to_vec();
        assert_eq!(sub_items.len(), 2);
        // New empty item is first; the old child item follows, renumbered.
        assert_eq!(ed.tree.subtree_text(&sub_items[0]), "");
        assert_eq!(ed.tree.get(&sub_items[0]).unwrap().marker, "1.");
        assert_eq!(ed.tree.get(&sub_items[1]).unwrap().marker, "2.");
    }

    #[test]
    fn mid_text_split_carries_sublist() {
        let mut ed = make_editor();
        let (list, items) = ordered_list(&mut ed, &["parent", "child"]);
        list::list_indent(&mut ed, &[items[1].clone()]).unwrap();
        let p1 = ed.tree.first_child(&items[0]).unwrap();
        let sub = ed.tree.last_child(&items[0]).unwrap();
        let root = ed.tree.root().clone();
        let before = ed.tree.snapshot(&root).unwrap();

        assert!(enter(&mut ed, &p1, &caret_at(&p1, 3)).unwrap());
        let li = ed.tree.children(&list).to_vec();
        assert_eq!(li.len(), 2);
        assert_eq!(ed.tree.get(&p1).unwrap().content, "par");
        // The sub-list travelled into the new item.
        assert_eq!(ed.tree.last_child(&li[1]), Some(sub));
        let new_p = ed.tree.first_child(&li[1]).unwrap();
        assert_eq!(ed.tree.get(&new_p).unwrap().content, "ent");

        ed.undo().unwrap();
        assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    }
}
