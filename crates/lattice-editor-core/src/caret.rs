//! Logical caret and selection.
//!
//! A caret is a block id plus a UTF-16 code-unit offset into that block's
//! content. Gestures compute the intended caret before rewriting a subtree
//! and re-resolve it against the new tree afterwards, which replaces the
//! rendered-view trick of parking a sentinel node in the markup.

use crate::block::BlockTree;
use crate::id::BlockId;
use crate::navigate;

/// UTF-16 code-unit length, the offset unit the selection contract uses.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Byte index of a UTF-16 code-unit offset; offsets past the end clamp, and
/// an offset landing inside a surrogate pair rounds down to the pair's start.
pub fn byte_of_utf16(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for (i, ch) in s.char_indices() {
        if units >= offset {
            return i;
        }
        units += ch.len_utf16();
        if units > offset {
            return i;
        }
    }
    s.len()
}

/// Split text at a UTF-16 code-unit offset.
pub fn split_at_utf16(s: &str, offset: usize) -> (&str, &str) {
    s.split_at(byte_of_utf16(s, offset))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caret {
    pub block: BlockId,
    pub offset: usize,
}

impl Caret {
    pub fn new(block: impl Into<BlockId>, offset: usize) -> Self {
        Self {
            block: block.into(),
            offset,
        }
    }

    pub fn start_of(block: impl Into<BlockId>) -> Self {
        Self::new(block, 0)
    }

    pub fn end_of(tree: &BlockTree, block: impl Into<BlockId>) -> Self {
        let block = block.into();
        let offset = tree.get(&block).map(|b| utf16_len(&b.content)).unwrap_or(0);
        Self { block, offset }
    }
}

/// A text range between two carets; collapsed when start equals end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    pub start: Caret,
    pub end: Caret,
}

impl TextRange {
    pub fn caret(at: Caret) -> Self {
        Self {
            start: at.clone(),
            end: at,
        }
    }

    pub fn new(start: Caret, end: Caret) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Range boundary offsets relative to one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionOffset {
    pub start: usize,
    pub end: usize,
}

/// The active range if it still points into the tree; otherwise a collapsed
/// caret at the first editable point. Never fails, even on an empty tree.
pub fn editor_range(tree: &BlockTree, current: Option<&TextRange>) -> TextRange {
    if let Some(range) = current {
        if tree.contains(&range.start.block) && tree.contains(&range.end.block) {
            return TextRange::new(
                restore_caret(tree, &range.start),
                restore_caret(tree, &range.end),
            );
        }
    }
    let first = navigate::first_block(tree, tree.root());
    let target = focus_block(tree, &first, true)
        .unwrap_or_else(|| Caret::start_of(tree.root().clone()));
    TextRange::caret(target)
}

/// Offsets of a range's boundaries relative to `block`'s content. Boundaries
/// outside the block clamp to the side of the block they fall on; a range
/// that does not touch the block at all yields `{0, 0}`.
pub fn selection_offset(tree: &BlockTree, block: &str, range: &TextRange) -> SelectionOffset {
    use std::cmp::Ordering;
    let len = tree.get(block).map(|b| utf16_len(&b.content)).unwrap_or(0);
    let clamp = |caret: &Caret, past_is_len: bool| -> Option<usize> {
        if caret.block.as_str() == block {
            return Some(caret.offset.min(len));
        }
        match tree.position_cmp(&caret.block, block)? {
            Ordering::Less => Some(0),
            Ordering::Greater | Ordering::Equal => Some(if past_is_len { len } else { 0 }),
        }
    };
    let start = clamp(&range.start, false);
    let end = clamp(&range.end, true);
    match (start, end) {
        (Some(s), Some(e)) if s != 0 || e != 0 => {
            // A range entirely before or entirely after the block does not
            // intersect it.
            let starts_after = range.start.block.as_str() != block
                && tree.position_cmp(&range.start.block, block) == Some(Ordering::Greater);
            if starts_after {
                SelectionOffset::default()
            } else {
                SelectionOffset { start: s, end: e }
            }
        }
        _ => SelectionOffset::default(),
    }
}

/// Re-resolve a caret after a subtree rewrite: clamp to the block's new
/// length, or fall back to the nearest editable point when the block is gone.
pub fn restore_caret(tree: &BlockTree, mark: &Caret) -> Caret {
    if let Some(block) = tree.get(&mark.block) {
        if block.kind.is_editable() {
            return Caret::new(mark.block.clone(), mark.offset.min(utf16_len(&block.content)));
        }
    }
    let first = navigate::first_block(tree, tree.root());
    focus_block(tree, &first, true).unwrap_or_else(|| Caret::start_of(tree.root().clone()))
}

/// Canonical caret for focusing a block: containers delegate to their
/// first/last editable descendant; non-editable leaves yield `None` and the
/// caller falls back.
pub fn focus_block(tree: &BlockTree, id: &str, to_start: bool) -> Option<Caret> {
    let target = if to_start {
        navigate::first_block(tree, id)
    } else {
        navigate::last_block(tree, id)
    };
    let block = tree.get(&target)?;
    if !block.kind.is_editable() {
        return None;
    }
    Some(if to_start {
        Caret::start_of(target)
    } else {
        Caret::new(target.clone(), utf16_len(&block.content))
    })
}

/// Result of a select-all gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectAll {
    /// Select the full text of the caret's block.
    Text(TextRange),
    /// Escalate to selecting every top-level block.
    Blocks(Vec<BlockId>),
}

/// Two-stage select-all. Escalation is detected by comparing the current
/// offsets against the block's full text length, not by a flag.
pub fn select_all(tree: &BlockTree, range: &TextRange) -> SelectAll {
    let block = &range.start.block;
    let len = tree.get(block).map(|b| utf16_len(&b.content)).unwrap_or(0);
    let offsets = selection_offset(tree, block, range);
    let fully_selected = range.start.block == range.end.block
        && offsets.start == 0
        && offsets.end == len;
    if fully_selected {
        SelectAll::Blocks(tree.children(tree.root()).to_vec())
    } else {
        SelectAll::Text(TextRange::new(
            Caret::start_of(block.clone()),
            Caret::new(block.clone(), len),
        ))
    }
}
