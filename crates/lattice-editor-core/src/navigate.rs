//! Tree navigation.
//!
//! Pure reads over the arena. A lookup returning `None` is a normal outcome
//! (the first block has no previous sibling); nothing here mutates state.

use crate::block::{BlockKind, BlockTree};
use crate::id::BlockId;

/// Previous block in document order at the same or an enclosing level:
/// the previous sibling if there is one, else the nearest ancestor's
/// previous sibling.
pub fn previous_block(tree: &BlockTree, id: &str) -> Option<BlockId> {
    let mut cur = BlockId::from(id);
    loop {
        if let Some(prev) = tree.previous_sibling(&cur) {
            return Some(prev);
        }
        let parent = tree.parent(&cur)?;
        if parent == tree.root() {
            return None;
        }
        cur = parent.clone();
    }
}

/// Mirror of [`previous_block`].
pub fn next_block(tree: &BlockTree, id: &str) -> Option<BlockId> {
    let mut cur = BlockId::from(id);
    loop {
        if let Some(next) = tree.next_sibling(&cur) {
            return Some(next);
        }
        let parent = tree.parent(&cur)?;
        if parent == tree.root() {
            return None;
        }
        cur = parent.clone();
    }
}

/// First content block in a subtree: the first preorder descendant that is
/// not a container, not descending into embeds. Falls back to `id` itself.
pub fn first_block(tree: &BlockTree, id: &str) -> BlockId {
    descend(tree, id, false)
}

/// Last content block in a subtree.
pub fn last_block(tree: &BlockTree, id: &str) -> BlockId {
    descend(tree, id, true)
}

fn descend(tree: &BlockTree, id: &str, from_end: bool) -> BlockId {
    let mut cur = BlockId::from(id);
    loop {
        let block = match tree.get(&cur) {
            Some(b) => b,
            None => return cur,
        };
        if !block.kind.is_container() || block.kind == BlockKind::QueryEmbed {
            return cur;
        }
        let next = if from_end {
            tree.last_child(&cur)
        } else {
            tree.first_child(&cur)
        };
        match next {
            Some(child) => cur = child,
            None => return cur,
        }
    }
}

/// Descend through list/list-item/quote/super-block wrappers to the first
/// non-container block.
pub fn no_container_block(tree: &BlockTree, id: &str) -> Option<BlockId> {
    let mut cur = BlockId::from(id);
    loop {
        let block = tree.get(&cur)?;
        match block.kind {
            BlockKind::List | BlockKind::ListItem | BlockKind::Blockquote | BlockKind::SuperBlock => {
                cur = tree.first_child(&cur)?;
            }
            _ => return Some(cur),
        }
    }
}

/// Nearest ancestor of the given kind, self excluded.
pub fn nearest_ancestor(tree: &BlockTree, id: &str, kind: BlockKind) -> Option<BlockId> {
    let mut cur = tree.parent(id)?;
    loop {
        let block = tree.get(cur)?;
        if block.kind == kind {
            return Some(cur.clone());
        }
        cur = tree.parent(cur)?;
    }
}

/// The list item enclosing a block, if any.
pub fn enclosing_list_item(tree: &BlockTree, id: &str) -> Option<BlockId> {
    nearest_ancestor(tree, id, BlockKind::ListItem)
}

/// Nearest folded ancestor, self excluded.
pub fn folded_ancestor(tree: &BlockTree, id: &str) -> Option<BlockId> {
    let mut cur = tree.parent(id)?;
    loop {
        let block = tree.get(cur)?;
        if block.folded {
            return Some(cur.clone());
        }
        cur = tree.parent(cur)?;
    }
}

/// The topmost ancestor for which this block is the only structural content:
/// walks up through single-child quote/super-block wrappers, single-block
/// list items, and single-item lists. Used to pick the granularity of
/// move/delete gestures.
pub fn top_alone_block(tree: &BlockTree, id: &str) -> BlockId {
    let mut cur = BlockId::from(id);
    loop {
        let parent = match tree.parent(&cur) {
            Some(p) if p != tree.root() => p.clone(),
            _ => return cur,
        };
        let Some(parent_block) = tree.get(&parent) else {
            return cur;
        };
        let alone = match parent_block.kind {
            BlockKind::Blockquote | BlockKind::SuperBlock | BlockKind::ListItem | BlockKind::List => {
                tree.children(&parent).len() == 1
            }
            _ => false,
        };
        if !alone {
            return cur;
        }
        cur = parent;
    }
}

/// The topmost ancestor whose whole subtree has no text, stopping below the
/// document root. Backspace escalates an empty block's removal to this
/// wrapper.
pub fn top_empty_block(tree: &BlockTree, id: &str) -> BlockId {
    let mut cur = BlockId::from(id);
    loop {
        let parent = match tree.parent(&cur) {
            Some(p) if p != tree.root() => p.clone(),
            _ => return cur,
        };
        if !tree.subtree_text(&parent).is_empty() {
            return cur;
        }
        cur = parent;
    }
}
