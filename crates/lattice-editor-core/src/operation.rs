//! Operation wire shape.
//!
//! The remote store consumes flat operation lists. Each operation addresses
//! a block by id and, for insert/move, anchors its position with
//! `previousID` xor `nextID`, or `parentID` alone for "first child of".
//! Inside the crate positions are the tagged [`Anchor`] variant; the loose
//! wire fields exist only at this boundary.

use serde::{Deserialize, Serialize};

use crate::block::{BlockData, BlockTree};
use crate::id::BlockId;

/// Tree position, tagged. Translated to wire fields via [`Operation::at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Before(BlockId),
    After(BlockId),
    FirstChildOf(BlockId),
    LastChildOf(BlockId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Update,
    Delete,
    Move,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub action: Action,
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BlockData>,
    #[serde(rename = "previousID", default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<BlockId>,
    #[serde(rename = "nextID", default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<BlockId>,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BlockId>,
}

impl Operation {
    fn bare(action: Action, id: BlockId) -> Self {
        Self {
            action,
            id,
            data: None,
            previous_id: None,
            next_id: None,
            parent_id: None,
        }
    }

    /// Insert a serialized subtree; the operation id is the payload's root id.
    pub fn insert(data: BlockData) -> Self {
        let mut op = Self::bare(Action::Insert, data.id.clone());
        op.data = Some(data);
        op
    }

    pub fn update(id: impl Into<BlockId>, data: BlockData) -> Self {
        let mut op = Self::bare(Action::Update, id.into());
        op.data = Some(data);
        op
    }

    pub fn delete(id: impl Into<BlockId>) -> Self {
        Self::bare(Action::Delete, id.into())
    }

    pub fn mov(id: impl Into<BlockId>) -> Self {
        Self::bare(Action::Move, id.into())
    }

    pub fn after(mut self, previous: impl Into<BlockId>) -> Self {
        self.previous_id = Some(previous.into());
        self
    }

    pub fn before(mut self, next: impl Into<BlockId>) -> Self {
        self.next_id = Some(next.into());
        self
    }

    pub fn under(mut self, parent: impl Into<BlockId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    /// Anchor after a previous sibling when one exists, else as first child
    /// of `parent`. The shape most insert inverses need.
    pub fn at_slot(self, prev: Option<&BlockId>, parent: &BlockId) -> Self {
        match prev {
            Some(p) => self.after(p.clone()),
            None => self.under(parent.clone()),
        }
    }

    /// Translate a tagged anchor to the wire fields. `LastChildOf` resolves
    /// against the tree's current child list.
    pub fn at(self, anchor: &Anchor, tree: &BlockTree) -> Self {
        match anchor {
            Anchor::After(a) => self.after(a.clone()),
            Anchor::Before(b) => self.before(b.clone()),
            Anchor::FirstChildOf(p) => self.under(p.clone()),
            Anchor::LastChildOf(p) => match tree.last_child(p) {
                Some(last) => self.after(last),
                None => self.under(p.clone()),
            },
        }
    }
}

/// A committed gesture: the forward list and its stored inverse.
///
/// The inverse is stored already ordered for replay; undo applies it front
/// to back without re-reversing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationPair {
    pub do_operations: Vec<Operation>,
    pub undo_operations: Vec<Operation>,
}

impl OperationPair {
    pub fn new(do_operations: Vec<Operation>, undo_operations: Vec<Operation>) -> Self {
        Self {
            do_operations,
            undo_operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockTree};
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_key_names() {
        let op = Operation::mov("20240101120000-abcdefg").after("20240101120000-hijklmn");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "move",
                "id": "20240101120000-abcdefg",
                "previousID": "20240101120000-hijklmn",
            })
        );
    }

    #[test]
    fn absent_fields_omitted() {
        let op = Operation::delete("20240101120000-abcdefg");
        let json = serde_json::to_string(&op).unwrap();
        assert!(!json.contains("data"));
        assert!(!json.contains("previousID"));
        assert!(!json.contains("nextID"));
        assert!(!json.contains("parentID"));
    }

    #[test]
    fn round_trip() {
        let op = Operation::insert(BlockData::paragraph("hi")).under("20240101120000-abcdefg");
        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn last_child_anchor_resolves_to_previous() {
        let mut tree = BlockTree::new();
        let root = tree.root().clone();
        let a = tree
            .insert_block(Block::paragraph("a"), &Anchor::LastChildOf(root.clone()))
            .unwrap();
        let op = Operation::mov("x").at(&Anchor::LastChildOf(root.clone()), &tree);
        assert_eq!(op.previous_id, Some(a));
        let empty = tree
            .insert_block(Block::new(crate::block::BlockKind::Blockquote), &Anchor::LastChildOf(root))
            .unwrap();
        let op = Operation::mov("x").at(&Anchor::LastChildOf(empty.clone()), &tree);
        assert_eq!(op.parent_id, Some(empty));
        assert_eq!(op.previous_id, None);
    }
}
