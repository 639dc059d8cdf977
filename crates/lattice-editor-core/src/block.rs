//! The block arena.
//!
//! A document is a tree of typed blocks keyed by stable id. `BlockTree` owns
//! every block in a map and threads parent/child links through ids, so all
//! structural reads and writes go through an explicit indexed model rather
//! than a rendered view. `BlockData` is the serializable snapshot of a
//! subtree and doubles as the `data` payload of insert/update operations;
//! `BlockTree::apply` replays wire operations, which is the single code path
//! undo and redo go through.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::id::{self, BlockId};
use crate::operation::{Action, Anchor, Operation};

/// Semantic block type, serialized with the store's node-type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "NodeDocument")]
    Document,
    #[serde(rename = "NodeParagraph")]
    Paragraph,
    #[serde(rename = "NodeHeading")]
    Heading,
    #[serde(rename = "NodeList")]
    List,
    #[serde(rename = "NodeListItem")]
    ListItem,
    #[serde(rename = "NodeBlockquote")]
    Blockquote,
    #[serde(rename = "NodeSuperBlock")]
    SuperBlock,
    #[serde(rename = "NodeCodeBlock")]
    CodeBlock,
    #[serde(rename = "NodeMathBlock")]
    MathBlock,
    #[serde(rename = "NodeTable")]
    Table,
    #[serde(rename = "NodeThematicBreak")]
    ThematicBreak,
    #[serde(rename = "NodeHTMLBlock")]
    HtmlBlock,
    #[serde(rename = "NodeBlockQueryEmbed")]
    QueryEmbed,
    #[serde(rename = "NodeIFrame")]
    Iframe,
    #[serde(rename = "NodeWidget")]
    Widget,
    #[serde(rename = "NodeVideo")]
    Video,
    #[serde(rename = "NodeAudio")]
    Audio,
}

impl BlockKind {
    /// Containers hold child blocks instead of their own text.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Document | Self::List | Self::ListItem | Self::Blockquote | Self::SuperBlock
        )
    }

    /// Blocks whose content can host a text caret.
    pub fn is_editable(self) -> bool {
        !matches!(
            self,
            Self::QueryEmbed
                | Self::ThematicBreak
                | Self::MathBlock
                | Self::HtmlBlock
                | Self::Iframe
                | Self::Widget
                | Self::Video
                | Self::Audio
        )
    }
}

/// Block subtype, the wire `data-subtype` attribute: `u`/`o`/`t` for lists,
/// `h1`..`h6` for headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSubtype {
    Unordered,
    Ordered,
    Task,
    Heading(u8),
}

impl BlockSubtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unordered => "u",
            Self::Ordered => "o",
            Self::Task => "t",
            Self::Heading(1) => "h1",
            Self::Heading(2) => "h2",
            Self::Heading(3) => "h3",
            Self::Heading(4) => "h4",
            Self::Heading(5) => "h5",
            Self::Heading(_) => "h6",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "u" => Some(Self::Unordered),
            "o" => Some(Self::Ordered),
            "t" => Some(Self::Task),
            "h1" => Some(Self::Heading(1)),
            "h2" => Some(Self::Heading(2)),
            "h3" => Some(Self::Heading(3)),
            "h4" => Some(Self::Heading(4)),
            "h5" => Some(Self::Heading(5)),
            "h6" => Some(Self::Heading(6)),
            _ => None,
        }
    }
}

impl Serialize for BlockSubtype {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockSubtype {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = SmolStr::deserialize(deserializer)?;
        Self::from_str(&s).ok_or_else(|| serde::de::Error::custom(format!("bad subtype: {s}")))
    }
}

/// Super-block layout, the wire `data-sb-layout` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SbLayout {
    Row,
    Col,
}

/// A node in the live tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub subtype: Option<BlockSubtype>,
    /// List-item marker text (`*`, `3.`); empty elsewhere.
    pub marker: SmolStr,
    pub layout: Option<SbLayout>,
    pub folded: bool,
    /// Task list items only.
    pub checked: bool,
    pub content: String,
    pub updated: SmolStr,
    /// Embeds cache their rendered result until a structural change moves them.
    pub render_cached: bool,
    pub(crate) parent: Option<BlockId>,
    pub(crate) children: Vec<BlockId>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: id::new_block_id(),
            kind,
            subtype: None,
            marker: SmolStr::default(),
            layout: None,
            folded: false,
            checked: false,
            content: String::new(),
            updated: id::timestamp(),
            render_cached: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        let mut b = Self::new(BlockKind::Paragraph);
        b.content = content.into();
        b
    }

    pub fn heading(level: u8, content: impl Into<String>) -> Self {
        let mut b = Self::new(BlockKind::Heading);
        b.subtype = Some(BlockSubtype::Heading(level));
        b.content = content.into();
        b
    }

    pub fn list(subtype: BlockSubtype) -> Self {
        let mut b = Self::new(BlockKind::List);
        b.subtype = Some(subtype);
        b
    }

    pub fn list_item(subtype: BlockSubtype, marker: impl Into<SmolStr>) -> Self {
        let mut b = Self::new(BlockKind::ListItem);
        b.subtype = Some(subtype);
        b.marker = marker.into();
        b
    }

    pub fn super_block(layout: SbLayout) -> Self {
        let mut b = Self::new(BlockKind::SuperBlock);
        b.layout = Some(layout);
        b
    }

    pub fn code_block(content: impl Into<String>) -> Self {
        let mut b = Self::new(BlockKind::CodeBlock);
        b.content = content.into();
        b
    }

    pub fn touch(&mut self) {
        self.updated = id::timestamp();
    }

    fn from_data(data: &BlockData) -> Self {
        Self {
            id: data.id.clone(),
            kind: data.kind,
            subtype: data.subtype,
            marker: data.marker.clone(),
            layout: data.layout,
            folded: data.folded,
            checked: data.checked,
            content: data.content.clone(),
            updated: data.updated.clone(),
            render_cached: false,
            parent: None,
            children: Vec::new(),
        }
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Serialized snapshot of a block subtree; the `data` payload of
/// insert/update operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<BlockSubtype>,
    #[serde(default, skip_serializing_if = "SmolStr::is_empty")]
    pub marker: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<SbLayout>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub folded: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    pub updated: SmolStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockData>,
}

impl BlockData {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: id::new_block_id(),
            kind,
            subtype: None,
            marker: SmolStr::default(),
            layout: None,
            folded: false,
            checked: false,
            content: String::new(),
            updated: id::timestamp(),
            children: Vec::new(),
        }
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        let mut d = Self::new(BlockKind::Paragraph);
        d.content = content.into();
        d
    }

    pub fn with_children(mut self, children: Vec<BlockData>) -> Self {
        self.children = children;
        self
    }
}

/// The arena: every block of one open document, keyed by id.
#[derive(Debug, Clone)]
pub struct BlockTree {
    root: BlockId,
    blocks: HashMap<BlockId, Block>,
}

impl BlockTree {
    pub fn new() -> Self {
        let root = Block::new(BlockKind::Document);
        let root_id = root.id.clone();
        let mut blocks = HashMap::new();
        blocks.insert(root_id.clone(), root);
        Self {
            root: root_id,
            blocks,
        }
    }

    pub fn root(&self) -> &BlockId {
        &self.root
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn parent(&self, id: &str) -> Option<&BlockId> {
        self.blocks.get(id).and_then(|b| b.parent.as_ref())
    }

    pub fn children(&self, id: &str) -> &[BlockId] {
        self.blocks.get(id).map(|b| b.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: &str) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| c == id)
    }

    pub fn previous_sibling(&self, id: &str) -> Option<BlockId> {
        let parent = self.parent(id)?;
        let idx = self.children(parent).iter().position(|c| c == id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i].clone())
    }

    pub fn next_sibling(&self, id: &str) -> Option<BlockId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|c| c == id)?;
        siblings.get(idx + 1).cloned()
    }

    pub fn first_child(&self, id: &str) -> Option<BlockId> {
        self.children(id).first().cloned()
    }

    pub fn last_child(&self, id: &str) -> Option<BlockId> {
        self.children(id).last().cloned()
    }

    /// Whether `ancestor` lies on `id`'s parent chain (self excluded).
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Preorder walk of a subtree, self included.
    pub fn preorder(&self, id: &str) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack: Vec<BlockId> = match self.blocks.get(id) {
            Some(b) => vec![b.id.clone()],
            None => return out,
        };
        while let Some(cur) = stack.pop() {
            for child in self.children(&cur).iter().rev() {
                stack.push(child.clone());
            }
            out.push(cur);
        }
        out
    }

    /// Concatenated content of a subtree in document order.
    pub fn subtree_text(&self, id: &str) -> String {
        let mut out = String::new();
        for b in self.preorder(id) {
            if let Some(block) = self.get(&b) {
                out.push_str(&block.content);
            }
        }
        out
    }

    /// Document-order comparison of two blocks by their root paths.
    pub fn position_cmp(&self, a: &str, b: &str) -> Option<std::cmp::Ordering> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        Some(self.root_path(a).cmp(&self.root_path(b)))
    }

    fn root_path(&self, id: &str) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = SmolStr::from(id);
        while let Some(idx) = self.index_in_parent(&cur) {
            path.push(idx);
            cur = self.parent(&cur).cloned().unwrap_or_else(|| self.root.clone());
        }
        path.reverse();
        path
    }

    /// Snapshot a subtree into its serializable form.
    pub fn snapshot(&self, id: &str) -> Option<BlockData> {
        let block = self.get(id)?;
        Some(BlockData {
            id: block.id.clone(),
            kind: block.kind,
            subtype: block.subtype,
            marker: block.marker.clone(),
            layout: block.layout,
            folded: block.folded,
            checked: block.checked,
            content: block.content.clone(),
            updated: block.updated.clone(),
            children: block
                .children
                .iter()
                .filter_map(|c| self.snapshot(c))
                .collect(),
        })
    }

    fn resolve(&self, anchor: &Anchor) -> Result<(BlockId, usize), EditorError> {
        match anchor {
            Anchor::After(a) => {
                let parent = self
                    .parent(a)
                    .cloned()
                    .ok_or_else(|| EditorError::UnknownBlock(a.clone()))?;
                let idx = self
                    .children(&parent)
                    .iter()
                    .position(|c| c == a)
                    .ok_or_else(|| EditorError::UnknownBlock(a.clone()))?;
                Ok((parent, idx + 1))
            }
            Anchor::Before(b) => {
                let parent = self
                    .parent(b)
                    .cloned()
                    .ok_or_else(|| EditorError::UnknownBlock(b.clone()))?;
                let idx = self
                    .children(&parent)
                    .iter()
                    .position(|c| c == b)
                    .ok_or_else(|| EditorError::UnknownBlock(b.clone()))?;
                Ok((parent, idx))
            }
            Anchor::FirstChildOf(p) => {
                if !self.contains(p) {
                    return Err(EditorError::UnknownBlock(p.clone()));
                }
                Ok((p.clone(), 0))
            }
            Anchor::LastChildOf(p) => {
                if !self.contains(p) {
                    return Err(EditorError::UnknownBlock(p.clone()));
                }
                Ok((p.clone(), self.children(p).len()))
            }
        }
    }

    fn attach_at(&mut self, id: &BlockId, parent: BlockId, index: usize) {
        let index = index.min(self.children(&parent).len());
        if let Some(p) = self.blocks.get_mut(parent.as_str()) {
            p.children.insert(index, id.clone());
        }
        if let Some(b) = self.blocks.get_mut(id.as_str()) {
            b.parent = Some(parent);
        }
    }

    fn detach(&mut self, id: &str) -> Result<(BlockId, usize), EditorError> {
        let parent = self
            .parent(id)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlock(SmolStr::from(id)))?;
        let idx = self
            .children(&parent)
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| EditorError::UnknownBlock(SmolStr::from(id)))?;
        if let Some(p) = self.blocks.get_mut(parent.as_str()) {
            p.children.remove(idx);
        }
        if let Some(b) = self.blocks.get_mut(id) {
            b.parent = None;
        }
        Ok((parent, idx))
    }

    /// Insert a single childless block at an anchor.
    pub fn insert_block(&mut self, block: Block, anchor: &Anchor) -> Result<BlockId, EditorError> {
        if self.contains(&block.id) {
            return Err(EditorError::BlockExists(block.id.clone()));
        }
        let id = block.id.clone();
        let (parent, idx) = self.resolve(anchor)?;
        self.blocks.insert(id.clone(), block);
        self.attach_at(&id, parent, idx);
        Ok(id)
    }

    /// Materialize a serialized subtree at an anchor.
    pub fn insert_data(&mut self, data: &BlockData, anchor: &Anchor) -> Result<(), EditorError> {
        if self.contains(&data.id) {
            return Err(EditorError::BlockExists(data.id.clone()));
        }
        let (parent, idx) = self.resolve(anchor)?;
        self.register(data);
        self.attach_at(&data.id, parent, idx);
        Ok(())
    }

    fn register(&mut self, data: &BlockData) {
        let mut block = Block::from_data(data);
        block.children = data.children.iter().map(|c| c.id.clone()).collect();
        self.blocks.insert(block.id.clone(), block);
        for child in &data.children {
            self.register(child);
            if let Some(b) = self.blocks.get_mut(child.id.as_str()) {
                b.parent = Some(data.id.clone());
            }
        }
    }

    /// Detach a subtree and reattach it at an anchor.
    pub fn move_block(&mut self, id: &str, anchor: &Anchor) -> Result<(), EditorError> {
        if id == self.root.as_str() {
            return Err(EditorError::InvalidAnchor {
                id: self.root.clone(),
                reason: "cannot move the document root",
            });
        }
        let target = match anchor {
            Anchor::After(t) | Anchor::Before(t) | Anchor::FirstChildOf(t) | Anchor::LastChildOf(t) => t,
        };
        if target.as_str() == id || self.is_ancestor(id, target) {
            return Err(EditorError::InvalidAnchor {
                id: SmolStr::from(id),
                reason: "anchor lies inside the moved subtree",
            });
        }
        self.detach(id)?;
        let (parent, idx) = self.resolve(anchor)?;
        let id = SmolStr::from(id);
        self.attach_at(&id, parent, idx);
        Ok(())
    }

    /// Delete a subtree, returning its final snapshot. The root is not removable.
    pub fn remove_subtree(&mut self, id: &str) -> Option<BlockData> {
        if id == self.root.as_str() {
            return None;
        }
        let snap = self.snapshot(id)?;
        let _ = self.detach(id);
        for b in self.preorder(id) {
            self.blocks.remove(&b);
        }
        Some(snap)
    }

    /// Rewrite a subtree in place from a snapshot, keeping its position.
    pub fn replace_subtree(&mut self, id: &str, data: &BlockData) -> Result<(), EditorError> {
        if data.id.as_str() != id {
            return Err(EditorError::DataIdMismatch {
                op: SmolStr::from(id),
                data: data.id.clone(),
            });
        }
        let (parent, idx) = self.detach(id)?;
        for b in self.preorder(id) {
            self.blocks.remove(&b);
        }
        self.register(data);
        self.attach_at(&data.id, parent, idx);
        Ok(())
    }

    /// Replay one wire operation. Undo/redo and remote echoes all go through
    /// here, so a recorded pair must invert exactly.
    pub fn apply(&mut self, op: &Operation) -> Result<(), EditorError> {
        match op.action {
            Action::Insert => {
                let data = op
                    .data
                    .as_ref()
                    .ok_or_else(|| EditorError::MissingData(op.id.clone()))?;
                if data.id != op.id {
                    return Err(EditorError::DataIdMismatch {
                        op: op.id.clone(),
                        data: data.id.clone(),
                    });
                }
                let anchor = self.wire_anchor(op);
                self.insert_data(data, &anchor)
            }
            Action::Update => {
                let data = op
                    .data
                    .as_ref()
                    .ok_or_else(|| EditorError::MissingData(op.id.clone()))?;
                self.replace_subtree(&op.id, data)
            }
            Action::Delete => self
                .remove_subtree(&op.id)
                .map(|_| ())
                .ok_or_else(|| EditorError::UnknownBlock(op.id.clone())),
            Action::Move => {
                let anchor = self.wire_anchor(op);
                self.move_block(&op.id, &anchor)
            }
        }
    }

    /// Wire position fields back to an anchor: `previousID` wins, then
    /// `nextID`, then first-child-of `parentID`, then first-child-of root.
    fn wire_anchor(&self, op: &Operation) -> Anchor {
        if let Some(prev) = &op.previous_id {
            Anchor::After(prev.clone())
        } else if let Some(next) = &op.next_id {
            Anchor::Before(next.clone())
        } else if let Some(parent) = &op.parent_id {
            Anchor::FirstChildOf(parent.clone())
        } else {
            Anchor::FirstChildOf(self.root.clone())
        }
    }
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}
