//! lattice-editor-core: block editing logic over an explicit tree model.
//!
//! This crate provides:
//! - `BlockTree` - an id-keyed arena holding the document's block tree
//! - `Editor<T>` - caret, block selection, and undo/redo over a `Transport`
//! - Structural gestures - Enter handling, boundary merges, the list engine,
//!   block moves, super-block merge/cancel - each committing a matched
//!   forward/inverse operation pair
//! - `keydown` - an ordered rule table dispatching key events to gestures

pub mod block;
pub mod caret;
pub mod config;
pub mod editor;
pub mod enter;
pub mod error;
pub mod id;
pub mod keydown;
pub mod keymap;
pub mod list;
pub mod move_block;
pub mod navigate;
pub mod operation;
pub mod remove;
pub mod super_block;
pub mod transaction;

pub use block::{Block, BlockData, BlockKind, BlockSubtype, BlockTree, SbLayout};
pub use caret::{Caret, SelectAll, SelectionOffset, TextRange};
pub use config::{EditorConfig, OutdentPolicy};
pub use editor::Editor;
pub use error::EditorError;
pub use id::BlockId;
pub use keydown::{keydown, Rule};
pub use keymap::{Key, KeyCombo, KeyEvent, KeydownResult, Keymap, Modifiers};
pub use operation::{Action, Anchor, Operation, OperationPair};
pub use smol_str::SmolStr;
pub use transaction::{NullTransport, RecordingTransport, Transport};
