//! Keyboard input model.
//!
//! Platform-agnostic key representation; platform shells convert native
//! events into these types before dispatch.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Key values for keyboard input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Space,

    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    /// Unknown/unidentified key.
    Unidentified,
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const CTRL_ALT: Self = Self {
        ctrl: true,
        alt: true,
        shift: false,
        meta: false,
    };
}

/// A key combination for triggering an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn ctrl_shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL_SHIFT)
    }

    pub fn ctrl_alt(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL_ALT)
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }
}

/// One keyboard event as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub combo: KeyCombo,
    /// An IME composition session is active.
    pub composing: bool,
}

impl KeyEvent {
    pub fn new(combo: KeyCombo) -> Self {
        Self {
            combo,
            composing: false,
        }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(KeyCombo::new(key))
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let the platform handle it.
    NotHandled,
    /// Event should be passed through (IME, native navigation).
    PassThrough,
}

/// Bound combos for the structural gestures this core owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keymap {
    pub undo: KeyCombo,
    pub redo: KeyCombo,
    pub move_up: KeyCombo,
    pub move_down: KeyCombo,
    pub merge_row: KeyCombo,
    pub merge_col: KeyCombo,
    pub fold: KeyCombo,
    pub unfold: KeyCombo,
    pub to_paragraph: KeyCombo,
    pub to_unordered: KeyCombo,
    pub to_ordered: KeyCombo,
    pub to_task: KeyCombo,
    /// `heading[n - 1]` converts to a level-`n` heading.
    pub headings: [KeyCombo; 6],
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            undo: KeyCombo::ctrl(Key::character("z")),
            redo: KeyCombo::ctrl_shift(Key::character("z")),
            move_up: KeyCombo::ctrl_shift(Key::ArrowUp),
            move_down: KeyCombo::ctrl_shift(Key::ArrowDown),
            merge_row: KeyCombo::ctrl_alt(Key::character("r")),
            merge_col: KeyCombo::ctrl_alt(Key::character("c")),
            fold: KeyCombo::ctrl_alt(Key::ArrowUp),
            unfold: KeyCombo::ctrl_alt(Key::ArrowDown),
            to_paragraph: KeyCombo::ctrl_alt(Key::character("0")),
            to_unordered: KeyCombo::ctrl_alt(Key::character("u")),
            to_ordered: KeyCombo::ctrl_alt(Key::character("o")),
            to_task: KeyCombo::ctrl_alt(Key::character("t")),
            headings: [
                KeyCombo::ctrl_alt(Key::character("1")),
                KeyCombo::ctrl_alt(Key::character("2")),
                KeyCombo::ctrl_alt(Key::character("3")),
                KeyCombo::ctrl_alt(Key::character("4")),
                KeyCombo::ctrl_alt(Key::character("5")),
                KeyCombo::ctrl_alt(Key::character("6")),
            ],
        }
    }
}

impl Keymap {
    /// Heading level bound to this combo, if any.
    pub fn heading_level(&self, combo: &KeyCombo) -> Option<u8> {
        self.headings
            .iter()
            .position(|c| c == combo)
            .map(|i| i as u8 + 1)
    }
}
