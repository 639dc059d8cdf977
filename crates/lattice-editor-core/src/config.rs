//! Editor configuration, read-only input at construction time.

use serde::{Deserialize, Serialize};

use crate::keymap::Keymap;

/// What happens to a list item's trailing siblings when it is promoted one
/// nesting level. Passed explicitly into the list engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutdentPolicy {
    /// Leave following items where they are.
    Logical,
    /// Relocate following items into a sub-list under the outdented item.
    Traditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub outdent: OutdentPolicy,
    pub keymap: Keymap,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            outdent: OutdentPolicy::Traditional,
            keymap: Keymap::default(),
        }
    }
}
