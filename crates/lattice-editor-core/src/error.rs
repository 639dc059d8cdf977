//! Crate error type.

use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("unknown block: {0}")]
    UnknownBlock(SmolStr),

    #[error("block already exists: {0}")]
    BlockExists(SmolStr),

    #[error("invalid anchor for {id}: {reason}")]
    InvalidAnchor { id: SmolStr, reason: &'static str },

    #[error("operation on {0} is missing its data payload")]
    MissingData(SmolStr),

    #[error("operation data id {data} does not match operation id {op}")]
    DataIdMismatch { op: SmolStr, data: SmolStr },

    #[error("gesture requires a non-empty block selection")]
    EmptySelection,

    #[error("transport: {0}")]
    Transport(String),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}
