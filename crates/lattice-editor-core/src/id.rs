//! Block identifiers.
//!
//! Ids are 22-character sortable tokens: a 14-digit local timestamp, a dash,
//! and 7 random lowercase alphanumerics. The timestamp prefix keeps ids
//! ordered by creation time; the suffix keeps them unique within a document.

use chrono::Local;
use rand::Rng;
use smol_str::SmolStr;

pub type BlockId = SmolStr;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 7;

/// Generate a fresh block id.
pub fn new_block_id() -> BlockId {
    let mut rng = rand::thread_rng();
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    smol_str::format_smolstr!("{stamp}-{suffix}")
}

/// The `updated` stamp carried on every block, `YYYYMMDDHHmmss`.
pub fn timestamp() -> SmolStr {
    smol_str::format_smolstr!("{}", Local::now().format("%Y%m%d%H%M%S"))
}

/// Whether a string has the shape of a block id.
pub fn is_block_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 14 + 1 + SUFFIX_LEN {
        return false;
    }
    if !bytes[..14].iter().all(u8::is_ascii_digit) {
        return false;
    }
    if bytes[14] != b'-' {
        return false;
    }
    bytes[15..]
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
