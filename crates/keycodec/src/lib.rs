//! # Keycodec - composite keys for secondary indexes
//!
//! Packs an index name and an ordered list of string attributes into one
//! key that lives in the same ordered key space as ordinary record keys:
//!
//! ```text
//! U+0000 <index> U+0000 <part_0> U+0000 <part_1> U+0000 ...
//! ```
//!
//! The leading `U+0000` keeps composite keys clear of natural keys (they sort
//! before any key that does not itself start with `U+0000`). Because no
//! component may contain the separator, the encoding is injective and every
//! key sharing a leading run of parts sorts contiguously, so a secondary
//! index scan is just a range scan over [`prefix_range`].
//!
//! ```rust
//! let key = keycodec::encode("status~name", &["ok", "test5"]).unwrap();
//! let (start, end) = keycodec::prefix_range("status~name", &["ok"]).unwrap();
//! assert!(start <= key && key < end);
//! ```

use thiserror::Error;

/// Marks the start of a composite key and separates its components.
pub const SEPARATOR: char = '\u{0}';

/// Largest Unicode scalar value; appended to a prefix to form the exclusive
/// upper bound of a prefix scan.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyCodecError {
    #[error("index name must not be empty")]
    EmptyIndexName,

    #[error("component {component:?} contains reserved character U+{code:04X}")]
    ReservedCharacter { component: String, code: u32 },

    #[error("malformed composite key: {0}")]
    MalformedKey(&'static str),
}

/// Rejects components containing [`SEPARATOR`] or [`MAX_UNICODE_RUNE`].
pub fn validate_component(component: &str) -> Result<(), KeyCodecError> {
    match component
        .chars()
        .find(|&c| c == SEPARATOR || c == MAX_UNICODE_RUNE)
    {
        Some(c) => Err(KeyCodecError::ReservedCharacter {
            component: component.to_string(),
            code: c as u32,
        }),
        None => Ok(()),
    }
}

/// Encodes `index` and `parts` into a single sortable key.
pub fn encode(index: &str, parts: &[&str]) -> Result<String, KeyCodecError> {
    if index.is_empty() {
        return Err(KeyCodecError::EmptyIndexName);
    }
    validate_component(index)?;

    let capacity = 2 + index.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push(SEPARATOR);
    key.push_str(index);
    key.push(SEPARATOR);
    for part in parts {
        validate_component(part)?;
        key.push_str(part);
        key.push(SEPARATOR);
    }
    Ok(key)
}

/// Splits a key produced by [`encode`] back into its index name and parts.
pub fn decode(key: &str) -> Result<(String, Vec<String>), KeyCodecError> {
    let body = key
        .strip_prefix(SEPARATOR)
        .ok_or(KeyCodecError::MalformedKey("missing namespace prefix"))?;
    let body = body
        .strip_suffix(SEPARATOR)
        .ok_or(KeyCodecError::MalformedKey("missing trailing separator"))?;

    let mut components = body.split(SEPARATOR);
    let index = match components.next() {
        Some(index) if !index.is_empty() => index.to_string(),
        _ => return Err(KeyCodecError::MalformedKey("missing index name")),
    };
    if index.contains(MAX_UNICODE_RUNE) {
        return Err(KeyCodecError::MalformedKey("reserved character in index name"));
    }

    let parts = components.map(str::to_string).collect();
    Ok((index, parts))
}

/// Byte-level variant of [`decode`] for keys read back from the store.
pub fn decode_bytes(key: &[u8]) -> Result<(String, Vec<String>), KeyCodecError> {
    let key = std::str::from_utf8(key).map_err(|_| KeyCodecError::MalformedKey("not UTF-8"))?;
    decode(key)
}

/// Returns `true` when `key` is in the composite-key namespace.
pub fn is_composite(key: &[u8]) -> bool {
    key.first() == Some(&0)
}

/// Half-open range `[start, end)` covering every key whose index is `index`
/// and whose leading components equal `parts`.
pub fn prefix_range(index: &str, parts: &[&str]) -> Result<(String, String), KeyCodecError> {
    let start = encode(index, parts)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}
