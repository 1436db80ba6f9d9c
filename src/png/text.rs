//! Key/value layout of `tEXt` chunk payloads: `key NUL text`

use crate::{PngannoError, PngannoResult};

/// A decoded comment taken from a `tEXt` chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub key: Vec<u8>,
    pub text: Vec<u8>,
}

impl TextEntry {
    pub fn new(key: impl Into<Vec<u8>>, text: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into(), text: text.into() }
    }

    /// Key as text, with invalid UTF-8 replaced
    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// Text as a string, with invalid UTF-8 replaced
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Split a `tEXt` payload at its first NUL byte.
///
/// Returns the key and the offset of the separator. A payload without a NUL
/// has no key: the result is an empty key and `None`, and such a chunk never
/// matches a key lookup.
pub fn split_key(payload: &[u8]) -> (&[u8], Option<usize>) {
    match payload.iter().position(|&b| b == 0) {
        Some(p) => (&payload[..p], Some(p)),
        None => (&[], None),
    }
}

/// Text following the separator, if the payload has one
pub fn text_value(payload: &[u8]) -> Option<&[u8]> {
    let (_, separator) = split_key(payload);
    separator.map(|p| &payload[p + 1..])
}

/// Build a `tEXt` payload from a key and its text
pub fn encode_payload(key: &[u8], text: &[u8]) -> PngannoResult<Vec<u8>> {
    let len = key.len() + 1 + text.len();
    if u32::try_from(len).is_err() {
        return Err(PngannoError::PayloadTooLarge(len));
    }

    let mut payload = Vec::with_capacity(len);
    payload.extend_from_slice(key);
    payload.push(0); // Separator
    payload.extend_from_slice(text);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key() {
        let (key, separator) = split_key(b"abc\x00def");
        assert_eq!(key, b"abc");
        assert_eq!(separator, Some(3));
        assert_eq!(text_value(b"abc\x00def"), Some(&b"def"[..]));
    }

    #[test]
    fn test_split_key_without_separator() {
        let (key, separator) = split_key(b"abcdef");
        assert!(key.is_empty());
        assert_eq!(separator, None);
        assert_eq!(text_value(b"abcdef"), None);
    }

    #[test]
    fn test_split_key_uses_first_nul() {
        let (key, separator) = split_key(b"k\x00a\x00b");
        assert_eq!(key, b"k");
        assert_eq!(separator, Some(1));
        assert_eq!(text_value(b"k\x00a\x00b"), Some(&b"a\x00b"[..]));
    }

    #[test]
    fn test_empty_key_and_text() {
        assert_eq!(split_key(b"\x00"), (&b""[..], Some(0)));
        assert_eq!(text_value(b"key\x00"), Some(&b""[..]));
    }

    #[test]
    fn test_encode_payload() {
        let payload = encode_payload(b"Author", b"Jane").unwrap();
        assert_eq!(payload, b"Author\x00Jane");
        assert_eq!(payload.len(), 11);
    }
}
