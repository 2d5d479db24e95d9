//! Conversion between native strings and environment strings.
//!
//! Environment strings are "native strings": every `char` is a code point
//! in `0..=0xFF` standing for one byte. ASCII text is exposed unchanged
//! (and without allocating). Anything else is exposed as its UTF-8 bytes,
//! widened one byte per code point, so [`decode`] is an exact inverse of
//! [`encode`].

use std::borrow::Cow;

/// Encode native text for exposure through the environment.
pub fn encode(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(widen(s.as_bytes()))
}

/// Decode an environment string back to native text.
///
/// A string that is not the widened form of UTF-8 (an application wrote
/// text of its own) passes through unchanged.
pub fn decode(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }
    let Some(bytes) = narrow(s) else {
        return Cow::Borrowed(s);
    };
    match String::from_utf8(bytes) {
        Ok(text) => Cow::Owned(text),
        Err(_) => Cow::Borrowed(s),
    }
}

/// Render an integer field.
pub fn encode_int(n: i64) -> String {
    n.to_string()
}

/// Parse an integer field, tolerating surrounding whitespace.
pub fn decode_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// Map each byte to the code point of the same value.
pub fn widen(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`widen`]; `None` if any code point is above `0xFF`.
pub fn narrow(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c).ok()).collect()
}
