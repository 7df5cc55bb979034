//! Byte Order Mark (BOM) utilities for XML part payloads.
//!
//! Package parts are almost always UTF-8, but the XML specification allows
//! UTF-16 and some producers emit it. Parts are decoded to UTF-8 text before
//! parsing and always re-encoded as UTF-8.

use encoding_rs::{UTF_16BE, UTF_16LE};
use std::borrow::Cow;

/// Supported BOM encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomKind {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl BomKind {
    /// Returns the byte representation of the BOM.
    #[inline]
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            BomKind::Utf8 => &UTF8_BOM,
            BomKind::Utf16Le => &UTF16_LE_BOM,
            BomKind::Utf16Be => &UTF16_BE_BOM,
        }
    }

    /// Returns the length in bytes of the BOM.
    #[inline]
    #[allow(clippy::len_without_is_empty)] // No need to check for empty BOMs
    pub const fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

/// UTF-8 BOM bytes.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian BOM bytes.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian BOM bytes.
pub const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Detects a BOM at the start of `buf`.
pub fn detect_bom(buf: &[u8]) -> Option<BomKind> {
    if buf.starts_with(&UTF8_BOM) {
        return Some(BomKind::Utf8);
    }
    if buf.starts_with(&UTF16_LE_BOM) {
        return Some(BomKind::Utf16Le);
    }
    if buf.starts_with(&UTF16_BE_BOM) {
        return Some(BomKind::Utf16Be);
    }
    None
}

/// Decodes an XML payload to text.
///
/// UTF-16 is recognised by its BOM or, without one, by the `<` of the
/// declaration being followed (or preceded) by a zero byte. Malformed UTF-16
/// sequences are replaced; malformed UTF-8 is an error carrying the offset of
/// the first invalid byte.
pub fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, std::str::Utf8Error> {
    match detect_bom(bytes) {
        Some(BomKind::Utf8) => std::str::from_utf8(&bytes[UTF8_BOM.len()..]).map(Cow::Borrowed),
        Some(BomKind::Utf16Le) => Ok(UTF_16LE.decode_without_bom_handling(&bytes[2..]).0),
        Some(BomKind::Utf16Be) => Ok(UTF_16BE.decode_without_bom_handling(&bytes[2..]).0),
        None if bytes.starts_with(b"<\0") => Ok(UTF_16LE.decode_without_bom_handling(bytes).0),
        None if bytes.starts_with(b"\0<") => Ok(UTF_16BE.decode_without_bom_handling(bytes).0),
        None => std::str::from_utf8(bytes).map(Cow::Borrowed),
    }
}
