use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

// Static initialization: automaton is built only once, thread-safe.
// Whitespace other than the plain space is written as a character reference so
// attribute-value normalization on the next read gives back the same value.
static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "\t", "\n", "\r"])
        .expect("Failed to build XML attribute escaper")
});

// Use LeftmostLongest to ensure longer entities are matched first (e.g., &amp; instead of &lt;)
static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
        .expect("Failed to build XML unescaper")
});

/// Escape an attribute value for writing between double quotes.
///
/// # Examples
///
/// ```
/// use docsplit::common::xml::escape_attr;
/// assert_eq!(escape_attr("a & \"b\""), "a &amp; &quot;b&quot;");
/// assert_eq!(escape_attr("line\nbreak"), "line&#10;break");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> String {
    ATTR_ESCAPER.replace_all(
        s,
        &["&amp;", "&lt;", "&gt;", "&quot;", "&#9;", "&#10;", "&#13;"],
    )
}

/// Unescape raw XML character data.
///
/// Handles predefined entities and numeric character references. Input with a
/// malformed reference falls back to replacing only the five predefined
/// entities, leaving anything else unchanged.
///
/// # Examples
///
/// ```
/// use docsplit::common::xml::unescape_text;
/// assert_eq!(unescape_text("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_text("tab&#9;here"), "tab\there");
/// assert_eq!(unescape_text("&amp;lt;"), "&lt;");
/// ```
pub fn unescape_text(s: &str) -> String {
    if memchr::memchr(b'&', s.as_bytes()).is_none() {
        return s.to_string();
    }
    match quick_xml::escape::unescape(s) {
        Ok(text) => text.into_owned(),
        Err(_) => XML_UNESCAPER.replace_all(s, &["&", "<", ">", "\"", "'"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr_plain() {
        assert_eq!(escape_attr("Heading1"), "Heading1");
    }

    #[test]
    fn test_unescape_unknown_entity_falls_back() {
        assert_eq!(unescape_text("&bogus; &amp;"), "&bogus; &");
    }
}
