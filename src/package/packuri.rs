//! Part names.
//!
//! A [`PackURI`] is the absolute, `/`-separated name of a part inside a
//! package (`/word/document.xml`). Relationship targets are relative to the
//! directory of their source part and resolve against it; the package
//! itself is the pseudo-part `/`.

use std::borrow::Cow;
use std::fmt;

/// An absolute part name within a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/word/document.xml")
    uri: String,
}

impl PackURI {
    /// The package pseudo-part, source of package-level relationships.
    pub fn package() -> Self {
        PackURI {
            uri: "/".to_string(),
        }
    }

    /// Create a PackURI from a string that must begin with a slash.
    pub fn new(uri: impl Into<String>) -> Option<Self> {
        let uri = uri.into();
        uri.starts_with('/').then_some(PackURI { uri })
    }

    /// Create a PackURI from a container member name (`word/document.xml`).
    pub fn from_member(name: &str) -> Self {
        PackURI {
            uri: format!("/{}", name.trim_start_matches('/')),
        }
    }

    /// Resolve a relationship target against the directory of its source.
    ///
    /// `("/word", "../customXml/item1.xml")` resolves to `/customXml/item1.xml`;
    /// a target that starts with a slash is already absolute.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Self {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{base_uri}{relative_ref}")
        } else {
            format!("{base_uri}/{relative_ref}")
        };
        PackURI {
            uri: normalize_path(&joined),
        }
    }

    /// Directory portion ("/ppt/slides" for "/ppt/slides/slide1.xml").
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// File name portion ("slide1.xml" for "/ppt/slides/slide1.xml").
    pub fn filename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or("")
    }

    /// Extension without the period ("xml" for "/word/document.xml").
    pub fn ext(&self) -> &str {
        self.filename().rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
    }

    /// File name without its extension ("slide1" for "/ppt/slides/slide1.xml").
    pub fn stem(&self) -> &str {
        let filename = self.filename();
        filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename)
    }

    /// Container member name (URI with the leading slash stripped).
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Whether this is the package pseudo-part.
    #[inline]
    pub fn is_package(&self) -> bool {
        self.uri == "/"
    }

    /// Relative reference from `base_uri` to this part.
    ///
    /// `/ppt/slideLayouts/slideLayout1.xml` seen from `/ppt/slides` is
    /// `../slideLayouts/slideLayout1.xml`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = "../".repeat(from.len() - common);
        result.push_str(&to[common..].join("/"));
        result
    }

    /// Name of the relationship part belonging to this part.
    ///
    /// `/word/_rels/document.xml.rels` for `/word/document.xml`, and
    /// `/_rels/.rels` for the package itself.
    pub fn rels_uri(&self) -> PackURI {
        let base = self.base_uri();
        let filename = if self.is_package() { "" } else { self.filename() };
        let uri = if base == "/" {
            format!("/_rels/{filename}.rels")
        } else {
            format!("{base}/_rels/{filename}.rels")
        };
        PackURI { uri }
    }

    /// Source part of a relationship part, if `self` names one.
    ///
    /// Inverse of [`PackURI::rels_uri`].
    pub fn rels_source(&self) -> Option<PackURI> {
        let filename = self.filename();
        let source_file = filename.strip_suffix(".rels")?;
        let dir = self.base_uri();
        let parent = dir.strip_suffix("_rels")?;
        if !parent.ends_with('/') {
            return None;
        }
        if source_file.is_empty() {
            return (parent == "/").then(PackURI::package);
        }
        Some(PackURI {
            uri: format!("{parent}{source_file}"),
        })
    }

    /// Case-insensitive lookup key (part names compare ASCII case-insensitively).
    #[inline]
    pub fn key(&self) -> String {
        self.uri.to_ascii_lowercase()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for PackURI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Resolve "." and ".." segments; ".." never climbs above the root.
fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            _ => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Decode `%XX` escapes in a relationship target.
pub fn percent_decode(target: &str) -> Cow<'_, str> {
    if !target.contains('%') {
        return Cow::Borrowed(target);
    }
    let bytes = target.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(target),
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
