//! Format backends: the narrow capability that turns container bytes into an
//! [`ElementTree`] of named members and back.
//!
//! Two container families are supported, each behind [`FormatBackend`]:
//!
//! - [`ZipBackend`] for zip-of-XML-parts packages (`.docx`, `.xlsx`, `.pptx`, ...)
//! - [`CompoundBinaryBackend`] for OLE2 compound files, where every member is a
//!   stream and every `/` in a member name descends into a storage
//!
//! Members whose name ends in `.xml` or `.rels` are parsed into an
//! [`XmlDocument`]; everything else stays an opaque blob. The package model
//! never branches on the container kind: it only sees the tree.

pub mod error;

#[cfg(feature = "ole")]
pub mod cfb;
#[cfg(feature = "ooxml")]
pub mod zip_container;

pub use error::{DecodeError, EncodeError};

#[cfg(feature = "ole")]
pub use cfb::CompoundBinaryBackend;
#[cfg(feature = "ooxml")]
pub use zip_container::ZipBackend;

use crate::common::xml::XmlDocument;
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Which container family produced a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Zip,
    CompoundBinary,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Zip => f.write_str("zip"),
            BackendKind::CompoundBinary => f.write_str("compound binary"),
        }
    }
}

/// Payload of a container member.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed XML, shared so untouched parts can be reused without copying
    Xml(Arc<XmlDocument>),
    /// Opaque bytes (media, binary parts)
    Blob(Bytes),
}

impl Payload {
    /// Serialized bytes of this payload.
    pub fn to_bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            Payload::Xml(doc) => Ok(Cow::Owned(doc.to_bytes()?)),
            Payload::Blob(bytes) => Ok(Cow::Borrowed(bytes.as_ref())),
        }
    }

    #[inline]
    pub fn as_xml(&self) -> Option<&Arc<XmlDocument>> {
        match self {
            Payload::Xml(doc) => Some(doc),
            Payload::Blob(_) => None,
        }
    }
}

/// One named member of a container, in container order.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    /// Member name without leading slash, `/`-separated (e.g. `word/document.xml`)
    pub name: String,
    pub payload: Payload,
}

/// Ordered members of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementTree {
    entries: Vec<TreeEntry>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, payload: Payload) {
        self.entries.push(TreeEntry {
            name: name.into(),
            payload,
        });
    }

    #[inline]
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    /// Find a member by name (ASCII case-insensitive, as both containers are).
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A container codec.
pub trait FormatBackend: Send + Sync {
    /// Container family handled by this backend.
    fn kind(&self) -> BackendKind;

    /// Cheap signature check on the leading bytes.
    fn sniff(&self, bytes: &[u8]) -> bool;

    /// Decode container bytes into a member tree.
    fn decode(&self, bytes: &[u8]) -> Result<ElementTree, DecodeError>;

    /// Encode a member tree, keeping member order.
    fn encode(&self, tree: &ElementTree) -> Result<Vec<u8>, EncodeError>;
}

#[cfg(feature = "ooxml")]
static ZIP_BACKEND: ZipBackend = ZipBackend;
#[cfg(feature = "ole")]
static CFB_BACKEND: CompoundBinaryBackend = CompoundBinaryBackend;

/// All backends compiled into this build.
pub fn backends() -> Vec<&'static dyn FormatBackend> {
    let mut all: Vec<&'static dyn FormatBackend> = Vec::with_capacity(2);
    #[cfg(feature = "ooxml")]
    all.push(&ZIP_BACKEND);
    #[cfg(feature = "ole")]
    all.push(&CFB_BACKEND);
    all
}

/// Backend for a container kind, if compiled in.
pub fn for_kind(kind: BackendKind) -> Option<&'static dyn FormatBackend> {
    backends().into_iter().find(|backend| backend.kind() == kind)
}

/// Pick the backend whose signature matches `bytes`.
pub fn detect(bytes: &[u8]) -> Result<&'static dyn FormatBackend, DecodeError> {
    backends()
        .into_iter()
        .find(|backend| backend.sniff(bytes))
        .ok_or(DecodeError::UnrecognizedContainer)
}

/// Whether a member is parsed as XML.
pub(crate) fn is_xml_member(name: &str) -> bool {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("rels")
}

/// Turn raw member bytes into a payload.
pub(crate) fn decode_member(name: &str, data: Vec<u8>) -> Result<Payload, DecodeError> {
    if !is_xml_member(name) {
        return Ok(Payload::Blob(Bytes::from(data)));
    }
    XmlDocument::parse(&data)
        .map(|doc| Payload::Xml(Arc::new(doc)))
        .map_err(|e| DecodeError::Xml {
            part: name.to_string(),
            offset: e.offset,
            message: e.message,
        })
}

/// Serialize a member payload for writing.
pub(crate) fn encode_member<'a>(entry: &'a TreeEntry) -> Result<Cow<'a, [u8]>, EncodeError> {
    entry.payload.to_bytes().map_err(|e| EncodeError::Serialize {
        part: entry.name.clone(),
        message: e.to_string(),
    })
}
