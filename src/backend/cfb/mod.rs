//! Compound binary (OLE2) container backend.
//!
//! A compound file is a small file system: storages hold streams and other
//! storages. A package stored this way keeps each part in a stream whose
//! storage path mirrors the part name, so `word/document.xml` lives in
//! stream `document.xml` of storage `word`.
//!
//! Legacy binary documents (`WordDocument`, `Workbook`, `PowerPoint
//! Document` streams) and encrypted packages share the container but not
//! the package layout; they are rejected as unsupported.

pub mod consts;
pub mod reader;
pub mod writer;

pub use reader::{CompoundFile, DirectoryEntry, is_compound_file};
pub use writer::{CompoundFileWriter, validate_name};

use super::{
    BackendKind, DecodeError, ElementTree, EncodeError, FormatBackend, decode_member,
    encode_member,
};
use std::io::{self, Cursor};
use thiserror::Error;

/// Compound file errors.
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("not a compound file")]
    NotCompoundFile,

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("corrupted file: {0}")]
    Corrupted(String),

    #[error("truncated file: {0}")]
    Truncated(String),

    #[error("stream not found: {0}")]
    StreamNotFound(String),

    #[error("invalid entry name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

impl From<CfbError> for DecodeError {
    fn from(err: CfbError) -> Self {
        match err {
            CfbError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                DecodeError::Truncated(e.to_string())
            },
            CfbError::Io(e) => DecodeError::Io(e),
            CfbError::NotCompoundFile => DecodeError::UnrecognizedContainer,
            CfbError::Truncated(msg) => DecodeError::Truncated(msg),
            CfbError::StreamNotFound(msg) => DecodeError::Corrupted(format!("stream not found: {msg}")),
            CfbError::InvalidFormat(msg) | CfbError::Corrupted(msg) => DecodeError::Corrupted(msg),
            CfbError::InvalidName { name, reason } => {
                DecodeError::Corrupted(format!("entry '{name}': {reason}"))
            },
        }
    }
}

impl From<CfbError> for EncodeError {
    fn from(err: CfbError) -> Self {
        match err {
            CfbError::Io(e) => EncodeError::Io(e),
            CfbError::InvalidName { name, reason } => EncodeError::InvalidMemberName { name, reason },
            other => EncodeError::Layout(other.to_string()),
        }
    }
}

/// Streams that mark a legacy binary document rather than a package.
const LEGACY_STREAMS: &[&str] = &["WordDocument", "Workbook", "Book", "PowerPoint Document"];

/// Backend for packages stored in a compound file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompoundBinaryBackend;

impl FormatBackend for CompoundBinaryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CompoundBinary
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(consts::MAGIC)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ElementTree, DecodeError> {
        let mut file = CompoundFile::open(Cursor::new(bytes))?;
        let streams = file.streams()?;

        let top_level = |name: &str| {
            streams
                .iter()
                .any(|(path, _)| path.len() == 1 && path[0].eq_ignore_ascii_case(name))
        };
        if top_level("EncryptedPackage") {
            return Err(DecodeError::Unsupported("encrypted package".to_string()));
        }
        if !top_level("[Content_Types].xml")
            && let Some(legacy) = LEGACY_STREAMS.iter().find(|&&name| top_level(name))
        {
            return Err(DecodeError::Unsupported(format!(
                "legacy binary document ('{legacy}' stream)"
            )));
        }

        let mut tree = ElementTree::new();
        for (path, entry) in &streams {
            let name = path.join("/");
            let data = file.read_stream(entry)?;
            let payload = decode_member(&name, data)?;
            tree.push(name, payload);
        }
        tracing::trace!(members = tree.len(), "decoded compound file");
        Ok(tree)
    }

    fn encode(&self, tree: &ElementTree) -> Result<Vec<u8>, EncodeError> {
        let mut writer = CompoundFileWriter::new();
        for entry in tree.entries() {
            let segments: Vec<&str> = entry.name.split('/').collect();
            let data = encode_member(entry)?.into_owned();
            writer.create_stream(&segments, data).map_err(|err| match err {
                CfbError::InvalidName { reason, .. } => EncodeError::InvalidMemberName {
                    name: entry.name.clone(),
                    reason,
                },
                other => other.into(),
            })?;
        }
        Ok(writer.into_bytes()?)
    }
}
