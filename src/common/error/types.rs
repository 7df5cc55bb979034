//! Error type definitions.
use crate::backend::{DecodeError, EncodeError};
use crate::package::PoolKind;
use crate::split::SplitMode;
use std::fmt;
use thiserror::Error;

/// Main error type for docsplit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unsupported container on load or emit
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Content references a resource missing from its pool
    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(#[from] ReferentialIntegrityError),

    /// Invalid split policy or options
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller abandoned the operation
    #[error("Split operation cancelled")]
    Cancelled,
}

/// Container-level failures.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("package has no [Content_Types].xml part")]
    MissingContentTypes,

    #[error("no content type registered for part '{0}'")]
    MissingContentType(String),

    #[error("package has no main document relationship")]
    MissingMainDocument,

    #[error("relationship '{id}' of '{source_part}' targets missing part '{target}'")]
    DanglingRelationship {
        source_part: String,
        id: String,
        target: String,
    },

    #[error("relationship id '{id}' of '{source_part}' is bound to both '{first}' and '{second}'")]
    ConflictingRelationshipId {
        source_part: String,
        id: String,
        first: String,
        second: String,
    },

    #[error("malformed part '{part}': {reason}")]
    MalformedPart { part: String, reason: String },

    #[error("unsupported main document content type '{0}'")]
    UnsupportedDocument(String),
}

impl FormatError {
    pub(crate) fn malformed(part: impl fmt::Display, reason: impl Into<String>) -> Self {
        FormatError::MalformedPart {
            part: part.to_string(),
            reason: reason.into(),
        }
    }
}

/// What holds a reference that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Referrer {
    /// A content node, by position in the main content stream
    Node(usize),
    /// A pool entry whose dependency is missing
    Resource { pool: PoolKind, id: String },
    /// A part outside the content stream (document frame, section setup, header)
    Part(String),
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referrer::Node(index) => write!(f, "content node {index}"),
            Referrer::Resource { pool, id } => write!(f, "{pool} \"{id}\""),
            Referrer::Part(name) => write!(f, "part '{name}'"),
        }
    }
}

/// A reference to a resource id that its pool does not define.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{referrer} references {pool} \"{id}\" which is not defined")]
pub struct ReferentialIntegrityError {
    pub referrer: Referrer,
    pub pool: PoolKind,
    pub id: String,
}

/// Invalid split configuration, detected before any work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{mode} requires a positive count")]
    MissingCount { mode: SplitMode },

    #[error("count must be a positive integer, got {0}")]
    NonPositiveCount(i64),

    #[error("count is only valid with FIXED_COUNT, not {mode}")]
    UnexpectedCount { mode: SplitMode },

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("invalid split configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for docsplit operations.
pub type Result<T> = std::result::Result<T, Error>;
