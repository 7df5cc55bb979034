//! Backend error types.
use std::io;
use thiserror::Error;

/// Failure to turn container bytes into an element tree.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("not a recognized container")]
    UnrecognizedContainer,

    #[error("truncated container: {0}")]
    Truncated(String),

    #[error("corrupted container: {0}")]
    Corrupted(String),

    #[error("unsupported container: {0}")]
    Unsupported(String),

    #[error("malformed XML in '{part}' at byte {offset}: {message}")]
    Xml {
        part: String,
        offset: u64,
        message: String,
    },

    #[error("ZIP error: {0}")]
    Zip(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to turn an element tree into container bytes.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("member name '{name}' cannot be stored: {reason}")]
    InvalidMemberName { name: String, reason: String },

    #[error("failed to serialize '{part}': {message}")]
    Serialize { part: String, message: String },

    #[error("ZIP error: {0}")]
    Zip(String),

    #[error("container layout error: {0}")]
    Layout(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(feature = "ooxml")]
impl From<zip::result::ZipError> for DecodeError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => DecodeError::Io(e),
            other => DecodeError::Zip(other.to_string()),
        }
    }
}

#[cfg(feature = "ooxml")]
impl From<zip::result::ZipError> for EncodeError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => EncodeError::Io(e),
            other => EncodeError::Zip(other.to_string()),
        }
    }
}
