//! Error conversion implementations.
//!
//! Backend errors surface through [`FormatError`]; these impls let `?` lift
//! them straight into the unified [`Error`].

use super::types::{Error, FormatError};
use crate::backend::{DecodeError, EncodeError};

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Format(FormatError::Decode(err))
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Error::Format(FormatError::Encode(err))
    }
}
