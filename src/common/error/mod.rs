//! Unified error types for docsplit.
//!
//! The taxonomy follows the three ways a split can go wrong: the container is
//! unusable ([`FormatError`]), content references a resource that does not
//! exist ([`ReferentialIntegrityError`]), or the caller asked for something
//! invalid ([`PolicyError`]).

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{
    Error, FormatError, PolicyError, ReferentialIntegrityError, Referrer, Result,
};
