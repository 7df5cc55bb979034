//! Common types and utilities shared by the container backends, the package
//! model and the split pipeline.

// Submodule declarations
pub mod bom;
pub mod error;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, FormatError, PolicyError, ReferentialIntegrityError, Referrer, Result};
