//! Docsplit - split composite Office documents into self-contained fragments
//!
//! This library cuts an OOXML package (.docx, .xlsx, .pptx and their macro and
//! template variants) into smaller documents of the same format. Every
//! fragment is a complete package: the styles, numbering definitions, cell
//! formats, shared strings, media and other shared resources its content uses
//! travel with it, renumbered densely, and nothing else does.
//!
//! # Features
//!
//! - **Container backends**: ZIP packages (`ooxml` feature) and OLE2 compound
//!   files holding a package part tree (`ole` feature); output uses the
//!   input's container
//! - **Split policies**: page breaks, section breaks, headings, sheets and
//!   slides, or a fixed fragment count
//! - **Resource closure**: transitive reference tracking across pools with
//!   deterministic id reassignment
//! - **Parallel fragments**: fragments are rewritten and encoded on a worker pool
//!
//! # Example - Splitting a document by headings
//!
//! ```no_run
//! use docsplit::{SplitMode, SplitOptions, SplitPolicy, Splitter};
//!
//! # fn main() -> docsplit::Result<()> {
//! let bytes = std::fs::read("handbook.docx")?;
//! let splitter = Splitter::new(SplitPolicy::new(SplitMode::Heading), SplitOptions::default())?;
//! let report = splitter.split(&bytes)?;
//!
//! for output in &report.outputs {
//!     std::fs::write(format!("{}.docx", output.file_stem("handbook")), &output.bytes)?;
//! }
//! for failure in &report.failures {
//!     eprintln!("fragment {} failed: {}", failure.index, failure.error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting a package
//!
//! ```no_run
//! use docsplit::Package;
//!
//! # fn main() -> docsplit::Result<()> {
//! let bytes = std::fs::read("workbook.xlsx")?;
//! let package = Package::load(&bytes)?;
//! let content = package.content_index()?;
//! for unit in &content.units {
//!     println!("{}: {} rows", unit.name, unit.nodes().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Splitting files on disk
//!
//! ```no_run
//! use docsplit::split::{SplitConfig, split_file};
//! use docsplit::Splitter;
//! use std::sync::Arc;
//!
//! # async fn run() -> docsplit::Result<()> {
//! let config = SplitConfig::from_yaml_str("policy:\n  mode: FIXED_COUNT\n  count: 4\n")?;
//! let splitter = Arc::new(Splitter::from_config(config)?);
//! let written = split_file("deck.pptx", "out", "deck", splitter).await?;
//! println!("wrote {} files", written.paths.len());
//! # Ok(())
//! # }
//! ```

/// Shared error types and the XML tree
pub mod common;

/// Container encodings: decode bytes into a member tree and back
pub mod backend;

/// OPC package model: parts, relationships, content types and resource pools
pub mod package;

/// Per-vocabulary content discovery and fragment reassembly
pub mod layout;

/// Boundary resolution, partitioning, rewriting and emission
pub mod split;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use backend::BackendKind;
pub use common::{Error, FormatError, PolicyError, ReferentialIntegrityError, Referrer, Result};
pub use layout::DocumentKind;
pub use package::{ContentIndex, PackURI, Package, Part, PoolKind};
pub use split::{
    CancellationToken, ErrorMode, FragmentFailure, FragmentOutput, SplitMode, SplitOptions, SplitPolicy,
    SplitReport, Splitter, split,
};
