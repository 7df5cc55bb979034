//! Splitting a package into self-contained fragments.
//!
//! The stages run in order: [`resolve`] finds split points in the main
//! content stream, [`partition`] turns them into [`Fragment`]s, [`rewrite`]
//! builds one package per fragment from its resource closure and [`emit`]
//! serializes it with the source's backend. [`Splitter`] drives the stages
//! with fragments processed in parallel.
//!
//! ```no_run
//! use docsplit::split::{SplitOptions, SplitPolicy, Splitter};
//!
//! # fn main() -> docsplit::Result<()> {
//! let bytes = std::fs::read("report.docx")?;
//! let splitter = Splitter::new(SplitPolicy::fixed_count(4), SplitOptions::default())?;
//! let report = splitter.split(&bytes)?;
//! for output in &report.outputs {
//!     std::fs::write(format!("{}.docx", output.file_stem("report")), &output.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod closure;
pub mod emit;
pub mod io;
pub mod partition;
pub mod pipeline;
pub mod policy;
pub mod rewrite;


pub use boundary::{SplitPoint, resolve};
pub use closure::Closure;
pub use emit::{emit, to_tree};
pub use io::{WrittenFragments, split_file};
pub use partition::{Fragment, partition};
pub use pipeline::{CancellationToken, FragmentFailure, FragmentOutput, SplitReport, Splitter, split};
pub use policy::{ErrorMode, SplitConfig, SplitMode, SplitOptions, SplitPolicy};
pub use rewrite::{FragmentPlan, IdRemap, rewrite};
