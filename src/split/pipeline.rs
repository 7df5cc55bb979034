//! The split pipeline: load, resolve, partition, then rewrite and emit
//! fragments on a worker pool.

use super::boundary;
use super::emit::emit;
use super::partition::{self, Fragment};
use super::policy::{ErrorMode, SplitConfig, SplitOptions, SplitPolicy};
use super::rewrite::rewrite;
use crate::common::{Error, PolicyError, Result};
use crate::package::Package;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lets a caller abandon a running split between fragments.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One emitted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentOutput {
    pub index: usize,
    pub title: Option<String>,
    /// Source content nodes the fragment holds
    pub node_range: Range<usize>,
    /// Container bytes, same format as the input
    pub bytes: Vec<u8>,
}

impl FragmentOutput {
    /// Output name without extension: `prefix_<title>` with file-system
    /// hostile characters and whitespace runs replaced by `_`, or
    /// `prefix_section_NNN` (1-based) for untitled fragments.
    ///
    /// Replacement happens before trimming, so surrounding whitespace in a
    /// title shows up as `_` in the name.
    pub fn file_stem(&self, prefix: &str) -> String {
        let name = self
            .title
            .as_deref()
            .filter(|title| !title.is_empty())
            .map(sanitize_file_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("section_{:03}", self.index + 1));
        if prefix.is_empty() {
            name
        } else {
            format!("{prefix}_{name}")
        }
    }
}

fn sanitize_file_name(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            c if c.is_control() => {},
            c => out.push(c),
        }
    }
    out
}

/// A fragment that could not be produced.
#[derive(Debug)]
pub struct FragmentFailure {
    pub index: usize,
    pub error: Error,
}

/// Outcome of a split: produced fragments and failed ones, each in
/// document order.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub outputs: Vec<FragmentOutput>,
    pub failures: Vec<FragmentFailure>,
}

impl SplitReport {
    /// Whether some fragments failed while others were produced.
    #[inline]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn fragment_count(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }
}

/// Splits documents under a fixed policy.
pub struct Splitter {
    policy: SplitPolicy,
    options: SplitOptions,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl Splitter {
    /// Validate the configuration and start the worker pool.
    pub fn new(policy: SplitPolicy, options: SplitOptions) -> std::result::Result<Self, PolicyError> {
        policy.validate()?;
        options.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("docsplit-{i}"))
            .build()
            .map_err(|e| PolicyError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            policy,
            options,
            pool,
            cancel: CancellationToken::new(),
        })
    }

    pub fn from_config(config: SplitConfig) -> std::result::Result<Self, PolicyError> {
        Self::new(config.policy, config.options)
    }

    /// Use a caller-held token instead of the splitter's own.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[inline]
    pub fn policy(&self) -> &SplitPolicy {
        &self.policy
    }

    #[inline]
    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Split a document given as container bytes.
    pub fn split(&self, bytes: &[u8]) -> Result<SplitReport> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let package = Package::load(bytes)?;
        self.split_package(&package)
    }

    /// Split an already loaded package.
    ///
    /// In strict mode the first referential integrity failure (in document
    /// order) fails the whole operation. Every other failure is listed in
    /// the report next to the fragments that were produced.
    pub fn split_package(&self, package: &Package) -> Result<SplitReport> {
        let points = boundary::resolve(package, &self.policy)?;
        let fragments = partition::partition(package, &points, self.policy.include_empty_fragments)?;

        let results: Vec<Result<FragmentOutput>> = self.pool.install(|| {
            fragments
                .par_iter()
                .map(|fragment| self.produce(package, fragment))
                .collect()
        });

        let mut report = SplitReport::default();
        for (fragment, result) in fragments.iter().zip(results) {
            match result {
                Ok(output) => report.outputs.push(output),
                Err(Error::ReferentialIntegrity(err)) if self.options.error_mode == ErrorMode::Strict => {
                    tracing::warn!(fragment = fragment.index, error = %err, "split aborted");
                    return Err(Error::ReferentialIntegrity(err));
                },
                Err(error) => {
                    tracing::warn!(fragment = fragment.index, error = %error, "fragment failed");
                    report.failures.push(FragmentFailure {
                        index: fragment.index,
                        error,
                    });
                },
            }
        }
        tracing::info!(
            mode = %self.policy.mode,
            succeeded = report.outputs.len(),
            failed = report.failures.len(),
            "split finished"
        );
        Ok(report)
    }

    fn produce(&self, package: &Package, fragment: &Fragment) -> Result<FragmentOutput> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let output = rewrite(package, fragment)?;
        let bytes = emit(&output)?;
        Ok(FragmentOutput {
            index: fragment.index,
            title: fragment.title.clone(),
            node_range: fragment.nodes.clone(),
            bytes,
        })
    }
}

impl std::fmt::Debug for Splitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splitter")
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Split with default options.
pub fn split(bytes: &[u8], policy: SplitPolicy) -> Result<SplitReport> {
    Splitter::new(policy, SplitOptions::default())?.split(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(index: usize, title: Option<&str>) -> FragmentOutput {
        FragmentOutput {
            index,
            title: title.map(str::to_string),
            node_range: 0..0,
            bytes: Vec::new(),
        }
    }

    #[test]
    fn test_file_stem_from_title() {
        assert_eq!(
            output(0, Some("Q3: Results / Outlook")).file_stem("report"),
            "report_Q3__Results___Outlook"
        );
        assert_eq!(output(0, Some("a\t\n b")).file_stem(""), "a_b");
    }

    #[test]
    fn test_file_stem_keeps_surrounding_whitespace_as_underscores() {
        assert_eq!(output(0, Some("  Intro ")).file_stem("report"), "report__Intro_");
        assert_eq!(output(0, Some("   ")).file_stem("doc"), "doc__");
    }

    #[test]
    fn test_file_stem_without_title() {
        assert_eq!(output(6, None).file_stem("report"), "report_section_007");
        assert_eq!(output(0, Some("")).file_stem("doc"), "doc_section_001");
        assert_eq!(output(2, Some("\u{7}")).file_stem("doc"), "doc_section_003");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Splitter::new(SplitPolicy::default(), SplitOptions::default().workers(0)).unwrap_err();
        assert_eq!(err, PolicyError::ZeroWorkers);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        let splitter = Splitter::new(SplitPolicy::default(), SplitOptions::default().workers(1))
            .unwrap()
            .with_cancellation(token.clone());
        token.cancel();
        assert!(matches!(splitter.split(b"irrelevant"), Err(Error::Cancelled)));
    }
}
