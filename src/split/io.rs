//! Async file helpers around the split pipeline.

use super::pipeline::{CancellationToken, FragmentFailure, SplitReport, Splitter};
use crate::common::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Files written by [`split_file`].
#[derive(Debug, Default)]
pub struct WrittenFragments {
    /// Output paths, in document order
    pub paths: Vec<PathBuf>,
    /// Fragments that were not written, in document order
    pub failures: Vec<FragmentFailure>,
    /// Whether the operation stopped on cancellation; `paths` lists what is
    /// already on disk
    pub cancelled: bool,
}

/// Split the document at `path` and write every fragment into `out_dir`.
///
/// Files are named from [`FragmentOutput::file_stem`](super::FragmentOutput::file_stem)
/// with the input's extension; colliding names get a `_N` suffix. Outputs are
/// written in document order and cancellation is checked before each write.
/// Files already written stay on disk when the operation stops early, and
/// the fragments left unwritten are reported as cancelled failures.
pub async fn split_file(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    prefix: &str,
    splitter: Arc<Splitter>,
) -> Result<WrittenFragments> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin")
        .to_string();

    let bytes = tokio::fs::read(path).await?;
    let worker = Arc::clone(&splitter);
    let report = tokio::task::spawn_blocking(move || worker.split(&bytes))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

    write_fragments(report, out_dir.as_ref(), prefix, &extension, splitter.cancellation_token()).await
}

async fn write_fragments(
    report: SplitReport,
    out_dir: &Path,
    prefix: &str,
    extension: &str,
    cancel: &CancellationToken,
) -> Result<WrittenFragments> {
    tokio::fs::create_dir_all(out_dir).await?;
    let mut written = WrittenFragments {
        paths: Vec::with_capacity(report.outputs.len()),
        cancelled: report
            .failures
            .iter()
            .any(|failure| matches!(failure.error, Error::Cancelled)),
        failures: report.failures,
    };
    let mut taken = HashSet::new();
    let mut outputs = report.outputs.into_iter();
    while let Some(output) = outputs.next() {
        if cancel.is_cancelled() {
            let unwritten = std::iter::once(output).chain(outputs.by_ref());
            written.failures.extend(unwritten.map(|output| FragmentFailure {
                index: output.index,
                error: Error::Cancelled,
            }));
            written.failures.sort_by_key(|failure| failure.index);
            written.cancelled = true;
            tracing::info!(written = written.paths.len(), "writing stopped on cancellation");
            break;
        }
        let stem = unique_stem(output.file_stem(prefix), &mut taken);
        let target = out_dir.join(format!("{stem}.{extension}"));
        tokio::fs::write(&target, &output.bytes).await?;
        tracing::debug!(fragment = output.index, path = %target.display(), "fragment written");
        written.paths.push(target);
    }
    Ok(written)
}

fn unique_stem(stem: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(stem.to_lowercase()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
