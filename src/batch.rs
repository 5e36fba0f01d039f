//! Corpus enumeration and the per-file batch loop

use crate::analyzer::classifier::Classifier;
use crate::analyzer::spectral::FrequencyTransform;
use crate::analyzer::{ChunkPipeline, FileReport};
use crate::error::{Error, Result};
use crate::report::ResultLog;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Find WAV files under `root`, sorted by name.
///
/// A file path is returned as-is. A directory is searched one level deep
/// unless `recursive` is set. Extensions match case-insensitively.
pub fn collect_wav_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a file or directory", root.display()),
        )));
    }

    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let files = walker
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_wav(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();

    Ok(files)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Where the feature log for `wav` goes: `<stem>.txt` next to the WAV, or
/// inside `features_dir` when one is given.
pub fn feature_log_path(wav: &Path, features_dir: Option<&Path>) -> PathBuf {
    let name = wav.with_extension("txt");
    match (features_dir, name.file_name()) {
        (Some(dir), Some(file)) => dir.join(file),
        _ => name,
    }
}

/// Run every file through `pipeline` in order.
///
/// Every visited file gets a line in `result_log`, skipped files included
/// (as 0/0). One file's failure never stops the batch. `on_file` sees every
/// report as it is produced.
pub fn run_batch<T, C, W, F>(
    pipeline: &mut ChunkPipeline<T>,
    classifier: &C,
    files: &[PathBuf],
    features_dir: Option<&Path>,
    result_log: &mut ResultLog<W>,
    mut on_file: F,
) -> Vec<FileReport>
where
    T: FrequencyTransform,
    C: Classifier,
    W: Write,
    F: FnMut(&FileReport),
{
    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        let features_path = feature_log_path(path, features_dir);
        debug!("{} -> {}", path.display(), features_path.display());

        let report = pipeline.process_file(path, classifier, &features_path);

        if let Err(e) = result_log.record(&report) {
            warn!("Failed to write result line for {}: {}", path.display(), e);
        }

        on_file(&report);
        reports.push(report);
    }

    reports
}
