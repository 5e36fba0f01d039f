//! Output for classification results
//!
//! Three kinds of output come out of a run:
//!
//! - **Feature logs** ([`FeatureLog`]): one text file per WAV, one line per
//!   chunk, the leading magnitude bins as `0.123456, 7.890123, ...`
//! - **Result log** ([`ResultLog`]): one append-only text file per corpus,
//!   one line per file, the same line printed to the console
//! - **Summary reports** ([`generate`]): optional JSON or CSV over the
//!   whole batch, picked by file extension
//!
//! # Usage
//!
//! ```ignore
//! use wavclass::report;
//!
//! report::generate("summary.json", &reports)?;  // JSON
//! report::generate("summary.csv", &reports)?;   // CSV
//! ```

pub mod csv;
pub mod json;
mod sinks;

pub use sinks::{FeatureLog, ResultLog};

use crate::analyzer::{FileReport, FileStatus};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Human-readable per-file line shared by the console and the result log
pub fn result_line(report: &FileReport) -> String {
    format!(
        "File: {}  Chunks: {}  Positive/Total: {}/{} = {:.4}",
        report.file_path,
        report.tally.processed,
        report.tally.positive,
        report.tally.processed,
        report.ratio
    )
}

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, reports: &[FileReport]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, reports),
        _ => csv::write(&mut file, reports),
    }
}

/// Summary statistics for a batch of files
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub aborted: usize,
    pub skipped: usize,
    pub chunks: u64,
    pub positive: u64,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Default::default()
        };

        for r in reports {
            match r.status {
                FileStatus::Completed => summary.completed += 1,
                FileStatus::Aborted => summary.aborted += 1,
                FileStatus::Skipped => summary.skipped += 1,
            }
            summary.chunks += r.tally.processed as u64;
            summary.positive += r.tally.positive as u64;
        }

        summary
    }

    /// Positive chunks over all chunks in the batch
    pub fn overall_ratio(&self) -> f64 {
        if self.chunks == 0 {
            0.0
        } else {
            self.positive as f64 / self.chunks as f64
        }
    }
}

#[cfg(test)]
pub(crate) fn test_report(status: FileStatus, processed: u32, positive: u32) -> FileReport {
    use crate::analyzer::ClassificationTally;

    let tally = ClassificationTally {
        processed,
        positive,
    };
    FileReport {
        file_path: "/sd/rec/a.wav".to_string(),
        file_name: "a.wav".to_string(),
        status,
        header: None,
        tally,
        ratio: tally.ratio(),
        error: None,
    }
}
