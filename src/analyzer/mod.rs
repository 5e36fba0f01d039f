//! Per-file chunk pipeline
//!
//! Drives one WAV stream end to end:
//!
//! ```text
//! HeaderPending ──► HeaderOk ──► ChunkLoop ──► Done
//!       │
//!       └──► HeaderInvalid
//! ```
//!
//! Inside `ChunkLoop` every chunk goes bytes → samples → spectrum →
//! features → label → tally. All buffers are allocated once when the
//! pipeline is built and reused for every chunk of every file.
//!
//! Failures are scoped:
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Buffer allocation | pipeline stays `Failed`, every file is skipped |
//! | Bad header, missing/oversized chunk | this file is skipped |
//! | Unsupported sample encoding | loop never starts, file reports 0/0 |
//! | Short read, non-finite sample | sample becomes 0.0, loop continues |

pub mod classifier;
pub mod decoder;
pub mod features;
pub mod spectral;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::report::FeatureLog;
use crate::wav::{self, AudioStreamHeader};
use classifier::Classifier;
use decoder::SampleDecoder;
use features::FeatureVector;
use serde::Serialize;
use spectral::{FrequencyTransform, RustFftTransform, SpectralAdapter};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Allocate a zeroed buffer, reporting failure instead of aborting
pub(crate) fn try_alloc<T: Clone + Default>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| Error::Allocation(format!("{} ({} elements): {}", what, len, e)))?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Running count of positive predictions for one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationTally {
    pub processed: u32,
    pub positive: u32,
}

impl ClassificationTally {
    pub fn record(&mut self, label: u8) {
        self.processed += 1;
        if label != 0 {
            self.positive += 1;
        }
    }

    /// positive / processed, or 0.0 before any chunk
    pub fn ratio(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.positive as f64 / self.processed as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Every chunk in the data section was processed
    Completed,
    /// The chunk loop stopped early; the tally covers chunks before the stop
    Aborted,
    /// Nothing was processed (unreadable file or invalid header)
    Skipped,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Aborted => write!(f, "aborted"),
            FileStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of processing one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_path: String,
    pub file_name: String,
    pub status: FileStatus,
    pub header: Option<AudioStreamHeader>,
    pub tally: ClassificationTally,
    pub ratio: f64,
    pub error: Option<String>,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            file_path: path.display().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            status: FileStatus::Skipped,
            header: None,
            tally: ClassificationTally::default(),
            ratio: 0.0,
            error: None,
        }
    }

    fn skipped(path: &Path, err: &dyn std::fmt::Display) -> Self {
        let mut report = Self::new(path);
        report.error = Some(err.to_string());
        report
    }
}

/// Per-file progress through the pipeline
enum FileStage<W: Write> {
    HeaderPending,
    HeaderOk(AudioStreamHeader),
    HeaderInvalid(Error),
    ChunkLoop(AudioStreamHeader, FeatureLog<W>),
    Done(AudioStreamHeader, FileStatus, Option<Error>),
}

struct Buffers<T: FrequencyTransform> {
    decoder: SampleDecoder,
    spectral: SpectralAdapter<T>,
    features: FeatureVector,
}

pub struct ChunkPipeline<T: FrequencyTransform = RustFftTransform> {
    config: PipelineConfig,
    state: PipelineState,
    buffers: Option<Buffers<T>>,
}

impl ChunkPipeline<RustFftTransform> {
    /// Build a pipeline with the rustfft engine.
    ///
    /// Never fails outright: on a bad config or allocation failure the
    /// pipeline is returned in `PipelineState::Failed`.
    pub fn new(config: PipelineConfig) -> Self {
        match config
            .validate()
            .and_then(|_| RustFftTransform::new(config.fft_size))
        {
            Ok(engine) => Self::with_engine(config, engine),
            Err(e) => Self::failed(config, e),
        }
    }
}

impl<T: FrequencyTransform> ChunkPipeline<T> {
    pub fn with_engine(config: PipelineConfig, engine: T) -> Self {
        let mut pipeline = Self {
            config,
            state: PipelineState::Uninitialized,
            buffers: None,
        };
        match pipeline.allocate(engine) {
            Ok(buffers) => {
                pipeline.buffers = Some(buffers);
                pipeline.state = PipelineState::Ready;
            }
            Err(e) => return Self::failed(config, e),
        }
        pipeline
    }

    fn failed(config: PipelineConfig, err: Error) -> Self {
        error!(severity = ?err.severity(), "pipeline initialization failed: {}", err);
        Self {
            config,
            state: PipelineState::Failed,
            buffers: None,
        }
    }

    fn allocate(&self, engine: T) -> Result<Buffers<T>> {
        self.config.validate()?;
        Ok(Buffers {
            decoder: SampleDecoder::new(self.config.fft_size)?,
            spectral: SpectralAdapter::with_engine(self.config.fft_size, engine)?,
            features: FeatureVector::new(self.config.feature_size)?,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PipelineState::Ready
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Features from the most recent chunk
    pub fn features(&self) -> Option<&[f32]> {
        self.buffers.as_ref().map(|b| b.features.as_slice())
    }

    /// Process a WAV file on disk, writing its feature log to `features_path`.
    pub fn process_file<C: Classifier>(
        &mut self,
        path: &Path,
        classifier: &C,
        features_path: &Path,
    ) -> FileReport {
        if !self.is_ready() {
            return FileReport::skipped(path, &Error::PipelineNotReady);
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open WAV file {}: {}", path.display(), e);
                return FileReport::skipped(path, &e);
            }
        };
        let len = match file.metadata() {
            Ok(m) => m.len(),
            Err(e) => return FileReport::skipped(path, &e),
        };

        let mut source = BufReader::new(file);
        self.process_stream(path, &mut source, len, classifier, || {
            File::create(features_path).map(BufWriter::new)
        })
    }

    /// Process one WAV stream of `len` bytes.
    ///
    /// `open_features` is called once the header is known to be valid; a
    /// file with a bad header never gets a feature log.
    pub fn process_stream<R, C, W, F>(
        &mut self,
        path: &Path,
        source: &mut R,
        len: u64,
        classifier: &C,
        open_features: F,
    ) -> FileReport
    where
        R: Read + Seek,
        C: Classifier,
        W: Write,
        F: FnOnce() -> io::Result<W>,
    {
        let mut report = FileReport::new(path);
        let buffers = match self.buffers.as_mut() {
            Some(b) => b,
            None => {
                report.error = Some(Error::PipelineNotReady.to_string());
                return report;
            }
        };

        let mut open_features = Some(open_features);
        let mut stage: FileStage<W> = FileStage::HeaderPending;

        loop {
            stage = match stage {
                FileStage::HeaderPending => match wav::read_header(source, len) {
                    Ok(header) => FileStage::HeaderOk(header),
                    Err(e) => FileStage::HeaderInvalid(e),
                },

                FileStage::HeaderInvalid(e) => {
                    warn!(severity = ?e.severity(), "{}: {}", path.display(), e);
                    report.error = Some(e.to_string());
                    return report;
                }

                FileStage::HeaderOk(header) => {
                    info!(
                        "{}: {}, {} ch, {} Hz, {} bits, {} data bytes",
                        path.display(),
                        header.encoding,
                        header.channels,
                        header.sample_rate,
                        header.bits_per_sample,
                        header.data_len
                    );
                    if header.sample_rate != self.config.sample_rate {
                        debug!(
                            "sample rate {} differs from model rate {}",
                            header.sample_rate, self.config.sample_rate
                        );
                    }

                    let opened = match open_features.take() {
                        Some(open) => open(),
                        None => Err(io::Error::new(
                            io::ErrorKind::Other,
                            "feature log already opened",
                        )),
                    };
                    match opened {
                        Ok(writer) => FileStage::ChunkLoop(header, FeatureLog::new(writer)),
                        Err(e) => {
                            warn!("Failed to create feature file: {}", e);
                            report.header = Some(header);
                            report.error = Some(e.to_string());
                            return report;
                        }
                    }
                }

                FileStage::ChunkLoop(header, mut log) => {
                    let result = run_chunks(buffers, &header, source, classifier, &mut log, &mut report.tally);
                    let (status, err) = match result {
                        Ok(()) => (FileStatus::Completed, None),
                        Err(e) => {
                            warn!(
                                severity = ?e.severity(),
                                "{}: stopping after {} chunks: {}",
                                path.display(),
                                report.tally.processed,
                                e
                            );
                            (FileStatus::Aborted, Some(e))
                        }
                    };
                    debug!("{}: {} feature lines", path.display(), log.lines());
                    if let Err(e) = log.finish() {
                        warn!("Failed to flush feature file: {}", e);
                    }
                    FileStage::Done(header, status, err)
                }

                FileStage::Done(header, status, err) => {
                    report.header = Some(header);
                    report.status = status;
                    report.ratio = report.tally.ratio();
                    report.error = err.map(|e| e.to_string());
                    return report;
                }
            };
        }
    }
}

/// Decode → transform → reduce → classify every chunk of the data section
fn run_chunks<T, R, C, W>(
    buffers: &mut Buffers<T>,
    header: &AudioStreamHeader,
    source: &mut R,
    classifier: &C,
    log: &mut FeatureLog<W>,
    tally: &mut ClassificationTally,
) -> Result<()>
where
    T: FrequencyTransform,
    R: Read,
    C: Classifier,
    W: Write,
{
    // Rejected before any data is read, however long the data section is
    let width = header.sample_format()?.width() as u64;
    let chunk_samples = buffers.spectral.window().len() as u64;
    let feature_count = buffers.features.len();
    let end = header.data_end();
    let mut pos = header.data_offset;

    loop {
        let remaining = end.saturating_sub(pos);
        if remaining < width {
            if remaining > 0 {
                debug!("ignoring {} trailing bytes (partial sample)", remaining);
            }
            return Ok(());
        }

        let wanted = (remaining / width).min(chunk_samples) as usize;
        let samples = buffers.decoder.decode_chunk(
            source,
            header,
            remaining,
            buffers.spectral.window_mut(),
        )?;
        if samples == 0 {
            warn!("stream ended {} bytes before the declared data size", remaining);
            return Ok(());
        }
        pos += samples as u64 * width;

        buffers.spectral.run();
        let magnitudes = buffers.spectral.magnitudes();
        buffers.features.reduce_from(magnitudes);
        log.write_chunk(&magnitudes[..feature_count])?;

        let label = classifier.predict(buffers.features.as_slice());
        tally.record(label);
        debug!(
            "chunk {}: {} samples, label {}",
            tally.processed, samples, label
        );

        if samples < wanted {
            // Source ran dry mid-chunk; the padded chunk was the last one
            return Ok(());
        }
    }
}
