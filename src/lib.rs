//! wavclass - Chunked spectral classification of WAV recordings
//!
//! wavclass walks a directory of WAV files and, for each one, cuts the
//! sample data into fixed-size chunks, turns every chunk into a magnitude
//! spectrum, keeps the lowest bins as a feature vector, and asks a binary
//! classifier whether the chunk is "positive". The per-file result is the
//! fraction of positive chunks.
//!
//! # Pipeline
//!
//! ```text
//! WAV bytes ─► header ─► samples ─► Hamming window ─► FFT ─► |X[k]|
//!                                                              │
//!          tally ◄─ classifier ◄─ first FEATURE_SIZE bins ◄────┘
//! ```
//!
//! Every buffer is allocated once, up front, and reused for every chunk
//! of every file. Allocation failure leaves the pipeline in
//! [`PipelineState::Failed`] instead of aborting.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use wavclass::{ChunkPipeline, PipelineConfig, PredictionEngine};
//!
//! let mut engine = PredictionEngine::new();
//! engine.initialize().expect("built-in model");
//!
//! let mut pipeline = ChunkPipeline::new(PipelineConfig::default());
//! let report = pipeline.process_file(
//!     Path::new("recording.wav"),
//!     &engine,
//!     Path::new("recording.txt"),
//! );
//!
//! println!(
//!     "{} chunks, {} positive ({:.4})",
//!     report.tally.processed, report.tally.positive, report.ratio
//! );
//! ```
//!
//! # Modules
//!
//! - [`wav`]: RIFF/WAVE header parsing
//! - [`analyzer`]: per-file chunk pipeline (decode, transform, classify)
//! - [`batch`]: corpus enumeration and the per-file loop
//! - [`report`]: feature logs, result log, JSON/CSV summaries
//! - [`config`]: pipeline constants and sizes

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod error;
pub mod report;
pub mod wav;

pub use analyzer::classifier::{Classifier, PredictionEngine, RandomForest};
pub use analyzer::{ChunkPipeline, ClassificationTally, FileReport, FileStatus, PipelineState};
pub use config::PipelineConfig;
pub use error::{Error, Result};
