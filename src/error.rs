use thiserror::Error;

/// How far a failure reaches: the whole run, one file, or the rest of one
/// file's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Process,
    File,
    Chunk,
}

/// All errors produced by wavclass.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer allocation failed: {0}")]
    Allocation(String),

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("pipeline is not ready")]
    PipelineNotReady,

    #[error("invalid WAV file: {len} bytes is smaller than the {min}-byte header")]
    HeaderTooSmall { len: u64, min: u64 },

    #[error("no 'data' chunk found")]
    MissingDataChunk,

    #[error("chunk '{id}' at offset {offset} declares {size} bytes, past end of stream ({len} bytes)")]
    ChunkOutOfBounds {
        id: String,
        offset: u64,
        size: u64,
        len: u64,
    },

    #[error("data chunk declares {size} bytes at offset {offset}, but stream is only {len} bytes")]
    DataOutOfBounds { offset: u64, size: u64, len: u64 },

    #[error("unsupported audio format (format code {format_code}, {bits_per_sample} bits)")]
    UnsupportedEncoding {
        format_code: u16,
        bits_per_sample: u16,
    },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::Allocation(_)
            | Error::InvalidConfig(_)
            | Error::PipelineNotReady
            | Error::InvalidModel(_)
            | Error::Json(_) => Severity::Process,
            Error::HeaderTooSmall { .. }
            | Error::MissingDataChunk
            | Error::ChunkOutOfBounds { .. }
            | Error::DataOutOfBounds { .. }
            | Error::Io(_) => Severity::File,
            Error::UnsupportedEncoding { .. } => Severity::Chunk,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
