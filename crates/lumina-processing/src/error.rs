use lumina_core::MediaError;

/// Errors raised by codecs and external media tools.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Failed to encode: {0}")]
    Encode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl From<ProcessingError> for MediaError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::ProbeFailed(msg) => MediaError::ProbeFailed(msg),
            ProcessingError::TranscodeFailed(msg) => MediaError::TranscodeFailed(msg),
            ProcessingError::UnsupportedFormat(msg) => MediaError::UnsupportedMediaType(msg),
            ProcessingError::InvalidPath(msg) => MediaError::InvalidInput(msg),
            other => MediaError::ImageProcessing(other.to_string()),
        }
    }
}
