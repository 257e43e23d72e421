//! Error types module
//!
//! This module provides the error taxonomy shared by the derivative pipeline,
//! the video streamer and the similarity ranker. Every failure surfaced to a
//! caller is a `MediaError`; crate-local error types (storage, processing)
//! convert into it at the crate boundary.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a bad quality argument
    Debug,
    /// Warning level - for recoverable issues like a tripped circuit breaker
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// by whatever transport sits on top of this crate.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_CACHED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid quality: {0}")]
    InvalidQuality(String),

    #[error("Derivative not cached: {0}")]
    NotCached(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Media is not a video: {0}")]
    NotVideo(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("No media matched the similarity threshold")]
    NoSimilarityMatch,

    #[error("Chunk not found: {0}")]
    ChunkNotFound(String),

    #[error("Similarity service returned {actual} scores for {expected} media")]
    ScoreCountMismatch { expected: usize, actual: usize },

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl From<anyhow::Error> for MediaError {
    fn from(err: anyhow::Error) -> Self {
        MediaError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for MediaError {
    fn from(err: io::Error) -> Self {
        MediaError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn media_error_static_metadata(err: &MediaError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        MediaError::InvalidQuality(_) => (400, "INVALID_QUALITY", false, LogLevel::Debug),
        MediaError::NotCached(_) => (404, "NOT_CACHED", true, LogLevel::Debug),
        MediaError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        MediaError::UnsupportedMediaType(_) => {
            (415, "UNSUPPORTED_MEDIA_TYPE", false, LogLevel::Debug)
        }
        MediaError::NotVideo(_) => (400, "NOT_VIDEO", false, LogLevel::Debug),
        MediaError::ServiceUnavailable(_) => (503, "SERVICE_UNAVAILABLE", true, LogLevel::Warn),
        MediaError::ProbeFailed(_) => (500, "PROBE_FAILED", false, LogLevel::Error),
        MediaError::TranscodeFailed(_) => (500, "TRANSCODE_FAILED", true, LogLevel::Error),
        MediaError::NoSimilarityMatch => (404, "NO_SIMILARITY_MATCH", false, LogLevel::Debug),
        MediaError::ChunkNotFound(_) => (404, "CHUNK_NOT_FOUND", true, LogLevel::Debug),
        MediaError::ScoreCountMismatch { .. } => {
            (502, "SCORE_COUNT_MISMATCH", false, LogLevel::Error)
        }
        MediaError::Embedding(_) => (502, "EMBEDDING_ERROR", true, LogLevel::Warn),
        MediaError::ImageProcessing(_) => (500, "IMAGE_PROCESSING_ERROR", false, LogLevel::Error),
        MediaError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        MediaError::Timeout(_) => (504, "TIMEOUT", true, LogLevel::Warn),
        MediaError::Cancelled => (499, "CANCELLED", true, LogLevel::Debug),
        MediaError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        MediaError::Internal(_) | MediaError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", false, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for MediaError {
    fn http_status_code(&self) -> u16 {
        media_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        media_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        media_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        media_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            MediaError::Internal(_) | MediaError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            MediaError::Storage(_) => "Failed to access derivative storage".to_string(),
            MediaError::ImageProcessing(_) => "Failed to process image".to_string(),
            MediaError::ProbeFailed(_) | MediaError::TranscodeFailed(_) => {
                "Failed to prepare video stream".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_cached() {
        let err = MediaError::NotCached("abc123-thumbnail.webp".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_CACHED");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("abc123-thumbnail.webp"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_service_unavailable() {
        let err = MediaError::ServiceUnavailable("hdir".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "SERVICE_UNAVAILABLE");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = MediaError::from(anyhow::anyhow!("disk path /secret leaked"));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Internal server error");

        let err = MediaError::TranscodeFailed("ffmpeg exited with 1".to_string());
        assert_eq!(err.client_message(), "Failed to prepare video stream");
    }

    #[test]
    fn test_chunk_not_found_is_distinct() {
        let err = MediaError::ChunkNotFound("004.ts".to_string());
        assert!(matches!(err, MediaError::ChunkNotFound(_)));
        assert_eq!(err.error_code(), "CHUNK_NOT_FOUND");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: MediaError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, MediaError::Internal(msg) if msg.contains("boom")));
    }
}
