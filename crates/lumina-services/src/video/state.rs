use lumina_core::MediaError;
use lumina_processing::ProcessingError;

/// Outcome of a failed transcode attempt. Cloned to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("stream directory unavailable: {0}")]
    Storage(String),

    #[error("transcode worker panicked")]
    WorkerPanicked,
}

impl From<ProcessingError> for StreamError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::ProbeFailed(msg) => StreamError::ProbeFailed(msg),
            ProcessingError::TranscodeFailed(msg) => StreamError::TranscodeFailed(msg),
            other => StreamError::TranscodeFailed(other.to_string()),
        }
    }
}

impl From<StreamError> for MediaError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::ProbeFailed(msg) => MediaError::ProbeFailed(msg),
            StreamError::TranscodeFailed(msg) => MediaError::TranscodeFailed(msg),
            StreamError::Storage(msg) => MediaError::Storage(msg),
            StreamError::WorkerPanicked => {
                MediaError::Internal("transcode worker panicked".to_string())
            }
        }
    }
}

/// Lifecycle of one streamer's background job.
///
/// `Idle → Transcoding → {Done, Failed}`. A request made after `Failed`
/// moves the streamer back to `Transcoding`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TranscodeState {
    #[default]
    Idle,
    Transcoding,
    Done,
    Failed(StreamError),
}

impl TranscodeState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TranscodeState::Done | TranscodeState::Failed(_))
    }

    pub fn error(&self) -> Option<&StreamError> {
        match self {
            TranscodeState::Failed(err) => Some(err),
            _ => None,
        }
    }
}
