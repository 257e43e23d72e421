//! Video streaming: per-media transcode state machine and its registry.

pub mod registry;
pub mod state;
pub mod streamer;

pub use registry::StreamRegistry;
pub use state::{StreamError, TranscodeState};
pub use streamer::{ListFile, StreamConfig, VideoStreamer};
