//! Video probing, HLS segmenting and frame capture through ffprobe/ffmpeg.

pub mod ffmpeg;
pub mod probe;
pub mod tool;

pub use ffmpeg::SegmentParams;
pub use probe::ProbeReport;
pub use tool::{FfmpegTool, VideoTool};
