//! Processing constants shared across crates.

/// Longest edge, in pixels, of a thumbnail derivative.
pub const THUMB_MAX_SIZE: u32 = 500;

/// Longest edge, in pixels, of a full-resolution derivative.
pub const HIGHRES_MAX_SIZE: u32 = 2500;

/// Every still derivative is stored as webp regardless of the source format.
pub const DERIVATIVE_EXTENSION: &str = "webp";

/// Frame index sampled from a video to build its thumbnail.
pub const VIDEO_THUMBNAIL_FRAME: u32 = 10;

/// Length of a single stream segment, in seconds.
pub const HLS_SEGMENT_SECONDS: u64 = 5;

/// Used when the source container does not report an audio bitrate.
pub const DEFAULT_AUDIO_BITRATE: u64 = 320_000;

/// Upper bound applied to the probed source bitrate before transcoding.
pub const MAX_VIDEO_BITRATE: u64 = 40_000_000;

pub const STREAM_LIST_FILE: &str = "list.m3u8";
pub const STREAM_SEGMENT_PATTERN: &str = "%03d.ts";
pub const STREAM_DIR_SUFFIX: &str = "-stream";
