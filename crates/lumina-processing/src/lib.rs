//! Lumina Media Processing Library
//!
//! This crate wraps the native pipelines used to build derivatives: image
//! decoding, EXIF orientation, resizing and webp encoding, plus the external
//! ffprobe/ffmpeg tools used for video probing, segmenting and frame capture
//! and the poppler tools that rasterize document pages.

pub mod command;
pub mod error;

#[cfg(feature = "document")]
pub mod document;

#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "video")]
pub mod video;

// Re-export commonly used types
pub use error::{ProcessingError, ProcessingResult};

#[cfg(feature = "document")]
pub use crate::document::{DocumentTool, PopplerTool};

#[cfg(feature = "image")]
pub use crate::image::{DecodedImage, ImageCodec, ImageOrientation, ImageResize, WebpCodec};

#[cfg(feature = "video")]
pub use crate::video::{FfmpegTool, ProbeReport, SegmentParams, VideoTool};
