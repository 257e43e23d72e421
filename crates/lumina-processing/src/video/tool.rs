//! External video tool abstraction and its ffmpeg/ffprobe implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::ffmpeg::{self, SegmentParams};
use super::probe::ProbeReport;
use crate::command::{validate_binary, validate_path};
use crate::error::{ProcessingError, ProcessingResult};

/// Operations the streamer and the thumbnail path need from a video toolchain.
#[async_trait]
pub trait VideoTool: Send + Sync {
    /// Inspect container and stream metadata.
    async fn probe(&self, path: &Path) -> ProcessingResult<ProbeReport>;

    /// Transcode `input` into segments plus playlist under `output_dir`.
    /// Returns once the tool has exited.
    async fn segment(
        &self,
        input: &Path,
        output_dir: &Path,
        params: &SegmentParams,
    ) -> ProcessingResult<()>;

    /// Encoded JPEG of the frame at `frame_index`.
    async fn extract_frame(&self, path: &Path, frame_index: u32) -> ProcessingResult<Vec<u8>>;
}

/// Runs the `ffmpeg` and `ffprobe` binaries as child processes.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTool {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        ffprobe_path: impl Into<String>,
    ) -> ProcessingResult<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        let ffprobe_path = ffprobe_path.into();
        validate_binary(&ffmpeg_path)?;
        validate_binary(&ffprobe_path)?;

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }
}

#[async_trait]
impl VideoTool for FfmpegTool {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, path: &Path) -> ProcessingResult<ProbeReport> {
        let start = std::time::Instant::now();
        validate_path(path)?;

        let output = Command::new(&self.ffprobe_path)
            .args(ffmpeg::probe_args(path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ProcessingError::ProbeFailed(format!("Failed to execute ffprobe: {}", e))
            })?;

        if !output.status.success() {
            return Err(ProcessingError::ProbeFailed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let report = ProbeReport::from_json(&output.stdout)?;
        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            streams = report.streams.as_ref().map(Vec::len).unwrap_or(0),
            "Video probe completed"
        );
        Ok(report)
    }

    #[tracing::instrument(skip(self, params), fields(
        process.executable.name = "ffmpeg",
        ffmpeg.operation = "segment",
        video_bitrate = params.video_bitrate,
        audio_bitrate = params.audio_bitrate
    ))]
    async fn segment(
        &self,
        input: &Path,
        output_dir: &Path,
        params: &SegmentParams,
    ) -> ProcessingResult<()> {
        let start = std::time::Instant::now();
        validate_path(input)?;
        validate_path(output_dir)?;

        let output = Command::new(&self.ffmpeg_path)
            .args(ffmpeg::segment_args(input, output_dir, params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProcessingError::TranscodeFailed(format!("Failed to execute ffmpeg: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(stderr = %stderr, "FFmpeg segmenting failed");
            return Err(ProcessingError::TranscodeFailed(format!(
                "FFmpeg failed: {}",
                stderr
            )));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            "Video segmenting completed"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        ffmpeg.operation = "extract_frame"
    ))]
    async fn extract_frame(&self, path: &Path, frame_index: u32) -> ProcessingResult<Vec<u8>> {
        validate_path(path)?;

        let output = Command::new(&self.ffmpeg_path)
            .args(ffmpeg::frame_args(path, frame_index))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ProcessingError::TranscodeFailed(format!("Failed to execute ffmpeg: {}", e))
            })?;

        if !output.status.success() {
            return Err(ProcessingError::TranscodeFailed(format!(
                "FFmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        if output.stdout.is_empty() {
            return Err(ProcessingError::TranscodeFailed(format!(
                "no frame {} in {}",
                frame_index,
                path.display()
            )));
        }

        Ok(output.stdout)
    }
}
