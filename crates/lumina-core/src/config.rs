//! Configuration module
//!
//! Settings for derivative generation, video streaming, the hot-bytes cache
//! and the embedding service. Values are read from the environment (after
//! loading a `.env` file when present) and fall back to the defaults below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AUDIO_BITRATE, HIGHRES_MAX_SIZE, HLS_SEGMENT_SECONDS, MAX_VIDEO_BITRATE,
    THUMB_MAX_SIZE, VIDEO_THUMBNAIL_FRAME,
};

const HOT_CACHE_CAPACITY: usize = 512;
const THUMB_WEBP_QUALITY: f32 = 85.0;
const HIGHRES_WEBP_QUALITY: f32 = 100.0;
const HDIR_TIMEOUT_SECS: u64 = 30;
const STREAM_POLL_INTERVAL_MS: u64 = 1000;
const DOCUMENT_RENDER_DPI: u32 = 150;

#[derive(Clone, Debug)]
pub struct LuminaConfig {
    pub environment: String,
    // Derivative cache
    pub cache_dir: PathBuf,
    pub thumb_max_size: u32,
    pub highres_max_size: u32,
    pub thumb_webp_quality: f32,
    /// 100 or above encodes full-resolution pages losslessly.
    pub highres_webp_quality: f32,
    pub hot_cache_capacity: usize,
    // External transcode tool
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub transcode_preset: String,
    pub hls_segment_duration: u64,
    pub max_video_bitrate: u64,
    pub default_audio_bitrate: u64,
    pub video_thumbnail_frame: u32,
    // External document tool
    pub pdfinfo_path: String,
    pub pdftoppm_path: String,
    pub document_render_dpi: u32,
    /// Unset means a waiting chunk request blocks until the job finishes.
    pub stream_wait_timeout: Option<Duration>,
    pub stream_poll_interval: Duration,
    // Embedding / similarity service
    pub hdir_enabled: bool,
    pub hdir_url: String,
    pub hdir_timeout: Duration,
    /// Unset keeps the circuit open for the rest of the process once tripped.
    pub hdir_recheck_after: Option<Duration>,
}

impl Default for LuminaConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            cache_dir: PathBuf::from("./data/cache"),
            thumb_max_size: THUMB_MAX_SIZE,
            highres_max_size: HIGHRES_MAX_SIZE,
            thumb_webp_quality: THUMB_WEBP_QUALITY,
            highres_webp_quality: HIGHRES_WEBP_QUALITY,
            hot_cache_capacity: HOT_CACHE_CAPACITY,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            transcode_preset: "ultrafast".to_string(),
            hls_segment_duration: HLS_SEGMENT_SECONDS,
            max_video_bitrate: MAX_VIDEO_BITRATE,
            default_audio_bitrate: DEFAULT_AUDIO_BITRATE,
            video_thumbnail_frame: VIDEO_THUMBNAIL_FRAME,
            pdfinfo_path: "pdfinfo".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            document_render_dpi: DOCUMENT_RENDER_DPI,
            stream_wait_timeout: None,
            stream_poll_interval: Duration::from_millis(STREAM_POLL_INTERVAL_MS),
            hdir_enabled: true,
            hdir_url: "http://localhost:5000".to_string(),
            hdir_timeout: Duration::from_secs(HDIR_TIMEOUT_SECS),
            hdir_recheck_after: None,
        }
    }
}

impl LuminaConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = LuminaConfig::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let config = LuminaConfig {
            environment,
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            thumb_max_size: env::var("THUMB_MAX_SIZE")
                .unwrap_or_else(|_| THUMB_MAX_SIZE.to_string())
                .parse()
                .unwrap_or(THUMB_MAX_SIZE),
            highres_max_size: env::var("HIGHRES_MAX_SIZE")
                .unwrap_or_else(|_| HIGHRES_MAX_SIZE.to_string())
                .parse()
                .unwrap_or(HIGHRES_MAX_SIZE),
            thumb_webp_quality: env::var("THUMB_WEBP_QUALITY")
                .unwrap_or_else(|_| THUMB_WEBP_QUALITY.to_string())
                .parse()
                .unwrap_or(THUMB_WEBP_QUALITY),
            highres_webp_quality: env::var("HIGHRES_WEBP_QUALITY")
                .unwrap_or_else(|_| HIGHRES_WEBP_QUALITY.to_string())
                .parse()
                .unwrap_or(HIGHRES_WEBP_QUALITY),
            hot_cache_capacity: env::var("HOT_CACHE_CAPACITY")
                .unwrap_or_else(|_| HOT_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(HOT_CACHE_CAPACITY),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            transcode_preset: env::var("TRANSCODE_PRESET").unwrap_or(defaults.transcode_preset),
            hls_segment_duration: env::var("HLS_SEGMENT_DURATION")
                .unwrap_or_else(|_| HLS_SEGMENT_SECONDS.to_string())
                .parse()
                .unwrap_or(HLS_SEGMENT_SECONDS),
            max_video_bitrate: env::var("MAX_VIDEO_BITRATE")
                .unwrap_or_else(|_| MAX_VIDEO_BITRATE.to_string())
                .parse()
                .unwrap_or(MAX_VIDEO_BITRATE),
            default_audio_bitrate: env::var("DEFAULT_AUDIO_BITRATE")
                .unwrap_or_else(|_| DEFAULT_AUDIO_BITRATE.to_string())
                .parse()
                .unwrap_or(DEFAULT_AUDIO_BITRATE),
            video_thumbnail_frame: env::var("VIDEO_THUMBNAIL_FRAME")
                .unwrap_or_else(|_| VIDEO_THUMBNAIL_FRAME.to_string())
                .parse()
                .unwrap_or(VIDEO_THUMBNAIL_FRAME),
            pdfinfo_path: env::var("PDFINFO_PATH").unwrap_or(defaults.pdfinfo_path),
            pdftoppm_path: env::var("PDFTOPPM_PATH").unwrap_or(defaults.pdftoppm_path),
            document_render_dpi: env::var("DOCUMENT_RENDER_DPI")
                .unwrap_or_else(|_| DOCUMENT_RENDER_DPI.to_string())
                .parse()
                .unwrap_or(DOCUMENT_RENDER_DPI),
            stream_wait_timeout: env::var("STREAM_WAIT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            stream_poll_interval: env::var("STREAM_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.stream_poll_interval),
            hdir_enabled: env::var("HDIR_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            hdir_url: env::var("HDIR_URL").unwrap_or(defaults.hdir_url),
            hdir_timeout: env::var("HDIR_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.hdir_timeout),
            hdir_recheck_after: env::var("HDIR_RECHECK_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.thumb_max_size == 0 || self.highres_max_size == 0 {
            return Err(anyhow::anyhow!(
                "THUMB_MAX_SIZE and HIGHRES_MAX_SIZE must be greater than zero"
            ));
        }

        if self.thumb_max_size > self.highres_max_size {
            return Err(anyhow::anyhow!(
                "THUMB_MAX_SIZE ({}) cannot exceed HIGHRES_MAX_SIZE ({})",
                self.thumb_max_size,
                self.highres_max_size
            ));
        }

        if !(0.0..=100.0).contains(&self.thumb_webp_quality)
            || !(0.0..=100.0).contains(&self.highres_webp_quality)
        {
            return Err(anyhow::anyhow!("WebP quality must be between 0 and 100"));
        }

        if self.hot_cache_capacity == 0 {
            return Err(anyhow::anyhow!("HOT_CACHE_CAPACITY must be at least 1"));
        }

        if self.hls_segment_duration == 0 {
            return Err(anyhow::anyhow!("HLS_SEGMENT_DURATION must be at least 1"));
        }

        if !(36..=600).contains(&self.document_render_dpi) {
            return Err(anyhow::anyhow!(
                "DOCUMENT_RENDER_DPI must be between 36 and 600"
            ));
        }

        if self.stream_poll_interval.is_zero() {
            return Err(anyhow::anyhow!("STREAM_POLL_INTERVAL_MS must be at least 1"));
        }

        if self.hdir_enabled
            && !(self.hdir_url.starts_with("http://") || self.hdir_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "HDIR_URL must be an http(s) URL when HDIR_ENABLED=true"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
