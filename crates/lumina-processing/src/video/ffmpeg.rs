//! Argument builders for the ffmpeg/ffprobe invocations.

use std::path::Path;

use lumina_core::constants::{STREAM_LIST_FILE, STREAM_SEGMENT_PATTERN};

/// Encoder settings for one HLS segmenting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentParams {
    /// Bits per second, already capped.
    pub video_bitrate: u64,
    pub audio_bitrate: u64,
    pub segment_seconds: u64,
    /// x264 preset, e.g. `ultrafast`.
    pub preset: String,
}

pub fn probe_args(input: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        input.to_string_lossy().to_string(),
    ]
}

/// Segment `input` into `%03d.ts` MPEG-TS chunks plus a live `list.m3u8`
/// inside `output_dir`.
pub fn segment_args(input: &Path, output_dir: &Path, params: &SegmentParams) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        "0".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        params.preset.clone(),
        "-b:v".to_string(),
        params.video_bitrate.to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        params.audio_bitrate.to_string(),
        "-f".to_string(),
        "segment".to_string(),
        "-segment_format".to_string(),
        "mpegts".to_string(),
        "-segment_time".to_string(),
        params.segment_seconds.to_string(),
        "-segment_list_flags".to_string(),
        "+live".to_string(),
        "-segment_list".to_string(),
        output_dir.join(STREAM_LIST_FILE).to_string_lossy().to_string(),
        output_dir
            .join(STREAM_SEGMENT_PATTERN)
            .to_string_lossy()
            .to_string(),
    ]
}

/// Grab frame `frame_index` as a single JPEG written to stdout.
pub fn frame_args(input: &Path, frame_index: u32) -> Vec<String> {
    vec![
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        format!("select=gte(n\\,{})", frame_index),
        "-frames:v".to_string(),
        "1".to_string(),
        "-f".to_string(),
        "image2".to_string(),
        "-vcodec".to_string(),
        "mjpeg".to_string(),
        "pipe:".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_segment_args() {
        let params = SegmentParams {
            video_bitrate: 8_000_000,
            audio_bitrate: 192_000,
            segment_seconds: 5,
            preset: "ultrafast".to_string(),
        };
        let out = PathBuf::from("/cache/abc-stream");
        let args = segment_args(Path::new("/media/in.mp4"), &out, &params);

        assert_eq!(value_after(&args, "-i"), Some("/media/in.mp4"));
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-b:v"), Some("8000000"));
        assert_eq!(value_after(&args, "-b:a"), Some("192000"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-f"), Some("segment"));
        assert_eq!(value_after(&args, "-segment_format"), Some("mpegts"));
        assert_eq!(value_after(&args, "-segment_time"), Some("5"));
        assert_eq!(value_after(&args, "-segment_list_flags"), Some("+live"));
        assert_eq!(value_after(&args, "-preset"), Some("ultrafast"));
        assert_eq!(
            value_after(&args, "-segment_list"),
            Some("/cache/abc-stream/list.m3u8")
        );
        assert_eq!(args.last().map(String::as_str), Some("/cache/abc-stream/%03d.ts"));
    }

    #[test]
    fn test_frame_args() {
        let args = frame_args(Path::new("/media/in.mov"), 10);
        assert_eq!(value_after(&args, "-vf"), Some("select=gte(n\\,10)"));
        assert_eq!(value_after(&args, "-frames:v"), Some("1"));
        assert_eq!(value_after(&args, "-vcodec"), Some("mjpeg"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:"));
    }
}
