//! Typed view over `ffprobe -print_format json -show_format -show_streams`.

use serde::Deserialize;

use crate::error::{ProcessingError, ProcessingResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    /// ffprobe reports numbers as strings.
    pub bit_rate: Option<String>,
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub bit_rate: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Option<Vec<ProbeStream>>,
}

fn parse_bitrate(value: &str) -> ProcessingResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ProcessingError::ProbeFailed(format!("invalid bitrate {:?}: {}", value, e)))
}

impl ProbeReport {
    pub fn from_json(data: &[u8]) -> ProcessingResult<Self> {
        let report: ProbeReport = serde_json::from_slice(data)
            .map_err(|e| ProcessingError::ProbeFailed(format!("unreadable probe output: {}", e)))?;

        if report.format.is_none() || report.streams.is_none() {
            return Err(ProcessingError::ProbeFailed("invalid movie format".to_string()));
        }
        Ok(report)
    }

    fn streams(&self) -> &[ProbeStream] {
        self.streams.as_deref().unwrap_or(&[])
    }

    fn streams_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ProbeStream> + 'a {
        self.streams()
            .iter()
            .filter(move |s| s.codec_type.as_deref() == Some(kind))
    }

    /// Container bitrate, capped at `cap` bits per second.
    pub fn video_bitrate(&self, cap: u64) -> ProcessingResult<u64> {
        let raw = self
            .format
            .as_ref()
            .and_then(|f| f.bit_rate.as_deref())
            .ok_or_else(|| ProcessingError::ProbeFailed("bitrate does not exist".to_string()))?;
        Ok(parse_bitrate(raw)?.min(cap))
    }

    /// Bitrate of the first audio stream that reports one, or `default`.
    pub fn audio_bitrate(&self, default: u64) -> ProcessingResult<u64> {
        match self.streams_of("audio").find_map(|s| s.bit_rate.as_deref()) {
            Some(raw) => parse_bitrate(raw),
            None => Ok(default),
        }
    }

    pub fn has_video_stream(&self) -> bool {
        self.streams_of("video").next().is_some()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        let secs: f64 = self.format.as_ref()?.duration.as_deref()?.parse().ok()?;
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        Some((secs * 1000.0).round() as u64)
    }

    /// Frame size of the first video stream.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.streams_of("video")
            .find_map(|s| Some((s.width?, s.height?)))
    }
}
