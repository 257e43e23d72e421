//! Derivative quality tiers and the canonical cache file name for each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DERIVATIVE_EXTENSION;
use crate::error::{MediaError, MediaResult};

/// Derivative tier. Only `LowRes` and `HighRes` have a stored still
/// rendition; `Video` derivatives live in a per-media stream directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "thumbnail")]
    LowRes,
    #[serde(rename = "fullres")]
    HighRes,
    #[serde(rename = "video")]
    Video,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::LowRes => "thumbnail",
            Quality::HighRes => "fullres",
            Quality::Video => "video",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(Quality::LowRes),
            "fullres" => Ok(Quality::HighRes),
            "video" => Ok(Quality::Video),
            other => Err(MediaError::InvalidQuality(other.to_string())),
        }
    }
}

/// Canonical cache file name for a still derivative.
///
/// `page` is a 1-based page number; only full-resolution pages after the
/// first carry a suffix, so a thumbnail is always a single file per media.
pub fn derivative_name(content_id: &str, quality: Quality, page: u32) -> MediaResult<String> {
    let suffix = match quality {
        Quality::LowRes => String::new(),
        Quality::HighRes if page > 1 => format!("_{}", page),
        Quality::HighRes => String::new(),
        Quality::Video => return Err(MediaError::InvalidQuality(quality.to_string())),
    };

    Ok(format!(
        "{}-{}{}.{}",
        content_id, quality, suffix, DERIVATIVE_EXTENSION
    ))
}
