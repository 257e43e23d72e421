//! Registry of the media types the server knows how to handle.

use serde::Serialize;

/// Properties and capabilities of one mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaType {
    pub mime: &'static str,
    pub friendly_name: &'static str,
    pub extensions: &'static [&'static str],
    pub displayable: bool,
    pub raw: bool,
    pub video: bool,
    /// EXIF field holding the embedded preview for camera raw formats.
    pub raw_thumb_exif_key: Option<&'static str>,
    pub supports_img_recog: bool,
    pub multi_page: bool,
}

const GENERIC_MIME: &str = "generic";

const fn still(
    mime: &'static str,
    friendly_name: &'static str,
    extensions: &'static [&'static str],
    supports_img_recog: bool,
) -> MediaType {
    MediaType {
        mime,
        friendly_name,
        extensions,
        displayable: true,
        raw: false,
        video: false,
        raw_thumb_exif_key: None,
        supports_img_recog,
        multi_page: false,
    }
}

const fn raw(
    mime: &'static str,
    friendly_name: &'static str,
    extensions: &'static [&'static str],
    thumb_key: &'static str,
) -> MediaType {
    MediaType {
        raw: true,
        raw_thumb_exif_key: Some(thumb_key),
        ..still(mime, friendly_name, extensions, true)
    }
}

const fn video(
    mime: &'static str,
    friendly_name: &'static str,
    extensions: &'static [&'static str],
) -> MediaType {
    MediaType {
        video: true,
        ..still(mime, friendly_name, extensions, false)
    }
}

static MEDIA_TYPES: &[MediaType] = &[
    MediaType {
        displayable: false,
        ..still(GENERIC_MIME, "File", &[], false)
    },
    MediaType {
        displayable: false,
        ..still("application/zip", "Zip", &["zip"], false)
    },
    still("image/gif", "Gif", &["gif"], false),
    still("image/jpeg", "Jpeg", &["jpeg", "jpg"], true),
    still("image/png", "Png", &["png"], true),
    still("image/webp", "webp", &["webp"], true),
    raw("image/x-nikon-nef", "Nikon Raw", &["nef"], "JpgFromRaw"),
    raw("image/x-sony-arw", "Sony ARW", &["arw"], "PreviewImage"),
    raw("image/x-canon-cr2", "Canon Raw", &["cr2"], "PreviewImage"),
    MediaType {
        multi_page: true,
        ..still("application/pdf", "PDF", &["pdf"], false)
    },
    video("video/mp4", "MP4", &["mp4"]),
    video("video/quicktime", "QuickTime", &["mov"]),
    video("video/x-matroska", "MKV", &["mkv"]),
];

impl MediaType {
    /// The catch-all type for files the server does not process.
    pub fn generic() -> MediaType {
        MEDIA_TYPES[0]
    }

    /// Look up a media type by file extension (with or without the leading
    /// dot, case-insensitive). Unknown extensions resolve to `generic()`.
    pub fn from_extension(ext: &str) -> MediaType {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.is_empty() {
            return Self::generic();
        }

        MEDIA_TYPES
            .iter()
            .find(|mt| mt.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .copied()
            .unwrap_or_else(Self::generic)
    }

    pub fn from_mime(mime: &str) -> Option<MediaType> {
        MEDIA_TYPES.iter().find(|mt| mt.mime == mime).copied()
    }

    pub fn all() -> &'static [MediaType] {
        MEDIA_TYPES
    }

    pub fn is_supported(&self) -> bool {
        !self.mime.is_empty() && self.mime != GENERIC_MIME
    }

    /// Types the derivative pipeline can render: stills, documents and video.
    pub fn has_derivatives(&self) -> bool {
        self.is_supported() && self.displayable
    }

    pub fn is_mime(&self, mime: &str) -> bool {
        self.mime == mime
    }

    /// Stills that go through the image codec: displayable, not video.
    pub fn is_still(&self) -> bool {
        self.displayable && !self.video
    }
}

/// Content type served for files inside a video stream directory.
pub fn stream_content_type(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        let jpeg = MediaType::from_extension("JPG");
        assert_eq!(jpeg.mime, "image/jpeg");
        assert!(jpeg.displayable);
        assert!(!jpeg.raw);

        let nef = MediaType::from_extension(".NEF");
        assert_eq!(nef.mime, "image/x-nikon-nef");
        assert!(nef.raw);
        assert_eq!(nef.raw_thumb_exif_key, Some("JpgFromRaw"));

        let mov = MediaType::from_extension("mov");
        assert!(mov.video);
    }

    #[test]
    fn test_unknown_extension_is_generic() {
        let mt = MediaType::from_extension("xyz");
        assert_eq!(mt, MediaType::generic());
        assert!(!mt.is_supported());
        assert!(!MediaType::from_extension("").is_supported());
    }

    #[test]
    fn test_from_mime() {
        let pdf = MediaType::from_mime("application/pdf").unwrap();
        assert!(pdf.multi_page);
        assert!(pdf.is_still());
        assert!(MediaType::from_mime("text/plain").is_none());
    }

    #[test]
    fn test_undecodable_containers_are_generic() {
        assert!(!MediaType::from_extension("heic").is_supported());
        assert!(!MediaType::from_extension("HEIF").is_supported());
        assert!(MediaType::from_mime("image/heic").is_none());
    }

    #[test]
    fn test_has_derivatives() {
        assert!(MediaType::from_extension("png").has_derivatives());
        assert!(MediaType::from_extension("pdf").has_derivatives());
        assert!(MediaType::from_extension("mkv").has_derivatives());
        assert!(MediaType::from_extension("zip").is_supported());
        assert!(!MediaType::from_extension("zip").has_derivatives());
        assert!(!MediaType::generic().has_derivatives());
    }

    #[test]
    fn test_extensions_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for mt in MediaType::all() {
            for ext in mt.extensions {
                assert!(seen.insert(ext.to_ascii_lowercase()), "duplicate extension {}", ext);
            }
        }
    }

    #[test]
    fn test_stream_content_type() {
        assert_eq!(stream_content_type("list.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(stream_content_type("004.ts"), "video/mp2t");
        assert_eq!(stream_content_type("README"), "application/octet-stream");
    }
}
