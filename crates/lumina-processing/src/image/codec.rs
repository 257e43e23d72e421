//! Image codec: decode a source still, scale it, encode it as webp.

use image::{DynamicImage, GenericImageView, ImageReader};
use lumina_core::MediaType;
use std::io::Cursor;
use std::path::Path;

use super::exif;
use super::orientation::ImageOrientation;
use super::resize::ImageResize;
use crate::error::{ProcessingError, ProcessingResult};

/// One decoded page, already rotated upright.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Pages in the source file (1 for single-page formats).
    pub page_count: u32,
    /// Clockwise rotation applied from the EXIF orientation.
    pub rotation: u16,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            page_count: 1,
            rotation: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decoder/encoder used to build still derivatives.
///
/// Implementations must be deterministic: encoding the same decoded image
/// with the same quality must produce identical bytes.
pub trait ImageCodec: Send + Sync {
    /// Decode the 0-based `page` of the file at `path`.
    fn decode(
        &self,
        path: &Path,
        media_type: &MediaType,
        page: u32,
    ) -> ProcessingResult<DecodedImage>;

    /// Decode an in-memory still, e.g. a frame captured from a video.
    fn decode_buffer(&self, data: &[u8]) -> ProcessingResult<DecodedImage>;

    /// Scale both edges by `scale`, in place.
    fn resize(&self, image: &mut DecodedImage, scale: f64);

    /// Encode as webp. A quality of 100 or more encodes losslessly.
    fn encode_webp(&self, image: &DecodedImage, quality: f32) -> ProcessingResult<Vec<u8>>;
}

/// `ImageCodec` built on the `image`, `webp` and `kamadak-exif` crates.
///
/// Handles single-page rasters and camera raws with an embedded JPEG
/// preview. Multi-page documents are rasterized by a `DocumentTool` first
/// and reach the codec through `decode_buffer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpCodec;

impl WebpCodec {
    fn decode_bytes(data: &[u8], path: &Path) -> ProcessingResult<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        reader.decode().map_err(|e| ProcessingError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn upright(image: DynamicImage, orientation: u8) -> DecodedImage {
        let (rotation, _, _) = ImageOrientation::get_orientation_transforms(orientation);
        DecodedImage {
            image: ImageOrientation::apply(image, orientation),
            page_count: 1,
            rotation: rotation.unwrap_or(0),
        }
    }
}

impl ImageCodec for WebpCodec {
    fn decode(
        &self,
        path: &Path,
        media_type: &MediaType,
        page: u32,
    ) -> ProcessingResult<DecodedImage> {
        if media_type.multi_page {
            return Err(ProcessingError::UnsupportedFormat(media_type.mime.to_string()));
        }

        if page != 0 {
            return Err(ProcessingError::Decode {
                path: path.display().to_string(),
                reason: format!("page {} out of range for single-page image", page),
            });
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(path)?;

        let (image, orientation) = if media_type.raw {
            let preview = exif::embedded_preview(&data).ok_or_else(|| ProcessingError::Decode {
                path: path.display().to_string(),
                reason: "raw file has no embedded preview".to_string(),
            })?;
            (
                Self::decode_bytes(&preview, path)?,
                exif::read_orientation(&data),
            )
        } else {
            (Self::decode_bytes(&data, path)?, exif::read_orientation(&data))
        };

        let decoded = Self::upright(image, orientation);

        tracing::debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            orientation = orientation,
            duration_ms = start.elapsed().as_millis(),
            "Image decoded"
        );

        Ok(decoded)
    }

    fn decode_buffer(&self, data: &[u8]) -> ProcessingResult<DecodedImage> {
        let image = Self::decode_bytes(data, Path::new("<memory>"))?;
        Ok(Self::upright(image, exif::read_orientation(data)))
    }

    fn resize(&self, image: &mut DecodedImage, scale: f64) {
        image.image = ImageResize::resize_by_scale(&image.image, scale);
    }

    fn encode_webp(&self, image: &DecodedImage, quality: f32) -> ProcessingResult<Vec<u8>> {
        let (width, height) = image.image.dimensions();
        if width == 0 || height == 0 {
            return Err(ProcessingError::Encode("image has no pixels".to_string()));
        }

        // Convert to RGBA for WebP encoding
        let rgba_img = image.image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);

        let webp_data = if quality >= 100.0 {
            encoder.encode_lossless()
        } else {
            encoder.encode(quality.clamp(0.0, 100.0))
        };

        Ok(webp_data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        let path = dir.join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 64, 32);

        let decoded = WebpCodec
            .decode(&path, &MediaType::from_extension("png"), 0)
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
        assert_eq!(decoded.page_count, 1);
        assert_eq!(decoded.rotation, 0);
    }

    #[test]
    fn test_decode_rejects_documents_and_extra_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 8, 8);

        let pdf = MediaType::from_extension("pdf");
        assert!(matches!(
            WebpCodec.decode(&path, &pdf, 0),
            Err(ProcessingError::UnsupportedFormat(_))
        ));

        let png = MediaType::from_extension("png");
        assert!(WebpCodec.decode(&path, &png, 1).is_err());
    }

    #[test]
    fn test_decode_buffer() {
        let img = RgbaImage::from_pixel(20, 10, Rgba([9, 9, 9, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let decoded = WebpCodec.decode_buffer(&buffer).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
        assert!(WebpCodec.decode_buffer(b"\xff\xd8 truncated").is_err());
    }

    #[test]
    fn test_decode_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let result = WebpCodec.decode(&path, &MediaType::from_extension("jpg"), 0);
        assert!(matches!(result, Err(ProcessingError::Decode { .. })));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 300, 200);
        let png = MediaType::from_extension("png");

        let encode = |quality: f32| {
            let mut decoded = WebpCodec.decode(&path, &png, 0).unwrap();
            WebpCodec.resize(&mut decoded, 0.5);
            WebpCodec.encode_webp(&decoded, quality).unwrap()
        };

        assert_eq!(encode(85.0), encode(85.0));
        assert_eq!(encode(100.0), encode(100.0));
    }

    #[test]
    fn test_encoded_webp_decodes_to_scaled_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 1000, 400);

        let mut decoded = WebpCodec
            .decode(&path, &MediaType::from_extension("png"), 0)
            .unwrap();
        WebpCodec.resize(&mut decoded, 0.5);
        let bytes = WebpCodec.encode_webp(&decoded, 80.0).unwrap();

        let round = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(round.dimensions(), (500, 200));
    }
}
