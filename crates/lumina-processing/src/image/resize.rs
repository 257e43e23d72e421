use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Scale factor that brings the longer edge down to `bound`, or `None`
    /// when the image already fits.
    pub fn fit_scale(width: u32, height: u32, bound: u32) -> Option<f64> {
        let longest = width.max(height);
        if longest <= bound || longest == 0 {
            return None;
        }
        Some(bound as f64 / longest as f64)
    }

    /// Dimensions after applying `scale` to both edges, never below 1px.
    pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
        let w = (width as f64 * scale).round() as u32;
        let h = (height as f64 * scale).round() as u32;
        (w.max(1), h.max(1))
    }

    /// Select optimal resize filter based on scale factor
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Resize by a uniform scale factor, preserving aspect ratio
    pub fn resize_by_scale(img: &DynamicImage, scale: f64) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::scaled_dimensions(orig_width, orig_height, scale);
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}
