//! Image decoding, orientation, resizing and webp encoding.

pub mod codec;
pub mod exif;
pub mod orientation;
pub mod resize;

pub use codec::{DecodedImage, ImageCodec, WebpCodec};
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
