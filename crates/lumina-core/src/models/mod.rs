pub mod media;
pub mod media_type;
pub mod quality;

pub use media::{CacheFileRef, Media, MediaData, SourceFile};
pub use media_type::MediaType;
pub use quality::{derivative_name, Quality};
