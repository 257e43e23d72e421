//! Derivative cache manager
//!
//! Ensures that the thumbnail and full-resolution renditions of a media record
//! exist in cache storage and serves their bytes. Document pages are
//! rasterized by the document tool before they reach the codec.
//!
//! Generation is lazy and not mutually excluded: two callers may encode the
//! same rendition at once. The canonical name and a deterministic encoder
//! make the race harmless. Storage only publishes a name once its bytes are
//! complete, so the loser of the create gets `AlreadyExists`, adopts the
//! winner's finished file and returns the bytes it encoded itself, which are
//! identical.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use lumina_core::{
    derivative_name, CacheFileRef, LuminaConfig, Media, MediaError, MediaResult, MediaType,
    Quality, SourceFile,
};
use lumina_processing::{DecodedImage, DocumentTool, ImageCodec, ImageResize, VideoTool};
use lumina_storage::{CacheStorage, StorageError};

use crate::hot_cache::{hot_cache_key, HotBytesCache};

/// Bounds and encoder settings for still derivatives.
#[derive(Debug, Clone)]
pub struct DerivativeConfig {
    pub thumb_max_size: u32,
    pub highres_max_size: u32,
    pub thumb_quality: f32,
    pub highres_quality: f32,
    pub video_thumbnail_frame: u32,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self::from(&LuminaConfig::default())
    }
}

impl From<&LuminaConfig> for DerivativeConfig {
    fn from(config: &LuminaConfig) -> Self {
        Self {
            thumb_max_size: config.thumb_max_size,
            highres_max_size: config.highres_max_size,
            thumb_quality: config.thumb_webp_quality,
            highres_quality: config.highres_webp_quality,
            video_thumbnail_frame: config.video_thumbnail_frame,
        }
    }
}

/// Geometry learned while decoding a source, written back to the record.
struct Rendered {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    page_count: u32,
    rotation: u16,
}

pub struct DerivativeCacheManager {
    storage: Arc<dyn CacheStorage>,
    codec: Arc<dyn ImageCodec>,
    video: Arc<dyn VideoTool>,
    documents: Arc<dyn DocumentTool>,
    hot_cache: Arc<HotBytesCache>,
    config: DerivativeConfig,
}

impl DerivativeCacheManager {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        codec: Arc<dyn ImageCodec>,
        video: Arc<dyn VideoTool>,
        documents: Arc<dyn DocumentTool>,
        hot_cache: Arc<HotBytesCache>,
        config: DerivativeConfig,
    ) -> Self {
        Self {
            storage,
            codec,
            video,
            documents,
            hot_cache,
            config,
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn hot_cache(&self) -> &Arc<HotBytesCache> {
        &self.hot_cache
    }

    /// Make sure the thumbnail exists and return its bytes.
    ///
    /// Stills are decoded, their geometry recorded on the media, scaled so the
    /// longer edge fits the thumbnail bound and encoded as webp. Videos get a
    /// single frame captured by the video tool and go through the same
    /// scale/encode path.
    #[tracing::instrument(skip(self, media, source), fields(content_id = %media.content_id()))]
    pub async fn ensure_lowres(&self, media: &Media, source: &SourceFile) -> MediaResult<Bytes> {
        if media.lowres_cache_file().is_some() {
            match self.fetch(media, Quality::LowRes, 0).await {
                Ok(bytes) => return Ok(bytes),
                Err(MediaError::NotCached(name)) => {
                    tracing::warn!(
                        name = %name,
                        "Attached thumbnail missing from cache, regenerating"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let media_type = Self::supported_type(media, source)?;
        let start = std::time::Instant::now();

        let rendered = if media_type.video {
            let frame = self
                .video
                .extract_frame(&source.path, self.config.video_thumbnail_frame)
                .await?;
            let codec = self.codec.clone();
            let bound = self.config.thumb_max_size;
            let quality = self.config.thumb_quality;
            run_blocking(move || {
                let decoded = codec.decode_buffer(&frame)?;
                Ok(render(codec.as_ref(), decoded, bound, quality)?)
            })
            .await?
        } else {
            self.render_still(
                media,
                media_type,
                source,
                0,
                self.config.thumb_max_size,
                self.config.thumb_quality,
            )
            .await?
        };

        if media_type.video {
            if media.dimensions() == (0, 0) {
                media.set_dimensions(rendered.width, rendered.height);
            }
        } else {
            media.set_dimensions(rendered.width, rendered.height);
            media.set_rotate(rendered.rotation);
            if media.page_count() == 0 {
                media.set_page_count(rendered.page_count);
            }
        }

        let name = derivative_name(media.content_id(), Quality::LowRes, 1)?;
        let file = self.persist(&name, &rendered.bytes).await?;
        media.set_lowres_cache_file(file);

        let bytes = Bytes::from(rendered.bytes);
        self.hot_cache.set(
            hot_cache_key(media.content_id(), Quality::LowRes, 0),
            bytes.clone(),
        );

        tracing::info!(
            name = %name,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis(),
            "Thumbnail generated"
        );

        Ok(bytes)
    }

    /// Make sure the full-resolution derivative of one 0-based page exists.
    ///
    /// Video media have no full-resolution still; the call is a no-op.
    #[tracing::instrument(skip(self, media, source), fields(content_id = %media.content_id()))]
    pub async fn ensure_highres_page(
        &self,
        media: &Media,
        source: &SourceFile,
        page: u32,
    ) -> MediaResult<()> {
        let media_type = Self::supported_type(media, source)?;
        if media_type.video {
            return Ok(());
        }

        let page_count = media.page_count();
        if page_count > 0 && page >= page_count {
            return Err(MediaError::InvalidInput(format!(
                "page {} out of range, media has {} page(s)",
                page, page_count
            )));
        }

        if let Some(existing) = media.highres_cache_file(page) {
            if self.storage.get_cache_file_by_name(&existing.name).await.is_ok() {
                return Ok(());
            }
        }

        let start = std::time::Instant::now();
        let rendered = self
            .render_still(
                media,
                media_type,
                source,
                page,
                self.config.highres_max_size,
                self.config.highres_quality,
            )
            .await?;

        if page_count == 0 {
            media.set_page_count(rendered.page_count);
        }

        let name = derivative_name(media.content_id(), Quality::HighRes, page + 1)?;
        let file = self.persist(&name, &rendered.bytes).await?;
        media.set_highres_cache_file(page, file);

        let size_bytes = rendered.bytes.len();
        self.hot_cache.set(
            hot_cache_key(media.content_id(), Quality::HighRes, page),
            Bytes::from(rendered.bytes),
        );

        tracing::info!(
            name = %name,
            page = page,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_millis(),
            "Full-resolution page generated"
        );

        Ok(())
    }

    /// Full-resolution derivatives for every page of the media.
    pub async fn ensure_highres(&self, media: &Media, source: &SourceFile) -> MediaResult<()> {
        self.ensure_highres_page(media, source, 0).await?;
        for page in 1..media.page_count() {
            self.ensure_highres_page(media, source, page).await?;
        }
        Ok(())
    }

    /// True iff the thumbnail exists and every page in `[0, page_count)` has
    /// a full-resolution derivative.
    ///
    /// Unattached slots are looked up by canonical name and re-attached when
    /// storage already holds the file.
    pub async fn is_cached(&self, media: &Media) -> MediaResult<bool> {
        let content_id = media.content_id();

        if media.lowres_cache_file().is_none() {
            let name = derivative_name(content_id, Quality::LowRes, 1)?;
            match self.lookup(&name).await? {
                Some(file) => media.set_lowres_cache_file(file),
                None => return Ok(false),
            }
        }

        if media.is_video() {
            return Ok(true);
        }

        for page in 0..media.page_count() {
            if media.highres_cache_file(page).is_some() {
                continue;
            }
            let name = derivative_name(content_id, Quality::HighRes, page + 1)?;
            match self.lookup(&name).await? {
                Some(file) => media.set_highres_cache_file(page, file),
                None => return Ok(false),
            }
        }

        Ok(media.has_all_derivatives())
    }

    /// Bytes of an existing derivative. Never generates: a rendition that is
    /// not in storage yields `NotCached`.
    pub async fn fetch(&self, media: &Media, quality: Quality, page: u32) -> MediaResult<Bytes> {
        let page = match quality {
            Quality::LowRes => 0,
            Quality::HighRes => page,
            Quality::Video => return Err(MediaError::InvalidQuality(quality.to_string())),
        };

        let key = hot_cache_key(media.content_id(), quality, page);
        if let Some(bytes) = self.hot_cache.get(&key) {
            return Ok(bytes);
        }

        let name = derivative_name(media.content_id(), quality, page + 1)?;
        let file = self.storage.get_cache_file_by_name(&name).await?;
        let bytes = file.read_all().await?;

        match quality {
            Quality::LowRes if media.lowres_cache_file().is_none() => {
                media.set_lowres_cache_file(file.to_ref())
            }
            Quality::HighRes if media.highres_cache_file(page).is_none() => {
                media.set_highres_cache_file(page, file.to_ref())
            }
            _ => {}
        }

        self.hot_cache.set(key, bytes.clone());
        Ok(bytes)
    }

    /// Absolute path of the thumbnail in cache storage.
    pub async fn lowres_path(&self, media: &Media) -> MediaResult<PathBuf> {
        if let Some(file) = media.lowres_cache_file() {
            return Ok(file.path);
        }

        let name = derivative_name(media.content_id(), Quality::LowRes, 1)?;
        match self.lookup(&name).await? {
            Some(file) => {
                media.set_lowres_cache_file(file.clone());
                Ok(file.path)
            }
            None => Err(MediaError::NotCached(name)),
        }
    }

    /// Decode one page of a still and render it against `bound`. Documents
    /// are rasterized by the document tool and their real page count is
    /// reported; everything else is decoded by the codec directly.
    async fn render_still(
        &self,
        media: &Media,
        media_type: MediaType,
        source: &SourceFile,
        page: u32,
        bound: u32,
        quality: f32,
    ) -> MediaResult<Rendered> {
        let codec = self.codec.clone();
        if !media_type.multi_page {
            let path = source.path.clone();
            return run_blocking(move || {
                let decoded = codec.decode(&path, &media_type, page)?;
                Ok(render(codec.as_ref(), decoded, bound, quality)?)
            })
            .await;
        }

        let page_count = match media.page_count() {
            0 => self.documents.page_count(&source.path).await?,
            known => known,
        };
        if page >= page_count {
            return Err(MediaError::InvalidInput(format!(
                "page {} out of range, media has {} page(s)",
                page, page_count
            )));
        }

        let raster = self.documents.render_page(&source.path, page).await?;
        let mut rendered = run_blocking(move || {
            let decoded = codec.decode_buffer(&raster)?;
            Ok(render(codec.as_ref(), decoded, bound, quality)?)
        })
        .await?;
        rendered.page_count = page_count;
        Ok(rendered)
    }

    fn supported_type(media: &Media, source: &SourceFile) -> MediaResult<MediaType> {
        let media_type = match MediaType::from_mime(&media.mime_type()) {
            Some(media_type) => media_type,
            None => MediaType::from_extension(source.extension()),
        };

        if !media_type.has_derivatives() {
            return Err(MediaError::UnsupportedMediaType(format!(
                "{} ({})",
                media_type.mime,
                source.path.display()
            )));
        }
        Ok(media_type)
    }

    async fn lookup(&self, name: &str) -> MediaResult<Option<CacheFileRef>> {
        match self.storage.get_cache_file_by_name(name).await {
            Ok(file) => Ok(Some(file.to_ref())),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Publish `data` under `name`. Losing a creation race counts as
    /// success and the existing file is returned.
    async fn persist(&self, name: &str, data: &[u8]) -> MediaResult<CacheFileRef> {
        match self.storage.create_cache_file(name, data).await {
            Ok(file) => Ok(file.to_ref()),
            Err(StorageError::AlreadyExists(_)) => {
                tracing::debug!(name = %name, "Derivative already created by another caller");
                let file = self.storage.get_cache_file_by_name(name).await?;
                Ok(file.to_ref())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Downscale when the longer edge exceeds `bound`, then encode.
fn render(
    codec: &dyn ImageCodec,
    mut decoded: DecodedImage,
    bound: u32,
    quality: f32,
) -> lumina_processing::ProcessingResult<Rendered> {
    let (width, height) = (decoded.width(), decoded.height());
    if let Some(scale) = ImageResize::fit_scale(width, height, bound) {
        codec.resize(&mut decoded, scale);
    }
    let bytes = codec.encode_webp(&decoded, quality)?;

    Ok(Rendered {
        bytes,
        width,
        height,
        page_count: decoded.page_count.max(1),
        rotation: decoded.rotation,
    })
}

async fn run_blocking<T, F>(f: F) -> MediaResult<T>
where
    F: FnOnce() -> MediaResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::Internal(format!("Codec task failed: {}", e)))?
}
