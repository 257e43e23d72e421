//! Media import: turns a source file into a processed media record.

use std::collections::HashMap;
use std::sync::Arc;

use lumina_core::{Media, MediaData, MediaError, MediaResult, MediaType, SourceFile};
use lumina_processing::VideoTool;
use parking_lot::RwLock;

use crate::derivatives::DerivativeCacheManager;

/// In-memory index of media records by content id.
#[derive(Default)]
pub struct MediaCatalog {
    media: RwLock<HashMap<String, Arc<Media>>>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, content_id: &str) -> Option<Arc<Media>> {
        self.media.read().get(content_id).cloned()
    }

    /// Existing record, or a fresh one holding only the content id.
    pub fn get_or_create(&self, content_id: &str) -> Arc<Media> {
        if let Some(media) = self.get(content_id) {
            return media;
        }
        let mut guard = self.media.write();
        Arc::clone(
            guard
                .entry(content_id.to_string())
                .or_insert_with(|| Arc::new(Media::new(content_id))),
        )
    }

    /// Insert a previously persisted record, replacing any in memory.
    pub fn restore(&self, data: MediaData) -> Arc<Media> {
        let media = Arc::new(Media::from_data(data));
        self.media
            .write()
            .insert(media.content_id().to_string(), Arc::clone(&media));
        media
    }

    /// Enabled records, in no particular order.
    pub fn enabled(&self) -> Vec<Arc<Media>> {
        self.media
            .read()
            .values()
            .filter(|m| m.is_enabled())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.media.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.read().is_empty()
    }
}

pub struct MediaImporter {
    catalog: Arc<MediaCatalog>,
    derivatives: Arc<DerivativeCacheManager>,
    video: Arc<dyn VideoTool>,
}

impl MediaImporter {
    pub fn new(
        catalog: Arc<MediaCatalog>,
        derivatives: Arc<DerivativeCacheManager>,
        video: Arc<dyn VideoTool>,
    ) -> Self {
        Self {
            catalog,
            derivatives,
            video,
        }
    }

    pub fn catalog(&self) -> &Arc<MediaCatalog> {
        &self.catalog
    }

    /// Link `source` to the record for `content_id`, creating and processing
    /// the record on first sight.
    ///
    /// Stills get their thumbnail and every full-resolution page. Videos are
    /// probed for duration and frame size and get a thumbnail from a captured
    /// frame; their stream is produced on first playback.
    #[tracing::instrument(skip(self, source), fields(file_id = %source.id))]
    pub async fn import_file(
        &self,
        content_id: &str,
        source: &SourceFile,
        owner: &str,
    ) -> MediaResult<Arc<Media>> {
        let media_type = MediaType::from_extension(source.extension());
        if !media_type.has_derivatives() {
            return Err(MediaError::UnsupportedMediaType(format!(
                "{} ({})",
                source.extension(),
                source.path.display()
            )));
        }

        let media = self.catalog.get_or_create(content_id);
        if media.is_imported() && self.derivatives.is_cached(&media).await? {
            media.add_file(source.id.clone());
            tracing::debug!("Content already imported, linked additional file");
            return Ok(media);
        }

        let start = std::time::Instant::now();
        media.set_owner(owner);
        media.set_mime_type(media_type.mime);

        if media_type.video {
            let report = self.video.probe(&source.path).await?;
            if !report.has_video_stream() {
                return Err(MediaError::ProbeFailed(format!(
                    "no video stream in {}",
                    source.path.display()
                )));
            }
            media.set_duration_ms(report.duration_ms().unwrap_or(0));
            if let Some((width, height)) = report.dimensions() {
                media.set_dimensions(width, height);
            }
            media.set_page_count(1);
            self.derivatives.ensure_lowres(&media, source).await?;
        } else {
            self.derivatives.ensure_lowres(&media, source).await?;
            self.derivatives.ensure_highres(&media, source).await?;
        }

        media.add_file(source.id.clone());
        media.set_imported(true);

        tracing::info!(
            content_id = %content_id,
            mime_type = %media_type.mime,
            page_count = media.page_count(),
            duration_ms = start.elapsed().as_millis(),
            "Media imported"
        );
        Ok(media)
    }

    /// Unlink a backing file. Returns whether the record is still enabled.
    pub fn remove_file(&self, content_id: &str, file_id: &str) -> MediaResult<bool> {
        let media = self
            .catalog
            .get(content_id)
            .ok_or_else(|| MediaError::NotFound(format!("media {}", content_id)))?;

        let enabled = media.remove_file(file_id);
        if !enabled {
            tracing::info!(content_id = %content_id, "Last file removed, media disabled");
        }
        Ok(enabled)
    }
}
