use std::collections::HashMap;
use std::sync::Arc;

use lumina_core::{Media, MediaError, MediaResult, SourceFile};
use lumina_processing::VideoTool;
use lumina_storage::CacheStorage;
use parking_lot::Mutex;

use super::streamer::{StreamConfig, VideoStreamer};

/// Hands out one streamer per content id for the life of the process.
pub struct StreamRegistry {
    storage: Arc<dyn CacheStorage>,
    tool: Arc<dyn VideoTool>,
    config: StreamConfig,
    streamers: Mutex<HashMap<String, Arc<VideoStreamer>>>,
}

impl StreamRegistry {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        tool: Arc<dyn VideoTool>,
        config: StreamConfig,
    ) -> Self {
        Self {
            storage,
            tool,
            config,
            streamers: Mutex::new(HashMap::new()),
        }
    }

    /// Existing streamer for the media, or a new idle one backed by `source`.
    pub async fn stream_video(
        &self,
        media: &Media,
        source: &SourceFile,
    ) -> MediaResult<Arc<VideoStreamer>> {
        if !media.is_video() {
            return Err(MediaError::NotVideo(media.content_id().to_string()));
        }

        if let Some(streamer) = self.get(media.content_id()) {
            return Ok(streamer);
        }

        if !tokio::fs::try_exists(&source.path).await.unwrap_or(false) {
            return Err(MediaError::NotFound(format!(
                "source file {} ({})",
                source.id,
                source.path.display()
            )));
        }

        let stream_dir = self.storage.stream_dir(media.content_id()).await?;
        let streamer = Arc::new(VideoStreamer::new(
            media.content_id(),
            source.clone(),
            stream_dir,
            Arc::clone(&self.tool),
            self.config.clone(),
        ));

        let mut streamers = self.streamers.lock();
        let entry = streamers
            .entry(media.content_id().to_string())
            .or_insert(streamer);
        Ok(Arc::clone(entry))
    }

    pub fn get(&self, content_id: &str) -> Option<Arc<VideoStreamer>> {
        self.streamers.lock().get(content_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.streamers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streamers.lock().is_empty()
    }
}
