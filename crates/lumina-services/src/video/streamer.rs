//! Per-media HLS stream that is produced on first request and served while
//! the transcode is still running.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use lumina_core::constants::STREAM_LIST_FILE;
use lumina_core::{LuminaConfig, MediaError, MediaResult, SourceFile};
use lumina_processing::{SegmentParams, VideoTool};
use tokio::fs;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::{StreamError, TranscodeState};

/// Encoder and wait settings for streamers.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub segment_seconds: u64,
    pub preset: String,
    pub max_video_bitrate: u64,
    pub default_audio_bitrate: u64,
    /// `None` waits until the job finishes.
    pub wait_timeout: Option<Duration>,
    /// How often a waiter re-checks the disk while the job runs.
    pub poll_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::from(&LuminaConfig::default())
    }
}

impl From<&LuminaConfig> for StreamConfig {
    fn from(config: &LuminaConfig) -> Self {
        Self {
            segment_seconds: config.hls_segment_duration,
            preset: config.transcode_preset.clone(),
            max_video_bitrate: config.max_video_bitrate,
            default_audio_bitrate: config.default_audio_bitrate,
            wait_timeout: config.stream_wait_timeout,
            poll_interval: config.stream_poll_interval,
        }
    }
}

/// Playlist bytes together with the file's modification time.
#[derive(Debug, Clone)]
pub struct ListFile {
    pub bytes: Bytes,
    pub modified: SystemTime,
}

pub struct VideoStreamer {
    content_id: String,
    source: SourceFile,
    stream_dir: PathBuf,
    tool: Arc<dyn VideoTool>,
    config: StreamConfig,
    encoding_begun: AtomicBool,
    state: watch::Sender<TranscodeState>,
    list_cache: OnceLock<ListFile>,
    jobs_started: AtomicUsize,
}

impl VideoStreamer {
    pub fn new(
        content_id: impl Into<String>,
        source: SourceFile,
        stream_dir: PathBuf,
        tool: Arc<dyn VideoTool>,
        config: StreamConfig,
    ) -> Self {
        let (state, _) = watch::channel(TranscodeState::Idle);
        Self {
            content_id: content_id.into(),
            source,
            stream_dir,
            tool,
            config,
            encoding_begun: AtomicBool::new(false),
            state,
            list_cache: OnceLock::new(),
            jobs_started: AtomicUsize::new(0),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn stream_dir(&self) -> &Path {
        &self.stream_dir
    }

    pub fn state(&self) -> TranscodeState {
        self.state.borrow().clone()
    }

    /// Error left by the last attempt, if it failed.
    pub fn error(&self) -> Option<StreamError> {
        self.state.borrow().error().cloned()
    }

    pub fn is_transcoding(&self) -> bool {
        self.encoding_begun.load(Ordering::Acquire)
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<TranscodeState> {
        self.state.subscribe()
    }

    /// Number of transcode jobs spawned over the streamer's lifetime.
    pub fn jobs_started(&self) -> usize {
        self.jobs_started.load(Ordering::Relaxed)
    }

    /// Start the background transcode unless one is running or a previous one
    /// finished successfully. Returns whether this call spawned the job.
    pub fn encode(self: &Arc<Self>) -> bool {
        // Flag and published state change together under the channel lock, so
        // a subscriber never sees the flag set next to `Idle` or a stale
        // `Failed`.
        let started = self.state.send_if_modified(|state| {
            if matches!(state, TranscodeState::Done) {
                return false;
            }
            if self
                .encoding_begun
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return false;
            }
            *state = TranscodeState::Transcoding;
            true
        });
        if !started {
            return false;
        }

        self.jobs_started.fetch_add(1, Ordering::Relaxed);

        let streamer = Arc::clone(self);
        tokio::spawn(async move {
            let worker = Arc::clone(&streamer);
            let result = match tokio::spawn(async move { worker.transcode().await }).await {
                Ok(result) => result,
                Err(join_err) => {
                    tracing::error!(
                        content_id = %streamer.content_id,
                        error = %join_err,
                        "Transcode worker aborted"
                    );
                    Err(StreamError::WorkerPanicked)
                }
            };
            streamer.finish(result);
        });

        true
    }

    fn finish(&self, result: Result<(), StreamError>) {
        let state = match result {
            Ok(()) => {
                tracing::info!(content_id = %self.content_id, "Transcode finished");
                TranscodeState::Done
            }
            Err(err) => {
                tracing::error!(content_id = %self.content_id, error = %err, "Transcode failed");
                TranscodeState::Failed(err)
            }
        };

        // Waiters must see the outcome before a new request can restart the job.
        self.state.send_replace(state);
        self.encoding_begun.store(false, Ordering::Release);
    }

    async fn transcode(&self) -> Result<(), StreamError> {
        let start = std::time::Instant::now();
        tracing::debug!(
            content_id = %self.content_id,
            source = %self.source.path.display(),
            stream_dir = %self.stream_dir.display(),
            "Transcoding video"
        );

        fs::create_dir_all(&self.stream_dir)
            .await
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        let report = self.tool.probe(&self.source.path).await?;
        let video_bitrate = report.video_bitrate(self.config.max_video_bitrate)?;
        let audio_bitrate = report.audio_bitrate(self.config.default_audio_bitrate)?;

        tracing::debug!(
            content_id = %self.content_id,
            video_bitrate = video_bitrate,
            audio_bitrate = audio_bitrate,
            "Probed source bitrate"
        );

        let params = SegmentParams {
            video_bitrate,
            audio_bitrate,
            segment_seconds: self.config.segment_seconds,
            preset: self.config.preset.clone(),
        };
        self.tool
            .segment(&self.source.path, &self.stream_dir, &params)
            .await?;

        tracing::info!(
            content_id = %self.content_id,
            duration_ms = start.elapsed().as_millis(),
            "Video segmented"
        );
        Ok(())
    }

    fn chunk_path(&self, name: &str) -> MediaResult<PathBuf> {
        if name.is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(MediaError::InvalidInput(format!(
                "invalid chunk name: {}",
                name
            )));
        }
        Ok(self.stream_dir.join(name))
    }

    /// Open a segment (or the playlist) by file name, starting the transcode
    /// and waiting for the file to appear when it is not on disk yet.
    pub async fn get_chunk(
        self: &Arc<Self>,
        name: &str,
        cancel: &CancellationToken,
    ) -> MediaResult<fs::File> {
        let path = self.chunk_path(name)?;
        self.wait_for(name, &path, cancel).await?;

        fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::ChunkNotFound(name.to_string()),
            _ => MediaError::from(e),
        })
    }

    /// Playlist bytes. Once the job has finished without error the playlist
    /// is kept in memory for the life of the streamer.
    pub async fn get_list_file(
        self: &Arc<Self>,
        cancel: &CancellationToken,
    ) -> MediaResult<ListFile> {
        if let Some(cached) = self.list_cache.get() {
            return Ok(cached.clone());
        }

        let path = self.stream_dir.join(STREAM_LIST_FILE);
        self.wait_for(STREAM_LIST_FILE, &path, cancel).await?;

        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::ChunkNotFound(STREAM_LIST_FILE.to_string()),
            _ => MediaError::from(e),
        })?;
        let modified = fs::metadata(&path).await?.modified()?;
        let list = ListFile {
            bytes: Bytes::from(bytes),
            modified,
        };

        if !self.is_transcoding()
            && matches!(
                *self.state.borrow(),
                TranscodeState::Idle | TranscodeState::Done
            )
        {
            return Ok(self.list_cache.get_or_init(|| list).clone());
        }

        Ok(list)
    }

    /// Modification time of an existing segment. Never starts a transcode.
    pub async fn chunk_modified(&self, name: &str) -> MediaResult<SystemTime> {
        let path = self.chunk_path(name)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.modified()?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::ChunkNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait until `path` exists, the job fails, or the wait is bounded out.
    async fn wait_for(
        self: &Arc<Self>,
        name: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<()> {
        if exists(path).await {
            return Ok(());
        }

        self.encode();

        let mut state_rx = self.state.subscribe();
        let poll_interval = self.config.poll_interval;
        let wait = async move {
            let mut ticker = time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if exists(path).await {
                    return Ok(());
                }

                let state = state_rx.borrow_and_update().clone();
                match state {
                    TranscodeState::Transcoding => {}
                    TranscodeState::Failed(err) => return Err(MediaError::from(err)),
                    TranscodeState::Done | TranscodeState::Idle => {
                        return if exists(path).await {
                            Ok(())
                        } else {
                            Err(MediaError::ChunkNotFound(name.to_string()))
                        };
                    }
                }

                tokio::select! {
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            return Err(MediaError::Internal("stream state closed".to_string()));
                        }
                    }
                    _ = ticker.tick() => {}
                }
            }
        };

        let bounded = async {
            match self.config.wait_timeout {
                Some(limit) => time::timeout(limit, wait).await.map_err(|_| {
                    MediaError::Timeout(format!(
                        "{} not ready after {}ms",
                        name,
                        limit.as_millis()
                    ))
                })?,
                None => wait.await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(MediaError::Cancelled),
            result = bounded => result,
        }
    }
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
