#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use lumina_core::SourceFile;
use lumina_processing::{
    DocumentTool, ProbeReport, ProcessingError, ProcessingResult, SegmentParams, VideoTool,
};
use lumina_services::{
    DerivativeCacheManager, DerivativeConfig, HotBytesCache, LocalCacheStorage, WebpCodec,
};
use tokio::sync::Notify;

pub const PROBE_JSON: &str = r#"{
    "streams": [
        {"codec_type": "video", "codec_name": "h264", "width": 640, "height": 360},
        {"codec_type": "audio", "codec_name": "aac", "bit_rate": "128000"}
    ],
    "format": {"bit_rate": "2500000", "duration": "4.250000"}
}"#;

/// How the fake segmenter behaves once invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentBehavior {
    /// Write the first segment, wait for `release`, then finish.
    Succeed,
    Fail,
    Panic,
    /// Never finish.
    Hang,
}

/// In-process stand-in for ffmpeg/ffprobe.
pub struct FakeVideoTool {
    pub behavior: parking_lot::Mutex<SegmentBehavior>,
    pub segment_calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub release: Notify,
    pub hold: bool,
}

impl FakeVideoTool {
    pub fn new(behavior: SegmentBehavior) -> Self {
        Self {
            behavior: parking_lot::Mutex::new(behavior),
            segment_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            release: Notify::new(),
            hold: false,
        }
    }

    /// Succeeds, but only after `release` is notified.
    pub fn held() -> Self {
        Self {
            hold: true,
            ..Self::new(SegmentBehavior::Succeed)
        }
    }

    pub fn set_behavior(&self, behavior: SegmentBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.segment_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoTool for FakeVideoTool {
    async fn probe(&self, _path: &Path) -> ProcessingResult<ProbeReport> {
        ProbeReport::from_json(PROBE_JSON.as_bytes())
    }

    async fn segment(
        &self,
        _input: &Path,
        output_dir: &Path,
        _params: &SegmentParams,
    ) -> ProcessingResult<()> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        // Give concurrent requesters time to pile up.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let behavior = *self.behavior.lock();
        let result = match behavior {
            SegmentBehavior::Succeed => {
                tokio::fs::write(output_dir.join("000.ts"), b"segment-0").await?;
                if self.hold {
                    self.release.notified().await;
                }
                tokio::fs::write(output_dir.join("001.ts"), b"segment-1").await?;
                tokio::fs::write(
                    output_dir.join("list.m3u8"),
                    b"#EXTM3U\n#EXTINF:5.0,\n000.ts\n#EXTINF:5.0,\n001.ts\n#EXT-X-ENDLIST\n",
                )
                .await?;
                Ok(())
            }
            SegmentBehavior::Fail => Err(ProcessingError::TranscodeFailed(
                "FFmpeg failed: invalid data found when processing input".to_string(),
            )),
            SegmentBehavior::Panic => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("segmenter crashed");
            }
            SegmentBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn extract_frame(&self, _path: &Path, _frame_index: u32) -> ProcessingResult<Vec<u8>> {
        Ok(png_bytes(960, 540))
    }
}

/// In-process stand-in for pdfinfo/pdftoppm. Page `n` renders as a
/// `(600 + 100 * n) x 800` raster.
pub struct FakeDocumentTool {
    pub pages: u32,
    pub page_count_calls: AtomicUsize,
    pub render_calls: AtomicUsize,
}

impl FakeDocumentTool {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            page_count_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
        }
    }

    pub fn page_size(page: u32) -> (u32, u32) {
        (600 + 100 * page, 800)
    }
}

#[async_trait]
impl DocumentTool for FakeDocumentTool {
    async fn page_count(&self, _path: &Path) -> ProcessingResult<u32> {
        self.page_count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages)
    }

    async fn render_page(&self, path: &Path, page: u32) -> ProcessingResult<Vec<u8>> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if page >= self.pages {
            return Err(ProcessingError::RenderFailed(format!(
                "no page {} in {}",
                page + 1,
                path.display()
            )));
        }
        let (width, height) = Self::page_size(page);
        Ok(png_bytes(width, height))
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
    });
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> SourceFile {
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    SourceFile::new(format!("file-{}", name), path)
}

pub async fn derivative_manager(
    cache_dir: &Path,
    video: Arc<dyn VideoTool>,
) -> Arc<DerivativeCacheManager> {
    derivative_manager_with_documents(cache_dir, video, Arc::new(FakeDocumentTool::new(3))).await
}

pub async fn derivative_manager_with_documents(
    cache_dir: &Path,
    video: Arc<dyn VideoTool>,
    documents: Arc<dyn DocumentTool>,
) -> Arc<DerivativeCacheManager> {
    let storage = LocalCacheStorage::new(cache_dir).await.unwrap();
    Arc::new(DerivativeCacheManager::new(
        Arc::new(storage),
        Arc::new(WebpCodec),
        video,
        documents,
        Arc::new(HotBytesCache::new(64)),
        DerivativeConfig::default(),
    ))
}
