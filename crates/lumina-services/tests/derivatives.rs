mod common;

use std::sync::Arc;

use common::{derivative_manager, write_png, FakeVideoTool, SegmentBehavior};
use lumina_core::{Media, MediaError, Quality};
use lumina_services::DerivativeConfig;

fn still(content_id: &str) -> Media {
    let media = Media::new(content_id);
    media.set_mime_type("image/png");
    media
}

fn cache_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".webp"))
        .collect();
    names.sort();
    names
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_thumbnail_requests_write_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let source = write_png(dir.path(), "beach.png", 1200, 300);
    let derivatives = derivative_manager(
        &cache_dir,
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;

    // Two handlers holding separate records for the same content.
    let first = still("beach");
    let second = still("beach");
    let (a, b) = tokio::join!(
        derivatives.ensure_lowres(&first, &source),
        derivatives.ensure_lowres(&second, &source)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(cache_entries(&cache_dir), vec!["beach-thumbnail.webp"]);
    assert_eq!(std::fs::read(cache_dir.join("beach-thumbnail.webp")).unwrap(), a);
    assert_eq!(first.lowres_cache_file(), second.lowres_cache_file());

    // A fresh cache renders the same bytes.
    let other_dir = dir.path().join("other-cache");
    let fresh = derivative_manager(
        &other_dir,
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;
    let again = fresh.ensure_lowres(&still("beach"), &source).await.unwrap();
    assert_eq!(again, a);
}

#[tokio::test]
async fn test_derivatives_fit_their_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_png(dir.path(), "wide.png", 1200, 300);
    let derivatives = derivative_manager(
        &dir.path().join("cache"),
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;
    let config = DerivativeConfig::default();

    let media = still("wide");
    let thumb = derivatives.ensure_lowres(&media, &source).await.unwrap();
    let thumb = image::load_from_memory(&thumb).unwrap();
    assert_eq!(thumb.width(), config.thumb_max_size);
    assert_eq!(thumb.height(), 125);

    // The source fits the full-resolution bound and is kept at its size.
    derivatives.ensure_highres(&media, &source).await.unwrap();
    let full = derivatives.fetch(&media, Quality::HighRes, 0).await.unwrap();
    let full = image::load_from_memory(&full).unwrap();
    assert_eq!((full.width(), full.height()), (1200, 300));

    assert_eq!(media.dimensions(), (1200, 300));
    assert_eq!(media.page_count(), 1);
}

#[tokio::test]
async fn test_is_cached_tracks_storage() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let source = write_png(dir.path(), "cat.png", 320, 240);
    let derivatives = derivative_manager(
        &cache_dir,
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;

    let media = still("cat");
    assert!(!derivatives.is_cached(&media).await.unwrap());

    derivatives.ensure_lowres(&media, &source).await.unwrap();
    assert!(!derivatives.is_cached(&media).await.unwrap());

    derivatives.ensure_highres(&media, &source).await.unwrap();
    assert!(derivatives.is_cached(&media).await.unwrap());

    // A record that lost its attachments finds the files by name.
    let restored = still("cat");
    restored.set_page_count(1);
    assert!(derivatives.is_cached(&restored).await.unwrap());
    assert!(restored.lowres_cache_file().is_some());
    assert!(restored.highres_cache_file(0).is_some());
}

#[tokio::test]
async fn test_fetch_never_generates() {
    let dir = tempfile::tempdir().unwrap();
    let derivatives = derivative_manager(
        &dir.path().join("cache"),
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;

    let media = still("ghost");
    let result = derivatives.fetch(&media, Quality::LowRes, 0).await;
    assert!(matches!(result, Err(MediaError::NotCached(_))));

    let result = derivatives.fetch(&media, Quality::Video, 0).await;
    assert!(matches!(result, Err(MediaError::InvalidQuality(_))));
}

#[tokio::test]
async fn test_hot_cache_serves_repeat_fetches() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let source = write_png(dir.path(), "dog.png", 200, 100);
    let derivatives = derivative_manager(
        &cache_dir,
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;

    let media = still("dog");
    let generated = derivatives.ensure_lowres(&media, &source).await.unwrap();

    // Served from memory even after the file is gone.
    std::fs::remove_file(cache_dir.join("dog-thumbnail.webp")).unwrap();
    let fetched = derivatives.fetch(&media, Quality::LowRes, 0).await.unwrap();
    assert_eq!(fetched, generated);
    assert!(derivatives.hot_cache().stats().hits >= 1);
}

#[tokio::test]
async fn test_video_thumbnail_comes_from_a_frame() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("clip.mp4");
    std::fs::write(&source_path, b"fake movie").unwrap();
    let source = lumina_core::SourceFile::new("f1", &source_path);
    let derivatives = derivative_manager(
        &dir.path().join("cache"),
        Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed)),
    )
    .await;

    let media = Media::new("clip");
    media.set_mime_type("video/mp4");
    let thumb = derivatives.ensure_lowres(&media, &source).await.unwrap();
    let thumb = image::load_from_memory(&thumb).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (500, 281));

    // Video media need only the thumbnail.
    derivatives.ensure_highres(&media, &source).await.unwrap();
    assert!(media.highres_cache_file(0).is_none());
    assert!(derivatives.is_cached(&media).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reader_racing_a_writer_sees_complete_bytes_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let source = write_png(dir.path(), "harbor.png", 2400, 1600);
    let video = Arc::new(FakeVideoTool::new(SegmentBehavior::Succeed));
    let writer = derivative_manager(&cache_dir, video.clone()).await;
    // A second handler over the same cache with its own hot cache.
    let reader = derivative_manager(&cache_dir, video).await;

    let media = still("harbor");
    let observer = {
        let reader = reader.clone();
        tokio::spawn(async move {
            let media = still("harbor");
            loop {
                match reader.fetch(&media, Quality::HighRes, 0).await {
                    Ok(bytes) => return bytes,
                    Err(MediaError::NotCached(_)) => tokio::task::yield_now().await,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        })
    };

    writer.ensure_highres(&media, &source).await.unwrap();
    let written = writer.fetch(&media, Quality::HighRes, 0).await.unwrap();

    let observed = observer.await.unwrap();
    assert_eq!(observed.len(), written.len());
    assert_eq!(observed, written);
    // What the reader pinned in memory is the finished file.
    let again = reader.fetch(&still("harbor"), Quality::HighRes, 0).await.unwrap();
    assert_eq!(again, written);
    assert!(image::load_from_memory(&again).is_ok());
}
