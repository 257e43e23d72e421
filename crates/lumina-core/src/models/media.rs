//! The media record: one logical piece of content, keyed by its content hash.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::media_type::MediaType;

/// A generated derivative attached to a media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFileRef {
    /// Canonical derivative name, e.g. `abc123-fullres_2.webp`.
    pub name: String,
    pub path: PathBuf,
}

/// A backing source file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
    }
}

/// Plain, serializable shape of a media record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    pub content_id: String,
    pub owner: String,
    pub mime_type: String,
    /// Clockwise rotation (degrees) applied from the EXIF orientation.
    pub rotate: u16,
    pub width: u32,
    pub height: u32,
    /// 0 until the media has been imported.
    pub page_count: u32,
    /// Milliseconds; non-zero only for video.
    pub duration_ms: u64,
    pub file_ids: Vec<String>,
    pub recognition_tags: BTreeSet<String>,
    pub liked_by: BTreeSet<String>,
    pub hdir: Vec<f32>,
    pub lowres_cache_file: Option<CacheFileRef>,
    pub highres_cache_files: Vec<Option<CacheFileRef>>,
    pub hidden: bool,
    pub enabled: bool,
    pub imported: bool,
    pub created_at: DateTime<Utc>,
}

impl MediaData {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            owner: String::new(),
            mime_type: String::new(),
            rotate: 0,
            width: 0,
            height: 0,
            page_count: 0,
            duration_ms: 0,
            file_ids: Vec::new(),
            recognition_tags: BTreeSet::new(),
            liked_by: BTreeSet::new(),
            hdir: Vec::new(),
            lowres_cache_file: None,
            highres_cache_files: Vec::new(),
            hidden: false,
            enabled: true,
            imported: false,
            created_at: Utc::now(),
        }
    }
}

/// A media record shared between request handlers and background work.
///
/// All mutable state sits behind one record-scoped lock; every accessor takes
/// the lock only for the duration of a field read or assignment, never across
/// I/O.
#[derive(Debug)]
pub struct Media {
    content_id: String,
    data: RwLock<MediaData>,
}

impl Media {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self::from_data(MediaData::new(content_id))
    }

    pub fn from_data(data: MediaData) -> Self {
        Self {
            content_id: data.content_id.clone(),
            data: RwLock::new(data),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Copy of the current state, e.g. for persistence or display.
    pub fn snapshot(&self) -> MediaData {
        self.data.read().clone()
    }

    pub fn owner(&self) -> String {
        self.data.read().owner.clone()
    }

    pub fn set_owner(&self, owner: impl Into<String>) {
        self.data.write().owner = owner.into();
    }

    pub fn mime_type(&self) -> String {
        self.data.read().mime_type.clone()
    }

    pub fn set_mime_type(&self, mime: impl Into<String>) {
        self.data.write().mime_type = mime.into();
    }

    /// Registry entry for the record's mime type, `generic()` if unknown.
    pub fn media_type(&self) -> MediaType {
        MediaType::from_mime(&self.data.read().mime_type).unwrap_or_else(MediaType::generic)
    }

    pub fn is_video(&self) -> bool {
        self.media_type().video
    }

    pub fn rotate(&self) -> u16 {
        self.data.read().rotate
    }

    pub fn set_rotate(&self, degrees: u16) {
        self.data.write().rotate = degrees;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let data = self.data.read();
        (data.width, data.height)
    }

    pub fn set_dimensions(&self, width: u32, height: u32) {
        let mut data = self.data.write();
        data.width = width;
        data.height = height;
    }

    pub fn page_count(&self) -> u32 {
        self.data.read().page_count
    }

    /// Sets the page count and resizes the full-resolution slots to match.
    pub fn set_page_count(&self, page_count: u32) {
        let mut data = self.data.write();
        data.page_count = page_count;
        data.highres_cache_files.resize(page_count as usize, None);
    }

    pub fn duration_ms(&self) -> u64 {
        self.data.read().duration_ms
    }

    pub fn set_duration_ms(&self, duration_ms: u64) {
        self.data.write().duration_ms = duration_ms;
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.data.read().file_ids.clone()
    }

    pub fn first_file_id(&self) -> Option<String> {
        self.data.read().file_ids.first().cloned()
    }

    pub fn has_file(&self, file_id: &str) -> bool {
        self.data.read().file_ids.iter().any(|id| id == file_id)
    }

    /// Links a backing file. Re-enables a record that was disabled after its
    /// last file went away.
    pub fn add_file(&self, file_id: impl Into<String>) {
        let file_id = file_id.into();
        let mut data = self.data.write();
        if !data.file_ids.contains(&file_id) {
            data.file_ids.push(file_id);
        }
        data.enabled = true;
    }

    /// Unlinks a backing file. When no files remain the record is disabled,
    /// not dropped, so identical content can reuse its derivatives later.
    /// Returns whether the record is still enabled.
    pub fn remove_file(&self, file_id: &str) -> bool {
        let mut data = self.data.write();
        data.file_ids.retain(|id| id != file_id);
        if data.file_ids.is_empty() {
            data.enabled = false;
        }
        data.enabled
    }

    pub fn recognition_tags(&self) -> BTreeSet<String> {
        self.data.read().recognition_tags.clone()
    }

    pub fn add_recognition_tag(&self, tag: impl Into<String>) {
        self.data.write().recognition_tags.insert(tag.into());
    }

    pub fn liked_by(&self) -> BTreeSet<String> {
        self.data.read().liked_by.clone()
    }

    pub fn set_liked_by(&self, user: impl Into<String>, liked: bool) {
        let user = user.into();
        let mut data = self.data.write();
        if liked {
            data.liked_by.insert(user);
        } else {
            data.liked_by.remove(&user);
        }
    }

    pub fn hdir(&self) -> Option<Vec<f32>> {
        let data = self.data.read();
        if data.hdir.is_empty() {
            None
        } else {
            Some(data.hdir.clone())
        }
    }

    pub fn has_hdir(&self) -> bool {
        !self.data.read().hdir.is_empty()
    }

    pub fn set_hdir(&self, hdir: Vec<f32>) {
        self.data.write().hdir = hdir;
    }

    pub fn lowres_cache_file(&self) -> Option<CacheFileRef> {
        self.data.read().lowres_cache_file.clone()
    }

    pub fn set_lowres_cache_file(&self, file: CacheFileRef) {
        self.data.write().lowres_cache_file = Some(file);
    }

    /// Full-resolution derivative for a 0-based page index.
    pub fn highres_cache_file(&self, page: u32) -> Option<CacheFileRef> {
        self.data
            .read()
            .highres_cache_files
            .get(page as usize)
            .cloned()
            .flatten()
    }

    /// Attaches a full-resolution derivative to a 0-based page slot, growing
    /// the slot list if the page count has not been recorded yet.
    pub fn set_highres_cache_file(&self, page: u32, file: CacheFileRef) {
        let mut data = self.data.write();
        let index = page as usize;
        if data.highres_cache_files.len() <= index {
            data.highres_cache_files.resize(index + 1, None);
        }
        data.highres_cache_files[index] = Some(file);
    }

    /// True when a thumbnail is attached and every page slot in
    /// `[0, page_count)` holds a full-resolution derivative.
    pub fn has_all_derivatives(&self) -> bool {
        let data = self.data.read();
        data.lowres_cache_file.is_some()
            && (0..data.page_count as usize)
                .all(|page| matches!(data.highres_cache_files.get(page), Some(Some(_))))
    }

    pub fn is_hidden(&self) -> bool {
        self.data.read().hidden
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.data.write().hidden = hidden;
    }

    pub fn is_enabled(&self) -> bool {
        self.data.read().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.data.write().enabled = enabled;
    }

    pub fn is_imported(&self) -> bool {
        self.data.read().imported
    }

    pub fn set_imported(&self, imported: bool) {
        self.data.write().imported = imported;
    }

    /// At least one backing file is linked and, when required, the semantic
    /// embedding has been computed.
    pub fn is_sufficiently_processed(&self, require_hdir: bool) -> bool {
        let data = self.data.read();
        !data.file_ids.is_empty() && (!require_hdir || !data.hdir.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_ref(name: &str) -> CacheFileRef {
        CacheFileRef {
            name: name.to_string(),
            path: PathBuf::from("/cache").join(name),
        }
    }

    #[test]
    fn test_new_record_is_minimal() {
        let media = Media::new("abc123");
        assert_eq!(media.content_id(), "abc123");
        assert_eq!(media.page_count(), 0);
        assert!(media.is_enabled());
        assert!(!media.is_imported());
        assert!(media.hdir().is_none());
        assert!(!media.is_sufficiently_processed(false));
    }

    #[test]
    fn test_file_set_semantics_and_disable() {
        let media = Media::new("abc123");
        media.add_file("f1");
        media.add_file("f1");
        media.add_file("f2");
        assert_eq!(media.file_ids(), vec!["f1".to_string(), "f2".to_string()]);

        assert!(media.remove_file("f1"));
        assert!(media.is_enabled());
        assert!(!media.remove_file("f2"));
        assert!(!media.is_enabled());
        assert!(media.file_ids().is_empty());

        media.add_file("f3");
        assert!(media.is_enabled());
        assert_eq!(media.first_file_id().as_deref(), Some("f3"));
    }

    #[test]
    fn test_sufficiently_processed_requires_hdir_when_asked() {
        let media = Media::new("abc123");
        media.add_file("f1");
        assert!(media.is_sufficiently_processed(false));
        assert!(!media.is_sufficiently_processed(true));

        media.set_hdir(vec![0.1, 0.2]);
        assert!(media.is_sufficiently_processed(true));
    }

    #[test]
    fn test_page_count_resizes_slots() {
        let media = Media::new("doc");
        media.set_page_count(3);
        media.set_highres_cache_file(2, cache_ref("doc-fullres_3.webp"));
        assert!(media.highres_cache_file(0).is_none());
        assert!(media.highres_cache_file(2).is_some());

        media.set_page_count(2);
        assert!(media.highres_cache_file(2).is_none());
    }

    #[test]
    fn test_has_all_derivatives() {
        let media = Media::new("doc");
        media.set_page_count(2);
        assert!(!media.has_all_derivatives());

        media.set_lowres_cache_file(cache_ref("doc-thumbnail.webp"));
        media.set_highres_cache_file(0, cache_ref("doc-fullres.webp"));
        assert!(!media.has_all_derivatives());

        media.set_highres_cache_file(1, cache_ref("doc-fullres_2.webp"));
        assert!(media.has_all_derivatives());
    }

    #[test]
    fn test_media_type_lookup() {
        let media = Media::new("vid");
        assert!(!media.is_video());
        media.set_mime_type("video/mp4");
        assert!(media.is_video());
    }

    #[test]
    fn test_likes_and_tags() {
        let media = Media::new("abc123");
        media.set_liked_by("alex", true);
        media.set_liked_by("sam", true);
        media.set_liked_by("alex", false);
        assert_eq!(media.liked_by().into_iter().collect::<Vec<_>>(), vec!["sam"]);

        media.add_recognition_tag("beach");
        media.add_recognition_tag("beach");
        assert_eq!(media.recognition_tags().len(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let media = Media::new("abc123");
        media.set_dimensions(640, 480);
        let json = serde_json::to_value(media.snapshot()).unwrap();
        assert_eq!(json["content_id"], "abc123");
        assert_eq!(json["width"], 640);
    }
}
