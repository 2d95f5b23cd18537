//! Photo record model and processing state machine.
//!
//! One [`PhotoRecord`] exists per uploaded image. The record is created by
//! the ingestion orchestrator, advanced by the background worker, edited by
//! its owner, and appended to by the order subsystem when printed. Soft
//! deletion hides a record from owner-facing queries; the row and its print
//! history are retained permanently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Variant name for the as-uploaded object
pub const VARIANT_ORIGINAL: &str = "original";
/// Variant name for the worker-generated thumbnail
pub const VARIANT_THUMBNAIL: &str = "thumbnail";

/// Lifecycle state of a photo's background analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Record created, original stored, processing not yet started
    Uploaded,
    /// Claimed by the background worker (or queued for it)
    Processing,
    /// Thumbnail and analysis written; terminal for the base pipeline
    Completed,
    /// Processing failed; eligible for explicit retry
    Failed,
}

impl ProcessingStatus {
    /// Database/API representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the database representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(Self::Uploaded),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether the state machine permits moving to `next`.
    ///
    /// Uploaded -> Processing -> Completed | Failed, with Failed ->
    /// Processing as the explicit retry edge. Status never regresses.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Uploaded, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Failed, Self::Processing)
        )
    }

    /// Coarse progress percentage for UI feedback only
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Uploaded => 10,
            Self::Processing => 50,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation derived from pixel dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else if height > width {
            Self::Portrait
        } else {
            Self::Square
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Square => "square",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "landscape" => Some(Self::Landscape),
            "portrait" => Some(Self::Portrait),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

/// Original-file details captured at upload time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Filename as uploaded
    pub original_file_name: String,
    /// Sanitized filename used for storage paths
    pub file_name: String,
    /// Byte size of the original
    pub file_size: i64,
    /// Declared MIME type
    pub content_type: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

/// Location of one stored rendition of the photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageVariant {
    /// Opaque backend path
    pub path: String,
    /// Access URL (public or backend-relative)
    pub url: String,
}

/// Backend placement and the variant map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Backend tag ("s3", "filesystem")
    pub provider: String,
    /// Bucket or root directory name
    pub container: String,
    /// Variant name -> stored object
    pub variants: HashMap<String, StorageVariant>,
}

/// Technical image properties derived from the raw bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: i32,
    pub height: i32,
    pub orientation: Orientation,
    /// Reduced fraction, e.g. "3:2"
    pub aspect_ratio: String,
    pub dpi: i32,
    pub color_space: String,
    pub has_transparency: bool,
}

/// GPS position from EXIF. Privacy-sensitive; only stored when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Camera metadata extracted from EXIF
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExifData {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_model: Option<String>,
    pub iso: Option<u32>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub focal_length: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub gps: Option<GpsCoordinates>,
}

/// Lifecycle bookkeeping for background processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub status: ProcessingStatus,
    pub thumbnail_generated: bool,
    pub ai_enhancement_available: bool,
    /// Accumulated error messages across attempts
    pub errors: Vec<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Analysis results written by the worker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub scene_types: Vec<String>,
    pub dominant_colors: Vec<String>,
    pub face_count: Option<u32>,
    /// 0.0 - 10.0
    pub quality_score: f32,
}

/// Independent boolean flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PhotoFlags {
    pub is_deleted: bool,
    pub is_favorite: bool,
    pub is_private: bool,
    pub reported_content: bool,
}

/// One fulfilled print of this photo. Entries are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrintRecord {
    pub order_id: Uuid,
    pub printed_at: DateTime<Utc>,
    pub size: String,
    pub quantity: u32,
}

/// The persisted unit representing one uploaded image and its derived data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Assigned at creation, immutable
    pub id: Uuid,
    /// Uploading user, immutable; every read and write is scoped by it
    pub owner_id: Uuid,
    pub file_info: FileInfo,
    pub storage: StorageInfo,
    pub image_data: ImageData,
    pub exif: Option<ExifData>,
    pub processing: ProcessingInfo,
    /// Lowercase, trimmed, deduplicated
    pub tags: Vec<String>,
    pub user_notes: String,
    pub ai_analysis: Option<AiAnalysis>,
    pub flags: PhotoFlags,
    pub print_history: Vec<PrintRecord>,
    /// Total prints across history entries; sortable in gallery queries
    pub print_count: i32,
    pub schema_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhotoRecord {
    /// Storage path of a named variant, if stored
    pub fn variant_path(&self, name: &str) -> Option<&str> {
        self.storage.variants.get(name).map(|v| v.path.as_str())
    }
}

/// Normalize a tag set: trim, lowercase, drop empties, deduplicate.
/// Insertion order of the first occurrence is preserved.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = Vec::new();
    for tag in tags {
        let normalized = tag.as_ref().trim().to_lowercase();
        if !normalized.is_empty() && !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

/// Reduce width:height to its lowest terms, e.g. 3000x2000 -> "3:2"
pub fn reduce_aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "0:0".to_string();
    }
    let divisor = gcd(width, height);
    format!("{}:{}", width / divisor, height / divisor)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Sanitize a filename for use in storage paths
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized: String = base
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_forward() {
        assert!(ProcessingStatus::Uploaded.can_transition_to(ProcessingStatus::Processing));
        assert!(ProcessingStatus::Processing.can_transition_to(ProcessingStatus::Completed));
        assert!(ProcessingStatus::Processing.can_transition_to(ProcessingStatus::Failed));
    }

    #[test]
    fn test_status_retry_edge() {
        assert!(ProcessingStatus::Failed.can_transition_to(ProcessingStatus::Processing));
    }

    #[test]
    fn test_status_never_regresses() {
        assert!(!ProcessingStatus::Completed.can_transition_to(ProcessingStatus::Uploaded));
        assert!(!ProcessingStatus::Completed.can_transition_to(ProcessingStatus::Processing));
        assert!(!ProcessingStatus::Processing.can_transition_to(ProcessingStatus::Uploaded));
        assert!(!ProcessingStatus::Failed.can_transition_to(ProcessingStatus::Uploaded));
        assert!(!ProcessingStatus::Uploaded.can_transition_to(ProcessingStatus::Completed));
    }

    #[test]
    fn test_status_no_self_transition() {
        for status in [
            ProcessingStatus::Uploaded,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_progress_mapping() {
        assert_eq!(ProcessingStatus::Uploaded.progress_percent(), 10);
        assert_eq!(ProcessingStatus::Processing.progress_percent(), 50);
        assert_eq!(ProcessingStatus::Completed.progress_percent(), 100);
        assert_eq!(ProcessingStatus::Failed.progress_percent(), 0);
    }

    #[test]
    fn test_status_serde_round_trip() {
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Uploaded).unwrap(),
            "\"uploaded\""
        );
        let status: ProcessingStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, ProcessingStatus::Failed);
        assert_eq!(ProcessingStatus::parse("processing"), Some(ProcessingStatus::Processing));
        assert_eq!(ProcessingStatus::parse("bogus"), None);
    }

    #[test]
    fn test_orientation_from_dimensions() {
        assert_eq!(Orientation::from_dimensions(3000, 2000), Orientation::Landscape);
        assert_eq!(Orientation::from_dimensions(2000, 3000), Orientation::Portrait);
        assert_eq!(Orientation::from_dimensions(2048, 2048), Orientation::Square);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![" Beach ", "beach", "SUNSET", "", "  ", "family"]);
        assert_eq!(tags, vec!["beach", "sunset", "family"]);
    }

    #[test]
    fn test_normalize_tags_case_insensitive_dedup() {
        let tags = normalize_tags(vec!["Vacation", "VACATION", "vacation"]);
        assert_eq!(tags, vec!["vacation"]);
    }

    #[test]
    fn test_reduce_aspect_ratio() {
        assert_eq!(reduce_aspect_ratio(3000, 2000), "3:2");
        assert_eq!(reduce_aspect_ratio(1920, 1080), "16:9");
        assert_eq!(reduce_aspect_ratio(2048, 2048), "1:1");
        assert_eq!(reduce_aspect_ratio(0, 100), "0:0");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("IMG 0042.jpg"), "IMG_0042.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("héllo.png"), "h_llo.png");
        assert_eq!(sanitize_file_name("???"), "file");
    }

    #[test]
    fn test_variant_path() {
        let mut variants = HashMap::new();
        variants.insert(
            VARIANT_ORIGINAL.to_string(),
            StorageVariant {
                path: "photos/a/b/original_x.jpg".to_string(),
                url: "https://cdn.example.com/x.jpg".to_string(),
            },
        );
        let record = test_record(variants);
        assert_eq!(
            record.variant_path(VARIANT_ORIGINAL),
            Some("photos/a/b/original_x.jpg")
        );
        assert_eq!(record.variant_path(VARIANT_THUMBNAIL), None);
    }

    fn test_record(variants: HashMap<String, StorageVariant>) -> PhotoRecord {
        PhotoRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            file_info: FileInfo {
                original_file_name: "x.jpg".to_string(),
                file_name: "x.jpg".to_string(),
                file_size: 1024,
                content_type: "image/jpeg".to_string(),
                uploaded_at: Utc::now(),
            },
            storage: StorageInfo {
                provider: "s3".to_string(),
                container: "photos".to_string(),
                variants,
            },
            image_data: ImageData {
                width: 3000,
                height: 2000,
                orientation: Orientation::Landscape,
                aspect_ratio: "3:2".to_string(),
                dpi: 72,
                color_space: "sRGB".to_string(),
                has_transparency: false,
            },
            exif: None,
            processing: ProcessingInfo {
                status: ProcessingStatus::Uploaded,
                thumbnail_generated: false,
                ai_enhancement_available: false,
                errors: vec![],
                processed_at: None,
            },
            tags: vec![],
            user_notes: String::new(),
            ai_analysis: None,
            flags: PhotoFlags::default(),
            print_history: vec![],
            print_count: 0,
            schema_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
