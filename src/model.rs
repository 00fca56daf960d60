use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a discovered video came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A competitor account whose posts are scraped directly.
    Competitor,
    /// A hashtag whose top/latest posts are scraped.
    Hashtag,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Competitor => "competitor",
            SourceType::Hashtag => "hashtag",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "competitor" => Ok(SourceType::Competitor),
            "hashtag" => Ok(SourceType::Hashtag),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Lifecycle of the transcript enrichment for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    /// No transcription has been attempted.
    Absent,
    /// A transcription run has claimed this record.
    Pending,
    /// The transcript passed quality classification.
    Completed,
    /// Best-effort text only; every attempt failed classification.
    Rejected,
}

impl TranscriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Absent => "absent",
            TranscriptStatus::Pending => "pending",
            TranscriptStatus::Completed => "completed",
            TranscriptStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for TranscriptStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "absent" => Ok(TranscriptStatus::Absent),
            "pending" => Ok(TranscriptStatus::Pending),
            "completed" => Ok(TranscriptStatus::Completed),
            "rejected" => Ok(TranscriptStatus::Rejected),
            other => Err(format!("unknown transcript status: {other}")),
        }
    }
}

/// One discovered short video and its metadata.
///
/// `content_url` is the natural key; the store enforces its uniqueness and the
/// dedup gate never inserts a second record for the same URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_url: String,
    pub platform_id: Option<String>,

    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: i64,

    pub author_username: Option<String>,
    pub caption: Option<String>,

    /// Only ever derived from a real view or play counter, never from likes.
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,

    pub published_at: Option<DateTime<Utc>>,

    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub audio_title: Option<String>,
    pub audio_artist: Option<String>,

    pub transcript: Option<String>,
    pub transcript_status: TranscriptStatus,

    /// Full raw scraper item, preserved for forensics.
    pub raw_payload: serde_json::Value,
}

/// Immutable admission thresholds a scraped item must clear to be stored.
#[derive(Debug, Clone, Default)]
pub struct AdmissionPolicy {
    /// Minimum real view count. When set, items with no view/play counter are
    /// always rejected; likes are never substituted.
    pub min_views: Option<u64>,
    /// Maximum age in days. When set, items without a publish timestamp are
    /// rejected.
    pub max_age_days: Option<u32>,
    /// Cap passed to the scraping service.
    pub result_limit: u32,
}

/// One unit of scraping work: a single source plus its admission policy.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: i64,
    /// Account handle, `#tag`, bare tag, or a full explore-tags URL.
    pub source_value: String,
    pub policy: AdmissionPolicy,
}

/// Provenance stamped onto every record a batch produces.
#[derive(Debug, Clone, Copy)]
pub struct Provenance {
    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: i64,
}

impl SourceBatch {
    pub fn provenance(&self) -> Provenance {
        Provenance {
            project_id: self.project_id,
            source_type: self.source_type,
            source_id: self.source_id,
        }
    }
}

/// Restricts which records a transcription batch pulls.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionSelection {
    pub project_id: i64,
    pub source_type: Option<SourceType>,
    pub source_id: Option<i64>,
}
