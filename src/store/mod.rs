//! Persistence collaborator interface.
//!
//! The store is the only shared mutable resource in the system and the
//! concurrency control boundary: `content_url` uniqueness is enforced here,
//! not by any lock between orchestrator runs.

pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ContentRecord, TranscriptStatus, TranscriptionSelection};

/// Result of an insert attempt against the natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The natural key already existed, either from the lookup race or a
    /// previous run. Never an error.
    Duplicate,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up a record by its natural key.
    async fn find_by_url(&self, url: &str) -> Result<Option<ContentRecord>>;

    /// Insert a record. A uniqueness violation on `content_url` reports
    /// `Duplicate` rather than failing, so a check-then-insert race between
    /// two runs degrades to a skip.
    async fn insert(&self, record: &ContentRecord) -> Result<InsertOutcome>;

    /// Persist transcript text and status together; the two never diverge.
    async fn update_transcript(
        &self,
        url: &str,
        text: &str,
        status: TranscriptStatus,
    ) -> Result<()>;

    /// Records lacking a usable transcript: transcript absent, or matching
    /// one of the given placeholder patterns. Ordered by publish date,
    /// newest first.
    async fn select_pending_transcription(
        &self,
        selection: &TranscriptionSelection,
        canned_patterns: &[String],
        limit: u32,
    ) -> Result<Vec<ContentRecord>>;
}
