//! Thin sqlx adapter for the content store.
//!
//! The `content_records_url_key` unique constraint is the system's dedup
//! backstop: two uncoordinated ingestion runs cannot double-insert because
//! the insert uses `ON CONFLICT DO NOTHING` and reports zero rows as a
//! duplicate.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::debug;

use crate::error::{ReelError, Result};
use crate::model::{ContentRecord, SourceType, TranscriptStatus, TranscriptionSelection};

use super::{ContentStore, InsertOutcome};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content_records (
    id BIGSERIAL PRIMARY KEY,
    content_url TEXT NOT NULL,
    platform_id TEXT,
    project_id BIGINT NOT NULL,
    source_type TEXT NOT NULL,
    source_id BIGINT NOT NULL,
    author_username TEXT,
    caption TEXT,
    view_count BIGINT NOT NULL DEFAULT 0,
    like_count BIGINT NOT NULL DEFAULT 0,
    comment_count BIGINT NOT NULL DEFAULT 0,
    published_at TIMESTAMPTZ,
    video_url TEXT,
    thumbnail_url TEXT,
    audio_title TEXT,
    audio_artist TEXT,
    transcript TEXT,
    transcript_status TEXT NOT NULL DEFAULT 'absent',
    raw_payload JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT content_records_url_key UNIQUE (content_url)
);
"#;

const SELECT_COLUMNS: &str = "content_url, platform_id, project_id, source_type, source_id, \
     author_username, caption, view_count, like_count, comment_count, published_at, \
     video_url, thumbnail_url, audio_title, audio_artist, transcript, transcript_status, \
     raw_payload";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the table and its uniqueness constraint if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<ContentRecord> {
        let source_type: String = row.try_get("source_type")?;
        let transcript_status: String = row.try_get("transcript_status")?;
        Ok(ContentRecord {
            content_url: row.try_get("content_url")?,
            platform_id: row.try_get("platform_id")?,
            project_id: row.try_get("project_id")?,
            source_type: SourceType::from_str(&source_type).map_err(ReelError::Storage)?,
            source_id: row.try_get("source_id")?,
            author_username: row.try_get("author_username")?,
            caption: row.try_get("caption")?,
            view_count: row.try_get("view_count")?,
            like_count: row.try_get("like_count")?,
            comment_count: row.try_get("comment_count")?,
            published_at: row.try_get("published_at")?,
            video_url: row.try_get("video_url")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            audio_title: row.try_get("audio_title")?,
            audio_artist: row.try_get("audio_artist")?,
            transcript: row.try_get("transcript")?,
            transcript_status: TranscriptStatus::from_str(&transcript_status)
                .map_err(ReelError::Storage)?,
            raw_payload: row.try_get("raw_payload")?,
        })
    }
}

#[async_trait]
impl ContentStore for PostgresStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<ContentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_records WHERE content_url = $1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn insert(&self, record: &ContentRecord) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT INTO content_records (content_url, platform_id, project_id, source_type, \
             source_id, author_username, caption, view_count, like_count, comment_count, \
             published_at, video_url, thumbnail_url, audio_title, audio_artist, transcript, \
             transcript_status, raw_payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             ON CONFLICT (content_url) DO NOTHING",
        )
        .bind(&record.content_url)
        .bind(&record.platform_id)
        .bind(record.project_id)
        .bind(record.source_type.as_str())
        .bind(record.source_id)
        .bind(&record.author_username)
        .bind(&record.caption)
        .bind(record.view_count)
        .bind(record.like_count)
        .bind(record.comment_count)
        .bind(record.published_at)
        .bind(&record.video_url)
        .bind(&record.thumbnail_url)
        .bind(&record.audio_title)
        .bind(&record.audio_artist)
        .bind(&record.transcript)
        .bind(record.transcript_status.as_str())
        .bind(&record.raw_payload)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(url = %record.content_url, "Insert hit the uniqueness constraint, skipped");
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn update_transcript(
        &self,
        url: &str,
        text: &str,
        status: TranscriptStatus,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE content_records SET transcript = $1, transcript_status = $2, \
             updated_at = NOW() WHERE content_url = $3",
        )
        .bind(text)
        .bind(status.as_str())
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_pending_transcription(
        &self,
        selection: &TranscriptionSelection,
        canned_patterns: &[String],
        limit: u32,
    ) -> Result<Vec<ContentRecord>> {
        let mut sql = format!(
            "SELECT {SELECT_COLUMNS} FROM content_records WHERE project_id = $1 \
             AND (transcript IS NULL OR transcript ILIKE ANY($2))"
        );
        let like_patterns: Vec<String> = canned_patterns
            .iter()
            .map(|p| format!("%{}%", p))
            .collect();

        let mut bind_index = 2;
        if selection.source_type.is_some() {
            bind_index += 1;
            sql.push_str(&format!(" AND source_type = ${bind_index}"));
        }
        if selection.source_id.is_some() {
            bind_index += 1;
            sql.push_str(&format!(" AND source_id = ${bind_index}"));
        }
        bind_index += 1;
        sql.push_str(&format!(
            " ORDER BY published_at DESC NULLS LAST LIMIT ${bind_index}"
        ));

        let mut query = sqlx::query(&sql)
            .bind(selection.project_id)
            .bind(&like_patterns);
        if let Some(source_type) = selection.source_type {
            query = query.bind(source_type.as_str());
        }
        if let Some(source_id) = selection.source_id {
            query = query.bind(source_id);
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::record_from_row).collect()
    }
}
