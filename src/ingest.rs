//! Ingestion: one scrape call per source, normalization, dedup, persistence.
//!
//! Per-item failures never abort a batch; a scrape-service failure is fatal
//! for its own batch only.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{ContentRecord, SourceBatch};
use crate::normalize::normalize;
use crate::scrape::ScrapeClient;
use crate::store::{ContentStore, InsertOutcome};

/// Decision of the dedup gate for one candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Inserted,
    Skipped,
}

/// Insert-vs-skip by natural key. Idempotent: re-admitting the same
/// `content_url` leaves exactly one stored record.
pub struct DedupGate<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> DedupGate<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    pub async fn admit(&self, record: &ContentRecord) -> Result<Admission> {
        if self.store.find_by_url(&record.content_url).await?.is_some() {
            return Ok(Admission::Skipped);
        }
        // The lookup-then-insert window is covered by the store's uniqueness
        // constraint; a concurrent insert surfaces as Duplicate, not an error.
        match self.store.insert(record).await? {
            InsertOutcome::Inserted => Ok(Admission::Inserted),
            InsertOutcome::Duplicate => Ok(Admission::Skipped),
        }
    }
}

/// Tallies for one ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub errors: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
        self.errors += other.errors;
    }
}

pub struct IngestionOrchestrator<'a> {
    scraper: &'a dyn ScrapeClient,
    store: &'a dyn ContentStore,
}

impl<'a> IngestionOrchestrator<'a> {
    pub fn new(scraper: &'a dyn ScrapeClient, store: &'a dyn ContentStore) -> Self {
        Self { scraper, store }
    }

    /// Run one source batch to completion. The loop always finishes and
    /// returns tallies; only the scrape call itself can fail the batch.
    pub async fn run(&self, batch: &SourceBatch) -> Result<IngestReport> {
        info!(
            source_type = batch.source_type.as_str(),
            source_id = batch.source_id,
            source_value = %batch.source_value,
            "Starting ingestion batch"
        );

        let response = self.scraper.scrape(batch).await?;
        let posts = response.flatten();
        info!(count = posts.len(), "Scrape returned items");

        let gate = DedupGate::new(self.store);
        let provenance = batch.provenance();
        let now = Utc::now();
        let mut report = IngestReport::default();

        for post in &posts {
            let Some(record) = normalize(post, &batch.policy, &provenance, now) else {
                report.rejected += 1;
                continue;
            };

            match gate.admit(&record).await {
                Ok(Admission::Inserted) => {
                    info!(url = %record.content_url, views = record.view_count, "Inserted record");
                    report.inserted += 1;
                }
                Ok(Admission::Skipped) => {
                    report.duplicates += 1;
                }
                Err(e) => {
                    warn!(url = %record.content_url, error = %e, "Failed to persist record");
                    report.errors += 1;
                }
            }
        }

        info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            rejected = report.rejected,
            errors = report.errors,
            "Ingestion batch finished"
        );
        Ok(report)
    }

    /// Process batches independently: a failed batch contributes an error
    /// tally and leaves the others untouched.
    pub async fn run_all(
        &self,
        batches: &[SourceBatch],
        pause: std::time::Duration,
    ) -> IngestReport {
        let mut total = IngestReport::default();
        for (i, batch) in batches.iter().enumerate() {
            match self.run(batch).await {
                Ok(report) => total.merge(report),
                Err(e) => {
                    warn!(
                        source_value = %batch.source_value,
                        error = %e,
                        "Ingestion batch failed, continuing with remaining sources"
                    );
                    total.errors += 1;
                }
            }
            if i + 1 < batches.len() {
                tokio::time::sleep(pause).await;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdmissionPolicy, SourceType};
    use crate::scrape::{HashtagPage, MockScrapeClient, RawPost, ScrapeResponse};
    use crate::store::memory::MemoryStore;

    fn video(url: &str, views: Option<i64>, likes: Option<i64>) -> RawPost {
        RawPost {
            post_type: Some("Video".to_string()),
            url: Some(url.to_string()),
            video_view_count: views,
            likes_count: likes,
            ..RawPost::default()
        }
    }

    fn image(url: &str) -> RawPost {
        RawPost {
            post_type: Some("Image".to_string()),
            url: Some(url.to_string()),
            ..RawPost::default()
        }
    }

    fn hashtag_batch(min_views: Option<u64>) -> SourceBatch {
        SourceBatch {
            project_id: 1,
            source_type: SourceType::Hashtag,
            source_id: 3,
            source_value: "#skincare".to_string(),
            policy: AdmissionPolicy {
                min_views,
                max_age_days: None,
                result_limit: 100,
            },
        }
    }

    fn nested_response() -> ScrapeResponse {
        // 3 containers, 2 posts each: 2 images, 4 videos, of which only 2
        // carry a real view counter at or above 1000.
        ScrapeResponse::Pages(vec![
            HashtagPage {
                name: Some("skincare".to_string()),
                top_posts: vec![
                    video("https://example.com/reel/a", Some(5000), None),
                    image("https://example.com/p/b"),
                ],
                latest_posts: vec![],
            },
            HashtagPage {
                name: Some("skincare".to_string()),
                top_posts: vec![
                    video("https://example.com/reel/c", None, Some(90_000)),
                    video("https://example.com/reel/d", Some(1000), None),
                ],
                latest_posts: vec![],
            },
            HashtagPage {
                name: Some("skincare".to_string()),
                top_posts: vec![
                    image("https://example.com/p/e"),
                    video("https://example.com/reel/f", None, None),
                ],
                latest_posts: vec![],
            },
        ])
    }

    #[tokio::test]
    async fn nested_hashtag_scrape_inserts_only_qualifying_videos() {
        let mut scraper = MockScrapeClient::new();
        scraper.expect_scrape().returning(|_| Ok(nested_response()));
        let store = MemoryStore::new();

        let orchestrator = IngestionOrchestrator::new(&scraper, &store);
        let report = orchestrator.run(&hashtag_batch(Some(1000))).await.unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.rejected, 4);
        assert_eq!(store.len(), 2);
        assert!(store.get("https://example.com/reel/a").is_some());
        assert!(store.get("https://example.com/reel/d").is_some());
    }

    #[tokio::test]
    async fn rerunning_the_same_scrape_inserts_nothing() {
        let mut scraper = MockScrapeClient::new();
        scraper.expect_scrape().returning(|_| Ok(nested_response()));
        let store = MemoryStore::new();

        let orchestrator = IngestionOrchestrator::new(&scraper, &store);
        let first = orchestrator.run(&hashtag_batch(Some(1000))).await.unwrap();
        let second = orchestrator.run(&hashtag_batch(Some(1000))).await.unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn dedup_gate_is_idempotent_at_the_natural_key() {
        let store = MemoryStore::new();
        let gate = DedupGate::new(&store);
        let record = normalize(
            &video("https://example.com/reel/x", Some(10), None),
            &AdmissionPolicy::default(),
            &hashtag_batch(None).provenance(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(gate.admit(&record).await.unwrap(), Admission::Inserted);
        assert_eq!(gate.admit(&record).await.unwrap(), Admission::Skipped);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn scrape_failure_is_fatal_for_that_batch_only() {
        let mut scraper = MockScrapeClient::new();
        let mut calls = 0;
        scraper.expect_scrape().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(crate::error::ReelError::Scrape("actor down".to_string()))
            } else {
                Ok(ScrapeResponse::Flat(vec![video(
                    "https://example.com/reel/ok",
                    Some(10),
                    None,
                )]))
            }
        });
        let store = MemoryStore::new();
        let orchestrator = IngestionOrchestrator::new(&scraper, &store);

        let batches = vec![hashtag_batch(None), hashtag_batch(None)];
        let report = orchestrator
            .run_all(&batches, std::time::Duration::ZERO)
            .await;

        assert_eq!(report.errors, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn flat_account_response_skips_flattening() {
        let mut scraper = MockScrapeClient::new();
        scraper.expect_scrape().returning(|_| {
            Ok(ScrapeResponse::Flat(vec![
                video("https://example.com/reel/1", Some(100), None),
                image("https://example.com/p/2"),
            ]))
        });
        let store = MemoryStore::new();
        let orchestrator = IngestionOrchestrator::new(&scraper, &store);

        let batch = SourceBatch {
            project_id: 1,
            source_type: SourceType::Competitor,
            source_id: 9,
            source_value: "someclinic".to_string(),
            policy: AdmissionPolicy::default(),
        };
        let report = orchestrator.run(&batch).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.rejected, 1);
    }
}
