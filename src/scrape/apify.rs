//! Apify actor client: start a run, long-poll until it finishes, fetch the
//! dataset items.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReelError, Result};
use crate::model::{SourceBatch, SourceType};

use super::types::{HashtagPage, RawPost};
use super::{ScrapeClient, ScrapeResponse};

const BASE_URL: &str = "https://api.apify.com/v2";

/// Hard cap the actor imposes on hashtag search breadth.
const HASHTAG_SEARCH_LIMIT: u32 = 250;

/// Each poll long-waits up to 60 s server-side, so this caps a single run
/// at roughly an hour of wall clock.
const MAX_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountInput {
    username: Vec<String>,
    results_limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashtagInput {
    search: String,
    search_type: &'static str,
    search_limit: u32,
    results_type: &'static str,
    results_limit: u32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: String,
}

/// Result of one status poll.
enum RunPoll {
    Done(RunData),
    InProgress,
}

pub struct ApifyScraper {
    client: reqwest::Client,
    token: String,
    actor: String,
}

impl ApifyScraper {
    pub fn new(token: String, actor: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            actor,
        }
    }

    /// Reduce a hashtag source value to the bare tag. Accepts `#tag`, a bare
    /// tag, or a full explore-tags URL.
    fn extract_tag(value: &str) -> String {
        let value = value.trim();
        if let Some(stripped) = value.strip_prefix('#') {
            return stripped.trim().to_string();
        }
        if value.contains("/explore/tags/") {
            if let Some(rest) = value.split("/explore/tags/").nth(1) {
                if let Some(tag) = rest.split('/').find(|s| !s.is_empty()) {
                    return tag.to_string();
                }
            }
        }
        value.to_string()
    }

    async fn start_run<I: Serialize>(&self, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, self.actor);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Scrape(format!(
                "actor start failed with {}: {}",
                status, body
            )));
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Map a polled run record to its terminal outcome, or signal that it
    /// is still in flight.
    fn interpret_run_status(run: RunData) -> Result<RunPoll> {
        match run.status.as_str() {
            "SUCCEEDED" => Ok(RunPoll::Done(run)),
            "FAILED" | "ABORTED" | "TIMED-OUT" => Err(ReelError::Scrape(format!(
                "actor run ended with status {}",
                run.status
            ))),
            _ => Ok(RunPoll::InProgress),
        }
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling, and gives up after `MAX_POLL_ATTEMPTS` polls so a run
    /// the actor never finishes cannot hang the command forever.
    async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        for _ in 0..MAX_POLL_ATTEMPTS {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ReelError::Scrape(format!(
                    "run status check failed with {}: {}",
                    status, body
                )));
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            let run_status = api_resp.data.status.clone();
            match Self::interpret_run_status(api_resp.data)? {
                RunPoll::Done(run) => return Ok(run),
                RunPoll::InProgress => {
                    debug!(run_id, status = %run_status, "Run still in progress");
                }
            }
        }

        Err(ReelError::Scrape(format!(
            "actor run {} did not finish within {} polls",
            run_id, MAX_POLL_ATTEMPTS
        )))
    }

    async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Scrape(format!(
                "dataset fetch failed with {}: {}",
                status, body
            )));
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    async fn run_to_completion<I: Serialize>(&self, input: &I) -> Result<RunData> {
        let run = self.start_run(input).await?;
        info!(run_id = %run.id, "Actor run started, polling for completion");
        let completed = self.wait_for_run(&run.id).await?;
        info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );
        Ok(completed)
    }
}

#[async_trait]
impl ScrapeClient for ApifyScraper {
    async fn scrape(&self, batch: &SourceBatch) -> Result<ScrapeResponse> {
        let limit = batch.policy.result_limit;

        match batch.source_type {
            SourceType::Competitor => {
                let username = batch.source_value.trim().to_string();
                info!(%username, limit, "Starting account scrape");

                let input = AccountInput {
                    username: vec![username],
                    results_limit: limit,
                };
                let completed = self.run_to_completion(&input).await?;
                let posts: Vec<RawPost> =
                    self.get_dataset_items(&completed.default_dataset_id).await?;
                info!(count = posts.len(), "Fetched account posts");
                Ok(ScrapeResponse::Flat(posts))
            }
            SourceType::Hashtag => {
                let tag = Self::extract_tag(&batch.source_value);
                info!(%tag, limit, "Starting hashtag scrape");

                let input = HashtagInput {
                    search: format!("#{}", tag),
                    search_type: "hashtag",
                    search_limit: HASHTAG_SEARCH_LIMIT,
                    results_type: "posts",
                    results_limit: limit,
                };
                let completed = self.run_to_completion(&input).await?;
                let pages: Vec<HashtagPage> =
                    self.get_dataset_items(&completed.default_dataset_id).await?;
                info!(pages = pages.len(), "Fetched hashtag result pages");
                Ok(ScrapeResponse::Pages(pages))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_tag_handles_all_source_value_shapes() {
        assert_eq!(ApifyScraper::extract_tag("#skincare"), "skincare");
        assert_eq!(ApifyScraper::extract_tag("skincare"), "skincare");
        assert_eq!(
            ApifyScraper::extract_tag("https://www.instagram.com/explore/tags/skincare/"),
            "skincare"
        );
        assert_eq!(ApifyScraper::extract_tag("  #botox "), "botox");
    }

    fn run(status: &str) -> RunData {
        RunData {
            id: "run-1".to_string(),
            status: status.to_string(),
            default_dataset_id: "ds-1".to_string(),
        }
    }

    #[test]
    fn run_status_interpretation_covers_every_outcome() {
        assert!(matches!(
            ApifyScraper::interpret_run_status(run("SUCCEEDED")),
            Ok(RunPoll::Done(_))
        ));
        assert!(matches!(
            ApifyScraper::interpret_run_status(run("RUNNING")),
            Ok(RunPoll::InProgress)
        ));
        for terminal in ["FAILED", "ABORTED", "TIMED-OUT"] {
            assert!(matches!(
                ApifyScraper::interpret_run_status(run(terminal)),
                Err(ReelError::Scrape(_))
            ));
        }
    }

    #[test]
    fn hashtag_input_serializes_with_actor_field_names() {
        let input = HashtagInput {
            search: "#tag".to_string(),
            search_type: "hashtag",
            search_limit: HASHTAG_SEARCH_LIMIT,
            results_type: "posts",
            results_limit: 40,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["searchType"], "hashtag");
        assert_eq!(value["searchLimit"], 250);
        assert_eq!(value["resultsLimit"], 40);
    }
}
