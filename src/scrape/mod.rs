//! Scraping collaborator interface.
//!
//! One call per source. Hashtag responses arrive as containers of nested post
//! lists and are flattened one level before they reach the normalizer;
//! account responses are already flat.

pub mod apify;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::SourceBatch;
pub use types::{HashtagPage, MusicInfo, RawPost};

/// Raw result of one scrape call, before any flattening.
#[derive(Debug, Clone)]
pub enum ScrapeResponse {
    /// Account scrapes return items directly.
    Flat(Vec<RawPost>),
    /// Hashtag scrapes return containers holding nested post lists.
    Pages(Vec<HashtagPage>),
}

impl ScrapeResponse {
    /// Flatten one level into a plain post list.
    pub fn flatten(self) -> Vec<RawPost> {
        match self {
            ScrapeResponse::Flat(posts) => posts,
            ScrapeResponse::Pages(pages) => {
                pages.into_iter().flat_map(HashtagPage::into_posts).collect()
            }
        }
    }
}

/// Opaque network collaborator that produces raw scraped items for a source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScrapeClient: Send + Sync {
    /// Run one scrape for the batch's source.
    async fn scrape(&self, batch: &SourceBatch) -> Result<ScrapeResponse>;
}
