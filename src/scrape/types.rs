use serde::{Deserialize, Serialize};

/// Music metadata nested inside a raw post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusicInfo {
    pub artist_name: Option<String>,
    pub song_name: Option<String>,
}

/// One raw scraped item as the platform scraper returns it.
///
/// The scraper's schema drifts between source types and versions, so every
/// field is optional and the full payload is preserved separately for
/// forensics. Field names follow the actor's camelCase JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPost {
    pub id: Option<String>,
    pub short_code: Option<String>,
    pub url: Option<String>,
    pub input_url: Option<String>,

    /// Explicit type tag, e.g. "Video" or "Image".
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    /// Product-type tag; short videos carry "clips".
    pub product_type: Option<String>,
    pub is_video: Option<bool>,

    pub caption: Option<String>,
    pub owner_username: Option<String>,
    pub owner_full_name: Option<String>,

    /// Real view counter. Authoritative for view filtering.
    pub video_view_count: Option<i64>,
    /// Real play counter, the secondary view signal.
    pub video_play_count: Option<i64>,
    /// Like counter. Never a substitute for views.
    pub likes_count: Option<i64>,
    pub comments_count: Option<i64>,

    pub timestamp: Option<String>,

    pub video_url: Option<String>,
    pub display_url: Option<String>,
    pub video_duration: Option<f64>,

    pub music_info: Option<MusicInfo>,
}

/// One hashtag result container: a page of nested post lists that needs one
/// level of flattening.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HashtagPage {
    pub name: Option<String>,
    pub top_posts: Vec<RawPost>,
    pub latest_posts: Vec<RawPost>,
}

impl HashtagPage {
    /// Flatten the page into its posts, top posts first.
    pub fn into_posts(self) -> Vec<RawPost> {
        let mut posts = self.top_posts;
        posts.extend(self.latest_posts);
        posts
    }
}
