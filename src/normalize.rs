//! Record normalization: one raw scraped item in, one canonical record or a
//! rejection out.
//!
//! Pure transform with no side effects. A malformed item never aborts a
//! batch; the caller logs the rejection and moves on.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::model::{AdmissionPolicy, ContentRecord, Provenance, TranscriptStatus};
use crate::scrape::RawPost;

/// Resolve the authoritative view count: a real view counter first, then a
/// real play counter. Zero-valued counters are treated as absent. Likes are
/// never a proxy for views.
fn resolve_views(raw: &RawPost) -> Option<i64> {
    match raw.video_view_count {
        Some(v) if v > 0 => return Some(v),
        _ => {}
    }
    match raw.video_play_count {
        Some(v) if v > 0 => Some(v),
        _ => None,
    }
}

/// Platform signals marking a short-video post.
fn is_short_video(raw: &RawPost) -> bool {
    raw.post_type.as_deref() == Some("Video")
        || raw.product_type.as_deref() == Some("clips")
        || raw.is_video == Some(true)
}

fn parse_timestamp(raw: &RawPost) -> Option<DateTime<Utc>> {
    raw.timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map a raw scraped item into a candidate record, applying the admission
/// policy. Returns `None` to reject.
pub fn normalize(
    raw: &RawPost,
    policy: &AdmissionPolicy,
    provenance: &Provenance,
    now: DateTime<Utc>,
) -> Option<ContentRecord> {
    if !is_short_video(raw) {
        debug!(short_code = ?raw.short_code, "Rejected: not a short-video post");
        return None;
    }

    let views = resolve_views(raw);
    if policy.min_views.is_some() && views.is_none() {
        debug!(
            short_code = ?raw.short_code,
            likes = ?raw.likes_count,
            "Rejected: no real view or play counter while a view floor is active"
        );
        return None;
    }

    let published_at = parse_timestamp(raw);
    if let Some(max_age_days) = policy.max_age_days {
        let cutoff = now - Duration::days(i64::from(max_age_days));
        match published_at {
            Some(ts) if ts >= cutoff => {}
            Some(_) => {
                debug!(short_code = ?raw.short_code, "Rejected: older than age bound");
                return None;
            }
            None => {
                debug!(
                    short_code = ?raw.short_code,
                    "Rejected: missing publish timestamp while an age bound is active"
                );
                return None;
            }
        }
    }

    if let Some(min_views) = policy.min_views {
        let views = views.unwrap_or(0);
        if views < min_views as i64 {
            debug!(short_code = ?raw.short_code, views, min_views, "Rejected: below view floor");
            return None;
        }
    }

    let content_url = match raw.url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => {
            // Without a stable URL the record could never be deduplicated.
            debug!(short_code = ?raw.short_code, "Rejected: missing content URL");
            return None;
        }
    };

    let music = raw.music_info.clone().unwrap_or_default();
    let raw_payload = serde_json::to_value(raw).unwrap_or(serde_json::Value::Null);

    Some(ContentRecord {
        content_url,
        platform_id: raw.id.clone().or_else(|| raw.short_code.clone()),
        project_id: provenance.project_id,
        source_type: provenance.source_type,
        source_id: provenance.source_id,
        author_username: raw.owner_username.clone(),
        caption: raw.caption.clone(),
        view_count: views.unwrap_or(0),
        like_count: raw.likes_count.unwrap_or(0),
        comment_count: raw.comments_count.unwrap_or(0),
        published_at,
        video_url: raw.video_url.clone(),
        thumbnail_url: raw.display_url.clone(),
        audio_title: music.song_name,
        audio_artist: music.artist_name,
        transcript: None,
        transcript_status: TranscriptStatus::Absent,
        raw_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;

    fn provenance() -> Provenance {
        Provenance {
            project_id: 1,
            source_type: SourceType::Competitor,
            source_id: 7,
        }
    }

    fn video_post(url: &str) -> RawPost {
        RawPost {
            post_type: Some("Video".to_string()),
            url: Some(url.to_string()),
            ..RawPost::default()
        }
    }

    #[test]
    fn non_video_posts_are_rejected() {
        let mut raw = video_post("https://example.com/reel/1");
        raw.post_type = Some("Image".to_string());
        let policy = AdmissionPolicy::default();
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn clips_product_type_counts_as_short_video() {
        let raw = RawPost {
            product_type: Some("clips".to_string()),
            url: Some("https://example.com/reel/2".to_string()),
            ..RawPost::default()
        };
        let policy = AdmissionPolicy::default();
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_some());
    }

    #[test]
    fn likes_are_never_substituted_for_views() {
        let mut raw = video_post("https://example.com/reel/3");
        raw.likes_count = Some(900_000);
        let policy = AdmissionPolicy {
            min_views: Some(1000),
            ..AdmissionPolicy::default()
        };
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn play_counter_is_a_valid_view_source() {
        let mut raw = video_post("https://example.com/reel/4");
        raw.video_play_count = Some(5000);
        let policy = AdmissionPolicy {
            min_views: Some(1000),
            ..AdmissionPolicy::default()
        };
        let record = normalize(&raw, &policy, &provenance(), Utc::now()).unwrap();
        assert_eq!(record.view_count, 5000);
    }

    #[test]
    fn view_counter_takes_precedence_over_play_counter() {
        let mut raw = video_post("https://example.com/reel/5");
        raw.video_view_count = Some(8000);
        raw.video_play_count = Some(12000);
        let record = normalize(&raw, &AdmissionPolicy::default(), &provenance(), Utc::now())
            .unwrap();
        assert_eq!(record.view_count, 8000);
    }

    #[test]
    fn zero_counters_are_treated_as_absent() {
        let mut raw = video_post("https://example.com/reel/6");
        raw.video_view_count = Some(0);
        raw.video_play_count = Some(0);
        let policy = AdmissionPolicy {
            min_views: Some(1),
            ..AdmissionPolicy::default()
        };
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn below_view_floor_is_rejected() {
        let mut raw = video_post("https://example.com/reel/7");
        raw.video_view_count = Some(999);
        let policy = AdmissionPolicy {
            min_views: Some(1000),
            ..AdmissionPolicy::default()
        };
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn missing_timestamp_is_rejected_when_age_bound_is_active() {
        let raw = video_post("https://example.com/reel/8");
        let policy = AdmissionPolicy {
            max_age_days: Some(30),
            ..AdmissionPolicy::default()
        };
        assert!(normalize(&raw, &policy, &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn stale_posts_are_rejected_and_fresh_ones_pass() {
        let now = Utc::now();
        let policy = AdmissionPolicy {
            max_age_days: Some(30),
            ..AdmissionPolicy::default()
        };

        let mut stale = video_post("https://example.com/reel/9");
        stale.timestamp = Some((now - Duration::days(45)).to_rfc3339());
        assert!(normalize(&stale, &policy, &provenance(), now).is_none());

        let mut fresh = video_post("https://example.com/reel/10");
        fresh.timestamp = Some((now - Duration::days(5)).to_rfc3339());
        assert!(normalize(&fresh, &policy, &provenance(), now).is_some());
    }

    #[test]
    fn missing_url_is_rejected() {
        let raw = RawPost {
            post_type: Some("Video".to_string()),
            ..RawPost::default()
        };
        assert!(normalize(&raw, &AdmissionPolicy::default(), &provenance(), Utc::now()).is_none());
    }

    #[test]
    fn mapped_record_carries_provenance_and_raw_payload() {
        let mut raw = video_post("https://example.com/reel/11");
        raw.owner_username = Some("someclinic".to_string());
        raw.caption = Some("routine".to_string());
        raw.video_view_count = Some(2000);
        raw.likes_count = Some(150);
        raw.comments_count = Some(12);
        raw.music_info = Some(crate::scrape::MusicInfo {
            artist_name: Some("artist".to_string()),
            song_name: Some("song".to_string()),
        });

        let record = normalize(&raw, &AdmissionPolicy::default(), &provenance(), Utc::now())
            .unwrap();
        assert_eq!(record.project_id, 1);
        assert_eq!(record.source_id, 7);
        assert_eq!(record.source_type, SourceType::Competitor);
        assert_eq!(record.author_username.as_deref(), Some("someclinic"));
        assert_eq!(record.audio_title.as_deref(), Some("song"));
        assert_eq!(record.transcript_status, TranscriptStatus::Absent);
        assert_eq!(record.raw_payload["ownerUsername"], "someclinic");
    }
}
