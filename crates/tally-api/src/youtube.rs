//! YouTube Data API client used to enrich submissions.
//!
//! Every failure mode (no key, network error, timeout, non-2xx, no such
//! video) collapses to `None`: enrichment is optional and must never fail
//! the request that asked for it.

use std::sync::LazyLock;
use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use tally_types::api::{Thumbnails, VideoMetadata, VideoMetadataQuery, VideoStatistics};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// watch?v=, youtu.be/, embed/, live/, shorts/ and legacy v/ URLs on
/// youtube.com (any subdomain) and youtube-nocookie.com. The host must start
/// the input or follow `//` or a dot, and the id must be exactly 11 chars.
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|//|\.)(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|live/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("video url pattern")
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("bare id pattern"));

/// Pull the 11-character video id out of a YouTube URL or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = VIDEO_URL.captures(input) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    BARE_ID.is_match(input).then(|| input.to_string())
}

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn fetch_metadata(&self, video_id: &str) -> Option<VideoMetadata> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("YouTube API key not configured, skipping metadata for {}", video_id);
            return None;
        };

        match self.request(api_key, video_id).await {
            Ok(Some(metadata)) => Some(metadata),
            Ok(None) => {
                info!("YouTube returned no video for {}", video_id);
                None
            }
            Err(e) => {
                warn!("YouTube metadata fetch for {} failed: {:#}", video_id, e);
                None
            }
        }
    }

    async fn request(&self, api_key: &str, video_id: &str) -> anyhow::Result<Option<VideoMetadata>> {
        let url = format!("{}/videos", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("id", video_id), ("part", "snippet,statistics"), ("key", api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("YouTube API error: {}", status);
        }

        let body: VideoListResponse = response.json().await?;
        Ok(body.items.into_iter().next().map(VideoItem::into_metadata))
    }
}

// ── Provider response shape ─────────────────────────────────────────────

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: RawStatistics,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    published_at: Option<DateTime<Utc>>,
}

/// The API reports counts as decimal strings and omits hidden ones.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn parse_count(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(0)
}

impl VideoItem {
    fn into_metadata(self) -> VideoMetadata {
        VideoMetadata {
            id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnails: self.snippet.thumbnails,
            published_at: self.snippet.published_at,
            statistics: VideoStatistics {
                view_count: parse_count(self.statistics.view_count),
                like_count: parse_count(self.statistics.like_count),
                comment_count: parse_count(self.statistics.comment_count),
            },
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────────

/// GET /youtube/metadata?videoId=
pub async fn get_metadata(
    State(state): State<AppState>,
    query: Result<Query<VideoMetadataQuery>, QueryRejection>,
) -> ApiResult<Json<VideoMetadata>> {
    let Query(query) = query?;
    let video_id = query
        .video_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::invalid("videoId", "Video ID required"))?;

    if !state.youtube.is_configured() {
        return Err(ApiError::Internal("YouTube API key not configured".into()));
    }

    state
        .youtube
        .fetch_metadata(&video_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound("Video"))
}
