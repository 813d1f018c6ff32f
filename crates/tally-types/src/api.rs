use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EarnedBadge, LinkType, Profile, Role, SubmissionStatus};

// -- JWT Claims --

/// Claims carried by tokens from the identity provider. `sub` is the
/// profile id; `email` and `name` feed the sign-in upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

// -- Submissions --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubmissionRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub link_type: LinkType,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub drive_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionListQuery {
    pub status: Option<SubmissionStatus>,
    /// Admin only: list every user's submissions instead of the caller's.
    #[serde(default)]
    pub all: bool,
    /// Matches title or YouTube URL, case-insensitively.
    pub q: Option<String>,
    /// Zero-based.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// -- Comments --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    /// Reply target; must be a comment on the same submission.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSubmissionStatusRequest {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// -- Admin --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<u32>,
}

/// Stored counters next to the values derived from the submissions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountComparison {
    pub stored_total_submissions: i64,
    pub stored_total_published: i64,
    pub actual_total_submissions: i64,
    pub actual_total_published: i64,
    pub submissions_match: bool,
    pub published_match: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountReport {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    #[serde(flatten)]
    pub counts: CountComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    /// Absent when reconciling this user failed.
    #[serde(flatten)]
    pub counts: Option<CountComparison>,
    pub repaired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub message: String,
    pub results: Vec<ReconcileResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSummary {
    pub total_users: usize,
    pub users_with_mismatched_submissions: usize,
    pub users_with_mismatched_published: usize,
}

#[derive(Debug, Serialize)]
pub struct DebugCountsResponse {
    pub debug_data: Vec<CountReport>,
    pub summary: DebugSummary,
}

// -- Profiles & leaderboard --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub badges: Vec<EarnedBadge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub total_submissions: i64,
    pub total_published: i64,
    pub badge_count: i64,
}

// -- YouTube --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadataQuery {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

impl Thumbnails {
    /// Largest thumbnail available.
    pub fn best_url(&self) -> Option<&str> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnails: Thumbnails,
    pub published_at: Option<DateTime<Utc>>,
    pub statistics: VideoStatistics,
}
