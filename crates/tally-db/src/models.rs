//! Database row types. These map directly to SQLite rows and are kept
//! separate from the tally-types API models; the `From` impls below are the
//! only bridge between the two.

use chrono::{DateTime, Utc};
use tally_types::models::{
    AuditLogEntry, Badge, Comment, EarnedBadge, LinkType, Profile, Role, Submission,
    SubmissionStatus,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub total_submissions: i64,
    pub total_published: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub link_type: LinkType,
    pub youtube_url: Option<String>,
    pub drive_url: Option<String>,
    pub status: SubmissionStatus,
    pub youtube_video_id: Option<String>,
    pub youtube_title: Option<String>,
    pub youtube_description: Option<String>,
    pub youtube_thumbnail: Option<String>,
    pub youtube_published_at: Option<DateTime<Utc>>,
    pub youtube_view_count: i64,
    pub youtube_like_count: i64,
    pub youtube_comment_count: i64,
    pub submitted_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Everything needed to insert a submission. Timestamps are decided by the
/// caller so the lifecycle policy lives in one place.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub link_type: LinkType,
    pub youtube_url: Option<String>,
    pub drive_url: Option<String>,
    pub status: SubmissionStatus,
    pub youtube_video_id: Option<String>,
    pub youtube_title: Option<String>,
    pub youtube_description: Option<String>,
    pub youtube_thumbnail: Option<String>,
    pub youtube_published_at: Option<DateTime<Utc>>,
    pub youtube_view_count: i64,
    pub youtube_like_count: i64,
    pub youtube_comment_count: i64,
    pub submitted_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Result of moving a submission to a new status.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: SubmissionStatus,
    pub submission: SubmissionRow,
}

#[derive(Debug, Clone)]
pub struct BadgeRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub threshold: i64,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct EarnedBadgeRow {
    pub badge: BadgeRow,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditLogRow {
    pub id: i64,
    pub admin_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub admin_id: Uuid,
    pub action: String,
    pub target_type: &'static str,
    pub target_id: String,
    pub old_values: serde_json::Value,
    pub new_values: serde_json::Value,
}

/// A profile's stored counters alongside the counts derived from its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSnapshot {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub stored_submissions: i64,
    pub stored_published: i64,
    pub actual_submissions: i64,
    pub actual_published: i64,
}

impl CountSnapshot {
    pub fn submissions_match(&self) -> bool {
        self.stored_submissions == self.actual_submissions
    }

    pub fn published_match(&self) -> bool {
        self.stored_published == self.actual_published
    }

    pub fn is_consistent(&self) -> bool {
        self.submissions_match() && self.published_match()
    }
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub author_name: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub total_submissions: i64,
    pub total_published: i64,
    pub badge_count: i64,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            total_submissions: row.total_submissions,
            total_published: row.total_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            link_type: row.link_type,
            youtube_url: row.youtube_url,
            drive_url: row.drive_url,
            status: row.status,
            youtube_video_id: row.youtube_video_id,
            youtube_title: row.youtube_title,
            youtube_description: row.youtube_description,
            youtube_thumbnail: row.youtube_thumbnail,
            youtube_published_at: row.youtube_published_at,
            youtube_view_count: row.youtube_view_count,
            youtube_like_count: row.youtube_like_count,
            youtube_comment_count: row.youtube_comment_count,
            submitted_at: row.submitted_at,
            edited_at: row.edited_at,
            uploaded_at: row.uploaded_at,
            published_at: row.published_at,
            rejected_at: row.rejected_at,
        }
    }
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Badge {
            id: row.id,
            name: row.name,
            description: row.description,
            threshold: row.threshold,
            icon: row.icon,
            color: row.color,
        }
    }
}

impl From<EarnedBadgeRow> for EarnedBadge {
    fn from(row: EarnedBadgeRow) -> Self {
        EarnedBadge {
            badge: row.badge.into(),
            earned_at: row.earned_at,
        }
    }
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        AuditLogEntry {
            id: row.id,
            admin_id: row.admin_id,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            old_values: row.old_values,
            new_values: row.new_values,
            created_at: row.created_at,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            submission_id: row.submission_id,
            user_id: row.user_id,
            author_name: row.author_name,
            content: row.content,
            parent_id: row.parent_id,
            created_at: row.created_at,
        }
    }
}
