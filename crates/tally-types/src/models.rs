use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted enum value is not one we know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

/// Channel a submission was made through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Youtube,
    Drive,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Drive => "drive",
        }
    }
}

impl FromStr for LinkType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Self::Youtube),
            "drive" => Ok(Self::Drive),
            other => Err(ParseEnumError { kind: "link type", value: other.to_string() }),
        }
    }
}

/// Lifecycle stage of a submission.
///
/// The review flow is `draft -> edited -> uploaded -> published | rejected`,
/// but admins may jump straight to `published` or `rejected` from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Draft,
    Edited,
    Uploaded,
    Published,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Edited => "edited",
            Self::Uploaded => "uploaded",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    /// Column that records the first time a submission reached this status.
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            Self::Draft => None,
            Self::Edited => Some("edited_at"),
            Self::Uploaded => Some("uploaded_at"),
            Self::Published => Some("published_at"),
            Self::Rejected => Some("rejected_at"),
        }
    }

    /// Statuses an admin may move a submission into.
    pub fn is_admin_target(&self) -> bool {
        matches!(self, Self::Published | Self::Rejected | Self::Uploaded)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "edited" => Ok(Self::Edited),
            "uploaded" => Ok(Self::Uploaded),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseEnumError { kind: "status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub total_submissions: i64,
    pub total_published: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub threshold: i64,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedBadge {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

/// Append-only record of an administrative mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub user_id: Uuid,
    /// Display name of the author at read time.
    pub author_name: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_its_own_names() {
        for status in [
            SubmissionStatus::Draft,
            SubmissionStatus::Edited,
            SubmissionStatus::Uploaded,
            SubmissionStatus::Published,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
        }
        assert!("archived".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn only_review_outcomes_are_admin_targets() {
        assert!(SubmissionStatus::Published.is_admin_target());
        assert!(SubmissionStatus::Rejected.is_admin_target());
        assert!(SubmissionStatus::Uploaded.is_admin_target());
        assert!(!SubmissionStatus::Draft.is_admin_target());
        assert!(!SubmissionStatus::Edited.is_admin_target());
    }

    #[test]
    fn draft_has_no_timestamp_column() {
        assert_eq!(SubmissionStatus::Draft.timestamp_column(), None);
        assert_eq!(SubmissionStatus::Rejected.timestamp_column(), Some("rejected_at"));
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&LinkType::Youtube).unwrap(), "\"youtube\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'owner'");
    }
}
