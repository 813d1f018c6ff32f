//! Submission creation: validation, optional enrichment, initial status,
//! counter bump and badge evaluation.

use chrono::Utc;
use reqwest::Url;
use tracing::info;
use uuid::Uuid;

use tally_db::models::{NewSubmission, ProfileRow, SubmissionRow};
use tally_types::api::{CreateSubmissionRequest, FieldError, VideoMetadata};
use tally_types::models::{LinkType, SubmissionStatus};

use crate::auth::AppState;
use crate::badges;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::youtube::extract_video_id;

/// Input that passed validation. Only the URL matching the link type is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub title: String,
    pub description: Option<String>,
    pub link_type: LinkType,
    pub url: String,
}

pub fn validate(req: CreateSubmissionRequest) -> Result<ValidSubmission, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = req.title.trim().to_string();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    }

    let (field, raw_url) = match req.link_type {
        LinkType::Youtube => ("youtube_url", req.youtube_url),
        LinkType::Drive => ("drive_url", req.drive_url),
    };
    let url = raw_url.map(|u| u.trim().to_string()).unwrap_or_default();
    if url.is_empty() {
        errors.push(FieldError::new(field, "A URL is required for the selected link type"));
    } else if !is_web_url(&url) {
        errors.push(FieldError::new(field, "Please provide a valid URL for the selected link type"));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidSubmission {
        title,
        description: req
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        link_type: req.link_type,
        url,
    })
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Build the row to insert. YouTube links are public already and go
/// straight to `published`; drive links wait in `draft` for review.
pub fn plan_submission(
    owner_id: Uuid,
    input: ValidSubmission,
    video_id: Option<String>,
    metadata: Option<VideoMetadata>,
) -> NewSubmission {
    let now = Utc::now();
    let status = match input.link_type {
        LinkType::Youtube => SubmissionStatus::Published,
        LinkType::Drive => SubmissionStatus::Draft,
    };
    let (youtube_url, drive_url) = match input.link_type {
        LinkType::Youtube => (Some(input.url), None),
        LinkType::Drive => (None, Some(input.url)),
    };
    let count = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);

    NewSubmission {
        id: Uuid::new_v4(),
        user_id: owner_id,
        title: input.title,
        description: input.description,
        link_type: input.link_type,
        youtube_url,
        drive_url,
        status,
        youtube_video_id: video_id,
        youtube_thumbnail: metadata
            .as_ref()
            .and_then(|m| m.thumbnails.best_url().map(str::to_string)),
        youtube_title: metadata.as_ref().map(|m| m.title.clone()),
        youtube_description: metadata.as_ref().map(|m| m.description.clone()),
        youtube_published_at: metadata.as_ref().and_then(|m| m.published_at),
        youtube_view_count: metadata.as_ref().map_or(0, |m| count(m.statistics.view_count)),
        youtube_like_count: metadata.as_ref().map_or(0, |m| count(m.statistics.like_count)),
        youtube_comment_count: metadata.as_ref().map_or(0, |m| count(m.statistics.comment_count)),
        submitted_at: now,
        published_at: (status == SubmissionStatus::Published).then_some(now),
    }
}

/// Create a submission for `owner`.
///
/// The insert and the counter bump commit together; enrichment and badge
/// evaluation are best-effort and never fail the call.
pub async fn create_submission(
    state: &AppState,
    owner: &ProfileRow,
    req: CreateSubmissionRequest,
) -> ApiResult<SubmissionRow> {
    let input = validate(req).map_err(ApiError::Validation)?;

    let video_id = match input.link_type {
        LinkType::Youtube => extract_video_id(&input.url),
        LinkType::Drive => None,
    };
    let metadata = match &video_id {
        Some(id) => state.youtube.fetch_metadata(id).await,
        None => None,
    };

    let new = plan_submission(owner.id, input, video_id, metadata);
    let submission = db_call(state, move |db| db.create_submission(&new))
        .await?
        .ok_or(ApiError::ProfileMissing)?;

    info!(
        "Submission {} created by {} ({}, {})",
        submission.id,
        owner.id,
        submission.link_type.as_str(),
        submission.status
    );

    badges::evaluate_and_grant(state, owner.id).await;

    Ok(submission)
}
