//! Review discussion on a submission. Visible to the submission's owner
//! and to admins, the same audience as the submission itself.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use tally_db::models::NewComment;
use tally_types::api::CreateCommentRequest;
use tally_types::models::Comment;

use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentProfile;
use crate::submissions::load_visible;

const MAX_COMMENT_CHARS: usize = 5000;

/// GET /submissions/{id}/comments
pub async fn list(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let Path(submission_id) = path?;
    load_visible(&state, &profile, submission_id).await?;

    let rows = db_call(&state, move |db| db.list_comments(submission_id)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// POST /submissions/{id}/comments
pub async fn create(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let Path(submission_id) = path?;
    let Json(req) = payload?;
    load_visible(&state, &profile, submission_id).await?;

    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::invalid("content", "Comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(ApiError::invalid(
            "content",
            &format!("Comment must be at most {MAX_COMMENT_CHARS} characters"),
        ));
    }

    if let Some(parent_id) = req.parent_id {
        let parent = db_call(&state, move |db| db.get_comment(parent_id)).await?;
        if parent.is_none_or(|p| p.submission_id != submission_id) {
            return Err(ApiError::invalid(
                "parent_id",
                "Reply must target a comment on the same submission",
            ));
        }
    }

    let new = NewComment {
        id: Uuid::new_v4(),
        submission_id,
        user_id: profile.id,
        content,
        parent_id: req.parent_id,
    };
    let comment = db_call(&state, move |db| db.add_comment(&new)).await?;

    info!("Comment {} added to submission {} by {}", comment.id, submission_id, profile.id);
    Ok((StatusCode::CREATED, Json(comment.into())))
}
