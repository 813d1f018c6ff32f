use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use tally_db::models::{ProfileRow, SubmissionRow};
use tally_db::queries::submissions::{Page, SubmissionFilter};
use tally_types::api::{CreateSubmissionRequest, SubmissionListQuery};
use tally_types::models::Submission;

use crate::audit;
use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle;
use crate::middleware::CurrentProfile;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// POST /submissions
pub async fn create(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    payload: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let Json(req) = payload?;
    let submission = lifecycle::create_submission(&state, &profile, req).await?;
    Ok((StatusCode::CREATED, Json(submission.into())))
}

/// GET /submissions: the caller's own submissions. Admins may pass
/// `all=true` to see everyone's, typically with `status=` for a review queue.
/// `q` searches title and YouTube URL; `page`/`page_size` page the result.
pub async fn list(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    query: Result<Query<SubmissionListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Submission>>> {
    let Query(query) = query?;
    if query.all && !profile.is_admin() {
        return Err(ApiError::Forbidden("Admin access required"));
    }

    let size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(ApiError::invalid(
            "page_size",
            &format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }

    let filter = SubmissionFilter {
        user_id: (!query.all).then_some(profile.id),
        status: query.status,
        search: query.q,
        page: Some(Page {
            number: query.page.unwrap_or(0),
            size,
        }),
    };
    let rows = db_call(&state, move |db| db.list_submissions(&filter)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Load a submission the caller may see: their own, or any for admins.
pub(crate) async fn load_visible(
    state: &AppState,
    profile: &ProfileRow,
    id: Uuid,
) -> ApiResult<SubmissionRow> {
    let row = db_call(state, move |db| db.get_submission(id))
        .await?
        .ok_or(ApiError::NotFound("Submission"))?;

    if row.user_id != profile.id && !profile.is_admin() {
        return Err(ApiError::Forbidden("Not allowed to access this submission"));
    }
    Ok(row)
}

/// GET /submissions/{id}
pub async fn get_one(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Submission>> {
    let Path(id) = path?;
    let row = load_visible(&state, &profile, id).await?;
    Ok(Json(row.into()))
}

/// DELETE /submissions/{id}
///
/// The owner's counters are re-derived in the same transaction as the
/// delete. An admin removing someone else's submission leaves an audit
/// entry.
pub async fn delete(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let row = load_visible(&state, &profile, id).await?;

    let entry = (row.user_id != profile.id).then(|| audit::submission_delete(profile.id, &row));
    let (deleted, counts) = db_call(&state, move |db| db.delete_submission(id, entry))
        .await?
        .ok_or(ApiError::NotFound("Submission"))?;

    info!(
        "Submission {} deleted by {}; owner {} now at {}/{}",
        deleted.id, profile.id, deleted.user_id, counts.actual_submissions, counts.actual_published
    );
    Ok(StatusCode::NO_CONTENT)
}
