//! Admin-only handlers. Each takes `AdminProfile`, which rejects callers
//! without the admin role before the handler body runs.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

use tally_types::api::{
    DebugCountsResponse, ReconcileRequest, ReconcileResponse, UpdateSubmissionStatusRequest,
    UpdateUserRoleRequest,
};
use tally_types::models::{Profile, Submission};

use crate::audit;
use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminProfile;
use crate::reconcile;
use crate::transitions;

/// PATCH /admin/submissions
pub async fn update_submission_status(
    State(state): State<AppState>,
    AdminProfile(admin): AdminProfile,
    payload: Result<Json<UpdateSubmissionStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Submission>> {
    let Json(req) = payload?;
    let submission =
        transitions::transition(&state, &admin, req.submission_id, req.status, req.timestamp).await?;
    Ok(Json(submission.into()))
}

/// PATCH /admin/users
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminProfile(admin): AdminProfile,
    payload: Result<Json<UpdateUserRoleRequest>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let Json(req) = payload?;
    let admin_id = admin.id;
    let role = req.role;

    let (previous, profile) = db_call(&state, move |db| {
        db.update_role(req.user_id, role, |before| audit::role_update(admin_id, before, role))
    })
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    info!(
        "Admin {} changed role of {} from {} to {}",
        admin_id,
        profile.id,
        previous.as_str(),
        role.as_str()
    );
    Ok(Json(profile.into()))
}

/// POST /admin/reconcile-counts. The body `{ "userId": ... }` is optional;
/// without it every profile is reconciled.
pub async fn reconcile_counts(
    State(state): State<AppState>,
    AdminProfile(admin): AdminProfile,
    payload: Result<Json<ReconcileRequest>, JsonRejection>,
) -> ApiResult<Json<ReconcileResponse>> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => ReconcileRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let results = reconcile::reconcile(&state, req.user_id).await?;
    let message = reconcile::summary_message(&results);
    info!("Admin {} triggered reconciliation: {}", admin.id, message);

    Ok(Json(ReconcileResponse { message, results }))
}

/// GET /admin/debug-counts
pub async fn debug_counts(
    State(state): State<AppState>,
    AdminProfile(_admin): AdminProfile,
) -> ApiResult<Json<DebugCountsResponse>> {
    Ok(Json(reconcile::debug_counts(&state).await?))
}
