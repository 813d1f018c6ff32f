pub mod admin;
pub mod audit;
pub mod auth;
pub mod badges;
pub mod comments;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod profiles;
pub mod reconcile;
pub mod submissions;
pub mod transitions;
pub mod youtube;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tracing::error;

use tally_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Run a blocking database call off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal server error".into())
        })?
        .map_err(ApiError::Storage)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Every route except `/health` sits behind `require_auth`. Handlers that
/// need a profile or the admin role ask for it through their extractors.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/session", post(auth::sign_in))
        .route(
            "/profile",
            get(profiles::get_profile).patch(profiles::update_profile),
        )
        .route("/badges", get(profiles::badge_catalogue))
        .route("/leaderboard", get(profiles::leaderboard))
        .route("/youtube/metadata", get(youtube::get_metadata))
        .route(
            "/submissions",
            post(submissions::create).get(submissions::list),
        )
        .route(
            "/submissions/{id}",
            get(submissions::get_one).delete(submissions::delete),
        )
        .route(
            "/submissions/{id}/comments",
            get(comments::list).post(comments::create),
        )
        .route("/admin/submissions", patch(admin::update_submission_status))
        .route("/admin/users", patch(admin::update_user_role))
        .route("/admin/reconcile-counts", post(admin::reconcile_counts))
        .route("/admin/debug-counts", get(admin::debug_counts))
        .route("/admin/audit-logs", get(audit::list_audit_logs))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().route("/health", get(health)).merge(protected)
}
