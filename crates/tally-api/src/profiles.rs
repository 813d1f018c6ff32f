use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use tracing::info;

use tally_types::api::{LeaderboardEntry, LeaderboardQuery, ProfileResponse, UpdateProfileRequest};
use tally_types::models::{Badge, Profile};

use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentProfile;

const MAX_NAME_CHARS: usize = 100;

const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// GET /profile: the caller's profile with the badges earned so far.
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
) -> ApiResult<Json<ProfileResponse>> {
    let user_id = profile.id;
    let badges = db_call(&state, move |db| db.badges_for_user(user_id)).await?;

    Ok(Json(ProfileResponse {
        profile: profile.into(),
        badges: badges.into_iter().map(Into::into).collect(),
    }))
}

/// PATCH /profile: change the caller's display name. Later sign-ins keep
/// the edited name instead of the one carried by the token.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let Json(req) = payload?;
    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::invalid("full_name", "Name cannot be empty"));
    }
    if full_name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::invalid(
            "full_name",
            &format!("Name must be at most {MAX_NAME_CHARS} characters"),
        ));
    }

    let user_id = profile.id;
    let updated = db_call(&state, move |db| db.update_full_name(user_id, &full_name))
        .await?
        .ok_or(ApiError::ProfileMissing)?;

    info!("Profile {} renamed", user_id);
    Ok(Json(updated.into()))
}

/// GET /badges: the full catalogue, lowest threshold first.
pub async fn badge_catalogue(State(state): State<AppState>) -> ApiResult<Json<Vec<Badge>>> {
    let rows = db_call(&state, |db| db.list_badges()).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    let rows = db_call(&state, move |db| db.leaderboard(limit)).await?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            user_id: row.user_id,
            full_name: row.full_name,
            total_submissions: row.total_submissions,
            total_published: row.total_published,
            badge_count: row.badge_count,
        })
        .collect();
    Ok(Json(entries))
}
