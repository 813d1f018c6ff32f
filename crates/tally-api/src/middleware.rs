use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use tally_db::models::ProfileRow;
use tally_types::api::Claims;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;

/// Validate the bearer JWT and stash its claims in request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// The caller's profile. Requires `require_auth` to have run.
pub struct CurrentProfile(pub ProfileRow);

impl FromRequestParts<AppState> for CurrentProfile {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Claims>()
            .map(|claims| claims.sub)
            .ok_or(ApiError::Unauthorized)?;

        let profile = db_call(state, move |db| db.get_profile(user_id))
            .await?
            .ok_or(ApiError::ProfileMissing)?;

        Ok(Self(profile))
    }
}

/// The caller's profile, guaranteed to hold the admin role. Every
/// admin-only handler takes this instead of checking the role itself.
pub struct AdminProfile(pub ProfileRow);

impl FromRequestParts<AppState> for AdminProfile {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentProfile(profile) = CurrentProfile::from_request_parts(parts, state)
            .await
            .map_err(|e| match e {
                // an identity without a profile cannot be an admin
                ApiError::ProfileMissing => ApiError::Forbidden("Admin access required"),
                other => other,
            })?;

        if !profile.is_admin() {
            return Err(ApiError::Forbidden("Admin access required"));
        }
        Ok(Self(profile))
    }
}
