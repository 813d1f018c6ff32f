use std::collections::HashSet;
use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use tally_db::Database;
use tally_types::api::Claims;
use tally_types::models::Profile;

use crate::db_call;
use crate::error::ApiResult;
use crate::youtube::YouTubeClient;

pub type AppState = Arc<AppStateInner>;

/// Decides at sign-in whether an email is granted the admin role.
pub type AdminPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub youtube: YouTubeClient,
    pub is_admin_email: AdminPredicate,
}

/// Emails that are made admin when they sign in. Matching is
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    /// Parse a comma-separated list, ignoring blanks.
    pub fn parse(raw: &str) -> Self {
        let emails = raw
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn into_predicate(self) -> AdminPredicate {
        Arc::new(move |email| self.contains(email))
    }
}

/// POST /auth/session, called once the identity provider has signed the
/// user in. Creates the profile on first sight and refreshes it afterwards.
pub async fn sign_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Profile>> {
    let make_admin = (state.is_admin_email)(&claims.email);

    let profile = db_call(&state, move |db| {
        db.upsert_profile(claims.sub, &claims.email, claims.name.as_deref(), make_admin)
    })
    .await?;

    info!(
        "Profile {} signed in as {}",
        profile.id,
        profile.role.as_str()
    );
    Ok(Json(profile.into()))
}

/// Mint a token the way the identity provider does. Used by tests and
/// local tooling.
pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    name: Option<&str>,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.map(str::to_string),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
