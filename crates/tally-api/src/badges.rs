use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tally_db::models::BadgeRow;

use crate::auth::AppState;
use crate::db_call;

/// Grant every badge the user now qualifies for and has not yet earned.
///
/// Never fails: errors are logged and an empty list is returned, so a badge
/// problem cannot undo the submission that triggered the evaluation.
/// Concurrent evaluations for the same user are safe because a repeat
/// grant is ignored by the (user, badge) unique constraint.
pub async fn evaluate_and_grant(state: &AppState, user_id: Uuid) -> Vec<BadgeRow> {
    match db_call(state, move |db| grant_qualifying(db, user_id)).await {
        Ok(granted) => {
            for badge in &granted {
                info!("User {} earned badge '{}'", user_id, badge.name);
            }
            granted
        }
        Err(e) => {
            warn!("Badge evaluation for {} failed: {}", user_id, e);
            Vec::new()
        }
    }
}

fn grant_qualifying(db: &tally_db::Database, user_id: Uuid) -> anyhow::Result<Vec<BadgeRow>> {
    let Some(profile) = db.get_profile(user_id)? else {
        return Ok(Vec::new());
    };

    let qualifying = db.badges_within(profile.total_submissions)?;
    let earned = db.granted_badge_ids(user_id)?;

    let now = Utc::now();
    let mut granted = Vec::new();
    for badge in qualifying.into_iter().filter(|b| !earned.contains(&b.id)) {
        // Another evaluation may have won the race since `earned` was read.
        if db.grant_badge(user_id, &badge.id, now)? {
            granted.push(badge);
        }
    }
    Ok(granted)
}
