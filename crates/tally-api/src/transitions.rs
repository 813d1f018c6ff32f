use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use tally_db::models::{ProfileRow, SubmissionRow};
use tally_types::models::SubmissionStatus;

use crate::audit;
use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};

/// Admin review step: publish, reject or mark a submission uploaded.
///
/// Stamps only the timestamp belonging to `target`; earlier stamps stay.
/// The status write, the owner's published counter and the audit entry
/// commit together, so a failed update leaves no audit trail.
pub async fn transition(
    state: &AppState,
    actor: &ProfileRow,
    submission_id: Uuid,
    target: SubmissionStatus,
    at: Option<DateTime<Utc>>,
) -> ApiResult<SubmissionRow> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden("Admin access required"));
    }
    if !target.is_admin_target() {
        return Err(ApiError::invalid(
            "status",
            "Status must be one of published, rejected, uploaded",
        ));
    }

    let admin_id = actor.id;
    let at = at.unwrap_or_else(Utc::now);
    let change = db_call(state, move |db| {
        db.set_submission_status(submission_id, target, at, |before| {
            audit::status_update(admin_id, before, target)
        })
    })
    .await?
    .ok_or(ApiError::NotFound("Submission"))?;

    info!(
        "Admin {} moved submission {} from {} to {}",
        admin_id, submission_id, change.previous, target
    );

    Ok(change.submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_state, seed_profile};
    use chrono::Duration;
    use serde_json::json;
    use tally_db::models::NewSubmission;
    use tally_types::models::LinkType;

    fn seed_submission(state: &AppState, owner: Uuid, status: SubmissionStatus) -> SubmissionRow {
        let now = Utc::now();
        let new = NewSubmission {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Behind the scenes".into(),
            description: None,
            link_type: LinkType::Drive,
            youtube_url: None,
            drive_url: Some("https://drive.google.com/file/d/bts".into()),
            status,
            youtube_video_id: None,
            youtube_title: None,
            youtube_description: None,
            youtube_thumbnail: None,
            youtube_published_at: None,
            youtube_view_count: 0,
            youtube_like_count: 0,
            youtube_comment_count: 0,
            submitted_at: now,
            published_at: (status == SubmissionStatus::Published).then_some(now),
        };
        state.db.create_submission(&new).unwrap().unwrap()
    }

    fn profile(state: &AppState, id: Uuid) -> ProfileRow {
        state.db.get_profile(id).unwrap().unwrap()
    }

    #[tokio::test]
    async fn rejecting_a_draft_writes_one_audit_entry() {
        let (_dir, state) = make_state();
        let admin = profile(&state, seed_profile(&state, "admin@example.com", true));
        let owner = seed_profile(&state, "editor@example.com", false);
        let draft = seed_submission(&state, owner, SubmissionStatus::Draft);

        let rejected = transition(&state, &admin, draft.id, SubmissionStatus::Rejected, None)
            .await
            .unwrap();

        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert!(rejected.rejected_at.is_some());
        assert!(rejected.published_at.is_none());

        let logs = state.db.list_audit_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].admin_id, admin.id);
        assert_eq!(logs[0].action, "status_update_rejected");
        assert_eq!(logs[0].target_id, draft.id.to_string());
        assert_eq!(logs[0].old_values, Some(json!({ "status": "draft" })));
        assert_eq!(logs[0].new_values, Some(json!({ "status": "rejected" })));

        assert_eq!(profile(&state, owner).total_published, 0);
    }

    #[tokio::test]
    async fn publishing_counts_once() {
        let (_dir, state) = make_state();
        let admin = profile(&state, seed_profile(&state, "admin@example.com", true));
        let owner = seed_profile(&state, "editor@example.com", false);
        let draft = seed_submission(&state, owner, SubmissionStatus::Draft);

        transition(&state, &admin, draft.id, SubmissionStatus::Published, None)
            .await
            .unwrap();
        assert_eq!(profile(&state, owner).total_published, 1);

        // re-publishing an already published submission is not a new publish
        transition(&state, &admin, draft.id, SubmissionStatus::Published, None)
            .await
            .unwrap();
        assert_eq!(profile(&state, owner).total_published, 1);
        assert_eq!(state.db.list_audit_logs(10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn earlier_timestamps_survive_later_transitions() {
        let (_dir, state) = make_state();
        let admin = profile(&state, seed_profile(&state, "admin@example.com", true));
        let owner = seed_profile(&state, "editor@example.com", false);
        let draft = seed_submission(&state, owner, SubmissionStatus::Draft);

        let uploaded_at = Utc::now() - Duration::hours(2);
        let uploaded = transition(
            &state,
            &admin,
            draft.id,
            SubmissionStatus::Uploaded,
            Some(uploaded_at),
        )
        .await
        .unwrap();
        assert_eq!(uploaded.uploaded_at, Some(uploaded_at));

        let published = transition(&state, &admin, draft.id, SubmissionStatus::Published, None)
            .await
            .unwrap();
        assert_eq!(published.uploaded_at, Some(uploaded_at));
        assert!(published.published_at.is_some());

        let rejected = transition(&state, &admin, draft.id, SubmissionStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(rejected.uploaded_at, Some(uploaded_at));
        assert_eq!(rejected.published_at, published.published_at);
        assert!(rejected.rejected_at.is_some());
        assert_eq!(profile(&state, owner).total_published, 0);
    }

    #[tokio::test]
    async fn editors_cannot_transition() {
        let (_dir, state) = make_state();
        let editor = profile(&state, seed_profile(&state, "editor@example.com", false));
        let draft = seed_submission(&state, editor.id, SubmissionStatus::Draft);

        let err = transition(&state, &editor, draft.id, SubmissionStatus::Published, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(state.db.list_audit_logs(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn draft_and_edited_are_not_review_targets() {
        let (_dir, state) = make_state();
        let admin = profile(&state, seed_profile(&state, "admin@example.com", true));
        let draft = seed_submission(&state, admin.id, SubmissionStatus::Draft);

        for target in [SubmissionStatus::Draft, SubmissionStatus::Edited] {
            let err = transition(&state, &admin, draft.id, target, None).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn missing_submission_is_not_found_and_unaudited() {
        let (_dir, state) = make_state();
        let admin = profile(&state, seed_profile(&state, "admin@example.com", true));

        let err = transition(&state, &admin, Uuid::new_v4(), SubmissionStatus::Published, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Submission")));
        assert!(state.db.list_audit_logs(10).unwrap().is_empty());
    }
}
