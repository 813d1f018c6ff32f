//! Counter reconciliation: re-derives `total_submissions` and
//! `total_published` from the submissions table and repairs drift.
//!
//! Runs per user in its own transaction. A write landing between two
//! users' repairs is picked up by the next run.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use tally_db::models::CountSnapshot;
use tally_types::api::{
    CountComparison, CountReport, DebugCountsResponse, DebugSummary, ReconcileResult,
};

use crate::auth::AppState;
use crate::db_call;
use crate::error::{ApiError, ApiResult};

pub fn comparison(snapshot: &CountSnapshot) -> CountComparison {
    CountComparison {
        stored_total_submissions: snapshot.stored_submissions,
        stored_total_published: snapshot.stored_published,
        actual_total_submissions: snapshot.actual_submissions,
        actual_total_published: snapshot.actual_published,
        submissions_match: snapshot.submissions_match(),
        published_match: snapshot.published_match(),
    }
}

fn reconciled(snapshot: CountSnapshot) -> ReconcileResult {
    ReconcileResult {
        user_id: snapshot.user_id,
        counts: Some(comparison(&snapshot)),
        repaired: !snapshot.is_consistent(),
        full_name: snapshot.full_name,
        error: None,
    }
}

/// Reconcile one user, or every user when `user_id` is `None`.
///
/// A failure for one user is recorded in that user's result and the batch
/// carries on. An unknown single user is `NotFound`.
pub async fn reconcile(state: &AppState, user_id: Option<Uuid>) -> ApiResult<Vec<ReconcileResult>> {
    if let Some(user_id) = user_id {
        let snapshot = db_call(state, move |db| db.reconcile_profile(user_id))
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        return Ok(vec![reconciled(snapshot)]);
    }

    let profiles = db_call(state, |db| db.list_profiles()).await?;
    let mut results = Vec::with_capacity(profiles.len());

    for profile in profiles {
        let id = profile.id;
        let outcome = db_call(state, move |db| db.reconcile_profile(id)).await;
        let result = match outcome {
            Ok(Some(snapshot)) => reconciled(snapshot),
            Ok(None) => failed(id, profile.full_name, "Profile disappeared during reconciliation"),
            Err(e) => {
                warn!("Reconciling counters for {} failed: {}", id, e);
                failed(id, profile.full_name, &e.to_string())
            }
        };
        results.push(result);
    }

    Ok(results)
}

fn failed(user_id: Uuid, full_name: Option<String>, error: &str) -> ReconcileResult {
    ReconcileResult {
        user_id,
        full_name,
        counts: None,
        repaired: false,
        error: Some(error.to_string()),
    }
}

pub fn summary_message(results: &[ReconcileResult]) -> String {
    let repaired = results.iter().filter(|r| r.repaired).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let mut message = format!(
        "Reconciled {} profile(s), repaired {}",
        results.len(),
        repaired
    );
    if failed > 0 {
        message.push_str(&format!(", {failed} failed"));
    }
    message
}

/// Read-only comparison of stored and derived counters for every user.
pub async fn debug_counts(state: &AppState) -> ApiResult<DebugCountsResponse> {
    let snapshots = db_call(state, |db| db.count_snapshots()).await?;

    let summary = DebugSummary {
        total_users: snapshots.len(),
        users_with_mismatched_submissions: snapshots.iter().filter(|s| !s.submissions_match()).count(),
        users_with_mismatched_published: snapshots.iter().filter(|s| !s.published_match()).count(),
    };
    let debug_data = snapshots
        .into_iter()
        .map(|s| CountReport {
            user_id: s.user_id,
            counts: comparison(&s),
            full_name: s.full_name,
        })
        .collect();

    Ok(DebugCountsResponse { debug_data, summary })
}

/// Periodically repair every profile's counters. An interval of zero
/// disables the task.
pub async fn run_reconcile_loop(state: AppState, interval_secs: u64) {
    if interval_secs == 0 {
        info!("Scheduled counter reconciliation disabled");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // the first tick fires immediately; skip it so startup stays quick
    interval.tick().await;

    loop {
        interval.tick().await;

        match reconcile(&state, None).await {
            Ok(results) => {
                let repaired = results.iter().filter(|r| r.repaired).count();
                if repaired > 0 {
                    info!("Scheduled reconciliation repaired {} profile(s)", repaired);
                } else {
                    debug!("Scheduled reconciliation found no drift in {} profile(s)", results.len());
                }
            }
            Err(e) => warn!("Scheduled reconciliation failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_state, seed_profile, set_counters};
    use tally_db::models::NewSubmission;
    use tally_types::models::{LinkType, SubmissionStatus};

    fn seed_submissions(state: &AppState, owner: Uuid, total: usize, published: usize) {
        for i in 0..total {
            let status = if i < published {
                SubmissionStatus::Published
            } else {
                SubmissionStatus::Draft
            };
            let now = chrono::Utc::now();
            let new = NewSubmission {
                id: Uuid::new_v4(),
                user_id: owner,
                title: format!("Episode {i}"),
                description: None,
                link_type: LinkType::Drive,
                youtube_url: None,
                drive_url: Some("https://drive.google.com/file/d/ep".into()),
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
            state.db.create_submission(&new).unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn repairs_drifted_counters_and_reports_before_values() {
        let (_dir, state) = make_state();
        let user = seed_profile(&state, "a@example.com", false);
        seed_submissions(&state, user, 7, 2);
        set_counters(&state, user, 10, 2);

        let results = reconcile(&state, Some(user)).await.unwrap();
        assert_eq!(results.len(), 1);
        let counts = results[0].counts.as_ref().unwrap();
        assert_eq!(counts.stored_total_submissions, 10);
        assert_eq!(counts.actual_total_submissions, 7);
        assert!(!counts.submissions_match);
        assert!(counts.published_match);
        assert!(results[0].repaired);

        let profile = state.db.get_profile(user).unwrap().unwrap();
        assert_eq!(profile.total_submissions, 7);
        assert_eq!(profile.total_published, 2);
    }

    #[tokio::test]
    async fn second_run_finds_nothing_to_repair() {
        let (_dir, state) = make_state();
        let a = seed_profile(&state, "a@example.com", false);
        let b = seed_profile(&state, "b@example.com", false);
        seed_submissions(&state, a, 3, 1);
        set_counters(&state, a, 0, 0);
        set_counters(&state, b, 4, 4);

        let first = reconcile(&state, None).await.unwrap();
        assert_eq!(first.iter().filter(|r| r.repaired).count(), 2);

        let second = reconcile(&state, None).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|r| !r.repaired && r.error.is_none()));
        assert_eq!(summary_message(&second), "Reconciled 2 profile(s), repaired 0");
    }

    #[tokio::test]
    async fn unknown_single_user_is_not_found() {
        let (_dir, state) = make_state();
        let err = reconcile(&state, Some(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound("User")));
    }

    #[tokio::test]
    async fn debug_counts_summarises_mismatches_without_repairing() {
        let (_dir, state) = make_state();
        let a = seed_profile(&state, "a@example.com", false);
        let b = seed_profile(&state, "b@example.com", false);
        seed_submissions(&state, a, 2, 1);
        set_counters(&state, a, 5, 1);
        set_counters(&state, b, 0, 3);

        let report = debug_counts(&state).await.unwrap();
        assert_eq!(report.summary.total_users, 2);
        assert_eq!(report.summary.users_with_mismatched_submissions, 1);
        assert_eq!(report.summary.users_with_mismatched_published, 1);

        // read-only
        assert_eq!(state.db.get_profile(a).unwrap().unwrap().total_submissions, 5);
    }

    #[test]
    fn message_mentions_failures_only_when_present() {
        let ok = reconciled(CountSnapshot {
            user_id: Uuid::new_v4(),
            full_name: None,
            stored_submissions: 1,
            stored_published: 0,
            actual_submissions: 2,
            actual_published: 0,
        });
        let bad = failed(Uuid::new_v4(), None, "database is locked");
        assert_eq!(
            summary_message(&[ok, bad]),
            "Reconciled 2 profile(s), repaired 1, 1 failed"
        );
    }
}
