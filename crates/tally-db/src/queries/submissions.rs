use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params, params_from_iter};
use tally_types::models::SubmissionStatus;
use uuid::Uuid;

use super::{OptionalExt, audit, counts, parse_col};
use crate::Database;
use crate::models::{CountSnapshot, NewAuditEntry, NewSubmission, StatusChange, SubmissionRow};

const SUBMISSION_COLUMNS: &str = "id, user_id, title, description, link_type, youtube_url, drive_url, status,
     youtube_video_id, youtube_title, youtube_description, youtube_thumbnail, youtube_published_at,
     youtube_view_count, youtube_like_count, youtube_comment_count,
     submitted_at, edited_at, uploaded_at, published_at, rejected_at";

#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    /// Case-insensitive substring match on title or YouTube URL.
    pub search: Option<String>,
    /// `None` returns every match.
    pub page: Option<Page>,
}

/// Zero-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    fn offset(&self) -> i64 {
        i64::from(self.number) * i64::from(self.size)
    }
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    /// Insert a submission and bump its owner's counters in one transaction.
    ///
    /// The counters are bumped with an in-place `SET x = x + 1`, so two
    /// concurrent submissions by the same user can never lose an increment.
    /// Returns `None` (and writes nothing) when the owner has no profile.
    pub fn create_submission(&self, new: &NewSubmission) -> Result<Option<SubmissionRow>> {
        let published = i64::from(new.status == SubmissionStatus::Published);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let bumped = tx.execute(
                "UPDATE profiles
                 SET total_submissions = total_submissions + 1,
                     total_published = total_published + ?2,
                     updated_at = ?3
                 WHERE id = ?1",
                params![new.user_id.to_string(), published, Utc::now()],
            )?;
            if bumped == 0 {
                return Ok(None);
            }

            tx.execute(
                &format!(
                    "INSERT INTO submissions ({SUBMISSION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                             ?17, NULL, NULL, ?18, NULL)"
                ),
                params![
                    new.id.to_string(),
                    new.user_id.to_string(),
                    new.title,
                    new.description,
                    new.link_type.as_str(),
                    new.youtube_url,
                    new.drive_url,
                    new.status.as_str(),
                    new.youtube_video_id,
                    new.youtube_title,
                    new.youtube_description,
                    new.youtube_thumbnail,
                    new.youtube_published_at,
                    new.youtube_view_count,
                    new.youtube_like_count,
                    new.youtube_comment_count,
                    new.submitted_at,
                    new.published_at,
                ],
            )?;

            let row = query_submission(&tx, new.id)?
                .ok_or_else(|| anyhow!("Submission {} missing after insert", new.id))?;
            tx.commit()?;
            Ok(Some(row))
        })
    }

    pub fn get_submission(&self, id: Uuid) -> Result<Option<SubmissionRow>> {
        self.with_conn(|conn| query_submission(conn, id))
    }

    /// Newest first.
    pub fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRow>> {
        self.with_conn(|conn| {
            let mut clauses = Vec::new();
            let mut values = Vec::new();
            if let Some(user_id) = filter.user_id {
                values.push(user_id.to_string());
                clauses.push(format!("user_id = ?{}", values.len()));
            }
            if let Some(status) = filter.status {
                values.push(status.as_str().to_string());
                clauses.push(format!("status = ?{}", values.len()));
            }
            if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                values.push(like_pattern(term));
                let n = values.len();
                clauses.push(format!(
                    "(title LIKE ?{n} ESCAPE '\\' OR youtube_url LIKE ?{n} ESCAPE '\\')"
                ));
            }
            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            let limit_sql = match filter.page {
                Some(page) => format!("LIMIT {} OFFSET {}", page.size, page.offset()),
                None => String::new(),
            };

            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions {where_sql}
                 ORDER BY submitted_at DESC, id
                 {limit_sql}"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), map_submission)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move a submission to `status`, stamping the matching timestamp column.
    ///
    /// Runs as one transaction: status update, owner's `total_published`
    /// adjustment, then the audit entry built by `audit_entry` from the row
    /// as it was before the update. Returns `None` if the submission is gone.
    pub fn set_submission_status<F>(
        &self,
        id: Uuid,
        status: SubmissionStatus,
        at: DateTime<Utc>,
        audit_entry: F,
    ) -> Result<Option<StatusChange>>
    where
        F: FnOnce(&SubmissionRow) -> NewAuditEntry,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(before) = query_submission(&tx, id)? else {
                return Ok(None);
            };

            match status.timestamp_column() {
                Some(column) => tx.execute(
                    &format!("UPDATE submissions SET status = ?1, {column} = ?2 WHERE id = ?3"),
                    params![status.as_str(), at, id.to_string()],
                )?,
                None => tx.execute(
                    "UPDATE submissions SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id.to_string()],
                )?,
            };

            let delta = published_delta(before.status, status);
            if delta != 0 {
                tx.execute(
                    "UPDATE profiles
                     SET total_published = MAX(total_published + ?1, 0), updated_at = ?2
                     WHERE id = ?3",
                    params![delta, Utc::now(), before.user_id.to_string()],
                )?;
            }

            audit::append(&tx, &audit_entry(&before))?;

            let submission = query_submission(&tx, id)?
                .ok_or_else(|| anyhow!("Submission {} missing after status update", id))?;
            tx.commit()?;

            Ok(Some(StatusChange {
                previous: before.status,
                submission,
            }))
        })
    }

    /// Delete a submission and re-derive its owner's counters from what is
    /// left. `audit_entry`, when given, is appended in the same transaction.
    pub fn delete_submission(
        &self,
        id: Uuid,
        audit_entry: Option<NewAuditEntry>,
    ) -> Result<Option<(SubmissionRow, CountSnapshot)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(row) = query_submission(&tx, id)? else {
                return Ok(None);
            };

            tx.execute("DELETE FROM submissions WHERE id = ?1", [id.to_string()])?;
            if let Some(entry) = &audit_entry {
                audit::append(&tx, entry)?;
            }

            let snapshot = counts::reconcile_in(&tx, row.user_id)?
                .ok_or_else(|| anyhow!("Owner {} of submission {} has no profile", row.user_id, id))?;
            tx.commit()?;

            Ok(Some((row, snapshot)))
        })
    }
}

/// How much `total_published` moves when a submission goes from `from` to `to`.
fn published_delta(from: SubmissionStatus, to: SubmissionStatus) -> i64 {
    match (from == SubmissionStatus::Published, to == SubmissionStatus::Published) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

pub(crate) fn query_submission(conn: &Connection, id: Uuid) -> Result<Option<SubmissionRow>> {
    conn.query_row(
        &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?1"),
        [id.to_string()],
        map_submission,
    )
    .optional()
}

fn map_submission(row: &Row<'_>) -> rusqlite::Result<SubmissionRow> {
    Ok(SubmissionRow {
        id: parse_col(row, 0)?,
        user_id: parse_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        link_type: parse_col(row, 4)?,
        youtube_url: row.get(5)?,
        drive_url: row.get(6)?,
        status: parse_col(row, 7)?,
        youtube_video_id: row.get(8)?,
        youtube_title: row.get(9)?,
        youtube_description: row.get(10)?,
        youtube_thumbnail: row.get(11)?,
        youtube_published_at: row.get(12)?,
        youtube_view_count: row.get(13)?,
        youtube_like_count: row.get(14)?,
        youtube_comment_count: row.get(15)?,
        submitted_at: row.get(16)?,
        edited_at: row.get(17)?,
        uploaded_at: row.get(18)?,
        published_at: row.get(19)?,
        rejected_at: row.get(20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{add_profile, new_submission, open_db};
    use serde_json::json;

    fn entry(admin: Uuid, before: &SubmissionRow, to: SubmissionStatus) -> NewAuditEntry {
        NewAuditEntry {
            admin_id: admin,
            action: format!("status_update_{to}"),
            target_type: "submission",
            target_id: before.id.to_string(),
            old_values: json!({ "status": before.status }),
            new_values: json!({ "status": to }),
        }
    }

    #[test]
    fn published_creation_bumps_both_counters() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");

        let row = db
            .create_submission(&new_submission(user, SubmissionStatus::Published))
            .unwrap()
            .unwrap();
        assert_eq!(row.status, SubmissionStatus::Published);
        assert!(row.published_at.is_some());

        let profile = db.get_profile(user).unwrap().unwrap();
        assert_eq!(profile.total_submissions, 1);
        assert_eq!(profile.total_published, 1);
    }

    #[test]
    fn draft_creation_bumps_only_submissions() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");

        db.create_submission(&new_submission(user, SubmissionStatus::Draft))
            .unwrap()
            .unwrap();

        let profile = db.get_profile(user).unwrap().unwrap();
        assert_eq!(profile.total_submissions, 1);
        assert_eq!(profile.total_published, 0);
    }

    #[test]
    fn creation_without_profile_writes_nothing() {
        let (_dir, db) = open_db();
        let ghost = Uuid::new_v4();

        let created = db
            .create_submission(&new_submission(ghost, SubmissionStatus::Draft))
            .unwrap();
        assert!(created.is_none());
        assert!(db.list_submissions(&SubmissionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn failed_insert_rolls_back_counter_bump() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");
        let mut new = new_submission(user, SubmissionStatus::Draft);
        new.title = String::new(); // violates CHECK (length(title) > 0)

        assert!(db.create_submission(&new).is_err());
        let profile = db.get_profile(user).unwrap().unwrap();
        assert_eq!(profile.total_submissions, 0);
    }

    #[test]
    fn status_change_keeps_earlier_timestamps() {
        let (_dir, db) = open_db();
        let admin = add_profile(&db, "admin@example.com");
        let user = add_profile(&db, "a@example.com");
        let row = db
            .create_submission(&new_submission(user, SubmissionStatus::Draft))
            .unwrap()
            .unwrap();

        let uploaded_at = Utc::now();
        let change = db
            .set_submission_status(row.id, SubmissionStatus::Uploaded, uploaded_at, |b| {
                entry(admin, b, SubmissionStatus::Uploaded)
            })
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, SubmissionStatus::Draft);
        assert_eq!(change.submission.uploaded_at, Some(uploaded_at));

        let change = db
            .set_submission_status(row.id, SubmissionStatus::Rejected, Utc::now(), |b| {
                entry(admin, b, SubmissionStatus::Rejected)
            })
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, SubmissionStatus::Uploaded);
        assert_eq!(change.submission.uploaded_at, Some(uploaded_at));
        assert!(change.submission.rejected_at.is_some());
        assert!(change.submission.published_at.is_none());

        assert_eq!(db.list_audit_logs(10).unwrap().len(), 2);
    }

    #[test]
    fn publish_counts_once_and_unpublish_gives_it_back() {
        let (_dir, db) = open_db();
        let admin = add_profile(&db, "admin@example.com");
        let user = add_profile(&db, "a@example.com");
        let row = db
            .create_submission(&new_submission(user, SubmissionStatus::Draft))
            .unwrap()
            .unwrap();

        for _ in 0..2 {
            db.set_submission_status(row.id, SubmissionStatus::Published, Utc::now(), |b| {
                entry(admin, b, SubmissionStatus::Published)
            })
            .unwrap()
            .unwrap();
        }
        assert_eq!(db.get_profile(user).unwrap().unwrap().total_published, 1);

        db.set_submission_status(row.id, SubmissionStatus::Rejected, Utc::now(), |b| {
            entry(admin, b, SubmissionStatus::Rejected)
        })
        .unwrap()
        .unwrap();
        assert_eq!(db.get_profile(user).unwrap().unwrap().total_published, 0);
    }

    #[test]
    fn status_change_on_missing_submission_writes_no_audit() {
        let (_dir, db) = open_db();
        let admin = add_profile(&db, "admin@example.com");

        let change = db
            .set_submission_status(Uuid::new_v4(), SubmissionStatus::Published, Utc::now(), |b| {
                entry(admin, b, SubmissionStatus::Published)
            })
            .unwrap();
        assert!(change.is_none());
        assert!(db.list_audit_logs(10).unwrap().is_empty());
    }

    #[test]
    fn delete_reconciles_owner() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");
        let keep = db
            .create_submission(&new_submission(user, SubmissionStatus::Published))
            .unwrap()
            .unwrap();
        let gone = db
            .create_submission(&new_submission(user, SubmissionStatus::Published))
            .unwrap()
            .unwrap();

        let (deleted, snapshot) = db.delete_submission(gone.id, None).unwrap().unwrap();
        assert_eq!(deleted.id, gone.id);
        assert_eq!(snapshot.stored_submissions, 2);
        assert_eq!(snapshot.actual_submissions, 1);

        let profile = db.get_profile(user).unwrap().unwrap();
        assert_eq!(profile.total_submissions, 1);
        assert_eq!(profile.total_published, 1);
        assert!(db.get_submission(keep.id).unwrap().is_some());
        assert!(db.get_submission(gone.id).unwrap().is_none());
    }

    #[test]
    fn list_filters_by_owner_and_status() {
        let (_dir, db) = open_db();
        let a = add_profile(&db, "a@example.com");
        let b = add_profile(&db, "b@example.com");
        db.create_submission(&new_submission(a, SubmissionStatus::Draft)).unwrap();
        db.create_submission(&new_submission(a, SubmissionStatus::Published)).unwrap();
        db.create_submission(&new_submission(b, SubmissionStatus::Draft)).unwrap();

        let mine = db
            .list_submissions(&SubmissionFilter { user_id: Some(a), ..Default::default() })
            .unwrap();
        assert_eq!(mine.len(), 2);

        let drafts = db
            .list_submissions(&SubmissionFilter {
                status: Some(SubmissionStatus::Draft),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|s| s.status == SubmissionStatus::Draft));
    }

    #[test]
    fn search_matches_title_or_url_case_insensitively() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");

        let mut recap = new_submission(user, SubmissionStatus::Published);
        recap.title = "Summer Recap".into();
        let mut tour = new_submission(user, SubmissionStatus::Published);
        tour.title = "Studio tour".into();
        tour.youtube_url = Some("https://youtu.be/recapVid01a".into());
        let mut other = new_submission(user, SubmissionStatus::Draft);
        other.title = "100% raw".into();
        for new in [&recap, &tour, &other] {
            db.create_submission(new).unwrap().unwrap();
        }

        let search = |term: &str| {
            db.list_submissions(&SubmissionFilter {
                search: Some(term.into()),
                ..Default::default()
            })
            .unwrap()
            .len()
        };
        assert_eq!(search("RECAP"), 2);
        assert_eq!(search("tour"), 1);
        // wildcards in the term match literally
        assert_eq!(search("%"), 1);
        assert_eq!(search("_"), 0);
        assert_eq!(search("   "), 3);
    }

    #[test]
    fn pages_are_zero_based_and_newest_first() {
        let (_dir, db) = open_db();
        let user = add_profile(&db, "a@example.com");
        let base = Utc::now();
        for i in 0..5 {
            let mut new = new_submission(user, SubmissionStatus::Draft);
            new.title = format!("Episode {i}");
            new.submitted_at = base + chrono::Duration::minutes(i);
            db.create_submission(&new).unwrap().unwrap();
        }

        let page = |number| {
            db.list_submissions(&SubmissionFilter {
                page: Some(Page { number, size: 2 }),
                ..Default::default()
            })
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect::<Vec<_>>()
        };
        assert_eq!(page(0), vec!["Episode 4", "Episode 3"]);
        assert_eq!(page(2), vec!["Episode 0"]);
        assert!(page(3).is_empty());
    }
}
