use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use super::{OptionalExt, parse_col};
use crate::Database;
use crate::models::CountSnapshot;

impl Database {
    /// Stored vs. derived counters for every profile, in one read.
    pub fn count_snapshots(&self) -> Result<Vec<CountSnapshot>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.full_name, p.total_submissions, p.total_published,
                        COUNT(s.id),
                        COALESCE(SUM(s.status = 'published'), 0)
                 FROM profiles p
                 LEFT JOIN submissions s ON s.user_id = p.id
                 GROUP BY p.id
                 ORDER BY p.created_at, p.id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CountSnapshot {
                        user_id: parse_col(row, 0)?,
                        full_name: row.get(1)?,
                        stored_submissions: row.get(2)?,
                        stored_published: row.get(3)?,
                        actual_submissions: row.get(4)?,
                        actual_published: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite a profile's counters with the counts derived from its
    /// submissions if either has drifted. The returned snapshot holds the
    /// values as they were before the repair. `None` if there is no profile.
    pub fn reconcile_profile(&self, user_id: Uuid) -> Result<Option<CountSnapshot>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let snapshot = reconcile_in(&tx, user_id)?;
            tx.commit()?;
            Ok(snapshot)
        })
    }
}

pub(crate) fn reconcile_in(conn: &Connection, user_id: Uuid) -> Result<Option<CountSnapshot>> {
    let Some(snapshot) = snapshot(conn, user_id)? else {
        return Ok(None);
    };

    if !snapshot.is_consistent() {
        conn.execute(
            "UPDATE profiles
             SET total_submissions = ?2, total_published = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                user_id.to_string(),
                snapshot.actual_submissions,
                snapshot.actual_published,
                Utc::now(),
            ],
        )?;
    }

    Ok(Some(snapshot))
}

fn snapshot(conn: &Connection, user_id: Uuid) -> Result<Option<CountSnapshot>> {
    conn.query_row(
        "SELECT p.id, p.full_name, p.total_submissions, p.total_published,
                (SELECT COUNT(*) FROM submissions s WHERE s.user_id = p.id),
                (SELECT COUNT(*) FROM submissions s WHERE s.user_id = p.id AND s.status = 'published')
         FROM profiles p
         WHERE p.id = ?1",
        [user_id.to_string()],
        |row| {
            Ok(CountSnapshot {
                user_id: parse_col(row, 0)?,
                full_name: row.get(1)?,
                stored_submissions: row.get(2)?,
                stored_published: row.get(3)?,
                actual_submissions: row.get(4)?,
                actual_published: row.get(5)?,
            })
        },
    )
    .optional()
}
