use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, Row, params};
use tally_types::models::Role;
use uuid::Uuid;

use super::{OptionalExt, audit, parse_col};
use crate::Database;
use crate::models::{LeaderboardRow, NewAuditEntry, ProfileRow};

const PROFILE_COLUMNS: &str =
    "id, email, full_name, role, total_submissions, total_published, created_at, updated_at";

impl Database {
    /// Sign-in upsert. New profiles start as editors unless `make_admin` is
    /// set; an existing profile's role is only ever promoted here. A display
    /// name already on the profile wins over the one in the token.
    pub fn upsert_profile(
        &self,
        id: Uuid,
        email: &str,
        full_name: Option<&str>,
        make_admin: bool,
    ) -> Result<ProfileRow> {
        let now = Utc::now();
        let role = if make_admin { Role::Admin } else { Role::Editor };
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, email, full_name, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     email = excluded.email,
                     full_name = COALESCE(profiles.full_name, excluded.full_name),
                     role = CASE WHEN ?6 THEN 'admin' ELSE profiles.role END,
                     updated_at = excluded.updated_at",
                params![id.to_string(), email, full_name, role.as_str(), now, make_admin],
            )?;
            query_profile(conn, id)?.ok_or_else(|| anyhow!("Profile {} missing after upsert", id))
        })
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at, id"
            ))?;
            let rows = stmt
                .query_map([], map_profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Set the caller-chosen display name. `None` if there is no profile.
    pub fn update_full_name(&self, id: Uuid, full_name: &str) -> Result<Option<ProfileRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET full_name = ?1, updated_at = ?2 WHERE id = ?3",
                params![full_name, Utc::now(), id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_profile(conn, id)
        })
    }

    /// Change a user's role and append the audit entry built by
    /// `audit_entry` (from the profile before the change) in the same
    /// transaction. Returns `None` when the user does not exist.
    pub fn update_role<F>(
        &self,
        user_id: Uuid,
        role: Role,
        audit_entry: F,
    ) -> Result<Option<(Role, ProfileRow)>>
    where
        F: FnOnce(&ProfileRow) -> NewAuditEntry,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(before) = query_profile(&tx, user_id)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE profiles SET role = ?1, updated_at = ?2 WHERE id = ?3",
                params![role.as_str(), Utc::now(), user_id.to_string()],
            )?;

            audit::append(&tx, &audit_entry(&before))?;

            let after = query_profile(&tx, user_id)?
                .ok_or_else(|| anyhow!("Profile {} missing after role update", user_id))?;
            tx.commit()?;

            Ok(Some((before.role, after)))
        })
    }

    /// Profiles ordered by submissions, then published count.
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.full_name, p.total_submissions, p.total_published,
                        (SELECT COUNT(*) FROM user_badges ub WHERE ub.user_id = p.id)
                 FROM profiles p
                 ORDER BY p.total_submissions DESC, p.total_published DESC, p.created_at ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(LeaderboardRow {
                        user_id: parse_col(row, 0)?,
                        full_name: row.get(1)?,
                        total_submissions: row.get(2)?,
                        total_published: row.get(3)?,
                        badge_count: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_profile(conn: &Connection, id: Uuid) -> Result<Option<ProfileRow>> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        [id.to_string()],
        map_profile,
    )
    .optional()
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: parse_col(row, 0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_col(row, 3)?,
        total_submissions: row.get(4)?,
        total_published: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{add_profile, open_db};
    use serde_json::json;

    fn role_entry(admin: Uuid, before: &ProfileRow, role: Role) -> NewAuditEntry {
        NewAuditEntry {
            admin_id: admin,
            action: "role_update".into(),
            target_type: "user",
            target_id: before.id.to_string(),
            old_values: json!({ "role": before.role }),
            new_values: json!({ "role": role }),
        }
    }

    #[test]
    fn upsert_creates_editor_then_refreshes_email() {
        let (_dir, db) = open_db();
        let id = Uuid::new_v4();

        let created = db.upsert_profile(id, "old@example.com", Some("Ana"), false).unwrap();
        assert_eq!(created.role, Role::Editor);
        assert_eq!(created.total_submissions, 0);

        let updated = db.upsert_profile(id, "new@example.com", None, false).unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.full_name.as_deref(), Some("Ana"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn edited_name_survives_the_next_sign_in() {
        let (_dir, db) = open_db();
        let id = Uuid::new_v4();
        db.upsert_profile(id, "ana@example.com", None, false).unwrap();

        let named = db.upsert_profile(id, "ana@example.com", Some("Ana"), false).unwrap();
        assert_eq!(named.full_name.as_deref(), Some("Ana"));

        let edited = db.update_full_name(id, "Ana Lima").unwrap().unwrap();
        assert_eq!(edited.full_name.as_deref(), Some("Ana Lima"));

        let again = db.upsert_profile(id, "ana@example.com", Some("Ana"), false).unwrap();
        assert_eq!(again.full_name.as_deref(), Some("Ana Lima"));

        assert!(db.update_full_name(Uuid::new_v4(), "Nobody").unwrap().is_none());
    }

    #[test]
    fn upsert_promotes_but_never_demotes() {
        let (_dir, db) = open_db();
        let id = Uuid::new_v4();

        db.upsert_profile(id, "boss@example.com", None, false).unwrap();
        let promoted = db.upsert_profile(id, "boss@example.com", None, true).unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let again = db.upsert_profile(id, "boss@example.com", None, false).unwrap();
        assert_eq!(again.role, Role::Admin);
    }

    #[test]
    fn role_update_writes_audit_entry() {
        let (_dir, db) = open_db();
        let admin = add_profile(&db, "admin@example.com");
        let user = add_profile(&db, "user@example.com");

        let (old, after) = db
            .update_role(user, Role::Admin, |b| role_entry(admin, b, Role::Admin))
            .unwrap()
            .unwrap();
        assert_eq!(old, Role::Editor);
        assert_eq!(after.role, Role::Admin);

        let logs = db.list_audit_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "role_update");
        assert_eq!(logs[0].old_values, Some(json!({ "role": "editor" })));
        assert_eq!(logs[0].new_values, Some(json!({ "role": "admin" })));
    }

    #[test]
    fn role_update_for_missing_user_is_none() {
        let (_dir, db) = open_db();
        let admin = add_profile(&db, "admin@example.com");
        let missing = db
            .update_role(Uuid::new_v4(), Role::Admin, |b| role_entry(admin, b, Role::Admin))
            .unwrap();
        assert!(missing.is_none());
        assert!(db.list_audit_logs(10).unwrap().is_empty());
    }
}
