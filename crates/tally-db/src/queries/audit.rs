use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};

use super::parse_col;
use crate::Database;
use crate::models::{AuditLogRow, NewAuditEntry};

/// Append an audit entry on `conn`. Callers that pair the entry with a
/// mutation pass their open transaction so both commit together.
pub fn append(conn: &Connection, entry: &NewAuditEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_logs (admin_id, action, target_type, target_id, old_values, new_values, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.admin_id.to_string(),
            entry.action,
            entry.target_type,
            entry.target_id,
            entry.old_values,
            entry.new_values,
            Utc::now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Newest entries first.
    pub fn list_audit_logs(&self, limit: u32) -> Result<Vec<AuditLogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, admin_id, action, target_type, target_id, old_values, new_values, created_at
                 FROM audit_logs
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(AuditLogRow {
                        id: row.get(0)?,
                        admin_id: parse_col(row, 1)?,
                        action: row.get(2)?,
                        target_type: row.get(3)?,
                        target_id: row.get(4)?,
                        old_values: row.get(5)?,
                        new_values: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
