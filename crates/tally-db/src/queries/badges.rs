use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use uuid::Uuid;

use crate::Database;
use crate::models::{BadgeRow, EarnedBadgeRow};

const BADGE_COLUMNS: &str = "b.id, b.name, b.description, b.threshold, b.icon, b.color";

impl Database {
    pub fn list_badges(&self) -> Result<Vec<BadgeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BADGE_COLUMNS} FROM badges b ORDER BY b.threshold, b.id"
            ))?;
            let rows = stmt
                .query_map([], map_badge)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Badges whose threshold is at most `count`.
    pub fn badges_within(&self, count: i64) -> Result<Vec<BadgeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BADGE_COLUMNS} FROM badges b WHERE b.threshold <= ?1 ORDER BY b.threshold, b.id"
            ))?;
            let rows = stmt
                .query_map([count], map_badge)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn granted_badge_ids(&self, user_id: Uuid) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Grant a badge. The (user, badge) unique constraint turns a repeat
    /// grant into a no-op; returns whether a row was actually inserted.
    pub fn grant_badge(&self, user_id: Uuid, badge_id: &str, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at) VALUES (?1, ?2, ?3)",
                params![user_id.to_string(), badge_id, at],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<EarnedBadgeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BADGE_COLUMNS}, ub.earned_at
                 FROM user_badges ub
                 JOIN badges b ON b.id = ub.badge_id
                 WHERE ub.user_id = ?1
                 ORDER BY b.threshold, b.id"
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(EarnedBadgeRow {
                        badge: map_badge(row)?,
                        earned_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_badge(row: &Row<'_>) -> rusqlite::Result<BadgeRow> {
    Ok(BadgeRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        threshold: row.get(3)?,
        icon: row.get(4)?,
        color: row.get(5)?,
    })
}
