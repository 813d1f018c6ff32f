use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use super::{OptionalExt, parse_col};
use crate::Database;
use crate::models::{CommentRow, NewComment};

const COMMENT_COLUMNS: &str =
    "c.id, c.submission_id, c.user_id, p.full_name, c.content, c.parent_id, c.created_at";

impl Database {
    /// Oldest first, so replies follow what they answer.
    pub fn list_comments(&self, submission_id: Uuid) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments c
                 LEFT JOIN profiles p ON p.id = c.user_id
                 WHERE c.submission_id = ?1
                 ORDER BY c.created_at, c.id"
            ))?;
            let rows = stmt
                .query_map([submission_id.to_string()], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn add_comment(&self, new: &NewComment) -> Result<CommentRow> {
        let now = Utc::now();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, submission_id, user_id, content, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    new.id.to_string(),
                    new.submission_id.to_string(),
                    new.user_id.to_string(),
                    new.content,
                    new.parent_id.map(|p| p.to_string()),
                    now,
                ],
            )?;
            query_comment(conn, new.id)?
                .ok_or_else(|| anyhow!("Comment {} missing after insert", new.id))
        })
    }
}

fn query_comment(conn: &Connection, id: Uuid) -> Result<Option<CommentRow>> {
    conn.query_row(
        &format!(
            "SELECT {COMMENT_COLUMNS}
             FROM comments c
             LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.id = ?1"
        ),
        [id.to_string()],
        map_comment,
    )
    .optional()
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    let parent_id = row
        .get::<_, Option<String>>(5)?
        .map(|raw| {
            raw.parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(CommentRow {
        id: parse_col(row, 0)?,
        submission_id: parse_col(row, 1)?,
        user_id: parse_col(row, 2)?,
        author_name: row.get(3)?,
        content: row.get(4)?,
        parent_id,
        created_at: row.get(6)?,
    })
}
