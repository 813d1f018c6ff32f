use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE profiles (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL,
                full_name           TEXT,
                role                TEXT NOT NULL DEFAULT 'editor'
                                    CHECK (role IN ('admin', 'editor')),
                total_submissions   INTEGER NOT NULL DEFAULT 0 CHECK (total_submissions >= 0),
                total_published     INTEGER NOT NULL DEFAULT 0 CHECK (total_published >= 0),
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE submissions (
                id                      TEXT PRIMARY KEY,
                user_id                 TEXT NOT NULL REFERENCES profiles(id),
                title                   TEXT NOT NULL CHECK (length(title) > 0),
                description             TEXT,
                link_type               TEXT NOT NULL CHECK (link_type IN ('youtube', 'drive')),
                youtube_url             TEXT,
                drive_url               TEXT,
                status                  TEXT NOT NULL
                                        CHECK (status IN ('draft', 'edited', 'uploaded', 'published', 'rejected')),
                youtube_video_id        TEXT,
                youtube_title           TEXT,
                youtube_description     TEXT,
                youtube_thumbnail       TEXT,
                youtube_published_at    TEXT,
                youtube_view_count      INTEGER NOT NULL DEFAULT 0 CHECK (youtube_view_count >= 0),
                youtube_like_count      INTEGER NOT NULL DEFAULT 0 CHECK (youtube_like_count >= 0),
                youtube_comment_count   INTEGER NOT NULL DEFAULT 0 CHECK (youtube_comment_count >= 0),
                submitted_at            TEXT NOT NULL,
                edited_at               TEXT,
                uploaded_at             TEXT,
                published_at            TEXT,
                rejected_at             TEXT
            );

            CREATE INDEX idx_submissions_user_status
                ON submissions(user_id, status);

            CREATE INDEX idx_submissions_submitted
                ON submissions(submitted_at);

            CREATE TABLE badges (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                threshold   INTEGER NOT NULL CHECK (threshold >= 0),
                icon        TEXT NOT NULL DEFAULT 'award',
                color       TEXT NOT NULL DEFAULT 'blue'
            );

            CREATE TABLE user_badges (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                badge_id    TEXT NOT NULL REFERENCES badges(id),
                earned_at   TEXT NOT NULL,
                UNIQUE(user_id, badge_id)
            );

            CREATE TABLE audit_logs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                admin_id    TEXT NOT NULL,
                action      TEXT NOT NULL,
                target_type TEXT NOT NULL,
                target_id   TEXT NOT NULL,
                old_values  TEXT,
                new_values  TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TRIGGER audit_logs_no_update BEFORE UPDATE ON audit_logs
            BEGIN
                SELECT RAISE(ABORT, 'audit_logs is append-only');
            END;

            CREATE TRIGGER audit_logs_no_delete BEFORE DELETE ON audit_logs
            BEGIN
                SELECT RAISE(ABORT, 'audit_logs is append-only');
            END;

            INSERT INTO badges (id, name, description, threshold, icon, color) VALUES
                ('first-steps',     'First Steps',     'Made your first submission',  1,  'footprints', 'green'),
                ('rising-creator',  'Rising Creator',  'Reached 5 submissions',       5,  'trending-up', 'blue'),
                ('content-machine', 'Content Machine', 'Reached 10 submissions',      10, 'zap',        'purple'),
                ('prolific',        'Prolific',        'Reached 25 submissions',      25, 'star',       'orange'),
                ('legend',          'Legend',          'Reached 50 submissions',      50, 'crown',      'gold');

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (comments)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE comments (
                id              TEXT PRIMARY KEY,
                submission_id   TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES profiles(id),
                content         TEXT NOT NULL CHECK (length(content) > 0),
                parent_id       TEXT REFERENCES comments(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_submission
                ON comments(submission_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
