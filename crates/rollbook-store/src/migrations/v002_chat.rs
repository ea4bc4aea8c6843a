//! v002 -- Chat and viewer-side bookkeeping.
//!
//! Adds the local chat cache, the lock flag on classes, and the saved
//! `{code, name}` pairs a viewer keeps for quick re-join.

use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE classes ADD COLUMN is_chat_locked INTEGER NOT NULL DEFAULT 0;

CREATE TABLE IF NOT EXISTS class_messages (
    class_id    TEXT NOT NULL,              -- FK -> classes(id)
    id          TEXT NOT NULL,
    sender_id   TEXT NOT NULL,              -- 'teacher' or a viewer session id
    sender_name TEXT NOT NULL,
    content     TEXT NOT NULL,
    timestamp   INTEGER NOT NULL,           -- epoch milliseconds
    kind        TEXT NOT NULL,              -- 'text' | 'image' | 'file'
    file_url    TEXT,
    file_name   TEXT,
    position    INTEGER NOT NULL,

    PRIMARY KEY (class_id, id),
    FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS saved_codes (
    code     TEXT PRIMARY KEY NOT NULL,
    name     TEXT NOT NULL,
    added_at TEXT NOT NULL                  -- ISO-8601 / RFC-3339
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
