//! v001 -- Initial schema creation.
//!
//! Creates the register tables (`classes`, `students`, `attendance_marks`,
//! `holidays`) plus the `device` key-value table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Classes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS classes (
    id         TEXT PRIMARY KEY NOT NULL,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    share_code TEXT                         -- last code issued by the registry
);

-- ----------------------------------------------------------------
-- Students (roster order = position)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS students (
    class_id TEXT NOT NULL,                 -- FK -> classes(id)
    id       TEXT NOT NULL,
    name     TEXT NOT NULL,
    roll_no  TEXT NOT NULL,
    position INTEGER NOT NULL,

    PRIMARY KEY (class_id, id),
    FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Attendance marks (one row per marked cell; unmarked = no row)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS attendance_marks (
    class_id   TEXT NOT NULL,               -- FK -> classes(id)
    month      TEXT NOT NULL,               -- month name ("March")
    student_id TEXT NOT NULL,
    day        INTEGER NOT NULL,            -- 1..31
    status     TEXT NOT NULL,               -- 'P' or 'A'

    PRIMARY KEY (class_id, month, student_id, day),
    FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Explicit holidays (Sundays are computed, never stored)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS holidays (
    class_id TEXT NOT NULL,                 -- FK -> classes(id)
    month    TEXT NOT NULL,
    day      INTEGER NOT NULL,

    PRIMARY KEY (class_id, month, day),
    FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Device-scoped key-value settings (viewer session id lives here)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS device (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
