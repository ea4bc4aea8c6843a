//! Persistence for the class aggregate.
//!
//! A [`SchoolClass`] is saved as a whole: the class row is upserted and the
//! child tables (roster, marks, holidays, chat cache) are replaced inside
//! one transaction.  That mirrors how the register is edited — the owning
//! device mutates the in-memory aggregate and writes it through after every
//! action.

use chrono::{DateTime, Utc};
use rusqlite::{params, Transaction};

use rollbook_shared::attendance::AttendanceStatus;
use rollbook_shared::calendar::Month;
use rollbook_shared::chat::{ChatMessage, MessageKind, SenderId};
use rollbook_shared::class::{SchoolClass, Student};
use rollbook_shared::code::ShareCode;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Upsert a class aggregate.  Children are replaced wholesale.
    pub fn save_class(&mut self, class: &SchoolClass) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO classes (id, name, created_at, share_code, is_chat_locked)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 share_code = excluded.share_code,
                 is_chat_locked = excluded.is_chat_locked",
            params![
                class.id,
                class.name,
                class.created_at.to_rfc3339(),
                class.share_code.as_ref().map(|c| c.as_str().to_string()),
                class.is_chat_locked as i64,
            ],
        )?;

        replace_children(&tx, class)?;
        tx.commit()?;

        tracing::debug!(id = %class.id, name = %class.name, "class saved");
        Ok(())
    }

    /// Delete a class (local only — the registry entry, if any, is left to
    /// the server's expiry policy).  Returns `true` if a row was deleted.
    pub fn delete_class(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM classes WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Load one class aggregate by id.
    pub fn load_class(&self, id: &str) -> Result<SchoolClass> {
        let mut class = self
            .conn()
            .query_row(
                "SELECT id, name, created_at, share_code, is_chat_locked
                 FROM classes WHERE id = ?1",
                params![id],
                row_to_class_header,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        self.load_children(&mut class)?;
        Ok(class)
    }

    /// Load every class this device owns, oldest first.
    pub fn list_classes(&self) -> Result<Vec<SchoolClass>> {
        let ids: Vec<String> = {
            let mut stmt = self
                .conn()
                .prepare("SELECT id FROM classes ORDER BY created_at ASC, id ASC")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            ids
        };

        ids.iter().map(|id| self.load_class(id)).collect()
    }

    fn load_children(&self, class: &mut SchoolClass) -> Result<()> {
        // Roster, in insertion order.
        let mut stmt = self.conn().prepare(
            "SELECT id, name, roll_no FROM students
             WHERE class_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![class.id], |row| {
            Ok(Student {
                id: row.get(0)?,
                name: row.get(1)?,
                roll_no: row.get(2)?,
            })
        })?;
        for row in rows {
            class.students.push(row?);
        }

        // Attendance marks.
        let mut stmt = self.conn().prepare(
            "SELECT month, student_id, day, status FROM attendance_marks
             WHERE class_id = ?1",
        )?;
        let rows = stmt.query_map(params![class.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (month, student_id, day, status) = row?;
            let month = parse_month(&month)?;
            let status = parse_status(&status)?;
            class
                .attendance
                .entry(month)
                .or_default()
                .entry(student_id)
                .or_default()
                .insert(day, status);
        }

        // Explicit holidays.
        let mut stmt = self
            .conn()
            .prepare("SELECT month, day FROM holidays WHERE class_id = ?1")?;
        let rows = stmt.query_map(params![class.id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;
        for row in rows {
            let (month, day) = row?;
            class
                .holidays
                .entry(parse_month(&month)?)
                .or_default()
                .insert(day);
        }

        // Chat cache, in append order.
        let mut stmt = self.conn().prepare(
            "SELECT id, sender_id, sender_name, content, timestamp, kind, file_url, file_name
             FROM class_messages WHERE class_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![class.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;
        for row in rows {
            let (id, sender_id, sender_name, content, millis, kind, file_url, file_name) = row?;
            class.messages.push(ChatMessage {
                id,
                sender_id: SenderId::from(sender_id),
                sender_name,
                content,
                timestamp: DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {millis}")))?,
                kind: parse_kind(&kind)?,
                file_url,
                file_name,
            });
        }

        Ok(())
    }
}

fn replace_children(tx: &Transaction<'_>, class: &SchoolClass) -> Result<()> {
    for table in ["students", "attendance_marks", "holidays", "class_messages"] {
        tx.execute(&format!("DELETE FROM {table} WHERE class_id = ?1"), params![class.id])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO students (class_id, id, name, roll_no, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, student) in class.students.iter().enumerate() {
        stmt.execute(params![
            class.id,
            student.id,
            student.name,
            student.roll_no,
            position as i64
        ])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO attendance_marks (class_id, month, student_id, day, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (month, month_attendance) in &class.attendance {
        for (student_id, record) in month_attendance {
            for (day, status) in record {
                stmt.execute(params![
                    class.id,
                    month.name(),
                    student_id,
                    day,
                    status_str(*status)
                ])?;
            }
        }
    }

    let mut stmt = tx.prepare(
        "INSERT INTO holidays (class_id, month, day) VALUES (?1, ?2, ?3)",
    )?;
    for (month, days) in &class.holidays {
        for day in days {
            stmt.execute(params![class.id, month.name(), day])?;
        }
    }

    let mut stmt = tx.prepare(
        "INSERT INTO class_messages
             (class_id, id, sender_id, sender_name, content, timestamp, kind, file_url, file_name, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (position, msg) in class.messages.iter().enumerate() {
        stmt.execute(params![
            class.id,
            msg.id,
            msg.sender_id.as_str(),
            msg.sender_name,
            msg.content,
            msg.timestamp.timestamp_millis(),
            kind_str(msg.kind),
            msg.file_url,
            msg.file_name,
            position as i64,
        ])?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_class_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<SchoolClass> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let created_str: String = row.get(2)?;
    let share_code: Option<String> = row.get(3)?;
    let is_chat_locked: bool = row.get::<_, i64>(4)? != 0;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let share_code = share_code
        .map(|c| ShareCode::parse(&c))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(SchoolClass {
        id,
        name,
        students: Vec::new(),
        attendance: Default::default(),
        holidays: Default::default(),
        created_at,
        share_code,
        messages: Vec::new(),
        is_chat_locked,
    })
}

fn parse_month(name: &str) -> Result<Month> {
    name.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad month name {name:?}")))
}

fn parse_status(s: &str) -> Result<AttendanceStatus> {
    match s {
        "P" => Ok(AttendanceStatus::Present),
        "A" => Ok(AttendanceStatus::Absent),
        other => Err(StoreError::Corrupt(format!("bad status {other:?}"))),
    }
}

fn status_str(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "P",
        AttendanceStatus::Absent => "A",
    }
}

fn parse_kind(s: &str) -> Result<MessageKind> {
    match s {
        "text" => Ok(MessageKind::Text),
        "image" => Ok(MessageKind::Image),
        "file" => Ok(MessageKind::File),
        other => Err(StoreError::Corrupt(format!("bad message kind {other:?}"))),
    }
}

fn kind_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Image => "image",
        MessageKind::File => "file",
    }
}
