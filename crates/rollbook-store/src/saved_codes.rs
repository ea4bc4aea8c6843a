//! Remembered share codes for viewer-side quick re-join.

use chrono::{DateTime, Utc};
use rusqlite::params;

use rollbook_shared::code::ShareCode;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// A `{code, name}` pair remembered after a successful join.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCode {
    pub code: ShareCode,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

impl Database {
    /// Remember a code after a successful join.  Saving an already-known
    /// code refreshes the class name and keeps the original added_at.
    pub fn save_code(&self, code: &ShareCode, name: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO saved_codes (code, name, added_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET name = excluded.name",
            params![code.as_str(), name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// List remembered codes, oldest first.
    pub fn list_saved_codes(&self) -> Result<Vec<SavedCode>> {
        let mut stmt = self.conn().prepare(
            "SELECT code, name, added_at FROM saved_codes ORDER BY added_at ASC, code ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut codes = Vec::new();
        for row in rows {
            let (code, name, added_str) = row?;
            codes.push(SavedCode {
                code: ShareCode::parse(&code)
                    .map_err(|e| StoreError::Corrupt(format!("bad saved code: {e}")))?,
                name,
                added_at: DateTime::parse_from_rfc3339(&added_str)
                    .map(|dt| dt.with_timezone(&Utc))?,
            });
        }
        Ok(codes)
    }

    /// Forget a remembered code.  Returns `true` if a row was deleted.
    pub fn remove_saved_code(&self, code: &ShareCode) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM saved_codes WHERE code = ?1",
            params![code.as_str()],
        )?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn save_list_remove() {
        let (db, _dir) = open();
        let code = ShareCode::parse("AB2CD3").unwrap();

        db.save_code(&code, "Grade 5-A").unwrap();
        let listed = db.list_saved_codes().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, code);
        assert_eq!(listed[0].name, "Grade 5-A");

        assert!(db.remove_saved_code(&code).unwrap());
        assert!(db.list_saved_codes().unwrap().is_empty());
        assert!(!db.remove_saved_code(&code).unwrap());
    }

    #[test]
    fn resaving_updates_the_name_without_duplicating() {
        let (db, _dir) = open();
        let code = ShareCode::parse("AB2CD3").unwrap();

        db.save_code(&code, "Grade 5-A").unwrap();
        db.save_code(&code, "Grade 5-A (2026)").unwrap();

        let listed = db.list_saved_codes().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Grade 5-A (2026)");
    }
}
