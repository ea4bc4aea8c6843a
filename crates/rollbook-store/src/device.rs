//! Device-scoped settings.
//!
//! The one value that matters here is the viewer session identity: generated
//! once, persisted, and passed explicitly into every sync call so a viewer's
//! own chat messages stay recognizable across restarts.

use rusqlite::{params, OptionalExtension};

use rollbook_shared::chat::SenderId;

use crate::database::Database;
use crate::error::Result;

const VIEWER_SESSION_KEY: &str = "viewer_session_id";

impl Database {
    /// The stable viewer identity of this device, generating and persisting
    /// it on first use.
    pub fn viewer_session_id(&self) -> Result<SenderId> {
        if let Some(existing) = self.device_get(VIEWER_SESSION_KEY)? {
            return Ok(SenderId::from(existing));
        }

        let fresh = SenderId::new_viewer();
        self.device_set(VIEWER_SESSION_KEY, fresh.as_str())?;
        tracing::info!(session = %fresh, "generated viewer session identity");
        Ok(fresh)
    }

    fn device_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM device WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn device_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO device (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
