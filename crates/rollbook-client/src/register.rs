//! The teacher-side register service.
//!
//! [`Register`] owns the local store handle and is the only path through
//! which a class is mutated — viewers never get one, which is what makes
//! "viewer writes are a no-op" structural rather than a runtime check.
//! Every mutation loads the aggregate, applies the domain operation, and
//! writes it back through the store.

use tracing::info;
use uuid::Uuid;

use rollbook_shared::attendance::{AttendanceStatus, MonthStats};
use rollbook_shared::calendar::Month;
use rollbook_shared::chat::SenderId;
use rollbook_shared::class::{SchoolClass, Student};
use rollbook_shared::code::ShareCode;
use rollbook_shared::snapshot::ClassSnapshot;
use rollbook_store::{Database, SavedCode, StoreError};

use crate::error::ClientError;
use crate::sync::SyncClient;

pub struct Register {
    db: Database,
}

impl Register {
    /// Open the register over the default application database.
    pub fn open() -> Result<Self, ClientError> {
        Ok(Self { db: Database::new()? })
    }

    /// Wrap an already-open database (tests, custom layouts).
    pub fn with_database(db: Database) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    /// Create a class with the default sample roster and persist it.
    pub fn create_class(&mut self, name: impl Into<String>) -> Result<SchoolClass, ClientError> {
        let class = SchoolClass::new(name);
        self.db.save_class(&class)?;
        info!(id = %class.id, name = %class.name, "class created");
        Ok(class)
    }

    pub fn class(&self, class_id: &str) -> Result<SchoolClass, ClientError> {
        Ok(self.db.load_class(class_id)?)
    }

    pub fn classes(&self) -> Result<Vec<SchoolClass>, ClientError> {
        Ok(self.db.list_classes()?)
    }

    /// Delete a class locally.  The registry entry, if one was published,
    /// is left to the server's expiry policy.
    pub fn delete_class(&self, class_id: &str) -> Result<bool, ClientError> {
        Ok(self.db.delete_class(class_id)?)
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    pub fn add_student(
        &mut self,
        class_id: &str,
        name: impl Into<String>,
    ) -> Result<Student, ClientError> {
        let mut class = self.db.load_class(class_id)?;
        let student = class.add_student(name).clone();
        self.db.save_class(&class)?;
        Ok(student)
    }

    pub fn remove_student(&mut self, class_id: &str, student_id: &str) -> Result<bool, ClientError> {
        let mut class = self.db.load_class(class_id)?;
        let removed = class.remove_student(student_id);
        if removed {
            self.db.save_class(&class)?;
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Attendance
    // ------------------------------------------------------------------

    /// Advance one attendance cell through the mark cycle and persist.
    /// Holidays and Sundays are silent no-ops, as in the domain model.
    pub fn advance_attendance(
        &mut self,
        class_id: &str,
        year: i32,
        month: Month,
        student_id: &str,
        day: u32,
    ) -> Result<Option<AttendanceStatus>, ClientError> {
        let mut class = self.db.load_class(class_id)?;
        let status = class.advance(year, month, student_id, day);
        self.db.save_class(&class)?;
        Ok(status)
    }

    pub fn toggle_holiday(
        &mut self,
        class_id: &str,
        month: Month,
        day: u32,
    ) -> Result<(), ClientError> {
        let mut class = self.db.load_class(class_id)?;
        class.toggle_holiday(month, day);
        self.db.save_class(&class)?;
        Ok(())
    }

    pub fn stats(
        &self,
        class_id: &str,
        year: i32,
        month: Month,
        student_id: &str,
    ) -> Result<MonthStats, ClientError> {
        let class = self.db.load_class(class_id)?;
        Ok(class.compute_stats(year, month, student_id))
    }

    // ------------------------------------------------------------------
    // Sharing
    // ------------------------------------------------------------------

    /// Publish the class to the registry and adopt the returned code as the
    /// class's current one.  The previous code (if any) keeps serving its
    /// frozen snapshot on the server.
    pub async fn share_class(
        &mut self,
        sync: &SyncClient,
        class_id: &str,
    ) -> Result<ShareCode, ClientError> {
        let mut class = self.db.load_class(class_id)?;
        let code = sync.publish(&ClassSnapshot::new(class.clone())).await?;

        class.share_code = Some(code.clone());
        self.db.save_class(&class)?;

        info!(id = %class.id, code = %code, "class shared");
        Ok(code)
    }

    /// Viewer-side join: resolve a code, remember it for quick re-join, and
    /// hand back the read-only snapshot.
    pub async fn join_class(
        &self,
        sync: &SyncClient,
        code_input: &str,
    ) -> Result<ClassSnapshot, ClientError> {
        let code = ShareCode::parse(code_input)?;
        let snapshot = sync.fetch(&code).await.map_err(ClientError::Sync)?;
        self.db.save_code(&code, &snapshot.class.name)?;
        Ok(snapshot)
    }

    pub fn saved_codes(&self) -> Result<Vec<SavedCode>, ClientError> {
        Ok(self.db.list_saved_codes()?)
    }

    pub fn forget_code(&self, code: &ShareCode) -> Result<bool, ClientError> {
        Ok(self.db.remove_saved_code(code)?)
    }

    /// The stable viewer identity of this device.
    pub fn viewer_identity(&self) -> Result<SenderId, ClientError> {
        Ok(self.db.viewer_session_id()?)
    }

    // ------------------------------------------------------------------
    // Manual import / export
    // ------------------------------------------------------------------

    /// Serialize a class as a snapshot document for manual backup.
    pub fn export_class(&self, class_id: &str) -> Result<String, ClientError> {
        let class = self.db.load_class(class_id)?;
        Ok(ClassSnapshot::new(class).to_json()?)
    }

    /// Import a snapshot document.  Malformed documents are rejected
    /// wholesale; a class id colliding with an existing local class gets a
    /// fresh id so the existing class is never overwritten.
    pub fn import_class(&mut self, json: &str) -> Result<SchoolClass, ClientError> {
        let snapshot = ClassSnapshot::from_json(json)?;
        let mut class = snapshot.class;

        match self.db.load_class(&class.id) {
            Ok(_) => {
                let fresh = Uuid::new_v4().to_string();
                info!(old = %class.id, new = %fresh, "import collision, reassigning class id");
                class.id = fresh;
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        self.db.save_class(&class)?;
        Ok(class)
    }
}
