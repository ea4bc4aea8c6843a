//! The published snapshot: what a share code resolves to.
//!
//! The registry stores one [`ClassSnapshot`] per code.  The shape grew over
//! time in the field — `holidays`, `messages`, and the chat lock were all
//! added after the first release — so every later field carries a serde
//! default and documents are validated wholesale on read instead of being
//! assumed well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::class::SchoolClass;
use crate::code::CodeError;

/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    // Documents written before versioning are treated as v1.
    1
}

/// A full class snapshot as published to (and fetched from) the registry.
///
/// `Deserialize` is hand-written rather than derived: the class fields are
/// flattened into the top-level object, and serde's `#[serde(flatten)]`
/// buffers the flattened content through an intermediate representation that
/// stringifies every map key — which makes the `u32` day keys inside
/// `attendance` fail to deserialize. Routing through a `serde_json::Map`
/// instead preserves serde_json's own key coercion, so the flat wire shape
/// round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(flatten)]
    pub class: SchoolClass,

    /// Stamped by the registry when the snapshot is stored; used for the
    /// optional expiry policy.
    #[serde(
        rename = "_sharedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub shared_at: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for ClassSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        // Buffer the document as a serde_json object so the class fields keep
        // serde_json's key coercion (string "4" -> u32) instead of going
        // through serde's flatten buffer, which rejects non-string keys.
        let mut map = serde_json::Map::deserialize(deserializer)?;

        let schema_version = match map.remove("schemaVersion") {
            Some(v) => serde_json::from_value(v).map_err(D::Error::custom)?,
            None => default_schema_version(),
        };

        let shared_at = match map.remove("_sharedAt") {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => {
                let millis: i64 = serde_json::from_value(v).map_err(D::Error::custom)?;
                Some(
                    DateTime::<Utc>::from_timestamp_millis(millis)
                        .ok_or_else(|| D::Error::custom("invalid _sharedAt timestamp"))?,
                )
            }
        };

        let class: SchoolClass =
            serde_json::from_value(serde_json::Value::Object(map)).map_err(D::Error::custom)?;

        Ok(ClassSnapshot {
            schema_version,
            class,
            shared_at,
        })
    }
}

impl ClassSnapshot {
    pub fn new(class: SchoolClass) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            class,
            shared_at: None,
        }
    }

    /// Parse and validate a snapshot document.  Malformed documents are
    /// rejected wholesale — there is no partial import.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural validation applied on every read path (registry ingest,
    /// viewer fetch, manual import).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema_version == 0 || self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.schema_version));
        }
        if self.class.id.trim().is_empty() {
            return Err(SnapshotError::MissingField("id"));
        }
        if self.class.name.trim().is_empty() {
            return Err(SnapshotError::MissingField("name"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for student in &self.class.students {
            if student.id.trim().is_empty() {
                return Err(SnapshotError::MissingField("students[].id"));
            }
            if !seen.insert(student.id.as_str()) {
                return Err(SnapshotError::DuplicateStudent(student.id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported snapshot schema version: {0}")]
    UnsupportedVersion(u32),

    #[error("Duplicate student id in snapshot: {0}")]
    DuplicateStudent(String),

    #[error("Invalid share code in snapshot: {0}")]
    Code(#[from] CodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceStatus;
    use crate::calendar::Month;

    #[test]
    fn round_trip_preserves_register_data() {
        let mut class = SchoolClass::new("Grade 5-A");
        class.advance(2024, Month::March, "1", 4);
        class.advance(2024, Month::March, "2", 4);
        class.advance(2024, Month::March, "2", 4);
        class.toggle_holiday(Month::March, 15);

        let snapshot = ClassSnapshot::new(class.clone());
        let json = snapshot.to_json().unwrap();
        let back = ClassSnapshot::from_json(&json).unwrap();

        assert_eq!(back.class.students, class.students);
        assert_eq!(back.class.attendance, class.attendance);
        assert_eq!(back.class.holidays, class.holidays);
        assert_eq!(back.schema_version, SNAPSHOT_SCHEMA_VERSION);
    }

    #[test]
    fn fills_defaults_for_fields_older_documents_lack() {
        // A first-generation document: no holidays, no chat, no version.
        let json = r#"{
            "id": "172000",
            "name": "Grade 4-B",
            "students": [{"id": "1", "name": "Aarav Patel", "rollNo": "01"}],
            "attendance": {"March": {"1": {"4": "P"}}},
            "createdAt": 1700000000000
        }"#;
        let snapshot = ClassSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.schema_version, 1);
        assert!(snapshot.class.holidays.is_empty());
        assert!(snapshot.class.messages.is_empty());
        assert!(!snapshot.class.is_chat_locked);
        assert!(snapshot.shared_at.is_none());
        assert_eq!(
            snapshot.class.status(Month::March, "1", 4),
            Some(AttendanceStatus::Present)
        );
    }

    #[test]
    fn rejects_documents_without_identity() {
        let json = r#"{"id": "", "name": "X", "students": [], "createdAt": 0}"#;
        assert!(matches!(
            ClassSnapshot::from_json(json),
            Err(SnapshotError::MissingField("id"))
        ));

        let json = r#"{"id": "c1", "name": "  ", "students": [], "createdAt": 0}"#;
        assert!(matches!(
            ClassSnapshot::from_json(json),
            Err(SnapshotError::MissingField("name"))
        ));
    }

    #[test]
    fn rejects_duplicate_students() {
        let json = r#"{
            "id": "c1", "name": "X", "createdAt": 0,
            "students": [
                {"id": "1", "name": "A", "rollNo": "01"},
                {"id": "1", "name": "B", "rollNo": "02"}
            ]
        }"#;
        assert!(matches!(
            ClassSnapshot::from_json(json),
            Err(SnapshotError::DuplicateStudent(id)) if id == "1"
        ));
    }

    #[test]
    fn rejects_versions_from_the_future() {
        let mut snapshot = ClassSnapshot::new(SchoolClass::new("X"));
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn garbage_is_rejected_wholesale() {
        assert!(ClassSnapshot::from_json("not json").is_err());
        assert!(ClassSnapshot::from_json(r#"{"unrelated": true}"#).is_err());
    }
}
