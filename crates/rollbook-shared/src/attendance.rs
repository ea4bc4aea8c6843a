//! Attendance records and the mark cycle.
//!
//! A cell is identified by (month, student, day).  A cell with no entry is
//! "unmarked" — unmarked is the absence of a value, never a stored one, so
//! the JSON shape stays `{"3": "P", "5": "A"}` with missing keys in between.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Recorded mark for one student on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
}

/// Day-of-month → mark, for one student within one month.
pub type AttendanceRecord = BTreeMap<u32, AttendanceStatus>;

/// Student id → record, for one month.
pub type ClassAttendance = BTreeMap<String, AttendanceRecord>;

/// The mark cycle: unmarked → present → absent → unmarked.
///
/// This is the only transition function; there is no way to jump states.
pub fn next_status(current: Option<AttendanceStatus>) -> Option<AttendanceStatus> {
    match current {
        None => Some(AttendanceStatus::Present),
        Some(AttendanceStatus::Present) => Some(AttendanceStatus::Absent),
        Some(AttendanceStatus::Absent) => None,
    }
}

/// Present/absent totals for one student over one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthStats {
    pub presents: u32,
    pub absents: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_is_strict() {
        let unmarked = None;
        let present = next_status(unmarked);
        assert_eq!(present, Some(AttendanceStatus::Present));
        let absent = next_status(present);
        assert_eq!(absent, Some(AttendanceStatus::Absent));
        let back = next_status(absent);
        assert_eq!(back, None);
    }

    #[test]
    fn status_wire_format() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Present).unwrap(),
            "\"P\""
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Absent).unwrap(),
            "\"A\""
        );
    }

    #[test]
    fn record_keys_are_numeric_strings() {
        let mut record = AttendanceRecord::new();
        record.insert(3, AttendanceStatus::Present);
        record.insert(12, AttendanceStatus::Absent);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"3":"P","12":"A"}"#);
        let back: AttendanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
