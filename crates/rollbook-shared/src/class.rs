//! The class aggregate: roster, attendance, holidays, chat state.
//!
//! A [`SchoolClass`] is owned by exactly one teacher device and mutated in
//! place there; viewers only ever hold a fetched copy by value.  The JSON
//! shape (camelCase, month names as keys, millisecond timestamps) matches
//! what the web clients publish and poll.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance::{next_status, AttendanceStatus, ClassAttendance, MonthStats};
use crate::calendar::Month;
use crate::chat::ChatMessage;
use crate::code::ShareCode;
use crate::constants::ROLL_NO_WIDTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_no: String,
}

/// The aggregate root.  `attendance` and `holidays` are keyed by month;
/// months with no data simply have no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    pub students: Vec<Student>,
    #[serde(default)]
    pub attendance: BTreeMap<Month, ClassAttendance>,
    #[serde(default)]
    pub holidays: BTreeMap<Month, BTreeSet<u32>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_code: Option<ShareCode>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_chat_locked: bool,
}

impl SchoolClass {
    /// Create an empty register with the default sample roster.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            students: Self::sample_roster(),
            attendance: BTreeMap::new(),
            holidays: BTreeMap::new(),
            created_at: Utc::now(),
            share_code: None,
            messages: Vec::new(),
            is_chat_locked: false,
        }
    }

    /// The roster every new class starts with.
    pub fn sample_roster() -> Vec<Student> {
        [
            ("1", "Aarav Patel"),
            ("2", "Bianca Rossi"),
            ("3", "Charlie Davis"),
            ("4", "Diya Sharma"),
            ("5", "Ethan Hunt"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (id, name))| Student {
            id: id.to_string(),
            name: name.to_string(),
            roll_no: format!("{:0width$}", i + 1, width = ROLL_NO_WIDTH),
        })
        .collect()
    }

    /// Append a student with an auto-assigned roll number.
    pub fn add_student(&mut self, name: impl Into<String>) -> &Student {
        let roll_no = format!("{:0width$}", self.students.len() + 1, width = ROLL_NO_WIDTH);
        self.students.push(Student {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            roll_no,
        });
        self.students.last().expect("just pushed")
    }

    /// Remove a student from the roster.  Returns `false` when the id is
    /// unknown.  Recorded attendance entries are left in place; they are
    /// unreachable without the roster entry.
    pub fn remove_student(&mut self, student_id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != student_id);
        self.students.len() != before
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    /// Whether a day is excluded from marking and counting: Sundays always,
    /// plus any explicitly toggled day.
    pub fn is_holiday(&self, year: i32, month: Month, day: u32) -> bool {
        month.is_sunday(year, day)
            || self
                .holidays
                .get(&month)
                .is_some_and(|days| days.contains(&day))
    }

    /// Advance one attendance cell through the mark cycle
    /// (unmarked → present → absent → unmarked) and return the status now
    /// in effect (`None` = unmarked).
    ///
    /// Holidays, Sundays, out-of-range days, and unknown students are
    /// silent no-ops: the cell is returned unchanged.
    pub fn advance(
        &mut self,
        year: i32,
        month: Month,
        student_id: &str,
        day: u32,
    ) -> Option<AttendanceStatus> {
        let current = self.status(month, student_id, day);
        if !month.contains_day(year, day)
            || self.is_holiday(year, month, day)
            || self.student(student_id).is_none()
        {
            return current;
        }

        let next = next_status(current);
        let record = self
            .attendance
            .entry(month)
            .or_default()
            .entry(student_id.to_string())
            .or_default();
        match next {
            Some(status) => {
                record.insert(day, status);
            }
            None => {
                record.remove(&day);
            }
        }
        next
    }

    /// Recorded mark for one cell, ignoring holiday suppression.
    pub fn status(&self, month: Month, student_id: &str, day: u32) -> Option<AttendanceStatus> {
        self.attendance
            .get(&month)?
            .get(student_id)?
            .get(&day)
            .copied()
    }

    /// Flip a day's membership in the month's explicit holiday set.
    /// Recorded marks on that day are kept, only suppressed — clearing the
    /// flag makes them count again.
    pub fn toggle_holiday(&mut self, month: Month, day: u32) {
        let days = self.holidays.entry(month).or_default();
        if !days.remove(&day) {
            days.insert(day);
        }
    }

    /// Present/absent totals for one student over one month.  Recomputed on
    /// every call; Sundays and explicit holidays never count, even when a
    /// suppressed mark exists there.
    pub fn compute_stats(&self, year: i32, month: Month, student_id: &str) -> MonthStats {
        let mut stats = MonthStats::default();
        let record = self.attendance.get(&month).and_then(|a| a.get(student_id));
        let Some(record) = record else {
            return stats;
        };
        for day in 1..=month.days_in(year) {
            if self.is_holiday(year, month, day) {
                continue;
            }
            match record.get(&day) {
                Some(AttendanceStatus::Present) => stats.presents += 1,
                Some(AttendanceStatus::Absent) => stats.absents += 1,
                None => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024: March 3rd, 10th, 17th, 24th, 31st were Sundays.
    const YEAR: i32 = 2024;

    fn class() -> SchoolClass {
        SchoolClass::new("Grade 5-A")
    }

    #[test]
    fn new_class_has_sample_roster() {
        let cls = class();
        assert_eq!(cls.students.len(), 5);
        assert_eq!(cls.students[0].name, "Aarav Patel");
        assert_eq!(cls.students[0].roll_no, "01");
        assert!(cls.attendance.is_empty());
        assert!(!cls.is_chat_locked);
    }

    #[test]
    fn roll_numbers_keep_counting() {
        let mut cls = class();
        let added = cls.add_student("Fatima Khan").clone();
        assert_eq!(added.roll_no, "06");
        assert_eq!(cls.students.len(), 6);
    }

    #[test]
    fn removing_a_student_keeps_their_marks_unreachable() {
        let mut cls = class();
        cls.advance(YEAR, Month::March, "1", 4);
        assert!(cls.remove_student("1"));
        assert!(cls.student("1").is_none());
        // The record is still there, just unreachable via the roster.
        assert_eq!(cls.status(Month::March, "1", 4), Some(AttendanceStatus::Present));
        assert!(!cls.remove_student("1"));
    }

    #[test]
    fn advance_cycles_one_cell() {
        let mut cls = class();
        assert_eq!(
            cls.advance(YEAR, Month::March, "1", 4),
            Some(AttendanceStatus::Present)
        );
        assert_eq!(
            cls.advance(YEAR, Month::March, "1", 4),
            Some(AttendanceStatus::Absent)
        );
        assert_eq!(cls.advance(YEAR, Month::March, "1", 4), None);
        // The month record is back to empty for that day.
        assert_eq!(cls.status(Month::March, "1", 4), None);
    }

    #[test]
    fn advance_touches_only_the_target_cell() {
        let mut cls = class();
        cls.advance(YEAR, Month::March, "1", 4);
        cls.advance(YEAR, Month::March, "2", 5);
        assert_eq!(cls.status(Month::March, "1", 4), Some(AttendanceStatus::Present));
        assert_eq!(cls.status(Month::March, "1", 5), None);
        assert_eq!(cls.status(Month::March, "2", 4), None);
        assert!(cls.attendance.get(&Month::April).is_none());
    }

    #[test]
    fn advance_is_a_noop_on_sundays() {
        let mut cls = class();
        // 2024-03-03 is a Sunday.
        assert_eq!(cls.advance(YEAR, Month::March, "1", 3), None);
        assert_eq!(cls.status(Month::March, "1", 3), None);
    }

    #[test]
    fn advance_is_a_noop_on_explicit_holidays_for_any_prior_status() {
        let mut cls = class();
        cls.advance(YEAR, Month::March, "1", 4); // P
        cls.toggle_holiday(Month::March, 4);
        // No-op from every prior state: the stored mark stays P.
        assert_eq!(
            cls.advance(YEAR, Month::March, "1", 4),
            Some(AttendanceStatus::Present)
        );
        assert_eq!(cls.status(Month::March, "1", 4), Some(AttendanceStatus::Present));
    }

    #[test]
    fn advance_ignores_unknown_students_and_invalid_days() {
        let mut cls = class();
        assert_eq!(cls.advance(YEAR, Month::March, "nobody", 4), None);
        assert_eq!(cls.advance(YEAR, Month::April, "1", 31), None);
        assert_eq!(cls.advance(YEAR, Month::March, "1", 0), None);
        assert!(cls.attendance.is_empty());
    }

    #[test]
    fn holiday_toggle_preserves_marks() {
        let mut cls = class();
        cls.advance(YEAR, Month::March, "1", 4); // P
        cls.toggle_holiday(Month::March, 4);
        assert!(cls.is_holiday(YEAR, Month::March, 4));
        assert_eq!(cls.compute_stats(YEAR, Month::March, "1").presents, 0);

        // Clearing the flag brings the mark back into the count.
        cls.toggle_holiday(Month::March, 4);
        assert!(!cls.is_holiday(YEAR, Month::March, 4));
        assert_eq!(cls.compute_stats(YEAR, Month::March, "1").presents, 1);
    }

    #[test]
    fn stats_walkthrough() {
        let mut cls = class();
        // Mark student "1" present on March 4th: one click.
        cls.advance(YEAR, Month::March, "1", 4);
        assert_eq!(
            cls.compute_stats(YEAR, Month::March, "1"),
            MonthStats { presents: 1, absents: 0 }
        );
        // Second click: absent.
        cls.advance(YEAR, Month::March, "1", 4);
        assert_eq!(
            cls.compute_stats(YEAR, Month::March, "1"),
            MonthStats { presents: 0, absents: 1 }
        );
        // Third click: back to unmarked.
        cls.advance(YEAR, Month::March, "1", 4);
        assert_eq!(
            cls.compute_stats(YEAR, Month::March, "1"),
            MonthStats { presents: 0, absents: 0 }
        );
    }

    #[test]
    fn stats_skip_sundays_even_with_forced_records() {
        let mut cls = class();
        // Force a mark onto a Sunday directly, bypassing advance().
        cls.attendance
            .entry(Month::March)
            .or_default()
            .entry("1".to_string())
            .or_default()
            .insert(3, AttendanceStatus::Present);
        assert_eq!(cls.compute_stats(YEAR, Month::March, "1").presents, 0);
    }

    #[test]
    fn json_shape_matches_web_clients() {
        let mut cls = class();
        cls.advance(YEAR, Month::March, "1", 4);
        cls.toggle_holiday(Month::March, 15);
        let json = serde_json::to_value(&cls).unwrap();
        assert_eq!(json["attendance"]["March"]["1"]["4"], "P");
        assert_eq!(json["holidays"]["March"][0], 15);
        assert_eq!(json["students"][0]["rollNo"], "01");
        assert!(json["createdAt"].is_i64());
        assert_eq!(json["isChatLocked"], false);
        assert!(json.get("shareCode").is_none());
    }
}
