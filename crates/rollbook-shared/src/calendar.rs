//! Calendar months and day arithmetic.
//!
//! A register is organised by calendar month; the month name is the map key
//! in stored and published data, so [`Month`] serializes as its English
//! name.  Day-of-week math takes an explicit year — callers decide which
//! year the register belongs to.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A calendar month, serialized by name ("January" .. "December").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All months in calendar order.
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// 1-based month number (January = 1).
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Number of days in this month for the given year.
    pub fn days_in(self, year: i32) -> u32 {
        let first = NaiveDate::from_ymd_opt(year, self.number(), 1)
            .expect("first of month is always valid");
        let next = if self == Month::December {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, self.number() + 1, 1)
        }
        .expect("first of next month is always valid");
        (next - first).num_days() as u32
    }

    /// Whether `day` exists in this month for the given year.
    pub fn contains_day(self, year: i32, day: u32) -> bool {
        day >= 1 && day <= self.days_in(year)
    }

    /// Whether the given day of this month falls on a Sunday.
    /// Out-of-range days are not Sundays.
    pub fn is_sunday(self, year: i32, day: u32) -> bool {
        NaiveDate::from_ymd_opt(year, self.number(), day)
            .map(|d| d.weekday() == Weekday::Sun)
            .unwrap_or(false)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Month {
    type Err = UnknownMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMonth(s.to_string()))
    }
}

/// Error returned when a month name cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("Unknown month name: {0:?}")]
pub struct UnknownMonth(pub String);
