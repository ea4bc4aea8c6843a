//! # rollbook-shared
//!
//! Domain model shared by the rollbook client, local store, and registry
//! server: the class/attendance aggregate, the attendance state machine,
//! share codes, chat messages, and the versioned published-snapshot schema.
//!
//! Everything in this crate is pure data and logic — no I/O, no clocks
//! beyond explicit `DateTime` parameters.

pub mod attendance;
pub mod calendar;
pub mod chat;
pub mod class;
pub mod code;
pub mod constants;
pub mod snapshot;

pub use attendance::{AttendanceRecord, AttendanceStatus, ClassAttendance, MonthStats};
pub use calendar::Month;
pub use chat::{ChatMessage, MessageKind, SenderId};
pub use class::{SchoolClass, Student};
pub use code::{CodeError, ShareCode};
pub use snapshot::{ClassSnapshot, SnapshotError};
