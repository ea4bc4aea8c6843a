//! # rollbook-store
//!
//! Durable local storage for the teacher device, backed by SQLite.
//!
//! The store owns everything the device must remember across restarts: the
//! classes this device created, the `{code, name}` pairs a viewer saved for
//! quick re-join, and the device's stable viewer session identity.  The
//! crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers per concern.

pub mod classes;
pub mod database;
pub mod device;
pub mod migrations;
pub mod saved_codes;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use saved_codes::SavedCode;
