//! # rollbook-client
//!
//! Client-side logic for the shared class register:
//!
//! - [`SyncClient`] — the protocol client that publishes a class snapshot
//!   to the registry, fetches snapshots by code, and performs chat
//!   operations against an entry
//! - [`ChatFeed`] / [`ChatSession`] — the merge engine that reconciles
//!   optimistic local sends with the polled server message list
//! - [`Register`] — the teacher-side service that owns the local store and
//!   applies roster/attendance/holiday mutations
//!
//! Every network operation is a single attempt: failures surface to the
//! caller, which decides whether to re-trigger.

pub mod chat;
pub mod register;
pub mod sync;

mod error;

pub use chat::{ChatFeed, ChatSession};
pub use error::{ClientError, SyncError};
pub use register::Register;
pub use sync::SyncClient;
