use thiserror::Error;

use rollbook_shared::code::CodeError;
use rollbook_shared::snapshot::SnapshotError;
use rollbook_store::StoreError;

/// Errors from talking to the share registry.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The input never was a share code (wrong length / alphabet).
    #[error("Invalid share code: {0}")]
    Code(#[from] CodeError),

    /// No registry entry under this code.
    #[error("Code not found")]
    NotFound,

    /// The entry existed but is past the registry's expiry policy.
    #[error("Code expired")]
    Expired,

    /// The registry refused the operation (chat locked, not the sender, ...).
    #[error("{0}")]
    Forbidden(String),

    /// The registry rejected the request as malformed.
    #[error("Registry rejected the request: {0}")]
    Rejected(String),

    /// Any other unexpected status.
    #[error("Registry error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Transport-level failure (DNS, refused connection, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The registry answered with something that does not parse as a
    /// snapshot.
    #[error("Malformed registry response: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors from the teacher-side register service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid share code: {0}")]
    Code(#[from] CodeError),
}
