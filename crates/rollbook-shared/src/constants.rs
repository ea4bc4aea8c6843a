/// Application name
pub const APP_NAME: &str = "Rollbook";

/// Number of characters in a share code
pub const CODE_LENGTH: usize = 6;

/// Share code alphabet: A–Z without the lookalikes I/O, digits 2–9
/// (0/O and 1/I are easy to confuse when a code is read out loud)
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Seconds between chat polls while a chat session is open
pub const CHAT_POLL_INTERVAL_SECS: u64 = 3;

/// Maximum inline attachment size carried in a chat message (500 KiB,
/// attachments travel base64-encoded inside the snapshot)
pub const MAX_ATTACHMENT_SIZE: usize = 500 * 1024;

/// Maximum size of a published snapshot accepted by the registry (5 MiB)
pub const MAX_SNAPSHOT_SIZE: usize = 5 * 1024 * 1024;

/// Width of auto-assigned roll numbers ("01", "02", ...)
pub const ROLL_NO_WIDTH: usize = 2;

/// Default HTTP port of the registry server
pub const DEFAULT_HTTP_PORT: u16 = 8080;
