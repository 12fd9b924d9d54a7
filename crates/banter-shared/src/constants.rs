/// Quiet period after the last keystroke before a stop-typing signal (1 s)
pub const TYPING_DEBOUNCE_MS: u64 = 1_000;

/// Budget for a single socket connect attempt
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Consecutive failed connect attempts tolerated before giving up
pub const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Base delay between reconnect attempts (doubled per failure)
pub const RECONNECT_DELAY_MS: u64 = 500;

/// Upper bound for the exponential reconnect backoff
pub const MAX_RECONNECT_DELAY_MS: u64 = 10_000;

/// Interval between client keepalive pings on an open socket
pub const KEEPALIVE_INTERVAL_SECS: u64 = 30;

/// Capacity of the command and event channels around the connection task
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum upload size in bytes (50 MiB)
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// HTTP route of the multipart upload endpoint
pub const UPLOAD_ROUTE: &str = "/api/files";

/// Window within which an untagged server echo may still be matched to a
/// pending optimistic message with the same sender and content
pub const RECONCILE_WINDOW_SECS: i64 = 10;
