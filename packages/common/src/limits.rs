/// Maximum number of distinct study UIDs accepted by one batch load.
pub const MAX_BATCH_STUDIES: usize = 200;

/// Report display names are capped at this many characters.
pub const MAX_REPORT_NAME_CHARS: usize = 255;

/// A client-supplied comment time further than this from server time is replaced.
pub const COMMENT_TIME_DRIFT_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// How long the client keeps an unreachable server switched off before probing again.
pub const SERVER_RETRY_MS: i64 = 60_000;

/// Largest report file the server stores.
pub const MAX_REPORT_BYTES: u64 = 50 * 1024 * 1024;
