//! Time utilities and defaults.

use chrono::{DateTime, Utc};

/// Default timeouts.
pub mod constants {
    use std::time::Duration;

    /// Deadline for one request/response exchange over the bus (15 seconds).
    pub fn request_timeout() -> Duration {
        Duration::from_secs(15)
    }

    /// Timeout for one outbound provider HTTP call (5 seconds).
    pub fn http_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

/// A timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Short human-readable stamp, e.g. `Jan  2 15:04:05`.
pub fn format_stamp(ts: &Timestamp) -> String {
    ts.format("%b %e %H:%M:%S").to_string()
}
