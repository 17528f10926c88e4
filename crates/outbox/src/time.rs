use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds, or 0 if the clock predates the epoch.
pub fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
