//! Time and key helpers for fluxlist

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Escape a key segment so it cannot collide with the `:` separator.
///
/// Format: `:` becomes `%3A`, `%` becomes `%25`
pub fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}
