//! Timestamp utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Falls back to 0 if the system clock reads earlier than the epoch; the
/// handshake timestamp is informational and peers do not validate it.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_recent() {
        // Anything past 2020-01-01 means the clock plumbing works.
        assert!(timestamp_millis() > 1_577_836_800_000);
    }
}
