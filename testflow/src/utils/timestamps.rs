//! Timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an RFC 3339 string with milliseconds.
///
/// # Examples
///
/// ```
/// use testflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with('Z'));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Formats a timestamp the way every envelope and record carries it.
#[must_use]
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a filesystem time (e.g. a file's modification time).
#[must_use]
pub fn format_system_time(time: SystemTime) -> String {
    format_timestamp(DateTime::<Utc>::from(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-01T12:30:00.000Z");
    }

    #[test]
    fn test_format_system_time() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(format_system_time(time), "1970-01-01T00:00:01.500Z");
    }
}
