//! Time utilities for SwapDesk.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Midnight UTC of the day containing `at`.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Expiry time `minutes` after `from`, or `None` if it falls outside the calendar.
pub fn expires_after(from: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(minutes).and_then(|ttl| from.checked_add_signed(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_of_day() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 17, 45, 9).unwrap();
        let midnight = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(at), midnight);
    }

    #[test]
    fn test_expires_after() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 23, 50, 0).unwrap();
        let expiry = expires_after(at, 30);
        assert_eq!(expiry, Some(Utc.with_ymd_and_hms(2026, 3, 15, 0, 20, 0).unwrap()));
    }

    #[test]
    fn test_expires_after_out_of_range() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 23, 50, 0).unwrap();
        assert_eq!(expires_after(at, 999_999_999_999), None);
        assert_eq!(expires_after(at, i64::MAX), None);
    }
}
