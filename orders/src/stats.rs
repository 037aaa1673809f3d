//! Order statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use swapdesk_common::{start_of_day, OrderStatus};

/// Aggregate order counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStatistics {
    pub total: u64,
    /// Statuses with no orders are omitted.
    pub by_status: BTreeMap<OrderStatus, u64>,
    /// Created since midnight UTC.
    pub today: u64,
    pub last_7_days: u64,
}

impl OrderStatistics {
    /// Count for one status, zero if absent.
    pub fn count(&self, status: OrderStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Lower bounds for the `today` and `last_7_days` windows.
pub(crate) fn windows(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(now), now - Duration::days(7))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_windows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let (today, week) = windows(now);

        assert_eq!(today, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(week, Utc.with_ymd_and_hms(2024, 3, 3, 15, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_status_counts_zero() {
        let stats = OrderStatistics::default();
        assert_eq!(stats.count(OrderStatus::Expired), 0);
    }
}
