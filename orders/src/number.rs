//! Order number generation.

use chrono::{DateTime, Utc};
use rand::Rng;
use swapdesk_common::OrderNumber;

/// Produces candidate order numbers. Uniqueness is enforced by the store.
pub trait NumberGenerator: Send + Sync {
    fn next(&self, at: DateTime<Utc>) -> OrderNumber;
}

/// `ORD{unix_seconds}{4 random digits}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampNumbers;

impl NumberGenerator for TimestampNumbers {
    fn next(&self, at: DateTime<Utc>) -> OrderNumber {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        OrderNumber::new(format!("{}{}{:04}", OrderNumber::PREFIX, at.timestamp(), suffix))
    }
}
