//! Atomic write batches and order queries.

use chrono::{DateTime, Utc};
use swapdesk_common::{AuditEntry, Order, OrderId, OrderStatus};

/// Change applied to the order table.
#[derive(Debug, Clone)]
pub enum OrderMutation {
    /// Insert a new order. Fails if the order number is taken.
    Insert(Order),
    /// Compare-and-set the status of an existing order.
    UpdateStatus {
        id: OrderId,
        /// Status the caller read. The write fails if the row no longer has it.
        expected: OrderStatus,
        status: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

/// An order mutation and its audit entry, committed together or not at all.
#[derive(Debug, Clone)]
pub struct OrderWrite {
    pub mutation: OrderMutation,
    pub audit: AuditEntry,
}

impl OrderWrite {
    /// Insert `order` together with its creation entry.
    pub fn insert(order: Order, audit: AuditEntry) -> Self {
        Self {
            mutation: OrderMutation::Insert(order),
            audit,
        }
    }

    /// Move an order from `expected` to the status recorded in `audit`.
    pub fn update_status(
        id: OrderId,
        expected: OrderStatus,
        status: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
        audit: AuditEntry,
    ) -> Self {
        Self {
            mutation: OrderMutation::UpdateStatus {
                id,
                expected,
                status,
                completed_at,
                at: audit.created_at,
            },
            audit,
        }
    }

    /// Order targeted by this write.
    pub fn order_id(&self) -> OrderId {
        match &self.mutation {
            OrderMutation::Insert(order) => order.id,
            OrderMutation::UpdateStatus { id, .. } => *id,
        }
    }
}

/// Paged order lookup, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub offset: usize,
    pub limit: usize,
}

impl OrderQuery {
    /// Query for a 1-based page.
    pub fn page(page: usize, page_size: usize, status: Option<OrderStatus>) -> Self {
        Self {
            status,
            offset: page.saturating_sub(1) * page_size,
            limit: page_size,
        }
    }
}
