//! Append-only audit log.

use std::time::Duration;

use chrono::{DateTime, Utc};
use swapdesk_common::{ActorContext, AuditEntry, ExchangeError, Order, OrderId, OrderStatus};
use swapdesk_store::{bounded, SharedStore};

/// Builds audit entries and reads trails back.
///
/// Entries are appended only as part of a store commit, so there is no
/// standalone append here.
pub struct AuditLog {
    store: SharedStore,
    timeout: Duration,
}

impl AuditLog {
    pub fn new(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Entry for a newly created order.
    pub fn order_created(&self, order: &Order, actor: ActorContext) -> AuditEntry {
        AuditEntry::order_created(order, actor)
    }

    /// Entry for a status change at `at`.
    pub fn status_updated(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
        actor: ActorContext,
        at: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry::status_updated(order_id, from, to, completed_at, actor, at)
    }

    /// Entries for one order, oldest first.
    pub async fn trail(&self, order_id: OrderId) -> Result<Vec<AuditEntry>, ExchangeError> {
        Ok(bounded(self.timeout, "audit_trail", self.store.audit_trail(order_id)).await?)
    }
}
