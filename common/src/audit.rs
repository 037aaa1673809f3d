//! Audit trail records.

use crate::{AuditEntryId, Order, OrderId, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who triggered a state change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorContext {
    /// Caller IP address, if known.
    pub ip_address: Option<String>,
    /// Caller user agent, or `system:<job>` for background jobs.
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Context for a remote caller.
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            user_agent: Some(user_agent.into()),
        }
    }

    /// Context for a background job.
    pub fn system(job: &str) -> Self {
        Self {
            ip_address: None,
            user_agent: Some(format!("system:{job}")),
        }
    }

    /// Check whether this context belongs to a background job.
    pub fn is_system(&self) -> bool {
        self.ip_address.is_none()
            && self
                .user_agent
                .as_deref()
                .map_or(false, |agent| agent.starts_with("system:"))
    }
}

/// Kind of state-changing operation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OrderCreated,
    StatusUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderCreated => "order_created",
            AuditAction::StatusUpdated => "status_updated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured before/after state carried by an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditSnapshot {
    /// Full order as persisted.
    Order(Box<Order>),
    /// Status component of an order.
    Status {
        status: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
    },
}

impl AuditSnapshot {
    /// Status recorded by this snapshot.
    pub fn status(&self) -> OrderStatus {
        match self {
            AuditSnapshot::Order(order) => order.status,
            AuditSnapshot::Status { status, .. } => *status,
        }
    }
}

/// A single append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub order_id: Option<OrderId>,
    pub action: AuditAction,
    /// Human-readable summary.
    pub description: String,
    pub before: Option<AuditSnapshot>,
    pub after: Option<AuditSnapshot>,
    pub actor: ActorContext,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry recording creation of `order`.
    pub fn order_created(order: &Order, actor: ActorContext) -> Self {
        Self {
            id: AuditEntryId::new(),
            order_id: Some(order.id),
            action: AuditAction::OrderCreated,
            description: format!("Order {} created", order.order_number),
            before: None,
            after: Some(AuditSnapshot::Order(Box::new(order.clone()))),
            actor,
            created_at: order.created_at,
        }
    }

    /// Entry recording a status change.
    pub fn status_updated(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
        actor: ActorContext,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            order_id: Some(order_id),
            action: AuditAction::StatusUpdated,
            description: format!("Status changed from {from} to {to}"),
            before: Some(AuditSnapshot::Status {
                status: from,
                completed_at: None,
            }),
            after: Some(AuditSnapshot::Status {
                status: to,
                completed_at,
            }),
            actor,
            created_at: at,
        }
    }
}
