//! Order types and state machine for SwapDesk.

use crate::{ActorContext, CurrencyCode, ExchangeError, OrderId, OrderNumber};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting the client's transfer.
    Pending,
    /// Client transfer acknowledged by an operator.
    Confirmed,
    /// Payout in progress.
    Processing,
    /// Payout done.
    Completed,
    /// Cancelled by an operator.
    Cancelled,
    /// Left pending past its expiry time.
    Expired,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Expired,
    ];

    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[OrderStatus] {
        match self {
            OrderStatus::Pending => &[
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::Confirmed => &[
                OrderStatus::Processing,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::Processing => &[OrderStatus::Completed, OrderStatus::Cancelled],
            OrderStatus::Completed => &[],
            OrderStatus::Cancelled => &[],
            OrderStatus::Expired => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Stable lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == name)
            .ok_or_else(|| ExchangeError::invalid_field(format!("Unknown order status: {s}"), "status"))
    }
}

/// Client contact and payout details captured with the order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub telegram: Option<String>,
    /// Where the converted amount is paid out.
    pub recipient_wallet: String,
    pub recipient_details: Option<String>,
}

impl ClientDetails {
    /// Validate required fields.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.name.trim().is_empty() {
            return Err(ExchangeError::invalid_field("Client name is required", "client_name"));
        }
        if self.phone.trim().is_empty() {
            return Err(ExchangeError::invalid_field("Client phone is required", "client_phone"));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(ExchangeError::invalid_field("Client email is malformed", "client_email"));
        }

        if self.recipient_wallet.trim().is_empty() {
            return Err(ExchangeError::invalid_field(
                "Recipient wallet is required",
                "recipient_wallet",
            ));
        }

        Ok(())
    }
}

/// Request to create an exchange order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub from_amount: Decimal,
    pub client: ClientDetails,
}

impl CreateOrderRequest {
    /// Create a new order request.
    pub fn new(
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        from_amount: Decimal,
        client: ClientDetails,
    ) -> Self {
        Self {
            from_currency,
            to_currency,
            from_amount,
            client,
        }
    }

    /// Validate the request shape. Currency existence is checked later.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if !self.from_currency.is_valid() {
            return Err(ExchangeError::invalid_field("Malformed currency code", "from_currency"));
        }
        if !self.to_currency.is_valid() {
            return Err(ExchangeError::invalid_field("Malformed currency code", "to_currency"));
        }
        if self.from_currency == self.to_currency {
            return Err(ExchangeError::invalid_field(
                "Source and target currency must differ",
                "to_currency",
            ));
        }
        if self.from_amount <= Decimal::ZERO {
            return Err(ExchangeError::invalid_field("Amount must be positive", "from_amount"));
        }

        self.client.validate()
    }
}

/// A persisted exchange order.
///
/// The quote fields (`from_amount`, `to_amount`, `rate`, `commission`,
/// `commission_percent`) are frozen at creation. Only `status`,
/// `completed_at` and `updated_at` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    pub rate: Decimal,
    pub commission: Decimal,
    pub commission_percent: Decimal,
    pub status: OrderStatus,
    pub client: ClientDetails,
    /// Who created the order.
    pub actor: ActorContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Check whether a pending order is overdue at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending && self.expires_at < now
    }
}
