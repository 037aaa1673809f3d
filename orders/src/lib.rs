//! SwapDesk Orders
//!
//! Order lifecycle management: creation at a frozen quote, the status state
//! machine, expiry of abandoned orders and the audit trail behind them.

pub mod audit;
pub mod lifecycle;
pub mod number;
pub mod stats;

pub use audit::AuditLog;
pub use lifecycle::{
    LifecycleConfig, OrderDetails, OrderLifecycleManager, OrderPage, SweepReport, EXPIRY_SWEEPER,
    MAX_PAGE_SIZE,
};
pub use number::{NumberGenerator, TimestampNumbers};
pub use stats::OrderStatistics;
