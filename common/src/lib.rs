//! SwapDesk Common Types
//!
//! This crate contains shared types used across SwapDesk, including
//! identifiers, currency and rate records, the order state machine,
//! audit records and the caller-facing error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod order;
pub mod audit;
pub mod settings;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use order::*;
pub use audit::*;
pub use settings::*;
pub use error::*;
pub use time::*;
