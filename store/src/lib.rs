//! SwapDesk Store
//!
//! Persistence contract for currencies, rates, settings, orders and the
//! audit trail, plus an in-memory implementation.
//!
//! Order rows and their audit entries are only ever written together
//! through [`Store::commit`], which applies an [`OrderWrite`] atomically.
//!
//! # Example
//!
//! ```rust,ignore
//! use swapdesk_store::{MemoryStore, OrderWrite, Store};
//!
//! let store = MemoryStore::new();
//! let order = store.commit(OrderWrite::insert(order, audit_entry)).await?;
//! ```

pub mod batch;
pub mod error;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use batch::{OrderMutation, OrderQuery, OrderWrite};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use timeout::bounded;
pub use traits::{SharedStore, Store};
