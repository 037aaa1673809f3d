//! SwapDesk Node
//!
//! Wires the store, rate cache, calculator and order lifecycle into one
//! [`Exchange`] and runs the rate refresh and expiry sweep loops.

pub mod config;
pub mod exchange;
pub mod scheduler;
pub mod state;

pub use config::NodeConfig;
pub use exchange::{BootstrapReport, Exchange};
pub use scheduler::BackgroundTasks;
pub use state::NodeState;
