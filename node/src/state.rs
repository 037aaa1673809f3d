//! Node state definitions.

/// Node operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Seeding and warming caches.
    Starting,
    /// Serving requests, background loops running.
    Running,
    /// Background loops are draining.
    ShuttingDown,
    Stopped,
}

impl NodeState {
    /// Check if the node is accepting new requests.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, NodeState::Running)
    }
}
