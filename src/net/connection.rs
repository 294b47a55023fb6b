//! Connection identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for log correlation
//! - Track the number of in-flight connections
//! - Let shutdown wait for in-flight connections to drain

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks active connections so shutdown can drain them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::gauge!("proxy_active_connections").increment(1.0);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all tracked connections have closed.
    pub async fn wait_until_idle(&self) {
        while self.active_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements the active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!("proxy_active_connections").decrement(1.0);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }
}
