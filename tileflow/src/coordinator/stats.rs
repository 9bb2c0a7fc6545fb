//! Coordinator counters.

use std::fmt;

/// Snapshot of coordinator activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Fetches actually issued to the network.
    pub requested: u64,
    /// `request_tile` calls answered with an existing pending request.
    pub deduplicated: u64,
    /// Tiles delivered as `TileEvent::Ready`.
    pub ready: u64,
    /// Failures delivered as `TileEvent::Failed` (expiries included).
    pub failed: u64,
    /// Requests that ended cancelled.
    pub cancelled: u64,
    /// Requests that timed out in `expire_stale`.
    pub expired: u64,
    /// Requests currently pending.
    pub in_flight: usize,
}

impl fmt::Display for CoordinatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested={} dedup={} ready={} failed={} cancelled={} expired={} in_flight={}",
            self.requested,
            self.deduplicated,
            self.ready,
            self.failed,
            self.cancelled,
            self.expired,
            self.in_flight
        )
    }
}
