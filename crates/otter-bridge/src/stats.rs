//! Bridge statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one realm.
///
/// Shared with every delivery handle, so host threads can read them at any
/// time without locking.
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Requests accepted by the host dispatcher
    pub dispatched: AtomicU64,
    /// Deliver or abandon messages posted by the host
    pub posted: AtomicU64,
    /// Callbacks invoked without throwing
    pub delivered: AtomicU64,
    /// Callbacks released without being invoked
    pub abandoned: AtomicU64,
    /// Deliveries whose arguments failed to convert or whose callback threw
    pub failed: AtomicU64,
}

impl BridgeStats {
    /// Zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters together with the realm's live capsule count
    pub fn snapshot(&self, live_capsules: usize) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            posted: self.posted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            live_capsules,
        }
    }
}

/// A point-in-time snapshot of bridge statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStatsSnapshot {
    pub dispatched: u64,
    pub posted: u64,
    pub delivered: u64,
    pub abandoned: u64,
    pub failed: u64,
    pub live_capsules: usize,
}

impl BridgeStatsSnapshot {
    /// Callbacks settled one way or another
    pub fn settled(&self) -> u64 {
        self.delivered + self.abandoned + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = BridgeStats::new();
        BridgeStats::record(&stats.dispatched);
        BridgeStats::record(&stats.delivered);
        BridgeStats::record(&stats.failed);
        let snap = stats.snapshot(2);
        assert_eq!(snap.dispatched, 1);
        assert_eq!(snap.settled(), 2);
        assert_eq!(snap.live_capsules, 2);
    }
}
