//! Connection accounting for the SQLite store.
//!
//! The collector is owned by whoever builds the [`Database`](super::Database)
//! and shared with it through an `Arc`; nothing here is process-global.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ConnectionDiagnostics {
    opened: AtomicU64,
    closed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub opened: u64,
    pub closed: u64,
    pub failed: u64,
}

impl DiagnosticsSnapshot {
    pub fn open_connections(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

impl ConnectionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            opened: self.opened.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Connections opened but not yet dropped.
    pub fn open_connections(&self) -> u64 {
        self.snapshot().open_connections()
    }

    /// Log a warning when connections are still outstanding.
    pub fn report_leaks(&self) -> bool {
        let snapshot = self.snapshot();
        let open = snapshot.open_connections();
        if open > 0 {
            tracing::warn!(
                open,
                opened = snapshot.opened,
                closed = snapshot.closed,
                "store connections still open"
            );
        }
        open > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_connections_tracks_balance() {
        let diagnostics = ConnectionDiagnostics::new();
        diagnostics.record_open();
        diagnostics.record_open();
        diagnostics.record_close();
        assert_eq!(diagnostics.open_connections(), 1);
        assert!(diagnostics.report_leaks());

        diagnostics.record_close();
        assert!(!diagnostics.report_leaks());
    }
}
