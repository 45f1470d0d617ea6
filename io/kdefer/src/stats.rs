//! Interface counters.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::rx::DrainReport;

/// Counters shared by the receive task and the transmit path.
#[derive(Debug, Default)]
pub struct NetStats {
    forwarded: AtomicUsize,
    rejected: AtomicUsize,
    dropped: AtomicUsize,
    lost: AtomicUsize,
    spurious_wakes: AtomicUsize,
    transmitted: AtomicUsize,
    tx_failed: AtomicUsize,
    tx_retries: AtomicUsize,
}

/// A point-in-time copy of [`NetStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetStatsSnapshot {
    /// Frames handed to the forwarding queue.
    pub forwarded: usize,
    /// Frames refused by the admission filter.
    pub rejected: usize,
    /// Frames dropped because the forwarding queue was full.
    pub dropped: usize,
    /// Receive events lost because no buffer was available.
    pub lost: usize,
    /// Wakes that found the MAC already empty.
    pub spurious_wakes: usize,
    pub transmitted: usize,
    pub tx_failed: usize,
    /// Transmit attempts repeated because the MAC was busy.
    pub tx_retries: usize,
}

fn add(counter: &AtomicUsize, n: usize) {
    if n > 0 {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

impl NetStats {
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            lost: AtomicUsize::new(0),
            spurious_wakes: AtomicUsize::new(0),
            transmitted: AtomicUsize::new(0),
            tx_failed: AtomicUsize::new(0),
            tx_retries: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_drain(&self, report: &DrainReport) {
        add(&self.forwarded, report.forwarded);
        add(&self.rejected, report.rejected);
        add(&self.dropped, report.dropped);
        add(&self.lost, report.lost);
        if report.is_spurious() {
            add(&self.spurious_wakes, 1);
        }
    }

    pub(crate) fn record_tx(&self, ok: bool, retries: usize) {
        add(&self.tx_retries, retries);
        add(if ok { &self.transmitted } else { &self.tx_failed }, 1);
    }

    pub fn snapshot(&self) -> NetStatsSnapshot {
        NetStatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
            spurious_wakes: self.spurious_wakes.load(Ordering::Relaxed),
            transmitted: self.transmitted.load(Ordering::Relaxed),
            tx_failed: self.tx_failed.load(Ordering::Relaxed),
            tx_retries: self.tx_retries.load(Ordering::Relaxed),
        }
    }
}
