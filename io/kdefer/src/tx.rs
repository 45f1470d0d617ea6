//! The transmit path.

use alloc::sync::Arc;

use kerrno::{KError, KResult};
use ksync::{TaskOps, Ticks};
use net::{EmacOps, NetBuf};

use crate::{
    config::{TX_ATTEMPTS, TX_RETRY_DELAY},
    stats::NetStats,
};

/// Sends frames, retrying while the MAC reports busy.
pub struct Transmitter<E, T> {
    emac: Arc<E>,
    tasks: Arc<T>,
    stats: Arc<NetStats>,
    attempts: usize,
    retry_delay: Ticks,
}

impl<E: EmacOps, T: TaskOps> Transmitter<E, T> {
    pub fn new(emac: Arc<E>, tasks: Arc<T>) -> Self {
        Self {
            emac,
            tasks,
            stats: Arc::new(NetStats::new()),
            attempts: TX_ATTEMPTS,
            retry_delay: TX_RETRY_DELAY,
        }
    }

    pub fn with_stats(mut self, stats: Arc<NetStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Tries `attempts` times in total, sleeping `retry_delay` ticks between
    /// two attempts.
    pub fn with_retry(mut self, attempts: usize, retry_delay: Ticks) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn stats(&self) -> &Arc<NetStats> {
        &self.stats
    }

    /// Transmits the payload of `buf` and returns the buffer to its pool.
    ///
    /// A busy MAC is retried; once all attempts are used up the result is
    /// [`KError::HardwareBusy`]. Any other error is returned at once. The
    /// buffer is released in every case.
    pub fn send(&self, buf: NetBuf) -> KResult {
        let mut attempt = 1;
        let result = loop {
            match self.emac.transmit(buf.data()) {
                Err(KError::HardwareBusy) if attempt < self.attempts => {
                    trace!("tx: MAC busy, attempt {attempt}/{}", self.attempts);
                    self.tasks.sleep(self.retry_delay);
                    attempt += 1;
                }
                other => break other,
            }
        };
        let len = buf.len();
        drop(buf);

        self.stats.record_tx(result.is_ok(), attempt - 1);
        match result {
            Ok(()) => trace!("tx: sent {len} bytes"),
            Err(e) => warn!("tx: {len} byte frame dropped after {attempt} attempt(s): {e}"),
        }
        result
    }
}
