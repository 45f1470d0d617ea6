//! The receive task: moves frames from the MAC into the forwarding queue.

use alloc::sync::Arc;

use ksync::{TaskOps, Ticks, WAIT_FOREVER, WakeSignal};
use net::{DriverOps, EmacOps, NetBufPool};

use crate::{filter::FrameFilter, queue::RxSink, stats::NetStats};

/// Where the receive task is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Between cycles.
    Idle,
    /// Blocked on the receive signal.
    Waiting,
    /// Copying frames out of the MAC.
    Draining,
}

/// What one drain pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub forwarded: usize,
    pub rejected: usize,
    /// Admitted frames the forwarding queue had no room for.
    pub dropped: usize,
    /// Frames thrown away because no buffer could be acquired.
    pub lost: usize,
    /// The pass stopped at the frame budget with frames still pending.
    pub budget_exhausted: bool,
}

impl DrainReport {
    /// Frames copied out of the MAC, whatever happened to them next.
    pub fn frames(&self) -> usize {
        self.forwarded + self.rejected + self.dropped
    }

    /// The wake found nothing to do.
    pub fn is_spurious(&self) -> bool {
        self.frames() == 0 && self.lost == 0
    }
}

/// Outcome of [`RxWorker::poll_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxCycle {
    /// No receive event arrived in time.
    TimedOut,
    Drained(DrainReport),
}

/// The deferred half of the MAC receive interrupt.
///
/// Every wake drains the MAC until it reports no pending frame, so any
/// number of interrupts coalesced into one wake are serviced together.
pub struct RxWorker<E, F, S, T> {
    emac: Arc<E>,
    pool: Arc<NetBufPool>,
    filter: F,
    sink: S,
    rx_ready: Arc<WakeSignal>,
    tasks: Arc<T>,
    stats: Arc<NetStats>,
    buffer_wait: Ticks,
    frame_budget: usize,
    state: RxState,
}

impl<E, F, S, T> RxWorker<E, F, S, T>
where
    E: EmacOps,
    F: FrameFilter,
    S: RxSink,
    T: TaskOps,
{
    pub fn new(
        emac: Arc<E>,
        pool: Arc<NetBufPool>,
        filter: F,
        sink: S,
        rx_ready: Arc<WakeSignal>,
        tasks: Arc<T>,
    ) -> Self {
        Self {
            emac,
            pool,
            filter,
            sink,
            rx_ready,
            tasks,
            stats: Arc::new(NetStats::new()),
            buffer_wait: 0,
            frame_budget: usize::MAX,
            state: RxState::Idle,
        }
    }

    /// Counts into `stats` instead of a private set of counters.
    pub fn with_stats(mut self, stats: Arc<NetStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Waits up to `ticks` for a free buffer before declaring a frame lost.
    pub fn with_buffer_wait(mut self, ticks: Ticks) -> Self {
        self.buffer_wait = ticks;
        self
    }

    /// Handles at most `frames` frames per wake. Remaining frames are left
    /// for the next cycle, which is scheduled by giving the signal again.
    pub fn with_frame_budget(mut self, frames: usize) -> Self {
        self.frame_budget = frames.max(1);
        self
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn stats(&self) -> &Arc<NetStats> {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs one cycle: waits up to `timeout` ticks for a receive event, then
    /// drains the MAC.
    pub fn poll_once(&mut self, timeout: Ticks) -> RxCycle {
        self.state = RxState::Waiting;
        let woken = self.rx_ready.take(&*self.tasks, timeout);
        if woken.is_err() {
            self.state = RxState::Idle;
            return RxCycle::TimedOut;
        }

        self.state = RxState::Draining;
        let report = self.drain();
        self.stats.record_drain(&report);
        self.state = RxState::Idle;
        RxCycle::Drained(report)
    }

    /// Serves receive events for as long as the system runs.
    pub fn run(&mut self) -> ! {
        info!("rx task started on {}", self.emac.name());
        loop {
            self.poll_once(WAIT_FOREVER);
        }
    }

    fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let size = self.emac.rx_pending();
            if size == 0 {
                break;
            }
            if report.frames() >= self.frame_budget {
                report.budget_exhausted = true;
                self.rx_ready.give(&*self.tasks);
                break;
            }

            let Some(mut buf) = self.pool.acquire(&*self.tasks, size, self.buffer_wait) else {
                debug!("rx: no buffer for {size} byte frame, event lost");
                if let Err(e) = self.emac.discard() {
                    warn!("rx: failed to discard frame: {e}");
                }
                report.lost += 1;
                // An exhausted pool is not retried until the next wake.
                break;
            };

            let received = self.emac.receive(buf.data_mut()).and_then(|len| buf.set_len(len));
            if let Err(e) = received {
                warn!("rx: receive failed: {e}");
                report.lost += 1;
                break;
            }

            if !self.filter.admit(buf.data()) {
                trace!("rx: frame rejected by filter");
                report.rejected += 1;
                self.pool.release(buf);
                continue;
            }

            match self.sink.try_forward(buf) {
                Ok(()) => report.forwarded += 1,
                Err(buf) => {
                    debug!("rx: forwarding queue full, frame dropped");
                    report.dropped += 1;
                    self.pool.release(buf);
                }
            }
        }
        trace!("rx: drained {report:?}");
        report
    }
}
