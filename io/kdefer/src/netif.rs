//! Network interface bring-up.

use alloc::sync::Arc;

use kerrno::{KResult, k_err};
use kplat::{ClaimComplete, Dispatcher};
use ksync::{TaskOps, Ticks, WakeSignal};
use net::{EmacOps, MacAddress, NetBuf, NetBufPool};

use crate::{
    config::NetIfConfig,
    filter::{FrameFilter, MacFilter},
    isr::{DeviceIsr, EmacIsr},
    queue::{RxConsumer, RxProducer, RxSink, rx_channel},
    rx::RxWorker,
    stats::{NetStats, NetStatsSnapshot},
    tx::Transmitter,
};

/// A MAC wired into the interrupt dispatcher, with its buffer pool and
/// receive signal.
pub struct NetIf<E, T> {
    emac: Arc<E>,
    tasks: Arc<T>,
    pool: Arc<NetBufPool>,
    rx_ready: Arc<WakeSignal>,
    isr: Arc<EmacIsr<T>>,
    stats: Arc<NetStats>,
    config: NetIfConfig,
}

impl<E: EmacOps, T: TaskOps> NetIf<E, T> {
    /// Creates the pool and the receive signal and registers the receive
    /// interrupt on `config.irq_line`.
    ///
    /// Frames that reached the MAC before the handler existed raised no
    /// interrupt we saw, so the signal is given once if any are pending.
    pub fn attach<C: ClaimComplete, const N: usize>(
        emac: Arc<E>,
        tasks: Arc<T>,
        dispatcher: &mut Dispatcher<DeviceIsr<T>, C, N>,
        config: NetIfConfig,
    ) -> KResult<Self> {
        config.validate()?;
        let pool = NetBufPool::new(config.pool_buffers, config.buffer_len)?;
        let rx_ready = Arc::new(WakeSignal::counting(config.rx_wake_max, 0));
        let isr = Arc::new(EmacIsr::new(rx_ready.clone(), tasks.clone()));
        dispatcher.register(config.irq_line, isr.clone().into())?;

        if emac.rx_pending() > 0 && rx_ready.count() == 0 {
            debug!("{}: frame pending at attach", emac.name());
            rx_ready.give(&*tasks);
        }
        info!(
            "{}: {} attached on IRQ line {}",
            emac.name(),
            emac.mac(),
            config.irq_line
        );

        Ok(Self {
            emac,
            tasks,
            pool,
            rx_ready,
            isr,
            stats: Arc::new(NetStats::new()),
            config,
        })
    }

    pub fn mac(&self) -> MacAddress {
        self.emac.mac()
    }

    pub fn config(&self) -> &NetIfConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<NetBufPool> {
        &self.pool
    }

    pub fn rx_signal(&self) -> &Arc<WakeSignal> {
        &self.rx_ready
    }

    /// Receive interrupts handled so far.
    pub fn irq_count(&self) -> usize {
        self.isr.irq_count()
    }

    pub fn stats(&self) -> NetStatsSnapshot {
        self.stats.snapshot()
    }

    /// An admission filter for this interface's address.
    pub fn mac_filter(&self) -> MacFilter {
        MacFilter::new(self.mac())
    }

    /// Builds the receive task, forwarding admitted frames into `sink`.
    pub fn rx_worker<F: FrameFilter, S: RxSink>(&self, filter: F, sink: S) -> RxWorker<E, F, S, T> {
        RxWorker::new(
            self.emac.clone(),
            self.pool.clone(),
            filter,
            sink,
            self.rx_ready.clone(),
            self.tasks.clone(),
        )
        .with_stats(self.stats.clone())
        .with_buffer_wait(self.config.rx_buffer_wait)
        .with_frame_budget(self.config.rx_frame_budget)
    }

    /// Builds the receive task with its own forwarding queue of
    /// `rx_queue_len` frames. The consumer end goes to the protocol stack.
    pub fn rx_path<F: FrameFilter>(&self, filter: F) -> (RxWorker<E, F, RxProducer, T>, RxConsumer) {
        let (tx, rx) = rx_channel(self.config.rx_queue_len);
        (self.rx_worker(filter, tx), rx)
    }

    pub fn transmitter(&self) -> Transmitter<E, T> {
        Transmitter::new(self.emac.clone(), self.tasks.clone())
            .with_stats(self.stats.clone())
            .with_retry(self.config.tx_attempts, self.config.tx_retry_delay)
    }

    /// Takes a buffer for an outgoing frame of `size` bytes.
    pub fn tx_buffer(&self, size: usize, timeout: Ticks) -> KResult<NetBuf> {
        match self.pool.acquire(&*self.tasks, size, timeout) {
            Some(buf) => Ok(buf),
            None if size > self.pool.buffer_len() => k_err!(InvalidInput, "frame too large"),
            None => k_err!(ResourceExhausted),
        }
    }
}
