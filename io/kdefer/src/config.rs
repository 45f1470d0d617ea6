//! Bring-up parameters of a network interface.

use kerrno::{KResult, ensure, k_err};
use kplat::IrqLine;
use ksync::{NO_WAIT, Priority, Ticks};

/// Interrupt line of the MAC on the virtual prototype.
pub const EMAC_IRQ_LINE: IrqLine = 7;
/// Receive events the wake signal can hold before coalescing.
pub const RX_WAKE_MAX: usize = 16;
/// Transmit attempts before a busy MAC is reported to the caller.
pub const TX_ATTEMPTS: usize = 5;
/// Ticks slept between two transmit attempts.
pub const TX_RETRY_DELAY: Ticks = 2;
/// Priority of the receive task.
pub const RX_PRIORITY: Priority = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetIfConfig {
    pub irq_line: IrqLine,
    pub rx_wake_max: usize,
    /// Buffers in the interface's pool.
    pub pool_buffers: usize,
    /// Capacity of each pool buffer.
    pub buffer_len: usize,
    /// Frames the forwarding queue holds before dropping.
    pub rx_queue_len: usize,
    /// How long the receive task waits for a free buffer.
    pub rx_buffer_wait: Ticks,
    /// Priority of the receive task started by `NetIf::start_rx`.
    pub rx_priority: Priority,
    /// Frames handled per wake before the worker yields its turn;
    /// `usize::MAX` drains until the MAC is empty.
    pub rx_frame_budget: usize,
    pub tx_attempts: usize,
    pub tx_retry_delay: Ticks,
}

impl Default for NetIfConfig {
    fn default() -> Self {
        Self {
            irq_line: EMAC_IRQ_LINE,
            rx_wake_max: RX_WAKE_MAX,
            pool_buffers: 16,
            buffer_len: net::emac::MAX_FRAME_LEN,
            rx_queue_len: 16,
            rx_buffer_wait: NO_WAIT,
            rx_priority: RX_PRIORITY,
            rx_frame_budget: usize::MAX,
            tx_attempts: TX_ATTEMPTS,
            tx_retry_delay: TX_RETRY_DELAY,
        }
    }
}

impl NetIfConfig {
    pub fn validate(&self) -> KResult {
        ensure!(self.rx_wake_max > 0, k_err!(InvalidInput, "rx_wake_max must be positive"));
        ensure!(self.rx_queue_len > 0, k_err!(InvalidInput, "rx_queue_len must be positive"));
        ensure!(self.rx_frame_budget > 0, k_err!(InvalidInput, "rx_frame_budget must be positive"));
        ensure!(self.tx_attempts > 0, k_err!(InvalidInput, "tx_attempts must be positive"));
        Ok(())
    }
}
