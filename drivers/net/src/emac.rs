use alloc::{vec, vec::Vec};
use core::ptr::NonNull;

use kerrno::{KResult, ensure, k_err, k_err_type};
use spin::Mutex;

use crate::{DeviceKind, DriverOps, EmacOps, MAX_BUFFER_LEN, MacAddress};

/// Physical base address of the MAC on the virtual prototype.
pub const EMAC_BASE_PADDR: usize = 0x3000_0000;

/// Largest frame the MAC delivers.
pub const MAX_FRAME_LEN: usize = 1536;

const STATUS: usize = 0x00;
const RX_SIZE: usize = 0x04;
const RX_DST: usize = 0x08;
const TX_SRC: usize = 0x0c;
const TX_SIZE: usize = 0x10;
const MAC_HIGH: usize = 0x14;
const MAC_LOW: usize = 0x18;

/// Operation codes written to the status register.
pub mod op {
    /// Copy the pending frame to the receive destination.
    pub const RECV: u32 = 1;
    /// Send the frame at the transmit source.
    pub const SEND: u32 = 2;
}

/// Status bit set while the transmitter is busy.
const STATUS_BUSY: u32 = 1 << 0;

/// A copy-based Ethernet MAC controlled through seven 32-bit registers.
///
/// The device DMAs through 32-bit pointer registers, so frame buffers must
/// live in the low 4 GiB.
pub struct MmioEmac {
    base: NonNull<u32>,
    // Target of `discard`, grown to the largest frame thrown away so far.
    scratch: Mutex<Vec<u8>>,
}

unsafe impl Send for MmioEmac {}
unsafe impl Sync for MmioEmac {}

impl MmioEmac {
    /// Creates a driver for the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the mapped register block of the MAC for the
    /// lifetime of the driver.
    pub unsafe fn new(base: NonNull<u32>) -> Self {
        info!("emac @ {:#x}", base.as_ptr() as usize);
        Self {
            base,
            scratch: Mutex::new(vec![0u8; MAX_FRAME_LEN]),
        }
    }

    fn read(&self, offset: usize) -> u32 {
        unsafe { self.base.as_ptr().byte_add(offset).read_volatile() }
    }

    fn write(&self, offset: usize, value: u32) {
        unsafe { self.base.as_ptr().byte_add(offset).write_volatile(value) }
    }

    /// Whether the transmitter is currently busy.
    pub fn tx_busy(&self) -> bool {
        self.read(STATUS) & STATUS_BUSY != 0
    }
}

fn dma_addr(ptr: *const u8) -> KResult<u32> {
    u32::try_from(ptr as usize).map_err(|_| k_err_type!(InvalidInput, "buffer above 4 GiB"))
}

impl DriverOps for MmioEmac {
    fn name(&self) -> &str {
        "riscv-vp,ethernet"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Net
    }
}

impl EmacOps for MmioEmac {
    fn mac(&self) -> MacAddress {
        MacAddress::from_words(self.read(MAC_HIGH), self.read(MAC_LOW))
    }

    fn rx_pending(&self) -> usize {
        self.read(RX_SIZE) as usize
    }

    fn receive(&self, buf: &mut [u8]) -> KResult<usize> {
        let size = self.rx_pending();
        ensure!(size <= buf.len(), k_err!(InvalidInput, "receive buffer too small"));
        self.write(RX_DST, dma_addr(buf.as_mut_ptr())?);
        self.write(STATUS, op::RECV);
        Ok(size)
    }

    /// Copies the pending frame into a driver-owned buffer, whatever its
    /// size, so an oversized frame cannot stay stuck in the MAC.
    ///
    /// A reported size above [`MAX_BUFFER_LEN`] means the device is in a bad
    /// state and nothing is copied.
    fn discard(&self) -> KResult {
        let size = self.rx_pending();
        ensure!(
            size <= MAX_BUFFER_LEN,
            k_err!(BadState, "pending frame size out of range")
        );
        let mut scratch = self.scratch.lock();
        if scratch.len() < size {
            debug!("emac: growing discard buffer to {size} bytes");
            scratch.resize(size, 0);
        }
        let size = self.receive(&mut scratch)?;
        trace!("emac: discarded {size} byte frame");
        Ok(())
    }

    fn transmit(&self, frame: &[u8]) -> KResult {
        if self.tx_busy() {
            return k_err!(HardwareBusy);
        }
        let len = u32::try_from(frame.len()).map_err(|_| k_err_type!(InvalidInput))?;
        self.write(TX_SRC, dma_addr(frame.as_ptr())?);
        self.write(TX_SIZE, len);
        self.write(STATUS, op::SEND);
        Ok(())
    }
}
