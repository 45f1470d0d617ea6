//! Core traits and types for network device drivers.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;
#[macro_use]
extern crate log;

/// Memory-mapped Ethernet MAC of the virtual prototype.
pub mod emac;
mod net_buf;

#[doc(no_inline)]
pub use driver_base::{DeviceKind, DriverOps};
use kerrno::KResult;

pub use self::{
    emac::MmioEmac,
    net_buf::{BufState, MAX_BUFFER_LEN, NetBuf, NetBufPool},
};

/// The hardware (MAC) address of a NIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Assembles an address from the two identification registers: the high
    /// word holds bytes 0..4 (first byte in the top bits), the low word holds
    /// bytes 4..6 in its upper half.
    pub const fn from_words(high: u32, low: u32) -> Self {
        let h = high.to_be_bytes();
        let l = low.to_be_bytes();
        Self([h[0], h[1], h[2], h[3], l[0], l[1]])
    }

    pub const fn is_broadcast(&self) -> bool {
        matches!(self.0, [0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Group addresses have the least significant bit of the first octet set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl core::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Operations a simple copy-based Ethernet MAC driver implements.
///
/// The device holds at most one received frame at a time: it is reported by
/// [`rx_pending`](Self::rx_pending) until it is copied out with
/// [`receive`](Self::receive) or thrown away with [`discard`](Self::discard).
pub trait EmacOps: DriverOps {
    /// The hardware address of the NIC.
    fn mac(&self) -> MacAddress;

    /// Size in bytes of the frame waiting to be received, 0 if none.
    fn rx_pending(&self) -> usize;

    /// Copies the pending frame into `buf` and returns its length.
    ///
    /// `buf` must hold at least [`rx_pending`](Self::rx_pending) bytes.
    fn receive(&self, buf: &mut [u8]) -> KResult<usize>;

    /// Drops the pending frame without copying it anywhere useful.
    fn discard(&self) -> KResult;

    /// Hands `frame` to the hardware for transmission.
    ///
    /// Returns [`HardwareBusy`](kerrno::KErrorKind::HardwareBusy) if the
    /// transmitter cannot take a frame right now.
    fn transmit(&self, frame: &[u8]) -> KResult;
}
