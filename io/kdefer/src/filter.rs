//! Admission filters applied to received frames before forwarding.

use net::MacAddress;

/// Decides whether a received frame is worth forwarding.
pub trait FrameFilter {
    fn admit(&self, frame: &[u8]) -> bool;
}

impl<F: Fn(&[u8]) -> bool> FrameFilter for F {
    fn admit(&self, frame: &[u8]) -> bool {
        self(frame)
    }
}

/// Forwards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl FrameFilter for AcceptAll {
    fn admit(&self, _frame: &[u8]) -> bool {
        true
    }
}

/// Forwards frames addressed to this interface.
///
/// The destination is the first six bytes of the Ethernet header. Frames
/// shorter than a header are refused.
#[derive(Debug, Clone, Copy)]
pub struct MacFilter {
    own: MacAddress,
    multicast: bool,
}

impl MacFilter {
    /// Accepts unicast to `own` and broadcast.
    pub const fn new(own: MacAddress) -> Self {
        Self {
            own,
            multicast: false,
        }
    }

    /// Also accepts every multicast group.
    pub const fn with_multicast(mut self, multicast: bool) -> Self {
        self.multicast = multicast;
        self
    }
}

const ETH_HEADER_LEN: usize = 14;

impl FrameFilter for MacFilter {
    fn admit(&self, frame: &[u8]) -> bool {
        if frame.len() < ETH_HEADER_LEN {
            return false;
        }
        let mut dst = [0; 6];
        dst.copy_from_slice(&frame[..6]);
        let dst = MacAddress(dst);
        dst == self.own || dst.is_broadcast() || (self.multicast && dst.is_multicast())
    }
}
