//! Claim/complete access to the interrupt controller.

use core::{num::NonZeroU32, ptr::NonNull};

use crate::interrupts::IrqLine;

/// Physical address of the hart 0 claim/complete register on the virtual
/// prototype.
pub const PLIC_CLAIM_COMPLETE_PADDR: usize = 0x4000_0004;

/// The claim/complete register protocol.
///
/// Reading claims the highest-priority pending line; writing the same id back
/// signals that its handler has finished.
pub trait ClaimComplete {
    /// Claims the pending line, or `None` if nothing is pending.
    fn claim(&self) -> Option<IrqLine>;

    /// Acknowledges a line returned by [`claim`](Self::claim).
    fn complete(&self, line: IrqLine);
}

impl<C: ClaimComplete + ?Sized> ClaimComplete for &C {
    fn claim(&self) -> Option<IrqLine> {
        (**self).claim()
    }

    fn complete(&self, line: IrqLine) {
        (**self).complete(line)
    }
}

/// A memory-mapped PLIC claim/complete register. Id 0 means "none pending".
#[derive(Debug)]
pub struct PlicClaim {
    reg: NonNull<u32>,
}

// The register is a single 32-bit word accessed with volatile operations.
unsafe impl Send for PlicClaim {}
unsafe impl Sync for PlicClaim {}

impl PlicClaim {
    /// Wraps the claim/complete register at `reg`.
    ///
    /// # Safety
    ///
    /// `reg` must point to a mapped claim/complete register (or memory that
    /// behaves like one) for as long as the returned value is used.
    pub const unsafe fn new(reg: NonNull<u32>) -> Self {
        Self { reg }
    }

    /// Wraps the register at virtual address `vaddr`.
    ///
    /// # Safety
    ///
    /// Same as [`PlicClaim::new`]; `vaddr` must also be non-null and aligned.
    pub const unsafe fn from_vaddr(vaddr: usize) -> Self {
        unsafe { Self::new(NonNull::new_unchecked(vaddr as *mut u32)) }
    }
}

impl ClaimComplete for PlicClaim {
    fn claim(&self) -> Option<IrqLine> {
        let id = unsafe { self.reg.as_ptr().read_volatile() };
        NonZeroU32::new(id).map(|id| id.get() as IrqLine)
    }

    fn complete(&self, line: IrqLine) {
        unsafe { self.reg.as_ptr().write_volatile(line as u32) };
    }
}

#[cfg(test)]
mod tests {
    use std::boxed::Box;

    use super::*;

    #[test]
    fn claim_reads_register_and_complete_writes_it() {
        let raw = Box::into_raw(Box::new(0u32));
        let plic = unsafe { PlicClaim::new(NonNull::new(raw).unwrap()) };

        assert_eq!(plic.claim(), None);

        unsafe { raw.write_volatile(7) };
        assert_eq!(plic.claim(), Some(7));

        plic.complete(42);
        assert_eq!(unsafe { raw.read_volatile() }, 42);

        drop(unsafe { Box::from_raw(raw) });
    }

    #[test]
    fn from_vaddr_uses_address() {
        let raw = Box::into_raw(Box::new(3u32));
        let plic = unsafe { PlicClaim::from_vaddr(raw as usize) };
        assert_eq!(plic.claim(), Some(3));
        drop(unsafe { Box::from_raw(raw) });
    }
}
