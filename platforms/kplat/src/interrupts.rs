//! Per-line interrupt handler table.

use core::ops::{BitOr, BitOrAssign};

use kerrno::{KResult, k_bail};

use crate::plic::ClaimComplete;

/// Interrupt line identifier as reported by the controller.
pub type IrqLine = usize;

/// Number of lines a [`Dispatcher`] covers unless told otherwise.
pub const DEFAULT_IRQ_LINES: usize = 64;

/// Whether a higher-priority task became runnable while handling an
/// interrupt.
///
/// Propagated to the trap-return path, which performs the context switch.
#[must_use]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WakeHint(bool);

impl WakeHint {
    /// Keep running the interrupted task.
    pub const NONE: Self = Self(false);
    /// Switch to the task that was just woken.
    pub const YIELD: Self = Self(true);

    pub const fn needs_yield(self) -> bool {
        self.0
    }
}

impl From<bool> for WakeHint {
    fn from(yield_now: bool) -> Self {
        Self(yield_now)
    }
}

impl BitOr for WakeHint {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for WakeHint {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// An interrupt-context routine bound to one line.
///
/// Runs with the line masked at its priority. Implementations must neither
/// block nor allocate.
pub trait IrqHandler: Send + Sync {
    fn handle(&self) -> WakeHint;
}

impl<H: IrqHandler + ?Sized> IrqHandler for &H {
    fn handle(&self) -> WakeHint {
        (**self).handle()
    }
}

/// Handler for lines nobody registered: does nothing, wakes nobody.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl IrqHandler for NoopHandler {
    fn handle(&self) -> WakeHint {
        WakeHint::NONE
    }
}

/// Maps lines `0..N` to handlers and runs the claim/complete cycle.
///
/// The table is filled during initialization through `&mut self` and then
/// shared with the trap path, so dispatching needs no locking.
pub struct Dispatcher<H, C, const N: usize = DEFAULT_IRQ_LINES> {
    handlers: [Option<H>; N],
    controller: C,
}

impl<H: IrqHandler, C: ClaimComplete, const N: usize> Dispatcher<H, C, N> {
    /// Creates a table with every line bound to [`NoopHandler`].
    pub const fn new(controller: C) -> Self {
        Self {
            handlers: [const { None }; N],
            controller,
        }
    }

    /// Number of lines this table covers.
    pub const fn lines(&self) -> usize {
        N
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Binds `handler` to `line`, returning the handler it replaces.
    ///
    /// A line outside `0..N` is a configuration error and is reported as
    /// [`OutOfRange`](kerrno::KErrorKind::OutOfRange).
    pub fn register(&mut self, line: IrqLine, handler: H) -> KResult<Option<H>> {
        let Some(slot) = self.handlers.get_mut(line) else {
            k_bail!(OutOfRange, format_args!("IRQ line {} outside 0..{}", line, N));
        };
        let old = slot.replace(handler);
        if old.is_some() {
            warn!("IRQ line {line}: handler replaced");
        } else {
            debug!("IRQ line {line}: handler registered");
        }
        Ok(old)
    }

    /// Unbinds `line`; it falls back to [`NoopHandler`].
    pub fn unregister(&mut self, line: IrqLine) -> Option<H> {
        self.handlers.get_mut(line).and_then(Option::take)
    }

    pub fn is_registered(&self, line: IrqLine) -> bool {
        matches!(self.handlers.get(line), Some(Some(_)))
    }

    /// Services one external interrupt.
    ///
    /// Claims the pending line, runs its handler (or [`NoopHandler`]) and
    /// completes the claim with the same id. A claim that reports nothing
    /// pending is spurious: no handler runs and nothing is completed.
    pub fn dispatch(&self) -> WakeHint {
        let Some(line) = self.controller.claim() else {
            trace!("Spurious external IRQ");
            return WakeHint::NONE;
        };
        trace!("IRQ: external {line}");
        let hint = match self.handlers.get(line) {
            Some(Some(handler)) => handler.handle(),
            _ => {
                debug!("IRQ line {line}: no handler");
                NoopHandler.handle()
            }
        };
        self.controller.complete(line);
        hint
    }
}

impl<H, C: core::fmt::Debug, const N: usize> core::fmt::Debug for Dispatcher<H, C, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("Dispatcher")
            .field("lines", &N)
            .field("registered", &registered)
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        vec::Vec,
    };

    use kerrno::KError;

    use super::*;

    #[derive(Debug, Default)]
    struct MockClaim {
        pending: Mutex<Vec<IrqLine>>,
        claims: AtomicUsize,
        completed: Mutex<Vec<IrqLine>>,
    }

    impl MockClaim {
        fn raise(&self, line: IrqLine) {
            self.pending.lock().unwrap().push(line);
        }
    }

    impl ClaimComplete for MockClaim {
        fn claim(&self) -> Option<IrqLine> {
            self.claims.fetch_add(1, Ordering::SeqCst);
            let mut pending = self.pending.lock().unwrap();
            (!pending.is_empty()).then(|| pending.remove(0))
        }

        fn complete(&self, line: IrqLine) {
            self.completed.lock().unwrap().push(line);
        }
    }

    #[derive(Debug)]
    struct Counting {
        calls: AtomicUsize,
        hint: WakeHint,
    }

    impl Counting {
        fn new(hint: WakeHint) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                hint,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IrqHandler for Counting {
        fn handle(&self) -> WakeHint {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hint
        }
    }

    #[test]
    fn registered_line_runs_once_per_claim() {
        for line in [1, 7, 63] {
            let handler = Counting::new(WakeHint::YIELD);
            let mut table: Dispatcher<&Counting, MockClaim> = Dispatcher::new(MockClaim::default());
            assert!(table.register(line, &handler).unwrap().is_none());
            assert!(table.is_registered(line));

            table.controller().raise(line);
            assert!(table.dispatch().needs_yield());

            assert_eq!(handler.calls(), 1);
            assert_eq!(table.controller().claims.load(Ordering::SeqCst), 1);
            assert_eq!(*table.controller().completed.lock().unwrap(), [line]);
        }
    }

    #[test]
    fn register_rejects_line_out_of_range() {
        let handler = Counting::new(WakeHint::NONE);
        let mut table: Dispatcher<&Counting, MockClaim, 8> = Dispatcher::new(MockClaim::default());
        assert_eq!(table.lines(), 8);
        assert_eq!(table.register(8, &handler).unwrap_err(), KError::OutOfRange);
        assert_eq!(table.register(usize::MAX, &handler).unwrap_err(), KError::OutOfRange);
        assert!(table.register(7, &handler).is_ok());
    }

    #[test]
    fn unregistered_line_uses_noop() {
        let handler = Counting::new(WakeHint::YIELD);
        let mut table: Dispatcher<&Counting, MockClaim> = Dispatcher::new(MockClaim::default());
        table.register(3, &handler).unwrap();

        table.controller().raise(5);
        assert_eq!(table.dispatch(), WakeHint::NONE);
        // A line id the table does not cover is completed all the same.
        table.controller().raise(1000);
        assert_eq!(table.dispatch(), WakeHint::NONE);

        assert_eq!(handler.calls(), 0);
        assert_eq!(*table.controller().completed.lock().unwrap(), [5, 1000]);
    }

    #[test]
    fn spurious_claim_skips_complete() {
        let table: Dispatcher<NoopHandler, MockClaim> = Dispatcher::new(MockClaim::default());
        assert_eq!(table.dispatch(), WakeHint::NONE);
        assert_eq!(table.controller().claims.load(Ordering::SeqCst), 1);
        assert!(table.controller().completed.lock().unwrap().is_empty());
    }

    #[test]
    fn replace_and_unregister() {
        let first = Counting::new(WakeHint::NONE);
        let second = Counting::new(WakeHint::YIELD);
        let mut table: Dispatcher<&Counting, MockClaim> = Dispatcher::new(MockClaim::default());

        table.register(7, &first).unwrap();
        let old = table.register(7, &second).unwrap();
        assert!(old.is_some_and(|h| core::ptr::eq(h, &first)));

        table.controller().raise(7);
        assert!(table.dispatch().needs_yield());
        assert_eq!((first.calls(), second.calls()), (0, 1));

        assert!(table.unregister(7).is_some());
        assert!(!table.is_registered(7));
        assert!(table.unregister(7).is_none());
        assert!(table.unregister(99).is_none());

        table.controller().raise(7);
        assert_eq!(table.dispatch(), WakeHint::NONE);
        assert_eq!(second.calls(), 1);
    }

    #[test]
    fn wake_hint_combines() {
        let mut hint = WakeHint::NONE;
        hint |= WakeHint::NONE;
        assert!(!hint.needs_yield());
        hint |= WakeHint::from(true);
        assert!(hint.needs_yield());
        assert_eq!(WakeHint::NONE | WakeHint::YIELD, WakeHint::YIELD);
        assert_eq!(WakeHint::default(), WakeHint::NONE);
    }
}
