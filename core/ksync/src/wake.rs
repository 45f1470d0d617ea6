//! A bounded counting signal for handing work from interrupt to task context.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use kerrno::{KError, KResult};

use crate::task::{NO_WAIT, Priority, TaskId, TaskOps, Ticks, WAIT_FOREVER, deadline_after};

const NO_WAITER: usize = 0;

/// A counting signal with a maximum count.
///
/// Interrupt handlers call [`give_from_irq`](Self::give_from_irq), which never
/// blocks or allocates: it bumps the counter and hands the blocked task, if
/// any, to [`TaskOps::wake_task`]. A task calls [`take`](Self::take) to wait
/// for the next event. Gives that arrive while the count is saturated are
/// coalesced, so the consumer must drain its source completely on every wake.
///
/// A signal with a maximum of one is the "data ready" flag: set by the ISR,
/// consumed exactly once by the task.
///
/// One task at a time blocks in `take`. A second concurrent taker polls the
/// count once per tick until its deadline.
pub struct WakeSignal {
    count: AtomicUsize,
    max: usize,
    // Held by the task that owns `waiter` while it is in `take`.
    taking: AtomicBool,
    // `TaskId` of the blocked task, `NO_WAITER` otherwise.
    waiter: AtomicUsize,
    // Written before `waiter` is published.
    waiter_priority: AtomicU8,
}

impl WakeSignal {
    /// Creates a signal that counts up to `max` pending events, starting at
    /// `initial`.
    ///
    /// # Panics
    ///
    /// Panics if `max` is zero or `initial` exceeds `max`.
    pub const fn counting(max: usize, initial: usize) -> Self {
        assert!(max > 0, "wake signal needs a positive maximum");
        assert!(initial <= max, "initial count above maximum");
        Self {
            count: AtomicUsize::new(initial),
            max,
            taking: AtomicBool::new(false),
            waiter: AtomicUsize::new(NO_WAITER),
            waiter_priority: AtomicU8::new(0),
        }
    }

    /// Creates a signal that holds at most one pending event.
    pub const fn binary() -> Self {
        Self::counting(1, 0)
    }

    /// Maximum number of pending events.
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Number of pending events.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether a task is currently blocked in [`take`](Self::take).
    pub fn has_waiter(&self) -> bool {
        self.waiter.load(Ordering::SeqCst) != NO_WAITER
    }

    /// Signals one event from interrupt context.
    ///
    /// The priority of the interrupted task is read from
    /// [`TaskOps::current_priority`]. Returns `true` if a blocked task with a
    /// strictly higher priority was woken, in which case the trap-return path
    /// should switch to it.
    pub fn give_from_irq<T: TaskOps + ?Sized>(&self, tasks: &T) -> bool {
        if !self.increment() {
            trace!("wake signal saturated at {}, event coalesced", self.max);
            return false;
        }
        self.wake_waiter(tasks)
            .is_some_and(|waiter| waiter > tasks.current_priority())
    }

    /// Signals one event from task context.
    ///
    /// Returns `false` if the count was already at its maximum.
    pub fn give<T: TaskOps + ?Sized>(&self, tasks: &T) -> bool {
        if !self.increment() {
            return false;
        }
        self.wake_waiter(tasks);
        true
    }

    /// Consumes one pending event without blocking.
    pub fn try_take(&self) -> bool {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1))
            .is_ok()
    }

    /// Waits up to `timeout` ticks for an event and consumes it.
    ///
    /// Returns [`KError::TimedOut`] if no event arrived in time, leaving the
    /// count untouched. [`NO_WAIT`] polls once; [`WAIT_FOREVER`] never times
    /// out.
    pub fn take<T: TaskOps + ?Sized>(&self, tasks: &T, timeout: Ticks) -> KResult {
        if self.try_take() {
            return Ok(());
        }
        if timeout == NO_WAIT {
            return Err(KError::TimedOut);
        }

        let deadline = deadline_after(tasks.now(), timeout);
        if self.taking.swap(true, Ordering::Acquire) {
            return self.poll_until(tasks, deadline);
        }

        // The waiter is visible before the count is checked again, so a give
        // that races with the checks below always finds it.
        self.waiter_priority
            .store(tasks.current_priority(), Ordering::Relaxed);
        self.waiter
            .store(tasks.current_task().get(), Ordering::SeqCst);
        let result = loop {
            if self.try_take() {
                break Ok(());
            }
            if expired(tasks, deadline) {
                break Err(KError::TimedOut);
            }
            tasks.park_until(deadline);
        };
        self.waiter.store(NO_WAITER, Ordering::SeqCst);
        self.taking.store(false, Ordering::Release);
        result
    }

    fn poll_until<T: TaskOps + ?Sized>(&self, tasks: &T, deadline: Ticks) -> KResult {
        loop {
            if self.try_take() {
                return Ok(());
            }
            if expired(tasks, deadline) {
                return Err(KError::TimedOut);
            }
            tasks.sleep(1);
        }
    }

    /// Wakes the blocked task, if any, and returns its priority.
    fn wake_waiter<T: TaskOps + ?Sized>(&self, tasks: &T) -> Option<Priority> {
        let task = TaskId::new(self.waiter.load(Ordering::SeqCst))?;
        let priority = self.waiter_priority.load(Ordering::Relaxed);
        tasks.wake_task(task);
        Some(priority)
    }

    fn increment(&self) -> bool {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < self.max).then(|| c + 1)
            })
            .is_ok()
    }
}

fn expired<T: TaskOps + ?Sized>(tasks: &T, deadline: Ticks) -> bool {
    deadline != WAIT_FOREVER && tasks.now() >= deadline
}

impl core::fmt::Debug for WakeSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WakeSignal")
            .field("count", &self.count())
            .field("max", &self.max)
            .field("has_waiter", &self.has_waiter())
            .finish()
    }
}
