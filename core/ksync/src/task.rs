//! The scheduler services that blocking primitives rely on.

use core::num::NonZeroUsize;

use event_listener::EventListener;

/// Scheduler tick count.
pub type Ticks = u64;

/// Task priority, higher values are more urgent.
pub type Priority = u8;

/// Identifies a task to [`TaskOps::wake_task`].
pub type TaskId = NonZeroUsize;

/// Timeout that makes a wait return immediately.
pub const NO_WAIT: Ticks = 0;

/// Timeout that makes a wait never expire.
pub const WAIT_FOREVER: Ticks = Ticks::MAX;

/// Operations provided by the task scheduler.
///
/// The I/O core never schedules anything itself: it blocks, sleeps and asks
/// for the running priority through this trait, so any cooperative or
/// priority scheduler can host it.
pub trait TaskOps: Send + Sync {
    /// Current tick count.
    fn now(&self) -> Ticks;

    /// Priority of the task that is running on this CPU, or of the task that
    /// was interrupted when called from interrupt context.
    fn current_priority(&self) -> Priority;

    /// Blocks the calling task until `listener` is notified or the tick count
    /// reaches `deadline`.
    ///
    /// Returns `true` if the listener was notified. A `deadline` of
    /// [`WAIT_FOREVER`] never expires.
    fn wait_until(&self, listener: EventListener, deadline: Ticks) -> bool;

    /// Identifier of the calling task.
    fn current_task(&self) -> TaskId;

    /// Blocks the calling task until it is woken with
    /// [`wake_task`](Self::wake_task) or the tick count reaches `deadline`.
    ///
    /// A wake that arrives while the task is still running is remembered and
    /// makes the next call return at once. Spurious returns are allowed.
    fn park_until(&self, deadline: Ticks);

    /// Makes `task` runnable again.
    ///
    /// Called from interrupt context, so it must neither block nor allocate.
    fn wake_task(&self, task: TaskId);

    /// Suspends the calling task for `ticks` ticks.
    fn sleep(&self, ticks: Ticks);
}

/// Absolute deadline for a wait of `timeout` ticks starting at `now`.
#[inline]
pub const fn deadline_after(now: Ticks, timeout: Ticks) -> Ticks {
    if timeout == WAIT_FOREVER {
        WAIT_FOREVER
    } else {
        now.saturating_add(timeout)
    }
}
