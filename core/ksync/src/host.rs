//! [`TaskOps`] on top of OS threads, for hosted simulation and tests.

use std::{
    cell::Cell,
    ptr::NonNull,
    sync::atomic::{AtomicBool, Ordering},
    thread::{self, Thread},
    time::{Duration, Instant},
};

use event_listener::{EventListener, Listener};

use crate::task::{Priority, TaskId, TaskOps, Ticks, WAIT_FOREVER};

/// Wake state of one thread. Never freed, so a [`TaskId`] stays valid after
/// its thread exits.
struct Parker {
    thread: Thread,
    notified: AtomicBool,
}

std::thread_local! {
    static PRIORITY: Cell<Priority> = const { Cell::new(0) };
    static PARKER: &'static Parker = Box::leak(Box::new(Parker {
        thread: thread::current(),
        notified: AtomicBool::new(false),
    }));
}

/// Maps ticks onto wall-clock time and tasks onto threads.
///
/// The priority reported by [`TaskOps::current_priority`] is per thread and
/// set with [`HostTasks::set_current_priority`].
#[derive(Debug, Clone)]
pub struct HostTasks {
    epoch: Instant,
    tick: Duration,
}

impl HostTasks {
    /// Creates a clock where one tick lasts `tick`.
    pub fn new(tick: Duration) -> Self {
        assert!(!tick.is_zero(), "tick period must be positive");
        Self {
            epoch: Instant::now(),
            tick,
        }
    }

    /// Sets the priority of the calling thread.
    pub fn set_current_priority(priority: Priority) {
        PRIORITY.with(|p| p.set(priority));
    }

    /// Length of one tick.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    fn ticks_to_duration(&self, ticks: Ticks) -> Duration {
        let nanos = self.tick.as_nanos().saturating_mul(ticks as u128);
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

impl Default for HostTasks {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl TaskOps for HostTasks {
    fn now(&self) -> Ticks {
        (self.epoch.elapsed().as_nanos() / self.tick.as_nanos()) as Ticks
    }

    fn current_priority(&self) -> Priority {
        PRIORITY.with(Cell::get)
    }

    fn wait_until(&self, listener: EventListener, deadline: Ticks) -> bool {
        if deadline == WAIT_FOREVER {
            listener.wait();
            return true;
        }
        let at = self.epoch + self.ticks_to_duration(deadline);
        listener.wait_deadline(at).is_some()
    }

    fn current_task(&self) -> TaskId {
        PARKER.with(|p| NonNull::from(*p).addr())
    }

    fn park_until(&self, deadline: Ticks) {
        let parker = PARKER.with(|p| *p);
        let at = (deadline != WAIT_FOREVER).then(|| self.epoch + self.ticks_to_duration(deadline));
        while !parker.notified.swap(false, Ordering::Acquire) {
            match at {
                None => thread::park(),
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        return;
                    }
                    thread::park_timeout(at - now);
                }
            }
        }
    }

    fn wake_task(&self, task: TaskId) {
        // SAFETY: ids come from `current_task` and parkers are never freed.
        let parker = unsafe { &*(task.get() as *const Parker) };
        parker.notified.store(true, Ordering::Release);
        parker.thread.unpark();
    }

    fn sleep(&self, ticks: Ticks) {
        thread::sleep(self.ticks_to_duration(ticks));
    }
}
