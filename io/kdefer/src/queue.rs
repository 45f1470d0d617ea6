//! The bounded hand-off from the receive task to the protocol stack.

use alloc::sync::Arc;

use event_listener::Event;
use kerrno::{KError, KResult};
use ksync::{NO_WAIT, TaskOps, Ticks, WAIT_FOREVER, deadline_after};
use net::NetBuf;
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};

/// Where the receive task forwards admitted frames.
///
/// Forwarding never blocks: a sink that cannot take the frame hands it back
/// and the caller drops it.
pub trait RxSink {
    fn try_forward(&mut self, buf: NetBuf) -> Result<(), NetBuf>;
}

/// Creates a forwarding queue holding up to `capacity` frames.
///
/// Both ends live in task context.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn rx_channel(capacity: usize) -> (RxProducer, RxConsumer) {
    let (prod, cons) = HeapRb::<NetBuf>::new(capacity).split();
    let pushed = Arc::new(Event::new());
    (
        RxProducer {
            prod,
            pushed: pushed.clone(),
        },
        RxConsumer { cons, pushed },
    )
}

/// Sending half of the forwarding queue, owned by the receive task.
pub struct RxProducer {
    prod: HeapProd<NetBuf>,
    pushed: Arc<Event>,
}

impl RxProducer {
    pub fn is_full(&self) -> bool {
        self.prod.is_full()
    }
}

impl RxSink for RxProducer {
    fn try_forward(&mut self, buf: NetBuf) -> Result<(), NetBuf> {
        // The consumer may release the buffer as soon as it is pushed.
        buf.mark_forwarded();
        match self.prod.try_push(buf) {
            Ok(()) => {
                self.pushed.notify(1);
                Ok(())
            }
            Err(buf) => {
                buf.unmark_forwarded();
                Err(buf)
            }
        }
    }
}

/// Receiving half of the forwarding queue, owned by the protocol stack.
///
/// Frames leave the queue still marked as forwarded; dropping them returns
/// them to their pool.
pub struct RxConsumer {
    cons: HeapCons<NetBuf>,
    pushed: Arc<Event>,
}

impl RxConsumer {
    /// Takes the oldest frame without blocking.
    pub fn try_recv(&mut self) -> Option<NetBuf> {
        self.cons.try_pop()
    }

    /// Waits up to `timeout` ticks for a frame.
    pub fn recv<T: TaskOps + ?Sized>(&mut self, tasks: &T, timeout: Ticks) -> KResult<NetBuf> {
        if let Some(buf) = self.cons.try_pop() {
            return Ok(buf);
        }
        if timeout == NO_WAIT {
            return Err(KError::TimedOut);
        }

        let deadline = deadline_after(tasks.now(), timeout);
        loop {
            let listener = self.pushed.listen();
            if let Some(buf) = self.cons.try_pop() {
                return Ok(buf);
            }
            if deadline != WAIT_FOREVER && tasks.now() >= deadline {
                return Err(KError::TimedOut);
            }
            tasks.wait_until(listener, deadline);
        }
    }

    /// Frames waiting in the queue.
    pub fn len(&self) -> usize {
        self.cons.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }

    /// Frames the queue holds at most.
    pub fn capacity(&self) -> usize {
        self.cons.capacity().get()
    }
}
