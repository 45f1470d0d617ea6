use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
use core::sync::atomic::{AtomicU8, Ordering};

use event_listener::Event;
use kerrno::{KResult, ensure, k_err};
use ksync::{NO_WAIT, TaskOps, Ticks, WAIT_FOREVER, deadline_after};
use spin::Mutex;

/// Largest buffer a pool hands out.
pub const MAX_BUFFER_LEN: usize = 65535;

/// Lifecycle of a pool slot.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufState {
    /// In the pool, ready to be acquired.
    Free = 0,
    /// Owned by a driver task or a transmit caller.
    Acquired = 1,
    /// Handed to the downstream consumer through the forwarding queue.
    Forwarded = 2,
}

impl BufState {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Acquired,
            2 => Self::Forwarded,
            _ => Self::Free,
        }
    }
}

/// A network buffer on loan from a [`NetBufPool`].
///
/// Move-only: it goes back to the pool exactly once, when dropped or passed
/// to [`NetBufPool::release`]. Holding a `NetBuf` is the only way to reach
/// its bytes, so a released buffer cannot be touched again.
///
/// ```text
///   ____________ capacity ____________
///  /                                  \
/// +------------------+-----------------+
/// |     Payload      |     Unused      |
/// +------------------+-----------------+
///  \__ len ________/
/// ```
pub struct NetBuf {
    slot: usize,
    len: usize,
    buf: Box<[u8]>,
    pool: Arc<NetBufPool>,
}

impl NetBuf {
    /// Index of the pool slot backing this buffer.
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns the length of the payload.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the payload is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the length of the payload.
    pub fn set_len(&mut self, len: usize) -> KResult {
        ensure!(len <= self.capacity(), k_err!(InvalidInput, "payload beyond buffer"));
        self.len = len;
        Ok(())
    }

    /// Returns the payload.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns the mutable reference to the payload.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }

    /// Returns the mutable reference to the entire buffer.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// The pool this buffer returns to.
    pub fn pool(&self) -> &Arc<NetBufPool> {
        &self.pool
    }

    pub fn state(&self) -> BufState {
        self.pool.slot_state(self.slot)
    }

    /// Records that the buffer now belongs to the downstream consumer.
    ///
    /// Must happen before the buffer becomes visible to the consumer; undo it
    /// with [`NetBuf::unmark_forwarded`] if the hand-off fails.
    pub fn mark_forwarded(&self) {
        let prev = self.pool.states[self.slot].swap(BufState::Forwarded as u8, Ordering::AcqRel);
        debug_assert_eq!(BufState::from_u8(prev), BufState::Acquired, "buffer forwarded twice");
    }

    /// Takes the buffer back from a failed forward.
    pub fn unmark_forwarded(&self) {
        let prev = self.pool.states[self.slot].swap(BufState::Acquired as u8, Ordering::AcqRel);
        debug_assert_eq!(BufState::from_u8(prev), BufState::Forwarded);
    }
}

impl core::fmt::Debug for NetBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetBuf")
            .field("slot", &self.slot)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Drop for NetBuf {
    /// Returns the buffer to the [`NetBufPool`].
    fn drop(&mut self) {
        let buf = core::mem::take(&mut self.buf);
        self.pool.release_slot(self.slot, buf);
    }
}

/// A bounded pool of equally sized [`NetBuf`]s.
///
/// Every buffer is allocated when the pool is created; acquiring and
/// releasing only move them between the free list and their owners.
pub struct NetBufPool {
    slot_count: usize,
    buf_len: usize,
    free: Mutex<Vec<(usize, Box<[u8]>)>>,
    states: Box<[AtomicU8]>,
    released: Event,
}

impl NetBufPool {
    /// Creates a new pool with the given `slot_count`, and all buffer lengths are
    /// set to `buf_len`.
    pub fn new(slot_count: usize, buf_len: usize) -> KResult<Arc<Self>> {
        ensure!(slot_count > 0, k_err!(InvalidInput, "empty buffer pool"));
        ensure!(
            (1..=MAX_BUFFER_LEN).contains(&buf_len),
            k_err!(InvalidInput, "buffer length out of range")
        );

        let free = (0..slot_count)
            .rev()
            .map(|slot| (slot, vec![0u8; buf_len].into_boxed_slice()))
            .collect();
        let states: Box<[AtomicU8]> = (0..slot_count).map(|_| AtomicU8::new(BufState::Free as u8)).collect();
        debug!("net buffer pool: {slot_count} x {buf_len} bytes");
        Ok(Arc::new(Self {
            slot_count,
            buf_len,
            free: Mutex::new(free),
            states,
            released: Event::new(),
        }))
    }

    /// Returns the capacity of the pool.
    pub const fn capacity(&self) -> usize {
        self.slot_count
    }

    /// Returns the length of each buffer.
    pub const fn buffer_len(&self) -> usize {
        self.buf_len
    }

    /// Number of buffers currently in the pool.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Lifecycle state of slot `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not below [`capacity`](Self::capacity).
    pub fn slot_state(&self, slot: usize) -> BufState {
        BufState::from_u8(self.states[slot].load(Ordering::Acquire))
    }

    /// Takes a buffer holding `size` bytes without blocking.
    ///
    /// Returns `None` if the pool is empty or `size` exceeds
    /// [`buffer_len`](Self::buffer_len).
    pub fn try_acquire(self: &Arc<Self>, size: usize) -> Option<NetBuf> {
        if size > self.buf_len {
            debug!("net buffer request of {size} bytes exceeds {}", self.buf_len);
            return None;
        }
        let (slot, buf) = self.free.lock().pop()?;
        let prev = self.states[slot].swap(BufState::Acquired as u8, Ordering::AcqRel);
        debug_assert_eq!(BufState::from_u8(prev), BufState::Free, "slot {slot} issued twice");
        Some(NetBuf {
            slot,
            len: size,
            buf,
            pool: Arc::clone(self),
        })
    }

    /// Takes a buffer holding `size` bytes, waiting up to `timeout` ticks for
    /// one to be released.
    pub fn acquire<T: TaskOps + ?Sized>(
        self: &Arc<Self>,
        tasks: &T,
        size: usize,
        timeout: Ticks,
    ) -> Option<NetBuf> {
        if size > self.buf_len {
            return self.try_acquire(size);
        }
        if let Some(buf) = self.try_acquire(size) {
            return Some(buf);
        }
        if timeout == NO_WAIT {
            return None;
        }

        let deadline = deadline_after(tasks.now(), timeout);
        loop {
            let listener = self.released.listen();
            if let Some(buf) = self.try_acquire(size) {
                return Some(buf);
            }
            if deadline != WAIT_FOREVER && tasks.now() >= deadline {
                return None;
            }
            tasks.wait_until(listener, deadline);
        }
    }

    /// Returns `buf` to the pool.
    ///
    /// Equivalent to dropping it. `buf` must come from this pool.
    pub fn release(&self, buf: NetBuf) {
        debug_assert!(core::ptr::eq(Arc::as_ptr(&buf.pool), self), "foreign buffer released");
        drop(buf);
    }

    fn release_slot(&self, slot: usize, buf: Box<[u8]>) {
        let prev = self.states[slot].swap(BufState::Free as u8, Ordering::AcqRel);
        debug_assert_ne!(BufState::from_u8(prev), BufState::Free, "slot {slot} released twice");
        self.free.lock().push((slot, buf));
        self.released.notify(1);
    }
}

impl core::fmt::Debug for NetBufPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetBufPool")
            .field("capacity", &self.slot_count)
            .field("buffer_len", &self.buf_len)
            .field("available", &self.available())
            .finish()
    }
}
