use crate::backoff::Backoff;
use crate::error::ChannelError;
use crate::invariants::{debug_assert_cursor_in_window, debug_assert_live_bounded};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::hint;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

// =============================================================================
// CURSOR PROTOCOL
// =============================================================================
//
// Two cursors walk the buffer: `head` (producer, next free byte) and `tail`
// (consumer, oldest live byte). The live region is [tail, head) when
// head >= tail, otherwise it wraps: [tail, cap_eff) followed by [0, head).
//
// A reservation never straddles the physical end of the buffer. When the
// bytes between `head` and the end cannot hold a request, either:
//   - the request fits exactly: the block ends at the physical end and the
//     head wraps to 0 with `cap_eff = capacity`, or
//   - the trailing bytes are discarded: the block starts at 0 and
//     `cap_eff = head_old` records where the consumer must wrap.
//
// `cap_eff` is consulted only while the region is wrapped (head < tail). It
// is written inside the producer latch, before the head moves, so a consumer
// that observes the wrapped state also observes the matching window.
//
// One producer and one consumer per arena. The two latches serialise retries
// on each end; data visibility rides on the channel queue's release/acquire
// pair, not on the cursors.
//
// =============================================================================

/// Bounded single-producer / single-consumer circular byte allocator.
///
/// `try_acquire` reserves bytes at the producer end, `release` frees the
/// oldest bytes at the consumer end, in strict FIFO order. Blocks are always
/// physically contiguous.
pub struct ByteArena {
    /// Producer cursor: offset one past the newest live byte.
    head: CachePadded<AtomicU32>,
    /// Consumer cursor: offset of the oldest live byte.
    tail: CachePadded<AtomicU32>,
    /// Offset at which the consumer cursor wraps while the region is split.
    cap_eff: AtomicU32,
    /// Producer-end retry latch.
    acquiring: AtomicBool,
    /// Consumer-end retry latch.
    releasing: AtomicBool,
    capacity: u32,
    buf: UnsafeCell<Box<[u8]>>,
}

// Safety: the byte buffer is only touched through `block`/`block_mut` on
// regions owned exclusively by one end at a time; cursors are atomics.
unsafe impl Send for ByteArena {}
unsafe impl Sync for ByteArena {}

impl ByteArena {
    /// Creates an arena with `capacity` bytes of payload storage.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity >= 2, "arena capacity must be at least 2 bytes");
        Self {
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            cap_eff: AtomicU32::new(capacity),
            acquiring: AtomicBool::new(false),
            releasing: AtomicBool::new(false),
            capacity,
            buf: UnsafeCell::new(vec![0u8; capacity as usize].into_boxed_slice()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Live byte count. Exact at quiescence, a snapshot under concurrency.
    pub fn used(&self) -> u32 {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            (self.cap_eff.load(Ordering::Acquire) - tail) + head
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Reserve `n` contiguous bytes at the producer end.
    ///
    /// Returns the block offset, or [`ChannelError::ArenaFull`] when the free
    /// region cannot hold `n` bytes in one span.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn try_acquire(&self, n: u32) -> Result<u32, ChannelError> {
        assert!(n > 0, "zero-length acquire");
        let full = Err(ChannelError::ArenaFull { needed: n });
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);

        let acquired = if head < tail {
            // wrapped: free bytes are the gap [head, tail)
            if n < tail - head {
                self.advance_head(head, head + n, None).then_some(head)
            } else {
                None
            }
        } else if n < self.capacity - head {
            self.advance_head(head, head + n, None).then_some(head)
        } else if n == self.capacity - head && tail > 0 {
            // exact fit at the physical end; the consumer wraps at full
            // capacity
            self.advance_head(head, 0, Some(self.capacity)).then_some(head)
        } else if n < tail {
            // the trailing bytes cannot hold `n`: discard them, restart at
            // the front, and record where the live window now wraps
            self.advance_head(head, n, Some(head)).then_some(0)
        } else {
            None
        };

        match acquired {
            Some(offset) => {
                debug_assert_live_bounded!(self.used(), self.capacity);
                Ok(offset)
            }
            None => full,
        }
    }

    /// Reserve `n` bytes, spinning with adaptive backoff until space frees.
    pub fn acquire(&self, n: u32) -> u32 {
        let mut backoff = Backoff::new();
        loop {
            if let Ok(offset) = self.try_acquire(n) {
                return offset;
            }
            backoff.wait();
        }
    }

    /// Free the oldest `n` bytes. Returns false when fewer than `n` bytes
    /// are live.
    ///
    /// Releases must follow acquire order; `n` may cover several blocks but
    /// must end on a block boundary.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn try_release(&self, n: u32) -> bool {
        assert!(n > 0, "zero-length release");
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail <= head {
            if head - tail >= n {
                return self.advance_tail(tail, tail + n);
            }
        } else {
            let window = self.cap_eff.load(Ordering::Acquire);
            let live = (window - tail) + head;
            if n <= live {
                let new_tail = (tail + n) % window;
                debug_assert_cursor_in_window!(new_tail, window);
                return self.advance_tail(tail, new_tail);
            }
        }
        false
    }

    /// Free the oldest `n` bytes, spinning until they are live.
    pub fn release(&self, n: u32) {
        let mut backoff = Backoff::new();
        while !self.try_release(n) {
            backoff.wait();
        }
    }

    fn advance_head(&self, old: u32, new: u32, window: Option<u32>) -> bool {
        while self.acquiring.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }
        if let Some(window) = window {
            self.cap_eff.store(window, Ordering::Release);
        }
        let moved = self
            .head
            .compare_exchange(old, new, Ordering::Release, Ordering::Relaxed)
            .is_ok();
        self.acquiring.store(false, Ordering::Release);
        moved
    }

    fn advance_tail(&self, old: u32, new: u32) -> bool {
        while self.releasing.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }
        let moved = self
            .tail
            .compare_exchange(old, new, Ordering::Release, Ordering::Relaxed)
            .is_ok();
        self.releasing.store(false, Ordering::Release);
        moved
    }

    /// Mutable access to an acquired block.
    ///
    /// # Safety
    ///
    /// `offset` must come from `try_acquire(len)` and the block must not have
    /// been released. The caller is the only holder of the block.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn block_mut(&self, offset: u32, len: u32) -> &mut [u8] {
        let buf = &mut *self.buf.get();
        &mut buf[offset as usize..(offset + len) as usize]
    }

    /// Shared access to a staged block the consumer has dequeued but not yet
    /// released.
    ///
    /// # Safety
    ///
    /// The block must be live and the producer must have published it (the
    /// descriptor pop provides the synchronisation).
    pub(crate) unsafe fn block(&self, offset: u32, len: u32) -> &[u8] {
        let buf = &*self.buf.get();
        &buf[offset as usize..(offset + len) as usize]
    }
}
