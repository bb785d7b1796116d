use crate::backoff::Backoff;
use crate::config::Contention;
use crate::invariants::debug_assert_slot_in_range;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::hint;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Admission gate for one queue end.
///
/// `Contention::Single` compiles down to a free pass; `Contention::Multi`
/// serialises the end with an atomic test-and-set latch.
pub(crate) struct Gate {
    contended: bool,
    flag: AtomicBool,
}

impl Gate {
    pub(crate) fn new(contention: Contention) -> Self {
        Self {
            contended: matches!(contention, Contention::Multi),
            flag: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn try_lock(&self) -> bool {
        !self.contended || !self.flag.swap(true, Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn lock(&self) {
        while !self.try_lock() {
            hint::spin_loop();
        }
    }

    #[inline]
    pub(crate) fn unlock(&self) {
        if self.contended {
            self.flag.store(false, Ordering::Release);
        }
    }
}

type OverflowHook = Box<dyn Fn() + Send + Sync>;

/// Lockless bounded FIFO of trivially-copyable descriptors.
///
/// One slot is sacrificed to tell full from empty: a queue built with
/// capacity `K` holds at most `K - 1` items. Each end is guarded by a gate
/// selected at construction; with both ends `Single` the queue is a plain
/// SPSC ring, with `Multi` the latch serialises the contending end.
pub struct SpinQueue<T> {
    /// Push cursor.
    head: CachePadded<AtomicU32>,
    /// Pop cursor.
    tail: CachePadded<AtomicU32>,
    push_gate: Gate,
    pop_gate: Gate,
    capacity: u32,
    on_overflow: Option<OverflowHook>,
    slots: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// Safety: slot access is fenced by the cursor release/acquire pairs and the
// per-end gates; T is restricted to Copy payloads.
unsafe impl<T: Send> Send for SpinQueue<T> {}
unsafe impl<T: Send> Sync for SpinQueue<T> {}

impl<T: Copy> SpinQueue<T> {
    /// Creates a queue with `capacity` slots and the given end strategies.
    pub fn new(capacity: u32, push: Contention, pop: Contention) -> Self {
        assert!(capacity >= 2, "queue capacity must be at least 2");
        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, MaybeUninit::uninit);
        Self {
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            push_gate: Gate::new(push),
            pop_gate: Gate::new(pop),
            capacity,
            on_overflow: None,
            slots: UnsafeCell::new(slots.into_boxed_slice()),
        }
    }

    /// Install a callback fired on every failed `try_push`.
    pub fn with_overflow_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_overflow = Some(Box::new(hook));
        self
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Item count snapshot.
    pub fn len(&self) -> u32 {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + self.capacity - tail) % self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + 1) % self.capacity == tail
    }

    /// Enqueue without blocking. Returns false when the queue is full or the
    /// push gate is held.
    pub fn try_push(&self, item: T) -> bool {
        if !self.push_gate.try_lock() {
            self.notify_overflow();
            return false;
        }
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % self.capacity;
        let tail = self.tail.load(Ordering::Acquire);

        let pushed = if next != tail {
            debug_assert_slot_in_range!(head, self.capacity);
            // SAFETY: the gate admits one pusher at a time and slot `head`
            // is outside the live window [tail, head), so no reader touches
            // it before the release store below publishes it.
            unsafe {
                (*self.slots.get())[head as usize].write(item);
            }
            self.head.store(next, Ordering::Release);
            true
        } else {
            false
        };
        self.push_gate.unlock();

        if !pushed {
            self.notify_overflow();
        }
        pushed
    }

    /// Dequeue without blocking.
    pub fn try_pop(&self) -> Option<T> {
        if !self.pop_gate.try_lock() {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        let item = if tail != head {
            debug_assert_slot_in_range!(tail, self.capacity);
            // SAFETY: slot `tail` was written before the pusher's release
            // store on `head`, which the acquire load above synchronises
            // with; T: Copy so the read leaves the slot inert.
            let item = unsafe { (*self.slots.get())[tail as usize].assume_init_read() };
            self.tail.store((tail + 1) % self.capacity, Ordering::Release);
            Some(item)
        } else {
            None
        };
        self.pop_gate.unlock();
        item
    }

    /// Enqueue, spinning with adaptive backoff until there is room.
    pub fn push(&self, item: T) {
        let mut backoff = Backoff::new();
        while !self.try_push(item) {
            backoff.wait();
        }
    }

    /// Dequeue, spinning until an item arrives.
    pub fn pop(&self) -> T {
        let mut backoff = Backoff::new();
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            backoff.wait();
        }
    }

    #[inline]
    fn notify_overflow(&self) {
        if let Some(hook) = &self.on_overflow {
            hook();
        }
    }
}
