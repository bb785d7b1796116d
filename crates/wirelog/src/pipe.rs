//! Queue + arena pair shared by both in-process channel kinds.

use crate::arena::ByteArena;
use crate::arg::{self, Encodable};
use crate::backoff::Backoff;
use crate::config::{ChannelConfig, Contention, OverflowPolicy};
use crate::error::ChannelError;
use crate::queue::{Gate, SpinQueue};
use std::sync::atomic::{AtomicU64, Ordering};

/// Staged argument block: arena offset plus total byte length. A zero-length
/// block marks an occurrence with no array payload and no argument records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArenaBlock {
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

/// The producer gate serialises staging against the descriptor push, so
/// arena order always matches queue order and the consumer can release
/// blocks in pop order. The queue itself runs gate-free: this gate is the
/// channel's multi-producer latch, and the consumer half is unique.
pub(crate) struct Pipe<D> {
    pub(crate) queue: SpinQueue<D>,
    pub(crate) arena: ByteArena,
    gate: Gate,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl<D: Copy> Pipe<D> {
    pub(crate) fn new(config: &ChannelConfig) -> Self {
        Self {
            queue: SpinQueue::new(
                config.queue_capacity,
                Contention::Single,
                Contention::Single,
            ),
            arena: ByteArena::new(config.arena_capacity),
            gate: Gate::new(config.producers),
            policy: config.overflow,
            dropped: AtomicU64::new(0),
        }
    }

    /// Stage the arguments and push the descriptor, honouring the overflow
    /// policy.
    pub(crate) fn produce(
        &self,
        args: &[&dyn Encodable],
        make: impl Fn(ArenaBlock) -> D,
    ) -> Result<(), ChannelError> {
        let len = arg::staged_len(args);
        if len >= self.arena.capacity() {
            // can never fit, under any policy
            return Err(self.account(ChannelError::ArenaFull { needed: len }));
        }

        let mut backoff = Backoff::new();
        loop {
            match self.try_produce(args, len, &make) {
                Ok(()) => return Ok(()),
                Err(err) => match self.policy {
                    OverflowPolicy::Block => backoff.wait(),
                    OverflowPolicy::Drop | OverflowPolicy::Fail => {
                        return Err(self.account(err));
                    }
                },
            }
        }
    }

    fn try_produce(
        &self,
        args: &[&dyn Encodable],
        len: u32,
        make: &impl Fn(ArenaBlock) -> D,
    ) -> Result<(), ChannelError> {
        self.gate.lock();
        let outcome = (|| {
            if self.queue.is_full() {
                return Err(ChannelError::QueueFull);
            }
            let block = if len == 0 {
                ArenaBlock { offset: 0, len: 0 }
            } else {
                let offset = self.arena.try_acquire(len)?;
                // SAFETY: the block was acquired above and is released only
                // by the consumer, after it pops the descriptor pushed below.
                arg::stage_args(args, unsafe { self.arena.block_mut(offset, len) });
                ArenaBlock { offset, len }
            };
            let pushed = self.queue.try_push(make(block));
            debug_assert!(pushed, "descriptor queue filled behind the producer gate");
            Ok(())
        })();
        self.gate.unlock();
        outcome
    }

    /// Push a bare descriptor (attribute publication), spinning past any
    /// backpressure regardless of the overflow policy.
    pub(crate) fn push_blocking(&self, slot: D) {
        let mut backoff = Backoff::new();
        loop {
            self.gate.lock();
            let pushed = self.queue.try_push(slot);
            self.gate.unlock();
            if pushed {
                return;
            }
            backoff.wait();
        }
    }

    fn account(&self, err: ChannelError) -> ChannelError {
        if matches!(self.policy, OverflowPolicy::Drop) && err.is_overflow() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        err
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
