//! In-process event channel.
//!
//! A channel is a pair of halves around one shared core: any number of
//! producer clones feeding one consumer that owns the formatter and sink.
//! Call sites register once (which publishes their attributes ahead of any
//! occurrence) and then log occurrences whose argument payloads are staged
//! through the channel's arena.

use crate::arg::{self, Encodable};
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::fmt::EventFormatter;
use crate::pipe::{ArenaBlock, Pipe};
use crate::registry::{CallSite, EventAttributes, EventMeta};
use crate::sink::Sink;
use std::sync::Arc;

/// Queue descriptor. `block == None` publishes the attributes only.
#[derive(Clone, Copy)]
struct EventSlot {
    attrs: &'static EventAttributes,
    block: Option<ArenaBlock>,
}

struct EventCore {
    pipe: Pipe<EventSlot>,
}

/// Factory for the two ends of an in-process event channel.
pub struct EventChannel;

impl EventChannel {
    /// Build a channel; hand the producer to the logging threads and drive
    /// the consumer from a draining thread.
    pub fn create<F, S>(
        formatter: F,
        sink: S,
        config: ChannelConfig,
    ) -> (EventProducer, EventConsumer<F, S>)
    where
        F: EventFormatter,
        S: Sink,
    {
        let core = Arc::new(EventCore {
            pipe: Pipe::new(&config),
        });
        (
            EventProducer {
                core: Arc::clone(&core),
            },
            EventConsumer {
                core,
                formatter,
                sink,
            },
        )
    }
}

/// Producer half. Clones share the channel; sharing across threads requires
/// the channel to be configured with `Contention::Multi` producers.
#[derive(Clone)]
pub struct EventProducer {
    core: Arc<EventCore>,
}

impl EventProducer {
    /// Resolve a call site, publishing its attributes to the consumer the
    /// first time it is seen. Idempotent per site.
    ///
    /// The publication ignores the overflow policy: an attributes record
    /// that never reaches the consumer would orphan every later occurrence.
    pub fn register_event(
        &self,
        site: &'static CallSite,
        meta: EventMeta,
    ) -> &'static EventAttributes {
        let attrs = site.attributes(&meta);
        if site.claim_publication() {
            self.core.pipe.push_blocking(EventSlot { attrs, block: None });
        }
        attrs
    }

    /// Stage the arguments and enqueue one occurrence.
    ///
    /// `args` must match the argument count the site was registered with;
    /// the logging macro guarantees this.
    pub fn log_event(
        &self,
        attrs: &'static EventAttributes,
        args: &[&dyn Encodable],
    ) -> Result<(), ChannelError> {
        debug_assert_eq!(args.len(), attrs.expected_argc as usize);
        self.core.pipe.produce(args, |block| EventSlot {
            attrs,
            block: Some(block),
        })
    }

    /// Events dropped so far under the `Drop` overflow policy.
    pub fn dropped_events(&self) -> u64 {
        self.core.pipe.dropped()
    }
}

/// Consumer half; owns the formatter and sink.
pub struct EventConsumer<F, S> {
    core: Arc<EventCore>,
    formatter: F,
    sink: S,
}

impl<F: EventFormatter, S: Sink> EventConsumer<F, S> {
    /// Drain one descriptor. `Ok(false)` iff the queue was empty.
    ///
    /// Arena bytes of an occurrence are released once the formatter call
    /// returns, whether it succeeded or not.
    pub fn try_process_one(&mut self) -> Result<bool, ChannelError> {
        let Self {
            core,
            formatter,
            sink,
        } = self;

        let Some(slot) = core.pipe.queue.try_pop() else {
            return Ok(false);
        };

        match slot.block {
            None => formatter.format_attributes(sink, slot.attrs)?,
            Some(block) => {
                let argc = slot.attrs.expected_argc as usize;
                // SAFETY: the block belongs to this descriptor until the
                // release below, and the producer staged it before the push.
                let bytes = unsafe { core.pipe.arena.block(block.offset, block.len) };
                let outcome = arg::with_decoded_args(bytes, argc, |bound| {
                    formatter.format_event(sink, slot.attrs, bound)
                });
                if block.len > 0 {
                    core.pipe.arena.release(block.len);
                }
                outcome??;
            }
        }
        Ok(true)
    }

    /// Drain until the queue is empty; returns the number processed.
    pub fn drain(&mut self) -> Result<u64, ChannelError> {
        let mut count = 0;
        while self.try_process_one()? {
            count += 1;
        }
        Ok(count)
    }

    /// Events dropped so far under the `Drop` overflow policy.
    pub fn dropped_events(&self) -> u64 {
        self.core.pipe.dropped()
    }

    /// Access the sink, e.g. to inspect an in-memory buffer.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
