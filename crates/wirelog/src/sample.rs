//! In-process sample channel.
//!
//! Samples are fixed-schema tuples: the tag sequence is set at construction,
//! published to the formatter once, and every sample is validated against it
//! before anything is staged or enqueued.

use crate::arg::{self, Encodable, Tag};
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::fmt::SampleFormatter;
use crate::pipe::{ArenaBlock, Pipe};
use crate::sink::Sink;
use std::sync::Arc;

/// Queue descriptor of the sample channel.
#[derive(Clone, Copy)]
struct SampleSlot {
    block: ArenaBlock,
}

struct SampleCore {
    pipe: Pipe<SampleSlot>,
    schema: Box<[Tag]>,
}

/// Factory for the two ends of an in-process sample channel.
pub struct SampleChannel;

impl SampleChannel {
    /// Build a channel over the given tag schema.
    ///
    /// # Panics
    ///
    /// Panics if the schema is empty.
    pub fn create<F, S>(
        formatter: F,
        sink: S,
        config: ChannelConfig,
        schema: Vec<Tag>,
    ) -> (SampleProducer, SampleConsumer<F, S>)
    where
        F: SampleFormatter,
        S: Sink,
    {
        assert!(!schema.is_empty(), "sample schema cannot be empty");
        let core = Arc::new(SampleCore {
            pipe: Pipe::new(&config),
            schema: schema.into_boxed_slice(),
        });
        (
            SampleProducer {
                core: Arc::clone(&core),
            },
            SampleConsumer {
                core,
                formatter,
                sink,
                schema_sent: false,
            },
        )
    }
}

/// Producer half of a sample channel.
#[derive(Clone)]
pub struct SampleProducer {
    core: Arc<SampleCore>,
}

impl SampleProducer {
    /// The tag sequence every sample must match.
    pub fn schema(&self) -> &[Tag] {
        &self.core.schema
    }

    /// Validate against the schema and enqueue one sample.
    ///
    /// A mismatching sample fails with [`ChannelError::SchemaMismatch`] and
    /// is not enqueued.
    pub fn log_sample(&self, args: &[&dyn Encodable]) -> Result<(), ChannelError> {
        let schema = &self.core.schema;
        if args.len() != schema.len() {
            return Err(ChannelError::SchemaMismatch {
                index: args.len().min(schema.len()),
            });
        }
        for (index, (arg, expected)) in args.iter().zip(schema.iter()).enumerate() {
            if arg.tag() != *expected {
                return Err(ChannelError::SchemaMismatch { index });
            }
        }
        self.core.pipe.produce(args, |block| SampleSlot { block })
    }

    /// Samples dropped so far under the `Drop` overflow policy.
    pub fn dropped_samples(&self) -> u64 {
        self.core.pipe.dropped()
    }
}

/// Consumer half; owns the formatter and sink.
pub struct SampleConsumer<F, S> {
    core: Arc<SampleCore>,
    formatter: F,
    sink: S,
    schema_sent: bool,
}

impl<F: SampleFormatter, S: Sink> SampleConsumer<F, S> {
    /// Drain one sample. `Ok(false)` iff the queue was empty.
    ///
    /// The schema is handed to the formatter exactly once, before the first
    /// sample.
    pub fn try_process_one(&mut self) -> Result<bool, ChannelError> {
        if !self.schema_sent {
            let Self {
                core,
                formatter,
                sink,
                ..
            } = self;
            formatter.format_expected_types(sink, &core.schema)?;
            self.schema_sent = true;
        }

        let Self {
            core,
            formatter,
            sink,
            ..
        } = self;

        let Some(slot) = core.pipe.queue.try_pop() else {
            return Ok(false);
        };

        let argc = core.schema.len();
        // SAFETY: the block belongs to this descriptor until the release
        // below, and the producer staged it before the push.
        let bytes = unsafe { core.pipe.arena.block(slot.block.offset, slot.block.len) };
        let outcome = arg::with_decoded_args(bytes, argc, |bound| {
            formatter.format_values(sink, bound)
        });
        if slot.block.len > 0 {
            core.pipe.arena.release(slot.block.len);
        }
        outcome??;
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

    /// Samples dropped so far under the `Drop` overflow policy.
    pub fn dropped_samples(&self) -> u64 {
        self.core.pipe.dropped()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
