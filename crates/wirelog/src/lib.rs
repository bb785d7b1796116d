//! wirelog - low-overhead structured diagnostics fabric.
//!
//! Captures two kinds of telemetry from a running process: discrete
//! **events** (source-location-annotated, typed, variable arguments) and
//! periodic **samples** (fixed-schema tuples). Producing threads are
//! decoupled from consumers over a bounded lockless queue; variable-sized
//! argument payloads are staged through a bounded circular arena, so the
//! hot paths never touch the heap.
//!
//! # Architecture
//!
//! - [`Tag`] / [`Arg`] / [`Encodable`]: the closed typed-argument model,
//!   with one 16-byte little-endian wire form shared by the in-process
//!   arena and the network transport (`wirelog-net`).
//! - [`ByteArena`]: bounded SPSC circular byte allocator for payloads.
//! - [`SpinQueue`]: bounded lockless descriptor queue.
//! - [`CallSite`] / [`AttributeRegistry`]: call-site metadata registered
//!   once per process, published to consumers before any occurrence.
//! - [`EventChannel`] / [`SampleChannel`]: the producer/consumer pairs.
//! - [`Sink`] / [`EventFormatter`] / [`SampleFormatter`]: the output
//!   boundary; plug in anything that can take bytes.
//!
//! # Example
//!
//! ```
//! use wirelog::{
//!     log_event, ChannelConfig, EventChannel, FlatBufferSink,
//!     PlainTextEventFormatter,
//! };
//!
//! let (producer, mut consumer) = EventChannel::create(
//!     PlainTextEventFormatter::new(),
//!     FlatBufferSink::new(4096),
//!     ChannelConfig::default(),
//! );
//!
//! log_event!(producer, "worker started on shard {}", 3u32).unwrap();
//!
//! // typically on a dedicated draining thread
//! while consumer.try_process_one().unwrap() {}
//! assert!(consumer.sink().written().starts_with(b"[ "));
//! ```

mod arena;
mod arg;
mod backoff;
mod config;
mod error;
mod event;
mod fmt;
mod invariants;
mod macros;
mod pipe;
mod queue;
mod registry;
mod sample;
mod sink;

pub use arena::ByteArena;
pub use arg::{
    read_arg, stage_args, staged_len, with_decoded_args, write_arg, Arg, ArrayView, BoundArg,
    Encodable, EpochNanos, Tag, ThreadId, Value, ARG_WIRE_SIZE, MAX_INLINE_ARGS, TAG_ARRAY_BIT,
    TAG_COUNT_SENTINEL,
};
pub use backoff::Backoff;
pub use config::{
    ChannelConfig, Contention, OverflowPolicy, HIGH_THROUGHPUT_CONFIG, LOW_FOOTPRINT_CONFIG,
};
pub use error::{ChannelError, DecodeError};
pub use event::{EventChannel, EventConsumer, EventProducer};
pub use fmt::{
    DummyEventFormatter, DummySampleFormatter, EventFormatter, PlainTextEventFormatter,
    PlainTextSampleFormatter, SampleFormatter,
};
pub use queue::SpinQueue;
pub use registry::{AttributeRegistry, CallSite, EventAttributes, EventId, EventMeta};
pub use sample::{SampleChannel, SampleConsumer, SampleProducer};
pub use sink::{write_all, FlatBufferSink, Sink, StreamSink};
