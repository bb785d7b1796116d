//! Error types surfaced by the core fabric.

use thiserror::Error;

/// Failures while decoding staged or framed argument records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record claims more bytes than the buffer holds.
    #[error("argument record truncated: needed {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// A tag byte outside the recognised set.
    #[error("unsupported argument kind {0:#04x}")]
    UnsupportedArgumentKind(u8),
}

/// Errors surfaced by the in-process channels.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ChannelError {
    /// The producer could not reserve payload bytes in the argument arena.
    #[error("argument arena is full ({needed} bytes requested)")]
    ArenaFull {
        /// Bytes the failed reservation asked for.
        needed: u32,
    },

    /// The producer could not enqueue a descriptor.
    #[error("descriptor queue is full")]
    QueueFull,

    /// Sample argument count or tag sequence disagrees with the channel schema.
    #[error("sample disagrees with the channel schema at argument {index}")]
    SchemaMismatch {
        /// First argument position at which the sample diverges.
        index: usize,
    },

    /// The sink accepted fewer bytes than it was offered.
    #[error("sink accepted {written} of {offered} bytes")]
    SinkWriteShort { offered: u32, written: u32 },

    /// A staged argument record could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ChannelError {
    /// True for the overflow kinds a `Drop`-policy producer counts.
    #[inline]
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::ArenaFull { .. } | Self::QueueFull)
    }
}
