//! Error types surfaced by the datagram transport.

use std::io;
use thiserror::Error;
use wirelog::{ChannelError, DecodeError, EventId};

/// Errors surfaced by the wire channel ends.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame head matched neither marker word.
    #[error("corrupt frame mark {0:#018x}")]
    CorruptMark(u64),

    /// The datagram ended before the frame did, or a record inside it could
    /// not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An occurrence referenced an id with no prior attributes frame.
    #[error("occurrence for unknown attribute id {0}")]
    UnknownAttribute(EventId),

    /// A sample frame arrived before any schema frame.
    #[error("sample received before the schema frame")]
    SchemaMissing,

    /// Formatter or sink failure while rendering a received record, or a
    /// schema violation on the sending side.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Socket-level failure.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

/// Stream-fatal conditions remembered by a receiver. Once poisoned, every
/// subsequent call reports the same error until teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Poison {
    CorruptMark(u64),
    UnknownAttribute(EventId),
    SchemaMissing,
}

impl Poison {
    pub(crate) fn of(err: &WireError) -> Option<Poison> {
        match err {
            WireError::CorruptMark(mark) => Some(Poison::CorruptMark(*mark)),
            WireError::UnknownAttribute(id) => Some(Poison::UnknownAttribute(*id)),
            WireError::SchemaMissing => Some(Poison::SchemaMissing),
            _ => None,
        }
    }

    pub(crate) fn to_error(self) -> WireError {
        match self {
            Poison::CorruptMark(mark) => WireError::CorruptMark(mark),
            Poison::UnknownAttribute(id) => WireError::UnknownAttribute(id),
            Poison::SchemaMissing => WireError::SchemaMissing,
        }
    }
}
