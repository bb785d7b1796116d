//! Bit-exact datagram frame layout, shared by both channel ends.
//!
//! All multi-byte scalars are little-endian; each frame travels in one
//! datagram. Event frames open with an 8-byte marker word; sample traffic
//! carries no marker and is discriminated by the schema sentinel argument.
//!
//! ```text
//! attributes:  mark u64 | id u32 | line u32 | argc u16
//!              | len_msg u32 | len_func u32 | len_file u32
//!              | msg bytes | func bytes | file bytes
//! occurrence:  mark u64 | id u32 | argc u16
//!              | argc wire args | array payloads in argument order
//! schema:      sentinel arg (tag = TAG_COUNT_SENTINEL, scalar = 0xFAFAFAFA,
//!              array_len = N) | N tag bytes
//! sample:      N wire args | array payloads in argument order
//! ```

use crate::error::WireError;
use std::borrow::Cow;
use wirelog::{
    read_arg, stage_args, staged_len, DecodeError, Encodable, EventAttributes, EventId, Tag,
    ARG_WIRE_SIZE, TAG_COUNT_SENTINEL,
};

/// Head marker of an attributes frame.
pub const ATTR_MARK: u64 = 0xAA11_5511_BB00_11EE;

/// Head marker of an occurrence frame.
pub const OCCU_MARK: u64 = 0x00CC_0055_EE44_CCEE;

/// Scalar payload of the schema sentinel argument.
pub const SCHEMA_SENTINEL: u64 = 0xFAFA_FAFA;

/// Marker word footprint.
pub const MARK_SIZE: usize = 8;

/// Fixed part of an attributes frame, up to the string bytes.
pub const ATTR_FIXED: usize = MARK_SIZE + 4 + 4 + 2 + 4 + 4 + 4;

/// Fixed part of an occurrence frame; the staged argument block follows.
pub const OCCU_FIXED: usize = MARK_SIZE + 4 + 2;

/// Frame kinds discriminated by the marker word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Attributes,
    Occurrence,
}

/// Parsed occurrence frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceHeader {
    pub id: EventId,
    pub argc: u16,
}

fn need(frame: &[u8], len: usize) -> Result<(), WireError> {
    if frame.len() < len {
        return Err(WireError::Decode(DecodeError::Truncated {
            needed: len,
            have: frame.len(),
        }));
    }
    Ok(())
}

fn u64_at(frame: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&frame[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn u32_at(frame: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&frame[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn u16_at(frame: &[u8], at: usize) -> u16 {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(&frame[at..at + 2]);
    u16::from_le_bytes(bytes)
}

/// Identify the next frame by its marker word.
pub fn read_mark(frame: &[u8]) -> Result<FrameKind, WireError> {
    need(frame, MARK_SIZE)?;
    match u64_at(frame, 0) {
        ATTR_MARK => Ok(FrameKind::Attributes),
        OCCU_MARK => Ok(FrameKind::Occurrence),
        other => Err(WireError::CorruptMark(other)),
    }
}

/// Encode an attributes frame into the reusable buffer.
pub fn encode_attributes(buf: &mut Vec<u8>, attrs: &EventAttributes) {
    buf.clear();
    buf.extend_from_slice(&ATTR_MARK.to_le_bytes());
    buf.extend_from_slice(&attrs.id.to_le_bytes());
    buf.extend_from_slice(&attrs.line.to_le_bytes());
    buf.extend_from_slice(&attrs.expected_argc.to_le_bytes());
    buf.extend_from_slice(&(attrs.message_format.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(attrs.function.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(attrs.file.len() as u32).to_le_bytes());
    buf.extend_from_slice(attrs.message_format.as_bytes());
    buf.extend_from_slice(attrs.function.as_bytes());
    buf.extend_from_slice(attrs.file.as_bytes());
}

/// Decode an attributes frame (marker included) into an owned record.
pub fn decode_attributes(frame: &[u8]) -> Result<EventAttributes, WireError> {
    need(frame, ATTR_FIXED)?;
    let id = u32_at(frame, 8);
    let line = u32_at(frame, 12);
    let expected_argc = u16_at(frame, 16);
    let len_msg = u32_at(frame, 18) as usize;
    let len_func = u32_at(frame, 22) as usize;
    let len_file = u32_at(frame, 26) as usize;
    need(frame, ATTR_FIXED + len_msg + len_func + len_file)?;

    let mut at = ATTR_FIXED;
    let mut take = |len: usize| {
        let text = String::from_utf8_lossy(&frame[at..at + len]).into_owned();
        at += len;
        Cow::Owned(text)
    };
    Ok(EventAttributes {
        id,
        line,
        expected_argc,
        message_format: take(len_msg),
        function: take(len_func),
        file: take(len_file),
    })
}

/// Encode an occurrence frame into the reusable buffer.
pub fn encode_occurrence(buf: &mut Vec<u8>, id: EventId, args: &[&dyn Encodable]) {
    buf.clear();
    buf.extend_from_slice(&OCCU_MARK.to_le_bytes());
    buf.extend_from_slice(&id.to_le_bytes());
    buf.extend_from_slice(&(args.len() as u16).to_le_bytes());
    let body = buf.len();
    buf.resize(body + staged_len(args) as usize, 0);
    stage_args(args, &mut buf[body..]);
}

/// Decode the occurrence header; the argument block follows at
/// [`OCCU_FIXED`].
pub fn decode_occurrence_header(frame: &[u8]) -> Result<OccurrenceHeader, WireError> {
    need(frame, OCCU_FIXED)?;
    Ok(OccurrenceHeader {
        id: u32_at(frame, 8),
        argc: u16_at(frame, 12),
    })
}

/// Encode the schema frame: the sentinel argument followed by the tag bytes.
pub fn encode_schema(buf: &mut Vec<u8>, schema: &[Tag]) {
    buf.clear();
    buf.resize(ARG_WIRE_SIZE, 0);
    buf[0..8].copy_from_slice(&SCHEMA_SENTINEL.to_le_bytes());
    buf[8] = TAG_COUNT_SENTINEL;
    buf[12..16].copy_from_slice(&(schema.len() as u32).to_le_bytes());
    buf.extend(schema.iter().map(|tag| *tag as u8));
}

/// Encode a sample frame: the staged argument block, no header.
pub fn encode_sample(buf: &mut Vec<u8>, args: &[&dyn Encodable]) {
    buf.clear();
    buf.resize(staged_len(args) as usize, 0);
    stage_args(args, buf);
}

/// True when the frame opens with the schema sentinel argument.
pub fn is_schema_frame(frame: &[u8]) -> bool {
    frame.len() >= ARG_WIRE_SIZE && frame[8] == TAG_COUNT_SENTINEL
}

/// Decode a schema frame into its tag sequence.
pub fn decode_schema(frame: &[u8]) -> Result<Vec<Tag>, WireError> {
    need(frame, ARG_WIRE_SIZE)?;
    let scalar = u64_at(frame, 0);
    if frame[8] != TAG_COUNT_SENTINEL || scalar != SCHEMA_SENTINEL {
        return Err(WireError::CorruptMark(scalar));
    }
    let count = u32_at(frame, 12) as usize;
    need(frame, ARG_WIRE_SIZE + count)?;

    let mut schema = Vec::with_capacity(count);
    for &raw in &frame[ARG_WIRE_SIZE..ARG_WIRE_SIZE + count] {
        schema.push(Tag::from_u8(raw).map_err(WireError::Decode)?);
    }
    Ok(schema)
}

/// Verify a decoded sample's first record against the schema without
/// consuming it; used to guard a hostile sender.
pub fn sample_matches_schema(frame: &[u8], schema: &[Tag]) -> Result<(), WireError> {
    for (index, expected) in schema.iter().enumerate() {
        let record = frame.get(index * ARG_WIRE_SIZE..).unwrap_or(&[]);
        let arg = read_arg(record).map_err(WireError::Decode)?;
        if arg.tag != *expected {
            return Err(WireError::Channel(wirelog::ChannelError::SchemaMismatch {
                index,
            }));
        }
    }
    Ok(())
}
