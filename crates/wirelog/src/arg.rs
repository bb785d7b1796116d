//! Typed argument model shared by the in-process and network paths.
//!
//! Every logged value travels as one [`Arg`]: a tag from the closed kind set
//! plus either the inline scalar bits or an (offset, element count) pair for
//! an array payload. The 16-byte little-endian wire form of an argument is
//! identical in the channel arena and on the datagram transport, so both
//! paths share the codec in this module.

use crate::error::DecodeError;

/// Bit 0 of a tag distinguishes `T` from array-of-`T`.
pub const TAG_ARRAY_BIT: u8 = 1;

/// Sentinel tag marking a sample-schema record on the wire.
pub const TAG_COUNT_SENTINEL: u8 = 28;

/// Fixed wire footprint of one argument record:
/// `scalar: u64 le @0, tag: u8 @8, zero @9..12, array_len: u32 le @12`.
pub const ARG_WIRE_SIZE: usize = 16;

/// Arguments decoded on the consumer stack before spilling to the heap.
pub const MAX_INLINE_ARGS: usize = 32;

/// The closed set of argument kinds.
///
/// Scalar tags are even, their array counterparts are the scalar tag with
/// [`TAG_ARRAY_BIT`] set. The discriminants are wire values and never change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    None = 0,
    U8 = 2,
    ArrU8 = 3,
    U16 = 4,
    ArrU16 = 5,
    U32 = 6,
    ArrU32 = 7,
    U64 = 8,
    ArrU64 = 9,
    I8 = 10,
    ArrI8 = 11,
    I16 = 12,
    ArrI16 = 13,
    I32 = 14,
    ArrI32 = 15,
    I64 = 16,
    ArrI64 = 17,
    F32 = 18,
    ArrF32 = 19,
    F64 = 20,
    ArrF64 = 21,
    Char = 22,
    ArrChar = 23,
    Thread = 24,
    ArrThread = 25,
    EpochNs = 26,
    ArrEpochNs = 27,
}

impl Tag {
    /// Element size in bytes. Array tags report the size of one element.
    pub const fn size(self) -> u32 {
        match self.element() {
            Tag::None => 0,
            Tag::U8 | Tag::I8 | Tag::Char => 1,
            Tag::U16 | Tag::I16 => 2,
            Tag::U32 | Tag::I32 | Tag::F32 | Tag::Thread => 4,
            Tag::U64 | Tag::I64 | Tag::F64 | Tag::EpochNs => 8,
            _ => 0,
        }
    }

    /// True when the payload is an (offset, count) array reference.
    #[inline]
    pub const fn is_array(self) -> bool {
        self as u8 & TAG_ARRAY_BIT != 0
    }

    /// The scalar kind, with the array bit cleared.
    pub const fn element(self) -> Tag {
        match self {
            Tag::ArrU8 => Tag::U8,
            Tag::ArrU16 => Tag::U16,
            Tag::ArrU32 => Tag::U32,
            Tag::ArrU64 => Tag::U64,
            Tag::ArrI8 => Tag::I8,
            Tag::ArrI16 => Tag::I16,
            Tag::ArrI32 => Tag::I32,
            Tag::ArrI64 => Tag::I64,
            Tag::ArrF32 => Tag::F32,
            Tag::ArrF64 => Tag::F64,
            Tag::ArrChar => Tag::Char,
            Tag::ArrThread => Tag::Thread,
            Tag::ArrEpochNs => Tag::EpochNs,
            scalar => scalar,
        }
    }

    /// The array kind of a scalar tag. `None` stays `None`.
    pub const fn as_array(self) -> Tag {
        match self {
            Tag::U8 => Tag::ArrU8,
            Tag::U16 => Tag::ArrU16,
            Tag::U32 => Tag::ArrU32,
            Tag::U64 => Tag::ArrU64,
            Tag::I8 => Tag::ArrI8,
            Tag::I16 => Tag::ArrI16,
            Tag::I32 => Tag::ArrI32,
            Tag::I64 => Tag::ArrI64,
            Tag::F32 => Tag::ArrF32,
            Tag::F64 => Tag::ArrF64,
            Tag::Char => Tag::ArrChar,
            Tag::Thread => Tag::ArrThread,
            Tag::EpochNs => Tag::ArrEpochNs,
            other => other,
        }
    }

    /// Human-readable kind name, used by the plain-text sample formatter.
    pub const fn name(self) -> &'static str {
        match self {
            Tag::None => "none",
            Tag::U8 => "u8",
            Tag::ArrU8 => "u8[]",
            Tag::U16 => "u16",
            Tag::ArrU16 => "u16[]",
            Tag::U32 => "u32",
            Tag::ArrU32 => "u32[]",
            Tag::U64 => "u64",
            Tag::ArrU64 => "u64[]",
            Tag::I8 => "i8",
            Tag::ArrI8 => "i8[]",
            Tag::I16 => "i16",
            Tag::ArrI16 => "i16[]",
            Tag::I32 => "i32",
            Tag::ArrI32 => "i32[]",
            Tag::I64 => "i64",
            Tag::ArrI64 => "i64[]",
            Tag::F32 => "f32",
            Tag::ArrF32 => "f32[]",
            Tag::F64 => "f64",
            Tag::ArrF64 => "f64[]",
            Tag::Char => "char",
            Tag::ArrChar => "char[]",
            Tag::Thread => "thread",
            Tag::ArrThread => "thread[]",
            Tag::EpochNs => "epoch_ns",
            Tag::ArrEpochNs => "epoch_ns[]",
        }
    }

    /// Parse a wire tag byte.
    pub fn from_u8(raw: u8) -> Result<Tag, DecodeError> {
        Ok(match raw {
            0 => Tag::None,
            2 => Tag::U8,
            3 => Tag::ArrU8,
            4 => Tag::U16,
            5 => Tag::ArrU16,
            6 => Tag::U32,
            7 => Tag::ArrU32,
            8 => Tag::U64,
            9 => Tag::ArrU64,
            10 => Tag::I8,
            11 => Tag::ArrI8,
            12 => Tag::I16,
            13 => Tag::ArrI16,
            14 => Tag::I32,
            15 => Tag::ArrI32,
            16 => Tag::I64,
            17 => Tag::ArrI64,
            18 => Tag::F32,
            19 => Tag::ArrF32,
            20 => Tag::F64,
            21 => Tag::ArrF64,
            22 => Tag::Char,
            23 => Tag::ArrChar,
            24 => Tag::Thread,
            25 => Tag::ArrThread,
            26 => Tag::EpochNs,
            27 => Tag::ArrEpochNs,
            other => return Err(DecodeError::UnsupportedArgumentKind(other)),
        })
    }
}

/// Process-unique 32-bit identifier of an OS thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Identifier of the calling thread, assigned on first use.
    pub fn current() -> Self {
        use std::sync::atomic::{AtomicU32, Ordering};
        static NEXT: AtomicU32 = AtomicU32::new(1);
        thread_local! {
            static CURRENT: u32 = NEXT.fetch_add(1, Ordering::Relaxed);
        }
        ThreadId(CURRENT.with(|id| *id))
    }
}

/// Nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochNanos(pub u64);

impl EpochNanos {
    /// The current wall clock, saturating at zero before the epoch.
    pub fn now() -> Self {
        let since = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        EpochNanos(since.as_nanos() as u64)
    }
}

/// One staged argument: the tag plus either the scalar bits or the element
/// count of an array payload. `array_len` is zero for scalars; the byte
/// extent of an array payload is exactly `tag.size() * array_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
    pub tag: Tag,
    /// Scalar bit pattern (little-endian significance); unused for arrays.
    pub scalar: u64,
    /// Element count when the array bit is set.
    pub array_len: u32,
}

impl Arg {
    pub const NONE: Arg = Arg {
        tag: Tag::None,
        scalar: 0,
        array_len: 0,
    };

    /// Byte extent of the array payload; zero for scalars.
    #[inline]
    pub fn payload_len(&self) -> u32 {
        if self.tag.is_array() {
            self.tag.size() * self.array_len
        } else {
            0
        }
    }
}

/// Serialise one argument record into the first [`ARG_WIRE_SIZE`] bytes of
/// `dst`.
pub fn write_arg(dst: &mut [u8], arg: &Arg) {
    dst[0..8].copy_from_slice(&arg.scalar.to_le_bytes());
    dst[8] = arg.tag as u8;
    dst[9..12].fill(0);
    dst[12..16].copy_from_slice(&arg.array_len.to_le_bytes());
}

/// Parse one argument record from the front of `src`.
pub fn read_arg(src: &[u8]) -> Result<Arg, DecodeError> {
    if src.len() < ARG_WIRE_SIZE {
        return Err(DecodeError::Truncated {
            needed: ARG_WIRE_SIZE,
            have: src.len(),
        });
    }
    let mut scalar = [0u8; 8];
    scalar.copy_from_slice(&src[0..8]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&src[12..16]);
    Ok(Arg {
        tag: Tag::from_u8(src[8])?,
        scalar: u64::from_le_bytes(scalar),
        array_len: u32::from_le_bytes(len),
    })
}

/// Producer-side encoding over the closed set of recognised kinds.
///
/// Implementors are exactly the kinds of the tag table; handing anything
/// else to a logging macro fails to compile at the call site.
pub trait Encodable {
    /// Wire tag of this value.
    fn tag(&self) -> Tag;

    /// Scalar bit pattern; unused for arrays.
    fn scalar(&self) -> u64 {
        0
    }

    /// Element count; zero for scalars.
    fn array_len(&self) -> u32 {
        0
    }

    /// Serialise the array payload (little-endian elements) into `dst`,
    /// which is exactly `tag().size() * array_len()` bytes.
    fn write_payload(&self, _dst: &mut [u8]) {}
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn tag(&self) -> Tag {
        (**self).tag()
    }
    fn scalar(&self) -> u64 {
        (**self).scalar()
    }
    fn array_len(&self) -> u32 {
        (**self).array_len()
    }
    fn write_payload(&self, dst: &mut [u8]) {
        (**self).write_payload(dst);
    }
}

macro_rules! impl_encodable_scalar {
    ($($ty:ty => $tag:ident),* $(,)?) => {$(
        impl Encodable for $ty {
            fn tag(&self) -> Tag {
                Tag::$tag
            }
            fn scalar(&self) -> u64 {
                let bytes = self.to_le_bytes();
                let mut wide = [0u8; 8];
                wide[..bytes.len()].copy_from_slice(&bytes);
                u64::from_le_bytes(wide)
            }
        }
    )*};
}

impl_encodable_scalar! {
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    f32 => F32, f64 => F64,
}

impl Encodable for char {
    fn tag(&self) -> Tag {
        Tag::Char
    }
    // single-byte character; callers pass ASCII
    fn scalar(&self) -> u64 {
        u64::from(*self as u32 as u8)
    }
}

impl Encodable for ThreadId {
    fn tag(&self) -> Tag {
        Tag::Thread
    }
    fn scalar(&self) -> u64 {
        u64::from(self.0)
    }
}

impl Encodable for EpochNanos {
    fn tag(&self) -> Tag {
        Tag::EpochNs
    }
    fn scalar(&self) -> u64 {
        self.0
    }
}

impl Encodable for str {
    fn tag(&self) -> Tag {
        Tag::ArrChar
    }
    // exact byte length, no terminator
    fn array_len(&self) -> u32 {
        self.len() as u32
    }
    fn write_payload(&self, dst: &mut [u8]) {
        dst.copy_from_slice(self.as_bytes());
    }
}

impl Encodable for String {
    fn tag(&self) -> Tag {
        Tag::ArrChar
    }
    fn array_len(&self) -> u32 {
        self.len() as u32
    }
    fn write_payload(&self, dst: &mut [u8]) {
        dst.copy_from_slice(self.as_bytes());
    }
}

macro_rules! impl_encodable_slice {
    ($($elem:ty => $tag:ident),* $(,)?) => {$(
        impl Encodable for [$elem] {
            fn tag(&self) -> Tag {
                Tag::$tag
            }
            fn array_len(&self) -> u32 {
                self.len() as u32
            }
            fn write_payload(&self, dst: &mut [u8]) {
                let width = std::mem::size_of::<$elem>();
                for (chunk, v) in dst.chunks_exact_mut(width).zip(self) {
                    chunk.copy_from_slice(&v.to_le_bytes());
                }
            }
        }
    )*};
}

impl_encodable_slice! {
    u8 => ArrU8, u16 => ArrU16, u32 => ArrU32, u64 => ArrU64,
    i8 => ArrI8, i16 => ArrI16, i32 => ArrI32, i64 => ArrI64,
    f32 => ArrF32, f64 => ArrF64,
}

impl Encodable for [ThreadId] {
    fn tag(&self) -> Tag {
        Tag::ArrThread
    }
    fn array_len(&self) -> u32 {
        self.len() as u32
    }
    fn write_payload(&self, dst: &mut [u8]) {
        for (chunk, v) in dst.chunks_exact_mut(4).zip(self) {
            chunk.copy_from_slice(&v.0.to_le_bytes());
        }
    }
}

impl Encodable for [EpochNanos] {
    fn tag(&self) -> Tag {
        Tag::ArrEpochNs
    }
    fn array_len(&self) -> u32 {
        self.len() as u32
    }
    fn write_payload(&self, dst: &mut [u8]) {
        for (chunk, v) in dst.chunks_exact_mut(8).zip(self) {
            chunk.copy_from_slice(&v.0.to_le_bytes());
        }
    }
}

impl<T> Encodable for Vec<T>
where
    [T]: Encodable,
{
    fn tag(&self) -> Tag {
        self.as_slice().tag()
    }
    fn array_len(&self) -> u32 {
        self.as_slice().array_len()
    }
    fn write_payload(&self, dst: &mut [u8]) {
        self.as_slice().write_payload(dst);
    }
}

/// Total byte length of the staged block for `args`: one wire record per
/// argument followed by the array payloads.
pub fn staged_len(args: &[&dyn Encodable]) -> u32 {
    let mut len = (args.len() * ARG_WIRE_SIZE) as u32;
    for arg in args {
        len += arg.tag().size() * arg.array_len();
    }
    len
}

/// Serialise `args` as the staged block layout: `argc` wire records followed
/// by the array payloads in argument order. `block` is exactly
/// [`staged_len`] bytes.
pub fn stage_args(args: &[&dyn Encodable], block: &mut [u8]) {
    let mut payload_at = args.len() * ARG_WIRE_SIZE;
    for (i, arg) in args.iter().enumerate() {
        let rec = Arg {
            tag: arg.tag(),
            scalar: arg.scalar(),
            array_len: arg.array_len(),
        };
        write_arg(&mut block[i * ARG_WIRE_SIZE..], &rec);
        let len = rec.payload_len() as usize;
        if len > 0 {
            arg.write_payload(&mut block[payload_at..payload_at + len]);
            payload_at += len;
        }
    }
}

/// Consumer-side view of one decoded argument with its payload resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundArg<'a> {
    pub tag: Tag,
    pub scalar: u64,
    /// Array payload bytes; empty for scalars.
    pub payload: &'a [u8],
}

impl<'a> BoundArg<'a> {
    pub const EMPTY: BoundArg<'static> = BoundArg {
        tag: Tag::None,
        scalar: 0,
        payload: &[],
    };

    /// Decode to a typed value.
    pub fn value(&self) -> Value<'a> {
        if self.tag.is_array() {
            if self.tag == Tag::ArrChar {
                Value::Chars(self.payload)
            } else {
                Value::Array(ArrayView {
                    elem: self.tag.element(),
                    bytes: self.payload,
                })
            }
        } else {
            decode_scalar(self.tag, self.scalar)
        }
    }
}

/// A decoded argument value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Thread(ThreadId),
    EpochNs(EpochNanos),
    /// Character array payload, raw bytes.
    Chars(&'a [u8]),
    /// Any other array payload.
    Array(ArrayView<'a>),
}

/// Borrowed view over a non-character array payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayView<'a> {
    pub elem: Tag,
    pub bytes: &'a [u8],
}

impl<'a> ArrayView<'a> {
    /// Element count.
    pub fn len(&self) -> usize {
        let width = self.elem.size() as usize;
        if width == 0 {
            0
        } else {
            self.bytes.len() / width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = Value<'static>> + 'a {
        let elem = self.elem;
        let width = (elem.size() as usize).max(1);
        let bytes = self.bytes;
        bytes.chunks_exact(width).map(move |chunk| {
            let mut wide = [0u8; 8];
            wide[..chunk.len()].copy_from_slice(chunk);
            decode_scalar(elem, u64::from_le_bytes(wide))
        })
    }
}

fn decode_scalar(tag: Tag, bits: u64) -> Value<'static> {
    match tag {
        Tag::U8 => Value::U8(bits as u8),
        Tag::U16 => Value::U16(bits as u16),
        Tag::U32 => Value::U32(bits as u32),
        Tag::U64 => Value::U64(bits),
        Tag::I8 => Value::I8(bits as u8 as i8),
        Tag::I16 => Value::I16(bits as u16 as i16),
        Tag::I32 => Value::I32(bits as u32 as i32),
        Tag::I64 => Value::I64(bits as i64),
        Tag::F32 => Value::F32(f32::from_bits(bits as u32)),
        Tag::F64 => Value::F64(f64::from_bits(bits)),
        Tag::Char => Value::Char(bits as u8 as char),
        Tag::Thread => Value::Thread(ThreadId(bits as u32)),
        Tag::EpochNs => Value::EpochNs(EpochNanos(bits)),
        _ => Value::None,
    }
}

/// Decode a staged block (`argc` wire records plus payloads) and hand the
/// bound views to `f`.
///
/// Views for up to [`MAX_INLINE_ARGS`] arguments live on the stack; wider
/// records fall back to the heap. Payload extents are derived strictly from
/// `tag.size() * array_len`.
pub fn with_decoded_args<R>(
    block: &[u8],
    argc: usize,
    f: impl FnOnce(&[BoundArg<'_>]) -> R,
) -> Result<R, DecodeError> {
    let head = argc * ARG_WIRE_SIZE;
    if block.len() < head {
        return Err(DecodeError::Truncated {
            needed: head,
            have: block.len(),
        });
    }

    let mut inline = [BoundArg::EMPTY; MAX_INLINE_ARGS];
    let mut heap = Vec::new();
    let bound: &mut [BoundArg<'_>] = if argc <= MAX_INLINE_ARGS {
        &mut inline[..argc]
    } else {
        heap = vec![BoundArg::EMPTY; argc];
        &mut heap[..]
    };

    let mut payload_at = head;
    for (i, slot) in bound.iter_mut().enumerate() {
        let arg = read_arg(&block[i * ARG_WIRE_SIZE..])?;
        let len = arg.payload_len() as usize;
        let payload = if len > 0 {
            let end = payload_at + len;
            if block.len() < end {
                return Err(DecodeError::Truncated {
                    needed: end,
                    have: block.len(),
                });
            }
            let bytes = &block[payload_at..end];
            payload_at = end;
            bytes
        } else {
            &[]
        };
        *slot = BoundArg {
            tag: arg.tag,
            scalar: arg.scalar,
            payload,
        };
    }

    Ok(f(bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_table_is_exact() {
        let expected = [
            (Tag::U8, 1),
            (Tag::U16, 2),
            (Tag::U32, 4),
            (Tag::U64, 8),
            (Tag::I8, 1),
            (Tag::I16, 2),
            (Tag::I32, 4),
            (Tag::I64, 8),
            (Tag::F32, 4),
            (Tag::F64, 8),
            (Tag::Char, 1),
            (Tag::Thread, 4),
            (Tag::EpochNs, 8),
        ];
        for (tag, size) in expected {
            assert_eq!(tag.size(), size, "{}", tag.name());
            assert_eq!(tag.as_array().size(), size, "{}", tag.name());
            assert!(tag.as_array().is_array());
            assert_eq!(tag.as_array().element(), tag);
        }
        assert_eq!(Tag::None.size(), 0);
        assert!(!Tag::None.is_array());
    }

    #[test]
    fn test_wire_round_trip() {
        let arg = Arg {
            tag: Tag::ArrI16,
            scalar: 0x1122_3344_5566_7788,
            array_len: 5,
        };
        let mut buf = [0u8; ARG_WIRE_SIZE];
        write_arg(&mut buf, &arg);
        assert_eq!(buf[8], 13);
        assert_eq!(read_arg(&buf).unwrap(), arg);

        assert!(matches!(
            read_arg(&buf[..10]),
            Err(DecodeError::Truncated { .. })
        ));

        buf[8] = 99;
        assert_eq!(
            read_arg(&buf),
            Err(DecodeError::UnsupportedArgumentKind(99))
        );
    }

    #[test]
    fn test_stage_and_decode_mixed_args() {
        let numbers: &[u32] = &[7, 8, 9];
        let args: &[&dyn Encodable] = &[
            &1u32,
            &-1i32,
            &0.2f64,
            &'3',
            &"some text",
            &numbers,
        ];
        let len = staged_len(args) as usize;
        assert_eq!(len, 6 * ARG_WIRE_SIZE + 9 + 12);

        let mut block = vec![0u8; len];
        stage_args(args, &mut block);

        let values = with_decoded_args(&block, args.len(), |bound| {
            bound.iter().map(|b| match b.value() {
                Value::Chars(bytes) => format!("chars:{}", String::from_utf8_lossy(bytes)),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>()
        })
        .unwrap();

        assert_eq!(values[0], "U32(1)");
        assert_eq!(values[1], "I32(-1)");
        assert_eq!(values[2], "F64(0.2)");
        assert_eq!(values[3], "Char('3')");
        assert_eq!(values[4], "chars:some text");

        with_decoded_args(&block, args.len(), |bound| {
            let Value::Array(view) = bound[5].value() else {
                panic!("expected array");
            };
            assert_eq!(view.len(), 3);
            let decoded: Vec<_> = view.iter().collect();
            assert_eq!(
                decoded,
                vec![Value::U32(7), Value::U32(8), Value::U32(9)]
            );
        })
        .unwrap();
    }

    #[test]
    fn test_string_length_excludes_nothing() {
        let arg = "4";
        assert_eq!(Encodable::array_len(arg), 1);
        assert_eq!(Encodable::tag(arg), Tag::ArrChar);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let args: &[&dyn Encodable] = &[&"some text"];
        let len = staged_len(args) as usize;
        let mut block = vec![0u8; len];
        stage_args(args, &mut block);

        let short = &block[..len - 4];
        assert!(matches!(
            with_decoded_args(short, 1, |_| ()),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_thread_id_is_stable_per_thread() {
        let a = ThreadId::current();
        let b = ThreadId::current();
        assert_eq!(a, b);

        let other = std::thread::spawn(ThreadId::current).join().unwrap();
        assert_ne!(a, other);
    }
}
