//! Property-based tests for the arena and queue primitives.
//!
//! Coverage:
//! - ByteArena: reservations never overlap live bytes, acquire/release
//!   conservation, quiescent emptiness, including the wrap-discard
//!   bookkeeping of the effective-capacity cursor
//! - SpinQueue: bounded occupancy and FIFO order under random interleaving
//! - Argument staging: bit-exact round trips for arbitrary values

use proptest::prelude::*;
use std::collections::VecDeque;
use wirelog::{
    staged_len, with_decoded_args, ByteArena, Contention, Encodable, SpinQueue, Tag,
    ARG_WIRE_SIZE,
};

// =============================================================================
// Arena: no two live blocks may share a byte, whatever the interleaving.
// The acquire sizes are chosen so runs regularly exercise the exact-fit wrap
// and the wrap-discard path of a 64-byte arena.
// =============================================================================

proptest! {
    #[test]
    fn prop_arena_blocks_never_overlap(
        ops in prop::collection::vec((prop::bool::ANY, 1u32..=24), 1..400),
    ) {
        let arena = ByteArena::new(64);
        let mut live: VecDeque<(u32, u32)> = VecDeque::new();
        let mut acquired = 0u64;
        let mut released = 0u64;

        for (is_acquire, size) in ops {
            if is_acquire {
                if let Ok(offset) = arena.try_acquire(size) {
                    for &(off, len) in &live {
                        prop_assert!(
                            offset + size <= off || off + len <= offset,
                            "new block [{}, {}) overlaps live block [{}, {})",
                            offset, offset + size, off, off + len
                        );
                    }
                    live.push_back((offset, size));
                    acquired += u64::from(size);
                }
            } else if let Some((_, len)) = live.pop_front() {
                prop_assert!(arena.try_release(len), "oldest block must release");
                released += u64::from(len);
            }
        }

        while let Some((_, len)) = live.pop_front() {
            prop_assert!(arena.try_release(len), "drain release must succeed");
            released += u64::from(len);
        }

        // conservation: everything acquired was released, nothing is live
        prop_assert_eq!(acquired, released);
        prop_assert_eq!(arena.used(), 0);
        prop_assert!(arena.is_empty());
    }
}

proptest! {
    /// Released bytes become reservable again: a tight arena survives an
    /// arbitrarily long strictly-alternating workload.
    #[test]
    fn prop_arena_alternating_never_wedges(
        sizes in prop::collection::vec(1u32..=15, 1..200),
    ) {
        let arena = ByteArena::new(32);
        for size in sizes {
            let offset = arena.try_acquire(size);
            prop_assert!(offset.is_ok(), "empty arena refused {} bytes", size);
            prop_assert!(arena.try_release(size));
            prop_assert!(arena.is_empty());
        }
    }
}

// =============================================================================
// Queue: occupancy never exceeds capacity - 1 and pops observe pushes in
// FIFO order.
// =============================================================================

proptest! {
    #[test]
    fn prop_queue_bounded_and_fifo(
        ops in prop::collection::vec(prop::bool::ANY, 1..300),
    ) {
        let queue = SpinQueue::new(8, Contention::Single, Contention::Single);
        let mut next_push = 0u64;
        let mut next_pop = 0u64;

        for is_push in ops {
            if is_push {
                if queue.try_push(next_push) {
                    next_push += 1;
                } else {
                    prop_assert_eq!(queue.len(), 7, "push only fails when full");
                }
            } else if let Some(value) = queue.try_pop() {
                prop_assert_eq!(value, next_pop, "pops must observe push order");
                next_pop += 1;
            } else {
                prop_assert_eq!(queue.len(), 0, "pop only fails when empty");
            }
            prop_assert!(queue.len() <= 7);
        }

        prop_assert_eq!(next_push - next_pop, u64::from(queue.len()));
    }
}

// =============================================================================
// Argument staging: the staged block decodes to bit-identical records.
// =============================================================================

proptest! {
    #[test]
    fn prop_staged_args_round_trip_bit_exact(
        a in any::<u32>(),
        b in any::<i64>(),
        c in any::<f64>(),
        text in ".{0,32}",
        nums in prop::collection::vec(any::<u16>(), 0..16),
    ) {
        let args: &[&dyn Encodable] = &[&a, &b, &c, &text, &nums];
        let len = staged_len(args) as usize;
        prop_assert_eq!(
            len,
            5 * ARG_WIRE_SIZE + text.len() + nums.len() * 2
        );

        let mut block = vec![0u8; len];
        wirelog::stage_args(args, &mut block);

        with_decoded_args(&block, args.len(), |bound| {
            assert_eq!(bound[0].tag, Tag::U32);
            assert_eq!(bound[0].scalar, u64::from(a));

            assert_eq!(bound[1].tag, Tag::I64);
            assert_eq!(bound[1].scalar.to_le_bytes(), b.to_le_bytes());

            assert_eq!(bound[2].tag, Tag::F64);
            assert_eq!(bound[2].scalar, c.to_bits());

            assert_eq!(bound[3].tag, Tag::ArrChar);
            assert_eq!(bound[3].payload, text.as_bytes());

            assert_eq!(bound[4].tag, Tag::ArrU16);
            let expected: Vec<u8> = nums.iter().flat_map(|n| n.to_le_bytes()).collect();
            assert_eq!(bound[4].payload, expected.as_slice());
        })
        .unwrap();
    }
}
