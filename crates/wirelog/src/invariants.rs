//! Debug assertion macros for the arena and queue cursor protocols.
//!
//! Only active in debug builds; release builds compile them away.

/// Assert that the live byte count never exceeds the buffer capacity.
///
/// Used in: `ByteArena::try_acquire` after a successful reservation.
macro_rules! debug_assert_live_bounded {
    ($live:expr, $capacity:expr) => {
        debug_assert!(
            $live <= $capacity,
            "live byte count {} exceeds arena capacity {}",
            $live,
            $capacity
        )
    };
}

/// Assert that a consumer cursor stays inside the effective window.
///
/// Used in: `ByteArena::try_release` after computing the new tail.
macro_rules! debug_assert_cursor_in_window {
    ($cursor:expr, $window:expr) => {
        debug_assert!(
            $cursor <= $window,
            "cursor {} escaped the effective window {}",
            $cursor,
            $window
        )
    };
}

/// Assert that a queue slot index is inside the ring.
///
/// Used in: `SpinQueue::try_push` / `SpinQueue::try_pop` before slot access.
macro_rules! debug_assert_slot_in_range {
    ($slot:expr, $capacity:expr) => {
        debug_assert!(
            $slot < $capacity,
            "slot index {} outside queue capacity {}",
            $slot,
            $capacity
        )
    };
}

pub(crate) use debug_assert_cursor_in_window;
pub(crate) use debug_assert_live_bounded;
pub(crate) use debug_assert_slot_in_range;
