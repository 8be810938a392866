//! Debug assertion macros for ring and scheduler invariants.
//!
//! These provide runtime checks for the invariants documented in `spec.md`
//! §3/§4.1/§4.6. Only active in debug builds (`#[cfg(debug_assertions)]`),
//! so there is zero overhead in release builds. Adapted from the teacher
//! crate's `invariants.rs`, renamed and retargeted at the 32-bit modular
//! counters spec §3 mandates instead of the teacher's unbounded u64 scheme.

/// `0 <= head - consumer_tail <= capacity` at all times (spec §3).
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded-count invariant violated: in-flight count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// A side's own tail publication never runs ahead of its head reservation.
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head.wrapping_sub($tail) <= i32::MAX as u32,
            "tail {} published past head {}",
            $tail,
            $new_head
        )
    };
}

/// A sequence counter only moves forward (mod 2^32).
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new.wrapping_sub($old) <= i32::MAX as u32,
            "{} moved backwards from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Detects a same-reservation double CAS-win, which would corrupt the ring.
macro_rules! debug_assert_no_reentrant_reservation {
    ($old_head:expr, $observed_head:expr) => {
        debug_assert!(
            $old_head == $observed_head,
            "reservation observed head {} but reserved against {}",
            $observed_head,
            $old_head
        )
    };
}

/// A [`crate::waker::Waker`] must not be woken twice before its payload is
/// taken (spec §4.6 kind 3 "Protocol misuse").
macro_rules! debug_assert_no_double_wake {
    ($already_armed:expr) => {
        debug_assert!(
            !$already_armed,
            "Waker::wake called again before the previous payload was taken"
        )
    };
}

/// A [`crate::handle::TaskHandle`] must not be destroyed twice.
macro_rules! debug_assert_not_destroyed {
    ($already_destroyed:expr) => {
        debug_assert!(!$already_destroyed, "TaskHandle destroyed twice")
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_double_wake;
pub(crate) use debug_assert_no_reentrant_reservation;
pub(crate) use debug_assert_not_destroyed;
