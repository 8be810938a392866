//! Bounded power-of-two ring buffer, generic over producer/consumer sync
//! mode (spec §4.1).

use crate::backoff::Backoff;
use crate::config::RingGeometry;
use crate::error::RingCreateError;
use crate::invariants::{debug_assert_bounded_count, debug_assert_monotonic};
use crate::sync_mode::{SyncMode, SyncModeKind};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// One side's (producer's or consumer's) reservation/publication cursor
/// pair, on its own cache line (spec §3: "never placed on the same cache
/// line as the opposite side").
#[repr(align(128))]
struct Side {
    head: AtomicU32,
    tail: AtomicU32,
    /// Packed `(head << 32) | tail` view, the source of truth under
    /// [`SyncModeKind::MtHts`]; kept redundant with `head`/`tail` above so
    /// `len`/`is_empty` can read the plain atomics regardless of mode.
    packed: AtomicU64,
}

impl Side {
    fn new() -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            packed: AtomicU64::new(0),
        }
    }

    /// Reserves up to `n` slots. `base` is `capacity` for a producer
    /// reservation (free space against the consumer's tail) or `0` for a
    /// consumer reservation (available items against the producer's tail).
    /// Returns `(old_head, actually_reserved)`.
    fn reserve(
        &self,
        mode: SyncModeKind,
        other_tail: &AtomicU32,
        n: u32,
        base: u32,
        transactional: bool,
    ) -> (u32, u32) {
        match mode {
            SyncModeKind::St => self.reserve_st(other_tail, n, base, transactional),
            SyncModeKind::Mt => self.reserve_mt(other_tail, n, base, transactional),
            SyncModeKind::MtHts => self.reserve_mt_hts(other_tail, n, base, transactional),
            SyncModeKind::MtRts => unreachable!("rejected at Ring::create"),
        }
    }

    fn reserve_st(&self, other_tail: &AtomicU32, n: u32, base: u32, transactional: bool) -> (u32, u32) {
        let old_head = self.head.load(Ordering::Relaxed);
        let ot = other_tail.load(Ordering::Relaxed);
        let avail = base.wrapping_add(ot).wrapping_sub(old_head);
        let got = clamp(n, avail, transactional);
        if got == 0 {
            return (old_head, 0);
        }
        let new_head = old_head.wrapping_add(got);
        debug_assert_monotonic!("head", old_head, new_head);
        self.head.store(new_head, Ordering::Relaxed);
        (old_head, got)
    }

    fn reserve_mt(&self, other_tail: &AtomicU32, n: u32, base: u32, transactional: bool) -> (u32, u32) {
        let mut backoff = Backoff::new();
        loop {
            // Step 1: snapshot old_head; the Acquire load doubles as the
            // "acquire-fence on weakly-ordered targets" of spec §4.1 step 1.
            let old_head = self.head.load(Ordering::Acquire);
            let ot = other_tail.load(Ordering::Acquire);
            let avail = base.wrapping_add(ot).wrapping_sub(old_head);
            let got = clamp(n, avail, transactional);
            if got == 0 {
                return (old_head, 0);
            }
            let new_head = old_head.wrapping_add(got);
            match self.head.compare_exchange_weak(
                old_head,
                new_head,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return (old_head, got),
                Err(_) => backoff.snooze(),
            }
        }
    }

    fn reserve_mt_hts(&self, other_tail: &AtomicU32, n: u32, base: u32, transactional: bool) -> (u32, u32) {
        let mut backoff = Backoff::new();
        loop {
            let packed = self.packed.load(Ordering::Acquire);
            let (head, tail) = unpack(packed);
            if head != tail {
                // A reservation is already in flight on this side; spec
                // §4.1 mode 3 requires waiting for head == tail.
                backoff.snooze();
                continue;
            }
            let ot = other_tail.load(Ordering::Acquire);
            let avail = base.wrapping_add(ot).wrapping_sub(head);
            let got = clamp(n, avail, transactional);
            if got == 0 {
                return (head, 0);
            }
            let new_head = head.wrapping_add(got);
            let new_packed = pack(new_head, tail);
            if self
                .packed
                .compare_exchange_weak(packed, new_packed, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.head.store(new_head, Ordering::Relaxed);
                return (head, got);
            }
            backoff.snooze();
        }
    }

    /// Publishes `n` elements reserved starting at `old_head` (spec §4.1
    /// step 6).
    fn publish(&self, mode: SyncModeKind, old_head: u32, n: u32) {
        let new_tail = old_head.wrapping_add(n);
        match mode {
            SyncModeKind::St => self.tail.store(new_tail, Ordering::Relaxed),
            SyncModeKind::Mt => {
                // Wait until predecessors have published up to our
                // reservation's start, then release-store our own tail.
                // This is what preserves FIFO observation order despite
                // producers retiring their CAS-won reservations out of
                // order.
                let mut backoff = Backoff::new();
                while self.tail.load(Ordering::Acquire) != old_head {
                    backoff.snooze();
                }
                self.tail.store(new_tail, Ordering::Release);
            }
            SyncModeKind::MtHts => {
                // Only one reservation can be in flight at a time under
                // MT-HTS (reserve requires head == tail to proceed), so no
                // wait is needed here: publish is the sole writer until the
                // next reserve unblocks.
                let packed = self.packed.load(Ordering::Relaxed);
                let (head, _tail) = unpack(packed);
                self.packed.store(pack(head, new_tail), Ordering::Release);
                self.tail.store(new_tail, Ordering::Release);
            }
            SyncModeKind::MtRts => unreachable!("rejected at Ring::create"),
        }
    }
}

fn pack(head: u32, tail: u32) -> u64 {
    (u64::from(head) << 32) | u64::from(tail)
}

fn unpack(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, packed as u32)
}

fn clamp(requested: u32, available: u32, transactional: bool) -> u32 {
    let got = requested.min(available);
    if transactional && got < requested {
        0
    } else {
        got
    }
}

/// A bounded power-of-two FIFO ring buffer, parameterized by producer and
/// consumer synchronization discipline (spec §3/§4.1).
#[repr(C)]
pub struct Ring<T, P: SyncMode, C: SyncMode> {
    producer: Side,
    consumer: Side,
    geometry: RingGeometry,
    producer_transactional: bool,
    consumer_transactional: bool,
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
    _modes: PhantomData<(P, C)>,
}

// Safety: all cross-thread communication goes through the atomics in
// `Side`; `buffer` slots are only accessed by whichever side currently
// holds the corresponding reservation (see `reserve`/`publish` above).
unsafe impl<T: Send, P: SyncMode, C: SyncMode> Send for Ring<T, P, C> {}
unsafe impl<T: Send, P: SyncMode, C: SyncMode> Sync for Ring<T, P, C> {}

impl<T, P: SyncMode, C: SyncMode> Ring<T, P, C> {
    /// Allocates a ring whose usable capacity is the smallest power of two
    /// strictly greater than `requested_count`, minus one (spec §4.1
    /// `create`). Requesting a count of zero is accepted.
    pub fn create(requested_count: usize) -> Result<Self, RingCreateError> {
        if P::KIND == SyncModeKind::MtRts {
            return Err(RingCreateError::UnsupportedSyncMode(P::KIND));
        }
        if C::KIND == SyncModeKind::MtRts {
            return Err(RingCreateError::UnsupportedSyncMode(C::KIND));
        }
        let geometry = RingGeometry::for_requested_count(requested_count)?;
        let mut buffer = Vec::with_capacity(geometry.size() as usize);
        buffer.resize_with(geometry.size() as usize, MaybeUninit::uninit);
        Ok(Self {
            producer: Side::new(),
            consumer: Side::new(),
            geometry,
            producer_transactional: true,
            consumer_transactional: true,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
            _modes: PhantomData,
        })
    }

    /// Configures the transactional toggle for each side (spec §4.1
    /// "Producer-side additional toggle: transactional"). Defaults to
    /// `true` on both sides.
    #[must_use]
    pub fn with_transactional(mut self, producer: bool, consumer: bool) -> Self {
        self.producer_transactional = producer;
        self.consumer_transactional = consumer;
        self
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.geometry.capacity()
    }

    #[inline]
    fn mask(&self) -> u32 {
        self.geometry.mask()
    }

    #[inline]
    fn size(&self) -> u32 {
        self.geometry.size()
    }

    /// Current number of live elements.
    pub fn len(&self) -> usize {
        let tail = self.producer.tail.load(Ordering::Acquire);
        let head = self.consumer.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() as u32 >= self.capacity()
    }

    fn copy_in(&self, start: u32, values: &[T])
    where
        T: Copy,
    {
        let size = self.size() as usize;
        let idx = (start & self.mask()) as usize;
        let n = values.len();
        let first = n.min(size - idx);
        // SAFETY: `idx..idx+first` (and, on wraparound, `0..n-first`) are
        // exactly the slots this reservation owns exclusively until
        // `publish` runs; no other producer reservation overlaps them
        // (enforced by the CAS in `Side::reserve`), and the consumer has
        // not yet observed them (tail publication happens after this call).
        unsafe {
            let buffer = &mut *self.buffer.get();
            std::ptr::copy_nonoverlapping(values.as_ptr(), buffer[idx..].as_mut_ptr().cast::<T>(), first);
            if first < n {
                std::ptr::copy_nonoverlapping(
                    values[first..].as_ptr(),
                    buffer.as_mut_ptr().cast::<T>(),
                    n - first,
                );
            }
        }
    }

    fn copy_out(&self, start: u32, out: &mut [T])
    where
        T: Copy,
    {
        let size = self.size() as usize;
        let idx = (start & self.mask()) as usize;
        let n = out.len();
        let first = n.min(size - idx);
        // SAFETY: symmetric to `copy_in` — these slots were published by
        // the producer (observable via the Acquire load in `reserve`)
        // before this consumer reservation could have won them.
        unsafe {
            let buffer = &*self.buffer.get();
            std::ptr::copy_nonoverlapping(buffer[idx..].as_ptr().cast::<T>(), out.as_mut_ptr(), first);
            if first < n {
                std::ptr::copy_nonoverlapping(
                    buffer.as_ptr().cast::<T>(),
                    out[first..].as_mut_ptr(),
                    n - first,
                );
            }
        }
    }

    /// Attempts to place one element. Returns `1` on success, `0` if full.
    pub fn enqueue(&self, value: T) -> usize
    where
        T: Copy,
    {
        self.enqueue_batch(std::slice::from_ref(&value))
    }

    /// Attempts to place `values.len()` elements. Under a transactional
    /// producer this either fully succeeds or does not modify the ring;
    /// otherwise returns the number actually enqueued.
    pub fn enqueue_batch(&self, values: &[T]) -> usize
    where
        T: Copy,
    {
        let n = values.len() as u32;
        if n == 0 {
            return 0;
        }
        let (old_head, got) =
            self.producer
                .reserve(P::KIND, &self.consumer.tail, n, self.capacity(), self.producer_transactional);
        debug_assert_bounded_count!(got, self.capacity());
        if got == 0 {
            return 0;
        }
        self.copy_in(old_head, &values[..got as usize]);
        self.producer.publish(P::KIND, old_head, got);
        got as usize
    }

    /// Attempts to remove one element.
    pub fn dequeue(&self) -> Option<T>
    where
        T: Copy,
    {
        let (old_head, got) = self.consumer.reserve(C::KIND, &self.producer.tail, 1, 0, self.consumer_transactional);
        if got == 0 {
            return None;
        }
        let mut slot = MaybeUninit::<T>::uninit();
        self.copy_out(old_head, std::slice::from_mut(unsafe { &mut *slot.as_mut_ptr() }));
        self.consumer.publish(C::KIND, old_head, 1);
        Some(unsafe { slot.assume_init() })
    }

    /// Attempts to remove up to `out.len()` elements, symmetric to
    /// [`Self::enqueue_batch`].
    pub fn dequeue_batch(&self, out: &mut [T]) -> usize
    where
        T: Copy,
    {
        let n = out.len() as u32;
        if n == 0 {
            return 0;
        }
        let (old_head, got) =
            self.consumer
                .reserve(C::KIND, &self.producer.tail, n, 0, self.consumer_transactional);
        if got == 0 {
            return 0;
        }
        self.copy_out(old_head, &mut out[..got as usize]);
        self.consumer.publish(C::KIND, old_head, got);
        got as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_mode::{Mt, MtHts, MtRts, St};

    #[test]
    fn st_ping_pong_preserves_fifo() {
        let ring = Ring::<u32, St, St>::create(10).unwrap();
        assert_eq!(ring.capacity(), 15);
        for i in 0..1_000_000u32 {
            assert_eq!(ring.enqueue(i), 1);
            assert_eq!(ring.dequeue(), Some(i));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn wraparound_after_two_full_cycles() {
        let ring = Ring::<u32, St, St>::create(7).unwrap();
        let size = ring.capacity() + 1;
        for _ in 0..2 {
            for i in 0..ring.capacity() {
                assert_eq!(ring.enqueue(i), 1);
            }
            for i in 0..ring.capacity() {
                assert_eq!(ring.dequeue(), Some(i));
            }
        }
        assert!(ring.is_empty());
        let _ = size;
    }

    #[test]
    fn transactional_enqueue_never_partially_applies() {
        let ring = Ring::<u32, St, St>::create(3).unwrap(); // capacity 3
        for i in 0..3 {
            assert_eq!(ring.enqueue(i), 1);
        }
        // Ring full: a 2-element transactional batch must be fully
        // rejected, not partially applied.
        assert_eq!(ring.enqueue_batch(&[100, 101]), 0);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn mt_rts_is_rejected_at_construction() {
        let err = Ring::<u32, MtRts, St>::create(10).unwrap_err();
        assert_eq!(err, RingCreateError::UnsupportedSyncMode(SyncModeKind::MtRts));
    }

    #[test]
    fn mp_sc_stress_preserves_multiset() {
        use std::sync::Arc;
        use std::thread;

        let ring: Arc<Ring<u64, Mt, St>> = Arc::new(Ring::create(1022).unwrap());
        let producers = 4;
        let per_producer = 100_000u64;

        let handles: Vec<_> = (0..producers)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    let mut sent = 0u64;
                    while sent < per_producer {
                        if ring.enqueue(sent) == 1 {
                            sent += 1;
                        } else {
                            std::thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let mut received = Vec::with_capacity((producers as u64 * per_producer) as usize);
        while received.len() < (producers as u64 * per_producer) as usize {
            if let Some(v) = ring.dequeue() {
                received.push(v);
            } else {
                std::thread::yield_now();
            }
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut counts = std::collections::HashMap::new();
        for v in received {
            *counts.entry(v).or_insert(0u32) += 1;
        }
        for v in 0..per_producer {
            assert_eq!(counts.get(&v).copied().unwrap_or(0), producers as u32);
        }
    }

    #[test]
    fn mt_hts_round_trips() {
        let ring = Ring::<u32, MtHts, St>::create(31).unwrap();
        for i in 0..1000u32 {
            assert_eq!(ring.enqueue(i), 1);
            assert_eq!(ring.dequeue(), Some(i));
        }
    }
}
