//! The four ring synchronization disciplines of spec §4.1.
//!
//! `Ring<T, P, C>` is generic over a producer-side and a consumer-side
//! marker type so call sites read the way spec.md writes them
//! (`Ring<u32, St, St>`, `Ring<u64, Mt, St>`, ...). The reservation
//! algorithm itself branches at runtime on [`SyncMode::KIND`] — spec §9
//! explicitly allows this ("Runtime branching on the mode is acceptable if
//! the compiler can devirtualise").

/// Runtime tag for a [`SyncMode`], used by the reservation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncModeKind {
    /// Single-thread: no atomics, caller guarantees exclusion.
    St,
    /// Multi-thread, classic CAS-reservation with wait-then-release tail.
    Mt,
    /// Multi-thread, packed head/tail word.
    MtHts,
    /// Multi-thread, relaxed tail sync. Declared, not implemented.
    MtRts,
}

mod sealed {
    pub trait Sealed {}
}

/// A producer or consumer synchronization discipline.
pub trait SyncMode: sealed::Sealed + Send + Sync + 'static {
    /// The runtime tag this marker type corresponds to.
    const KIND: SyncModeKind;
}

/// Single-thread: no atomics; caller guarantees exclusion.
#[derive(Debug, Clone, Copy, Default)]
pub struct St;

/// Multi-thread, classic: CAS-reservation on `head`, wait-then-release `tail`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mt;

/// Multi-thread, head/tail sync: `head`/`tail` packed into one atomic word.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtHts;

/// Multi-thread, relaxed tail sync. Rejected at construction (spec §4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct MtRts;

impl sealed::Sealed for St {}
impl sealed::Sealed for Mt {}
impl sealed::Sealed for MtHts {}
impl sealed::Sealed for MtRts {}

impl SyncMode for St {
    const KIND: SyncModeKind = SyncModeKind::St;
}
impl SyncMode for Mt {
    const KIND: SyncModeKind = SyncModeKind::Mt;
}
impl SyncMode for MtHts {
    const KIND: SyncModeKind = SyncModeKind::MtHts;
}
impl SyncMode for MtRts {
    const KIND: SyncModeKind = SyncModeKind::MtRts;
}
