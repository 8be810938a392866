use thiserror::Error;

/// Failure to construct a [`crate::Ring`].
///
/// This is the only unrecoverable condition in the Ring's contract (spec
/// §4.6 kind 1 "Configuration failure"); enqueue/dequeue never fail, they
/// only report back-pressure via their return value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingCreateError {
    /// `requested_count + 1` does not fit in a `u32`.
    #[error("requested_count {requested} would need size {needed} slots, which overflows u32")]
    SizeOverflow { requested: usize, needed: u64 },

    /// The given sync mode is declared in the type surface but not
    /// implemented (MT-RTS, per spec §4.1).
    #[error("sync mode {0:?} is not implemented; construction is rejected per spec")]
    UnsupportedSyncMode(crate::sync_mode::SyncModeKind),
}
