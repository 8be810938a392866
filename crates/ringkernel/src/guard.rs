use crate::error::RingCreateError;
use crate::ring::Ring;
use crate::sync_mode::SyncMode;
use std::ops::Deref;

/// Scoped owner of a [`Ring`]'s backing memory with guaranteed release
/// (spec §4.2). Exclusive ownership: moves transfer it, copies are
/// disallowed — `Box`'s own move semantics already make a moved-from guard
/// unusable, so this type adds only the documented intent and the `Deref`
/// convenience.
pub struct RingGuard<T, P: SyncMode, C: SyncMode> {
    ring: Box<Ring<T, P, C>>,
}

impl<T, P: SyncMode, C: SyncMode> RingGuard<T, P, C> {
    /// Allocates and initializes a ring, taking ownership of it.
    pub fn create(requested_count: usize) -> Result<Self, RingCreateError> {
        Ok(Self {
            ring: Box::new(Ring::create(requested_count)?),
        })
    }

    /// Borrows the underlying ring.
    pub fn ring(&self) -> &Ring<T, P, C> {
        &self.ring
    }
}

impl<T, P: SyncMode, C: SyncMode> Deref for RingGuard<T, P, C> {
    type Target = Ring<T, P, C>;

    fn deref(&self) -> &Self::Target {
        &self.ring
    }
}
