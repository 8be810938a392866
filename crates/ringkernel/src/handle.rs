//! `TaskHandle`: an opaque, non-owning, copyable reference to a coroutine
//! frame (spec §3/§4.3).
//!
//! There is no language-level coroutine handle in safe Rust, so this is
//! simulated the same way `std::task::Waker` itself is built: a type-erased
//! data pointer plus a `'static` dispatch table of plain function pointers,
//! one table per concrete `Frame<Fut>` monomorphization. A `std::task::Waker`
//! constructed from the *same* data pointer and a sibling table (see
//! `crate::task`) is how suspended awaitables recover "the handle to
//! resume" — `Waker::wake` on that handle is exactly spec §4.4's "enqueues
//! it on the scheduler."

use std::fmt;
use std::task::{RawWaker, Waker as StdWaker};

/// Dispatch table for a concrete coroutine frame type.
pub(crate) struct FrameVTable {
    pub(crate) resume: unsafe fn(*const ()),
    pub(crate) destroy: unsafe fn(*const ()),
    pub(crate) done: unsafe fn(*const ()) -> bool,
    pub(crate) raw_waker: unsafe fn(*const ()) -> RawWaker,
}

/// A non-owning, `Copy` reference to a suspended or ready task frame.
///
/// Lifetime: valid from the frame's creation until exactly one of (a) the
/// frame completes and has no parent, or (b) `destroy()` is called
/// explicitly. Calling `destroy()` twice is undefined (spec §3).
#[derive(Clone, Copy)]
pub struct TaskHandle {
    pub(crate) data: *const (),
    pub(crate) vtable: &'static FrameVTable,
}

// SAFETY: a TaskHandle is only ever resumed/destroyed/inspected from the
// scheduler thread (spec §5 "Every other Task/Promise operation ... MUST
// happen on the scheduler thread"); it is Send so it may be handed to a
// producer thread purely to be enqueued (never dereferenced there).
unsafe impl Send for TaskHandle {}

impl TaskHandle {
    /// Resumes the coroutine from its last suspension point.
    pub fn resume(&self) {
        // SAFETY: `data`/`vtable` were produced together by `crate::task`
        // for a single concrete `Frame<Fut>`, and the frame outlives this
        // call per the lifetime contract above.
        unsafe { (self.vtable.resume)(self.data) }
    }

    /// Destroys the frame. Must not be called on an already-destroyed or
    /// still-owned-by-a-parent handle.
    pub fn destroy(&self) {
        unsafe { (self.vtable.destroy)(self.data) }
    }

    /// Whether the coroutine has reached its terminal return.
    pub fn done(&self) -> bool {
        unsafe { (self.vtable.done)(self.data) }
    }

    /// Builds a standard `std::task::Waker` for this handle, for handing to
    /// a collaborator outside the coroutine model (spec §6) that wants to
    /// report completion through the ordinary `Waker` interface instead of
    /// calling `resume` directly.
    pub fn waker(&self) -> StdWaker {
        unsafe { StdWaker::from_raw((self.vtable.raw_waker)(self.data)) }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("data", &self.data).finish()
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}
impl Eq for TaskHandle {}
