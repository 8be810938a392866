//! `Waker<T>`/`CheckableWaker<T>` (spec §3/§4.4): awaitables that suspend a
//! coroutine until some external collaborator calls `wake(value)`.
//!
//! Built directly on `std::task::Waker` rather than reinventing a
//! wake-list: storing the `Context`'s waker and calling `.wake()` on it
//! later *is* spec §4.4's "wake enqueues the handle on the scheduler" (see
//! `crate::task`'s `RawWakerVTable::wake` impl).

use crate::invariants::debug_assert_no_double_wake;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker as StdWaker};

/// A single-shot rendezvous point: a coroutine suspends awaiting it, and a
/// later `wake(value)` call (from any thread, or from another task on the
/// same scheduler) resumes it with that value.
///
/// Per spec §4.4, a fresh `Waker<T>` is **never** ready on its first poll —
/// even if `wake` was already called before anything ever awaited it, that
/// payload sits latent until the first suspension happens, and the
/// rendezvous then requires a *second* `wake` to actually resume (the
/// documented pre-fire hazard; use [`CheckableWaker`] to avoid it).
pub struct Waker<T> {
    waker: RefCell<Option<StdWaker>>,
    payload: Cell<Option<T>>,
}

impl<T> Default for Waker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Waker<T> {
    pub fn new() -> Self {
        Self {
            waker: RefCell::new(None),
            payload: Cell::new(None),
        }
    }

    /// Delivers `value` and resumes the awaiting coroutine, if one has
    /// already suspended on this waker. Per spec §4.6, a second `wake`
    /// before the first is ever observed overwrites the pending payload;
    /// debug builds assert this is intentional rather than a forgotten
    /// `await`.
    pub fn wake(&self, value: T) {
        let had_payload = self.payload.replace(Some(value)).is_some();
        debug_assert_no_double_wake!(had_payload);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    /// Returns a future that suspends until the next `wake`.
    pub fn wait(&self) -> Wait<'_, T> {
        Wait { inner: self }
    }
}

/// The future returned by [`Waker::wait`].
pub struct Wait<'a, T> {
    inner: &'a Waker<T>,
}

impl<T> Future for Wait<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.inner.payload.take() {
            return Poll::Ready(value);
        }
        *self.inner.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Like [`Waker<T>`], but a `wake` that lands before anything ever awaits it
/// is not lost: the next `wait()` sees it immediately and never suspends.
/// Spec §4.4's alternative design for "a waker that can be checked instead
/// of only waited on."
pub struct CheckableWaker<T> {
    inner: Waker<T>,
    fired: Cell<bool>,
}

impl<T> Default for CheckableWaker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CheckableWaker<T> {
    pub fn new() -> Self {
        Self {
            inner: Waker::new(),
            fired: Cell::new(false),
        }
    }

    /// Whether `wake` has been called since creation or the last `wait()`.
    pub fn is_fired(&self) -> bool {
        self.fired.get()
    }

    pub fn wake(&self, value: T) {
        self.fired.set(true);
        self.inner.wake(value);
    }

    /// Suspends until `wake`, or returns immediately if already fired.
    pub fn wait(&self) -> CheckableWait<'_, T> {
        CheckableWait { inner: self }
    }
}

/// The future returned by [`CheckableWaker::wait`].
pub struct CheckableWait<'a, T> {
    inner: &'a CheckableWaker<T>,
}

impl<T> Future for CheckableWait<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.inner.fired.get() {
            if let Some(value) = self.inner.inner.payload.take() {
                self.inner.fired.set(false);
                return Poll::Ready(value);
            }
        }
        *self.inner.inner.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}
