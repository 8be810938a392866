//! Stackless coroutine frame (`Task<T>`/`Promise<T>` of spec §3/§4.3),
//! built on `core::future::Future` rather than a literal coroutine handle.
//!
//! A frame is a heap-boxed `Future` plus the bookkeeping spec §3 describes
//! (`result`, `parent`). `resume()` polls it once; a terminal `Poll::Ready`
//! is this crate's equivalent of "reaching final suspension" — the promise
//! inspects `parent` right there and either resumes it synchronously and
//! self-destroys (parent-adoption protocol, §4.3), or leaves the frame
//! alive for whoever spawned it to consume.

use crate::handle::{FrameVTable, TaskHandle};
use crate::invariants::debug_assert_not_destroyed;
use crate::scheduler::Scheduler;
use std::any::Any;
use std::cell::{Cell, UnsafeCell};
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// What a task's body failed with, if it panicked instead of returning.
/// Carried through the result slot and re-raised at the awaiting parent's
/// `.await` point via [`resume_unwind`] — the Rust analogue of spec §4.3
/// "An unhandled failure inside a coroutine body rethrows at the point of
/// await by the parent."
pub struct TaskFailure(pub(crate) Box<dyn Any + Send + 'static>);

struct Frame<Fut: Future> {
    future: UnsafeCell<Option<Fut>>,
    result: UnsafeCell<Option<Result<Fut::Output, TaskFailure>>>,
    parent: Cell<Option<TaskHandle>>,
    done: Cell<bool>,
    destroyed: Cell<bool>,
    scheduler: *const Scheduler,
}

thread_local! {
    /// The handle of the frame currently being polled on this thread, if
    /// any. Lets an awaitable recover "my own handle" (e.g. to record
    /// itself as a child's parent) without reflecting through
    /// `std::task::Waker`, the same way `crate::scheduler` keeps a
    /// thread-local "current scheduler" rather than a process-global one.
    static CURRENT_HANDLE: Cell<Option<TaskHandle>> = const { Cell::new(None) };
}

/// The handle of the coroutine currently executing on this thread.
pub(crate) fn current_handle() -> Option<TaskHandle> {
    CURRENT_HANDLE.with(Cell::get)
}

fn vtable_for<Fut: Future + 'static>() -> &'static FrameVTable {
    struct Vt<Fut>(PhantomData<Fut>);
    impl<Fut: Future + 'static> Vt<Fut> {
        const VTABLE: FrameVTable = FrameVTable {
            resume: resume_raw::<Fut>,
            destroy: destroy_raw::<Fut>,
            done: done_raw::<Fut>,
            raw_waker: raw_waker_raw::<Fut>,
        };
    }
    &Vt::<Fut>::VTABLE
}

fn waker_vtable<Fut: Future + 'static>() -> &'static RawWakerVTable {
    unsafe fn clone<Fut: Future + 'static>(data: *const ()) -> RawWaker {
        RawWaker::new(data, waker_vtable::<Fut>())
    }
    unsafe fn wake<Fut: Future + 'static>(data: *const ()) {
        waker_wake::<Fut>(data);
    }
    unsafe fn wake_by_ref<Fut: Future + 'static>(data: *const ()) {
        waker_wake::<Fut>(data);
    }
    unsafe fn drop_fn(_data: *const ()) {}

    struct Vt<Fut>(PhantomData<Fut>);
    impl<Fut: Future + 'static> Vt<Fut> {
        const VTABLE: RawWakerVTable = RawWakerVTable::new(clone::<Fut>, wake::<Fut>, wake_by_ref::<Fut>, drop_fn);
    }
    &Vt::<Fut>::VTABLE
}

/// Non-owning wake: the handle is re-enqueued on its owning scheduler, it
/// is never cloned or dropped in the reference-counting sense (ownership of
/// the frame is managed entirely by `TaskHandle::destroy`, not by Waker
/// clone/drop — a deliberate divergence from the common refcounted-waker
/// pattern, recorded in DESIGN.md).
unsafe fn waker_wake<Fut: Future + 'static>(data: *const ()) {
    let frame = &*data.cast::<Frame<Fut>>();
    let handle = TaskHandle {
        data,
        vtable: vtable_for::<Fut>(),
    };
    (*frame.scheduler).enqueue(handle);
}

unsafe fn raw_waker_raw<Fut: Future + 'static>(data: *const ()) -> RawWaker {
    RawWaker::new(data, waker_vtable::<Fut>())
}

unsafe fn resume_raw<Fut: Future + 'static>(data: *const ()) {
    let frame = &*data.cast::<Frame<Fut>>();
    if frame.done.get() {
        return;
    }
    let handle = TaskHandle {
        data,
        vtable: vtable_for::<Fut>(),
    };
    let prev = CURRENT_HANDLE.with(|c| c.replace(Some(handle)));

    let waker = Waker::from_raw(raw_waker_raw::<Fut>(data));
    let mut cx = Context::from_waker(&waker);
    let fut_slot = &mut *frame.future.get();
    let fut = fut_slot
        .as_mut()
        .expect("TaskHandle::resume called after the frame already completed");
    let pinned = Pin::new_unchecked(fut);

    match catch_unwind(AssertUnwindSafe(|| pinned.poll(&mut cx))) {
        Ok(Poll::Pending) => {}
        Ok(Poll::Ready(value)) => {
            *frame.future.get() = None;
            *frame.result.get() = Some(Ok(value));
            frame.done.set(true);
            finalize::<Fut>(frame, data);
        }
        Err(panic) => {
            *frame.future.get() = None;
            *frame.result.get() = Some(Err(TaskFailure(panic)));
            frame.done.set(true);
            finalize::<Fut>(frame, data);
        }
    }

    CURRENT_HANDLE.with(|c| c.set(prev));
}

/// Spec §4.3 "final-suspension policy": resume the parent synchronously
/// before yielding, then self-destroy; a parentless frame is left for its
/// spawner to destroy.
unsafe fn finalize<Fut: Future + 'static>(frame: &Frame<Fut>, data: *const ()) {
    if let Some(parent) = frame.parent.take() {
        parent.resume();
        destroy_raw::<Fut>(data);
    }
}

unsafe fn destroy_raw<Fut: Future + 'static>(data: *const ()) {
    let frame = &*data.cast::<Frame<Fut>>();
    debug_assert_not_destroyed!(frame.destroyed.get());
    frame.destroyed.set(true);
    drop(Box::from_raw(data.cast_mut().cast::<Frame<Fut>>()));
}

unsafe fn done_raw<Fut: Future + 'static>(data: *const ()) -> bool {
    (*data.cast::<Frame<Fut>>()).done.get()
}

unsafe fn set_parent_raw<Fut: Future + 'static>(data: *const (), parent: TaskHandle) {
    (*data.cast::<Frame<Fut>>()).parent.set(Some(parent));
}

unsafe fn take_result_raw<Fut: Future + 'static>(data: *const ()) -> Result<Fut::Output, TaskFailure> {
    let frame = &*data.cast::<Frame<Fut>>();
    (*frame.result.get())
        .take()
        .expect("Task result taken before the frame completed")
}

/// A stackless coroutine frame's handle plus the concrete accessor needed
/// to move its typed result out (spec §3 `Task<T>`). `resume`/`destroy`/
/// `done` all forward to the underlying [`TaskHandle`] (spec: "A Task<T>
/// exposes the handle through `get()` and forwards resume/destroy/done").
pub struct Task<T> {
    handle: TaskHandle,
    take_result: unsafe fn(*const ()) -> Result<T, TaskFailure>,
    set_parent: unsafe fn(*const (), TaskHandle),
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Task<T> {}

impl<T> Task<T> {
    /// Returns the non-owning handle (spec's `get()`).
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    pub fn destroy(&self) {
        self.handle.destroy();
    }

    pub fn done(&self) -> bool {
        self.handle.done()
    }

    /// Takes the completed result without going through the
    /// panic-propagating `.await` protocol. For a caller that is not itself
    /// a coroutine — e.g. the thread driving `Scheduler::run` — and wants to
    /// observe a top-level task's outcome directly. Returns `None` if the
    /// task has not reached its terminal return yet. Does not destroy the
    /// frame; pair with [`Task::destroy`] once the result has been read.
    pub fn try_take_result(&self) -> Option<Result<T, TaskFailure>> {
        if !self.handle.done() {
            return None;
        }
        Some(unsafe { (self.take_result)(self.handle.data) })
    }
}

/// Creates a coroutine frame for `fut`, suspended before its first
/// statement (spec §4.3 "initial policy is always suspend"). The frame is
/// bound to `scheduler` for its entire lifetime: any awaitable inside `fut`
/// that needs to re-enqueue this task's handle (a `Waker`, `YieldPoint`, or
/// being woken as a child) does so onto `scheduler`'s ready ring.
///
/// # Safety-relevant contract
///
/// `scheduler` must outlive the returned `Task` and everything it
/// transitively spawns; this is the same contract `original_source`'s
/// thread-local scheduler pointer relies on (callers keep the scheduler
/// alive for the duration of `Scheduler::run`).
pub fn spawn<Fut>(scheduler: &Scheduler, fut: Fut) -> Task<Fut::Output>
where
    Fut: Future + 'static,
{
    let frame = Box::into_raw(Box::new(Frame {
        future: UnsafeCell::new(Some(fut)),
        result: UnsafeCell::new(None),
        parent: Cell::new(None),
        done: Cell::new(false),
        destroyed: Cell::new(false),
        scheduler: scheduler as *const Scheduler,
    }));
    Task {
        handle: TaskHandle {
            data: (frame as *const ()).cast(),
            vtable: vtable_for::<Fut>(),
        },
        take_result: take_result_raw::<Fut>,
        set_parent: set_parent_raw::<Fut>,
    }
}

/// The awaiter produced by awaiting a [`Task<T>`] (spec §4.4 "Child-task
/// awaiter"), implementing the parent-adoption protocol of spec §4.3.
pub struct ChildAwait<T> {
    task: Task<T>,
    started: bool,
}

impl<T: 'static> Future for ChildAwait<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        let handle = this.task.handle;
        if !this.started {
            this.started = true;
            handle.resume();
            if handle.done() {
                let result = unsafe { (this.task.take_result)(handle.data) };
                handle.destroy();
                return Poll::Ready(unwrap_or_propagate(result));
            }
            let parent = current_handle().expect("Task awaited outside of a running coroutine");
            unsafe { (this.task.set_parent)(handle.data, parent) };
            return Poll::Pending;
        }
        // Resumed because the child reached final suspension and resumed
        // us synchronously (spec §4.3); its frame is destroyed by that
        // same call right after this poll returns.
        debug_assert!(handle.done());
        let result = unsafe { (this.task.take_result)(handle.data) };
        Poll::Ready(unwrap_or_propagate(result))
    }
}

fn unwrap_or_propagate<T>(result: Result<T, TaskFailure>) -> T {
    match result {
        Ok(value) => value,
        Err(failure) => resume_unwind(failure.0),
    }
}

impl<T: 'static> IntoFuture for Task<T> {
    type Output = T;
    type IntoFuture = ChildAwait<T>;

    fn into_future(self) -> ChildAwait<T> {
        ChildAwait {
            task: self,
            started: false,
        }
    }
}
