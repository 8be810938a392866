//! `ringkernel`: a bounded power-of-two ring buffer family with pluggable
//! synchronization disciplines, and a cooperative stackless-task scheduler
//! built on top of them, forming the concurrency substrate for fabric and
//! storage I/O kernels.
//!
//! The two halves share one foundation: a [`Ring<T, P, C>`] whose producer
//! and consumer sides can each independently be single-threaded, CAS-based
//! multi-threaded, or head/tail-packed multi-threaded
//! ([`sync_mode`]/[`Ring`]), and a [`Scheduler`] whose ready queue is itself
//! one such ring of [`TaskHandle`]s. Tasks ([`Task<T>`], [`Waker<T>`],
//! [`CheckableWaker<T>`], [`YieldPoint`]) are `core::future::Future`-based
//! rather than a hand-rolled coroutine ABI: there is no language-level
//! coroutine handle in safe Rust, so a frame's "handle" is simulated the
//! same way `std::task::Waker` itself is — a type-erased data pointer plus
//! a `'static` vtable, one per concrete future type.
//!
//! Enable the `loom` feature to run the ring's concurrent tests under
//! `loom`'s permutation-exhaustive model checker instead of real threads.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod backoff;
mod config;
mod error;
mod external;
mod guard;
mod handle;
mod invariants;
mod metrics;
mod ring;
mod scheduler;
mod sync_mode;
mod task;
mod waker;
mod yield_point;

pub use backoff::Backoff;
pub use config::RingGeometry;
pub use error::RingCreateError;
pub use external::{spawn_polling_task, CompletionSource};
pub use guard::RingGuard;
pub use handle::TaskHandle;
pub use metrics::Metrics;
pub use ring::Ring;
pub use scheduler::Scheduler;
pub use sync_mode::{Mt, MtHts, MtRts, St, SyncMode, SyncModeKind};
pub use task::{spawn, ChildAwait, Task, TaskFailure};
pub use waker::{CheckableWait, CheckableWaker, Wait, Waker};
pub use yield_point::YieldPoint;
