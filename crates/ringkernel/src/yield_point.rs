//! `YieldPoint` (spec §3/§4.4): suspends the calling coroutine for exactly
//! one scheduler turn, then resumes it on the same scheduler.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Awaiting this future suspends the current coroutine and immediately
/// re-enqueues its own handle, so it runs again only after every other
/// handle already on the ready ring has had its turn (cooperative
/// round-robin fairness, spec §4.4).
#[derive(Debug, Default)]
pub struct YieldPoint {
    yielded: bool,
}

impl YieldPoint {
    pub fn new() -> Self {
        Self { yielded: false }
    }
}

impl Future for YieldPoint {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.yielded {
            return Poll::Ready(());
        }
        this.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use std::rc::Rc;

    #[test]
    fn two_tasks_alternating_yield_each_run_once_per_turn() {
        let scheduler = Scheduler::new(8).unwrap();
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));

        let order_a = order.clone();
        scheduler.spawn(async move {
            order_a.borrow_mut().push('a');
            YieldPoint::new().await;
            order_a.borrow_mut().push('a');
        });
        let order_b = order.clone();
        scheduler.spawn(async move {
            order_b.borrow_mut().push('b');
            YieldPoint::new().await;
            order_b.borrow_mut().push('b');
            Scheduler::current().unwrap().stop();
        });
        scheduler.run();

        // Both tasks run their first half before either runs its second
        // half: the ready ring is FIFO, so yielding re-enqueues behind
        // whatever else is already waiting.
        assert_eq!(*order.borrow(), vec!['a', 'b', 'a', 'b']);
    }
}
