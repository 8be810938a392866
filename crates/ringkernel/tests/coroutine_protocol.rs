//! End-to-end coroutine/scheduler behaviors that don't fit naturally inside
//! a single module's unit tests: child adoption, waker rendezvous, and
//! panic containment.

use ringkernel::{spawn, CheckableWaker, Scheduler, Waker};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn task_does_not_execute_before_its_first_resume() {
    let scheduler = Scheduler::new(8).unwrap();
    let ran = Rc::new(Cell::new(false));
    let ran_clone = ran.clone();
    let task = spawn(&scheduler, async move {
        ran_clone.set(true);
    });
    assert!(!ran.get(), "a fresh Task must not run any body statements before resume");
    task.resume();
    assert!(ran.get());
}

#[test]
fn child_adoption_synchronous_completion_same_turn() {
    let scheduler = Scheduler::new(8).unwrap();
    let observed = Rc::new(Cell::new(None));
    let observed_clone = observed.clone();
    scheduler.spawn(async move {
        let scheduler = Scheduler::current().unwrap();
        let child = spawn(scheduler, async { 42 });
        let value = child.await; // child completes without ever suspending
        observed_clone.set(Some(value));
        scheduler.stop();
    });
    scheduler.run();
    assert_eq!(observed.get(), Some(42));
}

#[test]
fn waker_rendezvous_resumes_on_a_later_scheduler_turn() {
    let scheduler = Scheduler::new(8).unwrap();
    let waker: Rc<Waker<i32>> = Rc::new(Waker::new());
    let observed = Rc::new(Cell::new(None));

    let waker_a = waker.clone();
    let observed_a = observed.clone();
    scheduler.spawn(async move {
        let value = waker_a.wait().await;
        observed_a.set(Some(value));
        Scheduler::current().unwrap().stop();
    });
    let waker_b = waker;
    scheduler.spawn(async move {
        waker_b.wake(7);
    });
    scheduler.run();
    assert_eq!(observed.get(), Some(7));
}

#[test]
fn checkable_waker_pre_fired_causes_no_suspension() {
    let scheduler = Scheduler::new(8).unwrap();
    let waker: Rc<CheckableWaker<&'static str>> = Rc::new(CheckableWaker::new());
    waker.wake("already here");

    let trace = Rc::new(RefCell::new(Vec::new()));
    let waker_clone = waker.clone();
    let trace_clone = trace.clone();
    let task = spawn(&scheduler, async move {
        trace_clone.borrow_mut().push("before");
        let value = waker_clone.wait().await;
        trace_clone.borrow_mut().push(value);
    });
    task.resume(); // a single resume is enough: no suspension happened
    assert!(task.done());
    assert_eq!(*trace.borrow(), vec!["before", "already here"]);
}

#[test]
fn child_panic_propagates_to_parent_without_aborting_the_scheduler() {
    let scheduler = Scheduler::new(8).unwrap();
    let stopper_ran = Rc::new(Cell::new(false));
    let stopper_ran_clone = stopper_ran.clone();

    scheduler.spawn(async {
        let scheduler = Scheduler::current().unwrap();
        let child = spawn(scheduler, async { panic!("child task failure") });
        let _unit: () = child.await; // resume_unwind fires here, caught by
                                      // this task's own frame, not the process
    });
    scheduler.spawn(async move {
        stopper_ran_clone.set(true);
        Scheduler::current().unwrap().stop();
    });

    scheduler.run();
    assert!(
        stopper_ran.get(),
        "a sibling task scheduled after a panicking one must still run to completion"
    );
}
