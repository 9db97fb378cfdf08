//! Suspendable simulation processes.
//!
//! A process is a future spawned on the [`Scheduler`] and polled
//! cooperatively on the simulation's single logical thread. It suspends
//! only at the kernel's wait points ([`Event::wait`](crate::Event::wait),
//! the [`Signal`](crate::Signal) edge futures, [`EdgeWait::wait`](crate::EdgeWait::wait)
//! and [`Scheduler::sleep`]) and is resumed in place when the awaited
//! notification fires, so resumption order stays inside the scheduler's
//! `(time, sequence)` order.
//!
//! Processes live in a slab owned by the scheduler and are addressed by
//! generation-counted [`ProcessId`] handles: a handle to a reclaimed slot
//! is detected as stale and ignored, which makes late wakeups from
//! abandoned waits harmless.
//!
//! Two flavors exist. [`Scheduler::spawn`] creates a persistent process
//! kept for the scheduler's lifetime even after its body completes (the
//! usual shape is an infinite loop reacting to edges). [`Scheduler::spawn_once`]
//! creates a self-reclaiming process: when its body finishes, the entry is
//! marked finished and a zero-delay record is scheduled that frees the
//! slot, so the process is observably alive for the rest of the time step
//! it finished in and gone one tick later.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;

use crate::scheduler::Scheduler;

/// Stable handle to a spawned process.
///
/// Handles are generation-counted: after the process is reclaimed, the
/// handle goes stale and all operations on it become no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId {
    index: usize,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Persistent,
    OneShot,
}

struct Entry {
    future: Option<LocalBoxFuture<'static, ()>>,
    kind: Kind,
    finished: bool,
    // Set when a wake arrives while the future is checked out for polling;
    // the poller re-polls before parking the process again.
    repoll: bool,
}

struct Slot {
    generation: u64,
    entry: Option<Entry>,
}

pub(crate) struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry { slots: Vec::new() }
    }

    fn insert(&mut self, future: LocalBoxFuture<'static, ()>, kind: Kind) -> ProcessId {
        let entry = Entry {
            future: Some(future),
            kind,
            finished: false,
            repoll: false,
        };
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.is_none() {
                slot.entry = Some(entry);
                return ProcessId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        ProcessId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn entry_mut(&mut self, pid: ProcessId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(pid.index)?;
        if slot.generation != pid.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn take_future(&mut self, pid: ProcessId) -> Option<LocalBoxFuture<'static, ()>> {
        let entry = self.entry_mut(pid)?;
        if entry.finished {
            return None;
        }
        entry.future.take()
    }

    fn put_back(&mut self, pid: ProcessId, future: LocalBoxFuture<'static, ()>) {
        // The slot may have been reclaimed by a reset issued from inside
        // the process itself; the future is simply dropped then.
        if let Some(entry) = self.entry_mut(pid) {
            entry.future = Some(future);
        }
    }

    // Notes a wake that arrived while the process was being polled.
    fn note_wake(&mut self, pid: ProcessId) {
        if let Some(entry) = self.entry_mut(pid) {
            if !entry.finished && entry.future.is_none() {
                entry.repoll = true;
            }
        }
    }

    fn take_repoll(&mut self, pid: ProcessId) -> bool {
        match self.entry_mut(pid) {
            Some(entry) => std::mem::take(&mut entry.repoll),
            None => false,
        }
    }

    fn mark_finished(&mut self, pid: ProcessId) -> Option<Kind> {
        let entry = self.entry_mut(pid)?;
        entry.finished = true;
        entry.future = None;
        Some(entry.kind)
    }

    fn free(&mut self, pid: ProcessId) {
        if let Some(slot) = self.slots.get_mut(pid.index) {
            if slot.generation == pid.generation && slot.entry.is_some() {
                slot.entry = None;
                slot.generation += 1;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.entry.take().is_some() {
                slot.generation += 1;
            }
        }
    }

    fn is_alive(&self, pid: ProcessId) -> bool {
        self.slots
            .get(pid.index)
            .map(|slot| slot.generation == pid.generation && slot.entry.is_some())
            .unwrap_or(false)
    }

    fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }
}

impl Scheduler {
    /// Spawns a persistent process.
    ///
    /// The body starts executing immediately, inside this call, up to its
    /// first suspension point. The process entry is kept for the
    /// scheduler's lifetime (or until [`reset`](Scheduler::reset)), even
    /// after the body completes.
    pub fn spawn(&self, body: impl Future<Output = ()> + 'static) -> ProcessId {
        self.spawn_inner(body.boxed_local(), Kind::Persistent)
    }

    /// Spawns a self-reclaiming process.
    ///
    /// Like [`spawn`](Scheduler::spawn), but when the body completes the
    /// slot is freed by a zero-delay cleanup record: the process stays
    /// observable through the remainder of the time step it finished in
    /// and is gone after the scheduler processes one more zero-delay tick.
    pub fn spawn_once(&self, body: impl Future<Output = ()> + 'static) -> ProcessId {
        self.spawn_inner(body.boxed_local(), Kind::OneShot)
    }

    fn spawn_inner(&self, future: LocalBoxFuture<'static, ()>, kind: Kind) -> ProcessId {
        let pid = self.state.borrow_mut().processes.insert(future, kind);
        log::trace!("spawned {:?} process {:?}", kind, pid);
        self.poll_process(pid);
        pid
    }

    /// Suspends the current process for `delay` ticks of simulated time.
    ///
    /// Must be awaited from inside a process spawned on this scheduler.
    pub fn sleep(&self, delay: u64) -> Wait {
        let sched = self.clone();
        Wait::new(self, move |wake| sched.schedule(delay, wake))
    }

    /// Returns `true` if `pid` refers to a process that has not been
    /// reclaimed yet. A finished `spawn_once` process is still alive until
    /// its zero-delay cleanup record runs.
    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.state.borrow().processes.is_alive(pid)
    }

    /// Number of processes currently owned by the scheduler.
    pub fn process_count(&self) -> usize {
        self.state.borrow().processes.count()
    }

    pub(crate) fn current_process(&self) -> Option<ProcessId> {
        self.state.borrow().current
    }

    // Resumes `pid` by polling its future. No-op for stale handles; a wake
    // for a process that is currently being polled is folded into that poll.
    pub(crate) fn poll_process(&self, pid: ProcessId) {
        let mut future = {
            let mut state = self.state.borrow_mut();
            match state.processes.take_future(pid) {
                Some(future) => future,
                None => {
                    state.processes.note_wake(pid);
                    return;
                }
            }
        };
        let previous = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.current, Some(pid))
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        let finished = loop {
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => break true,
                Poll::Pending => {
                    if !self.state.borrow_mut().processes.take_repoll(pid) {
                        break false;
                    }
                }
            }
        };
        {
            let mut state = self.state.borrow_mut();
            state.current = previous;
            if !finished {
                state.processes.put_back(pid, future);
                return;
            }
        }
        let kind = self.state.borrow_mut().processes.mark_finished(pid);
        log::trace!("process {:?} finished", pid);
        if kind == Some(Kind::OneShot) {
            let sched = self.clone();
            self.schedule(0, move || {
                log::trace!("reclaiming process {:?}", pid);
                sched.state.borrow_mut().processes.free(pid);
            });
        }
    }
}

/// Future returned by the kernel's wait operations.
///
/// On its first poll it registers a one-shot wake callback with whatever
/// it waits on (an event trigger, an edge condition, a timer record) and
/// records which process is waiting; the process is resumed when the
/// callback fires. Polling a `Wait` outside a spawned process panics.
pub struct Wait {
    sched: Scheduler,
    done: Rc<Cell<bool>>,
    register: Option<Box<dyn FnOnce(Box<dyn FnOnce()>)>>,
}

impl Wait {
    pub(crate) fn new(
        sched: &Scheduler,
        register: impl FnOnce(Box<dyn FnOnce()>) + 'static,
    ) -> Self {
        Wait {
            sched: sched.clone(),
            done: Rc::new(Cell::new(false)),
            register: Some(Box::new(register)),
        }
    }
}

impl Future for Wait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.done.get() {
            return Poll::Ready(());
        }
        if let Some(register) = this.register.take() {
            let pid = this
                .sched
                .current_process()
                .expect("kernel wait future polled outside of a simulation process");
            let done = this.done.clone();
            let sched = this.sched.clone();
            register(Box::new(move || {
                done.set(true);
                sched.poll_process(pid);
            }));
            // The registration itself may fire synchronously.
            if this.done.get() {
                return Poll::Ready(());
            }
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::time::SimTime;
    use std::cell::RefCell;

    #[test]
    fn spawn_runs_body_immediately() {
        let sim = Scheduler::new(1);
        let ran = Rc::new(Cell::new(false));
        {
            let ran = ran.clone();
            sim.spawn(async move { ran.set(true) });
        }
        assert!(ran.get(), "body must run inside spawn, before run()");
        assert_eq!(sim.process_count(), 1, "persistent entry is retained");
    }

    #[test]
    fn process_resumes_when_event_fires() {
        let sim = Scheduler::new(1);
        let ev = Event::new();
        let observed = Rc::new(Cell::new(None));
        {
            let sim2 = sim.clone();
            let ev = ev.clone();
            let observed = observed.clone();
            sim.spawn(async move {
                ev.wait(&sim2).await;
                observed.set(Some(sim2.time()));
            });
        }
        sim.schedule_trigger(5, &ev);
        sim.run();
        assert_eq!(observed.get(), Some(SimTime::new(5)));
    }

    #[test]
    fn spawn_once_is_reclaimed_one_tick_after_finishing() {
        let sim = Scheduler::new(1);
        let pid = {
            let sim2 = sim.clone();
            sim.spawn_once(async move {
                sim2.sleep(5).await;
            })
        };
        assert!(sim.is_alive(pid));

        let seen_at_finish = Rc::new(Cell::new(None));
        let seen_after_tick = Rc::new(Cell::new(None));
        {
            // Scheduled after the process's own wake record, but before the
            // cleanup record it will enqueue at T=5.
            let sim2 = sim.clone();
            let seen = seen_at_finish.clone();
            sim.schedule(5, move || seen.set(Some(sim2.is_alive(pid))));
        }
        {
            let sim2 = sim.clone();
            let seen = seen_after_tick.clone();
            sim.schedule(6, move || seen.set(Some(sim2.is_alive(pid))));
        }
        sim.run();
        assert_eq!(seen_at_finish.get(), Some(true));
        assert_eq!(seen_after_tick.get(), Some(false));
    }

    #[test]
    fn reset_destroys_processes() {
        let sim = Scheduler::new(1);
        let ev = Event::new();
        let pid = {
            let sim2 = sim.clone();
            let ev = ev.clone();
            sim.spawn(async move {
                ev.wait(&sim2).await;
            })
        };
        assert_eq!(sim.process_count(), 1);
        sim.reset();
        assert_eq!(sim.process_count(), 0);
        assert!(!sim.is_alive(pid));
        // The stale wake registration left on the event must be harmless.
        ev.trigger();
    }

    #[test]
    fn sleep_wakes_in_time_order() {
        let sim = Scheduler::new(1);
        let log: Rc<RefCell<Vec<(&str, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        for (tag, delay) in [("slow", 5u64), ("fast", 3u64)] {
            let sim2 = sim.clone();
            let log = log.clone();
            sim.spawn_once(async move {
                sim2.sleep(delay).await;
                log.borrow_mut().push((tag, sim2.time().ticks()));
            });
        }
        sim.run();
        assert_eq!(*log.borrow(), vec![("fast", 3), ("slow", 5)]);
    }

    #[test]
    fn join_of_two_waits_resumes_after_both() {
        let sim = Scheduler::new(1);
        let a = Event::new();
        let b = Event::new();
        let done_at = Rc::new(Cell::new(None));
        {
            let sim2 = sim.clone();
            let (a, b) = (a.clone(), b.clone());
            let done_at = done_at.clone();
            sim.spawn(async move {
                futures::join!(a.wait(&sim2), b.wait(&sim2));
                done_at.set(Some(sim2.time().ticks()));
            });
        }
        sim.schedule_trigger(2, &a);
        sim.schedule_trigger(7, &b);
        sim.run();
        assert_eq!(done_at.get(), Some(7));
    }

    #[test]
    #[should_panic(expected = "outside of a simulation process")]
    fn waiting_outside_a_process_panics() {
        let sim = Scheduler::new(1);
        let ev = Event::new();
        futures::executor::block_on(ev.wait(&sim));
    }
}
