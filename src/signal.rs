//! Typed value cells with change and edge notification.
//!
//! Two kinds of cell exist, mirroring the combinational/sequential split
//! of an RTL design:
//!
//! - [`Wire<T>`] mutates immediately: a write that changes the value fires
//!   the change notification synchronously, before the write returns, with
//!   no scheduler involvement. Use it for same-instant propagation.
//! - [`Signal<T>`] mutates through its [`Scheduler`]: the value update is
//!   itself a scheduled record, so even a zero-delay write is applied
//!   later in the same time step (one delta cycle), which is what
//!   distinguishes a register update from a combinational wire. Applied
//!   updates additionally fire a rising or falling edge notification
//!   depending on the direction of the change.
//!
//! Change detection is `PartialEq` (`new != old` fires), edge direction is
//! `PartialOrd` (`new > old` rising, `new < old` falling; incomparable
//! values fire neither edge). Arbitrary conditions are expressed with
//! [`Signal::when`], which compares the last-seen and current values with
//! a caller-supplied predicate on every change.
//!
//! The embedded events are private: the only way to fire them is to write
//! the cell.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::event::{BindingId, Event};
use crate::process::Wait;
use crate::scheduler::Scheduler;
use crate::time::SimTime;

/// An immediately-propagating value cell (combinational).
///
/// `Wire` is a cheap cloneable handle; clones share the same value and
/// change event.
pub struct Wire<T> {
    cell: Rc<RefCell<T>>,
    changed: Event,
}

impl<T> Clone for Wire<T> {
    fn clone(&self) -> Self {
        Wire {
            cell: Rc::clone(&self.cell),
            changed: self.changed.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Wire<T> {
    /// Creates a wire holding `initial`.
    pub fn new(initial: T) -> Self {
        Wire {
            cell: Rc::new(RefCell::new(initial)),
            changed: Event::new(),
        }
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    /// Writes `value`. If it differs from the stored value, the change
    /// notification fires synchronously before `set` returns.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.cell.borrow_mut();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.changed.trigger();
        }
    }

    /// Registers a callback invoked on every value change.
    pub fn on_change(&self, action: impl FnMut() + 'static) {
        self.changed.bind(action);
    }

    /// Registers a callback invoked on the next value change only.
    pub fn once_change(&self, action: impl FnOnce() + 'static) {
        self.changed.bind_once(action);
    }

    /// Registers a one-shot change callback that can be cancelled before
    /// it fires.
    pub fn cancellable_change(&self, action: impl FnOnce() + 'static) -> BindingId {
        self.changed.bind_cancellable(action)
    }

    /// Cancels a binding obtained from [`Wire::cancellable_change`].
    pub fn cancel(&self, id: BindingId) -> bool {
        self.changed.cancel(id)
    }
}

/// A scheduler-mediated, optionally delayed value cell (register-like).
///
/// `Signal` is a cheap cloneable handle; clones share the same value,
/// events and scheduler. The scheduler handle is non-owning: dropping the
/// scheduler's last external handle while signals remain is fine, but
/// writes go nowhere once the shared state is gone, so conventionally the
/// scheduler outlives its signals.
pub struct Signal<T> {
    cell: Rc<RefCell<T>>,
    changed: Event,
    rose: Event,
    fell: Event,
    sched: Scheduler,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            cell: Rc::clone(&self.cell),
            changed: self.changed.clone(),
            rose: self.rose.clone(),
            fell: self.fell.clone(),
            sched: self.sched.clone(),
        }
    }
}

impl<T: Clone + PartialOrd + 'static> Signal<T> {
    /// Creates a signal bound to `sched` holding `initial`.
    pub fn new(sched: &Scheduler, initial: T) -> Self {
        Signal {
            cell: Rc::new(RefCell::new(initial)),
            changed: Event::new(),
            rose: Event::new(),
            fell: Event::new(),
            sched: sched.clone(),
        }
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    /// Schedules a zero-delay write: the update is applied later in the
    /// current time step, after all records already due now.
    pub fn set(&self, value: T) {
        self.set_after(value, 0);
    }

    /// Schedules a write applied `delay` ticks from now.
    pub fn set_after(&self, value: T, delay: u64) {
        let signal = self.clone();
        self.sched.schedule(delay, move || signal.apply(value));
    }

    // The scheduled half of a write: swap the value and fire the change
    // event plus the matching edge event.
    fn apply(&self, value: T) {
        let previous = {
            let mut current = self.cell.borrow_mut();
            if *current == value {
                return;
            }
            let previous = current.clone();
            *current = value.clone();
            previous
        };
        self.changed.trigger();
        match value.partial_cmp(&previous) {
            Some(Ordering::Greater) => self.rose.trigger(),
            Some(Ordering::Less) => self.fell.trigger(),
            _ => {}
        }
    }

    /// Registers a callback invoked on every applied value change.
    pub fn on_change(&self, action: impl FnMut() + 'static) {
        self.changed.bind(action);
    }

    /// Registers a callback invoked on the next applied change only.
    pub fn once_change(&self, action: impl FnOnce() + 'static) {
        self.changed.bind_once(action);
    }

    /// Registers a callback invoked on every rising edge (`new > old`).
    pub fn on_rising(&self, action: impl FnMut() + 'static) {
        self.rose.bind(action);
    }

    /// Registers a callback invoked on the next rising edge only.
    pub fn once_rising(&self, action: impl FnOnce() + 'static) {
        self.rose.bind_once(action);
    }

    /// Registers a callback invoked on every falling edge (`new < old`).
    pub fn on_falling(&self, action: impl FnMut() + 'static) {
        self.fell.bind(action);
    }

    /// Registers a callback invoked on the next falling edge only.
    pub fn once_falling(&self, action: impl FnOnce() + 'static) {
        self.fell.bind_once(action);
    }

    /// Builds a conditional edge wait comparing the signal's last-seen and
    /// current values with `pred` on every change notification. The value
    /// at the time of this call is the initial "last seen" baseline.
    pub fn when(&self, pred: impl Fn(&T, &T) -> bool + 'static) -> EdgeWait<T> {
        EdgeWait {
            signal: self.clone(),
            seen: self.get(),
            pred: Rc::new(pred),
        }
    }

    /// Suspends the current process until the next applied change.
    pub fn changed(&self) -> Wait {
        let event = self.changed.clone();
        Wait::new(&self.sched, move |wake| event.bind_once(wake))
    }

    /// Suspends the current process until the next rising edge.
    pub fn rising(&self) -> Wait {
        let event = self.rose.clone();
        Wait::new(&self.sched, move |wake| event.bind_once(wake))
    }

    /// Suspends the current process until the next falling edge.
    pub fn falling(&self) -> Wait {
        let event = self.fell.clone();
        Wait::new(&self.sched, move |wake| event.bind_once(wake))
    }

    /// Returns a writer that applies writes `delay` ticks in the future.
    /// Delays compose: `signal.delayed(5).after(3)` writes 8 ticks out.
    pub fn delayed(&self, delay: u64) -> Delayed<T> {
        Delayed {
            signal: self.clone(),
            delay,
        }
    }

    /// Current simulated time of the owning scheduler.
    pub fn time(&self) -> SimTime {
        self.sched.time()
    }
}

/// A delayed writer for a [`Signal`], supporting chained delay composition.
pub struct Delayed<T> {
    signal: Signal<T>,
    delay: u64,
}

impl<T: Clone + PartialOrd + 'static> Delayed<T> {
    /// Schedules a write applied after this writer's accumulated delay.
    pub fn set(&self, value: T) {
        self.signal.set_after(value, self.delay);
    }

    /// Returns a writer with `extra` more ticks of delay.
    pub fn after(&self, extra: u64) -> Delayed<T> {
        Delayed {
            signal: self.signal.clone(),
            delay: self.delay + extra,
        }
    }

    /// The accumulated delay of this writer.
    pub fn delay(&self) -> u64 {
        self.delay
    }
}

/// A conditional edge wait built by [`Signal::when`].
///
/// Constructed as a temporary and consumed by one of its three binding
/// forms. The predicate receives `(last_seen, current)`; rising-edge
/// detection is `|old, new| new > old`.
pub struct EdgeWait<T> {
    signal: Signal<T>,
    seen: T,
    pred: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T: Clone + PartialOrd + 'static> EdgeWait<T> {
    /// On every change notification where the predicate holds, invokes
    /// `action`. The last-seen baseline advances on every notification,
    /// hit or miss.
    pub fn bind(self, mut action: impl FnMut() + 'static) {
        let signal = self.signal.clone();
        let pred = self.pred;
        let mut seen = self.seen;
        self.signal.changed.bind(move || {
            let current = signal.get();
            if pred(&seen, &current) {
                action();
            }
            seen = current;
        });
    }

    /// Invokes `action` the first time the predicate holds, then retires.
    /// On a miss it re-arms itself for the next notification instead of
    /// firing.
    pub fn bind_once(self, action: impl FnOnce() + 'static) {
        arm_once(self.signal, self.pred, self.seen, Box::new(action));
    }

    /// Suspends the current process until the predicate holds.
    pub fn wait(self) -> Wait {
        let EdgeWait { signal, seen, pred } = self;
        let sched = signal.sched.clone();
        Wait::new(&sched, move |wake| arm_once(signal, pred, seen, wake))
    }
}

fn arm_once<T: Clone + PartialOrd + 'static>(
    signal: Signal<T>,
    pred: Rc<dyn Fn(&T, &T) -> bool>,
    seen: T,
    action: Box<dyn FnOnce()>,
) {
    let event = signal.changed.clone();
    event.bind_once(move || {
        let current = signal.get();
        if pred(&seen, &current) {
            action();
        } else {
            arm_once(signal, pred, current, action);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn wire_fires_synchronously() {
        let wire = Wire::new(0u32);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            wire.on_change(move || hits.set(hits.get() + 1));
        }
        wire.set(1);
        assert_eq!(hits.get(), 1, "no run() needed for wire propagation");
        assert_eq!(wire.get(), 1);
    }

    #[test]
    fn wire_ignores_equal_write() {
        let wire = Wire::new(7u32);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            wire.on_change(move || hits.set(hits.get() + 1));
        }
        wire.set(7);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn wire_combinational_chain_propagates_in_one_call() {
        let a = Wire::new(0u32);
        let b = Wire::new(0u32);
        {
            let (a2, b2) = (a.clone(), b.clone());
            a.on_change(move || b2.set(a2.get() * 2));
        }
        a.set(21);
        assert_eq!(b.get(), 42);
    }

    #[test]
    fn signal_write_is_deferred_to_the_drain() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 0u32);
        let seen = Rc::new(Cell::new(None));
        {
            let sim2 = sim.clone();
            let sig2 = sig.clone();
            let seen = seen.clone();
            sig.on_change(move || seen.set(Some((sig2.get(), sim2.time()))));
        }
        sig.set(1);
        assert_eq!(sig.get(), 0, "zero-delay write not applied yet");
        assert_eq!(seen.get(), None);
        sim.run();
        assert_eq!(seen.get(), Some((1, SimTime::ZERO)));
    }

    #[test]
    fn edges_follow_value_direction() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 1u32);
        let rises = Rc::new(Cell::new(0));
        let falls = Rc::new(Cell::new(0));
        {
            let rises = rises.clone();
            sig.on_rising(move || rises.set(rises.get() + 1));
        }
        {
            let falls = falls.clone();
            sig.on_falling(move || falls.set(falls.get() + 1));
        }
        sig.set(5);
        sig.set(1);
        sim.run();
        assert_eq!(rises.get(), 1);
        assert_eq!(falls.get(), 1);
    }

    #[test]
    fn when_bind_fires_only_on_predicate_hits() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 1u32);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            sig.when(|old, new| new > old).bind(move || hits.set(hits.get() + 1));
        }
        sig.set_after(3, 0); // 1 -> 3, hit
        sig.set_after(2, 1); // 3 -> 2, miss
        sig.set_after(5, 2); // 2 -> 5, hit
        sim.run();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn when_bind_once_rearms_until_hit() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 1u32);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            sig.when(|_, new| *new == 3)
                .bind_once(move || hits.set(hits.get() + 1));
        }
        sig.set_after(5, 0);
        sig.set_after(3, 1);
        sig.set_after(4, 2);
        sig.set_after(3, 3);
        sim.run();
        assert_eq!(hits.get(), 1, "fires exactly once, at the first hit");
    }

    #[test]
    fn delayed_writer_accumulates_delay() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 0u32);
        let applied_at = Rc::new(Cell::new(None));
        {
            let sim2 = sim.clone();
            let applied_at = applied_at.clone();
            sig.on_change(move || applied_at.set(Some(sim2.time())));
        }
        let writer = sig.delayed(5).after(3);
        assert_eq!(writer.delay(), 8);
        writer.set(9);
        sim.run();
        assert_eq!(applied_at.get(), Some(SimTime::new(8)));
    }

    #[test]
    fn cancellable_wire_binding() {
        let wire = Wire::new(0u32);
        let hits = Rc::new(Cell::new(0));
        let id = {
            let hits = hits.clone();
            wire.cancellable_change(move || hits.set(hits.get() + 1))
        };
        assert!(wire.cancel(id));
        wire.set(1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn signal_time_passthrough() {
        let sim = Scheduler::new(1);
        let sig = Signal::new(&sim, 0u32);
        sim.schedule(4, || {});
        sim.step();
        assert_eq!(sig.time(), SimTime::new(4));
    }
}
