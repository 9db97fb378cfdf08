//! The time-ordered event queue at the heart of the kernel.
//!
//! The [`Scheduler`] owns a min-priority queue of `(time, sequence)`-keyed
//! records, the simulated clock, and all spawned processes. Records due at
//! the same simulated time execute in the order they were scheduled; the
//! sequence number is a globally increasing counter assigned at enqueue
//! time, which makes execution order reproducible for identical programs.
//!
//! `run*` drains records strictly in `(time, sequence)` order and re-checks
//! the queue head after every pop, so a zero-delay record enqueued while
//! processing time `t` still runs before the clock advances past `t`. This
//! is what gives the engine delta-cycle semantics without a second queue
//! tier: a register-like [`Signal`](crate::Signal) write with delay 0 is
//! applied later in the same time step, never in the same instant.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::event::Event;
use crate::process::{ProcessId, Registry};
use crate::time::SimTime;

struct ScheduledRecord {
    time: SimTime,
    seq: u64,
    action: Box<dyn FnOnce()>,
}

impl PartialEq for ScheduledRecord {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.seq) == (other.time, other.seq)
    }
}

impl Eq for ScheduledRecord {}

impl PartialOrd for ScheduledRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that BinaryHeap pops the earliest (time, seq) first.
        (other.time, other.seq).cmp(&(self.time, self.seq))
    }
}

pub(crate) struct SchedulerState {
    clock: SimTime,
    seq: u64,
    queue: BinaryHeap<ScheduledRecord>,
    rand: Pcg64,
    pub(crate) processes: Registry,
    pub(crate) current: Option<ProcessId>,
}

/// The simulation scheduler: owns the event queue, the simulated clock,
/// the deterministic random generator, and all spawned processes.
///
/// `Scheduler` is a cheap cloneable handle; clones share the same state,
/// which is how signals and processes keep a non-owning reference to their
/// scheduler. All execution is single-threaded: scheduled actions, signal
/// updates and process resumptions run strictly sequentially inside one
/// `run*` call.
pub struct Scheduler {
    pub(crate) state: Rc<RefCell<SchedulerState>>,
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Scheduler {
            state: Rc::clone(&self.state),
        }
    }
}

impl Scheduler {
    /// Creates an empty scheduler at `T=0`.
    ///
    /// `seed` initializes the simulation-wide random generator, so two
    /// schedulers built with the same seed and driven by the same program
    /// produce identical runs.
    pub fn new(seed: u64) -> Self {
        Scheduler {
            state: Rc::new(RefCell::new(SchedulerState {
                clock: SimTime::ZERO,
                seq: 0,
                queue: BinaryHeap::new(),
                rand: Pcg64::seed_from_u64(seed),
                processes: Registry::new(),
                current: None,
            })),
        }
    }

    /// Enqueues `action` to run `delay` ticks from the current time.
    ///
    /// Records scheduled for the same time run in the order they were
    /// scheduled.
    ///
    /// # Panics
    ///
    /// Panics if `time() + delay` overflows [`SimTime`]; scheduling past
    /// the end of representable time is a programmer error.
    pub fn schedule(&self, delay: u64, action: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        let time = state
            .clock
            .advance(delay)
            .expect("simulation time overflow while scheduling");
        let seq = state.seq;
        state.seq += 1;
        state.queue.push(ScheduledRecord {
            time,
            seq,
            action: Box::new(action),
        });
    }

    /// Convenience: enqueues a record that triggers `event` after `delay`.
    pub fn schedule_trigger(&self, delay: u64, event: &Event) {
        let event = event.clone();
        self.schedule(delay, move || event.trigger());
    }

    /// Runs until the queue is exhausted, then resets the scheduler.
    ///
    /// Returns the number of executed records. A panic inside a scheduled
    /// action propagates out unmodified, leaving the queue and clock
    /// observable and un-reset.
    pub fn run(&self) -> u64 {
        self.run_until(SimTime::MAX)
    }

    /// Runs while the next due record is strictly before `max_time`, then
    /// resets the scheduler. Returns the number of executed records.
    pub fn run_until(&self, max_time: SimTime) -> u64 {
        let mut executed = 0;
        while self.dispatch_next(max_time) {
            executed += 1;
        }
        self.reset();
        executed
    }

    /// Runs like [`run`](Scheduler::run), but additionally stops once
    /// `wall` time has elapsed on the host clock. Intended for interactive
    /// and soak runs; the simulated-time stopping point is therefore only
    /// best-effort reproducible. Resets on exit.
    pub fn run_for(&self, wall: Duration) -> u64 {
        let started = Instant::now();
        let mut executed = 0;
        while started.elapsed() < wall && self.dispatch_next(SimTime::MAX) {
            executed += 1;
        }
        if !self.is_empty() {
            log::debug!(
                "wall-clock budget exhausted at {} with {} records pending",
                self.time(),
                self.len()
            );
        }
        self.reset();
        executed
    }

    /// Executes exactly one due record without resetting.
    ///
    /// Returns `false` if the queue is empty. Useful for stepping through a
    /// simulation and inspecting state between records.
    pub fn step(&self) -> bool {
        self.dispatch_next(SimTime::MAX)
    }

    // Pops and executes the head record if it is due before `max_time`.
    fn dispatch_next(&self, max_time: SimTime) -> bool {
        let record = {
            let mut state = self.state.borrow_mut();
            let due = match state.queue.peek() {
                Some(head) => head.time,
                None => return false,
            };
            if due >= max_time {
                return false;
            }
            assert!(due >= state.clock, "simulated time went backward");
            state.clock = due;
            state.queue.pop()
        };
        if let Some(record) = record {
            (record.action)();
        }
        true
    }

    /// Clears the queue, zeroes the clock and the sequence counter, and
    /// destroys all owned processes. The random generator keeps its state.
    pub fn reset(&self) {
        log::trace!("scheduler reset at {}", self.time());
        let mut state = self.state.borrow_mut();
        state.queue.clear();
        state.clock = SimTime::ZERO;
        state.seq = 0;
        state.current = None;
        state.processes.clear();
    }

    /// Current simulated time.
    pub fn time(&self) -> SimTime {
        self.state.borrow().clock
    }

    /// Returns `true` if no records are pending.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().queue.is_empty()
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Generates a random value in `range` using the simulation-wide
    /// deterministic generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.state.borrow_mut().rand.gen_range(range)
    }

    /// Generates a random float in `[0, 1)` using the simulation-wide
    /// deterministic generator.
    pub fn rand(&self) -> f64 {
        self.state.borrow_mut().rand.gen()
    }
}
