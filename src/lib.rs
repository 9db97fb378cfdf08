//! rtlsim is a discrete event simulation kernel in the style of an RTL simulator. It provides a deterministic
//! scheduler with delta-cycle semantics, multicast events, synchronous wires and scheduler-mediated signals with edge
//! detection, and suspendable processes. It allows to use both callbacks and asynchronous waiting to conveniently
//! model any execution logic, from hardware designs at the register-transfer level to generic timed state machines.
//!
//! ## Contents
//!
//! - [Basic Concepts](crate#basic-concepts)
//! - [Example](crate#example)
//! - [Delta Cycles and Determinism](crate#delta-cycles-and-determinism)
//! - [Reacting to Changes via Callbacks](crate#reacting-to-changes-via-callbacks)
//! - [Processes](crate#processes)
//!
//! ## Basic Concepts
//!
//! rtlsim models are built from _values_ connected by _notifications_ and driven by a single _scheduler_.
//!
//! **Scheduler.** The [`Scheduler`] owns the simulated clock and a queue of pending actions. Every action is stamped
//! with the time at which it must run and a sequence number assigned at scheduling; actions are dispatched in
//! `(time, sequence)` order, so two actions due at the same instant run in the order they were scheduled. Simulated
//! time is purely logical: it advances only when the scheduler dispatches an action due later than the current clock,
//! never by observing the wall clock. A scheduler created twice from the same seed replays the same simulation,
//! including all random draws from its built-in generator.
//!
//! **Event.** An [`Event`] is a multicast trigger point: an ordered list of callbacks invoked together when the event
//! fires. Callbacks can be persistent ([`bind`](Event::bind)), one-shot ([`bind_once`](Event::bind_once)), or one-shot
//! and cancellable ([`bind_cancellable`](Event::bind_cancellable)). Events carry no value; the typed value cells below
//! are built on top of them.
//!
//! **Wire.** A [`Wire<T>`] is a value cell with synchronous propagation: writing a different value fires its change
//! notification before the write returns, with no scheduler involvement. Wires model combinational connections where
//! a change must be visible in the same instant it is produced.
//!
//! **Signal.** A [`Signal<T>`] is a value cell whose writes go through the scheduler: even a zero-delay write is
//! applied as a later action in the same time step, so readers registered before the write still observe the old value
//! until the update record runs. Applied changes additionally fire a rising or falling edge notification depending on
//! whether the value increased or decreased, and [`Signal::when`] waits for an arbitrary condition over the old and
//! new value. Signals model registers and ports; clock edges, handshake lines and counters are all signals.
//!
//! **Process.** A process is an asynchronous activity spawned on the scheduler via [`Scheduler::spawn`]. Inside a
//! process, [`Scheduler::sleep`], [`Event::wait`], [`Signal::changed`], [`Signal::rising`] and friends return futures
//! that suspend the process until the corresponding instant or notification, which lets multistep protocols read as
//! straight-line code instead of a callback chain.
//!
//! ## Example
//!
//! The classic RTL hello-world: a free-running clock and a counter that increments on each rising edge.
//!
//! ```rust
//! use rtlsim::{Scheduler, Signal};
//!
//! fn main() {
//!     // Create simulation with random seed 123
//!     let sim = Scheduler::new(123);
//!     let clk = Signal::new(&sim, 0u8);
//!     let count = Signal::new(&sim, 0u32);
//!
//!     // Drive 8 clock edges, one every 5 ticks: rising at T=5, 15, 25, 35.
//!     for i in 0..8u64 {
//!         clk.set_after(((i + 1) % 2) as u8, 5 * (i + 1));
//!     }
//!
//!     // The counter increments on every rising edge of the clock.
//!     {
//!         let count = count.clone();
//!         clk.on_rising(move || count.set(count.get() + 1));
//!     }
//!
//!     // Run until no actions remain.
//!     sim.run();
//!     assert_eq!(count.get(), 4);
//! }
//! ```
//!
//! ## Delta Cycles and Determinism
//!
//! A zero-delay write does not mutate in place: it schedules an update due at the current instant, behind everything
//! already due now. The scheduler drains these same-instant actions, in scheduling order, before advancing the clock;
//! each drained action is one _delta cycle_. This is what makes register semantics come out right: when a clock edge
//! fires several callbacks that all write signals, every callback reads the pre-edge values, and all updates land
//! together before time moves on. Chains of zero-delay writes (a written signal firing a callback that writes another
//! signal) settle the same way, any number of delta cycles deep, all at one simulated instant.
//!
//! Determinism follows from the total `(time, sequence)` order: there is exactly one legal dispatch order for any set
//! of scheduled actions, so a model run twice from the same seed produces the same trace. The built-in random
//! generator ([`Scheduler::gen_range`], [`Scheduler::rand`]) is seeded at construction for the same reason: model
//! randomness comes from the scheduler, not from ambient entropy.
//!
//! ## Reacting to Changes via Callbacks
//!
//! The default way to react to a value change is to register a callback on the cell: [`Wire::on_change`],
//! [`Signal::on_change`], [`Signal::on_rising`], [`Signal::on_falling`], each with a `once_` variant that fires a
//! single time. Conditions beyond edge direction use [`Signal::when`] with a predicate over the last-seen and current
//! value; its one-shot form re-arms itself on a miss, so it fires on the first change for which the predicate holds,
//! not just the next change.
//!
//! Callbacks are invoked in registration order, on a snapshot of the binding list: a callback registered while the
//! notification is firing runs from the next notification on. This keeps re-entrant registration (a callback that
//! re-arms itself, as `when` does internally) well-defined.
//!
//! Callbacks are convenient for local, single-step reactions. Logic that spans several waits (send a request, await
//! the acknowledge, drop the request, await the release) gets spread across callback functions with the intermediate
//! state carried in shared cells, which is harder to follow. Processes exist for exactly that case.
//!
//! ## Processes
//!
//! A process is an `async` block spawned on the scheduler. It runs immediately up to its first suspension point and
//! afterwards resumes whenever an awaited instant or notification arrives. The example below models a two-phase
//! req/ack handshake with the payload on a wire; note how each side reads as a linear protocol description.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use rtlsim::{Scheduler, Signal, Wire};
//!
//! fn main() {
//!     let sim = Scheduler::new(42);
//!     let req = Signal::new(&sim, 0u8);
//!     let ack = Signal::new(&sim, 0u8);
//!     let data = Wire::new(0u32);
//!
//!     // Producer: one transfer every 10 ticks.
//!     {
//!         let sim2 = sim.clone();
//!         let (req, ack, data) = (req.clone(), ack.clone(), data.clone());
//!         sim.spawn(async move {
//!             for item in [10u32, 20, 30] {
//!                 sim2.sleep(10).await;
//!                 data.set(item);
//!                 req.set(1);
//!                 ack.rising().await;
//!                 req.set(0);
//!                 ack.falling().await;
//!             }
//!         });
//!     }
//!
//!     // Consumer: latch the payload on each request, then acknowledge.
//!     let received = Rc::new(RefCell::new(Vec::new()));
//!     {
//!         let (req, ack, data) = (req.clone(), ack.clone(), data.clone());
//!         let received = received.clone();
//!         sim.spawn(async move {
//!             loop {
//!                 req.rising().await;
//!                 received.borrow_mut().push(data.get());
//!                 ack.set(1);
//!                 req.falling().await;
//!                 ack.set(0);
//!             }
//!         });
//!     }
//!
//!     sim.run();
//!     assert_eq!(*received.borrow(), vec![10, 20, 30]);
//! }
//! ```
//!
//! [`Scheduler::spawn`] keeps the process alive until the scheduler is reset, which suits servers like the consumer
//! above that loop forever. [`Scheduler::spawn_once`] is for processes with a natural end: their resources are
//! reclaimed as soon as the body returns, and the returned [`ProcessId`] answers [`Scheduler::is_alive`] queries.
//! It is also possible to wait for multiple notifications simultaneously using the `join` and `select` primitives
//! from the [futures](https://crates.io/crates/futures) crate.
//!
//! Processes complement callbacks rather than replace them; both register into the same events and interleave freely
//! in one model. For work that must run to completion immediately, with a panic captured instead of propagated, see
//! [`Task`].

#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]

pub mod event;
pub mod log;
pub mod process;
pub mod scheduler;
pub mod signal;
pub mod task;
pub mod time;

pub use event::{BindingId, Event};
pub use process::{ProcessId, Wait};
pub use scheduler::Scheduler;
pub use signal::{Delayed, EdgeWait, Signal, Wire};
pub use task::Task;
pub use time::SimTime;
