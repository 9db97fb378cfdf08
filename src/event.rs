//! Multicast trigger points.
//!
//! An [`Event`] holds an ordered list of registered callbacks and invokes
//! all of them when [`Event::trigger`] is called. It carries no value of
//! its own; signals build their change and edge notifications on top of it.
//!
//! Three binding dispositions exist:
//!
//! - [`bind`](Event::bind): fires on every trigger until the event is dropped.
//! - [`bind_once`](Event::bind_once): removed immediately after its first
//!   invocation.
//! - [`bind_cancellable`](Event::bind_cancellable): fires at most once and
//!   can be removed via [`cancel`](Event::cancel) before it fires.
//!
//! Dispatch uses a snapshot of the binding list taken at the start of
//! `trigger()`: callbacks registered while the event is firing are deferred
//! to the next trigger, and a `once` binding is never invoked twice, so
//! re-entrant use from inside a callback is well-defined.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::process::Wait;
use crate::scheduler::Scheduler;

/// Handle to a binding registered via [`Event::bind_cancellable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

enum Action {
    Always(Box<dyn FnMut()>),
    Once(Box<dyn FnOnce()>),
    Cancellable(Box<dyn FnOnce()>),
}

struct Binding {
    id: u64,
    action: Action,
}

struct EventInner {
    bindings: Vec<Binding>,
    // Snapshot entries taken by in-flight triggers that have not been
    // dispatched yet. Lets `cancel` tell a still-suppressible binding from
    // one that already fired.
    pending: FxHashSet<u64>,
    // Ids cancelled while a trigger snapshot is in flight. Consulted before
    // dispatching each snapshot entry, cleared when the outermost trigger
    // returns (ids are never reused, so leftovers cannot alias).
    cancelled: FxHashSet<u64>,
    next_id: u64,
    depth: u32,
}

/// A multicast trigger point.
///
/// `Event` is a cheap cloneable handle; all clones share the same binding
/// list. Signals embed private events and expose only binding, never
/// triggering; a standalone `Event` is triggered directly.
pub struct Event {
    inner: Rc<RefCell<EventInner>>,
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Event {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    /// Creates an event with no bindings.
    pub fn new() -> Self {
        Event {
            inner: Rc::new(RefCell::new(EventInner {
                bindings: Vec::new(),
                pending: FxHashSet::default(),
                cancelled: FxHashSet::default(),
                next_id: 0,
                depth: 0,
            })),
        }
    }

    fn push(&self, action: Action) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.bindings.push(Binding { id, action });
        id
    }

    /// Registers a persistent callback invoked on every trigger.
    pub fn bind(&self, action: impl FnMut() + 'static) {
        self.push(Action::Always(Box::new(action)));
    }

    /// Registers a callback removed immediately after its first invocation.
    pub fn bind_once(&self, action: impl FnOnce() + 'static) {
        self.push(Action::Once(Box::new(action)));
    }

    /// Registers a one-shot callback that can be removed via [`Event::cancel`]
    /// before it fires.
    pub fn bind_cancellable(&self, action: impl FnOnce() + 'static) -> BindingId {
        BindingId(self.push(Action::Cancellable(Box::new(action))))
    }

    /// Removes a cancellable binding.
    ///
    /// Returns `true` if the binding is now guaranteed not to fire: either
    /// it was still registered, or the trigger currently in flight had not
    /// dispatched it yet (its snapshot entry is suppressed). Returns
    /// `false` for unknown ids and for bindings that already fired.
    pub fn cancel(&self, id: BindingId) -> bool {
        let mut inner = self.inner.borrow_mut();
        if let Some(pos) = inner.bindings.iter().position(|b| b.id == id.0) {
            inner.bindings.remove(pos);
            return true;
        }
        if inner.pending.contains(&id.0) {
            inner.cancelled.insert(id.0);
            return true;
        }
        false
    }

    /// Invokes all currently registered callbacks in registration order.
    ///
    /// Works on a snapshot: callbacks bound during firing fire only on the
    /// next trigger. `once` and `cancellable` bindings are dropped after
    /// their invocation.
    pub fn trigger(&self) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            inner.depth += 1;
            let snapshot = std::mem::take(&mut inner.bindings);
            for binding in &snapshot {
                inner.pending.insert(binding.id);
            }
            snapshot
        };
        let mut kept = Vec::new();
        for binding in snapshot {
            let skip = {
                let mut inner = self.inner.borrow_mut();
                inner.pending.remove(&binding.id);
                inner.cancelled.contains(&binding.id)
            };
            if skip {
                continue;
            }
            match binding.action {
                Action::Always(mut action) => {
                    action();
                    kept.push(Binding {
                        id: binding.id,
                        action: Action::Always(action),
                    });
                }
                Action::Once(action) | Action::Cancellable(action) => action(),
            }
        }
        // Surviving persistent bindings were registered before anything
        // bound during dispatch, so they go back in front.
        let mut inner = self.inner.borrow_mut();
        inner.bindings.splice(0..0, kept);
        inner.depth -= 1;
        if inner.depth == 0 {
            inner.cancelled.clear();
        }
    }

    /// Suspends the current process until the next trigger of this event.
    ///
    /// The returned future must be awaited from inside a process spawned on
    /// `sched` (see [`Scheduler::spawn`]); polling it elsewhere panics.
    pub fn wait(&self, sched: &Scheduler) -> Wait {
        let event = self.clone();
        Wait::new(sched, move |wake| event.bind_once(wake))
    }

    /// Number of currently registered bindings.
    pub fn len(&self) -> usize {
        self.inner.borrow().bindings.len()
    }

    /// Returns `true` if no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().bindings.is_empty()
    }
}
