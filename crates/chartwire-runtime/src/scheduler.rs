#![forbid(unsafe_code)]

//! Cooperative single-threaded scheduling: clocks, one-shot timers, and the
//! turn loop that delivers digests.
//!
//! Nothing here blocks or spawns. The host drives the loop by calling
//! [`Scheduler::turn`] (fire due timers, then digest) or
//! [`Scheduler::apply`] (mutate the scope, then digest) whenever it has
//! something to deliver.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::error::DirectiveError;
use crate::scope::Scope;

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `web_time::Instant`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same offset.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Identifier of a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    deadline: Instant,
    callback: Box<dyn FnOnce()>,
}

struct TimerState {
    next_id: u64,
    timers: Vec<Timer>,
}

/// One-shot deferred callbacks on a shared clock.
#[derive(Clone)]
pub struct TimerQueue {
    clock: Rc<dyn Clock>,
    state: Rc<RefCell<TimerState>>,
}

impl TimerQueue {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(TimerState {
                next_id: 0,
                timers: Vec::new(),
            })),
        }
    }

    /// Run `callback` once, no earlier than `delay` from now.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let deadline = self.clock.now() + delay;
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        state.timers.push(Timer {
            id,
            deadline,
            callback: Box::new(callback),
        });
        id
    }

    /// Fire every timer whose deadline has passed, earliest first.
    ///
    /// Callbacks run with the queue unlocked, so they may schedule more
    /// timers; those are picked up by a later call.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut due = {
            let mut state = self.state.borrow_mut();
            let (due, pending): (Vec<Timer>, Vec<Timer>) = std::mem::take(&mut state.timers)
                .into_iter()
                .partition(|t| t.deadline <= now);
            state.timers = pending;
            due
        };
        due.sort_by_key(|t| (t.deadline, t.id));
        let fired = due.len();
        for timer in due {
            (timer.callback)();
        }
        fired
    }

    /// Timers not yet fired.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.borrow().timers.iter().map(|t| t.deadline).min()
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// A scope plus the timers that feed it.
#[derive(Clone, Debug)]
pub struct Scheduler {
    scope: Scope,
    timers: TimerQueue,
}

impl Scheduler {
    /// Scheduler on the system clock.
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self::with_clock(scope, Rc::new(SystemClock))
    }

    pub fn with_clock(scope: Scope, clock: Rc<dyn Clock>) -> Self {
        Self {
            scope,
            timers: TimerQueue::new(clock),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Fire due timers, then deliver one digest.
    ///
    /// # Errors
    ///
    /// Returns the first watcher error of the digest.
    pub fn turn(&self) -> Result<usize, DirectiveError> {
        self.timers.run_due();
        self.scope.digest()
    }

    /// Mutate the scope, then deliver one digest.
    ///
    /// # Errors
    ///
    /// Returns the first watcher error of the digest.
    pub fn apply(&self, mutate: impl FnOnce(&Scope)) -> Result<usize, DirectiveError> {
        mutate(&self.scope);
        self.scope.digest()
    }
}
