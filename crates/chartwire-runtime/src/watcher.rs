#![forbid(unsafe_code)]

//! Stabilization watcher.
//!
//! Re-probes the host element's relevant attributes on every digest until
//! they all evaluate to defined values, then releases its own subscription
//! and runs the build callback once.
//!
//! # State machine
//!
//! ```text
//!            probe stable              build ok
//! Pending ───────────────► Stable ─────────────────► (done)
//!    │                        │ build failed
//!    │ probe failed after     ▼
//!    └──── escalation ────► Broken
//! ```
//!
//! Inside the escalation window, failures are logged at `debug` and the
//! watcher stays pending. After it, the first failure of a tick is
//! returned from the digest and the watcher stops.
//!
//! # Invariants
//!
//! 1. The build callback runs at most once.
//! 2. The subscription is released in the same digest that leaves
//!    `Pending`, before the build callback runs.
//! 3. Deliveries that arrive after leaving `Pending` are no-ops.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use chartwire_core::Value;
use tracing::{debug, trace, warn};

use crate::config::DirectiveConfig;
use crate::dom::Element;
use crate::error::DirectiveError;
use crate::escalation::EscalationTimer;
use crate::reactive::Subscription;
use crate::resolver::{Probe, probe};
use crate::scope::Scope;

/// Watcher state. `Stable` and `Broken` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    Pending,
    Stable,
    Broken,
}

impl WatchState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

type BuildFn = Box<dyn FnOnce(&Scope, Vec<Value>) -> Result<(), DirectiveError>>;

/// Handle to a running watcher. Dropping it stops the watcher.
#[derive(Clone)]
pub struct StabilizationWatcher {
    inner: Rc<WatcherInner>,
}

struct WatcherInner {
    host: Rc<Element>,
    config: DirectiveConfig,
    escalation: EscalationTimer,
    state: Cell<WatchState>,
    ticks: Cell<u64>,
    last_error: RefCell<Option<DirectiveError>>,
    subscription: RefCell<Option<Subscription>>,
    on_stable: RefCell<Option<BuildFn>>,
}

impl StabilizationWatcher {
    /// Subscribe to `scope` and start probing `host` on each digest.
    ///
    /// `on_stable` receives the probed values in attribute order.
    pub fn start(
        scope: &Scope,
        host: Rc<Element>,
        config: DirectiveConfig,
        escalation: EscalationTimer,
        on_stable: impl FnOnce(&Scope, Vec<Value>) -> Result<(), DirectiveError> + 'static,
    ) -> Self {
        let inner = Rc::new(WatcherInner {
            host,
            config,
            escalation,
            state: Cell::new(WatchState::Pending),
            ticks: Cell::new(0),
            last_error: RefCell::new(None),
            subscription: RefCell::new(None),
            on_stable: RefCell::new(Some(Box::new(on_stable))),
        });
        let weak: Weak<WatcherInner> = Rc::downgrade(&inner);
        let subscription = scope.watch(move |scope| match weak.upgrade() {
            Some(inner) => inner.tick(scope),
            None => Ok(()),
        });
        *inner.subscription.borrow_mut() = Some(subscription);
        Self { inner }
    }

    #[must_use]
    pub fn state(&self) -> WatchState {
        self.inner.state.get()
    }

    /// Digests this watcher has probed on.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    /// Most recent failure: the terminal error once broken, otherwise the
    /// first failure of the latest pending tick.
    #[must_use]
    pub fn last_error(&self) -> Option<DirectiveError> {
        self.inner.last_error.borrow().clone()
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.subscription.borrow().is_some()
    }

    #[must_use]
    pub fn escalation(&self) -> &EscalationTimer {
        &self.inner.escalation
    }
}

impl WatcherInner {
    fn tick(&self, scope: &Scope) -> Result<(), DirectiveError> {
        if self.state.get().is_terminal() {
            return Ok(());
        }
        let tick = self.ticks.get() + 1;
        self.ticks.set(tick);
        trace!(tick, version = scope.version(), "probing attributes");

        let attrs = self.host.declarations();
        match probe(&attrs, scope, &self.config) {
            Probe::Stable(values) => self.stabilize(scope, values),
            Probe::Pending(failures) if self.escalation.has_fired() => {
                let Some(err) = failures.into_iter().next() else {
                    return Ok(());
                };
                warn!(tick, error = %err, "attribute still failing after escalation");
                Err(self.break_with(err))
            }
            Probe::Pending(failures) => {
                for failure in &failures {
                    debug!(tick, error = %failure, "attribute not ready");
                }
                *self.last_error.borrow_mut() = failures.into_iter().next();
                Ok(())
            }
        }
    }

    fn stabilize(&self, scope: &Scope, values: Vec<Value>) -> Result<(), DirectiveError> {
        self.state.set(WatchState::Stable);
        self.release();
        *self.last_error.borrow_mut() = None;
        let Some(build) = self.on_stable.borrow_mut().take() else {
            return Ok(());
        };
        build(scope, values).map_err(|err| {
            warn!(error = %err, "chart build failed");
            self.break_with(err)
        })
    }

    fn break_with(&self, err: DirectiveError) -> DirectiveError {
        self.state.set(WatchState::Broken);
        self.release();
        *self.last_error.borrow_mut() = Some(err.clone());
        err
    }

    fn release(&self) {
        // Take first so the guard drops after the RefCell borrow ends.
        let subscription = self.subscription.borrow_mut().take();
        drop(subscription);
    }
}

impl fmt::Debug for StabilizationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StabilizationWatcher")
            .field("state", &self.state())
            .field("ticks", &self.ticks())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
