#![forbid(unsafe_code)]

//! The `ChartDirective` entry point.
//!
//! Linking a host element reads its kind and group attributes, checks the
//! kind against the chart library, installs the scope helpers, and starts
//! the escalation timer and stabilization watcher. The chart itself is built
//! later, inside whichever digest first sees every attribute defined.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::builder::{BuildPlan, build_chart};
use crate::chart::{ChartHandle, ChartLibrary};
use crate::config::DirectiveConfig;
use crate::dom::Element;
use crate::error::DirectiveError;
use crate::escalation::EscalationTimer;
use crate::scheduler::Scheduler;
use crate::watcher::{StabilizationWatcher, WatchState};

/// Links host elements to charts from one library.
#[derive(Clone)]
pub struct ChartDirective {
    library: Rc<dyn ChartLibrary>,
    config: DirectiveConfig,
}

impl ChartDirective {
    pub fn new(library: Rc<dyn ChartLibrary>) -> Self {
        Self {
            library,
            config: DirectiveConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DirectiveConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DirectiveConfig {
        &self.config
    }

    /// Start resolving `host` against `scheduler`'s scope.
    ///
    /// # Errors
    ///
    /// - [`DirectiveError::MissingKind`] if the kind attribute is absent or
    ///   blank.
    /// - [`DirectiveError::UnknownKind`] if the library has no such kind.
    pub fn link(
        &self,
        host: &Rc<Element>,
        scheduler: &Scheduler,
    ) -> Result<LinkedChart, DirectiveError> {
        let attrs = host.declarations();
        let kind = attrs
            .get(&self.config.kind_attribute)
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .ok_or_else(|| DirectiveError::MissingKind {
                attribute: self.config.kind_attribute.clone(),
            })?
            .to_owned();
        if !self.library.supports(&kind) {
            return Err(DirectiveError::UnknownKind { kind });
        }
        let group = attrs
            .get(&self.config.group_attribute)
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .map(str::to_owned);

        let scope = scheduler.scope();
        if self.config.install_date_helpers {
            scope.install_date_helpers();
        }

        let plan = BuildPlan {
            library: Rc::clone(&self.library),
            host: Rc::clone(host),
            config: self.config.clone(),
            kind: kind.clone(),
            group: group.clone(),
        };
        let chart: Rc<RefCell<Option<ChartHandle>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&chart);
        let escalation = EscalationTimer::start(scheduler.timers(), self.config.escalation_delay());
        let watcher = StabilizationWatcher::start(
            scope,
            Rc::clone(host),
            self.config.clone(),
            escalation,
            move |scope, values| {
                debug!(attributes = values.len(), "scope settled");
                let built = build_chart(&plan, scope)?;
                *slot.borrow_mut() = Some(built);
                Ok(())
            },
        );
        debug!(%kind, ?group, "linked chart directive");

        Ok(LinkedChart {
            kind,
            group,
            watcher,
            chart,
        })
    }
}

impl fmt::Debug for ChartDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartDirective")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One linked host element. Dropping it stops a pending watcher.
pub struct LinkedChart {
    kind: String,
    group: Option<String>,
    watcher: StabilizationWatcher,
    chart: Rc<RefCell<Option<ChartHandle>>>,
}

impl LinkedChart {
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> WatchState {
        self.watcher.state()
    }

    /// The built chart, once stable.
    #[must_use]
    pub fn chart(&self) -> Option<ChartHandle> {
        self.chart.borrow().clone()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<DirectiveError> {
        self.watcher.last_error()
    }

    #[must_use]
    pub fn is_escalated(&self) -> bool {
        self.watcher.escalation().has_fired()
    }

    #[must_use]
    pub fn watcher(&self) -> &StabilizationWatcher {
        &self.watcher
    }
}

impl fmt::Debug for LinkedChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedChart")
            .field("kind", &self.kind)
            .field("group", &self.group)
            .field("watcher", &self.watcher)
            .field("built", &self.chart.borrow().is_some())
            .finish()
    }
}
