#![forbid(unsafe_code)]

//! Chart collaborator traits and a factory registry.
//!
//! The directive never knows what a chart draws. It needs a factory keyed by
//! kind, a capability descriptor per instance, a bulk option setter, event
//! subscription, selection reset, and render/redraw triggers.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use chartwire_core::{Callable, CapabilityDescriptor, OptionMap};
use tracing::trace;

use crate::dom::Element;

/// A configurable chart instance.
pub trait Chart: Any {
    fn kind(&self) -> &str;

    /// Options this instance accepts.
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Bulk option setter.
    fn options(&mut self, options: &OptionMap);

    /// Subscribe `handler` to a lifecycle event such as `preRender`.
    fn on(&mut self, event: &str, handler: Callable);

    /// Clear every active selection.
    fn filter_all(&mut self);

    fn render(&mut self);

    fn redraw(&mut self);

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a built chart.
pub type ChartHandle = Rc<RefCell<dyn Chart>>;

/// Chart factory collaborator.
pub trait ChartLibrary {
    fn supports(&self, kind: &str) -> bool;

    /// Construct an unconfigured chart bound to `host`, or `None` for an
    /// unknown kind.
    fn create(&self, kind: &str, host: &Rc<Element>, group: Option<&str>) -> Option<ChartHandle>;

    /// Redraw every live chart in `group` (`None` is the default group).
    fn redraw_all(&self, group: Option<&str>);
}

type Factory = Box<dyn Fn(&Rc<Element>, Option<&str>) -> ChartHandle>;

/// A [`ChartLibrary`] assembled from named factories.
///
/// Charts are tracked weakly per group; dropped charts fall out of
/// `redraw_all` on their own.
#[derive(Default)]
pub struct ChartRegistry {
    factories: HashMap<String, Factory>,
    groups: RefCell<HashMap<Option<String>, Vec<Weak<RefCell<dyn Chart>>>>>,
}

impl ChartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `kind`, replacing an earlier one.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&Rc<Element>, Option<&str>) -> ChartHandle + 'static,
    ) {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    #[must_use]
    pub fn with(
        mut self,
        kind: impl Into<String>,
        factory: impl Fn(&Rc<Element>, Option<&str>) -> ChartHandle + 'static,
    ) -> Self {
        self.register(kind, factory);
        self
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Live charts in `group`.
    #[must_use]
    pub fn group_members(&self, group: Option<&str>) -> Vec<ChartHandle> {
        let mut groups = self.groups.borrow_mut();
        let Some(members) = groups.get_mut(&group.map(str::to_owned)) else {
            return Vec::new();
        };
        members.retain(|w| w.strong_count() > 0);
        members.iter().filter_map(Weak::upgrade).collect()
    }
}

impl ChartLibrary for ChartRegistry {
    fn supports(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    fn create(&self, kind: &str, host: &Rc<Element>, group: Option<&str>) -> Option<ChartHandle> {
        let factory = self.factories.get(kind)?;
        let chart = factory(host, group);
        self.groups
            .borrow_mut()
            .entry(group.map(str::to_owned))
            .or_default()
            .push(Rc::downgrade(&chart));
        Some(chart)
    }

    fn redraw_all(&self, group: Option<&str>) {
        for chart in self.group_members(group) {
            // A chart already borrowed is mid-callback on this stack and
            // will draw itself when that returns.
            match chart.try_borrow_mut() {
                Ok(mut chart) => chart.redraw(),
                Err(_) => trace!(?group, "skipping chart busy during redraw_all"),
            }
        }
    }
}

impl fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartRegistry")
            .field("kinds", &self.kinds())
            .field("groups", &self.groups.borrow().len())
            .finish()
    }
}
