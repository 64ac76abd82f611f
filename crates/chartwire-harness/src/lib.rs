#![forbid(unsafe_code)]

//! Test harness and reference fixtures for chartwire.
//!
//! - [`RecordingChart`]: a [`Chart`] that records every call the directive
//!   makes on it.
//! - [`fixture_library`]: a [`ChartRegistry`] with pie, bar, line and row
//!   kinds, each composed from mixin capability tables.
//! - [`Stage`]: a host element, manual clock and scheduler wired together.
//! - [`init_test_tracing`]: installs a test-friendly `tracing` subscriber.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Once;
use std::time::Duration;

use chartwire_core::{Callable, CapabilityDescriptor, OptionMap, Value};
use chartwire_runtime::{
    Chart, ChartDirective, ChartHandle, ChartRegistry, DirectiveConfig, DirectiveError, Element,
    LinkedChart, ManualClock, Scheduler, Scope,
};

// ============================================================================
// Capability tables
// ============================================================================

pub const BASE_OPTIONS: &[&str] = &[
    "chartGroup",
    "data",
    "dimension",
    "filter",
    "filterHandler",
    "group",
    "height",
    "keyAccessor",
    "label",
    "legend",
    "minHeight",
    "minWidth",
    "ordering",
    "renderLabel",
    "renderTitle",
    "title",
    "transitionDuration",
    "valueAccessor",
    "width",
];

pub const COLOR_OPTIONS: &[&str] = &[
    "colorAccessor",
    "colorDomain",
    "colors",
    "linearColors",
    "ordinalColors",
];

pub const MARGIN_OPTIONS: &[&str] = &["margins"];

pub const COORDINATE_GRID_OPTIONS: &[&str] = &[
    "brushOn",
    "elasticX",
    "elasticY",
    "mouseZoomable",
    "rangeChart",
    "renderHorizontalGridLines",
    "renderVerticalGridLines",
    "round",
    "x",
    "xAxis",
    "xAxisLabel",
    "xUnits",
    "y",
    "yAxis",
    "yAxisLabel",
    "zoomOutRestrict",
];

pub const STACK_OPTIONS: &[&str] = &["hidableStacks", "stack"];

pub const PIE_OPTIONS: &[&str] = &[
    "cx",
    "cy",
    "drawPaths",
    "externalLabels",
    "innerRadius",
    "minAngleForLabel",
    "radius",
    "slicesCap",
];

pub const BAR_OPTIONS: &[&str] = &[
    "alwaysUseRounding",
    "barPadding",
    "centerBar",
    "gap",
    "outerPadding",
];

pub const LINE_OPTIONS: &[&str] = &[
    "dashStyle",
    "dotRadius",
    "interpolate",
    "renderArea",
    "renderDataPoints",
    "tension",
];

pub const ROW_OPTIONS: &[&str] = &[
    "elasticX",
    "fixedBarHeight",
    "gap",
    "labelOffsetX",
    "labelOffsetY",
];

/// Fixture kinds, sorted.
pub const FIXTURE_KINDS: [&str; 4] = ["barChart", "lineChart", "pieChart", "rowChart"];

/// Capability descriptor of a fixture kind.
#[must_use]
pub fn descriptor_for(kind: &str) -> Option<CapabilityDescriptor> {
    let tables: &[&[&'static str]] = match kind {
        "pieChart" => &[BASE_OPTIONS, COLOR_OPTIONS, PIE_OPTIONS],
        "barChart" => &[
            BASE_OPTIONS,
            COLOR_OPTIONS,
            MARGIN_OPTIONS,
            COORDINATE_GRID_OPTIONS,
            STACK_OPTIONS,
            BAR_OPTIONS,
        ],
        "lineChart" => &[
            BASE_OPTIONS,
            COLOR_OPTIONS,
            MARGIN_OPTIONS,
            COORDINATE_GRID_OPTIONS,
            STACK_OPTIONS,
            LINE_OPTIONS,
        ],
        "rowChart" => &[BASE_OPTIONS, COLOR_OPTIONS, MARGIN_OPTIONS, ROW_OPTIONS],
        _ => return None,
    };
    Some(CapabilityDescriptor::from_tables(kind, tables))
}

// ============================================================================
// RecordingChart
// ============================================================================

/// A chart that records every call made on it.
#[derive(Debug)]
pub struct RecordingChart {
    descriptor: CapabilityDescriptor,
    group: Option<String>,
    host_tag: String,
    pub options_calls: Vec<OptionMap>,
    pub subscriptions: Vec<(String, Callable)>,
    pub filter_all_calls: usize,
    pub render_calls: usize,
    pub redraw_calls: usize,
}

impl RecordingChart {
    #[must_use]
    pub fn new(descriptor: CapabilityDescriptor, host: &Element, group: Option<&str>) -> Self {
        Self {
            descriptor,
            group: group.map(str::to_owned),
            host_tag: host.tag().to_owned(),
            options_calls: Vec::new(),
            subscriptions: Vec::new(),
            filter_all_calls: 0,
            render_calls: 0,
            redraw_calls: 0,
        }
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn host_tag(&self) -> &str {
        &self.host_tag
    }

    /// Event names subscribed, in subscription order.
    #[must_use]
    pub fn subscribed_events(&self) -> Vec<&str> {
        self.subscriptions.iter().map(|(e, _)| e.as_str()).collect()
    }

    /// Invoke every handler subscribed to `event`.
    ///
    /// # Errors
    ///
    /// The first handler failure.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<usize, chartwire_core::EvalError> {
        let mut called = 0;
        for (name, handler) in &self.subscriptions {
            if name == event {
                handler.call(args)?;
                called += 1;
            }
        }
        Ok(called)
    }

    /// The merged view of every `options` call.
    #[must_use]
    pub fn applied_options(&self) -> OptionMap {
        let mut merged = OptionMap::new();
        for call in &self.options_calls {
            merged.extend(call.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }
}

impl Chart for RecordingChart {
    fn kind(&self) -> &str {
        self.descriptor.kind()
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        self.descriptor.clone()
    }

    fn options(&mut self, options: &OptionMap) {
        self.options_calls.push(options.clone());
    }

    fn on(&mut self, event: &str, handler: Callable) {
        self.subscriptions.push((event.to_owned(), handler));
    }

    fn filter_all(&mut self) {
        self.filter_all_calls += 1;
    }

    fn render(&mut self) {
        self.render_calls += 1;
    }

    fn redraw(&mut self) {
        self.redraw_calls += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Borrow a handle as a [`RecordingChart`].
///
/// Returns `None` for other chart types.
#[must_use]
pub fn recording(chart: &ChartHandle) -> Option<Ref<'_, RecordingChart>> {
    Ref::filter_map(chart.borrow(), |c| c.as_any().downcast_ref::<RecordingChart>()).ok()
}

/// Registry creating [`RecordingChart`]s for every [`FIXTURE_KINDS`] entry.
#[must_use]
pub fn fixture_library() -> ChartRegistry {
    let mut registry = ChartRegistry::new();
    for kind in FIXTURE_KINDS {
        registry.register(kind, move |host, group| {
            let descriptor = descriptor_for(kind)
                .unwrap_or_else(|| CapabilityDescriptor::new(kind, &[]));
            let chart: ChartHandle = Rc::new(RefCell::new(RecordingChart::new(
                descriptor, host, group,
            )));
            chart
        });
    }
    registry
}

// ============================================================================
// Stage
// ============================================================================

/// Scheduler on a manual clock plus a directive over [`fixture_library`].
pub struct Stage {
    pub clock: ManualClock,
    pub scheduler: Scheduler,
    pub library: Rc<ChartRegistry>,
    pub directive: ChartDirective,
}

impl Stage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DirectiveConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DirectiveConfig) -> Self {
        let clock = ManualClock::new();
        let scheduler = Scheduler::with_clock(Scope::new(), Rc::new(clock.clone()));
        let library = Rc::new(fixture_library());
        let directive = ChartDirective::new(library.clone()).with_config(config);
        Self {
            clock,
            scheduler,
            library,
            directive,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        self.scheduler.scope()
    }

    /// Link `host` to the stage's scope.
    ///
    /// # Errors
    ///
    /// Link-time directive errors.
    pub fn link(&self, host: &Rc<Element>) -> Result<LinkedChart, DirectiveError> {
        self.directive.link(host, &self.scheduler)
    }

    /// One digest turn.
    ///
    /// # Errors
    ///
    /// The first watcher error of the digest.
    pub fn tick(&self) -> Result<usize, DirectiveError> {
        self.scheduler.turn()
    }

    /// Move the clock forward, then run one turn.
    ///
    /// # Errors
    ///
    /// The first watcher error of the digest.
    pub fn advance(&self, by: Duration) -> Result<usize, DirectiveError> {
        self.clock.advance(by);
        self.scheduler.turn()
    }

    /// Bind `name` to a JSON fixture.
    pub fn bind_json(&self, name: &str, value: serde_json::Value) {
        self.scope().set(name, value);
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

/// Host element with `pairs` as raw attributes.
#[must_use]
pub fn host(pairs: &[(&str, &str)]) -> Element {
    pairs
        .iter()
        .fold(Element::new("div"), |el, (name, value)| el.with_attribute(*name, *value))
}

// ============================================================================
// Tracing
// ============================================================================

static TRACING: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fixture_kind_has_a_descriptor() {
        for kind in FIXTURE_KINDS {
            let desc = descriptor_for(kind).unwrap();
            assert_eq!(desc.kind(), kind);
            assert!(desc.supports("width"));
            assert!(desc.supports("options"));
        }
        assert!(descriptor_for("radarChart").is_none());
    }

    #[test]
    fn mixins_separate_kinds() {
        let pie = descriptor_for("pieChart").unwrap();
        let bar = descriptor_for("barChart").unwrap();
        assert!(pie.supports("innerRadius") && !bar.supports("innerRadius"));
        assert!(bar.supports("barPadding") && bar.supports("xAxisLabel"));
        assert!(!pie.supports("xAxisLabel"));
    }

    #[test]
    fn recording_downcasts_fixture_charts() {
        let library = fixture_library();
        let host = Rc::new(Element::new("div"));
        let chart = chartwire_runtime::ChartLibrary::create(&library, "rowChart", &host, Some("g"))
            .unwrap();
        let rec = recording(&chart).unwrap();
        assert_eq!(rec.group(), Some("g"));
        assert_eq!(rec.host_tag(), "div");
        assert_eq!(rec.render_calls, 0);
    }

    #[test]
    fn init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        tracing::info!("tracing ready");
    }
}
