#![forbid(unsafe_code)]

//! One-shot chart construction and wiring.
//!
//! Runs after the watcher reports a stable scope:
//!
//! 1. Create the chart through the library.
//! 2. Derive the whitelist from the chart's capabilities and resolve the
//!    option map.
//! 3. Merge a nested `options` map into the top level and drop the key.
//! 4. Bind the chart under `name` in the scope and drop the key.
//! 5. Hand the remaining map to the chart's bulk setter.
//! 6. Subscribe the lifecycle handlers that are present.
//! 7. Call `postSetupChart(chart, options)` when it is a function.
//! 8. Wire the reset control, if the host has one.
//! 9. Render.

use std::rc::Rc;

use chartwire_core::{
    Handle, LifecycleEvent, NAME_OPTION, NESTED_OPTIONS, OptionMap, POST_SETUP_OPTION, Value,
    Whitelist, deep_merge,
};
use tracing::{info, warn};

use crate::chart::{ChartHandle, ChartLibrary};
use crate::config::DirectiveConfig;
use crate::dom::Element;
use crate::error::DirectiveError;
use crate::resolver::resolve_options;
use crate::scope::Scope;

/// Everything the builder reads.
#[derive(Clone)]
pub struct BuildPlan {
    pub library: Rc<dyn ChartLibrary>,
    pub host: Rc<Element>,
    pub config: DirectiveConfig,
    pub kind: String,
    pub group: Option<String>,
}

/// Wrap a chart for binding into the scope or passing to callbacks.
///
/// Hosts recover it with `handle.downcast_ref::<ChartHandle>()`.
#[must_use]
pub fn chart_value(chart: &ChartHandle) -> Value {
    Value::Handle(Handle::new(Rc::clone(chart)))
}

/// Build, configure, and render one chart.
///
/// # Errors
///
/// - [`DirectiveError::UnknownKind`] if the library cannot create the kind.
/// - [`DirectiveError::Evaluation`] if a whitelisted attribute fails.
/// - [`DirectiveError::Callback`] if `postSetupChart` fails.
pub fn build_chart(plan: &BuildPlan, scope: &Scope) -> Result<ChartHandle, DirectiveError> {
    let group = plan.group.as_deref();
    let chart = plan
        .library
        .create(&plan.kind, &plan.host, group)
        .ok_or_else(|| DirectiveError::UnknownKind {
            kind: plan.kind.clone(),
        })?;

    let descriptor = chart.borrow().capabilities();
    let whitelist = Whitelist::for_descriptor(&descriptor, &plan.config.naming());
    let attrs = plan.host.declarations();
    let mut options = resolve_options(&attrs, scope, &whitelist, &plan.config)?;

    merge_nested(&mut options);
    bind_name(&mut options, scope, &chart);

    chart.borrow_mut().options(&options);
    subscribe_lifecycle(&options, &chart);
    run_post_setup(&options, &chart)?;
    wire_reset(plan, &chart);

    chart.borrow_mut().render();
    info!(
        kind = %plan.kind,
        group = group.unwrap_or(""),
        options = options.len(),
        "chart built"
    );
    Ok(chart)
}

fn merge_nested(options: &mut OptionMap) {
    let Some(nested) = options.remove(NESTED_OPTIONS) else {
        return;
    };
    match nested {
        Value::Object(map) => {
            deep_merge(options, &map);
            options.remove(NESTED_OPTIONS);
        }
        Value::Undefined => {}
        other => warn!(found = other.type_name(), "ignoring non-object `options`"),
    }
}

fn bind_name(options: &mut OptionMap, scope: &Scope, chart: &ChartHandle) {
    match options.remove(NAME_OPTION) {
        Some(Value::String(name)) => scope.set(name, chart_value(chart)),
        Some(Value::Undefined) | None => {}
        Some(other) => warn!(found = other.type_name(), "ignoring non-string `name`"),
    }
}

fn subscribe_lifecycle(options: &OptionMap, chart: &ChartHandle) {
    for event in LifecycleEvent::ALL {
        match options.get(event.option_name()) {
            Some(Value::Function(handler)) => {
                chart.borrow_mut().on(event.event_name(), handler.clone());
            }
            Some(Value::Undefined) | None => {}
            Some(other) => warn!(
                option = event.option_name(),
                found = other.type_name(),
                "lifecycle handler is not callable"
            ),
        }
    }
}

fn run_post_setup(options: &OptionMap, chart: &ChartHandle) -> Result<(), DirectiveError> {
    let Some(Value::Function(hook)) = options.get(POST_SETUP_OPTION) else {
        return Ok(());
    };
    hook.call(&[chart_value(chart), Value::Object(options.clone())])
        .map(drop)
        .map_err(|source| DirectiveError::Callback {
            hook: POST_SETUP_OPTION.to_owned(),
            source,
        })
}

fn wire_reset(plan: &BuildPlan, chart: &ChartHandle) {
    let Some(reset) = plan.host.query_selector(&plan.config.reset_selector) else {
        return;
    };
    let target = Rc::downgrade(chart);
    let library = Rc::clone(&plan.library);
    let group = plan.group.clone();
    reset.add_click_listener(move |_| {
        if let Some(chart) = target.upgrade() {
            chart.borrow_mut().filter_all();
        }
        library.redraw_all(group.as_deref());
    });
    reset.suppress_navigation();
    reset.set_display("none");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartwire_core::{Callable, CapabilityDescriptor, EvalError};
    use std::any::Any;
    use std::cell::RefCell;

    use crate::chart::{Chart, ChartRegistry};

    #[derive(Default)]
    struct Recorder {
        options: Vec<OptionMap>,
        events: Vec<String>,
        filter_all: usize,
        renders: usize,
        redraws: usize,
    }

    impl Chart for Recorder {
        fn kind(&self) -> &str {
            "probe"
        }
        fn capabilities(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::new("probe", &["someOption", "color"])
        }
        fn options(&mut self, options: &OptionMap) {
            self.options.push(options.clone());
        }
        fn on(&mut self, event: &str, _handler: Callable) {
            self.events.push(event.to_owned());
        }
        fn filter_all(&mut self) {
            self.filter_all += 1;
        }
        fn render(&mut self) {
            self.renders += 1;
        }
        fn redraw(&mut self) {
            self.redraws += 1;
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn plan(host: Element) -> BuildPlan {
        let registry = ChartRegistry::new().with("probe", |_, _| {
            let chart: ChartHandle = Rc::new(RefCell::new(Recorder::default()));
            chart
        });
        BuildPlan {
            library: Rc::new(registry),
            host: Rc::new(host),
            config: DirectiveConfig::default(),
            kind: "probe".into(),
            group: None,
        }
    }

    fn with_recorder<R>(chart: &ChartHandle, f: impl FnOnce(&Recorder) -> R) -> R {
        let chart = chart.borrow();
        f(chart.as_any().downcast_ref::<Recorder>().unwrap())
    }

    #[test]
    fn strips_meta_keys_and_merges_nested_options() {
        let host = Element::new("div")
            .with_attribute("dc-chart", "probe")
            .with_attribute("dc-name", "'myChart'")
            .with_attribute("dc-options", "{color: 'red'}")
            .with_attribute("dc-some-option", "5");
        let scope = Scope::new();
        let chart = build_chart(&plan(host), &scope).unwrap();

        with_recorder(&chart, |p| {
            assert_eq!(p.options.len(), 1);
            let applied = &p.options[0];
            assert_eq!(applied.get("someOption"), Some(&Value::from(5)));
            assert_eq!(applied.get("color"), Some(&Value::from("red")));
            assert!(!applied.contains_key("name"));
            assert!(!applied.contains_key("options"));
            assert_eq!(p.renders, 1);
        });

        let bound = scope.get("myChart").unwrap();
        let handle = bound.as_handle().unwrap().downcast_ref::<ChartHandle>().unwrap();
        assert!(Rc::ptr_eq(handle, &chart));
    }

    #[test]
    fn non_object_options_and_non_string_name_are_ignored() {
        let host = Element::new("div")
            .with_attribute("dc-name", "42")
            .with_attribute("dc-options", "'oops'");
        let scope = Scope::new();
        let chart = build_chart(&plan(host), &scope).unwrap();
        with_recorder(&chart, |p| assert!(p.options[0].is_empty()));
        assert!(scope.get("42").is_none());
    }

    #[test]
    fn only_present_handlers_are_subscribed() {
        let host = Element::new("div")
            .with_attribute("dc-on-filtered", "onFiltered")
            .with_attribute("dc-on-zoomed", "onZoomed")
            .with_attribute("dc-on-pre-render", "notAFunction");
        let scope = Scope::new();
        scope.set("onFiltered", Callable::new("onFiltered", |_| Ok(Value::Undefined)));
        scope.set("onZoomed", Callable::new("onZoomed", |_| Ok(Value::Undefined)));
        scope.set("notAFunction", 3);
        let chart = build_chart(&plan(host), &scope).unwrap();
        with_recorder(&chart, |p| {
            assert_eq!(p.events, vec!["filtered".to_owned(), "zoomed".to_owned()]);
        });
    }

    #[test]
    fn post_setup_receives_chart_and_options() {
        let host = Element::new("div")
            .with_attribute("dc-some-option", "5")
            .with_attribute("dc-post-setup-chart", "setup");
        let scope = Scope::new();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        scope.set(
            "setup",
            Callable::new("setup", move |args| {
                let chart = args[0].as_handle().map(|h| h.type_name());
                let opts = args[1].as_object().map(|o| o.contains_key("someOption"));
                *s.borrow_mut() = Some((chart.is_some(), opts));
                Ok(Value::Undefined)
            }),
        );
        build_chart(&plan(host), &scope).unwrap();
        assert_eq!(*seen.borrow(), Some((true, Some(true))));
    }

    #[test]
    fn post_setup_failure_is_a_callback_error() {
        let host = Element::new("div").with_attribute("dc-post-setup-chart", "setup");
        let scope = Scope::new();
        scope.set(
            "setup",
            Callable::new("setup", |_| Err(EvalError::call("setup", "bad"))),
        );
        let Err(err) = build_chart(&plan(host), &scope) else {
            panic!("expected postSetupChart failure");
        };
        assert!(matches!(err, DirectiveError::Callback { ref hook, .. } if hook == "postSetupChart"));
    }

    #[test]
    fn reset_control_filters_and_suppresses_navigation() {
        let host = Element::new("div").with_child(Element::new("a").with_class("reset"));
        let scope = Scope::new();
        let plan = plan(host);
        let chart = build_chart(&plan, &scope).unwrap();
        let reset = plan.host.query_selector("a.reset").unwrap();
        assert!(reset.is_hidden());

        let outcome = reset.click();
        assert!(!outcome.navigates);
        with_recorder(&chart, |p| {
            assert_eq!(p.filter_all, 1);
            assert_eq!(p.redraws, 1);
        });
        reset.click();
        with_recorder(&chart, |p| assert_eq!(p.filter_all, 2));
    }

    #[test]
    fn unknown_kind_fails() {
        let mut plan = plan(Element::new("div"));
        plan.kind = "nope".into();
        let Err(err) = build_chart(&plan, &Scope::new()) else {
            panic!("expected unknown kind");
        };
        assert_eq!(err, DirectiveError::UnknownKind { kind: "nope".into() });
    }
}
