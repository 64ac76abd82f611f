#![forbid(unsafe_code)]

//! Runtime for declarative chart directives.
//!
//! A [`ChartDirective`] links a host [`Element`] to a [`Scope`]. On every
//! digest the [`StabilizationWatcher`] re-evaluates the element's prefixed
//! attributes; once they all produce defined values it builds the chart
//! exactly once through the [`ChartLibrary`], wires its lifecycle handlers
//! and reset control, and renders it. Evaluation failures are retried
//! quietly until the [`EscalationTimer`] fires, after which they are
//! returned from the digest.
//!
//! ```text
//! Element attrs ─┐
//!                ├─► resolver::probe ──► StabilizationWatcher ──► builder::build_chart
//! Scope ─────────┘         ▲                     │ once
//!                          │ digest              ▼
//!                     Scheduler::turn      Chart (options, on, render)
//! ```
//!
//! # Feature Flags
//!
//! - `policy-config`: load [`DirectiveConfig`] from TOML or JSON.

pub mod builder;
pub mod chart;
pub mod config;
pub mod directive;
pub mod dom;
pub mod error;
pub mod escalation;
pub mod reactive;
pub mod resolver;
pub mod scheduler;
pub mod scope;
pub mod watcher;

pub use builder::{BuildPlan, build_chart, chart_value};
pub use chart::{Chart, ChartHandle, ChartLibrary, ChartRegistry};
pub use config::DirectiveConfig;
pub use directive::{ChartDirective, LinkedChart};
pub use dom::{ClickOutcome, Element};
pub use error::DirectiveError;
pub use escalation::{DEFAULT_ESCALATION_DELAY, EscalationTimer};
pub use reactive::{Listeners, Subscription};
pub use resolver::{Probe, probe, relevant_attributes, resolve_options};
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, TimerId, TimerQueue};
pub use scope::Scope;
pub use watcher::{StabilizationWatcher, WatchState};
