#![forbid(unsafe_code)]

//! Core data types for chartwire.
//!
//! This crate holds everything that does not need runtime state:
//!
//! - [`value`]: the dynamic [`Value`] model and the canonical [`OptionMap`].
//! - [`naming`]: mapping between prefixed declarative attribute names and
//!   canonical option names.
//! - [`attrs`]: the ordered [`AttributeSet`] read from a host element.
//! - [`capability`]: per-kind capability descriptors and the attribute
//!   [`Whitelist`] derived from them.
//! - [`expr`]: the declarative expression language evaluated against a scope.
//!
//! The reactive machinery (scope, watcher, builder) lives in
//! `chartwire-runtime`.

pub mod attrs;
pub mod capability;
pub mod expr;
pub mod naming;
pub mod value;

pub use attrs::{AttributeSet, normalize_attribute_name};
pub use capability::{
    CapabilityDescriptor, LifecycleEvent, META_OPTIONS, NAME_OPTION, NESTED_OPTIONS, POST_SETUP_OPTION,
    Whitelist,
};
pub use expr::{Environment, EvalError, Evaluation, Expr, ParseError, evaluate, parse};
pub use naming::AttributeNaming;
pub use value::{Callable, Handle, OptionMap, Value, deep_merge};
