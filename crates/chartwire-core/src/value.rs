#![forbid(unsafe_code)]

//! Dynamic values produced by declarative expressions.
//!
//! A [`Value`] is what an attribute expression evaluates to and what the
//! builder hands to a chart's bulk option setter. It distinguishes
//! `Undefined` from `Null`: an expression that evaluates to `Undefined` is
//! treated as "not ready yet" by the stabilization watcher.
//!
//! # Equality
//!
//! Data variants compare structurally. [`Callable`] and [`Handle`] compare by
//! pointer identity, so two separately constructed functions are never equal
//! even when their bodies are identical.
//!
//! # Merging
//!
//! [`deep_merge`] folds a nested `options` map into the top-level option map
//! the way the builder expects:
//!
//! | Target | Source | Result |
//! |--------|--------|--------|
//! | object | object | recursive merge |
//! | array | array | merge by index, extra source items appended |
//! | any | `Undefined` | target kept |
//! | any | other | source replaces target |

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::expr::EvalError;

/// Canonical option name to resolved value.
pub type OptionMap = BTreeMap<String, Value>;

type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// A function value callable from expressions and by the builder.
///
/// Lifecycle handlers and the `postSetupChart` hook are `Callable`s.
#[derive(Clone)]
pub struct Callable {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl Callable {
    /// Wrap `func` under a diagnostic `name`.
    pub fn new(
        name: impl Into<Rc<str>>,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Diagnostic name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function with positional arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(args)
    }

    /// Whether both values wrap the same function allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.name).finish()
    }
}

/// An opaque host object carried through the scope.
///
/// The builder binds the constructed chart into the scope as a `Handle`;
/// callers recover it with [`Handle::downcast_ref`].
#[derive(Clone)]
pub struct Handle {
    type_name: &'static str,
    inner: Rc<dyn Any>,
}

impl Handle {
    /// Wrap any `'static` value.
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Rc::new(value),
        }
    }

    /// Borrow the wrapped value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Rust type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.type_name).finish()
    }
}

/// A dynamically typed expression value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value. Conflated with "not ready yet" by the watcher.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(OptionMap),
    Date(NaiveDateTime),
    Function(Callable),
    Handle(Handle),
}

impl Value {
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// `Undefined` or `Null`.
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Short type label used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Date(_) => "date",
            Self::Function(_) => "function",
            Self::Handle(_) => "handle",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&OptionMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Self::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Boolean coercion with the host expression language's rules.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric coercion. Non-numeric values become `NaN`.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Date(dt) => dt.and_utc().timestamp_millis() as f64,
            _ => f64::NAN,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Handle(a), Self::Handle(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_nan() => f.write_str("NaN"),
            Self::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Self::Function(func) => write!(f, "function {}", func.name()),
            Self::Handle(h) => write!(f, "[handle {}]", h.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::Date(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Self::Function(_) | Self::Handle(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<OptionMap> for Value {
    fn from(map: OptionMap) -> Self {
        Self::Object(map)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::Date(dt)
    }
}

impl From<Callable> for Value {
    fn from(func: Callable) -> Self {
        Self::Function(func)
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Merge `source` into `target` recursively.
///
/// A source key whose value is `Undefined` never overwrites an existing
/// target entry; it is only inserted when the target lacks the key.
pub fn deep_merge(target: &mut OptionMap, source: &OptionMap) {
    for (key, incoming) in source {
        match target.get_mut(key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Object(dst), Value::Object(src)) => deep_merge(dst, src),
        (Value::Array(dst), Value::Array(src)) => {
            for (i, item) in src.iter().enumerate() {
                match dst.get_mut(i) {
                    Some(slot) => merge_value(slot, item),
                    None => dst.push(item.clone()),
                }
            }
        }
        (_, Value::Undefined) => {}
        (slot, incoming) => *slot = incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn object(json: serde_json::Value) -> OptionMap {
        match Value::from(json) {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn undefined_is_distinct_from_null() {
        assert!(Value::Undefined.is_undefined());
        assert!(!Value::Null.is_undefined());
        assert!(Value::Null.is_nullish());
        assert_ne!(Value::Undefined, Value::Null);
    }

    #[test]
    fn callables_compare_by_identity() {
        let a = Callable::new("a", |_| Ok(Value::Null));
        let b = Callable::new("a", |_| Ok(Value::Null));
        assert_eq!(Value::Function(a.clone()), Value::Function(a.clone()));
        assert_ne!(Value::Function(a), Value::Function(b));
    }

    #[test]
    fn handle_downcasts_to_wrapped_type() {
        let handle = Handle::new(String::from("chart"));
        assert_eq!(handle.downcast_ref::<String>().map(String::as_str), Some("chart"));
        assert!(handle.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn display_matches_expression_language() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(
            Value::Array(vec![1.into(), Value::Null, "x".into()]).to_string(),
            "1,,x"
        );
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::String(String::new()).truthy());
        assert!(Value::Object(OptionMap::new()).truthy());
        assert!(Value::Number(-1.0).truthy());
    }

    #[test]
    fn string_to_number_coercion() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
    }

    #[test]
    fn serializes_to_json() {
        let mut map = OptionMap::new();
        map.insert("radius".into(), 80.into());
        map.insert("label".into(), "pie".into());
        map.insert("gone".into(), Value::Undefined);
        let json = serde_json::to_value(Value::Object(map)).unwrap();
        assert_eq!(json, json!({"radius": 80.0, "label": "pie", "gone": null}));
    }

    #[test]
    fn merge_nested_objects() {
        let mut target = object(json!({"margins": {"top": 10, "left": 5}, "width": 300}));
        let source = object(json!({"margins": {"top": 20}, "height": 200}));
        deep_merge(&mut target, &source);
        assert_eq!(
            target,
            object(json!({"margins": {"top": 20, "left": 5}, "width": 300, "height": 200}))
        );
    }

    #[test]
    fn merge_arrays_by_index() {
        let mut target = object(json!({"range": [1, 2, 3]}));
        let source = object(json!({"range": [9]}));
        deep_merge(&mut target, &source);
        assert_eq!(target, object(json!({"range": [9, 2, 3]})));
    }

    #[test]
    fn merge_skips_undefined_over_existing() {
        let mut target = object(json!({"color": "red"}));
        let mut source = OptionMap::new();
        source.insert("color".into(), Value::Undefined);
        source.insert("fresh".into(), Value::Undefined);
        deep_merge(&mut target, &source);
        assert_eq!(target.get("color"), Some(&Value::from("red")));
        assert_eq!(target.get("fresh"), Some(&Value::Undefined));
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            (-1000i32..1000).prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ]
    }

    fn option_map() -> impl Strategy<Value = OptionMap> {
        prop::collection::btree_map("[a-z]{1,4}", scalar(), 0..6)
    }

    proptest! {
        #[test]
        fn merge_into_empty_copies_source(source in option_map()) {
            let mut target = OptionMap::new();
            deep_merge(&mut target, &source);
            prop_assert_eq!(target, source);
        }

        #[test]
        fn merge_empty_source_is_identity(target in option_map()) {
            let mut merged = target.clone();
            deep_merge(&mut merged, &OptionMap::new());
            prop_assert_eq!(merged, target);
        }

        #[test]
        fn merge_is_idempotent(target in option_map(), source in option_map()) {
            let mut once = target.clone();
            deep_merge(&mut once, &source);
            let mut twice = once.clone();
            deep_merge(&mut twice, &source);
            prop_assert_eq!(once, twice);
        }
    }
}
