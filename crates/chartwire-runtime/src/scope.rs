#![forbid(unsafe_code)]

//! Evaluation scope shared between host logic and chart directives.
//!
//! A [`Scope`] is a key-value store of [`Value`] bindings plus a watch list.
//! Host code writes bindings at any time with [`Scope::set`]; writes bump a
//! version counter but do not notify anyone. Notification happens in
//! discrete ticks: [`Scope::digest`] runs every registered watcher once, in
//! registration order, and stops at the first watcher error.
//!
//! Directives only read from the scope, with three exceptions: the date
//! helpers installed at link time and the binding that exposes a built chart
//! under its configured name.
//!
//! # Invariants
//!
//! 1. `version()` increases by one per `set`/`remove` call.
//! 2. A watcher whose [`Subscription`] has been dropped is never run again,
//!    even if it was dropped by an earlier watcher in the same digest.
//! 3. Digests do not nest; a digest requested by a watcher fails with
//!    [`DirectiveError::DigestInProgress`].
//! 4. Expression sources are parsed at most once per scope.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chartwire_core::expr::{self, Environment, EvalError, Evaluation, Expr, ParseError};
use chartwire_core::{Callable, OptionMap, Value};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::DirectiveError;
use crate::reactive::{Listeners, Subscription};

/// Watcher callback run once per digest.
pub type WatchFn = dyn Fn(&Scope) -> Result<(), DirectiveError>;

/// Shared, cheaply clonable evaluation scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    bindings: RefCell<OptionMap>,
    version: Cell<u64>,
    parsed: RefCell<HashMap<String, Rc<Result<Expr, ParseError>>>>,
    watchers: Listeners<WatchFn>,
    digesting: Cell<bool>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                bindings: RefCell::new(OptionMap::new()),
                version: Cell::new(0),
                parsed: RefCell::new(HashMap::new()),
                watchers: Listeners::new(),
                digesting: Cell::new(false),
            }),
        }
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .bindings
            .borrow_mut()
            .insert(name.into(), value.into());
        self.bump();
    }

    /// Remove a binding, returning its value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = self.inner.bindings.borrow_mut().remove(name);
        self.bump();
        removed
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.bindings.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.bindings.borrow().contains_key(name)
    }

    /// Mutation counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn bump(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
    }

    /// Evaluate `source` and classify the outcome.
    ///
    /// Parse failures are reported as `Errored`, exactly like runtime
    /// failures, so a malformed attribute is retried (and eventually
    /// surfaced) by the same policy.
    #[must_use]
    pub fn evaluate(&self, source: &str) -> Evaluation {
        Evaluation::from_result(self.eval(source))
    }

    /// Evaluate `source` and return the raw result.
    pub fn eval(&self, source: &str) -> Result<Value, EvalError> {
        let parsed = self.parse_cached(source);
        match parsed.as_ref() {
            Ok(expr) => expr::evaluate(expr, self),
            Err(err) => Err(EvalError::Parse(err.clone())),
        }
    }

    fn parse_cached(&self, source: &str) -> Rc<Result<Expr, ParseError>> {
        if let Some(hit) = self.inner.parsed.borrow().get(source) {
            return Rc::clone(hit);
        }
        let parsed = Rc::new(expr::parse(source));
        self.inner
            .parsed
            .borrow_mut()
            .insert(source.to_owned(), Rc::clone(&parsed));
        parsed
    }

    /// Register a watcher. It runs on every digest while the guard lives.
    pub fn watch(
        &self,
        watcher: impl Fn(&Scope) -> Result<(), DirectiveError> + 'static,
    ) -> Subscription {
        self.inner.watchers.register(Rc::new(watcher))
    }

    /// Number of registered, live watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }

    /// Deliver one change tick to every watcher.
    ///
    /// Returns the number of watchers run.
    ///
    /// # Errors
    ///
    /// Propagates the first watcher error; later watchers do not run in this
    /// tick. Fails with [`DirectiveError::DigestInProgress`] when called from
    /// inside a watcher.
    pub fn digest(&self) -> Result<usize, DirectiveError> {
        if self.inner.digesting.replace(true) {
            return Err(DirectiveError::DigestInProgress);
        }
        let result = self.run_watchers();
        self.inner.digesting.set(false);
        result
    }

    fn run_watchers(&self) -> Result<usize, DirectiveError> {
        let mut ran = 0;
        for watcher in self.inner.watchers.snapshot() {
            // Skip watchers released earlier in this tick.
            if Rc::strong_count(&watcher) == 1 {
                continue;
            }
            watcher(self)?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Bind the `Date(y, m, d)` and `DateTime(y, m, d, h, mi, s)` helpers.
    ///
    /// Months are zero-based and out-of-range components roll over into the
    /// next larger unit, as the host expression language's date constructor
    /// does.
    pub fn install_date_helpers(&self) {
        self.set(
            "Date",
            Callable::new("Date", |args| make_date("Date", args, 3)),
        );
        self.set(
            "DateTime",
            Callable::new("DateTime", |args| make_date("DateTime", args, 6)),
        );
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Scope {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("bindings", &self.inner.bindings.borrow().len())
            .field("version", &self.inner.version.get())
            .field("watchers", &self.inner.watchers.len())
            .finish()
    }
}

fn make_date(helper: &str, args: &[Value], arity: usize) -> Result<Value, EvalError> {
    let mut parts = [0i64; 6];
    for (i, slot) in parts.iter_mut().enumerate().take(arity) {
        let raw = args.get(i).map_or(f64::NAN, Value::to_number);
        if !raw.is_finite() || raw.fract() != 0.0 {
            return Err(EvalError::call(
                helper,
                format!("argument {} must be an integer, got {raw}", i + 1),
            ));
        }
        *slot = raw as i64;
    }
    let [year, month, day, hour, minute, second] = parts;
    build_datetime(year, month, day, hour, minute, second)
        .map(Value::Date)
        .ok_or_else(|| EvalError::call(helper, "date out of range"))
}

fn build_datetime(
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> Option<NaiveDateTime> {
    let year = i32::try_from(year.checked_add(month.div_euclid(12))?).ok()?;
    let month = u32::try_from(month.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    first
        .checked_add_signed(Duration::try_days(day.checked_sub(1)?)?)?
        .checked_add_signed(Duration::try_hours(hour)?)?
        .checked_add_signed(Duration::try_minutes(minute)?)?
        .checked_add_signed(Duration::try_seconds(second)?)
}
