#![forbid(unsafe_code)]

//! Declarative attribute sets.
//!
//! An [`AttributeSet`] is the ordered list of `(name, expression)` pairs
//! attached to one host element. Names are normalized on insertion the way
//! host markup normalizes them, so `data-dc-x-axis-label`, `dc:x-axis-label`
//! and `dcXAxisLabel` all address the same entry.
//!
//! # Invariants
//!
//! 1. Names are unique after normalization.
//! 2. Iteration follows first-insertion order; replacing an expression keeps
//!    the entry's position.

/// Normalize a raw markup attribute name to its camelCase form.
///
/// Strips a leading `x-` / `data-` marker (any of `:`, `-`, `_` as the
/// separator, case-insensitive), then removes separators and upper-cases the
/// character following each one.
#[must_use]
pub fn normalize_attribute_name(raw: &str) -> String {
    let stripped = strip_marker(raw);
    let mut out = String::with_capacity(stripped.len());
    let mut upper_next = false;
    for c in stripped.chars() {
        if matches!(c, ':' | '-' | '_') {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_marker(raw: &str) -> &str {
    for marker in ["data", "x"] {
        let Some(head) = raw.get(..marker.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(marker) {
            continue;
        }
        let rest = &raw[marker.len()..];
        if let Some(after) = rest.strip_prefix([':', '-', '_']) {
            return after;
        }
    }
    raw
}

/// Ordered attribute name → unevaluated expression mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: Vec<(String, String)>,
}

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute. Returns the previous expression.
    pub fn insert(&mut self, name: &str, expression: impl Into<String>) -> Option<String> {
        let name = normalize_attribute_name(name);
        let expression = expression.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, expression)),
            None => {
                self.entries.push((name, expression));
                None
            }
        }
    }

    /// Remove an attribute, returning its expression.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = normalize_attribute_name(name);
        let idx = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Expression for `name` (raw or normalized spelling).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = normalize_attribute_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, expr)| expr.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `(normalized name, expression)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, expr)| (name.as_str(), expr.as_str()))
    }

    /// Normalized names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: AsRef<str>, E: Into<String>> FromIterator<(N, E)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (N, E)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, expr) in iter {
            set.insert(name.as_ref(), expr);
        }
        set
    }
}
