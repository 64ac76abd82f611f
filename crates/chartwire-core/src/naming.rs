#![forbid(unsafe_code)]

//! Mapping between declarative attribute names and canonical option names.
//!
//! A chart option such as `xAxisLabel` is written on the host element as
//! `dcXAxisLabel` (after attribute normalization): the prefix followed by
//! the option name with its first character upper-cased.
//!
//! # Invariants
//!
//! 1. `to_canonical(&to_external(x)) == x` for every option name `x` that
//!    starts with a lowercase character.
//! 2. Names that do not carry the prefix pass through `to_canonical`
//!    unchanged.

use std::borrow::Cow;

/// Default attribute prefix.
pub const DEFAULT_PREFIX: &str = "dc";

/// Bidirectional name mapper for one attribute prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeNaming {
    prefix: String,
}

impl AttributeNaming {
    /// Create a mapper for `prefix` (e.g. `"dc"`).
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `attr` carries the prefix.
    #[must_use]
    pub fn is_prefixed(&self, attr: &str) -> bool {
        attr.starts_with(&self.prefix)
    }

    /// `radius` → `dcRadius`.
    #[must_use]
    pub fn to_external(&self, option: &str) -> String {
        let mut chars = option.chars();
        let mut out = String::with_capacity(self.prefix.len() + option.len());
        out.push_str(&self.prefix);
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
        out
    }

    /// `dcRadius` → `radius`. Unprefixed names are returned as-is.
    #[must_use]
    pub fn to_canonical<'a>(&self, attr: &'a str) -> Cow<'a, str> {
        let Some(rest) = attr.strip_prefix(self.prefix.as_str()) else {
            return Cow::Borrowed(attr);
        };
        let mut chars = rest.chars();
        let Some(first) = chars.next() else {
            return Cow::Borrowed(attr);
        };
        let mut out = String::with_capacity(rest.len());
        out.extend(first.to_lowercase());
        out.push_str(chars.as_str());
        Cow::Owned(out)
    }
}

impl Default for AttributeNaming {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
