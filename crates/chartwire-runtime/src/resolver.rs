#![forbid(unsafe_code)]

//! Option set resolution.
//!
//! Two passes read the same attribute set:
//!
//! - [`probe`] evaluates every *relevant* attribute (prefixed, other than the
//!   kind and group attributes) and decides whether the scope has settled.
//!   It does not consult the whitelist, so a typo in an attribute that no
//!   chart accepts still holds the chart back.
//! - [`resolve_options`] evaluates only whitelisted attributes and builds
//!   the canonical option map handed to the builder.
//!
//! Neither pass evaluates the kind or group attribute.

use chartwire_core::{AttributeSet, Evaluation, OptionMap, Value, Whitelist};

use crate::config::DirectiveConfig;
use crate::error::DirectiveError;
use crate::scope::Scope;

/// Outcome of one relevance probe.
#[derive(Clone, Debug, PartialEq)]
pub enum Probe {
    /// Every relevant attribute produced a defined value, in attribute order.
    Stable(Vec<Value>),
    /// At least one attribute is undefined or failed. Every failure of the
    /// tick is listed, in attribute order.
    Pending(Vec<DirectiveError>),
}

impl Probe {
    #[must_use]
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable(_))
    }
}

/// `(name, expression)` pairs the probe evaluates.
pub fn relevant_attributes<'a>(
    attrs: &'a AttributeSet,
    config: &'a DirectiveConfig,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    attrs.iter().filter(move |(name, _)| {
        name.starts_with(config.prefix.as_str()) && !is_reserved(name, config)
    })
}

/// Kind and group attributes are read raw by the directive, never evaluated.
fn is_reserved(attribute: &str, config: &DirectiveConfig) -> bool {
    attribute == config.kind_attribute || attribute == config.group_attribute
}

/// Evaluate every relevant attribute once.
pub fn probe(attrs: &AttributeSet, scope: &Scope, config: &DirectiveConfig) -> Probe {
    let mut values = Vec::new();
    let mut failures = Vec::new();
    for (attribute, expression) in relevant_attributes(attrs, config) {
        match scope.evaluate(expression) {
            Evaluation::Ready(value) => values.push(value),
            Evaluation::Pending => failures.push(DirectiveError::Unresolved {
                attribute: attribute.to_owned(),
                expression: expression.to_owned(),
            }),
            Evaluation::Errored(source) => failures.push(DirectiveError::Evaluation {
                attribute: attribute.to_owned(),
                expression: expression.to_owned(),
                source,
            }),
        }
    }
    if failures.is_empty() {
        Probe::Stable(values)
    } else {
        Probe::Pending(failures)
    }
}

/// Evaluate whitelisted attributes into a canonical option map.
///
/// Undefined results are kept as `Value::Undefined` entries so callers can
/// still see which options were declared.
///
/// # Errors
///
/// [`DirectiveError::Evaluation`] for the first attribute that fails.
pub fn resolve_options(
    attrs: &AttributeSet,
    scope: &Scope,
    whitelist: &Whitelist,
    config: &DirectiveConfig,
) -> Result<OptionMap, DirectiveError> {
    let naming = config.naming();
    let mut options = OptionMap::new();
    for (attribute, expression) in attrs.iter() {
        if is_reserved(attribute, config) || !whitelist.allows(attribute) {
            continue;
        }
        let value = scope
            .eval(expression)
            .map_err(|source| DirectiveError::Evaluation {
                attribute: attribute.to_owned(),
                expression: expression.to_owned(),
                source,
            })?;
        options.insert(naming.to_canonical(attribute).into_owned(), value);
    }
    Ok(options)
}
