#![forbid(unsafe_code)]

//! Directive configuration.
//!
//! Defaults reproduce the stock markup conventions. With the
//! `policy-config` feature the same struct loads from TOML or JSON, so a
//! deployment can rename attributes or widen the escalation window without a
//! rebuild. Missing keys keep their defaults.

use std::time::Duration;

use chartwire_core::AttributeNaming;

#[cfg(feature = "policy-config")]
use crate::error::DirectiveError;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default, deny_unknown_fields))]
pub struct DirectiveConfig {
    /// Attribute prefix shared by every declarative option.
    pub prefix: String,
    /// Normalized attribute naming the chart kind.
    pub kind_attribute: String,
    /// Normalized attribute naming the chart group.
    pub group_attribute: String,
    /// Selector of the reset control inside the host element.
    pub reset_selector: String,
    pub escalation_delay_ms: u64,
    /// Bind `Date`/`DateTime` into the scope at link time.
    pub install_date_helpers: bool,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            prefix: "dc".to_owned(),
            kind_attribute: "dcChart".to_owned(),
            group_attribute: "dcChartGroup".to_owned(),
            reset_selector: "a.reset".to_owned(),
            escalation_delay_ms: 2000,
            install_date_helpers: true,
        }
    }
}

impl DirectiveConfig {
    #[must_use]
    pub fn naming(&self) -> AttributeNaming {
        AttributeNaming::new(self.prefix.clone())
    }

    #[must_use]
    pub fn escalation_delay(&self) -> Duration {
        Duration::from_millis(self.escalation_delay_ms)
    }

    #[must_use]
    pub fn with_escalation_delay(mut self, delay: Duration) -> Self {
        self.escalation_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse a TOML policy document.
    ///
    /// # Errors
    ///
    /// [`DirectiveError::Config`] when the document is malformed or names an
    /// unknown key.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(source: &str) -> Result<Self, DirectiveError> {
        toml::from_str(source).map_err(|err| DirectiveError::Config(err.to_string()))
    }

    /// Parse a JSON policy document.
    ///
    /// # Errors
    ///
    /// [`DirectiveError::Config`] when the document is malformed or names an
    /// unknown key.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(source: &str) -> Result<Self, DirectiveError> {
        serde_json::from_str(source).map_err(|err| DirectiveError::Config(err.to_string()))
    }
}
