#![forbid(unsafe_code)]

//! Per-kind capability descriptors and the attribute whitelist.
//!
//! Every chart kind declares which options it can be configured with through
//! a [`CapabilityDescriptor`]. Descriptors are usually composed from several
//! static tables, one per mixin the kind is built from (base, color,
//! coordinate grid, ...).
//!
//! The [`Whitelist`] is the set of *external* attribute names an element may
//! use to configure a chart of that kind: every descriptor option plus the
//! directive-level [`META_OPTIONS`], each mapped through
//! [`AttributeNaming::to_external`]. Attributes outside the whitelist are
//! ignored, so unrelated markup attributes are never misread as options.

use std::collections::BTreeSet;

use crate::naming::AttributeNaming;

/// Option name binding the built chart into the scope.
pub const NAME_OPTION: &str = "name";
/// Option name of the nested map merged into the top-level options.
pub const NESTED_OPTIONS: &str = "options";
/// Option name of the one-shot `(chart, options)` callback.
pub const POST_SETUP_OPTION: &str = "postSetupChart";

/// Directive-level options accepted for every chart kind.
pub const META_OPTIONS: [&str; 8] = [
    NAME_OPTION,
    "onFiltered",
    "onPostRedraw",
    "onPostRender",
    "onPreRedraw",
    "onPreRender",
    "onZoomed",
    POST_SETUP_OPTION,
];

/// Chart lifecycle events that may carry a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleEvent {
    PreRender,
    PostRender,
    PreRedraw,
    PostRedraw,
    Filtered,
    Zoomed,
}

impl LifecycleEvent {
    pub const ALL: [Self; 6] = [
        Self::PreRender,
        Self::PostRender,
        Self::PreRedraw,
        Self::PostRedraw,
        Self::Filtered,
        Self::Zoomed,
    ];

    /// Canonical option carrying the handler, e.g. `onPreRender`.
    #[must_use]
    pub const fn option_name(self) -> &'static str {
        match self {
            Self::PreRender => "onPreRender",
            Self::PostRender => "onPostRender",
            Self::PreRedraw => "onPreRedraw",
            Self::PostRedraw => "onPostRedraw",
            Self::Filtered => "onFiltered",
            Self::Zoomed => "onZoomed",
        }
    }

    /// Event name passed to the chart's subscription method, e.g. `preRender`.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PreRender => "preRender",
            Self::PostRender => "postRender",
            Self::PreRedraw => "preRedraw",
            Self::PostRedraw => "postRedraw",
            Self::Filtered => "filtered",
            Self::Zoomed => "zoomed",
        }
    }
}

/// Configurable option names of one chart kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    kind: String,
    options: BTreeSet<&'static str>,
}

impl CapabilityDescriptor {
    /// Descriptor from a single option table.
    #[must_use]
    pub fn new(kind: impl Into<String>, options: &[&'static str]) -> Self {
        Self::from_tables(kind, &[options])
    }

    /// Descriptor from the union of several option tables.
    ///
    /// [`NESTED_OPTIONS`] is always included: every chart exposes the bulk
    /// option setter it names.
    #[must_use]
    pub fn from_tables(kind: impl Into<String>, tables: &[&[&'static str]]) -> Self {
        let mut options: BTreeSet<&'static str> =
            tables.iter().flat_map(|t| t.iter().copied()).collect();
        options.insert(NESTED_OPTIONS);
        Self {
            kind: kind.into(),
            options,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Option names in sorted order.
    pub fn options(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.options.iter().copied()
    }

    #[must_use]
    pub fn supports(&self, option: &str) -> bool {
        self.options.contains(option)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// External attribute names accepted for one chart instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    attributes: BTreeSet<String>,
}

impl Whitelist {
    /// Descriptor options and [`META_OPTIONS`], mapped to external names.
    #[must_use]
    pub fn for_descriptor(descriptor: &CapabilityDescriptor, naming: &AttributeNaming) -> Self {
        let attributes = descriptor
            .options()
            .chain(META_OPTIONS)
            .map(|option| naming.to_external(option))
            .collect();
        Self { attributes }
    }

    /// Membership test on an external (prefixed) attribute name.
    #[must_use]
    pub fn allows(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &[&str] = &["width", "height", "dimension", "group"];
    const PIE: &[&str] = &["radius", "innerRadius", "width"];

    #[test]
    fn descriptor_unions_tables() {
        let desc = CapabilityDescriptor::from_tables("pieChart", &[BASE, PIE]);
        assert_eq!(desc.kind(), "pieChart");
        assert_eq!(desc.len(), 7);
        assert!(desc.supports(NESTED_OPTIONS));
        assert!(desc.supports("innerRadius"));
        assert!(!desc.supports("barPadding"));
    }

    #[test]
    fn whitelist_contains_meta_options() {
        let desc = CapabilityDescriptor::new("pieChart", PIE);
        let list = Whitelist::for_descriptor(&desc, &AttributeNaming::default());
        for meta in ["dcName", "dcOnFiltered", "dcOnZoomed", "dcPostSetupChart"] {
            assert!(list.allows(meta), "{meta} missing");
        }
        assert!(list.allows("dcInnerRadius"));
        assert!(!list.allows("innerRadius"), "membership is on external names");
        assert!(list.allows("dcOptions"));
        assert!(!list.allows("dcBarPadding"));
        assert_eq!(list.len(), 4 + META_OPTIONS.len());
    }

    #[test]
    fn lifecycle_names_line_up_with_meta_options() {
        for event in LifecycleEvent::ALL {
            assert!(META_OPTIONS.contains(&event.option_name()));
            let option = event.option_name();
            let expected = format!(
                "{}{}",
                option[2..3].to_lowercase(),
                &option[3..]
            );
            assert_eq!(event.event_name(), expected);
        }
    }

    fn table() -> impl Strategy<Value = Vec<&'static str>> {
        prop::sample::subsequence(
            vec![
                "width", "height", "radius", "innerRadius", "x", "y", "elasticY",
                "barPadding", "renderArea", "colors", "xAxisLabel", "name",
            ],
            0..12,
        )
    }

    proptest! {
        #[test]
        fn whitelist_is_mapped_union(options in table()) {
            let naming = AttributeNaming::default();
            let desc = CapabilityDescriptor::new("chart", &options);
            let list = Whitelist::for_descriptor(&desc, &naming);

            let expected: BTreeSet<String> = options
                .iter()
                .copied()
                .chain(META_OPTIONS)
                .chain([NESTED_OPTIONS])
                .map(|o| naming.to_external(o))
                .collect();
            let actual: BTreeSet<String> = list.iter().map(str::to_owned).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn whitelist_round_trips_to_canonical(options in table()) {
            let naming = AttributeNaming::default();
            let desc = CapabilityDescriptor::new("chart", &options);
            let list = Whitelist::for_descriptor(&desc, &naming);
            for attr in list.iter() {
                let canonical = naming.to_canonical(attr);
                prop_assert!(
                    desc.supports(&canonical) || META_OPTIONS.iter().any(|m| *m == canonical)
                );
                prop_assert_eq!(naming.to_external(&canonical), attr);
            }
        }
    }
}
