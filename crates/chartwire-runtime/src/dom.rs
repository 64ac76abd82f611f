#![forbid(unsafe_code)]

//! Minimal host element model.
//!
//! Only what the directive touches: raw attributes (read as declarations),
//! a child tree searchable by simple selectors, click listeners with a
//! suppressible default action, and an inline `display` style.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use chartwire_core::AttributeSet;

type ClickListener = Rc<dyn Fn(&Element)>;

/// Result of dispatching a click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickOutcome {
    pub listeners_run: usize,
    /// Whether the element's default navigation would follow.
    pub navigates: bool,
}

/// A host element.
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: RefCell<Vec<(String, String)>>,
    children: RefCell<Vec<Rc<Element>>>,
    click_listeners: RefCell<Vec<ClickListener>>,
    display: RefCell<Option<String>>,
    navigation_suppressed: Cell<bool>,
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            click_listeners: RefCell::new(Vec::new()),
            display: RefCell::new(None),
            navigation_suppressed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    #[must_use]
    pub fn with_child(self, child: Element) -> Self {
        self.append_child(Rc::new(child));
        self
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Set a raw attribute, replacing an existing one with the same name.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut attrs = self.attributes.borrow_mut();
        match attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => attrs.push((name, value)),
        }
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        let mut attrs = self.attributes.borrow_mut();
        let idx = attrs.iter().position(|(n, _)| n == name)?;
        Some(attrs.remove(idx).1)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Current attributes under their normalized names.
    #[must_use]
    pub fn declarations(&self) -> AttributeSet {
        self.attributes
            .borrow()
            .iter()
            .map(|(n, v)| (n.as_str(), v.clone()))
            .collect()
    }

    pub fn append_child(&self, child: Rc<Element>) {
        self.children.borrow_mut().push(child);
    }

    #[must_use]
    pub fn children(&self) -> Vec<Rc<Element>> {
        self.children.borrow().clone()
    }

    /// First descendant matching `selector`, depth-first.
    ///
    /// Supports `*`, `tag`, `.class` and compounds like `a.reset.small`.
    #[must_use]
    pub fn query_selector(&self, selector: &str) -> Option<Rc<Element>> {
        let selector = Selector::parse(selector)?;
        self.find_descendant(&selector)
    }

    fn find_descendant(&self, selector: &Selector<'_>) -> Option<Rc<Element>> {
        for child in self.children.borrow().iter() {
            if selector.matches(child) {
                return Some(Rc::clone(child));
            }
            if let Some(found) = child.find_descendant(selector) {
                return Some(found);
            }
        }
        None
    }

    pub fn add_click_listener(&self, listener: impl Fn(&Element) + 'static) {
        self.click_listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Dispatch a click to every listener in registration order.
    pub fn click(&self) -> ClickOutcome {
        let listeners = self.click_listeners.borrow().clone();
        for listener in &listeners {
            listener(self);
        }
        ClickOutcome {
            listeners_run: listeners.len(),
            navigates: self.tag == "a" && !self.navigation_suppressed.get(),
        }
    }

    /// Cancel the default action of future clicks.
    pub fn suppress_navigation(&self) {
        self.navigation_suppressed.set(true);
    }

    pub fn set_display(&self, display: impl Into<String>) {
        *self.display.borrow_mut() = Some(display.into());
    }

    #[must_use]
    pub fn display(&self) -> Option<String> {
        self.display.borrow().clone()
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.display.borrow().as_deref() == Some("none")
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("classes", &self.classes)
            .field("attributes", &self.attributes.borrow().len())
            .field("children", &self.children.borrow().len())
            .finish_non_exhaustive()
    }
}

struct Selector<'a> {
    tag: Option<&'a str>,
    classes: Vec<&'a str>,
}

impl<'a> Selector<'a> {
    fn parse(source: &'a str) -> Option<Self> {
        let source = source.trim();
        if source.is_empty() || source.contains(char::is_whitespace) {
            return None;
        }
        let mut parts = source.split('.');
        let tag = match parts.next()? {
            "" | "*" => None,
            tag => Some(tag),
        };
        let classes: Vec<&str> = parts.collect();
        if classes.iter().any(|c| c.is_empty()) {
            return None;
        }
        Some(Self { tag, classes })
    }

    fn matches(&self, element: &Element) -> bool {
        self.tag
            .is_none_or(|tag| element.tag.eq_ignore_ascii_case(tag))
            && self.classes.iter().all(|c| element.has_class(c))
    }
}
