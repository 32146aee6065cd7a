//! Element trees: the immutable descriptions consumed by the reconciler.
//!
//! An [`Element`] describes one node to render. Its kind is a closed union:
//! a host tag the adapter recognizes, a component function that expands to
//! another element when invoked, or a text leaf. Elements are produced fresh
//! on every render and never mutated by the runtime.

use std::fmt;
use std::ptr;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::Scope;

/// Prop keys starting with this prefix name event listeners, not attributes.
pub const EVENT_PREFIX: &str = "on";

/// Prop key carrying the payload of a text element.
pub const NODE_VALUE: &str = "nodeValue";

/// A component function. Re-invoked with its current props on every render
/// of its fiber; hook state is requested through the [`Scope`].
pub type Component = fn(&mut Scope<'_>, &Props) -> Element;

/// Event delivered to handlers by the host adapter.
#[derive(Clone, Debug, Default)]
pub struct HostEvent {
    /// Host-side event name, e.g. `click`.
    pub name: String,
    /// Optional payload, e.g. the current value of an input.
    pub detail: Option<PropValue>,
}

impl HostEvent {
    pub fn new(name: impl Into<String>) -> Self {
        HostEvent {
            name: name.into(),
            detail: None,
        }
    }

    pub fn with_detail(name: impl Into<String>, detail: impl Into<PropValue>) -> Self {
        HostEvent {
            name: name.into(),
            detail: Some(detail.into()),
        }
    }

    /// Payload as text, if there is one and it is textual.
    pub fn detail_text(&self) -> Option<&str> {
        match &self.detail {
            Some(PropValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Callback attached to a host node for a named event.
///
/// Handlers compare by `Rc` identity: two clones of one handler are the same
/// listener, two separately created closures never are. The prop differ
/// relies on this to decide when a listener must be re-attached.
pub type EventHandler = Rc<dyn Fn(&HostEvent)>;

/// A single prop value.
#[derive(Clone)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    pub fn handler(f: impl Fn(&HostEvent) + 'static) -> Self {
        PropValue::Handler(Rc::new(f))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(s) => write!(f, "{s:?}"),
            PropValue::Number(n) => write!(f, "{n}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Handler(_) => f.write_str("<handler>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Number(n as f64)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

/// True when a prop key names an event listener.
pub fn is_event_key(key: &str) -> bool {
    key.starts_with(EVENT_PREFIX)
}

/// Host event name for an event-shaped prop key: `onClick` -> `click`.
pub fn event_name(key: &str) -> String {
    key[EVENT_PREFIX.len()..].to_ascii_lowercase()
}

/// Ordered prop map plus the child elements.
///
/// Children live outside the map, so they can never be pushed to the host
/// adapter as a property; they are consumed only by reconciliation.
#[derive(Clone, Default)]
pub struct Props {
    values: IndexMap<String, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Props::default()
    }

    /// Builder form: add one attribute (or, with an `on`-prefixed key, a
    /// listener value).
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Builder form: attach a listener for a host event name. `on("click", ..)`
    /// stores the handler under the `onclick` key.
    pub fn on(mut self, event: &str, f: impl Fn(&HostEvent) + 'static) -> Self {
        self.values
            .insert(format!("{EVENT_PREFIX}{event}"), PropValue::handler(f));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Attribute/listener entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn children_vec(&self) -> Vec<Element> {
        self.children.clone()
    }

    pub(crate) fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub(crate) fn set_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("values", &self.values)
            .field("children", &self.children.len())
            .finish()
    }
}

/// What an element renders as.
#[derive(Clone)]
pub enum ElementKind {
    /// A tag realized directly by the host adapter.
    Host(String),
    /// A function expanded by invoking it with the element's props.
    Component(Component),
    /// A text leaf; its payload is the `nodeValue` prop.
    Text,
}

impl ElementKind {
    /// Positional type equality used by the reconciler: tags compare by
    /// value, components by function address, text matches text.
    pub fn same_type(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Component(a), ElementKind::Component(b)) => ptr::fn_addr_eq(*a, *b),
            (ElementKind::Text, ElementKind::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(tag) => write!(f, "Host({tag:?})"),
            ElementKind::Component(func) => write!(f, "Component({:p})", *func as *const ()),
            ElementKind::Text => f.write_str("Text"),
        }
    }
}

/// One node of the declarative input tree.
#[derive(Clone, Debug)]
pub struct Element {
    kind: ElementKind,
    props: Props,
}

impl Element {
    pub fn new(kind: ElementKind, props: Props) -> Self {
        Element { kind, props }
    }

    /// Host element factory. Children may be elements or anything
    /// convertible into one; bare scalars become text leaves.
    pub fn host<C>(tag: impl Into<String>, props: Props, children: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<Element>,
    {
        let mut props = props;
        for child in children {
            props.push_child(child.into());
        }
        Element {
            kind: ElementKind::Host(tag.into()),
            props,
        }
    }

    pub fn component(func: Component, props: Props) -> Self {
        Element {
            kind: ElementKind::Component(func),
            props,
        }
    }

    /// Text leaf carrying `value` under the `nodeValue` prop.
    pub fn text(value: impl fmt::Display) -> Self {
        Element {
            kind: ElementKind::Text,
            props: Props::new().attr(NODE_VALUE, value.to_string()),
        }
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn into_parts(self) -> (ElementKind, Props) {
        (self.kind, self.props)
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::text(s)
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::text(s)
    }
}

impl From<i64> for Element {
    fn from(n: i64) -> Self {
        Element::text(n)
    }
}

impl From<f64> for Element {
    fn from(n: f64) -> Self {
        Element::text(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_wraps_scalar_children_as_text() {
        let el = Element::host("div", Props::new(), ["hello", "world"]);
        let children = el.props().children();
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0].kind(), ElementKind::Text));
        assert_eq!(
            children[0].props().get(NODE_VALUE).and_then(PropValue::as_text),
            Some("hello")
        );
        assert_eq!(
            children[1].props().get(NODE_VALUE).and_then(PropValue::as_text),
            Some("world")
        );
    }

    #[test]
    fn factory_keeps_element_children_as_is() {
        let inner = Element::host("span", Props::new(), Vec::<Element>::new());
        let el = Element::host("div", Props::new(), [inner]);
        assert!(matches!(
            el.props().children()[0].kind(),
            ElementKind::Host(tag) if tag == "span"
        ));
    }

    #[test]
    fn event_keys_are_detected_by_prefix() {
        assert!(is_event_key("onClick"));
        assert!(is_event_key("onclick"));
        assert!(!is_event_key("title"));
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onInput"), "input");
    }

    #[test]
    fn handler_values_compare_by_identity() {
        let h = PropValue::handler(|_| {});
        let same = h.clone();
        let other = PropValue::handler(|_| {});
        assert_eq!(h, same);
        assert_ne!(h, other);
    }

    #[test]
    fn on_builder_stores_a_handler_under_the_prefixed_key() {
        let props = Props::new().on("click", |_| {});
        let stored = props.get("onclick").expect("listener stored");
        assert!(stored.as_handler().is_some());
        assert!(stored.as_text().is_none());
        assert!(props.get("click").is_none());
    }

    #[test]
    fn scalar_values_compare_by_value() {
        assert_eq!(PropValue::from("a"), PropValue::from("a"));
        assert_eq!(PropValue::from(3i64), PropValue::from(3.0f64));
        assert_ne!(PropValue::from(true), PropValue::from(false));
        assert_ne!(PropValue::from("1"), PropValue::from(1i64));
    }

    #[test]
    fn props_iterate_in_insertion_order() {
        let props = Props::new().attr("b", 1i64).attr("a", 2i64).attr("c", 3i64);
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn children_never_appear_in_the_prop_map() {
        let el = Element::host("div", Props::new().attr("id", "root"), ["text"]);
        assert!(el.props().get("children").is_none());
        assert_eq!(el.props().len(), 1);
        assert_eq!(el.props().children().len(), 1);
    }

    #[test]
    fn same_type_matches_tags_components_and_text() {
        fn blank(_: &mut Scope<'_>, _: &Props) -> Element {
            Element::text("")
        }
        fn other(_: &mut Scope<'_>, _: &Props) -> Element {
            Element::text("")
        }
        let div = ElementKind::Host("div".into());
        let span = ElementKind::Host("span".into());
        assert!(div.same_type(&ElementKind::Host("div".into())));
        assert!(!div.same_type(&span));
        assert!(ElementKind::Component(blank).same_type(&ElementKind::Component(blank)));
        assert!(!ElementKind::Component(blank).same_type(&ElementKind::Component(other)));
        assert!(ElementKind::Text.same_type(&ElementKind::Text));
        assert!(!ElementKind::Text.same_type(&div));
    }
}
