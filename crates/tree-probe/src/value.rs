//! Property values carried by elements and nodes.
//!
//! Props are an insertion-ordered mapping from string keys to [`PropValue`]s.
//! The `children` key is reserved: it holds the element's children as they
//! were described (a single literal child is stored as the literal itself).

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};

use crate::element::Child;

/// Prop key holding an element's described children
pub const CHILDREN_KEY: &str = "children";

/// Callable prop value (event handlers such as `onPress`)
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&[PropValue])>);

impl Handler {
    /// Wrap a closure as a handler
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[PropValue]) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invoke the handler synchronously
    pub fn call(&self, args: &[PropValue]) {
        (self.0)(args);
    }

    /// Whether two handlers are the same closure
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Function]")
    }
}

/// A string or number leaf in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Text leaf
    Text(String),
    /// Numeric leaf
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Number(n) => serialize_number(*n, serializer),
        }
    }
}

/// Render a number the way it reads in markup: integral values drop the `.0`
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub(crate) fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

/// A single prop value
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Callable handler
    Handler(Handler),
    /// Ordered list
    List(Vec<Self>),
    /// Nested mapping
    Map(Props),
    /// Described children (elements and literals)
    Children(Vec<Child>),
}

impl PropValue {
    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as handler
    #[must_use]
    pub const fn as_handler(&self) -> Option<&Handler> {
        match self {
            Self::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// Whether the value is null
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret the value as a children list
    ///
    /// Strings and numbers become a single literal child; booleans and null
    /// render nothing.
    #[must_use]
    pub fn to_children(&self) -> Vec<Child> {
        match self {
            Self::String(s) => vec![Child::Literal(Literal::Text(s.clone()))],
            Self::Number(n) => vec![Child::Literal(Literal::Number(*n))],
            Self::Children(children) => children.clone(),
            Self::List(items) => items.iter().flat_map(Self::to_children).collect(),
            Self::Null | Self::Bool(_) | Self::Handler(_) | Self::Map(_) => Vec::new(),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for PropValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<Handler> for PropValue {
    fn from(h: Handler) -> Self {
        Self::Handler(h)
    }
}

impl From<Vec<Self>> for PropValue {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<Props> for PropValue {
    fn from(props: Props) -> Self {
        Self::Map(props)
    }
}

impl From<Literal> for PropValue {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Text(s) => Self::String(s),
            Literal::Number(n) => Self::Number(n),
        }
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(map.into_iter().collect()),
        }
    }
}

/// Insertion-ordered prop mapping
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: Vec<(String, PropValue)>,
}

impl Props {
    /// Create an empty mapping
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`Props::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing any existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether a key is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up a string value
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    /// Look up a handler value
    #[must_use]
    pub fn handler(&self, key: &str) -> Option<&Handler> {
        self.get(key).and_then(PropValue::as_handler)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The described children
    #[must_use]
    pub fn children(&self) -> Vec<Child> {
        self.get(CHILDREN_KEY)
            .map(PropValue::to_children)
            .unwrap_or_default()
    }

    /// Replace the described children
    ///
    /// No children removes the key, a single literal is stored bare.
    pub fn set_children(&mut self, mut children: Vec<Child>) {
        match children.len() {
            0 => {
                self.remove(CHILDREN_KEY);
            }
            1 if matches!(children[0], Child::Literal(_)) => {
                if let Some(Child::Literal(literal)) = children.pop() {
                    self.insert(CHILDREN_KEY, literal);
                }
            }
            _ => self.insert(CHILDREN_KEY, PropValue::Children(children)),
        }
    }

    /// Whether every entry of `subset` is present here with an equal value
    #[must_use]
    pub fn contains_all(&self, subset: &Self) -> bool {
        subset
            .iter()
            .all(|(key, expected)| self.get(key) == Some(expected))
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.contains_all(other)
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<String>,
    V: Into<PropValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::element::Element;
    use std::cell::Cell;

    mod handler_tests {
        use super::*;

        #[test]
        fn test_handler_call_receives_args() {
            let seen = Rc::new(Cell::new(0.0));
            let sink = Rc::clone(&seen);
            let handler = Handler::new(move |args| {
                sink.set(args.first().and_then(PropValue::as_f64).unwrap_or(-1.0));
            });
            handler.call(&[PropValue::from(7)]);
            assert!((seen.get() - 7.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_handler_equality_is_identity() {
            let a = Handler::new(|_| {});
            let b = Handler::new(|_| {});
            assert_eq!(a, a.clone());
            assert_ne!(a, b);
        }
    }

    mod literal_tests {
        use super::*;

        #[test]
        fn test_integral_numbers_drop_fraction() {
            assert_eq!(Literal::Number(3.0).to_string(), "3");
            assert_eq!(Literal::Number(-12.0).to_string(), "-12");
            assert_eq!(Literal::Number(2.5).to_string(), "2.5");
        }

        #[test]
        fn test_literal_serializes_as_plain_json() {
            let text = serde_json::to_string(&Literal::Text("hi".into())).unwrap();
            let int = serde_json::to_string(&Literal::Number(4.0)).unwrap();
            let float = serde_json::to_string(&Literal::Number(0.5)).unwrap();
            assert_eq!(text, "\"hi\"");
            assert_eq!(int, "4");
            assert_eq!(float, "0.5");
        }
    }

    mod props_tests {
        use super::*;

        #[test]
        fn test_insert_replaces_in_place() {
            let mut props = Props::new().with("a", 1).with("b", 2);
            props.insert("a", 10);
            let keys: Vec<_> = props.keys().collect();
            assert_eq!(keys, vec!["a", "b"]);
            assert_eq!(props.get("a"), Some(&PropValue::Number(10.0)));
        }

        #[test]
        fn test_equality_ignores_order() {
            let a = Props::new().with("x", "1").with("y", true);
            let b = Props::new().with("y", true).with("x", "1");
            assert_eq!(a, b);
            assert_ne!(a, Props::new().with("x", "1"));
        }

        #[test]
        fn test_contains_all_subset() {
            let props = Props::new().with("type", "primary").with("size", 3);
            assert!(props.contains_all(&Props::new().with("type", "primary")));
            assert!(!props.contains_all(&Props::new().with("type", "secondary")));
            assert!(!props.contains_all(&Props::new().with("missing", "x")));
            assert!(props.contains_all(&Props::new()));
        }

        #[test]
        fn test_single_literal_child_stored_bare() {
            let mut props = Props::new();
            props.set_children(vec![Child::from("hello")]);
            assert_eq!(props.str(CHILDREN_KEY), Some("hello"));
            assert_eq!(props.children(), vec![Child::from("hello")]);
        }

        #[test]
        fn test_multiple_children_stored_as_list() {
            let mut props = Props::new();
            props.set_children(vec![Child::from("a"), Child::from(Element::host("View"))]);
            assert!(matches!(props.get(CHILDREN_KEY), Some(PropValue::Children(c)) if c.len() == 2));
            props.set_children(Vec::new());
            assert!(!props.contains_key(CHILDREN_KEY));
        }

        #[test]
        fn test_from_json_object() {
            let value: PropValue = serde_json::json!({"type": "primary", "n": 2}).into();
            let PropValue::Map(props) = value else {
                panic!("expected map");
            };
            assert_eq!(props.str("type"), Some("primary"));
            assert_eq!(props.get("n"), Some(&PropValue::Number(2.0)));
        }
    }
}
