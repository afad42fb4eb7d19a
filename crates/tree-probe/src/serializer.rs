//! Plain-data views of a rendered tree.
//!
//! [`to_json`] keeps host nodes only: each composite is replaced by the host
//! output it rendered. [`to_shallow_json`] resolves one level instead: the
//! root composite's output is shown, and composites below it appear as opaque
//! nodes carrying their own props and described children.
//!
//! Props are stored in a `BTreeMap`, so both views serialize with sorted keys
//! and are identical for identical content.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::element::{Child, Element, TypeRef};
use crate::node::Node;
use crate::renderer::{NodeChild, NodeId, Tree};
use crate::result::ProbeResult;
use crate::value::{serialize_number, Literal, PropValue, Props};

/// Prop keys that belong to the framework, never serialized
pub const INTERNAL_PROPS: [&str; 3] = ["children", "key", "ref"];

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedNode {
    /// Host tag, or display name for opaque composites
    #[serde(rename = "type")]
    pub node_type: String,
    /// Props without framework-internal keys
    pub props: BTreeMap<String, SerializedValue>,
    /// Children in order
    pub children: Vec<SerializedChild>,
}

impl SerializedNode {
    /// As a `serde_json::Value`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> ProbeResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// As pretty-printed JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Serialized child slot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SerializedChild {
    /// Literal leaf
    Literal(Literal),
    /// Nested node
    Node(SerializedNode),
}

/// Serialized prop value
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedValue {
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Callable, rendered as `"[Function]"`
    Function,
    /// List
    List(Vec<SerializedValue>),
    /// Mapping with sorted keys
    Map(BTreeMap<String, SerializedValue>),
    /// Described elements held in a prop
    Nodes(Vec<SerializedChild>),
}

impl SerializedValue {
    fn from_prop(value: &PropValue) -> Self {
        match value {
            PropValue::Null => Self::Null,
            PropValue::Bool(b) => Self::Bool(*b),
            PropValue::Number(n) => Self::Number(*n),
            PropValue::String(s) => Self::String(s.clone()),
            PropValue::Handler(_) => Self::Function,
            PropValue::List(items) => Self::List(items.iter().map(Self::from_prop).collect()),
            PropValue::Map(props) => Self::Map(
                props
                    .iter()
                    .map(|(key, value)| (key.to_string(), Self::from_prop(value)))
                    .collect(),
            ),
            PropValue::Children(children) => Self::Nodes(describe_children(children)),
        }
    }
}

impl Serialize for SerializedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serialize_number(*n, serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Function => serializer.serialize_str("[Function]"),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Nodes(children) => {
                let mut seq = serializer.serialize_seq(Some(children.len()))?;
                for child in children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
        }
    }
}

fn serialize_props(props: &Props) -> BTreeMap<String, SerializedValue> {
    props
        .iter()
        .filter(|(key, _)| !INTERNAL_PROPS.contains(key))
        .map(|(key, value)| (key.to_string(), SerializedValue::from_prop(value)))
        .collect()
}

fn literal_child(child: &NodeChild) -> Option<SerializedChild> {
    match child {
        NodeChild::Literal(literal) => Some(SerializedChild::Literal(literal.clone())),
        NodeChild::Node(_) => None,
    }
}

/// Host-only view of the tree under `node`
///
/// `None` when `node` is a composite that rendered nothing.
#[must_use]
pub fn to_json(node: &Node) -> Option<SerializedNode> {
    let tree = node.shared().tree();
    deep(&tree, node.id())
}

fn deep(tree: &Tree, id: NodeId) -> Option<SerializedNode> {
    let data = tree.node(id);
    match &data.type_ref {
        TypeRef::Composite(_) => data.child_nodes().next().and_then(|child| deep(tree, child)),
        TypeRef::Host(tag) => Some(SerializedNode {
            node_type: tag.to_string(),
            props: serialize_props(&data.props),
            children: data
                .children
                .iter()
                .filter_map(|child| match child {
                    NodeChild::Node(id) => deep(tree, *id).map(SerializedChild::Node),
                    NodeChild::Literal(_) => literal_child(child),
                })
                .collect(),
        }),
    }
}

/// One-level view of the tree under `node`
///
/// A composite `node` is replaced by its rendered output; composites below are
/// opaque.
#[must_use]
pub fn to_shallow_json(node: &Node) -> Option<SerializedNode> {
    let tree = node.shared().tree();
    let data = tree.node(node.id());
    let start = if data.type_ref.is_host() {
        node.id()
    } else {
        data.child_nodes().next()?
    };
    Some(shallow(&tree, start))
}

fn shallow(tree: &Tree, id: NodeId) -> SerializedNode {
    let data = tree.node(id);
    match &data.type_ref {
        TypeRef::Composite(def) => SerializedNode {
            node_type: def.name().to_string(),
            props: serialize_props(&data.props),
            children: describe_children(&data.props.children()),
        },
        TypeRef::Host(tag) => SerializedNode {
            node_type: tag.to_string(),
            props: serialize_props(&data.props),
            children: data
                .children
                .iter()
                .filter_map(|child| match child {
                    NodeChild::Node(id) => Some(SerializedChild::Node(shallow(tree, *id))),
                    NodeChild::Literal(_) => literal_child(child),
                })
                .collect(),
        },
    }
}

/// Serialize an unrendered element description
#[must_use]
pub fn describe_element(element: &Element) -> SerializedNode {
    SerializedNode {
        node_type: element.type_ref().display_name().to_string(),
        props: serialize_props(element.props()),
        children: describe_children(&element.children()),
    }
}

fn describe_children(children: &[Child]) -> Vec<SerializedChild> {
    children
        .iter()
        .map(|child| match child {
            Child::Element(element) => SerializedChild::Node(describe_element(element)),
            Child::Literal(literal) => SerializedChild::Literal(literal.clone()),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::fixtures::banana_types;
    use crate::renderer::{Renderer, TestRenderer};
    use crate::value::Handler;

    fn mount(element: Element) -> TestRenderer {
        let mut r = TestRenderer::new(&RenderConfig::default());
        r.mount(element).unwrap();
        r
    }

    mod deep_tests {
        use super::*;

        #[test]
        fn test_button_serializes_to_host_output() {
            let types = banana_types();
            let r = mount(Element::new(&types.button).text("press me"));
            let json = to_json(&r.root().unwrap()).unwrap().to_value().unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "type": "TouchableOpacity",
                    "props": {},
                    "children": [
                        { "type": "Text", "props": {}, "children": ["press me"] }
                    ]
                })
            );
        }

        #[test]
        fn test_handlers_and_internal_props() {
            let r = mount(
                Element::host("Button")
                    .with_key("k")
                    .prop("onPress", Handler::new(|_| {}))
                    .prop("ref", "r")
                    .prop("size", 3)
                    .text("go"),
            );
            let json = to_json(&r.root().unwrap()).unwrap().to_value().unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "type": "Button",
                    "props": { "onPress": "[Function]", "size": 3 },
                    "children": ["go"]
                })
            );
        }

        #[test]
        fn test_composite_rendering_nothing_is_none() {
            let empty = TypeRef::component("Empty").render(|_| None);
            let r = mount(Element::new(&empty));
            assert!(to_json(&r.root().unwrap()).is_none());
        }

        #[test]
        fn test_keys_are_sorted() {
            let r = mount(Element::host("View").prop("z", 1).prop("a", 2));
            let text = to_json(&r.root().unwrap()).unwrap().to_json_string().unwrap();
            assert!(text.find("\"a\"").unwrap() < text.find("\"z\"").unwrap());
        }

        #[test]
        fn test_identical_content_identical_output() {
            let types = banana_types();
            let a = mount(Element::new(&types.banana));
            let b = mount(Element::new(&types.banana));
            assert_eq!(to_json(&a.root().unwrap()), to_json(&b.root().unwrap()));
        }
    }

    mod shallow_tests {
        use super::*;

        #[test]
        fn test_composites_below_root_are_opaque() {
            let types = banana_types();
            let r = mount(Element::new(&types.banana));
            let view = to_shallow_json(&r.root().unwrap()).unwrap();
            assert_eq!(view.node_type, "View");
            let SerializedChild::Node(button) = &view.children[2] else {
                panic!("expected a node");
            };
            assert_eq!(button.node_type, "Button");
            assert_eq!(button.props.get("type"), Some(&SerializedValue::String("primary".into())));
            assert_eq!(button.props.get("onPress"), Some(&SerializedValue::Function));
            assert_eq!(
                button.children,
                vec![SerializedChild::Literal(Literal::Text("Change freshness!".into()))]
            );
        }

        #[test]
        fn test_host_root_is_kept() {
            let r = mount(Element::host("View").child(Element::host("Text").text("hi")));
            let shallow = to_shallow_json(&r.root().unwrap()).unwrap();
            assert_eq!(Some(shallow), to_json(&r.root().unwrap()));
        }

        #[test]
        fn test_describe_element() {
            let described = describe_element(
                &Element::host("List").child(Element::host("Row").prop("id", 1)),
            );
            assert_eq!(described.node_type, "List");
            assert_eq!(described.children.len(), 1);
        }
    }
}
