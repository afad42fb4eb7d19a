//! Read-only handles onto rendered nodes.
//!
//! A [`Node`] is a cheap, clonable view of one instance in a renderer's tree.
//! Handles stay valid across re-renders: reading props through a handle taken
//! before a state change returns the committed values after it. Nodes removed
//! from the tree keep their last committed props and report
//! [`Node::is_attached`] as `false`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::element::TypeRef;
use crate::renderer::{NodeChild, NodeData, NodeId, TreeShared};
use crate::value::{Handler, Literal, PropValue, Props};

/// Whether a node is a host primitive or a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Primitive UI element
    Host,
    /// User-defined component instance
    Composite,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Composite => write!(f, "composite"),
        }
    }
}

/// Handle to one rendered node
#[derive(Clone)]
pub struct Node {
    tree: Rc<TreeShared>,
    id: NodeId,
}

/// A child slot as seen through a node handle
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEntry {
    /// Child node
    Node(Node),
    /// Literal leaf
    Literal(Literal),
}

impl Node {
    pub(crate) const fn new(tree: Rc<TreeShared>, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub(crate) fn with_data<T>(&self, f: impl FnOnce(&NodeData) -> T) -> T {
        let tree = self.tree.tree();
        f(tree.node(self.id))
    }

    pub(crate) const fn shared(&self) -> &Rc<TreeShared> {
        &self.tree
    }

    fn wrap(&self, id: NodeId) -> Self {
        Self::new(Rc::clone(&self.tree), id)
    }

    /// Stable identifier within the renderer
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Host or composite
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.with_data(|data| {
            if data.type_ref.is_host() {
                NodeKind::Host
            } else {
                NodeKind::Composite
            }
        })
    }

    /// Element type of this node
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        self.with_data(|data| data.type_ref.clone())
    }

    /// Tag or component name
    #[must_use]
    pub fn display_name(&self) -> String {
        self.with_data(|data| data.type_ref.display_name().to_string())
    }

    /// Committed props, `children` included
    #[must_use]
    pub fn props(&self) -> Props {
        self.with_data(|data| data.props.clone())
    }

    /// One committed prop
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<PropValue> {
        self.with_data(|data| data.props.get(key).cloned())
    }

    /// A function-valued prop
    #[must_use]
    pub fn handler(&self, key: &str) -> Option<Handler> {
        self.with_data(|data| data.props.handler(key).cloned())
    }

    /// Reconciliation key, if one was given
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.with_data(|data| data.key.clone())
    }

    /// Value of the test-id prop
    #[must_use]
    pub fn test_id(&self) -> Option<String> {
        let key = self.tree.test_id_key();
        self.with_data(|data| data.props.str(key).map(ToString::to_string))
    }

    /// Rendered child nodes in order, literals skipped
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.with_data(|data| data.child_nodes().collect::<Vec<_>>())
            .into_iter()
            .map(|id| self.wrap(id))
            .collect()
    }

    /// Rendered children in order, literals included
    #[must_use]
    pub fn entries(&self) -> Vec<NodeEntry> {
        self.child_entries()
            .into_iter()
            .map(|child| match child {
                NodeChild::Node(id) => NodeEntry::Node(self.wrap(id)),
                NodeChild::Literal(literal) => NodeEntry::Literal(literal),
            })
            .collect()
    }

    pub(crate) fn child_entries(&self) -> Vec<NodeChild> {
        self.with_data(|data| data.children.clone())
    }

    /// Parent node, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.with_data(|data| data.parent).map(|id| self.wrap(id))
    }

    /// Concatenated literal children, `None` when the node has none
    #[must_use]
    pub fn text_content(&self) -> Option<String> {
        self.with_data(NodeData::text_content)
    }

    /// Whether the node is still part of the mounted tree
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.with_data(|data| data.attached)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.tree).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Node");
        out.field("id", &self.id);
        match self.tree.try_tree() {
            Some(tree) => {
                let data = tree.node(self.id);
                out.field("type", &data.type_ref.display_name())
                    .field("attached", &data.attached);
            }
            None => {
                out.field("type", &"<borrowed>");
            }
        }
        out.finish()
    }
}
