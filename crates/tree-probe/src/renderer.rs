//! The renderer boundary and the in-memory test renderer.
//!
//! A [`Renderer`] turns element descriptions into a live tree of nodes and
//! keeps it settled. [`TestRenderer`] is a synchronous reconciler:
//!
//! - Instances are reused when the element at the same position (or with the
//!   same key) has the same type; otherwise the old subtree is unmounted.
//! - State updates are queued and applied by an explicit flush. Every commit
//!   drains the queue before returning, so callers never see a partially
//!   committed tree.
//! - Lifecycle callbacks are collected during a commit and invoked after the
//!   tree borrow is released, children before parents.
//!
//! Render functions and lifecycle callbacks run while a commit is in
//! progress; state updates they schedule are folded into the same commit.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::RenderConfig;
use crate::element::{Child, ComponentDef, Element, LifecycleHook, LifecyclePhase, TypeRef};
use crate::node::Node;
use crate::result::{ProbeError, ProbeResult};
use crate::value::{Literal, Props};

/// The rendering engine a session drives
pub trait Renderer {
    /// Mount the first element tree
    fn mount(&mut self, element: Element) -> ProbeResult<()>;

    /// Re-render onto the same mount point
    fn update(&mut self, element: Element) -> ProbeResult<()>;

    /// Tear the tree down, firing unmount callbacks
    fn unmount(&mut self) -> ProbeResult<()>;

    /// Apply every pending state update
    fn flush(&mut self) -> ProbeResult<()>;

    /// Current root node, if anything is mounted
    fn root(&self) -> Option<Node>;
}

/// Stable index of a node within one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rendered child slot: a node or a literal leaf
#[derive(Debug, Clone)]
pub(crate) enum NodeChild {
    Node(NodeId),
    Literal(Literal),
}

/// Stored data of one node
pub(crate) struct NodeData {
    pub(crate) type_ref: TypeRef,
    pub(crate) props: Props,
    pub(crate) key: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeChild>,
    pub(crate) state: Option<Box<dyn Any>>,
    pub(crate) depth: usize,
    pub(crate) attached: bool,
}

impl NodeData {
    pub(crate) fn child_nodes(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|child| match child {
            NodeChild::Node(id) => Some(*id),
            NodeChild::Literal(_) => None,
        })
    }

    /// Concatenated direct literal children, `None` when there are none
    pub(crate) fn text_content(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for child in &self.children {
            if let NodeChild::Literal(literal) = child {
                text.get_or_insert_with(String::new)
                    .push_str(&literal.to_string());
            }
        }
        text
    }
}

/// Lifecycle callback queued for after the commit
struct Effect {
    phase: LifecyclePhase,
    component: String,
    hook: LifecycleHook,
    props: Props,
}

fn run_effects(effects: Vec<Effect>) {
    for effect in effects {
        tracing::trace!(phase = %effect.phase, component = %effect.component, "lifecycle callback");
        (effect.hook)(&effect.props);
    }
}

pub(crate) type StateUpdater = Box<dyn FnOnce(&mut dyn Any)>;

struct PendingUpdate {
    node: NodeId,
    apply: StateUpdater,
}

/// Node arena plus the current root
#[derive(Default)]
pub(crate) struct Tree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    rendered: HashSet<NodeId>,
}

impl Tree {
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub(crate) const fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    fn render_root(&mut self, element: Element, weak: &Weak<TreeShared>, effects: &mut Vec<Effect>) {
        let root = match self.root {
            Some(root) => self.reconcile(root, element, None, 0, weak, effects),
            None => self.mount(element, None, 0, weak, effects),
        };
        self.root = Some(root);
    }

    fn unmount_root(&mut self, effects: &mut Vec<Effect>) {
        if let Some(root) = self.root.take() {
            self.unmount(root, effects);
        }
    }

    fn mount(
        &mut self,
        element: Element,
        parent: Option<NodeId>,
        depth: usize,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) -> NodeId {
        let (type_ref, props, key) = element.into_parts();
        let id = self.alloc(NodeData {
            type_ref: type_ref.clone(),
            props,
            key,
            parent,
            children: Vec::new(),
            state: None,
            depth,
            attached: true,
        });
        self.rendered.insert(id);

        match &type_ref {
            TypeRef::Host(_) => {
                let described = self.node(id).props.children();
                let children = described
                    .into_iter()
                    .map(|child| self.mount_child(child, id, depth + 1, weak, effects))
                    .collect();
                self.node_mut(id).children = children;
            }
            TypeRef::Composite(def) => {
                let state = def.init_state(&self.node(id).props);
                self.node_mut(id).state = Some(state);
                if let Some(output) = self.render_composite(id, def, weak) {
                    let child = self.mount(output, Some(id), depth + 1, weak, effects);
                    self.node_mut(id).children = vec![NodeChild::Node(child)];
                }
                self.queue_effect(id, def, LifecyclePhase::Mount, effects);
            }
        }
        id
    }

    fn mount_child(
        &mut self,
        child: Child,
        parent: NodeId,
        depth: usize,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) -> NodeChild {
        match child {
            Child::Literal(literal) => NodeChild::Literal(literal),
            Child::Element(element) => {
                NodeChild::Node(self.mount(element, Some(parent), depth, weak, effects))
            }
        }
    }

    fn render_composite(
        &self,
        id: NodeId,
        def: &ComponentDef,
        weak: &Weak<TreeShared>,
    ) -> Option<Element> {
        let node = self.node(id);
        let state = node.state.as_deref()?;
        def.render(&node.props, state, StateHandle::new(weak.clone(), id))
    }

    fn queue_effect(
        &self,
        id: NodeId,
        def: &ComponentDef,
        phase: LifecyclePhase,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(hook) = def.hook(phase) {
            effects.push(Effect {
                phase,
                component: def.name().to_string(),
                hook,
                props: self.node(id).props.clone(),
            });
        }
    }

    fn reconcile(
        &mut self,
        existing: NodeId,
        element: Element,
        parent: Option<NodeId>,
        depth: usize,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) -> NodeId {
        let reusable = {
            let node = self.node(existing);
            node.attached
                && node.type_ref == *element.type_ref()
                && node.key.as_deref() == element.key()
        };
        if !reusable {
            self.unmount(existing, effects);
            return self.mount(element, parent, depth, weak, effects);
        }

        let (type_ref, props, _) = element.into_parts();
        self.node_mut(existing).props = props;
        match &type_ref {
            TypeRef::Host(_) => {
                let described = self.node(existing).props.children();
                self.reconcile_children(existing, described, weak, effects);
            }
            TypeRef::Composite(def) => self.rerender(existing, def, weak, effects),
        }
        existing
    }

    fn rerender(
        &mut self,
        id: NodeId,
        def: &ComponentDef,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) {
        self.rendered.insert(id);
        let output = self.render_composite(id, def, weak);
        let depth = self.node(id).depth;
        let previous = self.node(id).child_nodes().next();
        let next = match (previous, output) {
            (Some(old), Some(element)) => {
                Some(self.reconcile(old, element, Some(id), depth + 1, weak, effects))
            }
            (None, Some(element)) => Some(self.mount(element, Some(id), depth + 1, weak, effects)),
            (Some(old), None) => {
                self.unmount(old, effects);
                None
            }
            (None, None) => None,
        };
        self.node_mut(id).children = next.map(NodeChild::Node).into_iter().collect();
        self.queue_effect(id, def, LifecyclePhase::Update, effects);
    }

    fn reconcile_children(
        &mut self,
        parent: NodeId,
        next: Vec<Child>,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) {
        let depth = self.node(parent).depth + 1;
        let previous = std::mem::take(&mut self.node_mut(parent).children);

        let mut keyed: HashMap<String, NodeId> = HashMap::new();
        let mut positional: HashMap<usize, NodeId> = HashMap::new();
        let mut shadowed: Vec<NodeId> = Vec::new();
        for (index, child) in previous.iter().enumerate() {
            if let NodeChild::Node(id) = child {
                match &self.node(*id).key {
                    Some(key) if keyed.contains_key(key) => {
                        tracing::warn!(key = %key, node = %id, "duplicate sibling key, later node not reused");
                        shadowed.push(*id);
                    }
                    Some(key) => {
                        keyed.insert(key.clone(), *id);
                    }
                    None => {
                        positional.insert(index, *id);
                    }
                }
            }
        }

        let mut children = Vec::with_capacity(next.len());
        for (index, child) in next.into_iter().enumerate() {
            let slot = match child {
                Child::Literal(literal) => NodeChild::Literal(literal),
                Child::Element(element) => {
                    let existing = match element.key() {
                        Some(key) => keyed.remove(key),
                        None => positional.remove(&index),
                    };
                    let id = match existing {
                        Some(old) => self.reconcile(old, element, Some(parent), depth, weak, effects),
                        None => self.mount(element, Some(parent), depth, weak, effects),
                    };
                    NodeChild::Node(id)
                }
            };
            children.push(slot);
        }

        let mut leftovers: Vec<NodeId> = keyed
            .into_values()
            .chain(positional.into_values())
            .chain(shadowed)
            .collect();
        leftovers.sort_unstable();
        for id in leftovers {
            self.unmount(id, effects);
        }
        self.node_mut(parent).children = children;
    }

    fn unmount(&mut self, id: NodeId, effects: &mut Vec<Effect>) {
        if !self.node(id).attached {
            return;
        }
        let children: Vec<NodeId> = self.node(id).child_nodes().collect();
        for child in children {
            self.unmount(child, effects);
        }
        self.node_mut(id).attached = false;
        if let TypeRef::Composite(def) = self.node(id).type_ref.clone() {
            self.queue_effect(id, &def, LifecyclePhase::Unmount, effects);
        }
    }

    fn apply_updates(
        &mut self,
        pending: Vec<PendingUpdate>,
        weak: &Weak<TreeShared>,
        effects: &mut Vec<Effect>,
    ) {
        let mut dirty: Vec<NodeId> = Vec::new();
        for update in pending {
            let Some(node) = self.nodes.get_mut(update.node.0) else {
                continue;
            };
            if !node.attached {
                tracing::trace!(node = %update.node, "state update for detached node dropped");
                continue;
            }
            if let Some(state) = node.state.as_deref_mut() {
                (update.apply)(state);
                if !dirty.contains(&update.node) {
                    dirty.push(update.node);
                }
            }
        }

        // Parents first: re-rendering a parent re-renders its subtree.
        dirty.sort_by_key(|id| self.nodes[id.0].depth);
        for id in dirty {
            if self.rendered.contains(&id) || !self.node(id).attached {
                continue;
            }
            if let TypeRef::Composite(def) = self.node(id).type_ref.clone() {
                self.rerender(id, &def, weak, effects);
            }
        }
    }
}

/// Tree and update queue shared by a renderer, its nodes and state setters
pub(crate) struct TreeShared {
    tree: RefCell<Tree>,
    queue: RefCell<VecDeque<PendingUpdate>>,
    committing: Cell<bool>,
    batch_depth: Cell<usize>,
    flush_limit: usize,
    test_id_key: String,
}

/// Clears a flag when dropped, also while unwinding
struct FlagGuard<'a>(&'a Cell<bool>);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct BatchGuard<'a>(&'a Cell<usize>);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl TreeShared {
    pub(crate) fn new(config: &RenderConfig) -> Rc<Self> {
        Rc::new(Self {
            tree: RefCell::new(Tree::default()),
            queue: RefCell::new(VecDeque::new()),
            committing: Cell::new(false),
            batch_depth: Cell::new(0),
            flush_limit: config.flush_limit,
            test_id_key: config.test_id_key.clone(),
        })
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    pub(crate) fn try_tree(&self) -> Option<Ref<'_, Tree>> {
        self.tree.try_borrow().ok()
    }

    pub(crate) fn test_id_key(&self) -> &str {
        &self.test_id_key
    }

    fn enqueue(self: &Rc<Self>, update: PendingUpdate) {
        self.queue.borrow_mut().push_back(update);
        if self.committing.get() || self.batch_depth.get() > 0 {
            return;
        }
        if let Err(err) = self.flush() {
            tracing::warn!(%err, "synchronous state commit failed");
        }
    }

    /// Run `f` with synchronous commits suspended; the caller flushes after
    pub(crate) fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let _guard = BatchGuard(&self.batch_depth);
        f()
    }

    /// Apply pending updates; a no-op inside a running commit
    pub(crate) fn flush(self: &Rc<Self>) -> ProbeResult<()> {
        if self.committing.get() {
            return Ok(());
        }
        self.commit(|_, _, _| {})
    }

    fn commit<F>(self: &Rc<Self>, work: F) -> ProbeResult<()>
    where
        F: FnOnce(&mut Tree, &Weak<Self>, &mut Vec<Effect>),
    {
        if self.committing.replace(true) {
            return Err(ProbeError::InvalidState {
                message: "render requested while a commit is in progress".to_string(),
            });
        }
        let _guard = FlagGuard(&self.committing);
        let weak = Rc::downgrade(self);

        let mut effects = Vec::new();
        {
            let mut tree = self.tree.borrow_mut();
            tree.rendered.clear();
            work(&mut *tree, &weak, &mut effects);
        }
        run_effects(effects);

        let mut passes = 0;
        loop {
            let pending: Vec<PendingUpdate> = self.queue.borrow_mut().drain(..).collect();
            if pending.is_empty() {
                return Ok(());
            }
            passes += 1;
            if passes > self.flush_limit {
                self.queue.borrow_mut().clear();
                tracing::warn!(limit = self.flush_limit, "flush pass limit reached, pending updates dropped");
                return Err(ProbeError::UpdateDepthExceeded {
                    limit: self.flush_limit,
                });
            }
            tracing::debug!(pass = passes, updates = pending.len(), "flushing state updates");

            let mut effects = Vec::new();
            {
                let mut tree = self.tree.borrow_mut();
                tree.rendered.clear();
                tree.apply_updates(pending, &weak, &mut effects);
            }
            run_effects(effects);
        }
    }
}

/// Weak link from a state setter back to its instance
#[derive(Clone)]
pub(crate) struct StateHandle {
    tree: Weak<TreeShared>,
    node: NodeId,
}

impl StateHandle {
    pub(crate) const fn new(tree: Weak<TreeShared>, node: NodeId) -> Self {
        Self { tree, node }
    }

    pub(crate) fn enqueue(&self, apply: StateUpdater) {
        let Some(shared) = self.tree.upgrade() else {
            tracing::debug!(node = %self.node, "state update after the renderer was dropped ignored");
            return;
        };
        shared.enqueue(PendingUpdate {
            node: self.node,
            apply,
        });
    }
}

impl fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("node", &self.node)
            .field("live", &(self.tree.strong_count() > 0))
            .finish()
    }
}

/// Synchronous in-memory renderer
///
/// Nodes live in an append-only arena: a removed node is detached, not freed,
/// so handles to it stay readable. Memory grows with every node ever mounted
/// for the lifetime of the renderer; long-running sessions that churn
/// subtrees should be replaced periodically.
pub struct TestRenderer {
    shared: Rc<TreeShared>,
}

impl TestRenderer {
    /// Create an empty renderer
    #[must_use]
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            shared: TreeShared::new(config),
        }
    }

    /// Number of nodes ever allocated, detached ones included
    #[must_use]
    pub fn allocated_nodes(&self) -> usize {
        self.shared.tree().nodes.len()
    }
}

impl fmt::Debug for TestRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.shared.tree.try_borrow();
        f.debug_struct("TestRenderer")
            .field("root", &tree.as_ref().ok().and_then(|t| t.root))
            .field("nodes", &tree.as_ref().map(|t| t.nodes.len()).ok())
            .field("pending", &self.shared.queue.try_borrow().map(|q| q.len()).ok())
            .finish()
    }
}

impl Renderer for TestRenderer {
    fn mount(&mut self, element: Element) -> ProbeResult<()> {
        tracing::debug!(root = %element.type_ref(), "mounting tree");
        self.shared
            .commit(|tree, weak, effects| tree.render_root(element, weak, effects))
    }

    fn update(&mut self, element: Element) -> ProbeResult<()> {
        tracing::debug!(root = %element.type_ref(), "updating tree");
        self.shared
            .commit(|tree, weak, effects| tree.render_root(element, weak, effects))
    }

    fn unmount(&mut self) -> ProbeResult<()> {
        tracing::debug!("unmounting tree");
        self.shared.commit(|tree, _, effects| tree.unmount_root(effects))
    }

    fn flush(&mut self) -> ProbeResult<()> {
        self.shared.flush()
    }

    fn root(&self) -> Option<Node> {
        let root = self.shared.tree().root()?;
        Some(Node::new(Rc::clone(&self.shared), root))
    }
}
