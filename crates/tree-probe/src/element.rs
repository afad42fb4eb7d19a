//! Declarative element descriptions and component definitions.
//!
//! An [`Element`] describes what to render: a [`TypeRef`], its props and an
//! optional reconciliation key. Components are capability records built with
//! [`TypeRef::component`]: a display name, a typed initial state, a pure render
//! function and optional lifecycle callbacks.
//!
//! ```
//! use tree_probe::{Element, TypeRef};
//!
//! let counter = TypeRef::component("Counter")
//!     .state(|_| 0_i64)
//!     .render(|scope| {
//!         Some(
//!             Element::host("Text")
//!                 .prop("onPress", scope.updater(|n: &i64| n + 1))
//!                 .text(scope.state().to_string()),
//!         )
//!     });
//! assert_eq!(counter.display_name(), "Counter");
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::renderer::StateHandle;
use crate::value::{Handler, Literal, PropValue, Props};

/// Lifecycle callback receiving the instance's current props
pub(crate) type LifecycleHook = Rc<dyn Fn(&Props)>;

type InitFn = Box<dyn Fn(&Props) -> Box<dyn Any>>;
type RenderFn = Box<dyn Fn(&Props, &dyn Any, StateHandle) -> Option<Element>>;

/// Lifecycle transition a callback is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// First commit of an instance
    Mount,
    /// Re-render of an existing instance
    Update,
    /// Removal of an instance
    Unmount,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mount => write!(f, "mount"),
            Self::Update => write!(f, "update"),
            Self::Unmount => write!(f, "unmount"),
        }
    }
}

/// A user-defined component
pub struct ComponentDef {
    name: String,
    init: InitFn,
    render: RenderFn,
    on_mount: Option<LifecycleHook>,
    on_update: Option<LifecycleHook>,
    on_unmount: Option<LifecycleHook>,
}

impl ComponentDef {
    /// Display name, fixed when the component was defined
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn init_state(&self, props: &Props) -> Box<dyn Any> {
        (self.init)(props)
    }

    pub(crate) fn render(
        &self,
        props: &Props,
        state: &dyn Any,
        handle: StateHandle,
    ) -> Option<Element> {
        (self.render)(props, state, handle)
    }

    pub(crate) fn hook(&self, phase: LifecyclePhase) -> Option<LifecycleHook> {
        match phase {
            LifecyclePhase::Mount => self.on_mount.clone(),
            LifecyclePhase::Update => self.on_update.clone(),
            LifecyclePhase::Unmount => self.on_unmount.clone(),
        }
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("on_mount", &self.on_mount.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_unmount", &self.on_unmount.is_some())
            .finish()
    }
}

/// Reference to an element type
///
/// Host types are identified by their tag; composite types by the identity of
/// their definition, so two components with the same name are still distinct.
#[derive(Clone)]
pub enum TypeRef {
    /// Primitive UI element
    Host(Rc<str>),
    /// User-defined component
    Composite(Rc<ComponentDef>),
}

impl TypeRef {
    /// Reference a host primitive by tag
    #[must_use]
    pub fn host(tag: impl Into<Rc<str>>) -> Self {
        Self::Host(tag.into())
    }

    /// Start defining a component
    #[must_use]
    pub fn component(name: impl Into<String>) -> ComponentBuilder<()> {
        ComponentBuilder::new(name)
    }

    /// Tag for hosts, component name for composites
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Host(tag) => tag,
            Self::Composite(def) => def.name(),
        }
    }

    /// Whether this is a host type
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Component definition for composite types
    #[must_use]
    pub const fn as_component(&self) -> Option<&Rc<ComponentDef>> {
        match self {
            Self::Composite(def) => Some(def),
            Self::Host(_) => None,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(tag) => write!(f, "Host({tag:?})"),
            Self::Composite(def) => write!(f, "Composite({:?})", def.name()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Builder for component definitions
pub struct ComponentBuilder<S> {
    name: String,
    init: Box<dyn Fn(&Props) -> S>,
    on_mount: Option<LifecycleHook>,
    on_update: Option<LifecycleHook>,
    on_unmount: Option<LifecycleHook>,
}

impl ComponentBuilder<()> {
    /// Start a stateless component
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            init: Box::new(|_: &Props| ()),
            on_mount: None,
            on_update: None,
            on_unmount: None,
        }
    }
}

impl<S: 'static> ComponentBuilder<S> {
    /// Give the component state, initialised from its first props
    #[must_use]
    pub fn state<T, F>(self, init: F) -> ComponentBuilder<T>
    where
        T: 'static,
        F: Fn(&Props) -> T + 'static,
    {
        ComponentBuilder {
            name: self.name,
            init: Box::new(init),
            on_mount: self.on_mount,
            on_update: self.on_update,
            on_unmount: self.on_unmount,
        }
    }

    /// Callback after the instance's first commit
    #[must_use]
    pub fn on_mount(mut self, hook: impl Fn(&Props) + 'static) -> Self {
        self.on_mount = Some(Rc::new(hook));
        self
    }

    /// Callback after every re-render of the instance
    #[must_use]
    pub fn on_update(mut self, hook: impl Fn(&Props) + 'static) -> Self {
        self.on_update = Some(Rc::new(hook));
        self
    }

    /// Callback when the instance is removed from the tree
    #[must_use]
    pub fn on_unmount(mut self, hook: impl Fn(&Props) + 'static) -> Self {
        self.on_unmount = Some(Rc::new(hook));
        self
    }

    /// Finish the definition with its render function
    pub fn render<F>(self, render: F) -> TypeRef
    where
        F: Fn(&Scope<'_, S>) -> Option<Element> + 'static,
    {
        let init = self.init;
        let name = self.name;
        let render_name = name.clone();
        let def = ComponentDef {
            name,
            init: Box::new(move |props: &Props| Box::new(init(props)) as Box<dyn Any>),
            render: Box::new(move |props: &Props, state: &dyn Any, handle: StateHandle| {
                let Some(state) = state.downcast_ref::<S>() else {
                    tracing::error!(component = %render_name, "state type mismatch, rendering nothing");
                    return None;
                };
                let scope = Scope {
                    props,
                    state,
                    setter: StateSetter::new(handle),
                };
                render(&scope)
            }),
            on_mount: self.on_mount,
            on_update: self.on_update,
            on_unmount: self.on_unmount,
        };
        TypeRef::Composite(Rc::new(def))
    }
}

impl<S> fmt::Debug for ComponentBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBuilder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What a render function sees: props, current state and a state setter
pub struct Scope<'a, S> {
    props: &'a Props,
    state: &'a S,
    setter: StateSetter<S>,
}

impl<S: 'static> Scope<'_, S> {
    /// Current props
    #[must_use]
    pub const fn props(&self) -> &Props {
        self.props
    }

    /// Look up one prop
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// Described children passed to this component
    #[must_use]
    pub fn children(&self) -> Vec<Child> {
        self.props.children()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &S {
        self.state
    }

    /// Setter that schedules state updates for this instance
    #[must_use]
    pub fn setter(&self) -> StateSetter<S> {
        self.setter.clone()
    }

    /// Handler that applies `update` to the state, ignoring its arguments
    pub fn updater<F>(&self, update: F) -> Handler
    where
        F: Fn(&S) -> S + 'static,
    {
        let setter = self.setter();
        let update = Rc::new(update);
        Handler::new(move |_| {
            let update = Rc::clone(&update);
            setter.update(move |state| update(state));
        })
    }
}

impl<S> fmt::Debug for Scope<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("props", self.props)
            .finish_non_exhaustive()
    }
}

/// Schedules state updates for one component instance
///
/// Updates are queued and committed by the renderer's next flush. Outside of
/// a render, event dispatch or lifecycle callback, that flush happens before
/// `update` returns.
pub struct StateSetter<S> {
    handle: StateHandle,
    marker: PhantomData<fn(S) -> S>,
}

impl<S: 'static> StateSetter<S> {
    pub(crate) const fn new(handle: StateHandle) -> Self {
        Self {
            handle,
            marker: PhantomData,
        }
    }

    /// Derive the next state from the current one
    ///
    /// When this commits synchronously (called outside a render, batch or
    /// commit), a failing commit such as `UpdateDepthExceeded` is logged at
    /// `warn` level and not returned. Use [`crate::fire_event`] to dispatch a
    /// handler and receive the commit result.
    pub fn update<F>(&self, update: F)
    where
        F: FnOnce(&S) -> S + 'static,
    {
        self.handle.enqueue(Box::new(move |state: &mut dyn Any| {
            if let Some(state) = state.downcast_mut::<S>() {
                *state = update(state);
            }
        }));
    }

    /// Replace the state
    pub fn set(&self, value: S) {
        self.update(move |_| value);
    }
}

impl<S> Clone for StateSetter<S> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            marker: PhantomData,
        }
    }
}

impl<S> fmt::Debug for StateSetter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Declarative description of one element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    type_ref: TypeRef,
    props: Props,
    key: Option<String>,
}

impl Element {
    /// Describe an element of the given type
    #[must_use]
    pub fn new(type_ref: &TypeRef) -> Self {
        Self {
            type_ref: type_ref.clone(),
            props: Props::new(),
            key: None,
        }
    }

    /// Describe a host element by tag
    #[must_use]
    pub fn host(tag: &str) -> Self {
        Self::new(&TypeRef::host(tag))
    }

    /// Set one prop
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Merge a set of props
    #[must_use]
    pub fn with_props(mut self, props: Props) -> Self {
        for (key, value) in props.iter() {
            self.props.insert(key, value.clone());
        }
        self
    }

    /// Set the reconciliation key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append one child
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        let mut children = self.props.children();
        children.push(child.into());
        self.props.set_children(children);
        self
    }

    /// Append several children
    #[must_use]
    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        let mut current = self.props.children();
        current.extend(children.into_iter().map(Into::into));
        self.props.set_children(current);
        self
    }

    /// Append a text child
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Child::Literal(Literal::Text(text.into())))
    }

    /// Element type
    #[must_use]
    pub const fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Props, including described children
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// Reconciliation key
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Described children
    #[must_use]
    pub fn children(&self) -> Vec<Child> {
        self.props.children()
    }

    pub(crate) fn into_parts(self) -> (TypeRef, Props, Option<String>) {
        (self.type_ref, self.props, self.key)
    }
}

/// One described child: a nested element or a literal leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Nested element
    Element(Element),
    /// String or number leaf
    Literal(Literal),
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Literal> for Child {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Literal(Literal::Text(text.to_string()))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Literal(Literal::Text(text))
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Self::Literal(Literal::Number(n))
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Self::Literal(Literal::Number(n as f64))
    }
}

impl From<i32> for Child {
    fn from(n: i32) -> Self {
        Self::Literal(Literal::Number(f64::from(n)))
    }
}
