//! Simulated user events.
//!
//! An event named `press` invokes the node's `onPress` prop. State updates the
//! handler schedules are batched and committed before the call returns.

use crate::node::Node;
use crate::result::ProbeResult;
use crate::value::PropValue;

/// Prop key of the handler for `event`: `"press"` becomes `"onPress"`
#[must_use]
pub fn handler_name(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// Invoke the handler for `event` on `node` and commit the result
///
/// A missing handler is not an error.
///
/// # Errors
///
/// Returns an error if committing the scheduled updates fails.
pub fn fire_event(node: &Node, event: &str, args: &[PropValue]) -> ProbeResult<()> {
    let key = handler_name(event);
    let Some(handler) = node.handler(&key) else {
        tracing::debug!(node = %node.id(), handler = %key, "no handler, event ignored");
        return Ok(());
    };

    let shared = node.shared();
    shared.batch(|| handler.call(args));
    shared.flush()
}

/// Shorthands for common events
#[derive(Debug, Clone, Copy)]
pub struct FireEvent;

impl FireEvent {
    /// Fire an arbitrary event
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn dispatch(node: &Node, event: &str, args: &[PropValue]) -> ProbeResult<()> {
        fire_event(node, event, args)
    }

    /// `onPress`
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn press(node: &Node) -> ProbeResult<()> {
        fire_event(node, "press", &[])
    }

    /// `onLongPress`
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn long_press(node: &Node) -> ProbeResult<()> {
        fire_event(node, "longPress", &[])
    }

    /// `onChangeText` with the new text
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn change_text(node: &Node, text: &str) -> ProbeResult<()> {
        fire_event(node, "changeText", &[PropValue::from(text)])
    }

    /// `onScroll` with an event payload
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn scroll(node: &Node, payload: PropValue) -> ProbeResult<()> {
        fire_event(node, "scroll", &[payload])
    }

    /// `onFocus`
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn focus(node: &Node) -> ProbeResult<()> {
        fire_event(node, "focus", &[])
    }

    /// `onBlur`
    ///
    /// # Errors
    ///
    /// See [`fire_event`].
    pub fn blur(node: &Node) -> ProbeResult<()> {
        fire_event(node, "blur", &[])
    }
}
