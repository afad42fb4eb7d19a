//! Tree-probe: render, query and poke declarative component trees in tests.
//!
//! Components are plain records (a name, typed state, a render function and
//! lifecycle callbacks). A [`Session`] mounts an element tree into an
//! in-memory renderer; tests then find nodes the way a user would (by test
//! id, text, name, type or props), fire events at them, and compare the
//! serialized result against stored snapshots.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Element  │──►│ TestRenderer │──►│ Node handles │
//! │ builders │   │ (reconciler, │   │   queries    │
//! └──────────┘   │ update queue)│   │   events     │
//!                └──────────────┘   └──────┬───────┘
//!                                          ▼
//!                              serializer ─► debug / snapshots
//! ```
//!
//! # Example
//!
//! ```
//! use tree_probe::prelude::*;
//!
//! let counter = TypeRef::component("Counter")
//!     .state(|_| 0_i64)
//!     .render(|scope| {
//!         Some(
//!             Element::host("Text")
//!                 .prop("testID", "count")
//!                 .prop("onPress", scope.updater(|n: &i64| n + 1))
//!                 .text(scope.state().to_string()),
//!         )
//!     });
//!
//! let session = render(Element::new(&counter)).unwrap();
//! let count = session.get_by_test_id("count").unwrap();
//! FireEvent::press(&count).unwrap();
//! assert_eq!(count.text_content().as_deref(), Some("1"));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod config;
mod debug;
mod element;
mod event;
mod matcher;
mod node;
#[allow(clippy::missing_errors_doc)]
mod query;
mod renderer;
mod result;
mod serializer;
mod session;
#[cfg(feature = "snapshot")]
mod snapshot;
mod telemetry;
mod value;

#[cfg(test)]
mod fixtures;

pub use config::{
    ColorMode, RenderConfig, COLOR_ENV_VAR, DEFAULT_FLUSH_LIMIT, DEFAULT_TEST_ID_KEY,
    FLUSH_LIMIT_ENV_VAR,
};
pub use debug::{
    format_tree, CaptureSink, ConsoleSink, DebugEntry, DebugSink, DebugView, Palette,
};
pub use element::{
    Child, ComponentBuilder, ComponentDef, Element, LifecyclePhase, Scope, StateSetter, TypeRef,
};
pub use event::{fire_event, handler_name, FireEvent};
pub use matcher::{Matcher, NameMatch, PropsMatch, TextMatch};
pub use node::{Node, NodeEntry, NodeKind};
pub use query::Queryable;
pub use renderer::{NodeId, Renderer, TestRenderer};
pub use result::{ProbeError, ProbeResult};
pub use serializer::{
    describe_element, to_json, to_shallow_json, SerializedChild, SerializedNode, SerializedValue,
    INTERNAL_PROPS,
};
pub use session::{render, render_with_config, Session};
#[cfg(feature = "snapshot")]
pub use snapshot::{
    LineDiff, SnapshotConfig, SnapshotDiff, SnapshotManager, TreeSnapshot, DEFAULT_SNAPSHOT_DIR,
    UPDATE_ENV_VAR,
};
pub use telemetry::{init_tracing, LOG_ENV_VAR, LOG_FORMAT_ENV_VAR};
pub use value::{format_number, Handler, Literal, PropValue, Props, CHILDREN_KEY};

/// Everything a test usually needs
pub mod prelude {
    pub use super::config::{ColorMode, RenderConfig};
    pub use super::debug::{CaptureSink, DebugSink, DebugView};
    pub use super::element::{Child, Element, TypeRef};
    pub use super::event::{fire_event, FireEvent};
    pub use super::matcher::Matcher;
    pub use super::node::{Node, NodeKind};
    pub use super::query::Queryable;
    pub use super::result::{ProbeError, ProbeResult};
    pub use super::session::{render, render_with_config, Session};
    #[cfg(feature = "snapshot")]
    pub use super::snapshot::{SnapshotConfig, SnapshotManager};
    pub use super::value::{Handler, Literal, PropValue, Props};
}
