//! Render sessions.
//!
//! A [`Session`] owns one renderer instance and the configuration it was
//! created with. It exposes the query family through [`Queryable`], plus
//! update, unmount, serialization and debug printing.
//!
//! ```
//! use tree_probe::prelude::*;
//!
//! let session = render(Element::host("Text").prop("testID", "greeting").text("hi")).unwrap();
//! let node = session.get_by_test_id("greeting").unwrap();
//! assert_eq!(node.text_content().as_deref(), Some("hi"));
//! ```

use crate::config::RenderConfig;
use crate::debug::{format_tree, DebugView};
use crate::element::Element;
use crate::node::Node;
use crate::query::Queryable;
use crate::renderer::{Renderer, TestRenderer};
use crate::result::{ProbeError, ProbeResult};
use crate::serializer::{to_json, to_shallow_json, SerializedNode};

/// Mount `element` in a fresh test renderer with default configuration
///
/// # Errors
///
/// Returns an error if the initial commit fails.
pub fn render(element: Element) -> ProbeResult<Session> {
    render_with_config(element, RenderConfig::default())
}

/// Mount `element` in a fresh test renderer
///
/// # Errors
///
/// Returns an error if the initial commit fails.
pub fn render_with_config(element: Element, config: RenderConfig) -> ProbeResult<Session> {
    let renderer = TestRenderer::new(&config);
    Session::mount(renderer, element, config)
}

/// A mounted tree and the operations available on it
#[derive(Debug)]
pub struct Session<R: Renderer = TestRenderer> {
    renderer: R,
    config: RenderConfig,
    unmounted: bool,
}

impl<R: Renderer> Session<R> {
    /// Mount `element` with a caller-supplied renderer
    ///
    /// # Errors
    ///
    /// Returns an error if the initial commit fails.
    pub fn mount(mut renderer: R, element: Element, config: RenderConfig) -> ProbeResult<Self> {
        tracing::debug!(root = %element.type_ref(), "render");
        renderer.mount(element)?;
        renderer.flush()?;
        Ok(Self {
            renderer,
            config,
            unmounted: false,
        })
    }

    /// Re-render the root with a new element
    ///
    /// Instances of matching type are kept, along with their state.
    ///
    /// # Errors
    ///
    /// `InvalidState` after [`Session::unmount`]; otherwise any commit error.
    pub fn update(&mut self, element: Element) -> ProbeResult<()> {
        if self.unmounted {
            return Err(ProbeError::InvalidState {
                message: "update called after unmount".to_string(),
            });
        }
        tracing::debug!(root = %element.type_ref(), "update");
        self.renderer.update(element)?;
        self.renderer.flush()
    }

    /// Tear the tree down; calling it again does nothing
    ///
    /// # Errors
    ///
    /// Returns an error if the teardown commit fails.
    pub fn unmount(&mut self) -> ProbeResult<()> {
        if self.unmounted {
            tracing::debug!("unmount called twice, ignoring");
            return Ok(());
        }
        self.unmounted = true;
        tracing::debug!("unmount");
        self.renderer.unmount()
    }

    /// Whether [`Session::unmount`] has run
    #[must_use]
    pub const fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Mounted root node
    #[must_use]
    pub fn root(&self) -> Option<Node> {
        if self.unmounted {
            return None;
        }
        self.renderer.root()
    }

    /// Host-only serialized tree
    #[must_use]
    pub fn to_json(&self) -> Option<SerializedNode> {
        self.root().as_ref().and_then(to_json)
    }

    /// One-level serialized tree
    #[must_use]
    pub fn to_shallow_json(&self) -> Option<SerializedNode> {
        self.root().as_ref().and_then(to_shallow_json)
    }

    /// Pretty rendering of a view, styled per the configured colour mode
    #[must_use]
    pub fn format_debug(&self, view: DebugView) -> String {
        let tree = match view {
            DebugView::Deep => self.to_json(),
            DebugView::Shallow => self.to_shallow_json(),
        };
        format_tree(tree.as_ref(), &self.config.palette())
    }

    /// Print the host tree to the configured sink
    pub fn debug(&self, message: Option<&str>) {
        self.config
            .sink()
            .write(&self.format_debug(DebugView::Deep), message);
    }

    /// Print the one-level tree to the configured sink
    pub fn debug_shallow(&self, message: Option<&str>) {
        self.config
            .sink()
            .write(&self.format_debug(DebugView::Shallow), message);
    }

    /// Configuration the session was created with
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Underlying renderer
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }
}

impl<R: Renderer> Queryable for Session<R> {
    fn query_root(&self) -> Option<Node> {
        self.root()
    }
}
