//! Pretty printing of serialized trees and the sinks debug output goes to.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use console::{Style, Term};

use crate::serializer::{SerializedChild, SerializedNode, SerializedValue};

/// Which tree view `debug` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugView {
    /// Host-only tree
    #[default]
    Deep,
    /// Root output with composites below shown opaque
    Shallow,
}

/// Destination for debug output
pub trait DebugSink {
    /// Receive one rendering, with the caller's message if any
    fn write(&self, output: &str, message: Option<&str>);
}

/// Writes to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DebugSink for ConsoleSink {
    fn write(&self, output: &str, message: Option<&str>) {
        let term = Term::stdout();
        let result = match message {
            Some(message) => term
                .write_line(output)
                .and_then(|()| term.write_line(message)),
            None => term.write_line(output),
        };
        if let Err(err) = result {
            tracing::warn!(%err, "failed to write debug output");
        }
    }
}

/// One captured debug call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Rendered tree, possibly styled
    pub output: String,
    /// Message passed alongside
    pub message: Option<String>,
}

impl DebugEntry {
    /// Output with ANSI styling removed
    #[must_use]
    pub fn plain(&self) -> String {
        console::strip_ansi_codes(&self.output).into_owned()
    }
}

/// Records debug output in memory; clones share one buffer
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    entries: Rc<RefCell<Vec<DebugEntry>>>,
}

impl CaptureSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything captured so far
    #[must_use]
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.entries.borrow().clone()
    }

    /// Drain captured entries
    pub fn take(&self) -> Vec<DebugEntry> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<DebugEntry> {
        self.entries.borrow().last().cloned()
    }

    /// Number of captured entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl DebugSink for CaptureSink {
    fn write(&self, output: &str, message: Option<&str>) {
        self.entries.borrow_mut().push(DebugEntry {
            output: output.to_string(),
            message: message.map(ToString::to_string),
        });
    }
}

/// Highlight styles
#[derive(Debug, Clone)]
pub struct Palette {
    tag: Style,
    prop: Style,
    value: Style,
}

impl Palette {
    /// Tags cyan, prop names yellow, values green; styling forced on or off
    #[must_use]
    pub fn new(colored: bool) -> Self {
        Self {
            tag: Style::new().cyan().force_styling(colored),
            prop: Style::new().yellow().force_styling(colored),
            value: Style::new().green().force_styling(colored),
        }
    }

    /// No styling
    #[must_use]
    pub fn plain() -> Self {
        Self::new(false)
    }
}

/// Render a serialized tree in indented markup form
///
/// An empty tree renders as `null`.
#[must_use]
pub fn format_tree(tree: Option<&SerializedNode>, palette: &Palette) -> String {
    let mut out = String::new();
    match tree {
        Some(node) => write_node(&mut out, node, 0, palette),
        None => out.push_str("null"),
    }
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn write_node(out: &mut String, node: &SerializedNode, depth: usize, palette: &Palette) {
    let indent = "  ".repeat(depth);
    let tag = palette.tag.apply_to(&node.node_type);

    if node.props.is_empty() {
        if node.children.is_empty() {
            let _ = writeln!(out, "{indent}<{tag} />");
            return;
        }
        let _ = writeln!(out, "{indent}<{tag}>");
    } else {
        let _ = writeln!(out, "{indent}<{tag}");
        for (key, value) in &node.props {
            let _ = writeln!(
                out,
                "{indent}  {}={}",
                palette.prop.apply_to(key),
                palette.value.apply_to(format_value(value))
            );
        }
        if node.children.is_empty() {
            let _ = writeln!(out, "{indent}/>");
            return;
        }
        let _ = writeln!(out, "{indent}>");
    }

    for child in &node.children {
        match child {
            SerializedChild::Node(child) => write_node(out, child, depth + 1, palette),
            SerializedChild::Literal(literal) => {
                let _ = writeln!(out, "{indent}  {literal}");
            }
        }
    }
    let _ = writeln!(out, "{indent}</{tag}>");
}

fn format_value(value: &SerializedValue) -> String {
    match value {
        SerializedValue::String(s) => quote(s),
        SerializedValue::Null => "{null}".to_string(),
        SerializedValue::Bool(b) => format!("{{{b}}}"),
        SerializedValue::Number(n) => format!("{{{}}}", crate::value::format_number(*n)),
        SerializedValue::Function => "{[Function]}".to_string(),
        other => {
            let json = serde_json::to_string(other).unwrap_or_else(|_| "?".to_string());
            format!("{{{json}}}")
        }
    }
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
