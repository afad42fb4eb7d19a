//! Node predicates used by the query family.
//!
//! Query arguments convert into matchers through `TryFrom`, so a query can take
//! a plain string, a compiled [`Regex`], a [`TypeRef`] or a JSON object. The
//! conversions that can fail (pattern compilation, non-object JSON) report
//! [`ProbeError::InvalidMatcher`].

use std::fmt;

use regex::Regex;

use crate::element::TypeRef;
use crate::node::Node;
use crate::renderer::NodeData;
use crate::result::{ProbeError, ProbeResult};
use crate::value::{PropValue, Props};

/// Match by display name or by type identity
#[derive(Debug, Clone)]
pub enum NameMatch {
    /// Compare the display name (tag or component name)
    Name(String),
    /// Compare the element type itself
    Type(TypeRef),
}

impl NameMatch {
    fn matches(&self, type_ref: &TypeRef) -> bool {
        match self {
            Self::Name(name) => type_ref.display_name() == name,
            Self::Type(expected) => type_ref == expected,
        }
    }
}

impl TryFrom<&str> for NameMatch {
    type Error = ProbeError;

    fn try_from(name: &str) -> ProbeResult<Self> {
        Ok(Self::Name(name.to_string()))
    }
}

impl TryFrom<String> for NameMatch {
    type Error = ProbeError;

    fn try_from(name: String) -> ProbeResult<Self> {
        Ok(Self::Name(name))
    }
}

impl TryFrom<&TypeRef> for NameMatch {
    type Error = ProbeError;

    fn try_from(type_ref: &TypeRef) -> ProbeResult<Self> {
        Ok(Self::Type(type_ref.clone()))
    }
}

impl TryFrom<TypeRef> for NameMatch {
    type Error = ProbeError;

    fn try_from(type_ref: TypeRef) -> ProbeResult<Self> {
        Ok(Self::Type(type_ref))
    }
}

/// Match a node's text content exactly or by pattern
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Whole text must be equal
    Exact(String),
    /// Pattern must match somewhere in the text
    Pattern(Regex),
}

impl TextMatch {
    /// Compile a pattern matcher
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidMatcher`] if `source` is not a valid regex.
    pub fn pattern(source: &str) -> ProbeResult<Self> {
        Regex::new(source)
            .map(Self::Pattern)
            .map_err(|err| ProbeError::InvalidMatcher {
                message: err.to_string(),
            })
    }

    /// Whether `text` satisfies this matcher
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Exact(expected) => text == expected,
            Self::Pattern(regex) => regex.is_match(text),
        }
    }
}

impl TryFrom<&str> for TextMatch {
    type Error = ProbeError;

    fn try_from(text: &str) -> ProbeResult<Self> {
        Ok(Self::Exact(text.to_string()))
    }
}

impl TryFrom<String> for TextMatch {
    type Error = ProbeError;

    fn try_from(text: String) -> ProbeResult<Self> {
        Ok(Self::Exact(text))
    }
}

impl TryFrom<Regex> for TextMatch {
    type Error = ProbeError;

    fn try_from(regex: Regex) -> ProbeResult<Self> {
        Ok(Self::Pattern(regex))
    }
}

impl TryFrom<&Regex> for TextMatch {
    type Error = ProbeError;

    fn try_from(regex: &Regex) -> ProbeResult<Self> {
        Ok(Self::Pattern(regex.clone()))
    }
}

/// Match nodes whose props contain every given entry
#[derive(Debug, Clone, PartialEq)]
pub struct PropsMatch(Props);

impl PropsMatch {
    /// Expected entries
    #[must_use]
    pub const fn expected(&self) -> &Props {
        &self.0
    }
}

impl TryFrom<Props> for PropsMatch {
    type Error = ProbeError;

    fn try_from(props: Props) -> ProbeResult<Self> {
        Ok(Self(props))
    }
}

impl TryFrom<&Props> for PropsMatch {
    type Error = ProbeError;

    fn try_from(props: &Props) -> ProbeResult<Self> {
        Ok(Self(props.clone()))
    }
}

impl TryFrom<Vec<(&str, PropValue)>> for PropsMatch {
    type Error = ProbeError;

    fn try_from(pairs: Vec<(&str, PropValue)>) -> ProbeResult<Self> {
        Ok(Self(pairs.into_iter().collect()))
    }
}

impl TryFrom<serde_json::Value> for PropsMatch {
    type Error = ProbeError;

    fn try_from(value: serde_json::Value) -> ProbeResult<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(key, value)| (key, PropValue::from(value)))
                    .collect(),
            )),
            other => Err(ProbeError::InvalidMatcher {
                message: format!("props matcher must be an object, got {other}"),
            }),
        }
    }
}

/// A predicate over nodes
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Test-id prop equals the value
    TestId(String),
    /// Display name or type identity
    Name(NameMatch),
    /// Type identity
    Type(TypeRef),
    /// Text content
    Text(TextMatch),
    /// Props subset
    Props(PropsMatch),
}

impl Matcher {
    /// Match by test id
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Match by display name
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(NameMatch::Name(name.into()))
    }

    /// Match by element type
    #[must_use]
    pub fn of_type(type_ref: &TypeRef) -> Self {
        Self::Type(type_ref.clone())
    }

    /// Match by exact text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextMatch::Exact(text.into()))
    }

    /// Match by text pattern
    #[must_use]
    pub const fn text_pattern(regex: Regex) -> Self {
        Self::Text(TextMatch::Pattern(regex))
    }

    /// Match by props subset
    #[must_use]
    pub const fn props(props: Props) -> Self {
        Self::Props(PropsMatch(props))
    }

    /// Whether `node` satisfies this matcher
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        let key = node.shared().test_id_key();
        node.with_data(|data| self.matches_data(data, key))
    }

    pub(crate) fn matches_data(&self, data: &NodeData, test_id_key: &str) -> bool {
        match self {
            Self::TestId(id) => data.props.str(test_id_key) == Some(id.as_str()),
            Self::Name(name) => name.matches(&data.type_ref),
            Self::Type(expected) => data.type_ref == *expected,
            Self::Text(text) => data
                .text_content()
                .is_some_and(|content| text.is_match(&content)),
            Self::Props(PropsMatch(expected)) => data.props.contains_all(expected),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestId(id) => write!(f, "test id {id:?}"),
            Self::Name(NameMatch::Name(name)) => write!(f, "name {name:?}"),
            Self::Name(NameMatch::Type(ty)) | Self::Type(ty) => write!(f, "type {ty}"),
            Self::Text(TextMatch::Exact(text)) => write!(f, "text {text:?}"),
            Self::Text(TextMatch::Pattern(regex)) => write!(f, "text /{}/", regex.as_str()),
            Self::Props(PropsMatch(props)) => {
                write!(f, "props {{")?;
                for (i, key) in props.keys().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
