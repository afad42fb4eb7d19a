//! Tree queries.
//!
//! Every query walks the tree in pre-order (parent before children, children
//! left to right) from a root, collects the nodes a [`Matcher`] accepts, then
//! applies one of four cardinality policies:
//!
//! | Method | 0 matches | 1 match | more |
//! |---|---|---|---|
//! | `get_by_*` | `NotFound` | node | `Ambiguous` |
//! | `query_by_*` | `None` | `Some(node)` | `Ambiguous` |
//! | `get_all_by_*` | `NotFound` | all | all |
//! | `query_all_by_*` | empty | all | all |

use crate::element::TypeRef;
use crate::matcher::{Matcher, NameMatch, PropsMatch, TextMatch};
use crate::node::Node;
use crate::result::{ProbeError, ProbeResult};

/// Matching nodes under `root`, `root` included, in pre-order
pub(crate) fn collect_matches(root: &Node, matcher: &Matcher) -> Vec<Node> {
    let shared = root.shared();
    let key = shared.test_id_key();
    let tree = shared.tree();

    let mut found = Vec::new();
    let mut stack = vec![root.id()];
    while let Some(id) = stack.pop() {
        let data = tree.node(id);
        if matcher.matches_data(data, key) {
            found.push(id);
        }
        stack.extend(data.child_nodes().rev());
    }
    drop(tree);

    tracing::trace!(matcher = %matcher, matches = found.len(), "query");
    found
        .into_iter()
        .map(|id| Node::new(std::rc::Rc::clone(shared), id))
        .collect()
}

fn expect_one(mut found: Vec<Node>, matcher: &Matcher) -> ProbeResult<Node> {
    match found.len() {
        0 => Err(not_found(matcher)),
        1 => Ok(found.remove(0)),
        count => Err(ambiguous(count, matcher)),
    }
}

fn at_most_one(mut found: Vec<Node>, matcher: &Matcher) -> ProbeResult<Option<Node>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found.remove(0))),
        count => Err(ambiguous(count, matcher)),
    }
}

fn at_least_one(found: Vec<Node>, matcher: &Matcher) -> ProbeResult<Vec<Node>> {
    if found.is_empty() {
        Err(not_found(matcher))
    } else {
        Ok(found)
    }
}

fn not_found(matcher: &Matcher) -> ProbeError {
    ProbeError::NotFound {
        matcher: matcher.to_string(),
    }
}

fn ambiguous(count: usize, matcher: &Matcher) -> ProbeError {
    ProbeError::Ambiguous {
        count,
        matcher: matcher.to_string(),
    }
}

/// Anything with a tree to search
///
/// Implemented by sessions (searching from the mounted root) and by nodes
/// (searching their own subtree).
pub trait Queryable {
    /// Where searches start; `None` means nothing is mounted
    fn query_root(&self) -> Option<Node>;

    /// All matches in pre-order
    fn find_all(&self, matcher: &Matcher) -> Vec<Node> {
        self.query_root()
            .map(|root| collect_matches(&root, matcher))
            .unwrap_or_default()
    }

    /// Exactly one match
    ///
    /// # Errors
    ///
    /// `NotFound` for zero matches, `Ambiguous` for more than one.
    fn get_by(&self, matcher: &Matcher) -> ProbeResult<Node> {
        expect_one(self.find_all(matcher), matcher)
    }

    /// Zero or one match
    ///
    /// # Errors
    ///
    /// `Ambiguous` for more than one match.
    fn query_by(&self, matcher: &Matcher) -> ProbeResult<Option<Node>> {
        at_most_one(self.find_all(matcher), matcher)
    }

    /// One or more matches
    ///
    /// # Errors
    ///
    /// `NotFound` for zero matches.
    fn get_all_by(&self, matcher: &Matcher) -> ProbeResult<Vec<Node>> {
        at_least_one(self.find_all(matcher), matcher)
    }

    /// Any number of matches
    ///
    /// # Errors
    ///
    /// Never fails for a well-formed matcher.
    fn query_all_by(&self, matcher: &Matcher) -> ProbeResult<Vec<Node>> {
        Ok(self.find_all(matcher))
    }

    /// The node whose test-id prop equals `id`
    ///
    /// # Errors
    ///
    /// `NotFound` or `Ambiguous`.
    fn get_by_test_id(&self, id: &str) -> ProbeResult<Node> {
        self.get_by(&Matcher::test_id(id))
    }

    /// Like [`Queryable::get_by_test_id`], `None` when absent
    ///
    /// # Errors
    ///
    /// `Ambiguous`.
    fn query_by_test_id(&self, id: &str) -> ProbeResult<Option<Node>> {
        self.query_by(&Matcher::test_id(id))
    }

    /// Every node with the test id
    ///
    /// # Errors
    ///
    /// `NotFound`.
    fn get_all_by_test_id(&self, id: &str) -> ProbeResult<Vec<Node>> {
        self.get_all_by(&Matcher::test_id(id))
    }

    /// Every node with the test id, possibly none
    ///
    /// # Errors
    ///
    /// Never fails.
    fn query_all_by_test_id(&self, id: &str) -> ProbeResult<Vec<Node>> {
        self.query_all_by(&Matcher::test_id(id))
    }

    /// The node with this display name or type
    ///
    /// # Errors
    ///
    /// `NotFound` or `Ambiguous`.
    fn get_by_name<M>(&self, name: M) -> ProbeResult<Node>
    where
        M: TryInto<NameMatch, Error = ProbeError>,
    {
        self.get_by(&Matcher::Name(name.try_into()?))
    }

    /// Zero or one node with this display name or type
    ///
    /// # Errors
    ///
    /// `Ambiguous`.
    fn query_by_name<M>(&self, name: M) -> ProbeResult<Option<Node>>
    where
        M: TryInto<NameMatch, Error = ProbeError>,
    {
        self.query_by(&Matcher::Name(name.try_into()?))
    }

    /// Every node with this display name or type
    ///
    /// # Errors
    ///
    /// `NotFound`.
    fn get_all_by_name<M>(&self, name: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<NameMatch, Error = ProbeError>,
    {
        self.get_all_by(&Matcher::Name(name.try_into()?))
    }

    /// Every node with this display name or type, possibly none
    ///
    /// # Errors
    ///
    /// Never fails.
    fn query_all_by_name<M>(&self, name: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<NameMatch, Error = ProbeError>,
    {
        self.query_all_by(&Matcher::Name(name.try_into()?))
    }

    /// The node of this exact type
    ///
    /// # Errors
    ///
    /// `NotFound` or `Ambiguous`.
    fn get_by_type(&self, type_ref: &TypeRef) -> ProbeResult<Node> {
        self.get_by(&Matcher::of_type(type_ref))
    }

    /// Zero or one node of this type
    ///
    /// # Errors
    ///
    /// `Ambiguous`.
    fn query_by_type(&self, type_ref: &TypeRef) -> ProbeResult<Option<Node>> {
        self.query_by(&Matcher::of_type(type_ref))
    }

    /// Every node of this type
    ///
    /// # Errors
    ///
    /// `NotFound`.
    fn get_all_by_type(&self, type_ref: &TypeRef) -> ProbeResult<Vec<Node>> {
        self.get_all_by(&Matcher::of_type(type_ref))
    }

    /// Every node of this type, possibly none
    ///
    /// # Errors
    ///
    /// Never fails.
    fn query_all_by_type(&self, type_ref: &TypeRef) -> ProbeResult<Vec<Node>> {
        self.query_all_by(&Matcher::of_type(type_ref))
    }

    /// The node whose direct text matches
    ///
    /// # Errors
    ///
    /// `InvalidMatcher`, `NotFound` or `Ambiguous`.
    fn get_by_text<M>(&self, text: M) -> ProbeResult<Node>
    where
        M: TryInto<TextMatch, Error = ProbeError>,
    {
        self.get_by(&Matcher::Text(text.try_into()?))
    }

    /// Zero or one node whose direct text matches
    ///
    /// # Errors
    ///
    /// `InvalidMatcher` or `Ambiguous`.
    fn query_by_text<M>(&self, text: M) -> ProbeResult<Option<Node>>
    where
        M: TryInto<TextMatch, Error = ProbeError>,
    {
        self.query_by(&Matcher::Text(text.try_into()?))
    }

    /// Every node whose direct text matches
    ///
    /// # Errors
    ///
    /// `InvalidMatcher` or `NotFound`.
    fn get_all_by_text<M>(&self, text: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<TextMatch, Error = ProbeError>,
    {
        self.get_all_by(&Matcher::Text(text.try_into()?))
    }

    /// Every node whose direct text matches, possibly none
    ///
    /// # Errors
    ///
    /// `InvalidMatcher`.
    fn query_all_by_text<M>(&self, text: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<TextMatch, Error = ProbeError>,
    {
        self.query_all_by(&Matcher::Text(text.try_into()?))
    }

    /// The node whose props contain every given entry
    ///
    /// # Errors
    ///
    /// `InvalidMatcher`, `NotFound` or `Ambiguous`.
    fn get_by_props<M>(&self, props: M) -> ProbeResult<Node>
    where
        M: TryInto<PropsMatch, Error = ProbeError>,
    {
        self.get_by(&Matcher::Props(props.try_into()?))
    }

    /// Zero or one node whose props contain every given entry
    ///
    /// # Errors
    ///
    /// `InvalidMatcher` or `Ambiguous`.
    fn query_by_props<M>(&self, props: M) -> ProbeResult<Option<Node>>
    where
        M: TryInto<PropsMatch, Error = ProbeError>,
    {
        self.query_by(&Matcher::Props(props.try_into()?))
    }

    /// Every node whose props contain every given entry
    ///
    /// # Errors
    ///
    /// `InvalidMatcher` or `NotFound`.
    fn get_all_by_props<M>(&self, props: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<PropsMatch, Error = ProbeError>,
    {
        self.get_all_by(&Matcher::Props(props.try_into()?))
    }

    /// Every node whose props contain every given entry, possibly none
    ///
    /// # Errors
    ///
    /// `InvalidMatcher`.
    fn query_all_by_props<M>(&self, props: M) -> ProbeResult<Vec<Node>>
    where
        M: TryInto<PropsMatch, Error = ProbeError>,
    {
        self.query_all_by(&Matcher::Props(props.try_into()?))
    }
}

impl Queryable for Node {
    fn query_root(&self) -> Option<Node> {
        Some(self.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::element::Element;
    use crate::fixtures::banana_types;
    use crate::renderer::{Renderer, TestRenderer};
    use crate::value::{PropValue, Props, CHILDREN_KEY};
    use regex::Regex;

    fn banana_root() -> (TestRenderer, Node) {
        let types = banana_types();
        let mut r = TestRenderer::new(&RenderConfig::default());
        r.mount(Element::new(&types.banana)).unwrap();
        let root = r.root().unwrap();
        (r, root)
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_get_by_test_id_found() {
            let (_r, root) = banana_root();
            let node = root.get_by_test_id("bananaFresh").unwrap();
            assert_eq!(node.prop(CHILDREN_KEY), Some(PropValue::from("not fresh")));
            assert_eq!(root.get_by_test_id("bananaFresh").unwrap(), node);
        }

        #[test]
        fn test_get_missing_is_not_found() {
            let (_r, root) = banana_root();
            let err = root.get_by_test_id("InExistent").unwrap_err();
            assert_eq!(err.to_string(), "No instances found");
            assert!(root.query_by_test_id("InExistent").unwrap().is_none());
            assert!(root.get_all_by_name("InExistent").unwrap_err().is_not_found());
            assert!(root.query_all_by_name("InExistent").unwrap().is_empty());
        }

        #[test]
        fn test_singular_query_with_many_matches_is_ambiguous() {
            let (_r, root) = banana_root();
            let err = root.get_by_name("Text").unwrap_err();
            assert_eq!(err.to_string(), "Expected 1 but found 3");
            let err = root
                .query_by_text(Regex::new("fresh").unwrap())
                .unwrap_err();
            assert_eq!(err.to_string(), "Expected 1 but found 3");
        }

        #[test]
        fn test_type_family_with_many_matches_is_ambiguous() {
            let (_r, root) = banana_root();
            let text = TypeRef::host("Text");
            let err = root.get_by_type(&text).unwrap_err();
            assert!(err.is_ambiguous());
            assert_eq!(err.to_string(), "Expected 1 but found 3");
            let err = root.query_by_type(&text).unwrap_err();
            assert_eq!(err.to_string(), "Expected 1 but found 3");
            assert_eq!(root.get_all_by_type(&text).unwrap().len(), 3);
        }

        #[test]
        fn test_props_family_with_many_matches_is_ambiguous() {
            let mut r = TestRenderer::new(&RenderConfig::default());
            r.mount(
                Element::host("List")
                    .child(Element::host("Row").prop("flex", 1).prop("id", "a"))
                    .child(Element::host("Row").prop("flex", 1).prop("id", "b"))
                    .child(Element::host("Row").prop("flex", 2).prop("id", "c")),
            )
            .unwrap();
            let root = r.root().unwrap();

            let err = root.get_by_props(Props::new().with("flex", 1)).unwrap_err();
            assert!(err.is_ambiguous());
            assert_eq!(err.to_string(), "Expected 1 but found 2");
            let err = root
                .query_by_props(serde_json::json!({ "flex": 1 }))
                .unwrap_err();
            assert_eq!(err.to_string(), "Expected 1 but found 2");

            let single = root.get_by_props(vec![("flex", PropValue::from(2))]).unwrap();
            assert_eq!(single.prop("id"), Some(PropValue::from("c")));
        }

        #[test]
        fn test_plural_results_in_pre_order() {
            let (_r, root) = banana_root();
            let texts: Vec<_> = root
                .get_all_by_name("Text")
                .unwrap()
                .iter()
                .map(|n| n.text_content().unwrap())
                .collect();
            assert_eq!(
                texts,
                vec!["Is the banana fresh?", "not fresh", "Change freshness!"]
            );
        }
    }

    mod family_tests {
        use super::*;

        #[test]
        fn test_name_by_string_and_type() {
            let types = banana_types();
            let mut r = TestRenderer::new(&RenderConfig::default());
            r.mount(Element::new(&types.banana)).unwrap();
            let root = r.root().unwrap();
            let by_name = root.get_by_name("Button").unwrap();
            let by_type = root.get_by_name(&types.button).unwrap();
            assert_eq!(by_name, by_type);
            assert_eq!(root.get_by_type(&types.button).unwrap(), by_name);
        }

        #[test]
        fn test_type_is_identity_not_name() {
            let (_r, root) = banana_root();
            let impostor = TypeRef::component("Button").render(|_| None);
            assert!(root.query_all_by_type(&impostor).unwrap().is_empty());
            assert_eq!(root.get_all_by_type(&TypeRef::host("Text")).unwrap().len(), 3);
        }

        #[test]
        fn test_text_pattern_skips_composites() {
            let (_r, root) = banana_root();
            let button = root.get_by_text(Regex::new("(?i)change").unwrap()).unwrap();
            assert_eq!(button.display_name(), "Text");
            assert_eq!(root.get_all_by_text(Regex::new("(?i)fresh").unwrap()).unwrap().len(), 3);
        }

        #[test]
        fn test_text_exact() {
            let (_r, root) = banana_root();
            let node = root.get_by_text("not fresh").unwrap();
            assert_eq!(node.test_id().as_deref(), Some("bananaFresh"));
        }

        #[test]
        fn test_props_subset() {
            let (_r, root) = banana_root();
            let primary = root
                .get_by_props(serde_json::json!({ "type": "primary" }))
                .unwrap();
            assert_eq!(primary.display_name(), "Button");
            assert_eq!(
                primary.prop(CHILDREN_KEY),
                Some(PropValue::from("Change freshness!"))
            );
            let none = root
                .query_by_props(Props::new().with("type", "inexistent"))
                .unwrap();
            assert!(none.is_none());
        }

        #[test]
        fn test_invalid_props_matcher() {
            let (_r, root) = banana_root();
            let err = root.get_by_props(serde_json::json!("primary")).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidMatcher { .. }));
        }

        #[test]
        fn test_node_queries_are_scoped() {
            let (_r, root) = banana_root();
            let button = root.get_by_name("Button").unwrap();
            let inner = button.get_by_name("Text").unwrap();
            assert_eq!(inner.text_content().as_deref(), Some("Change freshness!"));
            assert!(button.query_by_test_id("bananaFresh").unwrap().is_none());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn flat_list(tags: &[bool]) -> TestRenderer {
            let mut list = Element::host("List");
            for (i, marked) in tags.iter().enumerate() {
                let mut row = Element::host("Row").prop("index", i32::try_from(i).unwrap());
                if *marked {
                    row = row.prop("testID", "marked");
                }
                list = list.child(row);
            }
            let mut r = TestRenderer::new(&RenderConfig::default());
            r.mount(list).unwrap();
            r
        }

        proptest! {
            #[test]
            fn prop_cardinality_policies(tags in proptest::collection::vec(any::<bool>(), 0..12)) {
                let r = flat_list(&tags);
                let root = r.root().unwrap();
                let expected = tags.iter().filter(|m| **m).count();

                let all = root.query_all_by_test_id("marked").unwrap();
                prop_assert_eq!(all.len(), expected);

                match expected {
                    0 => {
                        prop_assert!(root.get_by_test_id("marked").unwrap_err().is_not_found());
                        prop_assert!(root.query_by_test_id("marked").unwrap().is_none());
                        prop_assert!(root.get_all_by_test_id("marked").is_err());
                    }
                    1 => {
                        let one = root.get_by_test_id("marked").unwrap();
                        prop_assert_eq!(Some(one), root.query_by_test_id("marked").unwrap());
                    }
                    n => {
                        let err = root.get_by_test_id("marked").unwrap_err();
                        prop_assert_eq!(err.to_string(), format!("Expected 1 but found {n}"));
                        prop_assert!(root.query_by_test_id("marked").unwrap_err().is_ambiguous());
                        prop_assert_eq!(root.get_all_by_test_id("marked").unwrap().len(), n);
                    }
                }
            }

            #[test]
            fn prop_plural_results_follow_document_order(tags in proptest::collection::vec(any::<bool>(), 1..12)) {
                let r = flat_list(&tags);
                let root = r.root().unwrap();
                let indices: Vec<f64> = root
                    .query_all_by_name("Row")
                    .unwrap()
                    .iter()
                    .filter_map(|n| n.prop("index").and_then(|v| v.as_f64()))
                    .collect();
                let mut sorted = indices.clone();
                sorted.sort_by(f64::total_cmp);
                prop_assert_eq!(indices, sorted);
            }
        }
    }
}
