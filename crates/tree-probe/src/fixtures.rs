//! Shared components for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::element::{Element, TypeRef};

pub(crate) struct BananaTypes {
    pub(crate) banana: TypeRef,
    pub(crate) button: TypeRef,
}

/// `Button` wraps its children in a pressable `Text`; `Banana` renders a
/// freshness status, and a `Button` that toggles it.
pub(crate) fn banana_types() -> BananaTypes {
    let button = TypeRef::component("Button").render(|scope| {
        let mut touchable = Element::host("TouchableOpacity");
        if let Some(on_press) = scope.props().handler("onPress") {
            touchable = touchable.prop("onPress", on_press.clone());
        }
        Some(touchable.child(Element::host("Text").with_children(scope.children())))
    });

    let button_ref = button.clone();
    let banana = TypeRef::component("Banana")
        .state(|_| false)
        .on_update(|props| {
            if let Some(on_update) = props.handler("onUpdate") {
                on_update.call(&[]);
            }
        })
        .on_unmount(|props| {
            if let Some(on_unmount) = props.handler("onUnmount") {
                on_unmount.call(&[]);
            }
        })
        .render(move |scope| {
            let fresh = *scope.state();
            Some(
                Element::host("View")
                    .child(Element::host("Text").text("Is the banana fresh?"))
                    .child(
                        Element::host("Text")
                            .prop("testID", "bananaFresh")
                            .text(if fresh { "fresh" } else { "not fresh" }),
                    )
                    .child(
                        Element::new(&button_ref)
                            .prop("onPress", scope.updater(|fresh: &bool| !fresh))
                            .prop("type", "primary")
                            .text("Change freshness!"),
                    ),
            )
        });

    BananaTypes { banana, button }
}

/// `Counter` renders a pressable `Text` showing a count
pub(crate) fn counter_type() -> TypeRef {
    TypeRef::component("Counter")
        .state(|_| 0_i64)
        .render(|scope| {
            Some(
                Element::host("Text")
                    .prop("onPress", scope.updater(|n: &i64| n + 1))
                    .text(scope.state().to_string()),
            )
        })
}

pub(crate) type Recorder = Rc<dyn Fn(&'static str)>;

/// Shared call log and a recorder appending to it
pub(crate) fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, Recorder) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let record: Recorder = Rc::new(move |entry| sink.borrow_mut().push(entry));
    (log, record)
}
