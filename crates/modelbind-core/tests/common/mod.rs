use std::sync::{Arc, Mutex};

use modelbind_core::{
    IndexContext, JsonGraphBuilder, ModelContainer, Persistor, PersistorError, PropertyId,
    PropertyListener,
};
use serde_json::{json, Value};

/// Property handles of the order fixture graph
#[allow(dead_code)]
pub struct OrderGraph {
    pub root: PropertyId,
    pub customer: PropertyId,
    pub items: PropertyId,
    pub sku: PropertyId,
    pub adjustments: PropertyId,
    pub amount: PropertyId,
}

/// Build a container over the order graph: a scalar, a list, and a list
/// nested inside it
///
/// ```text
/// order
/// ├── customer
/// └── items[]
///     ├── sku
///     └── adjustments[]
///         └── amount
/// ```
#[allow(dead_code)]
pub fn order_container() -> (ModelContainer<Value>, OrderGraph) {
    let mut builder = JsonGraphBuilder::new("order");
    let root = builder.root();
    let customer = builder.field(root, "customer").unwrap();
    let items = builder.list(root, "items").unwrap();
    let sku = builder.field(items, "sku").unwrap();
    let adjustments = builder.list(items, "adjustments").unwrap();
    let amount = builder.field(adjustments, "amount").unwrap();

    let container = ModelContainer::new(builder.finish());
    let graph = OrderGraph {
        root,
        customer,
        items,
        sku,
        adjustments,
        amount,
    };
    (container, graph)
}

/// The sample model most tests start from: two items, the first with two
/// adjustments, the second with one
#[allow(dead_code)]
pub fn sample_order() -> Value {
    json!({
        "customer": "acme",
        "items": [
            { "sku": "bolt", "adjustments": [ { "amount": 1 }, { "amount": 2 } ] },
            { "sku": "nut",  "adjustments": [ { "amount": 3 } ] }
        ]
    })
}

/// An order container with the sample model already installed
#[allow(dead_code)]
pub fn loaded_container() -> (ModelContainer<Value>, OrderGraph) {
    let (mut container, graph) = order_container();
    container.set_model(sample_order()).unwrap();
    (container, graph)
}

/// A persistor recording every instance it receives and returning it
/// unchanged
#[allow(dead_code)]
pub fn recording_persistor() -> (Box<dyn Persistor>, Arc<Mutex<Vec<Value>>>) {
    let calls: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let persistor: Box<dyn Persistor> =
        Box::new(move |instance: Value| -> Result<Value, PersistorError> {
            seen.lock().unwrap().push(instance.clone());
            Ok(instance)
        });
    (persistor, calls)
}

/// A listener recording every refresh it receives
#[allow(dead_code)]
pub fn recording_listener() -> (
    Box<dyn PropertyListener>,
    Arc<Mutex<Vec<(PropertyId, Option<Value>)>>>,
) {
    let calls: Arc<Mutex<Vec<(PropertyId, Option<Value>)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let listener: Box<dyn PropertyListener> =
        Box::new(move |property: PropertyId, value: Option<&Value>| {
            seen.lock().unwrap().push((property, value.cloned()));
        });
    (listener, calls)
}

/// Shorthand for a context pinning the given (list, index) pairs
#[allow(dead_code)]
pub fn ctx(pairs: &[(PropertyId, u32)]) -> IndexContext {
    IndexContext::EMPTY.with_all(pairs.iter().copied())
}
