mod common;

use common::{ctx, loaded_container, recording_listener, recording_persistor};
use modelbind_core::{IndexContext, ModelError, ModelHandler};
use serde_json::json;

// ===== CONTEXT MERGE TESTS =====

#[test]
fn test_accessor_reads_through_its_fixed_context() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 0)]));

    let view = container.accessor(id).unwrap();
    assert_eq!(view.absolute_context().unwrap(), ctx(&[(g.items, 0)]));
    assert_eq!(
        view.get_property(g.sku, &IndexContext::EMPTY).unwrap(),
        Some(json!("bolt"))
    );
}

#[test]
fn test_fixed_context_wins_over_the_caller() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 0)]));

    let view = container.accessor(id).unwrap();
    assert_eq!(
        view.get_property(g.sku, &ctx(&[(g.items, 1)])).unwrap(),
        Some(json!("bolt"))
    );
}

#[test]
fn test_child_accessor_merges_the_parent_chain() {
    let (mut container, g) = loaded_container();
    let parent = container.register_accessor(ctx(&[(g.items, 1)]));
    let child = container
        .register_child_accessor(parent, ctx(&[(g.adjustments, 0)]))
        .unwrap();

    let view = container.accessor(child).unwrap();
    assert_eq!(
        view.absolute_context().unwrap(),
        ctx(&[(g.items, 1), (g.adjustments, 0)])
    );
    assert_eq!(
        view.get_property(g.amount, &IndexContext::EMPTY).unwrap(),
        Some(json!(3))
    );
}

#[test]
fn test_outer_context_wins_on_collision() {
    let (mut container, g) = loaded_container();
    let parent = container.register_accessor(ctx(&[(g.items, 0)]));
    let child = container
        .register_child_accessor(parent, ctx(&[(g.items, 1)]))
        .unwrap();

    let view = container.accessor(child).unwrap();
    assert_eq!(view.absolute_context().unwrap(), ctx(&[(g.items, 0)]));
    assert_eq!(
        view.get_property(g.sku, &IndexContext::EMPTY).unwrap(),
        Some(json!("bolt"))
    );
}

#[test]
fn test_writes_through_a_view_log_the_absolute_address() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 0)]));

    let mut view = container.accessor(id).unwrap();
    view.set_property(g.amount, json!(99), &ctx(&[(g.adjustments, 1)]))
        .unwrap();

    assert_eq!(
        container.model().unwrap()["items"][0]["adjustments"][1]["amount"],
        json!(99)
    );
    assert_eq!(
        container.change_log().contexts(g.amount),
        &[ctx(&[(g.items, 0), (g.adjustments, 1)])]
    );
}

// ===== REFRESH NOTIFICATION TESTS =====

#[test]
fn test_refresh_reaches_views_covering_the_write() {
    let (mut container, g) = loaded_container();
    let first = container.register_accessor(ctx(&[(g.items, 0)]));
    let second = container.register_accessor(ctx(&[(g.items, 1)]));
    let (first_listener, first_calls) = recording_listener();
    let (second_listener, second_calls) = recording_listener();
    container.bind(first, g.sku, first_listener).unwrap();
    container.bind(second, g.sku, second_listener).unwrap();

    container
        .set_property(g.sku, json!("m4"), &ctx(&[(g.items, 0)]))
        .unwrap();

    assert_eq!(
        *first_calls.lock().unwrap(),
        vec![(g.sku, Some(json!("m4")))]
    );
    assert!(second_calls.lock().unwrap().is_empty());
}

#[test]
fn test_refresh_covers_descendants_of_the_written_property() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 0)]));
    let (listener, calls) = recording_listener();
    container.bind(id, g.sku, listener).unwrap();

    // replacing the whole element refreshes bindings on its fields
    container
        .set_property(
            g.items,
            json!({ "sku": "m8", "adjustments": [] }),
            &ctx(&[(g.items, 0)]),
        )
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![(g.sku, Some(json!("m8")))]);
}

#[test]
fn test_set_model_refreshes_every_view() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 1)]));
    let (listener, calls) = recording_listener();
    container.bind(id, g.sku, listener).unwrap();

    container
        .set_model(json!({
            "customer": "solo",
            "items": [ { "sku": "only", "adjustments": [] } ]
        }))
        .unwrap();

    // the view's instance is gone in the new model
    assert_eq!(*calls.lock().unwrap(), vec![(g.sku, None)]);
}

#[test]
fn test_unbind_stops_refreshes() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(ctx(&[(g.items, 0)]));
    let (listener, calls) = recording_listener();
    let binding = container.bind(id, g.sku, listener).unwrap();

    container
        .set_property(g.sku, json!("m4"), &ctx(&[(g.items, 0)]))
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);

    container.unbind(id, binding).unwrap();
    container
        .set_property(g.sku, json!("m5"), &ctx(&[(g.items, 0)]))
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);

    assert!(matches!(
        container.unbind(id, binding),
        Err(ModelError::UnknownBinding { .. })
    ));
}

// ===== INDEX-SHIFT TESTS =====

#[test]
fn test_insert_rebases_views_behind_the_insertion_point() {
    let (mut container, g) = loaded_container();
    let front = container.register_accessor(ctx(&[(g.items, 0)]));
    let back = container.register_accessor(ctx(&[(g.items, 1)]));

    container
        .add_property(
            g.items,
            json!({ "sku": "washer", "adjustments": [] }),
            &ctx(&[(g.items, 1)]),
        )
        .unwrap();

    assert_eq!(container.accessor_context(front).unwrap(), &ctx(&[(g.items, 0)]));
    assert_eq!(container.accessor_context(back).unwrap(), &ctx(&[(g.items, 2)]));

    // the shifted view still resolves the element it was watching
    let view = container.accessor(back).unwrap();
    assert_eq!(
        view.get_property(g.sku, &IndexContext::EMPTY).unwrap(),
        Some(json!("nut"))
    );
}

#[test]
fn test_remove_rebases_and_clamps() {
    let (mut container, g) = loaded_container();
    let front = container.register_accessor(ctx(&[(g.items, 0)]));
    let back = container.register_accessor(ctx(&[(g.items, 1)]));

    container
        .remove_property(g.items, &ctx(&[(g.items, 0)]))
        .unwrap();

    assert_eq!(container.accessor_context(front).unwrap(), &ctx(&[(g.items, 0)]));
    assert_eq!(container.accessor_context(back).unwrap(), &ctx(&[(g.items, 0)]));

    let view = container.accessor(back).unwrap();
    assert_eq!(
        view.get_property(g.sku, &IndexContext::EMPTY).unwrap(),
        Some(json!("nut"))
    );
}

#[test]
fn test_nested_insert_rebases_only_matching_instances() {
    let (mut container, g) = loaded_container();
    let same_item = container.register_accessor(ctx(&[(g.items, 0), (g.adjustments, 1)]));
    let other_item = container.register_accessor(ctx(&[(g.items, 1), (g.adjustments, 0)]));

    container
        .add_property(
            g.adjustments,
            json!({ "amount": 0 }),
            &ctx(&[(g.items, 0), (g.adjustments, 0)]),
        )
        .unwrap();

    assert_eq!(
        container.accessor_context(same_item).unwrap(),
        &ctx(&[(g.items, 0), (g.adjustments, 2)])
    );
    assert_eq!(
        container.accessor_context(other_item).unwrap(),
        &ctx(&[(g.items, 1), (g.adjustments, 0)])
    );

    // the rebased view keeps following the same adjustment
    let view = container.accessor(same_item).unwrap();
    assert_eq!(
        view.get_property(g.amount, &IndexContext::EMPTY).unwrap(),
        Some(json!(2))
    );
}

#[test]
fn test_add_notifies_the_parent_scope() {
    let (mut container, g) = loaded_container();
    let id = container.register_accessor(IndexContext::EMPTY);
    let (listener, calls) = recording_listener();
    container.bind(id, g.items, listener).unwrap();

    container
        .add_property(
            g.items,
            json!({ "sku": "washer", "adjustments": [] }),
            &ctx(&[(g.items, 2)]),
        )
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, g.items);
    assert_eq!(calls[0].1.as_ref().unwrap().as_array().unwrap().len(), 3);
}

// ===== LIFECYCLE TESTS =====

#[test]
fn test_remove_accessor_releases_the_subtree() {
    let (mut container, g) = loaded_container();
    let parent = container.register_accessor(ctx(&[(g.items, 0)]));
    let child = container
        .register_child_accessor(parent, ctx(&[(g.adjustments, 0)]))
        .unwrap();
    let (listener, calls) = recording_listener();
    container.bind(child, g.amount, listener).unwrap();
    assert_eq!(container.accessor_count(), 2);

    container.remove_accessor(parent).unwrap();
    assert_eq!(container.accessor_count(), 0);
    assert!(matches!(
        container.accessor(child),
        Err(ModelError::UnknownAccessor { .. })
    ));

    container
        .set_property(g.amount, json!(7), &ctx(&[(g.items, 0), (g.adjustments, 0)]))
        .unwrap();
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_persist_through_a_view_scopes_to_its_context() {
    let (mut container, g) = loaded_container();
    let (persistor, calls) = recording_persistor();
    container.register_persistor(g.items, persistor).unwrap();
    let id = container.register_accessor(ctx(&[(g.items, 1)]));

    container
        .set_property(g.sku, json!("m4"), &ctx(&[(g.items, 0)]))
        .unwrap();
    container
        .set_property(g.sku, json!("m5"), &ctx(&[(g.items, 1)]))
        .unwrap();

    let mut view = container.accessor(id).unwrap();
    assert!(view.is_property_changed(g.sku, &IndexContext::EMPTY).unwrap());
    view.persist(&IndexContext::EMPTY).unwrap();
    assert!(!view.is_property_changed(g.sku, &IndexContext::EMPTY).unwrap());

    let seen = calls.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["sku"], json!("m5"));
    // the other instance's change stays pending
    assert!(container
        .is_property_changed(g.sku, &ctx(&[(g.items, 0)]))
        .unwrap());
}
