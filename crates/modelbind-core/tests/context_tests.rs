use modelbind_core::{IndexContext, JsonGraphBuilder, PropertyId};
use proptest::prelude::*;

/// Four nested list properties to draw pins from
fn list_chain() -> Vec<PropertyId> {
    let mut builder = JsonGraphBuilder::new("root");
    let mut parent = builder.root();
    let mut lists = Vec::new();
    for key in ["l0", "l1", "l2", "l3"] {
        parent = builder.list(parent, key).unwrap();
        lists.push(parent);
    }
    lists
}

fn build(lists: &[PropertyId], entries: &[(usize, u32)]) -> IndexContext {
    entries
        .iter()
        .fold(IndexContext::EMPTY, |ctx, (slot, index)| {
            ctx.with(lists[*slot], *index)
        })
}

fn entry_strategy() -> impl Strategy<Value = Vec<(usize, u32)>> {
    proptest::collection::vec((0..4usize, 0..8u32), 0..5)
}

// ===== CONCRETE ROUND TRIPS =====

#[test]
fn test_handles_from_the_builder_pin_independently() {
    let lists = list_chain();
    let ctx = IndexContext::EMPTY.with(lists[0], 3).with(lists[2], 0);

    assert_eq!(ctx.index_of(lists[0]), Some(3));
    assert_eq!(ctx.index_of(lists[1]), None);
    assert!(ctx.has(lists[2]));
    assert_eq!(ctx.len(), 2);
}

#[test]
fn test_sub_context_round_trip() {
    let lists = list_chain();
    let big = IndexContext::EMPTY
        .with(lists[0], 1)
        .with(lists[1], 2)
        .with(lists[2], 3);

    let sub = big.intersect(&[lists[0], lists[2]]);
    assert!(big.contains(&sub));

    let props: Vec<PropertyId> = sub.iter().map(|(property, _)| property).collect();
    assert_eq!(big.intersect(&props), sub);
}

// ===== ALGEBRAIC LAWS =====

proptest! {
    #[test]
    fn prop_contains_is_reflexive(entries in entry_strategy()) {
        let lists = list_chain();
        let ctx = build(&lists, &entries);
        prop_assert!(ctx.contains(&ctx));
    }

    #[test]
    fn prop_mutual_containment_implies_equality(
        left in entry_strategy(),
        right in entry_strategy(),
    ) {
        let lists = list_chain();
        let a = build(&lists, &left);
        let b = build(&lists, &right);
        if a.contains(&b) && b.contains(&a) {
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_empty_is_the_bottom_element(entries in entry_strategy()) {
        let lists = list_chain();
        let ctx = build(&lists, &entries);
        prop_assert!(ctx.contains(&IndexContext::EMPTY));
        prop_assert_eq!(IndexContext::EMPTY.contains(&ctx), ctx.is_empty());
    }

    #[test]
    fn prop_union_result_contains_the_argument(
        left in entry_strategy(),
        right in entry_strategy(),
    ) {
        let lists = list_chain();
        let a = build(&lists, &left);
        let b = build(&lists, &right);

        let merged = a.union(&b);
        prop_assert!(merged.contains(&b));
        for (property, _) in a.iter() {
            prop_assert!(merged.has(property));
        }
    }

    #[test]
    fn prop_intersect_recovers_the_sub_context(
        entries in entry_strategy(),
        picks in proptest::collection::vec(0..4usize, 0..4),
    ) {
        let lists = list_chain();
        let big = build(&lists, &entries);
        let props: Vec<PropertyId> = picks.iter().map(|slot| lists[*slot]).collect();

        let sub = big.intersect(&props);
        prop_assert!(big.contains(&sub));

        let props_of_sub: Vec<PropertyId> = sub.iter().map(|(property, _)| property).collect();
        prop_assert_eq!(big.intersect(&props_of_sub), sub);
    }

    #[test]
    fn prop_containment_implies_overlap(
        left in entry_strategy(),
        right in entry_strategy(),
    ) {
        let lists = list_chain();
        let a = build(&lists, &left);
        let b = build(&lists, &right);

        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        if a.contains(&b) {
            prop_assert!(a.overlaps(&b));
        }
    }

    #[test]
    fn prop_rebase_preserves_unrelated_entries(
        entries in entry_strategy(),
        slot in 0..4usize,
        base in 0..8u32,
        delta in -3i64..4i64,
    ) {
        let lists = list_chain();
        let ctx = build(&lists, &entries);
        let rebased = ctx.rebase(lists[slot], base, delta);

        prop_assert_eq!(rebased.len(), ctx.len());
        for (property, index) in ctx.iter() {
            if property != lists[slot] {
                prop_assert_eq!(rebased.index_of(property), Some(index));
            }
        }
    }
}
