use proptest::prelude::*;
use slotfill::reflect;
use slotfill::{HandlerParams, Inject, LayoutCache, PlanCache, Record, Source, Verify};

fn source() -> impl Strategy<Value = Source> {
    (
        ".{0,12}",
        any::<i64>(),
        proptest::option::of(any::<i64>()),
        "[a-z]{0,8}",
    )
        .prop_map(|(string, int, optional, reference)| {
            Source::new(string, int, optional, Record::shared(reference))
        })
}

proptest! {
    #[test]
    fn cached_matches_uncached(
        history in proptest::collection::vec(source(), 0..5),
        last in source()
    ) {
        let mut cache = LayoutCache::new();
        for earlier in &history {
            let mut warmup = HandlerParams::for_route(0);
            cache.inject(&mut warmup, earlier);
        }

        let mut cached = HandlerParams::for_route(11);
        cache.inject(&mut cached, &last);
        let mut uncached = HandlerParams::for_route(11);
        reflect::inject(&mut uncached, &last);

        prop_assert_eq!(&cached, &uncached);
        prop_assert!(cached.verify(&last));
        prop_assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replay_matches_delegation(
        history in proptest::collection::vec(source(), 0..5),
        last in source()
    ) {
        let mut plans = PlanCache::new();
        for earlier in &history {
            let _: HandlerParams = plans.apply(earlier).unwrap();
        }

        let replayed: HandlerParams = plans.apply(&last).unwrap();
        let mut delegated = HandlerParams::default();
        delegated.inject(&last);

        prop_assert_eq!(&replayed, &delegated);
        prop_assert_eq!(plans.len(), 1);
    }

    #[test]
    fn replay_inject_matches_reflection(route in any::<u32>(), last in source()) {
        let mut plans = PlanCache::new();
        let mut replayed = HandlerParams::for_route(route);
        plans.inject(&mut replayed, &last).unwrap();
        let mut reflected = HandlerParams::for_route(route);
        reflect::inject(&mut reflected, &last);

        prop_assert_eq!(replayed.route, route);
        prop_assert_eq!(&replayed, &reflected);
    }
}

#[test]
fn missing_optional_is_distinct_from_present_zero() {
    let present = Source::new("x", 0, Some(0), Record::shared("x"));
    let missing = Source::new("x", 0, None, Record::shared("x"));

    let mut cache = LayoutCache::new();
    let mut with_zero = HandlerParams::default();
    let mut without = HandlerParams::default();
    cache.inject(&mut with_zero, &present);
    cache.inject(&mut without, &missing);

    assert_eq!(*with_zero.cursor.get(), Some(0));
    assert_eq!(*without.cursor.get(), None);
    assert_ne!(with_zero, without);
    assert!(!without.verify(&present));
}
