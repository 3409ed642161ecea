use slotfill::reflect;
use slotfill::{
    DirectParams, GenericParams, HandlerParams, Inject, LayoutCache, LiveParams, PlanCache,
    Record, Source, Verify,
};

fn expect_a(string: &str, int: i64, optional: Option<i64>, reference: &Record) {
    assert_eq!((string, int, optional), ("a", 0, Some(0)));
    assert_eq!(reference, &Record("a".into()));
}

fn expect_b(string: &str, int: i64, optional: Option<i64>, reference: &Record) {
    assert_eq!((string, int, optional), ("b", 1, None));
    assert_eq!(reference, &Record("b".into()));
}

#[test]
fn direct_copies_are_independent() {
    let template = DirectParams::default();
    let mut copy1 = template.clone();
    let mut copy2 = template.clone();
    copy1.inject(&Source::sample_a());
    copy2.inject(&Source::sample_b());

    expect_a(&copy1.string, copy1.int, copy1.optional, &copy1.reference);
    expect_b(&copy2.string, copy2.int, copy2.optional, &copy2.reference);
}

#[test]
fn generic_direct_copies_are_independent() {
    let template = GenericParams::default();
    let mut copy1 = template.clone();
    let mut copy2 = template.clone();
    copy1.inject(&Source::sample_a());
    copy2.inject(&Source::sample_b());

    expect_a(copy1.string.get(), *copy1.int.get(), *copy1.optional.get(), copy1.reference.get());
    expect_b(copy2.string.get(), *copy2.int.get(), *copy2.optional.get(), copy2.reference.get());
}

#[test]
fn reflective_copies_are_independent() {
    let template = HandlerParams::for_route(1);
    let mut copy1 = template.clone();
    let mut copy2 = template.clone();
    reflect::inject(&mut copy1, &Source::sample_a());
    reflect::inject(&mut copy2, &Source::sample_b());

    assert!(copy1.verify(&Source::sample_a()));
    assert!(copy2.verify(&Source::sample_b()));
    assert!(template.verify(&Source::new("", 0, None, Record::shared(""))));
}

#[test]
fn cached_reflective_copies_are_independent() {
    let mut cache = LayoutCache::new();
    let template = HandlerParams::for_route(1);
    let mut copy1 = template.clone();
    let mut copy2 = template.clone();
    cache.inject(&mut copy1, &Source::sample_a());
    cache.inject(&mut copy2, &Source::sample_b());

    let q1 = &copy1.query;
    let q2 = &copy2.query;
    expect_a(q1.string.get(), *q1.int.get(), *q1.optional.get(), q1.reference.get());
    expect_b(q2.string.get(), *q2.int.get(), *q2.optional.get(), q2.reference.get());
    assert!(copy1.verify(&Source::sample_a()));
    assert!(copy2.verify(&Source::sample_b()));
}

#[test]
fn replay_copies_are_independent() {
    let mut plans = PlanCache::new();
    let mut copy1 = GenericParams::default();
    let mut copy2 = GenericParams::default();
    plans.inject(&mut copy1, &Source::sample_a()).unwrap();
    plans.inject(&mut copy2, &Source::sample_b()).unwrap();

    expect_a(copy1.string.get(), *copy1.int.get(), *copy1.optional.get(), copy1.reference.get());
    expect_b(copy2.string.get(), *copy2.int.get(), *copy2.optional.get(), copy2.reference.get());
}

#[test]
fn live_copies_are_independent() {
    let mut copy1 = LiveParams::build();
    let mut copy2 = LiveParams::build();
    copy1.inject(&Source::sample_a());
    copy2.inject(&Source::sample_b());

    let t1 = copy1.target();
    let t2 = copy2.target();
    expect_a(&t1.string.get(), *t1.int.get(), *t1.optional.get(), &t1.reference.get());
    expect_b(&t2.string.get(), *t2.int.get(), *t2.optional.get(), &t2.reference.get());
}

#[test]
fn injecting_twice_matches_injecting_once() {
    let source = Source::sample_b();

    let mut once = HandlerParams::for_route(3);
    reflect::inject(&mut once, &source);
    let mut twice = once.clone();
    reflect::inject(&mut twice, &source);
    assert_eq!(once, twice);

    let mut plans = PlanCache::new();
    let first: HandlerParams = plans.apply(&source).unwrap();
    let second: HandlerParams = plans.apply(&source).unwrap();
    assert_eq!(first, second);

    let mut live = LiveParams::build();
    live.inject(&source);
    live.inject(&source);
    assert!(live.verify(&source));
}
