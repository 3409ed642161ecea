use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use slotfill::replay::Entry;
use slotfill::{FieldKind, InjectError, Record, ReplayPlan, Slot, Source};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Header {
    key: Slot<String>,
    weight: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Interleaved {
    first: Slot<i64>,
    tag: String,
    headers: Vec<Header>,
    limit: Option<Slot<Option<i64>>>,
    owner: Slot<Arc<Record>>,
    flags: (bool, Slot<i64>),
}

fn template() -> Interleaved {
    Interleaved {
        tag: "v1".into(),
        headers: vec![
            Header {
                weight: 1,
                ..Header::default()
            },
            Header {
                weight: 2,
                ..Header::default()
            },
        ],
        limit: Some(Slot::default()),
        ..Interleaved::default()
    }
}

fn slot_kinds(plan: &ReplayPlan<Interleaved>) -> Vec<FieldKind> {
    plan.injector()
        .entries()
        .iter()
        .filter_map(|entry| match entry {
            Entry::Slot(value) => Some(value.kind()),
            _ => None,
        })
        .collect()
}

#[test]
fn discovery_follows_declaration_order() {
    let plan = ReplayPlan::discover_from(&template()).unwrap();
    assert_eq!(
        slot_kinds(&plan),
        [
            FieldKind::Int,
            FieldKind::Text,
            FieldKind::Text,
            FieldKind::Optional,
            FieldKind::Reference,
            FieldKind::Int,
        ]
    );
}

proptest! {
    #[test]
    fn every_replay_reproduces_discovery_order(
        rounds in proptest::collection::vec(
            (any::<i64>(), proptest::option::of(any::<i64>())),
            1..8,
        )
    ) {
        let mut plan = ReplayPlan::discover_from(&template()).unwrap();
        let discovered = slot_kinds(&plan);

        for (int, optional) in rounds {
            let source = Source::new("k", int, optional, Record::shared("o"));
            let rebuilt = plan.apply(&source).unwrap();

            prop_assert_eq!(slot_kinds(&plan), discovered.clone());
            prop_assert_eq!(plan.injector().cursor(), plan.injector().entries().len());
            prop_assert_eq!(*rebuilt.first.get(), int);
            prop_assert_eq!(*rebuilt.flags.1.get(), int);
            prop_assert_eq!(rebuilt.limit.as_ref().map(|slot| *slot.get()), Some(optional));
            prop_assert_eq!(rebuilt.tag.as_str(), "v1");
            prop_assert_eq!(
                rebuilt
                    .headers
                    .iter()
                    .map(|h| (h.key.get().as_str(), h.weight))
                    .collect::<Vec<_>>(),
                vec![("k", 1), ("k", 2)]
            );
            prop_assert_eq!(&rebuilt.owner.get().0, "o");
        }
    }
}

#[test]
fn unsupported_constructs_are_catchable() {
    #[derive(Default, Serialize, Deserialize)]
    enum Mode {
        #[default]
        Fast,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct WithMode {
        mode: Mode,
        name: Slot<String>,
    }

    match ReplayPlan::<WithMode>::discover() {
        Err(InjectError::Unsupported(reason)) => assert!(reason.contains("Mode")),
        other => panic!("expected unsupported, got {:?}", other.map(|_| ())),
    }
    assert!(ReplayPlan::<()>::discover().is_err());
}
