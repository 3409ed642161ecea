//! Replay module: record a target's slot order once, then rebuild targets
//! positionally from that record on every injection.
//!
//! Discovery serialises a placeholder instance through an [`Injector`]; each
//! slot, scalar and container shape lands in the injector's backing store in
//! declaration order. Injection deserialises through the same injector, which
//! hands back store entries by cursor position and refreshes every slot entry
//! from the pending source before returning it. Field names are never
//! consulted after discovery.

mod decode;
mod encode;

use crate::error::InjectError;
use crate::invariant_ppt::{
    assert_invariant, invariant_violated, PLAN_DISCOVERED, REPLAY_COMPLETE, REPLAY_ORDER,
};
use crate::source::{FieldValue, Source};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::marker::PhantomData;

pub use encode::Compound;

/// A plain value recorded during discovery and replayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Unit,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
}

/// One position in the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Injectable slot; refreshed from the pending source on every read.
    Slot(FieldValue),
    /// Non-injectable value.
    Fixed(Scalar),
    /// Unkeyed container holding this many elements.
    Seq(usize),
    /// Present optional; its contents follow.
    Some,
    /// Absent optional.
    None,
}

impl Entry {
    fn describe(&self) -> String {
        match self {
            Entry::Slot(value) => format!("{:?} slot", value.kind()),
            Entry::Fixed(scalar) => format!("fixed {:?}", scalar),
            Entry::Seq(len) => format!("sequence of {}", len),
            Entry::Some => "present option".into(),
            Entry::None => "absent option".into(),
        }
    }
}

/// Shared context for both passes: the pending source, the backing store and
/// the read cursor.
#[derive(Debug, Default)]
pub struct Injector {
    pending: Option<Source>,
    store: Vec<Entry>,
    cursor: usize,
    depth: usize,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing store in recorded order.
    pub fn entries(&self) -> &[Entry] {
        &self.store
    }

    /// Next position the decoder will read.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of injectable slots recorded.
    pub fn slot_count(&self) -> usize {
        self.store
            .iter()
            .filter(|entry| matches!(entry, Entry::Slot(_)))
            .count()
    }

    fn begin(&mut self, source: &Source) {
        self.pending = Some(source.clone());
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.pending = None;
    }

    fn record(&mut self, entry: Entry) -> usize {
        self.store.push(entry);
        self.store.len() - 1
    }

    /// Claim the entry under the cursor.
    fn advance(&mut self) -> Result<usize, InjectError> {
        let position = self.cursor;
        if position >= self.store.len() {
            return Err(InjectError::unsupported(format!(
                "read past the recorded layout at position {}",
                position
            )));
        }
        self.cursor += 1;
        Ok(position)
    }

    /// Same entry shapes position by position; plain values may differ.
    fn same_layout(&self, other: &Injector) -> bool {
        self.store.len() == other.store.len()
            && self.store.iter().zip(&other.store).all(|pair| match pair {
                (Entry::Slot(a), Entry::Slot(b)) => a.kind() == b.kind(),
                (Entry::Fixed(_), Entry::Fixed(_)) => true,
                (Entry::Seq(a), Entry::Seq(b)) => a == b,
                (Entry::Some, Entry::Some) | (Entry::None, Entry::None) => true,
                _ => false,
            })
    }

    /// Exchange plain entries with a store of the same layout.
    fn swap_fixed(&mut self, other: &mut Injector) {
        for (mine, theirs) in self.store.iter_mut().zip(&mut other.store) {
            if let (Entry::Fixed(mine), Entry::Fixed(theirs)) = (mine, theirs) {
                std::mem::swap(mine, theirs);
            }
        }
    }

    fn confusion(&self, position: usize, requested: impl Into<String>) -> InjectError {
        InjectError::TypeConfusion {
            position,
            recorded: self.store[position].describe(),
            requested: requested.into(),
        }
    }
}

/// Types the replay strategy can discover: serde round-trippable with a
/// placeholder instance.
pub trait Replayable: Serialize + DeserializeOwned + Default + 'static {}

impl<T: Serialize + DeserializeOwned + Default + 'static> Replayable for T {}

/// Discovered slot order for `T`.
#[derive(Debug)]
pub struct ReplayPlan<T> {
    injector: Injector,
    _target: PhantomData<fn() -> T>,
}

impl<T: Replayable> ReplayPlan<T> {
    /// Discover the layout from a placeholder instance.
    pub fn discover() -> Result<Self, InjectError> {
        Self::discover_from(&T::default())
    }

    /// Discover the layout from a given disposable instance.
    pub fn discover_from(instance: &T) -> Result<Self, InjectError> {
        let mut injector = Injector::new();
        instance.serialize(&mut injector)?;

        assert_invariant(
            PLAN_DISCOVERED,
            injector.depth == 0 && injector.cursor == 0,
            "Discovery closed every container and left the cursor at zero",
            Some(type_name::<T>()),
        );
        tracing::debug!(
            target_type = type_name::<T>(),
            entries = injector.store.len(),
            slots = injector.slot_count(),
            "replay plan discovered"
        );

        Ok(Self {
            injector,
            _target: PhantomData,
        })
    }

    /// Build a fresh `T` populated from `source`.
    pub fn apply(&mut self, source: &Source) -> Result<T, InjectError> {
        self.injector.begin(source);
        let decoded = T::deserialize(&mut self.injector);
        self.injector.end();

        let target = match decoded {
            Err(err @ InjectError::TypeConfusion { .. }) => {
                invariant_violated(REPLAY_ORDER, &err.to_string(), Some(type_name::<T>()))
            }
            other => other?,
        };
        if self.injector.cursor != self.injector.store.len() {
            invariant_violated(
                REPLAY_COMPLETE,
                "Decode stopped before the end of the recorded layout",
                Some(type_name::<T>()),
            );
        }
        Ok(target)
    }

    /// Refresh every slot of `target` from `source`, keeping its own plain
    /// values.
    ///
    /// The target is walked once to read its plain values, which stand in for
    /// the discovery instance's during this decode only. A target whose shape
    /// differs from the plan (another sequence length, another option
    /// presence) is `Unsupported`.
    pub fn inject(&mut self, target: &mut T, source: &Source) -> Result<(), InjectError> {
        let mut own = Injector::new();
        target.serialize(&mut own)?;
        if !self.injector.same_layout(&own) {
            return Err(InjectError::unsupported(format!(
                "`{}` instance does not match its discovered layout",
                type_name::<T>()
            )));
        }

        self.injector.swap_fixed(&mut own);
        let applied = self.apply(source);
        self.injector.swap_fixed(&mut own);

        *target = applied?;
        Ok(())
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }
}

/// Caller-owned registry of replay plans, one per target type, discovered on
/// first use.
#[derive(Default)]
pub struct PlanCache {
    plans: HashMap<TypeId, Box<dyn Any>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of discovered plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Plan for `T`, discovering it if needed.
    pub fn plan<T: Replayable>(&mut self) -> Result<&mut ReplayPlan<T>, InjectError> {
        let plan = match self.plans.entry(TypeId::of::<T>()) {
            MapEntry::Occupied(occupied) => occupied.into_mut(),
            MapEntry::Vacant(vacant) => vacant.insert(Box::new(ReplayPlan::<T>::discover()?)),
        };
        plan.downcast_mut::<ReplayPlan<T>>()
            .ok_or_else(|| InjectError::Introspection {
                type_name: type_name::<T>(),
                reason: "cached plan belongs to another type".into(),
            })
    }

    pub fn apply<T: Replayable>(&mut self, source: &Source) -> Result<T, InjectError> {
        self.plan::<T>()?.apply(source)
    }

    pub fn inject<T: Replayable>(
        &mut self,
        target: &mut T,
        source: &Source,
    ) -> Result<(), InjectError> {
        self.plan::<T>()?.inject(target, source)
    }
}
