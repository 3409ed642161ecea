//! Live registration: slots are recorded as they are built, and injection
//! walks that record instead of the target.
//!
//! A [`Registrar`] hands out [`LiveSlot`]s and remembers each one in
//! construction order. [`Registrar::finish`] seals the set against the
//! finished target, keeping only slots the target still owns, so a field
//! that was built and then replaced does not stay live.
//!
//! Targets report the slots they hold through [`LiveTarget`]; sealing checks
//! that those are exactly the live set. That walk happens once per build.
//!
//! A [`Registered`] target cannot be cloned: its slots are bound to the
//! registration that built them. Independent copies come from building again.

#![forbid(unsafe_code)]

use crate::invariant_ppt::{assert_invariant, LIVE_SET_SEALED};
use crate::slot::Verify;
use crate::source::{Record, Source, SourceField};
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

trait LiveLeaf {
    fn inject(&self, source: &Source);
}

impl<T: SourceField> LiveLeaf for RefCell<T> {
    #[inline]
    fn inject(&self, source: &Source) {
        *self.borrow_mut() = T::extract(source);
    }
}

/// Slot whose storage is shared with the registration list.
pub struct LiveSlot<T: SourceField> {
    cell: Rc<RefCell<T>>,
}

impl<T: SourceField> LiveSlot<T> {
    pub fn get(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    /// Identity of the shared storage behind this slot.
    pub fn id(&self) -> SlotId {
        SlotId(Rc::as_ptr(&self.cell) as *const () as usize)
    }
}

/// Storage identity of a live slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    fn of(leaf: &Rc<dyn LiveLeaf>) -> Self {
        SlotId(Rc::as_ptr(leaf) as *const () as usize)
    }
}

/// A target that can list the live slots it holds.
pub trait LiveTarget {
    fn live_slots(&self, visit: &mut dyn FnMut(SlotId));
}

impl<T: SourceField> fmt::Debug for LiveSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LiveSlot").field(&*self.cell.borrow()).finish()
    }
}

impl<T: SourceField> Verify for LiveSlot<T> {
    fn verify(&self, source: &Source) -> bool {
        *self.cell.borrow() == T::extract(source)
    }
}

/// Builder that records every slot it creates, in order.
#[derive(Default)]
pub struct Registrar {
    leaves: Vec<Rc<dyn LiveLeaf>>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// New slot holding the type's placeholder.
    pub fn slot<T: SourceField>(&mut self) -> LiveSlot<T> {
        self.slot_with(T::placeholder())
    }

    /// New slot holding `value` until the first injection.
    pub fn slot_with<T: SourceField>(&mut self, value: T) -> LiveSlot<T> {
        let cell = Rc::new(RefCell::new(value));
        self.leaves.push(Rc::clone(&cell) as Rc<dyn LiveLeaf>);
        LiveSlot { cell }
    }

    /// Slots constructed so far, live or not.
    pub fn constructed(&self) -> usize {
        self.leaves.len()
    }

    /// Seal the live set against `target`.
    ///
    /// A slot is live when something besides the registrar still holds it.
    /// Slots dropped during construction are discarded here.
    ///
    /// # Panics
    ///
    /// If the target holds a slot this registrar did not build, or a live
    /// slot is held outside the target.
    pub fn finish<T: LiveTarget>(self, target: T) -> Registered<T> {
        let constructed = self.leaves.len();
        let leaves: Vec<_> = self
            .leaves
            .into_iter()
            .filter(|leaf| Rc::strong_count(leaf) > 1)
            .collect();
        let discarded = constructed - leaves.len();

        let live: HashSet<SlotId> = leaves.iter().map(SlotId::of).collect();
        let mut held = Vec::with_capacity(live.len());
        target.live_slots(&mut |id| held.push(id));
        assert_invariant(
            LIVE_SET_SEALED,
            held.len() == live.len() && held.iter().all(|id| live.contains(id)),
            "Live set is exactly the slots held by the target",
            Some(std::any::type_name::<T>()),
        );
        if discarded > 0 {
            tracing::debug!(
                target_type = std::any::type_name::<T>(),
                constructed,
                discarded,
                "overwritten slots dropped from live set"
            );
        }

        Registered {
            target,
            leaves,
            discarded,
        }
    }
}

/// A target together with its ordered live slots.
pub struct Registered<T> {
    target: T,
    leaves: Vec<Rc<dyn LiveLeaf>>,
    discarded: usize,
}

impl<T> Registered<T> {
    /// Build a target through a fresh registrar.
    pub fn build(construct: impl FnOnce(&mut Registrar) -> T) -> Self
    where
        T: LiveTarget,
    {
        let mut registrar = Registrar::new();
        let target = construct(&mut registrar);
        registrar.finish(target)
    }

    /// Inject every live slot; the target itself is not traversed.
    pub fn inject(&mut self, source: &Source) {
        for leaf in &self.leaves {
            leaf.inject(source);
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn live_count(&self) -> usize {
        self.leaves.len()
    }

    /// Slots built during construction that the target no longer holds.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl<T: Verify> Verify for Registered<T> {
    fn verify(&self, source: &Source) -> bool {
        self.target.verify(source)
    }
}

/// Handler parameters built through a [`Registrar`].
#[derive(Debug)]
pub struct LiveParams {
    pub string: LiveSlot<String>,
    pub int: LiveSlot<i64>,
    pub optional: LiveSlot<Option<i64>>,
    pub reference: LiveSlot<Arc<Record>>,
}

impl LiveParams {
    pub fn register(registrar: &mut Registrar) -> Self {
        Self {
            string: registrar.slot(),
            int: registrar.slot(),
            optional: registrar.slot(),
            reference: registrar.slot(),
        }
    }

    pub fn build() -> Registered<Self> {
        Registered::build(Self::register)
    }
}

impl LiveTarget for LiveParams {
    fn live_slots(&self, visit: &mut dyn FnMut(SlotId)) {
        visit(self.string.id());
        visit(self.int.id());
        visit(self.optional.id());
        visit(self.reference.id());
    }
}

impl Verify for LiveParams {
    fn verify(&self, source: &Source) -> bool {
        self.string.verify(source)
            && self.int.verify(source)
            && self.optional.verify(source)
            && self.reference.verify(source)
    }
}
