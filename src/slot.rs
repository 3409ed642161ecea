//! Injectable capability and the leaf slot every strategy fills.

#![forbid(unsafe_code)]

use crate::source::{Source, SourceField};
use serde::de::{Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Update in place from a source aggregate.
///
/// Leaves copy one field; composites delegate to each injectable field in
/// declaration order.
pub trait Inject {
    fn inject(&mut self, source: &Source);
}

/// Self-check used by tests and benches: does every injectable field match `source`?
pub trait Verify {
    fn verify(&self, source: &Source) -> bool;
}

/// One typed storage unit of a target structure.
///
/// The accessor is fixed when the slot is built, so injection is a single
/// indirect call with no type dispatch.
#[derive(Clone)]
pub struct Slot<T: SourceField> {
    value: T,
    accessor: fn(&Source) -> T,
}

impl<T: SourceField> Slot<T> {
    /// Create a slot holding `value` until the first injection.
    pub fn new(value: T) -> Self {
        Self {
            value,
            accessor: T::extract,
        }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T: SourceField> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::placeholder())
    }
}

impl<T: SourceField> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: SourceField> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.value).finish()
    }
}

impl<T: SourceField> Inject for Slot<T> {
    #[inline]
    fn inject(&mut self, source: &Source) {
        self.value = (self.accessor)(source);
    }
}

impl<T: SourceField> Verify for Slot<T> {
    fn verify(&self, source: &Source) -> bool {
        self.value == T::extract(source)
    }
}

// Slots travel as newtype structs under a reserved per-kind name. Ordinary
// formats see the wrapped value; the replay injector keys on the name.
impl<T: SourceField + Serialize> Serialize for Slot<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(T::KIND.marker(), &self.value)
    }
}

impl<'de, T: SourceField + Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SlotVisitor<T>(PhantomData<T>);

        impl<'de, T: SourceField + Deserialize<'de>> Visitor<'de> for SlotVisitor<T> {
            type Value = Slot<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an injectable {:?} slot", T::KIND)
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Slot<T>, D::Error>
            where
                D: Deserializer<'de>,
            {
                T::deserialize(deserializer).map(Slot::new)
            }
        }

        deserializer.deserialize_newtype_struct(T::KIND.marker(), SlotVisitor(PhantomData))
    }
}
