//! Reflective injection: discover a structure's fields at runtime and recurse
//! into the injectable ones.
//!
//! Two flavours share the same algorithm:
//! - [`inject`] introspects the target on every call.
//! - [`LayoutCache`] introspects once per type and replays the filtered
//!   field subset afterwards.
//!
//! Structures opt in with [`reflect_struct!`](crate::reflect_struct).
//!
//! Both flavours treat a schema mismatch or a type without a field map as a
//! broken target declaration and panic through the invariant checks.

#![forbid(unsafe_code)]

use crate::error::InjectError;
use crate::invariant_ppt::{
    assert_invariant, invariant_violated, INTROSPECTABLE, LAYOUT_DISCOVERED, SCHEMA_MATCH,
    SCRATCH_CLEAR,
};
use crate::slot::{Inject, Slot};
use crate::source::{Source, SourceField};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// One field as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Declaration position.
    pub index: usize,
    /// Field name.
    pub name: &'static str,
    /// Declared type.
    pub type_name: &'static str,
}

/// Runtime view of a value's fields.
pub trait Reflect: 'static {
    /// Concrete type name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Key for type-level caches.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Ordered field list. Empty for scalars and leaves.
    fn describe(&self) -> Result<Vec<FieldDescriptor>, InjectError> {
        Ok(Vec::new())
    }

    /// Copy of the field at `index`.
    fn field(&self, _index: usize) -> Option<Box<dyn Reflect>> {
        None
    }

    /// Write a field back by position.
    fn set_field(&mut self, index: usize, _value: Box<dyn Reflect>) -> Result<(), InjectError> {
        Err(InjectError::Introspection {
            type_name: self.type_name(),
            reason: format!("no field at position {}", index),
        })
    }

    /// Leaf injection capability, if this value is a slot.
    fn as_inject(&mut self) -> Option<&mut dyn Inject> {
        None
    }

    /// True for structures whose fields can be described.
    fn is_composite(&self) -> bool {
        false
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: SourceField> Reflect for Slot<T> {
    fn as_inject(&mut self) -> Option<&mut dyn Inject> {
        Some(self)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

macro_rules! reflect_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn into_any(self: Box<Self>) -> Box<dyn Any> {
                    self
                }
            }
        )+
    };
}

reflect_scalar!(bool, u8, u16, u32, u64, usize, i8, i16, i32, i64, f32, f64, String);

/// Implement [`Reflect`] for a struct with named fields.
///
/// Every listed field type must be `Reflect + Clone`. Fields are reported in
/// the order given, which must be declaration order.
///
/// ```ignore
/// slotfill::reflect_struct!(Query { name: Slot<String>, page: Slot<i64> });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($name:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::reflect::Reflect for $name {
            fn describe(
                &self,
            ) -> ::std::result::Result<
                ::std::vec::Vec<$crate::reflect::FieldDescriptor>,
                $crate::error::InjectError,
            > {
                let fields: &[(&'static str, &'static str)] =
                    &[$((stringify!($field), ::std::any::type_name::<$fty>())),+];
                Ok(fields
                    .iter()
                    .enumerate()
                    .map(|(index, &(name, type_name))| $crate::reflect::FieldDescriptor {
                        index,
                        name,
                        type_name,
                    })
                    .collect())
            }

            fn field(
                &self,
                index: usize,
            ) -> ::std::option::Option<::std::boxed::Box<dyn $crate::reflect::Reflect>> {
                let mut position = 0usize;
                $(
                    if index == position {
                        let value = ::std::clone::Clone::clone(&self.$field);
                        return Some(::std::boxed::Box::new(value));
                    }
                    position += 1;
                )+
                let _ = position;
                None
            }

            fn set_field(
                &mut self,
                index: usize,
                value: ::std::boxed::Box<dyn $crate::reflect::Reflect>,
            ) -> ::std::result::Result<(), $crate::error::InjectError> {
                let mut position = 0usize;
                $(
                    if index == position {
                        self.$field = *value.into_any().downcast::<$fty>().map_err(|_| {
                            $crate::error::InjectError::SchemaMismatch {
                                field: stringify!($field),
                                expected: ::std::any::type_name::<$fty>(),
                            }
                        })?;
                        return Ok(());
                    }
                    position += 1;
                )+
                let _ = position;
                Err($crate::error::InjectError::Introspection {
                    type_name: ::std::any::type_name::<Self>(),
                    reason: format!("no field at position {}", index),
                })
            }

            fn is_composite(&self) -> bool {
                true
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
}

fn require_composite(target: &dyn Reflect) -> Result<(), InjectError> {
    if target.is_composite() {
        Ok(())
    } else {
        Err(InjectError::Introspection {
            type_name: target.type_name(),
            reason: "not a structure".into(),
        })
    }
}

fn missing_field(target: &dyn Reflect, descriptor: &FieldDescriptor) -> InjectError {
    InjectError::Introspection {
        type_name: target.type_name(),
        reason: format!("field `{}` not readable", descriptor.name),
    }
}

/// Abort on a failure the reflective strategies cannot recover from.
fn fatal(err: InjectError, target: &dyn Reflect) -> ! {
    let id = match err {
        InjectError::SchemaMismatch { .. } => SCHEMA_MATCH,
        _ => INTROSPECTABLE,
    };
    invariant_violated(id, &err.to_string(), Some(target.type_name()))
}

/// Inject by introspecting `target` from scratch.
///
/// Every call re-reads the layout, copies each field out, injects the
/// injectable ones (recursing into nested structures) and writes them back.
///
/// # Panics
///
/// If `target` is not a reflected structure, or a write-back is rejected.
pub fn inject(target: &mut dyn Reflect, source: &Source) {
    if let Err(err) = inject_fields(target, source) {
        fatal(err, target)
    }
}

fn inject_fields(target: &mut dyn Reflect, source: &Source) -> Result<(), InjectError> {
    require_composite(target)?;
    let layout = target.describe()?;
    for descriptor in &layout {
        let mut value = target
            .field(descriptor.index)
            .ok_or_else(|| missing_field(&*target, descriptor))?;
        if let Some(leaf) = value.as_inject() {
            leaf.inject(source);
        } else if value.is_composite() {
            inject_fields(&mut *value, source)?;
        } else {
            continue;
        }
        target.set_field(descriptor.index, value)?;
    }
    Ok(())
}

/// Cached layout of one structure type.
pub struct CacheEntry {
    layout: Vec<FieldDescriptor>,
    /// Injectable subset with a scratch value per field. Scratch is only
    /// populated between read and write-back inside a single call.
    injectable: Vec<(FieldDescriptor, Option<Box<dyn Reflect>>)>,
}

impl CacheEntry {
    fn discover(target: &dyn Reflect) -> Result<Self, InjectError> {
        require_composite(target)?;
        let layout = target.describe()?;
        assert_invariant(
            LAYOUT_DISCOVERED,
            layout
                .iter()
                .enumerate()
                .all(|(position, descriptor)| descriptor.index == position),
            "Field descriptors are indexed by declaration position",
            Some(target.type_name()),
        );
        let mut injectable = Vec::new();
        for descriptor in &layout {
            let mut value = target
                .field(descriptor.index)
                .ok_or_else(|| missing_field(&*target, descriptor))?;
            if value.as_inject().is_some() || value.is_composite() {
                injectable.push((*descriptor, None));
            }
        }
        tracing::debug!(
            target_type = target.type_name(),
            fields = layout.len(),
            injectable = injectable.len(),
            "layout cached"
        );
        Ok(Self { layout, injectable })
    }

    /// Full field list, in declaration order.
    pub fn layout(&self) -> &[FieldDescriptor] {
        &self.layout
    }

    /// Fields that take part in injection.
    pub fn injectable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.injectable.iter().map(|(descriptor, _)| descriptor)
    }
}

/// Caller-owned registry of per-type layouts.
///
/// Entries are created on the first injection of a type and never
/// invalidated: a layout is a property of the type, not the instance.
#[derive(Default)]
pub struct LayoutCache {
    entries: HashMap<TypeId, CacheEntry>,
}

impl LayoutCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of types discovered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached entry for `T`, if it has been injected before.
    pub fn entry<T: Reflect>(&self) -> Option<&CacheEntry> {
        self.entries.get(&TypeId::of::<T>())
    }

    /// Inject using the cached layout of `target`'s type.
    ///
    /// # Panics
    ///
    /// On the same failures as [`inject`](crate::reflect::inject).
    pub fn inject(&mut self, target: &mut dyn Reflect, source: &Source) {
        if let Err(err) = self.try_inject(target, source) {
            fatal(err, target)
        }
    }

    fn try_inject(&mut self, target: &mut dyn Reflect, source: &Source) -> Result<(), InjectError> {
        let key = target.type_key();
        // The entry is detached while in use so nested types can be cached
        // through the same registry.
        let mut entry = match self.entries.remove(&key) {
            Some(entry) => entry,
            None => CacheEntry::discover(target)?,
        };
        let result = self.inject_cached(&mut entry, target, source);
        if result.is_err() {
            for (_, scratch) in &mut entry.injectable {
                *scratch = None;
            }
        }
        self.entries.insert(key, entry);
        result
    }

    fn inject_cached(
        &mut self,
        entry: &mut CacheEntry,
        target: &mut dyn Reflect,
        source: &Source,
    ) -> Result<(), InjectError> {
        for (descriptor, scratch) in &mut entry.injectable {
            if scratch.is_some() {
                invariant_violated(
                    SCRATCH_CLEAR,
                    "Scratch value left over from a previous injection",
                    Some(descriptor.name),
                );
            }
            let value = scratch.insert(
                target
                    .field(descriptor.index)
                    .ok_or_else(|| missing_field(&*target, descriptor))?,
            );
            if let Some(leaf) = value.as_inject() {
                leaf.inject(source);
            } else {
                self.try_inject(&mut **value, source)?;
            }
            if let Some(value) = scratch.take() {
                target.set_field(descriptor.index, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Record;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Inner {
        optional: Slot<Option<i64>>,
        reference: Slot<Arc<Record>>,
    }

    crate::reflect_struct!(Inner {
        optional: Slot<Option<i64>>,
        reference: Slot<Arc<Record>>,
    });

    #[derive(Clone, Default)]
    struct Outer {
        tag: u32,
        name: Slot<String>,
        inner: Inner,
    }

    crate::reflect_struct!(Outer {
        tag: u32,
        name: Slot<String>,
        inner: Inner,
    });

    #[test]
    fn describe_reports_declaration_order() {
        let layout = Outer::default().describe().unwrap();
        let names: Vec<_> = layout.iter().map(|d| d.name).collect();
        assert_eq!(names, ["tag", "name", "inner"]);
        assert_eq!(layout[1].index, 1);
    }

    #[test]
    fn uncached_injects_nested_fields() {
        let mut target = Outer {
            tag: 9,
            ..Outer::default()
        };
        inject(&mut target, &Source::sample_a());
        assert_eq!(target.tag, 9);
        assert_eq!(target.name.get(), "a");
        assert_eq!(*target.inner.optional.get(), Some(0));
        assert_eq!(target.inner.reference.get().0, "a");
    }

    #[test]
    #[should_panic(expected = "cannot introspect `u32`: not a structure")]
    fn scalar_target_is_fatal() {
        inject(&mut 5u32, &Source::sample_a());
    }

    #[test]
    #[should_panic(expected = "cannot introspect `u32`: not a structure")]
    fn scalar_target_is_fatal_when_cached() {
        LayoutCache::new().inject(&mut 5u32, &Source::sample_a());
    }

    /// Reports its slot as `Slot<String>` but stores a `Slot<i64>`.
    #[derive(Default)]
    struct Skewed {
        count: Slot<i64>,
    }

    impl Reflect for Skewed {
        fn describe(&self) -> Result<Vec<FieldDescriptor>, InjectError> {
            Ok(vec![FieldDescriptor {
                index: 0,
                name: "count",
                type_name: "Slot<i64>",
            }])
        }

        fn field(&self, index: usize) -> Option<Box<dyn Reflect>> {
            (index == 0).then(|| Box::new(Slot::<String>::default()) as Box<dyn Reflect>)
        }

        fn set_field(&mut self, _index: usize, value: Box<dyn Reflect>) -> Result<(), InjectError> {
            self.count = *value.into_any().downcast::<Slot<i64>>().map_err(|_| {
                InjectError::SchemaMismatch {
                    field: "count",
                    expected: "Slot<i64>",
                }
            })?;
            Ok(())
        }

        fn is_composite(&self) -> bool {
            true
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    #[test]
    #[should_panic(expected = "schema mismatch on `count`")]
    fn schema_mismatch_is_fatal() {
        inject(&mut Skewed::default(), &Source::sample_a());
    }

    #[test]
    #[should_panic(expected = "schema mismatch on `count`")]
    fn schema_mismatch_is_fatal_when_cached() {
        LayoutCache::new().inject(&mut Skewed::default(), &Source::sample_a());
    }

    /// Describes its only field at the wrong position.
    #[derive(Default)]
    struct Misnumbered {
        name: Slot<String>,
    }

    impl Reflect for Misnumbered {
        fn describe(&self) -> Result<Vec<FieldDescriptor>, InjectError> {
            Ok(vec![FieldDescriptor {
                index: 3,
                name: "name",
                type_name: "Slot<String>",
            }])
        }

        fn field(&self, _index: usize) -> Option<Box<dyn Reflect>> {
            Some(Box::new(self.name.clone()))
        }

        fn is_composite(&self) -> bool {
            true
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    #[test]
    #[should_panic(expected = "indexed by declaration position")]
    fn cache_rejects_misnumbered_layout() {
        LayoutCache::new().inject(&mut Misnumbered::default(), &Source::sample_a());
    }

    #[test]
    fn write_back_rejects_wrong_type() {
        let mut target = Outer::default();
        let err = target.set_field(1, Box::new(3u32)).unwrap_err();
        assert_eq!(
            err,
            InjectError::SchemaMismatch {
                field: "name",
                expected: std::any::type_name::<Slot<String>>(),
            }
        );
        assert!(target.set_field(7, Box::new(3u32)).is_err());
    }

    #[test]
    fn cache_discovers_each_type_once() {
        let mut cache = LayoutCache::new();
        let mut target = Outer::default();
        cache.inject(&mut target, &Source::sample_a());
        cache.inject(&mut target, &Source::sample_b());

        assert_eq!(cache.len(), 2);
        let outer = cache.entry::<Outer>().unwrap();
        assert_eq!(outer.layout().len(), 3);
        let injectable: Vec<_> = outer.injectable().map(|d| d.name).collect();
        assert_eq!(injectable, ["name", "inner"]);

        assert_eq!(target.name.get(), "b");
        assert_eq!(*target.inner.optional.get(), None);
    }

    #[test]
    fn cache_leaves_no_scratch_behind() {
        let mut cache = LayoutCache::new();
        let mut target = Outer::default();
        cache.inject(&mut target, &Source::sample_a());
        for entry in cache.entries.values() {
            assert!(entry.injectable.iter().all(|(_, scratch)| scratch.is_none()));
        }
    }
}
