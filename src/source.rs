//! Source aggregate: the fixed-schema request data distributed into targets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared reference value carried by the aggregate.
///
/// Equality is by contained text; two distinct `Arc`s holding the same text
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record(pub String);

impl Record {
    /// Wrap text into a shared record.
    pub fn shared(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self(text.into()))
    }
}

/// The decoded request data. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Text field.
    pub string: String,
    /// Integer field.
    pub int: i64,
    /// Optional integer; `None` is the explicit "missing" marker.
    pub optional: Option<i64>,
    /// Shared reference field.
    pub reference: Arc<Record>,
}

impl Source {
    /// Build an aggregate from its four fields.
    pub fn new(
        string: impl Into<String>,
        int: i64,
        optional: Option<i64>,
        reference: Arc<Record>,
    ) -> Self {
        Self {
            string: string.into(),
            int,
            optional,
            reference,
        }
    }

    /// `{"a", 0, present(0), Ref("a")}`
    pub fn sample_a() -> Self {
        Self::new("a", 0, Some(0), Record::shared("a"))
    }

    /// `{"b", 1, missing, Ref("b")}`
    pub fn sample_b() -> Self {
        Self::new("b", 1, None, Record::shared("b"))
    }

    /// Look up a field by its schema tag.
    pub fn field(&self, kind: FieldKind) -> FieldValue {
        match kind {
            FieldKind::Text => FieldValue::Text(self.string.clone()),
            FieldKind::Int => FieldValue::Int(self.int),
            FieldKind::Optional => FieldValue::Optional(self.optional),
            FieldKind::Reference => FieldValue::Reference(Arc::clone(&self.reference)),
        }
    }
}

/// Schema tag for one field of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `String`
    Text,
    /// `i64`
    Int,
    /// `Option<i64>`
    Optional,
    /// `Arc<Record>`
    Reference,
}

impl FieldKind {
    /// All kinds in schema order.
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Text,
        FieldKind::Int,
        FieldKind::Optional,
        FieldKind::Reference,
    ];

    /// Reserved newtype name a slot of this kind serialises under.
    pub const fn marker(self) -> &'static str {
        match self {
            FieldKind::Text => "$slotfill::slot::text",
            FieldKind::Int => "$slotfill::slot::int",
            FieldKind::Optional => "$slotfill::slot::optional",
            FieldKind::Reference => "$slotfill::slot::reference",
        }
    }

    /// Reverse of [`FieldKind::marker`].
    pub fn from_marker(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.marker() == name)
    }

    /// Value used when a slot is built before any injection.
    pub fn placeholder(self) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Int => FieldValue::Int(0),
            FieldKind::Optional => FieldValue::Optional(None),
            FieldKind::Reference => FieldValue::Reference(Record::shared("")),
        }
    }
}

/// One value of the aggregate's schema, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `String`
    Text(String),
    /// `i64`
    Int(i64),
    /// `Option<i64>`
    Optional(Option<i64>),
    /// `Arc<Record>`
    Reference(Arc<Record>),
}

impl FieldValue {
    /// Schema tag of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Optional(_) => FieldKind::Optional,
            FieldValue::Reference(_) => FieldKind::Reference,
        }
    }
}

/// A Rust type that corresponds to exactly one field of [`Source`].
///
/// The accessor is resolved statically: a slot over `T` copies `T::extract`
/// at construction and never dispatches on type again.
pub trait SourceField: Clone + PartialEq + std::fmt::Debug + 'static {
    /// Schema tag for this type.
    const KIND: FieldKind;

    /// Read this type's field out of the aggregate.
    fn extract(source: &Source) -> Self;

    /// Value held before the first injection.
    fn placeholder() -> Self;
}

impl SourceField for String {
    const KIND: FieldKind = FieldKind::Text;

    fn extract(source: &Source) -> Self {
        source.string.clone()
    }

    fn placeholder() -> Self {
        String::new()
    }
}

impl SourceField for i64 {
    const KIND: FieldKind = FieldKind::Int;

    fn extract(source: &Source) -> Self {
        source.int
    }

    fn placeholder() -> Self {
        0
    }
}

impl SourceField for Option<i64> {
    const KIND: FieldKind = FieldKind::Optional;

    fn extract(source: &Source) -> Self {
        source.optional
    }

    fn placeholder() -> Self {
        None
    }
}

impl SourceField for Arc<Record> {
    const KIND: FieldKind = FieldKind::Reference;

    fn extract(source: &Source) -> Self {
        Arc::clone(&source.reference)
    }

    fn placeholder() -> Self {
        Record::shared("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_equality_ignores_identity() {
        let a = Record::shared("x");
        let b = Record::shared("x");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn missing_is_distinct_from_zero() {
        let a = Source::sample_a();
        let b = Source::sample_b();
        assert_eq!(a.field(FieldKind::Optional), FieldValue::Optional(Some(0)));
        assert_eq!(b.field(FieldKind::Optional), FieldValue::Optional(None));
        assert_ne!(a.field(FieldKind::Optional), b.field(FieldKind::Optional));
    }

    #[test]
    fn markers_are_unique_and_reversible() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_marker(kind.marker()), Some(kind));
            assert_eq!(kind.placeholder().kind(), kind);
        }
        assert_eq!(FieldKind::from_marker("Params"), None);
    }

    #[test]
    fn accessors_match_field_lookup() {
        let source = Source::sample_a();
        assert_eq!(FieldValue::Text(String::extract(&source)), source.field(String::KIND));
        assert_eq!(FieldValue::Int(i64::extract(&source)), source.field(i64::KIND));
        assert_eq!(
            FieldValue::Optional(<Option<i64>>::extract(&source)),
            source.field(<Option<i64>>::KIND)
        );
        assert_eq!(
            FieldValue::Reference(<Arc<Record>>::extract(&source)),
            source.field(<Arc<Record>>::KIND)
        );
    }
}
