//! Direct injection: hand-expanded field assignment, no discovery.
//!
//! [`DirectParams`] is the baseline; [`GenericParams`] goes through one
//! generic [`Slot`] per field to price that indirection on its own.

#![forbid(unsafe_code)]

use crate::slot::{Inject, Slot, Verify};
use crate::source::{Record, Source};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handler parameters assigned field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectParams {
    pub string: String,
    pub int: i64,
    pub optional: Option<i64>,
    pub reference: Arc<Record>,
}

impl Default for DirectParams {
    fn default() -> Self {
        Self {
            string: String::new(),
            int: 0,
            optional: None,
            reference: Record::shared(""),
        }
    }
}

impl Inject for DirectParams {
    #[inline]
    fn inject(&mut self, source: &Source) {
        self.string = source.string.clone();
        self.int = source.int;
        self.optional = source.optional;
        self.reference = Arc::clone(&source.reference);
    }
}

impl Verify for DirectParams {
    fn verify(&self, source: &Source) -> bool {
        self.string == source.string
            && self.int == source.int
            && self.optional == source.optional
            && self.reference == source.reference
    }
}

/// Handler parameters held in generic slots, injected by explicit delegation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericParams {
    pub string: Slot<String>,
    pub int: Slot<i64>,
    pub optional: Slot<Option<i64>>,
    pub reference: Slot<Arc<Record>>,
}

crate::reflect_struct!(GenericParams {
    string: Slot<String>,
    int: Slot<i64>,
    optional: Slot<Option<i64>>,
    reference: Slot<Arc<Record>>,
});

impl Inject for GenericParams {
    #[inline]
    fn inject(&mut self, source: &Source) {
        self.string.inject(source);
        self.int.inject(source);
        self.optional.inject(source);
        self.reference.inject(source);
    }
}

impl Verify for GenericParams {
    fn verify(&self, source: &Source) -> bool {
        self.string.verify(source)
            && self.int.verify(source)
            && self.optional.verify(source)
            && self.reference.verify(source)
    }
}
