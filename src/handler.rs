//! Handler parameter targets shared by the reflective and replay strategies.

use crate::direct::GenericParams;
use crate::slot::{Inject, Slot, Verify};
use crate::source::Source;
use serde::{Deserialize, Serialize};

/// Nested parameter set: a plain route id that injection must leave alone, a
/// nested query block and two top-level paging slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerParams {
    pub route: u32,
    pub query: GenericParams,
    pub page: Slot<i64>,
    pub cursor: Slot<Option<i64>>,
}

crate::reflect_struct!(HandlerParams {
    route: u32,
    query: GenericParams,
    page: Slot<i64>,
    cursor: Slot<Option<i64>>,
});

impl HandlerParams {
    pub fn for_route(route: u32) -> Self {
        Self {
            route,
            ..Self::default()
        }
    }
}

impl Inject for HandlerParams {
    fn inject(&mut self, source: &Source) {
        self.query.inject(source);
        self.page.inject(source);
        self.cursor.inject(source);
    }
}

impl Verify for HandlerParams {
    fn verify(&self, source: &Source) -> bool {
        self.query.verify(source) && self.page.verify(source) && self.cursor.verify(source)
    }
}
