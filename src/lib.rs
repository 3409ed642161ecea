//! Strategies for injecting decoded request data into the typed slots of a
//! handler's parameter structure.
//!
//! | Strategy | Entry point | Per-call work |
//! |---|---|---|
//! | Direct | [`Inject`] on [`DirectParams`] | field assignments |
//! | Generic direct | [`Inject`] on [`GenericParams`] | one slot call per field |
//! | Reflective | [`reflect::inject`] | introspection + copy/write-back |
//! | Reflective, cached | [`LayoutCache::inject`] | copy/write-back on cached subset |
//! | Replay | [`ReplayPlan::apply`] / [`PlanCache`] | positional rebuild |
//! | Live registration | [`Registered::inject`] | walk of the live slot list |

pub mod direct;
pub mod error;
pub mod handler;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod live;
pub mod reflect;
pub mod replay;
pub mod slot;
pub mod source;

pub use direct::{DirectParams, GenericParams};
pub use error::InjectError;
pub use handler::HandlerParams;
pub use live::{LiveParams, LiveSlot, LiveTarget, Registered, Registrar, SlotId};
pub use reflect::{FieldDescriptor, LayoutCache, Reflect};
pub use replay::{Injector, PlanCache, ReplayPlan, Replayable};
pub use slot::{Inject, Slot, Verify};
pub use source::{FieldKind, FieldValue, Record, Source, SourceField};
