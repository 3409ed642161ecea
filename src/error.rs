//! Error taxonomy for the injection strategies.

use serde::de::{Expected, Unexpected};
use thiserror::Error;

/// Errors raised while discovering or injecting a target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InjectError {
    /// A field's declared type has no counterpart in the source aggregate.
    #[error("schema mismatch on `{field}`: expected {expected}")]
    SchemaMismatch {
        /// Field name as reported by introspection.
        field: &'static str,
        /// Type the field declares.
        expected: &'static str,
    },
    /// The positional protocol does not model this construct.
    #[error("unsupported traversal operation: {0}")]
    Unsupported(String),
    /// No field map could be obtained for a type.
    #[error("cannot introspect `{type_name}`: {reason}")]
    Introspection {
        /// Type being introspected.
        type_name: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// A replayed entry disagrees with the type being decoded.
    #[error("replay type confusion at position {position}: recorded {recorded}, requested {requested}")]
    TypeConfusion {
        /// Cursor position of the failing read.
        position: usize,
        /// Entry stored during discovery.
        recorded: String,
        /// What the decoder asked for.
        requested: String,
    },
}

impl InjectError {
    pub(crate) fn unsupported(what: impl std::fmt::Display) -> Self {
        InjectError::Unsupported(what.to_string())
    }

    /// Pin a type confusion raised by a visitor to the store position it read.
    pub(crate) fn at(self, position: usize) -> Self {
        match self {
            InjectError::TypeConfusion {
                recorded, requested, ..
            } => InjectError::TypeConfusion {
                position,
                recorded,
                requested,
            },
            other => other,
        }
    }
}

impl serde::ser::Error for InjectError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        InjectError::unsupported(msg)
    }
}

// Shape complaints from visitors mean the store disagrees with the type being
// decoded. Their position is filled in by the reader that raised them.
impl serde::de::Error for InjectError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        InjectError::unsupported(msg)
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        InjectError::TypeConfusion {
            position: 0,
            recorded: unexp.to_string(),
            requested: exp.to_string(),
        }
    }

    fn invalid_value(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        Self::invalid_type(unexp, exp)
    }

    fn invalid_length(len: usize, exp: &dyn Expected) -> Self {
        InjectError::TypeConfusion {
            position: 0,
            recorded: format!("{} elements", len),
            requested: exp.to_string(),
        }
    }
}
