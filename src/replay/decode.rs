//! Injection pass: a `Deserializer` that reads the store by cursor position.

use super::{Entry, Injector, Scalar};
use crate::error::InjectError;
use crate::source::{FieldKind, FieldValue};
use serde::de::value::{I64Deserializer, StringDeserializer};
use serde::de::{DeserializeSeed, Deserializer, IntoDeserializer, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

type Result<T> = std::result::Result<T, InjectError>;

impl Injector {
    /// Read the next slot entry, refresh it from the pending source and hand
    /// back the injected value.
    fn inject_slot(&mut self, kind: FieldKind) -> Result<FieldValue> {
        let position = self.advance()?;
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| InjectError::unsupported("replay without a pending source"))?;
        match &mut self.store[position] {
            Entry::Slot(value) if value.kind() == kind => {
                *value = pending.field(kind);
                Ok(value.clone())
            }
            _ => Err(self.confusion(position, format!("{:?} slot", kind))),
        }
    }

    /// Read the next entry as a plain value the caller's method accepts.
    fn read_fixed<'de, V: Visitor<'de>>(
        &mut self,
        accepts: impl Fn(&Scalar) -> bool,
        requested: &str,
        visitor: V,
    ) -> Result<V::Value> {
        let position = self.advance()?;
        match &self.store[position] {
            Entry::Fixed(scalar) if accepts(scalar) => {
                scalar.clone().visit(visitor).map_err(|err| err.at(position))
            }
            _ => Err(self.confusion(position, requested)),
        }
    }
}

impl Scalar {
    fn visit<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Scalar::Unit => visitor.visit_unit(),
            Scalar::Bool(v) => visitor.visit_bool(v),
            Scalar::Int(v) => visitor.visit_i64(v),
            Scalar::Uint(v) => visitor.visit_u64(v),
            Scalar::Text(v) => visitor.visit_string(v),
        }
    }
}

/// Fixed-length run of positions: struct fields, tuple members or
/// sequence elements.
struct Positional<'a> {
    injector: &'a mut Injector,
    remaining: usize,
}

impl<'de> SeqAccess<'de> for Positional<'_> {
    type Error = InjectError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.injector).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

macro_rules! fixed {
    ($($method:ident => $scalar:pat),+ $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                self.read_fixed(|scalar| matches!(scalar, $scalar), stringify!($method), visitor)
            }
        )+
    };
}

macro_rules! unsupported {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
                Err(InjectError::unsupported(stringify!($method)))
            }
        )+
    };
}

impl<'de> Deserializer<'de> for &mut Injector {
    type Error = InjectError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let position = self.advance()?;
        match self.store[position].clone() {
            Entry::Fixed(scalar) => scalar.visit(visitor).map_err(|err| err.at(position)),
            Entry::None => visitor.visit_none(),
            Entry::Some => visitor.visit_some(self),
            _ => Err(self.confusion(position, "a plain value")),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let position = self.advance()?;
        let present = match self.store[position] {
            Entry::Some => true,
            Entry::None => false,
            _ => return Err(self.confusion(position, "an option")),
        };
        if present {
            visitor.visit_some(self)
        } else {
            visitor.visit_none()
        }
    }

    fixed!(
        deserialize_bool => Scalar::Bool(_),
        deserialize_i8 => Scalar::Int(_),
        deserialize_i16 => Scalar::Int(_),
        deserialize_i32 => Scalar::Int(_),
        deserialize_i64 => Scalar::Int(_),
        deserialize_u8 => Scalar::Uint(_),
        deserialize_u16 => Scalar::Uint(_),
        deserialize_u32 => Scalar::Uint(_),
        deserialize_u64 => Scalar::Uint(_),
        deserialize_str => Scalar::Text(_),
        deserialize_string => Scalar::Text(_),
        deserialize_unit => Scalar::Unit,
    );

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match FieldKind::from_marker(name) {
            Some(kind) => {
                let value = self.inject_slot(kind)?;
                visitor.visit_newtype_struct(SlotValue(value))
            }
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let position = self.advance()?;
        let remaining = match self.store[position] {
            Entry::Seq(len) => len,
            _ => return Err(self.confusion(position, "a sequence")),
        };
        visitor.visit_seq(Positional {
            injector: self,
            remaining,
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(Positional {
            injector: self,
            remaining: len,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_tuple(len, visitor)
    }

    // Structs replay by position; the field names are never looked at.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_tuple(fields.len(), visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(InjectError::unsupported(format!("enum `{}`", name)))
    }

    unsupported!(
        deserialize_f32,
        deserialize_f64,
        deserialize_char,
        deserialize_bytes,
        deserialize_byte_buf,
        deserialize_map,
        deserialize_identifier,
        deserialize_ignored_any,
    );

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// The freshly injected value of one slot, handed to the slot's own
/// `Deserialize` impl.
struct SlotValue(FieldValue);

impl<'de> Deserializer<'de> for SlotValue {
    type Error = InjectError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.0 {
            FieldValue::Text(text) => visitor.visit_string(text),
            FieldValue::Int(int) => visitor.visit_i64(int),
            FieldValue::Optional(None) => visitor.visit_none(),
            FieldValue::Optional(Some(int)) => {
                let inner: I64Deserializer<InjectError> = int.into_deserializer();
                visitor.visit_some(inner)
            }
            FieldValue::Reference(record) => {
                let inner: StringDeserializer<InjectError> = record.0.clone().into_deserializer();
                visitor.visit_newtype_struct(inner)
            }
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}
