//! Discovery pass: a `Serializer` that records positions instead of bytes.

use super::{Entry, Injector, Scalar};
use crate::error::InjectError;
use crate::source::FieldKind;
use serde::ser::{
    Impossible, Serialize, SerializeSeq, SerializeStruct, SerializeTuple, SerializeTupleStruct,
    Serializer,
};

type Result<T = ()> = std::result::Result<T, InjectError>;

impl Injector {
    fn fixed(&mut self, scalar: Scalar) -> Result {
        self.record(Entry::Fixed(scalar));
        Ok(())
    }

    fn open(&mut self, seq_at: Option<usize>) -> Compound<'_> {
        self.depth += 1;
        Compound {
            injector: self,
            seq_at,
            count: 0,
        }
    }
}

/// Keyed and unkeyed containers; all funnel into the same store.
pub struct Compound<'a> {
    injector: &'a mut Injector,
    seq_at: Option<usize>,
    count: usize,
}

impl Compound<'_> {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result {
        value.serialize(&mut *self.injector)?;
        self.count += 1;
        Ok(())
    }

    fn close(self) -> Result {
        if let Some(at) = self.seq_at {
            self.injector.store[at] = Entry::Seq(self.count);
        }
        self.injector.depth -= 1;
        Ok(())
    }
}

impl<'a> Serializer for &'a mut Injector {
    type Ok = ();
    type Error = InjectError;
    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Impossible<(), InjectError>;
    type SerializeMap = Impossible<(), InjectError>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Impossible<(), InjectError>;

    fn serialize_bool(self, v: bool) -> Result {
        self.fixed(Scalar::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result {
        self.fixed(Scalar::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result {
        self.fixed(Scalar::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result {
        self.fixed(Scalar::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result {
        self.fixed(Scalar::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result {
        self.fixed(Scalar::Uint(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result {
        self.fixed(Scalar::Uint(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result {
        self.fixed(Scalar::Uint(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result {
        self.fixed(Scalar::Uint(v))
    }

    fn serialize_f32(self, _v: f32) -> Result {
        Err(InjectError::unsupported("floating point fields"))
    }

    fn serialize_f64(self, _v: f64) -> Result {
        Err(InjectError::unsupported("floating point fields"))
    }

    fn serialize_char(self, _v: char) -> Result {
        Err(InjectError::unsupported("char fields"))
    }

    fn serialize_str(self, v: &str) -> Result {
        self.fixed(Scalar::Text(v.to_owned()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result {
        Err(InjectError::unsupported("byte fields"))
    }

    fn serialize_none(self) -> Result {
        if self.depth == 0 {
            return Err(InjectError::unsupported("`None` at top level"));
        }
        self.record(Entry::None);
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> Result
    where
        T: ?Sized + Serialize,
    {
        self.record(Entry::Some);
        self.depth += 1;
        value.serialize(&mut *self)?;
        self.depth -= 1;
        Ok(())
    }

    fn serialize_unit(self) -> Result {
        if self.depth == 0 {
            return Err(InjectError::unsupported("unit at top level"));
        }
        self.fixed(Scalar::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result {
        Err(InjectError::unsupported(format!("enum `{}`", name)))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result
    where
        T: ?Sized + Serialize,
    {
        if let Some(kind) = FieldKind::from_marker(name) {
            self.record(Entry::Slot(kind.placeholder()));
            return Ok(());
        }
        self.depth += 1;
        value.serialize(&mut *self)?;
        self.depth -= 1;
        Ok(())
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result
    where
        T: ?Sized + Serialize,
    {
        Err(InjectError::unsupported(format!("enum `{}`", name)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Compound<'a>> {
        // Length is patched on close; `len` is only a hint.
        let at = self.record(Entry::Seq(len.unwrap_or(0)));
        Ok(self.open(Some(at)))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Compound<'a>> {
        Ok(self.open(None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Compound<'a>> {
        Ok(self.open(None))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(InjectError::unsupported(format!("enum `{}`", name)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(InjectError::unsupported("maps"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Compound<'a>> {
        Ok(self.open(None))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(InjectError::unsupported(format!("enum `{}`", name)))
    }
}

impl SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = InjectError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result {
        self.element(value)
    }

    fn end(self) -> Result {
        self.close()
    }
}

impl SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = InjectError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result {
        self.element(value)
    }

    fn end(self) -> Result {
        self.close()
    }
}

impl SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = InjectError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result {
        self.element(value)
    }

    fn end(self) -> Result {
        self.close()
    }
}

impl SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = InjectError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Result {
        self.element(value)
    }

    fn skip_field(&mut self, key: &'static str) -> Result {
        Err(InjectError::unsupported(format!("skipped field `{}`", key)))
    }

    fn end(self) -> Result {
        self.close()
    }
}
