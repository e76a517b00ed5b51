use alloc::{
    borrow::Cow,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::cell::RefCell;

use serde::de::{
    self,
    value::{BorrowedStrDeserializer, SeqDeserializer as StrSeqDeserializer, StringDeserializer},
    DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};

use crate::{
    array, datetime, error::BindError, meta, table, Array, Datetime, Error, MetaData, Primitive,
    Table, Value,
};

/// Deserialize a TOML document from a string. Requires the `serde`
/// feature.
pub fn from_str<'de, T>(s: &'de str) -> Result<T, Error>
where
    T: de::Deserialize<'de>,
{
    let (table, _) = crate::parse::document(s)?;
    let ctx = BindContext::default();
    T::deserialize(ValueDeserializer::root(table, &ctx))
}

/// Deserialize a TOML document from raw bytes. The bytes must be UTF-8:
/// a leading UTF-8 BOM is stripped, and UTF-16 input or NUL bytes are
/// rejected. Requires the `serde` feature.
pub fn from_slice<'de, T>(bytes: &'de [u8]) -> Result<T, Error>
where
    T: de::Deserialize<'de>,
{
    let (table, _) = crate::parse::document_bytes(bytes)?;
    let ctx = BindContext::default();
    T::deserialize(ValueDeserializer::root(table, &ctx))
}

/// Deserialize a TOML document from a string and also return the decode
/// metadata: the keys the document defined, their TOML types, and the
/// key paths deferred as [`Primitive`] values. Requires the `serde`
/// feature.
pub fn decode<'de, T>(s: &'de str) -> Result<(T, MetaData<'de>), Error>
where
    T: de::Deserialize<'de>,
{
    let (table, mut meta) = crate::parse::document(s)?;
    let ctx = BindContext::default();
    let value = T::deserialize(ValueDeserializer::root(table, &ctx))?;
    meta.set_undecoded(ctx.into_captured());
    Ok((value, meta))
}

/// [`decode`], from raw bytes. Requires the `serde` feature.
pub fn decode_slice<'de, T>(bytes: &'de [u8]) -> Result<(T, MetaData<'de>), Error>
where
    T: de::Deserialize<'de>,
{
    let (table, mut meta) = crate::parse::document_bytes(bytes)?;
    let ctx = BindContext::default();
    let value = T::deserialize(ValueDeserializer::root(table, &ctx))?;
    meta.set_undecoded(ctx.into_captured());
    Ok((value, meta))
}

/// Decode a deferred [`Primitive`] subtree. Returns the decoded value,
/// the primitive's own key path, and any paths newly captured by nested
/// `Primitive` fields.
pub(crate) fn bind_primitive<T>(
    primitive: Primitive,
) -> Result<(T, Vec<String>, Vec<Vec<String>>), Error>
where
    T: de::DeserializeOwned,
{
    let Primitive { value, path } = primitive;
    let ctx = BindContext::default();
    let decoded = T::deserialize(ValueDeserializer {
        value,
        path: path.clone(),
        ctx: &ctx,
    })?;
    let mut captured = ctx.into_captured();
    // the subtree itself is being decoded right now
    captured.retain(|p| *p != path);
    Ok((decoded, path, captured))
}

/// Shared state of one binding pass: the key paths handed out as
/// [`Primitive`] values.
#[derive(Debug, Default)]
pub(crate) struct BindContext {
    primitives: RefCell<Vec<Vec<String>>>,
}

impl BindContext {
    fn capture(&self, path: &[String]) {
        self.primitives.borrow_mut().push(path.to_vec());
    }

    pub(crate) fn into_captured(self) -> Vec<Vec<String>> {
        self.primitives.into_inner()
    }
}

fn join_path(path: &[String]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(segment);
    }
    out
}

fn bind_error(path: &[String], message: String) -> Error {
    Error::Bind(BindError::new(join_path(path), message))
}

fn mismatch(value: &Value<'_>, path: &[String], expected: &str) -> Error {
    bind_error(
        path,
        format!("cannot decode TOML {} into {expected}", value.type_name()),
    )
}

impl Error {
    /// Attach the key path to a bind error that has none (errors raised
    /// by `Deserialize` impls rather than by this deserializer).
    fn context_key(self, path: &[String]) -> Self {
        match self {
            Error::Bind(b) => Error::Bind(b.with_key(join_path(path))),
            other => other,
        }
    }
}

/// A [`serde::Deserializer`] over one node of the parsed value tree.
#[derive(Debug)]
pub(crate) struct ValueDeserializer<'de, 'b> {
    value: Value<'de>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> ValueDeserializer<'de, 'b> {
    fn root(table: Table<'de>, ctx: &'b BindContext) -> Self {
        Self {
            value: Value::Table(table),
            path: Vec::new(),
            ctx,
        }
    }
}

macro_rules! deserialize_integer {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: Visitor<'de>,
        {
            match self.value {
                Value::Integer(i) => match <$ty>::try_from(i) {
                    Ok(v) => visitor.$visit(v),
                    Err(_) => Err(bind_error(
                        &self.path,
                        format!(
                            "integer '{i}' is out of range of {}",
                            stringify!($ty)
                        ),
                    )),
                },
                ref v => Err(mismatch(v, &self.path, "an integer")),
            }
        }
    };
}

impl<'de, 'b> de::Deserializer<'de> for ValueDeserializer<'de, 'b> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(Cow::Borrowed(s)) => visitor.visit_borrowed_str(s),
            Value::String(Cow::Owned(s)) => visitor.visit_string(s),
            Value::Integer(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Boolean(b) => visitor.visit_bool(b),
            Value::Datetime(dt) => visitor.visit_map(DatetimeAccess::new(dt)),
            Value::Array(array) => visitor.visit_seq(SeqDeserializer::new(array, self.path, self.ctx)),
            Value::Table(table) => visitor.visit_map(MapDeserializer::new(table, self.path, self.ctx)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Boolean(b) => visitor.visit_bool(b),
            ref v => Err(mismatch(v, &self.path, "a boolean")),
        }
    }

    deserialize_integer!(deserialize_i8, visit_i8, i8);
    deserialize_integer!(deserialize_i16, visit_i16, i16);
    deserialize_integer!(deserialize_i32, visit_i32, i32);
    deserialize_integer!(deserialize_i64, visit_i64, i64);
    deserialize_integer!(deserialize_i128, visit_i128, i128);
    deserialize_integer!(deserialize_u8, visit_u8, u8);
    deserialize_integer!(deserialize_u16, visit_u16, u16);
    deserialize_integer!(deserialize_u32, visit_u32, u32);
    deserialize_integer!(deserialize_u64, visit_u64, u64);
    deserialize_integer!(deserialize_u128, visit_u128, u128);

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // integers deliberately do not promote to float destinations
        match self.value {
            Value::Float(f) => {
                if f.is_finite() && (f > f64::from(f32::MAX) || f < f64::from(f32::MIN)) {
                    Err(bind_error(
                        &self.path,
                        format!("float '{f}' is out of range of f32"),
                    ))
                } else {
                    visitor.visit_f32(f as f32)
                }
            }
            ref v => Err(mismatch(v, &self.path, "a float")),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Float(f) => visitor.visit_f64(f),
            ref v => Err(mismatch(v, &self.path, "a float")),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(ref s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(bind_error(
                        &self.path,
                        format!("string '{s}' is not a single character"),
                    )),
                }
            }
            ref v => Err(mismatch(v, &self.path, "a character")),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(Cow::Borrowed(s)) => visitor.visit_borrowed_str(s),
            Value::String(Cow::Owned(s)) => visitor.visit_string(s),
            ref v => Err(mismatch(v, &self.path, "a string")),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(mismatch(&self.value, &self.path, "bytes"))
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(mismatch(&self.value, &self.path, "a unit"))
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Array(array) => {
                visitor.visit_seq(SeqDeserializer::new(array, self.path, self.ctx))
            }
            ref v => Err(mismatch(v, &self.path, "an array")),
        }
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // fixed-length destinations require an exact length match
        match self.value {
            Value::Array(array) => {
                if array.len() != len {
                    return Err(bind_error(
                        &self.path,
                        format!("expected an array of length {len}, but found {}", array.len()),
                    ));
                }
                visitor.visit_seq(SeqDeserializer::new(array, self.path, self.ctx))
            }
            ref v => Err(mismatch(v, &self.path, "an array")),
        }
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Table(table) => {
                visitor.visit_map(MapDeserializer::new(table, self.path, self.ctx))
            }
            ref v => Err(mismatch(v, &self.path, "a table")),
        }
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        if name == datetime::NAME {
            return match self.value {
                Value::Datetime(dt) => visitor.visit_map(DatetimeAccess::new(dt)),
                ref v => Err(mismatch(v, &self.path, "a datetime")),
            };
        }
        if name == meta::PRIMITIVE_NAME {
            self.ctx.capture(&self.path);
            return visitor.visit_map(PrimitiveAccess::new(self.value, self.path, self.ctx));
        }
        match self.value {
            Value::Table(table) => {
                visitor.visit_map(StructAccess::new(table, fields, self.path, self.ctx))
            }
            ref v => Err(mismatch(v, &self.path, "a table")),
        }
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(Cow::Borrowed(s)) => {
                visitor.visit_enum(BorrowedStrDeserializer::new(s))
            }
            Value::String(Cow::Owned(s)) => visitor.visit_enum(s.into_deserializer()),
            Value::Table(table) => {
                if table.len() != 1 {
                    return Err(bind_error(
                        &self.path,
                        String::from(
                            "a table can only encode an enum variant when it has exactly one key",
                        ),
                    ));
                }
                let Some((variant, value)) = table.into_iter().next() else {
                    return Err(bind_error(&self.path, String::from("empty variant table")));
                };
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value,
                    path: self.path,
                    ctx: self.ctx,
                })
            }
            ref v => Err(mismatch(v, &self.path, "an enum (a string or a one-key table)")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }
}

struct SeqDeserializer<'de, 'b> {
    iter: array::IntoIter<'de>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> SeqDeserializer<'de, 'b> {
    fn new(array: Array<'de>, path: Vec<String>, ctx: &'b BindContext) -> Self {
        Self {
            iter: array.into_iter(),
            path,
            ctx,
        }
    }
}

impl<'de, 'b> SeqAccess<'de> for SeqDeserializer<'de, 'b> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        self.iter.next().map_or(Ok(None), |value| {
            seed.deserialize(ValueDeserializer {
                value,
                path: self.path.clone(),
                ctx: self.ctx,
            })
            .map(Some)
        })
    }

    fn size_hint(&self) -> Option<usize> {
        self.iter.size_hint().1
    }
}

/// Map access feeding raw TOML keys, for map destinations.
struct MapDeserializer<'de, 'b> {
    iter: table::IntoIter<'de>,
    pending: Option<(Cow<'de, str>, Value<'de>)>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> MapDeserializer<'de, 'b> {
    fn new(table: Table<'de>, path: Vec<String>, ctx: &'b BindContext) -> Self {
        Self {
            iter: table.into_iter(),
            pending: None,
            path,
            ctx,
        }
    }
}

impl<'de, 'b> MapAccess<'de> for MapDeserializer<'de, 'b> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        let result = match key {
            Cow::Borrowed(s) => seed.deserialize(BorrowedStrDeserializer::new(s)),
            Cow::Owned(ref s) => seed.deserialize(StringDeserializer::new(s.clone())),
        };
        self.pending = Some((key, value));
        result.map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.pending.take() else {
            return Err(de::Error::custom("value is missing"));
        };
        let mut path = self.path.clone();
        path.push(key.into_owned());
        seed.deserialize(ValueDeserializer {
            value,
            path: path.clone(),
            ctx: self.ctx,
        })
        .map_err(|e| e.context_key(&path))
    }
}

/// Map access for struct destinations: matches TOML keys against the
/// declared fields, exact matches first, then case-insensitively in
/// declaration order. Each field is consumed at most once; unmatched
/// keys fall through under their own name and get ignored by serde.
struct StructAccess<'de, 'b> {
    entries: alloc::vec::IntoIter<(Cow<'de, str>, Cow<'de, str>, Value<'de>)>,
    pending: Option<(Cow<'de, str>, Value<'de>)>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> StructAccess<'de, 'b> {
    fn new(
        table: Table<'de>,
        fields: &'static [&'static str],
        path: Vec<String>,
        ctx: &'b BindContext,
    ) -> Self {
        let pairs: Vec<(Cow<'de, str>, Value<'de>)> = table.into_iter().collect();
        let mut taken = alloc::vec![false; fields.len()];
        let mut matched: Vec<Option<&'static str>> = alloc::vec![None; pairs.len()];
        for (idx, (key, _)) in pairs.iter().enumerate() {
            if let Some(fi) = fields.iter().position(|f| *f == key.as_ref()) {
                if !taken[fi] {
                    taken[fi] = true;
                    matched[idx] = Some(fields[fi]);
                }
            }
        }
        for (idx, (key, _)) in pairs.iter().enumerate() {
            if matched[idx].is_some() {
                continue;
            }
            let found = fields
                .iter()
                .enumerate()
                .find(|(fi, f)| !taken[*fi] && eq_ignore_case(f, key.as_ref()))
                .map(|(fi, _)| fi);
            if let Some(fi) = found {
                taken[fi] = true;
                matched[idx] = Some(fields[fi]);
            }
        }
        let entries: Vec<_> = pairs
            .into_iter()
            .zip(matched)
            .map(|((key, value), field)| {
                let emit = match field {
                    Some(f) => Cow::Borrowed(f),
                    None => key.clone(),
                };
                (emit, key, value)
            })
            .collect();
        Self {
            entries: entries.into_iter(),
            pending: None,
            path,
            ctx,
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl<'de, 'b> MapAccess<'de> for StructAccess<'de, 'b> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((emit, key, value)) = self.entries.next() else {
            return Ok(None);
        };
        let result = match emit {
            Cow::Borrowed(s) => seed.deserialize(BorrowedStrDeserializer::new(s)),
            Cow::Owned(s) => seed.deserialize(StringDeserializer::new(s)),
        };
        self.pending = Some((key, value));
        result.map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.pending.take() else {
            return Err(de::Error::custom("value is missing"));
        };
        let mut path = self.path.clone();
        path.push(key.into_owned());
        seed.deserialize(ValueDeserializer {
            value,
            path: path.clone(),
            ctx: self.ctx,
        })
        .map_err(|e| e.context_key(&path))
    }
}

/// Feeds a datetime over the private struct protocol: one field holding
/// the RFC 3339 rendering.
#[derive(Debug)]
struct DatetimeAccess {
    repr: Option<String>,
}

impl DatetimeAccess {
    fn new(dt: Datetime) -> Self {
        Self {
            repr: Some(dt.to_string()),
        }
    }
}

impl<'de> MapAccess<'de> for DatetimeAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        if self.repr.is_some() {
            seed.deserialize(BorrowedStrDeserializer::new(datetime::FIELD))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.repr.take() {
            Some(repr) => seed.deserialize(StringDeserializer::new(repr)),
            None => Err(de::Error::custom("datetime value is missing")),
        }
    }
}

/// Feeds a deferred subtree over the private struct protocol: the value
/// itself, then its key path.
struct PrimitiveAccess<'de, 'b> {
    value: Option<Value<'de>>,
    path: Option<Vec<String>>,
    ctx: &'b BindContext,
}

impl<'de, 'b> PrimitiveAccess<'de, 'b> {
    fn new(value: Value<'de>, path: Vec<String>, ctx: &'b BindContext) -> Self {
        Self {
            value: Some(value),
            path: Some(path),
            ctx,
        }
    }
}

impl<'de, 'b> MapAccess<'de> for PrimitiveAccess<'de, 'b> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        if self.value.is_some() {
            seed.deserialize(BorrowedStrDeserializer::new(meta::PRIMITIVE_FIELD_VALUE))
                .map(Some)
        } else if self.path.is_some() {
            seed.deserialize(BorrowedStrDeserializer::new(meta::PRIMITIVE_FIELD_PATH))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        if let Some(value) = self.value.take() {
            let path = self.path.clone().unwrap_or_default();
            return seed.deserialize(ValueDeserializer {
                value,
                path,
                ctx: self.ctx,
            });
        }
        match self.path.take() {
            Some(path) => seed.deserialize(StrSeqDeserializer::new(path.into_iter())),
            None => Err(de::Error::custom("primitive value is missing")),
        }
    }
}

struct EnumDeserializer<'de, 'b> {
    variant: Cow<'de, str>,
    value: Value<'de>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> de::EnumAccess<'de> for EnumDeserializer<'de, 'b> {
    type Error = Error;
    type Variant = VariantDeserializer<'de, 'b>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let tag = match self.variant {
            Cow::Borrowed(s) => seed.deserialize(BorrowedStrDeserializer::new(s)),
            Cow::Owned(s) => seed.deserialize(StringDeserializer::new(s)),
        }?;
        Ok((
            tag,
            VariantDeserializer {
                value: self.value,
                path: self.path,
                ctx: self.ctx,
            },
        ))
    }
}

struct VariantDeserializer<'de, 'b> {
    value: Value<'de>,
    path: Vec<String>,
    ctx: &'b BindContext,
}

impl<'de, 'b> de::VariantAccess<'de> for VariantDeserializer<'de, 'b> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Err(bind_error(
            &self.path,
            String::from("a unit variant cannot carry a value"),
        ))
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(ValueDeserializer {
            value: self.value,
            path: self.path,
            ctx: self.ctx,
        })
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        use serde::Deserializer as _;

        ValueDeserializer {
            value: self.value,
            path: self.path,
            ctx: self.ctx,
        }
        .deserialize_tuple(len, visitor)
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Table(table) => {
                visitor.visit_map(StructAccess::new(table, fields, self.path, self.ctx))
            }
            ref v => Err(mismatch(v, &self.path, "a table")),
        }
    }
}

impl<'de> de::Deserialize<'de> for Value<'de> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value<'de>;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a TOML value")
    }

    fn visit_bool<E>(self, b: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Boolean(b))
    }

    fn visit_i64<E>(self, i: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Integer(i))
    }

    fn visit_u64<E>(self, u: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match i64::try_from(u) {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => Err(E::custom(format!(
                "integer '{u}' is out of range of 64-bit signed integers"
            ))),
        }
    }

    fn visit_f64<E>(self, f: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Float(f))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(Cow::Owned(s.to_string())))
    }

    fn visit_borrowed_str<E>(self, s: &'de str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(Cow::Borrowed(s)))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(Cow::Owned(s)))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut array = Array::new();
        while let Some(value) = seq.next_element()? {
            array.push(value);
        }
        Ok(Value::Array(array))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let Some(first) = map.next_key::<String>()? else {
            return Ok(Value::Table(Table::new()));
        };
        if first == datetime::FIELD {
            let repr: String = map.next_value()?;
            let dt: Datetime = repr
                .parse()
                .map_err(|_| de::Error::custom("invalid TOML datetime"))?;
            return Ok(Value::Datetime(dt));
        }
        let mut table = Table::new();
        let value: Value<'de> = map.next_value()?;
        table.insert(first, value);
        while let Some((key, value)) = map.next_entry::<String, Value<'de>>()? {
            table.insert(key, value);
        }
        Ok(Value::Table(table))
    }
}

impl<'de> de::Deserialize<'de> for Primitive {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_struct(meta::PRIMITIVE_NAME, meta::PRIMITIVE_FIELDS, PrimitiveVisitor)
    }
}

struct PrimitiveVisitor;

impl<'de> Visitor<'de> for PrimitiveVisitor {
    type Value = Primitive;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a deferred TOML value")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom("primitive value not found"));
        };
        if key != meta::PRIMITIVE_FIELD_VALUE {
            return Err(de::Error::custom("expected a primitive value field"));
        }
        let value: Value<'de> = map.next_value()?;
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom("primitive key path not found"));
        };
        if key != meta::PRIMITIVE_FIELD_PATH {
            return Err(de::Error::custom("expected a primitive key path field"));
        }
        let path: Vec<String> = map.next_value()?;
        Ok(Primitive {
            value: value.into_owned(),
            path,
        })
    }
}
