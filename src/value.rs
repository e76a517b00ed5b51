use alloc::borrow::Cow;

use crate::{Array, Datetime, Error, Table};

/// A TOML value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// A string.
    String(Cow<'a, str>),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE-754 float. NaN and the infinities are representable.
    Float(f64),
    /// A boolean.
    Boolean(bool),
    /// A date, a time, or both, with or without a UTC offset.
    Datetime(Datetime),
    /// An array of values. TOML 1.0 arrays may be heterogeneous.
    Array(Array<'a>),
    /// A table.
    Table(Table<'a>),
}

impl<'a> Value<'a> {
    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a datetime, if it is one.
    pub fn as_datetime(&self) -> Option<&Datetime> {
        match self {
            Value::Datetime(dt) => Some(dt),
            _ => None,
        }
    }

    /// The value as an array, if it is one.
    pub fn as_array(&self) -> Option<&Array<'a>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The value as a table, if it is one.
    pub fn as_table(&self) -> Option<&Table<'a>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The name of this value's TOML type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Datetime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }

    /// Extend the value's lifetime by cloning any borrowed data.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Integer(i) => Value::Integer(i),
            Value::Float(f) => Value::Float(f),
            Value::Boolean(b) => Value::Boolean(b),
            Value::Datetime(dt) => Value::Datetime(dt),
            Value::Array(a) => Value::Array(a.into_owned()),
            Value::Table(t) => Value::Table(t.into_owned()),
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::String(Cow::Borrowed(s))
    }
}

impl<'a> From<Cow<'a, str>> for Value<'a> {
    fn from(s: Cow<'a, str>) -> Self {
        Value::String(s)
    }
}

impl From<alloc::string::String> for Value<'_> {
    fn from(s: alloc::string::String) -> Self {
        Value::String(Cow::Owned(s))
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value<'_> {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Datetime> for Value<'_> {
    fn from(dt: Datetime) -> Self {
        Value::Datetime(dt)
    }
}

impl<'a> From<Array<'a>> for Value<'a> {
    fn from(a: Array<'a>) -> Self {
        Value::Array(a)
    }
}

impl<'a> From<Table<'a>> for Value<'a> {
    fn from(t: Table<'a>) -> Self {
        Value::Table(t)
    }
}

impl TryFrom<Value<'_>> for i64 {
    type Error = Error;

    fn try_from(value: Value<'_>) -> Result<Self, Error> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(Error::Convert {
                from: other.type_name(),
                to: "integer",
            }),
        }
    }
}

impl TryFrom<Value<'_>> for f64 {
    type Error = Error;

    fn try_from(value: Value<'_>) -> Result<Self, Error> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(Error::Convert {
                from: other.type_name(),
                to: "float",
            }),
        }
    }
}

impl TryFrom<Value<'_>> for bool {
    type Error = Error;

    fn try_from(value: Value<'_>) -> Result<Self, Error> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(Error::Convert {
                from: other.type_name(),
                to: "boolean",
            }),
        }
    }
}

impl<'a> TryFrom<Value<'a>> for Cow<'a, str> {
    type Error = Error;

    fn try_from(value: Value<'a>) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::Convert {
                from: other.type_name(),
                to: "string",
            }),
        }
    }
}
