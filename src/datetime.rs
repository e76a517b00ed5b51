//! Parsed TOML datetime values.

use alloc::format;
use core::{fmt, str::FromStr};

use crate::Error;

/// A parsed TOML datetime value.
///
/// Depending on which fields are set, this covers all four datetime
/// shapes of the [TOML v1.0.0 spec]:
///
/// | `date`    | `time`    | `offset`  | TOML type        |
/// | --------- | --------- | --------- | ---------------- |
/// | `Some(_)` | `Some(_)` | `Some(_)` | Offset Date-Time |
/// | `Some(_)` | `Some(_)` | `None`    | Local Date-Time  |
/// | `Some(_)` | `None`    | `None`    | Local Date       |
/// | `None`    | `Some(_)` | `None`    | Local Time       |
///
/// A local value carries no relation to any timezone; converting one to
/// an instant is deliberately left to the caller.
///
/// [TOML v1.0.0 spec]: https://toml.io/en/v1.0.0
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct Datetime {
    /// Optional date. Required for everything but *Local Time*.
    pub date: Option<Date>,

    /// Optional time. Required for everything but *Local Date*.
    pub time: Option<Time>,

    /// Optional offset. Required for *Offset Date-Time*.
    pub offset: Option<Offset>,
}

/// A parsed TOML date value.
///
/// May be part of a [`Datetime`]. Alone, `Date` corresponds to a TOML
/// *Local Date*: an entire day without any relation to an offset or
/// timezone.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct Date {
    /// Year: four digits.
    pub year: u16,
    /// Month: 1 to 12.
    pub month: u8,
    /// Day: 1 to {28, 29, 30, 31}, based on month and year.
    pub day: u8,
}

/// A parsed TOML time value.
///
/// May be part of a [`Datetime`]. Alone, `Time` corresponds to a TOML
/// *Local Time*. Fractional seconds beyond nanosecond precision are
/// truncated by the parser, not rounded.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct Time {
    /// Hour: 0 to 23.
    pub hour: u8,
    /// Minute: 0 to 59.
    pub minute: u8,
    /// Second: 0 to {58, 59, 60}, based on leap second rules.
    pub second: u8,
    /// Nanosecond: 0 to `999_999_999`.
    pub nanosecond: u32,
}

/// A parsed TOML time offset.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub enum Offset {
    /// The `Z` suffix: a UTC offset of 00:00.
    Z,

    /// Offset between local time and UTC.
    Custom {
        /// Minutes: -`1_440..1_440`.
        minutes: i16,
    },
}

impl Offset {
    /// The offset in minutes.
    pub fn as_minutes(&self) -> i16 {
        match *self {
            Offset::Z => 0,
            Offset::Custom { minutes } => minutes,
        }
    }
}

impl From<Date> for Datetime {
    fn from(other: Date) -> Self {
        Datetime {
            date: Some(other),
            time: None,
            offset: None,
        }
    }
}

impl From<Time> for Datetime {
    fn from(other: Time) -> Self {
        Datetime {
            date: None,
            time: Some(other),
            offset: None,
        }
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref date) = self.date {
            write!(f, "{date}")?;
        }
        if let Some(ref time) = self.time {
            if self.date.is_some() {
                write!(f, "T")?;
            }
            write!(f, "{time}")?;
        }
        if let Some(ref offset) = self.offset {
            write!(f, "{offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanosecond != 0 {
            let frac = format!("{:09}", self.nanosecond);
            write!(f, ".{}", frac.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Offset::Z => write!(f, "Z"),
            Offset::Custom { mut minutes } => {
                let mut sign = '+';
                if minutes < 0 {
                    minutes *= -1;
                    sign = '-';
                }
                write!(f, "{sign}{:02}:{:02}", minutes / 60, minutes % 60)
            }
        }
    }
}

impl FromStr for Datetime {
    type Err = Error;

    /// Parse an RFC 3339 style datetime, a local datetime, a local date,
    /// or a local time, with the same grammar the document parser uses.
    fn from_str(s: &str) -> Result<Datetime, Error> {
        let mut input = s;
        match crate::parse::datetime::date_time(&mut input) {
            Ok(dt) if input.is_empty() => Ok(dt),
            _ => Err(Error::Datetime),
        }
    }
}

// The serde wire protocol: `Datetime` asks for a struct with a private
// name, and deserializers of this crate answer with a map holding the
// RFC 3339 rendering under a single private field. Everything else
// (including serde's own content buffering for flattened or untagged
// destinations) sees a plain map of strings and round-trips it intact.
#[cfg(feature = "serde")]
pub(crate) const NAME: &str = "$__detoml_private_Datetime";
#[cfg(feature = "serde")]
pub(crate) const FIELD: &str = "$__detoml_private_datetime_repr";

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Datetime {
    fn deserialize<D>(deserializer: D) -> Result<Datetime, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_struct(NAME, &[FIELD], DatetimeVisitor)
    }
}

#[cfg(feature = "serde")]
struct DatetimeVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for DatetimeVisitor {
    type Value = Datetime;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a TOML datetime")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Datetime, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        use serde::de::Error as _;

        match map.next_key::<DatetimeKey>()? {
            Some(DatetimeKey) => {}
            None => return Err(A::Error::custom("datetime key not found")),
        }
        let repr: alloc::string::String = map.next_value()?;
        repr.parse()
            .map_err(|_| A::Error::custom("invalid TOML datetime"))
    }
}

#[cfg(feature = "serde")]
struct DatetimeKey;

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DatetimeKey {
    fn deserialize<D>(deserializer: D) -> Result<DatetimeKey, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct KeyVisitor;

        impl serde::de::Visitor<'_> for KeyVisitor {
            type Value = DatetimeKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a valid datetime field")
            }

            fn visit_str<E>(self, s: &str) -> Result<DatetimeKey, E>
            where
                E: serde::de::Error,
            {
                if s == FIELD {
                    Ok(DatetimeKey)
                } else {
                    Err(E::custom("expected a datetime field"))
                }
            }
        }

        deserializer.deserialize_identifier(KeyVisitor)
    }
}
