//! Decode metadata: every key the document defined, its TOML type, and
//! the subtrees whose decoding was deferred.

use alloc::{borrow::Cow, string::String, vec::Vec};
use core::fmt;

use crate::Value;

/// A fully-qualified key path: the `.`-separated segments leading to a
/// value, after quote-decoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyPath<'a>(pub(crate) Vec<Cow<'a, str>>);

impl<'a> KeyPath<'a> {
    /// The individual segments of the path.
    pub fn segments(&self) -> &[Cow<'a, str>] {
        &self.0
    }

    /// Whether this path names exactly the given segments.
    pub fn is(&self, segments: &[&str]) -> bool {
        self.0.len() == segments.len() && self.starts_with(segments)
    }

    pub(crate) fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.0.len()
            && self
                .0
                .iter()
                .zip(prefix)
                .all(|(seg, p)| seg.as_ref() == *p)
    }

    fn starts_with_owned(&self, prefix: &[String]) -> bool {
        prefix.len() <= self.0.len()
            && self
                .0
                .iter()
                .zip(prefix)
                .all(|(seg, p)| seg.as_ref() == p.as_str())
    }
}

fn is_bare(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl fmt::Display for KeyPath<'_> {
    /// Renders the path in dotted form, quoting any segment that is not
    /// a bare key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            if is_bare(segment) {
                write!(f, "{segment}")?;
            } else {
                write!(f, "\"")?;
                for c in segment.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")?;
            }
        }
        Ok(())
    }
}

/// Metadata gathered while decoding a TOML document.
///
/// Returned by [`decode`][crate::decode] next to the decoded value, and
/// produced internally for every parse.
#[derive(Debug, Clone, Default)]
pub struct MetaData<'a> {
    keys: Vec<KeyPath<'a>>,
    types: Vec<&'static str>,
    undecoded: Vec<Vec<String>>,
}

impl<'a> MetaData<'a> {
    pub(crate) fn new(keys: Vec<KeyPath<'a>>, types: Vec<&'static str>) -> Self {
        Self {
            keys,
            types,
            undecoded: Vec::new(),
        }
    }

    /// Every key defined by the document, fully qualified, in document
    /// order and without duplicates. Array-of-tables entries are
    /// addressed by their name alone, with no index.
    pub fn keys(&self) -> &[KeyPath<'a>] {
        &self.keys
    }

    /// The name of the TOML type of the value at the given key path:
    /// one of `"String"`, `"Integer"`, `"Float"`, `"Bool"`,
    /// `"Datetime"`, `"Array"`, `"Hash"`, or `"ArrayHash"`. `None` if
    /// the path was never defined.
    pub fn type_of(&self, key: &[&str]) -> Option<&'static str> {
        self.keys
            .iter()
            .position(|k| k.is(key))
            .map(|i| self.types[i])
    }

    /// Whether the given key path was defined by the document, either
    /// directly or as an intermediate table of a deeper key.
    pub fn is_defined(&self, key: &[&str]) -> bool {
        !key.is_empty() && self.keys.iter().any(|k| k.starts_with(key))
    }

    /// The key paths that were captured as [`Primitive`] values and not
    /// yet decoded, in document order.
    pub fn undecoded(&self) -> Vec<KeyPath<'a>> {
        self.keys
            .iter()
            .filter(|k| self.undecoded.iter().any(|p| k.starts_with_owned(p)))
            .cloned()
            .collect()
    }

    #[cfg(feature = "serde")]
    pub(crate) fn set_undecoded(&mut self, paths: Vec<Vec<String>>) {
        self.undecoded = paths;
    }

    /// Decode a previously-deferred [`Primitive`] value and mark its key
    /// path as decoded.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn primitive_decode<T>(&mut self, primitive: Primitive) -> Result<T, crate::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let (decoded, path, captured) = crate::serde::bind_primitive(primitive)?;
        self.undecoded.retain(|p| *p != path);
        self.undecoded.extend(captured);
        Ok(decoded)
    }
}

/// A TOML subtree whose decoding was deferred.
///
/// A struct field of this type receives its part of the document
/// undecoded; pass it to [`MetaData::primitive_decode`] to decode it
/// later. Until then the corresponding key paths show up in
/// [`MetaData::undecoded`].
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub(crate) value: Value<'static>,
    pub(crate) path: Vec<String>,
}

impl Primitive {
    /// The captured, undecoded value tree.
    pub fn value(&self) -> &Value<'static> {
        &self.value
    }
}

// The serde wire protocol for `Primitive`, mirroring the datetime one:
// a struct with a private name whose map carries the subtree and its
// key path under two private fields, in that order.
#[cfg(feature = "serde")]
pub(crate) const PRIMITIVE_NAME: &str = "$__detoml_private_Primitive";
#[cfg(feature = "serde")]
pub(crate) const PRIMITIVE_FIELD_VALUE: &str = "$__detoml_private_primitive_value";
#[cfg(feature = "serde")]
pub(crate) const PRIMITIVE_FIELD_PATH: &str = "$__detoml_private_primitive_path";
#[cfg(feature = "serde")]
pub(crate) const PRIMITIVE_FIELDS: &[&str] = &[PRIMITIVE_FIELD_VALUE, PRIMITIVE_FIELD_PATH];
