//! A TOML table.

use alloc::{
    borrow::Cow,
    collections::{btree_map, BTreeMap},
};

use crate::Value;

/// A TOML table.
///
/// Keys are compared byte-wise; the tree does not preserve the source
/// order of keys (decode metadata does, separately).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table<'a>(BTreeMap<Cow<'a, str>, Value<'a>>);

impl<'a> Table<'a> {
    /// Create a new table.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a key-value pair into the table.
    pub fn insert(&mut self, key: impl Into<Cow<'a, str>>, value: Value<'a>) {
        self.0.insert(key.into(), value);
    }

    /// Get the value for the given key.
    pub fn get(&self, key: &str) -> Option<&Value<'a>> {
        self.0.get(key)
    }

    /// Walk a dotted key path and return the value it leads to.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value<'a>> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            return Some(value);
        }
        value.as_table()?.get_path(rest)
    }

    /// Get the number of entries in the table.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// If the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get an iterator over the key-value pairs.
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            iter: self.0.iter(),
        }
    }

    /// Extend the table's lifetime by cloning any borrowed data.
    pub fn into_owned(self) -> Table<'static> {
        self.0
            .into_iter()
            .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
            .collect()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Cow<'a, str>, &Value<'a>)> {
        self.0.iter()
    }

    pub(crate) fn entry(
        &mut self,
        key: Cow<'a, str>,
    ) -> btree_map::Entry<'_, Cow<'a, str>, Value<'a>> {
        self.0.entry(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Value<'a>> {
        self.0.get_mut(key)
    }
}

impl<'a> FromIterator<(Cow<'a, str>, Value<'a>)> for Table<'a> {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Cow<'a, str>, Value<'a>)>,
    {
        Self(iter.into_iter().collect())
    }
}

/// An iterator over the key-value pairs of a table.
#[derive(Debug)]
pub struct Iter<'i, 'a> {
    iter: btree_map::Iter<'i, Cow<'a, str>, Value<'a>>,
}

impl<'i, 'a> Iterator for Iter<'i, 'a> {
    type Item = (&'i str, &'i Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, v)| (k.as_ref(), v))
    }
}

impl<'a> IntoIterator for Table<'a> {
    type Item = (Cow<'a, str>, Value<'a>);
    type IntoIter = IntoIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.0.into_iter(),
        }
    }
}

/// An owning iterator over the key-value pairs of a table.
#[derive(Debug)]
pub struct IntoIter<'a> {
    iter: btree_map::IntoIter<Cow<'a, str>, Value<'a>>,
}

impl<'a> Iterator for IntoIter<'a> {
    type Item = (Cow<'a, str>, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
