//! Applies parsed statements to the document under construction: walks
//! and creates tables, enforces the structural rules of TOML 1.0, and
//! records decode metadata.

use alloc::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec::Vec,
};

use crate::{Array, KeyPath, MetaData, Table, Value};

type Path<'i> = Vec<Cow<'i, str>>;

pub(super) fn display_path(path: &[Cow<'_, str>]) -> String {
    KeyPath(path.to_vec()).to_string()
}

/// What a key path currently resolves to.
enum Node {
    Absent,
    Table,
    ArrayOfTables,
    Value,
}

/// How a table came to be walked into existence.
enum Origin {
    Header,
    Dotted,
}

pub(super) struct Doc<'i> {
    root: Table<'i>,
    /// the current section, as a key list
    context: Path<'i>,
    /// tables declared by a `[header]`
    explicit: BTreeSet<Path<'i>>,
    /// tables created only by walking a header path
    implicit: BTreeSet<Path<'i>>,
    /// tables created by walking a dotted key
    dotted: BTreeSet<Path<'i>>,
    /// inline tables and everything beneath them
    frozen: BTreeSet<Path<'i>>,
    /// paths holding an array of tables
    array_tables: BTreeSet<Path<'i>>,
    ordered: Vec<Path<'i>>,
    types: BTreeMap<Path<'i>, &'static str>,
}

impl<'i> Doc<'i> {
    pub(super) fn new() -> Self {
        Self {
            root: Table::new(),
            context: Vec::new(),
            explicit: BTreeSet::new(),
            implicit: BTreeSet::new(),
            dotted: BTreeSet::new(),
            frozen: BTreeSet::new(),
            array_tables: BTreeSet::new(),
            ordered: Vec::new(),
            types: BTreeMap::new(),
        }
    }

    /// The absolute dotted rendering of a key relative to the current
    /// section, for error context.
    pub(super) fn display_abs(&self, rel: &[Cow<'i, str>]) -> String {
        let mut path = self.context.clone();
        path.extend(rel.iter().cloned());
        display_path(&path)
    }

    /// Install `value` at the dotted key `rel` under the current section.
    pub(super) fn assign(&mut self, rel: Path<'i>, value: Value<'i>) -> Result<(), String> {
        let skip = self.context.len();
        let mut abs = self.context.clone();
        abs.extend(rel);
        let parents = abs.len() - 1;
        self.walk(&abs[..parents], Origin::Dotted, skip)?;
        if self.peek(&abs).is_some() {
            return Err(if self.frozen.contains(&abs) {
                format!("inline table '{}' cannot be extended", display_path(&abs))
            } else {
                format!("key '{}' has already been defined", display_path(&abs))
            });
        }
        let mut meta_path = abs.clone();
        self.record_value(&mut meta_path, &value);
        let Some((leaf, parent_path)) = abs.split_last() else {
            return Err(String::from("empty key"));
        };
        self.table_mut(parent_path).insert(leaf.clone(), value);
        Ok(())
    }

    /// Enter a `[header]` section.
    pub(super) fn begin_table(&mut self, path: Path<'i>) -> Result<(), String> {
        let parents = path.len() - 1;
        self.walk(&path[..parents], Origin::Header, 0)?;
        match self.classify(&path) {
            Node::Absent => {
                self.create_table(&path);
                self.explicit.insert(path.clone());
                self.record(&path, "Hash");
            }
            Node::Table => {
                if self.frozen.contains(&path) {
                    return Err(format!(
                        "inline table '{}' cannot be redefined",
                        display_path(&path)
                    ));
                }
                if self.explicit.contains(&path) {
                    return Err(format!(
                        "table '{}' has already been defined",
                        display_path(&path)
                    ));
                }
                if self.dotted.contains(&path) {
                    return Err(format!(
                        "table '{}' was defined by dotted keys and cannot be redefined",
                        display_path(&path)
                    ));
                }
                // promoting an implicit table to explicit, exactly once
                self.implicit.remove(&path);
                self.explicit.insert(path.clone());
                self.record(&path, "Hash");
            }
            Node::ArrayOfTables => {
                return Err(format!(
                    "array table '{}' cannot be redefined as a table",
                    display_path(&path)
                ));
            }
            Node::Value => {
                return Err(format!(
                    "key '{}' has already been defined",
                    display_path(&path)
                ));
            }
        }
        self.context = path;
        Ok(())
    }

    /// Enter an `[[array-of-tables]]` section, appending a fresh table.
    pub(super) fn begin_array_table(&mut self, path: Path<'i>) -> Result<(), String> {
        let parents = path.len() - 1;
        self.walk(&path[..parents], Origin::Header, 0)?;
        match self.classify(&path) {
            Node::Absent => {
                let Some((leaf, parent_path)) = path.split_last() else {
                    return Err(String::from("empty table header"));
                };
                let mut array = Array::new();
                array.push(Table::new().into());
                self.table_mut(parent_path)
                    .insert(leaf.clone(), Value::Array(array));
                self.array_tables.insert(path.clone());
                self.record(&path, "ArrayHash");
            }
            Node::ArrayOfTables => {
                // flags under the previous element no longer apply
                self.clear_below(&path);
                let Some((leaf, parent_path)) = path.split_last() else {
                    return Err(String::from("empty table header"));
                };
                match self.table_mut(parent_path).get_mut(leaf.as_ref()) {
                    Some(Value::Array(array)) => array.push(Table::new().into()),
                    _ => unreachable!("classified as an array of tables"),
                }
            }
            Node::Table => {
                return Err(format!(
                    "table '{}' cannot be redefined as an array of tables",
                    display_path(&path)
                ));
            }
            Node::Value => {
                return Err(format!(
                    "key '{}' has already been defined",
                    display_path(&path)
                ));
            }
        }
        self.context = path;
        Ok(())
    }

    pub(super) fn finish(self) -> (Table<'i>, MetaData<'i>) {
        let Doc {
            root,
            ordered,
            types,
            ..
        } = self;
        let mut keys = Vec::with_capacity(ordered.len());
        let mut type_names = Vec::with_capacity(ordered.len());
        for path in ordered {
            let ty = types.get(&path).copied().unwrap_or("Hash");
            keys.push(KeyPath(path));
            type_names.push(ty);
        }
        (root, MetaData::new(keys, type_names))
    }

    /// Validate (and create where absent) every table along `path`,
    /// starting at segment `skip`. Intermediates of a header may pass
    /// through existing header-created tables and descend into arrays of
    /// tables; dotted keys may only extend tables they created.
    fn walk(&mut self, path: &[Cow<'i, str>], origin: Origin, skip: usize) -> Result<(), String> {
        for i in skip..path.len() {
            let prefix = &path[..=i];
            match self.classify(prefix) {
                Node::Absent => {
                    self.create_table(prefix);
                    let owned = prefix.to_vec();
                    match origin {
                        Origin::Header => self.implicit.insert(owned),
                        Origin::Dotted => self.dotted.insert(owned),
                    };
                }
                Node::Table => {
                    if self.frozen.contains(prefix) {
                        return Err(format!(
                            "inline table '{}' cannot be extended",
                            display_path(prefix)
                        ));
                    }
                    match origin {
                        Origin::Header => {
                            if self.dotted.contains(prefix) {
                                return Err(format!(
                                    "table '{}' was defined by dotted keys and cannot be extended here",
                                    display_path(prefix)
                                ));
                            }
                        }
                        Origin::Dotted => {
                            if !self.dotted.contains(prefix) {
                                return Err(format!(
                                    "table '{}' cannot be extended by dotted keys",
                                    display_path(prefix)
                                ));
                            }
                        }
                    }
                }
                Node::ArrayOfTables => match origin {
                    Origin::Header => {}
                    Origin::Dotted => {
                        return Err(format!(
                            "array table '{}' cannot be extended by dotted keys",
                            display_path(prefix)
                        ));
                    }
                },
                Node::Value => {
                    return Err(format!(
                        "key '{}' has already been defined",
                        display_path(prefix)
                    ));
                }
            }
        }
        Ok(())
    }

    fn classify(&self, path: &[Cow<'i, str>]) -> Node {
        match self.peek(path) {
            None => Node::Absent,
            Some(Value::Table(_)) => Node::Table,
            Some(Value::Array(_)) if self.array_tables.contains(path) => Node::ArrayOfTables,
            Some(_) => Node::Value,
        }
    }

    /// Resolve a path in the tree, descending into the last element of
    /// any array of tables along the way.
    fn peek(&self, path: &[Cow<'i, str>]) -> Option<&Value<'i>> {
        let mut table = &self.root;
        for (i, segment) in path.iter().enumerate() {
            let value = table.get(segment.as_ref())?;
            if i + 1 == path.len() {
                return Some(value);
            }
            table = match value {
                Value::Table(t) => t,
                Value::Array(a) if self.array_tables.contains(&path[..=i]) => {
                    match a.as_slice().last() {
                        Some(Value::Table(t)) => t,
                        _ => return None,
                    }
                }
                _ => return None,
            };
        }
        None
    }

    fn create_table(&mut self, path: &[Cow<'i, str>]) {
        let Some((leaf, parents)) = path.split_last() else {
            return;
        };
        self.table_mut(parents)
            .insert(leaf.clone(), Table::new().into());
    }

    /// Mutable access to the table at `path`; only called on validated
    /// paths.
    fn table_mut(&mut self, path: &[Cow<'i, str>]) -> &mut Table<'i> {
        let arrays = &self.array_tables;
        let mut table = &mut self.root;
        for i in 0..path.len() {
            let entry = table
                .entry(path[i].clone())
                .or_insert_with(|| Table::new().into());
            table = match entry {
                Value::Table(t) => t,
                Value::Array(a) if arrays.contains(&path[..=i]) => match a.last_mut() {
                    Some(Value::Table(t)) => t,
                    _ => unreachable!("array tables always hold tables"),
                },
                _ => unreachable!("validated paths walk through tables"),
            };
        }
        table
    }

    /// Record the metadata for a freshly-assigned value: its key path
    /// and TOML type, recursively for inline table contents. Inline
    /// tables also freeze their whole subtree.
    fn record_value(&mut self, path: &mut Path<'i>, value: &Value<'i>) {
        match value {
            Value::Table(table) => {
                self.record(path, "Hash");
                self.frozen.insert(path.clone());
                for (key, child) in table.entries() {
                    path.push(key.clone());
                    self.record_value(path, child);
                    path.pop();
                }
            }
            Value::Array(_) => self.record(path, "Array"),
            Value::String(_) => self.record(path, "String"),
            Value::Integer(_) => self.record(path, "Integer"),
            Value::Float(_) => self.record(path, "Float"),
            Value::Boolean(_) => self.record(path, "Bool"),
            Value::Datetime(_) => self.record(path, "Datetime"),
        }
    }

    fn record(&mut self, path: &[Cow<'i, str>], type_name: &'static str) {
        if self.types.insert(path.to_vec(), type_name).is_none() {
            self.ordered.push(path.to_vec());
        }
    }

    fn clear_below(&mut self, path: &[Cow<'i, str>]) {
        fn deeper<'i>(p: &Path<'i>, path: &[Cow<'i, str>]) -> bool {
            p.len() > path.len() && p.starts_with(path)
        }
        self.explicit.retain(|p| !deeper(p, path));
        self.implicit.retain(|p| !deeper(p, path));
        self.dotted.retain(|p| !deeper(p, path));
        self.frozen.retain(|p| !deeper(p, path));
        self.array_tables.retain(|p| !deeper(p, path));
    }
}
