//! Purpose: Schema-validated rows persisted through a string key-value `Store`.
//! Exports: `Table`, `Row`.
//! Role: Owns key derivation, the id index cache, row CRUD, and filtered scans.
//! Invariants: Every listed id has a detail entry and vice versa, modulo host store failures.
//! Invariants: Detail is written before its id is listed; an id is unlisted before its detail is removed.
//! Invariants: Persisted payloads never contain the `id` key; the id is reattached on read.
//! Invariants: A failed validation leaves the store untouched.
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::index::IndexCache;
use crate::core::keys::{self, RowId};
use crate::core::lookup::{Criteria, Lookup};
use crate::core::schema::{ID_FIELD, Schema};
use crate::core::store::Store;
use crate::json::parse;

/// A decoded row: its id plus the persisted field mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    id: RowId,
    fields: Map<String, Value>,
}

impl Row {
    pub fn new(id: RowId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> &RowId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// `get("id")` yields the row id.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == ID_FIELD {
            return Some(self.id.as_value());
        }
        self.fields.get(field)
    }

    /// The row as one JSON object with `id` attached.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(ID_FIELD.to_string(), self.id.as_value().clone());
        Value::Object(object)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// A named table over a store. One live `Table` per name and store is
/// assumed; use `reload` after another writer touched the same keys.
pub struct Table<S: Store> {
    store: S,
    name: String,
    schema: Schema,
    index_key: String,
    index: IndexCache,
}

impl<S: Store> Table<S> {
    /// Builds the handle and ensures the stored index exists.
    pub fn new(store: S, name: impl Into<String>, schema: Schema) -> Result<Self, Error> {
        let name = name.into();
        keys::check_table_name(&name)?;
        let mut table = Self {
            store,
            index_key: keys::index_key(&name),
            name,
            schema,
            index: IndexCache::Unloaded,
        };
        table.create()?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Idempotent: an existing index is left as is.
    pub fn create(&mut self) -> Result<(), Error> {
        if IndexCache::ensure(&mut self.store, &self.index_key)? {
            debug!(table = %self.name, "created table");
        }
        Ok(())
    }

    /// Removes every listed row and the index itself. The cache returns to
    /// unloaded, so the next call recreates an empty index.
    pub fn drop(&mut self) -> Result<(), Error> {
        let ids = self.index.ids(&mut self.store, &self.index_key)?.to_vec();
        for id in &ids {
            self.store.remove(&keys::detail_key(&self.name, id))?;
        }
        self.store.remove(&self.index_key)?;
        self.index.reset();
        debug!(table = %self.name, rows = ids.len(), "dropped table");
        Ok(())
    }

    /// Forgets the cached index; the next operation rereads it from the store.
    pub fn reload(&mut self) {
        self.index.reset();
    }

    pub fn get(&self, id: impl Into<RowId>) -> Result<Row, Error> {
        let id = id.into();
        let key = keys::detail_key(&self.name, &id);
        let Some(text) = self.store.get(&key)? else {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("row `{id}` not found in table `{}`", self.name))
                .with_key(key));
        };
        let mut fields: Map<String, Value> =
            parse::from_str(&text, "row detail").map_err(|err| err.with_key(&key))?;
        fields.remove(ID_FIELD);
        Ok(Row::new(id, fields))
    }

    pub fn exists(&self, id: impl Into<RowId>) -> bool {
        self.get(id).is_ok()
    }

    pub fn insert(&mut self, id: impl Into<RowId>, data: &Map<String, Value>) -> Result<(), Error> {
        let id = id.into();
        match self.get(id.clone()) {
            Ok(_) => {
                return Err(Error::new(ErrorKind::AlreadyExists)
                    .with_message(format!("row `{id}` already exists in table `{}`", self.name))
                    .with_key(keys::detail_key(&self.name, &id)));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let fields = self.checked(&id, data)?;
        self.write_detail(&id, &fields)?;
        self.index.append(&mut self.store, &self.index_key, id.clone())?;
        debug!(table = %self.name, %id, "inserted row");
        Ok(())
    }

    /// Merges `data` over the stored row, or over nothing when the id is new.
    /// A new id is created as if inserted.
    pub fn update(&mut self, id: impl Into<RowId>, data: &Map<String, Value>) -> Result<(), Error> {
        let id = id.into();
        let (mut merged, existed) = match self.get(id.clone()) {
            Ok(row) => (row.into_fields(), true),
            Err(err) if err.kind() == ErrorKind::NotFound => (Map::new(), false),
            Err(err) => return Err(err),
        };
        for (field, value) in data {
            merged.insert(field.clone(), value.clone());
        }

        let fields = self.checked(&id, &merged)?;
        self.write_detail(&id, &fields)?;
        // Also relists a detail entry the index lost track of.
        self.index.append(&mut self.store, &self.index_key, id.clone())?;
        debug!(table = %self.name, %id, created = !existed, "updated row");
        Ok(())
    }

    /// Deleting an absent id is a no-op.
    pub fn delete(&mut self, id: impl Into<RowId>) -> Result<(), Error> {
        let id = id.into();
        let listed = self.index.remove(&mut self.store, &self.index_key, &id)?;
        self.store.remove(&keys::detail_key(&self.name, &id))?;
        if listed {
            debug!(table = %self.name, %id, "deleted row");
        }
        Ok(())
    }

    pub fn count(&mut self) -> Result<usize, Error> {
        Ok(self.index.ids(&mut self.store, &self.index_key)?.len())
    }

    /// Row ids in index order.
    pub fn ids(&mut self) -> Result<Vec<RowId>, Error> {
        Ok(self.index.ids(&mut self.store, &self.index_key)?.to_vec())
    }

    pub fn all(&mut self) -> Result<Vec<Row>, Error> {
        self.filter(&Criteria::All)
    }

    /// Rows matching `criteria`, in index order. Listed ids whose detail entry
    /// is missing or unreadable are logged and skipped.
    pub fn filter(&mut self, criteria: &Criteria<'_>) -> Result<Vec<Row>, Error> {
        let ids = self.ids()?;
        let mut rows = Vec::new();
        for id in ids {
            match self.get(id) {
                Ok(row) => {
                    if criteria.matches(&row) {
                        rows.push(row);
                    }
                }
                Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Corrupt) => {
                    warn!(table = %self.name, error = %err, "skipping unreadable row");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(rows)
    }

    /// Compiles `{field: {op: value}}` before reading any row.
    pub fn filter_lookup(&mut self, spec: &Value) -> Result<Vec<Row>, Error> {
        let lookup = Lookup::compile(spec)?;
        self.filter(&Criteria::Lookup(lookup))
    }

    pub fn filter_by(&mut self, predicate: impl Fn(&Row) -> bool) -> Result<Vec<Row>, Error> {
        self.filter(&Criteria::predicate(predicate))
    }

    fn checked(&self, id: &RowId, data: &Map<String, Value>) -> Result<Map<String, Value>, Error> {
        let mut data = data.clone();
        data.remove(ID_FIELD);
        self.schema.validate(&data).map_err(|issues| {
            Error::new(ErrorKind::Validation)
                .with_message(format!(
                    "row `{id}` failed validation for table `{}` ({} issue(s))",
                    self.name,
                    issues.len()
                ))
                .with_key(keys::detail_key(&self.name, id))
                .with_issues(issues)
        })
    }

    fn write_detail(&mut self, id: &RowId, fields: &Map<String, Value>) -> Result<(), Error> {
        let text = parse::to_string(fields, "row detail")?;
        self.store.set(&keys::detail_key(&self.name, id), &text)
    }
}

impl<S: Store> std::fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
