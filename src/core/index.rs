//! Purpose: Cache the ordered list of row ids persisted under `<table>_list`.
//! Exports: `IndexCache`.
//! Role: Keeps the in-memory id list and the stored index in lockstep.
//! Invariants: `Unloaded` and "loaded but empty" are distinct states.
//! Invariants: Every mutation writes the full ordered list back before returning.
//! Invariants: An id appears at most once, compared by the detail key it addresses.
use tracing::debug;

use crate::core::error::Error;
use crate::core::keys::RowId;
use crate::core::store::Store;
use crate::json::parse;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IndexCache {
    #[default]
    Unloaded,
    Loaded(Vec<RowId>),
}

impl IndexCache {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Loads from the store on first use. A missing index entry is created empty.
    pub fn ids<S: Store + ?Sized>(&mut self, store: &mut S, key: &str) -> Result<&[RowId], Error> {
        Ok(self.loaded_mut(store, key)?.as_slice())
    }

    pub fn contains<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
        id: &RowId,
    ) -> Result<bool, Error> {
        Ok(self.ids(store, key)?.iter().any(|listed| listed.same_key(id)))
    }

    /// Returns `false` when `id`, or an id sharing its detail key, was already
    /// listed (nothing is written).
    pub fn append<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
        id: RowId,
    ) -> Result<bool, Error> {
        let ids = self.loaded_mut(store, key)?;
        if ids.iter().any(|listed| listed.same_key(&id)) {
            return Ok(false);
        }
        ids.push(id);
        persist(store, key, ids)?;
        Ok(true)
    }

    /// The list is written back even when `id` was absent.
    pub fn remove<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
        id: &RowId,
    ) -> Result<bool, Error> {
        let ids = self.loaded_mut(store, key)?;
        let before = ids.len();
        ids.retain(|existing| !existing.same_key(id));
        let removed = ids.len() != before;
        persist(store, key, ids)?;
        Ok(removed)
    }

    pub fn reset(&mut self) {
        *self = Self::Unloaded;
    }

    /// Creates the stored index if absent. Leaves an existing one untouched.
    pub fn ensure<S: Store + ?Sized>(store: &mut S, key: &str) -> Result<bool, Error> {
        if store.get(key)?.is_some() {
            return Ok(false);
        }
        persist(store, key, &[])?;
        debug!(key, "created empty index");
        Ok(true)
    }

    fn loaded_mut<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
    ) -> Result<&mut Vec<RowId>, Error> {
        if let Self::Unloaded = self {
            let ids = match store.get(key)? {
                Some(text) => parse::from_str::<Vec<RowId>>(&text, "table index")
                    .map_err(|err| err.with_key(key))?,
                None => {
                    Self::ensure(store, key)?;
                    Vec::new()
                }
            };
            debug!(key, count = ids.len(), "loaded index");
            *self = Self::Loaded(ids);
        }
        match self {
            Self::Loaded(ids) => Ok(ids),
            Self::Unloaded => unreachable!("index was loaded above"),
        }
    }
}

fn persist<S: Store + ?Sized>(store: &mut S, key: &str, ids: &[RowId]) -> Result<(), Error> {
    let text = parse::to_string(ids, "table index")?;
    store.set(key, &text)
}
