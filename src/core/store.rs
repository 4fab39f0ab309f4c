//! Purpose: Define the string key-value capability tables persist through.
//! Exports: `Store`, `MemoryStore`.
//! Role: Seam between table logic and whatever host persistence is available.
//! Invariants: Stores are synchronous; a returned `Ok` means the write is visible to the next `get`.
//! Invariants: Host failures (including "store full") surface as errors, never as silent drops.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::error::Error;

/// A synchronous, string-keyed, string-valued persistence surface.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }
}

/// Lets several live tables share one store. Each table still caches its own
/// index, so handles over the same table name need `Table::reload` to see
/// each other's writes.
impl<S: Store + ?Sized> Store for Rc<RefCell<S>> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.borrow_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.borrow_mut().remove(key)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

impl FromIterator<(String, String)> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
