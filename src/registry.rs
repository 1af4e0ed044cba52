//! Keyed tables of creator functions.
//!
//! Every process-wide registry in the crate (blob fetchers, blob feeders,
//! operator schemas, gradient makers, CPU operators) is a `TypedRegistry`
//! behind a `lazy_static` `RwLock`. Built-in entries are inserted when the
//! lock is first touched; afterwards the table only grows.

use crate::error::Error;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct TypedRegistry<K, F> {
    name: &'static str,
    entries: HashMap<K, F>,
}

impl<K, F> TypedRegistry<K, F>
where
    K: Eq + Hash + Debug + Clone,
    F: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Builds a registry from built-in entries. Keys must be distinct.
    pub fn from_entries<I>(name: &'static str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
    {
        let entries: HashMap<K, F> = entries.into_iter().collect();
        debug_println!("{} populated with {} built-in entries", name, entries.len());
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Adds `creator` under `key`. A key can be registered once.
    pub fn register(&mut self, key: K, creator: F) -> Result<(), Error> {
        if self.entries.contains_key(&key) {
            return Err(Error::DuplicateRegistration(format!("{:?}", key), self.name));
        }
        debug_println!("{}: registered {:?}", self.name, key);
        self.entries.insert(key, creator);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<F> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Registries only hold creator functions and plain descriptors, so a panic
// while a guard was held cannot leave them half-updated.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
