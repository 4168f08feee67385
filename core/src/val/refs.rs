use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::fault::Fault;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new, sorted_keys};

use super::{Type, Val};

/// Shared, mutable storage behind a reference value.
///
/// Every slot holding the same reference holds a clone of the same `Shared`,
/// so a write through one alias is visible through all of them. The engine
/// adds no further synchronization; concurrent mutation is the program's
/// business.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    // A panic while holding the lock cannot leave the containers below in a
    // torn state, so poisoning is ignored.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Shared<T> {
    // Containers may reference themselves; print the handle only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:p})", Arc::as_ptr(&self.0))
    }
}

/// Array with a declared element type. Each element keeps its own
/// nullability.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub elem: Type,
    pub items: Vec<Val>,
}

impl ArrayValue {
    pub fn new(elem: Type, items: Vec<Val>) -> Self {
        Self { elem, items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: i64) -> Result<Val, Fault> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .cloned()
            .ok_or(Fault::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
    }

    /// Stores `value` at `index`, growing the array with element defaults
    /// when `index` is past the end.
    pub fn set(&mut self, index: i64, value: Val) -> Result<(), Fault> {
        let i = usize::try_from(index).map_err(|_| Fault::IndexOutOfRange {
            index,
            len: self.items.len(),
        })?;
        if i >= self.items.len() {
            let fill = self.elem.default_value();
            self.items.resize(i + 1, fill);
        }
        self.items[i] = value;
        Ok(())
    }
}

/// String-keyed map. A key bound to null is present; an unbound key is not.
#[derive(Debug, Clone, Default)]
pub struct MapValue {
    entries: FastHashMap<Arc<str>, Val>,
}

impl MapValue {
    pub fn new() -> Self {
        Self {
            entries: fast_hash_map_new(),
        }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Arc<str>, Val)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Val, Fault> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Fault::KeyNotFound(key.to_string()))
    }

    pub fn insert<K: Into<Arc<str>>>(&mut self, key: K, value: Val) -> Option<Val> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Val> {
        self.entries.remove(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<Arc<str>> {
        sorted_keys(&self.entries)
    }

    /// Entries ordered by key.
    pub fn sorted_entries(&self) -> Vec<(Arc<str>, Val)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.entries.get(&k).cloned().map(|v| (k, v)))
            .collect()
    }
}

/// Instance of a declared struct type; fields keep declaration order.
#[derive(Debug, Clone)]
pub struct StructValue {
    pub name: Arc<str>,
    pub fields: Vec<(Arc<str>, Val)>,
}

impl StructValue {
    pub fn new<S: Into<Arc<str>>>(name: S, fields: Vec<(Arc<str>, Val)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Result<Val, Fault> {
        self.fields
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Fault::AnalyzerDefect(format!("struct '{}' has no field '{}'", self.name, name)))
    }

    pub fn set_field(&mut self, name: &str, value: Val) -> Result<(), Fault> {
        match self.fields.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(Fault::AnalyzerDefect(format!(
                "struct '{}' has no field '{}'",
                self.name, name
            ))),
        }
    }
}

/// Connector instance; actions receive it as their first argument.
#[derive(Debug, Clone)]
pub struct ConnectorValue {
    pub name: Arc<str>,
    pub args: Vec<Val>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageValue {
    pub payload: String,
    pub headers: FastHashMap<Arc<str>, Arc<str>>,
}
