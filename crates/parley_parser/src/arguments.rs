//! Bound arguments and the pool their storage is rented from.
//!
//! Every invocation rents an [`ArgumentCollection`] from an [`ArgumentPool`].
//! The binder fills it, the handler reads it, and when the last owner drops
//! it the cleared storage goes back to the pool.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use parley_foundation::{ArgType, EnumValue, Value};

/// A value bound to an argument, with the type it was declared as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundArgument {
    /// The parsed (or default) value.
    pub value: Value,
    /// The declared type.
    pub ty: ArgType,
}

type Entries = IndexMap<String, BoundArgument>;

struct PoolShared {
    free: Mutex<Vec<Entries>>,
    capacity: usize,
    outstanding: AtomicUsize,
}

/// A bounded free list of argument storage.
///
/// Cloning the pool shares it.
#[derive(Clone)]
pub struct ArgumentPool {
    shared: Arc<PoolShared>,
}

impl fmt::Debug for ArgumentPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentPool")
            .field("capacity", &self.shared.capacity)
            .field("available", &self.available())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl Default for ArgumentPool {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ArgumentPool {
    /// Creates a pool that keeps at most `capacity` idle collections.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Rents an empty collection.
    #[must_use]
    pub fn rent(&self) -> ArgumentCollection {
        let entries = self.shared.free.lock().pop().unwrap_or_default();
        self.shared.outstanding.fetch_add(1, Ordering::Relaxed);
        ArgumentCollection {
            entries,
            pool: Some(Arc::clone(&self.shared)),
        }
    }

    /// Idle collections ready to be rented.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.free.lock().len()
    }

    /// Collections rented and not yet returned.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Relaxed)
    }
}

/// The bound arguments of one invocation, keyed by lower-cased name.
///
/// Iteration follows binding order, which is declaration order.
pub struct ArgumentCollection {
    entries: Entries,
    pool: Option<Arc<PoolShared>>,
}

impl ArgumentCollection {
    /// Creates a collection that does not belong to any pool.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            entries: Entries::new(),
            pool: None,
        }
    }

    /// Binds a value, replacing any earlier binding of the same name.
    pub fn insert(&mut self, name: &str, value: Value, ty: ArgType) {
        self.entries
            .insert(name.to_lowercase(), BoundArgument { value, ty });
    }

    /// The binding for `name` (case-insensitive).
    #[must_use]
    pub fn bound(&self, name: &str) -> Option<&BoundArgument> {
        self.entries.get(&name.to_lowercase())
    }

    /// The value bound to `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bound(name).map(|b| &b.value)
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// Number of bound arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, binding)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundArgument)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The string bound to `name`.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The integer bound to `name`.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// The number bound to `name`; integers are widened.
    #[must_use]
    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    /// The boolean bound to `name`.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// The list bound to `name`.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&im::Vector<Value>> {
        self.get(name).and_then(Value::as_list)
    }

    /// The dictionary bound to `name`.
    #[must_use]
    pub fn map(&self, name: &str) -> Option<&IndexMap<Value, Value>> {
        self.get(name).and_then(Value::as_map)
    }

    /// The enum variant bound to `name`.
    #[must_use]
    pub fn enum_variant(&self, name: &str) -> Option<&EnumValue> {
        self.get(name).and_then(Value::as_enum)
    }
}

impl Drop for ArgumentCollection {
    fn drop(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };
        let mut entries = std::mem::take(&mut self.entries);
        entries.clear();
        {
            let mut free = pool.free.lock();
            if free.len() < pool.capacity {
                free.push(entries);
            }
        }
        pool.outstanding.fetch_sub(1, Ordering::Relaxed);
    }
}

impl PartialEq for ArgumentCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for ArgumentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, b)| (k, &b.value)))
            .finish()
    }
}
