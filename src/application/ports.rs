//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Implementations must run `update` as one atomic step per key: no other
/// `update`, `remove` or `retain` may observe or change the entry while the
/// closure runs. The admission decision is a read-then-write and relies on it.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Read-modify-write one entry.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `f` - Receives the current value (if any) and returns the value to
    ///   store together with a result for the caller
    ///
    /// # Returns
    /// The result from the closure
    fn update<F, R>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (V, R);

    /// Read one entry without modifying it.
    fn inspect<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R;

    /// Remove one entry. Returns true if it existed.
    fn remove(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}
