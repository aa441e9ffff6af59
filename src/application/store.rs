//! Per-limiter signature state.
//!
//! Pairs the counter storage with the clock that stamps every access, so
//! the limiter never reads time outside of a storage operation.

use crate::application::ports::{Clock, Storage};
use crate::domain::{counter::WindowCounter, signature::ErrorSignature};
use std::sync::Arc;
use std::time::Instant;

/// Signature to counter map owned by one limiter.
///
/// Generic over the storage backend. In production, use
/// `Arc<ShardedStorage<ErrorSignature, WindowCounter>>`.
#[derive(Debug, Clone)]
pub struct SignatureStore<S>
where
    S: Storage<ErrorSignature, WindowCounter> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> SignatureStore<S>
where
    S: Storage<ErrorSignature, WindowCounter> + Clone,
{
    /// Create a store over `storage`, stamping accesses with `clock`.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Run a read-modify-write on the counter of `signature`.
    ///
    /// The callback receives the stored counter (if any) and the current
    /// time, and returns the counter to store plus a result. The time is
    /// read after the key is locked, so decisions on one signature see
    /// non-decreasing timestamps.
    pub fn with_counter<F, R>(&self, signature: ErrorSignature, f: F) -> R
    where
        F: FnOnce(Option<&WindowCounter>, Instant) -> (WindowCounter, R),
    {
        let clock = &self.clock;
        self.storage
            .update(signature, |existing| f(existing, clock.now()))
    }

    /// Copy of the stored counter for `signature`.
    pub fn counter(&self, signature: &ErrorSignature) -> Option<WindowCounter> {
        self.storage.inspect(signature, |counter| *counter)
    }

    /// Drop the counter for `signature`. Returns true if one existed.
    pub fn remove(&self, signature: &ErrorSignature) -> bool {
        self.storage.remove(signature)
    }

    /// Number of tracked signatures.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no signature is tracked.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop every counter.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Visit every counter.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&WindowCounter),
    {
        self.storage.for_each(|_, counter| f(counter));
    }

    /// Keep only counters for which `keep` returns true.
    ///
    /// Returns the number of counters removed.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&WindowCounter) -> bool,
    {
        let mut removed = 0;
        self.storage.retain(|_, counter| {
            let kept = keep(counter);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }
}
