//! Coalescing of concurrent identical productions.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

type Slot<V> = Arc<OnceCell<V>>;
type Slots<K, V> = Mutex<HashMap<K, Entry<V>>>;

struct Entry<V> {
    slot: Slot<V>,
    callers: usize,
}

/// Map from an in-progress production to its shared result.
///
/// The first caller for a key runs the production; callers arriving while it
/// runs await the same result. The entry is dropped once the result is
/// available, so later callers start afresh (and normally hit the cache).
///
/// If the running caller is cancelled, one of the waiters takes over. When
/// the last caller for a key is cancelled the entry is dropped with it.
///
/// The map lock is never held across an `.await`.
pub struct InFlight<K, V> {
    slots: Slots<K, V>,
}

impl<K, V> InFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Run `produce` for `key`, or join a production already under way.
    pub async fn run<F, Fut>(&self, key: K, produce: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            let entry = slots.entry(key.clone()).or_insert_with(|| Entry {
                slot: Arc::default(),
                callers: 0,
            });
            entry.callers += 1;
            Arc::clone(&entry.slot)
        };

        let _release = Release {
            slots: &self.slots,
            key: &key,
            slot: &slot,
        };

        slot.get_or_init(produce).await.clone()
    }

    /// Number of productions currently tracked.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.slots).is_empty()
    }
}

impl<K, V> Default for InFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<K, V>(slots: &Slots<K, V>) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
    // Every critical section leaves the map consistent, so a poisoned lock is
    // still usable
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signs a caller out of its entry when it finishes or is dropped.
///
/// A finished entry is always removed. An unfinished one is removed with its
/// last caller.
struct Release<'a, K: Hash + Eq, V> {
    slots: &'a Slots<K, V>,
    key: &'a K,
    slot: &'a Slot<V>,
}

impl<K: Hash + Eq, V> Drop for Release<'_, K, V> {
    fn drop(&mut self) {
        let mut slots = lock(self.slots);
        let Some(entry) = slots.get_mut(self.key) else {
            return;
        };
        if !Arc::ptr_eq(&entry.slot, self.slot) {
            return;
        }

        entry.callers = entry.callers.saturating_sub(1);
        if entry.callers == 0 || entry.slot.initialized() {
            slots.remove(self.key);
        }
    }
}
