// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Per-thread analysis state
//!
//! Each thread sees its own gatelock set, recursive lock counts and current
//! segment. State lives in thread-local storage keyed by store instance, so
//! independent analyses running in the same process never observe each
//! other's state and no synchronization is needed to read or update it.
//!
//! Dropping a store clears the dropping thread's entry at once. Entries other
//! threads hold for a dropped store are pruned the next time those threads
//! touch any store.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dyno_core::{EnvValue, ProviderRegistry};
use parking_lot::RwLock;
use tracing::warn;

use crate::ids::{LockId, SegmentId};
use crate::keys;

/// Analysis state of one thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadState {
    /// Locks currently held
    pub gatelocks: BTreeSet<LockId>,
    /// Reentrancy depth of recursive locks, absent when zero
    pub recursive_lock_counts: HashMap<LockId, usize>,
    pub current_segment: Option<SegmentId>,
}

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Ids of stores not yet dropped
static LIVE_STORES: RwLock<BTreeSet<u64>> = parking_lot::const_rwlock(BTreeSet::new());
/// Bumped on every store drop
static STORE_DROPS: AtomicU64 = AtomicU64::new(0);

#[derive(Default)]
struct ThreadStates {
    states: HashMap<u64, ThreadState>,
    drops_seen: u64,
}

impl ThreadStates {
    fn prune_dropped(&mut self) {
        let drops = STORE_DROPS.load(Ordering::Acquire);
        if drops == self.drops_seen {
            return;
        }
        self.drops_seen = drops;
        let live = LIVE_STORES.read();
        self.states.retain(|id, _| live.contains(id));
    }
}

thread_local! {
    static THREAD_STATES: RefCell<ThreadStates> = RefCell::new(ThreadStates::default());
}

/// Handle to per-thread state owned by one analysis instance
#[derive(Debug)]
pub struct ThreadStateStore {
    id: u64,
}

impl ThreadStateStore {
    pub fn new() -> Self {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        LIVE_STORES.write().insert(id);
        Self { id }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ThreadState) -> R) -> R {
        THREAD_STATES.with(|states| {
            let mut states = states.borrow_mut();
            states.prune_dropped();
            f(states.states.entry(self.id).or_default())
        })
    }

    /// Copy of the calling thread's state
    pub fn snapshot(&self) -> ThreadState {
        self.with(|state| state.clone())
    }

    /// Locks held by the calling thread, in ascending order
    pub fn gatelocks(&self) -> Vec<LockId> {
        self.with(|state| state.gatelocks.iter().copied().collect())
    }

    pub fn holds(&self, lock: LockId) -> bool {
        self.with(|state| state.gatelocks.contains(&lock))
    }

    /// Returns false if the lock was already held
    pub fn insert_gatelock(&self, lock: LockId) -> bool {
        self.with(|state| state.gatelocks.insert(lock))
    }

    /// Returns false if the lock was not held
    pub fn remove_gatelock(&self, lock: LockId) -> bool {
        self.with(|state| state.gatelocks.remove(&lock))
    }

    pub fn recursive_count(&self, lock: LockId) -> usize {
        self.with(|state| state.recursive_lock_counts.get(&lock).copied().unwrap_or(0))
    }

    /// Increment the reentrancy depth of `lock`, returning the previous depth
    pub fn increment_recursive(&self, lock: LockId) -> usize {
        self.with(|state| {
            let count = state.recursive_lock_counts.entry(lock).or_insert(0);
            *count += 1;
            *count - 1
        })
    }

    /// Decrement the reentrancy depth of `lock`, returning the new depth.
    ///
    /// Returns `None` and leaves the state untouched if the depth is already zero.
    pub fn decrement_recursive(&self, lock: LockId) -> Option<usize> {
        let remaining = self.with(|state| {
            let count = state.recursive_lock_counts.get_mut(&lock)?;
            *count -= 1;
            let remaining = *count;
            if remaining == 0 {
                state.recursive_lock_counts.remove(&lock);
            }
            Some(remaining)
        });
        if remaining.is_none() {
            warn!(lock = %lock, thread = ?std::thread::current().id(), "recursive release of a lock that is not held");
        }
        remaining
    }

    pub fn current_segment(&self) -> Option<SegmentId> {
        self.with(|state| state.current_segment)
    }

    /// Set the calling thread's current segment, returning the previous one
    pub fn set_current_segment(&self, segment: SegmentId) -> Option<SegmentId> {
        self.with(|state| state.current_segment.replace(segment))
    }

    /// Forget the calling thread's state
    pub fn clear(&self) {
        let _ = THREAD_STATES.try_with(|states| states.borrow_mut().states.remove(&self.id));
    }

    /// Register providers computing the per-thread environment keys from this store
    pub fn register_providers(self: &Arc<Self>, providers: &mut ProviderRegistry) {
        let store = Arc::clone(self);
        providers.computed(keys::GATELOCKS, [], move |_| Ok(Arc::new(store.gatelocks()) as EnvValue));

        let store = Arc::clone(self);
        providers.computed(keys::RECURSIVE_LOCK_COUNT, [keys::LOCK], move |env| {
            let lock: LockId = env.get(keys::LOCK)?;
            Ok(Arc::new(store.recursive_count(lock)) as EnvValue)
        });

        let store = Arc::clone(self);
        providers.computed(keys::CURRENT_SEGMENT, [], move |_| Ok(Arc::new(store.current_segment()) as EnvValue));
    }
}

impl Default for ThreadStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadStateStore {
    fn drop(&mut self) {
        self.clear();
        LIVE_STORES.write().remove(&self.id);
        STORE_DROPS.fetch_add(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::{DynoError, Environment};

    #[test]
    fn test_gatelock_set() {
        let store = ThreadStateStore::new();
        let (a, b) = (LockId(1), LockId(2));

        assert!(store.insert_gatelock(b));
        assert!(store.insert_gatelock(a));
        assert!(!store.insert_gatelock(a));
        assert_eq!(store.gatelocks(), vec![a, b]);
        assert!(store.holds(a));

        assert!(store.remove_gatelock(a));
        assert!(!store.remove_gatelock(a));
        assert_eq!(store.gatelocks(), vec![b]);
    }

    #[test]
    fn test_recursive_counts() {
        let store = ThreadStateStore::new();
        let lock = LockId(5);

        assert_eq!(store.increment_recursive(lock), 0);
        assert_eq!(store.increment_recursive(lock), 1);
        assert_eq!(store.recursive_count(lock), 2);
        assert_eq!(store.decrement_recursive(lock), Some(1));
        assert_eq!(store.decrement_recursive(lock), Some(0));
        assert_eq!(store.decrement_recursive(lock), None);
        assert!(store.snapshot().recursive_lock_counts.is_empty());
    }

    #[test]
    fn test_stores_are_isolated() {
        let first = ThreadStateStore::new();
        let second = ThreadStateStore::new();
        first.insert_gatelock(LockId(1));
        first.set_current_segment(SegmentId(9));

        assert!(second.gatelocks().is_empty());
        assert_eq!(second.current_segment(), None);
        assert_eq!(first.set_current_segment(SegmentId(10)), Some(SegmentId(9)));
    }

    #[test]
    fn test_threads_are_isolated() {
        let store = Arc::new(ThreadStateStore::new());
        store.insert_gatelock(LockId(1));

        let remote = Arc::clone(&store);
        let seen = std::thread::spawn(move || remote.gatelocks()).join().unwrap();
        assert!(seen.is_empty());
        assert_eq!(store.gatelocks(), vec![LockId(1)]);
    }

    #[test]
    fn test_drop_clears_current_thread() {
        let store = ThreadStateStore::new();
        let id = store.id;
        store.insert_gatelock(LockId(1));
        drop(store);
        assert!(THREAD_STATES.with(|states| !states.borrow().states.contains_key(&id)));
    }

    #[test]
    fn test_dropped_stores_are_pruned_on_other_threads() {
        let store = Arc::new(ThreadStateStore::new());
        let dead = store.id;
        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (dropped_tx, dropped_rx) = std::sync::mpsc::channel::<()>();

        let remote = Arc::clone(&store);
        let worker = std::thread::spawn(move || {
            remote.insert_gatelock(LockId(1));
            drop(remote);
            held_tx.send(()).unwrap();
            dropped_rx.recv().unwrap();

            let fresh = ThreadStateStore::new();
            fresh.insert_gatelock(LockId(2));
            THREAD_STATES.with(|states| states.borrow().states.contains_key(&dead))
        });

        held_rx.recv().unwrap();
        drop(store);
        dropped_tx.send(()).unwrap();
        assert!(!worker.join().unwrap());
    }

    #[test]
    fn test_providers() {
        let store = Arc::new(ThreadStateStore::new());
        let mut providers = ProviderRegistry::new();
        store.register_providers(&mut providers);
        let env = Environment::new(Arc::new(providers));

        store.insert_gatelock(LockId(4));
        store.increment_recursive(LockId(4));

        assert_eq!(env.get::<Vec<LockId>>(keys::GATELOCKS).unwrap(), vec![LockId(4)]);
        assert_eq!(env.get::<Option<SegmentId>>(keys::CURRENT_SEGMENT).unwrap(), None);
        assert!(!env.has(keys::RECURSIVE_LOCK_COUNT));
        assert_eq!(
            env.get::<usize>(keys::RECURSIVE_LOCK_COUNT),
            Err(DynoError::MissingExternalBinding { key: "lock" })
        );

        let env = env.bind(keys::LOCK, LockId(4));
        assert_eq!(env.get::<usize>(keys::RECURSIVE_LOCK_COUNT).unwrap(), 1);
    }
}
