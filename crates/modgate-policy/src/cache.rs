// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounded, time-expiring cache of effective permissions.

use crate::resolver::EffectivePermissions;
use lru::LruCache;
use modgate_core::{PrincipalId, TenantId};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

type Key = (TenantId, PrincipalId);

struct Slot {
    value: Arc<EffectivePermissions>,
    expires_at_ms: u64,
}

/// LRU cache with a fixed time-to-live per entry.
///
/// Entries are dropped lazily: an expired entry is removed when it is next
/// looked up, or evicted when capacity is reached.
pub struct PermissionCache {
    slots: Mutex<LruCache<Key, Slot>>,
    ttl_ms: u64,
}

impl PermissionCache {
    /// A cache holding at most `capacity` results for `ttl_ms` each. A zero
    /// TTL disables caching.
    pub fn new(capacity: NonZeroUsize, ttl_ms: u64) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            ttl_ms,
        }
    }

    /// The unexpired value for `key` at time `now_ms`, if any.
    pub fn get(&self, key: Key, now_ms: u64) -> Option<Arc<EffectivePermissions>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&key) {
            Some(slot) if now_ms < slot.expires_at_ms => return Some(Arc::clone(&slot.value)),
            Some(_) => {}
            None => return None,
        }
        slots.pop(&key);
        None
    }

    /// Store `value` for `key`, replacing any previous value.
    pub fn insert(&self, key: Key, value: Arc<EffectivePermissions>, now_ms: u64) {
        if self.ttl_ms == 0 {
            return;
        }
        let slot = Slot {
            value,
            expires_at_ms: now_ms.saturating_add(self.ttl_ms),
        };
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, slot);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured time-to-live.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(p: u64) -> Key {
        (TenantId(1), PrincipalId(p))
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn hit_until_ttl_then_miss() {
        let cache = PermissionCache::new(cap(4), 100);
        let value = Arc::new(EffectivePermissions::default());
        cache.insert(key(1), Arc::clone(&value), 1_000);
        assert!(Arc::ptr_eq(&cache.get(key(1), 1_099).unwrap(), &value));
        assert!(cache.get(key(1), 1_100).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PermissionCache::new(cap(2), 1_000);
        let v = Arc::new(EffectivePermissions::default());
        cache.insert(key(1), Arc::clone(&v), 0);
        cache.insert(key(2), Arc::clone(&v), 0);
        assert!(cache.get(key(1), 1).is_some());
        cache.insert(key(3), Arc::clone(&v), 2);
        assert!(cache.get(key(2), 3).is_none());
        assert!(cache.get(key(1), 3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_ttl_never_stores() {
        let cache = PermissionCache::new(cap(2), 0);
        cache.insert(key(1), Arc::new(EffectivePermissions::default()), 0);
        assert!(cache.is_empty());
    }
}
