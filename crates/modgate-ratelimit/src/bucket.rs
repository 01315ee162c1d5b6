// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rate-limit buckets and the keyed map holding them.

use modgate_core::{PrincipalId, TenantId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Counter and window state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Attempts counted in the current window.
    pub attempts: u32,
    /// Start of the current window, epoch ms.
    pub window_start_ms: u64,
    /// Absolute deadline after which the bucket may be swept, epoch ms.
    pub blocked_until_ms: u64,
}

impl Bucket {
    /// A bucket holding its first attempt.
    pub fn first(now_ms: u64, blocked_until_ms: u64) -> Self {
        Self {
            attempts: 1,
            window_start_ms: now_ms,
            blocked_until_ms,
        }
    }
}

/// Key of a global-tier bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalKey {
    /// Caller.
    pub principal: PrincipalId,
    /// Canonical command name.
    pub command: String,
}

/// Key of a tenant-tier bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantKey {
    /// Tenant the limit is configured in.
    pub tenant: TenantId,
    /// Caller.
    pub principal: PrincipalId,
    /// Canonical command name.
    pub command: String,
}

/// Map of buckets for one tier.
///
/// All mutation happens inside [`BucketStore::update`], whose closure runs
/// under a single lock and must not block.
#[derive(Debug)]
pub struct BucketStore<K> {
    buckets: Mutex<HashMap<K, Bucket>>,
}

impl<K> Default for BucketStore<K> {
    fn default() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> BucketStore<K> {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the bucket map.
    pub fn update<R>(&self, f: impl FnOnce(&mut HashMap<K, Bucket>) -> R) -> R {
        let mut map = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut map)
    }

    /// Copy of the bucket stored under `key`.
    pub fn get(&self, key: &K) -> Option<Bucket> {
        self.update(|m| m.get(key).copied())
    }

    /// Remove every bucket whose block deadline is before `now_ms`,
    /// returning how many were removed.
    pub fn sweep(&self, now_ms: u64) -> usize {
        self.update(|m| {
            let before = m.len();
            m.retain(|_, b| now_ms <= b.blocked_until_ms);
            before - m.len()
        })
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.update(|m| m.len())
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
