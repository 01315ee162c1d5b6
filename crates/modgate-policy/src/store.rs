// SPDX-License-Identifier: MIT OR Apache-2.0
//! Level-entry store collaborator.

use async_trait::async_trait;
use modgate_core::{PermissionLevelEntry, Principal, StoreError, TenantId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Source of persisted [`PermissionLevelEntry`] rows.
///
/// Implementations return the tenant's enabled entries matching the
/// principal. The order of the returned list is significant: the resolver
/// folds entries in that order unless configured to sort by level.
#[async_trait]
pub trait PermissionLevelStore: Send + Sync {
    /// Fetch the entries of `tenant` that match `principal`.
    async fn fetch_matching_entries(
        &self,
        tenant: TenantId,
        principal: &Principal,
    ) -> Result<Vec<PermissionLevelEntry>, StoreError>;
}

#[async_trait]
impl<S: PermissionLevelStore + ?Sized> PermissionLevelStore for Arc<S> {
    async fn fetch_matching_entries(
        &self,
        tenant: TenantId,
        principal: &Principal,
    ) -> Result<Vec<PermissionLevelEntry>, StoreError> {
        (**self).fetch_matching_entries(tenant, principal).await
    }
}

/// In-memory store keeping entries in insertion order.
///
/// Counts fetches and can be switched into an unavailable state, which makes
/// it useful for exercising cache and failure behaviour.
#[derive(Debug, Default)]
pub struct InMemoryLevelStore {
    entries: Mutex<Vec<PermissionLevelEntry>>,
    fetches: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryLevelStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = PermissionLevelEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Append an entry.
    pub fn insert(&self, entry: PermissionLevelEntry) {
        self.lock().push(entry);
    }

    /// Replace every entry.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = PermissionLevelEntry>) {
        *self.lock() = entries.into_iter().collect();
    }

    /// Number of completed or failed fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Make subsequent fetches fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PermissionLevelEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PermissionLevelStore for InMemoryLevelStore {
    async fn fetch_matching_entries(
        &self,
        tenant: TenantId,
        principal: &Principal,
    ) -> Result<Vec<PermissionLevelEntry>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store marked unavailable"));
        }
        Ok(self
            .lock()
            .iter()
            .filter(|e| e.guild_id == tenant && e.matches(principal))
            .cloned()
            .collect())
    }
}
