// SPDX-License-Identifier: MIT OR Apache-2.0
//! Effective-permission resolution.
//!
//! The resolver asks the store for the tenant entries matching a principal,
//! folds them into one [`EffectivePermissions`] value and caches it per
//! `(tenant, principal)`.
//!
//! Concurrent misses for the same key are not coalesced. Each caller fetches
//! from the store on its own and writes its result to the cache, so the last
//! writer wins. Callers that need single-flight behaviour must add it
//! themselves.

use crate::cache::PermissionCache;
use crate::registry::{CustomPermission, PermissionRegistry};
use crate::store::PermissionLevelStore;
use modgate_core::{
    Clock, MergeOrder, NativePermissions, PermissionLevelEntry, Principal, StoreError, Subject,
    TenantId, duration_ms,
};
use modgate_error::GateError;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default cache time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default cache capacity.
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// The permissions a principal holds in one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    /// Highest level among matching entries, or 0.
    pub level: u32,
    /// Native bits after applying every grant and deny.
    pub native_permissions: NativePermissions,
    /// Custom permissions after applying every grant and deny.
    pub custom_permissions: HashSet<CustomPermission>,
    /// Bypass flag; when set every requirement is satisfied.
    pub grant_all: bool,
}

impl EffectivePermissions {
    /// Whether these permissions cover every required native bit and every
    /// required custom permission.
    pub fn satisfies(&self, native: NativePermissions, custom: &[CustomPermission]) -> bool {
        if self.grant_all {
            return true;
        }
        self.native_permissions.contains(native)
            && custom.iter().all(|p| self.custom_permissions.contains(p))
    }
}

/// Fold `entries` into effective permissions for `principal`, in slice order.
///
/// Entries that do not match the principal are ignored. Custom keys missing
/// from `registry` are skipped with a warning.
pub fn merge_entries(
    principal: &Principal,
    entries: &[PermissionLevelEntry],
    registry: &PermissionRegistry,
) -> EffectivePermissions {
    let mut acc = EffectivePermissions {
        native_permissions: principal.native_permissions,
        ..EffectivePermissions::default()
    };

    for entry in entries.iter().filter(|e| e.matches(principal)) {
        acc.level = acc.level.max(entry.level);
        acc.native_permissions = (acc.native_permissions | entry.granted_native_permissions)
            .difference(entry.denied_native_permissions);

        for key in &entry.granted_custom_permission_keys {
            match registry.try_resolve(key) {
                Some(p) => {
                    acc.custom_permissions.insert(p);
                }
                None => skip_unknown(key, entry),
            }
        }
        for key in &entry.denied_custom_permission_keys {
            match registry.try_resolve(key) {
                Some(p) => {
                    acc.custom_permissions.remove(&p);
                }
                None => skip_unknown(key, entry),
            }
        }
    }
    acc
}

fn skip_unknown(key: &str, entry: &PermissionLevelEntry) {
    warn!(
        target: "modgate.resolver",
        key,
        tenant = %entry.guild_id,
        level = entry.level,
        "skipping unregistered custom permission"
    );
}

// ---------------------------------------------------------------------------
// Errors and options
// ---------------------------------------------------------------------------

/// Failure while resolving permissions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The level store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ResolveError> for GateError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Store(e) => e.into(),
        }
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// How long a computed result is reused. Zero disables caching.
    pub cache_ttl: Duration,
    /// Maximum number of cached results.
    pub cache_capacity: NonZeroUsize,
    /// Order in which matching entries are folded.
    pub merge_order: MergeOrder,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            merge_order: MergeOrder::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Computes and caches [`EffectivePermissions`].
pub struct PermissionResolver {
    store: Arc<dyn PermissionLevelStore>,
    registry: Arc<PermissionRegistry>,
    clock: Arc<dyn Clock>,
    cache: PermissionCache,
    merge_order: MergeOrder,
}

impl PermissionResolver {
    /// Build a resolver over `store`, resolving custom keys through
    /// `registry`.
    pub fn new(
        store: Arc<dyn PermissionLevelStore>,
        registry: Arc<PermissionRegistry>,
        clock: Arc<dyn Clock>,
        options: ResolverOptions,
    ) -> Self {
        let ttl_ms = duration_ms(options.cache_ttl);
        Self {
            store,
            registry,
            clock,
            cache: PermissionCache::new(options.cache_capacity, ttl_ms),
            merge_order: options.merge_order,
        }
    }

    /// The registry custom keys are resolved through.
    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Effective permissions of a tenant member.
    ///
    /// Within the TTL repeated calls return the same `Arc` without touching
    /// the store.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Store`] if the store fails; nothing is cached then.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
        tenant: TenantId,
    ) -> Result<Arc<EffectivePermissions>, ResolveError> {
        let key = (tenant, principal.id);
        if let Some(hit) = self.cache.get(key, self.clock.now_ms()) {
            debug!(target: "modgate.resolver", tenant = %tenant, principal = %principal.id, "cache hit");
            return Ok(hit);
        }
        debug!(target: "modgate.resolver", tenant = %tenant, principal = %principal.id, "cache miss");

        let mut entries = self
            .store
            .fetch_matching_entries(tenant, principal)
            .await
            .inspect_err(|e| {
                warn!(
                    target: "modgate.resolver",
                    tenant = %tenant,
                    principal = %principal.id,
                    error = %e,
                    "level store fetch failed"
                );
            })?;
        self.merge_order.apply(&mut entries);

        let result = Arc::new(merge_entries(principal, &entries, &self.registry));
        debug!(
            target: "modgate.resolver",
            tenant = %tenant,
            principal = %principal.id,
            entries = entries.len(),
            level = result.level,
            "resolved permissions"
        );
        self.cache.insert(key, Arc::clone(&result), self.clock.now_ms());
        Ok(result)
    }

    /// Effective permissions of any subject.
    ///
    /// Bare users carry no membership context: they get level 0, no native
    /// bits and no custom permissions, and the store is not consulted.
    ///
    /// # Errors
    ///
    /// As [`effective_permissions`](Self::effective_permissions).
    pub async fn effective_permissions_for(
        &self,
        subject: &Subject,
        tenant: TenantId,
    ) -> Result<Arc<EffectivePermissions>, ResolveError> {
        match subject {
            Subject::Member(principal) => self.effective_permissions(principal, tenant).await,
            Subject::User(_) => Ok(Arc::new(EffectivePermissions::default())),
        }
    }

    /// Whether `subject` holds every bit of `native` and every permission in
    /// `custom` within `tenant`.
    ///
    /// # Errors
    ///
    /// As [`effective_permissions`](Self::effective_permissions).
    pub async fn has_permissions(
        &self,
        subject: &Subject,
        tenant: TenantId,
        native: NativePermissions,
        custom: &[CustomPermission],
    ) -> Result<bool, ResolveError> {
        let perms = self.effective_permissions_for(subject, tenant).await?;
        Ok(perms.satisfies(native, custom))
    }

    /// Number of cached results, expired ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("ttl_ms", &self.cache.ttl_ms())
            .field("merge_order", &self.merge_order)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_core::RoleId;

    fn registry(keys: &[&str]) -> PermissionRegistry {
        let reg = PermissionRegistry::new();
        reg.register_all(keys.iter().copied());
        reg
    }

    #[test]
    fn empty_merge_keeps_principal_bits() {
        let p = Principal::new(1u64).with_native(NativePermissions::SEND_MESSAGES);
        let eff = merge_entries(&p, &[], &registry(&[]));
        assert_eq!(eff.level, 0);
        assert_eq!(eff.native_permissions, NativePermissions::SEND_MESSAGES);
        assert!(eff.custom_permissions.is_empty());
        assert!(!eff.grant_all);
    }

    #[test]
    fn deny_can_strip_principal_native_bits() {
        let p = Principal::new(1u64)
            .with_role(RoleId(5))
            .with_native(NativePermissions::ATTACH_FILES | NativePermissions::SEND_MESSAGES);
        let entry = PermissionLevelEntry::new(1u64, 1)
            .with_role(5u64)
            .denying(NativePermissions::ATTACH_FILES);
        let eff = merge_entries(&p, &[entry], &registry(&[]));
        assert_eq!(eff.native_permissions, NativePermissions::SEND_MESSAGES);
    }

    #[test]
    fn custom_deny_after_grant_removes() {
        let reg = registry(&["ManageCases"]);
        let p = Principal::new(1u64);
        let entries = [
            PermissionLevelEntry::new(1u64, 1)
                .with_user(1u64)
                .granting_custom("ManageCases"),
            PermissionLevelEntry::new(1u64, 2)
                .with_user(1u64)
                .denying_custom("ManageCases"),
        ];
        assert!(merge_entries(&p, &entries, &reg).custom_permissions.is_empty());
        let reversed = [entries[1].clone(), entries[0].clone()];
        let eff = merge_entries(&p, &reversed, &reg);
        assert!(eff.custom_permissions.contains(&reg.register("ManageCases")));
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let reg = registry(&["Known"]);
        let p = Principal::new(1u64);
        let entry = PermissionLevelEntry::new(1u64, 3)
            .with_user(1u64)
            .granting_custom("Known")
            .granting_custom("RemovedExtension")
            .denying_custom("AlsoGone");
        let eff = merge_entries(&p, &[entry], &reg);
        assert_eq!(eff.level, 3);
        assert_eq!(eff.custom_permissions.len(), 1);
    }

    #[test]
    fn non_matching_entries_are_ignored() {
        let p = Principal::new(1u64);
        let entry = PermissionLevelEntry::new(1u64, 9)
            .with_user(2u64)
            .granting(NativePermissions::BAN_MEMBERS);
        let eff = merge_entries(&p, &[entry], &registry(&[]));
        assert_eq!(eff.level, 0);
        assert!(eff.native_permissions.is_empty());
    }

    #[test]
    fn satisfies_requires_all() {
        let reg = registry(&["A", "B"]);
        let a = reg.register("A");
        let b = reg.register("B");
        let eff = EffectivePermissions {
            native_permissions: NativePermissions::KICK_MEMBERS,
            custom_permissions: [a.clone()].into_iter().collect(),
            ..Default::default()
        };
        assert!(eff.satisfies(NativePermissions::KICK_MEMBERS, &[a.clone()]));
        assert!(!eff.satisfies(
            NativePermissions::KICK_MEMBERS | NativePermissions::BAN_MEMBERS,
            &[]
        ));
        assert!(!eff.satisfies(NativePermissions::NONE, &[a, b.clone()]));
        let all = EffectivePermissions {
            grant_all: true,
            ..Default::default()
        };
        assert!(all.satisfies(NativePermissions::ADMINISTRATOR, &[b]));
    }

    #[test]
    fn default_options() {
        let opts = ResolverOptions::default();
        assert_eq!(opts.cache_ttl, Duration::from_secs(60));
        assert_eq!(opts.cache_capacity.get(), 1000);
        assert_eq!(opts.merge_order, MergeOrder::StoreOrder);
    }
}
