// SPDX-License-Identifier: MIT OR Apache-2.0
//! Source of per-tenant rate-limit settings.

use async_trait::async_trait;
use modgate_core::{StoreError, TenantId, TenantRateLimitConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Looks up a tenant's rate-limit configuration.
#[async_trait]
pub trait RateLimitSettingsSource: Send + Sync {
    /// The tenant's configuration, or `None` if it has none.
    async fn fetch_settings(
        &self,
        tenant: TenantId,
    ) -> Result<Option<TenantRateLimitConfig>, StoreError>;
}

#[async_trait]
impl<S: RateLimitSettingsSource + ?Sized> RateLimitSettingsSource for Arc<S> {
    async fn fetch_settings(
        &self,
        tenant: TenantId,
    ) -> Result<Option<TenantRateLimitConfig>, StoreError> {
        (**self).fetch_settings(tenant).await
    }
}

/// In-memory settings, typically loaded from configuration at startup.
#[derive(Debug, Default)]
pub struct StaticRateLimitSettings {
    tenants: RwLock<HashMap<TenantId, TenantRateLimitConfig>>,
    unavailable: AtomicBool,
}

impl StaticRateLimitSettings {
    /// No tenant has settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloaded settings.
    pub fn from_map(tenants: impl IntoIterator<Item = (TenantId, TenantRateLimitConfig)>) -> Self {
        Self {
            tenants: RwLock::new(tenants.into_iter().collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Insert or replace a tenant's settings.
    pub fn set(&self, tenant: TenantId, config: TenantRateLimitConfig) {
        self.tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant, config);
    }

    /// Remove a tenant's settings.
    pub fn remove(&self, tenant: TenantId) -> Option<TenantRateLimitConfig> {
        self.tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tenant)
    }

    /// Make lookups fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RateLimitSettingsSource for StaticRateLimitSettings {
    async fn fetch_settings(
        &self,
        tenant: TenantId,
    ) -> Result<Option<TenantRateLimitConfig>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("rate-limit settings unavailable"));
        }
        Ok(self
            .tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tenant)
            .cloned())
    }
}
