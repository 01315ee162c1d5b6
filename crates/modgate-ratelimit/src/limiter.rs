// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-tier admission limiter.

use crate::bucket::{Bucket, BucketStore, GlobalKey, TenantKey};
use crate::settings::RateLimitSettingsSource;
use modgate_core::{Clock, CommandMetadata, PrincipalId, StoreError, TenantId};
use std::sync::Arc;
use tracing::{debug, info};

/// Decides whether an authorized command may run now.
///
/// Every call to [`is_rate_limited_with_hit`](Self::is_rate_limited_with_hit)
/// counts as an attempt.
pub struct AdmissionLimiter {
    global: BucketStore<GlobalKey>,
    tenant: BucketStore<TenantKey>,
    settings: Arc<dyn RateLimitSettingsSource>,
    clock: Arc<dyn Clock>,
}

impl AdmissionLimiter {
    /// Limiter reading tenant settings from `settings` and time from `clock`.
    pub fn new(settings: Arc<dyn RateLimitSettingsSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            global: BucketStore::new(),
            tenant: BucketStore::new(),
            settings,
            clock,
        }
    }

    /// Record an attempt of `command` by `principal` in `tenant` and report
    /// whether it is blocked.
    ///
    /// The global tier runs first and short-circuits on a block; the tenant
    /// tier is only consulted when the global tier lets the call through.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if tenant settings cannot be fetched. The global tier
    /// has already counted the attempt by then.
    pub async fn is_rate_limited_with_hit(
        &self,
        command: &CommandMetadata,
        tenant: TenantId,
        principal: PrincipalId,
    ) -> Result<bool, StoreError> {
        if self.global_hit(command, principal) {
            return Ok(true);
        }

        let Some(config) = self.settings.fetch_settings(tenant).await? else {
            return Ok(false);
        };
        let Some(limits) = config.resolve(&command.canonical_name) else {
            return Ok(false);
        };

        let now = self.clock.now_ms();
        let key = TenantKey {
            tenant,
            principal,
            command: command.canonical_name.clone(),
        };
        let blocked = self.tenant.update(|map| {
            let Some(b) = map.get_mut(&key) else {
                map.insert(key.clone(), Bucket::first(now, limits.blocked_until(now)));
                return false;
            };
            // Compares an elapsed duration against an absolute deadline.
            if now.saturating_sub(b.window_start_ms) > b.blocked_until_ms {
                map.remove(&key);
                return false;
            }
            if b.attempts >= limits.max_attempts {
                b.window_start_ms = now;
                b.blocked_until_ms = limits.blocked_until(now);
                return true;
            }
            b.attempts += 1;
            false
        });

        if blocked {
            info!(
                target: "modgate.ratelimit",
                tenant = %tenant,
                principal = %principal,
                command = %command.canonical_name,
                "tenant rate limit hit"
            );
        }
        Ok(blocked)
    }

    fn global_hit(&self, command: &CommandMetadata, principal: PrincipalId) -> bool {
        let Some(cooldown) = command.cooldown_ms else {
            return false;
        };
        let max_attempts = command.max_attempts.unwrap_or(1);
        let now = self.clock.now_ms();
        let deadline = now.saturating_add(cooldown);
        let key = GlobalKey {
            principal,
            command: command.canonical_name.clone(),
        };

        let blocked = self.global.update(|map| match map.get_mut(&key) {
            None => {
                map.insert(key.clone(), Bucket::first(now, deadline));
                false
            }
            Some(b) if now.saturating_sub(b.window_start_ms) > cooldown => {
                debug!(
                    target: "modgate.ratelimit",
                    principal = %principal,
                    command = %command.canonical_name,
                    "global window elapsed, resetting"
                );
                *b = Bucket::first(now, deadline);
                false
            }
            Some(b) if b.attempts >= max_attempts => {
                b.window_start_ms = now;
                b.blocked_until_ms = deadline;
                true
            }
            Some(b) => {
                b.attempts += 1;
                false
            }
        });

        if blocked {
            info!(
                target: "modgate.ratelimit",
                principal = %principal,
                command = %command.canonical_name,
                "global cooldown hit"
            );
        }
        blocked
    }

    /// Drop buckets whose block deadline has passed in both tiers, returning
    /// how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        self.global.sweep(now) + self.tenant.sweep(now)
    }

    /// Global-tier bucket for `(principal, command)`.
    pub fn global_bucket(&self, principal: PrincipalId, command: &str) -> Option<Bucket> {
        self.global.get(&GlobalKey {
            principal,
            command: command.to_string(),
        })
    }

    /// Tenant-tier bucket for `(tenant, principal, command)`.
    pub fn tenant_bucket(
        &self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
    ) -> Option<Bucket> {
        self.tenant.get(&TenantKey {
            tenant,
            principal,
            command: command.to_string(),
        })
    }

    /// Total number of buckets across both tiers.
    pub fn bucket_count(&self) -> usize {
        self.global.len() + self.tenant.len()
    }
}

impl std::fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("global_buckets", &self.global.len())
            .field("tenant_buckets", &self.tenant.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StaticRateLimitSettings;
    use modgate_core::ManualClock;

    fn limiter(clock: &ManualClock) -> AdmissionLimiter {
        AdmissionLimiter::new(
            Arc::new(StaticRateLimitSettings::new()),
            Arc::new(clock.clone()),
        )
    }

    #[tokio::test]
    async fn command_without_cooldown_skips_global_tier() {
        let clock = ManualClock::new(1_000);
        let l = limiter(&clock);
        let cmd = CommandMetadata::new("ping");
        for _ in 0..50 {
            assert!(!l.is_rate_limited_with_hit(&cmd, TenantId(1), PrincipalId(1)).await.unwrap());
        }
        assert_eq!(l.bucket_count(), 0);
    }

    #[tokio::test]
    async fn cooldown_without_max_allows_one() {
        let clock = ManualClock::new(1_000);
        let l = limiter(&clock);
        let cmd = CommandMetadata {
            cooldown_ms: Some(500),
            ..CommandMetadata::new("warn")
        };
        assert!(!l.is_rate_limited_with_hit(&cmd, TenantId(1), PrincipalId(1)).await.unwrap());
        assert!(l.is_rate_limited_with_hit(&cmd, TenantId(1), PrincipalId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn global_block_refreshes_window() {
        let clock = ManualClock::new(10_000);
        let l = limiter(&clock);
        let cmd = CommandMetadata::new("ban").with_cooldown(1_000, 2);
        let hit = || l.is_rate_limited_with_hit(&cmd, TenantId(1), PrincipalId(1));

        assert!(!hit().await.unwrap());
        assert!(!hit().await.unwrap());
        clock.set(10_900);
        assert!(hit().await.unwrap());
        let b = l.global_bucket(PrincipalId(1), "ban").unwrap();
        assert_eq!(b.window_start_ms, 10_900);
        assert_eq!(b.blocked_until_ms, 11_900);

        // Still inside the refreshed window.
        clock.set(11_800);
        assert!(hit().await.unwrap());

        clock.set(12_801);
        assert!(!hit().await.unwrap());
        let b = l.global_bucket(PrincipalId(1), "ban").unwrap();
        assert_eq!(b.attempts, 1);
        assert_eq!(b.window_start_ms, 12_801);
    }
}
