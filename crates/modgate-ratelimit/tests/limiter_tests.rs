// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-tier limiter behaviour with a manual clock.

use modgate_core::{
    CommandMetadata, CommandRateLimitOverride, ManualClock, PrincipalId, StoreError, TenantId,
    TenantRateLimitConfig,
};
use modgate_ratelimit::{AdmissionLimiter, StaticRateLimitSettings};
use std::sync::Arc;
use std::time::Duration;

const T: TenantId = TenantId(500);
const P: PrincipalId = PrincipalId(42);
const EPOCH: u64 = 1_700_000_000_000;

fn setup(start_ms: u64) -> (Arc<StaticRateLimitSettings>, ManualClock, AdmissionLimiter) {
    let settings = Arc::new(StaticRateLimitSettings::new());
    let clock = ManualClock::new(start_ms);
    let limiter = AdmissionLimiter::new(settings.clone(), Arc::new(clock.clone()));
    (settings, clock, limiter)
}

#[tokio::test]
async fn global_tier_blocks_second_call_within_cooldown() {
    let (_, _, limiter) = setup(EPOCH);
    let cmd = CommandMetadata::new("ban").with_cooldown(60_000, 1);
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
}

#[tokio::test]
async fn global_tier_is_per_principal_and_command() {
    let (_, _, limiter) = setup(EPOCH);
    let ban = CommandMetadata::new("ban").with_cooldown(60_000, 1);
    let kick = CommandMetadata::new("kick").with_cooldown(60_000, 1);
    assert!(!limiter.is_rate_limited_with_hit(&ban, T, P).await.unwrap());
    assert!(!limiter.is_rate_limited_with_hit(&kick, T, P).await.unwrap());
    assert!(!limiter.is_rate_limited_with_hit(&ban, T, PrincipalId(43)).await.unwrap());
    // The global tier ignores the tenant.
    assert!(limiter.is_rate_limited_with_hit(&ban, TenantId(501), P).await.unwrap());
}

#[tokio::test]
async fn global_tier_reopens_after_cooldown() {
    let (_, clock, limiter) = setup(EPOCH);
    let cmd = CommandMetadata::new("ban").with_cooldown(60_000, 1);
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    clock.advance(Duration::from_millis(60_001));
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
}

#[tokio::test]
async fn no_tenant_config_never_limits() {
    let (_, _, limiter) = setup(EPOCH);
    let cmd = CommandMetadata::new("warn");
    for _ in 0..1_000 {
        assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    }
    assert!(limiter.tenant_bucket(T, P, "warn").is_none());
}

#[tokio::test]
async fn disabled_tenant_config_never_limits() {
    let (settings, _, limiter) = setup(EPOCH);
    let mut cfg = TenantRateLimitConfig::new(1, 10_000, 0);
    cfg.enabled = false;
    settings.set(T, cfg);
    let cmd = CommandMetadata::new("warn");
    for _ in 0..20 {
        assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    }
}

#[tokio::test]
async fn tenant_tier_blocks_after_max_attempts() {
    let (settings, clock, limiter) = setup(EPOCH);
    settings.set(T, TenantRateLimitConfig::new(3, 10_000, 5_000));
    let cmd = CommandMetadata::new("warn");

    for _ in 0..3 {
        assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    }
    let b = limiter.tenant_bucket(T, P, "warn").unwrap();
    assert_eq!(b.attempts, 3);
    assert_eq!(b.window_start_ms, EPOCH);
    assert_eq!(b.blocked_until_ms, EPOCH + 15_000);

    clock.advance(Duration::from_millis(100));
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    let b = limiter.tenant_bucket(T, P, "warn").unwrap();
    assert_eq!(b.window_start_ms, EPOCH + 100);
    assert_eq!(b.blocked_until_ms, EPOCH + 100 + 15_000);

    // Other tenants are unaffected.
    assert!(!limiter.is_rate_limited_with_hit(&cmd, TenantId(9), P).await.unwrap());
}

#[tokio::test]
async fn per_command_override_changes_limits() {
    let (settings, _, limiter) = setup(EPOCH);
    settings.set(
        T,
        TenantRateLimitConfig::new(5, 10_000, 0).with_override(
            "ban",
            CommandRateLimitOverride {
                max_attempts: Some(1),
                ..Default::default()
            },
        ),
    );
    let ban = CommandMetadata::new("ban");
    let warn = CommandMetadata::new("warn");
    assert!(!limiter.is_rate_limited_with_hit(&ban, T, P).await.unwrap());
    assert!(limiter.is_rate_limited_with_hit(&ban, T, P).await.unwrap());
    for _ in 0..5 {
        assert!(!limiter.is_rate_limited_with_hit(&warn, T, P).await.unwrap());
    }
    assert!(limiter.is_rate_limited_with_hit(&warn, T, P).await.unwrap());
}

#[tokio::test]
async fn per_command_override_can_disable() {
    let (settings, _, limiter) = setup(EPOCH);
    settings.set(
        T,
        TenantRateLimitConfig::new(1, 10_000, 0).with_override(
            "ping",
            CommandRateLimitOverride {
                enabled: Some(false),
                ..Default::default()
            },
        ),
    );
    let ping = CommandMetadata::new("ping");
    for _ in 0..10 {
        assert!(!limiter.is_rate_limited_with_hit(&ping, T, P).await.unwrap());
    }
}

#[tokio::test]
async fn stale_check_compares_elapsed_time_with_absolute_deadline() {
    // With a clock near zero the absolute deadline is small enough for the
    // elapsed time to exceed it.
    let (settings, clock, limiter) = setup(0);
    settings.set(T, TenantRateLimitConfig::new(1, 100, 50));
    let cmd = CommandMetadata::new("warn");

    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert_eq!(limiter.tenant_bucket(T, P, "warn").unwrap().blocked_until_ms, 150);
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());

    clock.set(151);
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert!(limiter.tenant_bucket(T, P, "warn").is_none());
}

#[tokio::test]
async fn realistic_clock_keeps_blocking_past_the_window() {
    // At real epoch times the elapsed window never exceeds the absolute
    // deadline, so a blocked principal stays blocked while they keep trying.
    let (settings, clock, limiter) = setup(EPOCH);
    settings.set(T, TenantRateLimitConfig::new(1, 100, 50));
    let cmd = CommandMetadata::new("warn");
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    clock.advance(Duration::from_secs(3_600));
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
}

#[tokio::test]
async fn global_block_skips_tenant_tier() {
    let (settings, _, limiter) = setup(EPOCH);
    settings.set(T, TenantRateLimitConfig::new(10, 10_000, 0));
    let cmd = CommandMetadata::new("ban").with_cooldown(60_000, 1);
    assert!(!limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert!(limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap());
    assert_eq!(limiter.tenant_bucket(T, P, "ban").unwrap().attempts, 1);
}

#[tokio::test]
async fn settings_failure_propagates() {
    let (settings, _, limiter) = setup(EPOCH);
    settings.set_unavailable(true);
    let err = limiter
        .is_rate_limited_with_hit(&CommandMetadata::new("warn"), T, P)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));
}

#[tokio::test]
async fn sweep_drops_expired_buckets_from_both_tiers() {
    let (settings, clock, limiter) = setup(EPOCH);
    settings.set(T, TenantRateLimitConfig::new(3, 1_000, 1_000));
    let cmd = CommandMetadata::new("ban").with_cooldown(500, 3);
    limiter.is_rate_limited_with_hit(&cmd, T, P).await.unwrap();
    assert_eq!(limiter.bucket_count(), 2);

    clock.advance(Duration::from_millis(1_000));
    assert_eq!(limiter.sweep(), 1);
    assert!(limiter.global_bucket(P, "ban").is_none());

    clock.advance(Duration::from_millis(1_001));
    assert_eq!(limiter.sweep(), 1);
    assert_eq!(limiter.bucket_count(), 0);
}
