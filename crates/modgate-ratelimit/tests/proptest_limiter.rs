// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for admission counts.

use modgate_core::{CommandMetadata, ManualClock, PrincipalId, TenantId, TenantRateLimitConfig};
use modgate_ratelimit::{AdmissionLimiter, StaticRateLimitSettings};
use proptest::prelude::*;
use std::sync::Arc;

const EPOCH: u64 = 1_700_000_000_000;

fn admitted(limiter: &AdmissionLimiter, cmd: &CommandMetadata, calls: usize) -> usize {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let mut passed = 0;
        for _ in 0..calls {
            if !limiter
                .is_rate_limited_with_hit(cmd, TenantId(1), PrincipalId(1))
                .await
                .unwrap()
            {
                passed += 1;
            }
        }
        passed
    })
}

proptest! {
    #[test]
    fn global_tier_admits_at_most_max_per_window(max in 1u32..10, calls in 0usize..40) {
        let limiter = AdmissionLimiter::new(
            Arc::new(StaticRateLimitSettings::new()),
            Arc::new(ManualClock::new(EPOCH)),
        );
        let cmd = CommandMetadata::new("ban").with_cooldown(60_000, max);
        prop_assert_eq!(admitted(&limiter, &cmd, calls), calls.min(max as usize));
    }

    #[test]
    fn tenant_tier_admits_at_most_max_per_window(max in 1u32..10, calls in 0usize..40) {
        let settings = StaticRateLimitSettings::new();
        settings.set(TenantId(1), TenantRateLimitConfig::new(max, 10_000, 0));
        let limiter = AdmissionLimiter::new(
            Arc::new(settings),
            Arc::new(ManualClock::new(EPOCH)),
        );
        let cmd = CommandMetadata::new("warn");
        prop_assert_eq!(admitted(&limiter, &cmd, calls), calls.min(max as usize));
    }
}
