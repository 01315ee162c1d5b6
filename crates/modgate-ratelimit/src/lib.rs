// SPDX-License-Identifier: MIT OR Apache-2.0
//! modgate-ratelimit
//!
//! Dual-scope admission control. A global tier throttles a principal's use
//! of a command everywhere; a tenant tier applies the tenant's configured
//! limits. Both tiers keep their state in a [`BucketStore`] and share one
//! periodic sweeper.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Buckets and the keyed bucket map.
pub mod bucket;
/// The two-tier limiter.
pub mod limiter;
/// Tenant settings collaborator.
pub mod settings;
/// Background sweeping task.
pub mod sweeper;

pub use bucket::{Bucket, BucketStore, GlobalKey, TenantKey};
pub use limiter::AdmissionLimiter;
pub use settings::{RateLimitSettingsSource, StaticRateLimitSettings};
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, SweeperError, SweeperHandle, spawn_sweeper};
