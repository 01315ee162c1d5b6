// SPDX-License-Identifier: MIT OR Apache-2.0
//! modgate-policy
//!
//! Resolves what a principal may do in a tenant.
//!
//! A [`PermissionResolver`] combines a [`PermissionLevelStore`] (the tenant's
//! persisted level entries), a [`PermissionRegistry`] of custom permissions
//! and a [`Clock`](modgate_core::Clock), and caches its results in a bounded
//! LRU with a fixed time-to-live.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// TTL-bounded LRU cache of resolved permissions.
pub mod cache;
/// Custom permission registry.
pub mod registry;
/// Effective-permission computation.
pub mod resolver;
/// Level-entry store collaborator.
pub mod store;

pub use cache::PermissionCache;
pub use registry::{CustomPermission, PermissionRegistry, RegistryError};
pub use resolver::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, EffectivePermissions, PermissionResolver,
    ResolveError, ResolverOptions, merge_entries,
};
pub use store::{InMemoryLevelStore, PermissionLevelStore};
