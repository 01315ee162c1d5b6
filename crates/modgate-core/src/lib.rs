// SPDX-License-Identifier: MIT OR Apache-2.0
//! modgate-core
//!
//! The shared vocabulary of the policy and admission engine.
//!
//! Everything the resolver, the rate limiter and the policy compiler agree on
//! lives here: identifiers, native permission bits, the persisted
//! [`PermissionLevelEntry`] rows, command metadata and tenant rate-limit
//! settings. The crate has no async code and no I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Injectable wall clock in epoch milliseconds.
pub mod clock;
/// Command metadata and tenant rate-limit settings.
pub mod command;
/// Principals, subjects and persisted permission-level entries.
pub mod entry;
/// Platform-defined native permission bits.
pub mod native;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock, duration_ms};
pub use command::{
    CommandMetadata, CommandRateLimitOverride, ResolvedRateLimit, TenantRateLimitConfig,
};
pub use entry::{MergeOrder, PermissionLevelEntry, Principal, Subject};
pub use native::NativePermissions;

use modgate_error::{ErrorCode, GateError};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a tenant (an isolated community/server scope).
    TenantId
);
snowflake_id!(
    /// Identifier of a principal (a community member or bare user).
    PrincipalId
);
snowflake_id!(
    /// Identifier of a role assignable to principals within a tenant.
    RoleId
);

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure reported by an external store collaborator.
///
/// The engine never retries and never swallows these; they propagate to the
/// caller of the query that needed the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or did not answer.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Human-readable detail from the collaborator.
        reason: String,
    },
}

impl StoreError {
    /// Shorthand for [`StoreError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        GateError::new(ErrorCode::StoreUnavailable, err.to_string()).with_source(err)
    }
}
