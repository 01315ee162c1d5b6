// SPDX-License-Identifier: MIT OR Apache-2.0
//! modgate-runtime
//!
//! Orchestration layer.
//!
//! Responsibilities:
//! - resolve the subject's effective permissions and check the command's requirement
//! - record the attempt against the global and tenant rate-limit tiers
//! - map store failures according to the configured [`FailureMode`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

use modgate_config::{ConfigError, GateConfig};
use modgate_core::{Clock, CommandMetadata, NativePermissions, Subject, TenantId, duration_ms};
use modgate_error::GateError;
use modgate_policy::{
    CustomPermission, PermissionLevelStore, PermissionRegistry, PermissionResolver,
    RegistryError, ResolverOptions,
};
use modgate_ratelimit::{
    AdmissionLimiter, DEFAULT_SWEEP_INTERVAL, StaticRateLimitSettings, SweeperError,
    SweeperHandle, spawn_sweeper,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of [`Gatekeeper::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// The command may run.
    Admitted,
    /// The subject lacks a required permission.
    Denied,
    /// The subject is authorized but currently throttled.
    RateLimited,
}

impl Admission {
    /// `true` only for [`Admission::Admitted`].
    pub fn is_admitted(self) -> bool {
        self == Self::Admitted
    }
}

impl std::fmt::Display for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Admitted => "admitted",
            Self::Denied => "denied",
            Self::RateLimited => "rate_limited",
        })
    }
}

/// What to do when a store collaborator fails mid-decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Authorization failures become [`Admission::Denied`], admission
    /// failures become [`Admission::RateLimited`].
    #[default]
    FailClosed,
    /// Return the failure to the caller as a [`GateError`].
    Propagate,
}

/// Permissions a command requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    /// Native bits that must all be held.
    pub native: NativePermissions,
    /// Custom permissions that must all be held.
    pub custom: Vec<CustomPermission>,
}

impl Requirement {
    /// No requirement; every subject is authorized.
    pub fn none() -> Self {
        Self::default()
    }

    /// Require `native` bits only.
    pub fn native(native: NativePermissions) -> Self {
        Self {
            native,
            custom: Vec::new(),
        }
    }

    /// Builder: also require `permission`.
    #[must_use]
    pub fn with_custom(mut self, permission: CustomPermission) -> Self {
        self.custom.push(permission);
        self
    }

    /// Requirement whose custom keys are looked up in `registry`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for the first unregistered key.
    pub fn resolve<'k>(
        native: NativePermissions,
        keys: impl IntoIterator<Item = &'k str>,
        registry: &PermissionRegistry,
    ) -> Result<Self, RegistryError> {
        let custom = keys
            .into_iter()
            .map(|k| registry.resolve(k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { native, custom })
    }
}

// ---------------------------------------------------------------------------
// Gatekeeper
// ---------------------------------------------------------------------------

/// Authorizes and admits command invocations.
///
/// ```no_run
/// # use modgate_runtime::{Gatekeeper, Requirement};
/// # use modgate_core::{CommandMetadata, Principal, TenantId};
/// # async fn demo(gate: Gatekeeper) -> Result<(), modgate_error::GateError> {
/// let who = Principal::new(7u64).into();
/// let cmd = CommandMetadata::new("ping");
/// let verdict = gate.admit(&who, TenantId(1), &cmd, &Requirement::none()).await?;
/// assert!(verdict.is_admitted());
/// # Ok(()) }
/// ```
pub struct Gatekeeper {
    resolver: Arc<PermissionResolver>,
    limiter: Arc<AdmissionLimiter>,
    failure_mode: FailureMode,
    sweep_interval: Duration,
}

impl Gatekeeper {
    /// Gatekeeper over an existing resolver and limiter, failing closed.
    pub fn new(resolver: Arc<PermissionResolver>, limiter: Arc<AdmissionLimiter>) -> Self {
        Self {
            resolver,
            limiter,
            failure_mode: FailureMode::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Build the resolver and limiter from `config`.
    ///
    /// Tenant rate limits come from the `[tenants]` tables and are served
    /// from a [`StaticRateLimitSettings`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] for a zero cache capacity, a zero
    /// sweep interval or a non-numeric tenant key.
    pub fn from_config(
        config: &GateConfig,
        store: Arc<dyn PermissionLevelStore>,
        registry: Arc<PermissionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let cache_capacity = NonZeroUsize::new(config.cache_capacity()).ok_or_else(|| {
            ConfigError::ValidationError {
                reasons: vec!["resolver.cache_capacity must be greater than 0".into()],
            }
        })?;
        let sweep_interval = config.sweep_interval();
        if sweep_interval.is_zero() {
            return Err(ConfigError::ValidationError {
                reasons: vec!["rate_limit.sweep_interval_ms must be greater than 0".into()],
            });
        }
        let options = ResolverOptions {
            cache_ttl: config.cache_ttl(),
            cache_capacity,
            merge_order: config.merge_order(),
        };
        let tenants = config.tenant_settings()?;
        let tenant_count = tenants.len();
        let settings = Arc::new(StaticRateLimitSettings::from_map(tenants));

        let resolver = PermissionResolver::new(store, registry, Arc::clone(&clock), options);
        let limiter = AdmissionLimiter::new(settings, clock);
        debug!(
            target: "modgate.gate",
            ttl_ms = duration_ms(options.cache_ttl),
            capacity = cache_capacity.get(),
            tenants = tenant_count,
            "gatekeeper configured"
        );

        Ok(Self {
            resolver: Arc::new(resolver),
            limiter: Arc::new(limiter),
            failure_mode: FailureMode::default(),
            sweep_interval,
        })
    }

    /// Builder: set the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Builder: set the interval used by [`start_sweeper`](Self::start_sweeper).
    /// A zero interval is ignored and the current one kept.
    #[must_use]
    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        if every.is_zero() {
            warn!(
                target: "modgate.gate",
                kept_ms = duration_ms(self.sweep_interval),
                "ignoring zero sweep interval"
            );
            return self;
        }
        self.sweep_interval = every;
        self
    }

    /// Interval used by [`start_sweeper`](Self::start_sweeper).
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Current failure mode.
    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// The permission resolver.
    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    /// The admission limiter.
    pub fn limiter(&self) -> &Arc<AdmissionLimiter> {
        &self.limiter
    }

    /// Spawn the bucket sweeper on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SweeperError::ZeroInterval`] if the interval is zero, which the
    /// constructors and builder never produce.
    pub fn start_sweeper(&self) -> Result<SweeperHandle, SweeperError> {
        spawn_sweeper(Arc::clone(&self.limiter), self.sweep_interval)
    }

    /// Decide whether `subject` may run `command` in `tenant`.
    ///
    /// Authorization runs first; a denied call never touches the rate
    /// limiter, so it is not counted as an attempt.
    ///
    /// # Errors
    ///
    /// Only under [`FailureMode::Propagate`]: the store failure as a
    /// [`GateError`] with code `STORE_UNAVAILABLE`.
    pub async fn admit(
        &self,
        subject: &Subject,
        tenant: TenantId,
        command: &CommandMetadata,
        requirement: &Requirement,
    ) -> Result<Admission, GateError> {
        let principal = subject.id();

        let authorized = match self
            .resolver
            .has_permissions(subject, tenant, requirement.native, &requirement.custom)
            .await
        {
            Ok(ok) => ok,
            Err(e) => {
                return self.on_failure(e.into(), Admission::Denied, tenant, command);
            }
        };
        if !authorized {
            info!(
                target: "modgate.gate",
                tenant = %tenant,
                principal = %principal,
                command = %command.canonical_name,
                "missing required permissions"
            );
            return Ok(Admission::Denied);
        }

        let limited = match self
            .limiter
            .is_rate_limited_with_hit(command, tenant, principal)
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                return self.on_failure(e.into(), Admission::RateLimited, tenant, command);
            }
        };

        let verdict = if limited {
            Admission::RateLimited
        } else {
            Admission::Admitted
        };
        debug!(
            target: "modgate.gate",
            tenant = %tenant,
            principal = %principal,
            command = %command.canonical_name,
            verdict = %verdict,
            "admission decided"
        );
        Ok(verdict)
    }

    fn on_failure(
        &self,
        err: GateError,
        closed: Admission,
        tenant: TenantId,
        command: &CommandMetadata,
    ) -> Result<Admission, GateError> {
        match self.failure_mode {
            FailureMode::FailClosed => {
                warn!(
                    target: "modgate.gate",
                    tenant = %tenant,
                    command = %command.canonical_name,
                    error = %err,
                    verdict = %closed,
                    "store failure, failing closed"
                );
                Ok(closed)
            }
            FailureMode::Propagate => Err(err
                .with_context("tenant", tenant)
                .with_context("command", &command.canonical_name)),
        }
    }
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("resolver", &self.resolver)
            .field("limiter", &self.limiter)
            .field("failure_mode", &self.failure_mode)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}
