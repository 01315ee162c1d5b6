// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for modgate.
//!
//! [`GateConfig`] holds resolver cache tuning, the entry merge order, the
//! bucket sweep interval and per-tenant rate limits. Every field is
//! optional in TOML; accessors such as [`GateConfig::cache_ttl`] supply the
//! defaults.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use modgate_core::{MergeOrder, TenantId, TenantRateLimitConfig};
use modgate_error::{ErrorCode, GateError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl From<ConfigError> for GateError {
    fn from(err: ConfigError) -> Self {
        let gate = GateError::new(ErrorCode::ConfigInvalid, err.to_string());
        match err {
            ConfigError::FileNotFound { path } => gate.with_context("path", path),
            ConfigError::ValidationError { reasons } => gate.with_context("reasons", reasons),
            ConfigError::ParseError { .. } => gate,
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A zero TTL turns the permission cache off.
    CachingDisabled,
    /// A block duration is longer than a day.
    LongBlockDuration {
        /// Tenant key as written in the file.
        tenant: String,
        /// Command the override applies to, if not the tenant default.
        command: Option<String>,
        /// Block duration in milliseconds.
        ms: u64,
    },
    /// Per-command overrides exist but the tenant tier is disabled.
    OverridesOnDisabledTenant {
        /// Tenant key as written in the file.
        tenant: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::CachingDisabled => {
                write!(f, "resolver.cache_ttl_ms is 0; permission caching is disabled")
            }
            ConfigWarning::LongBlockDuration {
                tenant,
                command,
                ms,
            } => {
                write!(f, "tenant '{tenant}'")?;
                if let Some(c) = command {
                    write!(f, " command '{c}'")?;
                }
                write!(f, " blocks for {ms}ms (over 24h)")
            }
            ConfigWarning::OverridesOnDisabledTenant { tenant } => {
                write!(
                    f,
                    "tenant '{tenant}' has per-command overrides but its rate limit is disabled"
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration of the policy and admission engine.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct GateConfig {
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Permission resolver settings.
    #[serde(default)]
    pub resolver: ResolverSection,

    /// Rate-limit housekeeping settings.
    #[serde(default)]
    pub rate_limit: RateLimitSection,

    /// Per-tenant settings keyed by the tenant id in decimal.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tenants: BTreeMap<String, TenantSection>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".into()),
            resolver: ResolverSection::default(),
            rate_limit: RateLimitSection::default(),
            tenants: BTreeMap::new(),
        }
    }
}

/// `[resolver]`
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ResolverSection {
    /// Cache time-to-live in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_ms: Option<u64>,
    /// Maximum number of cached results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<usize>,
    /// Order in which matching entries are folded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_order: Option<MergeOrder>,
}

/// `[rate_limit]`
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RateLimitSection {
    /// Time between bucket sweeps in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,
}

/// `[tenants."<id>"]`
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct TenantSection {
    /// The tenant's rate-limit configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<TenantRateLimitConfig>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default cache TTL (60 s).
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Default cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 1_000;

/// Default sweep interval (30 min).
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 30 * 60 * 1_000;

/// Block durations above this produce a warning (24 h).
const LONG_BLOCK_THRESHOLD_MS: u64 = 24 * 60 * 60 * 1_000;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl GateConfig {
    /// Effective cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.resolver.cache_ttl_ms.unwrap_or(DEFAULT_CACHE_TTL_MS))
    }

    /// Effective cache capacity.
    pub fn cache_capacity(&self) -> usize {
        self.resolver.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    /// Effective merge order.
    pub fn merge_order(&self) -> MergeOrder {
        self.resolver.merge_order.unwrap_or_default()
    }

    /// Effective sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(
            self.rate_limit
                .sweep_interval_ms
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
        )
    }

    /// Tenant rate-limit settings keyed by parsed [`TenantId`]. Tenants
    /// without a `rate_limit` table are omitted.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] listing every key that is not a
    /// decimal tenant id.
    pub fn tenant_settings(&self) -> Result<BTreeMap<TenantId, TenantRateLimitConfig>, ConfigError> {
        let mut out = BTreeMap::new();
        let mut errors = Vec::new();
        for (key, section) in &self.tenants {
            match key.parse::<u64>() {
                Ok(id) => {
                    if let Some(rl) = &section.rate_limit {
                        out.insert(TenantId(id), rl.clone());
                    }
                }
                Err(_) => errors.push(format!("tenant key '{key}' is not a numeric id")),
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(ConfigError::ValidationError { reasons: errors })
        }
    }
}

/// JSON schema of [`GateConfig`].
pub fn config_schema() -> schemars::Schema {
    schemars::schema_for!(GateConfig)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`GateConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`GateConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<GateConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => GateConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`GateConfig`].
pub fn parse_toml(content: &str) -> Result<GateConfig, ConfigError> {
    toml::from_str::<GateConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

fn env_number<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "modgate.config", var, value = %raw, "ignoring non-numeric override");
            None
        }
    }
}

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `MODGATE_LOG_LEVEL`
/// - `MODGATE_CACHE_TTL_MS`
/// - `MODGATE_CACHE_CAPACITY`
/// - `MODGATE_SWEEP_INTERVAL_MS`
///
/// Numeric variables that do not parse are ignored.
pub fn apply_env_overrides(config: &mut GateConfig) {
    if let Ok(val) = std::env::var("MODGATE_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Some(v) = env_number("MODGATE_CACHE_TTL_MS") {
        config.resolver.cache_ttl_ms = Some(v);
    }
    if let Some(v) = env_number("MODGATE_CACHE_CAPACITY") {
        config.resolver.cache_capacity = Some(v);
    }
    if let Some(v) = env_number("MODGATE_SWEEP_INTERVAL_MS") {
        config.rate_limit.sweep_interval_ms = Some(v);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (bad log level, zero capacity or sweep interval, non-numeric
/// tenant ids, zero limits on enabled tenants) are returned as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &GateConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.resolver.cache_capacity == Some(0) {
        errors.push("resolver.cache_capacity must be greater than 0".into());
    }
    if config.resolver.cache_ttl_ms == Some(0) {
        warnings.push(ConfigWarning::CachingDisabled);
    }
    if config.rate_limit.sweep_interval_ms == Some(0) {
        errors.push("rate_limit.sweep_interval_ms must be greater than 0".into());
    }

    for (key, section) in &config.tenants {
        if key.parse::<u64>().is_err() {
            errors.push(format!("tenant key '{key}' is not a numeric id"));
        }
        let Some(rl) = &section.rate_limit else {
            continue;
        };

        if !rl.enabled {
            if !rl.per_command_overrides.is_empty() {
                warnings.push(ConfigWarning::OverridesOnDisabledTenant {
                    tenant: key.clone(),
                });
            }
            continue;
        }

        if rl.max_attempts == 0 {
            errors.push(format!("tenant '{key}': max_attempts must be greater than 0"));
        }
        if rl.timeframe_ms == 0 {
            errors.push(format!("tenant '{key}': timeframe_ms must be greater than 0"));
        }
        if rl.block_duration_ms > LONG_BLOCK_THRESHOLD_MS {
            warnings.push(ConfigWarning::LongBlockDuration {
                tenant: key.clone(),
                command: None,
                ms: rl.block_duration_ms,
            });
        }

        for (command, over) in &rl.per_command_overrides {
            if over.max_attempts == Some(0) {
                errors.push(format!(
                    "tenant '{key}' command '{command}': max_attempts must be greater than 0"
                ));
            }
            if over.timeframe_ms == Some(0) {
                errors.push(format!(
                    "tenant '{key}' command '{command}': timeframe_ms must be greater than 0"
                ));
            }
            if let Some(ms) = over.block_duration_ms
                && ms > LONG_BLOCK_THRESHOLD_MS
            {
                warnings.push(ConfigWarning::LongBlockDuration {
                    tenant: key.clone(),
                    command: Some(command.clone()),
                    ms,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations.  Values in `overlay` take precedence over `base`.
///
/// Tenant maps are combined; on key collisions the overlay entry wins.
pub fn merge_configs(base: GateConfig, overlay: GateConfig) -> GateConfig {
    let mut tenants = base.tenants;
    tenants.extend(overlay.tenants);
    GateConfig {
        log_level: overlay.log_level.or(base.log_level),
        resolver: ResolverSection {
            cache_ttl_ms: overlay.resolver.cache_ttl_ms.or(base.resolver.cache_ttl_ms),
            cache_capacity: overlay
                .resolver
                .cache_capacity
                .or(base.resolver.cache_capacity),
            merge_order: overlay.resolver.merge_order.or(base.resolver.merge_order),
        },
        rate_limit: RateLimitSection {
            sweep_interval_ms: overlay
                .rate_limit
                .sweep_interval_ms
                .or(base.rate_limit.sweep_interval_ms),
        },
        tenants,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
