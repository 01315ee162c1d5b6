// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command metadata and tenant rate-limit settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-command metadata supplied by the dispatch framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Canonical command name; rate-limit buckets are keyed by it.
    pub canonical_name: String,
    /// Global cooldown window. `None` disables the global tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
    /// Attempts allowed per cooldown window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl CommandMetadata {
    /// A command without a global cooldown.
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            cooldown_ms: None,
            max_attempts: None,
        }
    }

    /// Builder: declare a global cooldown allowing `max_attempts` per window.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown_ms: u64, max_attempts: u32) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Per-command override of a tenant's rate-limit defaults. Unset fields
/// fall back to the tenant default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandRateLimitOverride {
    /// `Some(false)` disables the tenant tier for this command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Attempts allowed per window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Window length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_ms: Option<u64>,
    /// Extra time a blocked principal stays blocked after the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_duration_ms: Option<u64>,
}

/// Rate-limit settings for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TenantRateLimitConfig {
    /// Master switch for the tenant tier.
    #[serde(default)]
    pub enabled: bool,
    /// Attempts allowed per window.
    pub max_attempts: u32,
    /// Window length.
    pub timeframe_ms: u64,
    /// Extra time a blocked principal stays blocked after the window.
    #[serde(default)]
    pub block_duration_ms: u64,
    /// Overrides keyed by canonical command name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub per_command_overrides: BTreeMap<String, CommandRateLimitOverride>,
}

/// Effective tenant-tier limits for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRateLimit {
    /// Attempts allowed per window.
    pub max_attempts: u32,
    /// Window length.
    pub timeframe_ms: u64,
    /// Extra block time after the window.
    pub block_duration_ms: u64,
}

impl ResolvedRateLimit {
    /// Absolute block deadline for a window opened at `now_ms`.
    pub fn blocked_until(&self, now_ms: u64) -> u64 {
        now_ms
            .saturating_add(self.timeframe_ms)
            .saturating_add(self.block_duration_ms)
    }
}

impl TenantRateLimitConfig {
    /// An enabled configuration with no overrides.
    pub fn new(max_attempts: u32, timeframe_ms: u64, block_duration_ms: u64) -> Self {
        Self {
            enabled: true,
            max_attempts,
            timeframe_ms,
            block_duration_ms,
            per_command_overrides: BTreeMap::new(),
        }
    }

    /// Builder: add a per-command override.
    #[must_use]
    pub fn with_override(
        mut self,
        command: impl Into<String>,
        over: CommandRateLimitOverride,
    ) -> Self {
        self.per_command_overrides.insert(command.into(), over);
        self
    }

    /// Limits that apply to `command`, or `None` when the tenant tier is
    /// disabled globally or for this command.
    pub fn resolve(&self, command: &str) -> Option<ResolvedRateLimit> {
        if !self.enabled {
            return None;
        }
        let base = ResolvedRateLimit {
            max_attempts: self.max_attempts,
            timeframe_ms: self.timeframe_ms,
            block_duration_ms: self.block_duration_ms,
        };
        let Some(over) = self.per_command_overrides.get(command) else {
            return Some(base);
        };
        if over.enabled == Some(false) {
            return None;
        }
        Some(ResolvedRateLimit {
            max_attempts: over.max_attempts.unwrap_or(base.max_attempts),
            timeframe_ms: over.timeframe_ms.unwrap_or(base.timeframe_ms),
            block_duration_ms: over.block_duration_ms.unwrap_or(base.block_duration_ms),
        })
    }
}
