// SPDX-License-Identifier: MIT OR Apache-2.0
//! Principals and persisted permission-level entries.

use crate::{NativePermissions, PrincipalId, RoleId, TenantId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A tenant member whose permissions are being evaluated.
///
/// Supplied by the chat-platform client; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier.
    pub id: PrincipalId,
    /// Roles assigned to the principal in the tenant being queried.
    #[serde(default)]
    pub role_ids: BTreeSet<RoleId>,
    /// Platform permission bits the principal already holds.
    #[serde(default)]
    pub native_permissions: NativePermissions,
}

impl Principal {
    /// A principal with no roles and no native permissions.
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            role_ids: BTreeSet::new(),
            native_permissions: NativePermissions::NONE,
        }
    }

    /// Builder: add a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role_ids.insert(role.into());
        self
    }

    /// Builder: set the native permission bits.
    #[must_use]
    pub fn with_native(mut self, bits: NativePermissions) -> Self {
        self.native_permissions = bits;
        self
    }
}

/// Who is asking: a tenant member with role context, or a bare user
/// reference without one (e.g. a direct-message invocation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// A tenant member.
    Member(Principal),
    /// A user with no membership context.
    User(PrincipalId),
}

impl Subject {
    /// The identifier of the subject regardless of variant.
    pub fn id(&self) -> PrincipalId {
        match self {
            Self::Member(p) => p.id,
            Self::User(id) => *id,
        }
    }
}

impl From<Principal> for Subject {
    fn from(p: Principal) -> Self {
        Self::Member(p)
    }
}

/// One persisted, tenant-scoped permission level.
///
/// Created and edited by tenant administrators through external tooling;
/// read-only from the resolver's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PermissionLevelEntry {
    /// Tenant the entry belongs to.
    pub guild_id: TenantId,
    /// Numeric rank of the level.
    pub level: u32,
    /// Principals assigned directly.
    #[serde(default)]
    pub users: BTreeSet<PrincipalId>,
    /// Roles whose holders are assigned.
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Native bits added to matching principals.
    #[serde(default)]
    pub granted_native_permissions: NativePermissions,
    /// Native bits removed from matching principals.
    #[serde(default)]
    pub denied_native_permissions: NativePermissions,
    /// Custom permission keys granted.
    #[serde(default)]
    pub granted_custom_permission_keys: BTreeSet<String>,
    /// Custom permission keys denied.
    #[serde(default)]
    pub denied_custom_permission_keys: BTreeSet<String>,
    /// Disabled entries never match.
    #[serde(default)]
    pub disabled: bool,
}

impl PermissionLevelEntry {
    /// An enabled entry with no members and no grants.
    pub fn new(guild_id: impl Into<TenantId>, level: u32) -> Self {
        Self {
            guild_id: guild_id.into(),
            level,
            users: BTreeSet::new(),
            roles: BTreeSet::new(),
            granted_native_permissions: NativePermissions::NONE,
            denied_native_permissions: NativePermissions::NONE,
            granted_custom_permission_keys: BTreeSet::new(),
            denied_custom_permission_keys: BTreeSet::new(),
            disabled: false,
        }
    }

    /// An entry matches when it is enabled and the principal is listed
    /// directly or holds at least one of its roles.
    pub fn matches(&self, principal: &Principal) -> bool {
        !self.disabled
            && (self.users.contains(&principal.id)
                || self.roles.iter().any(|r| principal.role_ids.contains(r)))
    }

    /// Builder: add a direct user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<PrincipalId>) -> Self {
        self.users.insert(user.into());
        self
    }

    /// Builder: add a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Builder: grant native bits.
    #[must_use]
    pub fn granting(mut self, bits: NativePermissions) -> Self {
        self.granted_native_permissions |= bits;
        self
    }

    /// Builder: deny native bits.
    #[must_use]
    pub fn denying(mut self, bits: NativePermissions) -> Self {
        self.denied_native_permissions |= bits;
        self
    }

    /// Builder: grant a custom permission key.
    #[must_use]
    pub fn granting_custom(mut self, key: impl Into<String>) -> Self {
        self.granted_custom_permission_keys.insert(key.into());
        self
    }

    /// Builder: deny a custom permission key.
    #[must_use]
    pub fn denying_custom(mut self, key: impl Into<String>) -> Self {
        self.denied_custom_permission_keys.insert(key.into());
        self
    }

    /// Builder: mark disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Order in which matching entries are folded into effective permissions.
///
/// The fold is order-sensitive (a later deny clears an earlier grant), so
/// the order must be pinned by configuration rather than left to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Exactly the order the store returned. The store owns sorting.
    #[default]
    StoreOrder,
    /// Stable sort by ascending level, so higher levels are applied last.
    AscendingLevel,
}

impl MergeOrder {
    /// Reorder `entries` in place according to this policy.
    pub fn apply(self, entries: &mut [PermissionLevelEntry]) {
        match self {
            Self::StoreOrder => {}
            Self::AscendingLevel => entries.sort_by_key(|e| e.level),
        }
    }
}
