// SPDX-License-Identifier: MIT OR Apache-2.0
//! Native platform permission bits.
//!
//! Bit positions follow the chat platform's permission integer. Only the
//! bits the engine's tooling refers to by name get constants; unknown bits
//! survive every operation untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A set of native permission bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct NativePermissions(pub u64);

impl NativePermissions {
    /// No bits set.
    pub const NONE: Self = Self(0);
    /// Create instant invites.
    pub const CREATE_INSTANT_INVITE: Self = Self(1 << 0);
    /// Kick members.
    pub const KICK_MEMBERS: Self = Self(1 << 1);
    /// Ban members.
    pub const BAN_MEMBERS: Self = Self(1 << 2);
    /// Administrator.
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    /// Manage channels.
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    /// Manage the tenant itself.
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    /// Add reactions.
    pub const ADD_REACTIONS: Self = Self(1 << 6);
    /// View the audit log.
    pub const VIEW_AUDIT_LOG: Self = Self(1 << 7);
    /// View channels.
    pub const VIEW_CHANNEL: Self = Self(1 << 10);
    /// Send messages.
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    /// Manage (delete/pin) other members' messages.
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    /// Embed links.
    pub const EMBED_LINKS: Self = Self(1 << 14);
    /// Attach files.
    pub const ATTACH_FILES: Self = Self(1 << 15);
    /// Mention everyone.
    pub const MENTION_EVERYONE: Self = Self(1 << 17);
    /// Mute members in voice.
    pub const MUTE_MEMBERS: Self = Self(1 << 22);
    /// Change other members' nicknames.
    pub const MANAGE_NICKNAMES: Self = Self(1 << 27);
    /// Manage roles.
    pub const MANAGE_ROLES: Self = Self(1 << 28);
    /// Time out members.
    pub const MODERATE_MEMBERS: Self = Self(1 << 40);

    /// Named bits, in ascending bit order. Names are the PascalCase
    /// identifiers policy source uses for capabilities.
    pub const NAMED: &'static [(&'static str, NativePermissions)] = &[
        ("CreateInstantInvite", Self::CREATE_INSTANT_INVITE),
        ("KickMembers", Self::KICK_MEMBERS),
        ("BanMembers", Self::BAN_MEMBERS),
        ("Administrator", Self::ADMINISTRATOR),
        ("ManageChannels", Self::MANAGE_CHANNELS),
        ("ManageGuild", Self::MANAGE_GUILD),
        ("AddReactions", Self::ADD_REACTIONS),
        ("ViewAuditLog", Self::VIEW_AUDIT_LOG),
        ("ViewChannel", Self::VIEW_CHANNEL),
        ("SendMessages", Self::SEND_MESSAGES),
        ("ManageMessages", Self::MANAGE_MESSAGES),
        ("EmbedLinks", Self::EMBED_LINKS),
        ("AttachFiles", Self::ATTACH_FILES),
        ("MentionEveryone", Self::MENTION_EVERYONE),
        ("MuteMembers", Self::MUTE_MEMBERS),
        ("ManageNicknames", Self::MANAGE_NICKNAMES),
        ("ManageRoles", Self::MANAGE_ROLES),
        ("ModerateMembers", Self::MODERATE_MEMBERS),
    ];

    /// Look up a named bit, e.g. `"BanMembers"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bits)| *bits)
    }

    /// Raw bit value.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// `true` when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `required` is also set in `self`.
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Bits of `self` with every bit of `other` cleared.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Names of the named bits that are set, in ascending bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, bits)| self.contains(*bits))
            .map(|(n, _)| *n)
            .collect()
    }
}

impl BitOr for NativePermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NativePermissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for NativePermissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for NativePermissions {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for NativePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
