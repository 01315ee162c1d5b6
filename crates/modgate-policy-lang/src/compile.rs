// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile parsed statements into [`PermissionLevelEntry`] rows.
//!
//! Labels in policy source are symbolic. A [`LabelBindings`] table maps each
//! label to a level number plus the roles and users that hold it; the
//! compiler folds every statement whose *source* label is `L` into one entry
//! for `L`, in statement order, so a later `deny` cancels an earlier `allow`
//! of the same capability and vice versa.

use crate::ast::{Action, RootNode};
use crate::error::SyntaxError;
use crate::parser::parse;
use crate::token::Range;
use modgate_core::{NativePermissions, PermissionLevelEntry, PrincipalId, RoleId, TenantId};
use modgate_error::{ErrorCode, GateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// How one label maps onto stored permission levels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelBinding {
    /// Level number assigned to the compiled entry.
    pub level: u32,
    /// Roles whose holders carry the label.
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Principals carrying the label directly.
    #[serde(default)]
    pub users: BTreeSet<PrincipalId>,
}

/// Label table, usually loaded from TOML:
///
/// ```toml
/// [labels.moderator_t]
/// level = 2
/// roles = [400]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelBindings {
    /// Bindings keyed by label.
    #[serde(default)]
    pub labels: BTreeMap<String, LabelBinding>,
}

impl LabelBindings {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bind `label`.
    #[must_use]
    pub fn bind(mut self, label: impl Into<String>, binding: LabelBinding) -> Self {
        self.labels.insert(label.into(), binding);
        self
    }

    /// Binding for `label`, if any.
    pub fn get(&self, label: &str) -> Option<&LabelBinding> {
        self.labels.get(label)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A compiled entry together with the label it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledLevel {
    /// Source label.
    pub label: String,
    /// Target labels that statements for this label referred to.
    pub targets: BTreeSet<String>,
    /// The entry to persist.
    pub entry: PermissionLevelEntry,
}

/// Failure to compile a parsed policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The source did not parse.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A statement names a label missing from the bindings.
    #[error("{}:{}: unknown label `{label}`", .range.start.line, .range.start.column)]
    UnknownLabel {
        /// The unbound label.
        label: String,
        /// Span of the statement that used it.
        range: Range,
    },
}

impl From<CompileError> for GateError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Syntax(e) => e.into(),
            CompileError::UnknownLabel { label, range } => GateError::new(
                ErrorCode::PolicyUnknownLabel,
                format!("unknown label `{label}`"),
            )
            .with_context("label", &label)
            .with_context("line", range.start.line)
            .with_context("column", range.start.column),
        }
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Compile `root` into one [`CompiledLevel`] per distinct source label, in
/// the order labels first appear.
///
/// Capability names that match a [`NativePermissions`] name (for example
/// `BanMembers`) become native bits; every other name becomes a custom
/// permission key.
///
/// # Errors
///
/// [`CompileError::UnknownLabel`] if a source or target label is unbound.
pub fn compile(
    root: &RootNode,
    tenant_id: TenantId,
    bindings: &LabelBindings,
) -> Result<Vec<CompiledLevel>, CompileError> {
    let mut out: Vec<CompiledLevel> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for stmt in &root.statements {
        for label in [&stmt.source_label, &stmt.target_label] {
            if bindings.get(label).is_none() {
                return Err(CompileError::UnknownLabel {
                    label: label.clone(),
                    range: stmt.location,
                });
            }
        }
        let slot = match index.get(stmt.source_label.as_str()) {
            Some(&i) => i,
            None => {
                let binding = bindings.get(&stmt.source_label).cloned().unwrap_or_default();
                let mut entry = PermissionLevelEntry::new(tenant_id, binding.level);
                entry.roles = binding.roles;
                entry.users = binding.users;
                out.push(CompiledLevel {
                    label: stmt.source_label.clone(),
                    targets: BTreeSet::new(),
                    entry,
                });
                index.insert(stmt.source_label.as_str(), out.len() - 1);
                out.len() - 1
            }
        };

        let level = &mut out[slot];
        level.targets.insert(stmt.target_label.clone());
        for cap in &stmt.capabilities {
            apply(&mut level.entry, stmt.action, cap);
        }
    }

    debug!(
        target: "modgate.policy_lang",
        tenant = %tenant_id,
        levels = out.len(),
        "compiled policy"
    );
    Ok(out)
}

/// Parse and compile in one step.
///
/// # Errors
///
/// Any [`SyntaxError`] or [`CompileError::UnknownLabel`].
pub fn compile_source(
    source: &str,
    tenant_id: TenantId,
    bindings: &LabelBindings,
) -> Result<Vec<CompiledLevel>, CompileError> {
    let root = parse(source)?;
    compile(&root, tenant_id, bindings)
}

fn apply(entry: &mut PermissionLevelEntry, action: Action, capability: &str) {
    if let Some(bits) = NativePermissions::from_name(capability) {
        let (add, remove) = match action {
            Action::Allow => (
                &mut entry.granted_native_permissions,
                &mut entry.denied_native_permissions,
            ),
            Action::Deny => (
                &mut entry.denied_native_permissions,
                &mut entry.granted_native_permissions,
            ),
        };
        *add |= bits;
        *remove = remove.difference(bits);
    } else {
        let (add, remove) = match action {
            Action::Allow => (
                &mut entry.granted_custom_permission_keys,
                &mut entry.denied_custom_permission_keys,
            ),
            Action::Deny => (
                &mut entry.denied_custom_permission_keys,
                &mut entry.granted_custom_permission_keys,
            ),
        };
        remove.remove(capability);
        add.insert(capability.to_string());
    }
}
