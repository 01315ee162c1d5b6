// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end: policy source is compiled into level entries, stored, resolved
//! and enforced by the gatekeeper under a TOML configuration.

use modgate_config::parse_toml;
use modgate_core::{
    CommandMetadata, ManualClock, NativePermissions, Principal, PrincipalId, RoleId, Subject,
    TenantId,
};
use modgate_policy::{InMemoryLevelStore, PermissionRegistry};
use modgate_policy_lang::{LabelBindings, compile_source};
use modgate_runtime::{Admission, Gatekeeper, Requirement};
use std::sync::Arc;
use std::time::Duration;

const TENANT: TenantId = TenantId(81_384_788_765_712_384);
const HELPER_ROLE: RoleId = RoleId(300);
const MOD_ROLE: RoleId = RoleId(400);

const POLICY: &str = r#"
allow helper_t user_t { KickMembers ManageCases };
allow moderator_t user_t { KickMembers BanMembers ManageCases ViewNotes };
allow moderator_t helper_t { KickMembers }
deny moderator_t user_t { ViewNotes }
"#;

const BINDINGS: &str = r#"
[labels.user_t]
level = 0

[labels.helper_t]
level = 1
roles = [300]

[labels.moderator_t]
level = 2
roles = [400]
users = [99]
"#;

const CONFIG: &str = r#"
[resolver]
merge_order = "ascending_level"

[tenants."81384788765712384".rate_limit]
enabled = true
max_attempts = 2
timeframe_ms = 60000

[tenants."81384788765712384".rate_limit.per_command_overrides.kick]
enabled = false
"#;

struct World {
    registry: Arc<PermissionRegistry>,
    store: Arc<InMemoryLevelStore>,
    clock: ManualClock,
    gate: Gatekeeper,
}

fn world() -> World {
    let bindings: LabelBindings = toml::from_str(BINDINGS).unwrap();
    let levels = compile_source(POLICY, TENANT, &bindings).unwrap();
    let store = Arc::new(InMemoryLevelStore::with_entries(
        levels.into_iter().map(|l| l.entry),
    ));
    let registry = Arc::new(PermissionRegistry::new());
    registry.register_all(["ManageCases", "ViewNotes"]);
    let clock = ManualClock::new(1_700_000_000_000);
    let config = parse_toml(CONFIG).unwrap();
    let gate = Gatekeeper::from_config(
        &config,
        store.clone(),
        Arc::clone(&registry),
        Arc::new(clock.clone()),
    )
    .unwrap();
    World {
        registry,
        store,
        clock,
        gate,
    }
}

fn ban(registry: &PermissionRegistry) -> Requirement {
    Requirement::resolve(NativePermissions::BAN_MEMBERS, ["ManageCases"], registry).unwrap()
}

#[tokio::test]
async fn compiled_policy_drives_authorization() {
    let w = world();
    let helper: Subject = Principal::new(1u64).with_role(HELPER_ROLE).into();
    let moderator: Subject = Principal::new(2u64).with_role(MOD_ROLE).into();
    let cmd = CommandMetadata::new("ban");

    assert_eq!(
        w.gate.admit(&helper, TENANT, &cmd, &ban(&w.registry)).await.unwrap(),
        Admission::Denied
    );
    assert_eq!(
        w.gate.admit(&moderator, TENANT, &cmd, &ban(&w.registry)).await.unwrap(),
        Admission::Admitted
    );

    let perms = w
        .gate
        .resolver()
        .effective_permissions_for(&moderator, TENANT)
        .await
        .unwrap();
    assert_eq!(perms.level, 2);
    let notes = w.registry.resolve("ViewNotes").unwrap();
    assert!(!perms.custom_permissions.contains(&notes));
}

#[tokio::test]
async fn direct_user_binding_matches_without_roles() {
    let w = world();
    let direct: Subject = Principal::new(99u64).into();
    let perms = w
        .gate
        .resolver()
        .effective_permissions_for(&direct, TENANT)
        .await
        .unwrap();
    assert_eq!(perms.level, 2);
    assert!(perms.native_permissions.contains(NativePermissions::BAN_MEMBERS));
}

#[tokio::test]
async fn tenant_tier_applies_per_command() {
    let w = world();
    let moderator: Subject = Principal::new(2u64).with_role(MOD_ROLE).into();
    let ban_cmd = CommandMetadata::new("ban");
    let kick_cmd = CommandMetadata::new("kick");
    let req = ban(&w.registry);
    let kick_req = Requirement::native(NativePermissions::KICK_MEMBERS);

    let mut verdicts = Vec::new();
    for _ in 0..3 {
        verdicts.push(w.gate.admit(&moderator, TENANT, &ban_cmd, &req).await.unwrap());
    }
    assert_eq!(
        verdicts,
        vec![Admission::Admitted, Admission::Admitted, Admission::RateLimited]
    );

    // The override switches the tenant tier off for `kick`.
    for _ in 0..5 {
        assert_eq!(
            w.gate
                .admit(&moderator, TENANT, &kick_cmd, &kick_req)
                .await
                .unwrap(),
            Admission::Admitted
        );
    }
}

#[tokio::test]
async fn policy_edits_show_up_after_ttl() {
    let w = world();
    let helper: Subject = Principal::new(1u64).with_role(HELPER_ROLE).into();
    let cmd = CommandMetadata::new("ban");
    assert_eq!(
        w.gate.admit(&helper, TENANT, &cmd, &ban(&w.registry)).await.unwrap(),
        Admission::Denied
    );

    let bindings: LabelBindings = toml::from_str(BINDINGS).unwrap();
    let promoted = compile_source(
        "allow helper_t user_t { BanMembers ManageCases }",
        TENANT,
        &bindings,
    )
    .unwrap();
    w.store.replace_all(promoted.into_iter().map(|l| l.entry));

    // Still cached.
    assert_eq!(
        w.gate.admit(&helper, TENANT, &cmd, &ban(&w.registry)).await.unwrap(),
        Admission::Denied
    );

    w.clock.advance(Duration::from_millis(60_001));
    assert_eq!(
        w.gate.admit(&helper, TENANT, &cmd, &ban(&w.registry)).await.unwrap(),
        Admission::Admitted
    );
}

#[tokio::test]
async fn bare_users_are_never_authorized_for_guarded_commands() {
    let w = world();
    let user = Subject::User(PrincipalId(2));
    let verdict = w
        .gate
        .admit(&user, TENANT, &CommandMetadata::new("ban"), &ban(&w.registry))
        .await
        .unwrap();
    assert_eq!(verdict, Admission::Denied);
}
