// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz parse and compile with structurally valid programs.
//!
//! Programs rendered from arbitrary statements always parse, the parse
//! result round-trips the statement fields, and compiling against a table
//! binding every label succeeds with one level per distinct source label.
#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modgate_core::TenantId;
use modgate_policy_lang::{Action, LabelBinding, LabelBindings, compile, parse};
use std::collections::BTreeSet;

const LABELS: &[&str] = &["user_t", "helper_t", "moderator_t", "admin_t"];
const CAPS: &[&str] = &["BanMembers", "KickMembers", "AttachFiles", "ManageCases", "Notes"];

#[derive(Debug, Arbitrary)]
struct Stmt {
    deny: bool,
    source: u8,
    target: u8,
    caps: Vec<u8>,
    semicolon: bool,
}

fuzz_target!(|stmts: Vec<Stmt>| {
    let mut src = String::new();
    let mut expected = Vec::new();
    for s in stmts.iter().take(64) {
        let caps: Vec<&str> = s
            .caps
            .iter()
            .take(8)
            .map(|c| CAPS[*c as usize % CAPS.len()])
            .collect();
        if caps.is_empty() {
            continue;
        }
        let source = LABELS[s.source as usize % LABELS.len()];
        let target = LABELS[s.target as usize % LABELS.len()];
        let action = if s.deny { Action::Deny } else { Action::Allow };
        src.push_str(&format!(
            "{action} {source} {target} {{ {} }}{}\n",
            caps.join(" "),
            if s.semicolon { ";" } else { "" }
        ));
        expected.push((action, source, target, caps));
    }

    let root = parse(&src).expect("rendered program parses");
    assert_eq!(root.statements.len(), expected.len());
    for (stmt, (action, source, target, caps)) in root.statements.iter().zip(&expected) {
        assert_eq!(stmt.action, *action);
        assert_eq!(stmt.source_label, *source);
        assert_eq!(stmt.target_label, *target);
        assert_eq!(&stmt.capabilities, caps);
    }

    let mut bindings = LabelBindings::new();
    for (i, label) in LABELS.iter().enumerate() {
        bindings = bindings.bind(
            *label,
            LabelBinding {
                level: i as u32,
                ..Default::default()
            },
        );
    }
    let levels = compile(&root, TenantId(1), &bindings).expect("every label is bound");
    let sources: BTreeSet<&str> = expected.iter().map(|(_, s, _, _)| *s).collect();
    assert_eq!(levels.len(), sources.len());
});
