// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end lexer and parser behaviour on realistic policy documents.

use modgate_policy_lang::{
    Action, Node, NodeKind, SyntaxErrorKind, TokenKind, lex, parse, walk,
};

const FOUR_STATEMENTS: &str = "\
allow user_t moderator_t { BanMembers };
deny user_t admin_t { KickMembers AttachFiles };
allow moderator_t user_t { KickMembers AttachFiles };
deny admin_t admin_t { ManageRoles };
";

#[test]
fn single_statement_tokens() {
    let tokens = lex("allow user_t moderator_t { BanMembers };");
    let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.value.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (TokenKind::Allow, "allow"),
            (TokenKind::Identifier, "user_t"),
            (TokenKind::Identifier, "moderator_t"),
            (TokenKind::BraceOpen, "{"),
            (TokenKind::Identifier, "BanMembers"),
            (TokenKind::BraceClose, "}"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::EndOfFile, ""),
        ]
    );
}

#[test]
fn single_statement_ast() {
    let root = parse("allow user_t moderator_t { BanMembers };").unwrap();
    assert_eq!(root.statements.len(), 1);
    let stmt = &root.statements[0];
    assert_eq!(stmt.action, Action::Allow);
    assert_eq!(stmt.source_label, "user_t");
    assert_eq!(stmt.target_label, "moderator_t");
    assert_eq!(stmt.capabilities, vec!["BanMembers"]);
}

#[test]
fn four_statements_keep_source_order() {
    let root = parse(FOUR_STATEMENTS).unwrap();
    assert_eq!(root.statements.len(), 4);

    let actions: Vec<_> = root.statements.iter().map(|s| s.action).collect();
    assert_eq!(
        actions,
        vec![Action::Allow, Action::Deny, Action::Allow, Action::Deny]
    );
    assert_eq!(
        root.statements[1].capabilities,
        vec!["KickMembers", "AttachFiles"]
    );
    for (i, stmt) in root.statements.iter().enumerate() {
        assert_eq!(stmt.location.start.line, i + 1);
        assert_eq!(stmt.location.start.column, 1);
    }
}

#[test]
fn walk_visits_root_then_each_statement() {
    let root = parse(FOUR_STATEMENTS).unwrap();
    let mut kinds = Vec::new();
    walk(&root, &mut |n: &dyn Node| kinds.push(n.kind()));
    assert_eq!(kinds.len(), 5);
    assert_eq!(kinds[0], NodeKind::Root);
    assert!(kinds[1..].iter().all(|k| *k == NodeKind::AllowDenyStatement));
}

#[test]
fn formatting_does_not_change_structure() {
    let compact = parse("allow a b {X Y};deny b a {Z}").unwrap();
    let spread = parse("allow   a\n  b {\n    X\n    Y\n  }\n\ndeny b a { Z };\n").unwrap();
    assert_ne!(compact, spread);
    assert_eq!(compact.without_locations(), spread.without_locations());
}

#[test]
fn error_points_at_offending_line() {
    let src = "allow a b { X };\ndeny a b { 42 };\n";
    let err = parse(src).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::UnexpectedToken);
    assert_eq!(err.found, TokenKind::NumberLiteral);
    assert_eq!(err.range.start.line, 2);
    assert_eq!(err.range.start.column, 12);
    assert_eq!(err.range.slice(src), "42");
    assert_eq!(
        err.to_string(),
        "2:12: unexpected number literal `42`, expected identifier"
    );
}

#[test]
fn string_literal_label_is_rejected() {
    let err = parse(r#"allow "user" b { X }"#).unwrap_err();
    assert_eq!(err.found, TokenKind::StringLiteral);
    assert_eq!(err.message, "unexpected string literal `user`, expected identifier");
}
