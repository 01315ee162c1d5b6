// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz the policy lexer with arbitrary UTF-8.
//!
//! The lexer is total: every input produces tokens ending in exactly one
//! `EndOfFile`, and the token spans tile the source without gaps once
//! whitespace is skipped.
#![no_main]
use libfuzzer_sys::fuzz_target;
use modgate_policy_lang::{TokenKind, lex};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let tokens = lex(source);

    let last = tokens.last().expect("lexer always emits EndOfFile");
    assert_eq!(last.kind, TokenKind::EndOfFile);
    assert_eq!(last.location.start.offset, source.len());
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::EndOfFile).count(),
        1
    );

    let mut cursor = 0;
    for t in &tokens {
        let gap = &source[cursor..t.location.start.offset];
        assert!(gap.chars().all(char::is_whitespace), "non-whitespace gap {gap:?}");
        assert!(t.location.start.offset <= t.location.end.offset);
        cursor = t.location.end.offset;
    }
});
