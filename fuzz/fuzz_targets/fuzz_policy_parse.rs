// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz the policy parser with arbitrary UTF-8.
//!
//! Parsing never panics, is deterministic, and every reported error range
//! lies inside the source.
#![no_main]
use libfuzzer_sys::fuzz_target;
use modgate_policy_lang::parse;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let first = parse(source);
    let second = parse(source);
    assert_eq!(first, second);

    match first {
        Ok(root) => {
            for stmt in &root.statements {
                assert!(!stmt.capabilities.is_empty());
                assert!(stmt.location.end.offset <= source.len());
            }
        }
        Err(err) => {
            assert!(err.range.start.offset <= source.len());
            assert!(err.range.start.line >= 1);
            assert!(!err.message.is_empty());
        }
    }
});
