// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz configuration parsing and validation with arbitrary TOML text.
#![no_main]
use libfuzzer_sys::fuzz_target;
use modgate_config::{merge_configs, parse_toml, validate_config};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = parse_toml(text) else {
        return;
    };
    let _ = validate_config(&config);
    let _ = config.tenant_settings();

    // Merging with itself is idempotent.
    let merged = merge_configs(config.clone(), config.clone());
    assert_eq!(merged, config);
});
