// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the `modgate` CLI.
//!
//! Each function returns the text to print so it can be tested without
//! spawning the binary.

use anyhow::{Context, Result};
use modgate_config::{load_config, validate_config};
use modgate_core::TenantId;
use modgate_policy_lang::{LabelBindings, RootNode, SyntaxError, compile, lex, parse};
use serde::Serialize;
use std::path::Path;

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read policy file '{}'", path.display()))
}

/// Token stream of `path`, one token per line or as a JSON array.
pub fn lex_file(path: &Path, json: bool) -> Result<String> {
    let source = read_source(path)?;
    let tokens = lex(&source);
    if json {
        return serde_json::to_string_pretty(&tokens).context("serialize tokens");
    }
    let lines: Vec<String> = tokens
        .iter()
        .map(|t| {
            format!(
                "{}:{}\t{:?}\t{:?}",
                t.location.start.line, t.location.start.column, t.kind, t.value
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Result of `modgate check`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckReport {
    /// The file parsed.
    Ok {
        /// Number of statements.
        statements: usize,
        /// The parsed tree.
        ast: RootNode,
    },
    /// The file has a syntax error.
    Error {
        /// File name as given on the command line.
        file: String,
        /// The first error found.
        error: SyntaxError,
    },
}

impl CheckReport {
    /// `true` when the file parsed.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Human-readable one-liner.
    pub fn to_text(&self) -> String {
        match self {
            Self::Ok { statements, .. } => format!("OK ({statements} statements)"),
            Self::Error { file, error } => format!("{file}:{error}"),
        }
    }
}

/// Parse `path` and report the outcome.
pub fn check_file(path: &Path) -> Result<CheckReport> {
    let source = read_source(path)?;
    Ok(match parse(&source) {
        Ok(ast) => CheckReport::Ok {
            statements: ast.statements.len(),
            ast,
        },
        Err(error) => CheckReport::Error {
            file: path.display().to_string(),
            error,
        },
    })
}

/// Compile `path` against the label table in `bindings` and render the
/// resulting entries as JSON.
pub fn compile_file(path: &Path, bindings: &Path, tenant: TenantId) -> Result<String> {
    let source = read_source(path)?;
    let table = std::fs::read_to_string(bindings)
        .with_context(|| format!("read bindings file '{}'", bindings.display()))?;
    let table: LabelBindings = toml::from_str(&table)
        .with_context(|| format!("parse bindings file '{}'", bindings.display()))?;

    let root = parse(&source).map_err(|e| anyhow::anyhow!("{}:{e}", path.display()))?;
    let levels = compile(&root, tenant, &table)
        .map_err(|e| anyhow::anyhow!("{}:{e}", path.display()))?;
    serde_json::to_string_pretty(&levels).context("serialize compiled levels")
}

/// Load and validate a configuration file.
///
/// Returns whether the configuration is usable together with diagnostic
/// lines (errors and warnings).
pub fn config_check(path: Option<&Path>) -> (bool, Vec<String>) {
    let config = match load_config(path) {
        Ok(c) => c,
        Err(e) => return (false, vec![format!("error: {e}")]),
    };
    match validate_config(&config) {
        Ok(warnings) => {
            let mut out: Vec<String> = warnings.iter().map(|w| format!("warning: {w}")).collect();
            out.push("config: ok".into());
            (true, out)
        }
        Err(modgate_config::ConfigError::ValidationError { reasons }) => (
            false,
            reasons.iter().map(|r| format!("error: {r}")).collect(),
        ),
        Err(e) => (false, vec![format!("error: {e}")]),
    }
}

/// Pretty-printed JSON schema of the configuration file.
pub fn schema_json() -> Result<String> {
    serde_json::to_string_pretty(&modgate_config::config_schema()).context("serialize schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn lex_text_lists_every_token() {
        let f = file("deny a b { C }");
        let out = lex_file(f.path(), false).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "1:1\tDeny\t\"deny\"");
        assert!(lines[6].contains("EndOfFile"));
    }

    #[test]
    fn check_counts_statements() {
        let f = file("allow a b { X };\ndeny a b { Y }\n");
        let report = check_file(f.path()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.to_text(), "OK (2 statements)");
    }

    #[test]
    fn check_reports_location() {
        let f = file("allow a b { }");
        let report = check_file(f.path()).unwrap();
        assert!(!report.is_ok());
        let text = report.to_text();
        assert!(text.contains(":1:13: unexpected `}`"), "{text}");
    }

    #[test]
    fn check_json_is_tagged() {
        let f = file("allow a b { X }");
        let value = serde_json::to_value(check_file(f.path()).unwrap()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["statements"], 1);
        assert_eq!(value["ast"]["statements"][0]["action"], "allow");
    }

    #[test]
    fn compile_emits_entries() {
        let policy = file("allow moderator_t user_t { BanMembers ManageCases }");
        let bindings = file("[labels.moderator_t]\nlevel = 2\nroles = [400]\n[labels.user_t]\nlevel = 0\n");
        let out = compile_file(policy.path(), bindings.path(), TenantId(5)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["label"], "moderator_t");
        assert_eq!(value[0]["entry"]["level"], 2);
        assert_eq!(value[0]["entry"]["guild_id"], 5);
    }

    #[test]
    fn compile_rejects_unbound_label() {
        let policy = file("allow admin_t user_t { X }");
        let bindings = file("[labels.user_t]\nlevel = 0\n");
        let err = compile_file(policy.path(), bindings.path(), TenantId(5)).unwrap_err();
        assert!(err.to_string().contains("unknown label `admin_t`"));
    }

    #[test]
    fn config_check_reports_errors_and_warnings() {
        let bad = file("log_level = \"loud\"\n");
        let (ok, lines) = config_check(Some(bad.path()));
        assert!(!ok);
        assert_eq!(lines, vec!["error: invalid log_level 'loud'".to_string()]);

        let warn = file("log_level = \"info\"\n[resolver]\ncache_ttl_ms = 0\n");
        let (ok, lines) = config_check(Some(warn.path()));
        assert!(ok);
        assert!(lines[0].starts_with("warning: "));
        assert_eq!(lines.last().unwrap(), "config: ok");
    }
}
