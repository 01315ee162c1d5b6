// SPDX-License-Identifier: MIT OR Apache-2.0
//! Syntax errors raised by the parser.

use crate::token::{Range, TokenKind};
use modgate_error::{ErrorCode, GateError};
use serde::Serialize;
use thiserror::Error;

/// Classification of a [`SyntaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxErrorKind {
    /// The token stream did not match the grammar.
    UnexpectedToken,
    /// A `"` was never closed.
    UnterminatedString,
}

/// A policy source that does not match the grammar.
///
/// Parsing either succeeds completely or yields exactly one of these; no
/// partial tree is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}:{}: {message}", .range.start.line, .range.start.column)]
pub struct SyntaxError {
    /// What went wrong.
    pub kind: SyntaxErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Span of the offending token.
    pub range: Range,
    /// Token kinds that would have been accepted.
    pub expected: Vec<TokenKind>,
    /// Kind of the offending token.
    pub found: TokenKind,
}

impl From<SyntaxError> for GateError {
    fn from(err: SyntaxError) -> Self {
        GateError::new(ErrorCode::PolicySyntax, err.message.clone())
            .with_context("line", err.range.start.line)
            .with_context("column", err.range.start.column)
            .with_source(err)
    }
}
