// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokens and source locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the source text.
///
/// `offset` is a 0-based byte offset; `line` and `column` are 1-based and
/// count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the start of the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Position {
    /// The first character of any source.
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open span `[start, end)` of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    /// First position covered.
    pub start: Position,
    /// Position just past the last character covered.
    pub end: Position,
}

impl Range {
    /// Build a range from two positions.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range at `at`.
    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// `true` for zero-width ranges.
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// The source text this range covers.
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start.offset..self.end.offset]
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// The `allow` keyword.
    Allow,
    /// The `deny` keyword.
    Deny,
    /// A bare word `[A-Za-z_][A-Za-z0-9_]*` other than a keyword.
    Identifier,
    /// `{`
    BraceOpen,
    /// `}`
    BraceClose,
    /// `;`
    Semicolon,
    /// A double-quoted run; the value excludes the quotes.
    StringLiteral,
    /// A run of ASCII digits.
    NumberLiteral,
    /// Characters that cannot start any other token, or an unterminated
    /// string literal.
    Unknown,
    /// Zero-width end-of-input marker; always the last token.
    EndOfFile,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allow => "`allow`",
            Self::Deny => "`deny`",
            Self::Identifier => "identifier",
            Self::BraceOpen => "`{`",
            Self::BraceClose => "`}`",
            Self::Semicolon => "`;`",
            Self::StringLiteral => "string literal",
            Self::NumberLiteral => "number literal",
            Self::Unknown => "unrecognized input",
            Self::EndOfFile => "end of input",
        };
        f.write_str(s)
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Token text (string literals without their quotes).
    pub value: String,
    /// Source span, including quotes for string literals.
    pub location: Range,
}

impl Token {
    /// How diagnostics refer to this token, e.g. ``identifier `user_t` ``.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Identifier
            | TokenKind::StringLiteral
            | TokenKind::NumberLiteral
            | TokenKind::Unknown => format!("{} `{}`", self.kind, self.value),
            _ => self.kind.to_string(),
        }
    }
}
