// SPDX-License-Identifier: MIT OR Apache-2.0
//! Policy source lexer.
//!
//! The lexer is total: every input produces a token stream ending in exactly
//! one [`TokenKind::EndOfFile`]. Text it cannot classify becomes
//! [`TokenKind::Unknown`] and is rejected later by the parser.

use crate::token::{Position, Range, Token, TokenKind};

/// Tokenize `source`.
///
/// ```
/// use modgate_policy_lang::{lex, TokenKind};
///
/// let kinds: Vec<_> = lex("deny a b { X }").into_iter().map(|t| t.kind).collect();
/// assert_eq!(kinds.first(), Some(&TokenKind::Deny));
/// assert_eq!(kinds.last(), Some(&TokenKind::EndOfFile));
/// ```
pub fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.run();
    lexer.tokens
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `c` begins some token other than [`TokenKind::Unknown`].
fn starts_token(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || matches!(c, '{' | '}' | ';' | '"')
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }

    fn push(&mut self, kind: TokenKind, value: &str, start: Position) {
        self.tokens.push(Token {
            kind,
            value: value.to_string(),
            location: Range::new(start, self.position()),
        });
    }

    fn run(&mut self) {
        let src = self.src;
        while let Some(c) = self.peek() {
            let start = self.position();
            match c {
                c if is_whitespace(c) => {
                    self.bump();
                }
                '{' | '}' | ';' => {
                    self.bump();
                    let kind = match c {
                        '{' => TokenKind::BraceOpen,
                        '}' => TokenKind::BraceClose,
                        _ => TokenKind::Semicolon,
                    };
                    self.push(kind, &src[start.offset..self.offset], start);
                }
                '"' => self.string(start),
                c if c.is_ascii_digit() => {
                    self.bump_while(|c| c.is_ascii_digit());
                    self.push(
                        TokenKind::NumberLiteral,
                        &src[start.offset..self.offset],
                        start,
                    );
                }
                c if is_ident_start(c) => {
                    self.bump_while(is_ident_continue);
                    let word = &src[start.offset..self.offset];
                    let kind = match word {
                        "allow" => TokenKind::Allow,
                        "deny" => TokenKind::Deny,
                        _ => TokenKind::Identifier,
                    };
                    self.push(kind, word, start);
                }
                _ => {
                    self.bump_while(|c| !is_whitespace(c) && !starts_token(c));
                    self.push(
                        TokenKind::Unknown,
                        &src[start.offset..self.offset],
                        start,
                    );
                }
            }
        }
        let end = self.position();
        self.tokens.push(Token {
            kind: TokenKind::EndOfFile,
            value: String::new(),
            location: Range::point(end),
        });
    }

    fn string(&mut self, start: Position) {
        let src = self.src;
        self.bump();
        let body_start = self.offset;
        self.bump_while(|c| c != '"');
        let body_end = self.offset;
        if self.bump().is_some() {
            self.push(
                TokenKind::StringLiteral,
                &src[body_start..body_end],
                start,
            );
        } else {
            // Ran off the end without a closing quote.
            self.push(
                TokenKind::Unknown,
                &src[start.offset..self.offset],
                start,
            );
        }
    }
}
