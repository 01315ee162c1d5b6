// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive-descent parser for policy source.
//!
//! ```text
//! program   := statement* EOF
//! statement := ("allow" | "deny") IDENT IDENT "{" IDENT+ "}" ";"?
//! ```

use crate::ast::{Action, AllowDenyStatementNode, RootNode};
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::lexer::lex;
use crate::token::{Position, Range, Token, TokenKind};
use tracing::debug;

/// Parse policy source into a [`RootNode`].
///
/// # Errors
///
/// Returns the first [`SyntaxError`] encountered; no partial tree is
/// produced.
///
/// ```
/// let root = modgate_policy_lang::parse("allow user_t moderator_t { BanMembers };").unwrap();
/// assert_eq!(root.statements[0].capabilities, vec!["BanMembers"]);
/// ```
pub fn parse(source: &str) -> Result<RootNode, SyntaxError> {
    parse_tokens(&lex(source))
}

/// Parse an already lexed token stream.
///
/// The stream must end with [`TokenKind::EndOfFile`], as produced by
/// [`lex`]. A stream missing it is treated as ending after its last token.
pub fn parse_tokens(tokens: &[Token]) -> Result<RootNode, SyntaxError> {
    let root = Parser { tokens, pos: 0 }.program()?;
    debug!(
        target: "modgate.policy_lang",
        statements = root.statements.len(),
        "parsed policy"
    );
    Ok(root)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn program(mut self) -> Result<RootNode, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Allow | TokenKind::Deny => statements.push(self.statement()?),
                TokenKind::EndOfFile => {
                    let end = tok.location.end;
                    return Ok(RootNode {
                        statements,
                        location: Range::new(Position::START, end),
                    });
                }
                _ => {
                    return Err(unexpected(
                        &tok,
                        &[TokenKind::Allow, TokenKind::Deny, TokenKind::EndOfFile],
                    ));
                }
            }
        }
    }

    fn statement(&mut self) -> Result<AllowDenyStatementNode, SyntaxError> {
        let keyword = self.next();
        let action = match keyword.kind {
            TokenKind::Allow => Action::Allow,
            _ => Action::Deny,
        };
        let source_label = self.expect(TokenKind::Identifier)?.value;
        let target_label = self.expect(TokenKind::Identifier)?.value;
        self.expect(TokenKind::BraceOpen)?;

        let mut capabilities = vec![self.expect(TokenKind::Identifier)?.value];
        let close = loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Identifier => {
                    self.pos += 1;
                    capabilities.push(tok.value);
                }
                TokenKind::BraceClose => {
                    self.pos += 1;
                    break tok;
                }
                _ => {
                    return Err(unexpected(
                        &tok,
                        &[TokenKind::Identifier, TokenKind::BraceClose],
                    ));
                }
            }
        };

        let mut end = close.location;
        let after = self.peek();
        if after.kind == TokenKind::Semicolon {
            self.pos += 1;
            end = after.location;
        }

        Ok(AllowDenyStatementNode {
            action,
            source_label,
            target_label,
            capabilities,
            location: keyword.location.to(end),
        })
    }

    fn peek(&self) -> Token {
        match self.tokens.get(self.pos) {
            Some(tok) => tok.clone(),
            None => self.synthetic_eof(),
        }
    }

    fn next(&mut self) -> Token {
        let tok = self.peek();
        if tok.kind != TokenKind::EndOfFile {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        let tok = self.peek();
        if tok.kind == kind {
            self.pos += 1;
            Ok(tok)
        } else {
            Err(unexpected(&tok, &[kind]))
        }
    }

    fn synthetic_eof(&self) -> Token {
        let at = self
            .tokens
            .last()
            .map_or(Position::START, |t| t.location.end);
        Token {
            kind: TokenKind::EndOfFile,
            value: String::new(),
            location: Range::point(at),
        }
    }
}

fn unexpected(found: &Token, expected: &[TokenKind]) -> SyntaxError {
    if found.kind == TokenKind::Unknown && found.value.starts_with('"') {
        return SyntaxError {
            kind: SyntaxErrorKind::UnterminatedString,
            message: "unterminated string literal".to_string(),
            range: found.location,
            expected: expected.to_vec(),
            found: found.kind,
        };
    }
    SyntaxError {
        kind: SyntaxErrorKind::UnexpectedToken,
        message: format!("unexpected {}, expected {}", found.describe(), one_of(expected)),
        range: found.location,
        expected: expected.to_vec(),
        found: found.kind,
    }
}

fn one_of(kinds: &[TokenKind]) -> String {
    let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}
