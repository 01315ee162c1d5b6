// SPDX-License-Identifier: MIT OR Apache-2.0
//! modgate-policy-lang
//!
//! The allow/deny policy language: a total lexer, a recursive-descent parser
//! producing an immutable AST, and a compiler that turns statements into
//! [`modgate_core::PermissionLevelEntry`] rows given a label binding table.
//!
//! ```
//! use modgate_policy_lang::{parse, Action};
//!
//! let root = parse("allow user_t moderator_t { BanMembers };").unwrap();
//! let stmt = &root.statements[0];
//! assert_eq!(stmt.action, Action::Allow);
//! assert_eq!(stmt.source_label, "user_t");
//! assert_eq!(stmt.target_label, "moderator_t");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// AST node types and traversal.
pub mod ast;
/// Statement-to-entry compiler.
pub mod compile;
/// Syntax errors.
pub mod error;
/// Source tokenizer.
pub mod lexer;
/// Grammar.
pub mod parser;
/// Tokens, positions and ranges.
pub mod token;

pub use ast::{Action, AllowDenyStatementNode, Node, NodeKind, RootNode, walk};
pub use compile::{
    CompileError, CompiledLevel, LabelBinding, LabelBindings, compile, compile_source,
};
pub use error::{SyntaxError, SyntaxErrorKind};
pub use lexer::lex;
pub use parser::{parse, parse_tokens};
pub use token::{Position, Range, Token, TokenKind};
