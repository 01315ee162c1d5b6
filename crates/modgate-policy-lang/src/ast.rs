// SPDX-License-Identifier: MIT OR Apache-2.0
//! Abstract syntax tree for policy source.
//!
//! Nodes are built once by the parser and never mutated afterwards, except
//! by tooling that explicitly normalizes locations (see
//! [`RootNode::strip_locations`]).

use crate::token::Range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a statement grants or revokes its capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// `allow`
    Allow,
    /// `deny`
    Deny,
}

impl Action {
    /// Keyword spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of a node, for generic traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// [`RootNode`]
    Root,
    /// [`AllowDenyStatementNode`]
    AllowDenyStatement,
}

/// Generic view of an AST node.
pub trait Node {
    /// Which variant this node is.
    fn kind(&self) -> NodeKind;
    /// Source span covered by the node.
    fn location(&self) -> Range;
    /// Immediate children, in source order.
    fn branches(&self) -> Vec<&dyn Node>;
}

/// `allow|deny <source> <target> { <capability>... };`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowDenyStatementNode {
    /// Grant or revoke.
    pub action: Action,
    /// Label of the acting role class.
    pub source_label: String,
    /// Label of the role class acted upon.
    pub target_label: String,
    /// Capability identifiers in source order; duplicates are kept.
    pub capabilities: Vec<String>,
    /// Span from the keyword to the closing brace or semicolon.
    pub location: Range,
}

impl Node for AllowDenyStatementNode {
    fn kind(&self) -> NodeKind {
        NodeKind::AllowDenyStatement
    }

    fn location(&self) -> Range {
        self.location
    }

    fn branches(&self) -> Vec<&dyn Node> {
        Vec::new()
    }
}

/// A whole policy document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RootNode {
    /// Statements in source order.
    pub statements: Vec<AllowDenyStatementNode>,
    /// Span of the entire source.
    pub location: Range,
}

impl Node for RootNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Root
    }

    fn location(&self) -> Range {
        self.location
    }

    fn branches(&self) -> Vec<&dyn Node> {
        self.statements.iter().map(|s| s as &dyn Node).collect()
    }
}

impl RootNode {
    /// Reset every location in the tree to [`Range::default`], so trees
    /// parsed from differently formatted sources compare equal.
    pub fn strip_locations(&mut self) {
        self.location = Range::default();
        for stmt in &mut self.statements {
            stmt.location = Range::default();
        }
    }

    /// Copy of the tree with locations stripped.
    #[must_use]
    pub fn without_locations(&self) -> RootNode {
        let mut copy = self.clone();
        copy.strip_locations();
        copy
    }
}

/// Visit `node` and all of its descendants in pre-order.
pub fn walk<'a>(node: &'a dyn Node, visit: &mut dyn FnMut(&'a dyn Node)) {
    visit(node);
    for child in node.branches() {
        walk(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    fn stmt(action: Action, caps: &[&str]) -> AllowDenyStatementNode {
        AllowDenyStatementNode {
            action,
            source_label: "user_t".into(),
            target_label: "moderator_t".into(),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            location: Range::point(Position {
                offset: 4,
                line: 1,
                column: 5,
            }),
        }
    }

    #[test]
    fn walk_is_preorder() {
        let root = RootNode {
            statements: vec![stmt(Action::Allow, &["A"]), stmt(Action::Deny, &["B"])],
            location: Range::default(),
        };
        let mut seen = Vec::new();
        walk(&root, &mut |n| seen.push(n.kind()));
        assert_eq!(
            seen,
            vec![
                NodeKind::Root,
                NodeKind::AllowDenyStatement,
                NodeKind::AllowDenyStatement
            ]
        );
    }

    #[test]
    fn statements_are_leaves() {
        assert!(stmt(Action::Allow, &["A"]).branches().is_empty());
    }

    #[test]
    fn strip_locations_resets_every_node() {
        let mut root = RootNode {
            statements: vec![stmt(Action::Allow, &["A"])],
            location: Range::point(Position {
                offset: 9,
                line: 2,
                column: 1,
            }),
        };
        root.strip_locations();
        let mut locations = Vec::new();
        walk(&root, &mut |n| locations.push(n.location()));
        assert!(locations.iter().all(|r| *r == Range::default()));
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Deny).unwrap(), r#""deny""#);
    }
}
