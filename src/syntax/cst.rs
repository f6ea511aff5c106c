//! # Parse Tree
//!
//! The generic, production-typed tree handed from the parser to the
//! transformer. Every interior node names the grammar rule that produced it;
//! leaves additionally carry the matched token text.
//!
//! ## Invariants
//! - Keyword tokens and `EOI` never appear as children.
//! - Children are in source order.

use serde::Serialize;

use crate::ast::Span;
use crate::syntax::parser::Rule;

/// One node of the parse tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CstNode {
    #[serde(serialize_with = "serialize_rule")]
    pub rule: Rule,
    /// Matched text for leaf tokens; empty for interior nodes.
    pub text: String,
    pub span: Span,
    pub children: Vec<CstNode>,
}

impl CstNode {
    /// A leaf token node.
    pub fn leaf(rule: Rule, text: impl Into<String>, span: Span) -> Self {
        Self {
            rule,
            text: text.into(),
            span,
            children: Vec::new(),
        }
    }

    /// An interior node; its span covers its children.
    pub fn branch(rule: Rule, children: Vec<CstNode>) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => Span {
                start: first.span.start,
                end: last.span.end,
            },
            _ => Span::default(),
        };
        Self {
            rule,
            text: String::new(),
            span,
            children,
        }
    }

    /// Renders the tree one node per line, indented by depth.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(0, &mut out);
        out
    }

    fn pretty_into(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?}", self.rule));
        if self.children.is_empty() && !self.text.is_empty() {
            out.push_str(&format!(" {:?}", self.text));
        }
        out.push('\n');
        for child in &self.children {
            child.pretty_into(depth + 1, out);
        }
    }
}

fn serialize_rule<S: serde::Serializer>(rule: &Rule, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{rule:?}"))
}
