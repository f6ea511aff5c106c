//! Parser
//!
//! Runs the pest grammar over source text and converts the resulting pairs
//! into a [`CstNode`] tree. Purely syntactic; building typed nodes is the
//! transformer's job.

use log::debug;
use pest::error::{Error, ErrorVariant, InputLocation, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::Span;
use crate::diagnostics::{ErrorContext, LineageError};
use crate::syntax::cst::CstNode;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
pub struct SasParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a complete program into its parse tree.
pub fn parse_tree(source: &str) -> Result<CstNode, LineageError> {
    let mut pairs =
        SasParser::parse(Rule::program, source).map_err(|e| convert_parse_error(e, source))?;

    // pest always yields the top rule on success; guard anyway
    let program = pairs.next().ok_or_else(|| {
        LineageError::transform("program", "no parse tree", Span::default())
    })?;

    let tree = build_node(program);
    debug!("parse tree built with {} top-level steps", tree.children.len());
    Ok(tree)
}

// ============================================================================
// TREE BUILDING
// ============================================================================

fn build_node(pair: Pair<Rule>) -> CstNode {
    let rule = pair.as_rule();
    let span = get_span(&pair);
    let text = pair.as_str().to_string();
    let children: Vec<CstNode> = pair
        .into_inner()
        .filter(|p| !is_dropped(p.as_rule()))
        .map(build_node)
        .collect();

    if children.is_empty() {
        CstNode::leaf(rule, text, span)
    } else {
        CstNode {
            rule,
            text: String::new(),
            span,
            children,
        }
    }
}

/// Keyword tokens and end-of-input carry no information beyond their parent.
fn is_dropped(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::EOI
            | Rule::kw_data
            | Rule::kw_run
            | Rule::kw_proc
            | Rule::kw_quit
            | Rule::kw_set
            | Rule::kw_merge
            | Rule::kw_by
            | Rule::kw_where
            | Rule::kw_if
            | Rule::kw_then
            | Rule::kw_else
            | Rule::kw_do
            | Rule::kw_while
            | Rule::kw_until
            | Rule::kw_to
            | Rule::kw_end
            | Rule::kw_keep
            | Rule::kw_drop
            | Rule::kw_rename
            | Rule::kw_input
            | Rule::kw_put
            | Rule::kw_infile
            | Rule::kw_file
            | Rule::kw_format
            | Rule::kw_informat
            | Rule::kw_label
            | Rule::kw_output
            | Rule::kw_retain
            | Rule::kw_length
            | Rule::kw_stop
            | Rule::kw_delete
    )
}

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>, source: &str) -> LineageError {
    let position = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match error.line_col {
        LineColLocation::Pos(lc) | LineColLocation::Span(lc, _) => lc,
    };

    let mut expected: Vec<String> = match &error.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            positives.iter().map(|rule| describe_rule(*rule)).collect()
        }
        ErrorVariant::CustomError { .. } => Vec::new(),
    };
    expected.sort();
    expected.dedup();

    let token = token_at(source, position);
    let found = if token.is_empty() {
        "end of input".to_string()
    } else {
        format!("`{token}`")
    };
    let span = Span {
        start: position,
        end: position + token.len(),
    };

    debug!("syntax error at {line}:{column}, found {found}");
    let help = if token.is_empty() {
        missing_terminator(&expected)
    } else {
        None
    };
    let error = LineageError::Syntax {
        found,
        expected,
        line,
        column,
        ctx: ErrorContext::with_span(span),
    };
    match help {
        Some(help) => error.with_help(help),
        None => error,
    }
}

/// Help for input that stops inside a step or a DO block.
fn missing_terminator(expected: &[String]) -> Option<&'static str> {
    if expected.iter().any(|e| e == "END") {
        Some("close the DO block with END;")
    } else if expected.iter().any(|e| e == "RUN" || e == "QUIT") {
        Some("terminate the step with RUN;")
    } else {
        None
    }
}

/// The token starting at `position`: a run of word characters, or a single
/// punctuation character.
fn token_at(source: &str, position: usize) -> &str {
    let rest = source.get(position..).unwrap_or("");
    let word_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if word_len > 0 {
        return &rest[..word_len];
    }
    match rest.chars().next() {
        Some(c) if !c.is_whitespace() => &rest[..c.len_utf8()],
        _ => "",
    }
}

/// Human name of a rule in "expected ..." lists: keywords upper-case,
/// productions with spaces.
fn describe_rule(rule: Rule) -> String {
    let name = format!("{rule:?}");
    match name.strip_prefix("kw_") {
        Some(keyword) => keyword.to_uppercase(),
        None if rule == Rule::EOI => "end of input".to_string(),
        None => name.replace('_', " "),
    }
}
