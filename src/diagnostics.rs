//! Diagnostics for the parse and transform stages.
//!
//! The crate has two failure modes, both fatal to the call that raised them:
//!
//! - [`LineageError::Syntax`]: the text does not match the grammar.
//! - [`LineageError::Transform`]: a parse-tree node has a shape its
//!   construction rule does not accept.
//!
//! Both carry an [`ErrorContext`] and render through `miette`. Attach the
//! source text with [`LineageError::with_source`] before reporting so the
//! label points into the file.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::ast::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Source, location and help for a diagnostic.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum LineageError {
    #[error("syntax error at line {line}, column {column}: unexpected {found}{}", expected_suffix(.expected))]
    Syntax {
        found: String,
        expected: Vec<String>,
        line: usize,
        column: usize,
        ctx: ErrorContext,
    },
    #[error("cannot build `{rule}` from {shape}")]
    Transform {
        rule: String,
        shape: String,
        ctx: ErrorContext,
    },
}

fn expected_suffix(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [one] => format!(", expected {one}"),
        many => format!(", expected one of {}", many.join(", ")),
    }
}

impl LineageError {
    pub fn transform(rule: impl Into<String>, shape: impl Into<String>, span: Span) -> Self {
        LineageError::Transform {
            rule: rule.into(),
            shape: shape.into(),
            ctx: ErrorContext::with_span(span),
        }
    }

    /// Attaches the named source text the span points into.
    pub fn with_source(mut self, name: impl AsRef<str>, text: impl Into<String>) -> Self {
        self.ctx_mut().source = Some(Arc::new(NamedSource::new(name, text.into())));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.ctx_mut().help = Some(help.into());
        self
    }

    pub fn ctx(&self) -> &ErrorContext {
        match self {
            LineageError::Syntax { ctx, .. } | LineageError::Transform { ctx, .. } => ctx,
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            LineageError::Syntax { ctx, .. } | LineageError::Transform { ctx, .. } => ctx,
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.ctx().span
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, LineageError::Syntax { .. })
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, LineageError::Transform { .. })
    }
}

impl Diagnostic for LineageError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            LineageError::Syntax { .. } => "sas::syntax",
            LineageError::Transform { .. } => "sas::transform",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        // Without source text miette cannot resolve the span.
        self.ctx().source.as_ref()?;
        let span = self.ctx().span?;
        let text = match self {
            LineageError::Syntax { found, .. } => format!("unexpected {found}"),
            LineageError::Transform { rule, .. } => format!("in `{rule}`"),
        };
        let label = LabeledSpan::new(Some(text), span.start, span.len().max(1));
        Some(Box::new(std::iter::once(label)))
    }
}
