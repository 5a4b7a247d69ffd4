//! Rectify Error Handling
//!
//! One error type for every failure that is not an abstention. Checkers and rules
//! that cannot decide simply do not report; everything in this module is a real
//! failure: unreadable input, malformed rule definitions, conflicting edits or bad
//! configuration.

use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text plus the name it was loaded under, for labelled error reports.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// 1-based line and column of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        line_column(&self.content, offset)
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Unified error type for all Rectify failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum RectifyError {
    #[error("Parse error: {message}")]
    #[diagnostic(code(rectify::parse))]
    Parse {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("here")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid template rule `{rule}`: {message}")]
    #[diagnostic(
        code(rectify::rule_definition),
        help("template rules are validated when they are built; fix the rule definition")
    )]
    RuleDefinition { rule: String, message: String },

    #[error("Edits overlap: {first:?} and {second:?}")]
    #[diagnostic(code(rectify::overlapping_edits))]
    OverlappingEdits { first: Span, second: Span },

    #[error("Edit {span:?} lies outside the {len}-byte source or splits a character")]
    #[diagnostic(code(rectify::edit_out_of_bounds))]
    EditOutOfBounds { span: Span, len: usize },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(rectify::config))]
    Config { message: String },

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(rectify::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RectifyError {
    pub fn rule_definition(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleDefinition {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The primary message of a parse error, with its 1-based position.
    ///
    /// Used where a parse failure is reported as a diagnostic message rather than an
    /// error, e.g. for malformed inline test sources.
    pub fn located_message(&self) -> String {
        match self {
            RectifyError::Parse {
                message, src, span, ..
            } => {
                let (line, column) = line_column(src.inner(), span.offset());
                format!("{line}:{column}: error: {message}")
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// ERROR UTILITIES
// ============================================================================

/// Converts an AST Span to a miette SourceSpan.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

/// 1-based line and column of a byte offset within `text`.
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |newline| {
            before[newline + 1..].chars().count()
        })
        + 1;
    (line, column)
}

/// Prints a RectifyError with full miette diagnostics.
pub fn print_error(error: RectifyError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_is_one_based() {
        assert_eq!(line_column("ab\ncd", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("ab", 99), (1, 3));
    }

    #[test]
    fn located_message_prefixes_position() {
        let context = SourceContext::from_file("A.java", "class A {\n  int\n}");
        let error = RectifyError::Parse {
            message: "expected identifier".into(),
            src: context.to_named_source(),
            span: to_source_span(Span::point(16)),
            help: None,
        };
        assert_eq!(error.located_message(), "3:1: error: expected identifier");
    }
}
