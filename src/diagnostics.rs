//! Rectify Diagnostics
//!
//! # Overview
//!
//! A checker or template rule communicates its findings through two channels:
//!
//! - the **verdict** for the node it was asked about ([`Verdict::Match`] or
//!   [`Verdict::NoMatch`]), and
//! - the **reporter** ([`Reporter::report`]) for findings anchored somewhere else,
//!   e.g. a factory method discovered while visiting a test method.
//!
//! A `NoMatch` verdict with out-of-band reports is normal.
//!
//! # Building diagnostics
//!
//! - Use [`DiagnosticBuilder::describe`] to anchor a finding on a node; the message
//!   defaults to the checker summary.
//! - Attach fixes with [`DiagnosticBuilder::fix`]. An empty fix still means "flag only".
//! - Render for humans with [`Diagnostic::to_report`], which produces a `miette` report
//!   with a labelled span.

use std::fmt;
use std::sync::Arc;

use miette::{LabeledSpan, NamedSource, SourceCode};
use serde::Serialize;

use crate::ast::{NodeId, Span, Tree};
use crate::errors::line_column;
use crate::fix::Fix;

// ============================================================================
// CHECK METADATA
// ============================================================================

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of a checker or template rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInfo {
    pub name: &'static str,
    pub summary: &'static str,
    pub severity: Severity,
    pub link: Option<&'static str>,
}

// ============================================================================
// DIAGNOSTIC
// ============================================================================

/// A single finding, with zero or more candidate fixes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub check: String,
    pub anchor: Option<Span>,
    pub message: String,
    pub severity: Severity,
    pub fixes: Vec<Fix>,
    pub link: Option<String>,
}

impl Diagnostic {
    /// The preferred fix, if any.
    pub fn fix(&self) -> Option<&Fix> {
        self.fixes.first()
    }

    /// Whether any attached fix actually changes the source.
    pub fn has_applicable_fix(&self) -> bool {
        self.fixes.iter().any(|fix| !fix.is_empty())
    }

    /// `name:line:column: severity: [Check] message`.
    pub fn to_line(&self, tree: &Tree) -> String {
        let (line, column) = self
            .anchor
            .map_or((1, 1), |span| line_column(tree.source(), span.start));
        format!(
            "{}:{}:{}: {}: [{}] {}",
            tree.name(),
            line,
            column,
            self.severity,
            self.check,
            self.message
        )
    }

    /// Renders this diagnostic against the tree it was produced for.
    pub fn to_report(&self, tree: &Tree) -> miette::Report {
        miette::Report::new(RenderedDiagnostic {
            check: self.check.clone(),
            message: self.message.clone(),
            severity: self.severity,
            link: self.link.clone(),
            source: Arc::new(NamedSource::new(tree.name(), tree.source().to_string())),
            anchor: self.anchor,
        })
    }
}

/// The `miette` view of a [`Diagnostic`].
#[derive(Debug)]
struct RenderedDiagnostic {
    check: String,
    message: String,
    severity: Severity,
    link: Option<String>,
    source: Arc<NamedSource<String>>,
    anchor: Option<Span>,
}

impl fmt::Display for RenderedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.check, self.message)
    }
}

impl std::error::Error for RenderedDiagnostic {}

impl miette::Diagnostic for RenderedDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.check))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Suggestion => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.link
            .as_ref()
            .map(|link| Box::new(format!("see {link}")) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.source.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.anchor?;
        let len = span.len().max(1);
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(self.severity.to_string()),
            span.start,
            len,
        ))))
    }
}

// ============================================================================
// VERDICT AND REPORTER
// ============================================================================

/// The outcome for the node a checker was asked about.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    NoMatch,
    Match(Diagnostic),
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match(_))
    }
}

/// Collects diagnostics reported outside of the visited node's verdict.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Records a verdict's diagnostic, if it has one.
    pub fn record(&mut self, verdict: Verdict) {
        if let Verdict::Match(diagnostic) = verdict {
            self.report(diagnostic);
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Describes a match of `info` at a node.
#[derive(Debug, Clone)]
pub struct DiagnosticBuilder {
    info: &'static CheckInfo,
    anchor: Option<Span>,
    message: Option<String>,
    fixes: Vec<Fix>,
}

impl DiagnosticBuilder {
    pub fn describe(info: &'static CheckInfo, tree: &Tree, node: NodeId) -> Self {
        Self::at_span(info, tree.span(node))
    }

    pub fn at_span(info: &'static CheckInfo, anchor: Option<Span>) -> Self {
        Self {
            info,
            anchor,
            message: None,
            fixes: Vec::new(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            check: self.info.name.to_string(),
            anchor: self.anchor,
            message: self
                .message
                .unwrap_or_else(|| self.info.summary.to_string()),
            severity: self.info.severity,
            fixes: self.fixes,
            link: self.info.link.map(str::to_string),
        }
    }

    /// Shorthand for a matching verdict.
    pub fn into_verdict(self) -> Verdict {
        Verdict::Match(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;

    static INFO: CheckInfo = CheckInfo {
        name: "Sample",
        summary: "Sample summary",
        severity: Severity::Warning,
        link: Some("https://example.org/sample"),
    };

    #[test]
    fn message_defaults_to_summary() {
        let tree = parse_compilation_unit("A.java", "class A {}\n").unwrap();
        let diagnostic = DiagnosticBuilder::describe(&INFO, &tree, tree.root()).build();
        assert_eq!(diagnostic.message, "Sample summary");
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(!diagnostic.has_applicable_fix());
    }

    #[test]
    fn line_form_is_one_based() {
        let tree = parse_compilation_unit("A.java", "\nclass A {}\n").unwrap();
        let diagnostic = DiagnosticBuilder::at_span(&INFO, Some(Span::new(1, 6)))
            .message("custom")
            .build();
        assert_eq!(diagnostic.to_line(&tree), "A.java:2:1: warning: [Sample] custom");
    }

    #[test]
    fn reports_render_with_code_and_label() {
        let tree = parse_compilation_unit("A.java", "class A {}\n").unwrap();
        let diagnostic = DiagnosticBuilder::at_span(&INFO, Some(Span::new(0, 5))).build();
        let report = diagnostic.to_report(&tree);
        assert_eq!(report.to_string(), "[Sample] Sample summary");
        assert_eq!(report.code().map(|c| c.to_string()), Some("Sample".to_string()));
        assert_eq!(report.labels().map(|l| l.count()), Some(1));
    }

    #[test]
    fn reporter_records_only_matches() {
        let mut reporter = Reporter::new();
        reporter.record(Verdict::NoMatch);
        reporter.record(DiagnosticBuilder::at_span(&INFO, None).into_verdict());
        assert_eq!(reporter.into_diagnostics().len(), 1);
    }
}
