//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for rendering diagnostics (as `miette` reports or
//! JSON), colorized diffs for dry-run fixes, and the checker listing. By
//! centralizing output logic here, every subcommand prints the same way.

use std::io::{self, Write};

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::Tree;
use crate::checkers::BugChecker;
use crate::diagnostics::{Diagnostic, Severity};
use crate::errors::line_column;
use crate::refaster::TemplateRule;

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Prints every diagnostic of one file as a `miette` report on stderr.
pub fn print_diagnostics(tree: &Tree, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{:?}", diagnostic.to_report(tree));
    }
}

/// One diagnostic in the JSON output.
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic<'a> {
    pub file: &'a str,
    pub line: usize,
    pub column: usize,
    #[serde(flatten)]
    pub diagnostic: &'a Diagnostic,
}

impl<'a> JsonDiagnostic<'a> {
    pub fn new(tree: &'a Tree, diagnostic: &'a Diagnostic) -> Self {
        let (line, column) = diagnostic
            .anchor
            .map_or((1, 1), |span| line_column(tree.source(), span.start));
        Self {
            file: tree.name(),
            line,
            column,
            diagnostic,
        }
    }
}

/// Writes the collected JSON diagnostics as one array on stdout.
pub fn print_json(diagnostics: &[JsonDiagnostic<'_>]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, diagnostics)?;
    writeln!(stdout)
}

/// The closing line of `check`: `N error(s), N warning(s), N suggestion(s)`.
pub fn print_summary(diagnostics: &[&Diagnostic], files: usize) {
    let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(
        stderr,
        "{} file(s) checked: {} error(s), {} warning(s), {} suggestion(s)",
        files,
        count(Severity::Error),
        count(Severity::Warning),
        count(Severity::Suggestion)
    );
    let _ = stderr.reset();
}

// ============================================================================
// DIFFS
// ============================================================================

/// Prints a line diff between the original and fixed source of `name`.
pub fn print_fix_diff(name: &str, before: &str, after: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "--- {name}");
    let _ = writeln!(stdout, "+++ {name} (fixed)");
    let _ = stdout.reset();

    let changeset = Changeset::new(before, after, "\n");
    print_diff(&mut stdout, &changeset.diffs);
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        let (prefix, color, text) = match diff {
            Difference::Same(text) => (' ', None, text),
            Difference::Add(text) => ('+', Some(Color::Green), text),
            Difference::Rem(text) => ('-', Some(Color::Red), text),
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(color));
        for line in text.split('\n') {
            let _ = writeln!(stdout, "{prefix}{line}");
        }
    }
    let _ = stdout.reset();
}

// ============================================================================
// LISTINGS
// ============================================================================

/// Prints the checker registry followed by the rule catalog.
pub fn print_checks(checkers: &[&dyn BugChecker], rules: &[&TemplateRule]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    heading(&mut stdout, "Checkers");
    for checker in checkers {
        let info = checker.info();
        let _ =
            writeln!(stdout, "  {:<45} {:<10} {}", info.name, info.severity.as_str(), info.summary);
    }
    let _ = writeln!(stdout);
    heading(&mut stdout, "Template rules");
    for rule in rules {
        let _ = writeln!(stdout, "  {:<45} {}", rule.name(), rule.summary());
    }
}

fn heading(stdout: &mut StandardStream, text: &str) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "{text}");
    let _ = stdout.reset();
}
