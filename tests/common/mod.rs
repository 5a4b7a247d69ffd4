//! # Rectify Test Helpers
//!
//! Shared setup for the integration tests: analyzers restricted to a set of checks,
//! and a one-call "analyse and fix" helper.

#![allow(dead_code)]

use rectify::config::Config;
use rectify::runner::{apply_fixes, Analyzer};
use rectify::Diagnostic;

/// An analyzer running only the named checks and rules.
pub fn analyzer_for(names: &[&str]) -> Analyzer<'static> {
    let config = Config {
        enabled: Some(names.iter().map(|name| name.to_string()).collect()),
        ..Config::default()
    };
    Analyzer::new(&config)
}

/// Diagnostics of `source`, analysed as `A.java`.
pub fn diagnostics(analyzer: &Analyzer<'_>, source: &str) -> Vec<Diagnostic> {
    let (_, diagnostics) = analyzer.check_source("A.java", source).unwrap();
    diagnostics
}

/// The source after a single round of fixes.
pub fn fix_once(analyzer: &Analyzer<'_>, source: &str) -> String {
    let (tree, diagnostics) = analyzer.check_source("A.java", source).unwrap();
    apply_fixes(&tree, &diagnostics).unwrap().source
}

/// Asserts that a single round of fixes turns `input` into `expected`, and that the
/// result draws no further diagnostics.
pub fn assert_fix(analyzer: &Analyzer<'_>, input: &str, expected: &str) {
    let fixed = fix_once(analyzer, input);
    assert_eq!(fixed, expected);
    let remaining = diagnostics(analyzer, &fixed);
    assert!(remaining.is_empty(), "fixed source still reports {remaining:?}");
}
