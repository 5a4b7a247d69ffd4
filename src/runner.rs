//! The analysis pipeline: parse, visit, collect, fix.
//!
//! An [`Analyzer`] owns the frozen configuration of one run (type table, flags,
//! language level, enabled checkers and rules). It walks a tree once, offering every
//! node to the checkers that care about its kind, then runs the template rules over
//! the whole tree.
//!
//! ## Core Principles
//!
//! - **One pass per tree**: checkers see nodes in preorder; template rules run after.
//! - **Deterministic output**: diagnostics are sorted by position, then check name.
//! - **Conservative fixing**: only the first fix of a diagnostic is applied, and only
//!   when it does not overlap a fix accepted earlier in the same pass.

use crate::ast::{NodeKind, Tree};
use crate::checkers::{self, BugChecker};
use crate::config::{Config, Flags, LanguageLevel};
use crate::context::{AnalysisContext, TypeTable};
use crate::diagnostics::{Diagnostic, Reporter, Verdict};
use crate::errors::RectifyError;
use crate::fix::Fix;
use crate::refaster::{rules, TemplateRule};
use crate::syntax::parse_compilation_unit;

/// Upper bound on re-analysis rounds in [`Analyzer::fix_until_stable`].
pub const MAX_FIX_PASSES: usize = 8;

// ============================================================================
// ANALYZER
// ============================================================================

pub struct Analyzer<'c> {
    checkers: Vec<&'c dyn BugChecker>,
    rules: Vec<&'c TemplateRule>,
    types: TypeTable,
    flags: Flags,
    level: LanguageLevel,
}

impl Analyzer<'static> {
    /// An analyzer running every built-in checker and catalog rule that `config`
    /// enables.
    pub fn new(config: &Config) -> Self {
        let checkers = checkers::registry()
            .iter()
            .map(|checker| checker.as_ref())
            .filter(|checker| config.is_enabled(checker.info().name))
            .collect();
        let rules = if config.disable_rules {
            Vec::new()
        } else {
            rules::catalog()
                .iter()
                .filter(|rule| config.is_enabled(rule.name()))
                .collect()
        };
        Self::with_parts(
            checkers,
            rules,
            TypeTable::standard(),
            config.flags(),
            config.language_level(),
        )
    }
}

impl<'c> Analyzer<'c> {
    pub fn with_parts(
        checkers: Vec<&'c dyn BugChecker>,
        rules: Vec<&'c TemplateRule>,
        types: TypeTable,
        flags: Flags,
        level: LanguageLevel,
    ) -> Self {
        tracing::debug!(
            checkers = checkers.len(),
            rules = rules.len(),
            level = %level,
            "analyzer configured"
        );
        Self {
            checkers,
            rules,
            types,
            flags,
            level,
        }
    }

    pub fn checkers(&self) -> &[&'c dyn BugChecker] {
        &self.checkers
    }

    pub fn rules(&self) -> &[&'c TemplateRule] {
        &self.rules
    }

    /// All diagnostics for `tree`, sorted by position.
    pub fn analyze(&self, tree: &Tree) -> Vec<Diagnostic> {
        let root = AnalysisContext::new(tree, &self.types, &self.flags, self.level);
        let mut reporter = Reporter::new();

        for node in tree.preorder() {
            let ctx = root.at(node);
            for checker in &self.checkers {
                let verdict = match tree.kind(node) {
                    NodeKind::Class { .. } => checker.match_class(node, &ctx, &mut reporter),
                    NodeKind::Method { .. } => checker.match_method(node, &ctx, &mut reporter),
                    NodeKind::MethodCall { .. } => {
                        checker.match_method_invocation(node, &ctx, &mut reporter)
                    }
                    NodeKind::Annotation { .. } => {
                        checker.match_annotation(node, &ctx, &mut reporter)
                    }
                    _ => Verdict::NoMatch,
                };
                reporter.record(verdict);
            }
        }

        let mut diagnostics = reporter.into_diagnostics();
        for rule in &self.rules {
            diagnostics.extend(rule.find_matches(&root));
        }
        sort_diagnostics(&mut diagnostics);
        tracing::debug!(file = tree.name(), count = diagnostics.len(), "analysis finished");
        diagnostics
    }

    /// Parses and analyses one source file.
    pub fn check_source(
        &self,
        name: &str,
        source: &str,
    ) -> Result<(Tree, Vec<Diagnostic>), RectifyError> {
        let tree = parse_compilation_unit(name, source)?;
        let diagnostics = self.analyze(&tree);
        Ok((tree, diagnostics))
    }

    /// Applies fixes and re-analyses until nothing changes, at most
    /// [`MAX_FIX_PASSES`] times.
    pub fn fix_until_stable(&self, name: &str, source: &str) -> Result<FixOutcome, RectifyError> {
        let mut current = source.to_string();
        let mut applied = 0;
        let mut passes = 0;

        while passes < MAX_FIX_PASSES {
            let (tree, diagnostics) = self.check_source(name, &current)?;
            passes += 1;
            let application = apply_fixes(&tree, &diagnostics)?;
            if application.applied == 0 || application.source == current {
                break;
            }
            tracing::debug!(
                file = name,
                pass = passes,
                applied = application.applied,
                "fixes applied"
            );
            applied += application.applied;
            current = application.source;
        }
        if passes == MAX_FIX_PASSES {
            tracing::warn!(file = name, "fixes did not stabilise after {MAX_FIX_PASSES} passes");
        }

        let (_, remaining) = self.check_source(name, &current)?;
        Ok(FixOutcome {
            source: current,
            applied,
            passes,
            remaining,
        })
    }
}

fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        let start = |d: &Diagnostic| d.anchor.map(|span| (span.start, span.end));
        start(a)
            .cmp(&start(b))
            .then_with(|| a.check.cmp(&b.check))
    });
}

// ============================================================================
// FIX APPLICATION
// ============================================================================

/// The result of applying one round of fixes.
#[derive(Debug, Clone, PartialEq)]
pub struct FixApplication {
    pub source: String,
    pub applied: usize,
    /// Fixes dropped because they overlap a fix accepted before them.
    pub skipped: usize,
}

/// The result of [`Analyzer::fix_until_stable`].
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub source: String,
    pub applied: usize,
    pub passes: usize,
    /// Diagnostics still reported for the final source.
    pub remaining: Vec<Diagnostic>,
}

/// Merges the first fix of every diagnostic, in order, skipping any that overlaps a
/// fix already accepted, and applies the result to `tree`.
pub fn apply_fixes(
    tree: &Tree,
    diagnostics: &[Diagnostic],
) -> Result<FixApplication, RectifyError> {
    let mut accepted = Fix::empty();
    let mut applied = 0;
    let mut skipped = 0;

    for diagnostic in diagnostics {
        let Some(fix) = diagnostic.fix().filter(|fix| !fix.is_empty()) else {
            continue;
        };
        if accepted.overlaps(fix) {
            tracing::trace!(check = %diagnostic.check, "skipping overlapping fix");
            skipped += 1;
            continue;
        }
        accepted = accepted.merge(fix)?;
        applied += 1;
    }

    Ok(FixApplication {
        source: accepted.apply(tree)?,
        applied,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> Analyzer<'static> {
        Analyzer::new(&Config::default())
    }

    #[test]
    fn diagnostics_are_sorted_by_position() {
        let source = "import org.junit.jupiter.api.Test;\n\nclass A {\n  @Test\n  public void b() {}\n\n  @Test\n  public void a() {}\n}\n";
        let (_, diagnostics) = analyzer().check_source("A.java", source).unwrap();
        let starts: Vec<usize> = diagnostics
            .iter()
            .map(|d| d.anchor.unwrap().start)
            .collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert!(diagnostics.len() >= 2);
    }

    #[test]
    fn disabled_checks_do_not_run() {
        let config = Config::from_yaml("disabled: [EmptyMethod]\ndisable_rules: true\n").unwrap();
        let analyzer = Analyzer::new(&config);
        assert!(analyzer.checkers().iter().all(|c| c.info().name != "EmptyMethod"));
        assert!(analyzer.rules().is_empty());

        let source = "class A {\n  void m() {}\n}\n";
        let (_, diagnostics) = analyzer.check_source("A.java", source).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn template_rules_run_alongside_checkers() {
        let source = "class A {\n  boolean m(boolean p) {\n    return !!p;\n  }\n}\n";
        let (_, diagnostics) = analyzer().check_source("A.java", source).unwrap();
        let checks: Vec<&str> = diagnostics.iter().map(|d| d.check.as_str()).collect();
        assert_eq!(checks, ["EqualityRules.DoubleNegation"]);
    }

    #[test]
    fn overlapping_fixes_are_skipped() {
        let source = "class A {\n  boolean m(boolean p) {\n    return !!p;\n  }\n}\n";
        let (tree, mut diagnostics) = analyzer().check_source("A.java", source).unwrap();
        diagnostics.push(diagnostics[0].clone());
        let application = apply_fixes(&tree, &diagnostics).unwrap();
        assert_eq!(application.applied, 1);
        assert_eq!(application.skipped, 1);
        assert!(application.source.contains("return p;"));
    }

    #[test]
    fn fixes_are_applied_until_stable() {
        let source = "class A {\n  boolean m(boolean p) {\n    return !!!!p;\n  }\n\n  void unused() {}\n}\n";
        let outcome = analyzer().fix_until_stable("A.java", source).unwrap();
        assert_eq!(outcome.source, "class A {\n  boolean m(boolean p) {\n    return p;\n  }\n}\n");
        assert_eq!(outcome.applied, 3);
        assert_eq!(outcome.passes, 3);
        assert!(outcome.remaining.is_empty());
    }
}
