//! Bug checkers.
//!
//! A checker is a stateless value that is offered nodes of the kinds it cares about.
//! For each node it returns a [`Verdict`] and may report further diagnostics anchored
//! elsewhere through the [`Reporter`].
//!
//! ## Core Principles
//! - Checkers never mutate the tree; fixes are descriptions of edits.
//! - When a checker cannot decide (unknown types, ambiguous declarations) it abstains
//!   by returning [`Verdict::NoMatch`].
//! - Flags are read from the context at match time.

use once_cell::sync::Lazy;

use crate::ast::NodeId;
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, Reporter, Verdict};

/// Documentation link of a checker, as a `&'static str` usable in statics.
macro_rules! bug_pattern_link {
    ($name:literal) => {
        concat!("https://error-prone.picnic.tech/bugpatterns/", $name)
    };
}

mod empty_method;
mod junit;
mod junit_class_declaration;
mod junit_factory_method_declaration;
mod junit_method_declaration;
mod junit_value_source;
mod lexicographical_annotation_attribute_listing;
mod test_helper_source_format;

pub use empty_method::EmptyMethod;
pub use junit_class_declaration::JUnitClassDeclaration;
pub use junit_factory_method_declaration::JUnitFactoryMethodDeclaration;
pub use junit_method_declaration::JUnitMethodDeclaration;
pub use junit_value_source::JUnitValueSource;
pub use lexicographical_annotation_attribute_listing::LexicographicalAnnotationAttributeListing;
pub use test_helper_source_format::TestHelperSourceFormat;

// ============================================================================
// CHECKER TRAIT
// ============================================================================

/// A bug checker. Every hook defaults to [`Verdict::NoMatch`].
pub trait BugChecker: Send + Sync {
    fn info(&self) -> &'static CheckInfo;

    fn match_class(
        &self,
        _class: NodeId,
        _ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        Verdict::NoMatch
    }

    fn match_method(
        &self,
        _method: NodeId,
        _ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        Verdict::NoMatch
    }

    fn match_method_invocation(
        &self,
        _call: NodeId,
        _ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        Verdict::NoMatch
    }

    fn match_annotation(
        &self,
        _annotation: NodeId,
        _ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        Verdict::NoMatch
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

static REGISTRY: Lazy<Vec<Box<dyn BugChecker>>> = Lazy::new(|| {
    vec![
        Box::new(EmptyMethod),
        Box::new(JUnitClassDeclaration),
        Box::new(JUnitFactoryMethodDeclaration),
        Box::new(JUnitMethodDeclaration),
        Box::new(JUnitValueSource),
        Box::new(LexicographicalAnnotationAttributeListing),
        Box::new(TestHelperSourceFormat),
    ]
});

/// Every built-in checker, sorted by name.
pub fn registry() -> &'static [Box<dyn BugChecker>] {
    &REGISTRY
}

/// Looks a checker up by its name.
pub fn find(name: &str) -> Option<&'static dyn BugChecker> {
    registry()
        .iter()
        .find(|checker| checker.info().name == name)
        .map(|checker| checker.as_ref())
}

/// Shorthand for checker metadata pointing at the documentation site.
const fn check_info(
    name: &'static str,
    summary: &'static str,
    severity: crate::diagnostics::Severity,
    link: &'static str,
) -> CheckInfo {
    CheckInfo {
        name,
        summary,
        severity,
        link: Some(link),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for running a single checker over a source snippet.

    use super::*;
    use crate::ast::{NodeKind, Tree};
    use crate::config::{Flags, LanguageLevel};
    use crate::context::TypeTable;
    use crate::diagnostics::Diagnostic;
    use crate::fix::Fix;
    use crate::syntax::parse_compilation_unit;

    pub fn run(checker: &dyn BugChecker, source: &str) -> (Tree, Vec<Diagnostic>) {
        run_with(checker, source, &Flags::empty(), LanguageLevel::default())
    }

    pub fn run_with(
        checker: &dyn BugChecker,
        source: &str,
        flags: &Flags,
        level: LanguageLevel,
    ) -> (Tree, Vec<Diagnostic>) {
        let tree = parse_compilation_unit("A.java", source).unwrap();
        let types = TypeTable::standard();
        let root = AnalysisContext::new(&tree, &types, flags, level);
        let mut reporter = Reporter::new();
        for id in tree.preorder() {
            let ctx = root.at(id);
            let verdict = match tree.kind(id) {
                NodeKind::Class { .. } => checker.match_class(id, &ctx, &mut reporter),
                NodeKind::Method { .. } => checker.match_method(id, &ctx, &mut reporter),
                NodeKind::MethodCall { .. } => {
                    checker.match_method_invocation(id, &ctx, &mut reporter)
                }
                NodeKind::Annotation { .. } => checker.match_annotation(id, &ctx, &mut reporter),
                _ => Verdict::NoMatch,
            };
            reporter.record(verdict);
        }
        let diagnostics = reporter.into_diagnostics();
        (tree, diagnostics)
    }

    /// Applies the first fix of every diagnostic, all at once.
    pub fn apply_all(tree: &Tree, diagnostics: &[Diagnostic]) -> String {
        let mut fix = Fix::empty();
        for diagnostic in diagnostics {
            if let Some(next) = diagnostic.fix() {
                fix = fix.merge(next).unwrap();
            }
        }
        fix.apply(tree).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_sorted_and_unique() {
        let names: Vec<&str> = registry().iter().map(|c| c.info().name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn checkers_can_be_found_by_name() {
        assert!(find("JUnitValueSource").is_some());
        assert!(find("Unknown").is_none());
    }
}
