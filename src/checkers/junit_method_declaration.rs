use crate::ast::{Modifier, NodeId, NodeKind};
use crate::checkers::junit::{HAS_UNMODIFIABLE_SIGNATURE, SETUP_OR_TEARDOWN_METHOD, TEST_METHOD};
use crate::checkers::{check_info, BugChecker};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::{remove_modifiers, rename_method};
use crate::fix::{Fix, FixBuilder};
use crate::resolve::find_method_rename_blocker;

const TEST_PREFIX: &str = "test";

static INFO: CheckInfo = check_info(
    "JUnitMethodDeclaration",
    "JUnit method declaration can likely be improved",
    Severity::Suggestion,
    bug_pattern_link!("JUnitMethodDeclaration"),
);

/// Test and lifecycle methods are package private, and test method names do not
/// repeat the `test` prefix.
pub struct JUnitMethodDeclaration;

impl BugChecker for JUnitMethodDeclaration {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_method(
        &self,
        method: NodeId,
        ctx: &AnalysisContext<'_>,
        reporter: &mut Reporter,
    ) -> Verdict {
        if HAS_UNMODIFIABLE_SIGNATURE.matches(method, ctx) {
            return Verdict::NoMatch;
        }
        let is_test_method = TEST_METHOD.matches(method, ctx);
        if !is_test_method && !SETUP_OR_TEARDOWN_METHOD.matches(method, ctx) {
            return Verdict::NoMatch;
        }

        let tree = ctx.tree();
        let mut fix = Fix::builder();
        remove_modifiers(&mut fix, tree, method, &Modifier::VISIBILITY);
        if is_test_method {
            suggest_rename_if_applicable(method, ctx, &mut fix, reporter);
        }

        match fix.build() {
            Ok(fix) if fix.is_empty() => Verdict::NoMatch,
            Ok(fix) => DiagnosticBuilder::describe(&INFO, tree, method)
                .fix(fix)
                .into_verdict(),
            Err(error) => {
                tracing::debug!(%error, "discarding conflicting method declaration fix");
                Verdict::NoMatch
            }
        }
    }
}

fn suggest_rename_if_applicable(
    method: NodeId,
    ctx: &AnalysisContext<'_>,
    fix: &mut FixBuilder,
    reporter: &mut Reporter,
) {
    let tree = ctx.tree();
    let NodeKind::Method { name, .. } = tree.kind(method) else {
        return;
    };
    let Some(new_name) = canonical_method_name(name) else {
        return;
    };
    match find_method_rename_blocker(ctx, &new_name) {
        Some(blocker) => reporter.report(
            DiagnosticBuilder::describe(&INFO, tree, method)
                .message(format!(
                    "This method's name should not redundantly start with `{TEST_PREFIX}` (but note that {blocker})"
                ))
                .build(),
        ),
        None => rename_method(fix, tree, method, &new_name),
    }
}

/// `testFooBar` becomes `fooBar`; names that would be empty or start with a digit
/// are left alone.
fn canonical_method_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix(TEST_PREFIX)?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if first.is_ascii_digit() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_method_name("testFoo").as_deref(), Some("foo"));
        assert_eq!(canonical_method_name("test"), None);
        assert_eq!(canonical_method_name("test1"), None);
        assert_eq!(canonical_method_name("foo"), None);
        assert_eq!(canonical_method_name("testing").as_deref(), Some("ing"));
    }

    #[test]
    fn removes_visibility_and_test_prefix() {
        let source = "import org.junit.jupiter.api.BeforeEach;\nimport org.junit.jupiter.api.Test;\n\nfinal class A {\n  @BeforeEach\n  public void setUp() {}\n\n  @Test\n  protected void testFoo() {}\n\n  @Test\n  void bar() {}\n}\n";
        let (tree, diagnostics) = run(&JUnitMethodDeclaration, source);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            apply_all(&tree, &diagnostics),
            "import org.junit.jupiter.api.BeforeEach;\nimport org.junit.jupiter.api.Test;\n\nfinal class A {\n  @BeforeEach\n  void setUp() {}\n\n  @Test\n  void foo() {}\n\n  @Test\n  void bar() {}\n}\n"
        );
    }

    #[test]
    fn reports_rename_blockers_without_fix() {
        let source = "import static org.junit.jupiter.api.Assertions.assertTrue;\n\nimport org.junit.jupiter.api.Test;\n\nfinal class A {\n  @Test\n  void testBar() {}\n\n  void bar() {}\n\n  @Test\n  void testAssertTrue() {}\n\n  @Test\n  void testClass() {}\n}\n";
        let (_, diagnostics) = run(&JUnitMethodDeclaration, source);
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "This method's name should not redundantly start with `test` (but note that a method named `bar` already exists in this class)",
                "This method's name should not redundantly start with `test` (but note that `assertTrue` is already statically imported)",
                "This method's name should not redundantly start with `test` (but note that `class` is a reserved keyword)",
            ]
        );
        assert!(diagnostics.iter().all(|d| d.fixes.is_empty()));
    }

    #[test]
    fn overrides_and_abstract_class_methods_are_skipped() {
        let source = "import org.junit.jupiter.api.Test;\n\nabstract class A {\n  @Test\n  public void testFoo() {}\n}\n\nfinal class B extends A {\n  @Override\n  @Test\n  public void testFoo() {}\n}\n";
        let (_, diagnostics) = run(&JUnitMethodDeclaration, source);
        assert!(diagnostics.is_empty());
    }
}
