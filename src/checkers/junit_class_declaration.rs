use once_cell::sync::Lazy;

use crate::ast::{Modifier, NodeId};
use crate::checkers::junit::TEST_METHOD;
use crate::checkers::{check_info, BugChecker};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::{add_modifier, remove_modifiers};
use crate::fix::Fix;
use crate::matchers::{
    all_of, any_of, boxed, has_meta_annotation, has_method, has_modifier, not, BoxedMatcher,
};

static INFO: CheckInfo = check_info(
    "JUnitClassDeclaration",
    "JUnit test classes should be declared as package private final",
    Severity::Warning,
    bug_pattern_link!("JUnitClassDeclaration"),
);

static NON_FINAL_TEST_CLASS: Lazy<BoxedMatcher> = Lazy::new(|| {
    boxed(all_of(vec![
        boxed(not(has_meta_annotation(
            "org.springframework.context.annotation.Configuration",
        ))),
        boxed(has_method(|method: NodeId, ctx: &AnalysisContext<'_>| {
            TEST_METHOD.matches(method, ctx)
        })),
        boxed(any_of(vec![
            boxed(not(has_modifier(Modifier::Final))),
            boxed(has_modifier(Modifier::Private)),
            boxed(has_modifier(Modifier::Protected)),
            boxed(has_modifier(Modifier::Public)),
        ])),
    ]))
});

/// Test classes are package private and final.
pub struct JUnitClassDeclaration;

impl BugChecker for JUnitClassDeclaration {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_class(
        &self,
        class: NodeId,
        ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        if !NON_FINAL_TEST_CLASS.matches(class, ctx) {
            return Verdict::NoMatch;
        }
        let tree = ctx.tree();
        let mut fix = Fix::builder();
        add_modifier(&mut fix, tree, class, Modifier::Final);
        remove_modifiers(&mut fix, tree, class, &Modifier::VISIBILITY);
        match fix.build() {
            Ok(fix) => DiagnosticBuilder::describe(&INFO, tree, class)
                .fix(fix)
                .into_verdict(),
            Err(error) => {
                tracing::debug!(%error, "discarding conflicting class declaration fix");
                DiagnosticBuilder::describe(&INFO, tree, class).into_verdict()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    const IMPORTS: &str = "import org.junit.jupiter.api.Test;\nimport org.junit.jupiter.params.ParameterizedTest;\n\n";

    #[test]
    fn flags_non_final_and_visible_test_classes() {
        let source = format!(
            "{IMPORTS}class A {{\n  @Test void foo() {{}}\n}}\n\nfinal class B {{\n  @ParameterizedTest void foo() {{}}\n}}\n\nclass C {{\n  void foo() {{}}\n}}\n"
        );
        let (_, diagnostics) = run(&JUnitClassDeclaration, &source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, INFO.summary);
    }

    #[test]
    fn makes_public_test_class_final_and_package_private() {
        let source = format!("{IMPORTS}public class A {{ @Test void foo(){{}} }}\n");
        let (tree, diagnostics) = run(&JUnitClassDeclaration, &source);
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!("{IMPORTS}final class A {{ @Test void foo(){{}} }}\n")
        );
    }

    #[test]
    fn configuration_classes_are_exempt() {
        let source = "import org.junit.jupiter.api.Test;\nimport org.springframework.boot.test.context.TestConfiguration;\n\n@TestConfiguration\nclass A {\n  @Test void foo() {}\n}\n";
        let (_, diagnostics) = run(&JUnitClassDeclaration, source);
        assert!(diagnostics.is_empty());
    }
}
