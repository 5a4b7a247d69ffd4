use crate::ast::{Modifier, NodeId, NodeKind, TypeDeclKind};
use crate::checkers::{check_info, BugChecker};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::delete_member;
use crate::fix::Fix;
use crate::matchers::{annotations, is_type, MatchType, Matcher};
use crate::resolve::{comments_between, EnclosingKind};

static INFO: CheckInfo = check_info(
    "EmptyMethod",
    "Empty method can likely be deleted",
    Severity::Suggestion,
    bug_pattern_link!("EmptyMethod"),
);

/// Methods of classes whose body contains neither statements nor comments.
///
/// Constructors are skipped: an empty constructor may exist only to narrow
/// visibility.
pub struct EmptyMethod;

impl BugChecker for EmptyMethod {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_method(
        &self,
        method: NodeId,
        ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        let tree = ctx.tree();
        let NodeKind::Method {
            return_type: Some(_),
            body: Some(body),
            ..
        } = tree.kind(method)
        else {
            return Verdict::NoMatch;
        };
        let NodeKind::Block { statements } = tree.kind(*body) else {
            return Verdict::NoMatch;
        };
        if !statements.is_empty()
            || tree.has_modifier(method, Modifier::Abstract)
            || tree.has_modifier(method, Modifier::Native)
            || annotations(MatchType::AtLeastOne, is_type("java.lang.Override"))
                .matches(method, ctx)
        {
            return Verdict::NoMatch;
        }
        let in_class = ctx
            .find_enclosing(EnclosingKind::Class)
            .is_some_and(|class| {
                matches!(tree.kind(class), NodeKind::Class { kind: TypeDeclKind::Class, .. })
            });
        if !in_class {
            return Verdict::NoMatch;
        }
        let Some(span) = tree.span(*body) else {
            return Verdict::NoMatch;
        };
        if !comments_between(tree.source(), span.start, span.end).is_empty() {
            return Verdict::NoMatch;
        }

        let mut fix = Fix::builder();
        delete_member(&mut fix, tree, method);
        match fix.build() {
            Ok(fix) => DiagnosticBuilder::describe(&INFO, tree, method)
                .fix(fix)
                .into_verdict(),
            Err(error) => {
                tracing::debug!(%error, "discarding conflicting empty method fix");
                Verdict::NoMatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    #[test]
    fn deletes_empty_methods() {
        let source = "final class A {\n  void a() {}\n\n  void b() {\n    // Intentionally empty.\n  }\n\n  int c() {\n    return 1;\n  }\n}\n";
        let (tree, diagnostics) = run(&EmptyMethod, source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Empty method can likely be deleted");
        assert_eq!(
            apply_all(&tree, &diagnostics),
            "final class A {\n  void b() {\n    // Intentionally empty.\n  }\n\n  int c() {\n    return 1;\n  }\n}\n"
        );
    }

    #[test]
    fn skips_overrides_constructors_and_interfaces() {
        let source = "interface I {\n  default void a() {}\n}\n\nabstract class A implements I {\n  A() {}\n\n  @Override\n  public void a() {}\n\n  abstract void b();\n\n  native void c();\n}\n";
        let (_, diagnostics) = run(&EmptyMethod, source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
