use crate::ast::{NodeId, NodeKind, Span, Tree};
use crate::checkers::junit::{
    HAS_METHOD_SOURCE, HAS_UNMODIFIABLE_SIGNATURE, METHOD_SOURCE, TEST_METHOD,
};
use crate::checkers::{check_info, BugChecker};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, Diagnostic, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::{rename_method, update_annotation_argument_values};
use crate::fix::{Fix, FixBuilder};
use crate::resolve::{
    comments_between, extract_single_factory_method_name, find_annotation,
    find_method_rename_blocker, find_methods, method_params, EnclosingKind,
};

static INFO: CheckInfo = check_info(
    "JUnitFactoryMethodDeclaration",
    "JUnit factory method declaration can likely be improved",
    Severity::Suggestion,
    bug_pattern_link!("JUnitFactoryMethodDeclaration"),
);

/// Factory methods of parameterized tests are named `<test>TestCases` and label
/// each returned case set with the names of the test parameters.
///
/// All findings concern the factory method or the annotation naming it, so they
/// are reported out of band and the test method itself never matches.
pub struct JUnitFactoryMethodDeclaration;

impl BugChecker for JUnitFactoryMethodDeclaration {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_method(
        &self,
        method: NodeId,
        ctx: &AnalysisContext<'_>,
        reporter: &mut Reporter,
    ) -> Verdict {
        if !TEST_METHOD.matches(method, ctx) || !HAS_METHOD_SOURCE.matches(method, ctx) {
            return Verdict::NoMatch;
        }
        let Some(annotation) = find_annotation(ctx, method, METHOD_SOURCE) else {
            return Verdict::NoMatch;
        };
        // Several factories cannot all be given the expected name.
        let Some(factory_name) = extract_single_factory_method_name(ctx, annotation, method) else {
            return Verdict::NoMatch;
        };

        let tree = ctx.tree();
        let factories: Vec<NodeId> = ctx
            .find_enclosing(EnclosingKind::Class)
            .map(|class| find_methods(tree, class, &factory_name))
            .unwrap_or_default()
            .into_iter()
            .filter(|factory| method_params(tree, *factory).is_empty())
            .collect();
        let [factory] = factories[..] else {
            return Verdict::NoMatch;
        };

        for diagnostic in factory_name_fixes(ctx, method, annotation, &factory_name, factory) {
            reporter.report(diagnostic);
        }
        for diagnostic in return_statement_comment_fixes(tree, method, factory) {
            reporter.report(diagnostic);
        }
        Verdict::NoMatch
    }
}

fn factory_name_fixes(
    ctx: &AnalysisContext<'_>,
    test_method: NodeId,
    annotation: NodeId,
    factory_name: &str,
    factory: NodeId,
) -> Vec<Diagnostic> {
    let tree = ctx.tree();
    let Some(test_name) = tree.decl_name(test_method) else {
        return Vec::new();
    };
    let expected = format!("{test_name}TestCases");
    if factory_name == expected || HAS_UNMODIFIABLE_SIGNATURE.matches(factory, &ctx.at(factory)) {
        return Vec::new();
    }

    let message = format!("The test cases should be supplied by a method named `{expected}`");
    if let Some(blocker) = find_method_rename_blocker(ctx, &expected) {
        return vec![DiagnosticBuilder::describe(&INFO, tree, factory)
            .message(format!("{message} (but note that {blocker})"))
            .build()];
    }

    let mut annotation_fix = Fix::builder();
    update_annotation_argument_values(
        &mut annotation_fix,
        tree,
        annotation,
        "value",
        &[format!("\"{expected}\"")],
    );
    let mut rename_fix = Fix::builder();
    rename_method(&mut rename_fix, tree, factory, &expected);

    vec![
        describe_with_fix(tree, annotation, &message, &annotation_fix),
        describe_with_fix(tree, factory, &message, &rename_fix),
    ]
}

fn return_statement_comment_fixes(
    tree: &Tree,
    test_method: NodeId,
    factory: NodeId,
) -> Vec<Diagnostic> {
    let parameter_names: Vec<&str> = method_params(tree, test_method)
        .iter()
        .filter_map(|param| tree.decl_name(*param))
        .collect();
    let expected_comment = format!("/* {{ {} }} */", parameter_names.join(", "));
    let Some(factory_span) = tree.span(factory) else {
        return Vec::new();
    };

    let statements = tree.body_statements(factory);
    let mut diagnostics = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        if !matches!(tree.kind(*statement), NodeKind::Return { .. }) {
            continue;
        }
        let Some(span) = tree.span(*statement) else {
            continue;
        };
        let start = match index {
            0 => factory_span.start,
            _ => tree
                .span(statements[index - 1])
                .map_or(factory_span.start, |previous| previous.end),
        };
        let has_expected_comment = comments_between(tree.source(), start, span.start)
            .iter()
            .any(|comment| comment.text == expected_comment);
        if has_expected_comment {
            continue;
        }
        let mut fix = Fix::builder();
        fix.prefix_with(
            span,
            format!("{expected_comment}\n{}", line_indentation(tree.source(), span)),
        );
        diagnostics.push(describe_with_fix(
            tree,
            *statement,
            "The return statement should be prefixed by a comment giving the names of the test case parameters",
            &fix,
        ));
    }
    diagnostics
}

fn describe_with_fix(tree: &Tree, node: NodeId, message: &str, fix: &FixBuilder) -> Diagnostic {
    let builder = DiagnosticBuilder::describe(&INFO, tree, node).message(message);
    match fix.build() {
        Ok(fix) => builder.fix(fix).build(),
        Err(error) => {
            tracing::debug!(%error, "dropping conflicting factory method fix");
            builder.build()
        }
    }
}

/// The whitespace preceding `span` on its line, or nothing when other code precedes it.
fn line_indentation(source: &str, span: Span) -> &str {
    let line_start = source[..span.start].rfind('\n').map_or(0, |newline| newline + 1);
    let prefix = &source[line_start..span.start];
    if prefix.chars().all(char::is_whitespace) {
        prefix
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    const HEADER: &str = "import java.util.stream.Stream;\nimport org.junit.jupiter.params.ParameterizedTest;\nimport org.junit.jupiter.params.provider.Arguments;\nimport org.junit.jupiter.params.provider.MethodSource;\n\n";

    #[test]
    fn renames_factory_and_labels_returns() {
        let source = format!(
            "{HEADER}final class A {{\n  private static Stream<Arguments> cases() {{\n    return Stream.of(Arguments.arguments(1, 2));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"cases\")\n  void method(int a, int b) {{}}\n}}\n"
        );
        let (tree, diagnostics) = run(&JUnitFactoryMethodDeclaration, &source);
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "The test cases should be supplied by a method named `methodTestCases`",
                "The test cases should be supplied by a method named `methodTestCases`",
                "The return statement should be prefixed by a comment giving the names of the test case parameters",
            ]
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{HEADER}final class A {{\n  private static Stream<Arguments> methodTestCases() {{\n    /* {{ a, b }} */\n    return Stream.of(Arguments.arguments(1, 2));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"methodTestCases\")\n  void method(int a, int b) {{}}\n}}\n"
            )
        );
    }

    #[test]
    fn bare_method_source_gains_the_factory_name() {
        let source = format!(
            "{HEADER}final class A {{\n  private static Stream<Arguments> foo() {{\n    return Stream.of(Arguments.arguments(1));\n  }}\n\n  @ParameterizedTest\n  @MethodSource\n  void foo(int i) {{}}\n}}\n"
        );
        let (tree, diagnostics) = run(&JUnitFactoryMethodDeclaration, &source);
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{HEADER}final class A {{\n  private static Stream<Arguments> fooTestCases() {{\n    /* {{ i }} */\n    return Stream.of(Arguments.arguments(1));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"fooTestCases\")\n  void foo(int i) {{}}\n}}\n"
            )
        );
    }

    #[test]
    fn canonical_factories_are_left_alone() {
        let source = format!(
            "{HEADER}final class A {{\n  private static Stream<Arguments> methodTestCases() {{\n    /* {{ a }} */\n    return Stream.of(Arguments.arguments(1));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"methodTestCases\")\n  void method(int a) {{}}\n}}\n"
        );
        let (_, diagnostics) = run(&JUnitFactoryMethodDeclaration, &source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn rename_blocker_is_reported_without_fix() {
        let source = format!(
            "{HEADER}final class A {{\n  private static Stream<Arguments> cases() {{\n    /* {{ a }} */\n    return Stream.of(Arguments.arguments(1));\n  }}\n\n  void methodTestCases(int x) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"cases\")\n  void method(int a) {{}}\n}}\n"
        );
        let (_, diagnostics) = run(&JUnitFactoryMethodDeclaration, &source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "The test cases should be supplied by a method named `methodTestCases` (but note that a method named `methodTestCases` already exists in this class)"
        );
        assert!(diagnostics[0].fixes.is_empty());
    }

    #[test]
    fn multiple_or_ambiguous_factories_are_skipped() {
        let source = format!(
            "{HEADER}final class A {{\n  private static Stream<Arguments> a() {{ return null; }}\n  private static Stream<Arguments> b() {{ return null; }}\n  private static Stream<Arguments> c() {{ return null; }}\n  private static Stream<Arguments> c(int x) {{ return null; }}\n  private static Stream<Arguments> c(String x) {{ return null; }}\n\n  @ParameterizedTest\n  @MethodSource({{\"a\", \"b\"}})\n  void multiple(int a) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"missing\")\n  void absent(int a) {{}}\n}}\n"
        );
        let (_, diagnostics) = run(&JUnitFactoryMethodDeclaration, &source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
