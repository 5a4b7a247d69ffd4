use once_cell::sync::Lazy;

use crate::ast::{NodeId, NodeKind};
use crate::checkers::junit::{METHOD_SOURCE, VALUE_SOURCE};
use crate::checkers::{check_info, BugChecker};
use crate::constant::constant_value_of;
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::{delete_member, source_or_pretty};
use crate::fix::Fix;
use crate::matchers::{
    all_of, annotations, any_of, boxed, is_primitive_or_boxed_primitive_type, is_same_type,
    is_type, method_has_parameters, static_method, BoxedMatcher, MatchType, Matcher,
    MethodMatcher,
};
use crate::resolve::{
    extract_single_factory_method_name, find_annotation, find_methods, method_params,
    EnclosingKind,
};

static INFO: CheckInfo = check_info(
    "JUnitValueSource",
    "Prefer `@ValueSource` over a `@MethodSource` that contains only a single argument",
    Severity::Suggestion,
    bug_pattern_link!("JUnitValueSource"),
);

static STREAM_OF: Lazy<MethodMatcher> =
    Lazy::new(|| static_method().on_class("java.util.stream.Stream").named("of"));

static ARGUMENTS: Lazy<MethodMatcher> = Lazy::new(|| {
    static_method()
        .on_class("org.junit.jupiter.params.provider.Arguments")
        .named_any_of(&["arguments", "of"])
});

static VALUE_SOURCE_CANDIDATE: Lazy<BoxedMatcher> = Lazy::new(|| {
    boxed(all_of(vec![
        boxed(annotations(MatchType::AtLeastOne, is_type(METHOD_SOURCE))),
        boxed(method_has_parameters(vec![boxed(any_of(vec![
            boxed(is_primitive_or_boxed_primitive_type()),
            boxed(is_same_type("java.lang.String")),
            boxed(is_same_type("java.lang.Class")),
        ]))])),
    ]))
});

/// Single-argument parameterized tests fed by a trivial factory use `@ValueSource`.
pub struct JUnitValueSource;

impl BugChecker for JUnitValueSource {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_method(
        &self,
        method: NodeId,
        ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        if !VALUE_SOURCE_CANDIDATE.matches(method, ctx) {
            return Verdict::NoMatch;
        }
        match value_source_fix(method, ctx) {
            Some(fix) => DiagnosticBuilder::describe(&INFO, ctx.tree(), method)
                .fix(fix)
                .into_verdict(),
            None => Verdict::NoMatch,
        }
    }
}

fn value_source_fix(method: NodeId, ctx: &AnalysisContext<'_>) -> Option<Fix> {
    let tree = ctx.tree();
    let parameter = *method_params(tree, method).first()?;
    let parameter_type = ctx.declared_type(parameter)?;
    let annotation = find_annotation(ctx, method, METHOD_SOURCE)?;
    let factory_name = extract_single_factory_method_name(ctx, annotation, method)?;

    let class = ctx.find_enclosing(EnclosingKind::Class)?;
    let factories: Vec<NodeId> = find_methods(tree, class, &factory_name)
        .into_iter()
        .filter(|factory| method_params(tree, *factory).is_empty())
        .collect();
    let [factory] = factories[..] else {
        return None;
    };

    let stream_of = first_return_expression(ctx, factory)?;
    if !STREAM_OF.matches(stream_of, &ctx.at(stream_of)) {
        return None;
    }
    let NodeKind::MethodCall { args, .. } = tree.kind(stream_of) else {
        return None;
    };
    let values = args
        .iter()
        .map(|argument| single_constant_argument(ctx, *argument))
        .collect::<Option<Vec<String>>>()?;

    let mut fix = Fix::builder();
    fix.add_import(VALUE_SOURCE).replace_node(
        tree,
        annotation,
        format!(
            "@ValueSource({} = {{{}}})",
            value_source_attribute(&parameter_type),
            values.join(", ")
        ),
    );
    delete_member(&mut fix, tree, factory);
    match fix.build() {
        Ok(fix) if !fix.is_empty() => Some(fix),
        Ok(_) => None,
        Err(error) => {
            tracing::debug!(%error, "dropping conflicting value source fix");
            None
        }
    }
}

fn first_return_expression(ctx: &AnalysisContext<'_>, method: NodeId) -> Option<NodeId> {
    let tree = ctx.tree();
    tree.body_statements(method)
        .iter()
        .find_map(|statement| match tree.kind(*statement) {
            NodeKind::Return { expr } => Some(*expr),
            _ => None,
        })
        .flatten()
        .map(|expr| tree.skip_parens(expr))
}

/// The source of the only argument of an `arguments(x)` call, provided it is a
/// constant or a class literal.
fn single_constant_argument(ctx: &AnalysisContext<'_>, call: NodeId) -> Option<String> {
    let tree = ctx.tree();
    if !ARGUMENTS.matches(call, &ctx.at(call)) {
        return None;
    }
    let NodeKind::MethodCall { args, .. } = tree.kind(call) else {
        return None;
    };
    let [argument] = args[..] else {
        return None;
    };
    let is_constant = matches!(tree.kind(argument), NodeKind::ClassLiteral { .. })
        || constant_value_of(&ctx.at(argument), argument).is_some();
    is_constant.then(|| source_or_pretty(tree, argument))
}

/// The `@ValueSource` attribute holding values of the given parameter type.
fn value_source_attribute(parameter_type: &str) -> String {
    let simple = parameter_type.rsplit('.').next().unwrap_or(parameter_type);
    match simple {
        "Class" => "classes".to_string(),
        "Character" | "char" => "chars".to_string(),
        "Integer" | "int" => "ints".to_string(),
        other => format!("{}s", other.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    const HEADER: &str = "import static org.junit.jupiter.params.provider.Arguments.arguments;\n\nimport java.util.stream.Stream;\nimport org.junit.jupiter.params.ParameterizedTest;\nimport org.junit.jupiter.params.provider.Arguments;\nimport org.junit.jupiter.params.provider.MethodSource;\n";

    #[test]
    fn attribute_names() {
        assert_eq!(value_source_attribute("int"), "ints");
        assert_eq!(value_source_attribute("java.lang.Integer"), "ints");
        assert_eq!(value_source_attribute("char"), "chars");
        assert_eq!(value_source_attribute("java.lang.Class"), "classes");
        assert_eq!(value_source_attribute("java.lang.String"), "strings");
        assert_eq!(value_source_attribute("long"), "longs");
    }

    #[test]
    fn replaces_method_source_by_value_source() {
        let source = format!(
            "{HEADER}\nfinal class A {{\n  private static Stream<Arguments> integers() {{\n    return Stream.of(arguments(1), arguments(2), arguments(3));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"integers\")\n  void foo(int i) {{}}\n}}\n"
        );
        let (tree, diagnostics) = run(&JUnitValueSource, &source);
        assert_eq!(diagnostics.len(), 1);
        let expected_header = HEADER.replace(
            "import org.junit.jupiter.params.provider.MethodSource;\n",
            "import org.junit.jupiter.params.provider.MethodSource;\nimport org.junit.jupiter.params.provider.ValueSource;\n",
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{expected_header}\nfinal class A {{\n  @ParameterizedTest\n  @ValueSource(ints = {{1, 2, 3}})\n  void foo(int i) {{}}\n}}\n"
            )
        );
    }

    #[test]
    fn class_literals_and_constants_are_accepted() {
        let source = format!(
            "{HEADER}\nfinal class A {{\n  private static final String PREFIX = \"a\";\n\n  @ParameterizedTest\n  @MethodSource\n  void strings(String s) {{}}\n\n  private static Stream<Arguments> strings() {{\n    return Stream.of(Arguments.arguments(PREFIX + \"b\"), arguments(\"c\"));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"types\")\n  void classes(Class<?> c) {{}}\n\n  private static Stream<Arguments> types() {{\n    return Stream.of(arguments(String.class), arguments(int.class));\n  }}\n}}\n"
        );
        let (tree, diagnostics) = run(&JUnitValueSource, &source);
        assert_eq!(diagnostics.len(), 2);
        let expected_header = HEADER.replace(
            "import org.junit.jupiter.params.provider.MethodSource;\n",
            "import org.junit.jupiter.params.provider.MethodSource;\nimport org.junit.jupiter.params.provider.ValueSource;\n",
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{expected_header}\nfinal class A {{\n  private static final String PREFIX = \"a\";\n\n  @ParameterizedTest\n  @ValueSource(strings = {{PREFIX + \"b\", \"c\"}})\n  void strings(String s) {{}}\n\n  @ParameterizedTest\n  @ValueSource(classes = {{String.class, int.class}})\n  void classes(Class<?> c) {{}}\n}}\n"
            )
        );
    }

    #[test]
    fn bare_method_source_keeps_the_following_line() {
        let source = format!(
            "{HEADER}\nfinal class A {{\n  private static Stream<Arguments> foo() {{\n    return Stream.of(arguments(1));\n  }}\n\n  @ParameterizedTest\n  @MethodSource\n  void foo(int i) {{}}\n}}\n"
        );
        let (tree, diagnostics) = run(&JUnitValueSource, &source);
        assert_eq!(diagnostics.len(), 1);
        let expected_header = HEADER.replace(
            "import org.junit.jupiter.params.provider.MethodSource;\n",
            "import org.junit.jupiter.params.provider.MethodSource;\nimport org.junit.jupiter.params.provider.ValueSource;\n",
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{expected_header}\nfinal class A {{\n  @ParameterizedTest\n  @ValueSource(ints = {{1}})\n  void foo(int i) {{}}\n}}\n"
            )
        );
    }

    #[test]
    fn abstains_on_anything_but_trivial_factories() {
        let source = format!(
            "{HEADER}\nfinal class A {{\n  private static Stream<Arguments> mapped() {{\n    return Stream.of(1, 2).map(Arguments::arguments);\n  }}\n\n  private static Stream<Arguments> pairs() {{\n    return Stream.of(arguments(1, 2));\n  }}\n\n  private static Stream<Arguments> chars() {{\n    return Stream.of(arguments(Character.valueOf('a')));\n  }}\n\n  private static Stream<Arguments> mixed() {{\n    return Stream.of(arguments(1), arguments(Integer.parseInt(\"2\")));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"mapped\")\n  void a(int i) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"pairs\")\n  void b(int i) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"chars\")\n  void c(char ch) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"mixed\")\n  void d(int i) {{}}\n\n  @ParameterizedTest\n  @MethodSource({{\"mapped\", \"pairs\"}})\n  void e(int i) {{}}\n\n  @ParameterizedTest\n  @MethodSource(\"mapped\")\n  void f(int i, int j) {{}}\n}}\n"
        );
        let (_, diagnostics) = run(&JUnitValueSource, &source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
