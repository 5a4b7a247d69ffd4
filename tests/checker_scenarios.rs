// End-to-end checker scenarios through the `Analyzer`.

mod common;

use common::{analyzer_for, assert_fix, diagnostics, fix_once};
use rectify::config::Config;
use rectify::runner::Analyzer;

const JUNIT_HEADER: &str = "import static org.junit.jupiter.params.provider.Arguments.arguments;\n\nimport java.util.stream.Stream;\nimport org.junit.jupiter.api.Test;\nimport org.junit.jupiter.params.ParameterizedTest;\nimport org.junit.jupiter.params.provider.Arguments;\nimport org.junit.jupiter.params.provider.MethodSource;\n";

#[test]
fn public_test_class_becomes_final_and_package_private() {
    let analyzer = analyzer_for(&["JUnitClassDeclaration"]);
    assert_fix(
        &analyzer,
        "import org.junit.jupiter.api.Test;\n\npublic class A { @Test void foo(){} }\n",
        "import org.junit.jupiter.api.Test;\n\nfinal class A { @Test void foo(){} }\n",
    );
}

#[test]
fn trivial_method_source_becomes_value_source() {
    let analyzer = analyzer_for(&["JUnitValueSource"]);
    let input = format!(
        "{JUNIT_HEADER}\nfinal class A {{\n  private static Stream<Arguments> integers() {{\n    return Stream.of(arguments(1), arguments(2), arguments(3));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"integers\")\n  void foo(int i) {{}}\n}}\n"
    );
    let expected = format!(
        "{}\nfinal class A {{\n  @ParameterizedTest\n  @ValueSource(ints = {{1, 2, 3}})\n  void foo(int i) {{}}\n}}\n",
        JUNIT_HEADER.replace(
            "import org.junit.jupiter.params.provider.MethodSource;\n",
            "import org.junit.jupiter.params.provider.MethodSource;\nimport org.junit.jupiter.params.provider.ValueSource;\n",
        )
    );
    assert_fix(&analyzer, &input, &expected);
}

#[test]
fn mapped_streams_are_not_value_sources() {
    let analyzer = analyzer_for(&["JUnitValueSource"]);
    let input = format!(
        "{JUNIT_HEADER}\nfinal class A {{\n  private static Stream<Arguments> integers() {{\n    return Stream.of(1, 2).map(Arguments::arguments);\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"integers\")\n  void foo(int i) {{}}\n}}\n"
    );
    assert!(diagnostics(&analyzer, &input).is_empty());
}

#[test]
fn multiple_sources_are_left_alone() {
    let analyzer = analyzer_for(&["JUnitValueSource", "JUnitFactoryMethodDeclaration"]);
    let input = format!(
        "{JUNIT_HEADER}\nfinal class A {{\n  private static Stream<Arguments> a() {{\n    return Stream.of(arguments(1));\n  }}\n\n  private static Stream<Arguments> b() {{\n    return Stream.of(arguments(2));\n  }}\n\n  @ParameterizedTest\n  @MethodSource({{\"a\", \"b\"}})\n  void foo(int i) {{}}\n}}\n"
    );
    assert!(diagnostics(&analyzer, &input).is_empty());
}

#[test]
fn one_non_constant_argument_blocks_the_rewrite() {
    let analyzer = analyzer_for(&["JUnitValueSource"]);
    let input = format!(
        "{JUNIT_HEADER}\nfinal class A {{\n  private static Stream<Arguments> integers() {{\n    return Stream.of(arguments(1), arguments(Integer.parseInt(\"2\")));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"integers\")\n  void foo(int i) {{}}\n}}\n"
    );
    assert_eq!(fix_once(&analyzer, &input), input);
}

#[test]
fn canonical_test_class_draws_no_diagnostics() {
    let analyzer = Analyzer::new(&Config::default());
    let input = format!(
        "{JUNIT_HEADER}\nfinal class ATest {{\n  private static Stream<Arguments> sumTestCases() {{\n    /* {{ a, b, sum }} */\n    return Stream.of(arguments(1, 2, 3), arguments(2, 2, 4));\n  }}\n\n  @ParameterizedTest\n  @MethodSource(\"sumTestCases\")\n  void sum(int a, int b, int sum) {{\n    check(a + b == sum);\n  }}\n\n  @Test\n  void present() {{\n    check(Stream.of(1).findAny().isPresent());\n  }}\n\n  private static void check(boolean condition) {{\n    if (!condition) {{\n      throw new AssertionError();\n    }}\n  }}\n}}\n"
    );
    let found = diagnostics(&analyzer, &input);
    assert!(found.is_empty(), "{found:?}");
}

#[test]
fn flags_from_the_configuration_reach_checkers() {
    let config = Config::from_yaml(
        "enabled: [TestHelperSourceFormat]\nflags:\n  \"TestHelperSourceFormat:AvoidTextBlocks\": \"true\"\n",
    )
    .unwrap();
    let analyzer = Analyzer::new(&config);
    let source = "import com.google.errorprone.CompilationTestHelper;\n\nfinal class T {\n  private final CompilationTestHelper helper = CompilationTestHelper.newInstance(Object.class, getClass());\n\n  void m() {\n    helper\n        .addSourceLines(\n            \"A.java\",\n            \"class A {}\")\n        .doTest();\n  }\n}\n";
    assert!(diagnostics(&analyzer, source).is_empty());

    let default = analyzer_for(&["TestHelperSourceFormat"]);
    let found = diagnostics(&default, source);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "Test code should be specified using a single text block");
}

#[test]
fn every_fix_is_idempotent() {
    let analyzer = Analyzer::new(&Config::default());
    let input = "import org.junit.jupiter.api.Test;\n\npublic class A {\n  @Test\n  public void testFoo() {\n    check(!!true);\n  }\n\n  @Test\n  void bar() {}\n\n  private static void check(boolean condition) {\n    if (!condition) {\n      throw new AssertionError();\n    }\n  }\n}\n";
    let outcome = analyzer.fix_until_stable("A.java", input).unwrap();
    assert!(outcome.applied > 0);
    assert!(outcome.remaining.is_empty(), "{:?}", outcome.remaining);
    assert_eq!(analyzer.fix_until_stable("A.java", &outcome.source).unwrap().applied, 0);
}
