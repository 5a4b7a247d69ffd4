//! Boolean negation and equality rewrites.

use crate::errors::RectifyError;
use crate::matchers::{boxed, is_enum_type};
use crate::refaster::TemplateRule;

pub(super) fn rules() -> Result<Vec<TemplateRule>, RectifyError> {
    Ok(vec![
        TemplateRule::builder("EqualityRules.PrimitiveOrReferenceEquality")
            .summary("Prefer reference-based equality for enums")
            .import("java.util.Objects")
            .placeholder_with("a", boxed(is_enum_type()))
            .placeholder_with("b", boxed(is_enum_type()))
            .before("a.equals(b)")
            .before("Objects.equals(a, b)")
            .after("a == b")
            .build()?,
        TemplateRule::builder("EqualityRules.EqualsPredicate")
            .summary("Prefer a method reference over an `equals` lambda")
            .placeholder("object")
            .before("v -> object.equals(v)")
            .after("object::equals")
            .build()?,
        TemplateRule::builder("EqualityRules.DoubleNegation")
            .summary("Avoid double negations; this is not Javascript")
            .placeholder("a")
            .before("!!a")
            .after("a")
            .build()?,
        TemplateRule::builder("EqualityRules.Negation")
            .summary("Prefer `a != b` over more contrived alternatives")
            .placeholder("a")
            .placeholder("b")
            .before("a ? !b : b")
            .before("!(a == b)")
            .after("a != b")
            .build()?,
        TemplateRule::builder("EqualityRules.IndirectDoubleNegation")
            .summary("Prefer `a == b` over more contrived alternatives")
            .placeholder("a")
            .placeholder("b")
            .before("a ? b : !b")
            .before("!(a != b)")
            .after("a == b")
            .build()?,
        TemplateRule::builder("EqualityRules.PredicateLambda")
            .summary("Don't negate a predicate lambda through `Predicate.not`")
            .import("static java.util.function.Predicate.not")
            .function("predicate", &["value"])
            .before("not(v -> predicate(v))")
            .after("v -> !predicate(v)")
            .build()?,
        TemplateRule::builder("EqualityRules.EqualsLhsNullable")
            .summary("Compare the values directly rather than through `Optional`")
            .import("java.util.Optional")
            .placeholder("value1")
            .placeholder("value2")
            .before("Optional.ofNullable(value1).equals(Optional.of(value2))")
            .after("value2.equals(value1)")
            .build()?,
        TemplateRule::builder("EqualityRules.EqualsRhsNullable")
            .summary("Compare the values directly rather than through `Optional`")
            .import("java.util.Optional")
            .placeholder("value1")
            .placeholder("value2")
            .before("Optional.of(value1).equals(Optional.ofNullable(value2))")
            .after("value1.equals(value2)")
            .build()?,
        TemplateRule::builder("EqualityRules.EqualsLhsAndRhsNullable")
            .summary("Prefer `Objects.equals(..)` over comparing two `Optional`s")
            .import("java.util.Objects")
            .import("java.util.Optional")
            .placeholder("value1")
            .placeholder("value2")
            .before("Optional.ofNullable(value1).equals(Optional.ofNullable(value2))")
            .after("Objects.equals(value1, value2)")
            .build()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refaster::rules::find;
    use crate::refaster::testing::rewrite;

    fn rule(name: &str) -> &'static TemplateRule {
        find(name).unwrap()
    }

    fn method(body: &str) -> String {
        format!("class A {{\n  boolean m(boolean p, boolean q, int x) {{\n    return {body};\n  }}\n}}\n")
    }

    #[test]
    fn double_negation() {
        let rule = rule("EqualityRules.DoubleNegation");
        let (diagnostics, output) = rewrite(rule, &method("!!Boolean.TRUE"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].check, "EqualityRules.DoubleNegation");
        assert!(output.contains("return Boolean.TRUE;"), "{output}");

        // The outermost double negation wins; the one it contains is left alone.
        let (diagnostics, output) = rewrite(rule, &method("!!!!p"));
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("return !!p;"), "{output}");
    }

    #[test]
    fn negated_equality() {
        let rule = rule("EqualityRules.Negation");
        let (_, output) = rewrite(rule, &method("!(3 == 4)"));
        assert!(output.contains("return 3 != 4;"), "{output}");

        let (_, output) = rewrite(rule, &method("p ? !q : q"));
        assert!(output.contains("return p != q;"), "{output}");

        let (diagnostics, _) = rewrite(rule, &method("p ? !q : p"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn indirect_double_negation() {
        let rule = rule("EqualityRules.IndirectDoubleNegation");
        let (_, output) = rewrite(rule, &method("!(x != 1)"));
        assert!(output.contains("return x == 1;"), "{output}");

        let (_, output) = rewrite(rule, &method("p ? q : !q"));
        assert!(output.contains("return p == q;"), "{output}");
    }

    #[test]
    fn enum_equality_is_by_reference() {
        let source = "import java.math.RoundingMode;\nimport java.util.Objects;\n\nclass A {\n  void m(String s) {\n    f(RoundingMode.UP.equals(RoundingMode.DOWN), Objects.equals(RoundingMode.UP, RoundingMode.DOWN), !RoundingMode.UP.equals(RoundingMode.DOWN), s.equals(\"t\"));\n  }\n}\n";
        let (diagnostics, output) =
            rewrite(rule("EqualityRules.PrimitiveOrReferenceEquality"), source);
        assert_eq!(diagnostics.len(), 3);
        assert!(
            output.contains("f(RoundingMode.UP == RoundingMode.DOWN, RoundingMode.UP == RoundingMode.DOWN, !(RoundingMode.UP == RoundingMode.DOWN), s.equals(\"t\"));"),
            "{output}"
        );
    }

    #[test]
    fn equals_lambda_becomes_method_reference() {
        let source = "import java.util.stream.Stream;\n\nclass A {\n  boolean m() {\n    return Stream.of(\"foo\").anyMatch(s -> \"bar\".equals(s)) || Stream.of(\"foo\").anyMatch(s -> s.equals(s));\n  }\n}\n";
        let (diagnostics, output) = rewrite(rule("EqualityRules.EqualsPredicate"), source);
        assert_eq!(diagnostics.len(), 1);
        assert!(
            output.contains("return Stream.of(\"foo\").anyMatch(\"bar\"::equals) || Stream.of(\"foo\").anyMatch(s -> s.equals(s));"),
            "{output}"
        );
    }

    #[test]
    fn negated_predicate_lambda() {
        let source = "import static java.util.function.Predicate.not;\n\nimport java.util.function.Predicate;\n\nclass A {\n  Predicate<String> m() {\n    return not(v -> v.isEmpty());\n  }\n}\n";
        let (diagnostics, output) = rewrite(rule("EqualityRules.PredicateLambda"), source);
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("return v -> !v.isEmpty();"), "{output}");
    }

    #[test]
    fn optional_wrapped_equality() {
        let source = "import java.util.Optional;\n\nclass A {\n  void m() {\n    f(Optional.ofNullable(\"foo\").equals(Optional.of(\"bar\")));\n    f(Optional.of(\"foo\").equals(Optional.ofNullable(\"bar\")));\n    f(Optional.ofNullable(\"foo\").equals(Optional.ofNullable(\"bar\")));\n  }\n}\n";
        let (diagnostics, output) = rewrite(rule("EqualityRules.EqualsLhsNullable"), source);
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("    f(\"bar\".equals(\"foo\"));\n"), "{output}");

        let (diagnostics, output) = rewrite(rule("EqualityRules.EqualsRhsNullable"), source);
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("    f(\"foo\".equals(\"bar\"));\n"), "{output}");

        let (diagnostics, output) = rewrite(rule("EqualityRules.EqualsLhsAndRhsNullable"), source);
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("    f(Objects.equals(\"foo\", \"bar\"));\n"), "{output}");
        assert!(output.contains("import java.util.Objects;\n"), "{output}");
    }
}
