use crate::ast::{Literal, NodeId, NodeKind, Tree};
use crate::checkers::{check_info, BugChecker};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::refactor::source_or_pretty;
use crate::fix::Fix;

static INFO: CheckInfo = check_info(
    "LexicographicalAnnotationAttributeListing",
    "Where possible, sort annotation array attributes lexicographically",
    Severity::Suggestion,
    bug_pattern_link!("LexicographicalAnnotationAttributeListing"),
);

/// Array-valued annotation arguments list their elements in lexicographical order.
///
/// String literals compare by value; every other element compares by its source
/// text. Nested annotations are visited on their own, so only the arrays directly
/// owned by this annotation are rewritten.
pub struct LexicographicalAnnotationAttributeListing;

impl BugChecker for LexicographicalAnnotationAttributeListing {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_annotation(
        &self,
        annotation: NodeId,
        ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        let tree = ctx.tree();
        let NodeKind::Annotation { args, .. } = tree.kind(annotation) else {
            return Verdict::NoMatch;
        };

        let mut fix = Fix::builder();
        let mut unsorted = false;
        for value in args.iter().map(|arg| attribute_value(tree, *arg)) {
            let NodeKind::ArrayInit { elements } = tree.kind(value) else {
                continue;
            };
            let Some(sorted) = sorted_elements(tree, elements) else {
                continue;
            };
            unsorted = true;
            fix.replace_node(tree, value, format!("{{{}}}", sorted.join(", ")));
        }
        if !unsorted {
            return Verdict::NoMatch;
        }

        match fix.build() {
            Ok(fix) => DiagnosticBuilder::describe(&INFO, tree, annotation)
                .fix(fix)
                .into_verdict(),
            Err(error) => {
                tracing::debug!(%error, "discarding conflicting attribute listing fix");
                DiagnosticBuilder::describe(&INFO, tree, annotation).into_verdict()
            }
        }
    }
}

fn attribute_value(tree: &Tree, arg: NodeId) -> NodeId {
    match tree.kind(arg) {
        NodeKind::Assign { value, .. } => *value,
        _ => arg,
    }
}

/// The element sources in sorted order, or `None` when they already are.
fn sorted_elements(tree: &Tree, elements: &[NodeId]) -> Option<Vec<String>> {
    let keyed: Vec<(String, String)> = elements
        .iter()
        .map(|element| (sort_key(tree, *element), source_or_pretty(tree, *element)))
        .collect();
    if keyed.windows(2).all(|pair| pair[0].0 <= pair[1].0) {
        return None;
    }
    let mut sorted = keyed;
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    Some(sorted.into_iter().map(|(_, source)| source).collect())
}

fn sort_key(tree: &Tree, element: NodeId) -> String {
    match tree.kind(element) {
        NodeKind::Literal(Literal::String(value)) => value.clone(),
        _ => source_or_pretty(tree, element)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run};

    const DECLARATIONS: &str = "import static java.math.RoundingMode.DOWN;\nimport static java.math.RoundingMode.UP;\n\nimport java.math.RoundingMode;\n\ninterface A {\n  @interface Foo {\n    String[] value() default {};\n\n    Class<?>[] cls() default {};\n\n    RoundingMode[] enums() default {};\n\n    Bar[] anns() default {};\n  }\n\n  @interface Bar {\n    String[] value() default {};\n  }\n";

    #[test]
    fn flags_unsorted_arrays_only() {
        let source = format!(
            "{DECLARATIONS}\n  @Foo({{}})\n  A noString();\n\n  @Foo({{\"a\", \"b\"}})\n  A sortedStrings();\n\n  @Foo({{\"b\", \"a\"}})\n  A unsortedStrings();\n\n  @Foo(cls = {{int.class, long.class}})\n  A sortedClasses();\n\n  @Foo(cls = {{long.class, int.class}})\n  A unsortedClasses();\n\n  @Foo(enums = {{UP, DOWN}})\n  A unsortedEnums();\n\n  @Foo(anns = {{@Bar(\"a\"), @Bar({{\"b\", \"a\"}})}})\n  A unsortedInnerAnns();\n}}\n"
        );
        let (_, diagnostics) = run(&LexicographicalAnnotationAttributeListing, &source);
        assert_eq!(diagnostics.len(), 4, "{diagnostics:?}");
    }

    #[test]
    fn sorts_elements_keeping_their_source() {
        let source = format!(
            "{DECLARATIONS}\n  @Foo({{\"b\", \"a\"}})\n  A unsortedStrings();\n\n  @Foo(cls = {{long.class, int.class}})\n  A unsortedClasses();\n\n  @Foo(anns = {{@Bar(\"b\"), @Bar(\"a\")}})\n  A unsortedAnns();\n\n  @Foo(anns = {{@Bar(\"a\"), @Bar({{\"b\", \"a\"}})}})\n  A unsortedInnerAnns();\n}}\n"
        );
        let (tree, diagnostics) = run(&LexicographicalAnnotationAttributeListing, &source);
        assert_eq!(
            apply_all(&tree, &diagnostics),
            format!(
                "{DECLARATIONS}\n  @Foo({{\"a\", \"b\"}})\n  A unsortedStrings();\n\n  @Foo(cls = {{int.class, long.class}})\n  A unsortedClasses();\n\n  @Foo(anns = {{@Bar(\"a\"), @Bar(\"b\")}})\n  A unsortedAnns();\n\n  @Foo(anns = {{@Bar(\"a\"), @Bar({{\"a\", \"b\"}})}})\n  A unsortedInnerAnns();\n}}\n"
            )
        );
    }
}
