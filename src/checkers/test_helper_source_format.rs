//! Inline test sources follow the canonical layout.
//!
//! Sources handed to the Error Prone test helpers are checked by formatting them
//! with the built-in printer. When the language level allows it (and the
//! `AvoidTextBlocks` flag is off) the source must also be a single text block;
//! otherwise it must be a list of string literals, one per line.

use once_cell::sync::Lazy;

use crate::ast::pretty::{string_literal, FormatError};
use crate::ast::{Literal, NodeId, NodeKind, Span, Tree};
use crate::checkers::{check_info, BugChecker};
use crate::constant::{constant_value_of, ConstantValue};
use crate::context::AnalysisContext;
use crate::diagnostics::{CheckInfo, DiagnosticBuilder, Reporter, Severity, Verdict};
use crate::fix::Fix;
use crate::matchers::{any_of, boxed, instance_method, AnyOf, Matcher, MethodMatcher};
use crate::syntax::format_source;

const FLAG_AVOID_TEXT_BLOCKS: &str = "TestHelperSourceFormat:AvoidTextBlocks";
const FLAG_IGNORE_MALFORMED_CODE: &str = "TestHelperSourceFormat:IgnoreMalformedCode";
const TEXT_BLOCK_MARKER: &str = "\"\"\"";
const DEFAULT_TEXT_BLOCK_INDENTATION: &str = "            ";

static INFO: CheckInfo = check_info(
    "TestHelperSourceFormat",
    "Test code should follow the Google Java style (and when targeting JDK 15+ be specified using a single text block)",
    Severity::Suggestion,
    bug_pattern_link!("TestHelperSourceFormat"),
);

static INPUT_SOURCE_ACCEPTING_METHOD: Lazy<AnyOf> = Lazy::new(|| {
    any_of(vec![
        boxed(
            instance_method()
                .on_descendant_of("com.google.errorprone.CompilationTestHelper")
                .named("addSourceLines"),
        ),
        boxed(
            instance_method()
                .on_descendant_of("com.google.errorprone.BugCheckerRefactoringTestHelper")
                .named("addInputLines"),
        ),
    ])
});

static OUTPUT_SOURCE_ACCEPTING_METHOD: Lazy<MethodMatcher> = Lazy::new(|| {
    instance_method()
        .on_descendant_of("com.google.errorprone.BugCheckerRefactoringTestHelper.ExpectOutput")
        .named("addOutputLines")
});

pub struct TestHelperSourceFormat;

impl BugChecker for TestHelperSourceFormat {
    fn info(&self) -> &'static CheckInfo {
        &INFO
    }

    fn match_method_invocation(
        &self,
        call: NodeId,
        ctx: &AnalysisContext<'_>,
        _reporter: &mut Reporter,
    ) -> Verdict {
        let is_output_source = OUTPUT_SOURCE_ACCEPTING_METHOD.matches(call, ctx);
        if !is_output_source && !INPUT_SOURCE_ACCEPTING_METHOD.matches(call, ctx) {
            return Verdict::NoMatch;
        }
        let tree = ctx.tree();
        let NodeKind::MethodCall { args, .. } = tree.kind(call) else {
            return Verdict::NoMatch;
        };
        let source_lines = args.get(1..).unwrap_or_default();
        if source_lines.is_empty() {
            return DiagnosticBuilder::describe(&INFO, tree, call)
                .message("No source code provided")
                .into_verdict();
        }

        // Only sources consisting entirely of constants can be formatted.
        let Some(source) = constant_source_code(ctx, source_lines) else {
            return Verdict::NoMatch;
        };
        let options = Options::from_context(ctx);
        flag_formatting_issues(ctx, call, source_lines, &source, is_output_source, options)
    }
}

#[derive(Debug, Clone, Copy)]
struct Options {
    avoid_text_blocks: bool,
    ignore_malformed_code: bool,
    can_use_text_blocks: bool,
}

impl Options {
    fn from_context(ctx: &AnalysisContext<'_>) -> Self {
        let flags = ctx.flags();
        let avoid_text_blocks = flags.get_bool(FLAG_AVOID_TEXT_BLOCKS).unwrap_or(false);
        Self {
            avoid_text_blocks,
            ignore_malformed_code: flags.get_bool(FLAG_IGNORE_MALFORMED_CODE).unwrap_or(false),
            can_use_text_blocks: !avoid_text_blocks && ctx.is_text_block_supported(),
        }
    }
}

fn flag_formatting_issues(
    ctx: &AnalysisContext<'_>,
    call: NodeId,
    source_lines: &[NodeId],
    source: &str,
    retain_unused_imports: bool,
    options: Options,
) -> Verdict {
    let tree = ctx.tree();
    let formatted = match format_source("input", source, !retain_unused_imports) {
        Ok(formatted) if options.can_use_text_blocks => formatted,
        Ok(formatted) => formatted.trim_end().to_string(),
        Err(FormatError::Malformed(message)) => {
            if options.ignore_malformed_code {
                return Verdict::NoMatch;
            }
            return DiagnosticBuilder::describe(&INFO, tree, call)
                .message(format!("Source code is malformed: {message}"))
                .into_verdict();
        }
        Err(error) => {
            tracing::debug!(%error, "cannot format inline test source");
            return Verdict::NoMatch;
        }
    };

    let is_formatted = source == formatted;
    let has_string_literal_mismatch =
        should_update_string_literal_format(tree, source_lines, options);
    if is_formatted && !has_string_literal_mismatch {
        return Verdict::NoMatch;
    }

    let has_newline_mismatch = !is_formatted && source.trim_end() == formatted.trim_end();
    let message = if is_formatted || (has_newline_mismatch && has_string_literal_mismatch) {
        format!(
            "Test code should {}be specified using a single text block",
            if options.avoid_text_blocks { "not " } else { "" }
        )
    } else {
        format!(
            "Test code should follow the Google Java style{}",
            if has_newline_mismatch {
                " (pay attention to trailing newlines)"
            } else {
                ""
            }
        )
    };

    let first = source_lines.first().and_then(|line| tree.span(*line));
    let last = source_lines.last().and_then(|line| tree.span(*line));
    let fix = match (first, last) {
        (Some(first), Some(last)) => {
            let replacement = if options.can_use_text_blocks {
                to_text_block_expression(tree, call, &formatted)
            } else {
                to_line_enumeration(&formatted)
            };
            let mut builder = Fix::builder();
            builder.replace(Span::new(first.start, last.end), replacement);
            builder.build().unwrap_or_default()
        }
        _ => Fix::empty(),
    };

    DiagnosticBuilder::describe(&INFO, tree, call)
        .message(message)
        .fix(fix)
        .into_verdict()
}

fn should_update_string_literal_format(
    tree: &Tree,
    source_lines: &[NodeId],
    options: Options,
) -> bool {
    if options.can_use_text_blocks {
        source_lines.len() > 1 || !is_text_block(tree, source_lines[0])
    } else {
        source_lines.iter().any(|line| is_text_block(tree, *line))
    }
}

/// A string literal written with triple quotes. Literals without source are
/// assumed not to be text blocks.
fn is_text_block(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.kind(node), NodeKind::Literal(Literal::String(_)))
        && tree
            .source_of(node)
            .is_some_and(|source| source.starts_with(TEXT_BLOCK_MARKER))
}

fn constant_source_code(ctx: &AnalysisContext<'_>, source_lines: &[NodeId]) -> Option<String> {
    let lines = source_lines
        .iter()
        .map(|line| match constant_value_of(&ctx.at(*line), *line)? {
            ConstantValue::ClassRef(_) => None,
            value => Some(value.to_string()),
        })
        .collect::<Option<Vec<String>>>()?;
    Some(lines.join("\n"))
}

fn to_text_block_expression(tree: &Tree, call: NodeId, source: &str) -> String {
    let indentation = suggest_text_block_indentation(tree, call);
    let body = source
        .replace('\n', &format!("\n{indentation}"))
        .replace('\\', "\\\\")
        .replace(TEXT_BLOCK_MARKER, "\"\"\\\"");
    format!("{TEXT_BLOCK_MARKER}\n{indentation}{body}{TEXT_BLOCK_MARKER}")
}

fn to_line_enumeration(source: &str) -> String {
    source
        .split('\n')
        .map(string_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The indentation of the first source argument, else of the file name argument,
/// else of the invocation itself.
fn suggest_text_block_indentation(tree: &Tree, call: NodeId) -> String {
    let NodeKind::MethodCall { args, .. } = tree.kind(call) else {
        return DEFAULT_TEXT_BLOCK_INDENTATION.to_string();
    };
    [args.get(1), args.first(), Some(&call)]
        .into_iter()
        .flatten()
        .find_map(|node| indentation(tree, *node))
        .unwrap_or_else(|| DEFAULT_TEXT_BLOCK_INDENTATION.to_string())
}

fn indentation(tree: &Tree, node: NodeId) -> Option<String> {
    let start = tree.span(node)?.start;
    let source = tree.source();
    let line_start = source[..start].rfind('\n')? + 1;
    let prefix = &source[line_start..start];
    prefix
        .chars()
        .all(char::is_whitespace)
        .then(|| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{apply_all, run, run_with};
    use crate::config::{Flags, LanguageLevel};

    fn compilation_test(arguments: &str) -> String {
        format!(
            "import com.google.errorprone.CompilationTestHelper;\n\nfinal class T {{\n  private final CompilationTestHelper helper = CompilationTestHelper.newInstance(Object.class, getClass());\n\n  void m() {{\n    helper\n        .addSourceLines(\n{arguments})\n        .doTest();\n  }}\n}}\n"
        )
    }

    fn messages(diagnostics: &[crate::diagnostics::Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn suggests_a_text_block() {
        let source = compilation_test("            \"A.java\",\n            \"class A {}\"");
        let (tree, diagnostics) = run(&TestHelperSourceFormat, &source);
        assert_eq!(
            messages(&diagnostics),
            ["Test code should be specified using a single text block"]
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            compilation_test("            \"A.java\",\n            \"\"\"\n            class A {}\n            \"\"\"")
        );
    }

    #[test]
    fn formatted_text_blocks_are_accepted() {
        let source = compilation_test("            \"A.java\",\n            \"\"\"\n            class A {\n              int x;\n            }\n            \"\"\"");
        let (_, diagnostics) = run(&TestHelperSourceFormat, &source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn line_enumerations_are_reformatted_when_text_blocks_are_avoided() {
        let flags = Flags::from_pairs([(FLAG_AVOID_TEXT_BLOCKS, "true")]);
        let source = compilation_test("            \"A.java\",\n            \"class A {\",\n            \"int x;\",\n            \"}\"");
        let (tree, diagnostics) =
            run_with(&TestHelperSourceFormat, &source, &flags, LanguageLevel::default());
        assert_eq!(messages(&diagnostics), ["Test code should follow the Google Java style"]);
        assert_eq!(
            apply_all(&tree, &diagnostics),
            compilation_test("            \"A.java\",\n            \"class A {\", \"  int x;\", \"}\"")
        );

        let formatted = compilation_test("            \"A.java\",\n            \"class A {}\"");
        let (_, diagnostics) =
            run_with(&TestHelperSourceFormat, &formatted, &flags, LanguageLevel::default());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn text_blocks_are_rejected_below_java_15() {
        let source = compilation_test("            \"A.java\",\n            \"\"\"\n            class A {}\n            \"\"\"");
        let (tree, diagnostics) =
            run_with(&TestHelperSourceFormat, &source, &Flags::empty(), LanguageLevel(11));
        assert_eq!(
            messages(&diagnostics),
            ["Test code should be specified using a single text block"]
        );
        assert_eq!(
            apply_all(&tree, &diagnostics),
            compilation_test("            \"A.java\",\n            \"class A {}\"")
        );
    }

    #[test]
    fn missing_and_malformed_sources() {
        let (_, diagnostics) =
            run(&TestHelperSourceFormat, &compilation_test("            \"A.java\""));
        assert_eq!(messages(&diagnostics), ["No source code provided"]);

        let malformed = compilation_test("            \"A.java\",\n            \"class A {\"");
        let (_, diagnostics) = run(&TestHelperSourceFormat, &malformed);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Source code is malformed: 1:"));
        assert!(diagnostics[0].fixes.is_empty());

        let flags = Flags::from_pairs([(FLAG_IGNORE_MALFORMED_CODE, "true")]);
        let (_, diagnostics) =
            run_with(&TestHelperSourceFormat, &malformed, &flags, LanguageLevel::default());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unused_imports_are_only_removed_from_inputs() {
        let block = "\"\"\"\n            import java.util.List;\n\n            class A {}\n            \"\"\"";
        let source = format!(
            "import com.google.errorprone.BugCheckerRefactoringTestHelper;\n\nfinal class T {{\n  private final BugCheckerRefactoringTestHelper helper = BugCheckerRefactoringTestHelper.newInstance(Object.class, getClass());\n\n  void m() {{\n    helper\n        .addInputLines(\n            \"A.java\",\n            {block})\n        .addOutputLines(\n            \"A.java\",\n            {block})\n        .doTest();\n  }}\n}}\n"
        );
        let (_, diagnostics) = run(&TestHelperSourceFormat, &source);
        assert_eq!(messages(&diagnostics), ["Test code should follow the Google Java style"]);
    }

    #[test]
    fn non_constant_sources_are_ignored() {
        let source = compilation_test("            \"A.java\",\n            String.valueOf(1)");
        let (_, diagnostics) = run(&TestHelperSourceFormat, &source);
        assert!(diagnostics.is_empty());
    }
}
