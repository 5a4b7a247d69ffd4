//! Context resolution over a syntax tree.
//!
//! Answers the structural questions checkers ask about the neighbourhood of a node:
//! which class or method encloses it, which sibling methods carry a given name, what
//! an annotation argument holds, which comments sit in a source range, and whether a
//! method could be renamed without clashing.
//!
//! ## Core Principles
//! - Ambiguity is abstention: callers get `None` or a list and decide, nothing here
//!   fails.
//! - Resolution is purely syntactic plus whatever the [`AnalysisContext`] knows about
//!   imports and types.

use crate::ast::{NodeId, NodeKind, Span, Tree};
use crate::constant::{constant_value_of, ConstantValue};
use crate::context::AnalysisContext;

// ============================================================================
// COMMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A source comment, including its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    pub text: String,
    pub kind: CommentKind,
}

/// Returns the comments lying entirely within `[start, end)`.
///
/// The scan always starts at the beginning of `source` so that comment markers inside
/// string, character and text block literals are never mistaken for comments.
pub fn comments_between(source: &str, start: usize, end: usize) -> Vec<Comment> {
    let bytes = source.as_bytes();
    let end = end.min(bytes.len());
    let mut comments = Vec::new();
    let mut i = 0;
    while i < end {
        match bytes[i] {
            b'"' if bytes[i..].starts_with(b"\"\"\"") => i = skip_text_block(bytes, i + 3),
            quote @ (b'"' | b'\'') => i = skip_quoted(bytes, i + 1, quote),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let stop = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |offset| i + offset);
                push_comment(source, &mut comments, i, stop, start, end, CommentKind::Line);
                i = stop;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let stop = bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
                push_comment(source, &mut comments, i, stop, start, end, CommentKind::Block);
                i = stop;
            }
            _ => i += 1,
        }
    }
    comments
}

/// The length of `text` once trailing whitespace and comments are dropped.
pub fn trimmed_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut significant = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' => i += 1,
            b'"' if bytes[i..].starts_with(b"\"\"\"") => {
                i = skip_text_block(bytes, i + 3).min(bytes.len());
                significant = i;
            }
            quote @ (b'"' | b'\'') => {
                i = skip_quoted(bytes, i + 1, quote).min(bytes.len());
                significant = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |offset| i + offset);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
            }
            _ => {
                i += 1;
                significant = i;
            }
        }
    }
    significant
}

fn push_comment(
    source: &str,
    comments: &mut Vec<Comment>,
    from: usize,
    to: usize,
    start: usize,
    end: usize,
    kind: CommentKind,
) {
    if from < start || to > end {
        return;
    }
    if let Some(text) = source.get(from..to) {
        comments.push(Comment {
            span: Span::new(from, to),
            text: text.trim_end().to_string(),
            kind,
        });
    }
}

fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_text_block(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i..].starts_with(b"\"\"\"") {
            return i + 3;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

// ============================================================================
// ENCLOSING DECLARATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosingKind {
    Class,
    Method,
}

/// The nearest strict ancestor of `node` of the requested kind.
pub fn find_enclosing(tree: &Tree, node: NodeId, kind: EnclosingKind) -> Option<NodeId> {
    tree.ancestors(node).find(|ancestor| {
        matches!(
            (kind, tree.kind(*ancestor)),
            (EnclosingKind::Class, NodeKind::Class { .. })
                | (EnclosingKind::Method, NodeKind::Method { .. })
        )
    })
}

/// All methods (not constructors) declared directly in `class` with exactly this name.
pub fn find_methods(tree: &Tree, class: NodeId, name: &str) -> Vec<NodeId> {
    tree.members(class)
        .iter()
        .copied()
        .filter(|member| {
            matches!(
                tree.kind(*member),
                NodeKind::Method { name: n, return_type: Some(_), .. } if n == name
            )
        })
        .collect()
}

/// Parameter declarations of a method.
pub fn method_params(tree: &Tree, method: NodeId) -> &[NodeId] {
    match tree.kind(method) {
        NodeKind::Method { params, .. } => params,
        _ => &[],
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

/// The first annotation on `decl` whose type resolves to `fqn`.
pub fn find_annotation(ctx: &AnalysisContext<'_>, decl: NodeId, fqn: &str) -> Option<NodeId> {
    let tree = ctx.tree();
    tree.annotations_of(decl).iter().copied().find(|annotation| {
        matches!(tree.kind(*annotation), NodeKind::Annotation { name, .. }
            if ctx.resolve_type_name(name) == fqn)
    })
}

/// The value node of the named annotation argument.
///
/// `value` also matches a single unnamed argument, as in `@MethodSource("foo")`.
pub fn annotation_argument(tree: &Tree, annotation: NodeId, name: &str) -> Option<NodeId> {
    let NodeKind::Annotation { args, .. } = tree.kind(annotation) else {
        return None;
    };
    for arg in args {
        match tree.kind(*arg) {
            NodeKind::Assign { target, value } => {
                if matches!(tree.kind(*target), NodeKind::Ident { name: n } if n == name) {
                    return Some(*value);
                }
            }
            _ if name == "value" => return Some(*arg),
            _ => {}
        }
    }
    None
}

/// The elements of an annotation value: the initializer entries of an array value,
/// or the value itself.
pub fn annotation_elements(tree: &Tree, value: NodeId) -> Vec<NodeId> {
    match tree.kind(value) {
        NodeKind::ArrayInit { elements } => elements.clone(),
        _ => vec![value],
    }
}

/// String constants of a scalar or array annotation value; `None` when any element
/// is not a string constant.
pub fn annotation_string_values(ctx: &AnalysisContext<'_>, value: NodeId) -> Option<Vec<String>> {
    annotation_elements(ctx.tree(), value)
        .into_iter()
        .map(|element| match constant_value_of(ctx, element)? {
            ConstantValue::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// The single factory method named by a `@MethodSource` annotation on `test_method`.
///
/// Without an argument the factory shares the test method's name. Several listed
/// names yield `None`.
pub fn extract_single_factory_method_name(
    ctx: &AnalysisContext<'_>,
    annotation: NodeId,
    test_method: NodeId,
) -> Option<String> {
    let tree = ctx.tree();
    match annotation_argument(tree, annotation, "value") {
        None => tree.decl_name(test_method).map(str::to_string),
        Some(value) => {
            let mut names = annotation_string_values(ctx, value)?;
            if names.len() == 1 {
                names.pop()
            } else {
                None
            }
        }
    }
}

// ============================================================================
// RENAME CONFLICTS
// ============================================================================

const RESERVED_KEYWORDS: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false",
    "final", "finally", "float", "for", "goto", "if", "implements", "import", "instanceof",
    "int", "interface", "long", "native", "new", "null", "package", "private", "protected",
    "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized",
    "this", "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
];

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}

/// Explains why a method in the class enclosing the context leaf cannot be renamed
/// to `name`, if anything prevents it.
pub fn find_method_rename_blocker(ctx: &AnalysisContext<'_>, name: &str) -> Option<String> {
    let tree = ctx.tree();
    let class = match tree.kind(ctx.leaf()) {
        NodeKind::Class { .. } => Some(ctx.leaf()),
        _ => ctx.find_enclosing(EnclosingKind::Class),
    };
    if class.is_some_and(|class| !find_methods(tree, class, name).is_empty()) {
        return Some(format!("a method named `{name}` already exists in this class"));
    }
    if is_statically_imported(tree, name) {
        return Some(format!("`{name}` is already statically imported"));
    }
    if is_reserved_keyword(name) {
        return Some(format!("`{name}` is a reserved keyword"));
    }
    None
}

/// Whether a single static import brings `name` into scope.
pub fn is_statically_imported(tree: &Tree, name: &str) -> bool {
    tree.imports().into_iter().any(|import| {
        matches!(tree.kind(import), NodeKind::Import { path, is_static: true, wildcard: false }
            if path.rsplit('.').next() == Some(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Flags, LanguageLevel};
    use crate::context::TypeTable;
    use crate::syntax::parse_compilation_unit;

    #[test]
    fn trimmed_len_drops_trailing_trivia_only() {
        assert_eq!(trimmed_len("@Deprecated\n  "), "@Deprecated".len());
        assert_eq!(trimmed_len("a ? b : c /* x */ // y\n"), "a ? b : c".len());
        assert_eq!(trimmed_len("\"// not a comment\"  "), "\"// not a comment\"".len());
        assert_eq!(trimmed_len("a / b "), "a / b".len());
        assert_eq!(trimmed_len("  "), 0);
    }

    #[test]
    fn comments_inside_literals_are_ignored() {
        let source = "String a = \"// no\"; /* yes */ char c = '/'; // tail\nString b = \"\"\"\n /* no */\n\"\"\";";
        let comments = comments_between(source, 0, source.len());
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["/* yes */", "// tail"]);
        assert_eq!(comments[1].kind, CommentKind::Line);
    }

    #[test]
    fn comments_are_limited_to_the_range() {
        let source = "/* a */ x /* b */";
        let comments = comments_between(source, 3, source.len());
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "/* b */");
    }

    fn method_named(tree: &Tree, name: &str) -> NodeId {
        tree.preorder()
            .into_iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::Method { name: n, .. } if n == name))
            .unwrap()
    }

    #[test]
    fn factory_names_default_to_the_test_method() {
        let tree = parse_compilation_unit(
            "A.java",
            "import org.junit.jupiter.params.provider.MethodSource;\nclass A {\n  @MethodSource void foo(int x) {}\n  @MethodSource({\"a\", \"b\"}) void bar(int x) {}\n  @MethodSource(value = {\"c\"}) void baz(int x) {}\n}\n",
        )
        .unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let name_of = |method: &str| {
            let method = method_named(&tree, method);
            let annotation = tree.annotations_of(method)[0];
            extract_single_factory_method_name(&ctx.at(method), annotation, method)
        };
        assert_eq!(name_of("foo").as_deref(), Some("foo"));
        assert_eq!(name_of("bar"), None);
        assert_eq!(name_of("baz").as_deref(), Some("c"));
    }

    #[test]
    fn rename_blockers_are_explained() {
        let tree = parse_compilation_unit(
            "A.java",
            "import static org.assertj.core.api.Assertions.assertThat;\nclass A {\n  void testFoo() {}\n  void foo() {}\n}\n",
        )
        .unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let ctx = ctx.at(method_named(&tree, "testFoo"));
        assert_eq!(
            find_method_rename_blocker(&ctx, "foo").as_deref(),
            Some("a method named `foo` already exists in this class")
        );
        assert_eq!(
            find_method_rename_blocker(&ctx, "assertThat").as_deref(),
            Some("`assertThat` is already statically imported")
        );
        assert_eq!(
            find_method_rename_blocker(&ctx, "class").as_deref(),
            Some("`class` is a reserved keyword")
        );
        assert_eq!(find_method_rename_blocker(&ctx, "bar"), None);
    }
}
