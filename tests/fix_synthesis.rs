// Fix synthesis through the public API: merging, import bookkeeping, refactorings.

use rectify::ast::{Modifier, NodeKind, Span, Tree};
use rectify::fix::refactor::{delete_member, remove_modifiers, rename_method};
use rectify::fix::Fix;
use rectify::syntax::parse_compilation_unit;
use rectify::RectifyError;

fn parse(source: &str) -> Tree {
    parse_compilation_unit("A.java", source).unwrap()
}

fn method_named(tree: &Tree, wanted: &str) -> rectify::ast::NodeId {
    tree.preorder()
        .into_iter()
        .find(|id| matches!(tree.kind(*id), NodeKind::Method { name, .. } if name == wanted))
        .unwrap()
}

#[test]
fn disjoint_fixes_merge_and_overlapping_ones_do_not() {
    let mut first = Fix::builder();
    first.replace(Span::new(0, 3), "x");
    let mut second = Fix::builder();
    second.replace(Span::new(5, 6), "y");
    let mut third = Fix::builder();
    third.replace(Span::new(2, 4), "z");

    let first = first.build().unwrap();
    let second = second.build().unwrap();
    let third = third.build().unwrap();

    let merged = first.merge(&second).unwrap();
    assert_eq!(merged.edits().len(), 2);
    assert!(merged.overlaps(&third));
    assert!(matches!(merged.merge(&third), Err(RectifyError::OverlappingEdits { .. })));
}

#[test]
fn java_lang_and_same_package_imports_are_skipped() {
    let tree = parse("package p;\n\nimport java.util.List;\n\nclass A {}\n");
    let mut builder = Fix::builder();
    builder
        .add_import("java.lang.String")
        .add_import("p.Other")
        .add_import("java.util.List")
        .add_import("java.util.Map");
    let fixed = builder.build().unwrap().apply(&tree).unwrap();
    assert_eq!(
        fixed,
        "package p;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass A {}\n"
    );
}

#[test]
fn declaration_refactorings_compose() {
    let tree = parse("class A {\n  public void testFoo() {\n    testFoo();\n  }\n\n  void unused() {}\n}\n");
    let method = method_named(&tree, "testFoo");
    let mut builder = Fix::builder();
    remove_modifiers(&mut builder, &tree, method, &[Modifier::Public]);
    rename_method(&mut builder, &tree, method, "foo");
    delete_member(&mut builder, &tree, method_named(&tree, "unused"));
    let fixed = builder.build().unwrap().apply(&tree).unwrap();
    assert_eq!(fixed, "class A {\n  void foo() {\n    foo();\n  }\n}\n");
}
