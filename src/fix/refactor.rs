//! Refactoring helpers that express common declaration edits as fix operations.

use crate::ast::pretty::node_to_string;
use crate::ast::{Modifier, NodeId, NodeKind, Tree};
use crate::fix::{member_deletion_span, FixBuilder};
use crate::resolve::{annotation_argument, find_enclosing, EnclosingKind};

/// The original source of a node, or its pretty printed form for synthetic nodes.
pub fn source_or_pretty(tree: &Tree, node: NodeId) -> String {
    tree.source_of(node)
        .map(str::to_string)
        .unwrap_or_else(|| node_to_string(tree, node))
}

/// Deletes the given modifier keywords of a declaration, with the whitespace that
/// follows each of them.
pub fn remove_modifiers(
    builder: &mut FixBuilder,
    tree: &Tree,
    decl: NodeId,
    modifiers: &[Modifier],
) {
    let Some(NodeKind::Modifiers { keywords, .. }) = tree.modifiers_of(decl).map(|m| tree.kind(m))
    else {
        return;
    };
    let source = tree.source();
    for token in keywords.iter().filter(|k| modifiers.contains(&k.modifier)) {
        match token.span {
            Some(span) => {
                let trailing = source[span.end..]
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(source.len() - span.end);
                builder.delete(crate::ast::Span::new(span.start, span.end + trailing));
            }
            None => {
                builder.mark_unpositioned();
            }
        }
    }
}

/// Adds a modifier keyword in its canonical position among the existing ones.
pub fn add_modifier(builder: &mut FixBuilder, tree: &Tree, decl: NodeId, modifier: Modifier) {
    if tree.has_modifier(decl, modifier) {
        return;
    }
    let Some(NodeKind::Modifiers { keywords, .. }) = tree.modifiers_of(decl).map(|m| tree.kind(m))
    else {
        return;
    };
    let text = format!("{} ", modifier.as_str());
    let following = keywords
        .iter()
        .filter(|k| k.modifier > modifier)
        .filter_map(|k| k.span)
        .min_by_key(|span| span.start);
    if let Some(span) = following {
        builder.prefix_with(span, text);
        return;
    }
    let anchor = match tree.kind(decl) {
        NodeKind::Class { keyword_span, .. } => *keyword_span,
        NodeKind::Method {
            return_type: Some(ty),
            ..
        } => tree.span(*ty),
        NodeKind::Method { name_span, .. } => *name_span,
        NodeKind::Variable { ty, .. } => tree.span(*ty),
        _ => None,
    };
    match anchor {
        Some(span) => {
            builder.prefix_with(span, text);
        }
        None => {
            builder.mark_unpositioned();
        }
    }
}

/// Renames a method declaration and the unqualified (or `this.`) invocations of it
/// within its class.
pub fn rename_method(builder: &mut FixBuilder, tree: &Tree, method: NodeId, new_name: &str) {
    let NodeKind::Method { name, name_span, .. } = tree.kind(method) else {
        return;
    };
    match name_span {
        Some(span) => {
            builder.replace(*span, new_name);
        }
        None => {
            builder.mark_unpositioned();
            return;
        }
    }
    let class = find_enclosing(tree, method, EnclosingKind::Class);
    for id in tree.preorder() {
        let NodeKind::MethodCall {
            target,
            name: called,
            name_span,
            ..
        } = tree.kind(id)
        else {
            continue;
        };
        let unqualified = match target {
            None => true,
            Some(target) => matches!(tree.kind(*target), NodeKind::This),
        };
        if called == name
            && unqualified
            && find_enclosing(tree, id, EnclosingKind::Class) == class
        {
            if let Some(span) = name_span {
                builder.replace(*span, new_name);
            }
        }
    }
}

/// Sets the named annotation argument to `values`, rendered as a scalar for a
/// single value and as an array initializer otherwise.
pub fn update_annotation_argument_values(
    builder: &mut FixBuilder,
    tree: &Tree,
    annotation: NodeId,
    name: &str,
    values: &[String],
) {
    let NodeKind::Annotation {
        name: annotation_name,
        args,
    } = tree.kind(annotation)
    else {
        return;
    };
    let rendered = match values {
        [single] => single.clone(),
        _ => format!("{{{}}}", values.join(", ")),
    };
    if let Some(value) = annotation_argument(tree, annotation, name) {
        builder.replace_node(tree, value, rendered);
        return;
    }
    let named = format!("{name} = {rendered}");
    match args.as_slice() {
        [] => {
            let argument = if name == "value" { rendered } else { named };
            builder.replace_node(tree, annotation, format!("@{annotation_name}({argument})"));
        }
        [only] if !matches!(tree.kind(*only), NodeKind::Assign { .. }) => {
            builder
                .prefix_node(tree, *only, "value = ")
                .postfix_node(tree, *only, format!(", {named}"));
        }
        [.., last] => {
            builder.postfix_node(tree, *last, format!(", {named}"));
        }
    }
}

/// Deletes a member declaration together with the lines it occupied.
pub fn delete_member(builder: &mut FixBuilder, tree: &Tree, member: NodeId) {
    match tree.span(member) {
        Some(span) => {
            builder.delete(member_deletion_span(tree.source(), span));
        }
        None => {
            builder.mark_unpositioned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::Fix;
    use crate::syntax::parse_compilation_unit;

    fn first(tree: &Tree, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        tree.preorder().into_iter().find(|id| pred(tree.kind(*id))).unwrap()
    }

    #[test]
    fn modifiers_are_swapped_in_canonical_order() {
        let tree = parse_compilation_unit("A.java", "public static class A {}\n").unwrap();
        let class = first(&tree, |k| matches!(k, NodeKind::Class { .. }));
        let mut builder = Fix::builder();
        remove_modifiers(&mut builder, &tree, class, &Modifier::VISIBILITY);
        add_modifier(&mut builder, &tree, class, Modifier::Final);
        let fixed = builder.build().unwrap().apply(&tree).unwrap();
        assert_eq!(fixed, "static final class A {}\n");
    }

    #[test]
    fn final_goes_before_a_later_modifier() {
        let tree = parse_compilation_unit(
            "A.java",
            "class A {\n  @Foo private synchronized void f() {}\n}\n",
        )
        .unwrap();
        let method = first(&tree, |k| matches!(k, NodeKind::Method { .. }));
        let mut builder = Fix::builder();
        add_modifier(&mut builder, &tree, method, Modifier::Final);
        let fixed = builder.build().unwrap().apply(&tree).unwrap();
        assert_eq!(fixed, "class A {\n  @Foo private final synchronized void f() {}\n}\n");
    }

    #[test]
    fn rename_covers_local_invocations() {
        let tree = parse_compilation_unit(
            "A.java",
            "class A {\n  void testFoo() {}\n  void bar() { testFoo(); this.testFoo(); other.testFoo(); }\n}\n",
        )
        .unwrap();
        let method =
            first(&tree, |k| matches!(k, NodeKind::Method { name, .. } if name == "testFoo"));
        let mut builder = Fix::builder();
        rename_method(&mut builder, &tree, method, "foo");
        let fixed = builder.build().unwrap().apply(&tree).unwrap();
        assert_eq!(
            fixed,
            "class A {\n  void foo() {}\n  void bar() { foo(); this.foo(); other.testFoo(); }\n}\n"
        );
    }

    #[test]
    fn annotation_arguments_are_updated_or_added() {
        let tree = parse_compilation_unit(
            "A.java",
            "class A {\n  @MethodSource(\"a\") void a() {}\n  @MethodSource void b() {}\n  @Tag(\"x\") void c() {}\n}\n",
        )
        .unwrap();
        let annotations: Vec<NodeId> = tree
            .preorder()
            .into_iter()
            .filter(|id| matches!(tree.kind(*id), NodeKind::Annotation { .. }))
            .collect();
        let mut builder = Fix::builder();
        update_annotation_argument_values(
            &mut builder,
            &tree,
            annotations[0],
            "value",
            &["\"aTestCases\"".into()],
        );
        update_annotation_argument_values(
            &mut builder,
            &tree,
            annotations[1],
            "value",
            &["\"x\"".into(), "\"y\"".into()],
        );
        update_annotation_argument_values(
            &mut builder,
            &tree,
            annotations[2],
            "other",
            &["1".into()],
        );
        let fixed = builder.build().unwrap().apply(&tree).unwrap();
        assert_eq!(
            fixed,
            "class A {\n  @MethodSource(\"aTestCases\") void a() {}\n  @MethodSource({\"x\", \"y\"}) void b() {}\n  @Tag(value = \"x\", other = 1) void c() {}\n}\n"
        );
    }
}
