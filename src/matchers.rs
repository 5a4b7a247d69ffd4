//! Composable predicates over syntax nodes.
//!
//! A [`Matcher`] answers one question about a node in its [`AnalysisContext`]. Small
//! matchers are combined with [`all_of`], [`any_of`] and [`not`] and lifted over
//! structure with [`annotations`], [`enclosing_class`], [`has_method`] and
//! [`method_has_parameters`]. Method invocation matchers are built fluently:
//!
//! ```rust
//! use rectify::matchers::{instance_method, static_method};
//! let of = static_method().on_class("java.util.stream.Stream").named("of");
//! let count = instance_method()
//!     .on_descendant_of("java.util.stream.Stream")
//!     .named("count");
//! ```
//!
//! ## Core Principles
//! - Matching is side effect free; the same node and context always give the same
//!   answer.
//! - `all_of` stops at the first `false`, `any_of` at the first `true`.
//! - Unknown types never match a type predicate.

use crate::ast::{Modifier, NodeId, NodeKind};
use crate::context::{is_primitive_or_boxed, AnalysisContext, MethodOwner};
use crate::resolve::{find_enclosing, EnclosingKind};

// ============================================================================
// CORE TRAIT
// ============================================================================

pub trait Matcher: Send + Sync {
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(NodeId, &AnalysisContext<'_>) -> bool + Send + Sync,
{
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool {
        self(node, ctx)
    }
}

pub type BoxedMatcher = Box<dyn Matcher>;

/// Boxes a matcher for use in a combinator list.
pub fn boxed(matcher: impl Matcher + 'static) -> BoxedMatcher {
    Box::new(matcher)
}

// ============================================================================
// LOGICAL COMBINATORS
// ============================================================================

pub struct AllOf(Vec<BoxedMatcher>);

impl Matcher for AllOf {
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool {
        self.0.iter().all(|m| m.matches(node, ctx))
    }
}

pub struct AnyOf(Vec<BoxedMatcher>);

impl Matcher for AnyOf {
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool {
        self.0.iter().any(|m| m.matches(node, ctx))
    }
}

pub struct Not(BoxedMatcher);

impl Matcher for Not {
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool {
        !self.0.matches(node, ctx)
    }
}

pub fn all_of(matchers: Vec<BoxedMatcher>) -> AllOf {
    AllOf(matchers)
}

pub fn any_of(matchers: Vec<BoxedMatcher>) -> AnyOf {
    AnyOf(matchers)
}

pub fn not(matcher: impl Matcher + 'static) -> Not {
    Not(Box::new(matcher))
}

// ============================================================================
// STRUCTURAL MATCHERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    AtLeastOne,
    /// Every annotation matches; vacuously true without annotations.
    All,
}

/// Applies `matcher` to the annotations of a declaration.
pub fn annotations(match_type: MatchType, matcher: impl Matcher + 'static) -> impl Matcher {
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        let tree = ctx.tree();
        let mut annotations = tree.annotations_of(node).iter();
        match match_type {
            MatchType::AtLeastOne => annotations.any(|a| matcher.matches(*a, &ctx.at(*a))),
            MatchType::All => annotations.all(|a| matcher.matches(*a, &ctx.at(*a))),
        }
    }
}

/// The type a node denotes: the annotation type, the declared type of a variable,
/// the named type of a type reference or the static type of an expression.
pub fn type_of_node(node: NodeId, ctx: &AnalysisContext<'_>) -> Option<String> {
    match ctx.tree().kind(node) {
        NodeKind::Annotation { name, .. } => Some(ctx.resolve_type_name(name)),
        NodeKind::Variable { .. } => ctx.declared_type(node),
        NodeKind::TypeRef { .. } => ctx.type_ref_name(node),
        NodeKind::Class { .. } => Some(ctx.class_fqn(node)),
        _ => ctx.type_of(node),
    }
}

/// The node's type (see [`type_of_node`]) is exactly `fqn`.
pub fn is_type(fqn: &str) -> impl Matcher {
    let fqn = fqn.to_string();
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        type_of_node(node, ctx).is_some_and(|ty| ty == fqn)
    }
}

/// Same as [`is_type`]; reads better for variables and expressions.
pub fn is_same_type(fqn: &str) -> impl Matcher {
    is_type(fqn)
}

/// The node's type is `fqn` or a subtype of it.
pub fn is_subtype_of(fqn: &str) -> impl Matcher {
    let fqn = fqn.to_string();
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        type_of_node(node, ctx).is_some_and(|ty| ctx.types().is_subtype(&ty, &fqn))
    }
}

/// An annotation whose type is meta-annotated with `fqn`, or a declaration carrying
/// `fqn` directly or through a meta annotation.
pub fn has_meta_annotation(fqn: &str) -> impl Matcher {
    let fqn = fqn.to_string();
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        let tree = ctx.tree();
        let annotation_type = |annotation: NodeId| match tree.kind(annotation) {
            NodeKind::Annotation { name, .. } => Some(ctx.resolve_type_name(name)),
            _ => None,
        };
        match tree.kind(node) {
            NodeKind::Annotation { .. } => annotation_type(node)
                .is_some_and(|ty| ctx.types().has_meta_annotation(&ty, &fqn)),
            _ => tree.annotations_of(node).iter().any(|a| {
                annotation_type(*a)
                    .is_some_and(|ty| ty == fqn || ctx.types().has_meta_annotation(&ty, &fqn))
            }),
        }
    }
}

pub fn has_modifier(modifier: Modifier) -> impl Matcher {
    move |node: NodeId, ctx: &AnalysisContext<'_>| ctx.tree().has_modifier(node, modifier)
}

/// Applies `matcher` to the nearest class enclosing the node.
pub fn enclosing_class(matcher: impl Matcher + 'static) -> impl Matcher {
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        find_enclosing(ctx.tree(), node, EnclosingKind::Class)
            .is_some_and(|class| matcher.matches(class, &ctx.at(class)))
    }
}

/// A class declaring at least one method that satisfies `matcher`.
pub fn has_method(matcher: impl Matcher + 'static) -> impl Matcher {
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        let tree = ctx.tree();
        tree.members(node).iter().any(|member| {
            matches!(tree.kind(*member), NodeKind::Method { .. })
                && matcher.matches(*member, &ctx.at(*member))
        })
    }
}

/// A method with exactly as many parameters as matchers, each matching in order.
pub fn method_has_parameters(matchers: Vec<BoxedMatcher>) -> impl Matcher {
    move |node: NodeId, ctx: &AnalysisContext<'_>| {
        let NodeKind::Method { params, .. } = ctx.tree().kind(node) else {
            return false;
        };
        params.len() == matchers.len()
            && params
                .iter()
                .zip(&matchers)
                .all(|(param, matcher)| matcher.matches(*param, &ctx.at(*param)))
    }
}

pub fn is_primitive_or_boxed_primitive_type() -> impl Matcher {
    |node: NodeId, ctx: &AnalysisContext<'_>| {
        type_of_node(node, ctx).is_some_and(|ty| is_primitive_or_boxed(&ty))
    }
}

pub fn is_array_type() -> impl Matcher {
    |node: NodeId, ctx: &AnalysisContext<'_>| {
        type_of_node(node, ctx).is_some_and(|ty| ty.ends_with("[]"))
    }
}

pub fn is_enum_type() -> impl Matcher {
    |node: NodeId, ctx: &AnalysisContext<'_>| {
        type_of_node(node, ctx).is_some_and(|ty| ctx.is_enum(&ty))
    }
}

// ============================================================================
// METHOD INVOCATION MATCHERS
// ============================================================================

#[derive(Debug, Clone)]
enum Receiver {
    StaticOn(String),
    InstanceOfDescendant(String),
    AnyStatic,
    AnyInstance,
}

/// A method invocation matcher under construction.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    receiver: Receiver,
    names: Vec<String>,
}

/// Static methods, optionally narrowed with [`MethodMatcher::on_class`].
pub fn static_method() -> MethodMatcher {
    MethodMatcher {
        receiver: Receiver::AnyStatic,
        names: Vec::new(),
    }
}

/// Instance methods, optionally narrowed with [`MethodMatcher::on_descendant_of`].
pub fn instance_method() -> MethodMatcher {
    MethodMatcher {
        receiver: Receiver::AnyInstance,
        names: Vec::new(),
    }
}

impl MethodMatcher {
    pub fn on_class(mut self, fqn: &str) -> Self {
        self.receiver = Receiver::StaticOn(fqn.to_string());
        self
    }

    pub fn on_descendant_of(mut self, fqn: &str) -> Self {
        self.receiver = Receiver::InstanceOfDescendant(fqn.to_string());
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.names = vec![name.to_string()];
        self
    }

    pub fn named_any_of(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, node: NodeId, ctx: &AnalysisContext<'_>) -> bool {
        let NodeKind::MethodCall { name, .. } = ctx.tree().kind(node) else {
            return false;
        };
        if !self.names.is_empty() && !self.names.contains(name) {
            return false;
        }
        match (&self.receiver, ctx.method_owner(node)) {
            (Receiver::AnyStatic, Some(MethodOwner::Static(_))) => true,
            (Receiver::StaticOn(fqn), Some(MethodOwner::Static(owner))) => owner == *fqn,
            (Receiver::AnyInstance, Some(MethodOwner::Instance(_))) => true,
            (Receiver::InstanceOfDescendant(fqn), Some(MethodOwner::Instance(ty))) => {
                ctx.types().is_subtype(&ty, fqn)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Flags, LanguageLevel};
    use crate::context::TypeTable;
    use crate::syntax::parse_compilation_unit;

    const SOURCE: &str = "import static java.util.stream.Stream.of;\nimport java.util.stream.Stream;\nimport org.junit.jupiter.params.ParameterizedTest;\nclass A {\n  @ParameterizedTest\n  void test(int value, String name) {\n    Stream.of(1).count();\n    of(2);\n  }\n}\n";

    fn calls(tree: &crate::ast::Tree, name: &str) -> Vec<NodeId> {
        tree.preorder()
            .into_iter()
            .filter(|id| {
                matches!(tree.kind(*id), NodeKind::MethodCall { name: n, .. } if n == name)
            })
            .collect()
    }

    #[test]
    fn method_matchers_resolve_receivers() {
        let tree = parse_compilation_unit("A.java", SOURCE).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let stream_of = static_method().on_class("java.util.stream.Stream").named("of");
        let of_calls = calls(&tree, "of");
        assert_eq!(of_calls.len(), 2);
        assert!(of_calls.iter().all(|call| stream_of.matches(*call, &ctx.at(*call))));

        let count = calls(&tree, "count")[0];
        assert!(instance_method()
            .on_descendant_of("java.util.stream.BaseStream")
            .named("count")
            .matches(count, &ctx.at(count)));
        assert!(!static_method().matches(count, &ctx.at(count)));
    }

    #[test]
    fn enum_types_come_from_the_table_or_the_file() {
        let source = "import java.math.RoundingMode;\nclass A {\n  enum Color { RED }\n  void m() { f(RoundingMode.UP, Color.RED, \"s\"); }\n}\n";
        let tree = parse_compilation_unit("A.java", source).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let NodeKind::MethodCall { args, .. } = tree.kind(calls(&tree, "f")[0]) else {
            unreachable!()
        };
        let enums: Vec<bool> = args
            .iter()
            .map(|arg| is_enum_type().matches(*arg, &ctx.at(*arg)))
            .collect();
        assert_eq!(enums, [true, true, false]);
    }

    #[test]
    fn declaration_matchers_compose() {
        let tree = parse_compilation_unit("A.java", SOURCE).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let method = tree
            .preorder()
            .into_iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::Method { .. }))
            .unwrap();
        let test_method = annotations(
            MatchType::AtLeastOne,
            any_of(vec![
                boxed(is_type("org.junit.jupiter.api.Test")),
                boxed(has_meta_annotation("org.junit.jupiter.api.TestTemplate")),
            ]),
        );
        assert!(test_method.matches(method, &ctx.at(method)));

        let params = method_has_parameters(vec![
            boxed(is_primitive_or_boxed_primitive_type()),
            boxed(is_same_type("java.lang.String")),
        ]);
        assert!(params.matches(method, &ctx.at(method)));
        assert!(!method_has_parameters(vec![boxed(is_primitive_or_boxed_primitive_type())])
            .matches(method, &ctx.at(method)));
        assert!(enclosing_class(has_method(not(has_modifier(Modifier::Static))))
            .matches(method, &ctx.at(method)));
    }
}
