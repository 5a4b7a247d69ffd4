//! Structural unification of a before pattern with an expression.
//!
//! Bindings are persistent maps so every attempt extends its own snapshot; a failed
//! branch leaves nothing behind.

use std::mem::discriminant;

use im::HashMap;

use crate::ast::{NodeId, NodeKind, Tree};
use crate::context::{qualified_name, AnalysisContext, MethodOwner};
use crate::refaster::TemplateRule;

/// What a placeholder function was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FunctionBinding {
    /// The bound sub-expression of the analysed file.
    pub body: NodeId,
    /// The lambda parameter names the body is written in terms of.
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    pub placeholders: HashMap<String, NodeId>,
    pub functions: HashMap<String, FunctionBinding>,
    /// Pattern lambda parameter name to the name used in the analysed file.
    pub lambda_params: HashMap<String, String>,
}

impl Bindings {
    fn bind_placeholder(&self, name: &str, node: NodeId) -> Self {
        Self {
            placeholders: self.placeholders.update(name.to_string(), node),
            ..self.clone()
        }
    }

    fn bind_function(&self, name: &str, binding: FunctionBinding) -> Self {
        Self {
            functions: self.functions.update(name.to_string(), binding),
            ..self.clone()
        }
    }

    fn bind_lambda_param(&self, pattern_name: &str, name: &str) -> Self {
        Self {
            lambda_params: self
                .lambda_params
                .update(pattern_name.to_string(), name.to_string()),
            ..self.clone()
        }
    }

    fn is_pattern_lambda_param(&self, name: &str) -> bool {
        self.lambda_params.contains_key(name)
    }

    /// Whether `node` mentions a lambda parameter of the match site other than
    /// `allowed`.
    fn captures_lambda_param(&self, tree: &Tree, node: NodeId, allowed: &[String]) -> bool {
        std::iter::once(node).chain(tree.descendants(node)).any(|id| {
            matches!(tree.kind(id), NodeKind::Ident { name }
                if !allowed.contains(name)
                    && self.lambda_params.values().any(|bound| bound == name))
        })
    }
}

pub(crate) struct Unifier<'r, 'a> {
    rule: &'r TemplateRule,
    pattern: &'r Tree,
    ctx: &'r AnalysisContext<'a>,
}

impl<'r, 'a> Unifier<'r, 'a> {
    pub fn new(rule: &'r TemplateRule, pattern: &'r Tree, ctx: &'r AnalysisContext<'a>) -> Self {
        Self { rule, pattern, ctx }
    }

    fn target(&self) -> &'a Tree {
        self.ctx.tree()
    }

    /// Unifies pattern node `p` with node `t` of the analysed file.
    pub fn unify(&self, p: NodeId, t: NodeId, bindings: Bindings) -> Option<Bindings> {
        let pattern = self.pattern;
        let tree = self.target();
        let p = pattern.skip_parens(p);
        let t = tree.skip_parens(t);

        match (pattern.kind(p), tree.kind(t)) {
            (NodeKind::Ident { name }, _) if bindings.is_pattern_lambda_param(name) => {
                let expected = bindings.lambda_params.get(name)?;
                matches!(tree.kind(t), NodeKind::Ident { name } if name == expected)
                    .then_some(bindings)
            }
            (NodeKind::Ident { name }, _) if self.rule.placeholder(name).is_some() => {
                self.unify_placeholder(name, t, bindings)
            }
            (
                NodeKind::MethodCall {
                    target: None,
                    name,
                    args,
                    ..
                },
                _,
            ) if self.rule.function(name).is_some() => {
                self.unify_function(name, args, t, bindings)
            }
            (NodeKind::Ident { .. } | NodeKind::FieldAccess { .. }, _)
                if self.pattern_type(p).is_some() =>
            {
                let expected = self.pattern_type(p)?;
                (self.ctx.at(t).expression_as_type(t)? == expected).then_some(bindings)
            }
            (NodeKind::Ident { name: pn }, NodeKind::Ident { name: tn }) => {
                (pn == tn).then_some(bindings)
            }
            (
                NodeKind::FieldAccess { target: pt, name: pn },
                NodeKind::FieldAccess { target: tt, name: tn },
            ) if pn == tn => self.unify(*pt, *tt, bindings),
            (NodeKind::MethodCall { .. }, NodeKind::MethodCall { .. }) => {
                self.unify_call(p, t, bindings)
            }
            (
                NodeKind::MethodRef { target: pt, name: pn },
                NodeKind::MethodRef { target: tt, name: tn },
            ) if pn == tn => self.unify(*pt, *tt, bindings),
            (
                NodeKind::Lambda {
                    params: pp,
                    body: pb,
                },
                NodeKind::Lambda {
                    params: tp,
                    body: tb,
                },
            ) if pp.len() == tp.len() => {
                let bindings = pp
                    .iter()
                    .zip(tp)
                    .fold(bindings, |b, (pp, tp)| b.bind_lambda_param(&pp.name, &tp.name));
                self.unify(*pb, *tb, bindings)
            }
            (NodeKind::Literal(pl), NodeKind::Literal(tl)) => (pl == tl).then_some(bindings),
            (
                NodeKind::Unary {
                    op: po,
                    operand: pe,
                },
                NodeKind::Unary {
                    op: to,
                    operand: te,
                },
            ) if po == to => self.unify(*pe, *te, bindings),
            (
                NodeKind::Binary {
                    op: po,
                    lhs: pl,
                    rhs: pr,
                },
                NodeKind::Binary {
                    op: to,
                    lhs: tl,
                    rhs: tr,
                },
            ) if po == to => {
                let bindings = self.unify(*pl, *tl, bindings)?;
                self.unify(*pr, *tr, bindings)
            }
            (
                NodeKind::Conditional {
                    cond: pc,
                    then_expr: pt,
                    else_expr: pe,
                },
                NodeKind::Conditional {
                    cond: tc,
                    then_expr: tt,
                    else_expr: te,
                },
            ) => {
                let bindings = self.unify(*pc, *tc, bindings)?;
                let bindings = self.unify(*pt, *tt, bindings)?;
                self.unify(*pe, *te, bindings)
            }
            (NodeKind::Cast { ty: pt, expr: pe }, NodeKind::Cast { ty: tt, expr: te }) => {
                self.same_type_ref(*pt, *tt)?;
                self.unify(*pe, *te, bindings)
            }
            (NodeKind::ClassLiteral { ty: pt }, NodeKind::ClassLiteral { ty: tt }) => {
                self.same_type_ref(*pt, *tt)?;
                Some(bindings)
            }
            (NodeKind::New { ty: pt, args: pa }, NodeKind::New { ty: tt, args: ta })
                if pa.len() == ta.len() =>
            {
                self.same_type_ref(*pt, *tt)?;
                self.unify_all(pa, ta, bindings)
            }
            (
                NodeKind::Index {
                    target: pt,
                    index: pi,
                },
                NodeKind::Index {
                    target: tt,
                    index: ti,
                },
            ) => {
                let bindings = self.unify(*pt, *tt, bindings)?;
                self.unify(*pi, *ti, bindings)
            }
            (NodeKind::This, NodeKind::This) => Some(bindings),
            _ => None,
        }
    }

    fn unify_all(
        &self,
        patterns: &[NodeId],
        targets: &[NodeId],
        bindings: Bindings,
    ) -> Option<Bindings> {
        if patterns.len() != targets.len() {
            return None;
        }
        patterns
            .iter()
            .zip(targets)
            .try_fold(bindings, |b, (p, t)| self.unify(*p, *t, b))
    }

    fn unify_placeholder(&self, name: &str, t: NodeId, bindings: Bindings) -> Option<Bindings> {
        let tree = self.target();
        if tree.kind(t).category() != crate::ast::NodeCategory::Expression
            || bindings.captures_lambda_param(tree, t, &[])
        {
            return None;
        }
        if let Some(bound) = bindings.placeholders.get(name) {
            return structurally_equal(tree, *bound, t, &HashMap::new()).then_some(bindings);
        }
        if !self.rule.accepts(name, t, self.ctx) {
            return None;
        }
        Some(bindings.bind_placeholder(name, t))
    }

    fn unify_function(
        &self,
        name: &str,
        args: &[NodeId],
        t: NodeId,
        bindings: Bindings,
    ) -> Option<Bindings> {
        let tree = self.target();
        let function = self.rule.function(name)?;
        let params = args
            .iter()
            .map(|arg| match self.pattern.kind(*arg) {
                NodeKind::Ident { name } => bindings.lambda_params.get(name).cloned(),
                _ => None,
            })
            .collect::<Option<Vec<String>>>()?;

        if tree.kind(t).category() != crate::ast::NodeCategory::Expression
            || bindings.captures_lambda_param(tree, t, &params)
        {
            return None;
        }
        let is_identity = matches!(tree.kind(t), NodeKind::Ident { name } if params.contains(name));
        if is_identity && !function.allows_identity {
            return None;
        }

        if let Some(bound) = bindings.functions.get(name) {
            let renames: HashMap<String, String> = bound
                .params
                .iter()
                .cloned()
                .zip(params.iter().cloned())
                .collect();
            return structurally_equal(tree, bound.body, t, &renames).then_some(bindings);
        }
        Some(bindings.bind_function(name, FunctionBinding { body: t, params }))
    }

    fn unify_call(&self, p: NodeId, t: NodeId, bindings: Bindings) -> Option<Bindings> {
        let (
            NodeKind::MethodCall {
                target: pt,
                name: pn,
                args: pa,
                ..
            },
            NodeKind::MethodCall {
                target: tt,
                name: tn,
                args: ta,
                ..
            },
        ) = (self.pattern.kind(p), self.target().kind(t))
        else {
            return None;
        };
        if pn != tn || pa.len() != ta.len() {
            return None;
        }

        // Static calls compare owners, however the call site spells them.
        let static_owner = match pt {
            Some(pt) => self.pattern_type(*pt),
            None => self.rule.scope.resolve_static(pn),
        };
        let bindings = match (static_owner, pt, tt) {
            (Some(owner), _, _) => match self.ctx.at(t).method_owner(t)? {
                MethodOwner::Static(actual) if actual == owner => bindings,
                _ => return None,
            },
            (None, Some(pt), Some(tt)) => self.unify(*pt, *tt, bindings)?,
            (None, None, None) => bindings,
            _ => return None,
        };
        self.unify_all(pa, ta, bindings)
    }

    /// The type a pattern expression names, when it is a type name known to the rule.
    fn pattern_type(&self, p: NodeId) -> Option<String> {
        let name = qualified_name(self.pattern, p)?;
        if self.rule.placeholder(name.split('.').next()?).is_some() {
            return None;
        }
        self.rule.scope.resolve_type(&name)
    }

    fn same_type_ref(&self, p: NodeId, t: NodeId) -> Option<()> {
        let (NodeKind::TypeRef { name: pn, dims: pd, .. }, NodeKind::TypeRef { dims: td, .. }) =
            (self.pattern.kind(p), self.target().kind(t))
        else {
            return None;
        };
        let expected = self
            .rule
            .scope
            .resolve_type(pn)
            .unwrap_or_else(|| pn.clone());
        let actual = self.ctx.at(t).type_ref_name(t)?;
        (pd == td && actual.trim_end_matches("[]") == expected).then_some(())
    }
}

/// Whether two expressions of one tree are the same up to parentheses, spans and
/// the given renaming of identifiers in `a` to identifiers in `b`.
pub(crate) fn structurally_equal(
    tree: &Tree,
    a: NodeId,
    b: NodeId,
    renames: &HashMap<String, String>,
) -> bool {
    let a = tree.skip_parens(a);
    let b = tree.skip_parens(b);
    let (ka, kb) = (tree.kind(a), tree.kind(b));
    if discriminant(ka) != discriminant(kb) {
        return false;
    }
    let renames = match (ka, kb) {
        (NodeKind::Ident { name: na }, NodeKind::Ident { name: nb }) => {
            return renames.get(na).unwrap_or(na) == nb;
        }
        (NodeKind::Lambda { params: pa, .. }, NodeKind::Lambda { params: pb, .. }) => {
            if pa.len() != pb.len() {
                return false;
            }
            pa.iter().zip(pb).fold(renames.clone(), |r, (x, y)| {
                r.update(x.name.clone(), y.name.clone())
            })
        }
        _ if same_payload(ka, kb) => renames.clone(),
        _ => return false,
    };
    let (ca, cb) = (tree.children(a), tree.children(b));
    ca.len() == cb.len()
        && ca
            .iter()
            .zip(&cb)
            .all(|(x, y)| structurally_equal(tree, *x, *y, &renames))
}

/// Compares the non-child fields of two nodes of the same kind.
fn same_payload(a: &NodeKind, b: &NodeKind) -> bool {
    match (a, b) {
        (NodeKind::Literal(x), NodeKind::Literal(y)) => x == y,
        (NodeKind::FieldAccess { name: x, .. }, NodeKind::FieldAccess { name: y, .. })
        | (NodeKind::MethodRef { name: x, .. }, NodeKind::MethodRef { name: y, .. }) => x == y,
        (
            NodeKind::MethodCall {
                target: tx,
                name: x,
                ..
            },
            NodeKind::MethodCall {
                target: ty,
                name: y,
                ..
            },
        ) => x == y && tx.is_some() == ty.is_some(),
        (NodeKind::Unary { op: x, .. }, NodeKind::Unary { op: y, .. }) => x == y,
        (NodeKind::Binary { op: x, .. }, NodeKind::Binary { op: y, .. }) => x == y,
        (
            NodeKind::TypeRef {
                name: x, dims: dx, ..
            },
            NodeKind::TypeRef {
                name: y, dims: dy, ..
            },
        ) => x == y && dx == dy,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_expression;

    fn equal(a: &str, b: &str) -> bool {
        let source = format!("java.util.List.of({a}, {b})");
        let tree = parse_expression("E", &source).unwrap();
        let NodeKind::MethodCall { args, .. } = tree.kind(tree.root()) else {
            panic!("not a call");
        };
        structurally_equal(&tree, args[0], args[1], &HashMap::new())
    }

    #[test]
    fn structural_equality_ignores_parentheses_and_layout() {
        assert!(equal("a.b(1,  c)", "(a).b(1, (c))"));
        assert!(equal("x -> x.y()", "z -> z.y()"));
        assert!(!equal("a.b(1)", "a.b(2)"));
        assert!(!equal("a + b", "a - b"));
        assert!(!equal("a.b()", "b()"));
    }
}
