//! Printing an after pattern with the values bound at a match site.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{NodeId, NodeKind, Tree};
use crate::context::{qualified_name, AnalysisContext};
use crate::fix::refactor::source_or_pretty;
use crate::fix::Fix;
use crate::refaster::unify::Bindings;
use crate::refaster::{ImportPolicy, TemplateRule};

const PRIMARY: u8 = 16;
const PREFIX: u8 = 14;

/// The fix replacing `node` by the rule's after pattern, or `None` when the pattern
/// cannot be printed for this match.
pub(crate) fn rewrite(
    rule: &TemplateRule,
    node: NodeId,
    bindings: &Bindings,
    ctx: &AnalysisContext<'_>,
) -> Option<Fix> {
    let tree = ctx.tree();
    let required = tree
        .parent(node)
        .map_or(0, |parent| required_precedence(tree, parent, node));

    let mut printer = Printer {
        rule,
        bindings,
        ctx,
        lambda_scope: Vec::new(),
        imports: BTreeSet::new(),
        static_imports: BTreeSet::new(),
    };
    let text = printer.print(rule.after.root(), required)?;

    let mut fix = Fix::builder();
    fix.replace_node(tree, node, text);
    for import in &printer.imports {
        fix.add_import(import.clone());
    }
    for import in &printer.static_imports {
        fix.add_static_import(import.clone());
    }
    match fix.build() {
        Ok(fix) if !fix.is_empty() => Some(fix),
        Ok(_) => None,
        Err(error) => {
            tracing::debug!(rule = %rule.name, %error, "dropping conflicting template rewrite");
            None
        }
    }
}

/// How tightly an expression of this kind binds.
pub(crate) fn precedence(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::Lambda { .. } => 0,
        NodeKind::Assign { .. } => 1,
        NodeKind::Conditional { .. } => 2,
        NodeKind::Binary { op, .. } => op.precedence(),
        NodeKind::Unary { .. } | NodeKind::Cast { .. } => PREFIX,
        _ => PRIMARY,
    }
}

/// The precedence an expression needs to appear unparenthesised as `child` of
/// `parent`.
pub(crate) fn required_precedence(tree: &Tree, parent: NodeId, child: NodeId) -> u8 {
    match tree.kind(parent) {
        NodeKind::Unary { .. } | NodeKind::Cast { .. } => PREFIX,
        NodeKind::Binary { op, lhs, .. } if *lhs == child => op.precedence(),
        NodeKind::Binary { op, .. } => op.precedence() + 1,
        NodeKind::Conditional { cond, .. } if *cond == child => 3,
        NodeKind::Conditional { else_expr, .. } if *else_expr == child => 2,
        NodeKind::MethodCall {
            target: Some(target),
            ..
        } if *target == child => PRIMARY,
        NodeKind::FieldAccess { target, .. }
        | NodeKind::MethodRef { target, .. }
        | NodeKind::Index { target, .. }
            if *target == child =>
        {
            PRIMARY
        }
        _ => 0,
    }
}

fn parenthesize(text: String, precedence: u8, required: u8) -> String {
    if precedence < required {
        format!("({text})")
    } else {
        text
    }
}

struct Printer<'r, 'a> {
    rule: &'r TemplateRule,
    bindings: &'r Bindings,
    ctx: &'r AnalysisContext<'a>,
    /// Lambda parameters of the after pattern currently in scope.
    lambda_scope: Vec<String>,
    imports: BTreeSet<String>,
    static_imports: BTreeSet<String>,
}

impl Printer<'_, '_> {
    fn pattern(&self) -> &Tree {
        &self.rule.after
    }

    fn print(&mut self, p: NodeId, required: u8) -> Option<String> {
        let target = self.ctx.tree();
        let kind = self.pattern().kind(p).clone();
        let text = match &kind {
            NodeKind::Ident { name } if self.lambda_scope.contains(name) => {
                self.lambda_param_name(name)
            }
            NodeKind::Ident { name } if self.rule.placeholder(name).is_some() => {
                let bound = *self.bindings.placeholders.get(name)?;
                return Some(parenthesize(
                    source_or_pretty(target, bound),
                    precedence(target.kind(bound)),
                    required,
                ));
            }
            NodeKind::Ident { name } => match self.rule.scope.resolve_type(name) {
                Some(fqn) => self.type_name(&fqn),
                None => name.clone(),
            },
            NodeKind::FieldAccess { target: owner, name } => {
                let package_qualified = qualified_name(self.pattern(), p)
                    .filter(|q| q.starts_with(|c: char| c.is_lowercase()))
                    .and_then(|q| self.rule.scope.resolve_type(&q));
                match package_qualified {
                    Some(fqn) => self.type_name(&fqn),
                    None => format!("{}.{name}", self.print(*owner, PRIMARY)?),
                }
            }
            NodeKind::MethodCall {
                target: None, name, args, ..
            } if self.rule.function(name).is_some() => {
                return self.print_function(name, args, required);
            }
            NodeKind::MethodCall {
                target: receiver,
                name,
                args,
                ..
            } => {
                let prefix = self.call_prefix(receiver.as_ref().copied(), name)?;
                let args = self.print_list(args)?;
                format!("{prefix}{name}({args})")
            }
            NodeKind::MethodRef { target: owner, name } => {
                format!("{}::{name}", self.print(*owner, PRIMARY)?)
            }
            NodeKind::Lambda { params, body } => {
                if matches!(self.pattern().kind(*body), NodeKind::Block { .. }) {
                    return None;
                }
                let depth = self.lambda_scope.len();
                self.lambda_scope.extend(params.iter().map(|param| param.name.clone()));
                let names: Vec<String> = params
                    .iter()
                    .map(|param| self.lambda_param_name(&param.name))
                    .collect();
                let body = self.print(*body, 0);
                self.lambda_scope.truncate(depth);
                match names.as_slice() {
                    [single] => format!("{single} -> {}", body?),
                    _ => format!("({}) -> {}", names.join(", "), body?),
                }
            }
            NodeKind::Literal(_) => source_or_pretty(self.pattern(), p),
            NodeKind::Unary { op, operand } => {
                format!("{}{}", op.as_str(), self.print(*operand, PREFIX)?)
            }
            NodeKind::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.print(*lhs, op.precedence())?,
                op.as_str(),
                self.print(*rhs, op.precedence() + 1)?
            ),
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                self.print(*cond, 3)?,
                self.print(*then_expr, 0)?,
                self.print(*else_expr, 2)?
            ),
            NodeKind::Parens { expr } => format!("({})", self.print(*expr, 0)?),
            NodeKind::Cast { ty, expr } => format!(
                "({}) {}",
                self.type_text(*ty)?,
                self.print(*expr, PREFIX)?
            ),
            NodeKind::ClassLiteral { ty } => format!("{}.class", self.type_text(*ty)?),
            NodeKind::New { ty, args } => {
                format!("new {}({})", self.type_text(*ty)?, self.print_list(args)?)
            }
            NodeKind::Index { target: array, index } => {
                format!("{}[{}]", self.print(*array, PRIMARY)?, self.print(*index, 0)?)
            }
            NodeKind::ArrayInit { elements } => format!("{{{}}}", self.print_list(elements)?),
            NodeKind::This => "this".to_string(),
            _ => return None,
        };
        Some(parenthesize(text, precedence(&kind), required))
    }

    fn print_list(&mut self, nodes: &[NodeId]) -> Option<String> {
        let printed = nodes
            .iter()
            .map(|node| self.print(*node, 0))
            .collect::<Option<Vec<_>>>()?;
        Some(printed.join(", "))
    }

    fn lambda_param_name(&self, name: &str) -> String {
        self.bindings
            .lambda_params
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// A placeholder function application: the bound body with its parameters
    /// replaced by the printed arguments.
    fn print_function(&mut self, name: &str, args: &[NodeId], required: u8) -> Option<String> {
        let bound = self.bindings.functions.get(name)?.clone();
        let mut substitutions = HashMap::new();
        for (param, arg) in bound.params.iter().zip(args) {
            let printed = self.print(*arg, PRIMARY)?;
            if printed != *param {
                substitutions.insert(param.clone(), printed);
            }
        }
        let target = self.ctx.tree();
        let text = substitute(target, bound.body, &substitutions)?;
        Some(parenthesize(text, precedence(target.kind(bound.body)), required))
    }

    /// The text preceding a method name: the printed receiver, the owner of a
    /// static method, or nothing for statically imported members.
    fn call_prefix(&mut self, receiver: Option<NodeId>, name: &str) -> Option<String> {
        let static_owner = match receiver {
            Some(receiver) => {
                let qualified = qualified_name(self.pattern(), receiver)
                    .filter(|q| self.rule.placeholder(q.split('.').next().unwrap_or(q)).is_none())
                    .filter(|q| {
                        !self
                            .lambda_scope
                            .iter()
                            .any(|param| q.split('.').next() == Some(param))
                    });
                qualified.and_then(|q| self.rule.scope.resolve_type(&q))
            }
            None => self.rule.scope.resolve_static(name),
        };
        match (static_owner, receiver) {
            (Some(owner), _) => Some(self.static_member_prefix(&owner, name)),
            (None, Some(receiver)) => Some(format!("{}.", self.print(receiver, PRIMARY)?)),
            (None, None) => Some(String::new()),
        }
    }

    fn static_member_prefix(&mut self, owner: &str, member: &str) -> String {
        match self.rule.policy {
            ImportPolicy::StaticImportAlways => {
                self.static_imports.insert(format!("{owner}.{member}"));
                String::new()
            }
            ImportPolicy::ImportTopLevel
                if self.ctx.resolve_static_import(member).as_deref() == Some(owner) =>
            {
                String::new()
            }
            ImportPolicy::ImportTopLevel => format!("{}.", self.type_name(owner)),
        }
    }

    /// How to refer to type `fqn` in the analysed file: its simple name (imported as
    /// needed) unless that name already denotes another type there.
    fn type_name(&mut self, fqn: &str) -> String {
        let simple = fqn.rsplit('.').next().unwrap_or(fqn);
        if self.ctx.resolve_type_name(simple) == fqn || !self.simple_name_taken(simple) {
            self.imports.insert(fqn.to_string());
            simple.to_string()
        } else {
            fqn.to_string()
        }
    }

    fn simple_name_taken(&self, simple: &str) -> bool {
        let tree = self.ctx.tree();
        tree.preorder().into_iter().any(|id| match tree.kind(id) {
            NodeKind::Import {
                path,
                is_static: false,
                wildcard: false,
            } => path.rsplit('.').next() == Some(simple),
            NodeKind::Class { name, .. } => name == simple,
            _ => false,
        })
    }

    fn type_text(&mut self, ty: NodeId) -> Option<String> {
        let NodeKind::TypeRef { name, dims, .. } = self.pattern().kind(ty).clone() else {
            return None;
        };
        let base = match self.rule.scope.resolve_type(&name) {
            Some(fqn) => self.type_name(&fqn),
            None => name,
        };
        Some(format!("{base}{}", "[]".repeat(dims)))
    }
}

/// The source of `node` with the given identifiers replaced.
fn substitute(
    tree: &Tree,
    node: NodeId,
    substitutions: &HashMap<String, String>,
) -> Option<String> {
    if substitutions.is_empty() {
        return Some(source_or_pretty(tree, node));
    }
    let span = tree.span(node)?;
    let mut replacements: Vec<(usize, usize, &str)> = std::iter::once(node)
        .chain(tree.descendants(node))
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Ident { name } => {
                let replacement = substitutions.get(name)?;
                let span = tree.span(id)?;
                Some((span.start, span.end, replacement.as_str()))
            }
            _ => None,
        })
        .collect();
    replacements.sort_by_key(|(start, _, _)| *start);

    let source = tree.source();
    let mut out = String::new();
    let mut cursor = span.start;
    for (start, end, replacement) in replacements {
        out.push_str(&source[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&source[cursor..span.end]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refaster::testing::rewrite as run;
    use crate::refaster::TemplateRule;

    #[test]
    fn bound_expressions_are_parenthesised_where_needed() {
        let rule = TemplateRule::builder("NotEquals")
            .placeholder("a")
            .placeholder("b")
            .before("!(a == b)")
            .after("a != b")
            .build()
            .unwrap();
        let source = "class A {\n  boolean m(int x, int y, boolean c) {\n    return !(x + 1 == y) && c;\n  }\n\n  boolean n(boolean p, boolean q) {\n    return !((p ? q : p) == q);\n  }\n}\n";
        let (_, output) = run(&rule, source);
        assert!(output.contains("return x + 1 != y && c;"), "{output}");
        assert!(output.contains("return (p ? q : p) != q;"), "{output}");
    }

    #[test]
    fn replacements_are_parenthesised_in_their_context() {
        let rule = TemplateRule::builder("Unwrap")
            .placeholder("a")
            .placeholder("b")
            .before("java.util.Objects.equals(a, b)")
            .after("a == b")
            .build()
            .unwrap();
        let source = "import java.util.Objects;\n\nclass A {\n  boolean m(int x, int y) {\n    return !Objects.equals(x, y);\n  }\n}\n";
        let (_, output) = run(&rule, source);
        assert!(output.contains("return !(x == y);"), "{output}");
    }

    #[test]
    fn static_members_follow_the_import_policy() {
        let qualified = TemplateRule::builder("Never")
            .import("static org.mockito.Mockito.times")
            .import("static org.mockito.Mockito.never")
            .before("times(0)")
            .after("never()")
            .build()
            .unwrap();
        let source = "import static org.mockito.Mockito.times;\n\nclass A {\n  Object m() {\n    return times(0);\n  }\n}\n";
        let (_, output) = run(&qualified, source);
        assert_eq!(
            output,
            "import static org.mockito.Mockito.times;\n\nimport org.mockito.Mockito;\n\nclass A {\n  Object m() {\n    return Mockito.never();\n  }\n}\n"
        );

        let imported = TemplateRule::builder("Never")
            .import("static org.mockito.Mockito.times")
            .import("static org.mockito.Mockito.never")
            .before("times(0)")
            .after("never()")
            .policy(ImportPolicy::StaticImportAlways)
            .build()
            .unwrap();
        let (_, output) = run(&imported, source);
        assert_eq!(
            output,
            "import static org.mockito.Mockito.never;\nimport static org.mockito.Mockito.times;\n\nclass A {\n  Object m() {\n    return never();\n  }\n}\n"
        );
    }

    #[test]
    fn substitution_replaces_identifiers_only() {
        let tree = crate::syntax::parse_expression("E", "x.y(x, \"x\")").unwrap();
        let substitutions = HashMap::from([("x".to_string(), "z".to_string())]);
        assert_eq!(
            substitute(&tree, tree.root(), &substitutions).as_deref(),
            Some("z.y(z, \"x\")")
        );
    }
}
