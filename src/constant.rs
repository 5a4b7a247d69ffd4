//! Compile-time constant evaluation.
//!
//! [`constant_value_of`] folds literals, operators, `static final` fields with
//! constant initializers, class literals and enum constants into a [`ConstantValue`].
//! Arithmetic follows Java semantics: `int` wraps at 32 bits, `long` at 64, `float`
//! is rounded to single precision and integer division by zero is not a constant.

use std::fmt;

use serde::Serialize;

use crate::ast::{BinaryOp, Literal, Modifier, NodeId, NodeKind, UnaryOp};
use crate::context::{AnalysisContext, VariableBinding};

/// Guards against cyclic `static final` initializers.
const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    Char(char),
    String(String),
    Bool(bool),
    /// A class literal, by fully qualified name.
    ClassRef(String),
    EnumConstant { ty: String, name: String },
}

impl fmt::Display for ConstantValue {
    /// Formats the value the way Java string concatenation would.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(v) | ConstantValue::Long(v) => write!(f, "{v}"),
            ConstantValue::Float(v) | ConstantValue::Double(v) => {
                if v.is_finite() && v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else if v.is_nan() {
                    write!(f, "NaN")
                } else if v.is_infinite() {
                    write!(f, "{}Infinity", if *v < 0.0 { "-" } else { "" })
                } else {
                    write!(f, "{v}")
                }
            }
            ConstantValue::Char(c) => write!(f, "{c}"),
            ConstantValue::String(s) => write!(f, "{s}"),
            ConstantValue::Bool(b) => write!(f, "{b}"),
            ConstantValue::ClassRef(ty) => write!(f, "class {ty}"),
            ConstantValue::EnumConstant { name, .. } => write!(f, "{name}"),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// The constant value of `expr`, if it has one.
pub fn constant_value_of(ctx: &AnalysisContext<'_>, expr: NodeId) -> Option<ConstantValue> {
    evaluate(ctx, expr, 0)
}

/// Constant values of all expressions, or `None` if any one is not constant.
pub fn constant_values_of(
    ctx: &AnalysisContext<'_>,
    exprs: &[NodeId],
) -> Option<Vec<ConstantValue>> {
    exprs.iter().map(|e| constant_value_of(ctx, *e)).collect()
}

/// Whether `expr` may appear as an annotation element value: a constant, a class
/// literal, an enum constant, a nested annotation, or an array of those.
pub fn is_annotation_constant(ctx: &AnalysisContext<'_>, expr: NodeId) -> bool {
    let tree = ctx.tree();
    match tree.kind(expr) {
        NodeKind::Annotation { .. } => true,
        NodeKind::ArrayInit { elements } => {
            elements.iter().all(|e| is_annotation_constant(ctx, *e))
        }
        _ => constant_value_of(ctx, expr).is_some(),
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

fn evaluate(ctx: &AnalysisContext<'_>, expr: NodeId, depth: usize) -> Option<ConstantValue> {
    if depth > MAX_DEPTH {
        return None;
    }
    let tree = ctx.tree();
    match tree.kind(expr) {
        NodeKind::Literal(literal) => from_literal(literal),
        NodeKind::ClassLiteral { ty } => ctx.type_ref_name(*ty).map(ConstantValue::ClassRef),
        NodeKind::Parens { expr } => evaluate(ctx, *expr, depth + 1),
        NodeKind::Unary { op, operand } => unary(*op, evaluate(ctx, *operand, depth + 1)?),
        NodeKind::Binary { op, lhs, rhs } => {
            let lhs = evaluate(ctx, *lhs, depth + 1)?;
            let rhs = evaluate(ctx, *rhs, depth + 1)?;
            binary(*op, lhs, rhs)
        }
        NodeKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => match evaluate(ctx, *cond, depth + 1)? {
            ConstantValue::Bool(true) => evaluate(ctx, *then_expr, depth + 1),
            ConstantValue::Bool(false) => evaluate(ctx, *else_expr, depth + 1),
            _ => None,
        },
        NodeKind::Cast { ty, expr } => {
            let target = ctx.type_ref_name(*ty)?;
            cast(&target, evaluate(ctx, *expr, depth + 1)?)
        }
        NodeKind::Ident { name } => match ctx.resolve_variable(expr, name)? {
            VariableBinding::Declared(variable) => constant_field(ctx, variable, depth),
            VariableBinding::LambdaParam => None,
        },
        NodeKind::FieldAccess { target, name } => {
            let owner = ctx.expression_as_type(*target)?;
            if ctx.types().is_enum_constant(&owner, name) {
                return Some(ConstantValue::EnumConstant {
                    ty: owner,
                    name: name.clone(),
                });
            }
            let class = tree
                .preorder()
                .into_iter()
                .find(|id| {
                    matches!(tree.kind(*id), NodeKind::Class { .. }) && ctx.class_fqn(*id) == owner
                })?;
            let member = tree.members(class).iter().copied().find(|m| {
                matches!(
                    tree.kind(*m),
                    NodeKind::Variable { name: n, .. } | NodeKind::EnumConstant { name: n }
                        if n == name
                )
            })?;
            match tree.kind(member) {
                NodeKind::EnumConstant { name } => Some(ConstantValue::EnumConstant {
                    ty: owner,
                    name: name.clone(),
                }),
                _ => constant_field(ctx, member, depth),
            }
        }
        _ => None,
    }
}

/// The value of a `static final` field with a constant initializer.
fn constant_field(
    ctx: &AnalysisContext<'_>,
    variable: NodeId,
    depth: usize,
) -> Option<ConstantValue> {
    let tree = ctx.tree();
    let NodeKind::Variable { init: Some(init), .. } = tree.kind(variable) else {
        return None;
    };
    let is_field = tree
        .parent(variable)
        .is_some_and(|parent| matches!(tree.kind(parent), NodeKind::Class { .. }));
    if !is_field
        || !tree.has_modifier(variable, Modifier::Static)
        || !tree.has_modifier(variable, Modifier::Final)
    {
        return None;
    }
    let value = evaluate(&ctx.at(*init), *init, depth + 1)?;
    cast(&ctx.declared_type(variable)?, value)
}

fn from_literal(literal: &Literal) -> Option<ConstantValue> {
    Some(match literal {
        Literal::Int(v) => ConstantValue::Int(*v),
        Literal::Long(v) => ConstantValue::Long(*v),
        Literal::Float(v) => ConstantValue::Float(*v),
        Literal::Double(v) => ConstantValue::Double(*v),
        Literal::Char(c) => ConstantValue::Char(*c),
        Literal::String(s) => ConstantValue::String(s.clone()),
        Literal::Bool(b) => ConstantValue::Bool(*b),
        Literal::Null => return None,
    })
}

fn wrap_int(v: i64) -> ConstantValue {
    ConstantValue::Int(i64::from(v as i32))
}

fn single(v: f64) -> f64 {
    f64::from(v as f32)
}

/// Numeric operand after unary promotion.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
}

fn as_num(value: &ConstantValue) -> Option<Num> {
    Some(match value {
        ConstantValue::Int(v) => Num::Int(*v),
        ConstantValue::Char(c) => Num::Int(i64::from(u32::from(*c))),
        ConstantValue::Long(v) => Num::Long(*v),
        ConstantValue::Float(v) => Num::Float(*v),
        ConstantValue::Double(v) => Num::Double(*v),
        _ => return None,
    })
}

fn rank(num: Num) -> u8 {
    match num {
        Num::Int(_) => 0,
        Num::Long(_) => 1,
        Num::Float(_) => 2,
        Num::Double(_) => 3,
    }
}

fn as_f64(num: Num) -> f64 {
    match num {
        Num::Int(v) | Num::Long(v) => v as f64,
        Num::Float(v) | Num::Double(v) => v,
    }
}

fn as_i64(num: Num) -> i64 {
    match num {
        Num::Int(v) | Num::Long(v) => v,
        Num::Float(v) | Num::Double(v) => v as i64,
    }
}

fn unary(op: UnaryOp, value: ConstantValue) -> Option<ConstantValue> {
    match (op, value) {
        (UnaryOp::Not, ConstantValue::Bool(b)) => Some(ConstantValue::Bool(!b)),
        (UnaryOp::Not, _) => None,
        (op, value) => {
            let num = as_num(&value)?;
            Some(match (op, num) {
                (UnaryOp::Plus, Num::Int(v)) => wrap_int(v),
                (UnaryOp::Plus, Num::Long(v)) => ConstantValue::Long(v),
                (UnaryOp::Plus, Num::Float(v)) => ConstantValue::Float(v),
                (UnaryOp::Plus, Num::Double(v)) => ConstantValue::Double(v),
                (UnaryOp::Neg, Num::Int(v)) => wrap_int(v.wrapping_neg()),
                (UnaryOp::Neg, Num::Long(v)) => ConstantValue::Long(v.wrapping_neg()),
                (UnaryOp::Neg, Num::Float(v)) => ConstantValue::Float(-v),
                (UnaryOp::Neg, Num::Double(v)) => ConstantValue::Double(-v),
                (UnaryOp::BitNot, Num::Int(v)) => wrap_int(!v),
                (UnaryOp::BitNot, Num::Long(v)) => ConstantValue::Long(!v),
                _ => return None,
            })
        }
    }
}

fn binary(op: BinaryOp, lhs: ConstantValue, rhs: ConstantValue) -> Option<ConstantValue> {
    use ConstantValue as C;

    if op == BinaryOp::Add
        && (matches!(lhs, C::String(_)) || matches!(rhs, C::String(_)))
    {
        if matches!(lhs, C::ClassRef(_) | C::EnumConstant { .. })
            || matches!(rhs, C::ClassRef(_) | C::EnumConstant { .. })
        {
            return None;
        }
        return Some(C::String(format!("{lhs}{rhs}")));
    }
    match (op, &lhs, &rhs) {
        (BinaryOp::And, C::Bool(a), C::Bool(b)) => return Some(C::Bool(*a && *b)),
        (BinaryOp::Or, C::Bool(a), C::Bool(b)) => return Some(C::Bool(*a || *b)),
        (BinaryOp::Eq, C::Bool(a), C::Bool(b)) => return Some(C::Bool(a == b)),
        (BinaryOp::Ne, C::Bool(a), C::Bool(b)) => return Some(C::Bool(a != b)),
        (BinaryOp::Eq, C::String(a), C::String(b)) => return Some(C::Bool(a == b)),
        (BinaryOp::Ne, C::String(a), C::String(b)) => return Some(C::Bool(a != b)),
        _ => {}
    }

    let a = as_num(&lhs)?;
    let b = as_num(&rhs)?;
    let wide = rank(a).max(rank(b));
    match op {
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            let ordering = if wide >= 2 {
                as_f64(a).partial_cmp(&as_f64(b))
            } else {
                Some(as_i64(a).cmp(&as_i64(b)))
            };
            use std::cmp::Ordering::*;
            Some(C::Bool(match (op, ordering) {
                (BinaryOp::Ne, None) => true,
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o == Less,
                (BinaryOp::Gt, Some(o)) => o == Greater,
                (BinaryOp::Le, Some(o)) => o != Greater,
                (BinaryOp::Ge, Some(o)) => o != Less,
                (BinaryOp::Eq, Some(o)) => o == Equal,
                (_, Some(o)) => o != Equal,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            if wide >= 2 {
                let (x, y) = (as_f64(a), as_f64(b));
                let v = match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => x / y,
                    _ => x % y,
                };
                Some(if wide == 3 { C::Double(v) } else { C::Float(single(v)) })
            } else {
                let (x, y) = (as_i64(a), as_i64(b));
                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && y == 0 {
                    return None;
                }
                let v = match op {
                    BinaryOp::Add => x.wrapping_add(y),
                    BinaryOp::Sub => x.wrapping_sub(y),
                    BinaryOp::Mul => x.wrapping_mul(y),
                    BinaryOp::Div => x.wrapping_div(y),
                    _ => x.wrapping_rem(y),
                };
                Some(if wide == 1 { C::Long(v) } else { wrap_int(v) })
            }
        }
        BinaryOp::And | BinaryOp::Or => None,
    }
}

/// Converts a constant to a primitive (or `String`) target type.
fn cast(target: &str, value: ConstantValue) -> Option<ConstantValue> {
    use ConstantValue as C;

    if target == "boolean" {
        return matches!(value, C::Bool(_)).then_some(value);
    }
    if target == "java.lang.String" {
        return matches!(value, C::String(_)).then_some(value);
    }
    let num = as_num(&value)?;
    Some(match target {
        "byte" => C::Int(i64::from(as_i64(num) as i8)),
        "short" => C::Int(i64::from(as_i64(num) as i16)),
        "char" => C::Char(char::from_u32(u32::from(as_i64(num) as u16))?),
        "int" => wrap_int(as_i64(num)),
        "long" => C::Long(as_i64(num)),
        "float" => C::Float(single(as_f64(num))),
        "double" => C::Double(as_f64(num)),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Flags, LanguageLevel};
    use crate::context::TypeTable;
    use crate::syntax::parse_compilation_unit;

    fn values_of(source: &str) -> Vec<Option<ConstantValue>> {
        let tree = parse_compilation_unit("A.java", source).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        tree.preorder()
            .into_iter()
            .filter_map(|id| match tree.kind(id) {
                NodeKind::Return { expr: Some(expr) } => {
                    Some(constant_value_of(&ctx.at(*expr), *expr))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn folds_java_arithmetic() {
        let values = values_of(
            "class A {\n  Object a() { return 2147483647 + 1; }\n  Object b() { return 7 / 2 * 2L; }\n  Object c() { return 1 / 0; }\n  Object d() { return \"n\" + 1 + 'c' + true; }\n  Object e() { return (char) 98; }\n  Object f() { return 1.5f + 1; }\n}\n",
        );
        assert_eq!(
            values,
            vec![
                Some(ConstantValue::Int(-2147483648)),
                Some(ConstantValue::Long(6)),
                None,
                Some(ConstantValue::String("n1ctrue".into())),
                Some(ConstantValue::Char('b')),
                Some(ConstantValue::Float(2.5)),
            ]
        );
    }

    #[test]
    fn resolves_static_final_fields_and_enum_constants() {
        let values = values_of(
            "import java.math.RoundingMode;\nclass A {\n  static final int LIMIT = 3 * 2;\n  final int other = 1;\n  Object a() { return LIMIT + 1; }\n  Object b() { return other; }\n  Object c() { return RoundingMode.UP; }\n  Object d() { return String.class; }\n  Object e() { return null; }\n}\n",
        );
        assert_eq!(
            values,
            vec![
                Some(ConstantValue::Int(7)),
                None,
                Some(ConstantValue::EnumConstant {
                    ty: "java.math.RoundingMode".into(),
                    name: "UP".into()
                }),
                Some(ConstantValue::ClassRef("java.lang.String".into())),
                None,
            ]
        );
    }

    #[test]
    fn method_calls_are_never_constant() {
        let values = values_of("class A {\n  Object a() { return Character.valueOf('a'); }\n}\n");
        assert_eq!(values, vec![None]);
    }
}
