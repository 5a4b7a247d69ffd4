//! Rectify Parser - reference host front end
//!
//! Converts source code of the supported Java subset into an immutable [`Tree`] with
//! source location tracking. This parser is purely syntactic; names and types are
//! resolved later through the analysis context.

use pest::{
    error::{Error, InputLocation},
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::ast::{
    BinaryOp, LambdaParam, Literal, Modifier, ModifierToken, NodeId, NodeKind, Span, Tree,
    TreeBuilder, TypeDeclKind, UnaryOp, WildcardBound,
};
use crate::errors::{to_source_span, RectifyError, SourceContext};
use crate::resolve::trimmed_len;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct JavaParser;

type BuildResult = Result<NodeId, RectifyError>;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse a compilation unit into a tree named `name`.
pub fn parse_compilation_unit(name: &str, source: &str) -> Result<Tree, RectifyError> {
    let context = SourceContext::from_file(name, source);
    let mut pairs = JavaParser::parse(Rule::compilation_unit, source)
        .map_err(|e| convert_parse_error(e, &context))?;
    let unit = pairs
        .next()
        .ok_or_else(|| make_error(&context, "empty input", Span::point(0)))?;

    let mut builder = AstBuilder::new(&context);
    let root = builder.build_compilation_unit(unit)?;
    Ok(builder.tree.finish(name, source, root))
}

/// Parse a single expression; the tree root is the expression node.
pub fn parse_expression(name: &str, source: &str) -> Result<Tree, RectifyError> {
    let context = SourceContext::from_file(name, source);
    let mut pairs = JavaParser::parse(Rule::expression_unit, source)
        .map_err(|e| convert_parse_error(e, &context))?;
    let unit = pairs
        .next()
        .ok_or_else(|| make_error(&context, "empty input", Span::point(0)))?;

    let mut builder = AstBuilder::new(&context);
    let span = get_span(&unit);
    let expression = unit
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| make_error(&context, "expected an expression", span))?;
    let root = builder.build_expression(expression)?;
    Ok(builder.tree.finish(name, source, root))
}

// ============================================================================
// AST BUILDERS
// ============================================================================

struct AstBuilder<'a> {
    tree: TreeBuilder,
    context: &'a SourceContext,
}

impl<'a> AstBuilder<'a> {
    fn new(context: &'a SourceContext) -> Self {
        Self {
            tree: TreeBuilder::new(),
            context,
        }
    }

    fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.tree.add(kind, Some(span))
    }

    fn node_span(&self, id: NodeId) -> Span {
        self.tree.span(id).unwrap_or_default()
    }

    fn build_compilation_unit(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut package = None;
        let mut imports = Vec::new();
        let mut types = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::package_decl => {
                    package = inner.into_inner().next().map(|p| p.as_str().to_string());
                }
                Rule::import_decl => imports.push(self.build_import(inner)),
                Rule::type_decl => types.push(self.build_type_decl(inner)?),
                Rule::EOI => {}
                _ => return Err(self.unexpected(&inner)),
            }
        }

        Ok(self.add(
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
            },
            span,
        ))
    }

    fn build_import(&mut self, pair: Pair<Rule>) -> NodeId {
        let span = get_span(&pair);
        let mut is_static = false;
        let mut path = String::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::static_kw => is_static = true,
                _ => path = inner.as_str().to_string(),
            }
        }
        let wildcard = path.ends_with(".*");
        if wildcard {
            path.truncate(path.len() - 2);
        }
        self.add(
            NodeKind::Import {
                path,
                is_static,
                wildcard,
            },
            span,
        )
    }

    fn build_type_decl(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();

        let modifiers_pair = self.expect(&mut inner, "modifiers", span)?;
        let modifiers = self.build_modifiers(modifiers_pair)?;

        let kind_pair = self.expect(&mut inner, "type kind", span)?;
        let keyword_span = get_span(&kind_pair);
        let kind = match kind_pair.as_str() {
            "interface" => TypeDeclKind::Interface,
            "enum" => TypeDeclKind::Enum,
            "@interface" => TypeDeclKind::Annotation,
            _ => TypeDeclKind::Class,
        };

        let name_pair = self.expect(&mut inner, "type name", span)?;
        let name = name_pair.as_str().to_string();
        let name_span = get_span(&name_pair);

        let mut type_params = Vec::new();
        let mut extends = Vec::new();
        let mut implements = Vec::new();
        let mut members = Vec::new();

        for part in inner {
            match part.as_rule() {
                Rule::type_params => type_params = type_param_names(part),
                Rule::extends_clause => {
                    for ty in part.into_inner() {
                        extends.push(self.build_type_ref(ty)?);
                    }
                }
                Rule::implements_clause => {
                    for ty in part.into_inner() {
                        implements.push(self.build_type_ref(ty)?);
                    }
                }
                Rule::class_body | Rule::enum_body => members = self.build_members(part)?,
                _ => return Err(self.unexpected(&part)),
            }
        }

        Ok(self.add(
            NodeKind::Class {
                kind,
                name,
                name_span: Some(name_span),
                keyword_span: Some(keyword_span),
                modifiers,
                type_params,
                extends,
                implements,
                members,
            },
            span,
        ))
    }

    fn build_members(&mut self, pair: Pair<Rule>) -> Result<Vec<NodeId>, RectifyError> {
        let mut members = Vec::new();
        for member in pair.into_inner() {
            match member.as_rule() {
                Rule::type_decl => members.push(self.build_type_decl(member)?),
                Rule::method_decl => members.push(self.build_method(member)?),
                Rule::field_decl => members.extend(self.build_variables(member)?),
                Rule::enum_constant => {
                    let span = get_span(&member);
                    let name = member.as_str().trim().to_string();
                    members.push(self.add(NodeKind::EnumConstant { name }, span));
                }
                _ => return Err(self.unexpected(&member)),
            }
        }
        Ok(members)
    }

    fn build_modifiers(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut keywords = Vec::new();
        let mut annotations = Vec::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::annotation => annotations.push(self.build_annotation(inner)?),
                _ => {
                    if let Some(modifier) = Modifier::from_keyword(inner.as_str()) {
                        keywords.push(ModifierToken {
                            modifier,
                            span: Some(get_span(&inner)),
                        });
                    }
                }
            }
        }
        Ok(self.add(
            NodeKind::Modifiers {
                keywords,
                annotations,
            },
            span,
        ))
    }

    fn build_annotation(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let name = self.expect(&mut inner, "annotation name", span)?.as_str().to_string();
        let mut args = Vec::new();
        for arg in inner {
            match arg.as_rule() {
                Rule::element_pair => {
                    let pair_span = get_span(&arg);
                    let mut parts = arg.into_inner();
                    let key = self.expect(&mut parts, "element name", pair_span)?;
                    let key_span = get_span(&key);
                    let target = self.add(
                        NodeKind::Ident {
                            name: key.as_str().to_string(),
                        },
                        key_span,
                    );
                    let value_pair = self.expect(&mut parts, "element value", pair_span)?;
                    let value = self.build_element_value(value_pair)?;
                    args.push(self.add(NodeKind::Assign { target, value }, pair_span));
                }
                _ => args.push(self.build_element_value(arg)?),
            }
        }
        Ok(self.add(NodeKind::Annotation { name, args }, span))
    }

    fn build_element_value(&mut self, pair: Pair<Rule>) -> BuildResult {
        match pair.as_rule() {
            Rule::annotation => self.build_annotation(pair),
            Rule::array_init => self.build_array_init(pair),
            _ => self.build_expression(pair),
        }
    }

    fn build_array_init(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let elements = pair
            .into_inner()
            .map(|p| self.build_element_value(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.add(NodeKind::ArrayInit { elements }, span))
    }

    fn build_method(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let modifiers_pair = self.expect(&mut inner, "modifiers", span)?;
        let modifiers = self.build_modifiers(modifiers_pair)?;

        let mut name = String::new();
        let mut name_span = None;
        let mut type_params = Vec::new();
        let mut return_type = None;
        let mut params = Vec::new();
        let mut throws = Vec::new();
        let mut body = None;
        let mut default_value = None;

        for part in inner {
            match part.as_rule() {
                Rule::type_params => type_params = type_param_names(part),
                Rule::void_type => {
                    let void_span = get_span(&part);
                    return_type = Some(self.add(
                        NodeKind::TypeRef {
                            name: "void".into(),
                            args: vec![],
                            dims: 0,
                        },
                        void_span,
                    ));
                }
                Rule::type_ref => return_type = Some(self.build_type_ref(part)?),
                Rule::identifier | Rule::constructor_name => {
                    name = part.as_str().trim().to_string();
                    name_span = Some(get_span(&part));
                }
                Rule::formal_params => {
                    for param in part.into_inner() {
                        params.push(self.build_formal_param(param)?);
                    }
                }
                Rule::dims => {}
                Rule::throws_clause => {
                    for ty in part.into_inner() {
                        throws.push(self.build_type_ref(ty)?);
                    }
                }
                Rule::block => body = Some(self.build_block(part)?),
                Rule::default_value => {
                    let value_span = get_span(&part);
                    let mut parts = part.into_inner();
                    let value = self.expect(&mut parts, "default value", value_span)?;
                    default_value = Some(self.build_element_value(value)?);
                }
                _ => return Err(self.unexpected(&part)),
            }
        }

        Ok(self.add(
            NodeKind::Method {
                name,
                name_span,
                modifiers,
                type_params,
                return_type,
                params,
                throws,
                body,
                default_value,
            },
            span,
        ))
    }

    fn build_formal_param(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let modifiers_pair = self.expect(&mut inner, "modifiers", span)?;
        let modifiers = self.build_modifiers(modifiers_pair)?;
        let type_pair = self.expect(&mut inner, "parameter type", span)?;
        let ty = self.build_type_ref(type_pair)?;

        let mut varargs = false;
        let mut name = String::new();
        let mut name_span = None;
        for part in inner {
            match part.as_rule() {
                Rule::varargs => varargs = true,
                Rule::identifier => {
                    name = part.as_str().to_string();
                    name_span = Some(get_span(&part));
                }
                _ => {}
            }
        }

        Ok(self.add(
            NodeKind::Variable {
                name,
                name_span,
                modifiers,
                ty,
                init: None,
                varargs,
            },
            span,
        ))
    }

    /// Builds one variable node per declarator of a field or local declaration.
    fn build_variables(&mut self, pair: Pair<Rule>) -> Result<Vec<NodeId>, RectifyError> {
        let span = get_span(&pair);
        let parts: Vec<Pair<Rule>> = pair.into_inner().collect();
        let (modifiers_pair, type_pair, declarators) = match parts.as_slice() {
            [modifiers, ty, declarators @ ..] if !declarators.is_empty() => {
                (modifiers.clone(), ty.clone(), declarators.to_vec())
            }
            _ => return Err(make_error(self.context, "malformed variable declaration", span)),
        };
        let single = declarators.len() == 1;

        let mut variables = Vec::with_capacity(declarators.len());
        for declarator in declarators {
            let declarator_span = get_span(&declarator);
            let modifiers = self.build_modifiers(modifiers_pair.clone())?;
            let ty = self.build_type_ref(type_pair.clone())?;
            let mut name = String::new();
            let mut name_span = None;
            let mut init = None;
            for part in declarator.into_inner() {
                match part.as_rule() {
                    Rule::identifier => {
                        name = part.as_str().to_string();
                        name_span = Some(get_span(&part));
                    }
                    Rule::dims => {}
                    _ => init = Some(self.build_element_value(part)?),
                }
            }
            variables.push(self.add(
                NodeKind::Variable {
                    name,
                    name_span,
                    modifiers,
                    ty,
                    init,
                    varargs: false,
                },
                if single { span } else { declarator_span },
            ));
        }
        Ok(variables)
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn build_type_ref(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut name = String::new();
        let mut args = Vec::new();
        let mut dims = 0;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::primitive_type => name = part.as_str().to_string(),
                Rule::class_type => {
                    let (class_name, class_args) = self.build_class_type_parts(part)?;
                    name = class_name;
                    args = class_args;
                }
                Rule::dims => dims = part.into_inner().count(),
                _ => return Err(self.unexpected(&part)),
            }
        }
        Ok(self.add(NodeKind::TypeRef { name, args, dims }, span))
    }

    fn build_class_type(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let (name, args) = self.build_class_type_parts(pair)?;
        Ok(self.add(NodeKind::TypeRef { name, args, dims: 0 }, span))
    }

    fn build_class_type_parts(
        &mut self,
        pair: Pair<Rule>,
    ) -> Result<(String, Vec<NodeId>), RectifyError> {
        let mut name = String::new();
        let mut args = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::qualified_name => name = part.as_str().to_string(),
                Rule::type_args => args = self.build_type_args(part)?,
                _ => return Err(self.unexpected(&part)),
            }
        }
        Ok((name, args))
    }

    fn build_type_args(&mut self, pair: Pair<Rule>) -> Result<Vec<NodeId>, RectifyError> {
        let mut args = Vec::new();
        for arg in pair.into_inner() {
            match arg.as_rule() {
                Rule::wildcard => {
                    let span = get_span(&arg);
                    let mut parts = arg.into_inner();
                    let bound = match (parts.next(), parts.next()) {
                        (Some(kind), Some(ty)) => {
                            let kind = if kind.as_str() == "super" {
                                WildcardBound::Super
                            } else {
                                WildcardBound::Extends
                            };
                            Some((kind, self.build_type_ref(ty)?))
                        }
                        _ => None,
                    };
                    args.push(self.add(NodeKind::Wildcard { bound }, span));
                }
                _ => args.push(self.build_type_ref(arg)?),
            }
        }
        Ok(args)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn build_block(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut statements = Vec::new();
        for statement in pair.into_inner() {
            statements.extend(self.build_statement(statement)?);
        }
        Ok(self.add(NodeKind::Block { statements }, span))
    }

    fn build_statement(&mut self, pair: Pair<Rule>) -> Result<Vec<NodeId>, RectifyError> {
        let span = get_span(&pair);
        let id = match pair.as_rule() {
            Rule::block => self.build_block(pair)?,
            Rule::local_var_decl => return self.build_variables(pair),
            Rule::expr_stmt => {
                let mut inner = pair.into_inner();
                let expr_pair = self.expect(&mut inner, "expression", span)?;
                let expr = self.build_expression(expr_pair)?;
                self.add(NodeKind::ExprStmt { expr }, span)
            }
            Rule::if_stmt => {
                let mut inner = pair.into_inner();
                let cond_pair = self.expect(&mut inner, "condition", span)?;
                let cond = self.build_expression(cond_pair)?;
                let then_pair = self.expect(&mut inner, "statement", span)?;
                let then_branch = self.build_single_statement(then_pair)?;
                let else_branch = match inner.next() {
                    Some(else_clause) => {
                        let else_span = get_span(&else_clause);
                        let mut parts = else_clause.into_inner();
                        let statement = self.expect(&mut parts, "statement", else_span)?;
                        Some(self.build_single_statement(statement)?)
                    }
                    None => None,
                };
                self.add(
                    NodeKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    span,
                )
            }
            Rule::return_stmt => {
                let expr = match pair.into_inner().next() {
                    Some(expr) => Some(self.build_expression(expr)?),
                    None => None,
                };
                self.add(NodeKind::Return { expr }, span)
            }
            Rule::throw_stmt => {
                let mut inner = pair.into_inner();
                let expr_pair = self.expect(&mut inner, "expression", span)?;
                let expr = self.build_expression(expr_pair)?;
                self.add(NodeKind::Throw { expr }, span)
            }
            Rule::empty_stmt => self.add(NodeKind::Empty, span),
            _ => return Err(self.unexpected(&pair)),
        };
        Ok(vec![id])
    }

    fn build_single_statement(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        self.build_statement(pair)?
            .into_iter()
            .next()
            .ok_or_else(|| make_error(self.context, "expected a statement", span))
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn build_expression(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        match pair.as_rule() {
            Rule::lambda_expr => self.build_lambda(pair),
            Rule::assignment_expr => {
                let mut inner = pair.into_inner();
                let target_pair = self.expect(&mut inner, "assignment target", span)?;
                let target = self.build_expression(target_pair)?;
                let value_pair = inner
                    .find(|p| p.as_rule() != Rule::assign_op)
                    .ok_or_else(|| make_error(self.context, "missing assigned value", span))?;
                let value = self.build_expression(value_pair)?;
                Ok(self.add(NodeKind::Assign { target, value }, span))
            }
            Rule::conditional_expr => {
                let mut inner = pair.into_inner();
                let cond_pair = self.expect(&mut inner, "expression", span)?;
                let cond = self.build_expression(cond_pair)?;
                match (inner.next(), inner.next()) {
                    (Some(then_pair), Some(else_pair)) => {
                        let then_expr = self.build_expression(then_pair)?;
                        let else_expr = self.build_expression(else_pair)?;
                        Ok(self.add(
                            NodeKind::Conditional {
                                cond,
                                then_expr,
                                else_expr,
                            },
                            span,
                        ))
                    }
                    _ => Ok(cond),
                }
            }
            Rule::binary_expr => self.build_binary(pair),
            Rule::unary_expr => self.build_unary(pair),
            Rule::cast_expr => {
                let mut inner = pair.into_inner();
                let ty_pair = self.expect(&mut inner, "cast type", span)?;
                let ty_span = get_span(&ty_pair);
                let mut dims = 0;
                let mut operand = None;
                for part in inner {
                    match part.as_rule() {
                        Rule::dims => dims = part.into_inner().count(),
                        _ => operand = Some(part),
                    }
                }
                let ty = self.add(
                    NodeKind::TypeRef {
                        name: ty_pair.as_str().to_string(),
                        args: vec![],
                        dims,
                    },
                    ty_span,
                );
                let operand =
                    operand.ok_or_else(|| make_error(self.context, "missing cast operand", span))?;
                let expr = self.build_expression(operand)?;
                Ok(self.add(NodeKind::Cast { ty, expr }, span))
            }
            Rule::postfix_expr => self.build_postfix(pair),
            Rule::parens => {
                let mut inner = pair.into_inner();
                let expr_pair = self.expect(&mut inner, "expression", span)?;
                let expr = self.build_expression(expr_pair)?;
                Ok(self.add(NodeKind::Parens { expr }, span))
            }
            Rule::method_call => {
                let mut inner = pair.into_inner();
                let name_pair = self.expect(&mut inner, "method name", span)?;
                let name_span = get_span(&name_pair);
                let args_pair = self.expect(&mut inner, "arguments", span)?;
                let args = self.build_arguments(args_pair)?;
                Ok(self.add(
                    NodeKind::MethodCall {
                        target: None,
                        name: name_pair.as_str().to_string(),
                        name_span: Some(name_span),
                        args,
                    },
                    span,
                ))
            }
            Rule::identifier => Ok(self.add(
                NodeKind::Ident {
                    name: pair.as_str().to_string(),
                },
                span,
            )),
            Rule::this_expr => Ok(self.add(NodeKind::This, span)),
            Rule::new_expr => {
                let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::new_kw);
                let ty_pair = inner
                    .next()
                    .ok_or_else(|| make_error(self.context, "missing instantiated type", span))?;
                let ty = self.build_class_type(ty_pair)?;
                let args = match inner.next() {
                    Some(args_pair) => self.build_arguments(args_pair)?,
                    None => vec![],
                };
                Ok(self.add(NodeKind::New { ty, args }, span))
            }
            Rule::class_literal => {
                let mut name = String::new();
                let mut dims = 0;
                let mut ty_span = Span::point(span.start);
                for part in pair.into_inner() {
                    match part.as_rule() {
                        Rule::primitive_type | Rule::qualified_name => {
                            name = part.as_str().to_string();
                            ty_span = get_span(&part);
                        }
                        Rule::dims => {
                            dims = part.clone().into_inner().count();
                            ty_span = ty_span.to(&get_span(&part));
                        }
                        _ => {}
                    }
                }
                let ty = self.add(
                    NodeKind::TypeRef {
                        name,
                        args: vec![],
                        dims,
                    },
                    ty_span,
                );
                Ok(self.add(NodeKind::ClassLiteral { ty }, span))
            }
            Rule::array_init => self.build_array_init(pair),
            Rule::annotation => self.build_annotation(pair),
            Rule::text_block
            | Rule::string_lit
            | Rule::char_lit
            | Rule::float_lit
            | Rule::int_lit
            | Rule::boolean_lit
            | Rule::null_lit => {
                let literal = self.build_literal(&pair)?;
                Ok(self.add(NodeKind::Literal(literal), span))
            }
            _ => Err(self.unexpected(&pair)),
        }
    }

    fn build_lambda(&mut self, pair: Pair<Rule>) -> BuildResult {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let params_pair = self.expect(&mut inner, "lambda parameters", span)?;
        let params = params_pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::identifier)
            .map(|p| LambdaParam {
                name: p.as_str().to_string(),
                span: Some(get_span(&p)),
            })
            .collect();
        let body_pair = self.expect(&mut inner, "lambda body", span)?;
        let body = match body_pair.as_rule() {
            Rule::block => self.build_block(body_pair)?,
            _ => self.build_expression(body_pair)?,
        };
        Ok(self.add(NodeKind::Lambda { params, body }, span))
    }

    /// Folds `a op b op c ...` by operator precedence; all operators are left associative.
    fn build_binary(&mut self, pair: Pair<Rule>) -> BuildResult {
        let mut operands: Vec<NodeId> = Vec::new();
        let mut operators: Vec<BinaryOp> = Vec::new();

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::binary_op => {
                    let op = BinaryOp::from_symbol(part.as_str())
                        .ok_or_else(|| self.unexpected(&part))?;
                    while let Some(top) = operators.last().copied() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        operators.pop();
                        self.reduce_binary(&mut operands, top)?;
                    }
                    operators.push(op);
                }
                _ => operands.push(self.build_expression(part)?),
            }
        }
        while let Some(op) = operators.pop() {
            self.reduce_binary(&mut operands, op)?;
        }
        operands
            .pop()
            .ok_or_else(|| make_error(self.context, "empty expression", Span::default()))
    }

    fn reduce_binary(
        &mut self,
        operands: &mut Vec<NodeId>,
        op: BinaryOp,
    ) -> Result<(), RectifyError> {
        let (rhs, lhs) = match (operands.pop(), operands.pop()) {
            (Some(rhs), Some(lhs)) => (rhs, lhs),
            _ => {
                return Err(make_error(
                    self.context,
                    format!("missing operand for `{}`", op.as_str()),
                    Span::default(),
                ))
            }
        };
        let span = self.node_span(lhs).to(&self.node_span(rhs));
        operands.push(self.add(NodeKind::Binary { op, lhs, rhs }, span));
        Ok(())
    }

    fn build_unary(&mut self, pair: Pair<Rule>) -> BuildResult {
        let mut prefixes = Vec::new();
        let mut operand = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::prefix_op => {
                    let op = match part.as_str() {
                        "!" => UnaryOp::Not,
                        "-" => UnaryOp::Neg,
                        "+" => UnaryOp::Plus,
                        _ => UnaryOp::BitNot,
                    };
                    prefixes.push((op, get_span(&part).start));
                }
                _ => operand = Some(self.build_expression(part)?),
            }
        }
        let mut current =
            operand.ok_or_else(|| make_error(self.context, "missing operand", Span::default()))?;
        for (op, start) in prefixes.into_iter().rev() {
            let span = Span::new(start, self.node_span(current).end);
            current = self.add(NodeKind::Unary { op, operand: current }, span);
        }
        Ok(current)
    }

    fn build_postfix(&mut self, pair: Pair<Rule>) -> BuildResult {
        let start = get_span(&pair).start;
        let mut inner = pair.into_inner();
        let primary_pair = self.expect(&mut inner, "expression", Span::point(start))?;
        let mut current = self.build_expression(primary_pair)?;

        for selector in inner {
            let selector_span = get_span(&selector);
            let span = Span::new(start, selector_span.end);
            current = match selector.as_rule() {
                Rule::method_selector => {
                    let mut name = String::new();
                    let mut name_span = None;
                    let mut args = Vec::new();
                    for part in selector.into_inner() {
                        match part.as_rule() {
                            Rule::identifier => {
                                name = part.as_str().to_string();
                                name_span = Some(get_span(&part));
                            }
                            Rule::arguments => args = self.build_arguments(part)?,
                            _ => {}
                        }
                    }
                    self.add(
                        NodeKind::MethodCall {
                            target: Some(current),
                            name,
                            name_span,
                            args,
                        },
                        span,
                    )
                }
                Rule::field_selector => {
                    let name = selector
                        .into_inner()
                        .next()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default();
                    self.add(
                        NodeKind::FieldAccess {
                            target: current,
                            name,
                        },
                        span,
                    )
                }
                Rule::index_selector => {
                    let mut parts = selector.into_inner();
                    let index_pair = self.expect(&mut parts, "index", selector_span)?;
                    let index = self.build_expression(index_pair)?;
                    self.add(
                        NodeKind::Index {
                            target: current,
                            index,
                        },
                        span,
                    )
                }
                Rule::method_ref_selector => {
                    let name = selector
                        .into_inner()
                        .next()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default();
                    self.add(
                        NodeKind::MethodRef {
                            target: current,
                            name,
                        },
                        span,
                    )
                }
                _ => return Err(self.unexpected(&selector)),
            };
        }
        Ok(current)
    }

    fn build_arguments(&mut self, pair: Pair<Rule>) -> Result<Vec<NodeId>, RectifyError> {
        pair.into_inner()
            .map(|p| self.build_expression(p))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------------

    fn build_literal(&self, pair: &Pair<Rule>) -> Result<Literal, RectifyError> {
        let text = pair.as_str();
        let span = get_span(pair);
        let invalid = |kind: &str| {
            make_error(
                self.context,
                format!("invalid {kind} literal `{text}`"),
                span,
            )
        };
        match pair.as_rule() {
            Rule::int_lit => {
                let is_long = text.ends_with(['l', 'L']);
                let digits: String = text
                    .trim_end_matches(['l', 'L'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = match digits
                    .strip_prefix("0x")
                    .or_else(|| digits.strip_prefix("0X"))
                {
                    Some(hex) => {
                        let raw = u64::from_str_radix(hex, 16).map_err(|_| invalid("integer"))?;
                        if is_long {
                            raw as i64
                        } else {
                            let narrow = u32::try_from(raw).map_err(|_| invalid("integer"))?;
                            i64::from(narrow as i32)
                        }
                    }
                    None => digits.parse::<i64>().map_err(|_| invalid("integer"))?,
                };
                Ok(if is_long {
                    Literal::Long(value)
                } else {
                    Literal::Int(value)
                })
            }
            Rule::float_lit => {
                let is_float = text.ends_with(['f', 'F']);
                let digits: String = text
                    .trim_end_matches(['f', 'F', 'd', 'D'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = digits.parse::<f64>().map_err(|_| invalid("floating point"))?;
                Ok(if is_float {
                    Literal::Float(value)
                } else {
                    Literal::Double(value)
                })
            }
            Rule::char_lit => {
                let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
                let value = unescape(inner);
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Literal::Char(c)),
                    _ => Err(invalid("character")),
                }
            }
            Rule::string_lit => {
                let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
                Ok(Literal::String(unescape(inner)))
            }
            Rule::text_block => Ok(Literal::String(text_block_value(text))),
            Rule::boolean_lit => Ok(Literal::Bool(text == "true")),
            Rule::null_lit => Ok(Literal::Null),
            _ => Err(self.unexpected(pair)),
        }
    }

    // ------------------------------------------------------------------------
    // Error helpers
    // ------------------------------------------------------------------------

    fn expect<'i>(
        &self,
        pairs: &mut Pairs<'i, Rule>,
        element: &str,
        span: Span,
    ) -> Result<Pair<'i, Rule>, RectifyError> {
        pairs
            .next()
            .ok_or_else(|| make_error(self.context, format!("missing {element}"), span))
    }

    fn unexpected(&self, pair: &Pair<Rule>) -> RectifyError {
        make_error(
            self.context,
            format!("unsupported construct {:?}", pair.as_rule()),
            get_span(pair),
        )
    }
}

// ============================================================================
// TEXT UTILITIES
// ============================================================================

/// Type parameters as written, with whitespace normalised (`T extends Comparable<T>`).
fn type_param_names(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .map(|param| param.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

/// Resolves Java escape sequences.
pub(crate) fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('s') => result.push(' '),
            Some('\n') => {}
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some(digit @ '0'..='7') => {
                let mut value = digit.to_digit(8).unwrap_or(0);
                while let Some(next) = chars.peek().and_then(|c| c.to_digit(8)) {
                    if value * 8 + next > 0o377 {
                        break;
                    }
                    value = value * 8 + next;
                    chars.next();
                }
                result.extend(char::from_u32(value));
            }
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// The string value of a text block: incidental indentation and trailing spaces are
/// stripped, then escapes are resolved.
pub(crate) fn text_block_value(raw: &str) -> String {
    let body = raw
        .get(3..raw.len().saturating_sub(3))
        .unwrap_or_default()
        .replace("\r\n", "\n");
    let content = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body.as_str(),
    };
    let lines: Vec<&str> = content.split('\n').collect();
    let last = lines.len().saturating_sub(1);

    let indentation = lines
        .iter()
        .enumerate()
        .filter(|(i, line)| *i == last || !line.trim().is_empty())
        .map(|(_, line)| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let stripped: Vec<&str> = lines
        .iter()
        .map(|line| {
            let leading = line.len() - line.trim_start().len();
            line.get(leading.min(indentation)..).unwrap_or(line).trim_end()
        })
        .collect();

    unescape(&stripped.join("\n"))
}

/// The pair's span without the whitespace and comments pest skips before an
/// absent trailing optional or repetition.
fn get_span(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    let start = span.start();
    Span {
        start,
        end: start + trimmed_len(span.as_str()),
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn make_error(source: &SourceContext, message: impl Into<String>, span: Span) -> RectifyError {
    RectifyError::Parse {
        message: message.into(),
        src: source.to_named_source(),
        span: to_source_span(span),
        help: None,
    }
}

fn convert_parse_error(error: Error<Rule>, source: &SourceContext) -> RectifyError {
    let span = match error.location {
        InputLocation::Pos(pos) => Span::point(pos),
        InputLocation::Span((start, end)) => Span::new(start, end),
    };
    let message = error.variant.message().to_string();
    let help = if message.contains("EOI") {
        Some("unexpected trailing input; check for unbalanced braces".to_string())
    } else {
        None
    };
    RectifyError::Parse {
        message,
        src: source.to_named_source(),
        span: to_source_span(span),
        help,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_compilation_unit() {
        let tree = parse_compilation_unit("Empty.java", "").unwrap();
        assert!(matches!(
            tree.kind(tree.root()),
            NodeKind::CompilationUnit { types, .. } if types.is_empty()
        ));
    }

    #[test]
    fn keeps_modifier_and_keyword_spans() {
        let source = "public final class A { @Test void foo() {} }";
        let tree = parse_compilation_unit("A.java", source).unwrap();
        let class = tree
            .preorder()
            .into_iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::Class { .. }))
            .unwrap();
        let NodeKind::Class {
            keyword_span,
            modifiers,
            members,
            ..
        } = tree.kind(class)
        else {
            unreachable!()
        };
        assert_eq!(tree.slice(keyword_span.unwrap()), Some("class"));
        let NodeKind::Modifiers { keywords, .. } = tree.kind(*modifiers) else {
            unreachable!()
        };
        assert_eq!(keywords.len(), 2);
        assert_eq!(members.len(), 1);
        assert_eq!(tree.annotations_of(members[0]).len(), 1);
    }

    #[test]
    fn node_spans_end_at_their_last_token() {
        let source = "class A {\n  @Deprecated /* gone */\n  @Foo ( 1 )\n  void m(final String s , int t) { x = a ? b : c  ; }\n}\n";
        let tree = parse_compilation_unit("A.java", source).unwrap();
        let sources = |kind: &str| -> Vec<&str> {
            tree.preorder()
                .into_iter()
                .filter(|id| tree.kind(*id).name() == kind)
                .filter_map(|id| tree.source_of(id))
                .collect()
        };
        assert_eq!(sources("Annotation"), ["@Deprecated", "@Foo ( 1 )"]);
        assert!(sources("Variable").contains(&"final String s"));
        assert!(sources("TypeRef").contains(&"String"));
        assert_eq!(sources("Conditional"), ["a ? b : c"]);
    }

    #[test]
    fn binary_operators_respect_precedence() {
        let tree = parse_expression("e", "a + b * c == d").unwrap();
        let NodeKind::Binary { op, lhs, .. } = tree.kind(tree.root()) else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::Eq);
        assert_eq!(tree.source_of(*lhs), Some("a + b * c"));
    }

    #[test]
    fn identifiers_may_start_with_keywords() {
        let source = "class A { void f() { returnValue(); int newCount = 1; } }";
        assert!(parse_compilation_unit("A.java", source).is_ok());
    }

    #[test]
    fn parses_lambdas_method_references_and_class_literals() {
        let tree = parse_expression(
            "e",
            "stream.flatMap(v -> f(v).map(Arguments::arguments)).toArray(String.class)",
        )
        .unwrap();
        let kinds: Vec<&str> = tree
            .preorder()
            .into_iter()
            .map(|id| tree.kind(id).name())
            .collect();
        assert!(kinds.contains(&"Lambda"));
        assert!(kinds.contains(&"MethodRef"));
        assert!(kinds.contains(&"ClassLiteral"));
    }

    #[test]
    fn text_block_strips_incidental_indentation() {
        let raw = "\"\"\"\n    class A {\n      int x;\n    }\n    \"\"\"";
        assert_eq!(text_block_value(raw), "class A {\n  int x;\n}\n");
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let error = parse_compilation_unit("A.java", "class A {").unwrap_err();
        assert!(matches!(error, RectifyError::Parse { .. }));
    }
}
