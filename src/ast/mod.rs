//! Syntax tree module for Rectify
//!
//! This module provides the immutable syntax tree that every checker and template
//! rule inspects. A tree is an arena of [`Node`]s for a single compilation unit; each
//! node carries a closed [`NodeKind`] variant, an optional source [`Span`] and a link
//! to its parent.
//!
//! ## Core Principles
//! - Trees are built once by a host front end and never mutated afterwards.
//! - Nodes without a span are synthetic; fixes anchored on them are not positionable.
//! - Every structural question (children, ancestors, descendants) is answered by an
//!   exhaustive `match` over [`NodeKind`].

// ============================================================================
// IMPORTS
// ============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a half-open byte range `[start, end)` in the source code.
///
/// # Examples
///
/// ```rust
/// use rectify::ast::Span;
/// let span = Span::new(0, 5);
/// assert_eq!(span.len(), 5);
/// assert!(span.overlaps(&Span::new(4, 8)));
/// assert!(!span.overlaps(&Span::new(5, 8)));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the given offset.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies completely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the two ranges share at least one byte, or a zero-width span sits
    /// strictly inside a non-empty one.
    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() && other.is_empty() {
            return false;
        }
        if self.is_empty() {
            return other.start < self.start && self.start < other.end;
        }
        if other.is_empty() {
            return self.start < other.start && other.start < self.end;
        }
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// The smallest span covering both spans.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Index of a node inside its [`Tree`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration modifiers, in the canonical order of the Java language specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Static,
    Final,
    Transient,
    Volatile,
    Synchronized,
    Native,
    Strictfp,
    Default,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Transient => "transient",
            Modifier::Volatile => "volatile",
            Modifier::Synchronized => "synchronized",
            Modifier::Native => "native",
            Modifier::Strictfp => "strictfp",
            Modifier::Default => "default",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "public" => Modifier::Public,
            "protected" => Modifier::Protected,
            "private" => Modifier::Private,
            "abstract" => Modifier::Abstract,
            "static" => Modifier::Static,
            "final" => Modifier::Final,
            "transient" => Modifier::Transient,
            "volatile" => Modifier::Volatile,
            "synchronized" => Modifier::Synchronized,
            "native" => Modifier::Native,
            "strictfp" => Modifier::Strictfp,
            "default" => Modifier::Default,
            _ => return None,
        })
    }

    /// Visibility modifiers; a declaration without any of them is package-private.
    pub const VISIBILITY: [Modifier; 3] =
        [Modifier::Public, Modifier::Protected, Modifier::Private];
}

/// A modifier keyword as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierToken {
    pub modifier: Modifier,
    pub span: Option<Span>,
}

/// The flavour of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl TypeDeclKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeDeclKind::Class => "class",
            TypeDeclKind::Interface => "interface",
            TypeDeclKind::Enum => "enum",
            TypeDeclKind::Annotation => "@interface",
        }
    }
}

/// Literal values as parsed; text blocks are string literals whose source starts
/// with a triple quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    Char(char),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::Eq | BinaryOp::Ne => 8,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 9,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WildcardBound {
    Extends,
    Super,
}

/// A lambda parameter name and where it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: String,
    pub span: Option<Span>,
}

/// The closed set of syntax node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    CompilationUnit {
        package: Option<String>,
        imports: Vec<NodeId>,
        types: Vec<NodeId>,
    },
    Import {
        path: String,
        is_static: bool,
        wildcard: bool,
    },
    Class {
        kind: TypeDeclKind,
        name: String,
        name_span: Option<Span>,
        /// Span of the `class`/`interface`/`enum`/`@interface` keyword.
        keyword_span: Option<Span>,
        modifiers: NodeId,
        type_params: Vec<String>,
        extends: Vec<NodeId>,
        implements: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    EnumConstant {
        name: String,
    },
    Modifiers {
        keywords: Vec<ModifierToken>,
        annotations: Vec<NodeId>,
    },
    Method {
        name: String,
        name_span: Option<Span>,
        modifiers: NodeId,
        type_params: Vec<String>,
        /// `None` for constructors.
        return_type: Option<NodeId>,
        params: Vec<NodeId>,
        throws: Vec<NodeId>,
        body: Option<NodeId>,
        default_value: Option<NodeId>,
    },
    Variable {
        name: String,
        name_span: Option<Span>,
        modifiers: NodeId,
        ty: NodeId,
        init: Option<NodeId>,
        varargs: bool,
    },
    TypeRef {
        name: String,
        args: Vec<NodeId>,
        dims: usize,
    },
    Wildcard {
        bound: Option<(WildcardBound, NodeId)>,
    },
    Annotation {
        name: String,
        args: Vec<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    Return {
        expr: Option<NodeId>,
    },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    Throw {
        expr: NodeId,
    },
    ExprStmt {
        expr: NodeId,
    },
    Empty,
    Literal(Literal),
    Ident {
        name: String,
    },
    FieldAccess {
        target: NodeId,
        name: String,
    },
    ClassLiteral {
        ty: NodeId,
    },
    MethodCall {
        target: Option<NodeId>,
        name: String,
        name_span: Option<Span>,
        args: Vec<NodeId>,
    },
    MethodRef {
        target: NodeId,
        name: String,
    },
    New {
        ty: NodeId,
        args: Vec<NodeId>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Conditional {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Assign {
        target: NodeId,
        value: NodeId,
    },
    Parens {
        expr: NodeId,
    },
    Cast {
        ty: NodeId,
        expr: NodeId,
    },
    ArrayInit {
        elements: Vec<NodeId>,
    },
    Index {
        target: NodeId,
        index: NodeId,
    },
    This,
}

/// Coarse classification used by the runner to dispatch checkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Declaration,
    Statement,
    Expression,
    Type,
    Other,
}

/// A single node: its kind, where it came from, and its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub parent: Option<NodeId>,
}

/// An immutable syntax tree for one compilation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    name: String,
    source: Arc<str>,
    nodes: Vec<Node>,
    root: NodeId,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl NodeKind {
    /// Returns the direct children of this node in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::CompilationUnit { imports, types, .. } => {
                imports.iter().chain(types.iter()).copied().collect()
            }
            NodeKind::Class {
                modifiers,
                extends,
                implements,
                members,
                ..
            } => std::iter::once(*modifiers)
                .chain(extends.iter().copied())
                .chain(implements.iter().copied())
                .chain(members.iter().copied())
                .collect(),
            NodeKind::Modifiers { annotations, .. } => annotations.clone(),
            NodeKind::Method {
                modifiers,
                return_type,
                params,
                throws,
                body,
                default_value,
                ..
            } => std::iter::once(*modifiers)
                .chain(return_type.iter().copied())
                .chain(params.iter().copied())
                .chain(throws.iter().copied())
                .chain(body.iter().copied())
                .chain(default_value.iter().copied())
                .collect(),
            NodeKind::Variable {
                modifiers, ty, init, ..
            } => std::iter::once(*modifiers)
                .chain(std::iter::once(*ty))
                .chain(init.iter().copied())
                .collect(),
            NodeKind::TypeRef { args, .. } => args.clone(),
            NodeKind::Wildcard { bound } => bound.iter().map(|(_, ty)| *ty).collect(),
            NodeKind::Annotation { args, .. } => args.clone(),
            NodeKind::Block { statements } => statements.clone(),
            NodeKind::Return { expr } => expr.iter().copied().collect(),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => std::iter::once(*cond)
                .chain(std::iter::once(*then_branch))
                .chain(else_branch.iter().copied())
                .collect(),
            NodeKind::Throw { expr } | NodeKind::ExprStmt { expr } | NodeKind::Parens { expr } => {
                vec![*expr]
            }
            NodeKind::FieldAccess { target, .. } | NodeKind::MethodRef { target, .. } => {
                vec![*target]
            }
            NodeKind::ClassLiteral { ty } => vec![*ty],
            NodeKind::MethodCall { target, args, .. } => {
                target.iter().chain(args.iter()).copied().collect()
            }
            NodeKind::New { ty, args } => {
                std::iter::once(*ty).chain(args.iter().copied()).collect()
            }
            NodeKind::Lambda { body, .. } => vec![*body],
            NodeKind::Unary { operand, .. } => vec![*operand],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => vec![*cond, *then_expr, *else_expr],
            NodeKind::Assign { target, value } => vec![*target, *value],
            NodeKind::Cast { ty, expr } => vec![*ty, *expr],
            NodeKind::ArrayInit { elements } => elements.clone(),
            NodeKind::Index { target, index } => vec![*target, *index],
            NodeKind::Import { .. }
            | NodeKind::EnumConstant { .. }
            | NodeKind::Empty
            | NodeKind::Literal(_)
            | NodeKind::Ident { .. }
            | NodeKind::This => vec![],
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::CompilationUnit { .. }
            | NodeKind::Import { .. }
            | NodeKind::Class { .. }
            | NodeKind::EnumConstant { .. }
            | NodeKind::Method { .. }
            | NodeKind::Variable { .. } => NodeCategory::Declaration,
            NodeKind::Block { .. }
            | NodeKind::Return { .. }
            | NodeKind::If { .. }
            | NodeKind::Throw { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::Empty => NodeCategory::Statement,
            NodeKind::TypeRef { .. } | NodeKind::Wildcard { .. } => NodeCategory::Type,
            NodeKind::Modifiers { .. } | NodeKind::Annotation { .. } => NodeCategory::Other,
            NodeKind::Literal(_)
            | NodeKind::Ident { .. }
            | NodeKind::FieldAccess { .. }
            | NodeKind::ClassLiteral { .. }
            | NodeKind::MethodCall { .. }
            | NodeKind::MethodRef { .. }
            | NodeKind::New { .. }
            | NodeKind::Lambda { .. }
            | NodeKind::Unary { .. }
            | NodeKind::Binary { .. }
            | NodeKind::Conditional { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Parens { .. }
            | NodeKind::Cast { .. }
            | NodeKind::ArrayInit { .. }
            | NodeKind::Index { .. }
            | NodeKind::This => NodeCategory::Expression,
        }
    }

    pub fn is_expression(&self) -> bool {
        self.category() == NodeCategory::Expression
    }

    /// A short, stable name for the variant, used in logs and tree dumps.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::CompilationUnit { .. } => "CompilationUnit",
            NodeKind::Import { .. } => "Import",
            NodeKind::Class { .. } => "Class",
            NodeKind::EnumConstant { .. } => "EnumConstant",
            NodeKind::Modifiers { .. } => "Modifiers",
            NodeKind::Method { .. } => "Method",
            NodeKind::Variable { .. } => "Variable",
            NodeKind::TypeRef { .. } => "TypeRef",
            NodeKind::Wildcard { .. } => "Wildcard",
            NodeKind::Annotation { .. } => "Annotation",
            NodeKind::Block { .. } => "Block",
            NodeKind::Return { .. } => "Return",
            NodeKind::If { .. } => "If",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::Empty => "Empty",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Ident { .. } => "Ident",
            NodeKind::FieldAccess { .. } => "FieldAccess",
            NodeKind::ClassLiteral { .. } => "ClassLiteral",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::MethodRef { .. } => "MethodRef",
            NodeKind::New { .. } => "New",
            NodeKind::Lambda { .. } => "Lambda",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Parens { .. } => "Parens",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::ArrayInit { .. } => "ArrayInit",
            NodeKind::Index { .. } => "Index",
            NodeKind::This => "This",
        }
    }
}

impl Tree {
    /// The file name the tree was parsed from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shared_source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Iterates over the strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// All nodes below `id` (inclusive) in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// All node ids of the tree in pre-order from the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// The original source text of a positioned node.
    pub fn source_of(&self, id: NodeId) -> Option<&str> {
        let span = self.span(id)?;
        self.source.get(span.start..span.end)
    }

    /// The source text of an arbitrary span, if it lies within the file.
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.source.get(span.start..span.end)
    }

    /// Members of a class declaration, or an empty slice for other nodes.
    pub fn members(&self, class: NodeId) -> &[NodeId] {
        match self.kind(class) {
            NodeKind::Class { members, .. } => members,
            _ => &[],
        }
    }

    /// Annotations attached to a declaration (class, method or variable).
    pub fn annotations_of(&self, decl: NodeId) -> &[NodeId] {
        match self.modifiers_of(decl).map(|m| self.kind(m)) {
            Some(NodeKind::Modifiers { annotations, .. }) => annotations,
            _ => &[],
        }
    }

    /// The modifiers node of a declaration.
    pub fn modifiers_of(&self, decl: NodeId) -> Option<NodeId> {
        match self.kind(decl) {
            NodeKind::Class { modifiers, .. }
            | NodeKind::Method { modifiers, .. }
            | NodeKind::Variable { modifiers, .. } => Some(*modifiers),
            _ => None,
        }
    }

    /// Whether a declaration carries the given modifier keyword.
    pub fn has_modifier(&self, decl: NodeId, modifier: Modifier) -> bool {
        match self.modifiers_of(decl).map(|m| self.kind(m)) {
            Some(NodeKind::Modifiers { keywords, .. }) => {
                keywords.iter().any(|k| k.modifier == modifier)
            }
            _ => false,
        }
    }

    /// The declared name of a class, method or variable.
    pub fn decl_name(&self, decl: NodeId) -> Option<&str> {
        match self.kind(decl) {
            NodeKind::Class { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::Variable { name, .. }
            | NodeKind::EnumConstant { name } => Some(name),
            _ => None,
        }
    }

    /// Imports declared by the compilation unit.
    pub fn imports(&self) -> Vec<NodeId> {
        match self.kind(self.root) {
            NodeKind::CompilationUnit { imports, .. } => imports.clone(),
            _ => vec![],
        }
    }

    pub fn package(&self) -> Option<&str> {
        match self.kind(self.root) {
            NodeKind::CompilationUnit { package, .. } => package.as_deref(),
            _ => None,
        }
    }

    /// Statements of a method body, or an empty slice when the method has none.
    pub fn body_statements(&self, method: NodeId) -> &[NodeId] {
        let body = match self.kind(method) {
            NodeKind::Method { body: Some(body), .. } => *body,
            _ => return &[],
        };
        match self.kind(body) {
            NodeKind::Block { statements } => statements,
            _ => &[],
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn skip_parens(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Parens { expr } = self.kind(id) {
            id = *expr;
        }
        id
    }
}

// ============================================================================
// BUILDER INFRASTRUCTURE
// ============================================================================

/// Incrementally assembles a [`Tree`]; parents are linked when the tree is finished.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id. Children must already have been added.
    pub fn add(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.nodes[id.index()].span
    }

    /// Links parents below `root` and freezes the tree.
    pub fn finish(
        mut self,
        name: impl Into<String>,
        source: impl Into<Arc<str>>,
        root: NodeId,
    ) -> Tree {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for child in self.nodes[current.index()].kind.children() {
                self.nodes[child.index()].parent = Some(current);
                stack.push(child);
            }
        }
        Tree {
            name: name.into(),
            source: source.into(),
            nodes: self.nodes,
            root,
        }
    }
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod pretty;
