//! Pretty printing for syntax trees.
//!
//! [`format_tree`] renders a whole compilation unit in a Google-like layout: two space
//! indentation, sorted imports with the static block first, declaration annotations on
//! their own lines and at most one preserved blank line between members or statements.
//! Lines are never wrapped. Comments are carried over when they precede a member or
//! statement, trail one on the same line, or precede a closing brace; any other comment
//! makes the layout fail with [`FormatError::UnplacedComment`].
//!
//! [`node_to_string`] renders a single node without comments and is what fix
//! synthesis falls back to for synthetic nodes.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::ast::{Literal, NodeId, NodeKind, Span, Tree, TypeDeclKind, WildcardBound};
use crate::resolve::{comments_between, Comment};

const INDENT: &str = "  ";

// ============================================================================
// PUBLIC API
// ============================================================================

/// Layout options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Drop single-type and static imports whose simple name is never referenced.
    pub remove_unused_imports: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The input could not be parsed; the message carries the position.
    #[error("{0}")]
    Malformed(String),
    /// A comment sits somewhere the printer cannot reproduce it.
    #[error("cannot place comment `{0}`")]
    UnplacedComment(String),
}

/// Formats a compilation unit.
pub fn format_tree(tree: &Tree, options: &FormatOptions) -> Result<String, FormatError> {
    let mut printer = Printer::new(tree, true);
    printer.compilation_unit(options)?;
    printer.finish()
}

/// Renders one node (expression, type, statement or declaration) without comments.
pub fn node_to_string(tree: &Tree, id: NodeId) -> String {
    let mut printer = Printer::new(tree, false);
    let result = match tree.kind(id) {
        NodeKind::Class { .. } | NodeKind::Method { .. } => printer.member(id, 0, false),
        NodeKind::Block { .. }
        | NodeKind::Return { .. }
        | NodeKind::If { .. }
        | NodeKind::Throw { .. }
        | NodeKind::ExprStmt { .. }
        | NodeKind::Empty => printer.statement(id, 0),
        _ => {
            printer.expression(id, 0);
            Ok(())
        }
    };
    // Errors only come from comment placement, which is off here.
    debug_assert!(result.is_ok());
    printer.out.trim_end_matches('\n').to_string()
}

/// A structural dump of the tree, one node per line.
pub fn dump_tree(tree: &Tree) -> String {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, &mut out);
    out
}

/// Simple names referenced anywhere outside import declarations.
pub fn referenced_names(tree: &Tree) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for id in tree.preorder() {
        match tree.kind(id) {
            NodeKind::Ident { name } => {
                names.insert(name.clone());
            }
            NodeKind::TypeRef { name, .. } | NodeKind::Annotation { name, .. } => {
                names.insert(first_segment(name).to_string());
            }
            NodeKind::MethodCall {
                target: None, name, ..
            } => {
                names.insert(name.clone());
            }
            _ => {}
        }
    }
    names
}

/// A Java string literal for `value`.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// PRINTER
// ============================================================================

struct Printer<'t> {
    tree: &'t Tree,
    out: String,
    comments: Vec<Comment>,
    next_comment: usize,
    last_end: usize,
}

impl<'t> Printer<'t> {
    fn new(tree: &'t Tree, track_comments: bool) -> Self {
        let comments = if track_comments {
            comments_between(tree.source(), 0, tree.source().len())
        } else {
            Vec::new()
        };
        Self {
            tree,
            out: String::new(),
            comments,
            next_comment: 0,
            last_end: 0,
        }
    }

    fn finish(mut self) -> Result<String, FormatError> {
        let trailing = self.take_comments(self.tree.source().len())?;
        if !trailing.is_empty() {
            self.blank_line();
            for comment in &trailing {
                self.comment_lines(comment, 0);
            }
        }
        if let Some(comment) = self.comments.get(self.next_comment) {
            return Err(FormatError::UnplacedComment(comment.text.clone()));
        }
        let trimmed = self.out.trim_end_matches('\n');
        Ok(if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}\n")
        })
    }

    // ------------------------------------------------------------------------
    // Comments and spacing
    // ------------------------------------------------------------------------

    /// Takes pending comments that end before `offset`. A pending comment that starts
    /// inside the previously printed item cannot be placed.
    fn take_comments(&mut self, offset: usize) -> Result<Vec<Comment>, FormatError> {
        let mut taken = Vec::new();
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.span.end > offset {
                break;
            }
            if comment.span.start < self.last_end {
                return Err(FormatError::UnplacedComment(comment.text.clone()));
            }
            taken.push(comment.clone());
            self.next_comment += 1;
        }
        Ok(taken)
    }

    fn has_blank_line(&self, from: usize, to: usize) -> bool {
        self.tree
            .source()
            .get(from..to)
            .is_some_and(|gap| gap.matches('\n').count() >= 2)
    }

    fn is_same_line(&self, from: usize, to: usize) -> bool {
        self.tree
            .source()
            .get(from..to)
            .is_some_and(|gap| !gap.contains('\n'))
    }

    /// Emits comments preceding an item and, when allowed, a blank line that was
    /// present in the source.
    fn leading_trivia(
        &mut self,
        span: Option<Span>,
        indent: usize,
        allow_blank: bool,
    ) -> Result<(), FormatError> {
        let Some(span) = span else {
            return Ok(());
        };
        let comments = self.take_comments(span.start)?;
        let mut from = self.last_end;
        let mut first = true;
        for comment in &comments {
            if self.last_end > 0 && first && self.is_same_line(self.last_end, comment.span.start) {
                self.append_trailing(comment);
            } else {
                if (allow_blank || !first) && self.has_blank_line(from, comment.span.start) {
                    self.blank_line();
                }
                self.comment_lines(comment, indent);
            }
            from = comment.span.end;
            first = false;
        }
        if (allow_blank || !comments.is_empty()) && self.has_blank_line(from, span.start) {
            self.blank_line();
        }
        Ok(())
    }

    fn finish_item(&mut self, span: Option<Span>) {
        if let Some(span) = span {
            self.last_end = self.last_end.max(span.end);
        }
    }

    /// Comments between the last item and a closing brace at `close`.
    fn closing_trivia(&mut self, close: usize, indent: usize) -> Result<(), FormatError> {
        let comments = self.take_comments(close)?;
        let mut first = true;
        for comment in &comments {
            if first && self.last_end > 0 && self.is_same_line(self.last_end, comment.span.start) {
                self.append_trailing(comment);
            } else {
                self.comment_lines(comment, indent);
            }
            first = false;
        }
        Ok(())
    }

    fn append_trailing(&mut self, comment: &Comment) {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out.push(' ');
        self.out.push_str(comment.text.trim());
        self.out.push('\n');
    }

    fn comment_lines(&mut self, comment: &Comment, indent: usize) {
        for (i, line) in comment.text.lines().enumerate() {
            let line = line.trim();
            self.push_indent(indent);
            if i > 0 && line.starts_with('*') {
                self.out.push(' ');
            }
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn push_indent(&mut self, indent: usize) {
        for _ in 0..indent {
            self.out.push_str(INDENT);
        }
    }

    // ------------------------------------------------------------------------
    // Compilation unit
    // ------------------------------------------------------------------------

    fn compilation_unit(&mut self, options: &FormatOptions) -> Result<(), FormatError> {
        let tree = self.tree;
        let NodeKind::CompilationUnit {
            package,
            imports,
            types,
        } = tree.kind(tree.root())
        else {
            return Ok(());
        };

        let header_end = imports
            .first()
            .or(types.first())
            .and_then(|id| tree.span(*id))
            .map_or(tree.source().len(), |span| span.start);
        let header = self.take_comments(header_end)?;
        for comment in &header {
            self.comment_lines(comment, 0);
        }
        if !header.is_empty() {
            self.blank_line();
        }

        if let Some(package) = package {
            self.out.push_str(&format!("package {package};\n"));
        }

        let imports_end = imports.last().and_then(|i| tree.span(*i)).map(|s| s.end);
        if let Some(end) = imports_end {
            if let Some(comment) = self.take_comments(end)?.first() {
                return Err(FormatError::UnplacedComment(comment.text.clone()));
            }
        }

        let used = options
            .remove_unused_imports
            .then(|| referenced_names(tree));
        let mut static_imports = BTreeSet::new();
        let mut regular_imports = BTreeSet::new();
        for import in imports {
            if let NodeKind::Import {
                path,
                is_static,
                wildcard,
            } = tree.kind(*import)
            {
                if let Some(used) = &used {
                    if !*wildcard && !used.contains(last_segment(path)) {
                        continue;
                    }
                }
                let rendered = if *wildcard {
                    format!("{path}.*")
                } else {
                    path.clone()
                };
                if *is_static {
                    static_imports.insert(rendered);
                } else {
                    regular_imports.insert(rendered);
                }
            }
            self.finish_item(tree.span(*import));
        }

        if !static_imports.is_empty() {
            self.blank_line();
            for import in &static_imports {
                self.out.push_str(&format!("import static {import};\n"));
            }
        }
        if !regular_imports.is_empty() {
            self.blank_line();
            for import in &regular_imports {
                self.out.push_str(&format!("import {import};\n"));
            }
        }

        for ty in types {
            self.blank_line();
            let comments = self.take_comments(tree.span(*ty).map_or(0, |s| s.start))?;
            for comment in &comments {
                self.comment_lines(comment, 0);
            }
            self.member(*ty, 0, false)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn member(&mut self, id: NodeId, indent: usize, allow_blank: bool) -> Result<(), FormatError> {
        let tree = self.tree;
        self.leading_trivia(tree.span(id), indent, allow_blank)?;
        match tree.kind(id) {
            NodeKind::Class {
                kind,
                name,
                modifiers,
                type_params,
                extends,
                implements,
                members,
                ..
            } => {
                self.declaration_annotations(*modifiers, indent);
                self.push_indent(indent);
                self.keyword_prefix(*modifiers);
                self.out.push_str(kind.keyword());
                self.out.push(' ');
                self.out.push_str(name);
                self.type_params(type_params);
                if !extends.is_empty() {
                    self.out.push_str(" extends ");
                    self.type_list(extends);
                }
                if !implements.is_empty() {
                    self.out.push_str(" implements ");
                    self.type_list(implements);
                }
                let close = tree.span(id).map(|s| s.end.saturating_sub(1));
                self.class_body(*kind, members, close, indent)?;
            }
            NodeKind::Method {
                name,
                modifiers,
                type_params,
                return_type,
                params,
                throws,
                body,
                default_value,
                ..
            } => {
                self.declaration_annotations(*modifiers, indent);
                self.push_indent(indent);
                self.keyword_prefix(*modifiers);
                if !type_params.is_empty() {
                    self.type_params(type_params);
                    self.out.push(' ');
                }
                if let Some(return_type) = return_type {
                    self.type_ref(*return_type);
                    self.out.push(' ');
                }
                self.out.push_str(name);
                self.out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.variable(*param, indent);
                }
                self.out.push(')');
                if !throws.is_empty() {
                    self.out.push_str(" throws ");
                    self.type_list(throws);
                }
                match body {
                    Some(body) => {
                        self.out.push(' ');
                        self.block(*body, indent)?;
                        self.out.push('\n');
                    }
                    None => {
                        if let Some(value) = default_value {
                            self.out.push_str(" default ");
                            self.expression(*value, indent);
                        }
                        self.out.push_str(";\n");
                    }
                }
            }
            NodeKind::Variable { modifiers, .. } => {
                self.declaration_annotations(*modifiers, indent);
                self.push_indent(indent);
                self.variable_without_annotations(id, indent);
                self.out.push_str(";\n");
            }
            NodeKind::EnumConstant { name } => {
                self.push_indent(indent);
                self.out.push_str(name);
                self.out.push('\n');
            }
            _ => {
                self.push_indent(indent);
                self.expression(id, indent);
                self.out.push('\n');
            }
        }
        self.finish_item(tree.span(id));
        Ok(())
    }

    fn class_body(
        &mut self,
        kind: TypeDeclKind,
        members: &[NodeId],
        close: Option<usize>,
        indent: usize,
    ) -> Result<(), FormatError> {
        let tree = self.tree;
        let has_inner_comments = close.is_some_and(|close| {
            self.comments
                .get(self.next_comment)
                .is_some_and(|c| c.span.end <= close)
        });
        if members.is_empty() && !has_inner_comments {
            self.out.push_str(" {}\n");
            return Ok(());
        }
        self.out.push_str(" {\n");

        let constants: Vec<NodeId> = members
            .iter()
            .copied()
            .filter(|m| matches!(tree.kind(*m), NodeKind::EnumConstant { .. }))
            .collect();
        let others: Vec<NodeId> = members
            .iter()
            .copied()
            .filter(|m| !matches!(tree.kind(*m), NodeKind::EnumConstant { .. }))
            .collect();

        if kind == TypeDeclKind::Enum && !constants.is_empty() {
            for (i, constant) in constants.iter().enumerate() {
                self.leading_trivia(tree.span(*constant), indent + 1, false)?;
                self.push_indent(indent + 1);
                self.out.push_str(tree.decl_name(*constant).unwrap_or_default());
                if i + 1 < constants.len() {
                    self.out.push(',');
                } else if !others.is_empty() {
                    self.out.push(';');
                }
                self.out.push('\n');
                self.finish_item(tree.span(*constant));
            }
        }

        for (i, member) in others.iter().enumerate() {
            let allow_blank = i > 0 || !constants.is_empty();
            self.member(*member, indent + 1, allow_blank)?;
        }
        if let Some(close) = close {
            self.closing_trivia(close, indent + 1)?;
        }
        self.push_indent(indent);
        self.out.push_str("}\n");
        Ok(())
    }

    fn declaration_annotations(&mut self, modifiers: NodeId, indent: usize) {
        if let NodeKind::Modifiers { annotations, .. } = self.tree.kind(modifiers) {
            for annotation in annotations {
                self.push_indent(indent);
                self.expression(*annotation, indent);
                self.out.push('\n');
            }
        }
    }

    fn keyword_prefix(&mut self, modifiers: NodeId) {
        if let NodeKind::Modifiers { keywords, .. } = self.tree.kind(modifiers) {
            for keyword in keywords {
                self.out.push_str(keyword.modifier.as_str());
                self.out.push(' ');
            }
        }
    }

    fn inline_modifiers(&mut self, modifiers: NodeId, indent: usize) {
        if let NodeKind::Modifiers { annotations, .. } = self.tree.kind(modifiers) {
            for annotation in annotations {
                self.expression(*annotation, indent);
                self.out.push(' ');
            }
        }
        self.keyword_prefix(modifiers);
    }

    /// Parameters and local variables: annotations inline.
    fn variable(&mut self, id: NodeId, indent: usize) {
        if let NodeKind::Variable { modifiers, .. } = self.tree.kind(id) {
            if let NodeKind::Modifiers { annotations, .. } = self.tree.kind(*modifiers) {
                for annotation in annotations {
                    self.expression(*annotation, indent);
                    self.out.push(' ');
                }
            }
        }
        self.variable_without_annotations(id, indent);
    }

    fn variable_without_annotations(&mut self, id: NodeId, indent: usize) {
        if let NodeKind::Variable {
            name,
            modifiers,
            ty,
            init,
            varargs,
            ..
        } = self.tree.kind(id)
        {
            self.keyword_prefix(*modifiers);
            self.type_ref(*ty);
            if *varargs {
                self.out.push_str("...");
            }
            self.out.push(' ');
            self.out.push_str(name);
            if let Some(init) = init {
                self.out.push_str(" = ");
                self.expression(*init, indent);
            }
        }
    }

    fn type_params(&mut self, params: &[String]) {
        if !params.is_empty() {
            self.out.push('<');
            self.out.push_str(&params.join(", "));
            self.out.push('>');
        }
    }

    fn type_list(&mut self, types: &[NodeId]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.type_ref(*ty);
        }
    }

    fn type_ref(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::TypeRef { name, args, dims } => {
                self.out.push_str(name);
                if !args.is_empty() || self.is_diamond(id) {
                    self.out.push('<');
                    self.type_list(args);
                    self.out.push('>');
                }
                for _ in 0..*dims {
                    self.out.push_str("[]");
                }
            }
            NodeKind::Wildcard { bound } => {
                self.out.push('?');
                if let Some((kind, ty)) = bound {
                    self.out.push_str(match kind {
                        WildcardBound::Extends => " extends ",
                        WildcardBound::Super => " super ",
                    });
                    self.type_ref(*ty);
                }
            }
            _ => self.expression(id, 0),
        }
    }

    fn is_diamond(&self, id: NodeId) -> bool {
        self.tree
            .source_of(id)
            .is_some_and(|text| text.trim_end().ends_with("<>"))
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn block(&mut self, id: NodeId, indent: usize) -> Result<(), FormatError> {
        let tree = self.tree;
        let NodeKind::Block { statements } = tree.kind(id) else {
            self.expression(id, indent);
            return Ok(());
        };
        let close = tree.span(id).map(|s| s.end.saturating_sub(1));
        let has_inner_comments = close.is_some_and(|close| {
            self.comments
                .get(self.next_comment)
                .is_some_and(|c| c.span.end <= close)
        });
        if statements.is_empty() && !has_inner_comments {
            self.out.push_str("{}");
            self.finish_item(tree.span(id));
            return Ok(());
        }
        self.out.push_str("{\n");
        for (i, statement) in statements.iter().enumerate() {
            self.leading_trivia(tree.span(*statement), indent + 1, i > 0)?;
            self.push_indent(indent + 1);
            self.statement(*statement, indent + 1)?;
            self.out.push('\n');
            self.finish_item(tree.span(*statement));
        }
        if let Some(close) = close {
            self.closing_trivia(close, indent + 1)?;
        }
        self.push_indent(indent);
        self.out.push('}');
        self.finish_item(tree.span(id));
        Ok(())
    }

    /// Writes a statement starting at the current column, without a trailing newline.
    fn statement(&mut self, id: NodeId, indent: usize) -> Result<(), FormatError> {
        match self.tree.kind(id) {
            NodeKind::Block { .. } => self.block(id, indent)?,
            NodeKind::Variable { .. } => {
                self.variable(id, indent);
                self.out.push(';');
            }
            NodeKind::ExprStmt { expr } => {
                self.expression(*expr, indent);
                self.out.push(';');
            }
            NodeKind::Return { expr } => {
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    self.expression(*expr, indent);
                }
                self.out.push(';');
            }
            NodeKind::Throw { expr } => {
                self.out.push_str("throw ");
                self.expression(*expr, indent);
                self.out.push(';');
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.expression(*cond, indent);
                self.out.push_str(") ");
                self.statement(*then_branch, indent)?;
                if let Some(else_branch) = else_branch {
                    self.out.push_str(" else ");
                    self.statement(*else_branch, indent)?;
                }
            }
            NodeKind::Empty => self.out.push(';'),
            _ => self.expression(id, indent),
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expression(&mut self, id: NodeId, indent: usize) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Literal(literal) => match tree.source_of(id) {
                Some(text) => self.out.push_str(text),
                None => self.out.push_str(&literal_to_string(literal)),
            },
            NodeKind::Ident { name } => self.out.push_str(name),
            NodeKind::FieldAccess { target, name } => {
                self.expression(*target, indent);
                self.out.push('.');
                self.out.push_str(name);
            }
            NodeKind::ClassLiteral { ty } => {
                self.type_ref(*ty);
                self.out.push_str(".class");
            }
            NodeKind::MethodCall {
                target, name, args, ..
            } => {
                if let Some(target) = target {
                    self.expression(*target, indent);
                    self.out.push('.');
                }
                self.out.push_str(name);
                self.arguments(args, indent);
            }
            NodeKind::MethodRef { target, name } => {
                self.expression(*target, indent);
                self.out.push_str("::");
                self.out.push_str(name);
            }
            NodeKind::New { ty, args } => {
                self.out.push_str("new ");
                self.type_ref(*ty);
                self.arguments(args, indent);
            }
            NodeKind::Lambda { params, body } => {
                if params.len() == 1 {
                    self.out.push_str(&params[0].name);
                } else {
                    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                    self.out.push('(');
                    self.out.push_str(&names.join(", "));
                    self.out.push(')');
                }
                self.out.push_str(" -> ");
                if matches!(tree.kind(*body), NodeKind::Block { .. }) {
                    // Comment tracking only fails for misplaced comments, which
                    // `format_tree` reports when finishing.
                    let _ = self.block(*body, indent);
                } else {
                    self.expression(*body, indent);
                }
            }
            NodeKind::Unary { op, operand } => {
                self.out.push_str(op.as_str());
                self.expression(*operand, indent);
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.expression(*lhs, indent);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expression(*rhs, indent);
            }
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expression(*cond, indent);
                self.out.push_str(" ? ");
                self.expression(*then_expr, indent);
                self.out.push_str(" : ");
                self.expression(*else_expr, indent);
            }
            NodeKind::Assign { target, value } => {
                self.expression(*target, indent);
                self.out.push_str(" = ");
                self.expression(*value, indent);
            }
            NodeKind::Parens { expr } => {
                self.out.push('(');
                self.expression(*expr, indent);
                self.out.push(')');
            }
            NodeKind::Cast { ty, expr } => {
                self.out.push('(');
                self.type_ref(*ty);
                self.out.push_str(") ");
                self.expression(*expr, indent);
            }
            NodeKind::ArrayInit { elements } => {
                self.out.push('{');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expression(*element, indent);
                }
                self.out.push('}');
            }
            NodeKind::Index { target, index } => {
                self.expression(*target, indent);
                self.out.push('[');
                self.expression(*index, indent);
                self.out.push(']');
            }
            NodeKind::This => self.out.push_str("this"),
            NodeKind::Annotation { name, args } => {
                self.out.push('@');
                self.out.push_str(name);
                if !args.is_empty() {
                    self.arguments(args, indent);
                }
            }
            NodeKind::TypeRef { .. } | NodeKind::Wildcard { .. } => self.type_ref(id),
            NodeKind::Modifiers { .. } => self.inline_modifiers(id, indent),
            NodeKind::Variable { .. } => self.variable(id, indent),
            NodeKind::EnumConstant { name } => self.out.push_str(name),
            NodeKind::Import {
                path,
                is_static,
                wildcard,
            } => {
                self.out.push_str("import ");
                if *is_static {
                    self.out.push_str("static ");
                }
                self.out.push_str(path);
                if *wildcard {
                    self.out.push_str(".*");
                }
                self.out.push(';');
            }
            NodeKind::CompilationUnit { .. }
            | NodeKind::Class { .. }
            | NodeKind::Method { .. }
            | NodeKind::Block { .. }
            | NodeKind::Return { .. }
            | NodeKind::If { .. }
            | NodeKind::Throw { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::Empty => {
                let _ = self.statement(id, indent);
            }
        }
    }

    fn arguments(&mut self, args: &[NodeId], indent: usize) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expression(*arg, indent);
        }
        self.out.push(')');
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn first_segment(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn literal_to_string(literal: &Literal) -> String {
    match literal {
        Literal::Int(value) => value.to_string(),
        Literal::Long(value) => format!("{value}L"),
        Literal::Float(value) => format!("{value:?}f"),
        Literal::Double(value) => format!("{value:?}"),
        Literal::Char(value) => match value {
            '\'' => "'\\''".to_string(),
            '\\' => "'\\\\'".to_string(),
            '\n' => "'\\n'".to_string(),
            '\t' => "'\\t'".to_string(),
            c => format!("'{c}'"),
        },
        Literal::String(value) => string_literal(value),
        Literal::Bool(value) => value.to_string(),
        Literal::Null => "null".to_string(),
    }
}

fn dump_node(tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
    let kind = tree.kind(id);
    out.push_str(&INDENT.repeat(depth));
    out.push_str(kind.name());
    if let Some(span) = tree.span(id) {
        out.push_str(&format!(" [{}..{}]", span.start, span.end));
    }
    let detail = match kind {
        NodeKind::CompilationUnit {
            package: Some(package),
            ..
        } => format!(" package={package}"),
        NodeKind::Import {
            path, is_static, ..
        } => format!(" {}{path}", if *is_static { "static " } else { "" }),
        NodeKind::Class { kind, name, .. } => format!(" {} {name}", kind.keyword()),
        NodeKind::Modifiers { keywords, .. } => {
            let words: Vec<&str> = keywords.iter().map(|k| k.modifier.as_str()).collect();
            if words.is_empty() {
                String::new()
            } else {
                format!(" {}", words.join(" "))
            }
        }
        NodeKind::Method { name, .. }
        | NodeKind::Variable { name, .. }
        | NodeKind::TypeRef { name, .. }
        | NodeKind::Annotation { name, .. }
        | NodeKind::Ident { name }
        | NodeKind::FieldAccess { name, .. }
        | NodeKind::MethodCall { name, .. }
        | NodeKind::MethodRef { name, .. }
        | NodeKind::EnumConstant { name } => format!(" {name}"),
        NodeKind::Literal(literal) => format!(" {}", literal_to_string(literal)),
        NodeKind::Unary { op, .. } => format!(" {}", op.as_str()),
        NodeKind::Binary { op, .. } => format!(" {}", op.as_str()),
        NodeKind::Lambda { params, .. } => {
            let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            format!(" ({})", names.join(", "))
        }
        _ => String::new(),
    };
    out.push_str(&detail);
    out.push('\n');
    for child in kind.children() {
        dump_node(tree, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;

    fn format(source: &str, remove_unused_imports: bool) -> Result<String, FormatError> {
        let tree = parse_compilation_unit("A.java", source).unwrap();
        format_tree(
            &tree,
            &FormatOptions {
                remove_unused_imports,
            },
        )
    }

    #[test]
    fn formats_class_with_sorted_imports() {
        let source = "import java.util.Map;import static org.junit.Assert.assertTrue;import java.util.List;\nclass A{ List<String> a; Map<String,Integer> b;  void f( ){assertTrue(true);} }";
        let expected = "\
import static org.junit.Assert.assertTrue;

import java.util.List;
import java.util.Map;

class A {
  List<String> a;
  Map<String, Integer> b;
  void f() {
    assertTrue(true);
  }
}
";
        assert_eq!(format(source, false).unwrap(), expected);
    }

    #[test]
    fn formatting_is_idempotent() {
        let source = "package p;\n\nimport java.util.List;\n\n/** Doc. */\nfinal class A {\n  // Leading.\n  @Test\n  void f() {\n    int x = 1; // Trailing.\n\n    if (x > 0) {\n      g(y -> y + 1);\n    } else return;\n  }\n}\n";
        let once = format(source, false).unwrap();
        let twice = format(&once, false).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("int x = 1; // Trailing.\n\n    if (x > 0) {"));
    }

    #[test]
    fn removes_unused_imports_when_asked() {
        let source = "import java.util.List;\nimport java.util.Map;\nclass A { List<String> a; }\n";
        let formatted = format(source, true).unwrap();
        assert!(formatted.contains("import java.util.List;"));
        assert!(!formatted.contains("Map"));
    }

    #[test]
    fn comments_inside_expressions_cannot_be_placed() {
        let source = "class A { void f() { g(/* arg */ 1); } }";
        assert!(matches!(
            format(source, false),
            Err(FormatError::UnplacedComment(_))
        ));
    }

    #[test]
    fn string_literals_escape_quotes_and_newlines() {
        assert_eq!(string_literal("a\"b\n"), "\"a\\\"b\\n\"");
    }
}
