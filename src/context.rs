//! The analysis context handed to checkers and template rules.
//!
//! An [`AnalysisContext`] pairs a tree with the node currently being visited and with
//! what the host knows about types: a [`TypeTable`] of meta annotations, supertypes,
//! method return types, static fields and enum constants. The context is `Copy` and
//! scoped to one matching attempt; moving it to another node is [`AnalysisContext::at`].
//!
//! ## Core Principles
//! - Names resolve the way `javac` would for the supported subset: single-type
//!   imports, types declared in the file, `java.lang`, on-demand imports of known
//!   types, then the file's own package.
//! - Unknown types are `None`, never a guess; callers abstain.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::ast::{BinaryOp, Literal, NodeId, NodeKind, Tree, TypeDeclKind, UnaryOp};
use crate::resolve::{find_enclosing, EnclosingKind};

pub use crate::config::{Flags, LanguageLevel};

// ============================================================================
// PRIMITIVES
// ============================================================================

pub const PRIMITIVES: [&str; 8] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

pub fn is_primitive(ty: &str) -> bool {
    PRIMITIVES.contains(&ty)
}

/// The wrapper class of a primitive type.
pub fn boxed_type(primitive: &str) -> Option<&'static str> {
    Some(match primitive {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "char" => "java.lang.Character",
        "short" => "java.lang.Short",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "float" => "java.lang.Float",
        "double" => "java.lang.Double",
        _ => return None,
    })
}

/// The primitive type wrapped by a boxed type.
pub fn unboxed_type(boxed: &str) -> Option<&'static str> {
    PRIMITIVES
        .iter()
        .copied()
        .find(|primitive| boxed_type(primitive) == Some(boxed))
}

pub fn is_primitive_or_boxed(ty: &str) -> bool {
    is_primitive(ty) || unboxed_type(ty).is_some()
}

const JAVA_LANG: &[&str] = &[
    "Boolean", "Byte", "Character", "CharSequence", "Class", "Comparable", "Double",
    "Enum", "Exception", "Float", "IllegalArgumentException", "IllegalStateException",
    "Integer", "Iterable", "Long", "Math", "Number", "Object", "Override", "Runnable",
    "RuntimeException", "Short", "String", "StringBuilder", "SuppressWarnings", "System",
    "Throwable", "Void",
];

// ============================================================================
// TYPE TABLE
// ============================================================================

/// Host supplied knowledge about library types, keyed by fully qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    meta_annotations: HashMap<String, BTreeSet<String>>,
    supertypes: HashMap<String, Vec<String>>,
    methods: HashMap<String, HashMap<String, String>>,
    fields: HashMap<String, HashMap<String, String>>,
    enums: HashMap<String, BTreeSet<String>>,
    known: BTreeSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that annotation type `annotation` is itself annotated with `meta`.
    pub fn with_meta_annotation(mut self, annotation: &str, meta: &str) -> Self {
        self.known.insert(annotation.to_string());
        self.known.insert(meta.to_string());
        self.meta_annotations
            .entry(annotation.to_string())
            .or_default()
            .insert(meta.to_string());
        self
    }

    pub fn with_supertypes(mut self, ty: &str, supertypes: &[&str]) -> Self {
        self.known.insert(ty.to_string());
        self.known.extend(supertypes.iter().map(|s| s.to_string()));
        self.supertypes
            .entry(ty.to_string())
            .or_default()
            .extend(supertypes.iter().map(|s| s.to_string()));
        self
    }

    /// Declares methods of `owner` by name and erased return type.
    pub fn with_methods(mut self, owner: &str, methods: &[(&str, &str)]) -> Self {
        self.known.insert(owner.to_string());
        let entry = self.methods.entry(owner.to_string()).or_default();
        for (name, returns) in methods {
            entry.insert(name.to_string(), returns.to_string());
        }
        self
    }

    /// Declares static fields of `owner` by name and type.
    pub fn with_fields(mut self, owner: &str, fields: &[(&str, &str)]) -> Self {
        self.known.insert(owner.to_string());
        let entry = self.fields.entry(owner.to_string()).or_default();
        for (name, ty) in fields {
            entry.insert(name.to_string(), ty.to_string());
        }
        self
    }

    pub fn with_enum(mut self, ty: &str, constants: &[&str]) -> Self {
        self.known.insert(ty.to_string());
        self.enums
            .entry(ty.to_string())
            .or_default()
            .extend(constants.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_type(mut self, ty: &str) -> Self {
        self.known.insert(ty.to_string());
        self
    }

    pub fn is_known(&self, ty: &str) -> bool {
        self.known.contains(ty)
    }

    /// Whether `annotation` carries `meta`, directly or through another annotation.
    pub fn has_meta_annotation(&self, annotation: &str, meta: &str) -> bool {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([annotation]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(metas) = self.meta_annotations.get(current) {
                if metas.contains(meta) {
                    return true;
                }
                queue.extend(metas.iter().map(String::as_str));
            }
        }
        false
    }

    /// Reflexive, transitive subtype check; every reference type extends `Object`.
    pub fn is_subtype(&self, ty: &str, of: &str) -> bool {
        if ty == of || (of == "java.lang.Object" && !is_primitive(ty)) {
            return true;
        }
        self.supertypes_of(ty).iter().any(|s| s == of)
    }

    /// All supertypes of `ty`, nearest first, without `ty` itself.
    pub fn supertypes_of(&self, ty: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([ty]);
        while let Some(current) = queue.pop_front() {
            for supertype in self.supertypes.get(current).into_iter().flatten() {
                if !out.contains(supertype) {
                    out.push(supertype.clone());
                    queue.push_back(supertype);
                }
            }
        }
        out
    }

    /// The return type of `owner.name(..)`, looked up along the supertype chain.
    pub fn method_return(&self, owner: &str, name: &str) -> Option<&str> {
        std::iter::once(owner.to_string())
            .chain(self.supertypes_of(owner))
            .chain(std::iter::once("java.lang.Object".to_string()))
            .find_map(|ty| self.methods.get(&ty)?.get(name))
            .map(String::as_str)
    }

    pub fn has_method(&self, owner: &str, name: &str) -> bool {
        self.methods
            .get(owner)
            .is_some_and(|methods| methods.contains_key(name))
    }

    pub fn field_type(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields.get(owner)?.get(name).map(String::as_str)
    }

    pub fn is_enum(&self, ty: &str) -> bool {
        self.enums.contains_key(ty)
    }

    pub fn is_enum_constant(&self, ty: &str, name: &str) -> bool {
        self.enums.get(ty).is_some_and(|c| c.contains(name))
    }

    /// Knowledge about the JDK, JUnit 5, Mockito, Guava and Spring types the
    /// bundled checkers and rules talk about.
    pub fn standard() -> Self {
        const OBJECT: &str = "java.lang.Object";
        const STRING: &str = "java.lang.String";
        const STREAM: &str = "java.util.stream.Stream";
        const OPTIONAL: &str = "java.util.Optional";
        const PREDICATE: &str = "java.util.function.Predicate";
        const TEST_TEMPLATE: &str = "org.junit.jupiter.api.TestTemplate";
        const CONFIGURATION: &str = "org.springframework.context.annotation.Configuration";
        const COMPONENT: &str = "org.springframework.stereotype.Component";

        Self::new()
            .with_meta_annotation("org.junit.jupiter.params.ParameterizedTest", TEST_TEMPLATE)
            .with_meta_annotation("org.junit.jupiter.api.RepeatedTest", TEST_TEMPLATE)
            .with_meta_annotation(CONFIGURATION, COMPONENT)
            .with_meta_annotation(
                "org.springframework.boot.test.context.TestConfiguration",
                CONFIGURATION,
            )
            .with_meta_annotation(
                "org.springframework.boot.autoconfigure.SpringBootApplication",
                "org.springframework.boot.SpringBootConfiguration",
            )
            .with_meta_annotation("org.springframework.boot.SpringBootConfiguration", CONFIGURATION)
            .with_type("org.junit.jupiter.api.Test")
            .with_type("org.junit.jupiter.api.BeforeEach")
            .with_type("org.junit.jupiter.api.AfterEach")
            .with_type("org.junit.jupiter.api.BeforeAll")
            .with_type("org.junit.jupiter.api.AfterAll")
            .with_type("org.junit.jupiter.params.provider.MethodSource")
            .with_type("org.junit.jupiter.params.provider.ValueSource")
            .with_supertypes(STRING, &["java.lang.CharSequence", "java.lang.Comparable"])
            .with_supertypes("java.lang.Integer", &["java.lang.Number"])
            .with_supertypes("java.lang.Long", &["java.lang.Number"])
            .with_supertypes("java.lang.Double", &["java.lang.Number"])
            .with_supertypes("java.lang.Float", &["java.lang.Number"])
            .with_supertypes("java.lang.Short", &["java.lang.Number"])
            .with_supertypes("java.lang.Byte", &["java.lang.Number"])
            .with_supertypes(STREAM, &["java.util.stream.BaseStream"])
            .with_supertypes("java.util.stream.IntStream", &["java.util.stream.BaseStream"])
            .with_supertypes("java.util.Collection", &["java.lang.Iterable"])
            .with_supertypes("java.util.List", &["java.util.Collection"])
            .with_supertypes("java.util.Set", &["java.util.Collection"])
            .with_supertypes("java.util.ArrayList", &["java.util.List"])
            .with_supertypes("java.util.HashSet", &["java.util.Set"])
            .with_supertypes(
                "com.google.common.collect.ImmutableCollection",
                &["java.util.Collection"],
            )
            .with_supertypes(
                "com.google.common.collect.ImmutableList",
                &["com.google.common.collect.ImmutableCollection", "java.util.List"],
            )
            .with_supertypes(
                "com.google.common.collect.ImmutableSet",
                &["com.google.common.collect.ImmutableCollection", "java.util.Set"],
            )
            .with_methods(
                OBJECT,
                &[("equals", "boolean"), ("hashCode", "int"), ("toString", STRING)],
            )
            .with_methods(
                STRING,
                &[
                    ("isEmpty", "boolean"),
                    ("length", "int"),
                    ("trim", STRING),
                    ("toLowerCase", STRING),
                    ("toUpperCase", STRING),
                    ("valueOf", STRING),
                    ("format", STRING),
                    ("charAt", "char"),
                ],
            )
            .with_methods("java.lang.Character", &[("valueOf", "java.lang.Character")])
            .with_methods(
                "java.lang.Integer",
                &[("valueOf", "java.lang.Integer"), ("parseInt", "int")],
            )
            .with_methods("java.lang.Long", &[("valueOf", "java.lang.Long"), ("parseLong", "long")])
            .with_methods("java.lang.Boolean", &[("valueOf", "java.lang.Boolean")])
            .with_methods(
                "java.util.Objects",
                &[("equals", "boolean"), ("nonNull", "boolean"), ("isNull", "boolean")],
            )
            .with_methods(
                "java.util.Collection",
                &[("stream", STREAM), ("isEmpty", "boolean"), ("size", "int")],
            )
            .with_methods("java.util.List", &[("of", "java.util.List")])
            .with_methods("java.util.Set", &[("of", "java.util.Set")])
            .with_methods(
                "com.google.common.collect.ImmutableList",
                &[("of", "com.google.common.collect.ImmutableList")],
            )
            .with_methods(
                "com.google.common.collect.ImmutableSet",
                &[("of", "com.google.common.collect.ImmutableSet")],
            )
            .with_methods("java.util.Arrays", &[("stream", STREAM), ("asList", "java.util.List")])
            .with_methods(
                STREAM,
                &[
                    ("of", STREAM),
                    ("empty", STREAM),
                    ("ofNullable", STREAM),
                    ("concat", STREAM),
                    ("filter", STREAM),
                    ("map", STREAM),
                    ("flatMap", STREAM),
                    ("sorted", STREAM),
                    ("distinct", STREAM),
                    ("limit", STREAM),
                    ("skip", STREAM),
                    ("peek", STREAM),
                    ("findFirst", OPTIONAL),
                    ("findAny", OPTIONAL),
                    ("min", OPTIONAL),
                    ("max", OPTIONAL),
                    ("count", "long"),
                    ("anyMatch", "boolean"),
                    ("allMatch", "boolean"),
                    ("noneMatch", "boolean"),
                ],
            )
            .with_methods(
                "com.google.common.collect.Streams",
                &[("concat", STREAM), ("stream", STREAM), ("findLast", OPTIONAL)],
            )
            .with_methods(
                OPTIONAL,
                &[
                    ("of", OPTIONAL),
                    ("ofNullable", OPTIONAL),
                    ("empty", OPTIONAL),
                    ("map", OPTIONAL),
                    ("flatMap", OPTIONAL),
                    ("filter", OPTIONAL),
                    ("stream", STREAM),
                    ("isPresent", "boolean"),
                    ("isEmpty", "boolean"),
                ],
            )
            .with_methods(
                "java.util.stream.Collectors",
                &[
                    ("joining", "java.util.stream.Collector"),
                    ("toList", "java.util.stream.Collector"),
                    ("toSet", "java.util.stream.Collector"),
                ],
            )
            .with_methods(PREDICATE, &[("not", PREDICATE), ("negate", PREDICATE)])
            .with_methods(
                "java.util.Comparator",
                &[
                    ("reversed", "java.util.Comparator"),
                    ("naturalOrder", "java.util.Comparator"),
                    ("reverseOrder", "java.util.Comparator"),
                ],
            )
            .with_methods(
                "org.mockito.Mockito",
                &[
                    ("times", "org.mockito.verification.VerificationMode"),
                    ("never", "org.mockito.verification.VerificationMode"),
                    ("atLeastOnce", "org.mockito.verification.VerificationMode"),
                ],
            )
            .with_methods(
                "org.junit.jupiter.params.provider.Arguments",
                &[
                    ("arguments", "org.junit.jupiter.params.provider.Arguments"),
                    ("of", "org.junit.jupiter.params.provider.Arguments"),
                ],
            )
            .with_methods(
                "com.google.errorprone.CompilationTestHelper",
                &[
                    ("newInstance", "com.google.errorprone.CompilationTestHelper"),
                    ("addSourceLines", "com.google.errorprone.CompilationTestHelper"),
                ],
            )
            .with_methods(
                "com.google.errorprone.BugCheckerRefactoringTestHelper",
                &[
                    ("newInstance", "com.google.errorprone.BugCheckerRefactoringTestHelper"),
                    (
                        "addInputLines",
                        "com.google.errorprone.BugCheckerRefactoringTestHelper.ExpectOutput",
                    ),
                ],
            )
            .with_methods(
                "com.google.errorprone.BugCheckerRefactoringTestHelper.ExpectOutput",
                &[("addOutputLines", "com.google.errorprone.BugCheckerRefactoringTestHelper")],
            )
            .with_fields(
                "java.lang.Boolean",
                &[("TRUE", "java.lang.Boolean"), ("FALSE", "java.lang.Boolean")],
            )
            .with_fields(
                "java.lang.Integer",
                &[("MAX_VALUE", "int"), ("MIN_VALUE", "int")],
            )
            .with_fields("java.lang.Long", &[("MAX_VALUE", "long"), ("MIN_VALUE", "long")])
            .with_enum(
                "java.math.RoundingMode",
                &[
                    "UP",
                    "DOWN",
                    "CEILING",
                    "FLOOR",
                    "HALF_UP",
                    "HALF_DOWN",
                    "HALF_EVEN",
                    "UNNECESSARY",
                ],
            )
            .with_enum(
                "java.util.concurrent.TimeUnit",
                &[
                    "NANOSECONDS",
                    "MICROSECONDS",
                    "MILLISECONDS",
                    "SECONDS",
                    "MINUTES",
                    "HOURS",
                    "DAYS",
                ],
            )
            .with_enum("com.google.common.collect.BoundType", &["OPEN", "CLOSED"])
    }
}

// ============================================================================
// ANALYSIS CONTEXT
// ============================================================================

/// How a simple name in expression position was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableBinding {
    /// A field, parameter or local variable declaration.
    Declared(NodeId),
    /// A lambda parameter; its type is inferred and therefore unknown here.
    LambdaParam,
}

/// The state a checker or rule sees while inspecting one node.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    tree: &'a Tree,
    leaf: NodeId,
    types: &'a TypeTable,
    flags: &'a Flags,
    level: LanguageLevel,
}

impl<'a> AnalysisContext<'a> {
    /// A context positioned at the root of `tree`.
    pub fn new(
        tree: &'a Tree,
        types: &'a TypeTable,
        flags: &'a Flags,
        level: LanguageLevel,
    ) -> Self {
        Self {
            tree,
            leaf: tree.root(),
            types,
            flags,
            level,
        }
    }

    /// The same context, visiting `node`.
    pub fn at(&self, node: NodeId) -> Self {
        Self { leaf: node, ..*self }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn leaf(&self) -> NodeId {
        self.leaf
    }

    pub fn types(&self) -> &'a TypeTable {
        self.types
    }

    pub fn flags(&self) -> &'a Flags {
        self.flags
    }

    pub fn language_level(&self) -> LanguageLevel {
        self.level
    }

    /// The leaf followed by its ancestors up to the compilation unit.
    pub fn path(&self) -> Vec<NodeId> {
        std::iter::once(self.leaf)
            .chain(self.tree.ancestors(self.leaf))
            .collect()
    }

    pub fn find_enclosing(&self, kind: EnclosingKind) -> Option<NodeId> {
        find_enclosing(self.tree, self.leaf, kind)
    }

    pub fn source_for_node(&self, node: NodeId) -> Option<&'a str> {
        self.tree.source_of(node)
    }

    pub fn is_text_block_supported(&self) -> bool {
        self.level.supports_text_blocks()
    }

    // ------------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------------

    /// Resolves a simple or qualified type name as written in this file.
    pub fn resolve_type_name(&self, name: &str) -> String {
        if let Some((first, rest)) = name.split_once('.') {
            return if starts_uppercase(first) {
                format!("{}.{rest}", self.resolve_type_name(first))
            } else {
                name.to_string()
            };
        }
        if is_primitive(name) || name == "void" {
            return name.to_string();
        }
        let imports = self.import_nodes();
        let single = imports.iter().find_map(|(path, is_static, wildcard)| {
            (!is_static && !wildcard && path.rsplit('.').next() == Some(name)).then(|| path.clone())
        });
        if let Some(path) = single {
            return path;
        }
        if let Some(class) = self.declared_class_named(name) {
            return self.class_fqn(class);
        }
        if JAVA_LANG.contains(&name) {
            return format!("java.lang.{name}");
        }
        let on_demand = imports.iter().find_map(|(path, is_static, wildcard)| {
            let candidate = format!("{path}.{name}");
            (!is_static && *wildcard && self.types.is_known(&candidate)).then_some(candidate)
        });
        if let Some(candidate) = on_demand {
            return candidate;
        }
        match self.tree.package() {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }

    /// The owner type of a statically imported member, if `member` is in scope
    /// through a static import.
    pub fn resolve_static_import(&self, member: &str) -> Option<String> {
        let imports = self.import_nodes();
        let single = imports.iter().find_map(|(path, is_static, wildcard)| {
            let (owner, name) = path.rsplit_once('.')?;
            (*is_static && !wildcard && name == member).then(|| owner.to_string())
        });
        single.or_else(|| {
            imports.iter().find_map(|(path, is_static, wildcard)| {
                let declares = self.types.has_method(path, member)
                    || self.types.field_type(path, member).is_some()
                    || self.types.is_enum_constant(path, member);
                (*is_static && *wildcard && declares).then(|| path.clone())
            })
        })
    }

    /// Whether a simple name is in scope through a static import (single or on demand).
    pub fn is_statically_imported(&self, member: &str) -> bool {
        self.resolve_static_import(member).is_some()
    }

    fn import_nodes(&self) -> Vec<(String, bool, bool)> {
        self.tree
            .imports()
            .into_iter()
            .filter_map(|import| match self.tree.kind(import) {
                NodeKind::Import {
                    path,
                    is_static,
                    wildcard,
                } => Some((path.clone(), *is_static, *wildcard)),
                _ => None,
            })
            .collect()
    }

    fn declared_class_named(&self, name: &str) -> Option<NodeId> {
        self.tree.preorder().into_iter().find(
            |id| matches!(self.tree.kind(*id), NodeKind::Class { name: n, .. } if n == name),
        )
    }

    /// The fully qualified name of a class declared in this file.
    pub fn class_fqn(&self, class: NodeId) -> String {
        let mut names: Vec<&str> = std::iter::once(class)
            .chain(self.tree.ancestors(class))
            .filter_map(|id| match self.tree.kind(id) {
                NodeKind::Class { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.reverse();
        let nested = names.join(".");
        match self.tree.package() {
            Some(package) => format!("{package}.{nested}"),
            None => nested,
        }
    }

    /// Binds a simple name used at `at` to a variable in scope.
    pub fn resolve_variable(&self, at: NodeId, name: &str) -> Option<VariableBinding> {
        let tree = self.tree;
        let mut child = at;
        for ancestor in tree.ancestors(at) {
            match tree.kind(ancestor) {
                NodeKind::Block { statements } => {
                    for statement in statements {
                        if *statement == child {
                            break;
                        }
                        if matches!(
                            tree.kind(*statement),
                            NodeKind::Variable { name: n, .. } if n == name
                        ) {
                            return Some(VariableBinding::Declared(*statement));
                        }
                    }
                }
                NodeKind::Method { params, .. } => {
                    if let Some(param) = params.iter().find(|p| tree.decl_name(**p) == Some(name)) {
                        return Some(VariableBinding::Declared(*param));
                    }
                }
                NodeKind::Lambda { params, .. } => {
                    if params.iter().any(|p| p.name == name) {
                        return Some(VariableBinding::LambdaParam);
                    }
                }
                NodeKind::Class { members, .. } => {
                    let field = members.iter().find(|m| {
                        matches!(tree.kind(**m), NodeKind::Variable { name: n, .. } if n == name)
                    });
                    if let Some(field) = field {
                        return Some(VariableBinding::Declared(*field));
                    }
                }
                _ => {}
            }
            child = ancestor;
        }
        None
    }

    /// Interprets an expression made of names (`Foo`, `a.b.Foo`, `Outer.Inner`) as a
    /// type, provided its first name is not a variable in scope.
    pub fn expression_as_type(&self, expr: NodeId) -> Option<String> {
        let dotted = qualified_name(self.tree, expr)?;
        let first = dotted.split('.').next()?;
        if self.resolve_variable(expr, first).is_some() {
            return None;
        }
        if starts_uppercase(first) {
            return Some(self.resolve_type_name(&dotted));
        }
        let last = dotted.rsplit('.').next()?;
        (dotted.contains('.') && starts_uppercase(last)).then_some(dotted)
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    /// The erased type named by a type reference node, with `[]` per dimension.
    pub fn type_ref_name(&self, ty: NodeId) -> Option<String> {
        match self.tree.kind(ty) {
            NodeKind::TypeRef { name, dims, .. } => {
                Some(format!("{}{}", self.resolve_type_name(name), "[]".repeat(*dims)))
            }
            _ => None,
        }
    }

    /// The declared type of a field, parameter or local variable.
    pub fn declared_type(&self, variable: NodeId) -> Option<String> {
        match self.tree.kind(variable) {
            NodeKind::Variable { ty, varargs, .. } => {
                let base = self.type_ref_name(*ty)?;
                Some(if *varargs { format!("{base}[]") } else { base })
            }
            _ => None,
        }
    }

    /// The erased static type of an expression, as far as the type table tells.
    pub fn type_of(&self, expr: NodeId) -> Option<String> {
        let tree = self.tree;
        match tree.kind(expr) {
            NodeKind::Literal(literal) => literal_type(literal).map(str::to_string),
            NodeKind::ClassLiteral { .. } => Some("java.lang.Class".to_string()),
            NodeKind::Ident { name } => match self.resolve_variable(expr, name)? {
                VariableBinding::Declared(variable) => self.declared_type(variable),
                VariableBinding::LambdaParam => None,
            },
            NodeKind::FieldAccess { target, name } => {
                if let Some(owner) = self.expression_as_type(*target) {
                    if self.types.is_enum_constant(&owner, name)
                        || self.is_local_enum_constant(&owner, name)
                    {
                        return Some(owner);
                    }
                    return self.types.field_type(&owner, name).map(str::to_string);
                }
                let target_type = self.type_of(*target)?;
                if name == "length" && target_type.ends_with("[]") {
                    return Some("int".to_string());
                }
                None
            }
            NodeKind::MethodCall { .. } => self.method_call_type(expr),
            NodeKind::New { ty, .. } | NodeKind::Cast { ty, .. } => self.type_ref_name(*ty),
            NodeKind::Parens { expr } => self.type_of(*expr),
            NodeKind::Unary { op, operand } => match op {
                UnaryOp::Not => Some("boolean".to_string()),
                _ => numeric_promotion(&self.type_of(*operand)?, "int"),
            },
            NodeKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge => Some("boolean".to_string()),
                _ => {
                    let lhs = self.type_of(*lhs)?;
                    let rhs = self.type_of(*rhs)?;
                    if *op == BinaryOp::Add
                        && (lhs == "java.lang.String" || rhs == "java.lang.String")
                    {
                        return Some("java.lang.String".to_string());
                    }
                    numeric_promotion(&lhs, &rhs)
                }
            },
            NodeKind::Conditional {
                then_expr,
                else_expr,
                ..
            } => self.type_of(*then_expr).or_else(|| self.type_of(*else_expr)),
            NodeKind::Assign { target, .. } => self.type_of(*target),
            NodeKind::This => {
                find_enclosing(tree, expr, EnclosingKind::Class).map(|class| self.class_fqn(class))
            }
            NodeKind::Index { target, .. } => {
                let array = self.type_of(*target)?;
                array.strip_suffix("[]").map(str::to_string)
            }
            NodeKind::Lambda { .. }
            | NodeKind::MethodRef { .. }
            | NodeKind::ArrayInit { .. } => None,
            NodeKind::CompilationUnit { .. }
            | NodeKind::Import { .. }
            | NodeKind::Class { .. }
            | NodeKind::EnumConstant { .. }
            | NodeKind::Modifiers { .. }
            | NodeKind::Method { .. }
            | NodeKind::Variable { .. }
            | NodeKind::TypeRef { .. }
            | NodeKind::Wildcard { .. }
            | NodeKind::Annotation { .. }
            | NodeKind::Block { .. }
            | NodeKind::Return { .. }
            | NodeKind::If { .. }
            | NodeKind::Throw { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::Empty => None,
        }
    }

    /// The type owning the method invoked by a call, for static calls (qualified by
    /// a type name or statically imported) and instance calls alike.
    pub fn method_owner(&self, call: NodeId) -> Option<MethodOwner> {
        let NodeKind::MethodCall { target, name, .. } = self.tree.kind(call) else {
            return None;
        };
        match target {
            None => match self.resolve_static_import(name) {
                Some(owner) => Some(MethodOwner::Static(owner)),
                None => {
                    let class = find_enclosing(self.tree, call, EnclosingKind::Class)?;
                    Some(MethodOwner::Enclosing(class))
                }
            },
            Some(target) => match self.expression_as_type(*target) {
                Some(owner) => Some(MethodOwner::Static(owner)),
                None => self.type_of(*target).map(MethodOwner::Instance),
            },
        }
    }

    fn method_call_type(&self, call: NodeId) -> Option<String> {
        let NodeKind::MethodCall { name, .. } = self.tree.kind(call) else {
            return None;
        };
        match self.method_owner(call)? {
            MethodOwner::Static(owner) | MethodOwner::Instance(owner) => {
                self.types.method_return(&owner, name).map(str::to_string)
            }
            MethodOwner::Enclosing(class) => {
                let method = std::iter::once(class)
                    .chain(self.tree.ancestors(class))
                    .flat_map(|c| crate::resolve::find_methods(self.tree, c, name))
                    .next()?;
                match self.tree.kind(method) {
                    NodeKind::Method {
                        return_type: Some(ty),
                        ..
                    } => self.type_ref_name(*ty),
                    _ => None,
                }
            }
        }
    }

    fn is_local_enum_constant(&self, owner: &str, name: &str) -> bool {
        self.tree.preorder().into_iter().any(|id| match self.tree.kind(id) {
            NodeKind::Class { members, .. } if self.class_fqn(id) == owner => members.iter().any(
                |m| matches!(self.tree.kind(*m), NodeKind::EnumConstant { name: n } if n == name),
            ),
            _ => false,
        })
    }

    /// Whether `ty` names an enum known to the type table or declared in this file.
    pub fn is_enum(&self, ty: &str) -> bool {
        self.types.is_enum(ty)
            || self.tree.preorder().into_iter().any(|id| {
                matches!(self.tree.kind(id), NodeKind::Class { kind: TypeDeclKind::Enum, .. })
                    && self.class_fqn(id) == ty
            })
    }

    /// Whether the type of `expr` is `ty` or one of its subtypes.
    pub fn is_subtype_of(&self, expr: NodeId, ty: &str) -> bool {
        self.type_of(expr)
            .is_some_and(|actual| self.types.is_subtype(&actual, ty))
    }
}

/// Where an invoked method lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOwner {
    /// A static method of the named type.
    Static(String),
    /// An instance method on a receiver of the named type.
    Instance(String),
    /// An unqualified call to a method of an enclosing class in this file.
    Enclosing(NodeId),
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// `a.b.C` for a chain of names, `None` for anything else.
pub fn qualified_name(tree: &Tree, expr: NodeId) -> Option<String> {
    match tree.kind(expr) {
        NodeKind::Ident { name } => Some(name.clone()),
        NodeKind::FieldAccess { target, name } => {
            Some(format!("{}.{name}", qualified_name(tree, *target)?))
        }
        _ => None,
    }
}

fn literal_type(literal: &Literal) -> Option<&'static str> {
    Some(match literal {
        Literal::Int(_) => "int",
        Literal::Long(_) => "long",
        Literal::Float(_) => "float",
        Literal::Double(_) => "double",
        Literal::Char(_) => "char",
        Literal::String(_) => "java.lang.String",
        Literal::Bool(_) => "boolean",
        Literal::Null => return None,
    })
}

/// Binary numeric promotion of two (possibly boxed) numeric types.
fn numeric_promotion(lhs: &str, rhs: &str) -> Option<String> {
    let rank = |ty: &str| {
        let ty = unboxed_type(ty).unwrap_or(ty);
        match ty {
            "double" => Some(4),
            "float" => Some(3),
            "long" => Some(2),
            "int" | "short" | "byte" | "char" => Some(1),
            _ => None,
        }
    };
    let promoted = match rank(lhs)?.max(rank(rhs)?) {
        4 => "double",
        3 => "float",
        2 => "long",
        _ => "int",
    };
    Some(promoted.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;

    const SOURCE: &str = "package p;\n\nimport java.util.List;\nimport java.util.stream.*;\nimport static org.mockito.Mockito.times;\n\nclass A {\n  static final int LIMIT = 3;\n  boolean f(List<String> list, int[] values) {\n    String s = \"x\";\n    return list.stream().filter(v -> v.isEmpty()).findAny().isPresent() && s + 1 == \"y\";\n  }\n}\n";

    fn find(tree: &Tree, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        tree.preorder().into_iter().find(|id| pred(tree.kind(*id))).unwrap()
    }

    #[test]
    fn names_resolve_through_imports_and_packages() {
        let tree = parse_compilation_unit("A.java", SOURCE).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        assert_eq!(ctx.resolve_type_name("List"), "java.util.List");
        assert_eq!(ctx.resolve_type_name("Stream"), "java.util.stream.Stream");
        assert_eq!(ctx.resolve_type_name("String"), "java.lang.String");
        assert_eq!(ctx.resolve_type_name("A"), "p.A");
        assert_eq!(ctx.resolve_type_name("Unknown"), "p.Unknown");
        assert_eq!(ctx.resolve_static_import("times").as_deref(), Some("org.mockito.Mockito"));
        assert_eq!(ctx.resolve_static_import("never"), None);
    }

    #[test]
    fn method_chains_are_typed_through_the_table() {
        let tree = parse_compilation_unit("A.java", SOURCE).unwrap();
        let types = TypeTable::standard();
        let flags = Flags::empty();
        let ctx = AnalysisContext::new(&tree, &types, &flags, LanguageLevel::default());
        let find_any =
            find(&tree, |k| matches!(k, NodeKind::MethodCall { name, .. } if name == "findAny"));
        assert_eq!(ctx.type_of(find_any).as_deref(), Some("java.util.Optional"));
        let filter =
            find(&tree, |k| matches!(k, NodeKind::MethodCall { name, .. } if name == "filter"));
        assert!(ctx.is_subtype_of(filter, "java.util.stream.BaseStream"));
        let concat = find(&tree, |k| matches!(k, NodeKind::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(ctx.type_of(concat).as_deref(), Some("java.lang.String"));
        let lambda_use = find(&tree, |k| matches!(k, NodeKind::Ident { name } if name == "v"));
        assert_eq!(ctx.resolve_variable(lambda_use, "v"), Some(VariableBinding::LambdaParam));
        assert_eq!(ctx.type_of(lambda_use), None);
    }

    #[test]
    fn meta_annotations_are_transitive() {
        let types = TypeTable::standard();
        assert!(types.has_meta_annotation(
            "org.springframework.boot.test.context.TestConfiguration",
            "org.springframework.context.annotation.Configuration"
        ));
        assert!(types.has_meta_annotation(
            "org.springframework.boot.autoconfigure.SpringBootApplication",
            "org.springframework.context.annotation.Configuration"
        ));
        assert!(!types.has_meta_annotation(
            "org.junit.jupiter.api.TestTemplate",
            "org.junit.jupiter.api.TestTemplate"
        ));
    }
}
