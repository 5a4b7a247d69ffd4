//! Before/after template rules.
//!
//! A template rule names one or more *before* expression shapes and a single *after*
//! shape. Wherever a before shape unifies with an expression of the analysed file,
//! the expression is rewritten to the after shape with the same placeholder values.
//!
//! ## Core Principles
//!
//! - **Definition-time validation**: every authoring error (unparsable pattern, unbound
//!   after placeholder, inconsistent alternatives) is reported by
//!   [`TemplateRuleBuilder::build`]. Matching never fails, it only abstains.
//! - **Ordered alternatives**: before shapes are tried in declaration order and the
//!   first one that unifies wins.
//! - **Source preservation**: bound sub-expressions are copied from the original
//!   source; only the after shape's own tokens are printed.
//!
//! ## Placeholders
//!
//! Plain placeholders are the rule's parameters and bind any expression (optionally
//! constrained by a [`Matcher`](crate::matchers::Matcher)). Placeholder functions bind
//! a sub-expression written in terms of lambda parameters, so `v -> f(v).filter(p)` matches
//! `x -> x.children().filter(p)` with `f(x) = x.children()`.

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::{NodeId, Tree};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, Severity};
use crate::matchers::BoxedMatcher;

mod builder;
mod instantiate;
pub mod rules;
mod unify;

pub use builder::TemplateRuleBuilder;

use unify::{Bindings, Unifier};

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// How the names referenced by an after shape are brought into scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Types are imported; static members are qualified by their owner unless the
    /// file already imports them statically.
    #[default]
    ImportTopLevel,
    /// Static members are always imported statically and used unqualified.
    StaticImportAlways,
}

/// A rule parameter.
pub struct Placeholder {
    pub(crate) name: String,
    pub(crate) constraint: Option<BoxedMatcher>,
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("name", &self.name)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

/// An uninterpreted sub-computation over lambda parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderFunction {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    /// Whether the function may bind to nothing but one of its own parameters.
    pub(crate) allows_identity: bool,
}

/// An import declared by a rule to resolve the names used in its patterns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RuleImport {
    pub path: String,
    pub is_static: bool,
}

/// Resolves the names written in a rule's patterns.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternScope {
    imports: Vec<RuleImport>,
}

impl PatternScope {
    pub fn new(imports: Vec<RuleImport>) -> Self {
        Self { imports }
    }

    /// The fully qualified name of a type written as `name` in a pattern.
    pub fn resolve_type(&self, name: &str) -> Option<String> {
        let (first, rest) = match name.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };
        if !first.chars().next().is_some_and(char::is_uppercase) {
            return name.contains('.').then(|| name.to_string()).filter(|n| {
                n.rsplit('.')
                    .next()
                    .is_some_and(|last| last.chars().next().is_some_and(char::is_uppercase))
            });
        }
        let base = self
            .imports
            .iter()
            .find(|import| !import.is_static && import.path.rsplit('.').next() == Some(first))
            .map(|import| import.path.clone())
            .or_else(|| JAVA_LANG_TYPES.contains(&first).then(|| format!("java.lang.{first}")))?;
        Some(match rest {
            Some(rest) => format!("{base}.{rest}"),
            None => base,
        })
    }

    /// The owner type of a member written unqualified in a pattern.
    pub fn resolve_static(&self, member: &str) -> Option<String> {
        self.imports.iter().find_map(|import| {
            let (owner, name) = import.path.rsplit_once('.')?;
            (import.is_static && name == member).then(|| owner.to_string())
        })
    }
}

const JAVA_LANG_TYPES: &[&str] = &[
    "Boolean", "Byte", "Character", "CharSequence", "Class", "Double", "Float", "Integer",
    "Long", "Math", "Number", "Object", "Short", "String", "System",
];

/// A validated before/after rule. Built with [`TemplateRuleBuilder`].
pub struct TemplateRule {
    pub(crate) name: String,
    pub(crate) summary: String,
    pub(crate) placeholders: Vec<Placeholder>,
    pub(crate) functions: Vec<PlaceholderFunction>,
    pub(crate) before: Vec<Tree>,
    pub(crate) after: Tree,
    pub(crate) scope: PatternScope,
    pub(crate) policy: ImportPolicy,
}

impl fmt::Debug for TemplateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRule")
            .field("name", &self.name)
            .field("before", &self.before.iter().map(Tree::source).collect::<Vec<_>>())
            .field("after", &self.after.source())
            .field("policy", &self.policy)
            .finish()
    }
}

impl TemplateRule {
    pub fn builder(name: impl Into<String>) -> TemplateRuleBuilder {
        TemplateRuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn policy(&self) -> ImportPolicy {
        self.policy
    }

    pub(crate) fn placeholder(&self, name: &str) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.name == name)
    }

    pub(crate) fn function(&self, name: &str) -> Option<&PlaceholderFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Checks a placeholder's constraint against a candidate binding.
    pub(crate) fn accepts(
        &self,
        placeholder: &str,
        node: NodeId,
        ctx: &AnalysisContext<'_>,
    ) -> bool {
        match self.placeholder(placeholder).and_then(|p| p.constraint.as_ref()) {
            Some(constraint) => constraint.matches(node, &ctx.at(node)),
            None => true,
        }
    }

    // ------------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------------

    /// Tries the before alternatives at `node`, in order.
    pub(crate) fn match_at(
        &self,
        node: NodeId,
        ctx: &AnalysisContext<'_>,
    ) -> Option<(usize, Bindings)> {
        self.before.iter().enumerate().find_map(|(index, pattern)| {
            let unifier = Unifier::new(self, pattern, ctx);
            unifier
                .unify(pattern.root(), node, Bindings::default())
                .map(|bindings| (index, bindings))
        })
    }

    /// All rewrites this rule proposes for the file of `ctx`.
    ///
    /// Expressions are visited in preorder; once an expression matched, its
    /// descendants are not considered.
    pub fn find_matches(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let tree = ctx.tree();
        let mut diagnostics = Vec::new();
        let mut matched: BTreeSet<NodeId> = BTreeSet::new();

        for node in tree.preorder() {
            if !is_match_candidate(tree, node)
                || tree.ancestors(node).any(|ancestor| matched.contains(&ancestor))
            {
                continue;
            }
            let Some((alternative, bindings)) = self.match_at(node, &ctx.at(node)) else {
                continue;
            };
            match instantiate::rewrite(self, node, &bindings, &ctx.at(node)) {
                Some(fix) => {
                    tracing::debug!(
                        rule = %self.name,
                        alternative,
                        node = node.0,
                        "template rule matched"
                    );
                    matched.insert(node);
                    diagnostics.push(Diagnostic {
                        check: self.name.clone(),
                        anchor: tree.span(node),
                        message: self.summary.clone(),
                        severity: Severity::Suggestion,
                        fixes: vec![fix],
                        link: None,
                    });
                }
                None => {
                    tracing::trace!(
                        rule = %self.name,
                        node = node.0,
                        "template rule could not instantiate"
                    );
                }
            }
        }
        diagnostics
    }
}

fn is_match_candidate(tree: &Tree, node: NodeId) -> bool {
    use crate::ast::{NodeCategory, NodeKind};
    tree.kind(node).category() == NodeCategory::Expression
        && !matches!(tree.kind(node), NodeKind::Parens { .. })
}
