//! Rule definition and its validation.

use std::collections::BTreeSet;

use crate::ast::{NodeId, NodeKind, Tree};
use crate::errors::RectifyError;
use crate::matchers::BoxedMatcher;
use crate::refaster::{
    ImportPolicy, PatternScope, Placeholder, PlaceholderFunction, RuleImport, TemplateRule,
};
use crate::syntax::parse_expression;

/// Declares a [`TemplateRule`]. All authoring errors surface from [`build`](Self::build).
pub struct TemplateRuleBuilder {
    name: String,
    summary: Option<String>,
    placeholders: Vec<Placeholder>,
    functions: Vec<PlaceholderFunction>,
    before: Vec<String>,
    after: Option<String>,
    imports: Vec<String>,
    policy: ImportPolicy,
}

impl TemplateRuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
            placeholders: Vec::new(),
            functions: Vec::new(),
            before: Vec::new(),
            after: None,
            imports: Vec::new(),
            policy: ImportPolicy::default(),
        }
    }

    /// The diagnostic message; defaults to "Refactoring opportunity".
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// An import used to resolve names in the patterns: `a.b.Type` or
    /// `static a.b.Type.member`.
    pub fn import(mut self, declaration: impl Into<String>) -> Self {
        self.imports.push(declaration.into());
        self
    }

    pub fn placeholder(mut self, name: impl Into<String>) -> Self {
        self.placeholders.push(Placeholder {
            name: name.into(),
            constraint: None,
        });
        self
    }

    /// A placeholder that only binds expressions accepted by `constraint`.
    pub fn placeholder_with(mut self, name: impl Into<String>, constraint: BoxedMatcher) -> Self {
        self.placeholders.push(Placeholder {
            name: name.into(),
            constraint: Some(constraint),
        });
        self
    }

    /// A placeholder function over the given lambda parameters. It may ignore its
    /// parameters but may not be one of them.
    pub fn function(self, name: impl Into<String>, params: &[&str]) -> Self {
        self.push_function(name.into(), params, false)
    }

    /// Like [`function`](Self::function), but also binds a bare parameter.
    pub fn identity_function(self, name: impl Into<String>, params: &[&str]) -> Self {
        self.push_function(name.into(), params, true)
    }

    fn push_function(mut self, name: String, params: &[&str], allows_identity: bool) -> Self {
        self.functions.push(PlaceholderFunction {
            name,
            params: params.iter().map(|p| p.to_string()).collect(),
            allows_identity,
        });
        self
    }

    pub fn before(mut self, pattern: impl Into<String>) -> Self {
        self.before.push(pattern.into());
        self
    }

    pub fn after(mut self, pattern: impl Into<String>) -> Self {
        self.after = Some(pattern.into());
        self
    }

    pub fn policy(mut self, policy: ImportPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    pub fn build(self) -> Result<TemplateRule, RectifyError> {
        let fail = |message: String| RectifyError::rule_definition(self.name.clone(), message);

        if self.before.is_empty() {
            return Err(fail("a rule needs at least one before pattern".into()));
        }
        let Some(after_source) = &self.after else {
            return Err(fail("a rule needs an after pattern".into()));
        };

        let mut declared = BTreeSet::new();
        let names = self
            .placeholders
            .iter()
            .map(|p| &p.name)
            .chain(self.functions.iter().map(|f| &f.name));
        for name in names {
            if !declared.insert(name.clone()) {
                return Err(fail(format!("`{name}` is declared more than once")));
            }
        }
        if let Some(function) = self.functions.iter().find(|f| f.params.is_empty()) {
            return Err(fail(format!(
                "placeholder function `{}` needs at least one parameter",
                function.name
            )));
        }

        let imports = self
            .imports
            .iter()
            .map(|declaration| {
                parse_import(declaration)
                    .ok_or_else(|| fail(format!("invalid import `{declaration}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parse = |role: &str, index: usize, source: &str| {
            parse_expression(&format!("{}:{role}{index}", self.name), source).map_err(|error| {
                fail(format!("cannot parse {role} pattern `{source}`: {}", error.located_message()))
            })
        };
        let before = self
            .before
            .iter()
            .enumerate()
            .map(|(index, source)| parse("before", index, source))
            .collect::<Result<Vec<_>, _>>()?;
        let after = parse("after", 0, after_source)?;

        let mut bound: Option<(String, BTreeSet<String>)> = None;
        for (pattern, source) in before.iter().zip(&self.before) {
            if matches!(
                pattern.kind(pattern.root()),
                NodeKind::Ident { name } if self.placeholders.iter().any(|p| &p.name == name)
            ) {
                return Err(fail(format!("before pattern `{source}` matches every expression")));
            }
            let used = self.used_names(pattern).map_err(fail)?;
            match &bound {
                None => bound = Some((source.clone(), used)),
                Some((first, expected)) if *expected != used => {
                    return Err(fail(format!(
                        "before patterns `{first}` and `{source}` bind different placeholders ({} versus {})",
                        list(expected),
                        list(&used)
                    )));
                }
                Some(_) => {}
            }
        }
        let bound = bound.map(|(_, used)| used).unwrap_or_default();

        let used_by_after = self.used_names(&after).map_err(fail)?;
        if let Some(unbound) = used_by_after.difference(&bound).next() {
            return Err(fail(format!(
                "after pattern uses `{unbound}`, which the before patterns do not bind"
            )));
        }
        if let Some(unused) = declared.difference(&bound).next() {
            return Err(fail(format!("placeholder `{unused}` is never used")));
        }

        Ok(TemplateRule {
            summary: self
                .summary
                .unwrap_or_else(|| "Refactoring opportunity".to_string()),
            name: self.name,
            placeholders: self.placeholders,
            functions: self.functions,
            before,
            after,
            scope: PatternScope::new(imports),
            policy: self.policy,
        })
    }

    /// The placeholders and placeholder functions a pattern refers to.
    fn used_names(&self, pattern: &Tree) -> Result<BTreeSet<String>, String> {
        let mut used = BTreeSet::new();
        self.collect_used(pattern, pattern.root(), &mut Vec::new(), &mut used)?;
        Ok(used)
    }

    fn collect_used(
        &self,
        pattern: &Tree,
        node: NodeId,
        lambda_params: &mut Vec<String>,
        used: &mut BTreeSet<String>,
    ) -> Result<(), String> {
        match pattern.kind(node) {
            NodeKind::Ident { name } => {
                if !lambda_params.contains(name)
                    && self.placeholders.iter().any(|p| &p.name == name)
                {
                    used.insert(name.clone());
                }
                return Ok(());
            }
            NodeKind::MethodCall {
                target: None,
                name,
                args,
                ..
            } => {
                if let Some(function) = self.functions.iter().find(|f| &f.name == name) {
                    if args.len() != function.params.len() {
                        return Err(format!(
                            "placeholder function `{name}` takes {} argument(s), not {}",
                            function.params.len(),
                            args.len()
                        ));
                    }
                    for arg in args {
                        let is_lambda_param = matches!(
                            pattern.kind(*arg),
                            NodeKind::Ident { name } if lambda_params.contains(name)
                        );
                        if !is_lambda_param {
                            return Err(format!(
                                "placeholder function `{name}` must be applied to lambda parameters"
                            ));
                        }
                    }
                    used.insert(name.clone());
                    return Ok(());
                }
            }
            NodeKind::Lambda { params, body } => {
                let depth = lambda_params.len();
                lambda_params.extend(params.iter().map(|p| p.name.clone()));
                let result = self.collect_used(pattern, *body, lambda_params, used);
                lambda_params.truncate(depth);
                return result;
            }
            _ => {}
        }
        for child in pattern.children(node) {
            self.collect_used(pattern, child, lambda_params, used)?;
        }
        Ok(())
    }
}

fn parse_import(declaration: &str) -> Option<RuleImport> {
    let declaration = declaration.trim();
    let (path, is_static) = match declaration.strip_prefix("static ") {
        Some(path) => (path.trim(), true),
        None => (declaration, false),
    };
    let valid = path.contains('.')
        && path
            .split('.')
            .all(|segment| {
                !segment.is_empty()
                    && segment.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            });
    valid.then(|| RuleImport {
        path: path.to_string(),
        is_static,
    })
}

fn list(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        return "none".to_string();
    }
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition_error(builder: TemplateRuleBuilder) -> String {
        match builder.build() {
            Err(RectifyError::RuleDefinition { message, .. }) => message,
            Err(other) => panic!("unexpected error {other}"),
            Ok(rule) => panic!("rule {rule:?} should be rejected"),
        }
    }

    #[test]
    fn builds_valid_rules() {
        let rule = TemplateRuleBuilder::new("Sample")
            .import("java.util.stream.Stream")
            .import("static org.mockito.Mockito.times")
            .placeholder("stream")
            .function("f", &["element"])
            .before("stream.flatMap(v -> f(v).count())")
            .after("stream.flatMap(v -> f(v)).count()")
            .build()
            .unwrap();
        assert_eq!(rule.name(), "Sample");
        assert_eq!(rule.summary(), "Refactoring opportunity");
        assert_eq!(rule.policy(), ImportPolicy::ImportTopLevel);
    }

    #[test]
    fn rejects_missing_patterns() {
        assert_eq!(
            definition_error(TemplateRuleBuilder::new("R").after("a")),
            "a rule needs at least one before pattern"
        );
        assert_eq!(
            definition_error(TemplateRuleBuilder::new("R").before("a.b()")),
            "a rule needs an after pattern"
        );
    }

    #[test]
    fn rejects_unparsable_patterns() {
        let message = definition_error(TemplateRuleBuilder::new("R").before("a.(").after("a"));
        assert!(message.starts_with("cannot parse before pattern `a.(`: 1:"), "{message}");
    }

    #[test]
    fn rejects_unbound_after_placeholders() {
        let builder = TemplateRuleBuilder::new("R")
            .placeholder("a")
            .placeholder("b")
            .before("a.isEmpty()")
            .after("a.equals(b)");
        assert_eq!(
            definition_error(builder),
            "after pattern uses `b`, which the before patterns do not bind"
        );
    }

    #[test]
    fn rejects_inconsistent_alternatives() {
        let builder = TemplateRuleBuilder::new("R")
            .placeholder("a")
            .placeholder("b")
            .before("a.equals(b)")
            .before("a.isEmpty()")
            .after("a.equals(b)");
        assert_eq!(
            definition_error(builder),
            "before patterns `a.equals(b)` and `a.isEmpty()` bind different placeholders (`a`, `b` versus `a`)"
        );
    }

    #[test]
    fn rejects_unused_and_duplicate_declarations() {
        let unused = TemplateRuleBuilder::new("R")
            .placeholder("a")
            .placeholder("b")
            .before("a.isEmpty()")
            .after("a.isBlank()");
        assert_eq!(definition_error(unused), "placeholder `b` is never used");

        let duplicate = TemplateRuleBuilder::new("R")
            .placeholder("a")
            .function("a", &["x"])
            .before("a.isEmpty()")
            .after("a.isBlank()");
        assert_eq!(definition_error(duplicate), "`a` is declared more than once");
    }

    #[test]
    fn rejects_bare_placeholders_and_misapplied_functions() {
        let bare = TemplateRuleBuilder::new("R").placeholder("a").before("a").after("a");
        assert_eq!(definition_error(bare), "before pattern `a` matches every expression");

        let misapplied = TemplateRuleBuilder::new("R")
            .placeholder("s")
            .function("f", &["x"])
            .before("s.map(v -> f(s))")
            .after("s.map(v -> f(v))");
        assert_eq!(
            definition_error(misapplied),
            "placeholder function `f` must be applied to lambda parameters"
        );

        let arity = TemplateRuleBuilder::new("R")
            .placeholder("s")
            .function("f", &["x"])
            .before("s.map((v, w) -> f(v, w))")
            .after("s.map(v -> f(v))");
        assert_eq!(
            definition_error(arity),
            "placeholder function `f` takes 1 argument(s), not 2"
        );
    }

    #[test]
    fn rejects_invalid_imports() {
        let builder = TemplateRuleBuilder::new("R")
            .import("Stream")
            .placeholder("a")
            .before("a.count()")
            .after("a.size()");
        assert_eq!(definition_error(builder), "invalid import `Stream`");
    }
}
