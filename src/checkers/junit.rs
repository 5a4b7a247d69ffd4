//! JUnit Jupiter matchers shared by the JUnit checkers.

use once_cell::sync::Lazy;

use crate::ast::Modifier;
use crate::matchers::{
    all_of, annotations, any_of, boxed, enclosing_class, has_meta_annotation, has_modifier,
    is_type, not, BoxedMatcher, MatchType,
};

pub const METHOD_SOURCE: &str = "org.junit.jupiter.params.provider.MethodSource";
pub const VALUE_SOURCE: &str = "org.junit.jupiter.params.provider.ValueSource";

/// Methods annotated `@Test` or with an annotation meta-annotated `@TestTemplate`.
pub static TEST_METHOD: Lazy<BoxedMatcher> = Lazy::new(|| {
    boxed(annotations(
        MatchType::AtLeastOne,
        any_of(vec![
            boxed(is_type("org.junit.jupiter.api.Test")),
            boxed(has_meta_annotation("org.junit.jupiter.api.TestTemplate")),
        ]),
    ))
});

pub static SETUP_OR_TEARDOWN_METHOD: Lazy<BoxedMatcher> = Lazy::new(|| {
    boxed(annotations(
        MatchType::AtLeastOne,
        any_of(vec![
            boxed(is_type("org.junit.jupiter.api.AfterAll")),
            boxed(is_type("org.junit.jupiter.api.AfterEach")),
            boxed(is_type("org.junit.jupiter.api.BeforeAll")),
            boxed(is_type("org.junit.jupiter.api.BeforeEach")),
        ]),
    ))
});

pub static HAS_METHOD_SOURCE: Lazy<BoxedMatcher> =
    Lazy::new(|| boxed(annotations(MatchType::AtLeastOne, is_type(METHOD_SOURCE))));

/// Methods whose signature is dictated elsewhere: overrides, and overridable methods
/// of abstract classes.
pub static HAS_UNMODIFIABLE_SIGNATURE: Lazy<BoxedMatcher> = Lazy::new(|| {
    boxed(any_of(vec![
        boxed(annotations(
            MatchType::AtLeastOne,
            is_type("java.lang.Override"),
        )),
        boxed(all_of(vec![
            boxed(not(has_modifier(Modifier::Final))),
            boxed(not(has_modifier(Modifier::Private))),
            boxed(enclosing_class(has_modifier(Modifier::Abstract))),
        ])),
    ]))
});
