//! Rules for `java.util.stream.Stream` pipelines.

use crate::errors::RectifyError;
use crate::matchers::{boxed, is_array_type, is_subtype_of, BoxedMatcher};
use crate::refaster::{ImportPolicy, TemplateRule, TemplateRuleBuilder};

const STREAM: &str = "java.util.stream.Stream";
const GUAVA_STREAMS: &str = "com.google.common.collect.Streams";
const NATURAL_ORDER: &str = "static java.util.Comparator.naturalOrder";
const REVERSE_ORDER: &str = "static java.util.Comparator.reverseOrder";
const PREDICATE_NOT: &str = "static java.util.function.Predicate.not";

fn stream() -> BoxedMatcher {
    boxed(is_subtype_of(STREAM))
}

/// A rule over a stream-typed `stream` placeholder.
fn on_stream(name: &str) -> TemplateRuleBuilder {
    TemplateRule::builder(name)
        .import(STREAM)
        .placeholder_with("stream", stream())
}

pub(super) fn rules() -> Result<Vec<TemplateRule>, RectifyError> {
    let mut rules = vec![
        TemplateRule::builder("StreamRules.Joining")
            .summary("Prefer `Collectors.joining()` over `joining(\"\")`")
            .import("static java.util.stream.Collectors.joining")
            .before("joining(\"\")")
            .after("joining()")
            .policy(ImportPolicy::StaticImportAlways)
            .build()?,
        TemplateRule::builder("StreamRules.EmptyStream")
            .summary("Prefer `Stream.empty()` over an argument-less `Stream.of()`")
            .import(STREAM)
            .before("Stream.of()")
            .after("Stream.empty()")
            .build()?,
        TemplateRule::builder("StreamRules.StreamOfNullable")
            .summary("Prefer `Stream.ofNullable(..)` over more contrived alternatives")
            .import(STREAM)
            .import("java.util.Objects")
            .import("java.util.Optional")
            .placeholder("object")
            .before("Stream.of(object).filter(Objects::nonNull)")
            .before("Optional.ofNullable(object).stream()")
            .after("Stream.ofNullable(object)")
            .build()?,
        TemplateRule::builder("StreamRules.StreamOfArray")
            .summary("Prefer `Arrays.stream(..)` over `Stream.of(..)` for arrays")
            .import(STREAM)
            .import("java.util.Arrays")
            .placeholder_with("array", boxed(is_array_type()))
            .before("Stream.of(array)")
            .after("Arrays.stream(array)")
            .build()?,
        TemplateRule::builder("StreamRules.ConcatOneStream")
            .summary("Don't unnecessarily call `Streams.concat` on a single stream")
            .import(GUAVA_STREAMS)
            .placeholder_with("stream", stream())
            .before("Streams.concat(stream)")
            .after("stream")
            .build()?,
        TemplateRule::builder("StreamRules.ConcatTwoStreams")
            .summary("Prefer `Stream.concat` over the Guava alternative for two streams")
            .import(STREAM)
            .import(GUAVA_STREAMS)
            .placeholder_with("first", stream())
            .placeholder_with("second", stream())
            .before("Streams.concat(first, second)")
            .after("Stream.concat(first, second)")
            .build()?,
    ];

    for (name, operation, argument) in [
        ("StreamRules.FilterOuterStreamAfterFlatMap", "filter", "predicate"),
        ("StreamRules.MapOuterStreamAfterFlatMap", "map", "function"),
        ("StreamRules.FlatMapOuterStreamAfterFlatMap", "flatMap", "function"),
    ] {
        rules.push(
            on_stream(name)
                .summary(format!("Apply `{operation}` to the outer stream after flattening"))
                .placeholder(argument)
                .function("toStreamFunction", &["element"])
                .before(format!(
                    "stream.flatMap(v -> toStreamFunction(v).{operation}({argument}))"
                ))
                .after(format!(
                    "stream.flatMap(v -> toStreamFunction(v)).{operation}({argument})"
                ))
                .build()?,
        );
    }

    rules.extend([
        on_stream("StreamRules.StreamMapFirst")
            .summary("Map only the first element rather than the whole stream")
            .placeholder("function")
            .before("stream.map(function).findFirst()")
            .after("stream.findFirst().map(function)")
            .build()?,
        on_stream("StreamRules.StreamIsEmpty")
            .summary("In order to test whether a stream has any element, simply try to find one")
            .before("stream.count() == 0")
            .before("stream.count() <= 0")
            .before("stream.count() < 1")
            .before("stream.findFirst().isEmpty()")
            .after("stream.findAny().isEmpty()")
            .build()?,
        on_stream("StreamRules.StreamIsNotEmpty")
            .summary("In order to test whether a stream has any element, simply try to find one")
            .before("stream.count() != 0")
            .before("stream.count() > 0")
            .before("stream.count() >= 1")
            .before("stream.findFirst().isPresent()")
            .after("stream.findAny().isPresent()")
            .build()?,
        on_stream("StreamRules.StreamMin")
            .summary("Prefer `Stream.min(..)` over more contrived alternatives")
            .placeholder("comparator")
            .before("stream.max(comparator.reversed())")
            .before("stream.sorted(comparator).findFirst()")
            .after("stream.min(comparator)")
            .build()?,
        on_stream("StreamRules.StreamMinNaturalOrder")
            .summary("Prefer `Stream.min(naturalOrder())` over more contrived alternatives")
            .import(REVERSE_ORDER)
            .import(NATURAL_ORDER)
            .before("stream.max(reverseOrder())")
            .before("stream.sorted().findFirst()")
            .after("stream.min(naturalOrder())")
            .policy(ImportPolicy::StaticImportAlways)
            .build()?,
        on_stream("StreamRules.StreamMax")
            .summary("Prefer `Stream.max(..)` over more contrived alternatives")
            .import(GUAVA_STREAMS)
            .placeholder("comparator")
            .before("stream.min(comparator.reversed())")
            .before("Streams.findLast(stream.sorted(comparator))")
            .after("stream.max(comparator)")
            .build()?,
        on_stream("StreamRules.StreamMaxNaturalOrder")
            .summary("Prefer `Stream.max(naturalOrder())` over more contrived alternatives")
            .import(GUAVA_STREAMS)
            .import(REVERSE_ORDER)
            .import(NATURAL_ORDER)
            .before("stream.min(reverseOrder())")
            .before("Streams.findLast(stream.sorted())")
            .after("stream.max(naturalOrder())")
            .policy(ImportPolicy::StaticImportAlways)
            .build()?,
        on_stream("StreamRules.StreamNoneMatch")
            .summary("Prefer `Stream.noneMatch(..)` over more contrived alternatives")
            .import(PREDICATE_NOT)
            .placeholder("predicate")
            .before("!stream.anyMatch(predicate)")
            .before("stream.allMatch(not(predicate))")
            .before("stream.allMatch(predicate.negate())")
            .before("stream.filter(predicate).findAny().isEmpty()")
            .after("stream.noneMatch(predicate)")
            .build()?,
        on_stream("StreamRules.StreamNoneMatch2")
            .summary("Prefer `noneMatch` over a negated `allMatch`")
            .identity_function("test", &["element"])
            .before("stream.allMatch(e -> !test(e))")
            .after("stream.noneMatch(e -> test(e))")
            .build()?,
        on_stream("StreamRules.StreamAnyMatch")
            .summary("Prefer `Stream.anyMatch(..)` over more contrived alternatives")
            .placeholder("predicate")
            .before("!stream.noneMatch(predicate)")
            .before("stream.filter(predicate).findAny().isPresent()")
            .after("stream.anyMatch(predicate)")
            .build()?,
        on_stream("StreamRules.StreamAllMatch")
            .summary("Prefer `Stream.allMatch(..)` over more contrived alternatives")
            .import(PREDICATE_NOT)
            .placeholder("predicate")
            .before("stream.noneMatch(not(predicate))")
            .before("stream.noneMatch(predicate.negate())")
            .after("stream.allMatch(predicate)")
            .build()?,
        on_stream("StreamRules.StreamAllMatch2")
            .summary("Prefer `allMatch` over a negated `noneMatch`")
            .identity_function("test", &["element"])
            .before("stream.noneMatch(e -> !test(e))")
            .after("stream.allMatch(e -> test(e))")
            .build()?,
    ]);
    Ok(rules)
}
