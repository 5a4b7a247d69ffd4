//! Syntax front end for the supported Java subset.
//!
//! Parsing produces an immutable [`Tree`]; formatting re-renders a whole source
//! file through the pretty printer. Both are purely syntactic.

mod parser;

pub use parser::{parse_compilation_unit, parse_expression};

use crate::ast::pretty::{format_tree, FormatError, FormatOptions};
use crate::ast::Tree;

/// Parses and re-renders `source` in the canonical layout.
///
/// Parse failures are reported as [`FormatError::Malformed`] carrying the
/// `line:column: error: message` form of the failure.
pub fn format_source(
    name: &str,
    source: &str,
    remove_unused_imports: bool,
) -> Result<String, FormatError> {
    let tree = parse_compilation_unit(name, source)
        .map_err(|error| FormatError::Malformed(error.located_message()))?;
    format_tree(
        &tree,
        &FormatOptions {
            remove_unused_imports,
        },
    )
}

/// Parses `source`, returning `None` rather than an error on malformed input.
pub fn try_parse(name: &str, source: &str) -> Option<Tree> {
    match parse_compilation_unit(name, source) {
        Ok(tree) => Some(tree),
        Err(error) => {
            tracing::debug!(name, error = %error, "source does not parse");
            None
        }
    }
}
