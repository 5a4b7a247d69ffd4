//! Fix synthesis: span based edits plus import bookkeeping.
//!
//! A [`Fix`] is a set of non-overlapping [`Edit`]s against the original source of one
//! compilation unit, together with imports to add or remove. Fixes are assembled with
//! a [`FixBuilder`]; node based operations make the whole fix empty (flag only) when a
//! node they touch has no source position. [`Fix::apply`] turns the import requests
//! into edits and rewrites the source.
//!
//! ## Core Principles
//! - Offsets always refer to the original source.
//! - Edits never overlap; merging two fixes with overlapping edits is an error.
//! - Applying edits in descending offset order keeps earlier offsets valid.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ast::{NodeId, NodeKind, Span, Tree};
use crate::errors::RectifyError;

pub mod refactor;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Replace `span` of the original source with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// An import declaration to add or remove.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ImportSpec {
    pub path: String,
    pub is_static: bool,
}

impl ImportSpec {
    fn declaration(&self) -> String {
        if self.is_static {
            format!("import static {};", self.path)
        } else {
            format!("import {};", self.path)
        }
    }
}

/// A proposed patch. The empty fix means "flag only".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fix {
    edits: Vec<Edit>,
    imports_to_add: BTreeSet<ImportSpec>,
    imports_to_remove: BTreeSet<ImportSpec>,
}

impl Fix {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> FixBuilder {
        FixBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.imports_to_add.is_empty() && self.imports_to_remove.is_empty()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn imports_to_add(&self) -> &BTreeSet<ImportSpec> {
        &self.imports_to_add
    }

    pub fn imports_to_remove(&self) -> &BTreeSet<ImportSpec> {
        &self.imports_to_remove
    }

    /// Combines two fixes; their edits must be disjoint.
    pub fn merge(&self, other: &Fix) -> Result<Fix, RectifyError> {
        let mut edits = self.edits.clone();
        edits.extend(other.edits.iter().cloned());
        check_disjoint(&edits)?;
        Ok(Fix {
            edits,
            imports_to_add: self.imports_to_add.union(&other.imports_to_add).cloned().collect(),
            imports_to_remove: self
                .imports_to_remove
                .union(&other.imports_to_remove)
                .cloned()
                .collect(),
        })
    }

    /// Whether any edit of this fix overlaps an edit of `other`.
    pub fn overlaps(&self, other: &Fix) -> bool {
        self.edits
            .iter()
            .any(|a| other.edits.iter().any(|b| a.span.overlaps(&b.span)))
    }

    /// All edits, including those that realise import additions and removals.
    pub fn resolved_edits(&self, tree: &Tree) -> Result<Vec<Edit>, RectifyError> {
        let mut edits = self.edits.clone();
        edits.extend(import_edits(tree, &self.imports_to_add, &self.imports_to_remove));
        check_disjoint(&edits)?;
        Ok(edits)
    }

    /// The source of `tree` with this fix applied.
    pub fn apply(&self, tree: &Tree) -> Result<String, RectifyError> {
        apply_edits(tree.source(), &self.resolved_edits(tree)?)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates edits and import changes for one [`Fix`].
#[derive(Debug, Clone, Default)]
pub struct FixBuilder {
    edits: Vec<Edit>,
    imports_to_add: BTreeSet<ImportSpec>,
    imports_to_remove: BTreeSet<ImportSpec>,
    unpositioned: bool,
}

impl FixBuilder {
    pub fn replace(&mut self, span: Span, text: impl Into<String>) -> &mut Self {
        self.edits.push(Edit::new(span, text));
        self
    }

    pub fn delete(&mut self, span: Span) -> &mut Self {
        self.replace(span, "")
    }

    pub fn prefix_with(&mut self, span: Span, text: impl Into<String>) -> &mut Self {
        self.replace(Span::point(span.start), text)
    }

    pub fn postfix_with(&mut self, span: Span, text: impl Into<String>) -> &mut Self {
        self.replace(Span::point(span.end), text)
    }

    pub fn replace_node(
        &mut self,
        tree: &Tree,
        node: NodeId,
        text: impl Into<String>,
    ) -> &mut Self {
        match tree.span(node) {
            Some(span) => self.replace(span, text),
            None => self.mark_unpositioned(),
        }
    }

    pub fn delete_node(&mut self, tree: &Tree, node: NodeId) -> &mut Self {
        self.replace_node(tree, node, "")
    }

    pub fn prefix_node(&mut self, tree: &Tree, node: NodeId, text: impl Into<String>) -> &mut Self {
        match tree.span(node) {
            Some(span) => self.prefix_with(span, text),
            None => self.mark_unpositioned(),
        }
    }

    pub fn postfix_node(
        &mut self,
        tree: &Tree,
        node: NodeId,
        text: impl Into<String>,
    ) -> &mut Self {
        match tree.span(node) {
            Some(span) => self.postfix_with(span, text),
            None => self.mark_unpositioned(),
        }
    }

    /// Records that some required node had no position; `build` then yields the
    /// empty fix.
    pub fn mark_unpositioned(&mut self) -> &mut Self {
        self.unpositioned = true;
        self
    }

    pub fn add_import(&mut self, path: impl Into<String>) -> &mut Self {
        self.imports_to_add.insert(ImportSpec {
            path: path.into(),
            is_static: false,
        });
        self
    }

    pub fn add_static_import(&mut self, path: impl Into<String>) -> &mut Self {
        self.imports_to_add.insert(ImportSpec {
            path: path.into(),
            is_static: true,
        });
        self
    }

    pub fn remove_import(&mut self, path: impl Into<String>, is_static: bool) -> &mut Self {
        self.imports_to_remove.insert(ImportSpec {
            path: path.into(),
            is_static,
        });
        self
    }

    /// Folds an already built fix into this builder.
    pub fn merge(&mut self, fix: &Fix) -> &mut Self {
        self.edits.extend(fix.edits.iter().cloned());
        self.imports_to_add.extend(fix.imports_to_add.iter().cloned());
        self.imports_to_remove.extend(fix.imports_to_remove.iter().cloned());
        self
    }

    pub fn is_unpositioned(&self) -> bool {
        self.unpositioned
    }

    pub fn build(&self) -> Result<Fix, RectifyError> {
        if self.unpositioned {
            return Ok(Fix::empty());
        }
        check_disjoint(&self.edits)?;
        Ok(Fix {
            edits: self.edits.clone(),
            imports_to_add: self.imports_to_add.clone(),
            imports_to_remove: self.imports_to_remove.clone(),
        })
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

fn check_disjoint(edits: &[Edit]) -> Result<(), RectifyError> {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    for (i, first) in sorted.iter().enumerate() {
        for second in &sorted[i + 1..] {
            if second.span.start > first.span.end {
                break;
            }
            if first.span.overlaps(&second.span) {
                return Err(RectifyError::OverlappingEdits {
                    first: first.span,
                    second: second.span,
                });
            }
        }
    }
    Ok(())
}

/// Applies disjoint edits to `source`.
///
/// Edits are applied from the highest offset down. Insertions sharing an offset keep
/// their relative order, and an insertion at the start of a replaced range lands
/// before the replacement.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, RectifyError> {
    check_disjoint(edits)?;
    for edit in edits {
        let in_bounds = edit.span.start <= edit.span.end
            && edit.span.end <= source.len()
            && source.is_char_boundary(edit.span.start)
            && source.is_char_boundary(edit.span.end);
        if !in_bounds {
            return Err(RectifyError::EditOutOfBounds {
                span: edit.span,
                len: source.len(),
            });
        }
    }
    let mut ordered: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        (b.span.start, b.span.end, ib).cmp(&(a.span.start, a.span.end, ia))
    });
    let mut result = source.to_string();
    for (_, edit) in ordered {
        result.replace_range(edit.span.start..edit.span.end, &edit.replacement);
    }
    Ok(result)
}

/// Widens `span` to whole lines when nothing but whitespace shares its lines,
/// including the trailing newline.
pub fn expand_to_lines(source: &str, span: Span) -> Span {
    let line_start = source[..span.start.min(source.len())]
        .rfind('\n')
        .map_or(0, |i| i + 1);
    let rest = &source[span.end.min(source.len())..];
    let line_end = rest.find('\n').map_or(source.len(), |i| span.end + i + 1);
    let before_blank = source[line_start..span.start].trim().is_empty();
    let after_blank = source[span.end..line_end].trim().is_empty();
    if before_blank && after_blank {
        Span::new(line_start, line_end)
    } else {
        span
    }
}

/// The span removed when deleting a whole declaration: its lines, plus one adjacent
/// blank line so that no doubled or dangling blank line remains.
///
/// A preceding blank line goes when the declaration was followed by a closing brace
/// or another blank line; a following blank line goes when the declaration opened
/// its body.
pub fn member_deletion_span(source: &str, span: Span) -> Span {
    let lines = expand_to_lines(source, span);
    if lines == span || lines.start == 0 {
        return lines;
    }
    let before = &source[..lines.start - 1];
    let previous_start = before.rfind('\n').map_or(0, |i| i + 1);
    let previous_line = before[previous_start..].trim();
    let next_line = source[lines.end..].lines().next().unwrap_or("");
    let next_is_blank = next_line.trim().is_empty() && lines.end < source.len();
    if previous_line.is_empty() && (next_is_blank || next_line.trim().starts_with('}')) {
        Span::new(previous_start, lines.end)
    } else if previous_line.ends_with('{') && next_is_blank {
        let next_end = source[lines.end..]
            .find('\n')
            .map_or(source.len(), |i| lines.end + i + 1);
        Span::new(lines.start, next_end)
    } else {
        lines
    }
}

// ============================================================================
// IMPORTS
// ============================================================================

static PACKAGE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"package\s+[\w.]+\s*;").expect("package declaration pattern")
});

struct ExistingImport {
    spec: ImportSpec,
    wildcard: bool,
    span: Span,
}

fn existing_imports(tree: &Tree) -> Vec<ExistingImport> {
    tree.imports()
        .into_iter()
        .filter_map(|id| match (tree.kind(id), tree.span(id)) {
            (
                NodeKind::Import {
                    path,
                    is_static,
                    wildcard,
                },
                Some(span),
            ) => Some(ExistingImport {
                spec: ImportSpec {
                    path: path.clone(),
                    is_static: *is_static,
                },
                wildcard: *wildcard,
                span,
            }),
            _ => None,
        })
        .collect()
}

fn is_already_imported(tree: &Tree, existing: &[ExistingImport], spec: &ImportSpec) -> bool {
    let owner = spec.path.rsplit_once('.').map(|(owner, _)| owner);
    existing.iter().any(|import| {
        import.spec.is_static == spec.is_static
            && ((!import.wildcard && import.spec.path == spec.path)
                || (import.wildcard && Some(import.spec.path.as_str()) == owner))
    }) || (!spec.is_static && (owner == Some("java.lang") || owner == tree.package()))
}

fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Pending insertions keyed by offset; texts at one offset concatenate in order.
#[derive(Default)]
struct Insertions(Vec<(usize, String)>);

impl Insertions {
    fn insert(&mut self, offset: usize, text: String) {
        match self.0.iter_mut().find(|(o, _)| *o == offset) {
            Some((_, existing)) => existing.push_str(&text),
            None => self.0.push((offset, text)),
        }
    }

    /// Places each import before the first block entry that sorts after it, or
    /// after the block.
    fn place_in_block(&mut self, source: &str, block: &[&ExistingImport], specs: &[&ImportSpec]) {
        for spec in specs {
            match block.iter().find(|i| i.spec.path > spec.path) {
                Some(next) => self.insert(
                    line_start(source, next.span.start),
                    format!("{}\n", spec.declaration()),
                ),
                None => {
                    let last = block.iter().map(|i| i.span.end).max().unwrap_or(0);
                    self.insert(last, format!("\n{}", spec.declaration()));
                }
            }
        }
    }
}

fn declarations(specs: &[&ImportSpec]) -> String {
    specs
        .iter()
        .map(|s| s.declaration())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Edits realising import additions and removals, keeping each block sorted.
fn import_edits(
    tree: &Tree,
    to_add: &BTreeSet<ImportSpec>,
    to_remove: &BTreeSet<ImportSpec>,
) -> Vec<Edit> {
    let source = tree.source();
    let existing = existing_imports(tree);
    let mut edits = Vec::new();

    for import in existing.iter().filter(|i| to_remove.contains(&i.spec)) {
        edits.push(Edit::new(expand_to_lines(source, import.span), ""));
    }

    let pending: Vec<&ImportSpec> = to_add
        .iter()
        .filter(|spec| !to_remove.contains(spec) && !is_already_imported(tree, &existing, spec))
        .collect();
    let new_static: Vec<&ImportSpec> = pending.iter().copied().filter(|s| s.is_static).collect();
    let new_regular: Vec<&ImportSpec> = pending.iter().copied().filter(|s| !s.is_static).collect();
    let kept: Vec<&ExistingImport> = existing
        .iter()
        .filter(|i| !to_remove.contains(&i.spec))
        .collect();
    let static_block: Vec<&ExistingImport> =
        kept.iter().copied().filter(|i| i.spec.is_static).collect();
    let regular_block: Vec<&ExistingImport> =
        kept.iter().copied().filter(|i| !i.spec.is_static).collect();

    let mut insertions = Insertions::default();
    match (static_block.is_empty(), regular_block.is_empty()) {
        (false, false) => {
            insertions.place_in_block(source, &static_block, &new_static);
            insertions.place_in_block(source, &regular_block, &new_regular);
        }
        (false, true) => {
            insertions.place_in_block(source, &static_block, &new_static);
            if !new_regular.is_empty() {
                let last = static_block.iter().map(|i| i.span.end).max().unwrap_or(0);
                insertions.insert(last, format!("\n\n{}", declarations(&new_regular)));
            }
        }
        (true, false) => {
            insertions.place_in_block(source, &regular_block, &new_regular);
            if !new_static.is_empty() {
                let first = regular_block.iter().map(|i| i.span.start).min().unwrap_or(0);
                insertions.insert(
                    line_start(source, first),
                    format!("{}\n\n", declarations(&new_static)),
                );
            }
        }
        (true, true) if !pending.is_empty() => {
            let blocks: Vec<String> = [&new_static, &new_regular]
                .into_iter()
                .filter(|specs| !specs.is_empty())
                .map(|specs| declarations(specs))
                .collect();
            let text = blocks.join("\n\n");
            let header_end = tree
                .kind(tree.root())
                .children()
                .first()
                .and_then(|first| tree.span(*first))
                .map_or(source.len(), |span| span.start);
            match PACKAGE_DECL.find(&source[..header_end]) {
                Some(package) => insertions.insert(package.end(), format!("\n\n{text}")),
                None => insertions.insert(0, format!("{text}\n\n")),
            }
        }
        (true, true) => {}
    }

    edits.extend(
        insertions
            .0
            .into_iter()
            .map(|(offset, text)| Edit::new(Span::point(offset), text)),
    );
    edits
}
