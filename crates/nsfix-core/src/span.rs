//! Position and span resolution.
//!
//! Maps the reference node model onto concrete byte ranges: where a written
//! qualifier begins and ends, where a name may be inserted into an
//! anonymous namespace, and the extent of a using-statement including its
//! terminator.
//!
//! The qualifier span of a reference never includes a trailing component
//! that names a type: for `std::vector<int>::iterator` the span is `std::`,
//! since `vector` is the declaration being qualified, not a namespace.

use crate::adapter::{AnonNamespaceMatch, NestedNameSpecifier, RefNode, TypeLoc, UsingMatch};
use crate::patch::Span;
use crate::path::{NamespacePath, SCOPE_SEPARATOR};

// ============================================================================
// Qualifier Spans
// ============================================================================

fn qualifier_bounds(qualifier: &NestedNameSpecifier) -> Option<(u64, u64)> {
    let begin = qualifier.begin()?;
    let end = if qualifier.specifies_type() {
        qualifier.prefix_end()?
    } else {
        qualifier.end()?
    };
    Some((begin, end.max(begin)))
}

/// First character of a type, looking through cv and elaboration wrappers.
pub fn type_begin(ty: &TypeLoc) -> u64 {
    match ty {
        TypeLoc::Qualified(inner) => type_begin(inner),
        TypeLoc::Elaborated {
            qualifier: Some(q),
            named,
        } => q.begin().unwrap_or_else(|| type_begin(named)),
        TypeLoc::Elaborated {
            qualifier: None,
            named,
        } => type_begin(named),
        TypeLoc::Named(name) => name.span.start,
    }
}

fn type_qualifier(ty: &TypeLoc) -> Option<&NestedNameSpecifier> {
    match ty {
        TypeLoc::Qualified(inner) => type_qualifier(inner),
        TypeLoc::Elaborated { qualifier, .. } => qualifier.as_ref(),
        TypeLoc::Named(_) => None,
    }
}

/// Span of the written namespace qualifier of `node`.
///
/// The span is empty (begin == end) when nothing is written, in which case
/// its start is where a qualifier would be inserted.
pub fn qualifier_span(node: &RefNode) -> Span {
    let bounds = match node {
        RefNode::Expr { qualifier, .. } => qualifier.as_ref().and_then(qualifier_bounds),
        RefNode::Type(ty) => type_qualifier(ty).and_then(qualifier_bounds),
        RefNode::Nested { qualifier, .. } => qualifier_bounds(qualifier),
    };
    match bounds {
        Some((begin, end)) => Span::new(begin, end),
        None => Span::empty(node.begin()),
    }
}

/// Where to insert a name into an anonymous namespace: just after the
/// `namespace` keyword.
pub fn anonymous_name_insertion_point(anon: &AnonNamespaceMatch) -> u64 {
    anon.keyword.end
}

// ============================================================================
// Using Statements
// ============================================================================

/// Resolved extent of a using-statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsingStatement {
    /// From the first keyword through the terminating `;`.
    pub statement: Span,
    /// The written path being nominated, aliased or imported.
    pub target: Span,
}

/// Locate the terminator of `using` and compute its spans.
///
/// Returns `None` when the first token after the declaration is not `;`.
pub fn using_statement(source: &str, using: &UsingMatch) -> Option<UsingStatement> {
    let bytes = source.as_bytes();
    let mut pos = (using.decl_end as usize).min(bytes.len());
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes[pos..].starts_with(b"//") {
            pos = bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |i| pos + i);
        } else if bytes[pos..].starts_with(b"/*") {
            pos = source[pos + 2..]
                .find("*/")
                .map_or(bytes.len(), |i| pos + 2 + i + 2);
        } else {
            break;
        }
    }
    if bytes.get(pos) != Some(&b';') {
        return None;
    }
    Some(UsingStatement {
        statement: Span::new(using.begin, pos as u64 + 1),
        target: Span::new(using.target_begin, using.decl_end),
    })
}

// ============================================================================
// Written Qualifiers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct WrittenSegment {
    name: String,
    /// Relative offset of the first character of the name.
    start: usize,
    /// Relative offset just past the following `::`.
    end: usize,
}

/// A qualifier exactly as spelled in the source, with per-segment ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenQualifier {
    span: Span,
    global_end: Option<usize>,
    segments: Vec<WrittenSegment>,
}

impl WrittenQualifier {
    /// Read the qualifier text covered by `span`.
    pub fn read(source: &str, span: Span) -> Self {
        let text = source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("");
        let mut segments = Vec::new();
        let mut global_end = None;
        let mut cursor = 0;
        for (sep, _) in text.match_indices(SCOPE_SEPARATOR) {
            let piece = &text[cursor..sep];
            let trimmed = piece.trim_start();
            if trimmed.trim_end().is_empty() {
                if segments.is_empty() && global_end.is_none() {
                    global_end = Some(sep + SCOPE_SEPARATOR.len());
                }
            } else {
                segments.push(WrittenSegment {
                    name: trimmed.trim_end().to_string(),
                    start: cursor + (piece.len() - trimmed.len()),
                    end: sep + SCOPE_SEPARATOR.len(),
                });
            }
            cursor = sep + SCOPE_SEPARATOR.len();
        }
        let tail = &text[cursor..];
        let trimmed = tail.trim_start();
        if !trimmed.trim_end().is_empty() {
            segments.push(WrittenSegment {
                name: trimmed.trim_end().to_string(),
                start: cursor + (tail.len() - trimmed.len()),
                end: text.len(),
            });
        }
        WrittenQualifier {
            span,
            global_end,
            segments,
        }
    }

    /// The written namespace path.
    pub fn path(&self) -> NamespacePath {
        NamespacePath::from_segments(self.segments.iter().map(|s| s.name.clone()))
    }

    /// Where a new qualifier is inserted: after a leading global `::`,
    /// otherwise at the qualifier's begin.
    pub fn insertion_point(&self) -> u64 {
        self.span.start + self.global_end.unwrap_or(0) as u64
    }

    /// Span covering the first `count` segments and their separators.
    ///
    /// `count` is clamped to the number of segments.
    pub fn leading_span(&self, count: usize) -> Span {
        let count = count.min(self.segments.len());
        if count == 0 {
            return Span::empty(self.insertion_point());
        }
        let base = self.span.start;
        Span::new(
            base + self.segments[0].start as u64,
            base + self.segments[count - 1].end as u64,
        )
    }
}
