//! Qualification resolver.
//!
//! Given the namespace path of a declaration and the qualifier a reference
//! was written with, decide the minimal edit that makes the reference fully
//! qualified:
//!
//! 1. Excluded namespaces and symbols are left alone.
//! 2. A qualifier that already spells the declaration path needs nothing.
//! 3. Trailing invisible segments (`__detail`, `boost::iterators`, ...) are
//!    dropped from the declaration path.
//! 4. The longest common suffix of the written and declaration paths is
//!    already correct and is kept.
//! 5. Leading segments shared with the reference's enclosing namespace are
//!    implied and not spelled.
//!
//! What remains of the declaration path is either inserted in front of the
//! reference or replaces the leftover written prefix.

use tracing::trace;

use crate::adapter::RefMatch;
use crate::driver::PassContext;
use crate::patch::{AddOutcome, Patch, PatchConflict};
use crate::path::NamespacePath;
use crate::policy::ExclusionPolicy;
use crate::span::{qualifier_span, WrittenQualifier};

/// Patch label for qualification edits.
pub const QUALIFY_LABEL: &str = "inline namespace";

/// The edit a reference needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Leave the reference as written.
    None,
    /// Insert the text at the start of the reference.
    InsertBefore(String),
    /// Replace the first `segments` written qualifier components with the text.
    ReplaceSpan { segments: usize, text: String },
}

/// Compute the qualification edit for one reference.
///
/// `ref_path` is the written qualifier (empty when unqualified) and
/// `ref_context` the reference's enclosing named namespace.
pub fn resolve(
    decl_path: &NamespacePath,
    decl_symbol: &str,
    ref_path: &NamespacePath,
    ref_context: Option<&NamespacePath>,
    policy: &ExclusionPolicy,
) -> Edit {
    if policy.excludes_namespace(decl_path) || policy.excludes_symbol(decl_path, decl_symbol) {
        return Edit::None;
    }
    if ref_path == decl_path {
        return Edit::None;
    }

    let decl = decl_path.segments();
    let written = ref_path.segments();
    let mut decl_end = policy.visible_len(decl_path, decl_symbol);
    let mut ref_end = written.len();

    while ref_end > 0 && decl_end > 0 && written[ref_end - 1] == decl[decl_end - 1] {
        ref_end -= 1;
        decl_end -= 1;
    }

    let decl_begin = ref_context.map_or(0, |context| context.common_prefix_len(decl_path));
    if decl_begin >= decl_end {
        return Edit::None;
    }

    let text = decl_path.qualifier(decl_begin..decl_end);
    if ref_end == 0 {
        Edit::InsertBefore(text)
    } else {
        Edit::ReplaceSpan {
            segments: ref_end,
            text,
        }
    }
}

/// Turn a resolved reference into a patch.
///
/// Returns `Ok(None)` when the reference needs no edit.
pub fn fix_reference(
    ctx: &PassContext<'_>,
    reference: &RefMatch,
) -> Result<Option<AddOutcome>, PatchConflict> {
    if reference.decl.path.is_empty() {
        return Ok(None);
    }
    let span = qualifier_span(&reference.node);
    let written = WrittenQualifier::read(ctx.source.text(), span);
    let edit = resolve(
        &reference.decl.path,
        &reference.decl.name,
        &written.path(),
        reference.context.as_ref(),
        ctx.policy,
    );
    trace!(
        file = ctx.source.relative_path(),
        symbol = %reference.decl.name,
        decl = %reference.decl.path,
        written = %written.path(),
        ?edit,
        "resolved reference"
    );

    let file = ctx.source.path();
    let patch = match edit {
        Edit::None => return Ok(None),
        Edit::InsertBefore(text) => {
            Patch::insert(file, written.insertion_point(), text, QUALIFY_LABEL)
        }
        Edit::ReplaceSpan { segments, text } => {
            Patch::replace(file, written.leading_span(segments), text, QUALIFY_LABEL)
        }
    };
    ctx.store
        .add(ctx.source, patch, reference.node.begin(), ctx.sink)
        .map(Some)
}
