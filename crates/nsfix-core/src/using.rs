//! Using-statement eliminator.
//!
//! Once every reference is qualified, `using namespace X;`, `using X::y;`
//! and `namespace a = X;` for eligible namespaces are dead weight. Each one
//! is removed together with the whitespace (and, when it stands alone, the
//! line) around it.

use tracing::debug;

use crate::adapter::UsingMatch;
use crate::driver::PassContext;
use crate::patch::{AddOutcome, Patch, PatchConflict};
use crate::path::NamespacePath;
use crate::span::using_statement;
use crate::text::expand_removal;

/// Patch label for using removals.
pub const REMOVE_USING_LABEL: &str = "remove using";

/// Remove `using` if it names an eligible namespace.
///
/// Returns `Ok(None)` when the statement is kept.
pub fn fix_using(
    ctx: &PassContext<'_>,
    using: &UsingMatch,
) -> Result<Option<AddOutcome>, PatchConflict> {
    let text = ctx.source.text();
    let Some(statement) = using_statement(text, using) else {
        debug!(
            file = ctx.source.relative_path(),
            offset = using.begin,
            "using-statement terminator not found, skipping"
        );
        return Ok(None);
    };

    let target = NamespacePath::parse(ctx.source.slice(statement.target));
    if ctx.policy.excludes_namespace(&target) {
        debug!(
            file = ctx.source.relative_path(),
            target = %target,
            "using-statement names an excluded namespace, keeping"
        );
        return Ok(None);
    }

    let removal = expand_removal(text, statement.statement);
    let patch = Patch::remove(ctx.source.path(), removal, REMOVE_USING_LABEL);
    ctx.store
        .add(ctx.source, patch, using.begin, ctx.sink)
        .map(Some)
}
