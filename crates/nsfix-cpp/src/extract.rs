//! Match extraction: turns one scanned file into the records the rewrite
//! passes consume.

use nsfix_core::adapter::{AnonNamespaceMatch, AnonRefMatch, RefMatch, UnitMatches, UsingMatch};
use nsfix_core::path::NamespacePath;
use tracing::debug;

use crate::index::SymbolIndex;
use crate::lookup::{Lookup, Resolution};
use crate::scanner::{FileModel, ScopeId, ScopeKind};

/// Innermost enclosing named namespace of `scope`; `None` at global scope
/// and inside anonymous namespaces.
pub fn reference_context(model: &FileModel, scope: ScopeId) -> Option<NamespacePath> {
    let namespace = model.scope(model.namespace_of(scope));
    match namespace.kind {
        ScopeKind::Namespace { .. } if !namespace.path.is_empty() => Some(namespace.path.clone()),
        _ => None,
    }
}

pub fn extract(model: &FileModel, index: &SymbolIndex) -> UnitMatches {
    let lookup = Lookup::new(model, index);
    let mut matches = UnitMatches::default();
    let mut local = 0usize;
    let mut unresolved = 0usize;

    for reference in &model.references {
        let resolved = match lookup.resolve(reference) {
            Resolution::Found(resolved) => resolved,
            Resolution::Local => {
                local += 1;
                continue;
            }
            Resolution::Unresolved => {
                unresolved += 1;
                continue;
            }
        };
        if resolved.anonymous {
            if !model.in_anonymous(reference.scope) {
                matches.anon_references.push(AnonRefMatch {
                    node: resolved.node,
                    decl: resolved.decl,
                });
            }
        } else if !resolved.decl.path.is_empty() {
            matches.references.push(RefMatch {
                node: resolved.node,
                decl: resolved.decl,
                context: reference_context(model, reference.scope),
            });
        }
    }

    matches.usings = model
        .usings
        .iter()
        .map(|using| UsingMatch {
            kind: using.kind,
            begin: using.begin,
            target_begin: using.target_begin,
            decl_end: using.decl_end,
        })
        .collect();
    matches.anon_namespaces = model
        .anon_namespaces
        .iter()
        .map(|&keyword| AnonNamespaceMatch { keyword })
        .collect();

    debug!(
        references = matches.references.len(),
        anon_references = matches.anon_references.len(),
        usings = matches.usings.len(),
        local,
        unresolved,
        "extracted matches"
    );
    matches
}
