//! Name lookup for scanned references.
//!
//! A reference is looked up from its scope outward. Names bound in an
//! enclosing class or block (parameters, locals, members, template
//! parameters) shadow everything else and leave the reference alone.
//! At each enclosing namespace the search order is:
//!
//! 1. members of this file's anonymous namespaces that live there
//! 2. indexed members and the using-declarations that import them
//! 3. members of namespaces nominated by using-directives whose nearest
//!    common enclosing namespace with the nominated one is this namespace
//!
//! Leading qualifier segments are resolved as namespaces or namespace
//! aliases; the first segment that is neither names the symbol.

use nsfix_core::adapter::{
    DeclKind, Declaration, NameToken, NestedNameSpecifier, RefNode, Specifier, SpecifierKind,
    TypeLoc, UsingKind,
};
use nsfix_core::patch::Span;
use nsfix_core::path::NamespacePath;

use crate::index::SymbolIndex;
use crate::scanner::{FileModel, RawReference, ScannedUsing, ScopeId, ScopeKind, Segment};

/// Outcome of looking up one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The leading name is bound in an enclosing class or block.
    Local,
    Found(Resolved),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub decl: Declaration,
    /// Declared directly in one of this file's anonymous namespaces.
    pub anonymous: bool,
    pub node: RefNode,
}

/// A using-directive as seen from one reference.
#[derive(Debug, Clone)]
struct VisibleDirective {
    /// Namespace whose lookup sees the nominated members.
    placement: NamespacePath,
    nominated: NamespacePath,
}

pub struct Lookup<'a> {
    model: &'a FileModel,
    index: &'a SymbolIndex,
}

impl<'a> Lookup<'a> {
    pub fn new(model: &'a FileModel, index: &'a SymbolIndex) -> Self {
        Lookup { model, index }
    }

    pub fn resolve(&self, reference: &RawReference) -> Resolution {
        let segments = &reference.segments;
        let Some(first) = segments.first() else {
            return Resolution::Unresolved;
        };
        let scope = reference.scope;
        let offset = reference.begin();
        if reference.global.is_none() && self.is_bound(scope, &first.text) {
            return Resolution::Local;
        }

        let mut namespace = reference.global.map(|_| NamespacePath::global());
        let mut kinds = Vec::new();
        let mut symbol = 0;
        while symbol + 1 < segments.len() {
            let name = segments[symbol].text.as_str();
            let step = match &namespace {
                None => self.find_namespace(scope, offset, name),
                Some(current) => self.namespace_member(current, name),
            };
            let Some((next, kind)) = step else {
                break;
            };
            namespace = Some(next);
            kinds.push(kind);
            symbol += 1;
        }

        let name = segments[symbol].text.as_str();
        let found = match &namespace {
            None => self.unqualified(scope, offset, name),
            Some(current) => self.qualified(current, name).or_else(|| {
                // The namespace is known even if this member is not.
                (!current.is_empty())
                    .then(|| (Declaration::new(name, current.clone(), DeclKind::Unknown), false))
            }),
        };
        match found {
            Some((decl, anonymous)) => Resolution::Found(Resolved {
                node: build_node(reference, symbol, &kinds, decl.kind),
                decl,
                anonymous,
            }),
            None => Resolution::Unresolved,
        }
    }

    fn is_bound(&self, scope: ScopeId, name: &str) -> bool {
        self.model
            .ancestors(scope)
            .any(|s| self.model.binds(s, name))
    }

    fn is_namespace_level(&self, scope: ScopeId) -> bool {
        matches!(
            self.model.scope(scope).kind,
            ScopeKind::Global | ScopeKind::Namespace { .. } | ScopeKind::Anonymous
        )
    }

    /// Usings of `kind` written directly in `scope` before `offset`.
    fn usings_in(
        &self,
        scope: ScopeId,
        offset: u64,
        kind: UsingKind,
    ) -> impl Iterator<Item = &'a ScannedUsing> + 'a {
        self.model
            .usings
            .iter()
            .filter(move |u| u.kind == kind && u.scope == scope && u.begin < offset)
    }

    /// Child namespace or namespace alias `name` of `namespace`.
    fn namespace_member(
        &self,
        namespace: &NamespacePath,
        name: &str,
    ) -> Option<(NamespacePath, SpecifierKind)> {
        if let Some(child) = self.index.child(namespace, name) {
            return Some((child.clone(), SpecifierKind::Namespace));
        }
        self.index
            .resolve_alias(namespace, name)
            .map(|path| (path, SpecifierKind::NamespaceAlias))
    }

    /// Resolve an unqualified namespace name seen at `offset` in `scope`.
    fn find_namespace(
        &self,
        scope: ScopeId,
        offset: u64,
        name: &str,
    ) -> Option<(NamespacePath, SpecifierKind)> {
        for level in self.model.ancestors(scope) {
            let alias = self
                .usings_in(level, offset, UsingKind::NamespaceAlias)
                .filter(|u| u.alias.as_deref() == Some(name))
                .last();
            if let Some(path) = alias.and_then(|u| self.using_target(u)) {
                return Some((path, SpecifierKind::NamespaceAlias));
            }
            if self.is_namespace_level(level) {
                if let Some(hit) = self.namespace_member(&self.model.scope(level).path, name) {
                    return Some(hit);
                }
            }
        }
        self.visible_directives(scope, offset)
            .into_iter()
            .find_map(|d| self.index.child(&d.nominated, name).cloned())
            .map(|path| (path, SpecifierKind::Namespace))
    }

    /// Resolve a written namespace path seen at `offset` in `scope`.
    fn resolve_written(
        &self,
        scope: ScopeId,
        offset: u64,
        global: bool,
        segments: &[String],
    ) -> Option<NamespacePath> {
        let (first, rest) = segments.split_first()?;
        let (start, _) = if global {
            self.namespace_member(&NamespacePath::global(), first)?
        } else {
            self.find_namespace(scope, offset, first)?
        };
        rest.iter().try_fold(start, |ns, segment| {
            self.namespace_member(&ns, segment).map(|(path, _)| path)
        })
    }

    /// Namespace named by a directive or alias, resolved where it was written.
    fn using_target(&self, using: &ScannedUsing) -> Option<NamespacePath> {
        self.resolve_written(using.scope, using.begin, using.global, using.target.segments())
    }

    /// Every directive in effect at `offset` in `scope`, from this file and
    /// from indexed headers.
    fn visible_directives(&self, scope: ScopeId, offset: u64) -> Vec<VisibleDirective> {
        let mut directives = Vec::new();
        for level in self.model.ancestors(scope) {
            for using in self.usings_in(level, offset, UsingKind::Directive) {
                let Some(nominated) = self.using_target(using) else {
                    continue;
                };
                let from = &self.model.scope(self.model.namespace_of(using.scope)).path;
                directives.push(VisibleDirective {
                    placement: from.prefix(from.common_prefix_len(&nominated)),
                    nominated,
                });
            }
            let level_scope = self.model.scope(level);
            if matches!(level_scope.kind, ScopeKind::Global | ScopeKind::Namespace { .. }) {
                let from = &level_scope.path;
                for target in self.index.directives(from) {
                    if let Some(nominated) = self.index.resolve_namespace(from, target) {
                        directives.push(VisibleDirective {
                            placement: from.prefix(from.common_prefix_len(&nominated)),
                            nominated,
                        });
                    }
                }
            }
        }
        directives
    }

    /// Members of this file's anonymous namespaces visible in `namespace`.
    fn file_local_member(&self, namespace: &NamespacePath, name: &str) -> Option<(Declaration, bool)> {
        self.model.decls.iter().find_map(|decl| {
            if decl.name != name || !self.model.in_anonymous(decl.scope) {
                return None;
            }
            let owner = self.model.scope(self.model.namespace_of(decl.scope));
            (owner.path == *namespace).then(|| {
                (
                    Declaration::new(decl.name.as_str(), namespace.clone(), decl.kind),
                    owner.kind == ScopeKind::Anonymous,
                )
            })
        })
    }

    /// Look `name` up as a member of `namespace`.
    fn qualified(&self, namespace: &NamespacePath, name: &str) -> Option<(Declaration, bool)> {
        self.file_local_member(namespace, name).or_else(|| {
            self.index
                .find_member(namespace, name)
                .map(|decl| (decl, false))
        })
    }

    /// Declaration imported by a using-declaration written in `scope`.
    fn imported(&self, scope: ScopeId, offset: u64, name: &str) -> Option<Declaration> {
        self.usings_in(scope, offset, UsingKind::Declaration)
            .filter(|u| u.target.last() == Some(name))
            .find_map(|using| {
                let (_, qualifier) = using.target.segments().split_last()?;
                let source = if qualifier.is_empty() {
                    using.global.then(NamespacePath::global)?
                } else {
                    self.resolve_written(using.scope, using.begin, using.global, qualifier)?
                };
                self.qualified(&source, name).map(|(decl, _)| decl)
            })
    }

    fn unqualified(&self, scope: ScopeId, offset: u64, name: &str) -> Option<(Declaration, bool)> {
        let directives = self.visible_directives(scope, offset);
        for level in self.model.ancestors(scope) {
            if let Some(decl) = self.imported(level, offset, name) {
                return Some((decl, false));
            }
            if !self.is_namespace_level(level) {
                continue;
            }
            let level_scope = self.model.scope(level);
            let path = &level_scope.path;
            if let Some(hit) = self.file_local_member(path, name) {
                return Some(hit);
            }
            if level_scope.kind != ScopeKind::Anonymous {
                if let Some(decl) = self.index.find_member(path, name) {
                    return Some((decl, false));
                }
            }
            for directive in directives.iter().filter(|d| d.placement == *path) {
                if let Some(hit) = self.qualified(&directive.nominated, name) {
                    return Some(hit);
                }
            }
        }
        None
    }
}

fn token(segment: &Segment) -> NameToken {
    NameToken::new(segment.text.as_str(), segment.span)
}

fn specifier(segment: &Segment, kind: SpecifierKind) -> Specifier {
    Specifier {
        name: token(segment),
        separator: segment
            .separator
            .unwrap_or_else(|| Span::empty(segment.span.end)),
        kind,
    }
}

/// Shape the written chain as a syntax node: `segments[symbol]` names the
/// declaration, the segments before it are namespaces of `kinds`.
fn build_node(reference: &RawReference, symbol: usize, kinds: &[SpecifierKind], kind: DeclKind) -> RefNode {
    let segments = &reference.segments;
    let mut specifiers: Vec<Specifier> = segments[..symbol]
        .iter()
        .zip(kinds)
        .map(|(segment, kind)| specifier(segment, *kind))
        .collect();
    let named = &segments[symbol];

    if let Some(member) = segments.get(symbol + 1) {
        specifiers.push(specifier(named, SpecifierKind::Type));
        return RefNode::Nested {
            qualifier: NestedNameSpecifier {
                global: reference.global,
                specifiers,
            },
            member: token(member),
        };
    }

    let qualifier = (reference.global.is_some() || !specifiers.is_empty()).then(|| {
        NestedNameSpecifier {
            global: reference.global,
            specifiers,
        }
    });
    if !(kind.is_type() || reference.elaborated || reference.cv_qualified) {
        return RefNode::Expr {
            qualifier,
            name: token(named),
        };
    }
    let ty = if qualifier.is_some() || reference.elaborated {
        TypeLoc::Elaborated {
            qualifier,
            named: Box::new(TypeLoc::Named(token(named))),
        }
    } else {
        TypeLoc::Named(token(named))
    };
    if reference.cv_qualified {
        RefNode::Type(TypeLoc::Qualified(Box::new(ty)))
    } else {
        RefNode::Type(ty)
    }
}
