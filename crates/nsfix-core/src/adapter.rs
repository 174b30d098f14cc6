//! Front-end adapter trait and the match records it produces.
//!
//! A resolution facility parses a translation unit, performs name lookup,
//! and reports the constructs the rewriting passes act on. The passes never
//! see the front end's own data structures: everything crosses this seam as
//! the plain types below.
//!
//! ## Node model
//!
//! A reference is described by the syntax it was written with:
//!
//! - [`RefNode::Expr`]: a name used as a value, optionally qualified
//! - [`RefNode::Type`]: a type name, possibly cv-qualified and elaborated
//! - [`RefNode::Nested`]: a name used as a qualifier component (`X::` in `X::y`)
//!
//! Every position in the model is a spelling position in the unit's own
//! text, so spans computed from it can be patched directly.

use serde::{Deserialize, Serialize};

use crate::error::NsfixError;
use crate::patch::Span;
use crate::path::NamespacePath;
use crate::types::SourceFile;

// ============================================================================
// Declarations
// ============================================================================

/// What sort of entity a declaration introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Enum,
    Enumerator,
    TypeAlias,
    Function,
    Variable,
    /// Known only to live in a namespace the qualifier resolved to.
    Unknown,
}

impl DeclKind {
    /// True for kinds that name a type.
    pub fn is_type(self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Enum | DeclKind::TypeAlias)
    }
}

/// The declaration a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Unqualified name.
    pub name: String,
    /// Enclosing named namespaces, outermost first, inline namespaces removed.
    pub path: NamespacePath,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn new(name: impl Into<String>, path: NamespacePath, kind: DeclKind) -> Self {
        Declaration {
            name: name.into(),
            path,
            kind,
        }
    }
}

// ============================================================================
// Reference Node Model
// ============================================================================

/// A single identifier token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameToken {
    pub text: String,
    pub span: Span,
}

impl NameToken {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        NameToken {
            text: text.into(),
            span,
        }
    }
}

/// What a qualifier component names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Namespace,
    NamespaceAlias,
    Type,
}

/// One `name ::` component of a nested-name qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub name: NameToken,
    /// Span of the `::` following the name.
    pub separator: Span,
    pub kind: SpecifierKind,
}

/// A written nested-name qualifier such as `::std::chrono::`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedNameSpecifier {
    /// Span of a leading global `::`, if written.
    pub global: Option<Span>,
    pub specifiers: Vec<Specifier>,
}

impl NestedNameSpecifier {
    /// Offset of the first character of the qualifier.
    pub fn begin(&self) -> Option<u64> {
        self.global
            .map(|g| g.start)
            .or_else(|| self.specifiers.first().map(|s| s.name.span.start))
    }

    /// Offset just past the final `::`.
    pub fn end(&self) -> Option<u64> {
        self.specifiers
            .last()
            .map(|s| s.separator.end)
            .or_else(|| self.global.map(|g| g.end))
    }

    /// True if the last component names a type.
    pub fn specifies_type(&self) -> bool {
        self.specifiers
            .last()
            .is_some_and(|s| s.kind == SpecifierKind::Type)
    }

    /// Offset just past the qualifier without its last component.
    ///
    /// For `std::vector::` this is the end of `std::`; with a single
    /// component it is the qualifier's own begin.
    pub fn prefix_end(&self) -> Option<u64> {
        match self.specifiers.len() {
            0 => self.end(),
            1 => self.global.map(|g| g.end).or_else(|| self.begin()),
            n => Some(self.specifiers[n - 2].separator.end),
        }
    }
}

/// Type syntax, outermost wrapper first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLoc {
    /// A cv-qualified type; the qualifiers carry no position of their own.
    Qualified(Box<TypeLoc>),
    /// A type written with a qualifier or an elaborating keyword.
    Elaborated {
        qualifier: Option<NestedNameSpecifier>,
        named: Box<TypeLoc>,
    },
    Named(NameToken),
}

impl TypeLoc {
    /// The type name token under all wrappers.
    pub fn name(&self) -> &NameToken {
        match self {
            TypeLoc::Qualified(inner) => inner.name(),
            TypeLoc::Elaborated { named, .. } => named.name(),
            TypeLoc::Named(name) => name,
        }
    }
}

/// A reference as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefNode {
    Expr {
        qualifier: Option<NestedNameSpecifier>,
        name: NameToken,
    },
    Type(TypeLoc),
    Nested {
        qualifier: NestedNameSpecifier,
        /// The name following the qualifier.
        member: NameToken,
    },
}

impl RefNode {
    /// Offset of the first character of the reference.
    pub fn begin(&self) -> u64 {
        match self {
            RefNode::Expr { qualifier, name } => qualifier
                .as_ref()
                .and_then(NestedNameSpecifier::begin)
                .unwrap_or(name.span.start),
            RefNode::Type(ty) => crate::span::type_begin(ty),
            RefNode::Nested { qualifier, member } => {
                qualifier.begin().unwrap_or(member.span.start)
            }
        }
    }

    /// Span covering the whole reference.
    pub fn span(&self) -> Span {
        let end = match self {
            RefNode::Expr { name, .. } => name.span.end,
            RefNode::Type(ty) => ty.name().span.end,
            RefNode::Nested { member, .. } => member.span.end,
        };
        Span::new(self.begin(), end)
    }
}

// ============================================================================
// Match Records
// ============================================================================

/// A reference in the primary file resolved to a namespace-scope declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMatch {
    pub node: RefNode,
    pub decl: Declaration,
    /// Lexically enclosing named namespace of the reference; `None` at
    /// global scope and inside anonymous namespaces.
    pub context: Option<NamespacePath>,
}

/// Which flavour of using-statement was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsingKind {
    /// `using namespace X;`
    Directive,
    /// `using X::y;`
    Declaration,
    /// `namespace a = X;`
    NamespaceAlias,
}

/// A using-statement in the primary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingMatch {
    pub kind: UsingKind,
    /// Offset of the statement's first keyword.
    pub begin: u64,
    /// Offset of the first character of the named path (after `namespace`,
    /// `using`, or `=`), including any qualifier.
    pub target_begin: u64,
    /// Offset just past the last token of the declaration, before `;`.
    pub decl_end: u64,
}

/// An anonymous `namespace {` in the primary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonNamespaceMatch {
    /// Span of the `namespace` keyword.
    pub keyword: Span,
}

/// A reference outside any anonymous namespace to a declaration whose
/// innermost enclosing scope is an anonymous namespace of the primary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonRefMatch {
    pub node: RefNode,
    pub decl: Declaration,
}

/// Everything a facility reports for one translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitMatches {
    pub references: Vec<RefMatch>,
    pub usings: Vec<UsingMatch>,
    pub anon_namespaces: Vec<AnonNamespaceMatch>,
    pub anon_references: Vec<AnonRefMatch>,
}

// ============================================================================
// Facility Trait
// ============================================================================

/// Semantic resolution for one source language.
///
/// Only constructs spelled in the unit's own file are reported.
pub trait ResolutionFacility: Send + Sync {
    /// Short front-end name for logs.
    fn name(&self) -> &'static str;

    /// Parse `unit` and report every construct the passes act on.
    fn analyze_unit(&self, unit: &SourceFile) -> Result<UnitMatches, NsfixError>;

    /// Resolve the reference whose written span contains `offset`.
    fn resolve_reference(&self, unit: &SourceFile, offset: u64) -> Option<Declaration>;

    /// Lexically enclosing named namespace at `offset`.
    fn enclosing_scope(&self, unit: &SourceFile, offset: u64) -> Option<NamespacePath>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, start: u64, kind: SpecifierKind) -> Specifier {
        let end = start + name.len() as u64;
        Specifier {
            name: NameToken::new(name, Span::new(start, end)),
            separator: Span::new(end, end + 2),
            kind,
        }
    }

    #[test]
    fn nested_name_specifier_bounds() {
        // std::vector::
        let nns = NestedNameSpecifier {
            global: None,
            specifiers: vec![
                spec("std", 0, SpecifierKind::Namespace),
                spec("vector", 5, SpecifierKind::Type),
            ],
        };
        assert_eq!(nns.begin(), Some(0));
        assert_eq!(nns.end(), Some(13));
        assert_eq!(nns.prefix_end(), Some(5));
        assert!(nns.specifies_type());
    }

    #[test]
    fn single_component_prefix_end_is_begin() {
        let nns = NestedNameSpecifier {
            global: None,
            specifiers: vec![spec("steady_clock", 10, SpecifierKind::Type)],
        };
        assert_eq!(nns.prefix_end(), Some(10));
    }

    #[test]
    fn global_qualifier_prefix_end_follows_global() {
        // ::string::
        let nns = NestedNameSpecifier {
            global: Some(Span::new(0, 2)),
            specifiers: vec![spec("string", 2, SpecifierKind::Type)],
        };
        assert_eq!(nns.begin(), Some(0));
        assert_eq!(nns.prefix_end(), Some(2));
    }

    #[test]
    fn ref_node_span_covers_qualifier_and_name() {
        let node = RefNode::Expr {
            qualifier: Some(NestedNameSpecifier {
                global: None,
                specifiers: vec![spec("ph", 4, SpecifierKind::NamespaceAlias)],
            }),
            name: NameToken::new("_1", Span::new(8, 10)),
        };
        assert_eq!(node.span(), Span::new(4, 10));
    }

    #[test]
    fn type_kinds() {
        assert!(DeclKind::Class.is_type());
        assert!(DeclKind::TypeAlias.is_type());
        assert!(!DeclKind::Function.is_type());
        assert!(!DeclKind::Unknown.is_type());
    }
}
