//! Core infrastructure for nsfix.
//!
//! This crate provides the language-agnostic parts of the rewriter:
//! - Namespace paths and the exclusion policy
//! - The qualification resolver (which qualifier text to insert or replace)
//! - Span resolution over the reference node model
//! - The concurrent patch store and the patch applier
//! - The using-statement eliminator and anonymous-namespace disambiguator
//! - Configuration, diagnostics, file discovery and the run driver
//!
//! The resolution capability (parsing, name lookup) is supplied by a
//! front end implementing [`adapter::ResolutionFacility`].

pub mod adapter;
pub mod anon;
pub mod apply;
pub mod config;
pub mod diagnostic;
pub mod diff;
pub mod driver;
pub mod error;
pub mod output;
pub mod patch;
pub mod path;
pub mod policy;
pub mod qualify;
pub mod span;
pub mod text;
pub mod types;
pub mod using;
pub mod workspace;

pub use adapter::{
    AnonNamespaceMatch, AnonRefMatch, DeclKind, Declaration, RefMatch, ResolutionFacility,
    UnitMatches, UsingKind, UsingMatch,
};
pub use error::{NsfixError, OutputErrorCode};
pub use patch::{ContentHash, Patch, PatchConflict, PatchStore, Span};
pub use path::NamespacePath;
pub use policy::ExclusionPolicy;
pub use types::{Location, SourceFile};
