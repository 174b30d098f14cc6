//! C++ front end for nsfix.
//!
//! A lightweight resolution facility that needs no compiler toolchain:
//! - Lexing with byte spans
//! - Scope and declaration scanning
//! - A project-wide symbol index seeded with `std` and `boost` preludes
//! - C++ name lookup over the index and the primary file's usings
//! - Extraction of the matches consumed by the rewrite passes

pub mod extract;
pub mod facility;
pub mod index;
pub mod lexer;
pub mod lookup;
pub mod prelude;
pub mod scanner;

pub use facility::CppFacility;
