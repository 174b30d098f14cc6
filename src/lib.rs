//! nsfix: namespace rewriting for large C++ codebases
//!
//! Qualifies `std`/`boost` references so their using-statements can be
//! removed, and names anonymous namespaces after their file so unity builds
//! stay unambiguous.

// Core infrastructure - re-exported from nsfix-core
pub use nsfix_core::apply;
pub use nsfix_core::config;
pub use nsfix_core::driver;
pub use nsfix_core::error;
pub use nsfix_core::output;
pub use nsfix_core::policy;

// C++ front end
pub use nsfix_cpp::CppFacility;

// Front door
pub mod cli;
