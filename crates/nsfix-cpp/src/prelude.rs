//! Built-in declarations of the standard and Boost libraries.
//!
//! Projects are analyzed without their system headers, so these stand in
//! for them. Their using-declarations are exported like any header's.

pub const STD: &str = include_str!("../prelude/std.hpp");
pub const BOOST: &str = include_str!("../prelude/boost.hpp");

/// `(name, text)` of every prelude header, in indexing order.
pub const HEADERS: &[(&str, &str)] = &[("<prelude>/std.hpp", STD), ("<prelude>/boost.hpp", BOOST)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SymbolIndex;
    use crate::scanner::scan;
    use nsfix_core::adapter::DeclKind;
    use nsfix_core::path::NamespacePath;

    fn index() -> SymbolIndex {
        let mut index = SymbolIndex::new();
        for (_, text) in HEADERS {
            index.add_model(&scan(text), true);
        }
        index
    }

    fn path(text: &str) -> NamespacePath {
        NamespacePath::from(text)
    }

    #[test]
    fn headers_scan_to_balanced_scopes() {
        for (name, text) in HEADERS {
            assert_eq!(scan(text).unclosed, 0, "{name} has unclosed scopes");
        }
    }

    #[test]
    fn std_names() {
        let index = index();
        for name in ["string", "vector", "cout", "endl", "pair", "function", "swap"] {
            let decl = index.find_member(&path("std"), name);
            assert_eq!(decl.map(|d| d.path), Some(path("std")), "{name}");
        }
        let clock = index.find_member(&path("std::chrono"), "steady_clock");
        assert_eq!(clock.map(|d| d.kind), Some(DeclKind::Class));
        assert!(index.member(&path("std::placeholders"), "_1").is_some());
        assert_eq!(
            index.child(&path("std"), "chrono_literals"),
            Some(&path("std"))
        );
    }

    #[test]
    fn c_library_names_stay_global() {
        let index = index();
        for name in ["size_t", "strlen", "memcpy", "printf"] {
            let decl = index.find_member(&path("std"), name);
            assert_eq!(decl.map(|d| d.path), Some(NamespacePath::global()), "{name}");
        }
    }

    #[test]
    fn boost_names_report_their_declaring_namespace() {
        let index = index();
        let cases = [
            ("boost", "iterator_facade", "boost::iterators"),
            ("boost", "bidirectional_traversal_tag", "boost::iterators"),
            ("boost", "less_than_comparable", "boost::operators_impl"),
            ("boost::python", "object", "boost::python::api"),
            ("boost::python", "self", "boost::python::self_ns"),
            ("boost::python", "dict", "boost::python"),
            ("boost", "shared_ptr", "boost"),
        ];
        for (namespace, name, expected) in cases {
            let decl = index.find_member(&path(namespace), name);
            assert_eq!(decl.map(|d| d.path), Some(path(expected)), "{namespace}::{name}");
        }
    }
}
