//! Project-wide symbol index.
//!
//! Collects, across every scanned file:
//!
//! - the namespace tree (inline namespaces fold into their parent)
//! - the declarations at namespace scope, keyed by visible path and name
//! - using-declarations, using-directives and namespace aliases written at
//!   namespace scope in files whose usings leak into their includers
//!   (headers and the built-in prelude)
//!
//! Declarations inside anonymous namespaces are file-local and never
//! indexed; the lookup for the file that declares them reads them from
//! its own [`FileModel`].

use std::collections::{HashMap, HashSet};

use nsfix_core::adapter::{Declaration, UsingKind};
use nsfix_core::path::NamespacePath;

use crate::scanner::FileModel;

/// Alias chains longer than this are treated as unresolvable.
const MAX_ALIAS_DEPTH: usize = 16;

/// A namespace path as written in a using-statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingTarget {
    pub global: bool,
    pub path: NamespacePath,
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    /// parent path -> child name -> visible child path
    children: HashMap<NamespacePath, HashMap<String, NamespacePath>>,
    members: HashMap<NamespacePath, HashMap<String, Declaration>>,
    /// namespace -> imported name -> written targets
    using_decls: HashMap<NamespacePath, HashMap<String, Vec<UsingTarget>>>,
    directives: HashMap<NamespacePath, Vec<UsingTarget>>,
    aliases: HashMap<NamespacePath, HashMap<String, UsingTarget>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one scanned file. Usings are recorded only when
    /// `exports_usings` is set.
    pub fn add_model(&mut self, model: &FileModel, exports_usings: bool) {
        for def in &model.namespaces {
            let path = if def.inline {
                def.parent.clone()
            } else {
                def.parent.child(def.name.as_str())
            };
            self.children
                .entry(def.parent.clone())
                .or_default()
                .entry(def.name.clone())
                .or_insert(path);
        }

        for decl in &model.decls {
            if model.in_anonymous(decl.scope) {
                continue;
            }
            let path = model.scope(decl.scope).path.clone();
            self.members
                .entry(path.clone())
                .or_default()
                .entry(decl.name.clone())
                .or_insert_with(|| Declaration::new(decl.name.as_str(), path, decl.kind));
        }

        if !exports_usings {
            return;
        }
        for using in &model.usings {
            let scope = model.scope(using.scope);
            if !scope.is_namespace() || model.in_anonymous(using.scope) {
                continue;
            }
            let namespace = scope.path.clone();
            let target = UsingTarget {
                global: using.global,
                path: using.target.clone(),
            };
            match using.kind {
                UsingKind::Directive => self.directives.entry(namespace).or_default().push(target),
                UsingKind::Declaration => {
                    if let Some(name) = using.target.last() {
                        self.using_decls
                            .entry(namespace)
                            .or_default()
                            .entry(name.to_string())
                            .or_default()
                            .push(target);
                    }
                }
                UsingKind::NamespaceAlias => {
                    if let Some(alias) = &using.alias {
                        self.aliases
                            .entry(namespace)
                            .or_default()
                            .entry(alias.clone())
                            .or_insert(target);
                    }
                }
            }
        }
    }

    pub fn namespace_count(&self) -> usize {
        self.children.values().map(HashMap::len).sum()
    }

    pub fn decl_count(&self) -> usize {
        self.members.values().map(HashMap::len).sum()
    }

    /// Visible path of namespace `name` declared directly in `parent`.
    pub fn child(&self, parent: &NamespacePath, name: &str) -> Option<&NamespacePath> {
        self.children.get(parent)?.get(name)
    }

    /// Declaration of `name` directly in `namespace`.
    pub fn member(&self, namespace: &NamespacePath, name: &str) -> Option<&Declaration> {
        self.members.get(namespace)?.get(name)
    }

    pub fn directives(&self, namespace: &NamespacePath) -> &[UsingTarget] {
        self.directives.get(namespace).map_or(&[], Vec::as_slice)
    }

    /// Target of namespace alias `name` declared in `namespace`.
    pub fn resolve_alias(&self, namespace: &NamespacePath, name: &str) -> Option<NamespacePath> {
        self.resolve_alias_at(namespace, name, 0)
    }

    fn resolve_alias_at(&self, namespace: &NamespacePath, name: &str, depth: usize) -> Option<NamespacePath> {
        let target = self.aliases.get(namespace)?.get(name)?;
        self.resolve_namespace_at(namespace, target, depth + 1)
    }

    /// Child namespace or namespace alias `name` of `namespace`.
    fn namespace_step(&self, namespace: &NamespacePath, name: &str, depth: usize) -> Option<NamespacePath> {
        match self.child(namespace, name) {
            Some(child) => Some(child.clone()),
            None => self.resolve_alias_at(namespace, name, depth),
        }
    }

    /// Resolve a written namespace path as seen from inside `from`.
    ///
    /// The first segment is searched in `from` and then each enclosing
    /// namespace outward.
    pub fn resolve_namespace(&self, from: &NamespacePath, target: &UsingTarget) -> Option<NamespacePath> {
        self.resolve_namespace_at(from, target, 0)
    }

    fn resolve_namespace_at(
        &self,
        from: &NamespacePath,
        target: &UsingTarget,
        depth: usize,
    ) -> Option<NamespacePath> {
        if depth > MAX_ALIAS_DEPTH {
            return None;
        }
        let (first, rest) = target.path.segments().split_first()?;
        let start = if target.global {
            self.namespace_step(&NamespacePath::global(), first, depth)?
        } else {
            let mut level = Some(from.clone());
            let mut found = None;
            while let Some(current) = level {
                if let Some(hit) = self.namespace_step(&current, first, depth) {
                    found = Some(hit);
                    break;
                }
                level = current.parent();
            }
            found?
        };
        rest.iter()
            .try_fold(start, |ns, segment| self.namespace_step(&ns, segment, depth))
    }

    /// Find `name` as a member of `namespace`: declared there, imported by
    /// a using-declaration, or reached through using-directives.
    pub fn find_member(&self, namespace: &NamespacePath, name: &str) -> Option<Declaration> {
        let mut visited = HashSet::new();
        self.find_member_in(namespace, name, &mut visited)
    }

    fn find_member_in(
        &self,
        namespace: &NamespacePath,
        name: &str,
        visited: &mut HashSet<NamespacePath>,
    ) -> Option<Declaration> {
        if !visited.insert(namespace.clone()) {
            return None;
        }
        if let Some(decl) = self.member(namespace, name) {
            return Some(decl.clone());
        }

        let imports = self
            .using_decls
            .get(namespace)
            .and_then(|names| names.get(name))
            .map_or(&[][..], Vec::as_slice);
        for target in imports {
            let Some((_, qualifier)) = target.path.segments().split_last() else {
                continue;
            };
            let source = if qualifier.is_empty() {
                target.global.then(NamespacePath::global)
            } else {
                let qualifier = UsingTarget {
                    global: target.global,
                    path: NamespacePath::from_segments(qualifier.iter().cloned()),
                };
                self.resolve_namespace(namespace, &qualifier)
            };
            if let Some(decl) = source.and_then(|ns| self.find_member_in(&ns, name, visited)) {
                return Some(decl);
            }
        }

        for target in self.directives(namespace) {
            if let Some(decl) = self
                .resolve_namespace(namespace, target)
                .and_then(|nominated| self.find_member_in(&nominated, name, visited))
            {
                return Some(decl);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use nsfix_core::adapter::DeclKind;

    fn index(sources: &[(&str, bool)]) -> SymbolIndex {
        let mut index = SymbolIndex::new();
        for (text, exports) in sources {
            index.add_model(&scan(text), *exports);
        }
        index
    }

    fn path(text: &str) -> NamespacePath {
        NamespacePath::from(text)
    }

    const STD: &str = r#"
typedef unsigned long size_t;
namespace std {
    using ::size_t;
    inline namespace __cxx11 {
        template <class C> class basic_string;
        typedef basic_string<char> string;
    }
    namespace chrono {
        class steady_clock;
    }
    namespace placeholders {
        extern const int _1;
    }
}
namespace boost {
    namespace iterators {
        template <class D> class iterator_facade;
    }
    using iterators::iterator_facade;
    namespace python {
        namespace api { class object; }
        using api::object;
    }
    namespace operators_impl { class less_than_comparable; }
    using namespace operators_impl;
    namespace bp = python;
}
"#;

    #[test]
    fn inline_namespaces_fold_into_their_parent() {
        let index = index(&[(STD, true)]);
        assert_eq!(index.child(&path("std"), "__cxx11"), Some(&path("std")));
        let string = index.member(&path("std"), "string").expect("string");
        assert_eq!(string.kind, DeclKind::TypeAlias);
        assert_eq!(string.path, path("std"));
        assert_eq!(index.child(&path("std"), "chrono"), Some(&path("std::chrono")));
    }

    #[test]
    fn using_declarations_import_members() {
        let index = index(&[(STD, true)]);
        let facade = index
            .find_member(&path("boost"), "iterator_facade")
            .expect("iterator_facade");
        assert_eq!(facade.path, path("boost::iterators"));
        let object = index
            .find_member(&path("boost::python"), "object")
            .expect("object");
        assert_eq!(object.path, path("boost::python::api"));
    }

    #[test]
    fn global_using_declarations_reach_the_global_namespace() {
        let index = index(&[(STD, true)]);
        let size = index.find_member(&path("std"), "size_t").expect("size_t");
        assert!(size.path.is_empty());
    }

    #[test]
    fn directives_are_followed() {
        let index = index(&[(STD, true)]);
        let found = index
            .find_member(&path("boost"), "less_than_comparable")
            .expect("through directive");
        assert_eq!(found.path, path("boost::operators_impl"));
        assert!(index.find_member(&path("boost"), "missing").is_none());
    }

    #[test]
    fn aliases_resolve_relative_to_their_namespace() {
        let index = index(&[(STD, true)]);
        assert_eq!(index.resolve_alias(&path("boost"), "bp"), Some(path("boost::python")));
        let target = UsingTarget {
            global: false,
            path: path("bp::api"),
        };
        assert_eq!(
            index.resolve_namespace(&path("boost"), &target),
            Some(path("boost::python::api"))
        );
    }

    #[test]
    fn usings_from_sources_are_not_exported() {
        let index = index(&[
            (STD, false),
            ("namespace n { using namespace std; }", false),
        ]);
        assert!(index.directives(&path("n")).is_empty());
        assert!(index.find_member(&path("boost"), "iterator_facade").is_none());
    }

    #[test]
    fn anonymous_declarations_are_not_indexed() {
        let index = index(&[("namespace { int hidden; }\nint shown;", true)]);
        assert!(index.member(&NamespacePath::global(), "hidden").is_none());
        assert!(index.member(&NamespacePath::global(), "shown").is_some());
    }

    #[test]
    fn cyclic_directives_terminate() {
        let index = index(&[(
            "namespace a { namespace b { using namespace a; } using namespace b; }",
            true,
        )]);
        assert!(index.find_member(&path("a"), "x").is_none());
    }

    #[test]
    fn first_declaration_wins() {
        let index = index(&[("namespace n { class A; }", false), ("namespace n { int A; }", false)]);
        assert_eq!(index.member(&path("n"), "A").map(|d| d.kind), Some(DeclKind::Class));
        assert_eq!(index.decl_count(), 1);
        assert_eq!(index.namespace_count(), 1);
    }
}
