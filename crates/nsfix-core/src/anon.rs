//! Anonymous-namespace disambiguator.
//!
//! When many source files are compiled as one unit, identically named
//! symbols from different files' anonymous namespaces collide. Each
//! anonymous namespace is given a name derived from its file's path, and
//! every reference to its members from outside it is qualified with that
//! name.

use crate::adapter::{AnonNamespaceMatch, AnonRefMatch};
use crate::driver::PassContext;
use crate::patch::{AddOutcome, Patch, PatchConflict};
use crate::path::SCOPE_SEPARATOR;
use crate::qualify::QUALIFY_LABEL;
use crate::span::anonymous_name_insertion_point;

/// Patch label for naming an anonymous namespace.
pub const NAME_NAMESPACE_LABEL: &str = "anon namespace";

/// Derive the namespace name for a file from its root-relative path.
///
/// The extension is dropped, path components are joined camel-case (every
/// component after the first starts upper-case), and the result is made a
/// valid identifier: `base/tf/notice.cpp` becomes `baseTfNotice`.
pub fn module_name(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    let stem = match normalized.rfind('.') {
        Some(dot) if dot > normalized.rfind('/').map_or(0, |slash| slash + 1) => {
            &normalized[..dot]
        }
        _ => normalized.as_str(),
    };

    let mut name = String::new();
    for component in stem.split('/').filter(|c| !c.is_empty() && *c != ".") {
        let mut chars = component.chars();
        if name.is_empty() {
            name.push_str(component);
        } else if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    sanitize_identifier(&name)
}

fn sanitize_identifier(raw: &str) -> String {
    let mut ident: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Give an anonymous namespace the file's module name.
pub fn fix_anonymous_namespace(
    ctx: &PassContext<'_>,
    anon: &AnonNamespaceMatch,
    module: &str,
) -> Result<Option<AddOutcome>, PatchConflict> {
    let patch = Patch::insert(
        ctx.source.path(),
        anonymous_name_insertion_point(anon),
        format!(" {module}"),
        NAME_NAMESPACE_LABEL,
    );
    ctx.store
        .add(ctx.source, patch, anon.keyword.start, ctx.sink)
        .map(Some)
}

/// Qualify an outside reference to an anonymous-namespace member.
pub fn fix_anonymous_reference(
    ctx: &PassContext<'_>,
    reference: &AnonRefMatch,
    module: &str,
) -> Result<Option<AddOutcome>, PatchConflict> {
    let begin = reference.node.begin();
    let globally_qualified = ctx
        .source
        .text()
        .get(begin as usize..)
        .is_some_and(|rest| rest.starts_with(SCOPE_SEPARATOR));
    let text = if globally_qualified {
        module.to_string()
    } else {
        format!("{module}{SCOPE_SEPARATOR}")
    };
    let patch = Patch::insert(ctx.source.path(), begin, text, QUALIFY_LABEL);
    ctx.store
        .add(ctx.source, patch, begin, ctx.sink)
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{DeclKind, Declaration, NameToken, RefNode};
    use crate::diagnostic::CollectingSink;
    use crate::patch::{PatchStore, Span};
    use crate::path::NamespacePath;
    use crate::policy::ExclusionPolicy;
    use crate::types::SourceFile;

    mod module_name_tests {
        use super::*;

        #[test]
        fn nested_path_is_camel_cased() {
            assert_eq!(module_name("base/tf/notice.cpp"), "baseTfNotice");
        }

        #[test]
        fn top_level_file_keeps_its_stem() {
            assert_eq!(module_name("main.cpp"), "main");
        }

        #[test]
        fn non_identifier_characters_are_replaced() {
            assert_eq!(module_name("usd/sdf-file/layer.test.cpp"), "usdSdf_fileLayer_test");
        }

        #[test]
        fn leading_digit_is_prefixed() {
            assert_eq!(module_name("3rdparty/x.cpp"), "_3rdpartyX");
        }

        #[test]
        fn dotted_directory_does_not_lose_the_file() {
            assert_eq!(module_name("v1.2/file"), "v1_2File");
            assert_eq!(module_name("./a/b.h"), "aB");
        }
    }

    mod pass_tests {
        use super::*;

        fn apply(src: &str, store: &PatchStore) -> String {
            let mut out = src.to_string();
            let mut patches: Vec<_> = store.take().into_iter().flat_map(|s| s.patches).collect();
            patches.sort_by(|a, b| b.offset.cmp(&a.offset));
            for p in patches {
                out.replace_range(p.offset as usize..(p.offset + p.length) as usize, &p.text);
            }
            out
        }

        #[test]
        fn names_namespace_and_qualifies_references() {
            let src = "namespace {\nint helper();\n}\nint main() { return helper() + ::helper(); }\n";
            let source = SourceFile::new("/w/tool/main.cpp", "tool/main.cpp", src.to_string());
            let store = PatchStore::new();
            let sink = CollectingSink::new();
            let policy = ExclusionPolicy::default();
            let ctx = PassContext {
                source: &source,
                store: &store,
                sink: &sink,
                policy: &policy,
            };
            let module = module_name(source.relative_path());
            fix_anonymous_namespace(&ctx, &AnonNamespaceMatch { keyword: Span::new(0, 9) }, &module)
                .expect("name namespace");

            let decl = Declaration::new("helper", NamespacePath::global(), DeclKind::Function);
            let plain = src.find("helper() +").expect("plain") as u64;
            fix_anonymous_reference(
                &ctx,
                &AnonRefMatch {
                    node: RefNode::Expr {
                        qualifier: None,
                        name: NameToken::new("helper", Span::new(plain, plain + 6)),
                    },
                    decl: decl.clone(),
                },
                &module,
            )
            .expect("plain reference");

            let global = src.find("::helper").expect("global") as u64;
            fix_anonymous_reference(
                &ctx,
                &AnonRefMatch {
                    node: RefNode::Expr {
                        qualifier: Some(crate::adapter::NestedNameSpecifier {
                            global: Some(Span::new(global, global + 2)),
                            specifiers: Vec::new(),
                        }),
                        name: NameToken::new("helper", Span::new(global + 2, global + 8)),
                    },
                    decl,
                },
                &module,
            )
            .expect("global reference");

            assert_eq!(
                apply(src, &store),
                "namespace toolMain {\nint helper();\n}\nint main() { return toolMain::helper() + toolMain::helper(); }\n"
            );
            assert_eq!(sink.diagnostics().len(), 3);
        }
    }
}
