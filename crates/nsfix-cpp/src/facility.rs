//! The C++ resolution facility.
//!
//! Built once per run: every unit and extra header is scanned in parallel,
//! the scans are merged into one [`SymbolIndex`] together with the prelude,
//! and the unit scans are kept for match extraction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nsfix_core::adapter::{Declaration, ResolutionFacility, UnitMatches};
use nsfix_core::config::IndexConfig;
use nsfix_core::error::NsfixError;
use nsfix_core::path::NamespacePath;
use nsfix_core::types::SourceFile;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::extract::{extract, reference_context};
use crate::index::SymbolIndex;
use crate::lookup::{Lookup, Resolution};
use crate::prelude;
use crate::scanner::{scan, FileModel};

pub struct CppFacility {
    index: SymbolIndex,
    models: HashMap<PathBuf, Arc<FileModel>>,
}

impl CppFacility {
    /// Index the prelude, the configured extra headers (relative to
    /// `root`) and `units`.
    pub fn build(root: &Path, units: &[SourceFile], config: &IndexConfig) -> Result<Self, NsfixError> {
        let mut headers = Vec::with_capacity(config.extra_headers.len());
        for header in &config.extra_headers {
            let path = root.join(header);
            if !path.is_file() {
                return Err(NsfixError::file_not_found(path.display().to_string()));
            }
            let text = std::fs::read_to_string(&path).map_err(|e| NsfixError::io(path.display().to_string(), e))?;
            headers.push(text);
        }

        let prelude_models: Vec<FileModel> = prelude::HEADERS
            .par_iter()
            .map(|(_, text)| scan(text))
            .collect();
        let header_models: Vec<FileModel> = headers.par_iter().map(|text| scan(text)).collect();
        let unit_models: Vec<Arc<FileModel>> = units
            .par_iter()
            .map(|unit| Arc::new(scan(unit.text())))
            .collect();

        let mut index = SymbolIndex::new();
        for model in prelude_models.iter().chain(&header_models) {
            index.add_model(model, true);
        }
        let mut models = HashMap::with_capacity(units.len());
        for (unit, model) in units.iter().zip(unit_models) {
            if model.unclosed > 0 {
                warn!(file = unit.relative_path(), scopes = model.unclosed, "unbalanced braces");
            }
            index.add_model(&model, is_header(unit.relative_path(), &config.header_extensions));
            models.insert(unit.path().to_path_buf(), model);
        }

        info!(
            units = units.len(),
            extra_headers = headers.len(),
            namespaces = index.namespace_count(),
            declarations = index.decl_count(),
            "symbol index built"
        );
        Ok(CppFacility { index, models })
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    fn model(&self, unit: &SourceFile) -> Arc<FileModel> {
        match self.models.get(unit.path()) {
            Some(model) => Arc::clone(model),
            None => {
                debug!(file = unit.relative_path(), "scanning unit outside the index");
                Arc::new(scan(unit.text()))
            }
        }
    }
}

/// True if `relative` has one of the header `extensions`.
fn is_header(relative: &str, extensions: &[String]) -> bool {
    Path::new(relative)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|h| h.eq_ignore_ascii_case(ext)))
}

impl ResolutionFacility for CppFacility {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn analyze_unit(&self, unit: &SourceFile) -> Result<UnitMatches, NsfixError> {
        let model = self.model(unit);
        Ok(extract(&model, &self.index))
    }

    fn resolve_reference(&self, unit: &SourceFile, offset: u64) -> Option<Declaration> {
        let model = self.model(unit);
        let reference = model
            .references
            .iter()
            .find(|r| r.span().contains_offset(offset))?;
        match Lookup::new(&model, &self.index).resolve(reference) {
            Resolution::Found(resolved) => Some(resolved.decl),
            Resolution::Local | Resolution::Unresolved => None,
        }
    }

    fn enclosing_scope(&self, unit: &SourceFile, offset: u64) -> Option<NamespacePath> {
        let model = self.model(unit);
        reference_context(&model, model.scope_at(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(relative: &str, text: &str) -> SourceFile {
        SourceFile::new(format!("/project/{relative}"), relative, text.to_string())
    }

    #[test]
    fn headers_export_their_directives() {
        let header = unit("util.h", "namespace app { using namespace std; }");
        let source = unit("app.cpp", "namespace app { string name; }");
        let facility =
            CppFacility::build(Path::new("/project"), &[header, source.clone()], &IndexConfig::default())
                .expect("build");
        let matches = facility.analyze_unit(&source).expect("analyze");
        assert_eq!(matches.references.len(), 1);
        assert_eq!(matches.references[0].decl.path, NamespacePath::from("std"));
    }

    #[test]
    fn sources_do_not_export_their_directives() {
        let other = unit("other.cpp", "using namespace std;");
        let source = unit("app.cpp", "string name;");
        let facility =
            CppFacility::build(Path::new("/project"), &[other, source.clone()], &IndexConfig::default())
                .expect("build");
        assert!(facility.analyze_unit(&source).expect("analyze").references.is_empty());
    }

    #[test]
    fn extra_headers_are_indexed() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("vendor.h"), "namespace boost { namespace asio { class io_context; } }")
            .expect("write");
        let config = IndexConfig {
            extra_headers: vec![PathBuf::from("vendor.h")],
            ..IndexConfig::default()
        };
        let source = unit("a.cpp", "using namespace boost::asio;\nio_context ctx;");
        let facility = CppFacility::build(dir.path(), std::slice::from_ref(&source), &config).expect("build");
        let matches = facility.analyze_unit(&source).expect("analyze");
        assert_eq!(matches.references[0].decl.path, NamespacePath::from("boost::asio"));
    }

    #[test]
    fn missing_extra_header_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let config = IndexConfig {
            extra_headers: vec![PathBuf::from("missing.h")],
            ..IndexConfig::default()
        };
        let err = CppFacility::build(dir.path(), &[], &config)
            .err()
            .expect("missing header");
        assert!(matches!(err, NsfixError::FileNotFound { .. }));
    }

    #[test]
    fn point_queries() {
        let text = "namespace app {\nusing namespace std;\nvector<int> v;\n}\n";
        let source = unit("a.cpp", text);
        let facility =
            CppFacility::build(Path::new("/project"), std::slice::from_ref(&source), &IndexConfig::default())
                .expect("build");
        let offset = text.find("vector").map_or(0, |p| p as u64) + 2;
        let decl = facility.resolve_reference(&source, offset).expect("vector");
        assert_eq!(decl.path, NamespacePath::from("std"));
        assert_eq!(facility.enclosing_scope(&source, offset), Some(NamespacePath::from("app")));
        assert_eq!(facility.enclosing_scope(&source, 0), None);
        assert!(facility.resolve_reference(&source, 0).is_none());
    }

    #[test]
    fn header_extensions() {
        let exts = vec!["h".to_string(), "hpp".to_string()];
        assert!(is_header("a/b.h", &exts));
        assert!(is_header("a/b.HPP", &exts));
        assert!(!is_header("a/b.cpp", &exts));
        assert!(!is_header("Makefile", &exts));
    }
}
