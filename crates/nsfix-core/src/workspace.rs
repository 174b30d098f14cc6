//! Project file discovery and loading.
//!
//! - Deterministic ordering (sorted by relative path)
//! - Extension allow-list and glob excludes from [`FilesConfig`]
//! - Hidden directories and build output are never entered

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{ConfigError, FilesConfig};
use crate::error::NsfixError;
use crate::types::SourceFile;

/// Directory names skipped during discovery.
const SKIPPED_DIRS: &[&str] = &["build", "target", "node_modules"];

fn should_skip_dir(name: &str) -> bool {
    (name.starts_with('.') && name.len() > 1) || SKIPPED_DIRS.contains(&name)
}

/// Path of `path` relative to `root`, with `/` separators.
///
/// Paths outside the root are returned as given.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

/// Selects which files under the root are C++ sources to process.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclude: GlobSet,
}

impl FileFilter {
    pub fn new(config: &FilesConfig) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let exclude = builder.build().map_err(|e| ConfigError::Pattern {
            pattern: config.exclude.join(","),
            message: e.to_string(),
        })?;
        Ok(FileFilter {
            extensions: config.extensions.clone(),
            exclude,
        })
    }

    /// True if the root-relative `path` should be processed.
    pub fn accepts(&self, relative: &str) -> bool {
        let has_extension = Path::new(relative)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext));
        has_extension && !self.exclude.is_match(relative)
    }
}

/// Every accepted file under `root`, sorted by relative path.
pub fn discover_files(root: &Path, filter: &FileFilter) -> Result<Vec<PathBuf>, NsfixError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !entry.file_name().to_str().is_some_and(should_skip_dir)
    });
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            NsfixError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if filter.accepts(&relative_path(root, entry.path())) {
            files.push(entry.into_path());
        }
    }
    files.sort_by_key(|p| relative_path(root, p));
    Ok(files)
}

/// Read `paths` in parallel. Relative paths are resolved against `root`.
pub fn load_sources(root: &Path, paths: &[PathBuf]) -> Result<Vec<SourceFile>, NsfixError> {
    paths
        .par_iter()
        .map(|path| {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            if !full.is_file() {
                return Err(NsfixError::file_not_found(full.display().to_string()));
            }
            let text = fs::read_to_string(&full)
                .map_err(|e| NsfixError::io(full.display().to_string(), e))?;
            let relative = relative_path(root, &full);
            Ok(SourceFile::new(full, relative, text))
        })
        .collect()
}
