//! Configuration handling for nsfix

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::policy::ExclusionPolicy;

/// Directory under the project root holding nsfix state.
pub const CONFIG_DIR: &str = ".nsfix";

/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Failure to load configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid exclude pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

/// nsfix configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Which namespaces may be qualified
    #[serde(default)]
    pub policy: ExclusionPolicy,

    /// Which project files are rewritten and indexed
    #[serde(default)]
    pub files: FilesConfig,

    /// Symbol index settings
    #[serde(default)]
    pub index: IndexConfig,
}

/// Project file selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilesConfig {
    /// File extensions (without the dot) considered C++ sources
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, relative to the root, of files to leave alone
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Symbol index configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Extra declaration headers to index, relative to the root
    #[serde(default)]
    pub extra_headers: Vec<PathBuf>,

    /// Extensions treated as headers: their using-directives leak into
    /// every file that could include them
    #[serde(default = "default_header_extensions")]
    pub header_extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    ["h", "hh", "hpp", "hxx", "inl", "c", "cc", "cpp", "cxx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_header_extensions() -> Vec<String> {
    ["h", "hh", "hpp", "hxx", "inl"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            extra_headers: Vec::new(),
            header_extensions: default_header_extensions(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from .nsfix/config.toml in the given project root
    pub fn load_from_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = project_root.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::NamespacePath;
    use crate::policy::InvisibleSuffix;

    #[test]
    fn empty_file_is_the_default() {
        let config = Config::parse("").expect("parse");
        assert_eq!(config, Config::default());
        assert!(config.files.extensions.iter().any(|e| e == "cpp"));
    }

    #[test]
    fn policy_section_extends_targets() {
        let config = Config::parse(
            r#"
[policy]
targets = ["std", "boost", "tbb"]
invisible_suffixes = [{ prefix = "__" }, { path = ["tbb", "detail"] }]
"#,
        )
        .expect("parse");
        assert!(!config.policy.excludes_namespace(&NamespacePath::from("tbb")));
        assert_eq!(config.policy.invisible_suffixes.len(), 2);
        assert!(matches!(
            &config.policy.invisible_suffixes[1],
            InvisibleSuffix::Path { path, symbols } if path.len() == 2 && symbols.is_empty()
        ));
        // untouched policy fields keep the built-in tables
        assert_eq!(
            config.policy.symbol_exceptions,
            ExclusionPolicy::default().symbol_exceptions
        );
    }

    #[test]
    fn files_and_index_sections() {
        let config = Config::parse(
            r#"
[files]
extensions = ["cpp"]
exclude = ["**/testenv/**"]

[index]
extra_headers = ["third_party/tbb.hpp"]
"#,
        )
        .expect("parse");
        assert_eq!(config.files.extensions, vec!["cpp"]);
        assert_eq!(config.files.exclude, vec!["**/testenv/**"]);
        assert_eq!(config.index.extra_headers, vec![PathBuf::from("third_party/tbb.hpp")]);
        assert!(config.index.header_extensions.iter().any(|e| e == "h"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[policy\n").expect("write");
        let err = Config::load(&path).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_project_without_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from_project(dir.path()).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_project_reads_config_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join(CONFIG_DIR)).expect("mkdir");
        fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[files]\nexclude = [\"gen/**\"]\n",
        )
        .expect("write");
        let config = Config::load_from_project(dir.path()).expect("load");
        assert_eq!(config.files.exclude, vec!["gen/**"]);
    }
}
