//! Exclusion policy: which namespaces the tool may touch.
//!
//! The policy is plain data so that projects can extend it from their
//! configuration file. [`ExclusionPolicy::default`] carries the built-in
//! tables for `std` and `boost`.

use serde::{Deserialize, Serialize};

use crate::path::NamespacePath;

/// A namespace-and-symbol pair that must never be qualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolException {
    /// Root namespace the symbol is declared under.
    pub root: String,
    /// Unqualified symbol name.
    pub symbol: String,
}

/// A namespace segment that should not be spelled when qualifying.
///
/// Matching happens against the declaration path ending at the candidate
/// segment; the first match scanning from the innermost segment wins and the
/// visible path stops just before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvisibleSuffix {
    /// Any segment spelled with this prefix, e.g. `__detail`.
    Prefix { prefix: String },
    /// A trailing path such as `boost::iterators`, optionally only for
    /// the listed symbols.
    Path {
        path: Vec<String>,
        #[serde(default)]
        symbols: Vec<String>,
    },
}

impl InvisibleSuffix {
    fn matches(&self, prefix: &[String], symbol: &str) -> bool {
        match self {
            InvisibleSuffix::Prefix { prefix: p } => prefix
                .last()
                .is_some_and(|segment| segment.starts_with(p.as_str())),
            InvisibleSuffix::Path { path, symbols } => {
                path.len() <= prefix.len()
                    && prefix[prefix.len() - path.len()..] == path[..]
                    && (symbols.is_empty() || symbols.iter().any(|s| s == symbol))
            }
        }
    }
}

/// Data-driven rules for which declarations may be qualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    /// Root namespaces eligible for qualification.
    pub targets: Vec<String>,
    /// Namespace prefixes that are never qualified even under a target root.
    pub namespace_exceptions: Vec<Vec<String>>,
    /// Symbols that are never qualified.
    pub symbol_exceptions: Vec<SymbolException>,
    /// Segments that are dropped from the end of the qualifier.
    pub invisible_suffixes: Vec<InvisibleSuffix>,
}

fn segments(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        ExclusionPolicy {
            targets: segments(&["boost", "std"]),
            namespace_exceptions: vec![
                segments(&["boost", "hash_value"]),
                segments(&["std", "chrono_literals"]),
                segments(&["std", "swap"]),
            ],
            symbol_exceptions: vec![SymbolException {
                root: "std".to_string(),
                symbol: "swap".to_string(),
            }],
            invisible_suffixes: vec![
                InvisibleSuffix::Prefix {
                    prefix: "__".to_string(),
                },
                InvisibleSuffix::Path {
                    path: segments(&["boost", "operators_impl"]),
                    symbols: Vec::new(),
                },
                InvisibleSuffix::Path {
                    path: segments(&["boost", "iterators"]),
                    symbols: Vec::new(),
                },
                InvisibleSuffix::Path {
                    path: segments(&["boost", "python", "api"]),
                    symbols: segments(&["object"]),
                },
                InvisibleSuffix::Path {
                    path: segments(&["boost", "python", "self_ns"]),
                    symbols: segments(&["self", "self_t"]),
                },
            ],
        }
    }
}

impl ExclusionPolicy {
    /// True if no declaration in `path` may be qualified or have its
    /// using-statement removed.
    pub fn excludes_namespace(&self, path: &NamespacePath) -> bool {
        let Some(root) = path.root() else {
            return true;
        };
        if !self.targets.iter().any(|t| t == root) {
            return true;
        }
        self.namespace_exceptions
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// True if `symbol` declared in `path` must be left alone.
    pub fn excludes_symbol(&self, path: &NamespacePath, symbol: &str) -> bool {
        let Some(root) = path.root() else {
            return false;
        };
        self.symbol_exceptions
            .iter()
            .any(|e| e.root == root && e.symbol == symbol)
    }

    /// Number of leading segments of `path` to spell when qualifying `symbol`.
    pub fn visible_len(&self, path: &NamespacePath, symbol: &str) -> usize {
        let segments = path.segments();
        for end in (1..=segments.len()).rev() {
            let candidate = &segments[..end];
            if self
                .invisible_suffixes
                .iter()
                .any(|rule| rule.matches(candidate, symbol))
            {
                return end - 1;
            }
        }
        segments.len()
    }
}
