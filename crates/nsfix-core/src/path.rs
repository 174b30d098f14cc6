//! Namespace paths.
//!
//! A [`NamespacePath`] is an ordered list of namespace segments, outermost
//! first. Segments are exact spellings. Inline namespaces never appear in a
//! declaration's path; a written qualifier may still spell them.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Separator between namespace segments.
pub const SCOPE_SEPARATOR: &str = "::";

/// Ordered sequence of namespace names, outermost first.
///
/// The empty path denotes the global namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespacePath(Vec<String>);

impl NamespacePath {
    /// The global namespace.
    pub fn global() -> Self {
        NamespacePath(Vec::new())
    }

    /// Build a path from segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NamespacePath(segments.into_iter().map(Into::into).collect())
    }

    /// Parse written qualifier text such as `std::chrono::` or `::boost::python`.
    ///
    /// Segments are trimmed; empty segments (a leading global `::`, the
    /// trailing separator) are dropped.
    pub fn parse(text: &str) -> Self {
        NamespacePath(
            text.split(SCOPE_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Outermost segment (the root namespace).
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// The enclosing path, or `None` for the global namespace.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(NamespacePath(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        NamespacePath(self.0[..len.min(self.0.len())].to_vec())
    }

    pub fn starts_with<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        prefix.len() <= self.0.len()
            && prefix
                .iter()
                .zip(&self.0)
                .all(|(p, s)| p.as_ref() == s.as_str())
    }

    pub fn ends_with<S: AsRef<str>>(&self, suffix: &[S]) -> bool {
        suffix.len() <= self.0.len()
            && suffix
                .iter()
                .rev()
                .zip(self.0.iter().rev())
                .all(|(p, s)| p.as_ref() == s.as_str())
    }

    /// Length of the longest common prefix with `other`.
    pub fn common_prefix_len(&self, other: &NamespacePath) -> usize {
        self.0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Join `range` of the segments with `::`, without a trailing separator.
    pub fn join(&self, range: Range<usize>) -> String {
        self.0[range].join(SCOPE_SEPARATOR)
    }

    /// Qualifier text for `range` of the segments, e.g. `std::chrono::`.
    pub fn qualifier(&self, range: Range<usize>) -> String {
        let mut text = self.join(range);
        text.push_str(SCOPE_SEPARATOR);
        text
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(SCOPE_SEPARATOR))
    }
}

impl From<&str> for NamespacePath {
    fn from(text: &str) -> Self {
        NamespacePath::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_global_and_trailing_separators() {
        assert_eq!(
            NamespacePath::parse("::std::chrono::"),
            NamespacePath::from_segments(["std", "chrono"])
        );
        assert_eq!(
            NamespacePath::parse(" boost :: python ").segments(),
            &["boost".to_string(), "python".to_string()]
        );
        assert!(NamespacePath::parse("::").is_empty());
    }

    #[test]
    fn prefix_and_suffix_matching() {
        let path = NamespacePath::from("boost::python::api");
        assert!(path.starts_with(&["boost", "python"]));
        assert!(!path.starts_with(&["python"]));
        assert!(path.ends_with(&["python", "api"]));
        assert!(!path.ends_with(&["boost", "python", "api", "x"]));
        assert!(path.starts_with::<&str>(&[]));
    }

    #[test]
    fn join_and_qualifier() {
        let path = NamespacePath::from("std::chrono");
        assert_eq!(path.join(0..2), "std::chrono");
        assert_eq!(path.qualifier(0..1), "std::");
        assert_eq!(path.to_string(), "std::chrono");
    }

    #[test]
    fn parent_child_and_common_prefix() {
        let path = NamespacePath::from("a::b");
        assert_eq!(path.child("c"), NamespacePath::from("a::b::c"));
        assert_eq!(path.parent(), Some(NamespacePath::from("a")));
        assert_eq!(NamespacePath::global().parent(), None);
        assert_eq!(
            path.common_prefix_len(&NamespacePath::from("a::x")),
            1
        );
    }

    #[test]
    fn serializes_as_plain_list() {
        let path = NamespacePath::from("std::chrono");
        let json = serde_json::to_string(&path).expect("serialize");
        assert_eq!(json, r#"["std","chrono"]"#);
    }
}
