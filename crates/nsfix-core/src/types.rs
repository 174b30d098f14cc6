//! Shared types: source files and human-readable locations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::patch::{ContentHash, Span};
use crate::text::byte_offset_to_position;

/// A location in a source file, 1-indexed line and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path, relative to the project root.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, in bytes).
    pub col: u32,
    /// Byte offset from the start of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_start: Option<u64>,
}

impl Location {
    /// Create a new location.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            byte_start: None,
        }
    }

    /// Attach the byte offset this location was computed from.
    pub fn with_byte_start(mut self, byte_start: u64) -> Self {
        self.byte_start = Some(byte_start);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A source file loaded for analysis.
///
/// The content hash is computed once at load time; the applier uses it to
/// refuse writing patches over a file that changed since analysis.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    relative_path: String,
    text: String,
    content_hash: ContentHash,
}

impl SourceFile {
    /// Create a source file from already-loaded text.
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<String>, text: String) -> Self {
        let content_hash = ContentHash::compute(text.as_bytes());
        SourceFile {
            path: path.into(),
            relative_path: relative_path.into(),
            text,
            content_hash,
        }
    }

    /// Absolute (or caller-supplied) path used for reading and writing.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the project root, with `/` separators.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Full file text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hash of the text at load time.
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Text covered by `span`, or `""` if the span is out of bounds.
    pub fn slice(&self, span: Span) -> &str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    /// Human-readable location of a byte offset.
    pub fn location(&self, offset: u64) -> Location {
        let (line, col) = byte_offset_to_position(self.text.as_bytes(), offset as usize);
        Location::new(self.relative_path.clone(), line, col).with_byte_start(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        let loc = Location::new("base/tf/notice.cpp", 12, 5);
        assert_eq!(loc.to_string(), "base/tf/notice.cpp:12:5");
    }

    #[test]
    fn source_file_location_and_slice() {
        let file = SourceFile::new(
            "/tmp/a.cpp",
            "a.cpp",
            "int x;\nstring y;\n".to_string(),
        );
        let loc = file.location(7);
        assert_eq!((loc.line, loc.col), (2, 1));
        assert_eq!(loc.byte_start, Some(7));
        assert_eq!(file.slice(Span::new(7, 13)), "string");
        assert_eq!(file.slice(Span::new(7, 400)), "");
    }

    #[test]
    fn source_file_hash_tracks_content() {
        let a = SourceFile::new("a.cpp", "a.cpp", "x".to_string());
        let b = SourceFile::new("a.cpp", "a.cpp", "y".to_string());
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
