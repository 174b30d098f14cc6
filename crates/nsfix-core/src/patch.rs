//! Patch store: the shared, concurrent collection of pending edits.
//!
//! Every rewriting pass records its edits here instead of touching files.
//! Patches are keyed per file and ordered by offset. The store guarantees:
//! - At most one patch per (file, offset); an identical re-add is a no-op
//! - No two patches of a file overlap
//! - A conflicting add is an error that aborts the run, never a silent drop
//!
//! Adds from different files proceed in parallel; adds to the same file are
//! serialized by a per-file lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticSink, FixIt};
use crate::types::SourceFile;

/// Hash type for content verification (SHA-256, stored as hex string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span. An inverted range is normalized to an empty span
    /// at `start`.
    pub fn new(start: u64, end: u64) -> Self {
        Span {
            start,
            end: end.max(start),
        }
    }

    /// Empty span at `offset`.
    pub fn empty(offset: u64) -> Self {
        Span::new(offset, offset)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_offset(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A single pending text edit.
///
/// `length == 0` is a pure insertion; an empty `text` is a pure removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// File the patch applies to.
    pub file: PathBuf,
    /// Byte offset of the replaced range.
    pub offset: u64,
    /// Number of bytes replaced.
    pub length: u64,
    /// Replacement text.
    pub text: String,
    /// Short description shown in diagnostics.
    pub label: String,
}

impl Patch {
    /// Insert `text` at `offset`.
    pub fn insert(file: &Path, offset: u64, text: impl Into<String>, label: &str) -> Self {
        Patch {
            file: file.to_path_buf(),
            offset,
            length: 0,
            text: text.into(),
            label: label.to_string(),
        }
    }

    /// Replace `span` with `text`.
    pub fn replace(file: &Path, span: Span, text: impl Into<String>, label: &str) -> Self {
        Patch {
            file: file.to_path_buf(),
            offset: span.start,
            length: span.len(),
            text: text.into(),
            label: label.to_string(),
        }
    }

    /// Remove `span`.
    pub fn remove(file: &Path, span: Span, label: &str) -> Self {
        Patch::replace(file, span, String::new(), label)
    }

    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.length)
    }

    fn same_edit(&self, other: &Patch) -> bool {
        self.length == other.length && self.text == other.text
    }
}

/// Two patches that cannot both be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchConflict {
    /// Different edits registered at the same offset.
    #[error("conflicting patches at {file}:{offset}: {existing:?} vs {incoming:?}")]
    SameOffset {
        file: String,
        offset: u64,
        existing: String,
        incoming: String,
    },

    /// Edits whose replaced ranges intersect.
    #[error("overlapping patches in {file}: {existing} and {incoming}")]
    Overlap {
        file: String,
        existing: Span,
        incoming: Span,
    },
}

/// Result of a successful [`PatchStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The patch was recorded and its diagnostic emitted.
    Inserted,
    /// An identical patch was already present.
    Duplicate,
}

/// All patches recorded for one file, ordered by offset.
#[derive(Debug, Clone)]
pub struct FilePatchSet {
    pub path: PathBuf,
    pub relative_path: String,
    /// Hash of the file content the patches were computed against.
    pub content_hash: ContentHash,
    pub patches: Vec<Patch>,
}

// ============================================================================
// Patch Store
// ============================================================================

#[derive(Debug)]
struct FilePatches {
    relative_path: String,
    content_hash: ContentHash,
    patches: BTreeMap<u64, Patch>,
}

/// Concurrent per-file patch collection.
#[derive(Debug, Default)]
pub struct PatchStore {
    files: RwLock<HashMap<PathBuf, Arc<Mutex<FilePatches>>>>,
}

impl PatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, source: &SourceFile) -> Arc<Mutex<FilePatches>> {
        {
            let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = files.get(source.path()) {
                return Arc::clone(entry);
            }
        }
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(files.entry(source.path().to_path_buf()).or_insert_with(|| {
            Arc::new(Mutex::new(FilePatches {
                relative_path: source.relative_path().to_string(),
                content_hash: source.content_hash().clone(),
                patches: BTreeMap::new(),
            }))
        }))
    }

    /// Record `patch` against `source`.
    ///
    /// `trigger` is the byte offset of the construct that caused the patch;
    /// it locates the diagnostic emitted to `sink` on insertion.
    pub fn add(
        &self,
        source: &SourceFile,
        patch: Patch,
        trigger: u64,
        sink: &dyn DiagnosticSink,
    ) -> Result<AddOutcome, PatchConflict> {
        let entry = self.entry(source);
        let mut file = entry.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = file.patches.get(&patch.offset) {
            if existing.same_edit(&patch) {
                debug!(
                    file = %file.relative_path,
                    offset = patch.offset,
                    "duplicate patch ignored"
                );
                return Ok(AddOutcome::Duplicate);
            }
            return Err(PatchConflict::SameOffset {
                file: file.relative_path.clone(),
                offset: patch.offset,
                existing: existing.text.clone(),
                incoming: patch.text.clone(),
            });
        }

        let incoming = patch.span();
        let before = file.patches.range(..patch.offset).next_back();
        let after = file.patches.range(patch.offset + 1..).next();
        for (_, neighbour) in before.into_iter().chain(after) {
            let existing = neighbour.span();
            if existing.overlaps(&incoming) {
                return Err(PatchConflict::Overlap {
                    file: file.relative_path.clone(),
                    existing,
                    incoming,
                });
            }
        }

        sink.emit(&Diagnostic {
            location: source.location(trigger),
            label: patch.label.clone(),
            fix: FixIt::for_patch(source, &patch),
        });
        file.patches.insert(patch.offset, patch);
        Ok(AddOutcome::Inserted)
    }

    /// Number of patches recorded across all files.
    pub fn len(&self) -> usize {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files
            .values()
            .map(|f| f.lock().unwrap_or_else(PoisonError::into_inner).patches.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain every recorded patch, grouped by file and sorted by path.
    ///
    /// The store is empty afterwards.
    pub fn take(&self) -> Vec<FilePatchSet> {
        let drained: Vec<_> = {
            let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
            files.drain().collect()
        };
        let mut sets: Vec<FilePatchSet> = drained
            .into_iter()
            .map(|(path, entry)| {
                let mut file = entry.lock().unwrap_or_else(PoisonError::into_inner);
                let patches = std::mem::take(&mut file.patches);
                FilePatchSet {
                    path,
                    relative_path: file.relative_path.clone(),
                    content_hash: file.content_hash.clone(),
                    patches: patches.into_values().collect(),
                }
            })
            .filter(|set| !set.patches.is_empty())
            .collect();
        sets.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        sets
    }
}
