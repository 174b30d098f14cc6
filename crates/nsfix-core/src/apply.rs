//! Patch applier.
//!
//! Applies the drained contents of the patch store file by file. Patches
//! of one file are spliced in descending offset order so that no offset
//! needs adjusting for earlier edits. Files are independent: a failure in
//! one is reported and the others still apply.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::patch::{ContentHash, FilePatchSet, Patch};

/// Closing rule printed after each dumped file.
pub const DUMP_RULE: &str = "============================================";

/// Failure to apply the patches of one file.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path} changed since it was analyzed (expected {expected}, found {actual})")]
    StaleContent {
        path: String,
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("patch at {offset}+{length} is out of bounds for {path} ({len} bytes)")]
    OutOfBounds {
        path: String,
        offset: u64,
        length: u64,
        len: usize,
    },

    #[error("patch at {offset} in {path} does not fall on a character boundary")]
    NotCharBoundary { path: String, offset: u64 },

    #[error("overlapping patches in {path} at {offset}")]
    Overlap { path: String, offset: u64 },
}

impl ApplyError {
    /// Root-relative path of the file that failed.
    pub fn path(&self) -> &str {
        match self {
            ApplyError::Read { path, .. }
            | ApplyError::Write { path, .. }
            | ApplyError::StaleContent { path, .. }
            | ApplyError::OutOfBounds { path, .. }
            | ApplyError::NotCharBoundary { path, .. }
            | ApplyError::Overlap { path, .. } => path,
        }
    }
}

/// Splice `patches` into `text`.
///
/// `path` is only used in error messages.
pub fn apply_patches(path: &str, text: &str, patches: &[Patch]) -> Result<String, ApplyError> {
    let mut ordered: Vec<&Patch> = patches.iter().collect();
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut out = text.to_string();
    let mut floor: Option<u64> = None;
    for patch in ordered {
        let start = patch.offset as usize;
        let end = start.saturating_add(patch.length as usize);
        if end > text.len() {
            return Err(ApplyError::OutOfBounds {
                path: path.to_string(),
                offset: patch.offset,
                length: patch.length,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(ApplyError::NotCharBoundary {
                path: path.to_string(),
                offset: patch.offset,
            });
        }
        if floor.is_some_and(|next_start| end as u64 > next_start) {
            return Err(ApplyError::Overlap {
                path: path.to_string(),
                offset: patch.offset,
            });
        }
        out.replace_range(start..end, &patch.text);
        floor = Some(patch.offset);
    }
    Ok(out)
}

/// A file with its patches applied in memory.
#[derive(Debug, Clone)]
pub struct AppliedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub original: String,
    pub rewritten: String,
    pub patches: Vec<Patch>,
}

impl AppliedFile {
    /// The rewritten file framed the way `--dump` prints it.
    pub fn dump(&self) -> String {
        format!(
            "============== {} ==============\n{}\n{}\n",
            self.relative_path, self.rewritten, DUMP_RULE
        )
    }

    /// Unified diff between the original and rewritten text.
    pub fn diff(&self) -> String {
        crate::diff::unified_diff(&self.relative_path, &self.original, &self.patches)
    }

    /// Write the rewritten text back to disk.
    pub fn write(&self) -> Result<(), ApplyError> {
        fs::write(&self.path, &self.rewritten).map_err(|source| ApplyError::Write {
            path: self.relative_path.clone(),
            source,
        })?;
        info!(file = %self.relative_path, patches = self.patches.len(), "rewrote file");
        Ok(())
    }
}

/// Read a file from disk, verify it is unchanged, and apply its patches.
pub fn rewrite_file(set: &FilePatchSet) -> Result<AppliedFile, ApplyError> {
    let original = fs::read_to_string(&set.path).map_err(|source| ApplyError::Read {
        path: set.relative_path.clone(),
        source,
    })?;
    let actual = ContentHash::compute(original.as_bytes());
    if actual != set.content_hash {
        return Err(ApplyError::StaleContent {
            path: set.relative_path.clone(),
            expected: set.content_hash.clone(),
            actual,
        });
    }
    let rewritten = apply_patches(&set.relative_path, &original, &set.patches)?;
    debug!(file = %set.relative_path, patches = set.patches.len(), "applied patches in memory");
    Ok(AppliedFile {
        path: set.path.clone(),
        relative_path: set.relative_path.clone(),
        original,
        rewritten,
        patches: set.patches.clone(),
    })
}
