//! Fix-it diagnostics.
//!
//! Each recorded patch produces one warning-level diagnostic at the location
//! of the construct that caused it, carrying the fix as an attachment.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::patch::Patch;
use crate::types::{Location, SourceFile};

/// The text change a diagnostic proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixIt {
    Insert {
        at: Location,
        text: String,
    },
    Replace {
        from: Location,
        to: Location,
        old: String,
        text: String,
    },
    Remove {
        from: Location,
        to: Location,
        old: String,
    },
}

impl FixIt {
    /// Describe `patch` against the text of `source`.
    pub fn for_patch(source: &SourceFile, patch: &Patch) -> Self {
        let span = patch.span();
        if span.is_empty() {
            return FixIt::Insert {
                at: source.location(span.start),
                text: patch.text.clone(),
            };
        }
        let from = source.location(span.start);
        let to = source.location(span.end);
        let old = source.slice(span).to_string();
        if patch.text.is_empty() {
            FixIt::Remove { from, to, old }
        } else {
            FixIt::Replace {
                from,
                to,
                old,
                text: patch.text.clone(),
            }
        }
    }
}

impl fmt::Display for FixIt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixIt::Insert { at, text } => {
                write!(f, "insert {:?} at {}:{}", text, at.line, at.col)
            }
            FixIt::Replace { from, to, old, text } => write!(
                f,
                "replace {:?} at {}:{}-{}:{} with {:?}",
                old, from.line, from.col, to.line, to.col, text
            ),
            FixIt::Remove { from, to, old } => write!(
                f,
                "remove {:?} at {}:{}-{}:{}",
                old, from.line, from.col, to.line, to.col
            ),
        }
    }
}

/// A warning with an attached fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub location: Location,
    pub label: String,
    pub fix: FixIt,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: warning: {}\n    fix-it: {}",
            self.location, self.label, self.fix
        )
    }
}

/// Destination for fix-it diagnostics.
///
/// Implementations are shared across worker threads.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Writes diagnostics to stderr in compiler style.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let mut stderr = std::io::stderr().lock();
        // A closed stderr is not worth aborting a rewrite over.
        let _ = writeln!(stderr, "{}", diagnostic);
    }
}

/// Keeps diagnostics in memory (JSON output and tests).
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return everything emitted so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Span;

    fn source() -> SourceFile {
        SourceFile::new("/w/a.cpp", "a.cpp", "namespace ph = std::placeholders;\nph::_1;\n".into())
    }

    #[test]
    fn insertion_renders_position_and_text() {
        let src = source();
        let fix = FixIt::for_patch(&src, &Patch::insert(src.path(), 34, "std::", "inline namespace"));
        assert_eq!(fix.to_string(), r#"insert "std::" at 2:1"#);
    }

    #[test]
    fn replacement_includes_old_text() {
        let src = source();
        let patch = Patch::replace(src.path(), Span::new(34, 38), "std::placeholders::", "inline namespace");
        let fix = FixIt::for_patch(&src, &patch);
        assert_eq!(
            fix.to_string(),
            r#"replace "ph::" at 2:1-2:5 with "std::placeholders::""#
        );
    }

    #[test]
    fn removal_escapes_newlines() {
        let src = source();
        let patch = Patch::remove(src.path(), Span::new(0, 34), "remove using");
        let diagnostic = Diagnostic {
            location: src.location(0),
            label: "remove using".into(),
            fix: FixIt::for_patch(&src, &patch),
        };
        let rendered = diagnostic.to_string();
        assert!(rendered.starts_with("a.cpp:1:1: warning: remove using\n"));
        assert!(rendered.ends_with(r#"remove "namespace ph = std::placeholders;\n" at 1:1-2:1"#));
    }

    #[test]
    fn collecting_sink_take_empties() {
        let src = source();
        let sink = CollectingSink::new();
        sink.emit(&Diagnostic {
            location: src.location(0),
            label: "x".into(),
            fix: FixIt::Insert {
                at: src.location(0),
                text: "y".into(),
            },
        });
        assert_eq!(sink.take().len(), 1);
        assert!(sink.diagnostics().is_empty());
    }
}
