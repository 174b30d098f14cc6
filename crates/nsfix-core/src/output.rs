//! JSON output types for CLI responses.
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Deterministic:** files are listed in path order
//! 3. **Versioned:** `schema_version` allows the format to evolve

use std::io::{self, Write};

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::driver::{Tool, UnitReport};
use crate::error::NsfixError;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// What happened to one rewritten file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Patches were applied in memory only (dump, diff or dry run).
    Rewritten,
    /// Patches were written to disk.
    Written,
    /// Applying failed; see `error`.
    Failed,
}

/// Per-file apply result.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: String,
    pub patches: usize,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// "ok" when every file applied, "partial" otherwise.
    pub status: String,
    pub schema_version: String,
    pub tool: Tool,
    pub units: Vec<UnitReport>,
    pub files: Vec<FileResult>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    pub fn new(
        tool: Tool,
        units: Vec<UnitReport>,
        files: Vec<FileResult>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let ok = files.iter().all(|f| f.status != FileStatus::Failed);
        RunSummary {
            status: if ok { "ok" } else { "partial" }.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            units,
            files,
            diagnostics,
        }
    }

    /// Number of files whose patches could not be applied.
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Failed)
            .count()
    }

    pub fn total_patches(&self) -> usize {
        self.files.iter().map(|f| f.patches).sum()
    }
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
}

/// Response emitted when a run aborts.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &NsfixError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code: err.error_code().code(),
                message: err.to_string(),
            },
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, status: FileStatus) -> FileResult {
        FileResult {
            file: name.to_string(),
            patches: 2,
            status,
            error: None,
        }
    }

    #[test]
    fn summary_status_reflects_failures() {
        let ok = RunSummary::new(Tool::InlineNamespaces, Vec::new(), vec![file("a.cpp", FileStatus::Written)], Vec::new());
        assert_eq!(ok.status, "ok");
        assert_eq!(ok.total_patches(), 2);

        let partial = RunSummary::new(
            Tool::InlineNamespaces,
            Vec::new(),
            vec![file("a.cpp", FileStatus::Written), file("b.cpp", FileStatus::Failed)],
            Vec::new(),
        );
        assert_eq!(partial.status, "partial");
        assert_eq!(partial.failed_files(), 1);
    }

    #[test]
    fn status_is_the_first_field() {
        let summary = RunSummary::new(Tool::DisambiguateSymbols, Vec::new(), Vec::new(), Vec::new());
        let mut out = Vec::new();
        emit_response(&summary, &mut out).expect("emit");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("{\n  \"status\": \"ok\""));
        assert!(text.contains("\"tool\": \"disambiguate-symbols\""));
    }

    #[test]
    fn error_response_carries_code() {
        let err = NsfixError::invalid_args("no files");
        let response = ErrorResponse::from_error(&err);
        let json = serde_json::to_value(&response).expect("json");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], 2);
        assert_eq!(json["error"]["message"], "invalid arguments: no files");
    }

    #[test]
    fn failed_file_includes_error() {
        let mut failed = file("a.cpp", FileStatus::Failed);
        failed.error = Some("stale".to_string());
        let json = serde_json::to_value(&failed).expect("json");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "stale");
        let ok = serde_json::to_value(file("b.cpp", FileStatus::Written)).expect("json");
        assert!(ok.get("error").is_none());
    }
}
