//! CLI front door.
//!
//! Glues the pieces of a run together:
//! - configuration from `--config` or `<root>/.nsfix/config.toml`
//! - the unit list (explicit files, or every accepted file under the root)
//! - the C++ facility and the run driver
//! - patch application in the requested output modes
//!
//! `main.rs` owns argument parsing, logging setup and rendering of the
//! returned [`RunSummary`].

use std::io::Write;
use std::path::{Path, PathBuf};

use nsfix_core::apply::rewrite_file;
use nsfix_core::config::Config;
use nsfix_core::diagnostic::{CollectingSink, DiagnosticSink, StderrSink};
use nsfix_core::driver::{Driver, Tool};
use nsfix_core::error::NsfixError;
use nsfix_core::output::{FileResult, FileStatus, RunSummary};
use nsfix_core::patch::{FilePatchSet, PatchStore};
use nsfix_core::workspace::{discover_files, load_sources, relative_path, FileFilter};
use nsfix_cpp::CppFacility;
use tracing::{debug, info, warn};

/// What to do with the rewritten files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMode {
    /// Write rewritten files in place.
    pub overwrite: bool,
    /// Print every rewritten file framed by rule lines.
    pub dump: bool,
    /// Print a unified diff per rewritten file.
    pub diff: bool,
}

/// Options of one tool run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Project root.
    pub root: PathBuf,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Files to process; empty means every accepted file under the root.
    pub files: Vec<PathBuf>,
    pub mode: OutputMode,
    /// Keep fix-it diagnostics for the summary instead of printing them.
    pub collect_diagnostics: bool,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RunOptions {
            root: root.into(),
            config: None,
            files: Vec::new(),
            mode: OutputMode::default(),
            collect_diagnostics: false,
        }
    }
}

/// Load configuration for a run.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<Config, NsfixError> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_from_project(root)?,
    };
    Ok(config)
}

/// Resolve the units of a run against the root.
///
/// Explicit files must exist; they bypass the extension and exclude filters.
pub fn select_files(
    root: &Path,
    explicit: &[PathBuf],
    filter: &FileFilter,
) -> Result<Vec<PathBuf>, NsfixError> {
    if explicit.is_empty() {
        return discover_files(root, filter);
    }
    let mut files = Vec::with_capacity(explicit.len());
    for file in explicit {
        let full = if file.is_absolute() {
            file.clone()
        } else {
            root.join(file)
        };
        if !full.is_file() {
            return Err(NsfixError::file_not_found(full.display().to_string()));
        }
        files.push(full);
    }
    files.sort_by_key(|p| relative_path(root, p));
    files.dedup();
    Ok(files)
}

/// Run `tool` over the project and apply the resulting patches.
///
/// Dumps and diffs are written to `out`. Files that fail to apply are
/// reported in the summary and do not stop the others.
pub fn run_tool(
    tool: Tool,
    options: &RunOptions,
    out: &mut impl Write,
) -> Result<RunSummary, NsfixError> {
    let root = options.root.as_path();
    if !root.is_dir() {
        return Err(NsfixError::invalid_args(format!(
            "project root {} is not a directory",
            root.display()
        )));
    }

    let config = load_config(root, options.config.as_deref())?;
    let filter = FileFilter::new(&config.files)?;
    let paths = select_files(root, &options.files, &filter)?;
    let units = load_sources(root, &paths)?;
    debug!(units = units.len(), root = %root.display(), "loaded units");

    let facility = CppFacility::build(root, &units, &config.index)?;
    let store = PatchStore::new();
    let collecting = CollectingSink::new();
    let sink: &dyn DiagnosticSink = if options.collect_diagnostics {
        &collecting
    } else {
        &StderrSink
    };
    let reports = Driver::new(tool, &facility, &config.policy, &store, sink).run(&units)?;

    let mut files = Vec::new();
    for set in store.take() {
        let file = set.relative_path.clone();
        let patches = set.patches.len();
        match apply_one(&set, options.mode, out) {
            Ok(status) => files.push(FileResult {
                file,
                patches,
                status,
                error: None,
            }),
            Err(err) => {
                warn!(file = %file, error = %err, "failed to apply patches");
                files.push(FileResult {
                    file,
                    patches,
                    status: FileStatus::Failed,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let summary = RunSummary::new(tool, reports, files, collecting.take());
    info!(
        files = summary.files.len(),
        patches = summary.total_patches(),
        failed = summary.failed_files(),
        "run finished"
    );
    Ok(summary)
}

fn apply_one(
    set: &FilePatchSet,
    mode: OutputMode,
    out: &mut impl Write,
) -> Result<FileStatus, NsfixError> {
    let applied = rewrite_file(set)?;
    let io_err = |e| NsfixError::io("<stdout>", e);
    if mode.dump {
        out.write_all(applied.dump().as_bytes()).map_err(io_err)?;
    }
    if mode.diff {
        out.write_all(applied.diff().as_bytes()).map_err(io_err)?;
    }
    if mode.overwrite {
        applied.write()?;
        return Ok(FileStatus::Written);
    }
    Ok(FileStatus::Rewritten)
}
