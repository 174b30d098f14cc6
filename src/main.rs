//! Binary entry point for the nsfix CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Qualify std/boost references and drop their using-statements
//! nsfix --root path/to/project inline-namespaces --overwrite
//!
//! # Preview the renaming of anonymous namespaces as a diff
//! nsfix disambiguate-symbols --diff src/util.cpp
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use nsfix::cli::{run_tool, OutputMode, RunOptions};
use nsfix_core::driver::Tool;
use nsfix_core::error::NsfixError;
use nsfix_core::output::{emit_response, ErrorResponse, FileStatus, RunSummary};

// ============================================================================
// CLI Structure
// ============================================================================

/// Namespace rewriting for large C++ codebases.
#[derive(Parser, Debug)]
#[command(name = "nsfix", version, about = "Namespace rewriting for large C++ codebases")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Project root directory (default: current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file (default: .nsfix/config.toml in the root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Format of the run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    /// Human-readable lines on stderr.
    #[default]
    Text,
    /// JSON on stdout.
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Qualify std and boost references, then remove their using-statements.
    InlineNamespaces(ToolArgs),
    /// Name anonymous namespaces after their file and qualify uses outside them.
    DisambiguateSymbols(ToolArgs),
}

/// Arguments shared by both tools.
#[derive(Args, Debug)]
struct ToolArgs {
    /// Write rewritten files in place.
    #[arg(long)]
    overwrite: bool,

    /// Print every rewritten file to stdout.
    #[arg(long)]
    dump: bool,

    /// Print a unified diff of every rewritten file to stdout.
    #[arg(long)]
    diff: bool,

    /// Format of the run summary.
    #[arg(long, value_enum, default_value = "text")]
    format: SummaryFormat,

    /// Files to process (default: every accepted file under the root).
    files: Vec<PathBuf>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The run summary already lists the files that failed.
            if !matches!(err, NsfixError::ApplyFailed { .. }) {
                let response = ErrorResponse::from_error(&err);
                let _ = emit_response(&response, &mut io::stdout());
                let _ = io::stdout().flush();
            }
            ExitCode::from(err.error_code().code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), NsfixError> {
    match cli.command {
        Command::InlineNamespaces(args) => execute_tool(&cli.global, Tool::InlineNamespaces, args),
        Command::DisambiguateSymbols(args) => {
            execute_tool(&cli.global, Tool::DisambiguateSymbols, args)
        }
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_tool(global: &GlobalArgs, tool: Tool, args: ToolArgs) -> Result<(), NsfixError> {
    if args.format == SummaryFormat::Json && (args.dump || args.diff) {
        return Err(NsfixError::invalid_args(
            "--dump and --diff write to stdout and cannot be combined with --format json",
        ));
    }
    let root = match &global.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|e| NsfixError::io("<current directory>", e))?,
    };
    let options = RunOptions {
        root,
        config: global.config.clone(),
        files: args.files,
        mode: OutputMode {
            overwrite: args.overwrite,
            dump: args.dump,
            diff: args.diff,
        },
        collect_diagnostics: args.format == SummaryFormat::Json,
    };

    let mut stdout = io::stdout().lock();
    let summary = run_tool(tool, &options, &mut stdout)?;
    match args.format {
        SummaryFormat::Json => {
            emit_response(&summary, &mut stdout)
                .map_err(|e| NsfixError::io("<stdout>", e))?;
        }
        SummaryFormat::Text => output_text_summary(&summary, args.overwrite),
    }
    stdout.flush().map_err(|e| NsfixError::io("<stdout>", e))?;

    match summary.failed_files() {
        0 => Ok(()),
        count => Err(NsfixError::ApplyFailed { count }),
    }
}

fn output_text_summary(summary: &RunSummary, overwrite: bool) {
    let verb = if overwrite { "rewrote" } else { "would rewrite" };
    let rewritten = summary.files.len() - summary.failed_files();
    eprintln!(
        "{}: {} {} file(s) of {} unit(s), {} patch(es)",
        summary.tool,
        verb,
        rewritten,
        summary.units.len(),
        summary.total_patches()
    );
    for file in &summary.files {
        if file.status == FileStatus::Failed {
            eprintln!(
                "  failed: {} ({})",
                file.file,
                file.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
