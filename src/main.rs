//! Binary entry point for the decap CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Report decapsulations recorded in a history file
//! decap analyze history.jsonl
//!
//! # Text output, constants excluded
//! decap analyze history.jsonl --format text --ignore-constants
//!
//! # Ten nodes with the highest accumulated visibility cost
//! decap cost history.jsonl --top 10
//! ```
//!
//! Results go to stdout. On failure a JSON error response is written to
//! stdout and the process exits with the error's code.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use decap::cli::{run_analyze, run_cost};
use decap::config::{CliOverrides, OutputFormat, ResolvedConfig};
use decap::error::{DecapError, OutputErrorCode};
use decap::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Track how field encapsulation erodes over a code base's history.
#[derive(Parser, Debug)]
#[command(name = "decap", version, about = "Detect decapsulations in source history")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root where `decap.toml` is looked up (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Explicit config file (overrides `decap.toml` lookup).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides config and `DECAP_FORMAT`).
    #[arg(long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a history file and report decapsulations per file, type and field.
    Analyze {
        /// History file: a stream of JSON transactions.
        history: PathBuf,

        /// Leave constant fields out of the report.
        #[arg(long, overrides_with = "no_ignore_constants")]
        ignore_constants: bool,

        /// Keep constant fields even if the config ignores them.
        #[arg(long, overrides_with = "ignore_constants")]
        no_ignore_constants: bool,

        /// Keep fields without decapsulations in the report.
        #[arg(long, overrides_with = "no_include_clean")]
        include_clean: bool,

        /// Prune fields without decapsulations even if the config keeps them.
        #[arg(long, overrides_with = "include_clean")]
        no_include_clean: bool,
    },
    /// Replay a history file and sum visibility changes per node.
    Cost {
        /// History file: a stream of JSON transactions.
        history: PathBuf,

        /// Only report the N most exposed nodes.
        #[arg(long)]
        top: Option<usize>,
    },
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
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

/// Output format flag.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Text,
    /// Events grouped by the field's parent.
    Grouped,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Grouped => OutputFormat::Grouped,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            tracing::debug!("command failed: {}", err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` overrides `--log-level`.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Collapse a `--flag`/`--no-flag` pair; `None` when neither was given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), DecapError> {
    let workspace = match cli.global.workspace.clone() {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let mut overrides = CliOverrides {
        config_path: cli.global.config.clone(),
        format: cli.global.format.map(OutputFormat::from),
        ..CliOverrides::default()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Analyze {
            history,
            ignore_constants,
            no_ignore_constants,
            include_clean,
            no_include_clean,
        } => {
            overrides.ignore_constants = switch(ignore_constants, no_ignore_constants);
            overrides.include_clean = switch(include_clean, no_include_clean);
            let config = ResolvedConfig::resolve(&workspace, &overrides)?;
            run_analyze(&history, &config, &mut out)?;
        }
        Command::Cost { history, top } => {
            let config = ResolvedConfig::resolve(&workspace, &overrides)?;
            run_cost(&history, &config, top, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn parse_analyze_with_flags() {
            let args = [
                "decap",
                "analyze",
                "history.jsonl",
                "--ignore-constants",
                "--format",
                "text",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(matches!(cli.global.format, Some(FormatArg::Text)));
            match cli.command {
                Command::Analyze {
                    history,
                    ignore_constants,
                    include_clean,
                    ..
                } => {
                    assert_eq!(history, PathBuf::from("history.jsonl"));
                    assert!(ignore_constants);
                    assert!(!include_clean);
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn negated_flag_wins_when_given_last() {
            let args = [
                "decap",
                "analyze",
                "h.jsonl",
                "--ignore-constants",
                "--no-ignore-constants",
                "--no-include-clean",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Analyze {
                    ignore_constants,
                    no_ignore_constants,
                    include_clean,
                    no_include_clean,
                    ..
                } => {
                    assert_eq!(switch(ignore_constants, no_ignore_constants), Some(false));
                    assert_eq!(switch(include_clean, no_include_clean), Some(false));
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn absent_flags_defer_to_config() {
            assert_eq!(switch(false, false), None);
            assert_eq!(switch(true, false), Some(true));
        }

        #[test]
        fn parse_cost_with_top() {
            let cli = Cli::try_parse_from(["decap", "cost", "h.jsonl", "--top", "5"]).unwrap();
            assert!(matches!(cli.command, Command::Cost { top: Some(5), .. }));
        }

        #[test]
        fn history_is_required() {
            assert!(Cli::try_parse_from(["decap", "analyze"]).is_err());
        }

        #[test]
        fn unknown_format_is_rejected() {
            assert!(Cli::try_parse_from(["decap", "analyze", "h", "--format", "yaml"]).is_err());
        }

        #[test]
        fn default_log_level_is_warn() {
            let cli = Cli::try_parse_from(["decap", "cost", "h.jsonl"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
            assert!(!cli.global.log_json);
        }
    }

    mod log_level {
        use super::*;

        #[test]
        fn levels_convert_to_tracing_levels() {
            assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
            assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
            assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
            assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
            assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        }
    }
}
