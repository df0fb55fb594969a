//! Command implementations behind the `decap` binary.
//!
//! Each command reads a history file, replays it and writes its result to
//! the given writer, either as a JSON envelope or as plain text. Errors are
//! returned as [`DecapError`] so the binary can map them to exit codes.

use std::io::Write;
use std::path::Path;

use decap_core::config::{OutputFormat, ResolvedConfig};
use decap_core::cost::VisibilityCostAnalyzer;
use decap_core::error::{DecapError, DecapResult};
use decap_core::history::HistoryReader;
use decap_core::output::{emit_response, AnalyzeResponse, CostResponse, SettingsInfo};
use decap_core::tracker::DecapsulationTracker;

use crate::configured_registry;
use crate::render::{render_costs, render_grouped, render_report};

/// `decap analyze`: replay the history and report decapsulations.
pub fn run_analyze(
    history: &Path,
    config: &ResolvedConfig,
    out: &mut impl Write,
) -> DecapResult<()> {
    let registry = configured_registry(config.resolvers.value.as_slice())?;
    let reader = HistoryReader::open(history)?;

    let mut tracker = DecapsulationTracker::new(registry);
    tracker.replay(reader)?;

    let ignore_constants = config.ignore_constants.value;
    let mut report = tracker.aggregate(ignore_constants);
    if !config.include_clean.value {
        report.retain_decapsulated();
    }
    tracing::info!(
        "{} decapsulations in {} fields",
        report.severity,
        report.field_count()
    );

    match config.format.value {
        OutputFormat::Json => {
            let settings = SettingsInfo {
                ignore_constants,
                ignore_constants_source: config.ignore_constants.source,
                include_clean: config.include_clean.value,
                resolvers: config.resolvers.value.clone(),
            };
            let response = AnalyzeResponse::new(tracker.transaction_count(), settings, report);
            emit_response(&response, out)?;
        }
        OutputFormat::Text => render_report(&report, out)?,
        OutputFormat::Grouped => render_grouped(&report, out)?,
    }
    Ok(())
}

/// `decap cost`: replay the history and report accumulated visibility costs.
///
/// `top` keeps only the highest-cost entries.
pub fn run_cost(
    history: &Path,
    config: &ResolvedConfig,
    top: Option<usize>,
    out: &mut impl Write,
) -> DecapResult<()> {
    if top == Some(0) {
        return Err(DecapError::invalid_args("--top must be at least 1"));
    }
    let registry = configured_registry(config.resolvers.value.as_slice())?;
    let reader = HistoryReader::open(history)?;

    let mut analyzer = VisibilityCostAnalyzer::new(registry);
    analyzer.replay(reader)?;
    let transactions = analyzer.transaction_count();
    let mut costs = analyzer.finish();
    if let Some(top) = top {
        costs.truncate(top);
    }

    match config.format.value {
        OutputFormat::Json => emit_response(&CostResponse::new(transactions, costs), out)?,
        OutputFormat::Text | OutputFormat::Grouped => render_costs(&costs, out)?,
    }
    Ok(())
}
