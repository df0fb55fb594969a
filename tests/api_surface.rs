//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Engine Types
// ============================================================================

// model module - source model and identifiers
use decap::model::{
    child_id, Entry, Function, ModelError, ModelResult, Node, NodeKind, NodeVariant, Project,
    SourceNode, SourceUnit, SubtreeWalk, TypeDecl, TypeNode, UnitNode, Variable, ENTITY_SEPARATOR,
    PATH_SEPARATOR,
};

// edit module - edits and transactions
use decap::edit::{Edit, SetDelta, Transaction};

// resolver module - language plugin contract
use decap::resolver::{DecapsulationResolver, ResolverRegistry, VisibilityLevel};

// tracker module - replay engine and events
use decap::tracker::{
    Decapsulation, DecapsulationHistory, DecapsulationKind, DecapsulationTracker,
};

// report module - aggregation
use decap::report::{aggregate, FieldReport, FileReport, Report, TypeReport};

// cost module - visibility cost summary
use decap::cost::{CostEntry, VisibilityCostAnalyzer};

// ============================================================================
// Front Door Types
// ============================================================================

// error module - error types and codes
use decap::error::{DecapError, DecapResult, OutputErrorCode};

// history module - history input
use decap::history::{parse_history, HistoryReader};

// config module - layered configuration
use decap::config::{
    CliOverrides, ConfigSource, ConfigValue, OutputFormat, ProjectConfig, ResolvedConfig,
    CONFIG_FILE_NAME,
};

// output module - JSON output types
use decap::output::{
    emit_response, AnalyzeResponse, CostResponse, ErrorInfo, ErrorResponse, SettingsInfo,
    SCHEMA_VERSION,
};

// facade and commands
use decap::cli::{run_analyze, run_cost};
use decap::render::{render_costs, render_grouped, render_report};
use decap::{configured_registry, default_registry, run_analysis};

// language crates
use decap_java::{accessor_field_name, JavaResolver};

#[test]
fn api_surface_compiles() {
    // This test exists only to ensure the imports above compile.
}
