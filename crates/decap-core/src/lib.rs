//! Core engine for decap.
//!
//! This crate replays the structural history of a code base and reports
//! where field encapsulation was weakened:
//! - Source model and edit application
//! - Resolver trait and registry for pluggable language support
//! - Decapsulation tracker and report aggregation
//! - Visibility-cost summary
//! - History reader, layered configuration, error types and JSON output

pub mod config;
pub mod cost;
pub mod edit;
pub mod error;
pub mod history;
pub mod model;
pub mod output;
pub mod report;
pub mod resolver;
pub mod tracker;

pub use error::{DecapError, DecapResult, OutputErrorCode};
