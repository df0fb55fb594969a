//! decap: track how field encapsulation erodes over a code base's history.
//!
//! The engine lives in `decap-core`; language support is provided by resolver
//! crates such as `decap-java`. This crate wires them together, offers the
//! one-call [`run_analysis`] entry point and implements the `decap` command
//! line.

pub use decap_core::config;
pub use decap_core::cost;
pub use decap_core::edit;
pub use decap_core::error;
pub use decap_core::history;
pub use decap_core::model;
pub use decap_core::output;
pub use decap_core::report;
pub use decap_core::resolver;
pub use decap_core::tracker;

pub mod cli;
pub mod render;

use decap_core::edit::Transaction;
use decap_core::error::{DecapError, DecapResult};
use decap_core::report::Report;
use decap_core::resolver::ResolverRegistry;
use decap_core::tracker::DecapsulationTracker;
use decap_java::JavaResolver;

/// Registry with every built-in resolver, in default precedence order.
pub fn default_registry() -> ResolverRegistry {
    ResolverRegistry::new().with(Box::new(JavaResolver::new()))
}

/// Built-in resolvers restricted and ordered by `names`.
///
/// Unknown names are rejected so a typo in the configuration does not
/// silently disable a language.
pub fn configured_registry<S: AsRef<str>>(names: &[S]) -> DecapResult<ResolverRegistry> {
    let available = default_registry();
    let known: Vec<&'static str> = available.names();
    let (registry, unknown) = available.ordered(names);
    if !unknown.is_empty() {
        return Err(DecapError::invalid_args_with_details(
            format!("unknown resolver(s): {}", unknown.join(", ")),
            serde_json::json!({ "unknown": unknown, "available": known }),
        ));
    }
    if registry.is_empty() {
        tracing::warn!("no resolvers configured; every unit will be skipped");
    }
    Ok(registry)
}

/// Replay `transactions` with `registry` and aggregate the report.
pub fn run_analysis<I>(
    transactions: I,
    registry: ResolverRegistry,
    ignore_constants: bool,
) -> DecapResult<Report>
where
    I: IntoIterator<Item = Transaction>,
{
    DecapsulationTracker::new(registry).run(transactions, ignore_constants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_java() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["java"]);
        assert!(registry.resolve("src/Main.java").is_some());
    }

    #[test]
    fn configured_registry_rejects_unknown_names() {
        let err = configured_registry(&["java", "cobol"]).unwrap_err();
        assert_eq!(err.error_code().code(), 2);
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn configured_registry_may_be_empty() {
        let names: [&str; 0] = [];
        let registry = configured_registry(&names).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_history_gives_empty_report() {
        let report = run_analysis(Vec::new(), default_registry(), false).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.severity, 0);
    }
}
