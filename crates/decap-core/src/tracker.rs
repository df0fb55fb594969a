//! Decapsulation tracker: replays transactions and records visibility relaxations.
//!
//! For every transaction the tracker
//!
//! 1. collects the ids the transaction touches and the ids it removes,
//! 2. snapshots their visibility against the model as it was before the
//!    transaction, leaving out removed ids,
//! 3. applies the edits,
//! 4. snapshots again against the mutated model and purges the history of
//!    removed subtrees,
//! 5. classifies every touched id and appends the resulting
//!    [`Decapsulation`] events to the history of the affected field.
//!
//! Visibility is only ever compared within one transaction, so residual
//! effects of earlier revisions never leak into later comparisons.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edit::{Edit, Transaction};
use crate::error::{DecapError, DecapResult};
use crate::model::{Node, NodeKind, Project, ENTITY_SEPARATOR};
use crate::report::{aggregate, Report};
use crate::resolver::{ResolverRegistry, VisibilityLevel};

// ============================================================================
// Events
// ============================================================================

/// Classification of a decapsulation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecapsulationKind {
    /// The field itself became more visible.
    RelaxedFieldVisibility,
    /// A new accessor is more visible than the field it exposes.
    AddedRelaxedAccessor,
    /// An existing accessor became more visible.
    RelaxedAccessorVisibility,
}

impl DecapsulationKind {
    /// Human-readable message.
    pub fn message(&self) -> &'static str {
        match self {
            DecapsulationKind::RelaxedFieldVisibility => "relaxed field visibility",
            DecapsulationKind::AddedRelaxedAccessor => {
                "added accessor with more relaxed visibility"
            }
            DecapsulationKind::RelaxedAccessorVisibility => "relaxed accessor visibility",
        }
    }
}

impl fmt::Display for DecapsulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One weakening of a field's encapsulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decapsulation {
    /// Field whose encapsulation weakened.
    pub field_id: String,
    /// Node whose visibility change caused it: the field or one of its accessors.
    pub node_id: String,
    /// Revision that caused it.
    pub revision_id: String,
    pub kind: DecapsulationKind,
    pub message: String,
}

impl Decapsulation {
    pub fn new(
        field_id: impl Into<String>,
        node_id: impl Into<String>,
        revision_id: impl Into<String>,
        kind: DecapsulationKind,
    ) -> Self {
        Decapsulation {
            field_id: field_id.into(),
            node_id: node_id.into(),
            revision_id: revision_id.into(),
            kind,
            message: kind.message().to_string(),
        }
    }
}

/// Field id to its events, oldest first.
pub type DecapsulationHistory = HashMap<String, Vec<Decapsulation>>;

type VisibilitySnapshot = HashMap<String, VisibilityLevel>;

/// Ids a transaction touches.
#[derive(Debug, Default)]
struct TouchedIds {
    /// Functions and variables to classify.
    ids: BTreeSet<String>,
    /// Containers receiving new functions; their existing fields are
    /// snapshotted so a new accessor can be compared with its field.
    accessor_parents: BTreeSet<String>,
    /// Ids removed by this transaction. A node re-added under one of them
    /// is new and has no "before" visibility.
    removed: BTreeSet<String>,
    /// Variables introduced by this transaction; they start with an empty history.
    fresh: BTreeSet<String>,
}

impl TouchedIds {
    /// Purge removed ids, then register fresh variables. Runs only after the
    /// transaction applied cleanly, so a failing edit leaves the history intact.
    fn commit(&self, history: &mut DecapsulationHistory) {
        for id in &self.removed {
            history.remove(id);
        }
        for id in &self.fresh {
            history.insert(id.clone(), Vec::new());
        }
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Stateful replay engine.
///
/// Owns the live [`Project`] and the per-field event history for one run.
#[derive(Debug)]
pub struct DecapsulationTracker {
    registry: ResolverRegistry,
    project: Project,
    history: DecapsulationHistory,
    transactions: usize,
}

impl DecapsulationTracker {
    /// Create a tracker with an empty model and history.
    pub fn new(registry: ResolverRegistry) -> Self {
        DecapsulationTracker {
            registry,
            project: Project::new(),
            history: HashMap::new(),
            transactions: 0,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn history(&self) -> &DecapsulationHistory {
        &self.history
    }

    /// Events recorded for `field_id`, oldest first.
    pub fn decapsulations(&self, field_id: &str) -> &[Decapsulation] {
        self.history
            .get(field_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of transactions replayed so far.
    pub fn transaction_count(&self) -> usize {
        self.transactions
    }

    /// Replay every transaction, then aggregate.
    pub fn run<I>(mut self, transactions: I, ignore_constants: bool) -> DecapResult<Report>
    where
        I: IntoIterator<Item = Transaction>,
    {
        self.replay(transactions.into_iter().map(Ok::<_, DecapError>))?;
        Ok(self.aggregate(ignore_constants))
    }

    /// Replay a fallible stream of transactions, stopping at the first error.
    pub fn replay<I, E>(&mut self, transactions: I) -> DecapResult<()>
    where
        I: IntoIterator<Item = Result<Transaction, E>>,
        DecapError: From<E>,
    {
        tracing::info!("replaying history");
        for transaction in transactions {
            self.analyze(&transaction?)?;
        }
        tracing::info!(
            "replayed {} transactions, {} fields tracked",
            self.transactions,
            self.history.len()
        );
        Ok(())
    }

    /// Build the report for the current state.
    pub fn aggregate(&self, ignore_constants: bool) -> Report {
        aggregate(
            &self.project,
            &self.history,
            &self.registry,
            ignore_constants,
        )
    }

    /// Analyze and apply one transaction. Returns the number of new events.
    pub fn analyze(&mut self, transaction: &Transaction) -> DecapResult<usize> {
        tracing::debug!(
            "transaction {} '{}': {} edits",
            self.transactions,
            transaction.revision_id,
            transaction.edits.len()
        );

        let touched = self.collect_touched(&transaction.edits);
        let mut before = self.snapshot(&touched);
        before.retain(|id, _| !touched.removed.contains(id));
        for (edit_index, edit) in transaction.edits.iter().enumerate() {
            self.project
                .apply(edit)
                .map_err(|source| DecapError::InconsistentHistory {
                    revision_id: transaction.revision_id.clone(),
                    edit_index,
                    edit_kind: edit.kind_name(),
                    source,
                })?;
        }
        let after = self.snapshot(&touched);
        touched.commit(&mut self.history);

        let events = self.classify(&touched, &before, &after, &transaction.revision_id);
        let count = events.len();
        for event in events {
            tracing::trace!(
                "{}: {} via '{}'",
                event.field_id,
                event.message,
                event.node_id
            );
            self.history
                .entry(event.field_id.clone())
                .or_default()
                .push(event);
        }

        self.transactions += 1;
        Ok(count)
    }

    fn collect_touched(&self, edits: &[Edit]) -> TouchedIds {
        let mut touched = TouchedIds::default();
        for edit in edits {
            match edit {
                Edit::AddNode { parent_id, node } => {
                    for item in node.walk(parent_id.as_deref()).iter() {
                        match item.node.kind() {
                            NodeKind::Variable => {
                                touched.fresh.insert(item.id.to_string());
                                touched.ids.insert(item.id.to_string());
                            }
                            NodeKind::Function => {
                                touched.ids.insert(item.id.to_string());
                                if let Some(parent) = item.parent_id {
                                    touched.accessor_parents.insert(parent.to_string());
                                }
                            }
                            NodeKind::Unit | NodeKind::Type => {}
                        }
                    }
                }
                Edit::RemoveNode { id } => {
                    for entry in self.project.walk_subtree(id) {
                        touched.ids.remove(&entry.id);
                        touched.fresh.remove(&entry.id);
                        touched.removed.insert(entry.id.clone());
                    }
                    // Nodes added earlier in this transaction are not in the
                    // model yet but share the removed id as prefix.
                    let prefix = format!("{}{}", id, ENTITY_SEPARATOR);
                    let pending: Vec<String> = touched
                        .ids
                        .iter()
                        .filter(|touched_id| *touched_id == id || touched_id.starts_with(&prefix))
                        .cloned()
                        .collect();
                    for pending_id in pending {
                        touched.ids.remove(&pending_id);
                        touched.fresh.remove(&pending_id);
                        touched.removed.insert(pending_id);
                    }
                }
                Edit::EditFunction { id, .. } | Edit::EditVariable { id, .. } => {
                    touched.ids.insert(id.clone());
                }
                Edit::EditType { .. } => {}
            }
        }
        touched
    }

    fn snapshot(&self, touched: &TouchedIds) -> VisibilitySnapshot {
        let mut visibility = VisibilitySnapshot::new();
        for id in &touched.ids {
            let Some(level) = self.registry.visibility_of(&self.project, id) else {
                continue;
            };
            visibility.insert(id.clone(), level);
            let Some(field_id) = self.registry.field_of(&self.project, id) else {
                continue;
            };
            if let Some(level) = self.registry.visibility_of(&self.project, &field_id) {
                visibility.insert(field_id, level);
            }
        }
        for parent in &touched.accessor_parents {
            for child in self.project.children(parent) {
                if !matches!(child.node, Node::Variable(_)) || visibility.contains_key(&child.id) {
                    continue;
                }
                if let Some(level) = self.registry.visibility_of(&self.project, &child.id) {
                    visibility.insert(child.id.clone(), level);
                }
            }
        }
        visibility
    }

    fn classify(
        &self,
        touched: &TouchedIds,
        before: &VisibilitySnapshot,
        after: &VisibilitySnapshot,
        revision_id: &str,
    ) -> Vec<Decapsulation> {
        let mut events = Vec::new();
        for id in &touched.ids {
            let Some(entry) = self.project.get(id) else {
                continue;
            };
            match entry.node {
                Node::Variable(_) => {
                    let (Some(old), Some(new)) = (before.get(id), after.get(id)) else {
                        continue;
                    };
                    if new > old {
                        events.push(Decapsulation::new(
                            id.as_str(),
                            id.as_str(),
                            revision_id,
                            DecapsulationKind::RelaxedFieldVisibility,
                        ));
                    }
                }
                Node::Function(_) => {
                    let Some(field_id) = self.registry.field_of(&self.project, id) else {
                        continue;
                    };
                    let (Some(field_old), Some(new)) = (before.get(&field_id), after.get(id))
                    else {
                        continue;
                    };
                    let kind = match before.get(id) {
                        None if new > field_old => DecapsulationKind::AddedRelaxedAccessor,
                        Some(old) if new > old => DecapsulationKind::RelaxedAccessorVisibility,
                        _ => continue,
                    };
                    events.push(Decapsulation::new(field_id, id.as_str(), revision_id, kind));
                }
                Node::Unit(_) | Node::Type(_) => {}
            }
        }
        events
    }
}

// ============================================================================
// Tests
// ============================================================================
