//! Visibility cost: the net visibility change accumulated by every node.
//!
//! Each `EditType`, `EditFunction` and `EditVariable` adds `new - old`
//! visibility to the edited node. After replay the values are summed
//! bottom-up over the final model, so a type's cost includes the cost of all
//! its members and a unit's cost that of all its entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::edit::{Edit, Transaction};
use crate::error::{DecapError, DecapResult};
use crate::model::{NodeKind, Project};
use crate::resolver::ResolverRegistry;

/// Accumulated cost of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub id: String,
    pub kind: NodeKind,
    pub cost: i64,
}

/// Replays history and accumulates visibility deltas.
#[derive(Debug)]
pub struct VisibilityCostAnalyzer {
    registry: ResolverRegistry,
    project: Project,
    values: HashMap<String, i64>,
    transactions: usize,
}

impl VisibilityCostAnalyzer {
    pub fn new(registry: ResolverRegistry) -> Self {
        VisibilityCostAnalyzer {
            registry,
            project: Project::new(),
            values: HashMap::new(),
            transactions: 0,
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions
    }

    /// Apply one transaction, recording the delta of every modifier edit.
    pub fn analyze(&mut self, transaction: &Transaction) -> DecapResult<()> {
        for (edit_index, edit) in transaction.edits.iter().enumerate() {
            let measured = match edit {
                Edit::EditType { id, .. }
                | Edit::EditFunction { id, .. }
                | Edit::EditVariable { id, .. } => Some(id.as_str()),
                Edit::AddNode { .. } | Edit::RemoveNode { .. } => None,
            };
            let before = measured.and_then(|id| self.registry.visibility_of(&self.project, id));
            self.project
                .apply(edit)
                .map_err(|source| DecapError::InconsistentHistory {
                    revision_id: transaction.revision_id.clone(),
                    edit_index,
                    edit_kind: edit.kind_name(),
                    source,
                })?;
            let Some(id) = measured else {
                continue;
            };
            let after = self.registry.visibility_of(&self.project, id);
            if let (Some(before), Some(after)) = (before, after) {
                let delta = i64::from(after.0) - i64::from(before.0);
                *self.values.entry(id.to_string()).or_insert(0) += delta;
            }
        }
        self.transactions += 1;
        Ok(())
    }

    /// Replay a fallible stream of transactions.
    pub fn replay<I, E>(&mut self, transactions: I) -> DecapResult<()>
    where
        I: IntoIterator<Item = Result<Transaction, E>>,
        DecapError: From<E>,
    {
        tracing::info!("computing visibility costs");
        for transaction in transactions {
            self.analyze(&transaction?)?;
        }
        Ok(())
    }

    /// Sum costs bottom-up over the final model.
    ///
    /// Entries are sorted by descending cost, then by id.
    pub fn finish(self) -> Vec<CostEntry> {
        let mut totals: HashMap<&str, i64> = HashMap::new();
        let ids = self.project.all_ids();
        // Pre-order, reversed: every child is summed before its parent.
        for id in ids.iter().rev() {
            let own = self.values.get(*id).copied().unwrap_or(0);
            let children: i64 = self
                .project
                .children(id)
                .map(|child| totals.get(child.id.as_str()).copied().unwrap_or(0))
                .sum();
            totals.insert(*id, own + children);
        }
        let mut entries: Vec<CostEntry> = ids
            .iter()
            .filter_map(|id| {
                let entry = self.project.get(id)?;
                Some(CostEntry {
                    id: id.to_string(),
                    kind: entry.node.kind(),
                    cost: totals.get(id).copied().unwrap_or(0),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.cost.cmp(&a.cost).then_with(|| a.id.cmp(&b.id)));
        tracing::info!(
            "visibility costs for {} nodes after {} transactions",
            entries.len(),
            self.transactions
        );
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::SetDelta;
    use crate::model::SourceNode;
    use crate::resolver::tests::MockResolver;

    fn analyzer() -> VisibilityCostAnalyzer {
        VisibilityCostAnalyzer::new(ResolverRegistry::new().with(Box::new(MockResolver)))
    }

    fn setup() -> Transaction {
        Transaction::new(
            "r0",
            vec![Edit::add_node(
                None,
                SourceNode::unit(
                    "C.mock",
                    vec![SourceNode::type_decl(
                        "C",
                        ["private"],
                        vec![
                            SourceNode::variable("x", ["private"]),
                            SourceNode::function("run()", ["public"]),
                        ],
                    )],
                ),
            )],
        )
    }

    fn cost_of(entries: &[CostEntry], id: &str) -> i64 {
        entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.cost)
            .unwrap()
    }

    #[test]
    fn deltas_sum_bottom_up() {
        let mut analyzer = analyzer();
        analyzer.analyze(&setup()).unwrap();
        analyzer
            .analyze(&Transaction::new(
                "r1",
                vec![
                    Edit::edit_variable("C.mock:C:x", SetDelta::new(["private"], ["public"])),
                    Edit::edit_function("C.mock:C:run()", SetDelta::new(["public"], [])),
                ],
            ))
            .unwrap();
        analyzer
            .analyze(&Transaction::new(
                "r2",
                vec![Edit::EditType {
                    id: "C.mock:C".to_string(),
                    modifiers: SetDelta::new(["private"], []),
                    supertypes: SetDelta::default(),
                }],
            ))
            .unwrap();
        let entries = analyzer.finish();
        assert_eq!(cost_of(&entries, "C.mock:C:x"), 2);
        assert_eq!(cost_of(&entries, "C.mock:C:run()"), -1);
        assert_eq!(cost_of(&entries, "C.mock:C"), 2);
        assert_eq!(cost_of(&entries, "C.mock"), 2);
        assert_eq!(entries[0].cost, 2);
        assert_eq!(entries.last().unwrap().id, "C.mock:C:run()");
    }

    #[test]
    fn removed_nodes_are_not_reported() {
        let mut analyzer = analyzer();
        analyzer.analyze(&setup()).unwrap();
        analyzer
            .analyze(&Transaction::new(
                "r1",
                vec![
                    Edit::edit_variable("C.mock:C:x", SetDelta::new(["private"], ["public"])),
                    Edit::remove_node("C.mock:C:x"),
                ],
            ))
            .unwrap();
        let entries = analyzer.finish();
        assert!(entries.iter().all(|entry| entry.id != "C.mock:C:x"));
        assert_eq!(cost_of(&entries, "C.mock"), 0);
    }

    #[test]
    fn inconsistent_edit_is_reported() {
        let mut analyzer = analyzer();
        let err = analyzer
            .analyze(&Transaction::new("r0", vec![Edit::remove_node("Missing.mock")]))
            .unwrap_err();
        assert!(matches!(err, DecapError::InconsistentHistory { .. }));
    }
}
