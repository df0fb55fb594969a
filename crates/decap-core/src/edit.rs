//! Structural edits and transactions, and their application to a [`Project`].
//!
//! A [`Transaction`] is one historical revision: an ordered list of edits and
//! the revision id they came from. Edits are applied strictly in order, so a
//! function may be added and then edited inside the same transaction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Function, ModelResult, Project, SourceNode, TypeNode, Variable};

/// Changes to a string set: `removed` is applied first, then `added`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDelta {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub removed: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub added: BTreeSet<String>,
}

impl SetDelta {
    /// Build a delta from removed and added tokens.
    pub fn new<'a>(
        removed: impl IntoIterator<Item = &'a str>,
        added: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        SetDelta {
            removed: removed.into_iter().map(str::to_string).collect(),
            added: added.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn apply(&self, set: &mut BTreeSet<String>) {
        for token in &self.removed {
            set.remove(token);
        }
        set.extend(self.added.iter().cloned());
    }
}

/// One structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum Edit {
    /// Attach a whole subtree. `parent_id` is `None` exactly when the node is a unit.
    AddNode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<String>,
        node: SourceNode,
    },
    /// Detach a node and its whole subtree.
    RemoveNode { id: String },
    /// Change a type's modifiers or supertypes.
    EditType {
        id: String,
        #[serde(default, skip_serializing_if = "SetDelta::is_empty")]
        modifiers: SetDelta,
        #[serde(default, skip_serializing_if = "SetDelta::is_empty")]
        supertypes: SetDelta,
    },
    /// Change a function's modifiers.
    EditFunction {
        id: String,
        #[serde(default, skip_serializing_if = "SetDelta::is_empty")]
        modifiers: SetDelta,
    },
    /// Change a variable's modifiers.
    EditVariable {
        id: String,
        #[serde(default, skip_serializing_if = "SetDelta::is_empty")]
        modifiers: SetDelta,
    },
}

impl Edit {
    pub fn add_node(parent_id: Option<&str>, node: SourceNode) -> Self {
        Edit::AddNode {
            parent_id: parent_id.map(str::to_string),
            node,
        }
    }

    pub fn remove_node(id: impl Into<String>) -> Self {
        Edit::RemoveNode { id: id.into() }
    }

    pub fn edit_function(id: impl Into<String>, modifiers: SetDelta) -> Self {
        Edit::EditFunction {
            id: id.into(),
            modifiers,
        }
    }

    pub fn edit_variable(id: impl Into<String>, modifiers: SetDelta) -> Self {
        Edit::EditVariable {
            id: id.into(),
            modifiers,
        }
    }

    /// Id of the node this edit targets (the subtree root for `AddNode`).
    pub fn target_id(&self) -> String {
        match self {
            Edit::AddNode { parent_id, node } => node.id_under(parent_id.as_deref()),
            Edit::RemoveNode { id }
            | Edit::EditType { id, .. }
            | Edit::EditFunction { id, .. }
            | Edit::EditVariable { id, .. } => id.clone(),
        }
    }

    /// Short name of the edit kind, for logs and error details.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Edit::AddNode { .. } => "add_node",
            Edit::RemoveNode { .. } => "remove_node",
            Edit::EditType { .. } => "edit_type",
            Edit::EditFunction { .. } => "edit_function",
            Edit::EditVariable { .. } => "edit_variable",
        }
    }
}

/// The edits of one historical revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub revision_id: String,
    #[serde(default)]
    pub edits: Vec<Edit>,
}

impl Transaction {
    pub fn new(revision_id: impl Into<String>, edits: Vec<Edit>) -> Self {
        Transaction {
            revision_id: revision_id.into(),
            edits,
        }
    }
}

impl Project {
    /// Apply one edit.
    ///
    /// `AddNode` and `RemoveNode` act on the whole subtree; the model is left
    /// untouched when an edit fails.
    pub fn apply(&mut self, edit: &Edit) -> ModelResult<()> {
        match edit {
            Edit::AddNode { parent_id, node } => {
                self.insert_subtree(parent_id.as_deref(), node)?;
            }
            Edit::RemoveNode { id } => {
                self.remove_subtree(id)?;
            }
            Edit::EditType {
                id,
                modifiers,
                supertypes,
            } => {
                let ty = self.get_as_mut::<TypeNode>(id)?;
                modifiers.apply(&mut ty.modifiers);
                supertypes.apply(&mut ty.supertypes);
            }
            Edit::EditFunction { id, modifiers } => {
                let function = self.get_as_mut::<Function>(id)?;
                modifiers.apply(&mut function.modifiers);
            }
            Edit::EditVariable { id, modifiers } => {
                let variable = self.get_as_mut::<Variable>(id)?;
                modifiers.apply(&mut variable.modifiers);
            }
        }
        Ok(())
    }
}
