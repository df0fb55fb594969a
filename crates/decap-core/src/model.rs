//! Source model: an arena mirror of the analyzed source tree.
//!
//! The model holds the current state of every unit (file) together with its
//! nested types, functions and variables. Nodes live in a flat arena keyed by
//! their hierarchical id, so cross references (an accessor pointing at a
//! field, a member pointing at its parent) are plain id lookups.
//!
//! # Identifiers
//!
//! | Node | Id |
//! |------|----|
//! | Unit | its path, e.g. `src/Main.java` |
//! | Type | `parent_id:Name` |
//! | Function | `parent_id:signature()` |
//! | Variable | `parent_id:name` |
//!
//! Ids are always computed from the insertion parent and the node key, never
//! supplied by the caller.
//!
//! Two shapes of the same data exist:
//! - [`SourceNode`]: the owned, nested subtree carried by `AddNode` edits.
//! - [`Entry`] / [`Node`]: the flattened arena form stored in [`Project`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the ids of a node and its children.
pub const ENTITY_SEPARATOR: char = ':';

/// Separator between directories inside a unit path.
pub const PATH_SEPARATOR: char = '/';

/// Build the id of a child node from its parent id and key.
pub fn child_id(parent_id: &str, key: &str) -> String {
    format!("{}{}{}", parent_id, ENTITY_SEPARATOR, key)
}

// ============================================================================
// Errors
// ============================================================================

/// Structural inconsistency between an edit and the current model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The edit targets an id that is not in the model.
    #[error("node not found: '{id}'")]
    NodeNotFound { id: String },

    /// The edit would introduce an id that already exists.
    #[error("duplicate node id: '{id}'")]
    DuplicateId { id: String },

    /// The id resolves to a different node variant.
    #[error("'{id}' is a {actual}, expected a {expected}")]
    TypeMismatch {
        id: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// The node cannot be attached where the edit asks for it.
    #[error("cannot add '{id}': {reason}")]
    InvalidParent { id: String, reason: String },
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

// ============================================================================
// Node Kinds
// ============================================================================

/// Discriminant of a node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Unit,
    Type,
    Function,
    Variable,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Unit => "unit",
            NodeKind::Type => "type",
            NodeKind::Function => "function",
            NodeKind::Variable => "variable",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Leaf Payloads (shared by both shapes)
// ============================================================================

/// A function or method, keyed by its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Signature, e.g. `getName()` or `setName(String)`.
    pub signature: String,
    #[serde(default)]
    pub modifiers: BTreeSet<String>,
}

/// A variable: a field when owned by a type, a global when owned by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub modifiers: BTreeSet<String>,
}

// ============================================================================
// Nested Subtree (edit payload)
// ============================================================================

/// A source file with its top-level entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    #[serde(default)]
    pub entities: Vec<SourceNode>,
}

/// A type declaration with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: BTreeSet<String>,
    #[serde(default)]
    pub supertypes: BTreeSet<String>,
    #[serde(default)]
    pub members: Vec<SourceNode>,
}

/// Owned, nested source subtree as carried by an `AddNode` edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceNode {
    Unit(SourceUnit),
    Type(TypeDecl),
    Function(Function),
    Variable(Variable),
}

/// One node of a flattened [`SourceNode`] walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkedNode<'a> {
    pub id: &'a str,
    pub parent_id: Option<&'a str>,
    pub node: &'a SourceNode,
}

impl SourceNode {
    /// Build a unit node.
    pub fn unit(path: impl Into<String>, entities: Vec<SourceNode>) -> Self {
        SourceNode::Unit(SourceUnit {
            path: path.into(),
            entities,
        })
    }

    /// Build a type node.
    pub fn type_decl<'m>(
        name: impl Into<String>,
        modifiers: impl IntoIterator<Item = &'m str>,
        members: Vec<SourceNode>,
    ) -> Self {
        SourceNode::Type(TypeDecl {
            name: name.into(),
            modifiers: to_set(modifiers),
            supertypes: BTreeSet::new(),
            members,
        })
    }

    /// Build a function node.
    pub fn function<'m>(
        signature: impl Into<String>,
        modifiers: impl IntoIterator<Item = &'m str>,
    ) -> Self {
        SourceNode::Function(Function {
            signature: signature.into(),
            modifiers: to_set(modifiers),
        })
    }

    /// Build a variable node.
    pub fn variable<'m>(
        name: impl Into<String>,
        modifiers: impl IntoIterator<Item = &'m str>,
    ) -> Self {
        SourceNode::Variable(Variable {
            name: name.into(),
            modifiers: to_set(modifiers),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            SourceNode::Unit(_) => NodeKind::Unit,
            SourceNode::Type(_) => NodeKind::Type,
            SourceNode::Function(_) => NodeKind::Function,
            SourceNode::Variable(_) => NodeKind::Variable,
        }
    }

    /// The key this node contributes to its id.
    pub fn key(&self) -> &str {
        match self {
            SourceNode::Unit(unit) => &unit.path,
            SourceNode::Type(decl) => &decl.name,
            SourceNode::Function(function) => &function.signature,
            SourceNode::Variable(variable) => &variable.name,
        }
    }

    /// Compute the id of this node when attached under `parent_id`.
    pub fn id_under(&self, parent_id: Option<&str>) -> String {
        match parent_id {
            Some(parent) => child_id(parent, self.key()),
            None => self.key().to_string(),
        }
    }

    fn children(&self) -> &[SourceNode] {
        match self {
            SourceNode::Unit(unit) => &unit.entities,
            SourceNode::Type(decl) => &decl.members,
            SourceNode::Function(_) | SourceNode::Variable(_) => &[],
        }
    }

    /// Depth-first, pre-order walk of this subtree with computed ids.
    ///
    /// Ids are owned by the returned [`SubtreeIds`]; borrow the nodes through
    /// [`SubtreeIds::iter`].
    pub fn walk(&self, parent_id: Option<&str>) -> SubtreeIds<'_> {
        let mut items = Vec::new();
        collect_walk(self, parent_id.map(str::to_string), &mut items);
        SubtreeIds { items }
    }
}

/// Ids computed for a nested subtree, in depth-first pre-order.
#[derive(Debug, Clone)]
pub struct SubtreeIds<'a> {
    items: Vec<(String, Option<String>, &'a SourceNode)>,
}

impl<'a> SubtreeIds<'a> {
    pub fn iter(&self) -> impl Iterator<Item = WalkedNode<'_>> + '_ {
        self.items.iter().map(|(id, parent_id, node)| WalkedNode {
            id: id.as_str(),
            parent_id: parent_id.as_deref(),
            node: *node,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn collect_walk<'a>(
    node: &'a SourceNode,
    parent_id: Option<String>,
    out: &mut Vec<(String, Option<String>, &'a SourceNode)>,
) {
    let id = node.id_under(parent_id.as_deref());
    out.push((id.clone(), parent_id, node));
    for child in node.children() {
        collect_walk(child, Some(id.clone()), out);
    }
}

fn to_set<'m>(items: impl IntoIterator<Item = &'m str>) -> BTreeSet<String> {
    items.into_iter().map(str::to_string).collect()
}

// ============================================================================
// Arena Nodes
// ============================================================================

/// A unit as stored in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitNode {
    pub path: String,
    /// Ids of top-level entities, in declaration order.
    pub entities: Vec<String>,
}

/// A type as stored in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    pub modifiers: BTreeSet<String>,
    pub supertypes: BTreeSet<String>,
    /// Ids of members, in declaration order.
    pub members: Vec<String>,
}

/// Arena node variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Unit(UnitNode),
    Type(TypeNode),
    Function(Function),
    Variable(Variable),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Unit(_) => NodeKind::Unit,
            Node::Type(_) => NodeKind::Type,
            Node::Function(_) => NodeKind::Function,
            Node::Variable(_) => NodeKind::Variable,
        }
    }

    /// Simple name: path for units, name or signature otherwise.
    pub fn name(&self) -> &str {
        match self {
            Node::Unit(unit) => &unit.path,
            Node::Type(ty) => &ty.name,
            Node::Function(function) => &function.signature,
            Node::Variable(variable) => &variable.name,
        }
    }

    /// Modifier set, `None` for units.
    pub fn modifiers(&self) -> Option<&BTreeSet<String>> {
        match self {
            Node::Unit(_) => None,
            Node::Type(ty) => Some(&ty.modifiers),
            Node::Function(function) => Some(&function.modifiers),
            Node::Variable(variable) => Some(&variable.modifiers),
        }
    }

    /// Child ids in declaration order.
    pub fn children(&self) -> &[String] {
        match self {
            Node::Unit(unit) => &unit.entities,
            Node::Type(ty) => &ty.members,
            Node::Function(_) | Node::Variable(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Node::Unit(unit) => Some(&mut unit.entities),
            Node::Type(ty) => Some(&mut ty.members),
            Node::Function(_) | Node::Variable(_) => None,
        }
    }
}

/// A node together with its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    /// `None` only for units.
    pub parent_id: Option<String>,
    pub node: Node,
}

/// Typed access to one arena variant.
pub trait NodeVariant: Sized {
    const KIND: NodeKind;

    fn from_node(node: &Node) -> Option<&Self>;

    fn from_node_mut(node: &mut Node) -> Option<&mut Self>;
}

macro_rules! impl_node_variant {
    ($ty:ty, $variant:ident) => {
        impl NodeVariant for $ty {
            const KIND: NodeKind = NodeKind::$variant;

            fn from_node(node: &Node) -> Option<&Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_node_mut(node: &mut Node) -> Option<&mut Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_node_variant!(UnitNode, Unit);
impl_node_variant!(TypeNode, Type);
impl_node_variant!(Function, Function);
impl_node_variant!(Variable, Variable);

// ============================================================================
// Project
// ============================================================================

/// The live source model.
///
/// Owns every node of every unit. Lookups by id are O(1) expected; unit order
/// is the order in which units were added.
#[derive(Debug, Clone, Default)]
pub struct Project {
    entries: HashMap<String, Entry>,
    units: Vec<String>,
}

impl Project {
    /// Create an empty project.
    pub fn new() -> Self {
        Project::default()
    }

    /// Number of nodes, units included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Typed lookup.
    pub fn get_as<K: NodeVariant>(&self, id: &str) -> ModelResult<&K> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| ModelError::NodeNotFound { id: id.to_string() })?;
        K::from_node(&entry.node).ok_or_else(|| ModelError::TypeMismatch {
            id: id.to_string(),
            expected: K::KIND,
            actual: entry.node.kind(),
        })
    }

    pub(crate) fn get_as_mut<K: NodeVariant>(&mut self, id: &str) -> ModelResult<&mut K> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ModelError::NodeNotFound { id: id.to_string() })?;
        let actual = entry.node.kind();
        K::from_node_mut(&mut entry.node).ok_or_else(|| ModelError::TypeMismatch {
            id: id.to_string(),
            expected: K::KIND,
            actual,
        })
    }

    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.entries.get(id)?.parent_id.as_deref()
    }

    /// Path of the unit that contains `id` (the id itself for a unit).
    pub fn unit_path_of(&self, id: &str) -> Option<&str> {
        let mut current = self.entries.get(id)?;
        while let Some(parent) = current.parent_id.as_deref() {
            current = self.entries.get(parent)?;
        }
        match &current.node {
            Node::Unit(unit) => Some(unit.path.as_str()),
            _ => None,
        }
    }

    /// Units in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.units.iter().filter_map(move |id| self.entries.get(id))
    }

    /// Children of `id`, in declaration order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Entry> + '_ {
        self.entries
            .get(id)
            .map(|entry| entry.node.children())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.entries.get(child))
    }

    /// Lazy depth-first, pre-order walk of `id` and all its descendants.
    ///
    /// Yields nothing if `id` is absent.
    pub fn walk_subtree<'a>(&'a self, id: &'a str) -> SubtreeWalk<'a> {
        let stack = if self.entries.contains_key(id) {
            vec![id]
        } else {
            Vec::new()
        };
        SubtreeWalk {
            project: self,
            stack,
        }
    }

    /// Every id in the project, units first then their subtrees.
    pub fn all_ids(&self) -> Vec<&str> {
        self.units
            .iter()
            .flat_map(|unit| self.walk_subtree(unit).map(|entry| entry.id.as_str()))
            .collect()
    }

    /// Insert a nested subtree under `parent_id` (or as a unit when `None`).
    ///
    /// The whole subtree is validated first; on error nothing is inserted.
    /// Returns the id of the subtree root.
    pub(crate) fn insert_subtree(
        &mut self,
        parent_id: Option<&str>,
        node: &SourceNode,
    ) -> ModelResult<String> {
        let root_id = node.id_under(parent_id);
        match (node, parent_id) {
            (SourceNode::Unit(_), None) => {}
            (SourceNode::Unit(_), Some(parent)) => {
                return Err(ModelError::InvalidParent {
                    id: root_id,
                    reason: format!("units are top-level, but a parent '{}' was given", parent),
                });
            }
            (_, None) => {
                return Err(ModelError::InvalidParent {
                    id: root_id,
                    reason: format!("a {} needs a parent", node.kind()),
                });
            }
            (_, Some(parent)) => {
                let entry = self
                    .entries
                    .get(parent)
                    .ok_or_else(|| ModelError::NodeNotFound {
                        id: parent.to_string(),
                    })?;
                if !matches!(entry.node, Node::Unit(_) | Node::Type(_)) {
                    return Err(ModelError::InvalidParent {
                        id: root_id,
                        reason: format!(
                            "'{}' is a {} and cannot own members",
                            parent,
                            entry.node.kind()
                        ),
                    });
                }
            }
        }

        let walked = node.walk(parent_id);
        let mut seen = HashSet::new();
        for item in walked.iter() {
            if item.parent_id != parent_id && item.node.kind() == NodeKind::Unit {
                return Err(ModelError::InvalidParent {
                    id: item.id.to_string(),
                    reason: "units cannot be nested".to_string(),
                });
            }
            if self.entries.contains_key(item.id) || !seen.insert(item.id) {
                return Err(ModelError::DuplicateId {
                    id: item.id.to_string(),
                });
            }
        }

        for item in walked.iter() {
            let node = arena_node(item.node, item.id);
            self.entries.insert(
                item.id.to_string(),
                Entry {
                    id: item.id.to_string(),
                    parent_id: item.parent_id.map(str::to_string),
                    node,
                },
            );
        }

        match parent_id {
            Some(parent) => {
                if let Some(children) = self
                    .entries
                    .get_mut(parent)
                    .and_then(|entry| entry.node.children_mut())
                {
                    children.push(root_id.clone());
                }
            }
            None => self.units.push(root_id.clone()),
        }
        Ok(root_id)
    }

    /// Remove `id` and its whole subtree, returning the removed ids in
    /// depth-first pre-order.
    pub(crate) fn remove_subtree(&mut self, id: &str) -> ModelResult<Vec<String>> {
        if !self.entries.contains_key(id) {
            return Err(ModelError::NodeNotFound { id: id.to_string() });
        }
        let removed: Vec<String> = self
            .walk_subtree(id)
            .map(|entry| entry.id.clone())
            .collect();
        let parent_id = self.parent_id(id).map(str::to_string);
        for removed_id in &removed {
            self.entries.remove(removed_id);
        }
        match parent_id {
            Some(parent) => {
                if let Some(children) = self
                    .entries
                    .get_mut(&parent)
                    .and_then(|entry| entry.node.children_mut())
                {
                    children.retain(|child| child != id);
                }
            }
            None => self.units.retain(|unit| unit != id),
        }
        Ok(removed)
    }
}

fn arena_node(node: &SourceNode, id: &str) -> Node {
    let child_ids = |children: &[SourceNode]| -> Vec<String> {
        children
            .iter()
            .map(|child| child.id_under(Some(id)))
            .collect()
    };
    match node {
        SourceNode::Unit(unit) => Node::Unit(UnitNode {
            path: unit.path.clone(),
            entities: child_ids(&unit.entities),
        }),
        SourceNode::Type(decl) => Node::Type(TypeNode {
            name: decl.name.clone(),
            modifiers: decl.modifiers.clone(),
            supertypes: decl.supertypes.clone(),
            members: child_ids(&decl.members),
        }),
        SourceNode::Function(function) => Node::Function(function.clone()),
        SourceNode::Variable(variable) => Node::Variable(variable.clone()),
    }
}

/// Lazy depth-first walk over an arena subtree.
#[derive(Debug)]
pub struct SubtreeWalk<'a> {
    project: &'a Project,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for SubtreeWalk<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(entry) = self.project.entries.get(id) else {
                continue;
            };
            self.stack
                .extend(entry.node.children().iter().rev().map(String::as_str));
            return Some(entry);
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
