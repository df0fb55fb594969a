//! Per-language resolver trait and the registry that selects one by path.
//!
//! The core never interprets modifiers itself. A [`DecapsulationResolver`]
//! answers three questions against the current [`Project`]:
//!
//! - which field a node exposes ([`DecapsulationResolver::field_of`]),
//! - how visible a node is ([`DecapsulationResolver::visibility_of`]),
//! - whether a field is a compile-time constant
//!   ([`DecapsulationResolver::is_constant`]).
//!
//! Resolvers are registered explicitly in a [`ResolverRegistry`] value that
//! is handed to the tracker. The first resolver whose
//! [`can_process`](DecapsulationResolver::can_process) accepts a unit path
//! wins, so registration order is the precedence order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Project;

/// Totally ordered visibility level. Higher means more exposed.
///
/// Levels are language specific but comparable within one resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisibilityLevel(pub u8);

impl fmt::Display for VisibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Language-specific answers about fields, accessors and visibility.
pub trait DecapsulationResolver: Send + Sync {
    /// Stable name used in configuration (e.g. `java`).
    fn name(&self) -> &'static str;

    /// Whether this resolver handles the unit at `source_path`.
    fn can_process(&self, source_path: &str) -> bool;

    /// Field exposed by `node_id`: the node itself for a field, the accessed
    /// field for a recognized accessor, `None` otherwise.
    fn field_of(&self, project: &Project, node_id: &str) -> Option<String>;

    /// Visibility of `node_id`, `None` if absent or without a visibility concept.
    fn visibility_of(&self, project: &Project, node_id: &str) -> Option<VisibilityLevel>;

    /// Whether `node_id` is a compile-time constant field.
    fn is_constant(&self, project: &Project, node_id: &str) -> bool;
}

/// Ordered set of resolvers; first match wins.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn DecapsulationResolver>>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolvers", &self.names())
            .finish()
    }
}

impl ResolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ResolverRegistry::default()
    }

    /// Register a resolver after all previously registered ones.
    pub fn register(&mut self, resolver: Box<dyn DecapsulationResolver>) {
        tracing::debug!("registering resolver '{}'", resolver.name());
        self.resolvers.push(resolver);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, resolver: Box<dyn DecapsulationResolver>) -> Self {
        self.register(resolver);
        self
    }

    /// Keep only the resolvers named in `order`, in that order.
    ///
    /// Unknown names are returned so the caller can report them.
    pub fn ordered<S: AsRef<str>>(mut self, order: &[S]) -> (Self, Vec<String>) {
        let mut ordered = Vec::with_capacity(order.len());
        let mut unknown = Vec::new();
        for name in order {
            let name = name.as_ref();
            match self.resolvers.iter().position(|r| r.name() == name) {
                Some(index) => ordered.push(self.resolvers.remove(index)),
                None => unknown.push(name.to_string()),
            }
        }
        (
            ResolverRegistry {
                resolvers: ordered,
            },
            unknown,
        )
    }

    /// Names in precedence order.
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// First resolver accepting `source_path`.
    pub fn resolve(&self, source_path: &str) -> Option<&dyn DecapsulationResolver> {
        self.resolvers
            .iter()
            .find(|resolver| resolver.can_process(source_path))
            .map(|resolver| resolver.as_ref())
    }

    fn resolve_node(&self, project: &Project, node_id: &str) -> Option<&dyn DecapsulationResolver> {
        let path = project.unit_path_of(node_id)?;
        let resolver = self.resolve(path);
        if resolver.is_none() {
            tracing::debug!("no resolver for '{}'", path);
        }
        resolver
    }

    /// [`DecapsulationResolver::field_of`] routed by the node's unit path.
    pub fn field_of(&self, project: &Project, node_id: &str) -> Option<String> {
        self.resolve_node(project, node_id)?
            .field_of(project, node_id)
    }

    /// [`DecapsulationResolver::visibility_of`] routed by the node's unit path.
    pub fn visibility_of(&self, project: &Project, node_id: &str) -> Option<VisibilityLevel> {
        self.resolve_node(project, node_id)?
            .visibility_of(project, node_id)
    }

    /// [`DecapsulationResolver::is_constant`] routed by the node's unit path.
    pub fn is_constant(&self, project: &Project, node_id: &str) -> bool {
        self.resolve_node(project, node_id)
            .is_some_and(|resolver| resolver.is_constant(project, node_id))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Node, SourceNode};

    /// Minimal resolver for `.mock` files: `private` < default < `public`;
    /// functions named `getX()` expose sibling `x`; `const` marks constants.
    pub(crate) struct MockResolver;

    impl DecapsulationResolver for MockResolver {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn can_process(&self, source_path: &str) -> bool {
            source_path.ends_with(".mock")
        }

        fn field_of(&self, project: &Project, node_id: &str) -> Option<String> {
            let entry = project.get(node_id)?;
            match &entry.node {
                Node::Variable(_) => Some(entry.id.clone()),
                Node::Function(function) => {
                    let name = function.signature.strip_prefix("get")?.strip_suffix("()")?;
                    let field_id =
                        crate::model::child_id(entry.parent_id.as_deref()?, &name.to_lowercase());
                    match project.get(&field_id)?.node {
                        Node::Variable(_) => Some(field_id),
                        _ => None,
                    }
                }
                _ => None,
            }
        }

        fn visibility_of(&self, project: &Project, node_id: &str) -> Option<VisibilityLevel> {
            let modifiers = project.get(node_id)?.node.modifiers()?;
            let level = if modifiers.contains("private") {
                1
            } else if modifiers.contains("public") {
                3
            } else {
                2
            };
            Some(VisibilityLevel(level))
        }

        fn is_constant(&self, project: &Project, node_id: &str) -> bool {
            project
                .get(node_id)
                .and_then(|entry| entry.node.modifiers())
                .is_some_and(|modifiers| modifiers.contains("const"))
        }
    }

    /// Accepts every path; used to observe precedence.
    struct CatchAllResolver;

    impl DecapsulationResolver for CatchAllResolver {
        fn name(&self) -> &'static str {
            "catch_all"
        }

        fn can_process(&self, _source_path: &str) -> bool {
            true
        }

        fn field_of(&self, _project: &Project, _node_id: &str) -> Option<String> {
            None
        }

        fn visibility_of(&self, _project: &Project, _node_id: &str) -> Option<VisibilityLevel> {
            Some(VisibilityLevel(0))
        }

        fn is_constant(&self, _project: &Project, _node_id: &str) -> bool {
            false
        }
    }

    fn project() -> Project {
        let mut project = Project::new();
        project
            .insert_subtree(
                None,
                &SourceNode::unit(
                    "Test.mock",
                    vec![SourceNode::type_decl(
                        "Test",
                        [],
                        vec![
                            SourceNode::variable("x", ["private"]),
                            SourceNode::function("getX()", ["public"]),
                        ],
                    )],
                ),
            )
            .unwrap();
        project
    }

    #[test]
    fn resolve_finds_registered_resolver() {
        let registry = ResolverRegistry::new().with(Box::new(MockResolver));
        assert!(registry.resolve("Test.mock").is_some());
        assert!(registry.resolve("Test.java").is_none());
    }

    #[test]
    fn first_registered_resolver_wins() {
        let registry = ResolverRegistry::new()
            .with(Box::new(CatchAllResolver))
            .with(Box::new(MockResolver));
        assert_eq!(registry.resolve("Test.mock").unwrap().name(), "catch_all");
    }

    #[test]
    fn ordered_reorders_and_reports_unknown() {
        let registry = ResolverRegistry::new()
            .with(Box::new(CatchAllResolver))
            .with(Box::new(MockResolver));
        let (registry, unknown) = registry.ordered(&["mock", "cobol", "catch_all"]);
        assert_eq!(registry.names(), vec!["mock", "catch_all"]);
        assert_eq!(unknown, vec!["cobol".to_string()]);
        assert_eq!(registry.resolve("Test.mock").unwrap().name(), "mock");
    }

    #[test]
    fn routed_queries_use_unit_path() {
        let registry = ResolverRegistry::new().with(Box::new(MockResolver));
        let project = project();
        assert_eq!(
            registry.field_of(&project, "Test.mock:Test:getX()"),
            Some("Test.mock:Test:x".to_string())
        );
        assert_eq!(
            registry.visibility_of(&project, "Test.mock:Test:x"),
            Some(VisibilityLevel(1))
        );
        assert_eq!(registry.visibility_of(&project, "Test.mock:Test:missing"), None);
        assert!(!registry.is_constant(&project, "Test.mock:Test:x"));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = ResolverRegistry::new();
        let project = project();
        assert!(registry.is_empty());
        assert_eq!(registry.visibility_of(&project, "Test.mock:Test:x"), None);
        assert_eq!(registry.field_of(&project, "Test.mock:Test:x"), None);
    }
}
