//! Java language support for decap.
//!
//! [`JavaResolver`] handles `.java` units. Visibility follows the four Java
//! access levels; members of an interface are always public. Accessors follow
//! the bean convention: `getName()`, `isName()` and `setName(..)` expose the
//! sibling field `name`.

use decap_core::model::{child_id, Node, Project};
use decap_core::resolver::{DecapsulationResolver, VisibilityLevel};

pub const PRIVATE_MODIFIER: &str = "private";
pub const PROTECTED_MODIFIER: &str = "protected";
pub const PUBLIC_MODIFIER: &str = "public";
pub const INTERFACE_MODIFIER: &str = "interface";
pub const STATIC_MODIFIER: &str = "static";
pub const FINAL_MODIFIER: &str = "final";

pub const PRIVATE_LEVEL: VisibilityLevel = VisibilityLevel(1);
pub const PACKAGE_LEVEL: VisibilityLevel = VisibilityLevel(2);
pub const PROTECTED_LEVEL: VisibilityLevel = VisibilityLevel(3);
pub const PUBLIC_LEVEL: VisibilityLevel = VisibilityLevel(4);

const ACCESSOR_PREFIXES: [&str; 3] = ["is", "get", "set"];

/// Resolver for Java sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaResolver;

impl JavaResolver {
    pub fn new() -> Self {
        JavaResolver
    }
}

/// Field name an accessor signature refers to, if it follows the convention.
///
/// `getUserName()` gives `userName`; `isolate()` gives nothing because the
/// text after the prefix must start with an upper-case letter.
pub fn accessor_field_name(signature: &str) -> Option<String> {
    ACCESSOR_PREFIXES.iter().find_map(|prefix| {
        let rest = signature.strip_prefix(prefix)?;
        let name = rest.split('(').next().unwrap_or(rest);
        let mut chars = name.chars();
        let first = chars.next()?;
        if !first.is_uppercase() {
            return None;
        }
        Some(first.to_lowercase().chain(chars).collect())
    })
}

fn level_of<'a>(modifiers: impl IntoIterator<Item = &'a String>) -> VisibilityLevel {
    let mut private = false;
    let mut protected = false;
    let mut public = false;
    for modifier in modifiers {
        match modifier.as_str() {
            PRIVATE_MODIFIER => private = true,
            PROTECTED_MODIFIER => protected = true,
            PUBLIC_MODIFIER => public = true,
            _ => {}
        }
    }
    if private {
        PRIVATE_LEVEL
    } else if protected {
        PROTECTED_LEVEL
    } else if public {
        PUBLIC_LEVEL
    } else {
        PACKAGE_LEVEL
    }
}

fn is_interface(project: &Project, id: Option<&str>) -> bool {
    id.and_then(|id| project.get(id))
        .is_some_and(|entry| match &entry.node {
            Node::Type(ty) => ty.modifiers.contains(INTERFACE_MODIFIER),
            _ => false,
        })
}

impl DecapsulationResolver for JavaResolver {
    fn name(&self) -> &'static str {
        "java"
    }

    fn can_process(&self, source_path: &str) -> bool {
        source_path.ends_with(".java")
    }

    fn field_of(&self, project: &Project, node_id: &str) -> Option<String> {
        let entry = project.get(node_id)?;
        match &entry.node {
            Node::Variable(_) => Some(entry.id.clone()),
            Node::Function(function) => {
                let name = accessor_field_name(&function.signature)?;
                let field_id = child_id(entry.parent_id.as_deref()?, &name);
                match project.get(&field_id).map(|field| &field.node) {
                    Some(Node::Variable(_)) => Some(field_id),
                    _ => {
                        tracing::trace!("'{}' names missing field '{}'", node_id, field_id);
                        None
                    }
                }
            }
            Node::Type(_) | Node::Unit(_) => None,
        }
    }

    fn visibility_of(&self, project: &Project, node_id: &str) -> Option<VisibilityLevel> {
        let entry = project.get(node_id)?;
        let modifiers = entry.node.modifiers()?;
        if is_interface(project, entry.parent_id.as_deref()) {
            return Some(PUBLIC_LEVEL);
        }
        Some(level_of(modifiers))
    }

    fn is_constant(&self, project: &Project, node_id: &str) -> bool {
        let Some(entry) = project.get(node_id) else {
            return false;
        };
        let Node::Variable(variable) = &entry.node else {
            return false;
        };
        let modifiers = &variable.modifiers;
        (modifiers.contains(STATIC_MODIFIER) && modifiers.contains(FINAL_MODIFIER))
            || is_interface(project, entry.parent_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decap_core::edit::Edit;
    use decap_core::model::SourceNode;

    fn project_with(type_modifiers: &[&str], members: Vec<SourceNode>) -> Project {
        let mut project = Project::new();
        project
            .apply(&Edit::add_node(
                None,
                SourceNode::unit(
                    "src/Main.java",
                    vec![
                        SourceNode::type_decl("Main", type_modifiers.iter().copied(), members),
                        SourceNode::variable("GLOBAL", ["static", "final"]),
                    ],
                ),
            ))
            .unwrap();
        project
    }

    mod visibility {
        use super::*;

        #[test]
        fn java_access_levels() {
            for (modifier, expected) in [
                (Some(PRIVATE_MODIFIER), PRIVATE_LEVEL),
                (None, PACKAGE_LEVEL),
                (Some(PROTECTED_MODIFIER), PROTECTED_LEVEL),
                (Some(PUBLIC_MODIFIER), PUBLIC_LEVEL),
            ] {
                let project = project_with(modifier.as_slice(), vec![]);
                assert_eq!(
                    JavaResolver.visibility_of(&project, "src/Main.java:Main"),
                    Some(expected),
                    "modifier {:?}",
                    modifier
                );
            }
        }

        #[test]
        fn levels_are_ordered() {
            assert!(PRIVATE_LEVEL < PACKAGE_LEVEL);
            assert!(PACKAGE_LEVEL < PROTECTED_LEVEL);
            assert!(PROTECTED_LEVEL < PUBLIC_LEVEL);
        }

        #[test]
        fn interface_members_are_public() {
            let project = project_with(
                &["interface"],
                vec![
                    SourceNode::function("run()", []),
                    SourceNode::variable("LIMIT", []),
                    SourceNode::type_decl("Nested", ["private"], vec![]),
                ],
            );
            for id in ["run()", "LIMIT", "Nested"] {
                let id = format!("src/Main.java:Main:{}", id);
                assert_eq!(JavaResolver.visibility_of(&project, &id), Some(PUBLIC_LEVEL));
            }
        }

        #[test]
        fn units_and_absent_nodes_have_no_visibility() {
            let project = project_with(&[], vec![]);
            assert_eq!(JavaResolver.visibility_of(&project, "src/Main.java"), None);
            assert_eq!(JavaResolver.visibility_of(&project, "src/Main.java:Nope"), None);
        }
    }

    mod accessors {
        use super::*;

        #[test]
        fn accessor_names_follow_bean_convention() {
            assert_eq!(accessor_field_name("getName()").as_deref(), Some("name"));
            assert_eq!(accessor_field_name("isEmpty()").as_deref(), Some("empty"));
            assert_eq!(
                accessor_field_name("setUserId(long)").as_deref(),
                Some("userId")
            );
            assert_eq!(accessor_field_name("getURL()").as_deref(), Some("uRL"));
            assert_eq!(accessor_field_name("isolate()"), None);
            assert_eq!(accessor_field_name("get()"), None);
            assert_eq!(accessor_field_name("run()"), None);
        }

        #[test]
        fn field_of_links_accessor_to_sibling_field() {
            let project = project_with(
                &["public"],
                vec![
                    SourceNode::variable("name", ["private"]),
                    SourceNode::function("getName()", ["public"]),
                    SourceNode::function("setName(String)", ["public"]),
                    SourceNode::function("getAge()", ["public"]),
                    SourceNode::type_decl("Value", [], vec![]),
                    SourceNode::function("getValue()", ["public"]),
                ],
            );
            let field = Some("src/Main.java:Main:name".to_string());
            assert_eq!(
                JavaResolver.field_of(&project, "src/Main.java:Main:getName()"),
                field
            );
            assert_eq!(
                JavaResolver.field_of(&project, "src/Main.java:Main:setName(String)"),
                field
            );
            assert_eq!(
                JavaResolver.field_of(&project, "src/Main.java:Main:name"),
                field
            );
            assert_eq!(
                JavaResolver.field_of(&project, "src/Main.java:Main:getAge()"),
                None
            );
            assert_eq!(
                JavaResolver.field_of(&project, "src/Main.java:Main:getValue()"),
                None
            );
            assert_eq!(JavaResolver.field_of(&project, "src/Main.java:Main"), None);
        }
    }

    mod constants {
        use super::*;

        #[test]
        fn static_final_fields_are_constants() {
            let project = project_with(
                &[],
                vec![
                    SourceNode::variable("MAX", ["public", "static", "final"]),
                    SourceNode::variable("count", ["static"]),
                ],
            );
            assert!(JavaResolver.is_constant(&project, "src/Main.java:Main:MAX"));
            assert!(!JavaResolver.is_constant(&project, "src/Main.java:Main:count"));
            assert!(JavaResolver.is_constant(&project, "src/Main.java:GLOBAL"));
        }

        #[test]
        fn interface_fields_are_constants() {
            let project = project_with(
                &["interface"],
                vec![
                    SourceNode::variable("LIMIT", []),
                    SourceNode::function("getLimit()", []),
                ],
            );
            assert!(JavaResolver.is_constant(&project, "src/Main.java:Main:LIMIT"));
            assert!(!JavaResolver.is_constant(&project, "src/Main.java:Main:getLimit()"));
        }
    }

    #[test]
    fn processes_java_paths_only() {
        assert!(JavaResolver.can_process("src/Main.java"));
        assert!(!JavaResolver.can_process("src/Main.kt"));
        assert!(!JavaResolver.can_process("Main.java.orig"));
        assert_eq!(JavaResolver.name(), "java");
    }
}
