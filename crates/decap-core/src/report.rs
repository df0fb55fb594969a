//! Report aggregation: folds per-field histories into a file → type → field tree.
//!
//! Aggregation is a read-only projection of the final [`Project`] state.
//! Every variable still present in the model gets a [`FieldReport`]; siblings
//! at every level are stable-sorted by descending severity, so ties keep
//! declaration order.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Node, Project};
use crate::resolver::ResolverRegistry;
use crate::tracker::{Decapsulation, DecapsulationHistory};

/// Events recorded for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    pub name: String,
    pub id: String,
    pub decapsulations: Vec<Decapsulation>,
    /// Number of events.
    pub severity: usize,
}

/// Fields and nested types of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReport {
    pub name: String,
    pub id: String,
    pub fields: Vec<FieldReport>,
    pub types: Vec<TypeReport>,
    pub severity: usize,
}

/// Top-level variables and types of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub fields: Vec<FieldReport>,
    pub types: Vec<TypeReport>,
    pub severity: usize,
}

/// The whole report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub files: Vec<FileReport>,
    pub severity: usize,
}

/// Build the report from the final model and the per-field histories.
///
/// With `ignore_constants`, fields the registry reports as constants are
/// left out entirely.
pub fn aggregate(
    project: &Project,
    history: &DecapsulationHistory,
    registry: &ResolverRegistry,
    ignore_constants: bool,
) -> Report {
    let aggregator = Aggregator {
        project,
        history,
        registry,
        ignore_constants,
    };
    let mut files: Vec<FileReport> = project
        .units()
        .filter_map(|entry| match &entry.node {
            Node::Unit(unit) => Some(aggregator.file(&entry.id, &unit.path)),
            _ => None,
        })
        .collect();
    files.sort_by_key(|file| Reverse(file.severity));
    let severity = files.iter().map(|file| file.severity).sum();
    tracing::debug!("aggregated {} files, total severity {}", files.len(), severity);
    Report { files, severity }
}

struct Aggregator<'a> {
    project: &'a Project,
    history: &'a DecapsulationHistory,
    registry: &'a ResolverRegistry,
    ignore_constants: bool,
}

impl Aggregator<'_> {
    fn members(&self, parent_id: &str) -> (Vec<FieldReport>, Vec<TypeReport>) {
        let mut fields = Vec::new();
        let mut types = Vec::new();
        for child in self.project.children(parent_id) {
            match &child.node {
                Node::Variable(variable) => {
                    if self.ignore_constants && self.registry.is_constant(self.project, &child.id)
                    {
                        continue;
                    }
                    let decapsulations = self.history.get(&child.id).cloned().unwrap_or_default();
                    fields.push(FieldReport {
                        name: variable.name.clone(),
                        id: child.id.clone(),
                        severity: decapsulations.len(),
                        decapsulations,
                    });
                }
                Node::Type(ty) => types.push(self.type_report(&child.id, &ty.name)),
                Node::Function(_) | Node::Unit(_) => {}
            }
        }
        fields.sort_by_key(|field| Reverse(field.severity));
        types.sort_by_key(|ty| Reverse(ty.severity));
        (fields, types)
    }

    fn type_report(&self, id: &str, name: &str) -> TypeReport {
        let (fields, types) = self.members(id);
        let severity = severity_of(&fields, &types);
        TypeReport {
            name: name.to_string(),
            id: id.to_string(),
            fields,
            types,
            severity,
        }
    }

    fn file(&self, id: &str, path: &str) -> FileReport {
        let (fields, types) = self.members(id);
        let severity = severity_of(&fields, &types);
        FileReport {
            path: path.to_string(),
            fields,
            types,
            severity,
        }
    }
}

fn severity_of(fields: &[FieldReport], types: &[TypeReport]) -> usize {
    fields.iter().map(|field| field.severity).sum::<usize>()
        + types.iter().map(|ty| ty.severity).sum::<usize>()
}

impl TypeReport {
    fn retain_decapsulated(&mut self) {
        self.fields.retain(|field| field.severity > 0);
        for ty in &mut self.types {
            ty.retain_decapsulated();
        }
        self.types.retain(|ty| ty.severity > 0);
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldReport>) {
        out.extend(self.fields.iter());
        for ty in &self.types {
            ty.collect_fields(out);
        }
    }
}

impl FileReport {
    /// Every field report in this file, depth-first.
    pub fn all_fields(&self) -> Vec<&FieldReport> {
        let mut out: Vec<&FieldReport> = self.fields.iter().collect();
        for ty in &self.types {
            ty.collect_fields(&mut out);
        }
        out
    }
}

impl Report {
    /// Drop every field, type and file without events.
    pub fn retain_decapsulated(&mut self) {
        for file in &mut self.files {
            file.fields.retain(|field| field.severity > 0);
            for ty in &mut file.types {
                ty.retain_decapsulated();
            }
            file.types.retain(|ty| ty.severity > 0);
        }
        self.files.retain(|file| file.severity > 0);
    }

    /// Events grouped by the id of the field's parent (type or unit).
    pub fn decapsulations_by_parent(&self) -> BTreeMap<String, Vec<&Decapsulation>> {
        let mut grouped: BTreeMap<String, Vec<&Decapsulation>> = BTreeMap::new();
        for file in &self.files {
            for field in file.all_fields() {
                if field.decapsulations.is_empty() {
                    continue;
                }
                let parent = field
                    .id
                    .rsplit_once(crate::model::ENTITY_SEPARATOR)
                    .map(|(parent, _)| parent)
                    .unwrap_or(field.id.as_str());
                grouped
                    .entry(parent.to_string())
                    .or_default()
                    .extend(field.decapsulations.iter());
            }
        }
        grouped
    }

    /// Number of field reports across all files.
    pub fn field_count(&self) -> usize {
        self.files.iter().map(|file| file.all_fields().len()).sum()
    }
}
