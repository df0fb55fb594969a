//! Plain-text rendering of reports and cost summaries.

use std::cmp::Reverse;
use std::io::{self, Write};

use decap_core::cost::CostEntry;
use decap_core::model::ENTITY_SEPARATOR;
use decap_core::report::{FieldReport, Report, TypeReport};

const INDENT: &str = "  ";

/// Render a report as an indented tree, one node per line with its severity.
///
/// Each event is listed under its field as `revision: message (node)`, where
/// `node` is the accessor or field name relative to the field's parent.
pub fn render_report(report: &Report, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "total severity: {}", report.severity)?;
    for file in &report.files {
        writeln!(out, "{} ({})", file.path, file.severity)?;
        for field in &file.fields {
            render_field(field, 1, out)?;
        }
        for ty in &file.types {
            render_type(ty, 1, out)?;
        }
    }
    Ok(())
}

fn render_type(ty: &TypeReport, depth: usize, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}{} ({})", INDENT.repeat(depth), ty.name, ty.severity)?;
    for field in &ty.fields {
        render_field(field, depth + 1, out)?;
    }
    for nested in &ty.types {
        render_type(nested, depth + 1, out)?;
    }
    Ok(())
}

fn render_field(field: &FieldReport, depth: usize, out: &mut impl Write) -> io::Result<()> {
    let indent = INDENT.repeat(depth);
    writeln!(out, "{}{} ({})", indent, field.name, field.severity)?;
    let parent_prefix = field
        .id
        .rsplit_once(ENTITY_SEPARATOR)
        .map(|(parent, _)| format!("{}{}", parent, ENTITY_SEPARATOR));
    for event in &field.decapsulations {
        let node = parent_prefix
            .as_deref()
            .and_then(|prefix| event.node_id.strip_prefix(prefix))
            .unwrap_or(event.node_id.as_str());
        writeln!(
            out,
            "{}{}- {}: {} ({})",
            indent, INDENT, event.revision_id, event.message, node
        )?;
    }
    Ok(())
}

/// Render events grouped by the id of the field's parent, busiest parent first.
///
/// ```text
/// 'A.java:A' (1):
/// - x:
///   - revision: r2
///   - node: getX()
///   - message: added accessor with more relaxed visibility
/// ```
pub fn render_grouped(report: &Report, out: &mut impl Write) -> io::Result<()> {
    let mut groups: Vec<_> = report.decapsulations_by_parent().into_iter().collect();
    groups.sort_by_key(|(_, events)| Reverse(events.len()));
    for (parent_id, events) in groups {
        writeln!(out, "'{}' ({}):", parent_id, events.len())?;
        let prefix = format!("{}{}", parent_id, ENTITY_SEPARATOR);
        let relative = |id: &str| id.strip_prefix(prefix.as_str()).unwrap_or(id).to_string();

        let mut fields: Vec<(&str, Vec<_>)> = Vec::new();
        for event in events {
            match fields.iter_mut().find(|(id, _)| *id == event.field_id) {
                Some((_, grouped)) => grouped.push(event),
                None => fields.push((event.field_id.as_str(), vec![event])),
            }
        }
        for (field_id, events) in fields {
            writeln!(out, "- {}:", relative(field_id))?;
            for event in events {
                writeln!(out, "{}- revision: {}", INDENT, event.revision_id)?;
                writeln!(out, "{}- node: {}", INDENT, relative(&event.node_id))?;
                writeln!(out, "{}- message: {}", INDENT, event.message)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

/// Render cost entries as `cost<TAB>kind<TAB>id` lines.
pub fn render_costs(costs: &[CostEntry], out: &mut impl Write) -> io::Result<()> {
    for entry in costs {
        writeln!(out, "{}\t{}\t{}", entry.cost, entry.kind, entry.id)?;
    }
    Ok(())
}
