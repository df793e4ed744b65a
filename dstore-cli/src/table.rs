/// Table formatting for query results using comfy-table

use crate::json::value_to_json;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dstore_core::{Entity, Property, KEY_PROPERTY};
use std::collections::BTreeSet;

/// Format entities as a table: the key first, then every property name seen
/// across the results in alphabetical order.
pub fn format_entities_table(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "No entities found".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let columns: BTreeSet<&str> = entities.iter().flat_map(Entity::property_names).collect();

    let mut header = vec![Cell::new(KEY_PROPERTY)];
    header.extend(columns.iter().map(|col| Cell::new(col)));
    table.set_header(header);

    for entity in entities {
        let mut row = vec![Cell::new(entity.key().to_string())];
        row.extend(columns.iter().map(|col| match entity.property(col) {
            Some(property) => Cell::new(format_property(property)),
            None => Cell::new("-"),
        }));
        table.add_row(row);
    }

    table.to_string()
}

fn format_property(property: &Property) -> String {
    let values: Vec<String> = property
        .values()
        .iter()
        .map(|v| match value_to_json(v) {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    if property.is_multi() {
        format!("[{}]", values.join(", "))
    } else {
        values.join("")
    }
}
