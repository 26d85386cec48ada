//! Column normalization: canonical headers, provenance columns, numbers.

use std::collections::HashMap;

use shopmerge_config::Settings;
use shopmerge_core::{Table, Value};

use crate::catalog::CategoryDescriptor;
use crate::model::FileRecord;

/// Names of the two provenance columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub store_header: String,
    pub country_header: String,
}

impl Provenance {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            store_header: settings.store_header.clone(),
            country_header: settings.country_header.clone(),
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Column handling for one category (or one Amazon country).
#[derive(Debug, Clone, Default)]
pub struct ColumnRules<'a> {
    /// Source header → canonical header
    pub rename: HashMap<&'a str, &'a str>,
    pub canonical_order: Vec<&'a str>,
    pub numeric_columns: &'a [&'a str],
}

impl ColumnRules<'static> {
    pub fn for_descriptor(descriptor: &'static CategoryDescriptor) -> Self {
        Self {
            rename: descriptor.rename.iter().copied().collect(),
            canonical_order: descriptor.canonical_order.to_vec(),
            numeric_columns: descriptor.numeric_columns,
        }
    }
}

/// Normalize one table read from `record`.
///
/// Store and country always end up at columns 0 and 1; a return-fee table
/// also gets its warehouse-type column appended.
pub fn normalize(
    table: Table,
    record: &FileRecord,
    descriptor: &'static CategoryDescriptor,
    provenance: &Provenance,
) -> Table {
    let rules = ColumnRules::for_descriptor(descriptor);
    let mut table = apply_rules(table, &record.store, &record.country, &rules, provenance);

    if let (Some(column), Some(kind)) = (descriptor.warehouse_column, record.warehouse) {
        table.push_column(column, Value::text(kind.tag()));
    }
    table
}

/// Rename, tag with provenance, reorder and coerce numbers.
pub fn apply_rules(
    mut table: Table,
    store: &str,
    country: &str,
    rules: &ColumnRules<'_>,
    provenance: &Provenance,
) -> Table {
    // a table that already carries provenance (e.g. a previous output) is re-tagged
    table.drop_column(&provenance.store_header);
    table.drop_column(&provenance.country_header);

    if !rules.rename.is_empty() {
        table.rename_columns(|name| rules.rename.get(name).map(|c| c.to_string()));
    }

    table.insert_column(0, &provenance.store_header, Value::text(store));
    table.insert_column(1, &provenance.country_header, Value::text(country));

    if !rules.canonical_order.is_empty() {
        table.reorder(2, &rules.canonical_order);
    }

    for column in rules.numeric_columns {
        table.map_column(column, coerce_numeric);
    }
    table
}

/// Parse currency-formatted text as a number; anything unparsable is kept as is.
pub fn coerce_numeric(value: &Value) -> Value {
    let Value::Text(text) = value else {
        return value.clone();
    };
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '£' | '€' | ',') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => value.clone(),
    }
}
