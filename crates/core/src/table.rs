// In-memory tables

use std::collections::HashMap;

use crate::value::Value;

/// Ordered columns with unique names, rows in file order.
///
/// Every row holds exactly `width()` cells. Column operations keep that
/// invariant by padding or removing cells in every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: uniquify(columns),
            rows: Vec::new(),
        }
    }

    /// Build a table from a header row and data rows.
    ///
    /// Blank headers become `Unnamed: {index}` and repeated headers get a
    /// `.1`, `.2` suffix. Short rows are padded with `Empty`; cells past
    /// the header width are dropped.
    pub fn from_grid(header: Vec<Value>, rows: Vec<Vec<Value>>) -> Self {
        let columns = header
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let name = v.display().trim().to_string();
                if name.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    name
                }
            })
            .collect();

        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Iterate one column top to bottom.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    /// Insert a column at `position` (clamped to the width), filling every
    /// row with `fill`. An existing column of the same name is removed first.
    pub fn insert_column(&mut self, position: usize, name: &str, fill: Value) {
        self.drop_column(name);
        let position = position.min(self.columns.len());
        self.columns.insert(position, name.to_string());
        for row in &mut self.rows {
            row.insert(position, fill.clone());
        }
    }

    pub fn push_column(&mut self, name: &str, fill: Value) {
        let end = self.columns.len();
        self.insert_column(end, name, fill);
    }

    /// Append a column from per-row values; missing values are `Empty`.
    /// An existing column of the same name is removed first.
    pub fn append_column(&mut self, name: &str, values: impl IntoIterator<Item = Value>) {
        self.push_column(name, Value::Empty);
        let idx = self.columns.len() - 1;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Remove a column by name. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Rename columns through `lookup`; unmapped columns keep their name.
    /// Collisions created by the rename are resolved with a numeric suffix.
    pub fn rename_columns(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|c| lookup(c).unwrap_or_else(|| c.clone()))
            .collect();
        self.columns = uniquify(renamed);
    }

    /// Reorder columns after the first `pinned` ones: `leading` names come
    /// first in the given order (absent names are skipped), the remaining
    /// columns follow in their current relative order.
    pub fn reorder(&mut self, pinned: usize, leading: &[&str]) {
        let pinned = pinned.min(self.columns.len());
        let mut order: Vec<usize> = (0..pinned).collect();

        for name in leading {
            if let Some(idx) = self.column_index(name) {
                if idx >= pinned && !order.contains(&idx) {
                    order.push(idx);
                }
            }
        }
        for idx in pinned..self.columns.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }

        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let old = std::mem::take(row);
            *row = order.iter().map(|&i| old[i].clone()).collect();
        }
    }

    /// Apply `f` to every cell of a column. Returns false if the column is absent.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&Value) -> Value) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Keep only the rows at `indices`, in the order given.
    pub fn select_rows(&mut self, indices: &[usize]) {
        let old = std::mem::take(&mut self.rows);
        self.rows = indices.iter().filter_map(|&i| old.get(i).cloned()).collect();
    }

    /// Concatenate tables with outer-join column semantics.
    ///
    /// The result's columns are the union in first-seen order; a table that
    /// lacks a column contributes `Empty` for it. Rows keep input order.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for c in &table.columns {
                if !positions.contains_key(c) {
                    positions.insert(c.clone(), columns.len());
                    columns.push(c.clone());
                }
            }
        }

        let width = columns.len();
        let mut merged = Table { columns, rows: Vec::new() };
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in table.rows {
                let mut out = vec![Value::Empty; width];
                for (src, value) in row.into_iter().enumerate() {
                    out[mapping[src]] = value;
                }
                merged.rows.push(out);
            }
        }
        merged
    }
}

/// Make column names unique, pandas-style (`a`, `a.1`, `a.2`).
fn uniquify(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(columns.len());
    for name in columns {
        if !seen.contains_key(&name) {
            seen.insert(name.clone(), 0);
            out.push(name);
            continue;
        }
        let mut n = seen[&name];
        let candidate = loop {
            n += 1;
            let candidate = format!("{}.{}", name, n);
            if !seen.contains_key(&candidate) {
                break candidate;
            }
        };
        seen.insert(name, n);
        seen.insert(candidate.clone(), 0);
        out.push(candidate);
    }
    out
}
