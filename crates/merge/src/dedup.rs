use std::collections::HashMap;

use shopmerge_core::Table;

use crate::catalog::DedupRule;

/// Collapse rows that share every key column.
///
/// The surviving row is the first one whose `prefer_filled` cell is
/// non-empty, or the first-seen row when none is; it takes the position of
/// the key's first occurrence. Rows whose key cells are all blank are
/// never merged. Returns the number of rows removed, or `None`
/// (table untouched) when a key column or the preferred column is missing.
pub fn dedup(table: &mut Table, rule: &DedupRule) -> Option<usize> {
    let keys: Vec<usize> = rule
        .keys
        .iter()
        .map(|k| table.column_index(k))
        .collect::<Option<_>>()?;
    let preferred = table.column_index(rule.prefer_filled)?;

    // key -> slot in `survivors`
    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    // (row index, preferred cell filled)
    let mut survivors: Vec<(usize, bool)> = Vec::new();

    for (idx, row) in table.rows().iter().enumerate() {
        let filled = !row[preferred].is_empty();
        if keys.iter().all(|&k| row[k].is_empty()) {
            survivors.push((idx, filled));
            continue;
        }
        let key: Vec<String> = keys.iter().map(|&k| row[k].display()).collect();
        match slots.get(&key) {
            Some(&slot) => {
                let survivor = &mut survivors[slot];
                if !survivor.1 && filled {
                    *survivor = (idx, true);
                }
            }
            None => {
                slots.insert(key, survivors.len());
                survivors.push((idx, filled));
            }
        }
    }

    let removed = table.len() - survivors.len();
    if removed > 0 {
        let indices: Vec<usize> = survivors.iter().map(|&(idx, _)| idx).collect();
        table.select_rows(&indices);
    }
    Some(removed)
}
