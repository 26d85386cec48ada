use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use shopmerge_core::Table;
use shopmerge_io::{read_file, ReadOptions, SheetSelection, SheetTable};

use crate::catalog::{CategoryDescriptor, Flow, SheetStrategy};
use crate::context::MergeContext;
use crate::dedup::dedup;
use crate::error::{MergeError, SkipReason};
use crate::locator::locate;
use crate::model::{CategoryReport, FileRecord, WarehouseKind};
use crate::normalize::{normalize, Provenance};

/// Merge one category: locate, read, normalize, group, write.
///
/// File-local failures are recorded in the report and the rest of the
/// category still runs. An error return means the category stopped early.
pub fn merge_category(
    ctx: &MergeContext,
    descriptor: &'static CategoryDescriptor,
) -> Result<CategoryReport, MergeError> {
    let mut report = CategoryReport::new(descriptor.id);
    merge_into(ctx, descriptor, &mut report)?;
    Ok(report)
}

/// Like [`merge_category`], but fills a caller-owned report so whatever was
/// written before an error stays listed in it.
pub(crate) fn merge_into(
    ctx: &MergeContext,
    descriptor: &'static CategoryDescriptor,
    report: &mut CategoryReport,
) -> Result<(), MergeError> {
    let started = Instant::now();

    let result = match descriptor.flow {
        Flow::Standard => merge_standard(ctx, descriptor, report),
        Flow::Nanxi => crate::nanxi::reconcile(ctx, report),
        Flow::Amazon => crate::amazon::merge_settlements(ctx, descriptor, report),
    };
    report.elapsed_ms = started.elapsed().as_millis();
    result?;

    for entry in &report.rows_by_store {
        log::info!(
            "{}: {} rows from store '{}' ({})",
            descriptor.id,
            entry.rows,
            entry.store,
            entry.country
        );
    }
    log::info!(
        "{}: {} of {} files read, {} rows, {} outputs in {} ms",
        descriptor.id,
        report.files_read,
        report.files_matched,
        report.rows_merged,
        report.outputs.len(),
        report.elapsed_ms
    );
    Ok(())
}

fn merge_standard(
    ctx: &MergeContext,
    descriptor: &'static CategoryDescriptor,
    report: &mut CategoryReport,
) -> Result<(), MergeError> {
    let records = locate(ctx, descriptor)?;
    report.files_matched = records.len();
    if records.is_empty() {
        return Ok(());
    }

    let provenance = Provenance::from_settings(&ctx.settings);
    let sheets = match descriptor.sheet_strategy {
        SheetStrategy::First => SheetSelection::First,
        SheetStrategy::Split | SheetStrategy::Stack => SheetSelection::All,
    };

    let mut groups = MergeGroups::default();
    let mut by_warehouse: HashMap<WarehouseKind, usize> = HashMap::new();

    for record in records {
        let options = ReadOptions {
            header_row: descriptor.header_row.for_store(&record.store),
            sheets,
        };
        let tables = match read_record(&record, &options) {
            Ok(tables) => tables,
            Err(reason) => {
                report.skip(record.path, reason);
                continue;
            }
        };

        let mut rows = 0;
        for SheetTable { sheet, table } in tables {
            let table = normalize(table, &record, descriptor, &provenance);
            rows += table.len();
            let key = match descriptor.sheet_strategy {
                SheetStrategy::Split => sheet,
                SheetStrategy::First | SheetStrategy::Stack => descriptor.label.to_string(),
            };
            groups.push(key, table);
        }

        log::info!("read {} rows from {}", rows, record.path.display());
        report.files_read += 1;
        report.add_rows(&record.store, &record.country, rows);
        if let Some(kind) = record.warehouse {
            *by_warehouse.entry(kind).or_default() += rows;
        }
    }

    if descriptor.warehouse_column.is_some() {
        for kind in [
            WarehouseKind::TemuWarehouse,
            WarehouseKind::MerchantWarehouse,
            WarehouseKind::Unclassified,
        ] {
            log::info!(
                "{}: {} rows tagged {}",
                descriptor.id,
                by_warehouse.get(&kind).copied().unwrap_or(0),
                kind.tag()
            );
        }
    }

    if groups.is_empty() {
        log::warn!("{}: no data read, nothing written", descriptor.id);
        return Ok(());
    }

    for (key, tables) in groups.into_groups() {
        let mut merged = Table::concat(tables);
        if let Some(rule) = &descriptor.dedup {
            match dedup(&mut merged, rule) {
                Some(removed) if removed > 0 => {
                    log::info!("{}: dropped {} duplicate rows in '{}'", descriptor.id, removed, key)
                }
                Some(_) => {}
                None => log::warn!(
                    "{}: group '{}' lacks the dedup key columns, kept all rows",
                    descriptor.id,
                    key
                ),
            }
        }

        let (stem, sheet_name) = match descriptor.sheet_strategy {
            SheetStrategy::Split => (descriptor.output_stem(Some(&file_safe(&key))), key.as_str()),
            SheetStrategy::First | SheetStrategy::Stack => (descriptor.output_stem(None), descriptor.label),
        };
        let path = write_output(ctx, &stem, sheet_name, &merged)?;
        report.rows_merged += merged.len();
        report.outputs.push(path);
    }
    Ok(())
}

/// Read every selected sheet of a record's file, dropping sheets without rows.
fn read_record(record: &FileRecord, options: &ReadOptions) -> Result<Vec<SheetTable>, SkipReason> {
    let sheets: Vec<SheetTable> = read_file(&record.path, options)?
        .into_iter()
        .filter(|s| !s.table.is_empty())
        .collect();
    if sheets.is_empty() {
        return Err(SkipReason::Empty);
    }
    Ok(sheets)
}

/// Write `table` to `output_dir/{stem}-{task_id}.xlsx`, creating the directory.
pub(crate) fn write_output(
    ctx: &MergeContext,
    stem: &str,
    sheet_name: &str,
    table: &Table,
) -> Result<PathBuf, MergeError> {
    std::fs::create_dir_all(&ctx.output_dir).map_err(|source| MergeError::OutputDir {
        path: ctx.output_dir.clone(),
        source,
    })?;
    let path = ctx.output_path(stem);
    let stats = shopmerge_io::write_workbook(&path, sheet_name, table)?;
    log::info!(
        "wrote {} rows x {} columns to {} ({} ms)",
        stats.rows,
        stats.columns,
        path.display(),
        stats.duration_ms
    );
    Ok(path)
}

/// Replace characters that are not allowed in file names.
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Tables waiting to be merged, keyed by group name in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct MergeGroups {
    groups: Vec<(String, Vec<Table>)>,
}

impl MergeGroups {
    pub(crate) fn push(&mut self, key: String, table: Table) {
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, tables)) => tables.push(table),
            None => self.groups.push((key, vec![table])),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn into_groups(self) -> impl Iterator<Item = (String, Vec<Table>)> {
        self.groups.into_iter()
    }
}
