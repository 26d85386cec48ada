//! Amazon settlement CSVs: one folder per store, columns named per country.
//!
//! Each store's country is the first mapping key contained in its folder
//! name. The country's mapping is reversed to rename the export's headers to
//! the canonical (US) names before all stores are stacked into one workbook.

use shopmerge_core::Table;
use shopmerge_io::{read_file, ReadOptions};

use crate::catalog::CategoryDescriptor;
use crate::context::MergeContext;
use crate::engine::write_output;
use crate::error::{MergeError, SkipReason};
use crate::locator::locate;
use crate::model::CategoryReport;
use crate::normalize::{apply_rules, ColumnRules, Provenance};

pub(crate) fn merge_settlements(
    ctx: &MergeContext,
    descriptor: &'static CategoryDescriptor,
    report: &mut CategoryReport,
) -> Result<(), MergeError> {
    let mapping = ctx.mapping.as_ref().ok_or(MergeError::MappingRequired)?;
    let records = locate(ctx, descriptor)?;
    report.files_matched = records.len();
    if records.is_empty() {
        return Ok(());
    }

    let provenance = Provenance::from_settings(&ctx.settings);
    let canonical_order = mapping.canonical_order();
    let mut tables: Vec<Table> = Vec::new();

    for record in records {
        let Some(country) = mapping.country_for_store(&record.store) else {
            report.skip(record.path, SkipReason::UnknownCountry(record.store));
            continue;
        };

        let options = ReadOptions::with_header_row(descriptor.header_row.for_store(&record.store));
        let table = match read_file(&record.path, &options) {
            Ok(sheets) => sheets.into_iter().next().map(|s| s.table),
            Err(err) => {
                report.skip(record.path, err.into());
                continue;
            }
        };
        let Some(table) = table.filter(|t| !t.is_empty()) else {
            report.skip(record.path, SkipReason::Empty);
            continue;
        };

        let reverse = mapping.reverse(country);
        let rules = ColumnRules {
            rename: reverse
                .iter()
                .map(|(source, canonical)| (source.as_str(), canonical.as_str()))
                .collect(),
            canonical_order: canonical_order.clone(),
            numeric_columns: descriptor.numeric_columns,
        };
        let table = apply_rules(table, &record.store, country, &rules, &provenance);

        log::info!(
            "read {} rows from {} ({}, header row {})",
            table.len(),
            record.path.display(),
            country,
            options.header_row
        );
        report.files_read += 1;
        report.add_rows(&record.store, country, table.len());
        tables.push(table);
    }

    if tables.is_empty() {
        log::warn!("{}: no data read, nothing written", descriptor.id);
        return Ok(());
    }

    let merged = Table::concat(tables);
    let path = write_output(ctx, &descriptor.output_stem(None), descriptor.label, &merged)?;
    report.rows_merged = merged.len();
    report.outputs.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor;
    use crate::model::{CategoryId, TaskId};
    use shopmerge_config::CountryMapping;
    use shopmerge_core::Value;
    use std::fs;
    use tempfile::tempdir;

    fn mapping() -> CountryMapping {
        CountryMapping::from_value(serde_json::json!({
            "US": {"date/time": "date/time", "type": "type", "total": "total"},
            "DE": {"date/time": "Datum/Uhrzeit", "type": "Typ", "total": "Gesamt"},
            "AE": {"date/time": "date/time", "type": "type", "total": "total"}
        }))
        .unwrap()
    }

    fn preamble(lines: usize) -> String {
        (0..lines).map(|i| format!("preamble line {}\n", i)).collect()
    }

    #[test]
    fn stores_are_renamed_tagged_and_stacked() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let amz = src.join("AMZ结算数据");
        fs::create_dir_all(amz.join("Shop-DE")).unwrap();
        fs::create_dir_all(amz.join("Shop-AE")).unwrap();
        fs::create_dir_all(amz.join("Shop-XX")).unwrap();

        fs::write(
            amz.join("Shop-DE/settle.csv"),
            format!("{}Datum/Uhrzeit,Typ,Gesamt\n2024-01-01,Order,34.00\n", preamble(7)),
        )
        .unwrap();
        fs::write(
            amz.join("Shop-AE/settle.csv"),
            format!("{}date/time,type,total\n2024-01-02,Refund,\"$12.50\"\n", preamble(6)),
        )
        .unwrap();
        fs::write(amz.join("Shop-XX/settle.csv"), "a,b\n1,2\n").unwrap();

        let ctx = MergeContext::new(&src, dir.path().join("out"), TaskId::new("T1")).with_mapping(mapping());
        let desc = descriptor(CategoryId::AmazonSettlement);
        let mut report = CategoryReport::new(desc.id);
        merge_settlements(&ctx, desc, &mut report).unwrap();

        assert_eq!(report.files_matched, 3);
        assert_eq!(report.files_read, 2);
        assert_eq!(report.rows_merged, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].reason, SkipReason::UnknownCountry(_)));
        assert_eq!(
            report.outputs,
            vec![dir.path().join("out").join("亚马逊结算数据汇总-T1.xlsx")]
        );

        let sheets = read_file(&report.outputs[0], &ReadOptions::default()).unwrap();
        let table = &sheets[0].table;
        assert_eq!(table.columns(), &["store", "country", "date/time", "type", "total"]);
        // stores in name order
        assert_eq!(table.cell(0, "store"), Some(&Value::text("Shop-AE")));
        assert_eq!(table.cell(0, "total"), Some(&Value::Number(12.5)));
        assert_eq!(table.cell(1, "country"), Some(&Value::text("DE")));
        assert_eq!(table.cell(1, "type"), Some(&Value::text("Order")));
    }

    #[test]
    fn mapping_is_required() {
        let dir = tempdir().unwrap();
        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T1"));
        let desc = descriptor(CategoryId::AmazonSettlement);
        let mut report = CategoryReport::new(desc.id);
        let err = merge_settlements(&ctx, desc, &mut report).unwrap_err();
        assert!(matches!(err, MergeError::MappingRequired));
    }
}
