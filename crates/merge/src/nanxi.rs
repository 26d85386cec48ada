//! Nanxi warehouse bills and orders.
//!
//! Each bill gets an order-number column extracted from its free-text
//! description. The bill amounts are then looked up by order number and
//! written next to the first Nanxi order table.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use shopmerge_config::NanxiRules;
use shopmerge_core::{Table, Value};
use shopmerge_io::{read_file, ReadOptions};

use crate::context::MergeContext;
use crate::engine::write_output;
use crate::error::{MergeError, SkipReason};
use crate::locator::locate_keyword;
use crate::model::CategoryReport;

const SHEET_NAME: &str = "Sheet1";

pub(crate) fn reconcile(ctx: &MergeContext, report: &mut CategoryReport) -> Result<(), MergeError> {
    let rules = &ctx.settings.nanxi;
    let pattern = Regex::new(&rules.order_pattern).map_err(|source| MergeError::Pattern {
        pattern: rules.order_pattern.clone(),
        source,
    })?;

    let bills = locate_keyword(ctx, &rules.bill_keyword)?;
    if bills.is_empty() {
        log::warn!("no files containing '{}' found", rules.bill_keyword);
        return Ok(());
    }
    let orders = locate_keyword(ctx, &rules.order_keyword)?;
    if orders.is_empty() {
        log::warn!("no files containing '{}' found", rules.order_keyword);
        return Ok(());
    }
    report.files_matched = bills.len() + 1;
    if orders.len() > 1 {
        log::info!(
            "{} order files found, using {}",
            orders.len(),
            orders[0].1.display()
        );
    }

    // order number -> bill amount, later bills override earlier ones
    let mut amounts: HashMap<String, Value> = HashMap::new();

    for (store, path) in bills {
        let table = match read_first(&path) {
            Ok(table) => table,
            Err(reason) => {
                report.skip(path, reason);
                continue;
            }
        };
        let table = match extract_order_numbers(table, rules, &pattern) {
            Ok(table) => table,
            Err(reason) => {
                report.skip(path, reason);
                continue;
            }
        };

        if table.has_column(&rules.amount_column) {
            collect_amounts(&table, rules, &mut amounts);
        } else {
            log::warn!(
                "{} has no '{}' column, no amounts taken from it",
                path.display(),
                rules.amount_column
            );
        }

        let out = write_output(ctx, &format!("{}-处理后", stem(&path)), SHEET_NAME, &table)?;
        report.files_read += 1;
        report.rows_merged += table.len();
        report.add_rows(&store, "", table.len());
        report.outputs.push(out);
    }

    let Some((_, order_path)) = orders.into_iter().next() else {
        return Ok(());
    };
    let orders = match read_first(&order_path) {
        Ok(table) => table,
        Err(reason) => {
            report.skip(order_path, reason);
            return Ok(());
        }
    };
    log::debug!("order table columns: {:?}", orders.columns());

    let Some(key_column) = order_number_column(&orders).map(str::to_string) else {
        report.skip(order_path, SkipReason::MissingColumn("订单号".to_string()));
        return Ok(());
    };
    let supplemented = supplement_orders(orders, &key_column, &rules.bill_amount_column, &amounts);
    let matched = supplemented
        .column_values(&rules.bill_amount_column)
        .map(|values| values.filter(|v| !v.is_empty()).count())
        .unwrap_or(0);
    log::info!(
        "{} of {} orders matched a bill amount",
        matched,
        supplemented.len()
    );

    let out = write_output(
        ctx,
        &format!("{}-补充账单金额", stem(&order_path)),
        SHEET_NAME,
        &supplemented,
    )?;
    report.files_read += 1;
    report.outputs.push(out);
    Ok(())
}

fn read_first(path: &Path) -> Result<Table, SkipReason> {
    let table = read_file(path, &ReadOptions::default())?
        .into_iter()
        .next()
        .map(|s| s.table)
        .ok_or(SkipReason::Empty)?;
    Ok(table)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Append the order-number column, empty where the description has no match.
pub fn extract_order_numbers(
    mut table: Table,
    rules: &NanxiRules,
    pattern: &Regex,
) -> Result<Table, SkipReason> {
    let Some(description) = table.column_index(&rules.description_column) else {
        return Err(SkipReason::MissingColumn(rules.description_column.clone()));
    };

    let numbers: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let text = row[description].display();
            let number = pattern
                .captures(&text)
                .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Value::text(number)
        })
        .collect();

    table.append_column(&rules.order_number_column, numbers);
    Ok(table)
}

fn collect_amounts(table: &Table, rules: &NanxiRules, amounts: &mut HashMap<String, Value>) {
    let (Some(key), Some(amount)) = (
        table.column_index(&rules.order_number_column),
        table.column_index(&rules.amount_column),
    ) else {
        return;
    };
    for row in table.rows() {
        let number = row[key].display();
        if !number.is_empty() {
            amounts.insert(number, row[amount].clone());
        }
    }
}

/// First header containing both 订单 and 号, else the first containing "order".
pub fn order_number_column(table: &Table) -> Option<&str> {
    let columns = table.columns();
    columns
        .iter()
        .find(|c| c.contains("订单") && c.contains('号'))
        .or_else(|| columns.iter().find(|c| c.to_lowercase().contains("order")))
        .map(String::as_str)
}

/// Append `amount_column` with the bill amount of each order, empty when unknown.
pub fn supplement_orders(
    mut orders: Table,
    key_column: &str,
    amount_column: &str,
    amounts: &HashMap<String, Value>,
) -> Table {
    let looked_up: Vec<Value> = orders
        .column_values(key_column)
        .map(|values| {
            values
                .map(|v| amounts.get(&v.display()).cloned().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    orders.append_column(amount_column, looked_up);
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, TaskId};
    use shopmerge_io::write_workbook;
    use std::fs;
    use tempfile::tempdir;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|v| Value::text(*v)).collect());
        }
        t
    }

    fn pattern() -> Regex {
        Regex::new(&NanxiRules::default().order_pattern).unwrap()
    }

    #[test]
    fn order_numbers_come_from_description() {
        let bill = table(
            &["说明", "交易金额"],
            &[&["扣费 订单103851234AB 完成", "5"], &["月租", "9"]],
        );
        let out = extract_order_numbers(bill, &NanxiRules::default(), &pattern()).unwrap();
        assert_eq!(out.columns(), &["说明", "交易金额", "订单编号"]);
        assert_eq!(out.cell(0, "订单编号"), Some(&Value::text("103851234AB")));
        assert_eq!(out.cell(1, "订单编号"), Some(&Value::text("")));
    }

    #[test]
    fn missing_description_is_a_skip() {
        let bill = table(&["备注"], &[&["x"]]);
        let err = extract_order_numbers(bill, &NanxiRules::default(), &pattern()).unwrap_err();
        assert!(matches!(err, SkipReason::MissingColumn(c) if c == "说明"));
    }

    #[test]
    fn order_column_detection() {
        assert_eq!(order_number_column(&table(&["日期", "平台订单号"], &[])), Some("平台订单号"));
        assert_eq!(order_number_column(&table(&["Order ID", "sku"], &[])), Some("Order ID"));
        assert_eq!(order_number_column(&table(&["sku"], &[])), None);
    }

    #[test]
    fn amounts_are_mapped_onto_orders() {
        let orders = table(&["订单号", "sku"], &[&["10385A", "x"], &["999", "y"]]);
        let amounts = HashMap::from([("10385A".to_string(), Value::Number(12.5))]);
        let out = supplement_orders(orders, "订单号", "账单交易金额", &amounts);
        assert_eq!(out.cell(0, "账单交易金额"), Some(&Value::Number(12.5)));
        assert_eq!(out.cell(1, "账单交易金额"), Some(&Value::Empty));
    }

    #[test]
    fn reconcile_writes_bill_and_order_outputs() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("src").join("StoreA");
        fs::create_dir_all(&store).unwrap();
        let mut bill = table(&["说明"], &[&["订单 10385001"], &["订单 10385002"]]);
        bill.push_column("交易金额", Value::Number(3.0));
        write_workbook(&store.join("南溪账单-1月.xlsx"), "Sheet1", &bill).unwrap();
        write_workbook(
            &store.join("南溪订单.xlsx"),
            "Sheet1",
            &table(&["订单号"], &[&["10385002"], &["10385009"]]),
        )
        .unwrap();

        let out_dir = dir.path().join("out");
        let ctx = MergeContext::new(dir.path().join("src"), &out_dir, TaskId::new("T1"));
        let mut report = CategoryReport::new(CategoryId::NanxiReconcile);
        reconcile(&ctx, &mut report).unwrap();

        assert_eq!(
            report.outputs,
            vec![
                out_dir.join("南溪账单-1月-处理后-T1.xlsx"),
                out_dir.join("南溪订单-补充账单金额-T1.xlsx"),
            ]
        );
        let orders = read_first(&report.outputs[1]).unwrap();
        assert_eq!(orders.cell(0, "账单交易金额"), Some(&Value::Number(3.0)));
        assert_eq!(orders.cell(1, "账单交易金额"), Some(&Value::Empty));
    }
}
