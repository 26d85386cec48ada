// Excel import (calamine) and xlsx export (rust_xlsxwriter)

use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook};
use shopmerge_core::{Table, Value};

use crate::error::{ReadError, WriteError};
use crate::{split_header_at, table_from_rows, ReadOptions, SheetSelection, SheetTable};

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Statistics for one written workbook.
#[derive(Debug, Clone, Default)]
pub struct WriteStats {
    pub rows: usize,
    pub columns: usize,
    pub duration_ms: u128,
}

/// Import an Excel file (xlsx, xls, xlsb, ods).
///
/// Each selected sheet becomes one [`SheetTable`]. A sheet whose header row
/// lies past its data yields nothing; the rest of the workbook is still read.
pub fn import(path: &Path, options: &ReadOptions) -> Result<Vec<SheetTable>, ReadError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| ReadError::Workbook(e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(ReadError::NoSheets);
    }

    let selected: &[String] = match options.sheets {
        SheetSelection::First => &sheet_names[..1],
        SheetSelection::All => &sheet_names,
    };

    let mut tables = Vec::with_capacity(selected.len());
    for sheet_name in selected {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ReadError::Workbook(format!("sheet '{}': {}", sheet_name, e)))?;

        // calamine trims leading empty rows; restore them so the header
        // index counts physical rows
        let top = range.start().map_or(0, |(row, _)| row as usize);
        let rows: Vec<Vec<Value>> = std::iter::repeat_with(Vec::new)
            .take(top)
            .chain(range.rows().map(|row| row.iter().map(convert_cell).collect()))
            .collect();

        match split_header_at(rows, options.header_row) {
            Some((header, data)) => tables.push(SheetTable {
                sheet: sheet_name.clone(),
                table: table_from_rows(header, data),
            }),
            None => log::warn!(
                "sheet '{}' has no row {} to use as header, skipped",
                sheet_name,
                options.header_row
            ),
        }
    }

    Ok(tables)
}

fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // 1900 date system assumed; calamine does not expose the 1904 flag
        Data::DateTime(dt) => Value::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Replace characters Excel rejects in sheet names and cut to 31 chars.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME_CHARS).collect();
    if truncated.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        truncated
    }
}

/// Write `table` as the single worksheet of a new workbook at `path`.
///
/// The header row is bold. Dates keep their serial value and get a date
/// (or date-time) number format; empty cells are left blank.
pub fn export(path: &Path, sheet_name: &str, table: &Table) -> Result<WriteStats, WriteError> {
    let start_time = Instant::now();

    if table.width() > MAX_COLS {
        return Err(WriteError::TooWide { columns: table.width() });
    }
    if table.len() + 1 > MAX_ROWS {
        return Err(WriteError::TooLong { rows: table.len() });
    }

    let wrap = |source: rust_xlsxwriter::XlsxError| WriteError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sanitize_sheet_name(sheet_name))
        .map_err(wrap)?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(wrap)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            match value {
                Value::Empty => {}
                Value::Text(s) => {
                    worksheet.write_string(row32, col16, s).map_err(wrap)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(row32, col16, *n).map_err(wrap)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row32, col16, *b).map_err(wrap)?;
                }
                Value::DateTime(serial) => {
                    let format = if serial.fract().abs() > 0.0001 {
                        &datetime_format
                    } else {
                        &date_format
                    };
                    worksheet
                        .write_number_with_format(row32, col16, *serial, format)
                        .map_err(wrap)?;
                }
            }
        }
    }

    workbook.save(path).map_err(wrap)?;

    Ok(WriteStats {
        rows: table.len(),
        columns: table.width(),
        duration_ms: start_time.elapsed().as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut table = Table::new(vec!["店铺".into(), "数量".into(), "日期".into(), "备注".into()]);
        table.push_row(vec![
            Value::text("StoreA"),
            Value::Number(3.0),
            Value::DateTime(45292.0),
            Value::Empty,
        ]);
        table.push_row(vec![
            Value::text("StoreB"),
            Value::Number(1.5),
            Value::DateTime(45292.5),
            Value::Bool(true),
        ]);
        table
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name(""), "Sheet1");
        let long = "对".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME_CHARS);
    }

    #[test]
    fn test_export_then_import_keeps_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let stats = export(&path, "订单数据", &sample()).unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.columns, 4);

        let tables = import(&path, &ReadOptions::default()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet, "订单数据");

        let table = &tables[0].table;
        assert_eq!(table.columns(), &["店铺", "数量", "日期", "备注"]);
        assert_eq!(table.cell(0, "数量"), Some(&Value::Number(3.0)));
        assert_eq!(table.cell(0, "备注"), Some(&Value::Empty));
        assert_eq!(table.cell(1, "备注"), Some(&Value::Bool(true)));
        assert!(matches!(table.cell(1, "日期"), Some(Value::DateTime(_))));
    }

    #[test]
    fn test_import_all_sheets_and_header_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bill.xlsx");

        let mut workbook = Workbook::new();
        for name in ["费用明细", "汇总"] {
            let ws = workbook.add_worksheet().set_name(name).unwrap();
            ws.write_string(0, 0, "仓库账单").unwrap();
            ws.write_string(2, 0, "单号").unwrap();
            ws.write_string(2, 1, "金额").unwrap();
            ws.write_string(3, 0, "N-1").unwrap();
            ws.write_number(3, 1, 9.5).unwrap();
        }
        workbook.save(&path).unwrap();

        let options = ReadOptions {
            header_row: 2,
            sheets: SheetSelection::All,
        };
        let tables = import(&path, &options).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].sheet, "汇总");
        assert_eq!(tables[1].table.columns(), &["单号", "金额"]);
        assert_eq!(tables[1].table.cell(0, "金额"), Some(&Value::Number(9.5)));
    }

    #[test]
    fn test_header_row_counts_blank_and_leading_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        // rows 0 and 1 are empty, row 3 is blank
        ws.write_string(2, 0, "账单").unwrap();
        ws.write_string(4, 0, "单号").unwrap();
        ws.write_string(5, 0, "N-1").unwrap();
        ws.write_string(7, 0, "N-2").unwrap();
        workbook.save(&path).unwrap();

        let tables = import(&path, &ReadOptions::with_header_row(4)).unwrap();
        let table = &tables[0].table;
        assert_eq!(table.columns(), &["单号"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "单号"), Some(&Value::text("N-1")));
        assert_eq!(table.cell(1, "单号"), Some(&Value::Empty));
        assert_eq!(table.cell(2, "单号"), Some(&Value::text("N-2")));
    }

    #[test]
    fn test_header_past_data_yields_no_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.xlsx");
        export(&path, "Sheet1", &sample()).unwrap();

        let options = ReadOptions {
            header_row: 10,
            ..Default::default()
        };
        assert!(import(&path, &options).unwrap().is_empty());
    }
}
