// File I/O operations

pub mod csv;
pub mod encoding;
pub mod error;
pub mod xlsx;

use std::path::Path;

use shopmerge_core::{Table, Value};

pub use encoding::{decode_with_fallback, CsvEncoding, DEFAULT_ORDER};
pub use error::{ReadError, WriteError};
pub use xlsx::{sanitize_sheet_name, WriteStats, MAX_SHEET_NAME_CHARS};

/// Which sheets of a workbook to read. CSV files always have one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetSelection {
    #[default]
    First,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Index of the header row. Spreadsheets count physical sheet rows;
    /// CSV files count non-blank lines.
    pub header_row: usize,
    pub sheets: SheetSelection,
}

impl ReadOptions {
    pub fn with_header_row(header_row: usize) -> Self {
        Self {
            header_row,
            ..Default::default()
        }
    }
}

/// One sheet (or a whole CSV file) read into a table.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub sheet: String,
    pub table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileKind::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileKind::Spreadsheet),
            _ => None,
        }
    }
}

/// Read a CSV or spreadsheet file into one table per selected sheet.
///
/// CSV files are named after their file stem.
pub fn read_file(path: &Path, options: &ReadOptions) -> Result<Vec<SheetTable>, ReadError> {
    match FileKind::from_path(path) {
        Some(FileKind::Csv) => {
            let imported = crate::csv::import(path, options.header_row)?;
            let sheet = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(vec![SheetTable {
                sheet,
                table: imported.table,
            }])
        }
        Some(FileKind::Spreadsheet) => xlsx::import(path, options),
        None => Err(ReadError::Unsupported(
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )),
    }
}

/// Write `table` as a single-sheet xlsx workbook.
pub fn write_workbook(path: &Path, sheet_name: &str, table: &Table) -> Result<WriteStats, WriteError> {
    xlsx::export(path, sheet_name, table)
}

/// Drop fully blank rows, then split at the `header_row`-th remaining row.
pub(crate) fn split_header(
    rows: Vec<Vec<Value>>,
    header_row: usize,
) -> Option<(Vec<Value>, Vec<Vec<Value>>)> {
    let mut rows: Vec<Vec<Value>> = rows
        .into_iter()
        .filter(|r| !r.iter().all(Value::is_empty))
        .collect();
    if header_row >= rows.len() {
        return None;
    }
    let data = rows.split_off(header_row + 1);
    let header = rows.pop()?;
    Some((header, data))
}

/// Split at physical row `header_row`. Blank rows are kept.
pub(crate) fn split_header_at(
    mut rows: Vec<Vec<Value>>,
    header_row: usize,
) -> Option<(Vec<Value>, Vec<Vec<Value>>)> {
    if header_row >= rows.len() {
        return None;
    }
    let data = rows.split_off(header_row + 1);
    let header = rows.pop()?;
    Some((header, data))
}

/// Build a table, dropping trailing columns that are blank in the header
/// and in every data row.
pub(crate) fn table_from_rows(mut header: Vec<Value>, mut data: Vec<Vec<Value>>) -> Table {
    let used = |idx: usize, header: &[Value], data: &[Vec<Value>]| {
        !header[idx].is_empty() || data.iter().any(|r| r.get(idx).is_some_and(|v| !v.is_empty()))
    };
    while !header.is_empty() && !used(header.len() - 1, &header, &data) {
        header.pop();
    }
    let width = header.len();
    for row in &mut data {
        row.truncate(width);
    }
    Table::from_grid(header, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_kind_is_case_insensitive() {
        assert_eq!(FileKind::from_path(Path::new("a/B.XLSX")), Some(FileKind::Spreadsheet));
        assert_eq!(FileKind::from_path(Path::new("a/b.Csv")), Some(FileKind::Csv));
        assert_eq!(FileKind::from_path(Path::new("a/b.txt")), None);
    }

    #[test]
    fn test_trailing_blank_columns_are_dropped() {
        let header = vec![Value::text("a"), Value::Empty, Value::Empty];
        let data = vec![vec![Value::text("1"), Value::text("x"), Value::Empty]];
        let table = table_from_rows(header, data);
        assert_eq!(table.columns(), &["a", "Unnamed: 1"]);
    }

    #[test]
    fn test_read_csv_names_sheet_after_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("StoreA-订单导出.csv");
        fs::write(&path, "\u{FEFF}订单号,数量\nPO-1,2\n").unwrap();

        let tables = read_file(&path, &ReadOptions::default()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet, "StoreA-订单导出");
        assert_eq!(tables[0].table.columns(), &["订单号", "数量"]);
    }

    #[test]
    fn test_split_header_counts_blank_rows_only_when_asked() {
        let rows = vec![
            vec![Value::text("title")],
            vec![Value::Empty],
            vec![Value::text("id")],
            vec![Value::text("1")],
        ];
        let (header, data) = split_header(rows.clone(), 1).unwrap();
        assert_eq!(header, vec![Value::text("id")]);
        assert_eq!(data.len(), 1);

        let (header, data) = split_header_at(rows, 1).unwrap();
        assert_eq!(header, vec![Value::Empty]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_file(Path::new("notes.txt"), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ReadError::Unsupported(ext) if ext == "txt"));
    }
}
