// Reader and writer errors

use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::CsvEncoding;

/// Why a single input file produced no table.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file extension: {0}")]
    Unsupported(String),

    #[error("failed to open workbook: {0}")]
    Workbook(String),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("could not decode file as any of {}", format_attempts(.attempts))]
    EncodingExhausted { attempts: Vec<CsvEncoding> },

    #[error("header row {row} is past the end of the data ({available} non-blank rows)")]
    HeaderOutOfRange { row: usize, available: usize },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("table has {columns} columns, more than a worksheet can hold")]
    TooWide { columns: usize },

    #[error("table has {rows} rows, more than a worksheet can hold")]
    TooLong { rows: usize },
}

fn format_attempts(attempts: &[CsvEncoding]) -> String {
    attempts
        .iter()
        .map(|e| e.label())
        .collect::<Vec<_>>()
        .join(", ")
}
