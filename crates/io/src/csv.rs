// CSV import with encoding fallback

use std::path::Path;

use shopmerge_core::{Table, Value};

use crate::encoding::{CsvEncoding, DEFAULT_ORDER};
use crate::error::ReadError;
use crate::{split_header, table_from_rows};

/// A CSV file decoded into a table, with what it took to read it.
#[derive(Debug, Clone)]
pub struct CsvImport {
    pub table: Table,
    pub encoding: CsvEncoding,
    pub delimiter: u8,
    /// Data rows dropped because they had more fields than the header
    pub skipped_rows: usize,
}

pub fn import(path: &Path, header_row: usize) -> Result<CsvImport, ReadError> {
    let bytes = std::fs::read(path)?;
    import_bytes(&bytes, header_row, &DEFAULT_ORDER)
}

/// Decode and parse `bytes`, trying each encoding in `order`.
///
/// A decode or parse failure discards the attempt and moves on to the next
/// encoding. A header row past the end of the data is final: no other
/// encoding will produce more rows.
pub fn import_bytes(
    bytes: &[u8],
    header_row: usize,
    order: &[CsvEncoding],
) -> Result<CsvImport, ReadError> {
    for &encoding in order {
        let Some(content) = encoding.decode(bytes) else {
            log::debug!("csv is not valid {}", encoding);
            continue;
        };

        let delimiter = sniff_delimiter(
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .skip(header_row),
        );

        match parse(&content, delimiter, header_row) {
            Ok(ParseOutcome::Table(table, skipped_rows)) => {
                log::debug!(
                    "csv decoded as {} with delimiter {:?}",
                    encoding,
                    delimiter as char
                );
                return Ok(CsvImport {
                    table,
                    encoding,
                    delimiter,
                    skipped_rows,
                });
            }
            Ok(ParseOutcome::HeaderOutOfRange(available)) => {
                return Err(ReadError::HeaderOutOfRange {
                    row: header_row,
                    available,
                });
            }
            Err(e) => {
                log::debug!("csv parse failed as {}: {}", encoding, e);
            }
        }
    }

    Err(ReadError::EncodingExhausted {
        attempts: order.to_vec(),
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter<'a>(lines: impl Iterator<Item = &'a str>) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = lines.take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // The header line must split into more than one field
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

enum ParseOutcome {
    Table(Table, usize),
    HeaderOutOfRange(usize),
}

fn parse(content: &str, delimiter: u8, header_row: usize) -> Result<ParseOutcome, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Empty
                    } else {
                        Value::text(field)
                    }
                })
                .collect(),
        );
    }

    let non_blank = rows.iter().filter(|r| !r.iter().all(Value::is_empty)).count();
    let Some((header, data)) = split_header(rows, header_row) else {
        return Ok(ParseOutcome::HeaderOutOfRange(non_blank));
    };

    let width = header.len();
    let before = data.len();
    let data: Vec<Vec<Value>> = data.into_iter().filter(|r| r.len() <= width).collect();
    let skipped = before - data.len();
    if skipped > 0 {
        log::warn!("skipped {} malformed csv rows (more fields than header)", skipped);
    }

    Ok(ParseOutcome::Table(table_from_rows(header, data), skipped))
}
