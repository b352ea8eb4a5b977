//! Workbook decoding
//!
//! Turns uploaded bytes into a [`RawSheet`]. Zip containers (xlsx, xlsm,
//! ods) and legacy compound files (xls) go through calamine; anything else
//! is read as delimited text. Only the first worksheet is used.

use std::io::Cursor;

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDate;

use crate::domain::{Cell, RawSheet};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Lines inspected when guessing the CSV delimiter
const SNIFF_LINES: usize = 20;

/// Container format, decided from the leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// xlsx, xlsm or ods
    Zip,
    /// Legacy xls
    Compound,
    Csv,
}

pub fn detect_format(bytes: &[u8]) -> WorkbookFormat {
    if bytes.starts_with(ZIP_MAGIC) {
        WorkbookFormat::Zip
    } else if bytes.starts_with(CFB_MAGIC) {
        WorkbookFormat::Compound
    } else {
        WorkbookFormat::Csv
    }
}

/// Decode the first worksheet of a workbook
pub fn read_sheet(bytes: &[u8]) -> Result<RawSheet> {
    if bytes.is_empty() {
        bail!("file is empty");
    }

    match detect_format(bytes) {
        WorkbookFormat::Zip | WorkbookFormat::Compound => read_spreadsheet(bytes),
        WorkbookFormat::Csv => read_csv(bytes),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| anyhow!("{}", e))
        .context("Failed to open workbook")?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?
        .map_err(|e| anyhow!("{}", e))
        .context("Failed to read first worksheet")?;

    Ok(range_to_sheet(&range))
}

/// Copy a calamine range into a sheet, keeping absolute row/column positions
fn range_to_sheet(range: &Range<Data>) -> RawSheet {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; start_col];
        row.extend(data_row.iter().map(data_to_cell));
        rows.push(row);
    }

    RawSheet::new(rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => iso_date_serial(s)
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

/// Serial day number for an ISO date string (ods stores dates this way)
fn iso_date_serial(s: &str) -> Option<f64> {
    let date = NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days() as f64)
}

fn read_csv(bytes: &[u8]) -> Result<RawSheet> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let delimiter = sniff_delimiter(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse CSV line {}", idx + 1))?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(RawSheet::new(rows))
}

/// Pick the delimiter present on the most sample lines
///
/// Ties go to `;`, then tab, then `,`, since exports that use a decimal
/// comma separate fields with semicolons.
fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    // Priority order; a later candidate must beat an earlier one outright
    let mut best = (b',', 0);
    for candidate in [b';', b'\t', b','] {
        let hits = sample
            .iter()
            .filter(|line| line.as_bytes().contains(&candidate))
            .count();
        if hits > best.1 {
            best = (candidate, hits);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"PK\x03\x04rest"), WorkbookFormat::Zip);
        assert_eq!(detect_format(CFB_MAGIC), WorkbookFormat::Compound);
        assert_eq!(detect_format(b"Loja;Valor\n1;2"), WorkbookFormat::Csv);
    }

    #[test]
    fn test_xlsx_keeps_absolute_positions() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 1, "Loja").unwrap();
        sheet.write_string(2, 2, "Valor").unwrap();
        sheet.write_number(3, 1, 42).unwrap();
        sheet.write_number(3, 2, 1234.56).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let raw = read_sheet(&bytes).unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw.cell(2, 1), &Cell::from("Loja"));
        assert_eq!(raw.cell(3, 1), &Cell::Number(42.0));
        assert_eq!(raw.cell(3, 2), &Cell::Number(1234.56));
        assert!(raw.cell(0, 0).is_empty());
    }

    #[test]
    fn test_csv_with_semicolons_and_decimal_commas() {
        let csv = "\u{feff}Relatório mensal\nLoja;Valor Vendido;Qtd Vendas\n001;1.234,56;10\n";
        let raw = read_sheet(csv.as_bytes()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.width(), 3);
        assert_eq!(raw.cell(0, 0), &Cell::from("Relatório mensal"));
        assert_eq!(raw.cell(2, 1), &Cell::from("1.234,56"));
    }

    #[test]
    fn test_csv_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("a\tb\n1,5\t2"), b'\t');
        assert_eq!(sniff_delimiter("a;b\n1,5;2"), b';');
        assert_eq!(sniff_delimiter("single column"), b',');
    }

    #[test]
    fn test_sniff_delimiter_ties_follow_priority() {
        assert_eq!(sniff_delimiter("a;b\nc,d"), b';');
        assert_eq!(sniff_delimiter("a\tb\nc,d"), b'\t');
        assert_eq!(sniff_delimiter("a;b\tc,d"), b';');
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let bytes = b"Loja;Valor\n1;Caf\xe9\n";
        let raw = read_sheet(bytes).unwrap();
        assert_eq!(raw.cell(1, 0), &Cell::from("1"));
        assert!(raw.cell(1, 1).as_text().starts_with("Caf"));
    }

    #[test]
    fn test_broken_zip_is_rejected() {
        assert!(read_sheet(b"PK\x03\x04not really a zip").is_err());
        assert!(read_sheet(b"").is_err());
    }

    #[test]
    fn test_iso_dates_become_serials() {
        assert_eq!(iso_date_serial("2024-03-01"), Some(45352.0));
        assert_eq!(iso_date_serial("2024-01-01T00:00:00"), Some(45292.0));
        assert_eq!(iso_date_serial("soon"), None);
    }
}
