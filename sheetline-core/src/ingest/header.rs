//! Header row detection
//!
//! Operator spreadsheets usually open with title and filter rows before
//! the real header. The first row within the scan window that mentions a
//! keyword from every required group is taken as the header.

use serde::Serialize;

use super::ImportFailure;
use crate::domain::RawSheet;

/// Default number of leading rows inspected for a header
pub const DEFAULT_SCAN_LIMIT: usize = 30;

/// The located header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatch {
    pub row_index: usize,
    /// Lowercase, trimmed header cells, one per column
    pub normalized_headers: Vec<String>,
}

/// Lowercase, trimmed text of every cell in a row
pub fn normalize_row(sheet: &RawSheet, row: usize) -> Vec<String> {
    sheet
        .row(row)
        .map(|cells| {
            cells
                .iter()
                .map(|c| c.as_text().trim().to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

/// Find the header row among rows `0..scan_limit`
pub fn locate(
    sheet: &RawSheet,
    groups: &[Vec<String>],
    scan_limit: usize,
) -> Result<HeaderMatch, ImportFailure> {
    for row_index in 0..scan_limit.min(sheet.len()) {
        let headers = normalize_row(sheet, row_index);
        let joined = headers.join("|");

        let qualifies = !groups.is_empty()
            && groups
                .iter()
                .all(|group| group.iter().any(|keyword| joined.contains(keyword.as_str())));

        if qualifies {
            return Ok(HeaderMatch {
                row_index,
                normalized_headers: headers,
            });
        }
    }

    Err(ImportFailure::HeaderNotFound { scanned: scan_limit.min(sheet.len()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, ImportSchema};

    fn sheet_with_header_at(index: usize) -> RawSheet {
        let mut rows: Vec<Vec<Cell>> = (0..index)
            .map(|i| vec![Cell::from(format!("Relatório gerencial linha {}", i))])
            .collect();
        rows.push(vec![Cell::from("Loja"), Cell::from("Valor Vendido")]);
        rows.push(vec![Cell::from("12"), Cell::from("1.000,00")]);
        RawSheet::new(rows)
    }

    fn groups() -> Vec<Vec<String>> {
        ImportSchema::Performance.keyword_table().header_groups()
    }

    #[test]
    fn test_header_inside_scan_window_is_found() {
        let sheet = sheet_with_header_at(19);
        let found = locate(&sheet, &groups(), 20).unwrap();
        assert_eq!(found.row_index, 19);
        assert_eq!(found.normalized_headers, vec!["loja", "valor vendido"]);
    }

    #[test]
    fn test_header_beyond_scan_window_is_not_found() {
        let sheet = sheet_with_header_at(25);
        let err = locate(&sheet, &groups(), 20).unwrap_err();
        assert!(matches!(err, ImportFailure::HeaderNotFound { .. }));
    }

    #[test]
    fn test_first_qualifying_row_wins() {
        let sheet = RawSheet::new(vec![
            vec![Cell::from("Vendas por loja")],
            vec![Cell::from("Loja"), Cell::from("Faturamento")],
            vec![Cell::from("Loja"), Cell::from("Valor")],
        ]);
        assert_eq!(locate(&sheet, &groups(), 30).unwrap().row_index, 1);
    }

    #[test]
    fn test_row_must_hit_every_group() {
        let sheet = RawSheet::new(vec![
            vec![Cell::from("Loja"), Cell::from("Cidade")],
            vec![Cell::from("Filial"), Cell::from("Marca")],
        ]);
        let product = ImportSchema::Product.keyword_table().header_groups();
        assert_eq!(locate(&sheet, &product, 30).unwrap().row_index, 1);
        assert!(locate(&sheet, &groups(), 30).is_err());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let sheet = RawSheet::new(vec![vec![Cell::from("  LOJA "), Cell::from("RECEITA")]]);
        assert_eq!(locate(&sheet, &groups(), 30).unwrap().row_index, 0);
    }

    #[test]
    fn test_empty_sheet_has_no_header() {
        let err = locate(&RawSheet::default(), &groups(), 30).unwrap_err();
        assert_eq!(err, ImportFailure::HeaderNotFound { scanned: 0 });
    }
}
