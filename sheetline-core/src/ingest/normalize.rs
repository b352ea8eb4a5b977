//! Cell value normalization
//!
//! Lenient: an amount that cannot be read becomes zero and a period that
//! cannot be read becomes `None` (the caller falls back to the import's
//! selected period). Nothing here returns an error.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::{Cell, Period};

/// Amount read from a cell, with a flag for silent zero fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAmount {
    pub value: Decimal,
    /// The cell had content but could not be read as a number
    pub fell_back: bool,
}

/// Parse a monetary or quantity cell; unreadable input yields zero
pub fn parse_amount(cell: &Cell) -> Decimal {
    parse_amount_checked(cell).value
}

/// Like [`parse_amount`] but reports whether a non-empty cell fell back to zero
pub fn parse_amount_checked(cell: &Cell) -> ParsedAmount {
    match cell {
        Cell::Empty => ParsedAmount {
            value: Decimal::ZERO,
            fell_back: false,
        },
        Cell::Number(n) => match Decimal::try_from(*n) {
            Ok(value) => ParsedAmount {
                value,
                fell_back: false,
            },
            Err(_) => ParsedAmount {
                value: Decimal::ZERO,
                fell_back: true,
            },
        },
        Cell::Text(s) => parse_amount_text(s),
    }
}

fn parse_amount_text(s: &str) -> ParsedAmount {
    // Remove currency symbols and every kind of whitespace (incl. U+00A0)
    let cleaned: String = s
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && !matches!(c, '$' | '€' | '£'))
        .collect();

    if cleaned.is_empty() {
        return ParsedAmount {
            value: Decimal::ZERO,
            fell_back: false,
        };
    }

    // "1.234,56": dot groups thousands, comma is the decimal mark
    let normalized = if cleaned.contains('.') && cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    match Decimal::from_str(&normalized) {
        Ok(value) => ParsedAmount {
            value,
            fell_back: false,
        },
        Err(_) => ParsedAmount {
            value: Decimal::ZERO,
            fell_back: true,
        },
    }
}

fn iso_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid period regex"))
}

fn month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{4})$").expect("valid period regex"))
}

/// Day zero of the spreadsheet serial date system (serial 1 = 1899-12-31)
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Read a reporting month from a cell
///
/// Numbers are spreadsheet serial dates (time of day ignored). Text may be
/// `YYYY-MM`, `MM/YYYY` or `MM-YYYY`. Anything else gives `None`.
pub fn parse_period_key(cell: &Cell) -> Option<Period> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => {
            if !n.is_finite() || *n < 1.0 || *n > 2_958_465.0 {
                return None;
            }
            let date = serial_epoch().checked_add_signed(Duration::days(n.trunc() as i64))?;
            Some(Period::from_date(date))
        }
        Cell::Text(s) => {
            let s = s.trim();
            if let Some(caps) = iso_month_re().captures(s) {
                let year = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                return Period::new(year, month);
            }
            if let Some(caps) = month_year_re().captures(s) {
                let month = caps[1].parse().ok()?;
                let year = caps[2].parse().ok()?;
                return Period::new(year, month);
            }
            None
        }
    }
}

/// Canonical store token: digits only, no leading zeros
///
/// An empty result means the cell carries no store token.
pub fn normalize_store_token(cell: &Cell) -> String {
    let text = cell.as_text();
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.trim_start_matches('0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_parse_amount_decimal_notations() {
        let expected = Decimal::new(123456, 2);
        assert_eq!(parse_amount(&text("1.234,56")), expected);
        assert_eq!(parse_amount(&text("1234,56")), expected);
        assert_eq!(parse_amount(&text("1234.56")), expected);
        assert_eq!(parse_amount(&Cell::Number(1234.56)), expected);
    }

    #[test]
    fn test_parse_amount_strips_currency_and_spaces() {
        let expected = Decimal::new(123456, 2);
        assert_eq!(parse_amount(&text("R$ 1.234,56")), expected);
        assert_eq!(parse_amount(&text("R$\u{a0}1.234,56")), expected);
        assert_eq!(parse_amount(&text(" $1234.56 ")), expected);
        assert_eq!(parse_amount(&text("1 234,56 €")), expected);
    }

    #[test]
    fn test_parse_amount_multiple_thousand_groups() {
        assert_eq!(
            parse_amount(&text("1.234.567,89")),
            Decimal::new(123456789, 2)
        );
    }

    #[test]
    fn test_parse_amount_unreadable_is_zero() {
        assert_eq!(parse_amount(&text("n/a")), Decimal::ZERO);
        assert_eq!(parse_amount(&text("")), Decimal::ZERO);
        assert_eq!(parse_amount(&Cell::Empty), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_checked_flags_fallbacks() {
        assert!(parse_amount_checked(&text("abc")).fell_back);
        assert!(parse_amount_checked(&Cell::Number(f64::NAN)).fell_back);
        assert!(!parse_amount_checked(&text("0")).fell_back);
        assert!(!parse_amount_checked(&Cell::Empty).fell_back);
        assert!(!parse_amount_checked(&text("R$ ")).fell_back);
    }

    #[test]
    fn test_parse_period_from_serial_dates() {
        // First day of a month, across years and the leap day
        let cases = [
            (43466.0, "2019-01"),
            (43525.0, "2019-03"),
            (43891.0, "2020-03"),
            (44197.0, "2021-01"),
            (45292.0, "2024-01"),
            (45323.0, "2024-02"),
            (45352.0, "2024-03"),
            (45627.0, "2024-12"),
        ];
        for (serial, expected) in cases {
            let period = parse_period_key(&Cell::Number(serial)).unwrap();
            assert_eq!(period.to_string(), expected, "serial {}", serial);
        }
    }

    #[test]
    fn test_parse_period_serial_ignores_time_of_day() {
        let period = parse_period_key(&Cell::Number(45352.75)).unwrap();
        assert_eq!(period.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_period_day_one_is_last_day_of_1899() {
        let period = parse_period_key(&Cell::Number(1.0)).unwrap();
        assert_eq!(period.to_string(), "1899-12");
    }

    #[test]
    fn test_parse_period_text_shapes() {
        assert_eq!(parse_period_key(&text("2024-03")).unwrap().to_string(), "2024-03");
        assert_eq!(parse_period_key(&text("03/2024")).unwrap().to_string(), "2024-03");
        assert_eq!(parse_period_key(&text("03-2024")).unwrap().to_string(), "2024-03");
        assert_eq!(parse_period_key(&text(" 11/2023 ")).unwrap().to_string(), "2023-11");
    }

    #[test]
    fn test_parse_period_rejects_other_shapes() {
        assert!(parse_period_key(&text("março 2024")).is_none());
        assert!(parse_period_key(&text("2024/03")).is_none());
        assert!(parse_period_key(&text("13/2024")).is_none());
        assert!(parse_period_key(&text("2024-03-01")).is_none());
        assert!(parse_period_key(&Cell::Number(0.0)).is_none());
        assert!(parse_period_key(&Cell::Empty).is_none());
    }

    #[test]
    fn test_normalize_store_token_forms_agree() {
        assert_eq!(normalize_store_token(&text("0042")), "42");
        assert_eq!(normalize_store_token(&text("Loja 42")), "42");
        assert_eq!(normalize_store_token(&Cell::Number(42.0)), "42");
    }

    #[test]
    fn test_normalize_store_token_empty_cases() {
        assert_eq!(normalize_store_token(&text("Total geral")), "");
        assert_eq!(normalize_store_token(&text("000")), "");
        assert_eq!(normalize_store_token(&Cell::Empty), "");
    }
}
