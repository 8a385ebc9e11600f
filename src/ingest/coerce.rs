//! Date and value coercion for loosely formatted tabular input.
//!
//! Mirrors the tolerant parsing the upload boundary needs: ISO and
//! slash-separated dates, 8-digit numeric dates, CJK-formatted dates,
//! thousands separators, currency prefixes and percent suffixes.
//! Unparseable cells are reported as `None`; the caller drops and counts
//! them rather than failing the run.

use chrono::NaiveDate;

use super::table::Cell;

const CURRENCY_SYMBOLS: [char; 5] = ['$', '¥', '￥', '€', '£'];

/// Parse a date from a cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD` (optionally with a trailing time
/// component), 8-digit `YYYYMMDD` in either text or number form, and
/// `YYYY年MM月DD日`.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(v) => parse_numeric_date(*v),
        Cell::Text(s) => parse_date_str(s),
    }
}

fn parse_numeric_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    let n = v as i64;
    if !(10_000_000..=99_999_999).contains(&n) {
        return None;
    }
    let (year, month, day) = ((n / 10_000) as i32, (n / 100 % 100) as u32, (n % 100) as u32);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a date from text.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Plain 8-digit form (20250109).
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<f64>().ok().and_then(parse_numeric_date);
    }

    // CJK form (2025年01月09日).
    if let Some(date) = parse_cjk_date(s) {
        return Some(date);
    }

    // Keep only the date part of a datetime string.
    let date_part = s.split_whitespace().next().unwrap_or(s);
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }
    None
}

fn parse_cjk_date(s: &str) -> Option<NaiveDate> {
    let (year_part, rest) = s.split_once('年')?;
    let (month_part, rest) = rest.split_once('月')?;
    let day_part = rest.strip_suffix('日')?;
    let year: i32 = year_part.trim().parse().ok()?;
    let month: u32 = month_part.trim().parse().ok()?;
    let day: u32 = day_part.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a numeric value from a cell.
///
/// Text values may carry thousands separators, a currency symbol and
/// surrounding whitespace; a trailing `%` divides the parsed number
/// by 100.
pub fn parse_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(v) => v.is_finite().then_some(*v),
        Cell::Text(s) => parse_value_str(s),
    }
}

/// Parse a numeric value from text.
pub fn parse_value_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Some(stripped) = cleaned.strip_suffix('%') {
        return stripped.trim().parse::<f64>().ok().map(|v| v / 100.0);
    }
    cleaned.parse::<f64>().ok()
}

/// Lenient numeric parse: strip everything but digits, sign and decimal
/// point. Used by the classifier for columns whose name already suggests
/// a numeric meaning.
pub fn parse_value_lenient(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_and_slash_dates() {
        assert_eq!(parse_date_str("2024-01-09"), Some(date(2024, 1, 9)));
        assert_eq!(parse_date_str("2024/01/09"), Some(date(2024, 1, 9)));
        assert_eq!(parse_date_str(" 2024-01-09 "), Some(date(2024, 1, 9)));
        assert_eq!(
            parse_date_str("2024-01-09 13:45:00"),
            Some(date(2024, 1, 9))
        );
    }

    #[test]
    fn parses_eight_digit_dates_from_text_and_numbers() {
        assert_eq!(parse_date_str("20250109"), Some(date(2025, 1, 9)));
        assert_eq!(
            parse_date(&Cell::Number(20250109.0)),
            Some(date(2025, 1, 9))
        );
        // Not a plausible date.
        assert_eq!(parse_date_str("20251350"), None);
    }

    #[test]
    fn parses_cjk_dates() {
        assert_eq!(parse_date_str("2025年01月09日"), Some(date(2025, 1, 9)));
        assert_eq!(parse_date_str("2025年1月9日"), Some(date(2025, 1, 9)));
        assert_eq!(parse_date_str("2025年13月9日"), None);
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_date_str("hello"), None);
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date(&Cell::Number(12.5)), None);
        assert_eq!(parse_date(&Cell::Empty), None);
    }

    #[test]
    fn parses_plain_and_formatted_values() {
        assert_relative_eq!(parse_value_str("1234.5").unwrap(), 1234.5);
        assert_relative_eq!(parse_value_str("1,234.50").unwrap(), 1234.5);
        assert_relative_eq!(parse_value_str("¥1,234.50").unwrap(), 1234.5);
        assert_relative_eq!(parse_value_str("$ 99").unwrap(), 99.0);
        assert_relative_eq!(parse_value_str("-42").unwrap(), -42.0);
    }

    #[test]
    fn percent_values_divide_by_hundred() {
        assert_relative_eq!(parse_value_str("50%").unwrap(), 0.5);
        assert_relative_eq!(parse_value_str("$  50%").unwrap(), 0.5);
        assert_relative_eq!(parse_value_str("12.5 %").unwrap(), 0.125);
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(parse_value_str("abc"), None);
        assert_eq!(parse_value_str(""), None);
        assert_eq!(parse_value(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn lenient_parse_salvages_noisy_numbers() {
        assert_relative_eq!(parse_value_lenient("1200 units").unwrap(), 1200.0);
        assert_relative_eq!(parse_value_lenient("CNY 45.5").unwrap(), 45.5);
        assert_eq!(parse_value_lenient("n/a"), None);
    }
}
