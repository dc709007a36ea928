// Parsing and formatting helpers.
//
// The column deriver leans on these so it only ever sees trimmed, typed
// values; the dashboard tabs use the formatters for console output.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Layouts accepted for timestamp columns, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Cell values that mean "no value", the same set common CSV exporters
/// write for missing data.
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trim a cell and turn blanks and NA tokens into `None`.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        None
    } else {
        Some(s)
    }
}

/// Parse a decimal amount, tolerating thousands separators.
///
/// Returns `None` for anything that is not a plain number.
pub fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok()
}

/// Parse a timestamp cell. A bare date is read as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with `1,234,567.89` style grouping on the integer part.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Amount prefixed with a currency code, e.g. `AUD 1,234.50`.
pub fn format_currency(amount: f64, currency: &str) -> String {
    format!("{} {}", currency, format_number(amount, 2))
}
