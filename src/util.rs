// Utility helpers for parsing and basic statistics.
//
// Spreadsheet exports are messy: thousands separators, stray whitespace,
// percent signs. Everything forgiving lives here so the classification code
// can assume typed values.
use num_format::{Locale, ToFormattedString};

/// Forgiving numeric cell parser: trims, drops thousands separators and
/// rejects anything with letters in it (`"12 Cr"`, `"NaN"`).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.contains(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Completion is stored as a fraction, but some sheets carry `"45%"`.
pub fn parse_fraction_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    match s.strip_suffix('%') {
        Some(pct) => parse_f64_safe(Some(pct)).map(|v| v / 100.0),
        None => parse_f64_safe(Some(s)),
    }
}

/// Trimmed owned copy of an optional cell, empty when missing.
pub fn clean_text(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole.abs() < f64::EPSILON {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Fixed decimals with en-locale grouping of the whole part. A value that
/// rounds to zero is printed unsigned.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let sign = if n < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) { "-" } else { "" };
    let grouped = whole.parse::<u64>().map(format_int).unwrap_or_else(|_| whole.to_string());
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
