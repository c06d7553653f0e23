// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports (commas,
/// spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

/// Split a `"lon,lat"` coordinate cell into its two components.
///
/// The source system stores each location as a single comma-separated
/// cell. Either half may be missing or junk; each side degrades to
/// `None` independently so the caller can apply the `"Unknown"` path.
pub fn parse_coord_pair(s: Option<&str>) -> (Option<f64>, Option<f64>) {
    let Some(s) = s else {
        return (None, None);
    };
    let mut parts = s.splitn(2, ',');
    let lon = parse_f64_safe(parts.next());
    let lat = parse_f64_safe(parts.next());
    (lon, lat)
}

/// Parse a `YYYY-MM-DD` date, as entered for the reporting window.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse an account-creation timestamp like `3/14/24 9:05 AM` down to
/// its date part. The source exports registration times in this
/// `%m/%d/%y %I:%M %p` shape; anything else returns `None`, which the
/// caller treats as "not a new user" rather than an error.
pub fn parse_created_date(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    chrono::NaiveDateTime::parse_from_str(s, "%m/%d/%y %I:%M %p")
        .map(|dt| dt.date())
        .ok()
}

/// Interpret a spreadsheet truthy cell (`1`, `true`, `yes`) as a bool.
pub fn parse_flag(s: Option<&str>) -> bool {
    match s {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y"
        ),
        None => false,
    }
}

/// Format a floating-point value with a fixed number of decimal places
/// and locale-aware thousands separators (e.g., `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Thin wrapper around `num-format` for integer-like values. This is
/// used for counts in console messages (e.g., `9,855 rows loaded`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_float() {
        assert_eq!(parse_f64_safe(Some("12.5")), Some(12.5));
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
    }

    #[test]
    fn rejects_text() {
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn splits_coord_pair() {
        let (lon, lat) = parse_coord_pair(Some("-84.39,33.75"));
        assert_eq!(lon, Some(-84.39));
        assert_eq!(lat, Some(33.75));
    }

    #[test]
    fn coord_pair_halves_degrade_independently() {
        let (lon, lat) = parse_coord_pair(Some("-84.39,"));
        assert_eq!(lon, Some(-84.39));
        assert_eq!(lat, None);
        assert_eq!(parse_coord_pair(None), (None, None));
    }

    #[test]
    fn parses_created_timestamp_to_date() {
        let d = parse_created_date(Some("3/14/24 9:05 AM")).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }

    #[test]
    fn rejects_malformed_created_timestamp() {
        assert_eq!(parse_created_date(Some("2024-03-14")), None);
    }

    #[test]
    fn parses_truthy_flags() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("TRUE")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 2), "-42.00");
    }
}
