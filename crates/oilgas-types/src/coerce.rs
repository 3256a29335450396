//! Date and numeric coercion shared by every source adapter. The cascade
//! order is part of the contract: tests depend on precedence when an
//! input could plausibly match more than one form.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Parses a free-text date/timestamp into UTC, trying each accepted form
/// in order. Returns `None` (never an error) when nothing matches —
/// callers coerce unparseable dates to a null field rather than fail.
pub fn coerce_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // ISO-8601 with Z or an explicit offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Date-only forms, tried most-specific first.
    const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%d-%b-%Y"];
    for fmt in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Coerces a JSON value into a UTC timestamp, accepting only strings
/// (the fixture format never carries epoch-numeric timestamps).
pub fn coerce_datetime_value(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value.and_then(Value::as_str).and_then(coerce_datetime)
}

/// Coerces a JSON value to `f64` by attempting a float conversion;
/// unparseable (or absent) input becomes `None`, never an error.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Formats a UTC timestamp as ISO-8601 with a trailing `Z`, never the
/// `+00:00` offset form `DateTime::to_rfc3339` produces — every
/// timestamp crossing the JSON boundary (payload fields, evidence
/// pointers) uses this.
pub fn format_iso_z(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalizes free text for entity-resolution comparisons:
/// lower-case, strip, non-alphanumerics become spaces, whitespace
/// collapsed.
pub fn normalize_text(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso8601_with_z() {
        let dt = coerce_datetime("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-15T12:00:00+00:00");
    }

    #[test]
    fn parses_iso8601_with_offset() {
        let dt = coerce_datetime("2026-01-15T12:00:00-05:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-15T17:00:00+00:00");
    }

    #[test]
    fn parses_date_only_forms_in_precedence_order() {
        assert!(coerce_datetime("2026-01-15").is_some());
        assert!(coerce_datetime("01/15/2026").is_some());
        assert!(coerce_datetime("01-15-2026").is_some());
        assert!(coerce_datetime("15-Jan-2026").is_some());
    }

    #[test]
    fn format_iso_z_ends_in_z_not_offset() {
        let dt = coerce_datetime("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(format_iso_z(dt), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn unparseable_date_is_none() {
        assert!(coerce_datetime("not a date").is_none());
        assert!(coerce_datetime("").is_none());
    }

    #[test]
    fn coerce_number_handles_strings_and_numbers() {
        use serde_json::json;
        assert_eq!(coerce_number(Some(&json!(12.5))), Some(12.5));
        assert_eq!(coerce_number(Some(&json!("12.5"))), Some(12.5));
        assert_eq!(coerce_number(Some(&json!("abc"))), None);
        assert_eq!(coerce_number(None), None);
    }

    #[test]
    fn normalize_text_collapses_and_strips() {
        assert_eq!(normalize_text("  ConocoPhillips, Inc.  "), "conocophillips inc");
        assert_eq!(normalize_text("Dana   Morgan"), "dana morgan");
    }
}
