use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

/// How every accepted `purchase_date` is rendered.
pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d %b %Y", "%b %d, %Y"];

/// Parse the date spellings extractors and models produce. Naive values are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains('T') {
        let iso = value.replace('Z', "+00:00");
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&iso) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(parsed.and_utc());
        }
    }

    // "2024-03-01 10:00:00 UTC", which is also what this module emits
    let bare = value
        .strip_suffix("UTC")
        .or_else(|| value.strip_suffix("GMT"))
        .map(str::trim_end)
        .unwrap_or(value);

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(bare, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(bare, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn format_utc(date: &DateTime<Utc>) -> String {
    date.format(OUTPUT_FORMAT).to_string()
}

/// Normalise a candidate's date to UTC text.
///
/// Falls back to the email's `Date` header, then to the current time. Any fallback
/// comes back with a note for the record.
pub fn normalize_date(candidate: Option<&str>, email_date: Option<&str>) -> (String, Option<String>) {
    normalize_date_at(candidate, email_date, Utc::now())
}

pub(crate) fn normalize_date_at(
    candidate: Option<&str>,
    email_date: Option<&str>,
    now: DateTime<Utc>,
) -> (String, Option<String>) {
    let candidate = candidate.map(str::trim).filter(|s| !s.is_empty());

    if let Some(value) = candidate {
        if let Some(parsed) = parse_datetime(value) {
            return (format_utc(&parsed), None);
        }
    }

    let header = email_date.and_then(parse_datetime);
    let note = match (candidate, header) {
        (Some(value), Some(parsed)) => {
            warn!("Invalid date format '{}', using the email date", value);
            return (
                format_utc(&parsed),
                Some(format!("Unparseable purchase_date '{}'; used the email date", value)),
            );
        }
        (None, Some(parsed)) => {
            return (
                format_utc(&parsed),
                Some("No purchase_date found; used the email date".to_string()),
            );
        }
        (Some(value), None) => {
            warn!("Invalid date format '{}'. Using current time.", value);
            format!("Unparseable purchase_date '{}'; used the current time", value)
        }
        (None, None) => {
            warn!("No purchase date found, using current time");
            "No purchase_date found; used the current time".to_string()
        }
    };
    (format_utc(&now), Some(note))
}
